//! Blob operations: put, delete, properties and listing

use bytes::Bytes;
use reqwest::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Body, Method};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::storage::azure::client::Client;
use crate::storage::azure::request::Response;

/// Result of a List Blobs page
#[derive(Debug, Deserialize)]
struct EnumerationResults {
    #[serde(rename = "Blobs", default)]
    blobs: BlobList,
    #[serde(rename = "NextMarker", default)]
    next_marker: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BlobList {
    #[serde(rename = "Blob", default)]
    blob: Vec<BlobItem>,
}

#[derive(Debug, Deserialize)]
struct BlobItem {
    #[serde(rename = "Name")]
    name: String,
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| AppError::Storage(format!("Invalid header value {}: {}", value, e)))
}

/// Parse one List Blobs XML page into names and the continuation marker
fn parse_list_page(body: &[u8]) -> Result<(Vec<String>, Option<String>)> {
    let text = String::from_utf8_lossy(body);
    let text = text.trim_start_matches('\u{feff}');
    let page: EnumerationResults = quick_xml::de::from_str(text)
        .map_err(|e| AppError::Storage(format!("Invalid List Blobs response: {}", e)))?;

    let names = page.blobs.blob.into_iter().map(|b| b.name).collect();
    let marker = page.next_marker.filter(|m| !m.trim().is_empty());
    Ok((names, marker))
}

impl Client {
    /// Put Blob as a block blob, replacing any existing blob
    ///
    /// Reference: https://learn.microsoft.com/rest/api/storageservices/put-blob
    pub async fn put_blob(&self, name: &str, data: Bytes, content_type: &str) -> Response {
        let url_path = self.blob_path(name);

        let mut headers = self.common_headers();
        headers.insert("x-ms-blob-type", HeaderValue::from_static("BlockBlob"));
        headers.insert(CONTENT_LENGTH, HeaderValue::from(data.len()));
        match header_value(content_type) {
            Ok(v) => {
                headers.insert(CONTENT_TYPE, v.clone());
                headers.insert("x-ms-blob-content-type", v);
            }
            Err(e) => return Response::from_error(e),
        }

        let headers = match self.authorize("PUT", &url_path, headers, &[]) {
            Ok(h) => h,
            Err(e) => return Response::from_error(e),
        };

        let resp = self
            .request()
            .send(
                Method::PUT,
                &self.url_for_path(&url_path),
                &[],
                headers,
                Some(Body::from(data)),
            )
            .await;

        resp.unwrap_or_else(|e| e)
    }

    /// Delete Blob together with its snapshots
    ///
    /// Reference: https://learn.microsoft.com/rest/api/storageservices/delete-blob
    pub async fn delete_blob(&self, name: &str) -> Response {
        let url_path = self.blob_path(name);

        let mut headers = self.common_headers();
        headers.insert("x-ms-delete-snapshots", HeaderValue::from_static("include"));

        let headers = match self.authorize("DELETE", &url_path, headers, &[]) {
            Ok(h) => h,
            Err(e) => return Response::from_error(e),
        };

        let resp = self
            .request()
            .send(Method::DELETE, &self.url_for_path(&url_path), &[], headers, None)
            .await;

        resp.unwrap_or_else(|e| e)
    }

    /// Get Blob Properties; a 404 response means the blob is absent
    ///
    /// Reference: https://learn.microsoft.com/rest/api/storageservices/get-blob-properties
    pub async fn head_blob(&self, name: &str) -> Response {
        let url_path = self.blob_path(name);

        let headers = match self.authorize("HEAD", &url_path, self.common_headers(), &[]) {
            Ok(h) => h,
            Err(e) => return Response::from_error(e),
        };

        let resp = self
            .request()
            .send(Method::HEAD, &self.url_for_path(&url_path), &[], headers, None)
            .await;

        resp.unwrap_or_else(|e| e)
    }

    /// List Blobs, following continuation markers until exhausted
    ///
    /// Reference: https://learn.microsoft.com/rest/api/storageservices/list-blobs
    pub async fn list_blobs(&self) -> Result<Vec<String>> {
        let url_path = self.container_path();
        let mut names = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let mut query = vec![
                ("restype".to_string(), "container".to_string()),
                ("comp".to_string(), "list".to_string()),
            ];
            if let Some(m) = &marker {
                query.push(("marker".to_string(), m.clone()));
            }

            let headers = self.authorize("GET", &url_path, self.common_headers(), &query)?;
            let resp = self
                .request()
                .send(Method::GET, &self.url_for_path(&url_path), &query, headers, None)
                .await
                .map_err(|e| {
                    AppError::Storage(format!("List Blobs failed: [{}] {}", e.error_no, e.error_message))
                })?;

            let (page, next) = parse_list_page(&resp.result)?;
            names.extend(page);

            match next {
                Some(m) => marker = Some(m),
                None => break,
            }
        }

        tracing::debug!("Listed {} blobs in container {}", names.len(), self.container());
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_page() {
        let body = "\u{feff}<?xml version=\"1.0\" encoding=\"utf-8\"?>\
            <EnumerationResults ServiceEndpoint=\"https://acct.blob.core.windows.net/\" ContainerName=\"images\">\
            <Blobs>\
            <Blob><Name>1-a.png</Name><Properties><Content-Length>3</Content-Length></Properties></Blob>\
            <Blob><Name>2-b.png</Name><Properties><Content-Length>4</Content-Length></Properties></Blob>\
            </Blobs>\
            <NextMarker>2!72!MDAwMDA</NextMarker>\
            </EnumerationResults>";

        let (names, marker) = parse_list_page(body.as_bytes()).unwrap();
        assert_eq!(names, vec!["1-a.png", "2-b.png"]);
        assert_eq!(marker.as_deref(), Some("2!72!MDAwMDA"));
    }

    #[test]
    fn test_parse_last_page() {
        let body = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\
            <EnumerationResults ContainerName=\"images\"><Blobs /><NextMarker /></EnumerationResults>";

        let (names, marker) = parse_list_page(body.as_bytes()).unwrap();
        assert!(names.is_empty());
        assert!(marker.is_none());
    }
}
