//! HTTP request wrapper for the Blob service

use reqwest::header::HeaderMap;
use reqwest::{Body, Method, StatusCode};
use serde::Deserialize;
use std::fmt::Display;

/// `<Error>` body of a failed Blob service request
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "Code")]
    code: String,
}

/// Error category of a response
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum ErrNo {
    SUCCESS = 0,
    OTHER = 10000,
    /// Non-2xx HTTP status
    STATUS = 10001,
    DECODE = 10002,
    CONNECT = 10003,
    TIMEOUT = 10004,
}

impl Display for ErrNo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#?}", self)
    }
}

/// Outcome of a Blob service request
#[derive(Debug, Clone)]
pub struct Response {
    pub error_no: ErrNo,
    pub error_message: String,
    /// HTTP status, absent when the request never got a response
    pub status: Option<StatusCode>,
    pub result: Vec<u8>,
}

impl From<reqwest::Error> for Response {
    fn from(value: reqwest::Error) -> Self {
        let error_no = if value.is_timeout() {
            ErrNo::TIMEOUT
        } else if value.is_connect() {
            ErrNo::CONNECT
        } else if value.is_decode() {
            ErrNo::DECODE
        } else if value.is_status() {
            ErrNo::STATUS
        } else {
            ErrNo::OTHER
        };
        Response {
            error_no,
            error_message: value.to_string(),
            status: value.status(),
            result: Vec::new(),
        }
    }
}

impl Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            r#"{{"error_no": "{}","error_message": "{}","result": "{}"}}"#,
            self.error_no as i32,
            self.error_message,
            String::from_utf8_lossy(&self.result)
        )
    }
}

impl Response {
    /// A response for a request that failed before it was sent
    pub fn from_error(e: impl Display) -> Self {
        Response {
            error_no: ErrNo::OTHER,
            error_message: e.to_string(),
            status: None,
            result: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error_no == ErrNo::SUCCESS
    }

    pub fn is_not_found(&self) -> bool {
        self.status == Some(StatusCode::NOT_FOUND)
    }

    /// Azure error code from the XML error body
    pub fn error_code(&self) -> Option<String> {
        let body = String::from_utf8_lossy(&self.result);
        let error: ErrorBody = quick_xml::de::from_str(body.trim_start_matches('\u{feff}')).ok()?;
        Some(error.code)
    }
}

/// HTTP request helper over a shared `reqwest::Client`
#[derive(Debug, Clone)]
pub struct Request {
    http: reqwest::Client,
}

impl Request {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Execute a request; `Err` carries non-2xx statuses and transport failures
    pub async fn send(
        &self,
        method: Method,
        url: &str,
        query: &[(String, String)],
        headers: HeaderMap,
        body: Option<Body>,
    ) -> Result<Response, Response> {
        let mut req = self.http.request(method, url).headers(headers);
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(body) = body {
            req = req.body(body);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let error_code = resp
            .headers()
            .get("x-ms-error-code")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let result = resp.bytes().await?.to_vec();

        if status.is_client_error() || status.is_server_error() {
            let mut resp = Response {
                error_no: ErrNo::STATUS,
                error_message: status.to_string(),
                status: Some(status),
                result,
            };
            // HEAD responses carry no body, only the header
            if let Some(code) = error_code.or_else(|| resp.error_code()) {
                resp.error_message = format!("{} ({})", status, code);
            }
            return Err(resp);
        }

        Ok(Response {
            error_no: ErrNo::SUCCESS,
            error_message: String::new(),
            status: Some(status),
            result,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_from_body() {
        let resp = Response {
            error_no: ErrNo::STATUS,
            error_message: "409 Conflict".to_string(),
            status: Some(StatusCode::CONFLICT),
            result: b"<?xml version=\"1.0\"?><Error><Code>LeaseIdMissing</Code><Message>m</Message></Error>".to_vec(),
        };
        assert_eq!(resp.error_code().as_deref(), Some("LeaseIdMissing"));
        assert!(!resp.is_not_found());
        assert!(!resp.is_success());
    }

    #[test]
    fn test_error_code_without_xml_body() {
        let resp = Response::from_error("connection refused");
        assert_eq!(resp.error_code(), None);

        let resp = Response {
            result: b"<html>bad gateway</html>".to_vec(),
            ..Response::from_error("502")
        };
        assert_eq!(resp.error_code(), None);
    }
}
