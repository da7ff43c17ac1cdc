//! Azure Storage SharedKey signing
//! Reference: https://learn.microsoft.com/rest/api/storageservices/authorize-with-shared-key

use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use reqwest::header::{
    HeaderMap, CONTENT_ENCODING, CONTENT_LANGUAGE, CONTENT_LENGTH, CONTENT_TYPE, DATE,
    IF_MATCH, IF_MODIFIED_SINCE, IF_NONE_MATCH, IF_UNMODIFIED_SINCE, RANGE,
};
use sha2::Sha256;
use std::collections::BTreeMap;

use crate::error::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

/// SharedKey signer for a single request
pub struct Signer<'a> {
    method: &'a str,
    account: &'a str,
    url_path: &'a str,
    headers: &'a HeaderMap,
    query: &'a [(String, String)],
}

impl<'a> Signer<'a> {
    pub fn new(
        method: &'a str,
        account: &'a str,
        url_path: &'a str,
        headers: &'a HeaderMap,
        query: &'a [(String, String)],
    ) -> Self {
        Self {
            method,
            account,
            url_path,
            headers,
            query,
        }
    }

    fn header_value(&self, name: impl reqwest::header::AsHeaderName) -> &str {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    }

    /// `x-ms-*` headers, lowercased and sorted, one `name:value` per line
    fn canonicalized_headers(&self) -> String {
        let mut ms_headers: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in self.headers.iter() {
            let name = name.as_str().to_lowercase();
            if name.starts_with("x-ms-") {
                let value = value.to_str().unwrap_or("").trim().to_string();
                ms_headers.insert(name, value);
            }
        }
        ms_headers
            .into_iter()
            .map(|(k, v)| format!("{}:{}\n", k, v))
            .collect()
    }

    /// `/<account><path>` followed by sorted `\nname:value` query parameters
    fn canonicalized_resource(&self) -> String {
        let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (k, v) in self.query {
            params.entry(k.to_lowercase()).or_default().push(v.clone());
        }

        let mut resource = format!("/{}{}", self.account, self.url_path);
        for (k, mut values) in params {
            values.sort();
            resource.push_str(&format!("\n{}:{}", k, values.join(",")));
        }
        resource
    }

    fn string_to_sign(&self) -> String {
        // Content-Length is empty when zero (version 2015-02-21 and later)
        let content_length = match self.header_value(CONTENT_LENGTH) {
            "0" => "",
            v => v,
        };

        let fields = [
            self.method.to_uppercase(),
            self.header_value(CONTENT_ENCODING).to_string(),
            self.header_value(CONTENT_LANGUAGE).to_string(),
            content_length.to_string(),
            self.header_value("content-md5").to_string(),
            self.header_value(CONTENT_TYPE).to_string(),
            self.header_value(DATE).to_string(),
            self.header_value(IF_MODIFIED_SINCE).to_string(),
            self.header_value(IF_MATCH).to_string(),
            self.header_value(IF_NONE_MATCH).to_string(),
            self.header_value(IF_UNMODIFIED_SINCE).to_string(),
            self.header_value(RANGE).to_string(),
        ];

        format!(
            "{}\n{}{}",
            fields.join("\n"),
            self.canonicalized_headers(),
            self.canonicalized_resource()
        )
    }

    /// `Authorization` header value
    pub fn authorization(&self, account_key: &str) -> Result<String> {
        let key = general_purpose::STANDARD
            .decode(account_key.trim())
            .map_err(|e| AppError::Storage(format!("Invalid storage account key: {}", e)))?;

        let mut mac = HmacSha256::new_from_slice(&key)
            .map_err(|e| AppError::Storage(format!("Invalid storage account key: {}", e)))?;
        mac.update(self.string_to_sign().as_bytes());
        let signature = general_purpose::STANDARD.encode(mac.finalize().into_bytes());

        Ok(format!("SharedKey {}:{}", self.account, signature))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderName, HeaderValue};
    use std::str::FromStr;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (k, v) in pairs {
            headers.insert(
                HeaderName::from_str(k).unwrap(),
                HeaderValue::from_str(v).unwrap(),
            );
        }
        headers
    }

    #[test]
    fn test_canonicalized_resource() {
        let h = HeaderMap::new();
        let query = vec![
            ("restype".to_string(), "container".to_string()),
            ("comp".to_string(), "list".to_string()),
        ];
        let signer = Signer::new("GET", "acct", "/images", &h, &query);
        assert_eq!(
            signer.canonicalized_resource(),
            "/acct/images\ncomp:list\nrestype:container"
        );
    }

    #[test]
    fn test_string_to_sign() {
        let h = headers(&[
            ("x-ms-version", "2021-08-06"),
            ("x-ms-date", "Mon, 01 Jan 2024 00:00:00 GMT"),
            ("x-ms-blob-type", "BlockBlob"),
            ("content-length", "3"),
            ("content-type", "image/png"),
        ]);
        let signer = Signer::new("put", "acct", "/images/1-a.png", &h, &[]);
        assert_eq!(
            signer.string_to_sign(),
            "PUT\n\n\n3\n\nimage/png\n\n\n\n\n\n\n\
             x-ms-blob-type:BlockBlob\n\
             x-ms-date:Mon, 01 Jan 2024 00:00:00 GMT\n\
             x-ms-version:2021-08-06\n\
             /acct/images/1-a.png"
        );
    }

    #[test]
    fn test_zero_content_length_is_blank() {
        let h = headers(&[("content-length", "0")]);
        let signer = Signer::new("DELETE", "acct", "/images/x", &h, &[]);
        assert!(signer.string_to_sign().starts_with("DELETE\n\n\n\n"));
    }

    #[test]
    fn test_authorization() {
        let h = headers(&[("x-ms-date", "Mon, 01 Jan 2024 00:00:00 GMT")]);
        let signer = Signer::new("HEAD", "acct", "/images/x", &h, &[]);
        let key = general_purpose::STANDARD.encode(b"secret");

        let auth = signer.authorization(&key).unwrap();
        assert!(auth.starts_with("SharedKey acct:"));
        // base64 of a 32 byte digest
        assert_eq!(auth.len(), "SharedKey acct:".len() + 44);
        assert_eq!(auth, signer.authorization(&key).unwrap());

        assert!(signer.authorization("not base64!").is_err());
    }
}
