//! Blob service client: endpoint addressing and request authentication

use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Url;

use crate::config::BlobStoreConfig;
use crate::error::{AppError, Result};
use crate::storage::azure::request::Request;
use crate::storage::azure::signer::Signer;

/// REST API version sent with every request
pub const API_VERSION: &str = "2021-08-06";

/// How requests are authorized
#[derive(Debug, Clone)]
pub enum Credential {
    SharedKey(String),
    /// SAS query string, without the leading `?`
    Sas(String),
}

/// Client for one container of a storage account
#[derive(Debug, Clone)]
pub struct Client {
    account: String,
    container: String,
    endpoint: Url,
    credential: Credential,
    request: Request,
}

impl Client {
    /// Build a client from configuration
    ///
    /// A SAS token wins over an account key when both are set.
    pub fn from_config(config: &BlobStoreConfig) -> Result<Self> {
        let credential = match (&config.sas_token, &config.account_key) {
            (Some(sas), _) => Credential::Sas(sas.trim_start_matches('?').to_string()),
            (None, Some(key)) => Credential::SharedKey(key.clone()),
            (None, None) => {
                return Err(AppError::Internal(
                    "Azure blob store needs either account_key or sas_token".to_string(),
                ))
            }
        };

        let endpoint = config
            .endpoint
            .clone()
            .unwrap_or_else(|| format!("https://{}.blob.core.windows.net", config.account_name));

        Self::new(&config.account_name, &config.container_name, &endpoint, credential)
    }

    pub fn new(account: &str, container: &str, endpoint: &str, credential: Credential) -> Result<Self> {
        let endpoint = Url::parse(endpoint.trim_end_matches('/'))
            .map_err(|e| AppError::Internal(format!("Invalid blob endpoint {}: {}", endpoint, e)))?;

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            account: account.to_string(),
            container: container.to_string(),
            endpoint,
            credential,
            request: Request::new(http),
        })
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    /// URL path of the container, including any endpoint path prefix
    pub fn container_path(&self) -> String {
        format!(
            "{}/{}",
            self.endpoint.path().trim_end_matches('/'),
            self.container
        )
    }

    /// URL path of a blob; the name is percent-encoded as a single segment
    pub fn blob_path(&self, name: &str) -> String {
        format!("{}/{}", self.container_path(), urlencoding::encode(name))
    }

    /// Full URL for a path, with the SAS token attached when in use
    pub fn url_for_path(&self, path: &str) -> String {
        let mut url = format!(
            "{}://{}{}",
            self.endpoint.scheme(),
            self.endpoint_authority(),
            path
        );
        if let Credential::Sas(sas) = &self.credential {
            url.push('?');
            url.push_str(sas);
        }
        url
    }

    fn endpoint_authority(&self) -> String {
        let host = self.endpoint.host_str().unwrap_or_default();
        match self.endpoint.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        }
    }

    /// Headers every request carries
    pub fn common_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let now = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        if let Ok(date) = HeaderValue::from_str(&now) {
            headers.insert("x-ms-date", date);
        }
        headers.insert("x-ms-version", HeaderValue::from_static(API_VERSION));
        headers
    }

    /// Add the `Authorization` header when signing with the account key
    pub fn authorize(
        &self,
        method: &str,
        url_path: &str,
        mut headers: HeaderMap,
        query: &[(String, String)],
    ) -> Result<HeaderMap> {
        if let Credential::SharedKey(key) = &self.credential {
            let auth = Signer::new(method, &self.account, url_path, &headers, query).authorization(key)?;
            let value = HeaderValue::from_str(&auth)
                .map_err(|e| AppError::Storage(format!("Invalid authorization header: {}", e)))?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BlobProvider;

    fn config() -> BlobStoreConfig {
        BlobStoreConfig {
            provider: BlobProvider::Azure,
            account_key: Some("c2VjcmV0".to_string()),
            ..BlobStoreConfig::default()
        }
    }

    #[test]
    fn test_default_endpoint() {
        let client = Client::from_config(&config()).unwrap();
        assert_eq!(client.container_path(), "/images");
        assert_eq!(client.blob_path("1-my saw.png"), "/images/1-my%20saw.png");
        assert_eq!(
            client.url_for_path(&client.blob_path("1-a.png")),
            "https://toolapistorage.blob.core.windows.net/images/1-a.png"
        );
    }

    #[test]
    fn test_path_style_endpoint_with_sas() {
        let mut cfg = config();
        cfg.endpoint = Some("http://127.0.0.1:10000/devstoreaccount1/".to_string());
        cfg.sas_token = Some("?sv=2021-08-06&sig=abc".to_string());

        let client = Client::from_config(&cfg).unwrap();
        assert_eq!(client.container_path(), "/devstoreaccount1/images");
        assert_eq!(
            client.url_for_path(&client.blob_path("x.png")),
            "http://127.0.0.1:10000/devstoreaccount1/images/x.png?sv=2021-08-06&sig=abc"
        );

        let headers = client
            .authorize("GET", "/devstoreaccount1/images/x.png", client.common_headers(), &[])
            .unwrap();
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_missing_credential() {
        let cfg = BlobStoreConfig {
            provider: BlobProvider::Azure,
            ..BlobStoreConfig::default()
        };
        assert!(Client::from_config(&cfg).is_err());
    }

    #[test]
    fn test_shared_key_adds_authorization() {
        let client = Client::from_config(&config()).unwrap();
        let headers = client
            .authorize("DELETE", &client.blob_path("x.png"), client.common_headers(), &[])
            .unwrap();
        let auth = headers.get(AUTHORIZATION).unwrap().to_str().unwrap();
        assert!(auth.starts_with("SharedKey toolapistorage:"));
        assert_eq!(headers.get("x-ms-version").unwrap(), API_VERSION);
    }
}
