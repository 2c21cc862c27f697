//! Fleet REST API source

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};

use super::FleetSource;
use crate::{
    config::SourceConfig,
    error::{AppError, AppResult},
    models::{EquipmentUnit, UserCertification},
};

#[derive(Clone)]
pub struct HttpFleetSource {
    client: Client,
    base_url: Url,
}

impl HttpFleetSource {
    pub fn new(config: &SourceConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| AppError::Internal(format!("Invalid fleet API URL {}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::Internal(format!(
                "Fleet API URL {} cannot carry a path",
                config.base_url
            )));
        }

        Ok(Self { client, base_url })
    }

    /// Append path segments to the base URL, escaping each one
    fn url(&self, segments: &[&str]) -> AppResult<Url> {
        // Dot segments are dropped rather than escaped by the URL builder
        if let Some(segment) = segments.iter().find(|s| matches!(**s, "" | "." | "..")) {
            return Err(AppError::BadRequest(format!("Invalid identifier {:?}", segment)));
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::Internal("Fleet API URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl FleetSource for HttpFleetSource {
    async fn list_equipment(&self) -> AppResult<Vec<EquipmentUnit>> {
        let units = self
            .client
            .get(self.url(&["equipment"])?)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<EquipmentUnit>>()
            .await?;
        tracing::debug!("Fleet API returned {} equipment units", units.len());
        Ok(units)
    }

    async fn get_equipment(&self, id: &str) -> AppResult<EquipmentUnit> {
        let response = self
            .client
            .get(self.url(&["equipment", id])?)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("Equipment {} not found", id)));
        }

        Ok(response.error_for_status()?.json().await?)
    }

    async fn user_certifications(&self, user_id: &str) -> AppResult<Vec<UserCertification>> {
        let response = self
            .client
            .get(self.url(&["users", user_id, "certifications"])?)
            .send()
            .await?;

        // Unknown users simply hold no certifications
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }

        Ok(response.error_for_status()?.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceKind;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
        sync::oneshot,
    };

    /// Serve a single request with a 404 and report the request target
    async fn not_found_server() -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = stream.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).to_string();
            let target = request
                .lines()
                .next()
                .and_then(|line| line.split_whitespace().nth(1))
                .unwrap_or_default()
                .to_string();
            stream
                .write_all(b"HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                .await
                .unwrap();
            let _ = tx.send(target);
        });

        (format!("http://{}/api/", addr), rx)
    }

    fn source(base_url: String) -> HttpFleetSource {
        HttpFleetSource::new(&SourceConfig {
            kind: SourceKind::Http,
            base_url,
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_url_escapes_segments() {
        let source = source("http://fleet.local/api".to_string());
        let url = source.url(&["equipment", "../users/EMP-2201/certifications"]).unwrap();
        assert!(url.path().starts_with("/api/equipment/"));
        assert!(!url.path().contains("/users/"));

        let url = source.url(&["equipment", "BTG-1045?x=1#frag"]).unwrap();
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
        assert_eq!(url.path(), "/api/equipment/BTG-1045%3Fx=1%23frag");
    }

    #[test]
    fn test_dot_segments_rejected() {
        let source = source("http://fleet.local/api".to_string());
        for id in ["..", ".", ""] {
            assert!(matches!(
                source.url(&["equipment", id]),
                Err(AppError::BadRequest(_))
            ));
        }
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        let result = HttpFleetSource::new(&SourceConfig {
            kind: SourceKind::Http,
            base_url: "not a url".to_string(),
            timeout_secs: 5,
        });
        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[tokio::test]
    async fn test_equipment_id_cannot_leave_its_segment() {
        let (base_url, target) = not_found_server().await;
        let source = source(base_url);

        let result = source.get_equipment("../users/EMP-2201/certifications").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let target = target.await.unwrap();
        assert!(target.starts_with("/api/equipment/"), "{}", target);
        assert!(!target.contains("/users/"), "{}", target);
    }

    #[tokio::test]
    async fn test_user_id_is_escaped() {
        let (base_url, target) = not_found_server().await;
        let source = source(base_url);

        let certs = source.user_certifications("EMP-2201?admin=1").await.unwrap();
        assert!(certs.is_empty());

        let target = target.await.unwrap();
        assert_eq!(target, "/api/users/EMP-2201%3Fadmin=1/certifications");
    }
}
