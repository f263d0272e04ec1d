use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use session_backend::{BackendError, JobStatus, SessionBackend, SessionPayload, SessionSummary};
use tracing::{debug, instrument};
use url::Url;

use crate::config::HttpBackendConfig;
use crate::endpoints::{
    core_sessions_url, job_status_url, normalize_base_url, session_url, sessions_url,
};
use crate::error::{parse_error_message, HttpBackendError};
use crate::headers::build_headers;

#[derive(Debug)]
pub struct HttpSessionBackend {
    http: Client,
    config: HttpBackendConfig,
    api_root: Url,
}

impl HttpSessionBackend {
    pub fn new(config: HttpBackendConfig) -> Result<Self, HttpBackendError> {
        let api_root = normalize_base_url(&config.base_url)?;
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(HttpBackendError::from)?;
        Ok(Self {
            http,
            config,
            api_root,
        })
    }

    pub fn config(&self) -> &HttpBackendConfig {
        &self.config
    }

    pub fn api_root(&self) -> &Url {
        &self.api_root
    }

    pub fn build_headers(&self) -> Result<HeaderMap, HttpBackendError> {
        let mut out = HeaderMap::new();
        for (key, value) in build_headers(&self.config) {
            out.insert(
                HeaderName::from_bytes(key.as_bytes())
                    .map_err(|_| HttpBackendError::InvalidHeader(format!("invalid key: {key}")))?,
                HeaderValue::from_str(&value)
                    .map_err(|_| HttpBackendError::InvalidHeader(format!("invalid value for {key}")))?,
            );
        }
        Ok(out)
    }

    pub fn build_request(
        &self,
        method: Method,
        url: Url,
    ) -> Result<RequestBuilder, HttpBackendError> {
        let headers = self.build_headers()?;
        Ok(self.http.request(method, url).headers(headers))
    }

    #[instrument(skip_all, fields(method = %method, url = %url))]
    async fn send(&self, method: Method, url: Url) -> Result<Response, HttpBackendError> {
        let response = self.build_request(method, url)?.send().await?;
        let status = response.status();
        debug!(%status, "session service responded");

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(HttpBackendError::Status(
            status,
            parse_error_message(status, &body),
        ))
    }

    async fn get_json<T>(&self, url: Url) -> Result<T, HttpBackendError>
    where
        T: DeserializeOwned,
    {
        let response = self.send(Method::GET, url).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl SessionBackend for HttpSessionBackend {
    async fn fetch_session(&self, session_id: &str) -> Result<SessionPayload, BackendError> {
        let url = session_url(&self.api_root, session_id)?;
        match self.get_json(url).await {
            Err(HttpBackendError::Status(StatusCode::NOT_FOUND, _)) => {
                Err(BackendError::not_found(session_id))
            }
            other => other.map_err(BackendError::from),
        }
    }

    async fn list_sessions(&self) -> Result<Vec<SessionSummary>, BackendError> {
        let url = sessions_url(&self.api_root)?;
        Ok(self.get_json(url).await?)
    }

    async fn list_core_sessions(&self) -> Result<Vec<SessionSummary>, BackendError> {
        let url = core_sessions_url(&self.api_root)?;
        Ok(self.get_json(url).await?)
    }

    async fn job_status(&self, session_id: &str) -> Result<JobStatus, BackendError> {
        let url = job_status_url(&self.api_root, session_id)?;
        Ok(self.get_json(url).await?)
    }

    async fn delete_session(&self, session_id: &str) -> Result<(), BackendError> {
        let url = session_url(&self.api_root, session_id)?;
        self.send(Method::DELETE, url).await?;
        Ok(())
    }
}
