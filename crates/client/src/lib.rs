//! # Patients Client
//!
//! HTTP implementation of [`PatientApi`] for the patients REST backend.
//!
//! Handles:
//! - URL building under the configured base URL (identifiers are percent-encoded)
//! - JSON request and response bodies
//! - Mapping HTTP failures onto [`ApiError`], keeping the backend's `message` verbatim
//! - Request/response logging through `tracing`

#![warn(rust_2018_idioms)]

use patients_core::constants::PATIENTS_PATH;
use patients_core::{ApiError, ApiResult, CoreConfig, PatientApi, PatientError, PatientResult};
use patients_types::{CreatePatientRequest, Patient, UpdatePatientRequest};
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;

/// Patients backend reached over HTTP.
#[derive(Clone, Debug)]
pub struct HttpPatientApi {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpPatientApi {
    /// Build a client for the base URL in `cfg`.
    pub fn new(cfg: &CoreConfig) -> PatientResult<Self> {
        Self::with_client(reqwest::Client::new(), cfg.base_url())
    }

    /// Build a client around an existing `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: &str) -> PatientResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| PatientError::InvalidInput(format!("invalid base URL {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(PatientError::InvalidInput(format!(
                "base URL cannot carry a path: {base_url}"
            )));
        }
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `<base>/patients` or `<base>/patients/<id>`.
    fn url(&self, id: Option<&str>) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| ApiError::Transport("base URL cannot carry a path".into()))?;
            segments
                .pop_if_empty()
                .push(PATIENTS_PATH.trim_start_matches('/'));
            if let Some(id) = id {
                segments.push(id);
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: &Url) -> RequestBuilder {
        tracing::info!("API Request: {} {}", method, url.path());
        self.http
            .request(method, url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
    }

    /// Send `request`; non-2xx responses become errors. `id` marks a single-patient route,
    /// where 404 maps to [`ApiError::NotFound`].
    async fn send(&self, request: RequestBuilder, url: &Url, id: Option<&str>) -> ApiResult<Response> {
        let response = request.send().await.map_err(|e| {
            tracing::error!("API Error: {} {}", url.path(), e);
            ApiError::Transport(e.to_string())
        })?;

        let status = response.status();
        if status.is_success() {
            tracing::info!("API Response: {} {}", status.as_u16(), url.path());
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::error!("API Error: {} {}", status.as_u16(), body);
        let message = error_message(&body);

        match id {
            Some(id) if status == StatusCode::NOT_FOUND => Err(ApiError::NotFound {
                id: id.to_string(),
                message,
            }),
            _ => Err(ApiError::Server {
                status: status.as_u16(),
                message,
            }),
        }
    }
}

/// The non-empty `message` string of a JSON error body, if there is one.
fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()?
        .get("message")?
        .as_str()
        .filter(|m| !m.is_empty())
        .map(str::to_owned)
}

async fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let body = response
        .text()
        .await
        .map_err(|e| ApiError::Transport(e.to_string()))?;
    serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
}

impl PatientApi for HttpPatientApi {
    async fn create_patient(&self, request: &CreatePatientRequest) -> ApiResult<Patient> {
        let url = self.url(None)?;
        let builder = self.request(Method::POST, &url).json(request);
        decode(self.send(builder, &url, None).await?).await
    }

    async fn list_patients(&self) -> ApiResult<Vec<Patient>> {
        let url = self.url(None)?;
        let builder = self.request(Method::GET, &url);
        decode(self.send(builder, &url, None).await?).await
    }

    async fn get_patient(&self, id: &str) -> ApiResult<Patient> {
        let url = self.url(Some(id))?;
        let builder = self.request(Method::GET, &url);
        decode(self.send(builder, &url, Some(id)).await?).await
    }

    async fn update_patient(
        &self,
        id: &str,
        request: &UpdatePatientRequest,
    ) -> ApiResult<Patient> {
        let url = self.url(Some(id))?;
        let builder = self.request(Method::PUT, &url).json(request);
        decode(self.send(builder, &url, Some(id)).await?).await
    }

    async fn delete_patient(&self, id: &str) -> ApiResult<()> {
        let url = self.url(Some(id))?;
        let builder = self.request(Method::DELETE, &url);
        self.send(builder, &url, Some(id)).await?;
        Ok(())
    }
}
