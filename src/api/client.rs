//! HTTP client for the summarization service.
//!
//! Wraps the two endpoints the job lifecycle needs (`POST /api/summarize`
//! and `GET /api/summarize/{job_id}`) using [`reqwest`]. Every response must
//! declare a JSON content type; the checks happen in the same order for both
//! endpoints: content type, then body, then HTTP status.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::job::dto::{ErrorBody, StatusResponse, SubmitResponse};
use super::validation::PdfUpload;

/// Boxed future returned by [`SummarizeApi`] methods.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ApiError>> + Send + 'a>>;

/// Errors from the HTTP layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The exchange could not be completed (connect, DNS, TLS, reset...).
    #[error("{0}")]
    Network(String),

    /// The response did not declare a JSON content type.
    #[error("non-JSON response ({status}, content-type {content_type:?})")]
    NonJson {
        status: u16,
        content_type: Option<String>,
    },

    /// Non-2xx status, with the server's `detail` when one was sent.
    #[error("request rejected ({status})")]
    Rejected { status: u16, detail: Option<String> },

    /// A 2xx JSON body that does not have the expected shape.
    #[error("malformed response body: {0}")]
    Decode(String),
}

impl ApiError {
    /// The server-supplied detail, or `fallback` when it is absent or empty.
    pub fn detail_or(&self, fallback: &str) -> String {
        match self {
            ApiError::Rejected {
                detail: Some(detail),
                ..
            } if !detail.is_empty() => detail.clone(),
            _ => fallback.to_string(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Network(err.to_string())
    }
}

/// The remote operations the job lifecycle depends on.
pub trait SummarizeApi: Send + Sync {
    /// Upload a document and get the new job's identifier.
    fn submit<'a>(&'a self, upload: &'a PdfUpload) -> ApiFuture<'a, SubmitResponse>;

    /// Fetch the current status of a job.
    fn job_status<'a>(&'a self, job_id: &'a str) -> ApiFuture<'a, StatusResponse>;
}

impl<T: SummarizeApi + ?Sized> SummarizeApi for Arc<T> {
    fn submit<'a>(&'a self, upload: &'a PdfUpload) -> ApiFuture<'a, SubmitResponse> {
        (**self).submit(upload)
    }

    fn job_status<'a>(&'a self, job_id: &'a str) -> ApiFuture<'a, StatusResponse> {
        (**self).job_status(job_id)
    }
}

/// reqwest-backed [`SummarizeApi`].
#[derive(Clone)]
pub struct HttpSummarizeApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSummarizeApi {
    /// * `base_url` - service root, e.g. `https://host`. A trailing slash is dropped.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn submit_upload(&self, upload: &PdfUpload) -> Result<SubmitResponse, ApiError> {
        let part = Part::bytes(upload.bytes.clone())
            .file_name(upload.file_name.clone())
            .mime_str(&upload.content_type)?;
        let form = Form::new().part("file", part);

        let url = format!("{}/api/summarize", self.base_url);
        debug!("POST {} ({} bytes)", url, upload.size());

        let response = self.client.post(url).multipart(form).send().await?;
        Self::parse_response(response).await
    }

    pub async fn fetch_status(&self, job_id: &str) -> Result<StatusResponse, ApiError> {
        let url = format!("{}/api/summarize/{}", self.base_url, job_id);
        debug!("GET {}", url);

        let response = self.client.get(url).send().await?;
        Self::parse_response(response).await
    }

    // ---- private helpers ----

    async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        if !content_type.as_deref().is_some_and(is_json) {
            return Err(ApiError::NonJson {
                status: status.as_u16(),
                content_type,
            });
        }

        let body = response.bytes().await?;

        if !status.is_success() {
            let detail = serde_json::from_slice::<ErrorBody>(&body)
                .ok()
                .and_then(|body| body.detail);
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                detail,
            });
        }

        serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

impl SummarizeApi for HttpSummarizeApi {
    fn submit<'a>(&'a self, upload: &'a PdfUpload) -> ApiFuture<'a, SubmitResponse> {
        Box::pin(self.submit_upload(upload))
    }

    fn job_status<'a>(&'a self, job_id: &'a str) -> ApiFuture<'a, StatusResponse> {
        Box::pin(self.fetch_status(job_id))
    }
}

fn is_json(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("application/json")
}
