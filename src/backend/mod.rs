//! Document generation backend.
//!
//! The wizard only talks to the service through [`DocumentService`]; the HTTP
//! implementation lives in [`http`].

mod http;

pub use http::HttpBackend;

use crate::model::{GenerateRequest, GenerateResponse, TemplateFile, UploadResponse};
use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

#[async_trait]
pub trait DocumentService: Send + Sync {
    /// `POST /upload`: extract placeholders from the template and open a session.
    async fn upload(&self, template: &TemplateFile) -> Result<UploadResponse>;

    /// `POST /generate`: fill the session's template with the answers.
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse>;

    /// Download the generated document from the location `generate` returned.
    async fn fetch_document(&self, download_url: &str) -> Result<Bytes>;
}
