use super::DocumentService;
use crate::model::{
    ClientConfig, GenerateRequest, GenerateResponse, TemplateFile, UploadResponse, DOCX_MIME,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use reqwest::{multipart, Url};

#[derive(Clone)]
pub struct HttpBackend {
    pub http: reqwest::Client,
    pub base_url: Url,
}

impl HttpBackend {
    pub fn new(cfg: &ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(cfg.user_agent.clone());
        if let Some(timeout) = cfg.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("build http client")?;

        // A trailing slash makes `join` append to the base path instead of replacing its last segment.
        let mut base = cfg.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).with_context(|| format!("invalid base url {base:?}"))?;

        Ok(Self { http, base_url })
    }

    pub fn upload_url(&self) -> Result<Url> {
        self.base_url.join("upload").context("build upload url")
    }

    pub fn generate_url(&self) -> Result<Url> {
        self.base_url.join("generate").context("build generate url")
    }

    /// Resolve a download location; absolute URLs pass through, relative ones hang off the base.
    pub fn resolve(&self, location: &str) -> Result<Url> {
        self.base_url
            .join(location)
            .with_context(|| format!("invalid download url {location:?}"))
    }
}

#[async_trait]
impl DocumentService for HttpBackend {
    async fn upload(&self, template: &TemplateFile) -> Result<UploadResponse> {
        let part = multipart::Part::bytes(template.bytes.to_vec())
            .file_name(template.name.clone())
            .mime_str(DOCX_MIME)
            .context("build multipart part")?;
        let form = multipart::Form::new().part("file", part);

        let url = self.upload_url()?;
        tracing::debug!(%url, file = %template.name, bytes = template.bytes.len(), "uploading template");
        let resp = self
            .http
            .post(url)
            .multipart(form)
            .send()
            .await
            .context("upload request failed")?
            .error_for_status()
            .context("upload rejected by server")?;

        resp.json::<UploadResponse>()
            .await
            .context("decode upload response")
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        let url = self.generate_url()?;
        tracing::debug!(%url, file_id = %request.file_id, answers = request.answers.len(), "requesting generation");
        let resp = self
            .http
            .post(url)
            .json(request)
            .send()
            .await
            .context("generate request failed")?
            .error_for_status()
            .context("generation rejected by server")?;

        resp.json::<GenerateResponse>()
            .await
            .context("decode generate response")
    }

    async fn fetch_document(&self, download_url: &str) -> Result<Bytes> {
        let url = self.resolve(download_url)?;
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .context("download request failed")?
            .error_for_status()
            .context("download rejected by server")?;

        let mut body = BytesMut::new();
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            body.extend_from_slice(&chunk.context("read download body")?);
        }
        Ok(body.freeze())
    }
}
