//! In-memory document service for controller and orchestrator tests.

use crate::backend::DocumentService;
use crate::model::{GenerateRequest, GenerateResponse, Placeholder, TemplateFile, UploadResponse};
use anyhow::{bail, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

pub fn placeholders(pairs: &[(&str, &str)]) -> Vec<Placeholder> {
    pairs
        .iter()
        .map(|(key, prompt)| Placeholder {
            key: key.to_string(),
            label: None,
            prompt: Some(prompt.to_string()),
            value: Some(String::new()),
        })
        .collect()
}

pub struct ScriptedService {
    placeholders: Vec<Placeholder>,
    file_id: String,
    download_url: String,
    document: Bytes,
    fail_uploads: AtomicBool,
    fail_generates: AtomicBool,
    fail_fetches: AtomicBool,
    hang_fetches: AtomicBool,
    uploads: Mutex<Vec<String>>,
    generated: Mutex<Vec<GenerateRequest>>,
    fetched: Mutex<Vec<String>>,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedService {
    pub fn new(placeholders: Vec<Placeholder>) -> Self {
        Self {
            placeholders,
            file_id: "4f1c9a2e-0000-4000-8000-000000000001".into(),
            download_url: "http://127.0.0.1:5000/download/4f1c9a2e".into(),
            document: Bytes::from_static(b"PK\x03\x04filled"),
            fail_uploads: AtomicBool::new(false),
            fail_generates: AtomicBool::new(false),
            fail_fetches: AtomicBool::new(false),
            hang_fetches: AtomicBool::new(false),
            uploads: Mutex::new(Vec::new()),
            generated: Mutex::new(Vec::new()),
            fetched: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    pub fn with_download_url(mut self, url: &str) -> Self {
        self.download_url = url.to_string();
        self
    }

    /// Every request waits for a permit on the returned semaphore before answering.
    pub fn gated(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.gate = Some(gate.clone());
        (self, gate)
    }

    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_generates(&self, fail: bool) {
        self.fail_generates.store(fail, Ordering::SeqCst);
    }

    pub fn fail_fetches(&self, fail: bool) {
        self.fail_fetches.store(fail, Ordering::SeqCst);
    }

    /// Document fetches never resolve.
    pub fn hang_fetches(&self, hang: bool) {
        self.hang_fetches.store(hang, Ordering::SeqCst);
    }

    pub fn file_id(&self) -> &str {
        &self.file_id
    }

    pub fn document(&self) -> &Bytes {
        &self.document
    }

    pub fn uploads(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn generated(&self) -> Vec<GenerateRequest> {
        self.generated.lock().unwrap().clone()
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }

    async fn pass_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
    }
}

#[async_trait]
impl DocumentService for ScriptedService {
    async fn upload(&self, template: &TemplateFile) -> Result<UploadResponse> {
        self.uploads.lock().unwrap().push(template.name.clone());
        self.pass_gate().await;
        if self.fail_uploads.load(Ordering::SeqCst) {
            bail!("connection refused");
        }
        Ok(UploadResponse {
            placeholders: self.placeholders.clone(),
            file_id: self.file_id.clone(),
        })
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        self.generated.lock().unwrap().push(request.clone());
        self.pass_gate().await;
        if self.fail_generates.load(Ordering::SeqCst) {
            bail!("500 Internal Server Error");
        }
        Ok(GenerateResponse {
            download_url: self.download_url.clone(),
        })
    }

    async fn fetch_document(&self, download_url: &str) -> Result<Bytes> {
        self.fetched.lock().unwrap().push(download_url.to_string());
        if self.hang_fetches.load(Ordering::SeqCst) {
            futures::future::pending::<()>().await;
        }
        if self.fail_fetches.load(Ordering::SeqCst) {
            bail!("404 Not Found");
        }
        Ok(self.document.clone())
    }
}
