use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// MIME type sent with the template upload.
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    pub user_agent: String,
    #[serde(default, with = "humantime_serde")]
    pub request_timeout: Option<Duration>,
    pub fetch_document: bool,
    pub output_dir: PathBuf,
    #[serde(default)]
    pub export_json: Option<PathBuf>,
}

/// The three wizard steps, in the only order they can be visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Step {
    Upload,
    Fill,
    Download,
}

impl Step {
    pub fn as_str(self) -> &'static str {
        match self {
            Step::Upload => "upload",
            Step::Fill => "fill",
            Step::Download => "download",
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A template picked by the user. `Bytes` keeps snapshot clones cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFile {
    pub name: String,
    pub bytes: Bytes,
}

impl TemplateFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Placeholder entry as returned by `POST /upload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Placeholder {
    pub key: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub placeholders: Vec<Placeholder>,
    pub file_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub file_id: String,
    pub answers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub download_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub key: String,
    pub label: String,
    pub text: String,
    pub value: String,
}

impl Prompt {
    pub fn from_placeholder(p: Placeholder) -> Self {
        let label = p
            .label
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| label_for_key(&p.key));
        let text = p
            .prompt
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| format!("Please enter the {label}:"));
        Self {
            key: p.key,
            label,
            text,
            value: p.value.unwrap_or_default(),
        }
    }
}

/// `COMPANY_NAME` -> `Company Name`.
pub fn label_for_key(key: &str) -> String {
    key.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(|c| c.to_lowercase()))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Server-issued session plus the prompts collected against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub file_id: String,
    pub prompts: Vec<Prompt>,
}

impl Session {
    /// Build a session from an upload response.
    ///
    /// Rejects payloads that cannot drive the fill step: no placeholders,
    /// blank or duplicate keys, or a blank file id.
    pub fn from_upload(resp: UploadResponse) -> Result<Self, String> {
        if resp.file_id.trim().is_empty() {
            return Err("upload response carried an empty fileId".into());
        }
        if resp.placeholders.is_empty() {
            return Err("template has no placeholders".into());
        }
        let mut seen = std::collections::HashSet::new();
        for p in &resp.placeholders {
            if p.key.is_empty() {
                return Err("placeholder with an empty key".into());
            }
            if !seen.insert(p.key.as_str()) {
                return Err(format!("duplicate placeholder key {:?}", p.key));
            }
        }
        Ok(Self {
            file_id: resp.file_id,
            prompts: resp
                .placeholders
                .into_iter()
                .map(Prompt::from_placeholder)
                .collect(),
        })
    }

    /// Project the prompts into the answers mapping sent to `/generate`.
    pub fn answers(&self) -> BTreeMap<String, String> {
        self.prompts
            .iter()
            .map(|p| (p.key.clone(), p.value.clone()))
            .collect()
    }

    pub fn generate_request(&self) -> GenerateRequest {
        GenerateRequest {
            file_id: self.file_id.clone(),
            answers: self.answers(),
        }
    }
}

/// Final result of a completed wizard run, as printed in JSON mode and exported.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardOutcome {
    pub generated_at_utc: String,
    pub base_url: String,
    pub template: Option<String>,
    pub file_id: String,
    pub answers: BTreeMap<String, String>,
    pub download_url: String,
    #[serde(default)]
    pub saved_to: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub enum WizardEvent {
    Info(InfoEvent),
    DocumentReady {
        // Boxed to keep the event small.
        outcome: Box<WizardOutcome>,
        messages: Vec<String>,
    },
}

/// Structured info events emitted by the orchestrator and consumed by UI/CLI layers.
#[derive(Debug, Clone)]
pub enum InfoEvent {
    Message(String),
    Uploading { file_name: String },
    Generating { answers: usize },
    Fetching { url: String },
    Busy,
}

impl InfoEvent {
    pub fn to_message(&self) -> String {
        match self {
            InfoEvent::Message(msg) => msg.clone(),
            InfoEvent::Uploading { file_name } => format!("Uploading {file_name}…"),
            InfoEvent::Generating { answers } => {
                format!("Generating document from {answers} answer(s)…")
            }
            InfoEvent::Fetching { url } => format!("Fetching {url}…"),
            InfoEvent::Busy => "A request is already in progress.".to_string(),
        }
    }
}
