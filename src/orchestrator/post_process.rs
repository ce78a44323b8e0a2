//! Post-generation processing.
//!
//! Fetches the generated document, saves it locally and writes the optional
//! JSON export once the wizard has reached the download step.

use crate::backend::DocumentService;
use crate::model::{ClientConfig, Step, WizardOutcome};
use crate::storage;
use crate::wizard::WizardState;

/// Result of post-generation processing, ready for presentation layers.
#[derive(Debug)]
pub(crate) struct ProcessedDocument {
    pub outcome: WizardOutcome,
    pub messages: Vec<String>,
}

/// Snapshot the finished session as an outcome. `None` unless the wizard is in Download.
pub(crate) fn build_outcome(cfg: &ClientConfig, state: &WizardState) -> Option<WizardOutcome> {
    if state.step != Step::Download {
        return None;
    }
    let session = state.session.as_ref()?;
    let download_url = state.download_url.clone()?;
    Some(WizardOutcome {
        generated_at_utc: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "now".into()),
        base_url: cfg.base_url.clone(),
        template: state.template.as_ref().map(|t| t.name.clone()),
        file_id: session.file_id.clone(),
        answers: session.answers(),
        download_url,
        saved_to: None,
    })
}

/// Fetch + save (when enabled) and export (when configured).
///
/// Failures become messages; the download link stays usable either way.
pub(crate) async fn process_generation<S>(
    cfg: &ClientConfig,
    service: &S,
    mut outcome: WizardOutcome,
) -> ProcessedDocument
where
    S: DocumentService + ?Sized,
{
    let mut messages = Vec::new();

    if cfg.fetch_document {
        match service.fetch_document(&outcome.download_url).await {
            Ok(bytes) => {
                let stem = outcome
                    .template
                    .as_deref()
                    .and_then(|t| std::path::Path::new(t).file_stem())
                    .and_then(|s| s.to_str())
                    .unwrap_or("document");
                let name = storage::document_file_name(stem, &outcome.file_id);
                match storage::save_document(&cfg.output_dir, &name, &bytes) {
                    Ok(path) => {
                        tracing::info!(path = %path.display(), bytes = bytes.len(), "document saved");
                        messages.push(format!("Saved: {}", path.display()));
                        outcome.saved_to = Some(path);
                    }
                    Err(e) => {
                        tracing::warn!(error = %format!("{e:#}"), "saving document failed");
                        messages.push(format!("Save failed: {e:#}"));
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), url = %outcome.download_url, "fetching document failed");
                messages.push(format!("Fetch failed: {e:#}"));
            }
        }
    }

    if let Some(export_path) = cfg.export_json.as_deref() {
        match storage::export_json(export_path, &outcome) {
            Ok(()) => messages.push(format!("Exported JSON: {}", export_path.display())),
            Err(e) => messages.push(format!("Export JSON failed: {e:#}")),
        }
    }

    ProcessedDocument { outcome, messages }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TemplateFile;
    use crate::testing::{placeholders, ScriptedService};
    use crate::wizard::WizardController;
    use std::path::Path;

    fn config(out: &Path, fetch: bool, export: Option<std::path::PathBuf>) -> ClientConfig {
        ClientConfig {
            base_url: "http://127.0.0.1:5000".into(),
            user_agent: "docfill-test".into(),
            request_timeout: None,
            fetch_document: fetch,
            output_dir: out.to_path_buf(),
            export_json: export,
        }
    }

    async fn finished(service: &ScriptedService) -> WizardController {
        let mut w = WizardController::new();
        w.select_template(TemplateFile::new("offer.docx", &b"PK"[..]))
            .unwrap();
        w.submit_template(service).await.unwrap();
        w.submit_current_answer(service, "Alice".into())
            .await
            .unwrap();
        w
    }

    #[tokio::test]
    async fn outcome_only_exists_after_download() {
        let service = ScriptedService::new(placeholders(&[("NAME", "Name?")]));
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), false, None);

        assert!(build_outcome(&cfg, WizardController::new().state()).is_none());

        let w = finished(&service).await;
        let outcome = build_outcome(&cfg, w.state()).unwrap();
        assert_eq!(outcome.file_id, service.file_id());
        assert_eq!(outcome.template.as_deref(), Some("offer.docx"));
        assert_eq!(outcome.answers["NAME"], "Alice");
    }

    #[tokio::test]
    async fn fetches_saves_and_exports() {
        let service = ScriptedService::new(placeholders(&[("NAME", "Name?")]));
        let dir = tempfile::tempdir().unwrap();
        let export = dir.path().join("outcome.json");
        let cfg = config(&dir.path().join("docs"), true, Some(export.clone()));

        let w = finished(&service).await;
        let outcome = build_outcome(&cfg, w.state()).unwrap();
        let processed = process_generation(&cfg, &service, outcome).await;

        let saved = processed.outcome.saved_to.clone().unwrap();
        assert!(saved.starts_with(dir.path().join("docs")));
        assert!(saved
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("offer-filled-"));
        assert_eq!(std::fs::read(&saved).unwrap(), service.document().to_vec());
        assert_eq!(service.fetched().len(), 1);
        assert_eq!(processed.messages.len(), 2);

        let exported: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&export).unwrap()).unwrap();
        assert_eq!(exported["answers"]["NAME"], "Alice");
        assert!(exported["savedTo"].is_string());
    }

    #[tokio::test]
    async fn fetch_failure_is_reported_not_fatal() {
        let service = ScriptedService::new(placeholders(&[("NAME", "Name?")]));
        service.fail_fetches(true);
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), true, None);

        let w = finished(&service).await;
        let outcome = build_outcome(&cfg, w.state()).unwrap();
        let processed = process_generation(&cfg, &service, outcome).await;

        assert!(processed.outcome.saved_to.is_none());
        assert_eq!(processed.messages.len(), 1);
        assert!(processed.messages[0].starts_with("Fetch failed"));
    }

    #[tokio::test]
    async fn fetching_disabled_skips_the_download() {
        let service = ScriptedService::new(placeholders(&[("NAME", "Name?")]));
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path(), false, None);

        let w = finished(&service).await;
        let outcome = build_outcome(&cfg, w.state()).unwrap();
        let processed = process_generation(&cfg, &service, outcome).await;

        assert!(processed.messages.is_empty());
        assert!(service.fetched().is_empty());
    }
}
