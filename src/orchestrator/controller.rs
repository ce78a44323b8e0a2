//! Wizard command loop.
//!
//! Owns request dispatch for the wizard and emits events for presentation layers.

use super::post_process::{build_outcome, process_generation, ProcessedDocument};
use crate::backend::DocumentService;
use crate::error::{RequestFailure, WizardError};
use crate::model::{ClientConfig, GenerateResponse, InfoEvent, UploadResponse, WizardEvent};
use crate::storage;
use crate::wizard::{Advance, WizardController};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::{JoinError, JoinHandle};

/// Commands emitted by UI layers to drive the wizard.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    /// Load the template at this path and upload it.
    UploadTemplate(PathBuf),
    SubmitAnswer(String),
    Revisit(usize),
    StartOver,
    Quit,
}

/// The outstanding backend request, if any. Mirrors the wizard's `submitting` flag.
enum Request {
    Upload(JoinHandle<Result<UploadResponse, RequestFailure>>),
    Generate(JoinHandle<Result<GenerateResponse, RequestFailure>>),
}

impl Request {
    fn abort(&self) {
        match self {
            Request::Upload(h) => h.abort(),
            Request::Generate(h) => h.abort(),
        }
    }
}

enum Finished {
    Upload(Result<UploadResponse, RequestFailure>),
    Generate(Result<GenerateResponse, RequestFailure>),
}

fn join_failure<T>(e: JoinError) -> Result<T, RequestFailure> {
    Err(RequestFailure::new(format!("request task failed: {e}")))
}

fn report(event_tx: &UnboundedSender<WizardEvent>, err: &WizardError) {
    // Request failures are already in the state's error banner.
    if err.is_request_failure() {
        return;
    }
    let info = match err {
        WizardError::Busy => InfoEvent::Busy,
        other => InfoEvent::Message(other.to_string()),
    };
    tracing::debug!(error = %err, "command rejected");
    let _ = event_tx.send(WizardEvent::Info(info));
}

/// Process UI commands against the wizard until `Quit` or the command channel closes.
///
/// Requests run on their own tasks so commands keep flowing while one is
/// outstanding; the wizard's `submitting` flag rejects overlapping submits.
/// Fetch/save after generation runs in a separate slot and never blocks a new
/// upload once the user has started over.
pub(crate) async fn run_controller<S>(
    cfg: &ClientConfig,
    service: Arc<S>,
    wizard: &mut WizardController,
    event_tx: UnboundedSender<WizardEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()>
where
    S: DocumentService + 'static,
{
    let mut request: Option<Request> = None;
    let mut post_process: Option<JoinHandle<ProcessedDocument>> = None;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else {
                    break;
                };
                match cmd {
                    UiCommand::Quit => break,
                    UiCommand::UploadTemplate(_) | UiCommand::SubmitAnswer(_)
                        if wizard.state().submitting =>
                    {
                        report(&event_tx, &WizardError::Busy);
                    }
                    UiCommand::UploadTemplate(path) => {
                        match storage::load_template(&path) {
                            Ok(file) => {
                                if let Err(e) = wizard.select_template(file) {
                                    report(&event_tx, &e);
                                    continue;
                                }
                            }
                            Err(e) => {
                                tracing::warn!(path = %path.display(), error = %format!("{e:#}"), "template rejected");
                                if let Err(e) = wizard.reject_template(format!("{e:#}")) {
                                    report(&event_tx, &e);
                                }
                                continue;
                            }
                        }
                        match wizard.begin_upload() {
                            Ok(template) => {
                                let _ = event_tx.send(WizardEvent::Info(InfoEvent::Uploading {
                                    file_name: template.name.clone(),
                                }));
                                let svc = service.clone();
                                request = Some(Request::Upload(tokio::spawn(async move {
                                    svc.upload(&template).await.map_err(RequestFailure::from)
                                })));
                            }
                            Err(e) => report(&event_tx, &e),
                        }
                    }
                    UiCommand::SubmitAnswer(text) => match wizard.record_answer(text) {
                        Ok(Advance::Next(_)) => {}
                        Ok(Advance::Generate(request_body)) => {
                            let _ = event_tx.send(WizardEvent::Info(InfoEvent::Generating {
                                answers: request_body.answers.len(),
                            }));
                            let svc = service.clone();
                            request = Some(Request::Generate(tokio::spawn(async move {
                                svc.generate(&request_body).await.map_err(RequestFailure::from)
                            })));
                        }
                        Err(e) => report(&event_tx, &e),
                    },
                    UiCommand::Revisit(index) => {
                        if let Err(e) = wizard.revisit_prompt(index) {
                            report(&event_tx, &e);
                        }
                    }
                    UiCommand::StartOver => {
                        if let Err(e) = wizard.start_over() {
                            report(&event_tx, &e);
                        }
                    }
                }
            }
            // Borrow the JoinHandles in place; taking them out here would drop
            // them whenever another branch wins instead.
            finished = async {
                match request.as_mut() {
                    Some(Request::Upload(h)) => {
                        Finished::Upload(h.await.unwrap_or_else(join_failure))
                    }
                    Some(Request::Generate(h)) => {
                        Finished::Generate(h.await.unwrap_or_else(join_failure))
                    }
                    None => futures::future::pending().await,
                }
            } => {
                request = None;
                match finished {
                    Finished::Upload(outcome) => {
                        let _ = wizard.finish_upload(outcome);
                    }
                    Finished::Generate(outcome) => {
                        if wizard.finish_generate(outcome).is_ok() {
                            if let Some(outcome) = build_outcome(cfg, wizard.state()) {
                                if cfg.fetch_document {
                                    let _ = event_tx.send(WizardEvent::Info(InfoEvent::Fetching {
                                        url: outcome.download_url.clone(),
                                    }));
                                }
                                // A newer document supersedes one still being saved.
                                if let Some(stale) = post_process.take() {
                                    stale.abort();
                                }
                                let svc = service.clone();
                                let cfg = cfg.clone();
                                post_process = Some(tokio::spawn(async move {
                                    process_generation(&cfg, svc.as_ref(), outcome).await
                                }));
                            }
                        }
                    }
                }
            }
            processed = async {
                match post_process.as_mut() {
                    Some(h) => h.await,
                    None => futures::future::pending().await,
                }
            } => {
                post_process = None;
                match processed {
                    Ok(processed) => {
                        let _ = event_tx.send(WizardEvent::DocumentReady {
                            outcome: Box::new(processed.outcome),
                            messages: processed.messages,
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "post-processing task failed");
                        let _ = event_tx.send(WizardEvent::Info(InfoEvent::Message(format!(
                            "Post-processing failed: {e}"
                        ))));
                    }
                }
            }
        }
    }

    // Quitting abandons whatever is still running.
    if let Some(task) = request.take() {
        task.abort();
    }
    if let Some(task) = post_process.take() {
        task.abort();
    }
    Ok(())
}
