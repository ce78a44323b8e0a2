//! Upload -> Fill -> Download state machine.
//!
//! [`WizardController`] is the only owner of [`WizardState`]. Every transition
//! goes through one of its methods and republishes a snapshot on a
//! `tokio::sync::watch` channel that presentation layers subscribe to.
//!
//! Network operations come in two shapes: the `begin_*`/`finish_*` pairs used
//! by the orchestrator, which runs the request on its own task while it keeps
//! receiving UI commands, and the `submit_*` helpers that await the service
//! inline for the text and JSON front ends.

use crate::backend::DocumentService;
use crate::error::{
    RequestFailure, WizardError, GENERATION_FAILED_MESSAGE, NO_TEMPLATE_MESSAGE,
    UPLOAD_FAILED_MESSAGE,
};
use crate::model::{
    GenerateRequest, GenerateResponse, Prompt, Session, Step, TemplateFile, UploadResponse,
};
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardState {
    pub step: Step,
    pub template: Option<TemplateFile>,
    pub session: Option<Session>,
    /// Index of the current prompt; only meaningful during Fill.
    pub current: usize,
    /// Value to pre-fill the answer field with for the current prompt.
    pub draft: String,
    pub download_url: Option<String>,
    /// Banner text for the last failure, cleared by the next successful transition.
    pub error: Option<String>,
    /// Set while an upload or generate request is outstanding.
    pub submitting: bool,
}

impl Default for WizardState {
    fn default() -> Self {
        Self {
            step: Step::Upload,
            template: None,
            session: None,
            current: 0,
            draft: String::new(),
            download_url: None,
            error: None,
            submitting: false,
        }
    }
}

impl WizardState {
    pub fn current_prompt(&self) -> Option<&Prompt> {
        match self.step {
            Step::Fill => self.session.as_ref()?.prompts.get(self.current),
            _ => None,
        }
    }

    pub fn prompt_count(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.prompts.len())
    }

    pub fn is_last_prompt(&self) -> bool {
        let n = self.prompt_count();
        n > 0 && self.current + 1 == n
    }
}

/// What recording an answer led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Moved on to the prompt at this index.
    Next(usize),
    /// Last prompt answered; this request must be sent to the generate endpoint.
    Generate(GenerateRequest),
}

pub struct WizardController {
    state: WizardState,
    tx: watch::Sender<WizardState>,
}

impl Default for WizardController {
    fn default() -> Self {
        Self::new()
    }
}

impl WizardController {
    pub fn new() -> Self {
        let state = WizardState::default();
        let (tx, _rx) = watch::channel(state.clone());
        Self { state, tx }
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn subscribe(&self) -> watch::Receiver<WizardState> {
        self.tx.subscribe()
    }

    fn publish(&self) {
        self.tx.send_replace(self.state.clone());
    }

    fn ensure_idle(&self) -> Result<(), WizardError> {
        if self.state.submitting {
            return Err(WizardError::Busy);
        }
        Ok(())
    }

    fn ensure_step(&self, step: Step, action: &'static str) -> Result<(), WizardError> {
        if self.state.step != step {
            return Err(WizardError::WrongStep {
                action,
                step: self.state.step,
            });
        }
        Ok(())
    }

    pub fn select_template(&mut self, file: TemplateFile) -> Result<(), WizardError> {
        self.ensure_idle()?;
        self.ensure_step(Step::Upload, "select a template")?;
        tracing::debug!(file = %file.name, bytes = file.bytes.len(), "template selected");
        self.state.template = Some(file);
        self.state.error = None;
        self.publish();
        Ok(())
    }

    /// Drop the selected template and show why it could not be used.
    pub fn reject_template(&mut self, reason: String) -> Result<(), WizardError> {
        self.ensure_idle()?;
        self.ensure_step(Step::Upload, "select a template")?;
        self.state.template = None;
        self.state.error = Some(reason);
        self.publish();
        Ok(())
    }

    /// Mark the upload as in flight and hand back the template to send.
    pub fn begin_upload(&mut self) -> Result<TemplateFile, WizardError> {
        self.ensure_idle()?;
        self.ensure_step(Step::Upload, "upload a template")?;
        let Some(template) = self.state.template.clone() else {
            self.state.error = Some(NO_TEMPLATE_MESSAGE.to_string());
            self.publish();
            return Err(WizardError::NoTemplate);
        };
        self.state.submitting = true;
        self.publish();
        Ok(template)
    }

    /// Apply the outcome of the upload started by [`Self::begin_upload`].
    pub fn finish_upload(
        &mut self,
        outcome: Result<UploadResponse, RequestFailure>,
    ) -> Result<(), WizardError> {
        self.state.submitting = false;
        let session =
            outcome.and_then(|resp| Session::from_upload(resp).map_err(RequestFailure::new));
        match session {
            Ok(session) => {
                tracing::info!(
                    file_id = %session.file_id,
                    prompts = session.prompts.len(),
                    "template uploaded"
                );
                self.state.draft = session.prompts[0].value.clone();
                self.state.session = Some(session);
                self.state.current = 0;
                self.state.error = None;
                self.state.step = Step::Fill;
                self.publish();
                Ok(())
            }
            Err(failure) => {
                tracing::error!(error = %failure, "upload failed");
                self.state.error = Some(UPLOAD_FAILED_MESSAGE.to_string());
                self.publish();
                Err(WizardError::Upload(failure))
            }
        }
    }

    /// Record `text` for the current prompt and move on.
    ///
    /// The value is stored verbatim, empty strings included. On the last
    /// prompt the wizard enters the submitting state and returns the request
    /// for the generate endpoint.
    pub fn record_answer(&mut self, text: String) -> Result<Advance, WizardError> {
        self.ensure_idle()?;
        self.ensure_step(Step::Fill, "answer a prompt")?;
        let current = self.state.current;
        let Some(session) = self.state.session.as_mut() else {
            return Err(WizardError::WrongStep {
                action: "answer a prompt",
                step: self.state.step,
            });
        };
        let Some(prompt) = session.prompts.get_mut(current) else {
            return Err(WizardError::InvalidPrompt {
                index: current,
                current,
            });
        };
        prompt.value = text;

        if current + 1 < session.prompts.len() {
            let next = current + 1;
            self.state.draft = session.prompts[next].value.clone();
            self.state.current = next;
            self.publish();
            return Ok(Advance::Next(next));
        }

        let request = session.generate_request();
        self.state.draft = session.prompts[current].value.clone();
        self.state.submitting = true;
        self.publish();
        Ok(Advance::Generate(request))
    }

    /// Apply the outcome of the generate call issued after the last answer.
    pub fn finish_generate(
        &mut self,
        outcome: Result<GenerateResponse, RequestFailure>,
    ) -> Result<(), WizardError> {
        self.state.submitting = false;
        match outcome {
            Ok(resp) => {
                tracing::info!(download_url = %resp.download_url, "document generated");
                self.state.download_url = Some(resp.download_url);
                self.state.error = None;
                self.state.step = Step::Download;
                self.publish();
                Ok(())
            }
            Err(failure) => {
                tracing::error!(error = %failure, "document generation failed");
                self.state.error = Some(GENERATION_FAILED_MESSAGE.to_string());
                self.publish();
                Err(WizardError::Generation(failure))
            }
        }
    }

    /// Go back to an earlier prompt of the session, pre-filling its recorded value.
    pub fn revisit_prompt(&mut self, index: usize) -> Result<(), WizardError> {
        self.ensure_idle()?;
        self.ensure_step(Step::Fill, "revisit a prompt")?;
        let current = self.state.current;
        let Some(prompt) = self
            .state
            .session
            .as_ref()
            .and_then(|s| s.prompts.get(index))
            .filter(|_| index <= current)
        else {
            return Err(WizardError::InvalidPrompt { index, current });
        };
        self.state.draft = prompt.value.clone();
        self.state.current = index;
        self.publish();
        Ok(())
    }

    /// Discard the finished session and return to an empty upload step.
    pub fn start_over(&mut self) -> Result<(), WizardError> {
        self.ensure_idle()?;
        self.ensure_step(Step::Download, "start over")?;
        self.state = WizardState::default();
        self.publish();
        Ok(())
    }

    /// Upload the selected template and wait for the response.
    pub async fn submit_template<S>(&mut self, service: &S) -> Result<(), WizardError>
    where
        S: DocumentService + ?Sized,
    {
        let template = self.begin_upload()?;
        let outcome = service
            .upload(&template)
            .await
            .map_err(RequestFailure::from);
        self.finish_upload(outcome)
    }

    /// Record an answer; on the last prompt also run the generate call.
    pub async fn submit_current_answer<S>(
        &mut self,
        service: &S,
        text: String,
    ) -> Result<Step, WizardError>
    where
        S: DocumentService + ?Sized,
    {
        match self.record_answer(text)? {
            Advance::Next(_) => Ok(self.state.step),
            Advance::Generate(request) => {
                let outcome = service
                    .generate(&request)
                    .await
                    .map_err(RequestFailure::from);
                self.finish_generate(outcome)?;
                Ok(self.state.step)
            }
        }
    }
}
