use crate::model::{Step, WizardEvent, WizardOutcome};
use crate::orchestrator::UiCommand;
use crate::wizard::WizardState;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    style::Color,
    style::Style,
    text::{Line, Span},
};
use std::path::PathBuf;

pub const TAB_WIZARD: usize = 0;
pub const TAB_HELP: usize = 1;

pub struct UiState {
    pub tab: usize,
    /// Text field: the template path during Upload, the answer during Fill.
    pub input: String,
    pub info: String,
    /// Latest snapshot published by the wizard controller.
    pub wizard: WizardState,
    /// Step and prompt index the input field was last loaded for.
    pub loaded_for: (Step, usize),
    pub outcome: Option<WizardOutcome>,
}

/// What the UI loop should do after a key press.
#[derive(Debug)]
pub(crate) enum KeyAction {
    None,
    Quit,
    Command(UiCommand),
    CopyLink(String),
}

impl UiState {
    pub fn new(initial_path: String) -> Self {
        Self {
            tab: TAB_WIZARD,
            input: initial_path,
            info: String::new(),
            wizard: WizardState::default(),
            loaded_for: (Step::Upload, 0),
            outcome: None,
        }
    }

    /// Take a new wizard snapshot, reloading the input when the prompt changed.
    pub fn sync(&mut self, snapshot: WizardState) {
        let now = (snapshot.step, snapshot.current);
        if now != self.loaded_for {
            match snapshot.step {
                Step::Fill => self.input = snapshot.draft.clone(),
                Step::Download => self.input.clear(),
                Step::Upload => {
                    if self.loaded_for.0 == Step::Download {
                        self.input.clear();
                        self.outcome = None;
                        self.info.clear();
                    }
                }
            }
            self.loaded_for = now;
        }
        self.wizard = snapshot;
    }

    pub fn apply_event(&mut self, ev: WizardEvent) {
        match ev {
            WizardEvent::Info(info) => self.info = info.to_message(),
            WizardEvent::DocumentReady { outcome, messages } => {
                // Post-processing outlives Start Over; drop results for an older run.
                let current_run = self.wizard.step == Step::Download
                    && self
                        .wizard
                        .session
                        .as_ref()
                        .is_some_and(|s| s.file_id == outcome.file_id);
                if !current_run {
                    return;
                }
                self.info = if messages.is_empty() {
                    "Document ready".into()
                } else {
                    messages.join("; ")
                };
                self.outcome = Some(*outcome);
            }
        }
    }

    pub(crate) fn on_key(&mut self, key: KeyEvent) -> KeyAction {
        match (key.modifiers, key.code) {
            (_, KeyCode::Esc) | (KeyModifiers::CONTROL, KeyCode::Char('c')) => {
                return KeyAction::Quit
            }
            (_, KeyCode::Tab) => {
                self.tab = (self.tab + 1) % 2;
                return KeyAction::None;
            }
            (_, KeyCode::F(1)) => {
                self.tab = TAB_HELP;
                return KeyAction::None;
            }
            _ => {}
        }
        if self.tab != TAB_WIZARD {
            return KeyAction::None;
        }

        match self.wizard.step {
            Step::Upload | Step::Fill => self.on_form_key(key),
            Step::Download => self.on_download_key(key),
        }
    }

    fn on_form_key(&mut self, key: KeyEvent) -> KeyAction {
        match (key.modifiers, key.code) {
            (_, KeyCode::Enter) => {
                if self.wizard.submitting {
                    self.info = "A request is already in progress.".into();
                    return KeyAction::None;
                }
                match self.wizard.step {
                    Step::Upload => KeyAction::Command(UiCommand::UploadTemplate(PathBuf::from(
                        self.input.trim(),
                    ))),
                    _ => KeyAction::Command(UiCommand::SubmitAnswer(self.input.clone())),
                }
            }
            (_, KeyCode::Up) if self.wizard.step == Step::Fill => {
                if self.wizard.submitting || self.wizard.current == 0 {
                    return KeyAction::None;
                }
                KeyAction::Command(UiCommand::Revisit(self.wizard.current - 1))
            }
            (KeyModifiers::CONTROL, KeyCode::Char('u')) => {
                self.input.clear();
                KeyAction::None
            }
            (KeyModifiers::NONE | KeyModifiers::SHIFT, KeyCode::Char(c)) => {
                self.input.push(c);
                KeyAction::None
            }
            (_, KeyCode::Backspace) => {
                self.input.pop();
                KeyAction::None
            }
            _ => KeyAction::None,
        }
    }

    fn on_download_key(&mut self, key: KeyEvent) -> KeyAction {
        match (key.modifiers, key.code) {
            (_, KeyCode::Char('q')) => KeyAction::Quit,
            (_, KeyCode::Char('n')) => KeyAction::Command(UiCommand::StartOver),
            (_, KeyCode::Char('y')) => match self.wizard.download_url.clone() {
                Some(url) => KeyAction::CopyLink(url),
                None => KeyAction::None,
            },
            _ => KeyAction::None,
        }
    }
}

pub fn push_wrapped_status_kv(
    out: &mut Vec<Line<'static>>,
    label: &str,
    value: &str,
    area_width: u16,
) {
    let value = value.trim();
    if value.is_empty() {
        return;
    }

    // Borders and padding take two columns on each side.
    let usable_width = area_width.saturating_sub(4).max(1);
    let label_text = format!("{label}:");
    let label_width = label_text.chars().count() as u16;

    let value_chars: Vec<char> = value.chars().collect();
    let mut remaining = value_chars.as_slice();
    let mut first = true;

    while !remaining.is_empty() {
        let line_width = if first {
            usable_width.saturating_sub(label_width + 1).max(1)
        } else {
            usable_width.saturating_sub(2).max(1)
        };

        let take = (remaining.len() as u16).min(line_width) as usize;
        let (line_chars, rest) = remaining.split_at(take);
        let line_text: String = line_chars.iter().collect();

        if first {
            out.push(Line::from(vec![
                Span::styled(label_text.clone(), Style::default().fg(Color::Gray)),
                Span::raw(" "),
                Span::styled(line_text, Style::default().fg(Color::Cyan)),
            ]));
            first = false;
        } else {
            out.push(Line::from(vec![
                Span::raw("  "),
                Span::styled(line_text, Style::default().fg(Color::Cyan)),
            ]));
        }

        remaining = rest;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{InfoEvent, Placeholder, Session, UploadResponse};

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn fill_snapshot(values: &[&str], current: usize) -> WizardState {
        let mut session = Session::from_upload(UploadResponse {
            placeholders: values
                .iter()
                .enumerate()
                .map(|(i, _)| Placeholder {
                    key: format!("K{i}"),
                    label: None,
                    prompt: None,
                    value: None,
                })
                .collect(),
            file_id: "f".into(),
        })
        .unwrap();
        for (p, v) in session.prompts.iter_mut().zip(values) {
            p.value = v.to_string();
        }
        WizardState {
            step: Step::Fill,
            draft: session.prompts[current].value.clone(),
            session: Some(session),
            current,
            ..Default::default()
        }
    }

    #[test]
    fn typing_then_enter_uploads_the_path() {
        let mut ui = UiState::new(String::new());
        for c in "a.docx".chars() {
            ui.on_key(key(KeyCode::Char(c)));
        }
        match ui.on_key(key(KeyCode::Enter)) {
            KeyAction::Command(UiCommand::UploadTemplate(p)) => {
                assert_eq!(p, PathBuf::from("a.docx"))
            }
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn input_is_prefilled_when_the_prompt_changes() {
        let mut ui = UiState::new("t.docx".into());
        ui.sync(fill_snapshot(&["", ""], 0));
        assert_eq!(ui.input, "");

        ui.input = "typed".into();
        ui.sync(fill_snapshot(&["typed", "kept"], 1));
        assert_eq!(ui.input, "kept");

        // Same prompt (e.g. generation failed): what the user typed stays.
        ui.input = "edited".into();
        ui.sync(fill_snapshot(&["typed", "kept"], 1));
        assert_eq!(ui.input, "edited");

        ui.sync(fill_snapshot(&["typed", "kept"], 0));
        assert_eq!(ui.input, "typed");
    }

    #[test]
    fn answers_are_submitted_verbatim() {
        let mut ui = UiState::new(String::new());
        ui.sync(fill_snapshot(&["", ""], 0));
        ui.input = "  spaced  ".into();
        match ui.on_key(key(KeyCode::Enter)) {
            KeyAction::Command(UiCommand::SubmitAnswer(a)) => assert_eq!(a, "  spaced  "),
            other => panic!("unexpected action {other:?}"),
        }
    }

    #[test]
    fn enter_is_disabled_while_submitting() {
        let mut ui = UiState::new(String::new());
        let mut snap = fill_snapshot(&["", ""], 1);
        snap.submitting = true;
        ui.sync(snap);

        assert!(matches!(ui.on_key(key(KeyCode::Enter)), KeyAction::None));
        assert!(matches!(ui.on_key(key(KeyCode::Up)), KeyAction::None));
        assert!(!ui.info.is_empty());
    }

    #[test]
    fn up_revisits_the_previous_prompt() {
        let mut ui = UiState::new(String::new());
        ui.sync(fill_snapshot(&["a", "b", "c"], 2));
        assert!(matches!(
            ui.on_key(key(KeyCode::Up)),
            KeyAction::Command(UiCommand::Revisit(1))
        ));

        ui.sync(fill_snapshot(&["a", "b", "c"], 0));
        assert!(matches!(ui.on_key(key(KeyCode::Up)), KeyAction::None));
    }

    #[test]
    fn download_step_keys() {
        let mut ui = UiState::new(String::new());
        ui.sync(WizardState {
            step: Step::Download,
            download_url: Some("https://x/doc.docx".into()),
            ..Default::default()
        });

        match ui.on_key(key(KeyCode::Char('y'))) {
            KeyAction::CopyLink(url) => assert_eq!(url, "https://x/doc.docx"),
            other => panic!("unexpected action {other:?}"),
        }
        assert!(matches!(
            ui.on_key(key(KeyCode::Char('n'))),
            KeyAction::Command(UiCommand::StartOver)
        ));
        assert!(matches!(ui.on_key(key(KeyCode::Char('q'))), KeyAction::Quit));
    }

    #[test]
    fn start_over_clears_the_finished_run() {
        let mut ui = UiState::new(String::new());
        ui.sync(WizardState {
            step: Step::Download,
            download_url: Some("https://x/doc.docx".into()),
            ..Default::default()
        });
        ui.apply_event(WizardEvent::Info(InfoEvent::Message("Saved: x".into())));
        ui.sync(WizardState::default());

        assert!(ui.input.is_empty());
        assert!(ui.info.is_empty());
        assert!(ui.outcome.is_none());
    }

    fn download_snapshot(file_id: &str) -> WizardState {
        let mut state = fill_snapshot(&["Alice"], 0);
        state.step = Step::Download;
        if let Some(session) = state.session.as_mut() {
            session.file_id = file_id.into();
        }
        state.download_url = Some("https://x/doc.docx".into());
        state
    }

    fn document_ready(file_id: &str) -> WizardEvent {
        WizardEvent::DocumentReady {
            outcome: Box::new(WizardOutcome {
                generated_at_utc: "2024-01-01T00:00:00Z".into(),
                base_url: "http://127.0.0.1:5000".into(),
                template: Some("offer.docx".into()),
                file_id: file_id.into(),
                answers: Default::default(),
                download_url: "https://x/doc.docx".into(),
                saved_to: None,
            }),
            messages: vec!["Saved: offer-filled.docx".into()],
        }
    }

    #[test]
    fn document_ready_fills_in_the_current_run() {
        let mut ui = UiState::new(String::new());
        ui.sync(download_snapshot("f"));
        ui.apply_event(document_ready("f"));
        assert_eq!(ui.info, "Saved: offer-filled.docx");
        assert!(ui.outcome.is_some());
    }

    #[test]
    fn late_document_from_an_earlier_run_is_ignored() {
        let mut ui = UiState::new(String::new());
        ui.sync(download_snapshot("f"));
        ui.sync(WizardState::default());
        ui.apply_event(document_ready("f"));
        assert!(ui.info.is_empty());
        assert!(ui.outcome.is_none());

        // The next run has reached Download under a different session.
        ui.sync(download_snapshot("g"));
        ui.apply_event(document_ready("f"));
        assert!(ui.outcome.is_none());
    }

    #[test]
    fn help_tab_swallows_form_keys() {
        let mut ui = UiState::new(String::new());
        ui.on_key(key(KeyCode::Tab));
        assert_eq!(ui.tab, TAB_HELP);
        ui.on_key(key(KeyCode::Char('x')));
        assert!(ui.input.is_empty());
        assert!(matches!(ui.on_key(key(KeyCode::Esc)), KeyAction::Quit));
    }

    #[test]
    fn wraps_long_values() {
        let mut out = Vec::new();
        push_wrapped_status_kv(&mut out, "Link", &"x".repeat(50), 24);
        assert!(out.len() > 1);
        push_wrapped_status_kv(&mut out, "Empty", "   ", 24);
        assert!(out.len() > 1);
    }
}
