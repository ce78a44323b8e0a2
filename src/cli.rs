use crate::backend::{DocumentService, HttpBackend};
use crate::model::{ClientConfig, Step};
use crate::orchestrator::{self, ProcessedDocument};
use crate::storage;
use crate::wizard::WizardController;
use anyhow::{bail, Context, Result};
use clap::Parser;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::mpsc;

/// Service location baked in at build time, for packaged builds.
const DEFAULT_BASE_URL: &str = match option_env!("DOCFILL_API_URL") {
    Some(url) => url,
    None => "http://127.0.0.1:5000",
};

/// Output line routing for stdout/stderr writer.
pub(crate) enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "docfill",
    version,
    about = "Fill .docx templates through a document generation service"
)]
pub struct Cli {
    /// Base URL of the document generation service
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Template to upload on start (.docx)
    #[arg(long)]
    pub template: Option<PathBuf>,

    /// Prompt on stdin/stdout instead of running the TUI
    #[arg(long, conflicts_with = "json")]
    pub text: bool,

    /// Answer from --answers without prompting and print the outcome as JSON
    #[arg(long)]
    pub json: bool,

    /// JSON object mapping placeholder keys to answers (only with --json)
    #[arg(long)]
    pub answers: Option<PathBuf>,

    /// Use --fetch true or --fetch false to override saving the generated document
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub fetch: bool,

    /// Where fetched documents are saved (defaults to the Downloads directory)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Export the outcome as JSON
    #[arg(long)]
    pub export_json: Option<PathBuf>,

    /// Per-request timeout, e.g. 30s (no timeout when unset)
    #[arg(long)]
    pub timeout: Option<humantime::Duration>,

    /// Append logs to this file; the TUI logs nowhere else
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Write logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}

fn validate(args: &Cli) -> Result<()> {
    if args.answers.is_some() && !args.json {
        bail!("--answers can only be used with --json. Use --json --answers <FILE> together.");
    }
    if args.json && (args.template.is_none() || args.answers.is_none()) {
        bail!("--json needs both --template and --answers.");
    }
    Ok(())
}

pub async fn run(args: Cli) -> Result<()> {
    validate(&args)?;

    if args.json {
        return run_json(args).await;
    }

    if !args.text {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_text(args).await;
        }
    }

    run_text(args).await
}

/// Build a `ClientConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> ClientConfig {
    ClientConfig {
        base_url: args.base_url.clone(),
        user_agent: format!("docfill/{}", env!("CARGO_PKG_VERSION")),
        request_timeout: args.timeout.map(Duration::from),
        fetch_document: args.fetch,
        output_dir: args
            .output_dir
            .clone()
            .unwrap_or_else(storage::default_output_dir),
        export_json: args.export_json.clone(),
    }
}

async fn run_json(args: Cli) -> Result<()> {
    let (Some(template), Some(answers_path)) = (args.template.as_deref(), args.answers.as_deref())
    else {
        bail!("--json needs both --template and --answers.");
    };
    let cfg = build_config(&args);
    let service = HttpBackend::new(&cfg)?;
    let answers = storage::load_answers(answers_path)?;

    let processed = run_scripted(&cfg, &service, template, &answers).await?;

    let (out_tx, out_handle) = spawn_output_writer();
    for msg in processed.messages {
        let _ = out_tx.send(OutputLine::Stderr(msg));
    }
    let out = serde_json::to_string_pretty(&processed.outcome)?;
    let _ = out_tx.send(OutputLine::Stdout(out));
    drop(out_tx);
    let _ = out_handle.await;
    Ok(())
}

/// Drive the whole wizard without prompting, answering from `answers`.
///
/// Prompts without an entry are answered with an empty string.
pub(crate) async fn run_scripted<S>(
    cfg: &ClientConfig,
    service: &S,
    template: &Path,
    answers: &BTreeMap<String, String>,
) -> Result<ProcessedDocument>
where
    S: DocumentService + ?Sized,
{
    let mut wizard = WizardController::new();
    wizard.select_template(storage::load_template(template)?)?;
    wizard.submit_template(service).await?;

    if let Some(session) = wizard.state().session.as_ref() {
        for key in answers.keys() {
            if !session.prompts.iter().any(|p| &p.key == key) {
                tracing::warn!(key = %key, "answer does not match any placeholder");
            }
        }
    }

    while wizard.state().step == Step::Fill {
        let key = wizard
            .state()
            .current_prompt()
            .map(|p| p.key.clone())
            .context("no prompt to answer")?;
        let answer = match answers.get(&key) {
            Some(value) => value.clone(),
            None => {
                tracing::warn!(key = %key, "no answer given, using an empty string");
                String::new()
            }
        };
        wizard.submit_current_answer(service, answer).await?;
    }

    let outcome = orchestrator::build_outcome(cfg, wizard.state())
        .context("wizard finished without a download link")?;
    Ok(orchestrator::process_generation(cfg, service, outcome).await)
}

async fn run_text(args: Cli) -> Result<()> {
    let cfg = build_config(&args);
    let service = HttpBackend::new(&cfg)?;
    let (out_tx, out_handle) = spawn_output_writer();
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    let res = run_text_session(&cfg, &service, args.template.clone(), &mut input, &out_tx).await;

    if let Ok(processed) = &res {
        for msg in &processed.messages {
            let _ = out_tx.send(OutputLine::Stderr(msg.clone()));
        }
        let summary = crate::text_summary::build_text_summary(&processed.outcome);
        let _ = out_tx.send(OutputLine::Stdout(String::new()));
        let _ = out_tx.send(OutputLine::Stdout("3. Download Your Document".into()));
        for line in summary.lines {
            let _ = out_tx.send(OutputLine::Stdout(line));
        }
    }
    drop(out_tx);
    let _ = out_handle.await;
    res.map(|_| ())
}

/// Interactive wizard over line-based input.
///
/// The template path is asked for until an upload succeeds. Each question is
/// shown with its position; an empty line keeps a pre-filled answer. When
/// generation fails the last question is asked again.
pub(crate) async fn run_text_session<S, R>(
    cfg: &ClientConfig,
    service: &S,
    mut template: Option<PathBuf>,
    input: &mut Lines<R>,
    out: &mpsc::UnboundedSender<OutputLine>,
) -> Result<ProcessedDocument>
where
    S: DocumentService + ?Sized,
    R: AsyncBufRead + Unpin,
{
    let say = |line: String| {
        let _ = out.send(OutputLine::Stdout(line));
    };
    let note = |line: String| {
        let _ = out.send(OutputLine::Stderr(line));
    };
    let mut wizard = WizardController::new();

    say("1. Upload Your .docx Template".into());
    loop {
        let path = match template.take() {
            Some(path) => path,
            None => {
                say("Path to a .docx file that uses {{ placeholder }} tags:".into());
                let line = input
                    .next_line()
                    .await
                    .context("read template path")?
                    .context("input closed before a template was uploaded")?;
                PathBuf::from(line.trim())
            }
        };

        match storage::load_template(&path) {
            Ok(file) => wizard.select_template(file)?,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %format!("{e:#}"), "template rejected");
                wizard.reject_template(format!("{e:#}"))?;
                note(format!("Error: {e:#}"));
                continue;
            }
        }

        note(format!("Uploading {}…", path.display()));
        match wizard.submit_template(service).await {
            Ok(()) => break,
            Err(e) if e.is_request_failure() => note(format!("Error: {e}")),
            Err(e) => return Err(e.into()),
        }
    }

    say(String::new());
    say("2. Fill Your Document".into());
    while wizard.state().step == Step::Fill {
        let state = wizard.state();
        let prompt = state.current_prompt().context("no prompt to answer")?;
        say(format!(
            "Question {} of {}",
            state.current + 1,
            state.prompt_count()
        ));
        say(prompt.text.clone());
        let prefilled = state.draft.clone();
        if !prefilled.is_empty() {
            say(format!("[{prefilled}] (Enter keeps this answer)"));
        }

        let line = input
            .next_line()
            .await
            .context("read answer")?
            .context("input closed before all questions were answered")?;
        let answer = if line.is_empty() { prefilled } else { line };

        if wizard.state().is_last_prompt() {
            note("Generating document…".into());
        }
        match wizard.submit_current_answer(service, answer).await {
            Ok(_) => {}
            Err(e) if e.is_request_failure() => note(format!("Error: {e}")),
            Err(e) => return Err(e.into()),
        }
    }

    let outcome = orchestrator::build_outcome(cfg, wizard.state())
        .context("wizard finished without a download link")?;
    Ok(orchestrator::process_generation(cfg, service, outcome).await)
}
