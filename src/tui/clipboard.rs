use anyhow::{anyhow, Result};
use std::sync::mpsc as std_mpsc;
use std::sync::OnceLock;
use std::time::Duration;

static CLIPBOARD: OnceLock<std_mpsc::Sender<String>> = OnceLock::new();

/// On Linux the clipboard contents vanish with the owning handle, so each
/// copy keeps its handle open for a while on a worker thread.
const HOLD_FOR: Duration = Duration::from_secs(2);

fn clipboard_worker() -> &'static std_mpsc::Sender<String> {
    CLIPBOARD.get_or_init(|| {
        let (tx, rx) = std_mpsc::channel::<String>();
        std::thread::spawn(move || {
            for text in rx {
                match arboard::Clipboard::new() {
                    Ok(mut clipboard) => match clipboard.set_text(text) {
                        Ok(()) => std::thread::sleep(HOLD_FOR),
                        Err(e) => tracing::warn!(error = %e, "clipboard write failed"),
                    },
                    Err(e) => tracing::warn!(error = %e, "clipboard unavailable"),
                }
            }
        });
        tx
    })
}

/// Queue `text` for the clipboard without blocking the UI thread.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    clipboard_worker()
        .send(text.to_string())
        .map_err(|_| anyhow!("clipboard worker stopped"))
}
