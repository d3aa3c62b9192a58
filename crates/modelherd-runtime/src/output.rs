//! Child output streaming with terminal decorations stripped.
//!
//! Reader tasks consume a child's stdout/stderr line by line, strip ANSI
//! escape sequences and spinner glyphs, and forward plain text to the
//! configured [`SessionOutputSink`]. They exit when the streams close.

use std::sync::{Arc, LazyLock};

use modelherd_core::ports::SessionOutputSink;
use modelherd_core::HandleId;
use regex::Regex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Child;
use tracing::debug;

static ANSI_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1B(?:[@-Z\\-_]|\[[0-?]*[ -/]*[@-~])").expect("valid regex"));

/// Braille spinner glyphs emitted by runtime progress indicators.
const SPINNER_GLYPHS: &[char] = &['⠙', '⠹', '⠸', '⠴', '⠦', '⠧', '⠇', '⠏', '⠋'];

/// Strip ANSI escape sequences and spinner glyphs from a line.
pub fn strip_decorations(line: &str) -> String {
    let cleaned = ANSI_ESCAPE.replace_all(line, "");
    cleaned.chars().filter(|c| !SPINNER_GLYPHS.contains(c)).collect()
}

/// Spawn background tasks streaming a child's stdout/stderr to the sink.
///
/// Lines are also logged via tracing at debug level.
pub fn spawn_line_readers(child: &mut Child, handle: HandleId, sink: Arc<dyn SessionOutputSink>) {
    if let Some(stdout) = child.stdout.take() {
        let sink = sink.clone();
        tokio::spawn(async move {
            let reader = BufReader::new(stdout);
            let mut lines = reader.lines();
            while let Ok(Some(text)) = lines.next_line().await {
                let text = strip_decorations(&text);
                debug!(handle = %handle, "stdout: {}", text);
                sink.append(handle, "stdout", text);
            }
            debug!(handle = %handle, "stdout reader task exiting");
        });
    }

    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(async move {
            let reader = BufReader::new(stderr);
            let mut lines = reader.lines();
            while let Ok(Some(text)) = lines.next_line().await {
                let text = strip_decorations(&text);
                debug!(handle = %handle, "stderr: {}", text);
                sink.append(handle, "stderr", text);
            }
            debug!(handle = %handle, "stderr reader task exiting");
        });
    }
}
