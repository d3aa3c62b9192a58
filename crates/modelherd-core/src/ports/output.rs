//! Session output sink trait definition.

use crate::process::HandleId;

/// Sink receiving the line-oriented output of supervised children.
///
/// Reader tasks deliver plain text: terminal decorations (ANSI escapes,
/// spinner glyphs) are stripped before a line reaches the sink.
pub trait SessionOutputSink: Send + Sync {
    /// Deliver one output line from a child's stdout or stderr.
    ///
    /// `stream_type` is `"stdout"` or `"stderr"`.
    fn append(&self, handle: HandleId, stream_type: &str, line: String);
}

/// A no-op sink that discards all output lines.
///
/// Useful where structured capture is not needed; lines are still visible
/// through tracing at debug level.
#[derive(Debug, Clone, Default)]
pub struct NoopOutputSink;

impl SessionOutputSink for NoopOutputSink {
    fn append(&self, _handle: HandleId, _stream_type: &str, _line: String) {
        // Intentionally empty - output is already going to tracing
    }
}
