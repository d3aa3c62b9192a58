//! Console output sink for supervised child output.
//!
//! Interactive handlers mark the client handle as echoed so the user sees
//! the model's replies; everything else (server logs, background pulls in
//! verbose mode) stays on the tracing side.

use std::collections::HashSet;
use std::sync::Mutex;

use modelherd_core::HandleId;
use modelherd_core::ports::SessionOutputSink;
use tracing::debug;

/// Sink that echoes selected handles to the terminal and routes the rest to
/// tracing at debug level.
#[derive(Debug, Default)]
pub struct ConsoleOutputSink {
    echoed: Mutex<HashSet<HandleId>>,
}

impl ConsoleOutputSink {
    /// Create a sink with no echoed handles.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start echoing a handle's output to the terminal.
    pub fn echo(&self, handle: HandleId) {
        self.echoed.lock().unwrap().insert(handle);
    }

    /// Stop echoing a handle's output.
    pub fn mute(&self, handle: HandleId) {
        self.echoed.lock().unwrap().remove(&handle);
    }
}

impl SessionOutputSink for ConsoleOutputSink {
    fn append(&self, handle: HandleId, stream_type: &str, line: String) {
        let echoed = self.echoed.lock().unwrap().contains(&handle);
        if echoed {
            if stream_type == "stderr" {
                eprintln!("{line}");
            } else {
                println!("{line}");
            }
        } else {
            debug!(handle = %handle, stream = %stream_type, "{}", line);
        }
    }
}
