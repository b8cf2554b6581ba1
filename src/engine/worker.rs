// Worker message protocol: one JSON object per stdout line

use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::sync::Mutex;
use std::sync::mpsc::Sender;

use super::core::ProgressEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

/// Message from the running job to whoever launched it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WorkerMessage {
    /// Progress update
    Progress {
        frame: u64,
        #[serde(rename = "totalFrames", skip_serializing_if = "Option::is_none")]
        total_frames: Option<u64>,
        fps: f64,
        eta: f64,
    },

    /// Diagnostic line
    Log { level: LogLevel, message: String },

    /// Job failed; always the last record of a failed run
    Error { message: String },

    /// Job finished; always the last record of a successful run
    Complete {
        success: bool,
        #[serde(rename = "outputPath", skip_serializing_if = "Option::is_none")]
        output_path: Option<String>,
    },
}

impl WorkerMessage {
    pub fn progress(event: &ProgressEvent) -> Self {
        WorkerMessage::Progress {
            frame: event.frame,
            total_frames: event.total_frames,
            fps: event.fps,
            eta: event.eta,
        }
    }

    pub fn log(level: LogLevel, message: impl Into<String>) -> Self {
        WorkerMessage::Log {
            level,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        WorkerMessage::Error {
            message: message.into(),
        }
    }

    pub fn complete(output_path: impl Into<String>) -> Self {
        WorkerMessage::Complete {
            success: true,
            output_path: Some(output_path.into()),
        }
    }

    /// Whether this message ends the stream
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkerMessage::Error { .. } | WorkerMessage::Complete { .. }
        )
    }
}

/// Destination for worker messages. Shared between the control loop and the
/// caller, so implementations must be thread-safe.
pub trait EventSink: Send + Sync {
    fn emit(&self, message: WorkerMessage);

    fn progress(&self, event: &ProgressEvent) {
        self.emit(WorkerMessage::progress(event));
    }

    fn log(&self, level: LogLevel, message: &str) {
        self.emit(WorkerMessage::log(level, message));
    }
}

/// Writes each message as one JSON line and flushes immediately.
pub struct JsonLinesReporter<W: Write + Send> {
    out: Mutex<W>,
}

impl JsonLinesReporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> JsonLinesReporter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write + Send> EventSink for JsonLinesReporter<W> {
    fn emit(&self, message: WorkerMessage) {
        let json = match serde_json::to_string(&message) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("failed to serialize worker message: {}", e);
                return;
            }
        };

        let mut out = match self.out.lock() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Err(e) = writeln!(out, "{}", json).and_then(|_| out.flush()) {
            tracing::warn!("failed to write worker message: {}", e);
        }
    }
}

/// Forwards messages over a channel, for callers embedding the orchestrator
pub struct ChannelSink {
    tx: Mutex<Sender<WorkerMessage>>,
}

impl ChannelSink {
    pub fn new(tx: Sender<WorkerMessage>) -> Self {
        Self { tx: Mutex::new(tx) }
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, message: WorkerMessage) {
        if let Ok(tx) = self.tx.lock() {
            // Receiver gone means nobody is listening any more
            let _ = tx.send(message);
        }
    }
}

/// Collects messages in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    messages: Mutex<Vec<WorkerMessage>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<WorkerMessage> {
        match self.messages.lock() {
            Ok(messages) => messages.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl EventSink for MemorySink {
    fn emit(&self, message: WorkerMessage) {
        match self.messages.lock() {
            Ok(mut messages) => messages.push(message),
            Err(poisoned) => poisoned.into_inner().push(message),
        }
    }
}
