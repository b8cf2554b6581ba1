use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

use crate::engine::script::ScriptError;

/// The two external engines a job drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Engine {
    /// vspipe, executing the generated script
    Frame,
    /// ffmpeg, encoding the frame stream
    Encoder,
}

impl Engine {
    pub fn name(&self) -> &'static str {
        match self {
            Engine::Frame => "vspipe",
            Engine::Encoder => "ffmpeg",
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything that can end a run without producing output.
#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("invalid job descriptor {}: {message}", .path.display())]
    ConfigParse { path: PathBuf, message: String },

    #[error("script generation failed: {0}")]
    ScriptGeneration(#[from] ScriptError),

    #[error("failed to start {engine} ({}): {source}", .program.display())]
    ProcessSpawn {
        engine: Engine,
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{engine} failed with {status}{}", format_tail(.tail))]
    EngineCrash {
        engine: Engine,
        status: ExitStatus,
        tail: Vec<String>,
    },

    #[error("frame stream ended early: {0}")]
    PipeBroken(String),

    #[error("cancelled")]
    Cancelled,

    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

fn format_tail(tail: &[String]) -> String {
    if tail.is_empty() {
        String::new()
    } else {
        format!(":\n{}", tail.join("\n"))
    }
}

impl OrchestrationError {
    /// Process exit code the CLI reports for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            OrchestrationError::Cancelled => 130,
            _ => 1,
        }
    }

    /// True for errors raised before any engine was spawned
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            OrchestrationError::ConfigParse { .. } | OrchestrationError::ScriptGeneration(_)
        )
    }
}
