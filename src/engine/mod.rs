// Restoration engine: script generation and the vspipe | ffmpeg process pair

pub mod control;
pub mod core;
pub mod orchestrator;
pub mod params;
pub mod preview;
pub mod probe;
pub mod script;
pub mod supervise;
pub mod worker;
pub mod workspace;

pub use control::{CancelHandle, RunControl, RunState};
pub use core::*;
pub use orchestrator::{CompletionInfo, Orchestrator, RunPlan};
pub use preview::PreviewRenderer;
pub use probe::{FfprobeProbe, MediaProbe, SourceInfo, StaticProbe};
pub use script::{
    AssumeAvailable, Dependency, DependencyProbe, GeneratedScript, OutputMode, ScriptError,
    ScriptGenerator, ScriptInput, UnavailableList,
};
pub use worker::{EventSink, JsonLinesReporter, LogLevel, WorkerMessage};
