// Single-frame PNG rendering through the frame engine only

use std::fs;
use std::process::Stdio;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Instant;

use super::control::{CancelHandle, RunControl, RunState};
use super::core::{JobDescriptor, LineOutcome, ProgressParser, build_preview_engine_cmd};
use super::orchestrator::SCRIPT_FILE;
use super::script::{DependencyProbe, OutputMode, ScriptGenerator, ScriptInput};
use super::supervise::{Supervised, shutdown, spawn_line_reader};
use super::workspace::{PREVIEW_PREFIX, TempWorkspace};
use crate::config::Settings;
use crate::error::{Engine, OrchestrationError};

/// Renders one processed frame of a job as PNG bytes. Encoding settings
/// play no part.
pub struct PreviewRenderer<'a> {
    settings: &'a Settings,
    deps: &'a dyn DependencyProbe,
    control: RunControl,
}

impl<'a> PreviewRenderer<'a> {
    pub fn new(settings: &'a Settings, deps: &'a dyn DependencyProbe) -> Self {
        Self {
            settings,
            deps,
            control: RunControl::new(settings.process.cancel_settle_limit()),
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.control.handle()
    }

    pub fn state(&self) -> RunState {
        self.control.state()
    }

    /// Render source frame `frame` after every enabled pass.
    pub fn render(&self, job: &JobDescriptor, frame: u64) -> Result<Vec<u8>, OrchestrationError> {
        if !self.control.start() {
            return Err(OrchestrationError::Cancelled);
        }

        let result = self.render_started(job, frame);
        self.control.finish(match &result {
            Ok(_) => RunState::Completed,
            Err(OrchestrationError::Cancelled) => RunState::Cancelled,
            Err(_) => RunState::Failed,
        });
        result
    }

    fn render_started(
        &self,
        job: &JobDescriptor,
        frame: u64,
    ) -> Result<Vec<u8>, OrchestrationError> {
        let started = Instant::now();
        let process = &self.settings.process;
        let poll = process.poll_interval();
        let limit = process.preview_timeout();

        let workspace = TempWorkspace::create(
            &process.temp_root(),
            PREVIEW_PREFIX,
            job.id,
            process.keep_temp_files,
        )?;
        let output = OutputMode::Still {
            frame,
            image_dir: workspace.path().to_path_buf(),
        };
        let input = ScriptInput::for_job(job, output);
        let script = ScriptGenerator::new(self.deps).generate(&input)?;
        let script_path = workspace.file(SCRIPT_FILE);
        script.write_to(&script_path)?;

        let cmd = build_preview_engine_cmd(&self.settings.binaries.vspipe, &script_path);
        tracing::debug!("preview: {}", cmd);
        let env = self.settings.engine_env();
        let mut engine = Supervised::spawn(&cmd, &env, Stdio::null(), Stdio::null())?;

        let (tx, rx) = mpsc::channel();
        let reader = engine
            .child_mut()
            .stderr
            .take()
            .map(|stream| spawn_line_reader(stream, tx));
        let mut parser = ProgressParser::new(None, process.diagnostic_tail_lines);
        let mut stderr_open = reader.is_some();

        let status = loop {
            if stderr_open {
                match rx.recv_timeout(poll) {
                    Ok(line) => {
                        if let LineOutcome::Log(text) = parser.parse_line(&line) {
                            tracing::debug!(target: "restorepipe::vspipe", "{}", text);
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => stderr_open = false,
                }
            } else {
                thread::sleep(poll);
            }

            if self.control.cancel_requested() {
                shutdown(&mut [&mut engine], process.grace_period(), poll);
                return Err(OrchestrationError::Cancelled);
            }
            if started.elapsed() >= limit {
                tracing::warn!("preview exceeded {}s, stopping", limit.as_secs());
                shutdown(&mut [&mut engine], process.grace_period(), poll);
                return Err(OrchestrationError::Timeout(limit));
            }

            match engine.poll() {
                Ok(Some(status)) if !stderr_open => break status,
                Ok(_) => {}
                Err(e) => tracing::warn!("try_wait on vspipe failed: {}", e),
            }
        };
        if let Some(reader) = reader {
            let _ = reader.join();
        }

        if !status.success() {
            return Err(OrchestrationError::EngineCrash {
                engine: Engine::Frame,
                status,
                tail: parser.tail(),
            });
        }

        let image = input
            .output
            .image_file()
            .ok_or_else(|| OrchestrationError::PipeBroken("no image path".to_string()))?;
        match fs::read(&image) {
            Ok(bytes) if !bytes.is_empty() => Ok(bytes),
            Ok(_) => Err(OrchestrationError::PipeBroken(format!(
                "{} is empty",
                image.display()
            ))),
            Err(e) => Err(OrchestrationError::PipeBroken(format!(
                "frame engine wrote no image at {}: {}",
                image.display(),
                e
            ))),
        }
    }
}
