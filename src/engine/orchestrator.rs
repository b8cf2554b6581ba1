// Runs the frame engine piped into the encoder and reports progress

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use uuid::Uuid;

use super::control::{CancelHandle, RunControl, RunState};
use super::core::{
    AudioPolicy, AudioRequest, EngineCommand, JobDescriptor, LineOutcome, ProgressParser,
    ProgressThrottle, build_encoder_cmd, build_frame_engine_cmd, decide_audio_policy,
    split_custom_args,
};
use super::probe::{MediaProbe, SourceInfo};
use super::script::{
    DependencyProbe, GeneratedScript, OutputMode, ScriptGenerator, ScriptInput,
};
use super::supervise::{Supervised, join_tail, shutdown, spawn_line_reader, spawn_tail_reader};
use super::worker::{EventSink, LogLevel};
use super::workspace::{PartialOutput, RUN_PREFIX, TempWorkspace};
use crate::config::Settings;
use crate::error::{Engine, OrchestrationError};

pub const SCRIPT_FILE: &str = "script.vpy";
pub const MANIFEST_FILE: &str = "run.json";

/// What a successful run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionInfo {
    pub output_path: PathBuf,
    /// Output frames the frame engine reported
    pub frames: Option<u64>,
    pub elapsed: Duration,
    pub audio: AudioPolicy,
}

/// Everything decided before any engine starts.
#[derive(Debug, Clone)]
pub struct RunPlan {
    /// The job, with the probed frame rate filled in when it had none
    pub job: JobDescriptor,
    pub passes: Vec<&'static str>,
    pub script: GeneratedScript,
    pub audio: AudioPolicy,
    pub frame_cmd: EngineCommand,
    pub encoder_cmd: EngineCommand,
}

impl RunPlan {
    /// Human-readable summary for `--dry-run`
    pub fn describe(&self) -> String {
        let passes = if self.passes.is_empty() {
            "(none)".to_string()
        } else {
            self.passes.join(" -> ")
        };
        let deps: Vec<&str> = self.script.dependencies.iter().map(|d| d.name()).collect();
        format!(
            "# passes: {}\n# dependencies: {}\n# audio: {}\n# frame engine: {}\n# encoder: {}\n\n{}",
            passes,
            deps.join(", "),
            self.audio,
            self.frame_cmd,
            self.encoder_cmd,
            self.script.text
        )
    }
}

/// Debugging record written next to the script.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunManifest<'a> {
    job_id: Uuid,
    created_at: String,
    input_path: &'a Path,
    output_path: &'a Path,
    passes: &'a [&'static str],
    dependencies: Vec<&'static str>,
    audio_policy: &'a AudioPolicy,
    frame_engine: Vec<String>,
    encoder: Vec<String>,
}

impl<'a> RunManifest<'a> {
    fn new(plan: &'a RunPlan) -> Self {
        Self {
            job_id: plan.job.id,
            created_at: chrono::Local::now().to_rfc3339(),
            input_path: &plan.job.input_path,
            output_path: &plan.job.output_path,
            passes: &plan.passes,
            dependencies: plan.script.dependencies.iter().map(|d| d.name()).collect(),
            audio_policy: &plan.audio,
            frame_engine: plan.frame_cmd.argv(),
            encoder: plan.encoder_cmd.argv(),
        }
    }
}

/// How the control loop ended
#[derive(Debug)]
enum LoopExit {
    Finished,
    Crashed(Engine, ExitStatus),
    Cancelled,
    TimedOut(Duration),
}

/// Drives one job through the vspipe | ffmpeg process pair.
pub struct Orchestrator<'a> {
    settings: &'a Settings,
    probe: &'a dyn MediaProbe,
    deps: &'a dyn DependencyProbe,
    sink: &'a dyn EventSink,
    control: RunControl,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        settings: &'a Settings,
        probe: &'a dyn MediaProbe,
        deps: &'a dyn DependencyProbe,
        sink: &'a dyn EventSink,
    ) -> Self {
        Self {
            settings,
            probe,
            deps,
            sink,
            control: RunControl::new(settings.process.cancel_settle_limit()),
        }
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.control.handle()
    }

    pub fn state(&self) -> RunState {
        self.control.state()
    }

    /// Probe the source, pick the audio policy, generate the script and
    /// build both command lines. Spawns nothing.
    pub fn plan(
        &self,
        job: &JobDescriptor,
        script_path: &Path,
    ) -> Result<RunPlan, OrchestrationError> {
        let source = match self.probe.probe(&job.input_path) {
            Ok(info) => info,
            Err(e) => {
                tracing::warn!("probe of {} failed: {}", job.input_path.display(), e);
                SourceInfo::default()
            }
        };

        let mut job = job.clone();
        if job.input_frame_rate.is_none() {
            job.input_frame_rate = source.fps;
        }

        let encoding = &job.encoding_settings;
        let custom = split_custom_args(&encoding.custom_ffmpeg_args);
        let audio = decide_audio_policy(&AudioRequest {
            copy: encoding.audio_copy,
            container: encoding.container,
            source_codec: source.audio_codec.as_deref(),
            fallback_codec: &encoding.audio_codec,
            fallback_bitrate_kbps: encoding.audio_bitrate,
            custom_args: &custom,
        });

        let input = ScriptInput::for_job(&job, OutputMode::Stream);
        let passes = input.steps.iter().map(|step| step.label()).collect();
        let script = ScriptGenerator::new(self.deps).generate(&input)?;

        let frame_cmd = build_frame_engine_cmd(&self.settings.binaries.vspipe, script_path);
        let encoder_cmd = build_encoder_cmd(&self.settings.binaries.ffmpeg, &job, &audio, &custom);

        Ok(RunPlan {
            job,
            passes,
            script,
            audio,
            frame_cmd,
            encoder_cmd,
        })
    }

    /// Run the job to completion, failure or cancellation.
    pub fn run(&self, job: &JobDescriptor) -> Result<CompletionInfo, OrchestrationError> {
        if !self.control.start() {
            return Err(OrchestrationError::Cancelled);
        }

        let result = self.run_started(job);
        self.control.finish(match &result {
            Ok(_) => RunState::Completed,
            Err(OrchestrationError::Cancelled) => RunState::Cancelled,
            Err(_) => RunState::Failed,
        });
        result
    }

    fn run_started(&self, job: &JobDescriptor) -> Result<CompletionInfo, OrchestrationError> {
        let started = Instant::now();
        let process = &self.settings.process;

        let workspace = TempWorkspace::create(
            &process.temp_root(),
            RUN_PREFIX,
            job.id,
            process.keep_temp_files,
        )?;
        let script_path = workspace.file(SCRIPT_FILE);
        let plan = self.plan(job, &script_path)?;
        plan.script.write_to(&script_path)?;
        workspace.write_json(MANIFEST_FILE, &RunManifest::new(&plan))?;

        if plan.passes.is_empty() {
            self.sink.log(LogLevel::Info, "No restoration passes enabled, re-encoding only");
        } else {
            self.sink.log(
                LogLevel::Info,
                &format!("Restoration passes: {}", plan.passes.join(", ")),
            );
        }
        self.sink.log(LogLevel::Info, &format!("Audio: {}", plan.audio));
        tracing::debug!("frame engine: {}", plan.frame_cmd);
        tracing::debug!("encoder: {}", plan.encoder_cmd);

        if self.control.cancel_requested() {
            return Err(OrchestrationError::Cancelled);
        }

        let env = self.settings.engine_env();
        let mut frame = Supervised::spawn(&plan.frame_cmd, &env, Stdio::null(), Stdio::piped())?;
        let frame_out = frame.child_mut().stdout.take();
        let frame_err = frame.child_mut().stderr.take();

        let Some(frame_out) = frame_out else {
            shutdown(&mut [&mut frame], process.grace_period(), process.poll_interval());
            return Err(OrchestrationError::PipeBroken(
                "frame engine stdout was not captured".to_string(),
            ));
        };

        let mut encoder = match Supervised::spawn(
            &plan.encoder_cmd,
            &env,
            Stdio::from(frame_out),
            Stdio::null(),
        ) {
            Ok(encoder) => encoder,
            Err(e) => {
                shutdown(&mut [&mut frame], process.grace_period(), process.poll_interval());
                return Err(e);
            }
        };
        let output = PartialOutput::new(&plan.job.output_path);

        let (tx, rx) = mpsc::channel();
        let reader = frame_err.map(|stream| spawn_line_reader(stream, tx));
        let encoder_tail = encoder
            .child_mut()
            .stderr
            .take()
            .map(|stream| spawn_tail_reader(stream, process.diagnostic_tail_lines));

        let mut parser = ProgressParser::new(
            plan.job.expected_output_frames(),
            process.diagnostic_tail_lines,
        );
        let exit = self.supervise(&mut frame, &mut encoder, &rx, &mut parser, started);

        drop(rx);
        if let Some(reader) = reader {
            if reader.is_finished() {
                let _ = reader.join();
            }
        }
        let encoder_tail = join_tail(encoder_tail);

        match exit {
            LoopExit::Finished => {}
            LoopExit::Cancelled => return Err(OrchestrationError::Cancelled),
            LoopExit::TimedOut(limit) => return Err(OrchestrationError::Timeout(limit)),
            LoopExit::Crashed(engine, status) => {
                let tail = match engine {
                    Engine::Frame => parser.tail(),
                    Engine::Encoder => encoder_tail,
                };
                return Err(OrchestrationError::EngineCrash {
                    engine,
                    status,
                    tail,
                });
            }
        }

        if !parser.is_complete() {
            return Err(OrchestrationError::PipeBroken(format!(
                "engine reported {} of {} frames",
                parser.last_frame().unwrap_or(0),
                parser.total_frames().unwrap_or(0)
            )));
        }

        output.keep();
        Ok(CompletionInfo {
            output_path: plan.job.output_path.clone(),
            frames: parser.last_frame(),
            elapsed: started.elapsed(),
            audio: plan.audio,
        })
    }

    /// Control loop: one wait point for stderr lines, cancellation, the
    /// deadline and both exit statuses.
    fn supervise(
        &self,
        frame: &mut Supervised,
        encoder: &mut Supervised,
        rx: &Receiver<String>,
        parser: &mut ProgressParser,
        started: Instant,
    ) -> LoopExit {
        let process = &self.settings.process;
        let poll = process.poll_interval();
        let mut throttle = ProgressThrottle::new(process.progress_interval());
        let deadline = process.job_timeout().map(|limit| (started + limit, limit));
        let mut stderr_open = true;

        let exit = loop {
            if stderr_open {
                match rx.recv_timeout(poll) {
                    Ok(line) => {
                        self.handle_line(parser, &mut throttle, &line);
                        // Drain whatever else is queued before the checks
                        while let Ok(line) = rx.try_recv() {
                            self.handle_line(parser, &mut throttle, &line);
                        }
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => stderr_open = false,
                }
            } else {
                thread::sleep(poll);
            }

            if self.control.cancel_requested() {
                tracing::info!("cancel requested, stopping engines");
                shutdown(&mut [&mut *frame, &mut *encoder], process.grace_period(), poll);
                break LoopExit::Cancelled;
            }
            if let Some((at, limit)) = deadline {
                if Instant::now() >= at {
                    tracing::warn!("job exceeded {}s, stopping engines", limit.as_secs());
                    shutdown(&mut [&mut *frame, &mut *encoder], process.grace_period(), poll);
                    break LoopExit::TimedOut(limit);
                }
            }

            let frame_status = poll_status(frame);
            let encoder_status = poll_status(encoder);

            if let Some(first) = crashed(frame_status, encoder_status, &[]) {
                tracing::debug!("{} exited with {}", first.0, first.1);
                shutdown(&mut [&mut *frame, &mut *encoder], process.grace_period(), poll);
                if stderr_open {
                    // The last diagnostics may still be in the pipe
                    self.drain(rx, parser, &mut throttle, process.grace_period());
                }
                // A signalled engine is only a cancellation if one was asked for
                if self.control.cancel_requested() {
                    break LoopExit::Cancelled;
                }
                // Statuses as first seen; after shutdown they include our SIGTERM
                let (engine, status) =
                    crashed(frame_status, encoder_status, &parser.tail()).unwrap_or(first);
                break LoopExit::Crashed(engine, status);
            }

            if frame_status.is_some() && encoder_status.is_some() && !stderr_open {
                break LoopExit::Finished;
            }
        };

        if let Some(event) = throttle.flush() {
            self.sink.progress(&event);
        }
        exit
    }

    /// Handle lines still in flight until the reader hangs up or `limit` passes.
    fn drain(
        &self,
        rx: &Receiver<String>,
        parser: &mut ProgressParser,
        throttle: &mut ProgressThrottle,
        limit: Duration,
    ) {
        let until = Instant::now() + limit;
        while let Some(left) = until.checked_duration_since(Instant::now()) {
            match rx.recv_timeout(left) {
                Ok(line) => self.handle_line(parser, throttle, &line),
                Err(_) => break,
            }
        }
    }

    fn handle_line(&self, parser: &mut ProgressParser, throttle: &mut ProgressThrottle, line: &str) {
        match parser.parse_line(line) {
            LineOutcome::Progress(event) => {
                if let Some(event) = throttle.offer(event, Instant::now()) {
                    self.sink.progress(&event);
                }
            }
            LineOutcome::Log(text) => {
                tracing::debug!(target: "restorepipe::vspipe", "{}", text);
                self.sink.log(LogLevel::Debug, &text);
            }
            LineOutcome::Silent => {}
        }
    }
}

fn poll_status(proc: &mut Supervised) -> Option<ExitStatus> {
    match proc.poll() {
        Ok(status) => status,
        Err(e) => {
            tracing::warn!("try_wait on {} failed: {}", proc.engine, e);
            None
        }
    }
}

/// Pick the engine to blame once either exits unsuccessfully.
///
/// An engine seen failing on its own is blamed. When both failures show up
/// together, a frame engine that lost its output pipe (SIGPIPE, or a failed
/// frame write in `frame_tail`) is a symptom of the encoder going away.
fn crashed(
    frame: Option<ExitStatus>,
    encoder: Option<ExitStatus>,
    frame_tail: &[String],
) -> Option<(Engine, ExitStatus)> {
    let frame_failed = frame.filter(|s| !s.success());
    let encoder_failed = encoder.filter(|s| !s.success());
    match (frame_failed, encoder_failed) {
        (Some(f), Some(e)) if died_of_broken_pipe(&f) || lost_output_pipe(frame_tail) => {
            Some((Engine::Encoder, e))
        }
        (Some(f), _) => Some((Engine::Frame, f)),
        (None, Some(e)) => Some((Engine::Encoder, e)),
        (None, None) => None,
    }
}

/// vspipe's report of a frame it could not write to stdout
fn lost_output_pipe(frame_tail: &[String]) -> bool {
    frame_tail
        .iter()
        .any(|line| line.contains("fwrite() call failed") || line.contains("Broken pipe"))
}

#[cfg(unix)]
fn died_of_broken_pipe(status: &ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;
    status.signal() == Some(libc::SIGPIPE)
}

#[cfg(not(unix))]
fn died_of_broken_pipe(_status: &ExitStatus) -> bool {
    false
}
