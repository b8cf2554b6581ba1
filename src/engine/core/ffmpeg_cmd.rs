use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::audio::AudioPolicy;
use super::types::JobDescriptor;
use crate::error::Engine;

/// Split the user's free-form encoder arguments.
///
/// Shell-style quoting is honoured; unbalanced quotes fall back to a plain
/// whitespace split rather than failing the job.
pub fn split_custom_args(additional_args: &str) -> Vec<String> {
    if additional_args.trim().is_empty() {
        return Vec::new();
    }

    match shlex::split(additional_args) {
        Some(args) => args,
        None => additional_args
            .split_whitespace()
            .map(str::to_string)
            .collect(),
    }
}

/// A fully resolved engine invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineCommand {
    pub engine: Engine,
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl EngineCommand {
    /// Program followed by its arguments
    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + 1);
        argv.push(self.program.to_string_lossy().to_string());
        argv.extend(self.args.iter().cloned());
        argv
    }

    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

impl fmt::Display for EngineCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, " \"{}\"", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// `vspipe -c y4m -p <script> -`: frames to stdout, progress to stderr
pub fn build_frame_engine_cmd(vspipe: &Path, script: &Path) -> EngineCommand {
    EngineCommand {
        engine: Engine::Frame,
        program: vspipe.to_path_buf(),
        args: vec![
            "-c".to_string(),
            "y4m".to_string(),
            "-p".to_string(),
            script.to_string_lossy().to_string(),
            "-".to_string(),
        ],
    }
}

/// `vspipe <script> .`: evaluate the script and discard the output node.
///
/// Used for stills, where the script itself writes the image.
pub fn build_preview_engine_cmd(vspipe: &Path, script: &Path) -> EngineCommand {
    EngineCommand {
        engine: Engine::Frame,
        program: vspipe.to_path_buf(),
        args: vec![script.to_string_lossy().to_string(), ".".to_string()],
    }
}

/// Encoder arguments for a job reading Y4M frames from stdin.
///
/// Input 0 is the frame stream, input 1 the original source (audio only).
/// `custom_args` must already be split with [`split_custom_args`].
pub fn build_encoder_args(
    job: &JobDescriptor,
    audio: &AudioPolicy,
    custom_args: &[String],
) -> Vec<String> {
    let settings = &job.encoding_settings;
    let mut args: Vec<String> = [
        "-hide_banner",
        "-nostats",
        "-loglevel",
        "warning",
        "-f",
        "yuv4mpegpipe",
        "-i",
        "-",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    if audio.maps_audio() {
        // Keep audio aligned with a trimmed frame range
        if let (Some(range), Some(fps)) = (job.frame_range, job.input_frame_rate) {
            if fps > 0.0 {
                args.push("-ss".to_string());
                args.push(format_seconds(range.start as f64 / fps));
                args.push("-t".to_string());
                args.push(format_seconds(range.len() as f64 / fps));
            }
        }
    }
    args.push("-i".to_string());
    args.push(job.input_path.to_string_lossy().to_string());

    args.push("-map".to_string());
    args.push("0:v:0".to_string());
    if audio.maps_audio() {
        args.push("-map".to_string());
        args.push("1:a:0?".to_string());
    }

    args.push("-c:v".to_string());
    args.push(settings.codec.ffmpeg_codec().to_string());
    if let Some(profile) = settings.codec.prores_profile() {
        args.push("-profile:v".to_string());
        args.push(profile.to_string());
    } else if settings.codec.uses_crf() {
        args.push("-crf".to_string());
        args.push(settings.quality.to_string());
        args.push("-preset".to_string());
        args.push(settings.encoder_preset.clone());
    }

    args.extend(audio.ffmpeg_args());
    args.extend(custom_args.iter().cloned());

    args.push("-y".to_string());
    args.push(job.output_path.to_string_lossy().to_string());
    args
}

pub fn build_encoder_cmd(
    ffmpeg: &Path,
    job: &JobDescriptor,
    audio: &AudioPolicy,
    custom_args: &[String],
) -> EngineCommand {
    EngineCommand {
        engine: Engine::Encoder,
        program: ffmpeg.to_path_buf(),
        args: build_encoder_args(job, audio, custom_args),
    }
}

fn format_seconds(seconds: f64) -> String {
    let formatted = format!("{:.6}", seconds);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}
