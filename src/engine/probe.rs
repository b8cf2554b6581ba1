// Source probing using ffprobe

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;

/// What the orchestrator needs to know about a source before spawning.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Frame rate of the first video stream
    pub fps: Option<f64>,
    /// ffprobe `codec_name` of the first audio stream
    pub audio_codec: Option<String>,
    pub duration: Option<f64>,
}

/// Anything that can describe a source file.
///
/// The orchestrator only needs this for the audio decision and for
/// aligning audio with a frame range, so tests substitute fixed answers.
pub trait MediaProbe {
    fn probe(&self, input_path: &Path) -> Result<SourceInfo, String>;
}

/// [`MediaProbe`] backed by the `ffprobe` binary.
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    program: PathBuf,
}

impl FfprobeProbe {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl MediaProbe for FfprobeProbe {
    fn probe(&self, input_path: &Path) -> Result<SourceInfo, String> {
        let output = Command::new(&self.program)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(input_path)
            .output()
            .map_err(|e| format!("Failed to run {}: {}", self.program.display(), e))?;

        if !output.status.success() {
            return Err(format!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        parse_probe_json(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Fixed answers, for callers that already know the source
#[derive(Debug, Clone, Default)]
pub struct StaticProbe(pub SourceInfo);

impl MediaProbe for StaticProbe {
    fn probe(&self, _input_path: &Path) -> Result<SourceInfo, String> {
        Ok(self.0.clone())
    }
}

/// Extract [`SourceInfo`] from `ffprobe -show_format -show_streams` JSON
pub fn parse_probe_json(json_str: &str) -> Result<SourceInfo, String> {
    let json: serde_json::Value = serde_json::from_str(json_str)
        .map_err(|e| format!("Failed to parse ffprobe JSON: {}", e))?;

    let streams = json["streams"]
        .as_array()
        .ok_or("No streams found in ffprobe output")?;

    let first_of = |kind: &str| {
        streams
            .iter()
            .find(|stream| stream["codec_type"].as_str() == Some(kind))
    };

    // r_frame_rate is exact for constant-rate sources; avg_frame_rate covers the rest
    let fps = first_of("video").and_then(|video| {
        video["r_frame_rate"]
            .as_str()
            .and_then(parse_fraction)
            .or_else(|| video["avg_frame_rate"].as_str().and_then(parse_fraction))
    });

    let audio_codec = first_of("audio")
        .and_then(|audio| audio["codec_name"].as_str())
        .map(str::to_string);

    let duration = json["format"]["duration"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok());

    Ok(SourceInfo {
        fps,
        audio_codec,
        duration,
    })
}

/// Parse a fraction string like "30000/1001" to f64
fn parse_fraction(s: &str) -> Option<f64> {
    let (numerator, denominator) = s.split_once('/')?;
    let numerator: f64 = numerator.trim().parse().ok()?;
    let denominator: f64 = denominator.trim().parse().ok()?;

    if denominator == 0.0 || numerator == 0.0 {
        return None;
    }

    Some(numerator / denominator)
}
