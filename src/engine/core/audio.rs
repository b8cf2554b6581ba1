use serde::Serialize;

use super::types::ContainerFormat;

/// Bitrate floor for re-encoded audio, in kbps
pub const MIN_AUDIO_BITRATE_KBPS: u32 = 32;

/// How the source audio track ends up in the output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum AudioPolicy {
    /// Bit-exact passthrough
    Copy,
    Reencode {
        codec: String,
        #[serde(rename = "bitrateKbps")]
        bitrate_kbps: u32,
    },
    /// No audio stream in the output (`-an` in the custom arguments)
    Disabled,
}

impl AudioPolicy {
    /// Encoder arguments selecting this policy
    pub fn ffmpeg_args(&self) -> Vec<String> {
        match self {
            AudioPolicy::Copy => vec!["-c:a".into(), "copy".into()],
            AudioPolicy::Reencode {
                codec,
                bitrate_kbps,
            } => vec![
                "-c:a".into(),
                codec.clone(),
                "-b:a".into(),
                format!("{}k", bitrate_kbps),
            ],
            AudioPolicy::Disabled => Vec::new(),
        }
    }

    /// Whether the source audio stream should be mapped at all
    pub fn maps_audio(&self) -> bool {
        !matches!(self, AudioPolicy::Disabled)
    }
}

impl std::fmt::Display for AudioPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioPolicy::Copy => write!(f, "copy"),
            AudioPolicy::Reencode {
                codec,
                bitrate_kbps,
            } => write!(f, "re-encode as {} at {}k", codec, bitrate_kbps),
            AudioPolicy::Disabled => write!(f, "no audio"),
        }
    }
}

/// Inputs to [`decide_audio_policy`].
#[derive(Debug, Clone)]
pub struct AudioRequest<'a> {
    pub copy: bool,
    pub container: ContainerFormat,
    /// Codec of the source's first audio stream, `None` when unknown
    pub source_codec: Option<&'a str>,
    pub fallback_codec: &'a str,
    pub fallback_bitrate_kbps: u32,
    /// Already shell-split custom encoder arguments
    pub custom_args: &'a [String],
}

/// Decide copy, re-encode or no audio. Pure; runs before any engine starts.
pub fn decide_audio_policy(req: &AudioRequest<'_>) -> AudioPolicy {
    if req.custom_args.iter().any(|arg| arg == "-an") {
        return AudioPolicy::Disabled;
    }

    if req.copy && allow_audio_passthrough(req.container, req.source_codec) {
        return AudioPolicy::Copy;
    }

    AudioPolicy::Reencode {
        codec: resolve_audio_codec(req.container, req.fallback_codec),
        bitrate_kbps: req.fallback_bitrate_kbps.max(MIN_AUDIO_BITRATE_KBPS),
    }
}

/// Whether `container` can carry `source_codec` unchanged.
///
/// Matroska carries anything, so an unknown source codec is still copyable
/// there; every other container needs a known, listed codec.
pub fn allow_audio_passthrough(container: ContainerFormat, source_codec: Option<&str>) -> bool {
    match (container, source_codec) {
        (ContainerFormat::Mkv, _) => true,
        (_, None) => false,
        (container, Some(codec)) => container_accepts(container, codec),
    }
}

/// Audio codec (ffprobe `codec_name`) support per container
pub fn container_accepts(container: ContainerFormat, codec: &str) -> bool {
    let codec = codec.to_ascii_lowercase();
    match container {
        ContainerFormat::Mkv => true,
        ContainerFormat::Mp4 => matches!(
            codec.as_str(),
            "aac" | "mp3" | "ac3" | "eac3" | "alac" | "opus" | "flac"
        ),
        ContainerFormat::Mov => {
            matches!(codec.as_str(), "aac" | "mp3" | "ac3" | "eac3" | "alac")
                || codec.starts_with("pcm_")
        }
        ContainerFormat::Avi => {
            matches!(codec.as_str(), "mp3" | "mp2" | "ac3") || codec.starts_with("pcm_")
        }
    }
}

/// Map the front end's codec name to an encoder the container accepts.
pub fn resolve_audio_codec(container: ContainerFormat, requested: &str) -> String {
    let encoder = match requested {
        // Front end uses plain names; prefer the external encoders
        "vorbis" => "libvorbis",
        "opus" => "libopus",
        "mp3" => "libmp3lame",
        other => other,
    };
    let codec_name = match encoder {
        "libvorbis" => "vorbis",
        "libopus" => "opus",
        "libmp3lame" => "mp3",
        "libfdk_aac" => "aac",
        other => other,
    };

    match container {
        ContainerFormat::Mkv => encoder.to_string(),
        // AAC is the safe choice for the QuickTime family
        ContainerFormat::Mp4 | ContainerFormat::Mov => {
            if container_accepts(container, codec_name) && codec_name != "opus" {
                encoder.to_string()
            } else {
                "aac".to_string()
            }
        }
        ContainerFormat::Avi => {
            if container_accepts(container, codec_name) {
                encoder.to_string()
            } else {
                "libmp3lame".to_string()
            }
        }
    }
}
