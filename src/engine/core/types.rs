use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::engine::params::{ParamClamp, QtgmcParameters, RestorationPipeline};
use crate::error::OrchestrationError;

/// Output video codecs, keyed by the front end's wire names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum VideoCodec {
    #[default]
    #[serde(rename = "libx264")]
    H264,
    #[serde(rename = "libx265")]
    H265,
    #[serde(rename = "ffv1")]
    Ffv1,
    #[serde(rename = "prores_ks -profile:v 0")]
    ProResProxy,
    #[serde(rename = "prores_ks -profile:v 1")]
    ProResLt,
    #[serde(rename = "prores_ks -profile:v 2")]
    ProRes422,
    #[serde(rename = "prores_ks -profile:v 3")]
    ProResHq,
}

impl VideoCodec {
    /// Encoder name passed to `-c:v`
    pub fn ffmpeg_codec(&self) -> &'static str {
        match self {
            VideoCodec::H264 => "libx264",
            VideoCodec::H265 => "libx265",
            VideoCodec::Ffv1 => "ffv1",
            VideoCodec::ProResProxy
            | VideoCodec::ProResLt
            | VideoCodec::ProRes422
            | VideoCodec::ProResHq => "prores_ks",
        }
    }

    pub fn prores_profile(&self) -> Option<u8> {
        match self {
            VideoCodec::ProResProxy => Some(0),
            VideoCodec::ProResLt => Some(1),
            VideoCodec::ProRes422 => Some(2),
            VideoCodec::ProResHq => Some(3),
            _ => None,
        }
    }

    /// Codecs that take `-crf` and `-preset`
    pub fn uses_crf(&self) -> bool {
        matches!(self, VideoCodec::H264 | VideoCodec::H265)
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            VideoCodec::H264 => "H.264",
            VideoCodec::H265 => "H.265 (HEVC)",
            VideoCodec::Ffv1 => "FFV1 (Lossless)",
            VideoCodec::ProResProxy => "ProRes Proxy",
            VideoCodec::ProResLt => "ProRes LT",
            VideoCodec::ProRes422 => "ProRes 422",
            VideoCodec::ProResHq => "ProRes 422 HQ",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    #[default]
    Mp4,
    Mov,
    Mkv,
    Avi,
}

impl ContainerFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ContainerFormat::Mp4 => "mp4",
            ContainerFormat::Mov => "mov",
            ContainerFormat::Mkv => "mkv",
            ContainerFormat::Avi => "avi",
        }
    }

    /// Guess the container from an output path's extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "mp4" | "m4v" => Some(ContainerFormat::Mp4),
            "mov" => Some(ContainerFormat::Mov),
            "mkv" => Some(ContainerFormat::Mkv),
            "avi" => Some(ContainerFormat::Avi),
            _ => None,
        }
    }
}

/// Field order reported by the front end's source analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldOrder {
    #[serde(rename = "tff")]
    TopFieldFirst,
    #[serde(rename = "bff")]
    BottomFieldFirst,
    Progressive,
    Unknown,
}

impl FieldOrder {
    /// QTGMC `TFF` value, if the order is known
    pub fn tff_value(&self) -> Option<bool> {
        match self {
            FieldOrder::TopFieldFirst => Some(true),
            FieldOrder::BottomFieldFirst => Some(false),
            FieldOrder::Progressive | FieldOrder::Unknown => None,
        }
    }
}

/// Largest frame index or frame count a descriptor may name
pub const MAX_FRAME_INDEX: u64 = u32::MAX as u64;

/// Inclusive range of source frame indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRange {
    pub start: u64,
    pub end: u64,
}

impl FrameRange {
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start).saturating_add(1)
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EncodingSettings {
    pub codec: VideoCodec,
    pub container: ContainerFormat,
    /// CRF for H.264/H.265, ignored by the other codecs
    pub quality: u32,
    pub encoder_preset: String,
    pub audio_copy: bool,
    pub audio_codec: String,
    /// kbps
    pub audio_bitrate: u32,
    pub custom_ffmpeg_args: String,
}

impl Default for EncodingSettings {
    fn default() -> Self {
        Self {
            codec: VideoCodec::default(),
            container: ContainerFormat::default(),
            quality: 18,
            encoder_preset: "medium".to_string(),
            audio_copy: true,
            audio_codec: "aac".to_string(),
            audio_bitrate: 192,
            custom_ffmpeg_args: String::new(),
        }
    }
}

/// One processing request, as written by the front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "JobDescriptorWire")]
pub struct JobDescriptor {
    pub id: Uuid,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub restoration_pipeline: RestorationPipeline,
    pub encoding_settings: EncodingSettings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_range: Option<FrameRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_frame: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_frames: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_frame_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_field_order: Option<FieldOrder>,
}

/// Accepts both the pipeline form and the legacy QTGMC-only form.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JobDescriptorWire {
    #[serde(default)]
    id: Option<Uuid>,
    input_path: PathBuf,
    output_path: PathBuf,
    #[serde(default)]
    restoration_pipeline: Option<RestorationPipeline>,
    #[serde(default)]
    qtgmc_parameters: Option<QtgmcParameters>,
    #[serde(default)]
    encoding_settings: EncodingSettings,
    #[serde(default)]
    frame_range: Option<FrameRange>,
    #[serde(default)]
    preview_frame: Option<u64>,
    #[serde(default)]
    total_frames: Option<u64>,
    #[serde(default)]
    input_frame_rate: Option<f64>,
    #[serde(default)]
    detected_field_order: Option<FieldOrder>,
}

impl From<JobDescriptorWire> for JobDescriptor {
    fn from(wire: JobDescriptorWire) -> Self {
        let restoration_pipeline = match (wire.restoration_pipeline, wire.qtgmc_parameters) {
            (Some(pipeline), _) => pipeline,
            (None, Some(qtgmc)) => RestorationPipeline::from_legacy(&qtgmc),
            (None, None) => RestorationPipeline::default(),
        };
        Self {
            id: wire.id.unwrap_or_else(Uuid::new_v4),
            input_path: wire.input_path,
            output_path: wire.output_path,
            restoration_pipeline,
            encoding_settings: wire.encoding_settings,
            frame_range: wire.frame_range,
            preview_frame: wire.preview_frame,
            total_frames: wire.total_frames,
            input_frame_rate: wire.input_frame_rate,
            detected_field_order: wire.detected_field_order,
        }
    }
}

impl JobDescriptor {
    pub fn new(input_path: PathBuf, output_path: PathBuf) -> Self {
        Self {
            id: Uuid::new_v4(),
            input_path,
            output_path,
            restoration_pipeline: RestorationPipeline::default(),
            encoding_settings: EncodingSettings::default(),
            frame_range: None,
            preview_frame: None,
            total_frames: None,
            input_frame_rate: None,
            detected_field_order: None,
        }
    }

    /// Read and validate a descriptor file.
    ///
    /// Out-of-range parameters are clamped; the returned records describe
    /// each change.
    pub fn load(path: &Path) -> Result<(Self, Vec<ParamClamp>), OrchestrationError> {
        let json = fs::read_to_string(path).map_err(|e| OrchestrationError::ConfigParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::parse(&json).map_err(|message| OrchestrationError::ConfigParse {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Parse and validate descriptor JSON
    pub fn parse(json: &str) -> Result<(Self, Vec<ParamClamp>), String> {
        let mut job: JobDescriptor = serde_json::from_str(json).map_err(|e| e.to_string())?;
        job.validate()?;
        let clamps = job.restoration_pipeline.clamp_ranges();
        Ok((job, clamps))
    }

    fn validate(&self) -> Result<(), String> {
        if self.input_path.as_os_str().is_empty() {
            return Err("inputPath is empty".to_string());
        }
        if self.output_path.as_os_str().is_empty() {
            return Err("outputPath is empty".to_string());
        }
        if let Some(range) = self.frame_range {
            if range.is_empty() {
                return Err(format!(
                    "frameRange end {} is before start {}",
                    range.end, range.start
                ));
            }
            if range.end > MAX_FRAME_INDEX {
                return Err(format!(
                    "frameRange end {} is beyond the last supported frame {}",
                    range.end, MAX_FRAME_INDEX
                ));
            }
        }
        if let Some(frame) = self.preview_frame {
            if frame > MAX_FRAME_INDEX {
                return Err(format!(
                    "previewFrame {} is beyond the last supported frame {}",
                    frame, MAX_FRAME_INDEX
                ));
            }
        }
        if let Some(total) = self.total_frames {
            if total > MAX_FRAME_INDEX {
                return Err(format!(
                    "totalFrames {} is beyond the supported maximum {}",
                    total, MAX_FRAME_INDEX
                ));
            }
        }
        Ok(())
    }

    /// Output frames produced per source frame
    pub fn rate_factor(&self) -> u64 {
        let deint = &self.restoration_pipeline.deinterlace;
        if deint.enabled && deint.is_double_rate() {
            2
        } else {
            1
        }
    }

    /// Best guess at the output frame count before the engine reports one
    pub fn expected_output_frames(&self) -> Option<u64> {
        let source = match self.frame_range {
            Some(range) => Some(range.len()),
            None => self.total_frames,
        };
        source.map(|frames| frames.saturating_mul(self.rate_factor()))
    }
}
