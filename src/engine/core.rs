mod audio;
mod ffmpeg_cmd;
mod ffmpeg_info;
mod log;
mod progress;
mod types;

pub use audio::{
    AudioPolicy, AudioRequest, MIN_AUDIO_BITRATE_KBPS, allow_audio_passthrough,
    container_accepts, decide_audio_policy, resolve_audio_codec,
};
pub use ffmpeg_cmd::{
    EngineCommand, build_encoder_args, build_encoder_cmd, build_frame_engine_cmd,
    build_preview_engine_cmd, split_custom_args,
};
pub use ffmpeg_info::{ffmpeg_version, ffprobe_version, tool_version, vspipe_version};
pub use log::{LocalTimestamp, init_logging, log_filter};
pub use progress::{
    EngineLine, LineOutcome, ProgressEvent, ProgressParser, ProgressThrottle, parse_engine_line,
};
pub use types::{
    ContainerFormat, EncodingSettings, FieldOrder, FrameRange, JobDescriptor, MAX_FRAME_INDEX,
    VideoCodec,
};
