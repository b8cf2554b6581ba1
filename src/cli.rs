use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::engine::MAX_FRAME_INDEX;

#[derive(Parser, Debug)]
#[command(name = "restorepipe", version)]
#[command(
    about = "Run a VapourSynth restoration pipeline through vspipe and ffmpeg",
    long_about = None
)]
pub struct Cli {
    /// Job descriptor (JSON) to run
    #[arg(long, value_name = "JOB_JSON")]
    pub config: Option<PathBuf>,

    /// Settings file (defaults to <config dir>/restorepipe/settings.toml)
    #[arg(long, value_name = "SETTINGS_TOML")]
    pub settings: Option<PathBuf>,

    /// Render one frame as PNG to stdout instead of encoding
    #[arg(long, requires = "frame", conflicts_with = "dry_run")]
    pub preview: bool,

    /// Source frame index for --preview
    #[arg(
        long,
        value_name = "N",
        requires = "preview",
        value_parser = clap::value_parser!(u64).range(..=MAX_FRAME_INDEX)
    )]
    pub frame: Option<u64>,

    /// Print the generated script and engine command lines without running them
    #[arg(long)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Show the versions of vspipe, ffmpeg and ffprobe
    CheckTools,

    /// Show the settings location, or write a default settings file if missing
    InitSettings,
}

/// What the binary should do, after flag validation
#[derive(Debug, Clone, PartialEq)]
pub enum Mode {
    Run(PathBuf),
    Preview { job: PathBuf, frame: u64 },
    DryRun(PathBuf),
    CheckTools,
    InitSettings,
}

impl Cli {
    pub fn mode(&self) -> Option<Mode> {
        match (&self.command, &self.config) {
            (Some(Commands::CheckTools), _) => Some(Mode::CheckTools),
            (Some(Commands::InitSettings), _) => Some(Mode::InitSettings),
            (None, Some(job)) if self.preview => Some(Mode::Preview {
                job: job.clone(),
                frame: self.frame?,
            }),
            (None, Some(job)) if self.dry_run => Some(Mode::DryRun(job.clone())),
            (None, Some(job)) => Some(Mode::Run(job.clone())),
            (None, None) => None,
        }
    }
}

pub fn parse() -> Cli {
    Cli::parse()
}
