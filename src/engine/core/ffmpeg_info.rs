use anyhow::{Context, Result};
use std::path::Path;
use std::process::Command;

/// Run `<program> <flag>` and return the first line it prints.
///
/// vspipe writes its banner to stdout like ffmpeg does, but some builds use
/// stderr, so both are checked.
pub fn tool_version(program: &Path, flag: &str) -> Result<String> {
    let output = Command::new(program)
        .arg(flag)
        .output()
        .with_context(|| {
            format!(
                "Failed to execute {}. Is it installed and in PATH?",
                program.display()
            )
        })?;

    if !output.status.success() {
        anyhow::bail!(
            "{} {} failed with status: {}",
            program.display(),
            flag,
            output.status
        );
    }

    first_line(&output.stdout)
        .or_else(|| first_line(&output.stderr))
        .with_context(|| format!("{} printed no version information", program.display()))
}

pub fn ffmpeg_version(ffmpeg: &Path) -> Result<String> {
    tool_version(ffmpeg, "-version")
}

pub fn ffprobe_version(ffprobe: &Path) -> Result<String> {
    tool_version(ffprobe, "-version")
}

pub fn vspipe_version(vspipe: &Path) -> Result<String> {
    tool_version(vspipe, "--version")
}

fn first_line(bytes: &[u8]) -> Option<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}
