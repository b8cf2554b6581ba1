//! restorepipe: compile a restoration pipeline into a VapourSynth script and
//! run it through `vspipe | ffmpeg`, reporting progress as JSON lines.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod signals;
