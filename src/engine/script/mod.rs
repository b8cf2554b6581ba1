//! VapourSynth script generation.
//!
//! Turns a resolved pass sequence into the text of a `.vpy` script: a fixed
//! preamble that loads the source through ffms2, one call per pass, an
//! optional trim, a frame count report on stderr and the output declaration.

pub mod format;
mod templates;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::engine::core::{FrameRange, JobDescriptor};
use crate::engine::params::PassStep;
use format::py_path;

/// File name pattern handed to imwri for stills; frame 0 of a one-frame clip
const STILL_PATTERN: &str = "still%d.png";
const STILL_FILE: &str = "still0.png";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScriptError {
    #[error("{pass}: unknown method `{id}`")]
    UnknownMethod { pass: &'static str, id: String },

    #[error("{pass}: required dependency `{name}` is not available")]
    MissingDependency { pass: &'static str, name: String },
}

/// External VapourSynth plugins and Python modules a script can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Dependency {
    #[serde(rename = "ffms2")]
    Ffms2,
    #[serde(rename = "havsfunc")]
    Havsfunc,
    #[serde(rename = "mvtools")]
    MvTools,
    #[serde(rename = "nnedi3")]
    Nnedi3,
    #[serde(rename = "nnedi3cl")]
    Nnedi3Cl,
    #[serde(rename = "eedi3m")]
    Eedi3,
    #[serde(rename = "fft3dfilter")]
    Fft3dFilter,
    #[serde(rename = "deblock")]
    Deblock,
    #[serde(rename = "dctfilter")]
    DctFilter,
    #[serde(rename = "neo_f3kdb")]
    NeoF3kdb,
    #[serde(rename = "cas")]
    Cas,
    #[serde(rename = "vinverse")]
    Vinverse,
    #[serde(rename = "adjust")]
    Adjust,
    #[serde(rename = "edi_rpow2")]
    EdiRpow2,
    #[serde(rename = "imwri")]
    Imwri,
}

impl Dependency {
    pub const ALL: [Dependency; 15] = [
        Dependency::Ffms2,
        Dependency::Havsfunc,
        Dependency::MvTools,
        Dependency::Nnedi3,
        Dependency::Nnedi3Cl,
        Dependency::Eedi3,
        Dependency::Fft3dFilter,
        Dependency::Deblock,
        Dependency::DctFilter,
        Dependency::NeoF3kdb,
        Dependency::Cas,
        Dependency::Vinverse,
        Dependency::Adjust,
        Dependency::EdiRpow2,
        Dependency::Imwri,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Dependency::Ffms2 => "ffms2",
            Dependency::Havsfunc => "havsfunc",
            Dependency::MvTools => "mvtools",
            Dependency::Nnedi3 => "nnedi3",
            Dependency::Nnedi3Cl => "nnedi3cl",
            Dependency::Eedi3 => "eedi3m",
            Dependency::Fft3dFilter => "fft3dfilter",
            Dependency::Deblock => "deblock",
            Dependency::DctFilter => "dctfilter",
            Dependency::NeoF3kdb => "neo_f3kdb",
            Dependency::Cas => "cas",
            Dependency::Vinverse => "vinverse",
            Dependency::Adjust => "adjust",
            Dependency::EdiRpow2 => "edi_rpow2",
            Dependency::Imwri => "imwri",
        }
    }

    /// Python modules are imported; everything else is a core plugin
    pub fn is_python_module(&self) -> bool {
        matches!(
            self,
            Dependency::Havsfunc | Dependency::Adjust | Dependency::EdiRpow2
        )
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|dep| dep.name().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Answers whether the engine environment provides a dependency.
pub trait DependencyProbe {
    fn is_available(&self, dependency: Dependency) -> bool;
}

/// Probe that assumes a complete installation
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeAvailable;

impl DependencyProbe for AssumeAvailable {
    fn is_available(&self, _dependency: Dependency) -> bool {
        true
    }
}

/// Probe built from a list of names known to be missing
#[derive(Debug, Clone, Default)]
pub struct UnavailableList {
    missing: HashSet<Dependency>,
}

impl UnavailableList {
    /// Unrecognised names are returned so the caller can warn about them.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> (Self, Vec<String>) {
        let mut missing = HashSet::new();
        let mut unknown = Vec::new();
        for name in names {
            match Dependency::from_name(name.as_ref()) {
                Some(dep) => {
                    missing.insert(dep);
                }
                None => unknown.push(name.as_ref().to_string()),
            }
        }
        (Self { missing }, unknown)
    }
}

impl DependencyProbe for UnavailableList {
    fn is_available(&self, dependency: Dependency) -> bool {
        !self.missing.contains(&dependency)
    }
}

/// Where the final clip goes.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputMode {
    /// Full job: frames to stdout as Y4M through `vspipe -c y4m`
    Stream,
    /// One source frame, written as PNG into `image_dir` by imwri
    Still { frame: u64, image_dir: PathBuf },
}

impl OutputMode {
    /// PNG written by a still script
    pub fn image_file(&self) -> Option<PathBuf> {
        match self {
            OutputMode::Stream => None,
            OutputMode::Still { image_dir, .. } => Some(image_dir.join(STILL_FILE)),
        }
    }
}

/// Everything the generator needs for one script.
#[derive(Debug, Clone)]
pub struct ScriptInput {
    pub source: PathBuf,
    pub steps: Vec<PassStep>,
    /// Source frame indices to keep (inclusive)
    pub frame_range: Option<FrameRange>,
    /// Output frames per source frame
    pub rate_factor: u64,
    pub output: OutputMode,
}

impl ScriptInput {
    /// Resolve a job's pipeline for the given output.
    ///
    /// Stills ignore the job's frame range; the still frame selects instead.
    pub fn for_job(job: &JobDescriptor, output: OutputMode) -> Self {
        let frame_range = match output {
            OutputMode::Stream => job.frame_range,
            OutputMode::Still { .. } => None,
        };
        Self {
            source: job.input_path.clone(),
            steps: job
                .restoration_pipeline
                .resolve(job.detected_field_order),
            frame_range,
            rate_factor: job.rate_factor(),
            output,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedScript {
    pub text: String,
    /// Every dependency the script references
    pub dependencies: BTreeSet<Dependency>,
}

impl GeneratedScript {
    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, &self.text)
    }
}

/// Accumulates script lines and the dependencies they reference.
#[derive(Debug, Default)]
pub(crate) struct ScriptBody {
    lines: Vec<String>,
    /// Dependency -> first stage that needed it
    needed: BTreeMap<Dependency, &'static str>,
}

impl ScriptBody {
    pub(crate) fn line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub(crate) fn require(&mut self, stage: &'static str, deps: &[Dependency]) {
        for dep in deps {
            self.needed.entry(*dep).or_insert(stage);
        }
    }
}

/// Builds scripts, checking dependencies against a probe.
pub struct ScriptGenerator<'a> {
    probe: &'a dyn DependencyProbe,
}

impl<'a> ScriptGenerator<'a> {
    pub fn new(probe: &'a dyn DependencyProbe) -> Self {
        Self { probe }
    }

    /// Generate the script for `input`. Deterministic for equal inputs.
    pub fn generate(&self, input: &ScriptInput) -> Result<GeneratedScript, ScriptError> {
        let mut body = ScriptBody::default();

        body.require("source", &[Dependency::Ffms2]);
        body.line(format!(
            "clip = core.ffms2.Source(source={})",
            py_path(&input.source)
        ));

        for step in &input.steps {
            body.line(String::new());
            body.line(format!("# {}", step.label()));
            templates::emit_step(&mut body, step)?;
        }

        let factor = input.rate_factor.max(1);
        match &input.output {
            OutputMode::Stream => {
                if let Some(range) = input.frame_range {
                    body.line(String::new());
                    body.line(format!(
                        "clip = clip[{}:{}]",
                        range.start.saturating_mul(factor),
                        range.end.saturating_add(1).saturating_mul(factor)
                    ));
                }
            }
            OutputMode::Still { frame, .. } => {
                body.line(String::new());
                body.line(format!(
                    "clip = clip[min({}, clip.num_frames - 1)]",
                    frame.saturating_mul(factor)
                ));
            }
        }

        body.line(String::new());
        body.line(
            "print(f\"INPUT_INFO:frames={clip.num_frames},fps_num={clip.fps.numerator},\
             fps_den={clip.fps.denominator}\", file=sys.stderr)",
        );

        if let OutputMode::Still { image_dir, .. } = &input.output {
            body.require("output", &[Dependency::Imwri]);
            templates::emit_still(&mut body, &image_dir.join(STILL_PATTERN));
        }
        body.line("clip.set_output()");

        for (dep, stage) in &body.needed {
            if !self.probe.is_available(*dep) {
                return Err(ScriptError::MissingDependency {
                    pass: *stage,
                    name: dep.name().to_string(),
                });
            }
        }

        Ok(GeneratedScript {
            text: assemble(&body),
            dependencies: body.needed.keys().copied().collect(),
        })
    }
}

fn assemble(body: &ScriptBody) -> String {
    let mut text = String::from("import vapoursynth as vs\nimport sys\n");
    for dep in body.needed.keys().filter(|dep| dep.is_python_module()) {
        match dep {
            Dependency::Havsfunc => text.push_str("import havsfunc as haf\n"),
            other => text.push_str(&format!("import {}\n", other.name())),
        }
    }
    text.push_str("\ncore = vs.core\n\n");
    for line in &body.lines {
        text.push_str(line);
        text.push('\n');
    }
    text
}
