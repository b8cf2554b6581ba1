/// Shared value types for restoration pass parameters.
///
/// Every pass carries typed fields with documented inclusive ranges. These
/// types describe those ranges and record the values that had to be pulled
/// back into range when a job descriptor was loaded.
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kinds of restoration pass, one per slot in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PassKind {
    Deinterlace,
    NoiseReduction,
    Dehalo,
    Deblock,
    Deband,
    Sharpen,
    ColorCorrection,
    ChromaFixes,
    CropResize,
}

impl PassKind {
    pub const ALL: [PassKind; 9] = [
        PassKind::Deinterlace,
        PassKind::NoiseReduction,
        PassKind::Dehalo,
        PassKind::Deblock,
        PassKind::Deband,
        PassKind::Sharpen,
        PassKind::ColorCorrection,
        PassKind::ChromaFixes,
        PassKind::CropResize,
    ];

    /// Display name for the pass
    pub fn display_name(&self) -> &'static str {
        match self {
            PassKind::Deinterlace => "Deinterlace",
            PassKind::NoiseReduction => "Noise Reduction",
            PassKind::Dehalo => "Dehalo",
            PassKind::Deblock => "Deblock",
            PassKind::Deband => "Deband",
            PassKind::Sharpen => "Sharpen",
            PassKind::ColorCorrection => "Color Correction",
            PassKind::ChromaFixes => "Chroma Fixes",
            PassKind::CropResize => "Crop / Resize",
        }
    }

    /// Short description of what the pass does
    pub fn description(&self) -> &'static str {
        match self {
            PassKind::Deinterlace => "Remove interlacing artifacts using QTGMC",
            PassKind::NoiseReduction => "Reduce video noise and grain",
            PassKind::Dehalo => "Remove halos around edges",
            PassKind::Deblock => "Remove block artifacts from compressed sources",
            PassKind::Deband => "Smooth visible steps in gradients",
            PassKind::Sharpen => "Restore edge detail",
            PassKind::ColorCorrection => "Adjust brightness, contrast, and colors",
            PassKind::ChromaFixes => "Fix chroma bleeding and crawl artifacts",
            PassKind::CropResize => "Crop borders and resize output",
        }
    }
}

impl fmt::Display for PassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Valid range for a numeric parameter (inclusive)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Range {
    Int { min: i64, max: i64 },
    Float { min: f64, max: f64 },
}

impl Range {
    /// Check if an integer value is within this range
    pub fn contains_int(&self, value: i64) -> bool {
        match self {
            Range::Int { min, max } => value >= *min && value <= *max,
            Range::Float { .. } => false,
        }
    }

    /// Check if a float value is within this range
    pub fn contains_float(&self, value: f64) -> bool {
        match self {
            Range::Float { min, max } => value >= *min && value <= *max,
            Range::Int { .. } => false,
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Range::Int { min, max } => write!(f, "{}..={}", min, max),
            Range::Float { min, max } => write!(f, "{}..={}", min, max),
        }
    }
}

/// A numeric parameter value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
        }
    }
}

/// Record of a parameter value that was clamped to its valid range
#[derive(Debug, Clone, PartialEq)]
pub struct ParamClamp {
    pub pass: PassKind,
    pub param: &'static str,
    pub original: Value,
    pub clamped: Value,
    pub range: Range,
}

impl fmt::Display for ParamClamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} = {} is outside {}, using {}",
            self.pass, self.param, self.original, self.range, self.clamped
        )
    }
}

/// Identifier of a method/preset as it appears in the job descriptor.
pub trait MethodId {
    fn id(&self) -> &'static str;
}

/// A method or preset selection.
///
/// Identifiers outside the closed set are kept verbatim instead of failing
/// the whole descriptor parse; the script generator rejects them with the
/// pass they belong to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MethodChoice<M> {
    Known(M),
    Unknown(String),
}

impl<M: Default> Default for MethodChoice<M> {
    fn default() -> Self {
        MethodChoice::Known(M::default())
    }
}

impl<M> From<M> for MethodChoice<M> {
    fn from(method: M) -> Self {
        MethodChoice::Known(method)
    }
}

impl<M: Copy> MethodChoice<M> {
    /// The selected method, if it is one we know how to emit
    pub fn known(&self) -> Option<M> {
        match self {
            MethodChoice::Known(m) => Some(*m),
            MethodChoice::Unknown(_) => None,
        }
    }
}

impl<M: MethodId> MethodChoice<M> {
    /// The identifier as written in the descriptor
    pub fn id(&self) -> &str {
        match self {
            MethodChoice::Known(m) => m.id(),
            MethodChoice::Unknown(id) => id,
        }
    }
}
