/// Sharpening parameters.
use serde::{Deserialize, Serialize};

use super::types::{MethodChoice, MethodId};
use super::validation::{ClampRanges, Clamper};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SharpenMethod {
    #[default]
    #[serde(rename = "LSFmod")]
    LsfMod,
    #[serde(rename = "CAS")]
    Cas,
}

impl MethodId for SharpenMethod {
    fn id(&self) -> &'static str {
        match self {
            SharpenMethod::LsfMod => "LSFmod",
            SharpenMethod::Cas => "CAS",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SharpenParameters {
    pub enabled: bool,
    pub method: MethodChoice<SharpenMethod>,

    // LSFmod
    /// 0-200, 100 is the filter's neutral strength
    pub strength: i32,
    pub overshoot: i32,
    pub undershoot: i32,
    pub soft_edge: i32,

    // CAS
    pub cas_sharpness: f64,
}

impl Default for SharpenParameters {
    fn default() -> Self {
        Self {
            enabled: false,
            method: MethodChoice::default(),
            strength: 100,
            overshoot: 1,
            undershoot: 1,
            soft_edge: 0,
            cas_sharpness: 0.5,
        }
    }
}

impl ClampRanges for SharpenParameters {
    fn clamp_ranges(&mut self, c: &mut Clamper) {
        c.int("strength", &mut self.strength, 0, 200);
        c.int("overshoot", &mut self.overshoot, 0, 100);
        c.int("undershoot", &mut self.undershoot, 0, 100);
        c.int("softEdge", &mut self.soft_edge, -2, 100);
        c.float("casSharpness", &mut self.cas_sharpness, 0.0, 1.0);
    }
}
