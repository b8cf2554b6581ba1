/// Dehalo parameters.
use serde::{Deserialize, Serialize};

use super::types::{MethodChoice, MethodId};
use super::validation::{ClampRanges, Clamper};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DehaloMethod {
    #[default]
    #[serde(rename = "DeHalo_alpha")]
    DehaloAlpha,
    #[serde(rename = "FineDehalo")]
    FineDehalo,
    #[serde(rename = "YAHR")]
    Yahr,
}

impl MethodId for DehaloMethod {
    fn id(&self) -> &'static str {
        match self {
            DehaloMethod::DehaloAlpha => "DeHalo_alpha",
            DehaloMethod::FineDehalo => "FineDehalo",
            DehaloMethod::Yahr => "YAHR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DehaloParameters {
    pub enabled: bool,
    pub method: MethodChoice<DehaloMethod>,

    // DeHalo_alpha / FineDehalo
    pub rx: f64,
    pub ry: f64,
    pub dark_str: f64,
    pub bright_str: f64,

    // FineDehalo mask thresholds
    pub low_threshold: i32,
    pub high_threshold: i32,

    // YAHR
    pub yahr_blur: i32,
    pub yahr_depth: i32,
}

impl Default for DehaloParameters {
    fn default() -> Self {
        Self {
            enabled: false,
            method: MethodChoice::default(),
            rx: 2.0,
            ry: 2.0,
            dark_str: 1.0,
            bright_str: 1.0,
            low_threshold: 50,
            high_threshold: 100,
            yahr_blur: 2,
            yahr_depth: 32,
        }
    }
}

impl ClampRanges for DehaloParameters {
    fn clamp_ranges(&mut self, c: &mut Clamper) {
        c.float("rx", &mut self.rx, 1.0, 3.0);
        c.float("ry", &mut self.ry, 1.0, 3.0);
        c.float("darkStr", &mut self.dark_str, 0.0, 1.0);
        c.float("brightStr", &mut self.bright_str, 0.0, 1.0);
        c.int("lowThreshold", &mut self.low_threshold, 0, 255);
        c.int("highThreshold", &mut self.high_threshold, 0, 255);
        c.int("yahrBlur", &mut self.yahr_blur, 1, 3);
        c.int("yahrDepth", &mut self.yahr_depth, 0, 128);
    }
}
