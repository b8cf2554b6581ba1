/// Color correction parameters (adjust.Tweak and havsfunc SmoothLevels).
use serde::{Deserialize, Serialize};

use super::types::{MethodChoice, MethodId};
use super::validation::{ClampRanges, Clamper};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ColorCorrectionPreset {
    #[default]
    Off,
    BroadcastSafe,
    EnhanceColors,
    Desaturate,
    Custom,
}

impl MethodId for ColorCorrectionPreset {
    fn id(&self) -> &'static str {
        match self {
            ColorCorrectionPreset::Off => "off",
            ColorCorrectionPreset::BroadcastSafe => "broadcastSafe",
            ColorCorrectionPreset::EnhanceColors => "enhanceColors",
            ColorCorrectionPreset::Desaturate => "desaturate",
            ColorCorrectionPreset::Custom => "custom",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ColorCorrectionParameters {
    pub enabled: bool,
    pub preset: MethodChoice<ColorCorrectionPreset>,

    // Tweak
    /// -255..255
    pub brightness: f64,
    /// 1.0 = unchanged
    pub contrast: f64,
    /// Degrees, -180..180
    pub hue: f64,
    /// 1.0 = unchanged
    pub saturation: f64,
    /// Clamp to TV range
    pub coring: bool,

    // SmoothLevels
    pub apply_levels: bool,
    pub input_low: i32,
    pub input_high: i32,
    pub output_low: i32,
    pub output_high: i32,
    pub gamma: f64,
}

impl Default for ColorCorrectionParameters {
    fn default() -> Self {
        Self {
            enabled: false,
            preset: MethodChoice::default(),
            brightness: 0.0,
            contrast: 1.0,
            hue: 0.0,
            saturation: 1.0,
            coring: false,
            apply_levels: false,
            input_low: 0,
            input_high: 255,
            output_low: 0,
            output_high: 255,
            gamma: 1.0,
        }
    }
}

impl ColorCorrectionParameters {
    /// Concrete field values after applying the preset.
    pub fn effective(&self) -> Self {
        let base = Self {
            enabled: self.enabled,
            preset: self.preset.clone(),
            ..Default::default()
        };
        match self.preset.known() {
            None | Some(ColorCorrectionPreset::Off) | Some(ColorCorrectionPreset::Custom) => {
                self.clone()
            }
            Some(ColorCorrectionPreset::BroadcastSafe) => Self {
                coring: true,
                apply_levels: true,
                output_low: 16,
                output_high: 235,
                ..base
            },
            Some(ColorCorrectionPreset::EnhanceColors) => Self {
                saturation: 1.2,
                contrast: 1.05,
                ..base
            },
            Some(ColorCorrectionPreset::Desaturate) => Self {
                saturation: 0.5,
                ..base
            },
        }
    }

    /// Whether the Tweak call would change anything.
    pub fn has_tweak(&self) -> bool {
        self.brightness != 0.0
            || self.contrast != 1.0
            || self.hue != 0.0
            || self.saturation != 1.0
            || self.coring
    }
}

impl ClampRanges for ColorCorrectionParameters {
    fn clamp_ranges(&mut self, c: &mut Clamper) {
        c.float("brightness", &mut self.brightness, -255.0, 255.0);
        c.float("contrast", &mut self.contrast, 0.0, 10.0);
        c.float("hue", &mut self.hue, -180.0, 180.0);
        c.float("saturation", &mut self.saturation, 0.0, 10.0);
        c.int("inputLow", &mut self.input_low, 0, 255);
        c.int("inputHigh", &mut self.input_high, 0, 255);
        c.int("outputLow", &mut self.output_low, 0, 255);
        c.int("outputHigh", &mut self.output_high, 0, 255);
        c.float("gamma", &mut self.gamma, 0.1, 10.0);
    }
}
