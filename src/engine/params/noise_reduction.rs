/// Noise reduction parameters.
use serde::{Deserialize, Serialize};

use super::types::{MethodChoice, MethodId};
use super::validation::{ClampRanges, Clamper};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum NoiseReductionMethod {
    #[default]
    SmDegrain,
    McTemporalDenoise,
    QtgmcBuiltin,
}

impl MethodId for NoiseReductionMethod {
    fn id(&self) -> &'static str {
        match self {
            NoiseReductionMethod::SmDegrain => "smDegrain",
            NoiseReductionMethod::McTemporalDenoise => "mcTemporalDenoise",
            NoiseReductionMethod::QtgmcBuiltin => "qtgmcBuiltin",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum NoiseReductionPreset {
    #[default]
    Off,
    Light,
    Moderate,
    Heavy,
    Custom,
}

impl MethodId for NoiseReductionPreset {
    fn id(&self) -> &'static str {
        match self {
            NoiseReductionPreset::Off => "off",
            NoiseReductionPreset::Light => "light",
            NoiseReductionPreset::Moderate => "moderate",
            NoiseReductionPreset::Heavy => "heavy",
            NoiseReductionPreset::Custom => "custom",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NoiseReductionParameters {
    pub enabled: bool,
    pub preset: MethodChoice<NoiseReductionPreset>,
    pub method: MethodChoice<NoiseReductionMethod>,

    // SMDegrain
    /// Temporal radius (1-6)
    #[serde(rename = "smDegrainTr")]
    pub sm_degrain_tr: i32,
    /// Luma SAD threshold
    #[serde(rename = "smDegrainThSAD")]
    pub sm_degrain_th_sad: i32,
    /// Chroma SAD threshold
    #[serde(rename = "smDegrainThSADC")]
    pub sm_degrain_th_sadc: i32,
    #[serde(rename = "smDegrainRefine")]
    pub sm_degrain_refine: bool,
    /// Prefilter mode (0-4)
    #[serde(rename = "smDegrainPrefilter")]
    pub sm_degrain_prefilter: i32,

    // MCTemporalDenoise
    pub mc_temporal_sigma: f64,
    pub mc_temporal_radius: i32,
    pub mc_temporal_profile: String,

    // QTGMC in progressive mode
    pub qtgmc_ez_denoise: f64,
    pub qtgmc_ez_keep_grain: f64,
}

impl Default for NoiseReductionParameters {
    fn default() -> Self {
        Self {
            enabled: false,
            preset: MethodChoice::default(),
            method: MethodChoice::default(),
            sm_degrain_tr: 2,
            sm_degrain_th_sad: 300,
            sm_degrain_th_sadc: 150,
            sm_degrain_refine: true,
            sm_degrain_prefilter: 2,
            mc_temporal_sigma: 4.0,
            mc_temporal_radius: 2,
            mc_temporal_profile: "fast".to_string(),
            qtgmc_ez_denoise: 0.0,
            qtgmc_ez_keep_grain: 0.0,
        }
    }
}

impl NoiseReductionParameters {
    /// Concrete field values after applying the preset.
    ///
    /// `off` and `custom` leave the fields as the caller sent them.
    pub fn effective(&self) -> Self {
        let mut p = self.clone();
        let Some(preset) = self.preset.known() else {
            return p;
        };
        let (tr, th_sad, th_sadc, sigma, ez) = match preset {
            NoiseReductionPreset::Off | NoiseReductionPreset::Custom => return p,
            NoiseReductionPreset::Light => (1, 200, 100, 2.0, 1.0),
            NoiseReductionPreset::Moderate => (2, 300, 150, 4.0, 2.0),
            NoiseReductionPreset::Heavy => (3, 500, 250, 8.0, 4.0),
        };
        p.sm_degrain_tr = tr;
        p.sm_degrain_th_sad = th_sad;
        p.sm_degrain_th_sadc = th_sadc;
        p.mc_temporal_sigma = sigma;
        p.mc_temporal_radius = tr;
        p.qtgmc_ez_denoise = ez;
        p
    }
}

impl ClampRanges for NoiseReductionParameters {
    fn clamp_ranges(&mut self, c: &mut Clamper) {
        c.int("smDegrainTr", &mut self.sm_degrain_tr, 1, 6);
        c.int("smDegrainThSAD", &mut self.sm_degrain_th_sad, 0, 10000);
        c.int("smDegrainThSADC", &mut self.sm_degrain_th_sadc, 0, 10000);
        c.int("smDegrainPrefilter", &mut self.sm_degrain_prefilter, 0, 4);
        c.float("mcTemporalSigma", &mut self.mc_temporal_sigma, 0.0, 100.0);
        c.int("mcTemporalRadius", &mut self.mc_temporal_radius, 1, 6);
        c.float("qtgmcEzDenoise", &mut self.qtgmc_ez_denoise, 0.0, 10.0);
        c.float("qtgmcEzKeepGrain", &mut self.qtgmc_ez_keep_grain, 0.0, 1.0);
    }
}
