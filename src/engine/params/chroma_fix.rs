/// Chroma repair parameters: FixChromaBleedingMod, LUTDeCrawl and Vinverse.
use serde::{Deserialize, Serialize};

use super::types::{MethodChoice, MethodId};
use super::validation::{ClampRanges, Clamper};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ChromaFixPreset {
    #[default]
    Off,
    VhsCleanup,
    BroadcastFix,
    AnalogRepair,
    Custom,
}

impl MethodId for ChromaFixPreset {
    fn id(&self) -> &'static str {
        match self {
            ChromaFixPreset::Off => "off",
            ChromaFixPreset::VhsCleanup => "vhsCleanup",
            ChromaFixPreset::BroadcastFix => "broadcastFix",
            ChromaFixPreset::AnalogRepair => "analogRepair",
            ChromaFixPreset::Custom => "custom",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChromaFixParameters {
    pub enabled: bool,
    pub preset: MethodChoice<ChromaFixPreset>,

    // FixChromaBleedingMod
    pub apply_chroma_bleeding_fix: bool,
    pub chroma_bleed_cx: i32,
    pub chroma_bleed_cy: i32,
    /// Any value above zero turns on the filter's blur step
    pub chroma_bleed_c_blur: f64,
    pub chroma_bleed_strength: f64,

    // LUTDeCrawl
    pub apply_de_crawl: bool,
    pub de_crawl_y_thresh: i32,
    pub de_crawl_c_thresh: i32,
    pub de_crawl_max_diff: i32,

    // Vinverse
    pub apply_vinverse: bool,
    pub vinverse_sstr: f64,
    pub vinverse_amnt: i32,
    pub vinverse_scl: i32,
}

impl Default for ChromaFixParameters {
    fn default() -> Self {
        Self {
            enabled: false,
            preset: MethodChoice::default(),
            apply_chroma_bleeding_fix: false,
            chroma_bleed_cx: 4,
            chroma_bleed_cy: 4,
            chroma_bleed_c_blur: 0.7,
            chroma_bleed_strength: 1.0,
            apply_de_crawl: false,
            de_crawl_y_thresh: 10,
            de_crawl_c_thresh: 10,
            de_crawl_max_diff: 50,
            apply_vinverse: false,
            vinverse_sstr: 2.7,
            vinverse_amnt: 255,
            vinverse_scl: 12,
        }
    }
}

impl ChromaFixParameters {
    /// Concrete field values after applying the preset.
    pub fn effective(&self) -> Self {
        let base = Self {
            enabled: self.enabled,
            preset: self.preset.clone(),
            ..Default::default()
        };
        match self.preset.known() {
            None | Some(ChromaFixPreset::Off) | Some(ChromaFixPreset::Custom) => self.clone(),
            Some(ChromaFixPreset::VhsCleanup) => Self {
                apply_chroma_bleeding_fix: true,
                apply_de_crawl: true,
                ..base
            },
            Some(ChromaFixPreset::BroadcastFix) => Self {
                apply_de_crawl: true,
                apply_vinverse: true,
                ..base
            },
            Some(ChromaFixPreset::AnalogRepair) => Self {
                apply_chroma_bleeding_fix: true,
                chroma_bleed_strength: 0.8,
                apply_de_crawl: true,
                apply_vinverse: true,
                ..base
            },
        }
    }

    /// Whether any of the three sub-filters is switched on.
    pub fn applies_any(&self) -> bool {
        self.apply_chroma_bleeding_fix || self.apply_de_crawl || self.apply_vinverse
    }
}

impl ClampRanges for ChromaFixParameters {
    fn clamp_ranges(&mut self, c: &mut Clamper) {
        c.int("chromaBleedCx", &mut self.chroma_bleed_cx, -16, 16);
        c.int("chromaBleedCy", &mut self.chroma_bleed_cy, -16, 16);
        c.float("chromaBleedCBlur", &mut self.chroma_bleed_c_blur, 0.0, 3.0);
        c.float("chromaBleedStrength", &mut self.chroma_bleed_strength, 0.0, 1.0);
        c.int("deCrawlYThresh", &mut self.de_crawl_y_thresh, 0, 255);
        c.int("deCrawlCThresh", &mut self.de_crawl_c_thresh, 0, 255);
        c.int("deCrawlMaxDiff", &mut self.de_crawl_max_diff, 0, 255);
        c.float("vinverseSstr", &mut self.vinverse_sstr, 0.0, 10.0);
        c.int("vinverseAmnt", &mut self.vinverse_amnt, 0, 255);
        c.int("vinverseScl", &mut self.vinverse_scl, 1, 64);
    }
}
