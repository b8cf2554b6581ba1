/// QTGMC deinterlacing parameters.
///
/// Mirrors the option surface of havsfunc's QTGMC. Fields left as `None`, or
/// holding QTGMC's own default, are not passed to the filter so the selected
/// preset decides them.
use serde::{Deserialize, Serialize};

use super::types::{MethodChoice, MethodId};
use super::validation::{ClampRanges, Clamper};

/// QTGMC quality/speed presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QtgmcPreset {
    #[serde(alias = "placebo")]
    Placebo,
    #[serde(rename = "Very Slow", alias = "very slow", alias = "verySlow")]
    VerySlow,
    #[default]
    #[serde(alias = "slower")]
    Slower,
    #[serde(alias = "slow")]
    Slow,
    #[serde(alias = "medium")]
    Medium,
    #[serde(alias = "fast")]
    Fast,
    #[serde(alias = "faster")]
    Faster,
    #[serde(rename = "Very Fast", alias = "very fast", alias = "veryFast")]
    VeryFast,
    #[serde(rename = "Super Fast", alias = "super fast", alias = "superFast")]
    SuperFast,
    #[serde(rename = "Ultra Fast", alias = "ultra fast", alias = "ultraFast")]
    UltraFast,
    #[serde(alias = "draft")]
    Draft,
}

impl MethodId for QtgmcPreset {
    fn id(&self) -> &'static str {
        match self {
            QtgmcPreset::Placebo => "Placebo",
            QtgmcPreset::VerySlow => "Very Slow",
            QtgmcPreset::Slower => "Slower",
            QtgmcPreset::Slow => "Slow",
            QtgmcPreset::Medium => "Medium",
            QtgmcPreset::Fast => "Fast",
            QtgmcPreset::Faster => "Faster",
            QtgmcPreset::VeryFast => "Very Fast",
            QtgmcPreset::SuperFast => "Super Fast",
            QtgmcPreset::UltraFast => "Ultra Fast",
            QtgmcPreset::Draft => "Draft",
        }
    }
}

/// All QTGMC parameters the generator knows how to pass through.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QtgmcParameters {
    pub enabled: bool,
    pub preset: MethodChoice<QtgmcPreset>,

    // Input/output
    /// 0 = interlaced, 1 = progressive, 2 = progressive with combing
    pub input_type: i32,
    /// Top field first. `None` lets the detected field order decide.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tff: Option<bool>,
    /// 1 = double rate (50i -> 50p), 2 = single rate (50i -> 25p)
    pub fps_divisor: i32,

    // Temporal radius and repair
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tr0: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tr1: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tr2: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rep0: Option<i32>,
    pub rep1: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rep2: Option<i32>,
    pub rep_chroma: bool,

    // Interpolation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edi_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nn_size: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nn_neurons: Option<i32>,
    pub edi_qual: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edi_max_d: Option<i32>,
    pub chroma_edi: String,

    // Motion analysis
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_size: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlap: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_param: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pel_search: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chroma_motion: Option<bool>,
    pub true_motion: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lambda: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lsad: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p_new: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub p_level: Option<i32>,
    pub global_motion: bool,
    pub dct: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_pel: Option<i32>,
    pub sub_pel_interp: i32,

    // Motion thresholds
    pub th_sad1: i32,
    pub th_sad2: i32,
    pub th_scd1: i32,
    pub th_scd2: i32,

    // Sharpening
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sharpness: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s_mode: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sl_mode: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sl_rad: Option<i32>,
    pub s_ovs: i32,
    pub sv_thin: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sbb: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub srch_clip_pp: Option<i32>,

    // Noise processing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noise_process: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ez_denoise: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ez_keep_grain: Option<f64>,
    pub noise_preset: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub denoiser: Option<String>,
    pub fft_threads: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub denoise_mc: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noise_tr: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sigma: Option<f64>,
    pub chroma_noise: bool,
    pub show_noise: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grain_restore: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noise_restore: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noise_deint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stabilize_noise: Option<bool>,

    // Source matching
    /// 0 = off, 1 = simple, 2 = refined, 3 = double
    pub source_match: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_preset: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_edi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_preset2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_edi2: Option<String>,
    pub match_tr2: i32,
    pub match_enhance: f64,
    pub lossless: i32,

    // Advanced
    pub border: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precise: Option<bool>,
    pub force_tr: i32,
    #[serde(rename = "str")]
    pub brighten_str: f64,
    pub amp: f64,
    pub fast_ma: bool,
    pub e_search_p: bool,
    pub refine_motion: bool,

    // GPU
    pub opencl: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<i32>,
}

impl Default for QtgmcParameters {
    fn default() -> Self {
        Self {
            enabled: true,
            preset: MethodChoice::default(),
            input_type: 0,
            tff: None,
            fps_divisor: 1,
            tr0: None,
            tr1: None,
            tr2: None,
            rep0: None,
            rep1: 0,
            rep2: None,
            rep_chroma: true,
            edi_mode: None,
            nn_size: None,
            nn_neurons: None,
            edi_qual: 1,
            edi_max_d: None,
            chroma_edi: String::new(),
            block_size: None,
            overlap: None,
            search: None,
            search_param: None,
            pel_search: None,
            chroma_motion: None,
            true_motion: false,
            lambda: None,
            lsad: None,
            p_new: None,
            p_level: None,
            global_motion: true,
            dct: 0,
            sub_pel: None,
            sub_pel_interp: 2,
            th_sad1: 640,
            th_sad2: 256,
            th_scd1: 180,
            th_scd2: 98,
            sharpness: None,
            s_mode: None,
            sl_mode: None,
            sl_rad: None,
            s_ovs: 0,
            sv_thin: 0.0,
            sbb: None,
            srch_clip_pp: None,
            noise_process: None,
            ez_denoise: None,
            ez_keep_grain: None,
            noise_preset: "Fast".to_string(),
            denoiser: None,
            fft_threads: 1,
            denoise_mc: None,
            noise_tr: None,
            sigma: None,
            chroma_noise: false,
            show_noise: 0.0,
            grain_restore: None,
            noise_restore: None,
            noise_deint: None,
            stabilize_noise: None,
            source_match: 0,
            match_preset: None,
            match_edi: None,
            match_preset2: None,
            match_edi2: None,
            match_tr2: 1,
            match_enhance: 0.5,
            lossless: 0,
            border: false,
            precise: None,
            force_tr: 0,
            brighten_str: 2.0,
            amp: 0.0625,
            fast_ma: false,
            e_search_p: false,
            refine_motion: false,
            opencl: false,
            device: None,
        }
    }
}

impl QtgmcParameters {
    /// Whether the output carries two frames per interlaced source frame.
    pub fn is_double_rate(&self) -> bool {
        self.fps_divisor == 1 && self.input_type == 0
    }
}

impl ClampRanges for QtgmcParameters {
    fn clamp_ranges(&mut self, c: &mut Clamper) {
        c.int("inputType", &mut self.input_type, 0, 2);
        c.int("fpsDivisor", &mut self.fps_divisor, 1, 2);
        c.opt_int("tr0", &mut self.tr0, 0, 2);
        c.opt_int("tr1", &mut self.tr1, 0, 3);
        c.opt_int("tr2", &mut self.tr2, 0, 3);
        c.opt_int("rep0", &mut self.rep0, 0, 5);
        c.int("rep1", &mut self.rep1, 0, 5);
        c.opt_int("rep2", &mut self.rep2, 0, 5);
        c.opt_int("nnSize", &mut self.nn_size, 0, 6);
        c.opt_int("nnNeurons", &mut self.nn_neurons, 0, 4);
        c.int("ediQual", &mut self.edi_qual, 1, 2);
        c.opt_int("blockSize", &mut self.block_size, 4, 64);
        c.opt_int("search", &mut self.search, 0, 5);
        c.opt_int("pelSearch", &mut self.pel_search, 1, 4);
        c.int("dct", &mut self.dct, 0, 10);
        c.opt_int("subPel", &mut self.sub_pel, 1, 4);
        c.int("subPelInterp", &mut self.sub_pel_interp, 0, 2);
        c.opt_float("sharpness", &mut self.sharpness, 0.0, 2.0);
        c.opt_int("sMode", &mut self.s_mode, 0, 2);
        c.opt_int("slMode", &mut self.sl_mode, 0, 4);
        c.opt_int("sbb", &mut self.sbb, 0, 3);
        c.opt_int("srchClipPp", &mut self.srch_clip_pp, 0, 3);
        c.float("svThin", &mut self.sv_thin, 0.0, 1.0);
        c.opt_int("noiseProcess", &mut self.noise_process, 0, 2);
        c.opt_float("ezKeepGrain", &mut self.ez_keep_grain, 0.0, 1.0);
        c.int("fftThreads", &mut self.fft_threads, 1, 64);
        c.int("sourceMatch", &mut self.source_match, 0, 3);
        c.int("matchTr2", &mut self.match_tr2, 0, 2);
        c.int("lossless", &mut self.lossless, 0, 2);
        c.int("forceTr", &mut self.force_tr, 0, 3);
    }
}
