/// The restoration pipeline and its pass ordering resolver.
///
/// A pipeline always holds one parameter set per pass kind. Execution order
/// is fixed by kind, whatever order the caller declared fields in:
///
/// crop -> deinterlace -> noise reduction -> dehalo -> deblock -> deband ->
/// sharpen -> chroma fixes -> color correction -> resize
use serde::{Deserialize, Serialize};

use super::chroma_fix::ChromaFixParameters;
use super::color_correction::ColorCorrectionParameters;
use super::crop_resize::{CropBox, CropResizeParameters};
use super::deband::DebandParameters;
use super::deblock::DeblockParameters;
use super::deinterlace::QtgmcParameters;
use super::dehalo::DehaloParameters;
use super::noise_reduction::NoiseReductionParameters;
use super::sharpen::SharpenParameters;
use super::types::{ParamClamp, PassKind};
use super::validation::{ClampRanges, Clamper};
use crate::engine::core::FieldOrder;

/// Container for all restoration pass parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RestorationPipeline {
    pub deinterlace: QtgmcParameters,
    pub noise_reduction: NoiseReductionParameters,
    pub dehalo: DehaloParameters,
    pub deblock: DeblockParameters,
    pub deband: DebandParameters,
    pub sharpen: SharpenParameters,
    pub color_correction: ColorCorrectionParameters,
    pub chroma_fixes: ChromaFixParameters,
    pub crop_resize: CropResizeParameters,
}

impl Default for RestorationPipeline {
    fn default() -> Self {
        Self {
            deinterlace: QtgmcParameters::default(),
            noise_reduction: NoiseReductionParameters::default(),
            dehalo: DehaloParameters::default(),
            deblock: DeblockParameters::default(),
            deband: DebandParameters::default(),
            sharpen: SharpenParameters::default(),
            color_correction: ColorCorrectionParameters::default(),
            chroma_fixes: ChromaFixParameters::default(),
            crop_resize: CropResizeParameters::default(),
        }
    }
}

/// One entry of the resolved execution sequence, holding effective parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum PassStep {
    Crop(CropBox),
    Deinterlace(QtgmcParameters),
    NoiseReduction(NoiseReductionParameters),
    Dehalo(DehaloParameters),
    Deblock(DeblockParameters),
    Deband(DebandParameters),
    Sharpen(SharpenParameters),
    ChromaFix(ChromaFixParameters),
    ColorCorrection(ColorCorrectionParameters),
    Resize(CropResizeParameters),
}

impl PassStep {
    pub fn kind(&self) -> PassKind {
        match self {
            PassStep::Crop(_) | PassStep::Resize(_) => PassKind::CropResize,
            PassStep::Deinterlace(_) => PassKind::Deinterlace,
            PassStep::NoiseReduction(_) => PassKind::NoiseReduction,
            PassStep::Dehalo(_) => PassKind::Dehalo,
            PassStep::Deblock(_) => PassKind::Deblock,
            PassStep::Deband(_) => PassKind::Deband,
            PassStep::Sharpen(_) => PassKind::Sharpen,
            PassStep::ChromaFix(_) => PassKind::ChromaFixes,
            PassStep::ColorCorrection(_) => PassKind::ColorCorrection,
        }
    }

    /// Short stable name, used in logs and the run manifest
    pub fn label(&self) -> &'static str {
        match self {
            PassStep::Crop(_) => "crop",
            PassStep::Deinterlace(_) => "deinterlace",
            PassStep::NoiseReduction(_) => "noiseReduction",
            PassStep::Dehalo(_) => "dehalo",
            PassStep::Deblock(_) => "deblock",
            PassStep::Deband(_) => "deband",
            PassStep::Sharpen(_) => "sharpen",
            PassStep::ChromaFix(_) => "chromaFixes",
            PassStep::ColorCorrection(_) => "colorCorrection",
            PassStep::Resize(_) => "resize",
        }
    }

    /// Position in the canonical execution order
    pub fn slot(&self) -> u8 {
        match self {
            PassStep::Crop(_) => 0,
            PassStep::Deinterlace(_) => 1,
            PassStep::NoiseReduction(_) => 2,
            PassStep::Dehalo(_) => 3,
            PassStep::Deblock(_) => 4,
            PassStep::Deband(_) => 5,
            PassStep::Sharpen(_) => 6,
            PassStep::ChromaFix(_) => 7,
            PassStep::ColorCorrection(_) => 8,
            PassStep::Resize(_) => 9,
        }
    }
}

impl RestorationPipeline {
    /// Pipeline for descriptors that only carry legacy QTGMC parameters.
    pub fn from_legacy(qtgmc: &QtgmcParameters) -> Self {
        Self {
            deinterlace: qtgmc.clone(),
            ..Self::disabled()
        }
    }

    /// Every pass switched off (pass-through).
    pub fn disabled() -> Self {
        let mut pipeline = Self::default();
        pipeline.deinterlace.enabled = false;
        pipeline
    }

    pub fn is_pass_enabled(&self, pass: PassKind) -> bool {
        match pass {
            PassKind::Deinterlace => self.deinterlace.enabled,
            PassKind::NoiseReduction => self.noise_reduction.enabled,
            PassKind::Dehalo => self.dehalo.enabled,
            PassKind::Deblock => self.deblock.enabled,
            PassKind::Deband => self.deband.enabled,
            PassKind::Sharpen => self.sharpen.enabled,
            PassKind::ColorCorrection => self.color_correction.enabled,
            PassKind::ChromaFixes => self.chroma_fixes.enabled,
            PassKind::CropResize => self.crop_resize.enabled,
        }
    }

    pub fn enabled_pass_count(&self) -> usize {
        PassKind::ALL
            .iter()
            .filter(|kind| self.is_pass_enabled(**kind))
            .count()
    }

    /// Pull every bounded field into range, one record per change.
    pub fn clamp_ranges(&mut self) -> Vec<ParamClamp> {
        let mut c = Clamper::new(PassKind::Deinterlace);
        self.deinterlace.clamp_ranges(&mut c);
        c.set_pass(PassKind::NoiseReduction);
        self.noise_reduction.clamp_ranges(&mut c);
        c.set_pass(PassKind::Dehalo);
        self.dehalo.clamp_ranges(&mut c);
        c.set_pass(PassKind::Deblock);
        self.deblock.clamp_ranges(&mut c);
        c.set_pass(PassKind::Deband);
        self.deband.clamp_ranges(&mut c);
        c.set_pass(PassKind::Sharpen);
        self.sharpen.clamp_ranges(&mut c);
        c.set_pass(PassKind::ColorCorrection);
        self.color_correction.clamp_ranges(&mut c);
        c.set_pass(PassKind::ChromaFixes);
        self.chroma_fixes.clamp_ranges(&mut c);
        c.set_pass(PassKind::CropResize);
        self.crop_resize.clamp_ranges(&mut c);
        c.finish()
    }

    /// Resolve the enabled passes into the canonical execution sequence.
    ///
    /// Presets are expanded here, so every step carries concrete values.
    /// `detected` fills in the field order when the deinterlace pass leaves
    /// `tff` unset.
    pub fn resolve(&self, detected: Option<FieldOrder>) -> Vec<PassStep> {
        let mut steps = Vec::new();

        let crop_resize = self.crop_resize.effective();
        let crop_resize_known = crop_resize.preset.known().is_some();
        if crop_resize.enabled && crop_resize.crop_enabled {
            let crop = crop_resize.crop_box();
            if !crop.is_empty() {
                steps.push(PassStep::Crop(crop));
            }
        }

        if self.deinterlace.enabled {
            let mut qtgmc = self.deinterlace.clone();
            if qtgmc.tff.is_none() {
                qtgmc.tff = detected.and_then(|order| order.tff_value());
            }
            steps.push(PassStep::Deinterlace(qtgmc));
        }
        if self.noise_reduction.enabled {
            steps.push(PassStep::NoiseReduction(self.noise_reduction.effective()));
        }
        if self.dehalo.enabled {
            steps.push(PassStep::Dehalo(self.dehalo.clone()));
        }
        if self.deblock.enabled {
            steps.push(PassStep::Deblock(self.deblock.clone()));
        }
        if self.deband.enabled {
            steps.push(PassStep::Deband(self.deband.clone()));
        }
        if self.sharpen.enabled {
            steps.push(PassStep::Sharpen(self.sharpen.clone()));
        }
        if self.chroma_fixes.enabled {
            let chroma = self.chroma_fixes.effective();
            // Unknown presets are kept so the generator can report them
            if chroma.applies_any() || chroma.preset.known().is_none() {
                steps.push(PassStep::ChromaFix(chroma));
            }
        }
        if self.color_correction.enabled {
            steps.push(PassStep::ColorCorrection(self.color_correction.effective()));
        }

        if crop_resize.enabled
            && (!crop_resize_known || (crop_resize.resize_enabled && crop_resize.has_resize_target()))
        {
            steps.push(PassStep::Resize(crop_resize));
        }

        steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::params::chroma_fix::ChromaFixPreset;
    use crate::engine::params::crop_resize::CropResizePreset;
    use crate::engine::params::types::MethodChoice;

    fn labels(steps: &[PassStep]) -> Vec<&'static str> {
        steps.iter().map(PassStep::label).collect()
    }

    #[test]
    fn test_default_pipeline_only_deinterlaces() {
        let pipeline = RestorationPipeline::default();
        assert_eq!(labels(&pipeline.resolve(None)), vec!["deinterlace"]);
        assert_eq!(pipeline.enabled_pass_count(), 1);
    }

    #[test]
    fn test_disabled_pipeline_is_pass_through() {
        assert!(RestorationPipeline::disabled().resolve(None).is_empty());
    }

    #[test]
    fn test_canonical_order_for_everything_enabled() {
        let mut pipeline = RestorationPipeline::default();
        pipeline.noise_reduction.enabled = true;
        pipeline.dehalo.enabled = true;
        pipeline.deblock.enabled = true;
        pipeline.deband.enabled = true;
        pipeline.sharpen.enabled = true;
        pipeline.color_correction.enabled = true;
        pipeline.chroma_fixes.enabled = true;
        pipeline.chroma_fixes.apply_vinverse = true;
        pipeline.crop_resize = CropResizeParameters {
            enabled: true,
            crop_enabled: true,
            crop_left: 8,
            resize_enabled: true,
            target_width: Some(1280),
            ..Default::default()
        };

        assert_eq!(
            labels(&pipeline.resolve(None)),
            vec![
                "crop",
                "deinterlace",
                "noiseReduction",
                "dehalo",
                "deblock",
                "deband",
                "sharpen",
                "chromaFixes",
                "colorCorrection",
                "resize",
            ]
        );
    }

    #[test]
    fn test_crop_only_is_single_leading_entry() {
        let mut pipeline = RestorationPipeline::disabled();
        pipeline.crop_resize.enabled = true;
        pipeline.crop_resize.crop_enabled = true;
        pipeline.crop_resize.crop_top = 4;
        let steps = pipeline.resolve(None);
        assert_eq!(
            steps,
            vec![PassStep::Crop(CropBox {
                top: 4,
                ..Default::default()
            })]
        );
    }

    #[test]
    fn test_resize_only_is_single_trailing_entry() {
        let mut pipeline = RestorationPipeline::default();
        pipeline.crop_resize.enabled = true;
        pipeline.crop_resize.resize_enabled = true;
        pipeline.crop_resize.use_integer_upscale = true;
        assert_eq!(labels(&pipeline.resolve(None)), vec!["deinterlace", "resize"]);
    }

    #[test]
    fn test_sub_options_ignored_when_kind_disabled() {
        let mut pipeline = RestorationPipeline::disabled();
        pipeline.crop_resize.crop_enabled = true;
        pipeline.crop_resize.crop_left = 16;
        pipeline.crop_resize.resize_enabled = true;
        pipeline.crop_resize.target_height = Some(720);
        assert!(pipeline.resolve(None).is_empty());
    }

    #[test]
    fn test_resize_without_target_is_dropped() {
        let mut pipeline = RestorationPipeline::disabled();
        pipeline.crop_resize.enabled = true;
        pipeline.crop_resize.resize_enabled = true;
        assert!(pipeline.resolve(None).is_empty());
    }

    #[test]
    fn test_preset_expands_before_ordering() {
        let mut pipeline = RestorationPipeline::disabled();
        pipeline.crop_resize.enabled = true;
        pipeline.crop_resize.preset = CropResizePreset::Resize720p.into();
        let steps = pipeline.resolve(None);
        assert_eq!(labels(&steps), vec!["resize"]);
        let PassStep::Resize(resize) = &steps[0] else {
            panic!("expected resize step");
        };
        assert_eq!(resize.target_height, Some(720));
    }

    #[test]
    fn test_chroma_fix_without_filters_is_dropped() {
        let mut pipeline = RestorationPipeline::disabled();
        pipeline.chroma_fixes.enabled = true;
        assert!(pipeline.resolve(None).is_empty());

        pipeline.chroma_fixes.preset = ChromaFixPreset::AnalogRepair.into();
        assert_eq!(labels(&pipeline.resolve(None)), vec!["chromaFixes"]);
    }

    #[test]
    fn test_unknown_preset_survives_resolution() {
        let mut pipeline = RestorationPipeline::disabled();
        pipeline.chroma_fixes.enabled = true;
        pipeline.chroma_fixes.preset = MethodChoice::Unknown("sepia".to_string());
        assert_eq!(labels(&pipeline.resolve(None)), vec!["chromaFixes"]);
    }

    #[test]
    fn test_detected_field_order_fills_unset_tff() {
        let pipeline = RestorationPipeline::default();
        let steps = pipeline.resolve(Some(FieldOrder::BottomFieldFirst));
        let PassStep::Deinterlace(qtgmc) = &steps[0] else {
            panic!("expected deinterlace step");
        };
        assert_eq!(qtgmc.tff, Some(false));

        let mut explicit = RestorationPipeline::default();
        explicit.deinterlace.tff = Some(true);
        let steps = explicit.resolve(Some(FieldOrder::BottomFieldFirst));
        let PassStep::Deinterlace(qtgmc) = &steps[0] else {
            panic!("expected deinterlace step");
        };
        assert_eq!(qtgmc.tff, Some(true));
    }

    #[test]
    fn test_legacy_pipeline() {
        let qtgmc = QtgmcParameters {
            fps_divisor: 2,
            ..Default::default()
        };
        let pipeline = RestorationPipeline::from_legacy(&qtgmc);
        assert_eq!(pipeline.enabled_pass_count(), 1);
        assert_eq!(pipeline.deinterlace.fps_divisor, 2);
    }

    #[test]
    fn test_clamp_ranges_attributes_pass() {
        let mut pipeline = RestorationPipeline::default();
        pipeline.deband.range = 1;
        pipeline.sharpen.cas_sharpness = 4.0;
        let clamps = pipeline.clamp_ranges();
        assert_eq!(clamps.len(), 2);
        assert_eq!(clamps[0].pass, PassKind::Deband);
        assert_eq!(clamps[1].pass, PassKind::Sharpen);
        assert_eq!(pipeline.deband.range, 8);
    }

    #[test]
    fn test_json_keys() {
        let json = serde_json::to_value(RestorationPipeline::default()).unwrap();
        for key in [
            "deinterlace",
            "noiseReduction",
            "dehalo",
            "deblock",
            "deband",
            "sharpen",
            "colorCorrection",
            "chromaFixes",
            "cropResize",
        ] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }
}
