/// Crop and resize parameters.
///
/// One pass kind with two execution slots: crop runs before every other pass
/// and resize after every other pass.
use serde::{Deserialize, Serialize};

use super::types::{MethodChoice, MethodId};
use super::validation::{ClampRanges, Clamper};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ResizeKernel {
    #[default]
    Spline36,
    Lanczos,
    Bicubic,
    Bilinear,
    Nnedi3,
    Eedi3,
}

impl MethodId for ResizeKernel {
    fn id(&self) -> &'static str {
        match self {
            ResizeKernel::Spline36 => "spline36",
            ResizeKernel::Lanczos => "lanczos",
            ResizeKernel::Bicubic => "bicubic",
            ResizeKernel::Bilinear => "bilinear",
            ResizeKernel::Nnedi3 => "nnedi3",
            ResizeKernel::Eedi3 => "eedi3",
        }
    }
}

/// Integer (power of two) upscalers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum UpscaleMethod {
    #[default]
    Nnedi3Rpow2,
    Eedi3Rpow2,
    Spline36,
}

impl MethodId for UpscaleMethod {
    fn id(&self) -> &'static str {
        match self {
            UpscaleMethod::Nnedi3Rpow2 => "nnedi3Rpow2",
            UpscaleMethod::Eedi3Rpow2 => "eedi3Rpow2",
            UpscaleMethod::Spline36 => "spline36",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum CropResizePreset {
    #[default]
    Off,
    RemoveOverscan,
    #[serde(rename = "resize720p")]
    Resize720p,
    #[serde(rename = "resize1080p")]
    Resize1080p,
    #[serde(rename = "resize4k")]
    Resize4k,
    Custom,
}

impl MethodId for CropResizePreset {
    fn id(&self) -> &'static str {
        match self {
            CropResizePreset::Off => "off",
            CropResizePreset::RemoveOverscan => "removeOverscan",
            CropResizePreset::Resize720p => "resize720p",
            CropResizePreset::Resize1080p => "resize1080p",
            CropResizePreset::Resize4k => "resize4k",
            CropResizePreset::Custom => "custom",
        }
    }
}

/// Edge crop in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CropBox {
    pub left: i32,
    pub right: i32,
    pub top: i32,
    pub bottom: i32,
}

impl CropBox {
    pub fn is_empty(&self) -> bool {
        self.left == 0 && self.right == 0 && self.top == 0 && self.bottom == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CropResizeParameters {
    pub enabled: bool,
    pub preset: MethodChoice<CropResizePreset>,

    pub crop_enabled: bool,
    pub crop_left: i32,
    pub crop_right: i32,
    pub crop_top: i32,
    pub crop_bottom: i32,

    pub resize_enabled: bool,
    /// `None` = derived from height and aspect
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_width: Option<i32>,
    /// `None` = derived from width and aspect
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_height: Option<i32>,
    pub kernel: MethodChoice<ResizeKernel>,
    pub maintain_aspect: bool,

    pub use_integer_upscale: bool,
    pub upscale_method: MethodChoice<UpscaleMethod>,
    /// 2 or 4
    pub upscale_factor: i32,
}

impl Default for CropResizeParameters {
    fn default() -> Self {
        Self {
            enabled: false,
            preset: MethodChoice::default(),
            crop_enabled: false,
            crop_left: 0,
            crop_right: 0,
            crop_top: 0,
            crop_bottom: 0,
            resize_enabled: false,
            target_width: None,
            target_height: None,
            kernel: MethodChoice::default(),
            maintain_aspect: true,
            use_integer_upscale: false,
            upscale_method: MethodChoice::default(),
            upscale_factor: 2,
        }
    }
}

impl CropResizeParameters {
    /// Concrete field values after applying the preset.
    pub fn effective(&self) -> Self {
        let base = Self {
            enabled: self.enabled,
            preset: self.preset.clone(),
            kernel: self.kernel.clone(),
            ..Default::default()
        };
        let resize_to = |height: i32| Self {
            resize_enabled: true,
            target_height: Some(height),
            maintain_aspect: true,
            ..base.clone()
        };
        match self.preset.known() {
            None | Some(CropResizePreset::Off) | Some(CropResizePreset::Custom) => self.clone(),
            Some(CropResizePreset::RemoveOverscan) => Self {
                crop_enabled: true,
                crop_left: 8,
                crop_right: 8,
                crop_top: 8,
                crop_bottom: 8,
                ..base.clone()
            },
            Some(CropResizePreset::Resize720p) => resize_to(720),
            Some(CropResizePreset::Resize1080p) => resize_to(1080),
            Some(CropResizePreset::Resize4k) => resize_to(2160),
        }
    }

    pub fn crop_box(&self) -> CropBox {
        CropBox {
            left: self.crop_left,
            right: self.crop_right,
            top: self.crop_top,
            bottom: self.crop_bottom,
        }
    }

    /// Whether the resize slot would do anything.
    pub fn has_resize_target(&self) -> bool {
        self.use_integer_upscale || self.target_width.is_some() || self.target_height.is_some()
    }
}

impl ClampRanges for CropResizeParameters {
    fn clamp_ranges(&mut self, c: &mut Clamper) {
        c.int("cropLeft", &mut self.crop_left, 0, 4096);
        c.int("cropRight", &mut self.crop_right, 0, 4096);
        c.int("cropTop", &mut self.crop_top, 0, 4096);
        c.int("cropBottom", &mut self.crop_bottom, 0, 4096);
        c.opt_int("targetWidth", &mut self.target_width, 16, 8192);
        c.opt_int("targetHeight", &mut self.target_height, 16, 8192);
        c.int("upscaleFactor", &mut self.upscale_factor, 2, 4);
        // rpow2 upscalers only double
        if self.upscale_factor == 3 {
            c.int("upscaleFactor", &mut self.upscale_factor, 4, 4);
        }
    }
}
