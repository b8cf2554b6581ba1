/// Restoration pass parameter model.
///
/// One typed parameter set per pass kind, the pipeline aggregate that holds
/// them, and the resolver that turns the enabled passes into the fixed
/// execution sequence the script generator consumes.
pub mod chroma_fix;
pub mod color_correction;
pub mod crop_resize;
pub mod deband;
pub mod deblock;
pub mod dehalo;
pub mod deinterlace;
pub mod noise_reduction;
pub mod pipeline;
pub mod sharpen;
pub mod types;
mod validation;

pub use chroma_fix::{ChromaFixParameters, ChromaFixPreset};
pub use color_correction::{ColorCorrectionParameters, ColorCorrectionPreset};
pub use crop_resize::{CropBox, CropResizeParameters, CropResizePreset, ResizeKernel, UpscaleMethod};
pub use deband::DebandParameters;
pub use deblock::{DeblockMethod, DeblockParameters};
pub use dehalo::{DehaloMethod, DehaloParameters};
pub use deinterlace::{QtgmcParameters, QtgmcPreset};
pub use noise_reduction::{NoiseReductionMethod, NoiseReductionParameters, NoiseReductionPreset};
pub use pipeline::{PassStep, RestorationPipeline};
pub use sharpen::{SharpenMethod, SharpenParameters};
pub use types::{MethodChoice, MethodId, ParamClamp, PassKind, Range, Value};
pub use validation::{ClampRanges, Clamper, clamp_value};
