/// Debanding parameters for neo_f3kdb.
use serde::{Deserialize, Serialize};

use super::validation::{ClampRanges, Clamper};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DebandParameters {
    pub enabled: bool,
    /// Banding detection range (8-128)
    pub range: i32,
    pub y: i32,
    pub cb: i32,
    pub cr: i32,
    pub grain_y: i32,
    pub grain_c: i32,
    pub dynamic_grain: bool,
    /// 8, 10 or 16
    pub output_depth: i32,
}

impl Default for DebandParameters {
    fn default() -> Self {
        Self {
            enabled: false,
            range: 15,
            y: 32,
            cb: 32,
            cr: 32,
            grain_y: 24,
            grain_c: 24,
            dynamic_grain: true,
            output_depth: 16,
        }
    }
}

impl ClampRanges for DebandParameters {
    fn clamp_ranges(&mut self, c: &mut Clamper) {
        c.int("range", &mut self.range, 8, 128);
        c.int("y", &mut self.y, 0, 64);
        c.int("cb", &mut self.cb, 0, 64);
        c.int("cr", &mut self.cr, 0, 64);
        c.int("grainY", &mut self.grain_y, 0, 64);
        c.int("grainC", &mut self.grain_c, 0, 64);
        c.int("outputDepth", &mut self.output_depth, 8, 16);
        // Only 8, 10 and 16 are valid depths
        if !matches!(self.output_depth, 8 | 10 | 16) {
            let snapped = if self.output_depth < 10 { 10 } else { 16 };
            c.int("outputDepth", &mut self.output_depth, snapped, snapped);
        }
    }
}
