/// Deblocking parameters.
use serde::{Deserialize, Serialize};

use super::types::{MethodChoice, MethodId};
use super::validation::{ClampRanges, Clamper};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DeblockMethod {
    #[default]
    #[serde(rename = "Deblock_QED")]
    DeblockQed,
    #[serde(rename = "Deblock")]
    Deblock,
}

impl MethodId for DeblockMethod {
    fn id(&self) -> &'static str {
        match self {
            DeblockMethod::DeblockQed => "Deblock_QED",
            DeblockMethod::Deblock => "Deblock",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeblockParameters {
    pub enabled: bool,
    pub method: MethodChoice<DeblockMethod>,
    /// Strength on block edges (0-60)
    pub quant1: i32,
    /// Strength inside blocks (0-60)
    pub quant2: i32,
    pub a_offset1: i32,
    pub a_offset2: i32,
    /// Accepted for descriptor compatibility; neither filter takes it.
    pub block_size: i32,
    /// Accepted for descriptor compatibility; neither filter takes it.
    pub overlap: i32,
}

impl Default for DeblockParameters {
    fn default() -> Self {
        Self {
            enabled: false,
            method: MethodChoice::default(),
            quant1: 24,
            quant2: 26,
            a_offset1: 1,
            a_offset2: 1,
            block_size: 8,
            overlap: 4,
        }
    }
}

impl ClampRanges for DeblockParameters {
    fn clamp_ranges(&mut self, c: &mut Clamper) {
        c.int("quant1", &mut self.quant1, 0, 60);
        c.int("quant2", &mut self.quant2, 0, 60);
        c.int("aOffset1", &mut self.a_offset1, -60, 60);
        c.int("aOffset2", &mut self.a_offset2, -60, 60);
        c.int("blockSize", &mut self.block_size, 4, 8);
        c.int("overlap", &mut self.overlap, 0, self.block_size / 2);
    }
}
