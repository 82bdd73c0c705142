// Color-pipeline data containers.
//
// The core never computes these; callers build them and hand them over as
// shared references, the commit path only compares and programs them.

pub mod atc;
pub mod dither;
pub mod lut;
pub mod matrix;

pub use atc::{AtcConfig, LPD_ATC_REG_CNT};
pub use dither::{DitherConfig, DitherType};
pub use lut::{CgcLut, ColorLut, ColorLutEntry, CGC_LUT_SIZE, DEGAMMA_LUT_SIZE, REGAMMA_LUT_SIZE};
pub use matrix::ColorMatrix;

/// Programmable stage of the enhancement pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Degamma,
    Regamma,
    Cgc,
    LinearMatrix,
    GammaMatrix,
    Dither(DitherType),
    Atc,
}

impl Stage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Degamma => "degamma",
            Self::Regamma => "regamma",
            Self::Cgc => "cgc",
            Self::LinearMatrix => "linear_matrix",
            Self::GammaMatrix => "gamma_matrix",
            Self::Dither(DitherType::Disp) => "disp_dither",
            Self::Dither(DitherType::Cgc) => "cgc_dither",
            Self::Atc => "atc",
        }
    }
}
