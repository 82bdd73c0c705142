// Hardware register access.
//
// The core only talks to hardware through HardwareRegisterPort. Accessors are
// typed per field and take &self: each call is one self-contained register
// access, like an MMIO write, so the port can be shared between the commit
// path and the frame-completion path without an outer lock.

pub mod memory;

use crate::color::{AtcConfig, CgcLut, ColorLut, ColorMatrix, DitherConfig, DitherType, LPD_ATC_REG_CNT};
use crate::histogram::{ChannelConfig, ChannelId, HistogramBins};

pub use memory::{MemoryRegisters, RegWrite};

/// Typed field-level access to the enhancement block.
///
/// `None` arguments program the corresponding stage to bypass.
pub trait HardwareRegisterPort: Send + Sync {
    fn set_enabled(&self, enable: bool);
    fn set_rcd_enabled(&self, enable: bool);
    fn set_size(&self, width: u32, height: u32);

    fn write_degamma_lut(&self, lut: Option<&ColorLut>);
    fn write_regamma_lut(&self, lut: Option<&ColorLut>);
    fn write_cgc_lut(&self, lut: Option<&CgcLut>);
    fn write_linear_matrix(&self, matrix: Option<&ColorMatrix>);
    fn write_gamma_matrix(&self, matrix: Option<&ColorMatrix>);
    fn write_dither(&self, kind: DitherType, config: Option<&DitherConfig>);
    fn write_atc(&self, config: Option<&AtcConfig>);

    /// Registers that lose content when power retention is dropped.
    fn read_lpd_atc(&self) -> [u32; LPD_ATC_REG_CNT];
    fn write_lpd_atc(&self, regs: &[u32; LPD_ATC_REG_CNT]);

    fn write_histogram_config(&self, id: ChannelId, config: &ChannelConfig);
    fn set_histogram_enabled(&self, id: ChannelId, enable: bool);
    /// Latched bins of the last completed frame, `None` when the channel has
    /// not produced a result.
    fn read_histogram_bins(&self, id: ChannelId) -> Option<HistogramBins>;

    fn write_legacy_histogram(&self, config: Option<&ChannelConfig>);
    fn read_legacy_bins(&self) -> Option<HistogramBins>;
}
