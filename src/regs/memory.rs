// In-memory register file.
//
// Holds the last value written to every field and a log of every write, so
// commit decisions can be checked without hardware. Histogram results are
// injected with load_histogram / load_legacy_bins.

use std::sync::Mutex;

use super::HardwareRegisterPort;
use crate::color::{
    AtcConfig, CgcLut, ColorLut, ColorMatrix, DitherConfig, DitherType, Stage, LPD_ATC_REG_CNT,
};
use crate::histogram::{ChannelConfig, ChannelId, HistogramBins, HISTOGRAM_MAX};

/// One recorded register access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegWrite {
    Enabled(bool),
    RcdEnabled(bool),
    Size { width: u32, height: u32 },
    /// Stage programmed with a value (`true`) or to bypass (`false`).
    Stage { stage: Stage, enabled: bool },
    LpdAtc,
    HistogramConfig(ChannelId),
    HistogramEnabled(ChannelId, bool),
    LegacyHistogram { enabled: bool },
}

#[derive(Debug)]
struct RegisterFile {
    enabled: bool,
    rcd_enabled: bool,
    size: Option<(u32, u32)>,
    degamma: Option<ColorLut>,
    regamma: Option<ColorLut>,
    cgc: Option<CgcLut>,
    linear_matrix: Option<ColorMatrix>,
    gamma_matrix: Option<ColorMatrix>,
    disp_dither: Option<DitherConfig>,
    cgc_dither: Option<DitherConfig>,
    atc: Option<AtcConfig>,
    lpd_atc: [u32; LPD_ATC_REG_CNT],
    hist_config: [Option<ChannelConfig>; HISTOGRAM_MAX],
    hist_enabled: [bool; HISTOGRAM_MAX],
    hist_bins: [Option<HistogramBins>; HISTOGRAM_MAX],
    legacy: Option<ChannelConfig>,
    legacy_bins: Option<HistogramBins>,
    log: Vec<RegWrite>,
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self {
            enabled: false,
            rcd_enabled: false,
            size: None,
            degamma: None,
            regamma: None,
            cgc: None,
            linear_matrix: None,
            gamma_matrix: None,
            disp_dither: None,
            cgc_dither: None,
            atc: None,
            lpd_atc: [0; LPD_ATC_REG_CNT],
            hist_config: Default::default(),
            hist_enabled: [false; HISTOGRAM_MAX],
            hist_bins: Default::default(),
            legacy: None,
            legacy_bins: None,
            log: Vec::new(),
        }
    }
}

/// [`HardwareRegisterPort`] backed by plain memory.
#[derive(Debug, Default)]
pub struct MemoryRegisters {
    file: Mutex<RegisterFile>,
}

impl MemoryRegisters {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut RegisterFile) -> R) -> R {
        let mut file = self.file.lock().expect("register file mutex poisoned");
        f(&mut file)
    }

    /// Every write since creation or the last [`clear_writes`](Self::clear_writes).
    pub fn writes(&self) -> Vec<RegWrite> {
        self.with(|file| file.log.clone())
    }

    pub fn clear_writes(&self) {
        self.with(|file| file.log.clear());
    }

    /// Number of writes that touched `stage`.
    pub fn stage_writes(&self, stage: Stage) -> usize {
        self.with(|file| {
            file.log
                .iter()
                .filter(|w| matches!(w, RegWrite::Stage { stage: s, .. } if *s == stage))
                .count()
        })
    }

    /// Drop all register content, as when the block loses power.
    /// Injected histogram results survive.
    pub fn power_loss(&self) {
        self.with(|file| {
            let bins = std::mem::take(&mut file.hist_bins);
            let legacy_bins = file.legacy_bins.take();
            let log = std::mem::take(&mut file.log);
            *file = RegisterFile {
                hist_bins: bins,
                legacy_bins,
                log,
                ..RegisterFile::default()
            };
        });
    }

    pub fn enabled(&self) -> bool {
        self.with(|file| file.enabled)
    }

    pub fn rcd_enabled(&self) -> bool {
        self.with(|file| file.rcd_enabled)
    }

    pub fn size(&self) -> Option<(u32, u32)> {
        self.with(|file| file.size)
    }

    pub fn degamma_lut(&self) -> Option<ColorLut> {
        self.with(|file| file.degamma.clone())
    }

    pub fn regamma_lut(&self) -> Option<ColorLut> {
        self.with(|file| file.regamma.clone())
    }

    pub fn cgc_lut(&self) -> Option<CgcLut> {
        self.with(|file| file.cgc.clone())
    }

    pub fn linear_matrix(&self) -> Option<ColorMatrix> {
        self.with(|file| file.linear_matrix)
    }

    pub fn gamma_matrix(&self) -> Option<ColorMatrix> {
        self.with(|file| file.gamma_matrix)
    }

    pub fn dither(&self, kind: DitherType) -> Option<DitherConfig> {
        self.with(|file| match kind {
            DitherType::Disp => file.disp_dither,
            DitherType::Cgc => file.cgc_dither,
        })
    }

    pub fn atc(&self) -> Option<AtcConfig> {
        self.with(|file| file.atc)
    }

    pub fn lpd_atc(&self) -> [u32; LPD_ATC_REG_CNT] {
        self.with(|file| file.lpd_atc)
    }

    /// Simulate the hardware updating its ATC state registers.
    pub fn set_lpd_atc(&self, regs: [u32; LPD_ATC_REG_CNT]) {
        self.with(|file| file.lpd_atc = regs);
    }

    pub fn histogram_config(&self, id: ChannelId) -> Option<ChannelConfig> {
        self.with(|file| file.hist_config[id.index()].clone())
    }

    pub fn histogram_enabled(&self, id: ChannelId) -> bool {
        self.with(|file| file.hist_enabled[id.index()])
    }

    /// Result the channel reports on its next read.
    pub fn load_histogram(&self, id: ChannelId, bins: HistogramBins) {
        self.with(|file| file.hist_bins[id.index()] = Some(bins));
    }

    pub fn legacy_histogram(&self) -> Option<ChannelConfig> {
        self.with(|file| file.legacy.clone())
    }

    pub fn load_legacy_bins(&self, bins: HistogramBins) {
        self.with(|file| file.legacy_bins = Some(bins));
    }
}

impl HardwareRegisterPort for MemoryRegisters {
    fn set_enabled(&self, enable: bool) {
        self.with(|file| {
            file.enabled = enable;
            file.log.push(RegWrite::Enabled(enable));
        });
    }

    fn set_rcd_enabled(&self, enable: bool) {
        self.with(|file| {
            file.rcd_enabled = enable;
            file.log.push(RegWrite::RcdEnabled(enable));
        });
    }

    fn set_size(&self, width: u32, height: u32) {
        self.with(|file| {
            file.size = Some((width, height));
            file.log.push(RegWrite::Size { width, height });
        });
    }

    fn write_degamma_lut(&self, lut: Option<&ColorLut>) {
        self.with(|file| {
            file.degamma = lut.cloned();
            file.log.push(stage_write(Stage::Degamma, lut.is_some()));
        });
    }

    fn write_regamma_lut(&self, lut: Option<&ColorLut>) {
        self.with(|file| {
            file.regamma = lut.cloned();
            file.log.push(stage_write(Stage::Regamma, lut.is_some()));
        });
    }

    fn write_cgc_lut(&self, lut: Option<&CgcLut>) {
        self.with(|file| {
            file.cgc = lut.cloned();
            file.log.push(stage_write(Stage::Cgc, lut.is_some()));
        });
    }

    fn write_linear_matrix(&self, matrix: Option<&ColorMatrix>) {
        self.with(|file| {
            file.linear_matrix = matrix.copied();
            file.log
                .push(stage_write(Stage::LinearMatrix, matrix.is_some()));
        });
    }

    fn write_gamma_matrix(&self, matrix: Option<&ColorMatrix>) {
        self.with(|file| {
            file.gamma_matrix = matrix.copied();
            file.log.push(stage_write(Stage::GammaMatrix, matrix.is_some()));
        });
    }

    fn write_dither(&self, kind: DitherType, config: Option<&DitherConfig>) {
        self.with(|file| {
            match kind {
                DitherType::Disp => file.disp_dither = config.copied(),
                DitherType::Cgc => file.cgc_dither = config.copied(),
            }
            file.log.push(stage_write(Stage::Dither(kind), config.is_some()));
        });
    }

    fn write_atc(&self, config: Option<&AtcConfig>) {
        self.with(|file| {
            file.atc = config.copied();
            file.log.push(stage_write(Stage::Atc, config.is_some()));
        });
    }

    fn read_lpd_atc(&self) -> [u32; LPD_ATC_REG_CNT] {
        self.lpd_atc()
    }

    fn write_lpd_atc(&self, regs: &[u32; LPD_ATC_REG_CNT]) {
        self.with(|file| {
            file.lpd_atc = *regs;
            file.log.push(RegWrite::LpdAtc);
        });
    }

    fn write_histogram_config(&self, id: ChannelId, config: &ChannelConfig) {
        self.with(|file| {
            file.hist_config[id.index()] = Some(config.clone());
            file.log.push(RegWrite::HistogramConfig(id));
        });
    }

    fn set_histogram_enabled(&self, id: ChannelId, enable: bool) {
        self.with(|file| {
            file.hist_enabled[id.index()] = enable;
            file.log.push(RegWrite::HistogramEnabled(id, enable));
        });
    }

    fn read_histogram_bins(&self, id: ChannelId) -> Option<HistogramBins> {
        self.with(|file| {
            file.hist_enabled[id.index()]
                .then(|| file.hist_bins[id.index()].clone().unwrap_or_default())
        })
    }

    fn write_legacy_histogram(&self, config: Option<&ChannelConfig>) {
        self.with(|file| {
            file.legacy = config.cloned();
            file.log.push(RegWrite::LegacyHistogram {
                enabled: config.is_some(),
            });
        });
    }

    fn read_legacy_bins(&self) -> Option<HistogramBins> {
        self.with(|file| {
            file.legacy
                .is_some()
                .then(|| file.legacy_bins.clone().unwrap_or_default())
        })
    }
}

fn stage_write(stage: Stage, enabled: bool) -> RegWrite {
    RegWrite::Stage { stage, enabled }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_channel_reports_nothing() {
        let regs = MemoryRegisters::new();
        let id = ChannelId::new(3).unwrap();
        regs.load_histogram(id, HistogramBins::from_slice(&[1]).unwrap());
        assert!(regs.read_histogram_bins(id).is_none());
        regs.set_histogram_enabled(id, true);
        assert_eq!(regs.read_histogram_bins(id).map(|b| b.total()), Some(1));
    }

    #[test]
    fn test_power_loss_clears_fields_keeps_bins() {
        let regs = MemoryRegisters::new();
        let id = ChannelId::new(0).unwrap();
        regs.set_enabled(true);
        regs.write_gamma_matrix(Some(&ColorMatrix::identity()));
        regs.load_histogram(id, HistogramBins::from_slice(&[2]).unwrap());
        regs.power_loss();

        assert!(!regs.enabled());
        assert!(regs.gamma_matrix().is_none());
        regs.set_histogram_enabled(id, true);
        assert_eq!(regs.read_histogram_bins(id).map(|b| b.total()), Some(2));
        assert_eq!(regs.stage_writes(Stage::GammaMatrix), 1);
    }
}
