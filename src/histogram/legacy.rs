// Legacy single-channel histogram.
//
// Kept for older control-plane clients. Bookkeeping is independent of the
// multi-channel array: it has its own registers, its own bins, and its
// results always go to the pending events list.

use std::sync::Arc;

use log::debug;

use super::config::ChannelConfig;
use super::HistogramBins;
use crate::regs::HardwareRegisterPort;

#[derive(Debug, Default)]
pub struct LegacyHistogram {
    config: Option<Arc<ChannelConfig>>,
    armed: bool,
    suspended: bool,
    bins: Option<HistogramBins>,
}

impl LegacyHistogram {
    pub fn config(&self) -> Option<&Arc<ChannelConfig>> {
        self.config.as_ref()
    }

    /// Waiting for the next frame completion.
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Last captured result.
    pub fn bins(&self) -> Option<&HistogramBins> {
        self.bins.as_ref()
    }

    /// Program and arm a one-shot capture. Replaces any earlier request.
    pub(crate) fn request<P: HardwareRegisterPort>(&mut self, port: &P, config: Arc<ChannelConfig>) {
        port.write_legacy_histogram(Some(&config));
        self.config = Some(config);
        self.armed = true;
        self.suspended = false;
        debug!("legacy histogram: armed");
    }

    /// Record a request made while unpowered; [`resume`](Self::resume) arms it.
    pub(crate) fn defer(&mut self, config: Arc<ChannelConfig>) {
        self.config = Some(config);
        self.armed = false;
        self.suspended = true;
        self.bins = None;
        debug!("legacy histogram: request deferred until power returns");
    }

    pub(crate) fn cancel<P: HardwareRegisterPort>(&mut self, port: &P) {
        if self.config.is_none() {
            return;
        }
        if !self.suspended {
            port.write_legacy_histogram(None);
        }
        *self = Self::default();
        debug!("legacy histogram: cancelled");
    }

    pub(crate) fn complete(&mut self, bins: HistogramBins) -> bool {
        if !self.armed {
            return false;
        }
        self.armed = false;
        self.bins = Some(bins);
        true
    }

    pub(crate) fn hibernate(&mut self) {
        if self.config.is_some() {
            self.suspended = true;
            self.armed = false;
        }
    }

    pub(crate) fn resume<P: HardwareRegisterPort>(&mut self, port: &P) {
        if !self.suspended {
            return;
        }
        self.bins = None;
        if let Some(config) = self.config.clone() {
            self.request(port, config);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram::config::{Roi, Weights};
    use crate::regs::MemoryRegisters;

    fn config() -> Arc<ChannelConfig> {
        Arc::new(ChannelConfig::new(Roi::new(0, 0, 32, 32), Weights::BT709).with_threshold(16))
    }

    #[test]
    fn test_request_is_one_shot() {
        let port = MemoryRegisters::new();
        let mut legacy = LegacyHistogram::default();
        legacy.request(&port, config());
        assert!(legacy.is_armed());
        assert!(port.legacy_histogram().is_some());

        assert!(legacy.complete(HistogramBins::from_slice(&[3]).unwrap()));
        assert!(!legacy.is_armed());
        assert!(!legacy.complete(HistogramBins::zeroed()));
        assert_eq!(legacy.bins().map(HistogramBins::total), Some(3));
    }

    #[test]
    fn test_cancel_clears_registers() {
        let port = MemoryRegisters::new();
        let mut legacy = LegacyHistogram::default();
        legacy.request(&port, config());
        legacy.cancel(&port);
        assert!(legacy.config().is_none());
        assert!(port.legacy_histogram().is_none());
    }

    #[test]
    fn test_resume_rearms() {
        let port = MemoryRegisters::new();
        let mut legacy = LegacyHistogram::default();
        legacy.request(&port, config());
        legacy.hibernate();
        assert!(legacy.is_suspended());
        assert!(!legacy.complete(HistogramBins::zeroed()));
        legacy.resume(&port);
        assert!(legacy.is_armed());
        assert!(!legacy.is_suspended());
    }

    #[test]
    fn test_deferred_request_armed_on_resume() {
        let port = MemoryRegisters::new();
        let mut legacy = LegacyHistogram::default();
        legacy.defer(config());
        assert!(!legacy.is_armed());
        assert!(port.legacy_histogram().is_none());

        legacy.resume(&port);
        assert!(legacy.is_armed());
        assert!(port.legacy_histogram().is_some());
    }
}
