// Per-channel run-state machine.
//
//   DISABLED --enable--> PENDING_FRAMEDONE --frame done--> IDLE
//      ^                    |   ^                           |
//      +------disable-------+   +---------re-arm------------+
//   PENDING_FRAMEDONE / IDLE --hibernate--> HIBERNATION --resume--> PENDING_FRAMEDONE
//   DISABLED / IDLE --enable while unpowered--> HIBERNATION
//
// Register writes happen only on arm and disarm; configure is bookkeeping.

use std::sync::Arc;

use log::debug;

use super::config::ChannelConfig;
use super::{ChannelId, DeliveryTarget, HistogramBins, HwState, RunState};
use crate::error::{DqeError, DqeResult};
use crate::regs::HardwareRegisterPort;

/// One histogram channel record.
#[derive(Debug)]
pub struct ChannelState {
    id: ChannelId,
    hw_state: HwState,
    run_state: RunState,
    bins: Option<HistogramBins>,
    delivery: Option<DeliveryTarget>,
    config: Option<Arc<ChannelConfig>>,
}

impl ChannelState {
    pub(crate) fn new(id: ChannelId) -> Self {
        Self {
            id,
            hw_state: HwState::Off,
            run_state: RunState::Disabled,
            bins: None,
            delivery: None,
            config: None,
        }
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn hw_state(&self) -> HwState {
        self.hw_state
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn config(&self) -> Option<&Arc<ChannelConfig>> {
        self.config.as_ref()
    }

    pub fn delivery(&self) -> Option<&DeliveryTarget> {
        self.delivery.as_ref()
    }

    /// Captured result, only while IDLE.
    pub fn bins(&self) -> Option<&HistogramBins> {
        match self.run_state {
            RunState::Idle => self.bins.as_ref(),
            _ => None,
        }
    }

    /// Replace the configuration. Allowed from DISABLED or IDLE only.
    pub(crate) fn configure(&mut self, config: Arc<ChannelConfig>) -> DqeResult<()> {
        match self.run_state {
            RunState::Disabled | RunState::Idle => {
                self.config = Some(config);
                debug!("histogram {}: configured", self.id);
                Ok(())
            }
            RunState::PendingFrameDone | RunState::Hibernation => {
                Err(DqeError::Busy { channel: self.id })
            }
        }
    }

    /// Arm the channel for the next frame.
    ///
    /// Enabling an armed or hibernating channel is an idempotent success and
    /// keeps the delivery target registered first. With `unpowered` set the
    /// channel is parked in HIBERNATION without touching registers and is
    /// armed by [`resume`](Self::resume).
    pub(crate) fn enable<P: HardwareRegisterPort>(
        &mut self,
        port: &P,
        delivery: DeliveryTarget,
        unpowered: bool,
    ) -> DqeResult<()> {
        match self.run_state {
            RunState::PendingFrameDone | RunState::Hibernation => {
                debug!(
                    "histogram {}: already active ({}), enable ignored",
                    self.id,
                    self.run_state.as_str()
                );
                Ok(())
            }
            RunState::Disabled | RunState::Idle => {
                let config = self.config.clone().ok_or_else(|| {
                    DqeError::invalid(format!("histogram channel {} is not configured", self.id))
                })?;
                self.delivery = Some(delivery);
                if unpowered {
                    debug!(
                        "histogram {}: {} -> hibernation (unpowered)",
                        self.id,
                        self.run_state.as_str()
                    );
                    self.bins = None;
                    self.hw_state = HwState::Off;
                    self.run_state = RunState::Hibernation;
                } else {
                    self.arm(port, &config);
                }
                Ok(())
            }
        }
    }

    /// Drop back to DISABLED. A registered callback is discarded unused.
    pub(crate) fn disable<P: HardwareRegisterPort>(&mut self, port: &P) {
        if self.run_state == RunState::Disabled {
            return;
        }
        if self.hw_state != HwState::Off {
            port.set_histogram_enabled(self.id, false);
        }
        debug!(
            "histogram {}: {} -> disabled",
            self.id,
            self.run_state.as_str()
        );
        self.hw_state = HwState::Off;
        self.run_state = RunState::Disabled;
        self.delivery = None;
        self.bins = None;
    }

    /// Record a captured result. Returns the delivery target when the channel
    /// was waiting for one.
    pub(crate) fn complete(&mut self, bins: HistogramBins) -> Option<&DeliveryTarget> {
        if self.run_state != RunState::PendingFrameDone {
            return None;
        }
        self.bins = Some(bins);
        self.hw_state = HwState::Ready;
        self.run_state = RunState::Idle;
        self.delivery.as_ref()
    }

    /// Suspend for low power. Returns whether the channel was active.
    pub(crate) fn hibernate(&mut self) -> bool {
        match self.run_state {
            RunState::PendingFrameDone | RunState::Idle => {
                self.run_state = RunState::Hibernation;
                // registers are lost while powered down
                self.hw_state = HwState::Off;
                true
            }
            RunState::Disabled | RunState::Hibernation => false,
        }
    }

    /// Re-arm after hibernation as if freshly enabled.
    pub(crate) fn resume<P: HardwareRegisterPort>(&mut self, port: &P) -> bool {
        if self.run_state != RunState::Hibernation {
            return false;
        }
        self.bins = None;
        match self.config.clone() {
            Some(config) => self.arm(port, &config),
            // unreachable through the public API: arming requires a config
            None => self.run_state = RunState::Disabled,
        }
        true
    }

    fn arm<P: HardwareRegisterPort>(&mut self, port: &P, config: &ChannelConfig) {
        port.write_histogram_config(self.id, config);
        port.set_histogram_enabled(self.id, true);
        debug!(
            "histogram {}: {} -> pending_framedone",
            self.id,
            self.run_state.as_str()
        );
        self.hw_state = HwState::Armed;
        self.run_state = RunState::PendingFrameDone;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::histogram::config::{Roi, Weights};
    use crate::regs::MemoryRegisters;

    fn configured() -> ChannelState {
        let mut ch = ChannelState::new(ChannelId::new(1).unwrap());
        ch.configure(Arc::new(ChannelConfig::new(
            Roi::new(0, 0, 64, 64),
            Weights::BT709,
        )))
        .unwrap();
        ch
    }

    #[test]
    fn test_initial_state() {
        let ch = ChannelState::new(ChannelId::new(0).unwrap());
        assert_eq!(ch.run_state(), RunState::Disabled);
        assert_eq!(ch.hw_state(), HwState::Off);
        assert!(ch.bins().is_none());
    }

    #[test]
    fn test_enable_requires_config() {
        let port = MemoryRegisters::new();
        let mut ch = ChannelState::new(ChannelId::new(0).unwrap());
        let err = ch.enable(&port, DeliveryTarget::from_callback(None), false);
        assert!(matches!(err, Err(DqeError::InvalidArgument(_))));
        assert_eq!(ch.run_state(), RunState::Disabled);
    }

    #[test]
    fn test_enable_complete_cycle() {
        let port = MemoryRegisters::new();
        let mut ch = configured();
        ch.enable(&port, DeliveryTarget::Queue { user_handle: 7 }, false)
            .unwrap();
        assert_eq!(ch.run_state(), RunState::PendingFrameDone);
        assert_eq!(ch.hw_state(), HwState::Armed);
        assert!(port.histogram_enabled(ch.id()));

        let delivery = ch.complete(HistogramBins::from_slice(&[4, 4]).unwrap());
        assert!(matches!(
            delivery,
            Some(DeliveryTarget::Queue { user_handle: 7 })
        ));
        assert_eq!(ch.run_state(), RunState::Idle);
        assert_eq!(ch.bins().map(HistogramBins::total), Some(8));

        // IDLE does not revert by itself
        assert!(ch.complete(HistogramBins::zeroed()).is_none());
        assert_eq!(ch.bins().map(HistogramBins::total), Some(8));
    }

    #[test]
    fn test_configure_rejected_while_armed() {
        let port = MemoryRegisters::new();
        let mut ch = configured();
        ch.enable(&port, DeliveryTarget::from_callback(None), false).unwrap();
        let replacement = Arc::new(ChannelConfig::new(Roi::new(0, 0, 8, 8), Weights::BT709));
        assert!(matches!(
            ch.configure(replacement.clone()),
            Err(DqeError::Busy { .. })
        ));
        ch.complete(HistogramBins::zeroed());
        assert!(ch.configure(replacement).is_ok());
    }

    #[test]
    fn test_double_enable_keeps_first_delivery() {
        let port = MemoryRegisters::new();
        let mut ch = configured();
        ch.enable(&port, DeliveryTarget::Queue { user_handle: 1 }, false)
            .unwrap();
        ch.enable(&port, DeliveryTarget::Queue { user_handle: 2 }, false)
            .unwrap();
        assert!(matches!(
            ch.delivery(),
            Some(DeliveryTarget::Queue { user_handle: 1 })
        ));
        assert_eq!(ch.run_state(), RunState::PendingFrameDone);
    }

    #[test]
    fn test_disable_discards_delivery() {
        let port = MemoryRegisters::new();
        let mut ch = configured();
        ch.enable(&port, DeliveryTarget::from_callback(None), false).unwrap();
        ch.disable(&port);
        assert_eq!(ch.run_state(), RunState::Disabled);
        assert!(ch.delivery().is_none());
        assert!(!port.histogram_enabled(ch.id()));
        assert!(ch.complete(HistogramBins::zeroed()).is_none());
    }

    #[test]
    fn test_hibernate_and_resume_discards_result() {
        let port = MemoryRegisters::new();
        let mut ch = configured();
        ch.enable(&port, DeliveryTarget::from_callback(None), false).unwrap();
        ch.complete(HistogramBins::from_slice(&[9]).unwrap());

        assert!(ch.hibernate());
        assert_eq!(ch.run_state(), RunState::Hibernation);
        assert_eq!(ch.hw_state(), HwState::Off);
        assert!(ch.complete(HistogramBins::zeroed()).is_none());

        assert!(ch.resume(&port));
        assert_eq!(ch.run_state(), RunState::PendingFrameDone);
        assert!(ch.bins().is_none());
        assert!(ch.config().is_some());
    }

    #[test]
    fn test_enable_while_unpowered_parks_channel() {
        let port = MemoryRegisters::new();
        let mut ch = configured();
        ch.enable(&port, DeliveryTarget::Queue { user_handle: 4 }, true)
            .unwrap();
        assert_eq!(ch.run_state(), RunState::Hibernation);
        assert_eq!(ch.hw_state(), HwState::Off);
        assert!(port.writes().is_empty());

        assert!(ch.resume(&port));
        assert_eq!(ch.run_state(), RunState::PendingFrameDone);
        assert!(port.histogram_enabled(ch.id()));
        assert!(matches!(
            ch.delivery(),
            Some(DeliveryTarget::Queue { user_handle: 4 })
        ));
    }
}
