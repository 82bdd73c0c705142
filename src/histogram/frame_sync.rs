// Frame-completion harvesting.
//
// Runs on the display controller's frame-done context: no allocation beyond
// the event push, no waiting. Every PENDING_FRAMEDONE channel whose hardware
// has latched a result moves to IDLE and its result goes to exactly one
// destination, the registered callback or the pending events list.

use log::{debug, info};

use super::events::{EventSource, HistogramEvent};
use super::{DeliveryTarget, HistogramBank, RunState};
use crate::regs::HardwareRegisterPort;

/// CRTC state of the frame that just retired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommittedFrame {
    /// CRTC is scanning out. Statistics of an inactive CRTC are meaningless.
    pub active: bool,
    /// Panel is refreshing from its own memory; the DPU is idle.
    pub self_refresh: bool,
}

impl CommittedFrame {
    pub const fn active() -> Self {
        Self {
            active: true,
            self_refresh: false,
        }
    }

    pub const fn inactive() -> Self {
        Self {
            active: false,
            self_refresh: false,
        }
    }
}

impl Default for CommittedFrame {
    fn default() -> Self {
        Self::active()
    }
}

/// Outcome of one frame-completion signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameDoneReport {
    pub sequence: u64,
    /// Results handed to callbacks.
    pub delivered: usize,
    /// Results pushed to the pending events list.
    pub queued: usize,
    /// The histogram lock was busy; harvesting waits for the next frame.
    pub deferred: bool,
}

impl HistogramBank {
    pub(crate) fn frame_done<P: HardwareRegisterPort>(
        &mut self,
        port: &P,
        frame: &CommittedFrame,
        verbose: bool,
    ) -> FrameDoneReport {
        self.sequence += 1;
        let sequence = self.sequence;
        let mut report = FrameDoneReport {
            sequence,
            ..FrameDoneReport::default()
        };

        if !frame.active {
            debug!("histogram: frame {sequence} retired on inactive crtc, nothing harvested");
            return report;
        }

        for ch in self.channels.iter_mut() {
            if ch.run_state() != RunState::PendingFrameDone {
                continue;
            }
            let id = ch.id();
            let Some(bins) = port.read_histogram_bins(id) else {
                continue;
            };
            if verbose {
                info!(
                    "histogram {id}: frame {sequence} captured {} samples{}",
                    bins.total(),
                    if frame.self_refresh { " (self refresh)" } else { "" }
                );
            }
            match ch.complete(bins.clone()) {
                Some(DeliveryTarget::Callback(callback)) => {
                    callback(id, &bins);
                    report.delivered += 1;
                }
                Some(DeliveryTarget::Queue { user_handle }) => {
                    self.events.push(HistogramEvent {
                        source: EventSource::Channel(id),
                        user_handle: *user_handle,
                        sequence,
                        bins,
                    });
                    report.queued += 1;
                }
                None => {}
            }
        }

        if self.legacy.is_armed() {
            if let Some(bins) = port.read_legacy_bins() {
                if self.legacy.complete(bins.clone()) {
                    if verbose {
                        info!(
                            "legacy histogram: frame {sequence} captured {} samples",
                            bins.total()
                        );
                    }
                    self.events.push(HistogramEvent {
                        source: EventSource::Legacy,
                        user_handle: 0,
                        sequence,
                        bins,
                    });
                    report.queued += 1;
                }
            }
        }

        report
    }
}
