// Multi-channel histogram capture.
//
// Channel records live in a HistogramBank guarded by one mutex on the device.
// Control-plane requests and the frame-completion path both go through the
// bank, so run_state, bins and the pending events list are always observed
// under the same lock.

pub mod channel;
pub mod config;
pub mod events;
pub mod frame_sync;
pub mod legacy;
pub mod lhbm;

use std::fmt;
use std::sync::Arc;

use log::debug;

use crate::error::{DqeError, DqeResult};
use crate::regs::HardwareRegisterPort;

pub use channel::ChannelState;
pub use config::{ChannelConfig, ProgPos, Roi, Weights};
pub use events::{EventSource, HistogramEvent, PendingEvents};
pub use frame_sync::{CommittedFrame, FrameDoneReport};
pub use legacy::LegacyHistogram;
pub use lhbm::LhbmGrayLevel;

/// Number of independent histogram channels.
pub const HISTOGRAM_MAX: usize = 4;
/// Number of bins captured per channel.
pub const HISTOGRAM_BIN_COUNT: usize = 256;

/// Validated histogram channel identifier (`0..HISTOGRAM_MAX`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelId(u8);

impl ChannelId {
    pub fn new(raw: u32) -> DqeResult<Self> {
        if (raw as usize) < HISTOGRAM_MAX {
            Ok(Self(raw as u8))
        } else {
            Err(DqeError::invalid(format!(
                "unknown histogram channel {raw} (have {HISTOGRAM_MAX})"
            )))
        }
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn all() -> impl Iterator<Item = ChannelId> {
        (0..HISTOGRAM_MAX as u8).map(ChannelId)
    }
}

impl TryFrom<u32> for ChannelId {
    type Error = DqeError;

    fn try_from(raw: u32) -> DqeResult<Self> {
        Self::new(raw)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One captured histogram.
#[derive(Clone, PartialEq, Eq)]
pub struct HistogramBins {
    data: [u16; HISTOGRAM_BIN_COUNT],
}

impl HistogramBins {
    pub const fn new(data: [u16; HISTOGRAM_BIN_COUNT]) -> Self {
        Self { data }
    }

    pub const fn zeroed() -> Self {
        Self {
            data: [0; HISTOGRAM_BIN_COUNT],
        }
    }

    /// Build bins from a slice; missing trailing bins are zero, extra ones
    /// are rejected.
    pub fn from_slice(values: &[u16]) -> DqeResult<Self> {
        if values.len() > HISTOGRAM_BIN_COUNT {
            return Err(DqeError::invalid(format!(
                "{} histogram bins supplied, at most {} supported",
                values.len(),
                HISTOGRAM_BIN_COUNT
            )));
        }
        let mut data = [0u16; HISTOGRAM_BIN_COUNT];
        data[..values.len()].copy_from_slice(values);
        Ok(Self { data })
    }

    pub fn as_slice(&self) -> &[u16] {
        &self.data
    }

    /// Sum of all bin counts.
    pub fn total(&self) -> u64 {
        self.data.iter().map(|&v| v as u64).sum()
    }
}

impl Default for HistogramBins {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl fmt::Debug for HistogramBins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistogramBins")
            .field("total", &self.total())
            .finish()
    }
}

/// Logical lifecycle of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Inactive, nothing programmed.
    Disabled,
    /// Was active when the display entered low power; configuration kept.
    Hibernation,
    /// Armed, accumulating for the frame in flight.
    PendingFrameDone,
    /// Result captured and readable at any time.
    Idle,
}

impl RunState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Hibernation => "hibernation",
            Self::PendingFrameDone => "pending_framedone",
            Self::Idle => "idle",
        }
    }
}

/// What has actually been programmed into the channel's hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwState {
    Off,
    /// Enabled and accumulating.
    Armed,
    /// Enabled, latched result has been read back.
    Ready,
}

/// Completion callback, invoked as `(channel, bins)`.
///
/// Runs on the frame-completion context while the histogram lock is held:
/// it must not block and must not call back into the device.
pub type HistogramCallback = Arc<dyn Fn(ChannelId, &HistogramBins) + Send + Sync>;

/// Where a channel's result goes once captured.
#[derive(Clone)]
pub enum DeliveryTarget {
    Callback(HistogramCallback),
    /// Push to the pending events list, tagged with the caller's handle.
    Queue { user_handle: u32 },
}

impl DeliveryTarget {
    /// Callback when one is given, otherwise queued delivery.
    pub fn from_callback(callback: Option<HistogramCallback>) -> Self {
        match callback {
            Some(cb) => Self::Callback(cb),
            None => Self::Queue { user_handle: 0 },
        }
    }
}

impl fmt::Debug for DeliveryTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Callback(_) => f.write_str("Callback"),
            Self::Queue { user_handle } => f
                .debug_struct("Queue")
                .field("user_handle", user_handle)
                .finish(),
        }
    }
}

/// All histogram state shared by control-plane and frame-completion contexts.
pub struct HistogramBank {
    channels: [ChannelState; HISTOGRAM_MAX],
    legacy: LegacyHistogram,
    events: PendingEvents,
    sequence: u64,
    hibernating: bool,
}

impl HistogramBank {
    pub fn new(event_queue_depth: usize) -> Self {
        Self {
            channels: std::array::from_fn(|i| ChannelState::new(ChannelId(i as u8))),
            legacy: LegacyHistogram::default(),
            events: PendingEvents::new(event_queue_depth),
            sequence: 0,
            hibernating: false,
        }
    }

    pub fn channel(&self, id: ChannelId) -> &ChannelState {
        &self.channels[id.index()]
    }

    pub(crate) fn channel_mut(&mut self, id: ChannelId) -> &mut ChannelState {
        &mut self.channels[id.index()]
    }

    pub fn legacy(&self) -> &LegacyHistogram {
        &self.legacy
    }

    pub(crate) fn legacy_mut(&mut self) -> &mut LegacyHistogram {
        &mut self.legacy
    }

    pub fn events(&self) -> &PendingEvents {
        &self.events
    }

    pub(crate) fn events_mut(&mut self) -> &mut PendingEvents {
        &mut self.events
    }

    /// Frame-completion signals observed so far.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Registers are unpowered; arming is recorded and deferred to resume.
    pub fn is_hibernating(&self) -> bool {
        self.hibernating
    }

    /// Arm a channel, or park it in HIBERNATION while the block is unpowered.
    pub(crate) fn enable_channel<P: HardwareRegisterPort>(
        &mut self,
        port: &P,
        id: ChannelId,
        delivery: DeliveryTarget,
    ) -> DqeResult<()> {
        let hibernating = self.hibernating;
        self.channels[id.index()].enable(port, delivery, hibernating)
    }

    pub(crate) fn legacy_request<P: HardwareRegisterPort>(
        &mut self,
        port: &P,
        config: Arc<ChannelConfig>,
    ) {
        if self.hibernating {
            self.legacy.defer(config);
        } else {
            self.legacy.request(port, config);
        }
    }

    /// Disable every channel, cancel the legacy capture and drop queued
    /// events. Leaves the bank powered.
    pub(crate) fn reset<P: HardwareRegisterPort>(&mut self, port: &P) {
        for ch in self.channels.iter_mut() {
            ch.disable(port);
        }
        self.legacy.cancel(port);
        self.events.drain();
        self.hibernating = false;
    }

    /// Suspend every active channel and the legacy capture.
    pub(crate) fn hibernate(&mut self) -> usize {
        self.hibernating = true;
        let suspended = self
            .channels
            .iter_mut()
            .map(ChannelState::hibernate)
            .filter(|&suspended| suspended)
            .count();
        self.legacy.hibernate();
        debug!("histogram: {suspended} channel(s) entered hibernation");
        suspended
    }

    /// Re-arm every hibernating channel; results from before hibernation are
    /// discarded.
    pub(crate) fn resume<P: HardwareRegisterPort>(&mut self, port: &P) -> usize {
        self.hibernating = false;
        let resumed = self
            .channels
            .iter_mut()
            .map(|ch| ch.resume(port))
            .filter(|&resumed| resumed)
            .count();
        self.legacy.resume(port);
        debug!("histogram: {resumed} channel(s) re-armed after hibernation");
        resumed
    }
}
