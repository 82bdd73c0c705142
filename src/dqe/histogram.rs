use super::*;

use std::hint;
use std::sync::TryLockError;

use log::warn;

use crate::histogram::{
    CommittedFrame, DeliveryTarget, FrameDoneReport, HistogramBins, HistogramCallback,
    HistogramEvent, HwState, RunState,
};

/// Lock polls before a frame-completion signal is deferred.
const FRAME_LOCK_SPINS: u32 = 128;

impl<P: HardwareRegisterPort> DqeDevice<P> {
    /// Store a channel configuration. Rejected with `Busy` while the channel
    /// is armed or hibernating.
    pub fn histogram_chan_configure(
        &self,
        id: ChannelId,
        config: Arc<ChannelConfig>,
    ) -> DqeResult<()> {
        self.ensure_ready()?;
        let panel = self.enhance().requested_size;
        config.validate(panel)?;
        let result = self.bank().channel_mut(id).configure(config);
        if let Err(err) = &result {
            warn!("histogram {id}: configure rejected: {err}");
        }
        result
    }

    /// Enable or disable a channel.
    ///
    /// Enabling arms the channel for the next frame; its result goes to
    /// `callback`, or to the pending events list when there is none.
    /// Disabling is synchronous with respect to frame completion: once it
    /// returns, the callback registered before will not run.
    pub fn histogram_chan_set_state(
        &self,
        id: ChannelId,
        enable: bool,
        callback: Option<HistogramCallback>,
    ) -> DqeResult<()> {
        if enable {
            self.histogram_chan_enable(id, DeliveryTarget::from_callback(callback))
        } else {
            self.ensure_ready()?;
            self.bank().channel_mut(id).disable(&self.port);
            Ok(())
        }
    }

    /// Arm a channel with an explicit delivery target.
    pub fn histogram_chan_enable(&self, id: ChannelId, delivery: DeliveryTarget) -> DqeResult<()> {
        self.ensure_ready()?;
        self.bank().enable_channel(&self.port, id, delivery)
    }

    // Queries below observe state without changing it. A detached device
    // reports every channel DISABLED and nothing captured.

    pub fn run_state(&self, id: ChannelId) -> RunState {
        self.bank().channel(id).run_state()
    }

    pub fn hw_state(&self, id: ChannelId) -> HwState {
        self.bank().channel(id).hw_state()
    }

    /// Captured result of an IDLE channel.
    pub fn channel_bins(&self, id: ChannelId) -> Option<HistogramBins> {
        self.bank().channel(id).bins().cloned()
    }

    /// Arm the legacy single-channel capture.
    pub fn histogram_legacy_request(&self, config: Arc<ChannelConfig>) -> DqeResult<()> {
        self.ensure_ready()?;
        let panel = self.enhance().requested_size;
        config.validate(panel)?;
        self.bank().legacy_request(&self.port, config);
        Ok(())
    }

    pub fn histogram_legacy_cancel(&self) -> DqeResult<()> {
        self.ensure_ready()?;
        self.bank().legacy_mut().cancel(&self.port);
        Ok(())
    }

    /// Last legacy capture result.
    pub fn legacy_bins(&self) -> Option<HistogramBins> {
        self.bank().legacy().bins().cloned()
    }

    /// Frame-completion signal from the display controller.
    ///
    /// Never sleeps: the histogram lock is polled for a bounded number of
    /// spins. When a control-plane request still holds it the frame is
    /// reported as deferred, counted in
    /// [`deferred_frame_count`](Self::deferred_frame_count), and its channels
    /// stay PENDING_FRAMEDONE for the next one.
    pub fn frame_completed(&self, frame: &CommittedFrame) -> FrameDoneReport {
        if !self.is_initialized() {
            return FrameDoneReport::default();
        }
        if let Ok(mut store) = self.enhance.try_lock() {
            store.dstep_changed = false;
        }

        let Some(mut bank) = self.spin_bank() else {
            let total = self.deferred_frames.fetch_add(1, Ordering::Relaxed) + 1;
            debug!("histogram: lock busy, frame deferred ({total} so far)");
            return FrameDoneReport {
                deferred: true,
                ..FrameDoneReport::default()
            };
        };
        bank.frame_done(&self.port, frame, self.verbose_hist())
    }

    /// Frame-completion signals that found the histogram lock busy.
    pub fn deferred_frame_count(&self) -> u64 {
        self.deferred_frames.load(Ordering::Relaxed)
    }

    fn spin_bank(&self) -> Option<MutexGuard<'_, HistogramBank>> {
        for _ in 0..FRAME_LOCK_SPINS {
            match self.histogram.try_lock() {
                Ok(bank) => return Some(bank),
                Err(TryLockError::Poisoned(poisoned)) => return Some(poisoned.into_inner()),
                Err(TryLockError::WouldBlock) => hint::spin_loop(),
            }
        }
        None
    }

    /// Drain every queued histogram event, oldest first.
    pub fn handle_histogram_event(&self) -> DqeResult<Vec<HistogramEvent>> {
        self.ensure_ready()?;
        Ok(self.bank().events_mut().drain())
    }

    pub fn pending_event_count(&self) -> usize {
        self.bank().events().len()
    }

    /// Events dropped because the pending list was full.
    pub fn dropped_event_count(&self) -> u64 {
        self.bank().events().dropped()
    }

    /// Dedicate `id` to LHBM gray level tracking and arm it.
    ///
    /// The channel's result feeds [`lhbm_gray_level`](Self::lhbm_gray_level)
    /// instead of a caller. Reconfiguring moves tracking to the new channel.
    pub fn configure_lhbm(&self, id: ChannelId, config: Arc<ChannelConfig>) -> DqeResult<()> {
        self.ensure_ready()?;
        let panel = self.enhance().requested_size;
        config.validate(panel)?;

        let mut lhbm = self.lhbm_channel.lock().expect("lhbm mutex poisoned");
        let mut bank = self.bank();
        if let Some((previous, _)) = lhbm.as_ref() {
            bank.channel_mut(*previous).disable(&self.port);
        }
        bank.channel_mut(id).disable(&self.port);
        bank.channel_mut(id).configure(Arc::clone(&config))?;
        bank.enable_channel(&self.port, id, DeliveryTarget::Callback(self.lhbm.callback()))?;
        self.lhbm.clear();
        *lhbm = Some((id, config));
        debug!("histogram {id}: tracking lhbm gray level");
        Ok(())
    }

    /// Re-arm the LHBM channel for another sample.
    pub fn lhbm_sample(&self) -> DqeResult<()> {
        self.ensure_ready()?;
        let lhbm = self.lhbm_channel.lock().expect("lhbm mutex poisoned");
        let Some((id, _)) = lhbm.as_ref() else {
            return Err(DqeError::invalid("lhbm histogram is not configured"));
        };
        self.bank()
            .enable_channel(&self.port, *id, DeliveryTarget::Callback(self.lhbm.callback()))
    }

    /// Mean gray level of the last LHBM capture.
    pub fn lhbm_gray_level(&self) -> Option<u32> {
        self.lhbm.get()
    }
}
