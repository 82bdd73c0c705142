// Display quality enhancer device.
//
// Locks:
// - enhance: stage values, overrides, power state. Taken by the commit path,
//   hibernation and debug access. Never held together with the others.
// - lhbm_channel: the channel dedicated to LHBM tracking. Taken before
//   histogram by configure_lhbm and lhbm_sample.
// - histogram: channel records, legacy capture, pending events. Taken by the
//   control plane and, with bounded try_lock polling, by the
//   frame-completion path.
//
// Lock order is lhbm_channel then histogram.
//
// The register port is shared by both and needs no lock of its own.

mod debug;
mod histogram;
mod power;
mod state;
mod update;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info};

use crate::config::DqeConfig;
use crate::error::{DqeError, DqeResult};
use crate::histogram::{ChannelConfig, ChannelId, HistogramBank, LhbmGrayLevel};
use crate::regs::HardwareRegisterPort;

pub use debug::{DebugOverrides, Override};
pub use state::EnhancementState;
use state::EnhanceStore;

/// One display quality enhancer instance, bound to one CRTC.
pub struct DqeDevice<P: HardwareRegisterPort> {
    port: P,
    config: DqeConfig,
    initialized: AtomicBool,
    force_disabled: AtomicBool,
    verbose_hist: AtomicBool,
    deferred_frames: AtomicU64,
    enhance: Mutex<EnhanceStore>,
    histogram: Mutex<HistogramBank>,
    lhbm: LhbmGrayLevel,
    lhbm_channel: Mutex<Option<(ChannelId, Arc<ChannelConfig>)>>,
}

impl<P: HardwareRegisterPort> DqeDevice<P> {
    /// Create a detached device. Every operation fails with
    /// [`DqeError::NotReady`] until [`attach`](Self::attach) is called.
    pub fn new(port: P, config: DqeConfig) -> Self {
        let force_disabled = config.force_disabled;
        let verbose_hist = config.verbose_hist;
        let depth = config.event_queue_depth;
        Self {
            port,
            config,
            initialized: AtomicBool::new(false),
            force_disabled: AtomicBool::new(force_disabled),
            verbose_hist: AtomicBool::new(verbose_hist),
            deferred_frames: AtomicU64::new(0),
            enhance: Mutex::new(EnhanceStore::new()),
            histogram: Mutex::new(HistogramBank::new(depth)),
            lhbm: LhbmGrayLevel::new(),
            lhbm_channel: Mutex::new(None),
        }
    }

    /// Program the reset state and start accepting requests.
    pub fn attach(&self) {
        if self.initialized.load(Ordering::Acquire) {
            debug!("dqe: already attached");
            return;
        }
        {
            let mut store = self.enhance();
            store.clear_computed();
            self.program_baseline(&mut store);
        }
        self.initialized.store(true, Ordering::Release);
        info!(
            "dqe: attached (event queue depth {}, force_disabled {})",
            self.config.event_queue_depth,
            self.force_disabled()
        );
    }

    /// Stop every capture, return the block to its reset state and reject
    /// further requests.
    pub fn detach(&self) {
        if !self.initialized.swap(false, Ordering::AcqRel) {
            return;
        }
        self.bank().reset(&self.port);
        *self.lhbm_channel.lock().expect("lhbm mutex poisoned") = None;
        self.lhbm.clear();
        {
            let mut store = self.enhance();
            store.clear_computed();
            store.programmable = true;
            store.lpd_restore_pending = false;
            store.lpd_snapshot = None;
            self.port.set_enabled(false);
            store.invalidate_hw();
        }
        info!("dqe: detached");
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// `Err(NotReady)` unless the device is attached.
    pub fn ensure_ready(&self) -> DqeResult<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(DqeError::NotReady)
        }
    }

    pub fn config(&self) -> &DqeConfig {
        &self.config
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn force_disabled(&self) -> bool {
        self.force_disabled.load(Ordering::Acquire)
    }

    /// Force the whole block off regardless of the requested state. Applied
    /// on the next commit.
    pub fn set_force_disabled(&self, force: bool) {
        if self.force_disabled.swap(force, Ordering::AcqRel) != force {
            info!("dqe: force_disabled = {force}");
        }
    }

    pub fn verbose_hist(&self) -> bool {
        self.verbose_hist.load(Ordering::Relaxed)
    }

    pub fn set_verbose_hist(&self, verbose: bool) {
        self.verbose_hist.store(verbose, Ordering::Relaxed);
    }

    /// Run `f` with exclusive access to the debug overrides. Changes take
    /// effect on the next commit.
    pub fn debug_override<R>(&self, f: impl FnOnce(&mut DebugOverrides) -> R) -> R {
        let mut store = self.enhance();
        f(&mut store.overrides)
    }

    /// Whether registers may currently be written.
    pub fn is_programmable(&self) -> bool {
        self.enhance().programmable
    }

    /// Number of hardware commits performed so far.
    pub fn commit_count(&self) -> u64 {
        self.enhance().commits
    }

    fn enhance(&self) -> MutexGuard<'_, EnhanceStore> {
        self.enhance.lock().expect("enhance mutex poisoned")
    }

    fn bank(&self) -> MutexGuard<'_, HistogramBank> {
        self.histogram.lock().expect("histogram mutex poisoned")
    }
}
