// Periodic frame-completion source.
//
// Stands in for the display controller's frame-done interrupt: a dedicated
// thread signals the device once per period until paused or closed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use log::{debug, warn};

use crate::dqe::DqeDevice;
use crate::histogram::CommittedFrame;
use crate::regs::HardwareRegisterPort;

enum Command {
    Pause,
    Resume,
    Close,
}

#[derive(Debug, Default)]
struct Counters {
    frames: AtomicU64,
    deferred: AtomicU64,
}

/// Handle to a running vsync thread. Dropping it stops the thread.
pub struct VsyncDriver {
    cmd_tx: mpsc::Sender<Command>,
    handle: Option<JoinHandle<()>>,
    counters: Arc<Counters>,
    period: Duration,
}

impl VsyncDriver {
    /// Start signalling `dqe` every `period`.
    pub fn spawn<P>(dqe: Arc<DqeDevice<P>>, period: Duration) -> Result<Self>
    where
        P: HardwareRegisterPort + 'static,
    {
        if period.is_zero() {
            bail!("vsync period must be non-zero");
        }
        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
        let counters = Arc::new(Counters::default());
        let thread_counters = Arc::clone(&counters);

        let handle = thread::Builder::new()
            .name("dqe-vsync".into())
            .spawn(move || {
                let mut paused = false;
                loop {
                    let cmd = if paused {
                        cmd_rx.recv().map_err(|_| RecvTimeoutError::Disconnected)
                    } else {
                        cmd_rx.recv_timeout(period)
                    };
                    match cmd {
                        Ok(Command::Pause) => paused = true,
                        Ok(Command::Resume) => paused = false,
                        Ok(Command::Close) | Err(RecvTimeoutError::Disconnected) => break,
                        Err(RecvTimeoutError::Timeout) => {
                            let report = dqe.frame_completed(&CommittedFrame::active());
                            thread_counters.frames.fetch_add(1, Ordering::Relaxed);
                            if report.deferred {
                                thread_counters.deferred.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    }
                }
                debug!("vsync: thread exiting");
            })
            .context("failed to spawn vsync thread")?;

        Ok(Self {
            cmd_tx,
            handle: Some(handle),
            counters,
            period,
        })
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Frame-completion signals sent so far.
    pub fn frames(&self) -> u64 {
        self.counters.frames.load(Ordering::Relaxed)
    }

    /// Signals the device reported as deferred.
    pub fn deferred_frames(&self) -> u64 {
        self.counters.deferred.load(Ordering::Relaxed)
    }

    /// Stop signalling, as when the panel idles.
    pub fn pause(&self) -> Result<()> {
        self.send(Command::Pause)
    }

    pub fn resume(&self) -> Result<()> {
        self.send(Command::Resume)
    }

    /// Stop the thread and wait for it to exit.
    pub fn close(mut self) -> Result<()> {
        self.shutdown()
    }

    fn send(&self, cmd: Command) -> Result<()> {
        self.cmd_tx
            .send(cmd)
            .map_err(|_| anyhow!("vsync thread is not running"))
    }

    fn shutdown(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        // the thread may already be gone; joining is what matters
        let _ = self.cmd_tx.send(Command::Close);
        handle
            .join()
            .map_err(|_| anyhow!("vsync thread panicked"))
    }
}

impl Drop for VsyncDriver {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!("vsync: {e}");
        }
    }
}
