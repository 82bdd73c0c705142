// Frame loop demo: measure request-to-delivery latency of histogram channels
//
// Drives a device from a vsync thread, re-arms every channel after each
// delivery and records how long each request waited for its result. A
// hibernation cycle runs halfway through.
//
// Usage: RUST_LOG=debug cargo run --release --example frame_loop

use std::fmt::Write as FmtWrite;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};

use dqe::color::{ColorMatrix, DitherConfig};
use dqe::histogram::{ChannelConfig, ChannelId, HistogramBins, HistogramCallback, Roi, Weights};
use dqe::{DqeConfig, DqeDevice, EnhancementState, MemoryRegisters, VsyncDriver};

const PANEL: (u32, u32) = (1080, 2400);
const VSYNC_PERIOD: Duration = Duration::from_millis(4);
const ROUNDS: usize = 50;
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(1);

fn percentile(sorted: &[f64], p: usize) -> f64 {
    sorted[(sorted.len() * p / 100).min(sorted.len() - 1)]
}

fn ramp(channel: usize) -> Result<HistogramBins> {
    let values: Vec<u16> = (0..256u16).map(|i| i.wrapping_mul(channel as u16 + 1)).collect();
    HistogramBins::from_slice(&values).context("building simulated bins")
}

fn main() -> Result<()> {
    env_logger::init();

    let dqe = Arc::new(DqeDevice::new(MemoryRegisters::new(), DqeConfig::from_env()));
    dqe.attach();

    let state = EnhancementState {
        gamma_matrix: Some(Arc::new(ColorMatrix::identity())),
        disp_dither: Some(Arc::new(DitherConfig {
            en: true,
            ..DitherConfig::default()
        })),
        ..EnhancementState::enabled()
    };
    dqe.update(&state, PANEL.0, PANEL.1)?;

    let (done_tx, done_rx) = mpsc::channel::<(ChannelId, Instant)>();
    let callback: HistogramCallback = Arc::new(move |id, _bins| {
        let _ = done_tx.send((id, Instant::now()));
    });

    let roi = Roi::new(0, 0, PANEL.0 as u16, PANEL.1 as u16);
    for id in ChannelId::all() {
        dqe.port().load_histogram(id, ramp(id.index())?);
        dqe.histogram_chan_configure(id, Arc::new(ChannelConfig::new(roi, Weights::BT709)))?;
    }

    let vsync = VsyncDriver::spawn(Arc::clone(&dqe), VSYNC_PERIOD)?;
    let mut latencies: Vec<f64> = Vec::with_capacity(ROUNDS * ChannelId::all().count());

    for round in 0..ROUNDS {
        let armed_at = Instant::now();
        if round == ROUNDS / 2 {
            // resume re-arms every channel that was active, callbacks included
            dqe.hibernation_enter()?;
            dqe.hibernation_exit()?;
        } else {
            for id in ChannelId::all() {
                dqe.histogram_chan_set_state(id, true, Some(Arc::clone(&callback)))?;
            }
        }
        for _ in ChannelId::all() {
            let (_id, at) = match done_rx.recv_timeout(DELIVERY_TIMEOUT) {
                Ok(done) => done,
                Err(_) => bail!("round {round}: no delivery within {DELIVERY_TIMEOUT:?}"),
            };
            latencies.push(at.duration_since(armed_at).as_secs_f64() * 1000.0);
        }
    }

    let frames = vsync.frames();
    let deferred = vsync.deferred_frames();
    vsync.close()?;
    dqe.detach();

    latencies.sort_by(|a, b| a.total_cmp(b));
    let mut s = String::new();
    writeln!(s, "[frame loop] {} deliveries over {} frames:", latencies.len(), frames)?;
    writeln!(
        s,
        "  latency: p50={:.2}ms  p95={:.2}ms  max={:.2}ms",
        percentile(&latencies, 50),
        percentile(&latencies, 95),
        latencies.last().copied().unwrap_or_default(),
    )?;
    writeln!(s, "  deferred frames: {deferred}")?;
    print!("{s}");
    Ok(())
}
