// Integration test: control plane racing the frame-completion path

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use dqe::histogram::{
    ChannelConfig, ChannelId, CommittedFrame, HistogramCallback, Roi, RunState, Weights,
    HISTOGRAM_MAX,
};
use dqe::{DqeConfig, DqeDevice, MemoryRegisters, VsyncDriver};

const ITERATIONS: usize = 2_000;

fn attached() -> Arc<DqeDevice<MemoryRegisters>> {
    let dqe = Arc::new(DqeDevice::new(MemoryRegisters::new(), DqeConfig::default()));
    dqe.attach();
    for id in ChannelId::all() {
        let config = ChannelConfig::new(Roi::new(0, 0, 64, 64), Weights::BT709);
        dqe.histogram_chan_configure(id, Arc::new(config)).unwrap();
    }
    dqe
}

fn spawn_frame_source(
    dqe: Arc<DqeDevice<MemoryRegisters>>,
    stop: Arc<AtomicBool>,
) -> thread::JoinHandle<usize> {
    thread::spawn(move || {
        let mut frames = 0;
        while !stop.load(Ordering::Acquire) {
            dqe.frame_completed(&CommittedFrame::active());
            frames += 1;
            thread::yield_now();
        }
        frames
    })
}

#[test]
fn test_no_callback_after_cancel() {
    let dqe = attached();
    let id = ChannelId::new(1).unwrap();
    let cancelled = Arc::new(AtomicBool::new(false));
    let late = Arc::new(AtomicUsize::new(0));
    let delivered = Arc::new(AtomicUsize::new(0));

    let callback: HistogramCallback = {
        let cancelled = Arc::clone(&cancelled);
        let late = Arc::clone(&late);
        let delivered = Arc::clone(&delivered);
        Arc::new(move |_, _| {
            if cancelled.load(Ordering::SeqCst) {
                late.fetch_add(1, Ordering::SeqCst);
            }
            delivered.fetch_add(1, Ordering::SeqCst);
        })
    };

    let stop = Arc::new(AtomicBool::new(false));
    let source = spawn_frame_source(Arc::clone(&dqe), Arc::clone(&stop));

    for i in 0..ITERATIONS {
        cancelled.store(false, Ordering::SeqCst);
        dqe.histogram_chan_set_state(id, true, Some(Arc::clone(&callback)))
            .unwrap();
        if i % 3 == 0 {
            thread::yield_now();
        }
        dqe.histogram_chan_set_state(id, false, None).unwrap();
        cancelled.store(true, Ordering::SeqCst);
        assert_eq!(dqe.run_state(id), RunState::Disabled);
    }

    stop.store(true, Ordering::Release);
    let frames = source.join().unwrap();
    assert!(frames > 0);
    assert_eq!(late.load(Ordering::SeqCst), 0);
    assert!(delivered.load(Ordering::SeqCst) <= ITERATIONS);
}

#[test]
fn test_every_armed_channel_delivers_exactly_once() {
    let dqe = attached();
    let counts: Arc<[AtomicUsize; HISTOGRAM_MAX]> = Arc::new(std::array::from_fn(|_| AtomicUsize::new(0)));
    let callback: HistogramCallback = {
        let counts = Arc::clone(&counts);
        Arc::new(move |id, _| {
            counts[id.index()].fetch_add(1, Ordering::SeqCst);
        })
    };

    let vsync = VsyncDriver::spawn(Arc::clone(&dqe), Duration::from_millis(1)).unwrap();
    const ROUNDS: usize = 20;
    for round in 1..=ROUNDS {
        for id in ChannelId::all() {
            dqe.histogram_chan_set_state(id, true, Some(Arc::clone(&callback)))
                .unwrap();
        }
        for id in ChannelId::all() {
            let mut waited = 0;
            while counts[id.index()].load(Ordering::SeqCst) < round {
                assert!(waited < 5_000, "channel {id} stalled in round {round}");
                thread::sleep(Duration::from_millis(1));
                waited += 1;
            }
        }
    }
    vsync.close().unwrap();

    for id in ChannelId::all() {
        assert_eq!(counts[id.index()].load(Ordering::SeqCst), ROUNDS);
        assert_eq!(dqe.run_state(id), RunState::Idle);
    }
}
