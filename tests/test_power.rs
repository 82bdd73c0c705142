// Integration test: hibernation and LPD register save/restore

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dqe::color::{ColorMatrix, Stage, LPD_ATC_REG_CNT};
use dqe::histogram::{
    ChannelConfig, ChannelId, CommittedFrame, HistogramBins, HistogramCallback, HwState, Roi,
    RunState, Weights,
};
use dqe::regs::RegWrite;
use dqe::{DqeConfig, DqeDevice, EnhancementState, MemoryRegisters};

fn attached() -> DqeDevice<MemoryRegisters> {
    let dqe = DqeDevice::new(MemoryRegisters::new(), DqeConfig::default());
    dqe.attach();
    dqe.update(&EnhancementState::enabled(), 720, 1280).unwrap();
    dqe
}

fn arm(dqe: &DqeDevice<MemoryRegisters>, id: ChannelId, callback: Option<HistogramCallback>) {
    let config = ChannelConfig::new(Roi::new(0, 0, 720, 1280), Weights::BT709);
    dqe.histogram_chan_configure(id, Arc::new(config)).unwrap();
    dqe.histogram_chan_set_state(id, true, callback).unwrap();
}

#[test]
fn test_pending_channel_rearms_after_hibernation() {
    let dqe = attached();
    let id = ChannelId::new(0).unwrap();
    let count = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&count);
    arm(&dqe, id, Some(Arc::new(move |_, _| {
        seen.fetch_add(1, Ordering::SeqCst);
    })));

    dqe.hibernation_enter().unwrap();
    assert_eq!(dqe.run_state(id), RunState::Hibernation);
    for _ in 0..10 {
        dqe.frame_completed(&CommittedFrame::active());
    }
    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert_eq!(dqe.run_state(id), RunState::Hibernation);

    dqe.hibernation_exit().unwrap();
    assert_eq!(dqe.run_state(id), RunState::PendingFrameDone);
    assert_eq!(dqe.hw_state(id), HwState::Armed);
    assert!(dqe.port().histogram_enabled(id));

    // the registration made before hibernating still receives the result
    dqe.frame_completed(&CommittedFrame::active());
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn test_idle_result_discarded_by_hibernation() {
    let dqe = attached();
    let id = ChannelId::new(2).unwrap();
    dqe.port().load_histogram(id, HistogramBins::from_slice(&[8, 8]).unwrap());
    arm(&dqe, id, None);
    dqe.frame_completed(&CommittedFrame::active());
    assert_eq!(dqe.run_state(id), RunState::Idle);
    dqe.handle_histogram_event().unwrap();

    dqe.hibernation_enter().unwrap();
    dqe.hibernation_exit().unwrap();
    assert_eq!(dqe.run_state(id), RunState::PendingFrameDone);
    assert_eq!(dqe.channel_bins(id), None);
}

#[test]
fn test_disabled_channel_stays_disabled() {
    let dqe = attached();
    let id = ChannelId::new(1).unwrap();
    dqe.hibernation_enter().unwrap();
    dqe.hibernation_exit().unwrap();
    assert_eq!(dqe.run_state(id), RunState::Disabled);
    assert!(!dqe.port().histogram_enabled(id));
}

#[test]
fn test_exit_restores_lpd_then_rewrites_state() {
    let dqe = attached();
    let matrix = Arc::new(ColorMatrix::identity());
    let state = EnhancementState {
        linear_matrix: Some(Arc::clone(&matrix)),
        ..EnhancementState::enabled()
    };
    dqe.update(&state, 720, 1280).unwrap();

    let live: [u32; LPD_ATC_REG_CNT] = std::array::from_fn(|i| i as u32 * 3);
    dqe.port().set_lpd_atc(live);
    dqe.hibernation_enter().unwrap();
    assert_eq!(dqe.lpd_snapshot(), Some(live));

    dqe.port().power_loss();
    dqe.port().clear_writes();
    dqe.hibernation_exit().unwrap();

    let writes = dqe.port().writes();
    assert_eq!(writes.first(), Some(&RegWrite::LpdAtc));
    assert_eq!(dqe.port().lpd_atc(), live);
    assert!(dqe.port().enabled());
    assert_eq!(dqe.port().size(), Some((720, 1280)));
    assert!(dqe.port().linear_matrix().is_some());
}

#[test]
fn test_updates_while_hibernating_are_deferred() {
    let dqe = attached();
    dqe.hibernation_enter().unwrap();
    dqe.port().clear_writes();

    let state = EnhancementState {
        gamma_matrix: Some(Arc::new(ColorMatrix::identity())),
        ..EnhancementState::enabled()
    };
    dqe.update(&state, 720, 1280).unwrap();
    dqe.update(&EnhancementState::enabled(), 720, 1280).unwrap();
    assert!(dqe.port().writes().is_empty());

    dqe.hibernation_exit().unwrap();
    assert_eq!(dqe.port().stage_writes(Stage::GammaMatrix), 1);
    assert!(dqe.port().gamma_matrix().is_some());
}

#[test]
fn test_repeated_enter_keeps_first_snapshot() {
    let dqe = attached();
    let first = [1u32; LPD_ATC_REG_CNT];
    dqe.port().set_lpd_atc(first);
    dqe.hibernation_enter().unwrap();
    dqe.port().set_lpd_atc([2; LPD_ATC_REG_CNT]);
    dqe.hibernation_enter().unwrap();
    assert_eq!(dqe.lpd_snapshot(), Some(first));
}

#[test]
fn test_configure_rejected_while_hibernating() {
    let dqe = attached();
    let id = ChannelId::new(3).unwrap();
    arm(&dqe, id, None);
    dqe.hibernation_enter().unwrap();
    let config = Arc::new(ChannelConfig::new(Roi::new(0, 0, 4, 4), Weights::BT709));
    assert!(dqe.histogram_chan_configure(id, config).is_err());
    // enabling again is accepted and changes nothing
    dqe.histogram_chan_set_state(id, true, None).unwrap();
    assert_eq!(dqe.run_state(id), RunState::Hibernation);
}

#[test]
fn test_channel_enabled_while_hibernating_armed_on_exit() {
    let dqe = attached();
    let id = ChannelId::new(1).unwrap();
    let config = ChannelConfig::new(Roi::new(0, 0, 720, 1280), Weights::BT709);
    dqe.histogram_chan_configure(id, Arc::new(config)).unwrap();

    dqe.hibernation_enter().unwrap();
    dqe.port().clear_writes();
    dqe.histogram_chan_set_state(id, true, None).unwrap();
    assert!(dqe.port().writes().is_empty());
    assert_eq!(dqe.run_state(id), RunState::Hibernation);
    assert_eq!(dqe.hw_state(id), HwState::Off);

    dqe.port().power_loss();
    dqe.hibernation_exit().unwrap();
    assert!(dqe.port().histogram_enabled(id));
    assert_eq!(dqe.run_state(id), RunState::PendingFrameDone);

    dqe.frame_completed(&CommittedFrame::active());
    assert_eq!(dqe.run_state(id), RunState::Idle);
    assert_eq!(dqe.pending_event_count(), 1);
}

#[test]
fn test_channel_cancelled_while_hibernating_stays_off() {
    let dqe = attached();
    let id = ChannelId::new(0).unwrap();
    arm(&dqe, id, None);
    dqe.hibernation_enter().unwrap();
    dqe.histogram_chan_set_state(id, false, None).unwrap();
    dqe.hibernation_exit().unwrap();
    assert_eq!(dqe.run_state(id), RunState::Disabled);
    assert!(!dqe.port().histogram_enabled(id));
}
