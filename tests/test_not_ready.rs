// Integration test: requests against a device that is not attached

use std::sync::Arc;

use dqe::control::{self, ChannelRequest, EventRequest, HistogramRequest};
use dqe::histogram::{
    ChannelConfig, ChannelId, CommittedFrame, ProgPos, Roi, RunState, Weights,
};
use dqe::{DqeConfig, DqeDevice, DqeError, EnhancementState, MemoryRegisters};

fn config() -> ChannelConfig {
    ChannelConfig::new(Roi::new(0, 0, 10, 10), Weights::BT709)
}

fn assert_untouched(dqe: &DqeDevice<MemoryRegisters>) {
    assert!(dqe.port().writes().is_empty(), "{:?}", dqe.port().writes());
    for id in ChannelId::all() {
        assert_eq!(dqe.run_state(id), RunState::Disabled);
        assert_eq!(dqe.channel_bins(id), None);
    }
    assert_eq!(dqe.legacy_bins(), None);
    assert_eq!(dqe.pending_event_count(), 0);
    assert_eq!(dqe.commit_count(), 0);
}

#[test]
fn test_every_request_reports_not_ready() {
    let dqe = DqeDevice::new(MemoryRegisters::new(), DqeConfig::default());
    assert!(!dqe.is_initialized());

    let legacy = HistogramRequest {
        roi: Roi::new(0, 0, 10, 10),
        weights: Weights::BT709,
        pos: ProgPos::PreDqe,
        threshold: 0,
    };
    let channel = ChannelRequest {
        hist_id: 0,
        config: config(),
    };
    let event = EventRequest {
        hist_id: 0,
        user_handle: 1,
    };

    let results = [
        control::histogram_request(&dqe, &legacy),
        control::histogram_cancel(&dqe),
        control::histogram_channel_request(&dqe, &channel, None),
        control::histogram_channel_cancel(&dqe, 0),
        control::histogram_event_request(&dqe, &event),
        control::histogram_event_cancel(&dqe, 0),
        control::configure_channel(&dqe, 0, config()),
        control::set_channel_state(&dqe, 0, true, None),
        control::handle_histogram_event(&dqe).map(|_| ()),
        dqe.update(&EnhancementState::enabled(), 10, 10),
        dqe.reset(),
        dqe.atc_update(None),
        dqe.hibernation_enter(),
        dqe.hibernation_exit(),
        dqe.save_lpd_data(),
        dqe.restore_lpd_data(),
        dqe.configure_lhbm(ChannelId::new(0).unwrap(), Arc::new(config())),
    ];
    for (i, result) in results.into_iter().enumerate() {
        assert_eq!(result, Err(DqeError::NotReady), "request #{i}");
    }

    let report = dqe.frame_completed(&CommittedFrame::active());
    assert_eq!(report.sequence, 0);
    assert_untouched(&dqe);
}

#[test]
fn test_detach_returns_to_not_ready() {
    let dqe = DqeDevice::new(MemoryRegisters::new(), DqeConfig::default());
    dqe.attach();
    control::histogram_channel_request(&dqe, &ChannelRequest { hist_id: 2, config: config() }, None)
        .unwrap();
    dqe.detach();

    let id = ChannelId::new(2).unwrap();
    assert_eq!(dqe.run_state(id), RunState::Disabled);
    assert!(!dqe.port().histogram_enabled(id));
    assert_eq!(
        control::set_channel_state(&dqe, 2, true, None),
        Err(DqeError::NotReady)
    );

    dqe.attach();
    assert!(dqe.is_initialized());
    control::histogram_channel_request(&dqe, &ChannelRequest { hist_id: 2, config: config() }, None)
        .unwrap();
}
