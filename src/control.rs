// Control-plane request surface.
//
// Requests arrive with raw channel numbers from outside the process. They are
// validated here, after the readiness check, and forwarded to the device.

use std::sync::Arc;

use log::debug;

use crate::dqe::DqeDevice;
use crate::error::DqeResult;
use crate::histogram::{
    ChannelConfig, ChannelId, DeliveryTarget, HistogramCallback, HistogramEvent, ProgPos, Roi,
    Weights,
};
use crate::regs::HardwareRegisterPort;

/// Legacy single-channel histogram request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistogramRequest {
    pub roi: Roi,
    pub weights: Weights,
    pub pos: ProgPos,
    pub threshold: u32,
}

impl HistogramRequest {
    fn to_config(self) -> ChannelConfig {
        ChannelConfig::new(self.roi, self.weights)
            .with_pos(self.pos)
            .with_threshold(self.threshold)
    }
}

/// Configure-and-arm request for one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRequest {
    pub hist_id: u32,
    pub config: ChannelConfig,
}

/// Arm an already configured channel with queued delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventRequest {
    pub hist_id: u32,
    /// Handed back in every event the request produces.
    pub user_handle: u32,
}

fn channel<P: HardwareRegisterPort>(dqe: &DqeDevice<P>, hist_id: u32) -> DqeResult<ChannelId> {
    dqe.ensure_ready()?;
    ChannelId::new(hist_id)
}

/// Arm the legacy capture for one frame; the result is queued as an event.
pub fn histogram_request<P: HardwareRegisterPort>(
    dqe: &DqeDevice<P>,
    request: &HistogramRequest,
) -> DqeResult<()> {
    dqe.ensure_ready()?;
    dqe.histogram_legacy_request(Arc::new(request.to_config()))
}

pub fn histogram_cancel<P: HardwareRegisterPort>(dqe: &DqeDevice<P>) -> DqeResult<()> {
    dqe.histogram_legacy_cancel()
}

/// Configure a channel and arm it in one step.
pub fn histogram_channel_request<P: HardwareRegisterPort>(
    dqe: &DqeDevice<P>,
    request: &ChannelRequest,
    callback: Option<HistogramCallback>,
) -> DqeResult<()> {
    let id = channel(dqe, request.hist_id)?;
    dqe.histogram_chan_configure(id, Arc::new(request.config.clone()))?;
    dqe.histogram_chan_set_state(id, true, callback)?;
    debug!("control: channel {id} requested");
    Ok(())
}

pub fn histogram_channel_cancel<P: HardwareRegisterPort>(
    dqe: &DqeDevice<P>,
    hist_id: u32,
) -> DqeResult<()> {
    let id = channel(dqe, hist_id)?;
    dqe.histogram_chan_set_state(id, false, None)
}

/// Arm a configured channel; its result is queued tagged with
/// `user_handle`.
pub fn histogram_event_request<P: HardwareRegisterPort>(
    dqe: &DqeDevice<P>,
    request: &EventRequest,
) -> DqeResult<()> {
    let id = channel(dqe, request.hist_id)?;
    dqe.histogram_chan_enable(
        id,
        DeliveryTarget::Queue {
            user_handle: request.user_handle,
        },
    )
}

pub fn histogram_event_cancel<P: HardwareRegisterPort>(
    dqe: &DqeDevice<P>,
    hist_id: u32,
) -> DqeResult<()> {
    histogram_channel_cancel(dqe, hist_id)
}

pub fn configure_channel<P: HardwareRegisterPort>(
    dqe: &DqeDevice<P>,
    hist_id: u32,
    config: ChannelConfig,
) -> DqeResult<()> {
    let id = channel(dqe, hist_id)?;
    dqe.histogram_chan_configure(id, Arc::new(config))
}

pub fn set_channel_state<P: HardwareRegisterPort>(
    dqe: &DqeDevice<P>,
    hist_id: u32,
    enable: bool,
    callback: Option<HistogramCallback>,
) -> DqeResult<()> {
    let id = channel(dqe, hist_id)?;
    dqe.histogram_chan_set_state(id, enable, callback)
}

/// Drain queued histogram events.
pub fn handle_histogram_event<P: HardwareRegisterPort>(
    dqe: &DqeDevice<P>,
) -> DqeResult<Vec<HistogramEvent>> {
    dqe.handle_histogram_event()
}
