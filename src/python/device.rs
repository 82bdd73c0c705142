use std::sync::{Arc, Mutex};
use std::time::Duration;

use pyo3::exceptions::PyRuntimeError;
use pyo3::prelude::*;

use super::dispatch::CallbackDispatcher;
use super::event::HistogramEvent;
use super::helpers::{
    bins_to_ndarray, parse_channel, parse_pos, parse_roi, parse_weights, to_py_err,
};
use crate::config::DqeConfig;
use crate::control::{self, EventRequest, HistogramRequest};
use crate::dqe::{DqeDevice, EnhancementState};
use crate::histogram::{ChannelConfig, CommittedFrame, HistogramBins};
use crate::regs::MemoryRegisters;
use crate::vsync::VsyncDriver;

type Device = DqeDevice<MemoryRegisters>;

/// Display quality enhancer over in-memory registers
///
/// Supports context manager:
///   with Dqe() as dqe:
///       dqe.configure(0, (0, 0, 1080, 2400))
///       dqe.request(0)
///
/// The device is attached on construction and detached by close().
#[pyclass(name = "Dqe")]
pub(crate) struct Dqe {
    device: Arc<Device>,
    vsync: Mutex<Option<VsyncDriver>>,
    callbacks: CallbackDispatcher,
}

impl Dqe {
    /// Run `f` against the device with the GIL released.
    fn with_device<R: Send>(&self, py: Python<'_>, f: impl FnOnce(&Device) -> R + Send) -> R {
        let device = &self.device;
        py.detach(|| f(device))
    }
}

impl Drop for Dqe {
    fn drop(&mut self) {
        let driver = match self.vsync.get_mut() {
            Ok(vsync) => vsync.take(),
            Err(_) => None,
        };
        // The vsync thread may be inside a Python callback waiting for the
        // GIL; join it with the GIL released.
        if let Some(driver) = driver {
            Python::attach(|py| py.detach(|| drop(driver)));
        }
    }
}

#[pymethods]
impl Dqe {
    /// Create and attach a device
    ///
    /// Args:
    ///     event_queue_depth: Pending events kept for events(), defaults to 16
    ///     verbose_hist: Log every histogram delivery
    ///     force_disabled: Keep the enhancement block off
    ///     from_env: Start from DQE_* environment variables instead of defaults
    #[new]
    #[pyo3(signature = (event_queue_depth=None, verbose_hist=None, force_disabled=None, from_env=false))]
    fn new(
        event_queue_depth: Option<usize>,
        verbose_hist: Option<bool>,
        force_disabled: Option<bool>,
        from_env: bool,
    ) -> PyResult<Self> {
        let base = if from_env {
            DqeConfig::from_env()
        } else {
            DqeConfig::default()
        };
        let config = DqeConfig {
            event_queue_depth: event_queue_depth.unwrap_or(base.event_queue_depth),
            verbose_hist: verbose_hist.unwrap_or(base.verbose_hist),
            force_disabled: force_disabled.unwrap_or(base.force_disabled),
        };
        let callbacks = CallbackDispatcher::spawn()?;
        let device = Arc::new(DqeDevice::new(MemoryRegisters::new(), config));
        device.attach();
        Ok(Dqe {
            device,
            vsync: Mutex::new(None),
            callbacks,
        })
    }

    /// Whether the device accepts requests
    #[getter]
    fn attached(&self) -> bool {
        self.device.is_initialized()
    }

    /// Commit an enabled state with unchanged stages for a panel size.
    fn enable(&self, py: Python<'_>, width: u32, height: u32) -> PyResult<()> {
        self.with_device(py, |d| d.update(&EnhancementState::enabled(), width, height))
            .map_err(to_py_err)
    }

    /// Return every stage to its disabled baseline.
    fn reset(&self, py: Python<'_>) -> PyResult<()> {
        self.with_device(py, |d| d.reset()).map_err(to_py_err)
    }

    #[setter]
    fn set_force_disabled(&self, force: bool) {
        self.device.set_force_disabled(force);
    }

    #[setter]
    fn set_verbose_hist(&self, verbose: bool) {
        self.device.set_verbose_hist(verbose);
    }

    /// Store a channel configuration
    ///
    /// Args:
    ///     hist_id: Channel index
    ///     roi: (start_x, start_y, hsize, vsize)
    ///     weights: (r, g, b), defaults to BT.709 luma
    ///     pos: "pre" or "post" enhancement, defaults to "post"
    ///     threshold: Minimum luma counted
    #[pyo3(signature = (hist_id, roi, weights=None, pos="post", threshold=0))]
    fn configure(
        &self,
        py: Python<'_>,
        hist_id: u32,
        roi: (u16, u16, u16, u16),
        weights: Option<(u16, u16, u16)>,
        pos: &str,
        threshold: u32,
    ) -> PyResult<()> {
        let config = ChannelConfig::new(parse_roi(roi), parse_weights(weights))
            .with_pos(parse_pos(pos)?)
            .with_threshold(threshold);
        self.with_device(py, |d| control::configure_channel(d, hist_id, config))
            .map_err(to_py_err)
    }

    /// Arm a configured channel
    ///
    /// Args:
    ///     hist_id: Channel index
    ///     callback: Called as callback(hist_id, bins) on the callback
    ///       thread; when None the result is queued for events()
    #[pyo3(signature = (hist_id, callback=None))]
    fn request(&self, py: Python<'_>, hist_id: u32, callback: Option<Py<PyAny>>) -> PyResult<()> {
        let callback = callback.map(|callable| self.callbacks.callback(callable));
        self.with_device(py, |d| control::set_channel_state(d, hist_id, true, callback))
            .map_err(to_py_err)
    }

    /// Arm a configured channel; its result is queued tagged with user_handle.
    #[pyo3(signature = (hist_id, user_handle=0))]
    fn event_request(&self, py: Python<'_>, hist_id: u32, user_handle: u32) -> PyResult<()> {
        let request = EventRequest {
            hist_id,
            user_handle,
        };
        self.with_device(py, |d| control::histogram_event_request(d, &request))
            .map_err(to_py_err)
    }

    /// Disable a channel. No callback runs for it once this returns, unless
    /// called from inside a callback.
    fn cancel(&self, py: Python<'_>, hist_id: u32) -> PyResult<()> {
        self.with_device(py, |d| control::histogram_channel_cancel(d, hist_id))
            .map_err(to_py_err)?;
        self.callbacks.flush(py);
        Ok(())
    }

    /// Arm the legacy single-channel histogram for one frame.
    #[pyo3(signature = (roi, weights=None, pos="post", threshold=0))]
    fn legacy_request(
        &self,
        py: Python<'_>,
        roi: (u16, u16, u16, u16),
        weights: Option<(u16, u16, u16)>,
        pos: &str,
        threshold: u32,
    ) -> PyResult<()> {
        let request = HistogramRequest {
            roi: parse_roi(roi),
            weights: parse_weights(weights),
            pos: parse_pos(pos)?,
            threshold,
        };
        self.with_device(py, |d| control::histogram_request(d, &request))
            .map_err(to_py_err)
    }

    fn legacy_cancel(&self, py: Python<'_>) -> PyResult<()> {
        self.with_device(py, |d| control::histogram_cancel(d))
            .map_err(to_py_err)
    }

    /// Run state of a channel: "disabled", "hibernation",
    /// "pending_framedone" or "idle".
    fn run_state(&self, py: Python<'_>, hist_id: u32) -> PyResult<&'static str> {
        let id = parse_channel(hist_id)?;
        Ok(self.with_device(py, |d| d.run_state(id)).as_str())
    }

    /// Captured bins of an idle channel, None otherwise.
    fn channel_bins<'py>(
        &self,
        py: Python<'py>,
        hist_id: u32,
    ) -> PyResult<Option<Bound<'py, PyAny>>> {
        let id = parse_channel(hist_id)?;
        let bins = self.with_device(py, |d| d.channel_bins(id));
        bins.map(|b| bins_to_ndarray(py, &b)).transpose()
    }

    /// Set the result the simulated channel latches on the next frame.
    fn load_histogram(&self, hist_id: u32, bins: Vec<u16>) -> PyResult<()> {
        let id = parse_channel(hist_id)?;
        let bins = HistogramBins::from_slice(&bins).map_err(to_py_err)?;
        self.device.port().load_histogram(id, bins);
        Ok(())
    }

    /// Signal one frame completion.
    ///
    /// Returns:
    ///     tuple: (delivered, queued, deferred)
    #[pyo3(signature = (active=true, self_refresh=false))]
    fn frame_done(&self, py: Python<'_>, active: bool, self_refresh: bool) -> (usize, usize, bool) {
        let frame = CommittedFrame {
            active,
            self_refresh,
        };
        let report = self.with_device(py, |d| d.frame_completed(&frame));
        (report.delivered, report.queued, report.deferred)
    }

    /// Drain queued histogram events, oldest first.
    fn events(&self, py: Python<'_>) -> PyResult<Vec<HistogramEvent>> {
        let events = self
            .with_device(py, |d| control::handle_histogram_event(d))
            .map_err(to_py_err)?;
        Ok(events
            .into_iter()
            .map(|inner| HistogramEvent { inner })
            .collect())
    }

    fn hibernation_enter(&self, py: Python<'_>) -> PyResult<()> {
        self.with_device(py, |d| d.hibernation_enter())
            .map_err(to_py_err)
    }

    fn hibernation_exit(&self, py: Python<'_>) -> PyResult<()> {
        self.with_device(py, |d| d.hibernation_exit())
            .map_err(to_py_err)
    }

    /// Dedicate a channel to LHBM gray level tracking.
    #[pyo3(signature = (hist_id, roi, weights=None))]
    fn configure_lhbm(
        &self,
        py: Python<'_>,
        hist_id: u32,
        roi: (u16, u16, u16, u16),
        weights: Option<(u16, u16, u16)>,
    ) -> PyResult<()> {
        let id = parse_channel(hist_id)?;
        let config = Arc::new(ChannelConfig::new(parse_roi(roi), parse_weights(weights)));
        self.with_device(py, |d| d.configure_lhbm(id, config))
            .map_err(to_py_err)
    }

    /// Mean gray level of the last LHBM capture, None before the first.
    #[getter]
    fn lhbm_gray_level(&self) -> Option<u32> {
        self.device.lhbm_gray_level()
    }

    /// Start a thread that signals frame completion every period_ms.
    #[pyo3(signature = (period_ms=16.0))]
    fn start_vsync(&self, py: Python<'_>, period_ms: f64) -> PyResult<()> {
        if !period_ms.is_finite() || period_ms <= 0.0 {
            return Err(PyRuntimeError::new_err("period_ms must be positive"));
        }
        let period = Duration::from_secs_f64(period_ms / 1000.0);
        let device = Arc::clone(&self.device);
        py.detach(|| {
            let mut vsync = self
                .vsync
                .lock()
                .map_err(|_| PyRuntimeError::new_err("vsync mutex poisoned"))?;
            if vsync.is_some() {
                return Err(PyRuntimeError::new_err("vsync is already running"));
            }
            let driver = VsyncDriver::spawn(device, period)
                .map_err(|e| PyRuntimeError::new_err(e.to_string()))?;
            *vsync = Some(driver);
            Ok(())
        })
    }

    /// Stop the vsync thread, if running.
    fn stop_vsync(&self, py: Python<'_>) -> PyResult<()> {
        py.detach(|| {
            let driver = self
                .vsync
                .lock()
                .map_err(|_| PyRuntimeError::new_err("vsync mutex poisoned"))?
                .take();
            match driver {
                Some(driver) => driver
                    .close()
                    .map_err(|e| PyRuntimeError::new_err(e.to_string())),
                None => Ok(()),
            }
        })
    }

    /// Frames signalled by the vsync thread, 0 when not running.
    #[getter]
    fn vsync_frames(&self) -> PyResult<u64> {
        let vsync = self
            .vsync
            .lock()
            .map_err(|_| PyRuntimeError::new_err("vsync mutex poisoned"))?;
        Ok(vsync.as_ref().map_or(0, VsyncDriver::frames))
    }

    /// Stop vsync and detach the device.
    fn close(&self, py: Python<'_>) -> PyResult<()> {
        self.stop_vsync(py)?;
        self.with_device(py, |d| d.detach());
        self.callbacks.flush(py);
        Ok(())
    }

    fn __enter__(slf: Py<Self>) -> Py<Self> {
        slf
    }

    fn __exit__(
        &self,
        py: Python<'_>,
        _exc_type: Option<Bound<'_, PyAny>>,
        _exc_val: Option<Bound<'_, PyAny>>,
        _exc_tb: Option<Bound<'_, PyAny>>,
    ) -> PyResult<bool> {
        self.close(py)?;
        Ok(false)
    }

    fn __repr__(&self) -> String {
        if self.device.is_initialized() {
            "Dqe(attached)".to_string()
        } else {
            "Dqe(detached)".to_string()
        }
    }
}
