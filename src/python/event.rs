use pyo3::prelude::*;

use super::helpers::bins_to_ndarray;
use crate::histogram::{self, EventSource};

/// Histogram result drained from the pending events list
#[pyclass(frozen)]
pub(crate) struct HistogramEvent {
    pub(super) inner: histogram::HistogramEvent,
}

#[pymethods]
impl HistogramEvent {
    /// Channel index, or None for the legacy histogram
    #[getter]
    fn hist_id(&self) -> Option<usize> {
        match self.inner.source {
            EventSource::Channel(id) => Some(id.index()),
            EventSource::Legacy => None,
        }
    }

    /// Handle given with the request
    #[getter]
    fn user_handle(&self) -> u32 {
        self.inner.user_handle
    }

    /// Frame-completion sequence number that produced the result
    #[getter]
    fn sequence(&self) -> u64 {
        self.inner.sequence
    }

    /// Sum of all bins
    #[getter]
    fn total(&self) -> u64 {
        self.inner.bins.total()
    }

    /// Bins as a read-only numpy array, shape (256,), dtype uint16.
    fn bins<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyAny>> {
        bins_to_ndarray(py, &self.inner.bins)
    }

    /// numpy __array__ protocol, enables np.array(event) to work automatically
    #[pyo3(signature = (dtype=None, copy=None))]
    fn __array__<'py>(
        &self,
        py: Python<'py>,
        dtype: Option<Bound<'py, PyAny>>,
        copy: Option<Bound<'py, PyAny>>,
    ) -> PyResult<Bound<'py, PyAny>> {
        let _ = (dtype, copy);
        bins_to_ndarray(py, &self.inner.bins)
    }

    fn __repr__(&self) -> String {
        let source = match self.inner.source {
            EventSource::Channel(id) => format!("hist_id={id}"),
            EventSource::Legacy => "legacy".to_string(),
        };
        format!(
            "HistogramEvent({source}, user_handle={}, sequence={}, total={})",
            self.inner.user_handle,
            self.inner.sequence,
            self.inner.bins.total()
        )
    }
}
