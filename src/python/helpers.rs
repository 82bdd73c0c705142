use numpy::{IntoPyArray, PyArrayMethods};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use crate::error::DqeError;
use crate::histogram::{ChannelId, HistogramBins, ProgPos, Roi, Weights};

pub(super) fn to_py_err(err: DqeError) -> PyErr {
    match err {
        DqeError::InvalidArgument(_) => PyValueError::new_err(err.to_string()),
        DqeError::NotReady | DqeError::Busy { .. } => PyRuntimeError::new_err(err.to_string()),
    }
}

pub(super) fn parse_channel(hist_id: u32) -> PyResult<ChannelId> {
    ChannelId::new(hist_id).map_err(to_py_err)
}

pub(super) fn parse_pos(pos: &str) -> PyResult<ProgPos> {
    ProgPos::from_name(pos).ok_or_else(|| {
        PyValueError::new_err(format!(
            "invalid pos '{}': expected 'pre' or 'post'",
            pos
        ))
    })
}

pub(super) fn parse_roi(roi: (u16, u16, u16, u16)) -> Roi {
    let (start_x, start_y, hsize, vsize) = roi;
    Roi::new(start_x, start_y, hsize, vsize)
}

pub(super) fn parse_weights(weights: Option<(u16, u16, u16)>) -> Weights {
    weights.map_or(Weights::BT709, |(weight_r, weight_g, weight_b)| Weights {
        weight_r,
        weight_g,
        weight_b,
    })
}

/// Read-only `uint16` array of the 256 bins.
pub(super) fn bins_to_ndarray<'py>(
    py: Python<'py>,
    bins: &HistogramBins,
) -> PyResult<Bound<'py, PyAny>> {
    let pyarray = bins.as_slice().to_vec().into_pyarray(py);
    pyarray
        .try_readwrite()
        .map_err(|e| PyRuntimeError::new_err(e.to_string()))?
        .make_nonwriteable();
    Ok(pyarray.into_any())
}
