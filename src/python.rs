// PyO3 Python binding layer
//
// Two PyClasses:
// - Dqe: one device over in-memory registers, plus an optional vsync thread
// - HistogramEvent: drained histogram result, bins exposed as numpy
//
// Device locks are only taken with the GIL released. Python callbacks are
// queued by the frame-completion path and run on a dispatcher thread that
// holds the GIL.

use pyo3::prelude::*;

use self::device::Dqe;
use self::event::HistogramEvent;

mod device;
mod dispatch;
mod event;
mod helpers;

/// Display quality enhancer core
#[pymodule]
fn dqe(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<Dqe>()?;
    m.add_class::<HistogramEvent>()?;
    Ok(())
}
