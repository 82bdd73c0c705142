// Python callback dispatch.
//
// Channel callbacks registered from Python only enqueue the result; the
// frame-completion path never waits for the GIL. A dedicated thread takes the
// GIL and calls the Python callable, in delivery order.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use pyo3::exceptions::PyRuntimeError;
use pyo3::prelude::*;

use super::helpers::bins_to_ndarray;
use crate::histogram::{ChannelId, HistogramBins, HistogramCallback};

enum Dispatch {
    Deliver {
        callable: Arc<Py<PyAny>>,
        id: ChannelId,
        bins: HistogramBins,
    },
    /// Acknowledged once everything queued before it has run.
    Flush(mpsc::Sender<()>),
}

pub(crate) struct CallbackDispatcher {
    tx: mpsc::Sender<Dispatch>,
    thread: ThreadId,
}

impl CallbackDispatcher {
    /// Spawn the dispatcher thread. It exits once every callback built by
    /// [`callback`](Self::callback) and the dispatcher itself are dropped.
    pub(crate) fn spawn() -> PyResult<Self> {
        let (tx, rx) = mpsc::channel::<Dispatch>();
        let handle = thread::Builder::new()
            .name("dqe-callbacks".into())
            .spawn(move || {
                while let Ok(msg) = rx.recv() {
                    match msg {
                        Dispatch::Deliver { callable, id, bins } => Python::attach(|py| {
                            // exceptions are printed, never propagated
                            let result = bins_to_ndarray(py, &bins)
                                .and_then(|array| callable.bind(py).call1((id.index(), array)));
                            if let Err(e) = result {
                                e.print(py);
                            }
                        }),
                        Dispatch::Flush(done) => {
                            let _ = done.send(());
                        }
                    }
                }
            })
            .map_err(|e| PyRuntimeError::new_err(format!("failed to spawn callback thread: {e}")))?;
        Ok(Self {
            tx,
            thread: handle.thread().id(),
        })
    }

    /// Wrap a Python callable `(hist_id, bins)` as a channel callback that
    /// only enqueues.
    pub(crate) fn callback(&self, callable: Py<PyAny>) -> HistogramCallback {
        let tx = self.tx.clone();
        let callable = Arc::new(callable);
        Arc::new(move |id, bins| {
            let _ = tx.send(Dispatch::Deliver {
                callable: Arc::clone(&callable),
                id,
                bins: bins.clone(),
            });
        })
    }

    /// Block, with the GIL released, until every callback enqueued so far
    /// has returned. No-op when called from a callback.
    pub(crate) fn flush(&self, py: Python<'_>) {
        if thread::current().id() == self.thread {
            return;
        }
        let (done_tx, done_rx) = mpsc::channel();
        if self.tx.send(Dispatch::Flush(done_tx)).is_err() {
            return;
        }
        py.detach(move || {
            let _ = done_rx.recv();
        });
    }
}
