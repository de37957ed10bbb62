use crate::annotation::backend::{CommentBackend, CommentRequest};
use crate::annotation::connection::{
    AddressSource, ConnectionManager, ConnectionPolicy, NspTransport, DEFAULT_ADDRESS_VARS,
};
use crate::annotation::dispatcher::NspCommentDispatcher;
use crate::annotation::error::CommentError;
use crate::annotation::ledger::{peek_current, peek_next};
use crate::annotation::marker::MarkerColor;
use crate::annotation::relay::RelayCommentBackend;

use std::path::PathBuf;
use std::time::Duration;

use pyo3::exceptions::{PyConnectionError, PyKeyError, PyOSError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

// -----------------------------------------------------------------------------
// SDK TRANSPORT
// -----------------------------------------------------------------------------

/// Drives a Python object with the NSP SDK's call signatures, normally the
/// SDK module itself.
pub struct PyTransport {
    sdk: PyObject,
}

impl PyTransport {
    pub fn new(sdk: PyObject) -> Self {
        Self { sdk }
    }
}

impl NspTransport for PyTransport {
    fn open(&mut self, device: usize, address: &str) -> Result<(), String> {
        Python::with_gil(|py| -> PyResult<()> {
            let parameter = PyDict::new_bound(py);
            parameter.set_item("inst-addr", address)?;
            let kwargs = PyDict::new_bound(py);
            kwargs.set_item("instance", device)?;
            kwargs.set_item("parameter", parameter)?;
            self.sdk.bind(py).call_method("open", (), Some(&kwargs))?;
            Ok(())
        })
        .map_err(|e| e.to_string())
    }

    fn set_comment(
        &mut self,
        device: usize,
        comment: &str,
        color: MarkerColor,
    ) -> Result<(), String> {
        Python::with_gil(|py| -> PyResult<()> {
            let kwargs = PyDict::new_bound(py);
            kwargs.set_item("rgba_tuple", color.tbgr())?;
            kwargs.set_item("instance", device)?;
            self.sdk
                .bind(py)
                .call_method("set_comment", (comment,), Some(&kwargs))?;
            Ok(())
        })
        .map_err(|e| e.to_string())
    }

    fn close(&mut self, device: usize) -> Result<(), String> {
        Python::with_gil(|py| -> PyResult<()> {
            self.sdk.bind(py).call_method1("close", (device,))?;
            Ok(())
        })
        .map_err(|e| e.to_string())
    }
}

fn to_py_err(err: CommentError) -> PyErr {
    let message = err.to_string();
    match err {
        CommentError::InvalidRequest(_) | CommentError::MalformedLedger { .. } => {
            PyValueError::new_err(message)
        }
        CommentError::ConnectionFailure { .. } => PyConnectionError::new_err(message),
        CommentError::EmptyLedger { .. } => PyKeyError::new_err(message),
        CommentError::Io { .. } => PyOSError::new_err(message),
        CommentError::MissingConfiguration { .. }
        | CommentError::Transmit { .. }
        | CommentError::RelayClient(_) => PyRuntimeError::new_err(message),
    }
}

// -----------------------------------------------------------------------------
// PY03 CLASSES
// -----------------------------------------------------------------------------

#[pyclass(name = "CommentDispatcher")]
pub struct PyCommentDispatcher {
    dispatcher: NspCommentDispatcher<PyTransport>,
}

#[pymethods]
impl PyCommentDispatcher {
    #[new]
    #[pyo3(signature = (sdk, fail_together = false))]
    pub fn new(sdk: PyObject, fail_together: bool) -> Self {
        let policy = if fail_together {
            ConnectionPolicy::FailTogether
        } else {
            ConnectionPolicy::KeepPartial
        };
        let links = ConnectionManager::new(
            PyTransport::new(sdk),
            AddressSource::env(DEFAULT_ADDRESS_VARS.map(String::from)),
        )
        .with_policy(policy);
        PyCommentDispatcher {
            dispatcher: NspCommentDispatcher::new(links),
        }
    }

    /// Returns the session label the comment was sent under.
    #[pyo3(signature = (event, task, log_path, additional_text = ""))]
    pub fn send_comment(
        &mut self,
        event: &str,
        task: &str,
        log_path: PathBuf,
        additional_text: &str,
    ) -> PyResult<String> {
        let request =
            CommentRequest::new(event, task, log_path, additional_text).map_err(to_py_err)?;
        self.dispatcher
            .dispatch(&request)
            .map(|label| label.into_string())
            .map_err(to_py_err)
    }
}

#[pyclass(name = "RelayDispatcher")]
pub struct PyRelayDispatcher {
    backend: RelayCommentBackend,
}

#[pymethods]
impl PyRelayDispatcher {
    #[new]
    #[pyo3(signature = (url, timeout_ms = 1000))]
    pub fn new(url: &str, timeout_ms: u64) -> PyResult<Self> {
        let backend =
            RelayCommentBackend::new(url, Duration::from_millis(timeout_ms)).map_err(to_py_err)?;
        Ok(PyRelayDispatcher { backend })
    }

    #[pyo3(signature = (event, task, log_path = None, additional_text = ""))]
    pub fn send_comment(
        &mut self,
        event: &str,
        task: &str,
        log_path: Option<PathBuf>,
        additional_text: &str,
    ) -> PyResult<()> {
        let request = CommentRequest::new(
            event,
            task,
            log_path.unwrap_or_default(),
            additional_text,
        )
        .map_err(to_py_err)?;
        self.backend.send(&request).map_err(to_py_err)
    }
}

/// `(emu_id, subject_id)` the next start event would use.
#[pyfunction]
pub fn get_next_log_entry(log_path: PathBuf) -> PyResult<(u32, String)> {
    let entry = peek_next(&log_path).map_err(to_py_err)?;
    Ok((entry.sequence_id, entry.subject_id))
}

/// `(emu_id, subject_id)` of the session on record.
#[pyfunction]
pub fn get_current_log_entry(log_path: PathBuf) -> PyResult<(u32, String)> {
    let entry = peek_current(&log_path).map_err(to_py_err)?;
    Ok((entry.sequence_id, entry.subject_id))
}

/// A Python module implemented in Rust.
#[pymodule]
pub fn nsp_annotator(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyCommentDispatcher>()?;
    m.add_class::<PyRelayDispatcher>()?;
    m.add_function(wrap_pyfunction!(get_next_log_entry, m)?)?;
    m.add_function(wrap_pyfunction!(get_current_log_entry, m)?)?;
    Ok(())
}
