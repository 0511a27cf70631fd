//! Response delivery
//!
//! The dispatcher hands every finished response to a [`ResponseEmitter`].
//! Command-line hosts print it; server hosts usually collect it with
//! [`BufferedEmitter`] and write it to their own connection.

use std::{
    io::{self, Write},
    sync::Mutex,
};

use crate::{
    core::{
        error::{DispatchError, DispatchResult},
        traits::ResponseEmitter,
    },
    http::{request::Request, response::Response},
};

/// Writes the response body to stdout. HTTP requests get a status line and
/// headers first; CLI requests only get the body.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutEmitter;

impl StdoutEmitter {
    fn write_to<W: Write>(out: &mut W, request: &Request, response: &Response) -> io::Result<()> {
        if !request.is_cli() {
            writeln!(
                out,
                "{:?} {}",
                response.version(),
                response.status()
            )?;
            for (name, value) in response.headers() {
                writeln!(out, "{name}: {value}")?;
            }
            writeln!(out)?;
        }
        out.write_all(response.body())?;
        out.flush()
    }
}

impl ResponseEmitter for StdoutEmitter {
    fn emit(&self, request: &Request, response: &Response) -> DispatchResult<()> {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        Self::write_to(&mut lock, request, response)
            .map_err(|e| DispatchError::Emit(e.to_string()))
    }
}

/// Keeps every emitted response in memory
#[derive(Debug, Default)]
pub struct BufferedEmitter {
    responses: Mutex<Vec<Response>>,
}

impl BufferedEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything emitted so far
    pub fn take(&self) -> Vec<Response> {
        self.responses
            .lock()
            .map(|mut responses| std::mem::take(&mut *responses))
            .unwrap_or_default()
    }

    pub fn responses(&self) -> Vec<Response> {
        self.responses
            .lock()
            .map(|responses| responses.clone())
            .unwrap_or_default()
    }

    pub fn last(&self) -> Option<Response> {
        self.responses
            .lock()
            .ok()
            .and_then(|responses| responses.last().cloned())
    }

    pub fn count(&self) -> usize {
        self.responses.lock().map(|r| r.len()).unwrap_or_default()
    }
}

impl ResponseEmitter for BufferedEmitter {
    fn emit(&self, _request: &Request, response: &Response) -> DispatchResult<()> {
        self.responses
            .lock()
            .map_err(|e| DispatchError::Emit(e.to_string()))?
            .push(response.clone());
        Ok(())
    }
}
