// Keyrestrict Output Layer - Shared Sink
// Serialized access to the single virtual output device

use std::sync::Arc;

use parking_lot::Mutex;

use crate::input::RawEvent;

/// Error types for uinput operations
#[derive(Debug, thiserror::Error)]
pub enum UInputError {
    #[error("Failed to create virtual device: {0}")]
    DeviceCreation(#[source] std::io::Error),

    #[error("Failed to write event: {0}")]
    Write(#[source] std::io::Error),

    #[error("Virtual device closed")]
    Closed,
}

/// A synthetic keyboard that re-injects forwarded events.
pub trait OutputSink: Send + 'static {
    /// Write `event` followed by a SYN_REPORT so consumers see it at once.
    fn emit(&mut self, event: RawEvent) -> Result<(), UInputError>;

    /// Destroy the device.
    fn close(self) -> Result<(), UInputError>
    where
        Self: Sized;
}

/// The session's output device, shared by every forwarder.
///
/// Each [`emit`](Self::emit) holds the lock for exactly one event plus its
/// SYN_REPORT, so events from different forwarders never interleave.
/// After [`close`](Self::close) every emit fails with [`UInputError::Closed`].
pub struct SharedOutput<O: OutputSink> {
    inner: Arc<Mutex<Option<O>>>,
}

impl<O: OutputSink> SharedOutput<O> {
    pub fn new(sink: O) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(sink))),
        }
    }

    pub fn emit(&self, event: RawEvent) -> Result<(), UInputError> {
        match self.inner.lock().as_mut() {
            Some(sink) => sink.emit(event),
            None => Err(UInputError::Closed),
        }
    }

    /// Destroy the device if it is still open.
    ///
    /// Returns `Ok(false)` when it was already closed.
    pub fn close(&self) -> Result<bool, UInputError> {
        let sink = self.inner.lock().take();
        match sink {
            Some(sink) => sink.close().map(|()| true),
            None => Ok(false),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().is_none()
    }
}

impl<O: OutputSink> Clone for SharedOutput<O> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
