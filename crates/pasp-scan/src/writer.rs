//! Output sinks the translator writes through.

use std::io;
use std::sync::Arc;

/// Sink failure. Cloneable so one outcome can be handed to several waiters.
#[derive(Debug, Clone, thiserror::Error)]
pub enum WriteError {
    #[error("write failed: {0}")]
    Io(Arc<io::Error>),
    #[error("output buffer allocation failed")]
    OutOfMemory,
}

impl From<io::Error> for WriteError {
    fn from(err: io::Error) -> Self {
        WriteError::Io(Arc::new(err))
    }
}

/// Destination for translated script text.
pub trait Writer {
    /// Write `bytes` in full.
    fn out(&mut self, bytes: &[u8]) -> Result<(), WriteError>;

    /// Write a literal fragment known at compile time.
    fn const_out(&mut self, bytes: &'static [u8]) -> Result<(), WriteError> {
        debug_assert!(!bytes.contains(&0), "literal fragment contains NUL");
        self.out(bytes)
    }
}

impl Writer for Vec<u8> {
    fn out(&mut self, bytes: &[u8]) -> Result<(), WriteError> {
        self.try_reserve(bytes.len())
            .map_err(|_| WriteError::OutOfMemory)?;
        self.extend_from_slice(bytes);
        Ok(())
    }
}

impl<W: Writer + ?Sized> Writer for &mut W {
    fn out(&mut self, bytes: &[u8]) -> Result<(), WriteError> {
        (**self).out(bytes)
    }

    fn const_out(&mut self, bytes: &'static [u8]) -> Result<(), WriteError> {
        (**self).const_out(bytes)
    }
}

/// Adapts any [`io::Write`] into a [`Writer`], counting bytes written.
#[derive(Debug)]
pub struct StreamWriter<W> {
    inner: W,
    written: u64,
}

impl<W: io::Write> StreamWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    pub fn flush(&mut self) -> Result<(), WriteError> {
        self.inner.flush().map_err(WriteError::from)
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: io::Write> Writer for StreamWriter<W> {
    fn out(&mut self, bytes: &[u8]) -> Result<(), WriteError> {
        self.inner.write_all(bytes)?;
        self.written += bytes.len() as u64;
        Ok(())
    }
}
