//! Byte transport abstraction — the controller's character device.
//!
//! Concrete implementations live outside the engine (I2C/UART drivers,
//! test mocks). The engine is generic over `Transport`, so swapping the
//! bus requires zero changes to framing or command logic.

use crate::error::TransportError;

/// Levels accepted by [`Transport::reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResetLevel {
    /// Controller powered down.
    PowerOff = 0,
    /// Controller powered up in normal (NCI) mode.
    PowerOn = 1,
    /// Controller powered up in firmware-download mode.
    Download = 2,
}

/// Blocking byte channel to the controller.
pub trait Transport {
    /// Error type for this transport.
    type Error: core::fmt::Debug + Into<TransportError>;

    /// Read up to `buf.len()` bytes, waiting at most `timeout_ms`.
    ///
    /// Returns the number of bytes read; `0` means end-of-stream. Reads may
    /// be short, callers reissue for the remainder.
    fn read(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, Self::Error>;

    /// Write `data`, returning how many bytes were accepted.
    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error>;

    /// Drive the reset / mode-select line.
    fn reset(&mut self, level: ResetLevel) -> Result<(), Self::Error>;

    /// Assert (`true`) or release the host-to-controller wake signal.
    fn set_wake(&mut self, _asserted: bool) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Write the whole of `data`, resuming short writes.
pub fn write_all<T: Transport>(transport: &mut T, mut data: &[u8]) -> Result<(), TransportError> {
    while !data.is_empty() {
        let n = transport.write(data).map_err(Into::into)?;
        if n == 0 {
            return Err(TransportError::WriteFailed);
        }
        data = &data[n.min(data.len())..];
    }
    Ok(())
}

/// Fill the whole of `buf`, resuming short reads.
///
/// `Ok(0)` only when the very first read hits end-of-stream; end-of-stream
/// after some bytes arrived is an error.
pub fn read_exact<T: Transport>(
    transport: &mut T,
    buf: &mut [u8],
    timeout_ms: u32,
) -> Result<usize, TransportError> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = transport
            .read(&mut buf[filled..], timeout_ms)
            .map_err(Into::into)?;
        if n == 0 {
            return if filled == 0 {
                Ok(0)
            } else {
                Err(TransportError::Eof)
            };
        }
        filled += n;
    }
    Ok(filled)
}
