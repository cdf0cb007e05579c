//! Wake-line adapter.
//!
//! Wraps any byte [`Transport`] and drives the host-to-controller wake
//! signal from an `embedded-hal` output pin. The wrapped transport keeps
//! framing, reset and I/O; only [`Transport::set_wake`] is redirected.

use embedded_hal::digital::OutputPin;
use log::debug;

use crate::error::TransportError;
use crate::link::{ResetLevel, Transport};

pub struct PinWakeTransport<T, P> {
    inner: T,
    pin: P,
    asserted: bool,
}

impl<T: Transport, P: OutputPin> PinWakeTransport<T, P> {
    /// The pin is left untouched until the first wake change.
    pub fn new(inner: T, pin: P) -> Self {
        Self {
            inner,
            pin,
            asserted: false,
        }
    }

    pub fn is_asserted(&self) -> bool {
        self.asserted
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    pub fn into_parts(self) -> (T, P) {
        (self.inner, self.pin)
    }
}

impl<T: Transport, P: OutputPin> Transport for PinWakeTransport<T, P> {
    type Error = TransportError;

    fn read(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, TransportError> {
        self.inner.read(buf, timeout_ms).map_err(Into::into)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        self.inner.write(data).map_err(Into::into)
    }

    fn reset(&mut self, level: ResetLevel) -> Result<(), TransportError> {
        self.inner.reset(level).map_err(Into::into)
    }

    fn set_wake(&mut self, asserted: bool) -> Result<(), TransportError> {
        let driven = if asserted {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        driven.map_err(|e| {
            debug!("LPM: wake pin error {:?}", e);
            TransportError::WakeFailed
        })?;
        self.asserted = asserted;
        Ok(())
    }
}
