//! Fuzz target: `FrameReceiver::receive_next`
//!
//! The first byte picks the header profile; the rest is served as the
//! controller's byte stream in uneven chunks. The receiver must never
//! panic, and every frame it yields must fit the configured capacity.
//!
//! cargo fuzz run fuzz_frame_receiver

#![no_main]

use libfuzzer_sys::fuzz_target;
use ncilink::error::TransportError;
use ncilink::link::{FrameReceiver, ResetLevel, RxProfile, Transport};

const CAPACITY: usize = 260;

struct Stream<'a> {
    data: &'a [u8],
    chunk: usize,
}

impl Transport for Stream<'_> {
    type Error = TransportError;

    fn read(&mut self, buf: &mut [u8], _timeout_ms: u32) -> Result<usize, TransportError> {
        if self.data.is_empty() {
            return Err(TransportError::Timeout);
        }
        let n = buf.len().min(self.chunk).min(self.data.len());
        buf[..n].copy_from_slice(&self.data[..n]);
        self.data = &self.data[n..];
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        Ok(data.len())
    }

    fn reset(&mut self, _level: ResetLevel) -> Result<(), TransportError> {
        Ok(())
    }
}

fuzz_target!(|data: &[u8]| {
    let Some((&selector, rest)) = data.split_first() else {
        return;
    };
    let profile = match selector % 3 {
        0 => RxProfile::Control,
        1 => RxProfile::Event,
        _ => RxProfile::Download,
    };
    let mut rx = FrameReceiver::new(CAPACITY, 10, false);
    rx.set_profile(profile);
    let mut stream = Stream {
        data: rest,
        chunk: usize::from(selector >> 2).max(1),
    };

    // Every call consumes at least one byte or fails, so this terminates.
    for _ in 0..=rest.len() {
        match rx.receive_next(&mut stream) {
            Ok(Some(frame)) => assert!(frame.bytes().len() <= CAPACITY),
            Ok(None) => break,
            Err(_) if stream.data.is_empty() => break,
            Err(_) => {}
        }
    }
});
