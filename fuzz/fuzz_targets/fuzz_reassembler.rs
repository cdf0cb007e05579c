//! Fuzz target: `Reassembler::assemble`
//!
//! Splits the input into length-prefixed control frames and pushes them
//! through the reassembler. It must never panic, never yield a message
//! larger than its capacity, and must be idle after any terminal frame.
//!
//! cargo fuzz run fuzz_reassembler

#![no_main]

use libfuzzer_sys::fuzz_target;
use ncilink::link::{Assembled, Reassembler};
use ncilink::nci::{FrameBuf, HEADER_SIZE, PBF_MASK};

const CAPACITY: usize = 300;

fuzz_target!(|data: &[u8]| {
    let mut ras = Reassembler::new(CAPACITY);
    let mut rest = data;

    while rest.len() >= HEADER_SIZE {
        let len = usize::from(rest[2]).min(rest.len() - HEADER_SIZE);
        let (raw, tail) = rest.split_at(HEADER_SIZE + len);
        rest = tail;

        let mut bytes = raw.to_vec();
        bytes[2] = len as u8;
        let last = bytes[0] & PBF_MASK == 0;
        let Ok(frame) = FrameBuf::from_slice(&bytes) else {
            continue;
        };
        match ras.assemble(frame) {
            Ok(Assembled::Complete(msg)) => assert!(msg.as_bytes().len() <= CAPACITY),
            Ok(_) | Err(_) => {}
        }
        if last {
            assert!(!ras.in_progress());
        }
    }
});
