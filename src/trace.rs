//! Protocol trace sink.
//!
//! Hex dumps of every received frame and transmitted fragment, emitted at
//! `trace` level under the `ncilink::trace` target so they can be routed
//! or filtered independently of the engine's own log lines.

use core::fmt;

use log::trace;

pub const TARGET: &str = "ncilink::trace";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Rx,
    Tx,
}

/// Space-separated upper-case hex rendering of a byte slice.
pub struct Hex<'a>(pub &'a [u8]);

impl fmt::Display for Hex<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{b:02X}")?;
        }
        Ok(())
    }
}

pub fn dump(enabled: bool, dir: Direction, bytes: &[u8]) {
    if !enabled {
        return;
    }
    let arrow = match dir {
        Direction::Rx => "<<",
        Direction::Tx => ">>",
    };
    trace!(target: TARGET, "{} [{}] {}", arrow, bytes.len(), Hex(bytes));
}
