//! Outgoing fragmentation to the negotiated control-packet size.
//!
//! ```text
//! message: [hdr | p0 p1 ... pK]                 (K+1 > max)
//!
//!   1. set PBF, LEN = max, write hdr + first max bytes
//!   2. consume_front(hdr + max)  → freed space becomes headroom
//!   3. prepend(hdr, LEN = rest)  → next fragment, no payload copy
//!   4. repeat until the rest fits; last fragment goes out with PBF = 0
//! ```
//!
//! Octets 0/1 (MT, GID, OID) are identical on every fragment; only PBF
//! and the length octet change.

use log::debug;

use super::transport::{Transport, write_all};
use crate::error::{Error, LinkError};
use crate::nci::{HEADER_SIZE, LogicalMessage, PBF_MASK};
use crate::trace::{self, Direction};

/// Write `msg` to the transport, split into frames of at most
/// `max_payload` payload bytes.
///
/// Returns the number of wire frames written.
pub fn send_fragmented<T: Transport>(
    transport: &mut T,
    msg: LogicalMessage,
    max_payload: u16,
    trace_enabled: bool,
) -> Result<usize, Error> {
    let max = usize::from(max_payload.clamp(1, u16::from(u8::MAX)));
    let mut buf = msg.into_buf();
    let octet0 = buf.as_slice()[0] & !PBF_MASK;
    let octet1 = buf.as_slice()[1];
    let mut frames = 0;

    while buf.len() - HEADER_SIZE > max {
        {
            let head = buf.as_mut_slice();
            head[0] = octet0 | PBF_MASK;
            head[2] = max as u8;
        }
        let fragment = &buf.as_slice()[..HEADER_SIZE + max];
        trace::dump(trace_enabled, Direction::Tx, fragment);
        write_all(transport, fragment)?;
        frames += 1;

        buf.consume_front(HEADER_SIZE + max);
        let rest = buf.len();
        buf.prepend(&[octet0, octet1, rest.min(usize::from(u8::MAX)) as u8])
            .map_err(|_| LinkError::BadHeader)?;
    }

    {
        let head = buf.as_mut_slice();
        head[0] = octet0;
        head[2] = (head.len() - HEADER_SIZE) as u8;
    }
    trace::dump(trace_enabled, Direction::Tx, buf.as_slice());
    write_all(transport, buf.as_slice())?;
    frames += 1;

    if frames > 1 {
        debug!("TX: sent as {} fragments (max {})", frames, max);
    }
    Ok(frames)
}
