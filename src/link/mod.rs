//! Byte-level link layers between the transport and the engine.
//!
//! ```text
//!  Transport ──▶ FrameReceiver ──▶ Reassembler ──▶ HalService
//!  Transport ◀── send_fragmented ◀───────────────── HalService
//! ```

pub mod fragment;
pub mod reassembly;
pub mod receiver;
pub mod transport;

pub use fragment::send_fragmented;
pub use reassembly::{Assembled, RasError, Reassembler};
pub use receiver::{FrameReceiver, RxProfile};
pub use transport::{ResetLevel, Transport, write_all};
