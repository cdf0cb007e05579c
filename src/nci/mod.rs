//! NCI wire vocabulary.
//!
//! Control and data packets share a three-octet header:
//!
//! ```text
//!  octet 0                      octet 1              octet 2
//! ┌──────────┬─────┬──────────┐┌────────┬──────────┐┌──────────┐
//! │ MT (3b)  │ PBF │ GID/Conn ││ RFU 2b │ OID (6b) ││ L (8b)   │
//! └──────────┴─────┴──────────┘└────────┴──────────┘└──────────┘
//! ```
//!
//! `PBF` set means another fragment of the same message follows.

pub mod buffer;
pub mod message;

pub use buffer::{FRAME_CAPACITY, FrameBuf};
pub use message::{FrameKind, LogicalMessage, MessageClass, WireFrame};

/// Control/data header size in octets.
pub const HEADER_SIZE: usize = 3;

pub const MT_MASK: u8 = 0xE0;
pub const MT_SHIFT: u8 = 5;
pub const PBF_MASK: u8 = 0x10;
pub const GID_MASK: u8 = 0x0F;
pub const CONN_ID_MASK: u8 = 0x0F;
pub const OID_MASK: u8 = 0x3F;

/// Status octet meaning success.
pub const STATUS_OK: u8 = 0x00;

/// Group identifiers.
pub mod gid {
    pub const CORE: u8 = 0x00;
    pub const RF: u8 = 0x01;
    pub const EE: u8 = 0x02;
    pub const PROP: u8 = 0x0F;
}

/// Opcode identifiers, one namespace per group.
pub mod oid {
    pub mod core {
        pub const RESET: u8 = 0x00;
        pub const INIT: u8 = 0x01;
        pub const SET_CONFIG: u8 = 0x02;
        pub const GET_CONFIG: u8 = 0x03;
        pub const CONN_CREATE: u8 = 0x04;
        pub const CONN_CLOSE: u8 = 0x05;
        pub const CONN_CREDITS: u8 = 0x06;
    }

    pub mod rf {
        pub const DISCOVER_MAP: u8 = 0x00;
        pub const SET_ROUTING: u8 = 0x01;
        pub const GET_ROUTING: u8 = 0x02;
        pub const DISCOVER: u8 = 0x03;
        pub const DISCOVER_SELECT: u8 = 0x04;
        pub const INTF_ACTIVATED: u8 = 0x05;
        pub const DEACTIVATE: u8 = 0x06;
    }

    pub mod prop {
        pub const SLEEP: u8 = 0x02;
        pub const MEMACCESS: u8 = 0x03;
    }
}

/// RF interfaces reported in `RF_INTF_ACTIVATED_NTF`.
pub mod interface {
    pub const EE_DIRECT_RF: u8 = 0x00;
    pub const FRAME: u8 = 0x01;
    pub const ISO_DEP: u8 = 0x02;
    pub const NFC_DEP: u8 = 0x03;
}

/// Activation technology & mode values.
pub mod discovery {
    pub const POLL_A: u8 = 0x00;
    pub const POLL_B: u8 = 0x01;
    pub const POLL_F: u8 = 0x02;
    pub const POLL_KOVIO: u8 = 0x77;
    pub const LISTEN_A: u8 = 0x80;
    pub const LISTEN_B: u8 = 0x81;
    pub const LISTEN_F: u8 = 0x82;
}

/// `RF_DEACTIVATE` types.
pub mod deactivate {
    pub const IDLE: u8 = 0x00;
    pub const SLEEP: u8 = 0x01;
    pub const SLEEP_AF: u8 = 0x02;
    pub const DISCOVERY: u8 = 0x03;
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// NCI message type (the 3-bit MT field).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Data,
    Command,
    Response,
    Notification,
    /// Reserved MT values 4..=7.
    Reserved(u8),
}

impl MessageType {
    pub fn from_octet(octet0: u8) -> Self {
        match (octet0 & MT_MASK) >> MT_SHIFT {
            0 => Self::Data,
            1 => Self::Command,
            2 => Self::Response,
            3 => Self::Notification,
            other => Self::Reserved(other),
        }
    }

    /// Value already shifted into octet-0 position.
    pub fn bits(self) -> u8 {
        let raw = match self {
            Self::Data => 0,
            Self::Command => 1,
            Self::Response => 2,
            Self::Notification => 3,
            Self::Reserved(v) => v & 0x07,
        };
        raw << MT_SHIFT
    }
}

/// Group + opcode pair identifying a control message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Opcode {
    pub gid: u8,
    pub oid: u8,
}

impl Opcode {
    pub const fn new(gid: u8, oid: u8) -> Self {
        Self {
            gid: gid & GID_MASK,
            oid: oid & OID_MASK,
        }
    }
}

impl core::fmt::Display for Opcode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:X}/{:02X}", self.gid, self.oid)
    }
}

/// Decoded control/data header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub mt: MessageType,
    /// More fragments follow.
    pub pbf: bool,
    /// GID for control packets, connection id for data packets.
    pub gid: u8,
    /// OID for control packets; RFU (meaningless) for data packets.
    pub oid: u8,
    pub len: u8,
}

impl Header {
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < HEADER_SIZE {
            return None;
        }
        Some(Self {
            mt: MessageType::from_octet(bytes[0]),
            pbf: bytes[0] & PBF_MASK != 0,
            gid: bytes[0] & GID_MASK,
            oid: bytes[1] & OID_MASK,
            len: bytes[2],
        })
    }

    pub fn opcode(&self) -> Opcode {
        Opcode::new(self.gid, self.oid)
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut b0 = self.mt.bits() | (self.gid & GID_MASK);
        if self.pbf {
            b0 |= PBF_MASK;
        }
        [b0, self.oid & OID_MASK, self.len]
    }
}
