//! Wire frames, logical messages and their one-shot classification.

use super::buffer::FrameBuf;
use super::{
    CONN_ID_MASK, HEADER_SIZE, Header, MessageType, OID_MASK, Opcode, PBF_MASK, gid, oid,
};
use crate::error::LinkError;

// ---------------------------------------------------------------------------
// Wire frames
// ---------------------------------------------------------------------------

/// Which header profile produced a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// NCI control/data packet (3-octet header).
    Nci,
    /// Legacy event packet (`[type, code, len, payload..]`).
    Event,
    /// Firmware-download packet (2-octet header, CRC trailer).
    Download,
}

/// One complete frame exactly as it came off the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireFrame {
    pub kind: FrameKind,
    pub buf: FrameBuf,
}

impl WireFrame {
    pub fn new(kind: FrameKind, buf: FrameBuf) -> Self {
        Self { kind, buf }
    }

    pub fn bytes(&self) -> &[u8] {
        self.buf.as_slice()
    }
}

// ---------------------------------------------------------------------------
// Logical message
// ---------------------------------------------------------------------------

/// A complete, unfragmented NCI message: header followed by payload.
///
/// The length octet mirrors the payload length modulo 256; messages
/// reassembled past 255 payload bytes keep their full payload in
/// [`payload`](Self::payload).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalMessage {
    buf: FrameBuf,
}

impl LogicalMessage {
    pub fn new(
        mt: MessageType,
        group: u8,
        opcode: u8,
        payload: &[u8],
    ) -> Result<Self, LinkError> {
        // Data frames are never fragmented on the way out.
        if mt == MessageType::Data && payload.len() > usize::from(u8::MAX) {
            return Err(LinkError::Oversize);
        }
        let header = Header {
            mt,
            pbf: false,
            gid: group,
            oid: opcode,
            len: payload.len() as u8,
        };
        let mut buf = FrameBuf::new();
        buf.extend_from_slice(&header.to_bytes())?;
        buf.extend_from_slice(payload)?;
        Ok(Self { buf })
    }

    pub fn command(group: u8, opcode: u8, payload: &[u8]) -> Result<Self, LinkError> {
        Self::new(MessageType::Command, group, opcode, payload)
    }

    pub fn data(conn_id: u8, payload: &[u8]) -> Result<Self, LinkError> {
        Self::new(MessageType::Data, conn_id & CONN_ID_MASK, 0, payload)
    }

    /// Adopt a buffer that already starts with an NCI header.
    pub fn from_buf(buf: FrameBuf) -> Result<Self, LinkError> {
        if buf.len() < HEADER_SIZE {
            return Err(LinkError::Truncated);
        }
        Ok(Self { buf })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LinkError> {
        Self::from_buf(FrameBuf::from_slice(bytes)?)
    }

    pub fn header(&self) -> Header {
        let b = self.buf.as_slice();
        Header {
            mt: MessageType::from_octet(b[0]),
            pbf: b[0] & PBF_MASK != 0,
            gid: b[0] & super::GID_MASK,
            oid: b[1] & OID_MASK,
            len: b[2],
        }
    }

    pub fn message_type(&self) -> MessageType {
        MessageType::from_octet(self.buf.as_slice()[0])
    }

    pub fn group_id(&self) -> u8 {
        self.header().gid
    }

    pub fn opcode(&self) -> Opcode {
        self.header().opcode()
    }

    pub fn is_command(&self) -> bool {
        self.message_type() == MessageType::Command
    }

    pub fn is_data(&self) -> bool {
        self.message_type() == MessageType::Data
    }

    pub fn payload(&self) -> &[u8] {
        &self.buf.as_slice()[HEADER_SIZE..]
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.buf.as_mut_slice()[HEADER_SIZE..]
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.buf.as_slice()
    }

    pub fn into_buf(self) -> FrameBuf {
        self.buf
    }

    pub fn classify(&self) -> MessageClass {
        MessageClass::of(self)
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Everything the link engine needs to know about a message, decided once
/// at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageClass {
    Data { conn_id: u8 },
    CoreResetRsp,
    CoreInitRsp,
    CoreSetConfigRsp,
    CoreConnCreditsNtf,
    RfDiscoverRsp { status: u8 },
    RfIntfActivatedNtf { interface: u8, mode: u8 },
    RfDeactivateNtf { kind: u8 },
    PropSleep { mt: MessageType },
    PropMemAccessRsp,
    /// Any other proprietary response.
    PropRsp { oid: u8 },
    Other { mt: MessageType, opcode: Opcode },
}

impl MessageClass {
    pub fn of(msg: &LogicalMessage) -> Self {
        let h = msg.header();
        let p = msg.payload();
        let at = |i: usize| p.get(i).copied().unwrap_or(0);

        use MessageType::{Data, Notification as Ntf, Response as Rsp};
        match (h.mt, h.gid, h.oid) {
            (Data, conn_id, _) => Self::Data { conn_id },
            (Rsp, gid::CORE, oid::core::RESET) => Self::CoreResetRsp,
            (Rsp, gid::CORE, oid::core::INIT) => Self::CoreInitRsp,
            (Rsp, gid::CORE, oid::core::SET_CONFIG) => Self::CoreSetConfigRsp,
            (Ntf, gid::CORE, oid::core::CONN_CREDITS) => Self::CoreConnCreditsNtf,
            (Rsp, gid::RF, oid::rf::DISCOVER) => Self::RfDiscoverRsp { status: at(0) },
            (Ntf, gid::RF, oid::rf::INTF_ACTIVATED) => Self::RfIntfActivatedNtf {
                interface: at(1),
                mode: at(3),
            },
            (Ntf, gid::RF, oid::rf::DEACTIVATE) => Self::RfDeactivateNtf { kind: at(0) },
            (mt, gid::PROP, oid::prop::SLEEP) => Self::PropSleep { mt },
            (Rsp, gid::PROP, oid::prop::MEMACCESS) => Self::PropMemAccessRsp,
            (Rsp, gid::PROP, op) => Self::PropRsp { oid: op },
            (mt, _, _) => Self::Other {
                mt,
                opcode: h.opcode(),
            },
        }
    }

    /// Any proprietary-group response, including the sleep response.
    pub fn is_prop_response(&self) -> bool {
        matches!(
            self,
            Self::PropSleep {
                mt: MessageType::Response
            } | Self::PropMemAccessRsp
                | Self::PropRsp { .. }
        )
    }
}
