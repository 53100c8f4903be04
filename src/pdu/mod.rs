//! AgentX PDU codec (RFC 2741 Section 6).
//!
//! A frame is a fixed 20-byte [`Header`] followed by `payload_length` bytes
//! of body. The body layout is selected by the header type byte; [`Pdu`] is
//! the tagged union of every body this library speaks. The subagent emits
//! Open, Register, Unregister, Close and Response; Get, GetNext and GetBulk
//! arrive from the master. Encoders exist for all of them so the codec can
//! be exercised from both ends of the wire.
//!
//! All multi-byte integers are little-endian: sessions are opened with the
//! NetworkByteOrder flag clear and the master mirrors the session's byte
//! order on every PDU thereafter.

pub(crate) mod wire;

use crate::error::{AgentxStatus, DecodeErrorKind, Error, Result};
use crate::oid::Oid;
use crate::varbind::{self, VarBind};
use bytes::{BufMut, BytesMut};
use std::time::Duration;

use wire::Reader;

/// Size of the fixed PDU header in bytes.
pub const HEADER_SIZE: usize = 20;

/// AgentX protocol version carried in every header.
pub const VERSION: u8 = 1;

/// Header flag bits (RFC 2741 Section 6.1).
pub mod flags {
    /// The registration is for a fully-qualified instance.
    pub const INSTANCE_REGISTRATION: u8 = 0x01;
    /// Index allocation: any new value.
    pub const NEW_INDEX: u8 = 0x02;
    /// Index allocation: any value.
    pub const ANY_INDEX: u8 = 0x04;
    /// A non-default context octet string precedes the body.
    pub const NON_DEFAULT_CONTEXT: u8 = 0x08;
    /// Multi-byte integers are big-endian. This implementation always
    /// sends with the flag clear.
    pub const NETWORK_BYTE_ORDER: u8 = 0x10;
}

/// PDU type byte (RFC 2741 Section 6.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum PduType {
    Open,
    Close,
    Register,
    Unregister,
    Get,
    GetNext,
    GetBulk,
    TestSet,
    CommitSet,
    UndoSet,
    CleanupSet,
    Notify,
    Ping,
    IndexAllocate,
    IndexDeallocate,
    AddAgentCaps,
    RemoveAgentCaps,
    Response,
    /// Unknown or future type byte.
    Unknown(u8),
}

impl PduType {
    /// Create from the raw header type byte.
    pub fn from_u8(ty: u8) -> Self {
        match ty {
            1 => Self::Open,
            2 => Self::Close,
            3 => Self::Register,
            4 => Self::Unregister,
            5 => Self::Get,
            6 => Self::GetNext,
            7 => Self::GetBulk,
            8 => Self::TestSet,
            9 => Self::CommitSet,
            10 => Self::UndoSet,
            11 => Self::CleanupSet,
            12 => Self::Notify,
            13 => Self::Ping,
            14 => Self::IndexAllocate,
            15 => Self::IndexDeallocate,
            16 => Self::AddAgentCaps,
            17 => Self::RemoveAgentCaps,
            18 => Self::Response,
            other => Self::Unknown(other),
        }
    }

    /// Get the raw type byte.
    pub fn as_u8(&self) -> u8 {
        match self {
            Self::Open => 1,
            Self::Close => 2,
            Self::Register => 3,
            Self::Unregister => 4,
            Self::Get => 5,
            Self::GetNext => 6,
            Self::GetBulk => 7,
            Self::TestSet => 8,
            Self::CommitSet => 9,
            Self::UndoSet => 10,
            Self::CleanupSet => 11,
            Self::Notify => 12,
            Self::Ping => 13,
            Self::IndexAllocate => 14,
            Self::IndexDeallocate => 15,
            Self::AddAgentCaps => 16,
            Self::RemoveAgentCaps => 17,
            Self::Response => 18,
            Self::Unknown(ty) => *ty,
        }
    }
}

impl std::fmt::Display for PduType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Open => "agentx-Open-PDU",
            Self::Close => "agentx-Close-PDU",
            Self::Register => "agentx-Register-PDU",
            Self::Unregister => "agentx-Unregister-PDU",
            Self::Get => "agentx-Get-PDU",
            Self::GetNext => "agentx-GetNext-PDU",
            Self::GetBulk => "agentx-GetBulk-PDU",
            Self::TestSet => "agentx-TestSet-PDU",
            Self::CommitSet => "agentx-CommitSet-PDU",
            Self::UndoSet => "agentx-UndoSet-PDU",
            Self::CleanupSet => "agentx-CleanupSet-PDU",
            Self::Notify => "agentx-Notify-PDU",
            Self::Ping => "agentx-Ping-PDU",
            Self::IndexAllocate => "agentx-IndexAllocate-PDU",
            Self::IndexDeallocate => "agentx-IndexDeallocate-PDU",
            Self::AddAgentCaps => "agentx-AddAgentCaps-PDU",
            Self::RemoveAgentCaps => "agentx-RemoveAgentCaps-PDU",
            Self::Response => "agentx-Response-PDU",
            Self::Unknown(ty) => return write!(f, "agentx-Unknown-PDU({})", ty),
        };
        f.write_str(name)
    }
}

/// Reason carried by a Close PDU (RFC 2741 Section 6.2.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum CloseReason {
    /// No particular reason (value 1).
    Other,
    /// A received PDU could not be parsed (value 2).
    ParseError,
    /// A received PDU violated the protocol (value 3).
    ProtocolError,
    /// Too many timeouts on the session (value 4).
    Timeouts,
    /// Orderly shutdown (value 5). Sent on normal session close.
    Shutdown,
    /// Closed at a manager's request (value 6).
    ByManager,
    /// Unknown or future reason byte.
    Unknown(u8),
}

impl CloseReason {
    /// Create from the raw reason byte.
    pub fn from_u8(reason: u8) -> Self {
        match reason {
            1 => Self::Other,
            2 => Self::ParseError,
            3 => Self::ProtocolError,
            4 => Self::Timeouts,
            5 => Self::Shutdown,
            6 => Self::ByManager,
            other => Self::Unknown(other),
        }
    }

    /// Get the raw reason byte.
    pub fn as_u8(&self) -> u8 {
        match self {
            Self::Other => 1,
            Self::ParseError => 2,
            Self::ProtocolError => 3,
            Self::Timeouts => 4,
            Self::Shutdown => 5,
            Self::ByManager => 6,
            Self::Unknown(reason) => *reason,
        }
    }
}

/// The 4-byte timeout block shared by Open, Register and Unregister.
///
/// Wire form `duration_secs (u8) | priority (u8) | range_subid (u8) |
/// reserved (u8)`. The duration is the subagent's maximum response latency
/// in whole seconds, clamped to 255. Range registrations are not supported,
/// so `range_subid` is always emitted as 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timeout {
    /// Maximum response latency granted to the subagent.
    pub duration: Duration,
    /// Registration priority (1-255, lower wins; 0 lets the master default).
    pub priority: u8,
}

impl Timeout {
    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u8(self.duration.as_secs().min(255) as u8);
        buf.put_u8(self.priority);
        buf.put_u16_le(0);
    }

    fn decode(r: &mut Reader<'_>) -> Result<Self> {
        let duration = Duration::from_secs(r.u8()? as u64);
        let priority = r.u8()?;
        r.skip(2)?;
        Ok(Self { duration, priority })
    }
}

/// The fixed 20-byte PDU header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// Protocol version, always 1.
    pub version: u8,
    /// PDU type selecting the body layout.
    pub ty: PduType,
    /// Flag bits; this implementation emits 0.
    pub flags: u8,
    /// Session the PDU belongs to (0 before Open completes).
    pub session_id: u32,
    /// Transaction the PDU belongs to.
    pub transaction_id: u32,
    /// Correlates requests with responses.
    pub packet_id: u32,
    /// Length of the body following the header.
    pub payload_length: u32,
}

impl Header {
    /// Create a header of the given type with all other fields zeroed.
    pub fn new(ty: PduType) -> Self {
        Self {
            version: VERSION,
            ty,
            flags: 0,
            session_id: 0,
            transaction_id: 0,
            packet_id: 0,
            payload_length: 0,
        }
    }

    /// Serialize to the 20-byte wire form.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut b = [0u8; HEADER_SIZE];
        b[0] = self.version;
        b[1] = self.ty.as_u8();
        b[2] = self.flags;
        // b[3] reserved
        b[4..8].copy_from_slice(&self.session_id.to_le_bytes());
        b[8..12].copy_from_slice(&self.transaction_id.to_le_bytes());
        b[12..16].copy_from_slice(&self.packet_id.to_le_bytes());
        b[16..20].copy_from_slice(&self.payload_length.to_le_bytes());
        b
    }

    /// Deserialize from the 20-byte wire form.
    pub fn from_bytes(b: &[u8; HEADER_SIZE]) -> Self {
        Self {
            version: b[0],
            ty: PduType::from_u8(b[1]),
            flags: b[2],
            session_id: u32::from_le_bytes([b[4], b[5], b[6], b[7]]),
            transaction_id: u32::from_le_bytes([b[8], b[9], b[10], b[11]]),
            packet_id: u32::from_le_bytes([b[12], b[13], b[14], b[15]]),
            payload_length: u32::from_le_bytes([b[16], b[17], b[18], b[19]]),
        }
    }
}

/// A search range: the half-open region a Get* operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRange {
    /// Lower bound of the range.
    pub from: Oid,
    /// Whether `from` itself is part of the range.
    pub include: bool,
    /// Upper bound; an empty OID means unbounded.
    pub to: Oid,
}

impl SearchRange {
    fn encode(&self, buf: &mut BytesMut) -> Result<()> {
        wire::put_oid(buf, &self.from, self.include)?;
        wire::put_oid(buf, &self.to, false)
    }

    fn decode(r: &mut Reader<'_>) -> Result<Self> {
        let (from, include) = wire::get_oid(r)?;
        let (to, _) = wire::get_oid(r)?;
        Ok(Self { from, include, to })
    }
}

fn encode_ranges(buf: &mut BytesMut, ranges: &[SearchRange]) -> Result<()> {
    for range in ranges {
        range.encode(buf)?;
    }
    Ok(())
}

/// Decode search ranges occupying the rest of the payload, counting first
/// so the vector is allocated once.
fn decode_ranges(r: &mut Reader<'_>) -> Result<Vec<SearchRange>> {
    let mut count = 0;
    let mut tail = r.tail();
    while let Some(size) = scan_range_size(tail) {
        tail = &tail[size..];
        count += 1;
    }

    let mut ranges = Vec::with_capacity(count);
    while !r.is_empty() {
        ranges.push(SearchRange::decode(r)?);
    }
    Ok(ranges)
}

fn scan_oid_size(data: &[u8]) -> Option<usize> {
    let size = 4 + *data.first()? as usize * 4;
    (data.len() >= size).then_some(size)
}

fn scan_range_size(data: &[u8]) -> Option<usize> {
    let from = scan_oid_size(data)?;
    let to = scan_oid_size(&data[from..])?;
    Some(from + to)
}

/// Open PDU body (subagent to master).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Open {
    /// Maximum response latency the master should grant.
    pub timeout: Timeout,
    /// OID identifying the subagent; may be empty.
    pub id: Oid,
    /// Human-readable subagent description.
    pub description: String,
}

/// Register PDU body (subagent to master).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Register {
    /// Timeout override and registration priority.
    pub timeout: Timeout,
    /// Root of the OID region being claimed.
    pub subtree: Oid,
}

/// Unregister PDU body (subagent to master).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unregister {
    /// Must carry the priority the region was registered at.
    pub timeout: Timeout,
    /// Root of the OID region being released.
    pub subtree: Oid,
}

/// Close PDU body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Close {
    /// Why the session is going away.
    pub reason: CloseReason,
}

/// Response PDU body.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Response {
    /// Centiseconds since the subagent session opened.
    pub sys_uptime: u32,
    /// AgentX result status.
    pub error: AgentxStatus,
    /// 1-based index of the varbind the error applies to, or 0.
    pub index: u16,
    /// Result varbinds, aligned with the request's ranges.
    pub varbinds: Vec<VarBind>,
}

/// Get PDU body (master to subagent).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Get {
    /// One range per requested varbind; only `from` is meaningful.
    pub ranges: Vec<SearchRange>,
}

/// GetNext PDU body (master to subagent).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GetNext {
    /// One range per requested varbind.
    pub ranges: Vec<SearchRange>,
}

/// GetBulk PDU body (master to subagent).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GetBulk {
    /// Number of leading ranges answered with a single GetNext each.
    pub non_repeaters: u16,
    /// Number of walk rounds over the remaining ranges.
    pub max_repetitions: u16,
    /// The ranges.
    pub ranges: Vec<SearchRange>,
}

/// A decoded PDU body, tagged by the header type byte.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Pdu {
    Open(Open),
    Register(Register),
    Unregister(Unregister),
    Close(Close),
    Response(Response),
    Get(Get),
    GetNext(GetNext),
    GetBulk(GetBulk),
}

impl Pdu {
    /// The header type byte matching this body.
    pub fn pdu_type(&self) -> PduType {
        match self {
            Pdu::Open(_) => PduType::Open,
            Pdu::Register(_) => PduType::Register,
            Pdu::Unregister(_) => PduType::Unregister,
            Pdu::Close(_) => PduType::Close,
            Pdu::Response(_) => PduType::Response,
            Pdu::Get(_) => PduType::Get,
            Pdu::GetNext(_) => PduType::GetNext,
            Pdu::GetBulk(_) => PduType::GetBulk,
        }
    }

    /// Encode the body into `buf`.
    pub fn encode(&self, buf: &mut BytesMut) -> Result<()> {
        match self {
            Pdu::Open(open) => {
                open.timeout.encode(buf);
                wire::put_oid(buf, &open.id, false)?;
                wire::put_octets(buf, open.description.as_bytes());
            }
            Pdu::Register(register) => {
                register.timeout.encode(buf);
                wire::put_oid(buf, &register.subtree, false)?;
            }
            Pdu::Unregister(unregister) => {
                unregister.timeout.encode(buf);
                wire::put_oid(buf, &unregister.subtree, false)?;
            }
            Pdu::Close(close) => {
                buf.put_u8(close.reason.as_u8());
                buf.put_bytes(0, 3);
            }
            Pdu::Response(response) => {
                buf.put_u32_le(response.sys_uptime);
                buf.put_u16_le(response.error.as_u16());
                buf.put_u16_le(response.index);
                varbind::encode_list(buf, &response.varbinds)?;
            }
            Pdu::Get(get) => encode_ranges(buf, &get.ranges)?,
            Pdu::GetNext(get_next) => encode_ranges(buf, &get_next.ranges)?,
            Pdu::GetBulk(get_bulk) => {
                buf.put_u16_le(get_bulk.non_repeaters);
                buf.put_u16_le(get_bulk.max_repetitions);
                encode_ranges(buf, &get_bulk.ranges)?;
            }
        }
        Ok(())
    }

    /// Decode a body of the given type.
    ///
    /// Types outside the eight bodies above decode to
    /// [`DecodeErrorKind::UnsupportedPduType`].
    pub fn decode(ty: PduType, body: &[u8]) -> Result<Pdu> {
        let mut r = Reader::new(body);
        let pdu = match ty {
            PduType::Open => {
                let timeout = Timeout::decode(&mut r)?;
                let (id, _) = wire::get_oid(&mut r)?;
                let description =
                    String::from_utf8_lossy(&wire::get_octets(&mut r)?).into_owned();
                Pdu::Open(Open {
                    timeout,
                    id,
                    description,
                })
            }
            PduType::Register => {
                let timeout = Timeout::decode(&mut r)?;
                let (subtree, _) = wire::get_oid(&mut r)?;
                Pdu::Register(Register { timeout, subtree })
            }
            PduType::Unregister => {
                let timeout = Timeout::decode(&mut r)?;
                let (subtree, _) = wire::get_oid(&mut r)?;
                Pdu::Unregister(Unregister { timeout, subtree })
            }
            PduType::Close => {
                let reason = CloseReason::from_u8(r.u8()?);
                r.skip(3)?;
                Pdu::Close(Close { reason })
            }
            PduType::Response => {
                let sys_uptime = r.u32()?;
                let error = AgentxStatus::from_u16(r.u16()?);
                let index = r.u16()?;
                let varbinds = varbind::decode_list(&mut r)?;
                Pdu::Response(Response {
                    sys_uptime,
                    error,
                    index,
                    varbinds,
                })
            }
            PduType::Get => Pdu::Get(Get {
                ranges: decode_ranges(&mut r)?,
            }),
            PduType::GetNext => Pdu::GetNext(GetNext {
                ranges: decode_ranges(&mut r)?,
            }),
            PduType::GetBulk => {
                let non_repeaters = r.u16()?;
                let max_repetitions = r.u16()?;
                Pdu::GetBulk(GetBulk {
                    non_repeaters,
                    max_repetitions,
                    ranges: decode_ranges(&mut r)?,
                })
            }
            other => {
                return Err(Error::decode(
                    0,
                    DecodeErrorKind::UnsupportedPduType(other.as_u8()),
                ))
            }
        };
        Ok(pdu)
    }
}

/// A header and its body, ready to cross the wire in either direction.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub header: Header,
    pub pdu: Pdu,
}

impl Frame {
    /// Pair a header with a body. Version, type and payload length are
    /// fixed up at encode time.
    pub fn new(header: Header, pdu: Pdu) -> Self {
        Self { header, pdu }
    }

    /// Encode header and body into a single contiguous buffer.
    ///
    /// `buf` must be empty; on return it holds the complete frame with
    /// `payload_length` reflecting the encoded body.
    pub fn encode(&self, buf: &mut BytesMut) -> Result<()> {
        debug_assert!(buf.is_empty());
        buf.resize(HEADER_SIZE, 0);
        self.pdu.encode(buf)?;

        let mut header = self.header;
        header.version = VERSION;
        header.ty = self.pdu.pdu_type();
        header.payload_length = (buf.len() - HEADER_SIZE) as u32;
        buf[..HEADER_SIZE].copy_from_slice(&header.to_bytes());
        Ok(())
    }
}
