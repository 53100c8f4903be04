//! Variable binding (VarBind) wire form.
//!
//! A VarBind pairs an OID with a [`Value`]. On the wire it is
//! `v.type (u16) | reserved (u16) | name | data`, with byte-string payloads
//! zero-padded so every varbind ends on a 4-byte boundary.

use crate::error::Result;
use crate::oid::Oid;
use crate::pdu::wire::{self, Reader};
use crate::value::{type_code, Value};
use bytes::{BufMut, BytesMut};

/// Variable binding - an OID-value pair.
#[derive(Debug, Clone, PartialEq)]
pub struct VarBind {
    /// The object identifier naming the variable.
    pub oid: Oid,
    /// The value, carrying its own type tag.
    pub value: Value,
}

impl VarBind {
    /// Create a new VarBind.
    pub fn new(oid: Oid, value: Value) -> Self {
        Self { oid, value }
    }

    /// Create a VarBind with a NULL value.
    pub fn null(oid: Oid) -> Self {
        Self {
            oid,
            value: Value::Null,
        }
    }

    /// Exact encoded size in bytes, computed without allocating.
    pub fn encoded_size(&self) -> usize {
        4 + wire::oid_size(&self.oid) + self.value.encoded_size()
    }

    /// Encode to the AgentX wire form.
    pub(crate) fn encode(&self, buf: &mut BytesMut) -> Result<()> {
        buf.put_u16_le(self.value.type_code());
        buf.put_u16_le(0);
        wire::put_oid(buf, &self.oid, false)?;
        self.value.encode(buf)
    }

    /// Decode from the AgentX wire form.
    pub(crate) fn decode(r: &mut Reader<'_>) -> Result<Self> {
        let code = r.u16()?;
        r.skip(2)?;
        let (oid, _) = wire::get_oid(r)?;
        let value = Value::decode(r, code)?;
        Ok(VarBind { oid, value })
    }
}

impl std::fmt::Display for VarBind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} = {}", self.oid, self.value)
    }
}

/// Encode a list of VarBinds back to back.
pub(crate) fn encode_list(buf: &mut BytesMut, varbinds: &[VarBind]) -> Result<()> {
    for vb in varbinds {
        vb.encode(buf)?;
    }
    Ok(())
}

/// Decode a list of VarBinds occupying the rest of the payload.
///
/// Two passes: a size scan counts the elements so the vector is allocated
/// once, then each element is decoded.
pub(crate) fn decode_list(r: &mut Reader<'_>) -> Result<Vec<VarBind>> {
    let mut count = 0;
    let mut tail = r.tail();
    while let Some(size) = scan_size(tail) {
        if size == 0 || size > tail.len() {
            break;
        }
        tail = &tail[size..];
        count += 1;
    }

    let mut varbinds = Vec::with_capacity(count);
    while !r.is_empty() {
        varbinds.push(VarBind::decode(r)?);
    }
    Ok(varbinds)
}

/// Encoded size of the first varbind in `data`, or `None` if `data` is too
/// short to even read the size-determining fields.
fn scan_size(data: &[u8]) -> Option<usize> {
    if data.len() < 8 {
        return None;
    }
    let code = u16::from_le_bytes([data[0], data[1]]);
    let name_size = 4 + data[4] as usize * 4;
    let offset = 4 + name_size;

    use type_code::*;
    let payload = match code {
        INTEGER | COUNTER32 | GAUGE32 | TIME_TICKS => 4,
        COUNTER64 => 8,
        OCTET_STRING | IP_ADDRESS | OPAQUE => {
            let b = data.get(offset..offset + 4)?;
            let len = u32::from_le_bytes([b[0], b[1], b[2], b[3]]) as usize;
            wire::octets_size(len)
        }
        OBJECT_IDENTIFIER => 4 + *data.get(offset)? as usize * 4,
        NULL | NO_SUCH_OBJECT | NO_SUCH_INSTANCE | END_OF_MIB_VIEW => 0,
        _ => 0,
    };
    Some(offset + payload)
}
