//! Varbind value types.
//!
//! [`Value`] represents every AgentX varbind payload together with its wire
//! type code, including the v2 exception markers.

use crate::error::{DecodeErrorKind, Error, Result};
use crate::oid::Oid;
use crate::pdu::wire::{self, Reader};
use bytes::{BufMut, Bytes, BytesMut};

/// Varbind type codes (RFC 2741 Section 5.4).
pub(crate) mod type_code {
    pub const INTEGER: u16 = 2;
    pub const OCTET_STRING: u16 = 4;
    pub const NULL: u16 = 5;
    pub const OBJECT_IDENTIFIER: u16 = 6;
    pub const IP_ADDRESS: u16 = 64;
    pub const COUNTER32: u16 = 65;
    pub const GAUGE32: u16 = 66;
    pub const TIME_TICKS: u16 = 67;
    pub const OPAQUE: u16 = 68;
    pub const COUNTER64: u16 = 70;
    pub const NO_SUCH_OBJECT: u16 = 128;
    pub const NO_SUCH_INSTANCE: u16 = 129;
    pub const END_OF_MIB_VIEW: u16 = 130;
}

/// A varbind value.
///
/// Carries both the payload and the wire type tag, so the handler contract's
/// `(variable_type, value)` pair is a single enum value.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Value {
    /// INTEGER (signed 32-bit), type code 2.
    Integer(i32),
    /// OCTET STRING (arbitrary bytes), type code 4.
    OctetString(Bytes),
    /// NULL, type code 5.
    Null,
    /// OBJECT IDENTIFIER, type code 6.
    ObjectIdentifier(Oid),
    /// IpAddress (4 bytes), type code 64.
    IpAddress([u8; 4]),
    /// Counter32 (unsigned 32-bit, wrapping), type code 65.
    Counter32(u32),
    /// Gauge32 / Unsigned32, type code 66.
    Gauge32(u32),
    /// TimeTicks (hundredths of seconds), type code 67.
    TimeTicks(u32),
    /// Opaque (arbitrary bytes), type code 68.
    Opaque(Bytes),
    /// Counter64 (unsigned 64-bit, wrapping), type code 70.
    Counter64(u64),
    /// noSuchObject exception, type code 128.
    NoSuchObject,
    /// noSuchInstance exception, type code 129.
    NoSuchInstance,
    /// endOfMibView exception, type code 130 - marks exhaustion of a walk.
    EndOfMibView,
}

impl Value {
    /// Create an OctetString value from text.
    ///
    /// # Examples
    ///
    /// ```
    /// use async_agentx::Value;
    ///
    /// let v = Value::octet_string("test");
    /// assert_eq!(v.as_bytes().unwrap(), b"test");
    /// ```
    pub fn octet_string(text: impl AsRef<str>) -> Self {
        Value::OctetString(Bytes::copy_from_slice(text.as_ref().as_bytes()))
    }

    /// The RFC 2741 type code of this value.
    pub fn type_code(&self) -> u16 {
        use type_code::*;
        match self {
            Value::Integer(_) => INTEGER,
            Value::OctetString(_) => OCTET_STRING,
            Value::Null => NULL,
            Value::ObjectIdentifier(_) => OBJECT_IDENTIFIER,
            Value::IpAddress(_) => IP_ADDRESS,
            Value::Counter32(_) => COUNTER32,
            Value::Gauge32(_) => GAUGE32,
            Value::TimeTicks(_) => TIME_TICKS,
            Value::Opaque(_) => OPAQUE,
            Value::Counter64(_) => COUNTER64,
            Value::NoSuchObject => NO_SUCH_OBJECT,
            Value::NoSuchInstance => NO_SUCH_INSTANCE,
            Value::EndOfMibView => END_OF_MIB_VIEW,
        }
    }

    /// Whether this value is one of the v2 exception markers.
    pub fn is_exception(&self) -> bool {
        matches!(
            self,
            Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView
        )
    }

    /// Try to get as i32. Returns `Some` for [`Value::Integer`] only.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get as u32.
    ///
    /// Returns `Some` for [`Value::Counter32`], [`Value::Gauge32`],
    /// [`Value::TimeTicks`], or a non-negative [`Value::Integer`].
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::Counter32(v) | Value::Gauge32(v) | Value::TimeTicks(v) => Some(*v),
            Value::Integer(v) if *v >= 0 => Some(*v as u32),
            _ => None,
        }
    }

    /// Try to get as u64.
    ///
    /// Returns `Some` for [`Value::Counter64`] or anything [`as_u32`]
    /// accepts.
    ///
    /// [`as_u32`]: Self::as_u32
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Counter64(v) => Some(*v),
            _ => self.as_u32().map(u64::from),
        }
    }

    /// Try to get the raw bytes of an OctetString or Opaque value.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::OctetString(b) | Value::Opaque(b) => Some(b),
            _ => None,
        }
    }

    /// Try to get an OctetString as UTF-8 text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::OctetString(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    /// Encoded payload size in bytes, padding included.
    pub(crate) fn encoded_size(&self) -> usize {
        match self {
            Value::Integer(_)
            | Value::Counter32(_)
            | Value::Gauge32(_)
            | Value::TimeTicks(_) => 4,
            Value::Counter64(_) => 8,
            Value::OctetString(b) | Value::Opaque(b) => wire::octets_size(b.len()),
            Value::IpAddress(_) => wire::octets_size(4),
            Value::ObjectIdentifier(oid) => wire::oid_size(oid),
            Value::Null | Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView => 0,
        }
    }

    /// Encode the payload portion (the type tag is written by the varbind).
    pub(crate) fn encode(&self, buf: &mut BytesMut) -> Result<()> {
        match self {
            Value::Integer(v) => buf.put_u32_le(*v as u32),
            Value::Counter32(v) | Value::Gauge32(v) | Value::TimeTicks(v) => buf.put_u32_le(*v),
            Value::Counter64(v) => buf.put_u64_le(*v),
            Value::OctetString(b) | Value::Opaque(b) => wire::put_octets(buf, b),
            Value::IpAddress(addr) => wire::put_octets(buf, addr),
            Value::ObjectIdentifier(oid) => wire::put_oid(buf, oid, false)?,
            Value::Null | Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView => {}
        }
        Ok(())
    }

    /// Decode a payload for the given type code.
    pub(crate) fn decode(r: &mut Reader<'_>, code: u16) -> Result<Self> {
        use type_code::*;
        let value = match code {
            INTEGER => Value::Integer(r.u32()? as i32),
            OCTET_STRING => Value::OctetString(wire::get_octets(r)?),
            NULL => Value::Null,
            OBJECT_IDENTIFIER => Value::ObjectIdentifier(wire::get_oid(r)?.0),
            IP_ADDRESS => {
                let pos = r.pos();
                let bytes = wire::get_octets(r)?;
                let addr: [u8; 4] = bytes.as_ref().try_into().map_err(|_| {
                    Error::decode(
                        pos,
                        DecodeErrorKind::Truncated {
                            needed: 4,
                            remaining: bytes.len(),
                        },
                    )
                })?;
                Value::IpAddress(addr)
            }
            COUNTER32 => Value::Counter32(r.u32()?),
            GAUGE32 => Value::Gauge32(r.u32()?),
            TIME_TICKS => Value::TimeTicks(r.u32()?),
            OPAQUE => Value::Opaque(wire::get_octets(r)?),
            COUNTER64 => Value::Counter64(r.u64()?),
            NO_SUCH_OBJECT => Value::NoSuchObject,
            NO_SUCH_INSTANCE => Value::NoSuchInstance,
            END_OF_MIB_VIEW => Value::EndOfMibView,
            other => {
                return Err(Error::decode(
                    r.pos(),
                    DecodeErrorKind::UnknownVariableType(other),
                ))
            }
        };
        Ok(value)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Integer(v) => write!(f, "{}", v),
            Value::OctetString(b) | Value::Opaque(b) => match std::str::from_utf8(b) {
                Ok(s) if s.chars().all(|c| !c.is_control()) => write!(f, "{:?}", s),
                _ => {
                    for byte in b.iter() {
                        write!(f, "{:02x}", byte)?;
                    }
                    Ok(())
                }
            },
            Value::Null => write!(f, "null"),
            Value::ObjectIdentifier(oid) => write!(f, "{}", oid),
            Value::IpAddress([a, b, c, d]) => write!(f, "{}.{}.{}.{}", a, b, c, d),
            Value::Counter32(v) | Value::Gauge32(v) | Value::TimeTicks(v) => write!(f, "{}", v),
            Value::Counter64(v) => write!(f, "{}", v),
            Value::NoSuchObject => write!(f, "noSuchObject"),
            Value::NoSuchInstance => write!(f, "noSuchInstance"),
            Value::EndOfMibView => write!(f, "endOfMibView"),
        }
    }
}
