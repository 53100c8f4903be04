//! Little-endian wire primitives shared by the PDU codec.
//!
//! AgentX frames on this implementation are always little-endian (the Open
//! PDU is sent with the NetworkByteOrder flag clear, and RFC 2741 Section
//! 6.1.1 obliges the master to answer in kind). The [`Reader`] tracks its
//! offset so decode errors can report where the payload went wrong.

use crate::error::{DecodeErrorKind, Error, Result};
use crate::oid::{Oid, MAX_OID_LEN};
use bytes::{BufMut, Bytes, BytesMut};

/// Sequential little-endian reader over a borrowed payload.
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pos == self.buf.len()
    }

    /// The bytes not yet consumed.
    pub(crate) fn tail(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(Error::decode(
                self.pos,
                DecodeErrorKind::Truncated {
                    needed: n,
                    remaining: self.remaining(),
                },
            ));
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub(crate) fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub(crate) fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        Ok(u64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    pub(crate) fn bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.take(n)
    }

    pub(crate) fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }
}

/// Number of padding bytes required to reach the next 4-byte boundary.
#[inline]
pub(crate) fn pad4(len: usize) -> usize {
    (4 - (len % 4)) & 3
}

/// Encoded size of a length-prefixed byte string, padding included.
#[inline]
pub(crate) fn octets_size(len: usize) -> usize {
    4 + len + pad4(len)
}

/// Write a length-prefixed byte string, zero-padded to a 4-byte boundary.
pub(crate) fn put_octets(buf: &mut BytesMut, data: &[u8]) {
    buf.put_u32_le(data.len() as u32);
    buf.put_slice(data);
    buf.put_bytes(0, pad4(data.len()));
}

/// Read a length-prefixed byte string, consuming its padding.
pub(crate) fn get_octets(r: &mut Reader<'_>) -> Result<Bytes> {
    let len = r.u32()? as usize;
    let data = Bytes::copy_from_slice(r.bytes(len)?);
    r.skip(pad4(len))?;
    Ok(data)
}

/// Split an OID into its AgentX wire prefix and trailing sub-identifiers.
///
/// An OID of the form `1.3.6.1.<p>.<rest...>` with `p <= 255` and a nonempty
/// rest is compressed to `prefix = p` with the five leading sub-identifiers
/// dropped.
fn compress(oid: &Oid) -> (u8, &[u32]) {
    match oid.subids() {
        [1, 3, 6, 1, p, rest @ ..] if *p <= u8::MAX as u32 && !rest.is_empty() => (*p as u8, rest),
        subids => (0, subids),
    }
}

/// Encoded size of an OID on the wire (prefix compression applied).
pub(crate) fn oid_size(oid: &Oid) -> usize {
    let (_, rest) = compress(oid);
    4 + rest.len() * 4
}

/// Write an OID in AgentX wire form: `n_subids | prefix | include |
/// reserved` followed by `n_subids` little-endian u32 values.
pub(crate) fn put_oid(buf: &mut BytesMut, oid: &Oid, include: bool) -> Result<()> {
    let (prefix, rest) = compress(oid);
    if rest.len() > u8::MAX as usize {
        return Err(Error::Encode(
            format!("OID with {} sub-identifiers does not fit the wire form", oid.len()).into(),
        )
        .boxed());
    }
    buf.put_u8(rest.len() as u8);
    buf.put_u8(prefix);
    buf.put_u8(include as u8);
    buf.put_u8(0);
    for &subid in rest {
        buf.put_u32_le(subid);
    }
    Ok(())
}

/// Read an OID in AgentX wire form, expanding the prefix. Returns the OID
/// and its `include` flag.
pub(crate) fn get_oid(r: &mut Reader<'_>) -> Result<(Oid, bool)> {
    let start = r.pos();
    let n = r.u8()? as usize;
    let prefix = r.u8()?;
    let include = r.u8()? != 0;
    r.skip(1)?;

    let total = n + if prefix != 0 { 5 } else { 0 };
    if total > MAX_OID_LEN {
        return Err(Error::decode(
            start,
            DecodeErrorKind::OidTooLong {
                count: total,
                max: MAX_OID_LEN,
            },
        ));
    }

    let mut subids = smallvec::SmallVec::<[u32; 16]>::new();
    if prefix != 0 {
        subids.extend_from_slice(&[1, 3, 6, 1, prefix as u32]);
    }
    for _ in 0..n {
        subids.push(r.u32()?);
    }
    Ok((Oid::new(subids), include))
}
