//! Link-layer address framing.
//!
//! Every frame a link transport delivers to (or accepts from) the
//! peering layer starts with a small address header:
//!
//! ```text
//! offset 0  len    u16 big-endian   total address length, header included
//! offset 2  flags  u16 big-endian   bit 0 = broadcast
//! offset 4  addr   [len - 4]        opaque transport address bytes
//! ```
//!
//! The address bytes are opaque to the peering layer; it only ever
//! byte-compares them. Broadcast frames (beacons) carry the flag and,
//! typically, an empty address.

use core::fmt;

use crate::error::WireError;

/// Size of the address header preceding the opaque address bytes.
pub const HEADER_SIZE: usize = 4;

/// Flag bit marking a broadcast (beacon) frame.
pub const FLAG_BROADCAST: u16 = 0x0001;

/// An opaque link-layer address, as stored in the peer map.
///
/// Only the address bytes participate in equality and hashing; the
/// broadcast flag is a per-frame property, not part of the identity.
#[derive(Clone, PartialEq, Eq, Hash)]
#[must_use]
pub struct LinkAddr(Vec<u8>);

impl LinkAddr {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for LinkAddr {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<&[u8]> for LinkAddr {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl fmt::Display for LinkAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for LinkAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LinkAddr({self})")
    }
}

/// A parsed inbound frame: address header split from the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedFrame<'a> {
    pub addr: &'a [u8],
    pub broadcast: bool,
    pub payload: &'a [u8],
}

/// Split an inbound frame into its address and payload.
///
/// Rejects runts: frames shorter than the header, frames whose declared
/// address length is below the header size, and frames shorter than the
/// declared address length.
pub fn parse_frame(frame: &[u8]) -> Result<ParsedFrame<'_>, WireError> {
    if frame.len() < HEADER_SIZE {
        return Err(WireError::Runt {
            min: HEADER_SIZE,
            actual: frame.len(),
        });
    }
    let declared = u16::from_be_bytes([frame[0], frame[1]]) as usize;
    let flags = u16::from_be_bytes([frame[2], frame[3]]);
    if declared < HEADER_SIZE {
        return Err(WireError::AddressTooShort(declared));
    }
    if frame.len() < declared {
        return Err(WireError::TruncatedAddress {
            declared,
            actual: frame.len(),
        });
    }
    Ok(ParsedFrame {
        addr: &frame[HEADER_SIZE..declared],
        broadcast: flags & FLAG_BROADCAST != 0,
        payload: &frame[declared..],
    })
}

/// Build an outbound unicast frame: `[header ‖ addr ‖ payload]`.
pub fn prepend_addr(addr: &LinkAddr, payload: &[u8]) -> Vec<u8> {
    let total = HEADER_SIZE + addr.len();
    let mut out = Vec::with_capacity(total + payload.len());
    out.extend_from_slice(&(total as u16).to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes());
    out.extend_from_slice(addr.as_ref());
    out.extend_from_slice(payload);
    out
}

/// Build an outbound broadcast frame: header only, flag set, no address.
pub fn broadcast_frame(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    out.extend_from_slice(&(HEADER_SIZE as u16).to_be_bytes());
    out.extend_from_slice(&FLAG_BROADCAST.to_be_bytes());
    out.extend_from_slice(payload);
    out
}

/// Build a broadcast frame carrying a sender address, as an inbound
/// transport produces when it receives a broadcast and knows who sent
/// it.
pub fn broadcast_from(addr: &LinkAddr, payload: &[u8]) -> Vec<u8> {
    let total = HEADER_SIZE + addr.len();
    let mut out = Vec::with_capacity(total + payload.len());
    out.extend_from_slice(&(total as u16).to_be_bytes());
    out.extend_from_slice(&FLAG_BROADCAST.to_be_bytes());
    out.extend_from_slice(addr.as_ref());
    out.extend_from_slice(payload);
    out
}
