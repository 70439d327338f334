//! Newtype wrappers for protocol byte-array fields.
//!
//! These types provide type safety, preventing accidental mixing of
//! values that share the same underlying byte representation (a public
//! key and a mesh address are both "some bytes" on the wire).

use core::fmt;
use std::net::Ipv6Addr;

/// Helper to write lowercase hex without the `hex` crate.
fn fmt_hex(bytes: &[u8], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for byte in bytes {
        write!(f, "{:02x}", byte)?;
    }
    Ok(())
}

/// A 32-byte long-term node public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[must_use]
pub struct PublicKey(pub(crate) [u8; 32]);

impl PublicKey {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn to_bytes(self) -> [u8; 32] {
        self.0
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for PublicKey {
    type Error = InvalidLength;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| InvalidLength {
            expected: 32,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_hex(&self.0, f)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey(")?;
        fmt_hex(&self.0[..4], f)?;
        write!(f, "..)")
    }
}

/// A 16-byte network-layer address derived from a public key.
///
/// Valid mesh addresses live in `fc00::/8`; see [`crate::addressing`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[must_use]
pub struct MeshAddr(pub(crate) [u8; 16]);

impl MeshAddr {
    pub const UNKNOWN: Self = Self([0u8; 16]);

    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub const fn to_bytes(self) -> [u8; 16] {
        self.0
    }

    /// First byte of the address (the mesh prefix position).
    #[must_use]
    pub const fn prefix_byte(&self) -> u8 {
        self.0[0]
    }
}

impl AsRef<[u8]> for MeshAddr {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for MeshAddr {
    type Error = InvalidLength;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 16] = bytes.try_into().map_err(|_| InvalidLength {
            expected: 16,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Display for MeshAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Ipv6Addr::from(self.0))
    }
}

impl fmt::Debug for MeshAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MeshAddr({})", Ipv6Addr::from(self.0))
    }
}

/// A 64-bit switch forwarding label.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
#[must_use]
pub struct PathLabel(pub u64);

impl PathLabel {
    /// Label of a peer the switch has not assigned a slot to yet.
    pub const UNASSIGNED: Self = Self(0);
}

impl fmt::Display for PathLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl fmt::Debug for PathLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PathLabel({:016x})", self.0)
    }
}

/// A node as the routing layer sees it: key, derived address, switch
/// label, and the protocol version last learned for it.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct NodeAddr {
    pub key: PublicKey,
    pub ip6: MeshAddr,
    pub path: PathLabel,
    pub version: u32,
}

impl NodeAddr {
    /// A node record with nothing learned yet.
    pub const fn unknown() -> Self {
        Self {
            key: PublicKey([0u8; 32]),
            ip6: MeshAddr::UNKNOWN,
            path: PathLabel::UNASSIGNED,
            version: 0,
        }
    }
}

impl fmt::Display for NodeAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}.{}", self.version, self.path, self.ip6)
    }
}

/// Error returned when a byte slice has the wrong length for a newtype.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidLength {
    pub expected: usize,
    pub actual: usize,
}

impl fmt::Display for InvalidLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid length: expected {} bytes, got {}",
            self.expected, self.actual
        )
    }
}

impl std::error::Error for InvalidLength {}
