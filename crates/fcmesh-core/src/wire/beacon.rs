//! Beacon wire format.
//!
//! A beacon is a fixed-size broadcast self-advertisement:
//!
//! ```text
//! offset 0   public_key  [32]
//! offset 32  version     u32 big-endian
//! offset 36  password    [20]
//! ```
//!
//! On the wire it is preceded by a link-address header with the
//! broadcast flag set (see [`crate::wire::lladdr`]).

use crate::error::WireError;
use crate::types::PublicKey;

/// Length of the per-startup beacon password.
pub const PASSWORD_LEN: usize = 20;

/// Total encoded beacon size.
pub const BEACON_SIZE: usize = 32 + 4 + PASSWORD_LEN;

/// A node's broadcast self-advertisement.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Beacon {
    pub public_key: PublicKey,
    pub version: u32,
    pub password: [u8; PASSWORD_LEN],
}

impl Beacon {
    /// Encode to the fixed wire layout.
    #[must_use]
    pub fn encode(&self) -> [u8; BEACON_SIZE] {
        let mut out = [0u8; BEACON_SIZE];
        out[..32].copy_from_slice(self.public_key.as_ref());
        out[32..36].copy_from_slice(&self.version.to_be_bytes());
        out[36..].copy_from_slice(&self.password);
        out
    }

    /// Decode from a payload; extra trailing bytes are ignored.
    pub fn decode(payload: &[u8]) -> Result<Self, WireError> {
        if payload.len() < BEACON_SIZE {
            return Err(WireError::BeaconTooShort {
                min: BEACON_SIZE,
                actual: payload.len(),
            });
        }
        let mut key = [0u8; 32];
        key.copy_from_slice(&payload[..32]);
        let version = u32::from_be_bytes([payload[32], payload[33], payload[34], payload[35]]);
        let mut password = [0u8; PASSWORD_LEN];
        password.copy_from_slice(&payload[36..BEACON_SIZE]);
        Ok(Self {
            public_key: PublicKey::new(key),
            version,
            password,
        })
    }
}
