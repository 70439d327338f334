//! Key-to-address derivation.
//!
//! A node's network-layer address is the first 16 bytes of the double
//! SHA-512 of its public key. Addresses derived this way land anywhere
//! in the 128-bit space; only keys whose derived address begins with
//! [`MESH_PREFIX`] are usable on the mesh, so peers keep grinding keys
//! until one fits.

use sha2::{Digest, Sha512};

use crate::types::{MeshAddr, PublicKey};

/// First byte of every valid mesh address (`fc00::/8`).
pub const MESH_PREFIX: u8 = 0xfc;

/// Derive the network-layer address for a public key.
pub fn mesh_addr_for_key(key: &PublicKey) -> MeshAddr {
    let first = Sha512::digest(key.as_ref());
    let second = Sha512::digest(first);
    let mut out = [0u8; 16];
    out.copy_from_slice(&second[..16]);
    MeshAddr::new(out)
}

/// Whether an address is inside the mesh prefix.
#[must_use]
pub fn is_valid_mesh_addr(addr: &MeshAddr) -> bool {
    addr.prefix_byte() == MESH_PREFIX
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        let key = PublicKey::new([0x5a; 32]);
        assert_eq!(mesh_addr_for_key(&key), mesh_addr_for_key(&key));
    }

    #[test]
    fn different_keys_differ() {
        let a = mesh_addr_for_key(&PublicKey::new([1; 32]));
        let b = mesh_addr_for_key(&PublicKey::new([2; 32]));
        assert_ne!(a, b);
    }

    #[test]
    fn valid_address_requires_fc_prefix() {
        let mut bytes = [0u8; 16];
        bytes[0] = MESH_PREFIX;
        assert!(is_valid_mesh_addr(&MeshAddr::new(bytes)));

        bytes[0] = 0xfd;
        assert!(!is_valid_mesh_addr(&MeshAddr::new(bytes)));

        assert!(!is_valid_mesh_addr(&MeshAddr::UNKNOWN));
    }
}
