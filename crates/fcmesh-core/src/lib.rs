//! Primitive types and wire formats for the fcmesh overlay router.
//!
//! This crate holds everything the peering layer and its drivers must
//! agree on byte-for-byte: key and address newtypes, the key-to-address
//! derivation, protocol version compatibility, link-layer address
//! framing, the beacon format, the peer-event format, and the switch
//! header inspection used by the pre-establishment guard.

pub mod addressing;
pub mod error;
pub mod types;
pub mod version;
pub mod wire;
