//! Peer event wire format.
//!
//! The peering layer announces neighbor up/down to the routing
//! components over the event bus:
//!
//! ```text
//! offset 0   kind        u32 big-endian   1 = Peer, 2 = PeerGone
//! offset 4   pathfinder  u32 big-endian   0xffffffff = all pathfinders
//! offset 8   ip6         [16]
//! offset 24  public_key  [32]
//! offset 56  path        u64 big-endian
//! offset 64  metric      u32 big-endian   0xffffffff = directly connected
//! offset 68  version     u32 big-endian
//! ```

use crate::error::WireError;
use crate::types::{MeshAddr, NodeAddr, PathLabel, PublicKey};

/// Pathfinder id addressing every subscribed pathfinder.
pub const PATHFINDER_ALL: u32 = 0xffff_ffff;

/// Metric value meaning "directly connected neighbor".
pub const METRIC_DIRECT: u32 = 0xffff_ffff;

/// Total encoded peer event size.
pub const EVENT_SIZE: usize = 4 + 4 + 16 + 32 + 8 + 4 + 4;

/// The two peer event kinds.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u32)]
pub enum PeerEventKind {
    Peer = 1,
    PeerGone = 2,
}

impl TryFrom<u32> for PeerEventKind {
    type Error = WireError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Peer),
            2 => Ok(Self::PeerGone),
            other => Err(WireError::UnknownEventKind(other)),
        }
    }
}

/// A decoded peer event.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PeerEvent {
    pub kind: PeerEventKind,
    pub pathfinder: u32,
    pub node: NodeAddr,
    pub metric: u32,
}

/// Encode a peer event for the bus.
#[must_use]
pub fn encode(kind: PeerEventKind, pathfinder: u32, node: &NodeAddr) -> Vec<u8> {
    let mut out = Vec::with_capacity(EVENT_SIZE);
    out.extend_from_slice(&(kind as u32).to_be_bytes());
    out.extend_from_slice(&pathfinder.to_be_bytes());
    out.extend_from_slice(node.ip6.as_ref());
    out.extend_from_slice(node.key.as_ref());
    out.extend_from_slice(&node.path.0.to_be_bytes());
    out.extend_from_slice(&METRIC_DIRECT.to_be_bytes());
    out.extend_from_slice(&node.version.to_be_bytes());
    out
}

/// Decode a peer event from the bus.
pub fn decode(wire: &[u8]) -> Result<PeerEvent, WireError> {
    if wire.len() < EVENT_SIZE {
        return Err(WireError::EventTooShort {
            min: EVENT_SIZE,
            actual: wire.len(),
        });
    }
    let kind = u32::from_be_bytes([wire[0], wire[1], wire[2], wire[3]]).try_into()?;
    let pathfinder = u32::from_be_bytes([wire[4], wire[5], wire[6], wire[7]]);
    let ip6 = MeshAddr::try_from(&wire[8..24]).expect("slice is 16 bytes");
    let key = PublicKey::try_from(&wire[24..56]).expect("slice is 32 bytes");
    let mut path = [0u8; 8];
    path.copy_from_slice(&wire[56..64]);
    let metric = u32::from_be_bytes([wire[64], wire[65], wire[66], wire[67]]);
    let version = u32::from_be_bytes([wire[68], wire[69], wire[70], wire[71]]);
    Ok(PeerEvent {
        kind,
        pathfinder,
        node: NodeAddr {
            key,
            ip6,
            path: PathLabel(u64::from_be_bytes(path)),
            version,
        },
        metric,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_node() -> NodeAddr {
        let mut ip6 = [0u8; 16];
        ip6[0] = 0xfc;
        ip6[15] = 0x09;
        NodeAddr {
            key: PublicKey::new([0x33; 32]),
            ip6: MeshAddr::new(ip6),
            path: PathLabel(0xaaaa),
            version: 22,
        }
    }

    #[test]
    fn encode_decode_roundtrip() {
        let node = sample_node();
        let wire = encode(PeerEventKind::Peer, PATHFINDER_ALL, &node);
        assert_eq!(wire.len(), EVENT_SIZE);

        let event = decode(&wire).unwrap();
        assert_eq!(event.kind, PeerEventKind::Peer);
        assert_eq!(event.pathfinder, PATHFINDER_ALL);
        assert_eq!(event.node, node);
        assert_eq!(event.metric, METRIC_DIRECT);
    }

    #[test]
    fn gone_kind_on_wire() {
        let wire = encode(PeerEventKind::PeerGone, 7, &sample_node());
        assert_eq!(&wire[..4], &[0, 0, 0, 2]);
        assert_eq!(&wire[4..8], &[0, 0, 0, 7]);
        assert_eq!(decode(&wire).unwrap().kind, PeerEventKind::PeerGone);
    }

    #[test]
    fn path_is_big_endian() {
        let mut node = sample_node();
        node.path = PathLabel(0x0102_0304_0506_0708);
        let wire = encode(PeerEventKind::Peer, 0, &node);
        assert_eq!(&wire[56..64], &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn decode_rejects_short_wire() {
        let wire = encode(PeerEventKind::Peer, 0, &sample_node());
        let err = decode(&wire[..EVENT_SIZE - 1]).unwrap_err();
        assert_eq!(
            err,
            WireError::EventTooShort {
                min: EVENT_SIZE,
                actual: EVENT_SIZE - 1
            }
        );
    }

    #[test]
    fn decode_rejects_unknown_kind() {
        let mut wire = encode(PeerEventKind::Peer, 0, &sample_node());
        wire[3] = 9;
        assert_eq!(decode(&wire).unwrap_err(), WireError::UnknownEventKind(9));
    }
}
