//! Registered link-layer interfaces and their peer maps.

use core::fmt;
use std::collections::HashMap;
use std::str::FromStr;

use fcmesh_core::wire::lladdr::LinkAddr;

use crate::error::BeaconStateError;
use crate::peer::{Peer, PeerId};

/// Dense index of a registered link, stable for the controller's
/// lifetime.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[must_use]
pub struct IfNum(pub u32);

impl fmt::Display for IfNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "if{}", self.0)
    }
}

impl fmt::Debug for IfNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IfNum({})", self.0)
    }
}

/// Beacon participation of one link. Ordered: `Send` implies `Accept`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub enum BeaconMode {
    #[default]
    Off,
    Accept,
    Send,
}

impl BeaconMode {
    /// Whether inbound beacons are admitted in this mode.
    pub fn accepts(self) -> bool {
        self >= Self::Accept
    }

    /// Whether periodic beacons are emitted in this mode.
    pub fn sends(self) -> bool {
        self == Self::Send
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Off => "OFF",
            Self::Accept => "ACCEPT",
            Self::Send => "SEND",
        }
    }
}

impl FromStr for BeaconMode {
    type Err = BeaconStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "accept" => Ok(Self::Accept),
            "send" => Ok(Self::Send),
            other => Err(BeaconStateError::InvalidState(other.to_string())),
        }
    }
}

/// Peer storage for one link: O(1) lookup by link address plus dense,
/// index-stable enumeration for the randomized ping scan.
///
/// Removal swap-fills from the tail, so at most one surviving peer
/// changes index per removal and the scan stays in bounds.
pub(crate) struct PeerMap {
    index: HashMap<LinkAddr, usize>,
    peers: Vec<Peer>,
}

impl PeerMap {
    pub fn new() -> Self {
        Self {
            index: HashMap::new(),
            peers: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn contains(&self, addr: &LinkAddr) -> bool {
        self.index.contains_key(addr)
    }

    pub fn position_of(&self, addr: &LinkAddr) -> Option<usize> {
        self.index.get(addr).copied()
    }

    pub fn position_of_id(&self, id: PeerId) -> Option<usize> {
        self.peers.iter().position(|p| p.id == id)
    }

    pub fn get_at(&self, idx: usize) -> &Peer {
        &self.peers[idx]
    }

    pub fn get_at_mut(&mut self, idx: usize) -> &mut Peer {
        &mut self.peers[idx]
    }

    pub fn insert(&mut self, peer: Peer) -> usize {
        let idx = self.peers.len();
        let prev = self.index.insert(peer.lladdr.clone(), idx);
        assert!(prev.is_none(), "duplicate link address in peer map");
        self.peers.push(peer);
        idx
    }

    /// Remove and return the peer at `idx`, keeping the map dense.
    pub fn remove_at(&mut self, idx: usize) -> Peer {
        let peer = self.peers.swap_remove(idx);
        let removed = self.index.remove(&peer.lladdr);
        assert!(removed == Some(idx), "peer map index out of sync");
        if idx < self.peers.len() {
            // The tail peer moved into the hole.
            let moved = self.peers[idx].lladdr.clone();
            self.index.insert(moved, idx);
        }
        peer
    }

    pub fn iter(&self) -> impl Iterator<Item = &Peer> {
        self.peers.iter()
    }
}

/// One registered link-layer transport and the peers reachable over it.
pub struct LinkIface {
    pub(crate) name: String,
    pub(crate) ifnum: IfNum,
    pub(crate) beacon_mode: BeaconMode,
    pub(crate) peers: PeerMap,
}

impl LinkIface {
    pub(crate) fn new(name: String, ifnum: IfNum) -> Self {
        Self {
            name,
            ifnum,
            beacon_mode: BeaconMode::Off,
            peers: PeerMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ifnum(&self) -> IfNum {
        self.ifnum
    }

    pub fn beacon_mode(&self) -> BeaconMode {
        self.beacon_mode
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }
}

impl fmt::Debug for LinkIface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkIface")
            .field("name", &self.name)
            .field("ifnum", &self.ifnum)
            .field("beacon_mode", &self.beacon_mode)
            .field("peers", &self.peers.len())
            .finish()
    }
}
