//! Per-peer state and the pure liveness decisions.
//!
//! A [`Peer`] is one authenticated neighbor on one link. The time-based
//! decisions the ping tick and the data path make about a peer are
//! extracted into pure functions here so their boundary behavior can be
//! tested without a controller.

use core::fmt;

use fcmesh_core::types::NodeAddr;
use fcmesh_core::wire::lladdr::LinkAddr;

use crate::session::{ReplayStats, Session, SessionState};

/// Milliseconds since the epoch. Signed: creation seeding subtracts the
/// lazy-ping threshold and may go below zero near the clock origin.
pub type Millis = i64;

/// Controller-unique peer identifier, stable for the peer's lifetime.
///
/// The switch and the pinger address peers by this id; a stale id (from
/// a ping answered after its peer was destroyed) simply fails to resolve.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[must_use]
pub struct PeerId(pub u64);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer#{}", self.0)
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerId({})", self.0)
    }
}

/// Peer lifecycle state.
///
/// The first five states mirror the session's handshake state one to
/// one; `Unresponsive` is controller-only and overrides the session view
/// while liveness is considered lost. The ordering is meaningful:
/// everything below `Established` is still handshaking.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum PeerState {
    Unauthenticated,
    Handshake1,
    Handshake2,
    Handshake3,
    Established,
    Unresponsive,
}

impl PeerState {
    /// Mirror a session state into the peer state machine.
    pub fn from_session(state: SessionState) -> Self {
        match state {
            SessionState::New => Self::Unauthenticated,
            SessionState::Handshake1 => Self::Handshake1,
            SessionState::Handshake2 => Self::Handshake2,
            SessionState::Handshake3 => Self::Handshake3,
            SessionState::Established => Self::Established,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::Handshake1 => "HANDSHAKE1",
            Self::Handshake2 => "HANDSHAKE2",
            Self::Handshake3 => "HANDSHAKE3",
            Self::Established => "ESTABLISHED",
            Self::Unresponsive => "UNRESPONSIVE",
        }
    }
}

/// One neighbor on one link.
pub struct Peer {
    pub(crate) id: PeerId,
    pub(crate) lladdr: LinkAddr,
    pub(crate) addr: NodeAddr,
    pub(crate) state: PeerState,
    pub(crate) session: Box<dyn Session>,

    /// When the last *valid* (decrypted) message arrived.
    pub(crate) time_of_last_message: Millis,
    /// When the last switch-ping response arrived. Advanced only on
    /// response, never on send, so a dead peer cannot throttle its own
    /// retry cadence.
    pub(crate) time_of_last_ping: Millis,
    pub(crate) ping_count: u32,

    /// True if this peer was admitted from the wire (beacon response or
    /// unexpected inbound); such peers are forgotten when silent too
    /// long.
    pub(crate) is_incoming: bool,

    pub(crate) bytes_in: u64,
    pub(crate) bytes_out: u64,
}

impl Peer {
    pub(crate) fn new(
        id: PeerId,
        lladdr: LinkAddr,
        addr: NodeAddr,
        session: Box<dyn Session>,
        is_incoming: bool,
        now: Millis,
        ping_after: Millis,
    ) -> Self {
        let seed = seed_last_activity(now, ping_after);
        Self {
            id,
            lladdr,
            addr,
            state: PeerState::Unauthenticated,
            session,
            time_of_last_message: seed,
            time_of_last_ping: seed,
            ping_count: 0,
            is_incoming,
            bytes_in: 0,
            bytes_out: 0,
        }
    }

    pub fn id(&self) -> PeerId {
        self.id
    }

    pub fn state(&self) -> PeerState {
        self.state
    }

    pub fn addr(&self) -> &NodeAddr {
        &self.addr
    }

    /// Snapshot this peer for the admin surface.
    pub fn stats(&self) -> PeerStats {
        PeerStats {
            lladdr: self.lladdr.clone(),
            addr: self.addr,
            state: self.state,
            time_of_last_message: self.time_of_last_message,
            bytes_in: self.bytes_in,
            bytes_out: self.bytes_out,
            is_incoming: self.is_incoming,
            user: self.session.user(),
            replay: self.session.replay_stats(),
        }
    }
}

impl fmt::Debug for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Peer")
            .field("id", &self.id)
            .field("lladdr", &self.lladdr)
            .field("state", &self.state)
            .field("is_incoming", &self.is_incoming)
            .finish_non_exhaustive()
    }
}

/// Snapshot of one peer for the admin surface.
#[derive(Debug, Clone)]
pub struct PeerStats {
    pub lladdr: LinkAddr,
    pub addr: NodeAddr,
    pub state: PeerState,
    pub time_of_last_message: Millis,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub is_incoming: bool,
    pub user: Option<String>,
    pub replay: ReplayStats,
}

// ---------------------------------------------------------------------------
// Pure time-decision functions
// ---------------------------------------------------------------------------

/// Whether the ping tick may pick this peer: silent past `ping_after`
/// and not answered a ping within `ping_after` (an out-of-date node that
/// mangles packets but keeps talking must not be pinged every tick).
pub fn is_ping_candidate_at(
    now: Millis,
    last_message: Millis,
    last_ping: Millis,
    ping_after: Millis,
) -> bool {
    now >= last_message + ping_after && now >= last_ping + ping_after
}

/// Whether the peer has been silent past the unresponsive threshold.
pub fn is_unresponsive_at(now: Millis, last_message: Millis, unresponsive_after: Millis) -> bool {
    now >= last_message + unresponsive_after
}

/// Whether an incoming peer has been silent long enough to forget.
pub fn should_forget_at(
    is_incoming: bool,
    now: Millis,
    last_message: Millis,
    forget_after: Millis,
) -> bool {
    is_incoming && now >= last_message + forget_after
}

/// While a peer is past the unresponsive threshold, only every eighth
/// ping is sent.
pub fn should_ping_while_down(ping_count: u32) -> bool {
    ping_count % 8 == 0
}

/// Whether a pre-establishment frame should trigger an opportunistic
/// switch ping (so the remote router learns us from the response).
/// Admits ~6 in 7 frames; the skip bounds how often a replayed frame can
/// make us ping.
pub fn should_probe_during_handshake(ping_count: u32) -> bool {
    (ping_count + 1) % 7 != 0
}

/// Whether the outbound path must report the link down to the switch.
/// Strict comparison: the tick owns the transition at the boundary.
pub fn outbound_is_stale(now: Millis, last_message: Millis, unresponsive_after: Millis) -> bool {
    now - last_message > unresponsive_after
}

/// Activity seed for a newly created peer: just past the lazy threshold,
/// so the next ping tick probes it immediately without ever counting it
/// unresponsive.
pub fn seed_last_activity(now: Millis, ping_after: Millis) -> Millis {
    now - ping_after - 1
}
