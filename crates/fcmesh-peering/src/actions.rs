//! Actions returned by the controller.
//!
//! The controller is a pure state machine: every handler returns the
//! side effects it wants performed instead of performing them. The
//! embedding runtime drains the returned actions in order — transmitting
//! frames, delivering to the switch, publishing bus events, and issuing
//! switch pings whose responses come back via
//! [`crate::Controller::handle_pong`].

use fcmesh_core::types::{NodeAddr, PathLabel};
use fcmesh_core::wire::event::PeerEventKind;

use crate::iface::IfNum;
use crate::peer::{Millis, PeerId};

/// A side effect the embedding runtime must carry out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Hand an lladdr-prefixed frame to the link transport.
    Transmit { ifnum: IfNum, frame: Vec<u8> },

    /// Deliver a decrypted frame up to the switch on a peer's slot.
    DeliverToSwitch { peer: PeerId, frame: Vec<u8> },

    /// Publish a peer event on the bus.
    ///
    /// `pathfinder` is [`fcmesh_core::wire::event::PATHFINDER_ALL`] for
    /// proactive up/down notifications, or a specific pathfinder id when
    /// replaying in response to an enumeration request.
    Publish {
        pathfinder: u32,
        kind: PeerEventKind,
        node: NodeAddr,
    },

    /// Ask the switch pinger to ping a peer's label. A successful
    /// response must be fed back through `handle_pong` with this peer id.
    Ping {
        peer: PeerId,
        label: PathLabel,
        timeout_ms: Millis,
    },
}

/// Verdict handed back to the switch for one outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Delivery {
    /// The message was accepted (possibly silently dropped downstream;
    /// transient transport trouble must not kill a peer).
    Accepted,

    /// The peer has been silent past the unresponsive threshold; the
    /// switch should treat the link as down.
    Undeliverable,

    /// The session failed the message outright.
    Failed(crate::session::SessionError),
}
