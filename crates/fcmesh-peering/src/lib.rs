//! Peer link controller for the fcmesh overlay router.
//!
//! This crate owns the lifecycle of every direct neighbor relationship:
//! per-peer authenticated sessions, liveness tracking, beacon
//! bootstrapping, and the bidirectional data path between link-layer
//! transports and the packet switch.
//!
//! The [`Controller`] is a synchronous state machine. It performs no I/O
//! and reads no clock: every entry point takes `now` in milliseconds and
//! returns the [`Action`]s the embedding runtime must carry out
//! (transmit a frame, deliver a frame to the switch, publish a peer
//! event, issue a switch ping). Concrete transports, the cryptographic
//! session engine, the switch core, and the event bus are collaborators
//! behind the traits in [`session`] and [`switch`].

pub mod actions;
pub mod config;
pub mod controller;
pub mod error;
pub mod iface;
pub mod logging;
pub mod peer;
pub mod session;
pub mod switch;
pub mod testing;

pub use actions::{Action, Delivery};
pub use config::Tuning;
pub use controller::Controller;
pub use error::{BeaconStateError, BootstrapError, DisconnectError};
pub use iface::{BeaconMode, IfNum, LinkIface};
pub use peer::{Millis, PeerId, PeerState, PeerStats};
pub use session::{ReplayStats, Session, SessionEngine, SessionError, SessionState};
pub use switch::{SwitchCore, SwitchError};
