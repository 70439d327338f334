//! Contract with the cryptographic session engine.
//!
//! The controller never touches key material. It drives one [`Session`]
//! per peer — handing it inbound wire frames to unwrap and outbound
//! switch messages to wrap — and mirrors the session's handshake state
//! into the peer state machine. Sessions come from a [`SessionEngine`],
//! which also owns the local identity and the set of accepted inbound
//! credentials.

use fcmesh_core::types::PublicKey;

/// Handshake state of a single session, as the engine reports it.
///
/// The controller copies this into [`crate::peer::PeerState`] on every
/// valid inbound frame; `Unresponsive` exists only on the peer side.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum SessionState {
    New,
    Handshake1,
    Handshake2,
    Handshake3,
    Established,
}

/// Replay-protection counters, surfaced in peer stats.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct ReplayStats {
    pub duplicates: u32,
    pub lost_packets: u32,
    pub received_out_of_range: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The frame could not be delivered or validated right now. Transient
    /// on the outbound path; on the very first frame from an unknown
    /// source it means the frame was spurious.
    #[error("undeliverable")]
    Undeliverable,

    /// The session rejected the frame outright.
    #[error("session rejected frame: {0}")]
    Rejected(&'static str),
}

/// One authenticated, encrypted session with a single remote node.
pub trait Session {
    /// Install a pre-shared credential (e.g. a beacon password).
    fn set_auth(&mut self, password: &[u8]);

    /// Current handshake state.
    fn state(&self) -> SessionState;

    /// The remote node's long-term key, once known. Outbound sessions
    /// know it from creation; inbound sessions learn it during the
    /// handshake.
    fn remote_public_key(&self) -> Option<PublicKey>;

    /// Label of the credential the remote authenticated with, if any.
    fn user(&self) -> Option<String>;

    /// Replay-protection counters.
    fn replay_stats(&self) -> ReplayStats;

    /// Encrypt an outbound switch message in place, turning it into a
    /// wire frame. On error the buffer contents are unspecified — the
    /// session may mangle the message while building its error path.
    fn wrap(&mut self, msg: &mut Vec<u8>) -> Result<(), SessionError>;

    /// Decrypt and authenticate an inbound wire frame. Advances the
    /// handshake as a side effect.
    fn unwrap(&mut self, frame: &[u8]) -> Result<Vec<u8>, SessionError>;
}

/// Factory and credential store for sessions.
pub trait SessionEngine {
    /// The local node's long-term public key.
    fn local_public_key(&self) -> PublicKey;

    /// Open a session toward a known remote key.
    fn open_outbound(&mut self, remote: PublicKey) -> Box<dyn Session>;

    /// Open a session for an unknown inbound source; the remote key is
    /// accepted from its handshake.
    fn open_inbound(&mut self) -> Box<dyn Session>;

    /// Register a credential that inbound peers may authenticate with.
    fn add_user(&mut self, password: &[u8], label: &str);
}
