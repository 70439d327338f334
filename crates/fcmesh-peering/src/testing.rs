//! Test doubles for the controller's external collaborators.
//!
//! The controller owns its sessions and switch behind trait objects, so
//! tests steer them through shared handles: [`StubEngine`] records every
//! session it opens and hands out [`SessionHandle`]s that script state
//! transitions and wrap/unwrap outcomes; [`RecordingSwitch`] assigns
//! labels sequentially and journals every slot operation.
//!
//! The controller is a single-threaded machine, so the handles are plain
//! `Rc<RefCell<_>>` clones.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use fcmesh_core::types::{PathLabel, PublicKey};

use crate::peer::PeerId;
use crate::session::{ReplayStats, Session, SessionEngine, SessionError, SessionState};
use crate::switch::{SwitchCore, SwitchError};

// ---------------------------------------------------------------------------
// Session stub
// ---------------------------------------------------------------------------

/// Scriptable state behind one [`StubSession`].
#[derive(Debug)]
pub struct StubSessionInner {
    pub state: SessionState,
    pub remote_key: Option<PublicKey>,
    pub user: Option<String>,
    pub replay: ReplayStats,
    /// Passwords installed via `set_auth`, in order.
    pub auth_passwords: Vec<Vec<u8>>,
    /// Scripted outcomes for the next `unwrap` calls; when empty, unwrap
    /// succeeds and yields the frame unchanged.
    pub unwrap_script: VecDeque<Result<(), SessionError>>,
    /// Scripted outcomes for the next `wrap` calls; when empty, wrap
    /// succeeds and leaves the message unchanged.
    pub wrap_script: VecDeque<Result<(), SessionError>>,
    /// Every plaintext handed to `wrap`.
    pub wrapped: Vec<Vec<u8>>,
    /// Every frame handed to `unwrap`.
    pub unwrapped: Vec<Vec<u8>>,
}

impl StubSessionInner {
    fn new(remote_key: Option<PublicKey>) -> Self {
        Self {
            state: SessionState::New,
            remote_key,
            user: None,
            replay: ReplayStats::default(),
            auth_passwords: Vec::new(),
            unwrap_script: VecDeque::new(),
            wrap_script: VecDeque::new(),
            wrapped: Vec::new(),
            unwrapped: Vec::new(),
        }
    }
}

/// Cloneable scripting handle onto a session the controller owns.
#[derive(Clone)]
pub struct SessionHandle(Rc<RefCell<StubSessionInner>>);

impl SessionHandle {
    pub fn set_state(&self, state: SessionState) {
        self.0.borrow_mut().state = state;
    }

    pub fn state(&self) -> SessionState {
        self.0.borrow().state
    }

    pub fn set_remote_key(&self, key: PublicKey) {
        self.0.borrow_mut().remote_key = Some(key);
    }

    pub fn set_user(&self, user: &str) {
        self.0.borrow_mut().user = Some(user.to_string());
    }

    pub fn set_replay_stats(&self, replay: ReplayStats) {
        self.0.borrow_mut().replay = replay;
    }

    /// Make the next `unwrap` fail with `err`.
    pub fn script_unwrap_err(&self, err: SessionError) {
        self.0.borrow_mut().unwrap_script.push_back(Err(err));
    }

    /// Make the next `wrap` fail with `err`.
    pub fn script_wrap_err(&self, err: SessionError) {
        self.0.borrow_mut().wrap_script.push_back(Err(err));
    }

    pub fn auth_passwords(&self) -> Vec<Vec<u8>> {
        self.0.borrow().auth_passwords.clone()
    }

    pub fn wrapped(&self) -> Vec<Vec<u8>> {
        self.0.borrow().wrapped.clone()
    }

    pub fn unwrapped(&self) -> Vec<Vec<u8>> {
        self.0.borrow().unwrapped.clone()
    }
}

/// A [`Session`] whose behavior is fully scripted from the outside.
///
/// Unwrap and wrap are identity transforms by default, so tests can
/// assert on frame contents end to end.
pub struct StubSession(Rc<RefCell<StubSessionInner>>);

impl StubSession {
    /// A stand-alone stub, not registered with any engine.
    pub fn detached() -> Self {
        Self(Rc::new(RefCell::new(StubSessionInner::new(None))))
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle(Rc::clone(&self.0))
    }
}

impl Session for StubSession {
    fn set_auth(&mut self, password: &[u8]) {
        self.0.borrow_mut().auth_passwords.push(password.to_vec());
    }

    fn state(&self) -> SessionState {
        self.0.borrow().state
    }

    fn remote_public_key(&self) -> Option<PublicKey> {
        self.0.borrow().remote_key
    }

    fn user(&self) -> Option<String> {
        self.0.borrow().user.clone()
    }

    fn replay_stats(&self) -> ReplayStats {
        self.0.borrow().replay
    }

    fn wrap(&mut self, msg: &mut Vec<u8>) -> Result<(), SessionError> {
        let mut inner = self.0.borrow_mut();
        inner.wrapped.push(msg.clone());
        match inner.wrap_script.pop_front() {
            Some(Err(err)) => Err(err),
            _ => Ok(()),
        }
    }

    fn unwrap(&mut self, frame: &[u8]) -> Result<Vec<u8>, SessionError> {
        let mut inner = self.0.borrow_mut();
        inner.unwrapped.push(frame.to_vec());
        match inner.unwrap_script.pop_front() {
            Some(Err(err)) => Err(err),
            _ => Ok(frame.to_vec()),
        }
    }
}

// ---------------------------------------------------------------------------
// Session engine stub
// ---------------------------------------------------------------------------

/// Shared journal of everything a [`StubEngine`] did.
#[derive(Clone, Default)]
pub struct EngineJournal {
    sessions: Rc<RefCell<Vec<SessionHandle>>>,
    users: Rc<RefCell<Vec<(Vec<u8>, String)>>>,
    inbound_unwrap_errs: Rc<RefCell<VecDeque<SessionError>>>,
}

impl EngineJournal {
    /// Handles to every session the engine opened, in creation order.
    pub fn sessions(&self) -> Vec<SessionHandle> {
        self.sessions.borrow().clone()
    }

    /// The most recently opened session.
    pub fn last_session(&self) -> SessionHandle {
        self.sessions
            .borrow()
            .last()
            .expect("no session opened yet")
            .clone()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.borrow().len()
    }

    /// Credentials registered via `add_user`.
    pub fn users(&self) -> Vec<(Vec<u8>, String)> {
        self.users.borrow().clone()
    }

    /// Make the *next* inbound session the engine opens reject its first
    /// `unwrap`. Needed because the controller opens the session and
    /// feeds it the triggering frame within a single call.
    pub fn script_next_inbound_unwrap_err(&self, err: SessionError) {
        self.inbound_unwrap_errs.borrow_mut().push_back(err);
    }
}

/// A [`SessionEngine`] that opens [`StubSession`]s and journals them.
pub struct StubEngine {
    local_key: PublicKey,
    journal: EngineJournal,
}

impl StubEngine {
    pub fn new(local_key: PublicKey) -> Self {
        Self {
            local_key,
            journal: EngineJournal::default(),
        }
    }

    /// Clone the journal before boxing the engine into a controller.
    pub fn journal(&self) -> EngineJournal {
        self.journal.clone()
    }
}

impl SessionEngine for StubEngine {
    fn local_public_key(&self) -> PublicKey {
        self.local_key
    }

    fn open_outbound(&mut self, remote: PublicKey) -> Box<dyn Session> {
        let session = StubSession(Rc::new(RefCell::new(StubSessionInner::new(Some(remote)))));
        self.journal.sessions.borrow_mut().push(session.handle());
        Box::new(session)
    }

    fn open_inbound(&mut self) -> Box<dyn Session> {
        let session = StubSession::detached();
        if let Some(err) = self.journal.inbound_unwrap_errs.borrow_mut().pop_front() {
            session.handle().script_unwrap_err(err);
        }
        self.journal.sessions.borrow_mut().push(session.handle());
        Box::new(session)
    }

    fn add_user(&mut self, password: &[u8], label: &str) {
        self.journal
            .users
            .borrow_mut()
            .push((password.to_vec(), label.to_string()));
    }
}

// ---------------------------------------------------------------------------
// Switch stub
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct SwitchInner {
    next_label: u64,
    labels: HashMap<PeerId, PathLabel>,
    added: Vec<PeerId>,
    removed: Vec<PeerId>,
    swaps: Vec<(PeerId, PeerId)>,
    fail_next: Option<SwitchError>,
}

/// Cloneable view onto a [`RecordingSwitch`] a controller owns.
#[derive(Clone)]
pub struct SwitchJournal(Rc<RefCell<SwitchInner>>);

impl SwitchJournal {
    /// Number of currently registered slots.
    pub fn live_slots(&self) -> usize {
        self.0.borrow().labels.len()
    }

    /// The label currently bound to a peer, if registered.
    pub fn label_of(&self, peer: PeerId) -> Option<PathLabel> {
        self.0.borrow().labels.get(&peer).copied()
    }

    pub fn added(&self) -> Vec<PeerId> {
        self.0.borrow().added.clone()
    }

    pub fn removed(&self) -> Vec<PeerId> {
        self.0.borrow().removed.clone()
    }

    pub fn swaps(&self) -> Vec<(PeerId, PeerId)> {
        self.0.borrow().swaps.clone()
    }

    /// Make the next `add_interface` fail with `err`.
    pub fn fail_next_add(&self, err: SwitchError) {
        self.0.borrow_mut().fail_next = Some(err);
    }
}

/// A [`SwitchCore`] that assigns labels sequentially and journals every
/// slot operation.
pub struct RecordingSwitch(Rc<RefCell<SwitchInner>>);

impl RecordingSwitch {
    /// Labels are assigned `first_label`, `first_label + 1`, ...
    pub fn new(first_label: u64) -> Self {
        Self(Rc::new(RefCell::new(SwitchInner {
            next_label: first_label,
            ..SwitchInner::default()
        })))
    }

    pub fn journal(&self) -> SwitchJournal {
        SwitchJournal(Rc::clone(&self.0))
    }
}

impl SwitchCore for RecordingSwitch {
    fn add_interface(&mut self, peer: PeerId) -> Result<PathLabel, SwitchError> {
        let mut inner = self.0.borrow_mut();
        if let Some(err) = inner.fail_next.take() {
            return Err(err);
        }
        let label = PathLabel(inner.next_label);
        inner.next_label += 1;
        inner.labels.insert(peer, label);
        inner.added.push(peer);
        Ok(label)
    }

    fn swap_interfaces(&mut self, a: PeerId, b: PeerId) {
        let mut inner = self.0.borrow_mut();
        let label_a = inner.labels.get(&a).copied();
        let label_b = inner.labels.get(&b).copied();
        assert!(
            label_a.is_some() && label_b.is_some(),
            "swap of unregistered interface"
        );
        inner.labels.insert(a, label_b.unwrap());
        inner.labels.insert(b, label_a.unwrap());
        inner.swaps.push((a, b));
    }

    fn remove_interface(&mut self, peer: PeerId) {
        let mut inner = self.0.borrow_mut();
        inner.labels.remove(&peer);
        inner.removed.push(peer);
    }
}
