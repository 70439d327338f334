//! Shared fixture for the controller integration suites.

#![allow(dead_code)]

use rand::rngs::mock::StepRng;

use fcmesh_core::addressing::{is_valid_mesh_addr, mesh_addr_for_key};
use fcmesh_core::types::{NodeAddr, PublicKey};
use fcmesh_core::wire::event::PeerEventKind;
use fcmesh_core::wire::lladdr::LinkAddr;
use fcmesh_peering::testing::{EngineJournal, RecordingSwitch, StubEngine, SwitchJournal};
use fcmesh_peering::{Action, Controller, IfNum, Millis, PeerId, SessionState, Tuning};

pub struct Fixture {
    pub controller: Controller,
    pub engine: EngineJournal,
    pub switch: SwitchJournal,
    pub local_key: PublicKey,
}

/// A controller with one registered link (`if0`), a deterministic rng,
/// and default tuning. Switch labels start at `first_label`.
pub fn fixture_with_label(first_label: u64) -> Fixture {
    let local_key = grind_key(0xee);
    let engine = StubEngine::new(local_key);
    let engine_journal = engine.journal();
    let switch = RecordingSwitch::new(first_label);
    let switch_journal = switch.journal();
    let mut controller = Controller::new(
        Box::new(engine),
        Box::new(switch),
        Box::new(StepRng::new(0, 0)),
        Tuning::default(),
    );
    controller.new_iface("eth0");
    Fixture {
        controller,
        engine: engine_journal,
        switch: switch_journal,
        local_key,
    }
}

pub fn fixture() -> Fixture {
    fixture_with_label(0x1000)
}

pub const IF0: IfNum = IfNum(0);

/// Find a key whose derived address lands inside the mesh prefix.
/// Deterministic for a given tag.
pub fn grind_key(tag: u8) -> PublicKey {
    for i in 0u32..=u32::MAX {
        let mut bytes = [0u8; 32];
        bytes[0] = tag;
        bytes[28..].copy_from_slice(&i.to_be_bytes());
        let key = PublicKey::new(bytes);
        if is_valid_mesh_addr(&mesh_addr_for_key(&key)) {
            return key;
        }
    }
    unreachable!("no key for tag {tag} derives a mesh address")
}

/// Find a key whose derived address is *outside* the mesh prefix.
pub fn grind_invalid_key(tag: u8) -> PublicKey {
    for i in 0u32..=u32::MAX {
        let mut bytes = [0u8; 32];
        bytes[0] = tag;
        bytes[28..].copy_from_slice(&i.to_be_bytes());
        let key = PublicKey::new(bytes);
        if !is_valid_mesh_addr(&mesh_addr_for_key(&key)) {
            return key;
        }
    }
    unreachable!()
}

pub fn lladdr(tag: u8) -> LinkAddr {
    LinkAddr::new(vec![10, 0, 0, tag])
}

/// A payload whose switch header terminates at the local router.
pub fn terminating_payload() -> Vec<u8> {
    let mut payload = vec![0u8; 12];
    payload[7] = 1;
    payload
}

/// A payload whose switch header routes onward.
pub fn transit_payload() -> Vec<u8> {
    let mut payload = vec![0u8; 12];
    payload[7] = 3;
    payload
}

/// Admit an established incoming peer at `addr` with key `key` by
/// running it through the unknown-source path: a first (dropped) frame
/// creates the peer, the session is scripted to Established, and a
/// second frame completes the handshake.
///
/// Returns the new peer's id. The triggering actions are discarded.
pub fn establish_incoming(
    fix: &mut Fixture,
    addr: &LinkAddr,
    key: PublicKey,
    now: Millis,
) -> PeerId {
    use fcmesh_core::wire::lladdr::prepend_addr;

    let before = fix.engine.session_count();
    let actions = fix
        .controller
        .handle_frame(IF0, &prepend_addr(addr, &transit_payload()), now);
    assert!(
        deliveries(&actions).is_empty(),
        "pre-establishment transit frame must not reach the switch"
    );
    assert_eq!(fix.engine.session_count(), before + 1);

    let session = fix.engine.last_session();
    session.set_state(SessionState::Established);
    session.set_remote_key(key);
    let actions = fix
        .controller
        .handle_frame(IF0, &prepend_addr(addr, &terminating_payload()), now);
    let peers = published(&actions);
    assert!(
        peers
            .iter()
            .any(|(_, kind, node)| *kind == PeerEventKind::Peer && node.key == key),
        "establishment must publish a Peer event"
    );
    *deliveries(&actions).first().expect("frame delivered upward")
}

// ---------------------------------------------------------------------------
// Action inspection
// ---------------------------------------------------------------------------

pub fn published(actions: &[Action]) -> Vec<(u32, PeerEventKind, NodeAddr)> {
    actions
        .iter()
        .filter_map(|a| match a {
            Action::Publish {
                pathfinder,
                kind,
                node,
            } => Some((*pathfinder, *kind, *node)),
            _ => None,
        })
        .collect()
}

pub fn gone_events(actions: &[Action]) -> Vec<NodeAddr> {
    published(actions)
        .into_iter()
        .filter(|(_, kind, _)| *kind == PeerEventKind::PeerGone)
        .map(|(_, _, node)| node)
        .collect()
}

pub fn peer_events(actions: &[Action]) -> Vec<NodeAddr> {
    published(actions)
        .into_iter()
        .filter(|(_, kind, _)| *kind == PeerEventKind::Peer)
        .map(|(_, _, node)| node)
        .collect()
}

pub fn pings(actions: &[Action]) -> Vec<PeerId> {
    actions
        .iter()
        .filter_map(|a| match a {
            Action::Ping { peer, .. } => Some(*peer),
            _ => None,
        })
        .collect()
}

pub fn transmits(actions: &[Action]) -> Vec<(IfNum, Vec<u8>)> {
    actions
        .iter()
        .filter_map(|a| match a {
            Action::Transmit { ifnum, frame } => Some((*ifnum, frame.clone())),
            _ => None,
        })
        .collect()
}

pub fn deliveries(actions: &[Action]) -> Vec<PeerId> {
    actions
        .iter()
        .filter_map(|a| match a {
            Action::DeliverToSwitch { peer, .. } => Some(*peer),
            _ => None,
        })
        .collect()
}
