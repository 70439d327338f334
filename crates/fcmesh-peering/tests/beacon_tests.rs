//! Beacon send and accept behavior.

mod common;

use common::*;

use fcmesh_core::addressing::mesh_addr_for_key;
use fcmesh_core::version::CURRENT_PROTOCOL;
use fcmesh_core::wire::beacon::{BEACON_SIZE, Beacon, PASSWORD_LEN};
use fcmesh_core::wire::lladdr::{broadcast_from, parse_frame, prepend_addr};
use fcmesh_peering::{BeaconMode, BeaconStateError, IfNum, PeerState, SessionState, SwitchError};

fn remote_beacon(tag: u8) -> Beacon {
    Beacon {
        public_key: grind_key(tag),
        version: CURRENT_PROTOCOL,
        password: [tag; PASSWORD_LEN],
    }
}

// ---------------------------------------------------------------------------
// Sending
// ---------------------------------------------------------------------------

#[test]
fn entering_send_mode_emits_one_beacon_immediately() {
    let mut fix = fixture();
    let actions = fix.controller.beacon_state(IF0, BeaconMode::Send).unwrap();
    let frames = transmits(&actions);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].0, IF0);

    let parsed = parse_frame(&frames[0].1).unwrap();
    assert!(parsed.broadcast);
    let beacon = Beacon::decode(parsed.payload).unwrap();
    assert_eq!(beacon.public_key, fix.local_key);
    assert_eq!(beacon.version, CURRENT_PROTOCOL);
    assert_eq!(&beacon.password, &fix.controller.beacon().password);
}

#[test]
fn beacon_tick_covers_send_links_only() {
    let mut fix = fixture();
    let if1 = fix.controller.new_iface("wlan0");
    let if2 = fix.controller.new_iface("br0");
    fix.controller.beacon_state(IF0, BeaconMode::Send).unwrap();
    fix.controller.beacon_state(if1, BeaconMode::Accept).unwrap();

    let actions = fix.controller.beacon_tick();
    let frames = transmits(&actions);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].0, IF0);
    let _ = if2; // Off by default, also silent
}

#[test]
fn entering_accept_or_off_emits_nothing() {
    let mut fix = fixture();
    assert!(fix
        .controller
        .beacon_state(IF0, BeaconMode::Accept)
        .unwrap()
        .is_empty());
    assert!(fix
        .controller
        .beacon_state(IF0, BeaconMode::Off)
        .unwrap()
        .is_empty());
}

#[test]
fn beacon_state_rejects_unknown_interface() {
    let mut fix = fixture();
    assert_eq!(
        fix.controller
            .beacon_state(IfNum(5), BeaconMode::Send)
            .unwrap_err(),
        BeaconStateError::NoSuchIface(IfNum(5))
    );
}

// ---------------------------------------------------------------------------
// Accepting
// ---------------------------------------------------------------------------

#[test]
fn accepted_beacon_admits_an_incoming_peer() {
    let mut fix = fixture();
    fix.controller.beacon_state(IF0, BeaconMode::Accept).unwrap();

    let beacon = remote_beacon(1);
    let frame = broadcast_from(&lladdr(1), &beacon.encode());
    let actions = fix.controller.handle_frame(IF0, &frame, 500);

    // One peer, announced right away with the advertised version.
    let events = peer_events(&actions);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].key, beacon.public_key);
    assert_eq!(events[0].ip6, mesh_addr_for_key(&beacon.public_key));
    assert_eq!(events[0].version, CURRENT_PROTOCOL);

    let stats = fix.controller.peer_stats();
    assert_eq!(stats.len(), 1);
    assert!(stats[0].is_incoming);
    assert_eq!(stats[0].state, PeerState::Unauthenticated);
    assert_eq!(fix.switch.live_slots(), 1);

    // The session targets the advertised key with the beacon password.
    let session = fix.engine.last_session();
    assert_eq!(session.auth_passwords(), vec![beacon.password.to_vec()]);

    // Seeded as lazy: the very next tick probes it.
    let tick = fix.controller.ping_tick(600);
    assert_eq!(pings(&tick).len(), 1);
}

#[test]
fn duplicate_beacon_rotates_the_password_instead_of_duplicating_the_peer() {
    let mut fix = fixture();
    fix.controller.beacon_state(IF0, BeaconMode::Accept).unwrap();

    let mut beacon = remote_beacon(1);
    let first = broadcast_from(&lladdr(1), &beacon.encode());
    fix.controller.handle_frame(IF0, &first, 0);

    beacon.password = [0x55; PASSWORD_LEN];
    let second = broadcast_from(&lladdr(1), &beacon.encode());
    let actions = fix.controller.handle_frame(IF0, &second, 1000);

    assert!(actions.is_empty(), "no re-announcement for a known source");
    assert_eq!(fix.controller.peer_stats().len(), 1);
    assert_eq!(fix.engine.session_count(), 1);

    let session = fix.engine.last_session();
    assert_eq!(
        session.auth_passwords(),
        vec![[1u8; PASSWORD_LEN].to_vec(), [0x55u8; PASSWORD_LEN].to_vec()],
    );
}

#[test]
fn beacon_peer_reaches_established_on_session_traffic() {
    let mut fix = fixture();
    fix.controller.beacon_state(IF0, BeaconMode::Accept).unwrap();

    let beacon = remote_beacon(1);
    let frame = broadcast_from(&lladdr(1), &beacon.encode());
    fix.controller.handle_frame(IF0, &frame, 0);

    // The advertised node opens its session to us.
    fix.engine.last_session().set_state(SessionState::Established);
    let unicast = prepend_addr(&lladdr(1), &terminating_payload());
    let actions = fix.controller.handle_frame(IF0, &unicast, 200);

    let events = peer_events(&actions);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].key, beacon.public_key);
    assert_eq!(deliveries(&actions).len(), 1);
    assert_eq!(fix.controller.peer_stats()[0].state, PeerState::Established);
}

#[test]
fn send_mode_also_accepts() {
    let mut fix = fixture();
    fix.controller.beacon_state(IF0, BeaconMode::Send).unwrap();

    let frame = broadcast_from(&lladdr(1), &remote_beacon(1).encode());
    fix.controller.handle_frame(IF0, &frame, 0);
    assert_eq!(fix.controller.peer_stats().len(), 1);
}

// ---------------------------------------------------------------------------
// Drops
// ---------------------------------------------------------------------------

#[test]
fn beacon_on_off_link_is_ignored() {
    let mut fix = fixture();
    let frame = broadcast_from(&lladdr(1), &remote_beacon(1).encode());
    let actions = fix.controller.handle_frame(IF0, &frame, 0);
    assert!(actions.is_empty());
    assert_eq!(fix.controller.peer_stats().len(), 0);
}

#[test]
fn runt_beacon_changes_nothing() {
    let mut fix = fixture();
    fix.controller.beacon_state(IF0, BeaconMode::Accept).unwrap();

    let encoded = remote_beacon(1).encode();
    let frame = broadcast_from(&lladdr(1), &encoded[..BEACON_SIZE - 1]);
    let actions = fix.controller.handle_frame(IF0, &frame, 0);
    assert!(actions.is_empty());
    assert_eq!(fix.controller.peer_stats().len(), 0);
    assert_eq!(fix.engine.session_count(), 0);
}

#[test]
fn self_beacon_changes_nothing() {
    let mut fix = fixture();
    fix.controller.beacon_state(IF0, BeaconMode::Accept).unwrap();

    let echo = Beacon {
        public_key: fix.local_key,
        version: CURRENT_PROTOCOL,
        password: [9; PASSWORD_LEN],
    };
    let frame = broadcast_from(&lladdr(1), &echo.encode());
    let actions = fix.controller.handle_frame(IF0, &frame, 0);
    assert!(actions.is_empty());
    assert_eq!(fix.controller.peer_stats().len(), 0);
}

#[test]
fn beacon_from_key_outside_mesh_prefix_changes_nothing() {
    let mut fix = fixture();
    fix.controller.beacon_state(IF0, BeaconMode::Accept).unwrap();

    let bad = Beacon {
        public_key: grind_invalid_key(2),
        version: CURRENT_PROTOCOL,
        password: [9; PASSWORD_LEN],
    };
    let frame = broadcast_from(&lladdr(1), &bad.encode());
    let actions = fix.controller.handle_frame(IF0, &frame, 0);
    assert!(actions.is_empty());
    assert_eq!(fix.controller.peer_stats().len(), 0);
}

#[test]
fn incompatible_version_beacon_changes_nothing() {
    let mut fix = fixture();
    fix.controller.beacon_state(IF0, BeaconMode::Accept).unwrap();

    let mut old = remote_beacon(1);
    old.version = fcmesh_core::version::MINIMUM_COMPATIBLE - 1;
    let frame = broadcast_from(&lladdr(1), &old.encode());
    let actions = fix.controller.handle_frame(IF0, &frame, 0);
    assert!(actions.is_empty());
    assert_eq!(fix.controller.peer_stats().len(), 0);
}

#[test]
fn beacon_peer_is_not_created_when_the_switch_is_full() {
    let mut fix = fixture();
    fix.controller.beacon_state(IF0, BeaconMode::Accept).unwrap();
    fix.switch.fail_next_add(SwitchError::OutOfSpace);

    let frame = broadcast_from(&lladdr(1), &remote_beacon(1).encode());
    let actions = fix.controller.handle_frame(IF0, &frame, 0);
    assert!(actions.is_empty(), "no events for a peer that was never created");
    assert_eq!(fix.controller.peer_stats().len(), 0);
    assert_eq!(fix.switch.live_slots(), 0);
}
