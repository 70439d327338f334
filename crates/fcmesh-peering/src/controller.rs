//! The peer link controller.
//!
//! Owns every registered link and every peer on it, multiplexing inbound
//! frames to the right session, probing liveness from the ping tick,
//! advertising the local node with beacons, and bridging each peer's
//! traffic between its link transport and its switch slot.
//!
//! Every handler takes `now` in milliseconds where it needs time and
//! returns the [`Action`]s the embedding runtime must perform. Nothing
//! here blocks, sleeps, or reads a clock.

use std::collections::HashMap;

use rand::RngCore;
use tracing::{debug, info};

use fcmesh_core::addressing::{is_valid_mesh_addr, mesh_addr_for_key};
use fcmesh_core::types::{NodeAddr, PathLabel, PublicKey};
use fcmesh_core::version::{CURRENT_PROTOCOL, is_compatible};
use fcmesh_core::wire::beacon::Beacon;
use fcmesh_core::wire::event::{PATHFINDER_ALL, PeerEventKind};
use fcmesh_core::wire::lladdr::{LinkAddr, broadcast_frame, parse_frame, prepend_addr};
use fcmesh_core::wire::switchhdr::routes_to_self;

use crate::actions::{Action, Delivery};
use crate::config::Tuning;
use crate::error::{BeaconStateError, BootstrapError, DisconnectError};
use crate::iface::{BeaconMode, IfNum, LinkIface};
use crate::peer::{
    Millis, Peer, PeerId, PeerState, PeerStats, is_ping_candidate_at, is_unresponsive_at,
    outbound_is_stale, should_forget_at, should_ping_while_down, should_probe_during_handshake,
};
use crate::session::{SessionEngine, SessionError, SessionState};
use crate::switch::{SwitchCore, SwitchError};

/// What became of one inbound frame handed to a peer's session.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum InboundOutcome {
    /// Decrypted and delivered to the switch.
    Delivered,
    /// Decrypted but dropped by the pre-establishment guard.
    Dropped,
    /// The session refused the frame.
    SessionRejected,
}

/// The root of the peering subsystem.
pub struct Controller {
    links: Vec<LinkIface>,
    sessions: Box<dyn SessionEngine>,
    switch: Box<dyn SwitchCore>,
    rng: Box<dyn RngCore>,
    tuning: Tuning,
    /// The local self-advertisement; its password is freshly random per
    /// startup and registered with the session engine as an accepted
    /// inbound credential.
    beacon: Beacon,
    next_peer_id: u64,
    /// Which link each live peer is on, for switch and pinger callbacks.
    locator: HashMap<PeerId, IfNum>,
}

impl Controller {
    pub fn new(
        mut sessions: Box<dyn SessionEngine>,
        switch: Box<dyn SwitchCore>,
        mut rng: Box<dyn RngCore>,
        tuning: Tuning,
    ) -> Self {
        let mut password = [0u8; fcmesh_core::wire::beacon::PASSWORD_LEN];
        rng.fill_bytes(&mut password);
        sessions.add_user(&password, "Local Peers");
        let beacon = Beacon {
            public_key: sessions.local_public_key(),
            version: CURRENT_PROTOCOL,
            password,
        };
        Self {
            links: Vec::new(),
            sessions,
            switch,
            rng,
            tuning,
            beacon,
            next_peer_id: 0,
            locator: HashMap::new(),
        }
    }

    /// The beacon payload this node broadcasts.
    pub fn beacon(&self) -> &Beacon {
        &self.beacon
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn links(&self) -> &[LinkIface] {
        &self.links
    }

    pub fn iface(&self, ifnum: IfNum) -> Option<&LinkIface> {
        self.links.get(ifnum.0 as usize)
    }

    // -----------------------------------------------------------------------
    // Admin surface
    // -----------------------------------------------------------------------

    /// Register a link-layer transport. The returned index is stable for
    /// the controller's lifetime.
    pub fn new_iface(&mut self, name: &str) -> IfNum {
        let ifnum = IfNum(self.links.len() as u32);
        info!(%ifnum, name, "registering interface");
        self.links.push(LinkIface::new(name.to_string(), ifnum));
        ifnum
    }

    /// Connect to a known remote node over a link.
    ///
    /// The peer starts unauthenticated; its activity timers are seeded so
    /// the next ping tick probes it, and one switch ping goes out right
    /// away to learn its protocol version and confirm the path.
    pub fn bootstrap_peer(
        &mut self,
        ifnum: IfNum,
        key: PublicKey,
        lladdr: LinkAddr,
        password: &[u8],
        now: Millis,
    ) -> Result<(PeerId, Vec<Action>), BootstrapError> {
        let Self {
            links,
            sessions,
            switch,
            locator,
            tuning,
            beacon,
            next_peer_id,
            ..
        } = self;
        let Some(link) = links.get_mut(ifnum.0 as usize) else {
            return Err(BootstrapError::BadIfNum(ifnum));
        };

        let ip6 = mesh_addr_for_key(&key);
        if !is_valid_mesh_addr(&ip6) || key == beacon.public_key {
            return Err(BootstrapError::BadKey);
        }

        debug!(link = %link.name, total = link.peers.len(), "bootstrapping peer");

        // Reserve the switch slot before touching the peer map, so a
        // full switch leaves any peer already at this lladdr untouched.
        *next_peer_id += 1;
        let id = PeerId(*next_peer_id);
        let label = match switch.add_interface(id) {
            Ok(label) => label,
            Err(SwitchError::OutOfSpace) => return Err(BootstrapError::OutOfSpace),
            Err(SwitchError::Internal) => return Err(BootstrapError::Internal),
        };

        let mut actions = Vec::new();
        if let Some(existing) = link.peers.position_of(&lladdr) {
            info!(link = %link.name, %lladdr, "replacing existing peer at link address");
            destroy_peer_at(link, switch.as_mut(), locator, existing, &mut actions);
        }

        let mut session = sessions.open_outbound(key);
        session.set_auth(password);
        let addr = NodeAddr {
            key,
            ip6,
            path: label,
            version: 0,
        };
        let idx = link.peers.insert(Peer::new(
            id,
            lladdr,
            addr,
            session,
            false,
            now,
            tuning.ping_after_ms,
        ));
        locator.insert(id, ifnum);

        let peer = link.peers.get_at_mut(idx);
        info!(peer = %id, addr = %peer.addr, "adding peer");

        // The routing table cannot learn this node until we know its
        // version; the ping response carries it.
        send_ping(peer, tuning.ping_timeout_ms, &mut actions);

        Ok((id, actions))
    }

    /// Change a link's beacon participation. Entering `Send` emits one
    /// beacon immediately rather than waiting out the interval.
    pub fn beacon_state(
        &mut self,
        ifnum: IfNum,
        mode: BeaconMode,
    ) -> Result<Vec<Action>, BeaconStateError> {
        let Some(link) = self.links.get_mut(ifnum.0 as usize) else {
            return Err(BeaconStateError::NoSuchIface(ifnum));
        };
        debug!(link = %link.name, mode = mode.name(), "beacon state change");
        link.beacon_mode = mode;

        let mut actions = Vec::new();
        if mode == BeaconMode::Send {
            actions.push(Action::Transmit {
                ifnum,
                frame: broadcast_frame(&self.beacon.encode()),
            });
        }
        Ok(actions)
    }

    /// Disconnect the peer with the given public key, wherever it is.
    pub fn disconnect_peer(&mut self, key: &PublicKey) -> Result<Vec<Action>, DisconnectError> {
        let Self {
            links,
            switch,
            locator,
            ..
        } = self;
        for link in links.iter_mut() {
            let found = (0..link.peers.len()).find(|&i| link.peers.get_at(i).addr.key == *key);
            if let Some(idx) = found {
                let mut actions = Vec::new();
                destroy_peer_at(link, switch.as_mut(), locator, idx, &mut actions);
                return Ok(actions);
            }
        }
        Err(DisconnectError::NotFound)
    }

    /// Snapshot every peer for the admin surface.
    pub fn peer_stats(&self) -> Vec<PeerStats> {
        self.links
            .iter()
            .flat_map(|link| link.peers.iter().map(Peer::stats))
            .collect()
    }

    /// Tear everything down: every peer on every link, newest link
    /// first, publishing Peer-Gone and releasing every switch slot.
    pub fn shutdown(&mut self) -> Vec<Action> {
        let Self {
            links,
            switch,
            locator,
            ..
        } = self;
        let mut actions = Vec::new();
        for link in links.iter_mut().rev() {
            while !link.peers.is_empty() {
                let last = link.peers.len() - 1;
                destroy_peer_at(link, switch.as_mut(), locator, last, &mut actions);
            }
        }
        links.clear();
        actions
    }

    // -----------------------------------------------------------------------
    // Event bus
    // -----------------------------------------------------------------------

    /// A pathfinder asked for the current peer set: replay one Peer
    /// event per established peer, addressed to it.
    pub fn handle_pathfinder_peers(&self, pathfinder: u32) -> Vec<Action> {
        self.links
            .iter()
            .flat_map(|link| link.peers.iter())
            .filter(|p| p.state == PeerState::Established)
            .map(|p| Action::Publish {
                pathfinder,
                kind: PeerEventKind::Peer,
                node: p.addr,
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Periodic ticks
    // -----------------------------------------------------------------------

    /// The liveness tick, fired every `ping_interval_ms`. Each link
    /// handles at most one candidate peer, chosen by scanning from a
    /// random offset so no single peer can monopolize the slot.
    pub fn ping_tick(&mut self, now: Millis) -> Vec<Action> {
        let Self {
            links,
            switch,
            locator,
            rng,
            tuning,
            ..
        } = self;
        let mut actions = Vec::new();
        for link in links.iter_mut() {
            link_ping_tick(
                link,
                switch.as_mut(),
                locator,
                rng.as_mut(),
                tuning,
                now,
                &mut actions,
            );
        }
        actions
    }

    /// The beacon tick, fired every `beacon_interval_ms`.
    pub fn beacon_tick(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        for link in &self.links {
            if link.beacon_mode.sends() {
                debug!(link = %link.name, "sending beacon");
                actions.push(Action::Transmit {
                    ifnum: link.ifnum,
                    frame: broadcast_frame(&self.beacon.encode()),
                });
            }
        }
        actions
    }

    // -----------------------------------------------------------------------
    // Data path
    // -----------------------------------------------------------------------

    /// An inbound frame from a link transport.
    pub fn handle_frame(&mut self, ifnum: IfNum, frame: &[u8], now: Millis) -> Vec<Action> {
        let Self {
            links,
            sessions,
            switch,
            locator,
            tuning,
            beacon,
            next_peer_id,
            ..
        } = self;
        let mut actions = Vec::new();
        let Some(link) = links.get_mut(ifnum.0 as usize) else {
            debug!(%ifnum, "DROP frame for unregistered interface");
            return actions;
        };
        let parsed = match parse_frame(frame) {
            Ok(parsed) => parsed,
            Err(err) => {
                debug!(link = %link.name, %err, "DROP runt");
                return actions;
            }
        };

        if parsed.broadcast {
            handle_beacon(
                link,
                sessions.as_mut(),
                switch.as_mut(),
                locator,
                tuning,
                beacon,
                next_peer_id,
                parsed.addr,
                parsed.payload,
                now,
                &mut actions,
            );
            return actions;
        }

        let lladdr = LinkAddr::from(parsed.addr);
        match link.peers.position_of(&lladdr) {
            Some(idx) => {
                peer_inbound(
                    link,
                    switch.as_mut(),
                    locator,
                    tuning,
                    idx,
                    parsed.payload,
                    now,
                    &mut actions,
                );
            }
            None => handle_unknown_source(
                link,
                sessions.as_mut(),
                switch.as_mut(),
                locator,
                tuning,
                next_peer_id,
                lladdr,
                parsed.payload,
                now,
                &mut actions,
            ),
        }
        actions
    }

    /// An outbound message from the switch on a peer's slot.
    ///
    /// Transient transport trouble is absorbed: the only way this
    /// reports the link down is the peer having been silent past the
    /// unresponsive threshold, in which case the message is still
    /// encrypted (from a clone, since the session may mangle its error
    /// path) and sent on the off chance the peer is listening.
    pub fn send_from_switch(
        &mut self,
        peer: PeerId,
        mut msg: Vec<u8>,
        now: Millis,
    ) -> (Delivery, Vec<Action>) {
        let mut actions = Vec::new();
        let Some((link, idx)) = locate_peer(&mut self.links, &self.locator, peer) else {
            debug!(%peer, "switch send for unknown peer");
            return (Delivery::Undeliverable, actions);
        };
        let p = link.peers.get_at_mut(idx);
        p.bytes_out += msg.len() as u64;

        let stale = outbound_is_stale(
            now,
            p.time_of_last_message,
            self.tuning.unresponsive_after_ms,
        );
        let wrap_result = if stale {
            let mut clone = msg.clone();
            let result = p.session.wrap(&mut clone);
            msg = clone;
            result
        } else {
            p.session.wrap(&mut msg)
        };

        if wrap_result.is_ok() {
            actions.push(Action::Transmit {
                ifnum: link.ifnum,
                frame: prepend_addr(&p.lladdr, &msg),
            });
        }

        let verdict = match wrap_result {
            // Short spurious transport failures and packet backup must
            // not make the switch treat the link as dead.
            Ok(()) | Err(SessionError::Undeliverable) => {
                if stale {
                    Delivery::Undeliverable
                } else {
                    Delivery::Accepted
                }
            }
            Err(err) => Delivery::Failed(err),
        };
        (verdict, actions)
    }

    /// A successful switch-ping response for a peer.
    pub fn handle_pong(
        &mut self,
        peer: PeerId,
        version: u32,
        label: PathLabel,
        now: Millis,
    ) -> Vec<Action> {
        let mut actions = Vec::new();
        let Some((link, idx)) = locate_peer(&mut self.links, &self.locator, peer) else {
            debug!(%peer, "pong for departed peer");
            return actions;
        };
        let p = link.peers.get_at_mut(idx);

        p.addr.version = version;
        if !is_compatible(CURRENT_PROTOCOL, version) {
            debug!(peer = %p.id, version, "switch pong from node with incompatible version");
            return actions;
        }
        if p.addr.path != label {
            debug!(peer = %p.id, expected = %p.addr.path, got = %label, "switch pong label mismatch");
        }

        if p.state == PeerState::Established {
            actions.push(publish(PeerEventKind::Peer, p.addr));
        }
        p.time_of_last_ping = now;
        debug!(peer = %p.id, addr = %p.addr, "switch pong");
        actions
    }
}

impl core::fmt::Debug for Controller {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Controller")
            .field("links", &self.links)
            .field("peers", &self.locator.len())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Internal handlers
// ---------------------------------------------------------------------------

fn publish(kind: PeerEventKind, node: NodeAddr) -> Action {
    Action::Publish {
        pathfinder: PATHFINDER_ALL,
        kind,
        node,
    }
}

fn send_ping(peer: &mut Peer, timeout_ms: Millis, actions: &mut Vec<Action>) {
    peer.ping_count += 1;
    debug!(peer = %peer.id, label = %peer.addr.path, "switch ping");
    actions.push(Action::Ping {
        peer: peer.id,
        label: peer.addr.path,
        timeout_ms,
    });
}

fn locate_peer<'a>(
    links: &'a mut [LinkIface],
    locator: &HashMap<PeerId, IfNum>,
    peer: PeerId,
) -> Option<(&'a mut LinkIface, usize)> {
    let ifnum = *locator.get(&peer)?;
    let link = &mut links[ifnum.0 as usize];
    let idx = link
        .peers
        .position_of_id(peer)
        .expect("peer locator out of sync with peer map");
    Some((link, idx))
}

/// Remove a peer, publish its Peer-Gone, and release its switch slot.
fn destroy_peer_at(
    link: &mut LinkIface,
    switch: &mut dyn SwitchCore,
    locator: &mut HashMap<PeerId, IfNum>,
    idx: usize,
    actions: &mut Vec<Action>,
) {
    let peer = link.peers.remove_at(idx);
    info!(peer = %peer.id, lladdr = %peer.lladdr, state = peer.state.name(), "removing peer");
    actions.push(publish(PeerEventKind::PeerGone, peer.addr));
    switch.remove_interface(peer.id);
    locator.remove(&peer.id);
}

/// Drop a speculative peer whose first frame turned out to be noise:
/// release its slot and forget it, with no Peer-Gone — it was never
/// really created.
fn discard_speculative(
    link: &mut LinkIface,
    switch: &mut dyn SwitchCore,
    locator: &mut HashMap<PeerId, IfNum>,
    id: PeerId,
) {
    let idx = link
        .peers
        .position_of_id(id)
        .expect("speculative peer missing from map");
    let peer = link.peers.remove_at(idx);
    switch.remove_interface(peer.id);
    locator.remove(&peer.id);
}

/// A decrypted frame arrived for a known peer: track the session's
/// handshake progress, guard pre-establishment traffic, and forward to
/// the switch.
#[allow(clippy::too_many_arguments)]
fn peer_inbound(
    link: &mut LinkIface,
    switch: &mut dyn SwitchCore,
    locator: &mut HashMap<PeerId, IfNum>,
    tuning: &Tuning,
    idx: usize,
    payload: &[u8],
    now: Millis,
    actions: &mut Vec<Action>,
) -> InboundOutcome {
    let peer = link.peers.get_at_mut(idx);
    let id = peer.id;
    let plain = match peer.session.unwrap(payload) {
        Ok(plain) => plain,
        Err(err) => {
            debug!(peer = %id, %err, "session refused frame");
            return InboundOutcome::SessionRejected;
        }
    };
    peer.bytes_in += plain.len() as u64;
    let session_state = peer.session.state();

    if peer.state < PeerState::Established {
        // Peer states track session states through the handshake.
        peer.state = PeerState::from_session(session_state);
        if let Some(key) = peer.session.remote_public_key() {
            peer.addr.key = key;
            peer.addr.ip6 = mesh_addr_for_key(&key);
        }

        if session_state == SessionState::Established {
            relocate_if_needed(link, switch, locator, id, actions);
            let idx = link
                .peers
                .position_of_id(id)
                .expect("peer present after relocation");
            let peer = link.peers.get_at(idx);
            info!(peer = %id, addr = %peer.addr, "session established");
            actions.push(publish(PeerEventKind::Peer, peer.addr));
            actions.push(Action::DeliverToSwitch { peer: id, frame: plain });
            return InboundOutcome::Delivered;
        }

        // Replay defense: until the session is established, only frames
        // whose switch label terminates here may pass upward.
        if !routes_to_self(&plain) {
            info!(peer = %id, "DROP message, session not yet established");
            return InboundOutcome::Dropped;
        }
        // The remote router cannot route to us until it has seen
        // inter-router traffic from us; ping so its response teaches it.
        // The rate cap bounds what a replayed frame can trigger.
        if should_probe_during_handshake(peer.ping_count) {
            send_ping(peer, tuning.ping_timeout_ms, actions);
        }
        actions.push(Action::DeliverToSwitch { peer: id, frame: plain });
        return InboundOutcome::Delivered;
    }

    if peer.state == PeerState::Unresponsive && session_state == SessionState::Established {
        peer.state = PeerState::Established;
    } else {
        peer.time_of_last_message = now;
    }
    actions.push(Action::DeliverToSwitch { peer: id, frame: plain });
    InboundOutcome::Delivered
}

/// On reaching Established, merge with any older peer on the same link
/// that carries the same public key: the new peer takes over the old
/// switch slot (so the mesh keeps routing on the old label across a
/// rekey or reconnect) and the old peer is destroyed.
fn relocate_if_needed(
    link: &mut LinkIface,
    switch: &mut dyn SwitchCore,
    locator: &mut HashMap<PeerId, IfNum>,
    id: PeerId,
    actions: &mut Vec<Action>,
) {
    let my_idx = link.peers.position_of_id(id).expect("relocating peer exists");
    let key = link.peers.get_at(my_idx).addr.key;
    debug!(peer = %id, "checking for old sessions to merge with");

    let old_idx = (0..link.peers.len())
        .find(|&i| i != my_idx && link.peers.get_at(i).addr.key == key);
    let Some(old_idx) = old_idx else { return };

    let old = link.peers.get_at(old_idx);
    let (old_id, old_path) = (old.id, old.addr.path);
    info!(new = %id, old = %old_id, path = %old_path, "relocating peer onto existing switch slot");

    link.peers.get_at_mut(my_idx).addr.path = old_path;
    switch.swap_interfaces(old_id, id);
    // The old peer now holds the new (disposable) slot; freeing it after
    // the swap is what keeps the surviving label alive.
    destroy_peer_at(link, switch, locator, old_idx, actions);
}

/// A broadcast frame arrived: someone is advertising themselves.
#[allow(clippy::too_many_arguments)]
fn handle_beacon(
    link: &mut LinkIface,
    sessions: &mut dyn SessionEngine,
    switch: &mut dyn SwitchCore,
    locator: &mut HashMap<PeerId, IfNum>,
    tuning: &Tuning,
    local: &Beacon,
    next_peer_id: &mut u64,
    addr_bytes: &[u8],
    payload: &[u8],
    now: Millis,
    actions: &mut Vec<Action>,
) {
    if !link.beacon_mode.accepts() {
        debug!(link = %link.name, "dropping beacon, beaconing disabled");
        return;
    }
    let beacon = match Beacon::decode(payload) {
        Ok(beacon) => beacon,
        Err(err) => {
            debug!(link = %link.name, %err, "dropping runt beacon");
            return;
        }
    };

    let ip6 = mesh_addr_for_key(&beacon.public_key);
    if !is_valid_mesh_addr(&ip6) || beacon.public_key == local.public_key {
        debug!(link = %link.name, %ip6, "beacon with invalid key");
        return;
    }
    if !is_compatible(beacon.version, CURRENT_PROTOCOL) {
        debug!(
            link = %link.name,
            their_version = beacon.version,
            our_version = CURRENT_PROTOCOL,
            "DROP beacon with incompatible version"
        );
        return;
    }

    let lladdr = LinkAddr::from(addr_bytes);
    if let Some(idx) = link.peers.position_of(&lladdr) {
        // The password might have changed.
        link.peers.get_at_mut(idx).session.set_auth(&beacon.password);
        return;
    }

    *next_peer_id += 1;
    let id = PeerId(*next_peer_id);
    let mut session = sessions.open_outbound(beacon.public_key);
    session.set_auth(&beacon.password);
    let addr = NodeAddr {
        key: beacon.public_key,
        ip6,
        path: PathLabel::UNASSIGNED,
        version: beacon.version,
    };
    let idx = link.peers.insert(Peer::new(
        id,
        lladdr,
        addr,
        session,
        true,
        now,
        tuning.ping_after_ms,
    ));
    match switch.add_interface(id) {
        Ok(label) => link.peers.get_at_mut(idx).addr.path = label,
        Err(err) => {
            debug!(link = %link.name, %err, "switch rejected beacon peer");
            link.peers.remove_at(idx);
            return;
        }
    }
    locator.insert(id, link.ifnum);

    let peer = link.peers.get_at(idx);
    info!(peer = %id, addr = %peer.addr, "added peer from beacon");
    // An outgoing session toward the advertised key: relocation will
    // never move it, so announcing before the handshake is sound.
    actions.push(publish(PeerEventKind::Peer, peer.addr));
}

/// A frame from an lladdr we have never seen — possibly someone
/// answering our beacon. Admit a speculative peer and feed it the frame;
/// if the session wants nothing to do with it, the frame was stray noise
/// and the peer is dropped again.
#[allow(clippy::too_many_arguments)]
fn handle_unknown_source(
    link: &mut LinkIface,
    sessions: &mut dyn SessionEngine,
    switch: &mut dyn SwitchCore,
    locator: &mut HashMap<PeerId, IfNum>,
    tuning: &Tuning,
    next_peer_id: &mut u64,
    lladdr: LinkAddr,
    payload: &[u8],
    now: Millis,
    actions: &mut Vec<Action>,
) {
    *next_peer_id += 1;
    let id = PeerId(*next_peer_id);
    let session = sessions.open_inbound();
    let idx = link.peers.insert(Peer::new(
        id,
        lladdr,
        NodeAddr::unknown(),
        session,
        true,
        now,
        tuning.ping_after_ms,
    ));
    match switch.add_interface(id) {
        Ok(label) => link.peers.get_at_mut(idx).addr.path = label,
        Err(err) => {
            debug!(link = %link.name, %err, "switch rejected unknown-source peer");
            link.peers.remove_at(idx);
            return;
        }
    }
    locator.insert(id, link.ifnum);
    info!(link = %link.name, peer = %id, "adding peer with unknown key");

    let outcome = peer_inbound(link, switch, locator, tuning, idx, payload, now, actions);
    if outcome == InboundOutcome::SessionRejected {
        // Probably some random crap that wandered into the socket.
        debug!(peer = %id, "first frame rejected, dropping speculative peer");
        discard_speculative(link, switch, locator, id);
    }
}

/// One link's share of the ping tick: scan from a random offset, handle
/// the first candidate, stop.
fn link_ping_tick(
    link: &mut LinkIface,
    switch: &mut dyn SwitchCore,
    locator: &mut HashMap<PeerId, IfNum>,
    rng: &mut dyn RngCore,
    tuning: &Tuning,
    now: Millis,
    actions: &mut Vec<Action>,
) {
    let count = link.peers.len();
    if count == 0 {
        return;
    }
    let start = rng.next_u32() as usize % count;
    for step in 0..count {
        let idx = (start + step) % count;
        let (candidate, is_incoming, last_message, lag) = {
            let p = link.peers.get_at(idx);
            (
                is_ping_candidate_at(
                    now,
                    p.time_of_last_message,
                    p.time_of_last_ping,
                    tuning.ping_after_ms,
                ),
                p.is_incoming,
                p.time_of_last_message,
                now - p.time_of_last_message,
            )
        };
        if !candidate {
            continue;
        }

        if should_forget_at(is_incoming, now, last_message, tuning.forget_after_ms) {
            info!(
                peer = %link.peers.get_at(idx).id(),
                silent_s = (now - last_message) / 1024,
                "unresponsive incoming peer has not responded, dropping connection"
            );
            destroy_peer_at(link, switch, locator, idx, actions);
            return;
        }

        let peer = link.peers.get_at_mut(idx);
        if is_unresponsive_at(now, last_message, tuning.unresponsive_after_ms) {
            if peer.state == PeerState::Established {
                // Our link to the peer is broken.
                peer.state = PeerState::Unresponsive;
                actions.push(publish(PeerEventKind::PeerGone, peer.addr));
            }
            // Skip most pings while they're really down.
            if should_ping_while_down(peer.ping_count) {
                debug!(peer = %peer.id, lag_s = lag / 1024, "pinging unresponsive peer");
                send_ping(peer, tuning.ping_timeout_ms, actions);
            } else {
                peer.ping_count += 1;
            }
        } else {
            debug!(peer = %peer.id, lag_s = lag / 1024, "pinging lazy peer");
            send_ping(peer, tuning.ping_timeout_ms, actions);
        }
        // One candidate per link per tick.
        return;
    }
}
