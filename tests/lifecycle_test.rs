//! Connection lifecycle scenario tests
//!
//! End-to-end scenarios over the coordinator, driven without a live
//! transport: each test registers connections through plain channels and
//! observes exactly what their writer tasks would have received.

use huddle::shared::ServerEvent;
use huddle::{ClientSignal, ConnectionId, Coordinator, CoordinatorError, RoomId, UserId};
use pretty_assertions::assert_eq;
use tokio::sync::mpsc::{self, UnboundedReceiver};

fn connect(coordinator: &Coordinator) -> (ConnectionId, UnboundedReceiver<ServerEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (coordinator.connect(tx), rx)
}

fn drain(rx: &mut UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn presence_syncs(events: &[ServerEvent]) -> Vec<Vec<UserId>> {
    events
        .iter()
        .filter_map(|event| match event {
            ServerEvent::PresenceSync {
                online_user_ids, ..
            } => Some(online_user_ids.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn unregistered_connection_disappears_from_user_lookup() {
    let coordinator = Coordinator::new();
    let user = UserId::from("u1");
    let (a, _rx_a) = connect(&coordinator);
    let (b, _rx_b) = connect(&coordinator);
    coordinator.identify(a, user.clone()).unwrap();
    coordinator.identify(b, user.clone()).unwrap();

    coordinator.disconnect(a);

    assert_eq!(coordinator.registry().connections_for_user(&user), vec![b]);
}

#[test]
fn disconnect_removes_connection_from_every_room() {
    let coordinator = Coordinator::new();
    let (conn, _rx) = connect(&coordinator);
    let (peer, _rx_peer) = connect(&coordinator);
    coordinator.identify(conn, UserId::from("u1")).unwrap();
    coordinator.identify(peer, UserId::from("u2")).unwrap();

    let rooms: Vec<RoomId> = (0..8)
        .map(|i| RoomId::new(format!("conversation:{}", i)))
        .collect();
    for room in &rooms {
        coordinator.join_room(conn, room.clone()).unwrap();
    }
    // Peer shares the first room so it outlives the disconnect
    coordinator.join_room(peer, rooms[0].clone()).unwrap();

    coordinator.disconnect(conn);

    for room in &rooms {
        assert!(
            !coordinator.rooms().members_of(room).contains(&conn),
            "connection still member of {}",
            room
        );
    }
    assert!(coordinator.rooms().is_member(&rooms[0], peer));
}

#[test]
fn typing_broadcast_excludes_the_sender() {
    let coordinator = Coordinator::new();
    let room = RoomId::from("conversation:1");
    let (a, mut rx_a) = connect(&coordinator);
    let (b, mut rx_b) = connect(&coordinator);
    let (c, mut rx_c) = connect(&coordinator);
    for (conn, name) in [(a, "alice"), (b, "bob"), (c, "cleo")] {
        coordinator.identify(conn, UserId::from(name)).unwrap();
        coordinator.join_room(conn, room.clone()).unwrap();
    }
    drain(&mut rx_a);
    drain(&mut rx_b);
    drain(&mut rx_c);

    coordinator
        .handle_signal(
            a,
            ClientSignal::TypingStart {
                room_id: room.clone(),
            },
        )
        .unwrap();

    let expected = ServerEvent::typing(UserId::from("alice"), room, true);
    assert_eq!(drain(&mut rx_a), Vec::<ServerEvent>::new());
    assert_eq!(drain(&mut rx_b), vec![expected.clone()]);
    assert_eq!(drain(&mut rx_c), vec![expected]);
}

#[test]
fn multi_device_user_emits_exactly_two_presence_broadcasts() {
    let coordinator = Coordinator::new();

    // An observer watches the broadcasts caused by u's device churn
    let (observer, mut rx_obs) = connect(&coordinator);
    coordinator.identify(observer, UserId::from("watcher")).unwrap();
    drain(&mut rx_obs);

    let user = UserId::from("u");
    let (a, _rx_a) = connect(&coordinator);
    coordinator.identify(a, user.clone()).unwrap(); // 0 -> 1: broadcast
    let (b, _rx_b) = connect(&coordinator);
    coordinator.identify(b, user.clone()).unwrap(); // count = 2: silent
    coordinator.disconnect(a); // count = 1: silent
    coordinator.disconnect(b); // 1 -> 0: broadcast

    let snapshots = presence_syncs(&drain(&mut rx_obs));
    assert_eq!(
        snapshots,
        vec![
            vec![UserId::from("u"), UserId::from("watcher")],
            vec![UserId::from("watcher")],
        ]
    );
}

#[test]
fn join_before_identify_is_rejected_and_changes_nothing() {
    let coordinator = Coordinator::new();
    let room = RoomId::from("conversation:5");
    let (conn, _rx) = connect(&coordinator);

    let result = coordinator.handle_signal(
        conn,
        ClientSignal::RoomJoin {
            room_id: room.clone(),
        },
    );

    assert!(matches!(
        result,
        Err(CoordinatorError::IdentifyRequired {
            signal: "room:join"
        })
    ));
    assert!(coordinator.rooms().members_of(&room).is_empty());
}

#[test]
fn leave_of_unjoined_room_is_a_noop() {
    let coordinator = Coordinator::new();
    let room = RoomId::from("conversation:1");
    let (member, _rx_m) = connect(&coordinator);
    let (other, _rx_o) = connect(&coordinator);
    coordinator.identify(member, UserId::from("u1")).unwrap();
    coordinator.identify(other, UserId::from("u2")).unwrap();
    coordinator.join_room(member, room.clone()).unwrap();

    coordinator.leave_room(other, room.clone()).unwrap();

    let expected: std::collections::HashSet<ConnectionId> = [member].into_iter().collect();
    assert_eq!(coordinator.rooms().members_of(&room), expected);
}

#[test]
fn double_join_leaves_membership_unchanged() {
    let coordinator = Coordinator::new();
    let room = RoomId::from("tournament:3");
    let (conn, _rx) = connect(&coordinator);
    coordinator.identify(conn, UserId::from("u1")).unwrap();

    coordinator.join_room(conn, room.clone()).unwrap();
    let once = coordinator.rooms().members_of(&room);
    coordinator.join_room(conn, room.clone()).unwrap();
    let twice = coordinator.rooms().members_of(&room);

    assert_eq!(once, twice);
}

#[test]
fn reconnection_storm_settles_clean() {
    // Churn one user through repeated connect/identify/disconnect cycles
    // and check nothing leaks and the final snapshot is empty.
    let coordinator = Coordinator::new();
    let user = UserId::from("flaky");
    let room = RoomId::from("conversation:1");

    for _ in 0..50 {
        let (conn, _rx) = connect(&coordinator);
        coordinator.identify(conn, user.clone()).unwrap();
        coordinator.join_room(conn, room.clone()).unwrap();
        coordinator.disconnect(conn);
    }

    assert!(!coordinator.presence().is_online(&user));
    assert!(coordinator.registry().connections_for_user(&user).is_empty());
    assert_eq!(coordinator.rooms().room_count(), 0);
    assert!(coordinator.presence().last_seen(&user).is_some());
}
