//! Mesh Scenarios - end-to-end behaviour through the service handle
//!
//! # Test Scenarios
//!
//! 1. **Three-node formation**: auto-linking yields a connected triangle
//! 2. **Chain delivery**: A to C over B resolves after 100 ms of virtual time
//! 3. **Absent recipient**: immediate drop with a failure notice to the sender
//! 4. **Location broadcast**: topology update precedes the message
//! 5. **Traffic-driven assessment**: drops push the mesh to CRITICAL

use crate::test_utils::{bfs_distances, elapse, NoAutoLinks, TestMesh};
use guardiangrid_core::MeshSettings;
use guardiangrid_mesh::{
    GeoLocation, LocationContent, MeshEvent, MessagePayload, NodeHandle, RandomSelector,
    RiskLevel, SendOutcome, TextContent, BROADCAST,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde_json::json;

#[tokio::test(start_paused = true)]
async fn test_three_node_registration_forms_triangle() {
    for seed in 0..8 {
        let t = TestMesh::start(Box::new(RandomSelector::seeded(seed)));
        let a = t.mesh.register("A", NodeHandle::new("ha")).await.unwrap();
        let b = t.mesh.register("B", NodeHandle::new("hb")).await.unwrap();
        let c = t.mesh.register("C", NodeHandle::new("hc")).await.unwrap();

        assert!(a.neighbors.is_empty());
        assert_eq!(b.neighbors, vec![a.id.clone()]);
        assert_eq!(c.neighbors.len(), 2);

        let topology = t.mesh.topology().await.unwrap();
        let edges: usize = topology.iter().map(|n| n.neighbors.len()).sum::<usize>() / 2;
        assert_eq!(edges, 3);
        assert_eq!(bfs_distances(&topology, &a.id).len(), 3);
        t.stop().await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_chain_delivery_after_route_latency() {
    let t = TestMesh::start(Box::new(NoAutoLinks));
    t.chain(&["a", "b", "c"]).await;

    let outcome = t
        .mesh
        .send("a", "c", MessagePayload::direct("check in"))
        .await
        .unwrap();
    let route = match outcome {
        SendOutcome::Scheduled { route, .. } => route,
        other => panic!("Expected scheduled delivery, got {:?}", other),
    };
    assert_eq!(route.path, vec!["a", "b", "c"]);
    assert_eq!(route.hops, 2);
    assert_eq!(route.estimated_latency, 100);

    // In flight: counted but not yet resolved
    elapse(99).await;
    let (counters, pending) = t.mesh.counters().await.unwrap();
    assert_eq!(counters.total_messages, 1);
    assert_eq!(counters.delivered_messages + counters.dropped_messages, 0);
    assert_eq!(pending, 1);
    assert!(t.inbox("c").is_empty());

    elapse(2).await;
    let (counters, pending) = t.mesh.counters().await.unwrap();
    assert_eq!(counters.delivered_messages, 1);
    assert_eq!(counters.accumulated_latency_ms, 100);
    assert_eq!(pending, 0);

    let inbox = t.inbox("c");
    assert!(matches!(
        inbox.as_slice(),
        [MeshEvent::MessageDelivered(packet)] if packet.path == vec!["a", "b", "c"]
    ));

    let stats = t.mesh.stats().await.unwrap().stats;
    assert_eq!(stats.delivery_success_rate, 1.0);
    assert_eq!(stats.average_latency, 100.0);
    t.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_absent_recipient_dropped_immediately() {
    let t = TestMesh::start(Box::new(NoAutoLinks));
    t.chain(&["a", "b"]).await;

    let outcome = t
        .mesh
        .send("a", "c", MessagePayload::direct("anyone?"))
        .await
        .unwrap();
    assert!(outcome.is_dropped());

    let (counters, pending) = t.mesh.counters().await.unwrap();
    assert_eq!(counters.total_messages, 1);
    assert_eq!(counters.dropped_messages, 1);
    assert_eq!(pending, 0);
    assert_eq!(
        t.inbox("a"),
        vec![MeshEvent::MessageFailed {
            to: "c".into(),
            reason: "No route".into(),
        }]
    );
    t.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_recipient_leaving_in_flight_is_dropped() {
    let t = TestMesh::start(Box::new(NoAutoLinks));
    t.chain(&["a", "b", "c"]).await;

    t.mesh.send("a", "c", MessagePayload::direct("x")).await.unwrap();
    elapse(40).await;
    t.mesh.disconnect("c").await.unwrap();
    elapse(100).await;

    let (counters, _) = t.mesh.counters().await.unwrap();
    assert_eq!(counters.dropped_messages, 1);
    assert_eq!(counters.delivered_messages, 0);
    assert_eq!(counters.total_messages, 1);
    t.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_location_broadcast_updates_topology_first() {
    let t = TestMesh::start(Box::new(NoAutoLinks));
    t.add("a").await;
    t.add("b").await;
    t.transport.clear();

    let position = GeoLocation {
        lat: 37.77,
        lng: -122.42,
    };
    let outcome = t
        .mesh
        .send(
            "a",
            BROADCAST,
            MessagePayload::Location(LocationContent {
                location: Some(position),
                timestamp: None,
            }),
        )
        .await
        .unwrap();
    assert!(matches!(outcome, SendOutcome::Broadcast { .. }));

    let events = t.transport.events();
    let topology_at = events
        .iter()
        .position(|e| match e {
            MeshEvent::TopologyChanged(nodes) => {
                nodes.iter().any(|n| n.location == Some(position))
            }
            _ => false,
        })
        .expect("topology update");
    let message_at = events
        .iter()
        .position(|e| matches!(e, MeshEvent::MessageDelivered(_)))
        .expect("message");
    assert!(topology_at < message_at);

    let topology = t.mesh.topology().await.unwrap();
    assert_eq!(topology[0].location, Some(position));
    t.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_broadcast_reaches_disconnected_islands() {
    let t = TestMesh::start(Box::new(NoAutoLinks));
    t.add("a").await;
    t.add("island").await;

    t.mesh
        .send("a", BROADCAST, MessagePayload::Sos(TextContent { text: "help".into() }))
        .await
        .unwrap();

    let (counters, pending) = t.mesh.counters().await.unwrap();
    assert_eq!(counters.delivered_messages, 1);
    assert_eq!(pending, 0);
    assert!(t
        .transport
        .envelopes()
        .iter()
        .any(|e| matches!(e.event, MeshEvent::MessageDelivered(_))));
    t.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_assessment_follows_traffic() {
    let t = TestMesh::start(Box::new(NoAutoLinks));
    t.chain(&["a", "b"]).await;
    assert_eq!(t.mesh.stats().await.unwrap().insight.risk_level, RiskLevel::Low);

    for _ in 0..3 {
        t.mesh.send("a", "ghost", MessagePayload::direct("?")).await.unwrap();
    }
    let proof = t.mesh.proof().await.unwrap();
    assert_eq!(proof.report.insight.risk_level, RiskLevel::Critical);
    assert_eq!(proof.report.stats.packet_drop_rate, 1.0);
    assert_eq!(proof.topology.len(), 2);
    t.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_wire_sends_through_handle() {
    let t = TestMesh::start(Box::new(NoAutoLinks));
    t.chain(&["a", "b"]).await;

    let outcome = t
        .mesh
        .send_wire(
            "a",
            BROADCAST,
            "RESOURCE",
            json!({"resourceType": "WATER", "urgency": "HIGH"}),
        )
        .await
        .unwrap();
    assert!(matches!(outcome, SendOutcome::Broadcast { .. }));

    assert!(t.mesh.send_wire("a", "b", "TELEPORT", json!(null)).await.is_err());
    let (counters, _) = t.mesh.counters().await.unwrap();
    assert_eq!(counters.total_messages, 1);
    assert!(t
        .inbox("a")
        .iter()
        .any(|e| matches!(
            e,
            MeshEvent::MessageFailed { reason, .. } if reason == "Unsupported message type"
        )));
    t.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_pending_bound_drops_overflow() {
    let settings = MeshSettings {
        max_pending_deliveries: Some(1),
        ..MeshSettings::default()
    };
    let t = TestMesh::start_with(settings, Box::new(NoAutoLinks));
    t.chain(&["a", "b"]).await;

    let first = t.mesh.send("a", "b", MessagePayload::direct("1")).await.unwrap();
    let second = t.mesh.send("a", "b", MessagePayload::direct("2")).await.unwrap();
    assert!(matches!(first, SendOutcome::Scheduled { .. }));
    assert!(matches!(second, SendOutcome::QueueFull { .. }));

    elapse(60).await;
    let (counters, pending) = t.mesh.counters().await.unwrap();
    assert_eq!(counters.delivered_messages, 1);
    assert_eq!(counters.dropped_messages, 1);
    assert_eq!(pending, 0);
    t.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_connect_is_symmetric_and_idempotent() {
    let t = TestMesh::start(Box::new(NoAutoLinks));
    t.add("a").await;
    t.add("b").await;

    assert!(t.mesh.connect("a", "b").await.unwrap());
    assert!(!t.mesh.connect("b", "a").await.unwrap());
    assert!(!t.mesh.connect("a", "b").await.unwrap());

    let topology = t.mesh.topology().await.unwrap();
    assert_eq!(topology[0].neighbors, vec!["b"]);
    assert_eq!(topology[1].neighbors, vec!["a"]);
    t.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_routes_are_shortest_on_random_graphs() {
    let mut rng = StdRng::seed_from_u64(2024);
    for _ in 0..5 {
        let t = TestMesh::start(Box::new(NoAutoLinks));
        let ids: Vec<String> = (0..10).map(|i| format!("n{i}")).collect();
        for id in &ids {
            t.add(id).await;
        }
        for _ in 0..14 {
            let a = &ids[rng.gen_range(0..ids.len())];
            let b = &ids[rng.gen_range(0..ids.len())];
            if a != b {
                t.mesh.connect(a, b).await.unwrap();
            }
        }

        let topology = t.mesh.topology().await.unwrap();
        let distances = bfs_distances(&topology, &ids[0]);
        for target in &ids[1..] {
            let outcome = t
                .mesh
                .send(&ids[0], target.as_str(), MessagePayload::direct("route check"))
                .await
                .unwrap();
            match (outcome, distances.get(target)) {
                (SendOutcome::Scheduled { route, .. }, Some(&expected)) => {
                    assert_eq!(route.hops, expected);
                    assert_eq!(route.estimated_latency, expected as u64 * 50);
                }
                (SendOutcome::NoRoute { .. }, None) => {}
                (outcome, expected) => {
                    panic!("Mismatch for {target}: {:?} vs {:?}", outcome, expected)
                }
            }
        }
        t.stop().await;
    }
}
