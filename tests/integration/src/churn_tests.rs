//! Churn Tests - counter convergence while nodes come and go
//!
//! Random joins, links, sends and departures are interleaved with virtual
//! time. Whatever happens in between, once every scheduled delivery has
//! resolved each accepted send is counted exactly once as delivered or
//! dropped.

use crate::test_utils::{elapse, TestMesh};
use guardiangrid_mesh::{MessagePayload, NodeHandle, RandomSelector, TextContent, BROADCAST};
use rand::{rngs::StdRng, Rng, SeedableRng};

#[tokio::test(start_paused = true)]
async fn test_counters_converge_under_churn() {
    for seed in [3u64, 17, 91] {
        let mut rng = StdRng::seed_from_u64(seed);
        let t = TestMesh::start(Box::new(RandomSelector::seeded(seed)));
        let mut live: Vec<String> = Vec::new();

        for step in 0..200 {
            match rng.gen_range(0..6) {
                0 | 1 if live.len() < 12 => {
                    let node = t
                        .mesh
                        .register("", NodeHandle::new(format!("client-{step}")))
                        .await
                        .unwrap();
                    assert!(node.name.starts_with("Node-"));
                    live.push(node.id);
                }
                2 if live.len() > 3 => {
                    let gone = live.swap_remove(rng.gen_range(0..live.len()));
                    assert!(t.mesh.disconnect(&gone).await.unwrap().is_some());
                }
                3 if live.len() >= 2 => {
                    let from = &live[rng.gen_range(0..live.len())];
                    let payload = MessagePayload::Chat(TextContent { text: "hi".into() });
                    t.mesh.send(from, BROADCAST, payload).await.unwrap();
                }
                _ if live.len() >= 2 => {
                    let from = live[rng.gen_range(0..live.len())].clone();
                    let to = live[rng.gen_range(0..live.len())].clone();
                    t.mesh.send(&from, to, MessagePayload::direct("ping")).await.unwrap();
                }
                _ => {}
            }

            let stats = t.mesh.stats().await.unwrap().stats;
            assert!((0.0..=1.0).contains(&stats.delivery_success_rate));
            assert!((0.0..=1.0).contains(&stats.packet_drop_rate));

            elapse(rng.gen_range(0..80)).await;
        }

        // Longest possible route is 11 hops
        elapse(1_000).await;
        let (counters, pending) = t.mesh.counters().await.unwrap();
        assert_eq!(pending, 0);
        assert_eq!(
            counters.total_messages,
            counters.delivered_messages + counters.dropped_messages
        );
        t.stop().await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_auto_connect_edge_counts() {
    let t = TestMesh::start(Box::new(RandomSelector::seeded(5)));
    let mut expected_edges = 0;
    for n in 1..=15usize {
        let node = t
            .mesh
            .register(&format!("N{n}"), NodeHandle::new(format!("h{n}")))
            .await
            .unwrap();
        assert_eq!(node.neighbors.len(), 3.min(n - 1));
        assert!(!node.neighbors.contains(&node.id));
        expected_edges += 3.min(n - 1);
    }

    let topology = t.mesh.topology().await.unwrap();
    let edges: usize = topology.iter().map(|n| n.neighbors.len()).sum::<usize>() / 2;
    assert_eq!(edges, expected_edges);
    t.stop().await;
}
