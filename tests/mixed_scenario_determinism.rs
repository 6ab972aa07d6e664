// fabricsim: discrete-event packet-level network simulator for AI-factory leaf/spine fabrics.
use fabricsim::config::{AiFactorySuConfig, BandwidthConfig, LinksConfig, RoutingConfig, TopologyConfig};
use fabricsim::network::Network;
use fabricsim::scenario::mixed::{self, MixedParams};
use fabricsim::topology_su;

fn topology_config() -> TopologyConfig {
    TopologyConfig {
        kind: "ai-factory-su".into(),
        max_path: 4,
        mtu: 1500,
        ttl: 64,
        seed: 9,
        routing: RoutingConfig { mode: "ecmp".into(), ecmp_flowlet_n_packets: 0 },
        links: LinksConfig {
            failure_percent: 0.0,
            bandwidth_bps: BandwidthConfig { server_to_leaf: 1e9, leaf_to_spine: 4e9 },
        },
        ai_factory_su: AiFactorySuConfig {
            leaves: 2,
            spines: 2,
            servers_per_leaf: 4,
            server_parallel_links: 1,
            leaf_to_spine_parallel_links: 1,
        },
    }
}

fn run_once() -> (Option<String>, Option<String>) {
    let mut net = Network::new();
    let topo = topology_config();
    let built = topology_su::build(&mut net, 0, &topo, topo.seed);
    let mut hosts = built.hosts;
    hosts.sort_by_key(|&h| net.nodes[h].name.clone());

    let params = MixedParams {
        steps: 1,
        seed: 13,
        micro_collectives: 1,
        micro_collective_bytes: 4096,
        dp_sync_bytes: 8192,
        pipeline_microbatch_bytes: 2048,
        compute_front: 0.0002,
        compute_gap: 0.0001,
        compute_tail: 0.0002,
        pipeline_compute: 0.0001,
        ring_gap: 0.0,
        allocation_mode: "contiguous".to_string(),
        stage_placement_mode: "topology_aware".to_string(),
        record_first_step_flow_signatures: true,
        mice: None,
    };
    let built = mixed::build(&mut net, hosts, &params).unwrap();
    net.run();
    (built.tp_heavy_first_step_signature, built.pp_dp_first_step_signature)
}

#[test]
fn identical_seed_yields_identical_first_step_signatures_for_both_jobs() {
    let (tp_a, pp_a) = run_once();
    let (tp_b, pp_b) = run_once();
    assert!(tp_a.is_some());
    assert!(pp_a.is_some());
    assert_eq!(tp_a, tp_b);
    assert_eq!(pp_a, pp_b);
}
