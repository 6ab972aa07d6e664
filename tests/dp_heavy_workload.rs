// fabricsim: discrete-event packet-level network simulator for AI-factory leaf/spine fabrics.
use fabricsim::config::{AiFactorySuConfig, BandwidthConfig, LinksConfig, RoutingConfig, TopologyConfig};
use fabricsim::network::Network;
use fabricsim::scenario::dp_heavy::{self, DpHeavyParams};
use fabricsim::topology_su;

fn topology_config() -> TopologyConfig {
    TopologyConfig {
        kind: "ai-factory-su".into(),
        max_path: 4,
        mtu: 1500,
        ttl: 64,
        seed: 3,
        routing: RoutingConfig { mode: "ecmp".into(), ecmp_flowlet_n_packets: 0 },
        links: LinksConfig {
            failure_percent: 0.0,
            bandwidth_bps: BandwidthConfig { server_to_leaf: 1e9, leaf_to_spine: 4e9 },
        },
        ai_factory_su: AiFactorySuConfig {
            leaves: 2,
            spines: 2,
            servers_per_leaf: 2,
            server_parallel_links: 1,
            leaf_to_spine_parallel_links: 1,
        },
    }
}

#[test]
fn five_steps_two_buckets_deliver_every_packet_with_no_drops() {
    let mut net = Network::new();
    let topo = topology_config();
    let built = topology_su::build(&mut net, 0, &topo, topo.seed);
    assert_eq!(built.hosts.len(), 4);

    let mut hosts = built.hosts;
    hosts.sort_by_key(|&h| net.nodes[h].name.clone());

    let params = DpHeavyParams {
        steps: 5,
        seed: 42,
        bytes_per_participant: 1 << 20,
        fwd_bwd_compute: 0.001,
        optimizer_compute: 0.0005,
        ring_gap: 0.0,
        record_first_step_flow_signatures: true,
        mice: None,
    };
    dp_heavy::build(&mut net, hosts, &params).unwrap();
    net.run();

    assert_eq!(net.job_metrics.len(), 1);
    let job = &net.job_metrics[0];
    assert_eq!(job.steps.len(), 5);
    for step in &job.steps {
        assert!(step.end_time > step.start_time);
    }
    for w in job.steps.windows(2) {
        assert!(w[1].start_time >= w[0].end_time);
    }

    assert_eq!(net.stats.total_count, net.stats.delivered_count);
    assert_eq!(net.stats.dropped_count, 0);
    assert!(net.stats.total_count > 0);
}
