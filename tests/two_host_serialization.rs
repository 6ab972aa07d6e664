// fabricsim: discrete-event packet-level network simulator for AI-factory leaf/spine fabrics.
use fabricsim::config::{AiFactorySuConfig, BandwidthConfig, LinksConfig, RoutingConfig, TopologyConfig};
use fabricsim::ip::Ipv4Addr;
use fabricsim::network::Network;
use fabricsim::node::RoutingMode;
use fabricsim::packet::Protocol;

fn topology_config() -> TopologyConfig {
    TopologyConfig {
        kind: "ai-factory-su".into(),
        max_path: 4,
        mtu: 1500,
        ttl: 64,
        seed: 0,
        routing: RoutingConfig { mode: "ecmp".into(), ecmp_flowlet_n_packets: 0 },
        links: LinksConfig {
            failure_percent: 0.0,
            bandwidth_bps: BandwidthConfig { server_to_leaf: 1e9, leaf_to_spine: 4e9 },
        },
        ai_factory_su: AiFactorySuConfig {
            leaves: 1,
            spines: 1,
            servers_per_leaf: 1,
            server_parallel_links: 1,
            leaf_to_spine_parallel_links: 1,
        },
    }
}

#[test]
fn two_back_to_back_sends_over_a_1mbps_link() {
    let mut net = Network::new();
    let h0 = net.create_host("h0", Ipv4Addr::new(10, 0, 0, 1), RoutingMode::StaticHash, 1500, 64, 1);
    let h1 = net.create_host("h1", Ipv4Addr::new(10, 0, 0, 2), RoutingMode::StaticHash, 1500, 64, 2);
    let p0 = net.add_port(h0);
    let p1 = net.add_port(h1);
    let link = net.create_link("l0", 1_000_000.0, 0.0);
    net.connect(h0, p0, link).unwrap();
    net.connect(h1, p1, link).unwrap();
    net.install_route(h0, "10.0.0.2/32".parse().unwrap(), p0);
    net.install_route(h1, "10.0.0.1/32".parse().unwrap(), p1);

    let dst = net.host_ip(h1);
    net.host_send(h0, 1, dst, 1000, 2000, 1000, Protocol::Tcp);
    net.host_send(h0, 2, dst, 1000, 2000, 1000, Protocol::Tcp);
    net.run();

    let topo = topology_config();
    let summary = fabricsim::result::build(&net, 2, 0, 0, &topo, "ai-factory-su-workload1-dp-heavy");
    assert_eq!(summary.packets.delivered_count, 2);
    assert_eq!(summary.packets.total_count, 2);
    assert!((summary.end_time - 0.016).abs() < 1e-9);
}
