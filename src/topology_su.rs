// fabricsim: discrete-event packet-level network simulator for AI-factory leaf/spine fabrics.
//! Builds the one supported fabric shape: a single scale-unit leaf/spine pod, with its
//! address plan and per-host/per-leaf/per-spine routes installed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::TopologyConfig;
use crate::ip::Ipv4Addr;
use crate::node::RoutingMode;
use crate::network::Network;

pub struct BuiltTopology {
    pub hosts: Vec<usize>,
    pub switches: Vec<usize>,
    pub link_ids: Vec<usize>,
    pub failed_link_count: usize,
}

/// Constructs the `ai-factory-su` topology on `net` per `pod`, installing routes as it goes.
/// `pod` distinguishes multiple scale units sharing one `Network`; callers that build a
/// single pod pass 0.
pub fn build(net: &mut Network, pod: u8, topology: &TopologyConfig, seed: u64) -> BuiltTopology {
    let routing = &topology.routing;
    let links = &topology.links;
    let su = &topology.ai_factory_su;
    let routing_mode = RoutingMode::parse(&routing.mode).expect("routing.mode validated at config load");
    let mut rng = StdRng::seed_from_u64(seed);

    let mut hosts = Vec::with_capacity((su.leaves * su.servers_per_leaf) as usize);
    let mut switches = Vec::with_capacity((su.leaves + su.spines) as usize);
    let mut link_ids = Vec::new();
    let mut failed_link_count = 0usize;

    let mut leaves = Vec::with_capacity(su.leaves as usize);
    for l in 0..su.leaves {
        let name = format!("su{pod}_leaf{l}");
        let leaf = net.create_switch(&name, routing_mode, seed.wrapping_add(l as u64));
        leaves.push(leaf);
        switches.push(leaf);
    }
    let mut spines = Vec::with_capacity(su.spines as usize);
    for p in 0..su.spines {
        let name = format!("su{pod}_spine{p}");
        let spine = net.create_switch(&name, routing_mode, seed.wrapping_add(1000 + p as u64));
        spines.push(spine);
        switches.push(spine);
    }

    for (l, &leaf) in leaves.iter().enumerate() {
        for s in 0..su.servers_per_leaf {
            let ip = Ipv4Addr::new(10, pod, (l + 1) as u8, (s + 1) as u8);
            let name = format!("su{pod}_leaf{l}_srv{s}");
            let host = net.create_host(
                &name,
                ip,
                routing_mode,
                topology.mtu,
                topology.ttl as u8,
                seed.wrapping_add(10_000 + (l as u64) * 1000 + s as u64),
            );
            hosts.push(host);

            let mut host_ports = Vec::with_capacity(su.server_parallel_links as usize);
            let mut leaf_ports = Vec::with_capacity(su.server_parallel_links as usize);
            for _ in 0..su.server_parallel_links {
                let host_port = net.add_port(host);
                let leaf_port = net.add_port(leaf);
                let failed = rng.gen_range(0.0..100.0) < links.failure_percent;
                let link = net.create_link(
                    &format!("{name}<->leaf{l}"),
                    links.bandwidth_bps.server_to_leaf,
                    0.0,
                );
                net.connect(host, host_port, link).unwrap();
                net.connect(leaf, leaf_port, link).unwrap();
                if failed {
                    net.mark_link_failed(link);
                    failed_link_count += 1;
                }
                link_ids.push(link);
                host_ports.push(host_port);
                leaf_ports.push(leaf_port);
            }
            let host_prefix = crate::ip::Prefix::new(ip, 32).unwrap();
            let default_route = crate::ip::Prefix::new(Ipv4Addr::new(0, 0, 0, 0), 0).unwrap();
            for &port in &host_ports {
                net.install_route(host, default_route, port);
            }
            for &port in &leaf_ports {
                net.install_route(leaf, host_prefix, port);
            }
        }
    }

    for (l, &leaf) in leaves.iter().enumerate() {
        // `leaf`'s first `servers_per_leaf * server_parallel_links` ports were already
        // allocated above; uplink ports are appended densely from here, matching
        // `leaf_uplink_base` in the address-plan description.
        let mut uplink_ports = Vec::new();
        for &spine in &spines {
            let mut downlink_ports = Vec::new();
            for rep in 0..su.leaf_to_spine_parallel_links {
                let leaf_port = net.add_port(leaf);
                let spine_port = net.add_port(spine);
                let failed = rng.gen_range(0.0..100.0) < links.failure_percent;
                let link = net.create_link(
                    &format!("leaf{l}<->spine_rep{rep}"),
                    links.bandwidth_bps.leaf_to_spine,
                    0.0,
                );
                net.connect(leaf, leaf_port, link).unwrap();
                net.connect(spine, spine_port, link).unwrap();
                if failed {
                    net.mark_link_failed(link);
                    failed_link_count += 1;
                }
                link_ids.push(link);
                uplink_ports.push(leaf_port);
                downlink_ports.push(spine_port);
            }
            let leaf_prefix = crate::ip::Prefix::new(Ipv4Addr::new(10, pod, (l + 1) as u8, 0), 24).unwrap();
            for &port in &downlink_ports {
                net.install_route(spine, leaf_prefix, port);
            }
        }
        let pod_prefix = crate::ip::Prefix::new(Ipv4Addr::new(10, pod, 0, 0), 16).unwrap();
        for &port in &uplink_ports {
            net.install_route(leaf, pod_prefix, port);
        }
    }

    BuiltTopology {
        hosts,
        switches,
        link_ids,
        failed_link_count,
    }
}
