// fabricsim: discrete-event packet-level network simulator for AI-factory leaf/spine fabrics.
use fabricsim::ip::Ipv4Addr;
use fabricsim::node::{Node, NodeKind, RoutingMode, SwitchState};
use fabricsim::packet::{FiveTuple, L3Header, Packet, Protocol, TrackingInfo, TransportHeader};

fn tuple() -> FiveTuple {
    FiveTuple {
        src_ip: Ipv4Addr::new(10, 0, 0, 1),
        dst_ip: Ipv4Addr::new(10, 0, 0, 5),
        src_port: 1000,
        dst_port: 2000,
        protocol: Protocol::Tcp,
        flowlet_field: 0,
    }
}

fn filler_packet() -> Packet {
    Packet {
        l3: L3Header { five_tuple: tuple(), seq_number: 0, size_bytes: 64, ttl: 64, dropped: false },
        transport: TransportHeader { flow_id: 0, flow_packet_count: 1, flow_seq: 0 },
        tracking: TrackingInfo {
            global_packet_id: 0,
            birth_time: 0.0,
            hops_traversed: 0,
            verbose_route: None,
            delivered: false,
            arrival_time: None,
        },
    }
}

#[test]
fn adaptive_mode_picks_the_shorter_of_two_equal_cost_queues() {
    let mut node = Node::new("leaf0".into(), RoutingMode::Adaptive, 1, NodeKind::Switch(SwitchState));
    node.add_port();
    node.add_port();
    node.table.install("10.0.0.0/24".parse().unwrap(), 0);
    node.table.install("10.0.0.0/24".parse().unwrap(), 1);
    node.ports[0].queue.push_back(filler_packet());

    let dst = Ipv4Addr::new(10, 0, 0, 5).to_u32();
    assert_eq!(node.select_egress_port(&tuple(), dst), Some(1));
}

#[test]
fn static_hash_mode_is_repeatable_for_the_same_five_tuple() {
    let mut node = Node::new("leaf0".into(), RoutingMode::StaticHash, 1, NodeKind::Switch(SwitchState));
    node.add_port();
    node.add_port();
    node.table.install("10.0.0.0/24".parse().unwrap(), 0);
    node.table.install("10.0.0.0/24".parse().unwrap(), 1);

    let dst = Ipv4Addr::new(10, 0, 0, 5).to_u32();
    let first = node.select_egress_port(&tuple(), dst);
    let second = node.select_egress_port(&tuple(), dst);
    assert_eq!(first, second);
}
