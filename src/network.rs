// fabricsim: discrete-event packet-level network simulator for AI-factory leaf/spine fabrics.
//! The Network: owns the scheduler, nodes, links and forwarding tables, and drives packets
//! between them. All cross-node mutation goes through `Network` methods so that event
//! thunks can be plain `'static` closures capturing ids rather than object graphs.

use std::collections::HashMap;

use crate::ip::{Ipv4Addr, Prefix};
use crate::link::{Link, PortRef};
use crate::node::{HostState, Node, NodeKind, RoutingMode, SwitchState};
use crate::packet::{FiveTuple, L3Header, Packet, Protocol, TrackingInfo, TransportHeader};
use crate::scheduler::Scheduler;
use crate::stats::PacketStats;
use crate::workload::entities::Flow;
use crate::workload::flow_injector::FlowInjector;
use crate::workload::mice::{MiceState, MiceSummary};

pub struct Network {
    pub scheduler: Scheduler,
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
    pub name_to_node: HashMap<String, usize>,
    pub stats: PacketStats,
    pub full_trace: bool,
    pub packet_timeline: Vec<(f64, u32)>,
    pub flow_injector: FlowInjector,
    pub mice_state: Option<MiceState>,
    pub mice_summary: Option<MiceSummary>,
    pub job_metrics: Vec<crate::workload::entities::JobMetrics>,
    pub first_step_signatures: HashMap<String, String>,
    pub message_verbose: bool,
    next_packet_id: u64,
    next_flow_id: u64,
    #[cfg(test)]
    pub test_log: Vec<String>,
}

impl Network {
    pub fn new() -> Self {
        Self {
            scheduler: Scheduler::new(),
            nodes: Vec::new(),
            links: Vec::new(),
            name_to_node: HashMap::new(),
            stats: PacketStats::new(),
            full_trace: false,
            packet_timeline: Vec::new(),
            flow_injector: FlowInjector::new(),
            mice_state: None,
            mice_summary: None,
            job_metrics: Vec::new(),
            first_step_signatures: HashMap::new(),
            message_verbose: false,
            next_packet_id: 0,
            next_flow_id: 0,
            #[cfg(test)]
            test_log: Vec::new(),
        }
    }

    pub fn alloc_flow_id(&mut self) -> u64 {
        let id = self.next_flow_id;
        self.next_flow_id += 1;
        id
    }

    /// Routes a logical Flow through the shared `FlowInjector`. Takes the injector out for
    /// the duration of the call so `inject` can itself hold a `&mut Network`.
    pub fn inject_flow(&mut self, flow: &Flow, on_complete: impl FnOnce(&mut Network) + 'static) {
        let mut injector = std::mem::take(&mut self.flow_injector);
        injector.inject(self, flow, on_complete);
        self.flow_injector = injector;
    }

    #[cfg(test)]
    pub fn empty() -> Self {
        Self::new()
    }

    pub fn create_host(&mut self, name: &str, ip: Ipv4Addr, routing_mode: RoutingMode, mtu: u32, ttl: u8, seed: u64) -> usize {
        let node = Node::new(
            name.to_string(),
            routing_mode,
            seed,
            NodeKind::Host(HostState {
                ip,
                received_count: 0,
                ecmp_flowlet_n_packets: 0,
                mtu,
                ttl,
            }),
        );
        let id = self.nodes.len();
        self.nodes.push(node);
        self.name_to_node.insert(name.to_string(), id);
        id
    }

    pub fn create_switch(&mut self, name: &str, routing_mode: RoutingMode, seed: u64) -> usize {
        let node = Node::new(name.to_string(), routing_mode, seed, NodeKind::Switch(SwitchState));
        let id = self.nodes.len();
        self.nodes.push(node);
        self.name_to_node.insert(name.to_string(), id);
        id
    }

    pub fn node_id(&self, name: &str) -> Option<usize> {
        self.name_to_node.get(name).copied()
    }

    pub fn host_ip(&self, node: usize) -> Ipv4Addr {
        match &self.nodes[node].kind {
            NodeKind::Host(h) => h.ip,
            NodeKind::Switch(_) => panic!("node {node} is not a host"),
        }
    }

    pub fn add_port(&mut self, node: usize) -> usize {
        self.nodes[node].add_port()
    }

    pub fn create_link(&mut self, name: &str, bandwidth_bps: f64, propagation_time: f64) -> usize {
        let id = self.links.len();
        self.links.push(Link::new(name.to_string(), bandwidth_bps, propagation_time));
        id
    }

    pub fn mark_link_failed(&mut self, link: usize) {
        self.links[link].failed = true;
    }

    /// Binds `port` on `node` to `link`, and binds the other side of the link to `port`.
    pub fn connect(&mut self, node: usize, port: usize, link: usize) -> Result<(), crate::error::TopologyError> {
        self.nodes[node].ports[port].link = Some(link);
        self.links[link].connect(PortRef { node, port })
    }

    /// Installs a route on `node`/`port`; silently dropped if that port's link is failed,
    /// per the forwarding-table invariant that a failed link never carries a learned route.
    pub fn install_route(&mut self, node: usize, prefix: Prefix, port: usize) {
        if let Some(link) = self.nodes[node].ports[port].link {
            if self.links[link].failed {
                return;
            }
        }
        self.nodes[node].table.install(prefix, port);
    }

    fn next_packet_id(&mut self) -> u64 {
        let id = self.next_packet_id;
        self.next_packet_id += 1;
        id
    }

    /// Originating side: split `size_bytes` into MTU-sized packets and enqueue them on the
    /// selected egress port. `flow_packet_count` is known up front so the destination side
    /// can recognize the flow's expected total without a separate lookup.
    pub fn host_send(
        &mut self,
        node: usize,
        flow_id: u64,
        dst_ip: Ipv4Addr,
        src_port: u16,
        dst_port: u16,
        size_bytes: u32,
        protocol: Protocol,
    ) {
        let (mtu, ttl, src_ip, ecmp_n) = match &self.nodes[node].kind {
            NodeKind::Host(h) => (h.mtu, h.ttl, h.ip, h.ecmp_flowlet_n_packets),
            NodeKind::Switch(_) => panic!("host_send called on a switch"),
        };
        let packet_count = size_bytes.div_ceil(mtu).max(1);
        let now = self.scheduler.current_time();
        for seq in 0..packet_count {
            let this_size = if seq + 1 == packet_count {
                size_bytes - mtu * (packet_count - 1)
            } else {
                mtu
            };
            let flowlet_field = if ecmp_n > 0 {
                now.to_bits() + (seq / ecmp_n) as u64
            } else {
                now.to_bits()
            };
            let five_tuple = FiveTuple {
                src_ip,
                dst_ip,
                src_port,
                dst_port,
                protocol,
                flowlet_field,
            };
            let dst_u32 = dst_ip.to_u32();
            let egress = self.nodes[node].select_egress_port(&five_tuple, dst_u32);
            let packet = Packet {
                l3: L3Header {
                    five_tuple,
                    seq_number: seq,
                    size_bytes: this_size,
                    ttl,
                    dropped: false,
                },
                transport: TransportHeader {
                    flow_id,
                    flow_packet_count: packet_count,
                    flow_seq: seq,
                },
                tracking: TrackingInfo {
                    global_packet_id: self.next_packet_id(),
                    birth_time: now,
                    hops_traversed: 0,
                    verbose_route: if self.nodes[node].verbose_route { Some(vec![self.nodes[node].name.clone()]) } else { None },
                    delivered: false,
                    arrival_time: None,
                },
            };
            self.stats.record_created();
            if self.full_trace {
                self.packet_timeline.push((now, this_size));
            }
            match egress {
                Some(port) => self.port_enqueue(node, port, packet),
                None => {
                    self.stats.record_dropped();
                    if self.message_verbose {
                        log::warn!("host {}: no route to {dst_ip}, packet dropped", self.nodes[node].name);
                    }
                }
            }
        }
    }

    pub fn port_enqueue(&mut self, node: usize, port_idx: usize, mut packet: Packet) {
        let link_id = self.nodes[node].ports[port_idx]
            .link
            .expect("port must be attached to a link before use");
        if self.links[link_id].failed {
            packet.l3.dropped = true;
            self.stats.record_dropped();
            return;
        }
        let port = &mut self.nodes[node].ports[port_idx];
        port.queue.push_back(packet);
        port.peak_queue_len = port.peak_queue_len.max(port.queue.len());
        if !port.drain_scheduled {
            port.drain_scheduled = true;
            self.scheduler.schedule(0.0, move |net| net.port_drain_once(node, port_idx));
        }
    }

    fn port_drain_once(&mut self, node: usize, port_idx: usize) {
        self.nodes[node].ports[port_idx].drain_scheduled = false;
        if self.nodes[node].ports[port_idx].queue.is_empty() {
            return;
        }
        let link_id = self.nodes[node].ports[port_idx].link.expect("port must have a link");
        if self.links[link_id].failed {
            let port = &mut self.nodes[node].ports[port_idx];
            let dropped = port.queue.len() as u64;
            port.queue.clear();
            self.stats.dropped_count += dropped;
            return;
        }
        let now = self.scheduler.current_time();
        let sender = PortRef { node, port: port_idx };
        let direction = self.links[link_id].direction_of(sender);
        let t_ready = self.links[link_id].next_available_time[direction];
        if t_ready > now {
            self.nodes[node].ports[port_idx].drain_scheduled = true;
            self.scheduler.schedule(t_ready - now, move |net| net.port_drain_once(node, port_idx));
            return;
        }
        let packet = self.nodes[node].ports[port_idx].queue.pop_front().unwrap();
        self.link_transmit(link_id, sender, packet);
        if !self.nodes[node].ports[port_idx].queue.is_empty() {
            let next_ready = self.links[link_id].next_available_time[direction];
            let delay = (next_ready - now).max(0.0);
            self.nodes[node].ports[port_idx].drain_scheduled = true;
            self.scheduler.schedule(delay, move |net| net.port_drain_once(node, port_idx));
        }
    }

    fn link_transmit(&mut self, link_id: usize, sender: PortRef, mut packet: Packet) {
        let now = self.scheduler.current_time();
        let link = &mut self.links[link_id];
        assert!(!link.failed, "transmit called on a failed link");
        let direction = link.direction_of(sender);
        let serialization = link.serialization_time(packet.l3.size_bytes);
        link.next_available_time[direction] = now + serialization;
        link.accumulated_transmitting_time += serialization;
        link.accumulated_bytes_transmitted += packet.l3.size_bytes as u64;
        let arrival = now + serialization + link.propagation_time;
        let peer = link.peer_of(sender);
        if let Some(route) = packet.tracking.verbose_route.as_mut() {
            route.push(self.nodes[peer.node].name.clone());
        }
        self.scheduler.schedule(arrival - now, move |net| net.node_post(peer.node, packet));
    }

    pub fn node_post(&mut self, node: usize, mut packet: Packet) {
        packet.l3.ttl = packet.l3.ttl.saturating_sub(1);
        packet.tracking.hops_traversed += 1;
        let scheduled = self.nodes[node].handle_scheduled;
        self.nodes[node].ingress.push_back(packet);
        if !scheduled {
            self.nodes[node].handle_scheduled = true;
            self.scheduler.schedule(0.0, move |net| net.node_handle_ingress(node));
        }
    }

    fn node_handle_ingress(&mut self, node: usize) {
        self.nodes[node].handle_scheduled = false;
        while let Some(packet) = self.nodes[node].ingress.pop_front() {
            match self.nodes[node].kind {
                NodeKind::Host(_) => self.host_on_message(node, packet),
                NodeKind::Switch(_) => self.switch_on_message(node, packet),
            }
        }
    }

    /// Terminating side of a Host. Delivery bookkeeping happens here; flow completion is
    /// a separate observer (`on_flow_packet`) rather than a hook woven into this method.
    fn host_on_message(&mut self, node: usize, mut packet: Packet) {
        let now = self.scheduler.current_time();
        packet.tracking.delivered = true;
        packet.tracking.arrival_time = Some(now);
        if let NodeKind::Host(h) = &mut self.nodes[node].kind {
            h.received_count += 1;
        }
        self.stats.record_delivered(packet.tracking.hops_traversed);
        self.on_flow_packet(packet.transport.flow_id, packet.l3.five_tuple.dst_ip, packet.l3.size_bytes);
    }

    /// The Host's inbound-packet observer the Flow Injector registers for. Fires the flow's
    /// completion continuation, if any, once its expected byte total is reached.
    fn on_flow_packet(&mut self, flow_id: u64, dst_ip: Ipv4Addr, size_bytes: u32) {
        let mut injector = std::mem::take(&mut self.flow_injector);
        let completed = injector.on_flow_packet(flow_id, dst_ip, size_bytes);
        self.flow_injector = injector;
        if let Some(continuation) = completed {
            continuation(self);
        }
    }

    fn switch_on_message(&mut self, node: usize, packet: Packet) {
        if packet.is_expired() {
            self.stats.record_dropped();
            return;
        }
        let dst_ip = packet.l3.five_tuple.dst_ip.to_u32();
        let five_tuple = packet.l3.five_tuple;
        let egress = self.nodes[node].select_egress_port(&five_tuple, dst_ip);
        match egress {
            Some(port) => self.port_enqueue(node, port, packet),
            None => {
                self.stats.record_dropped();
                if self.message_verbose {
                    log::warn!("switch {}: no route, packet dropped", self.nodes[node].name);
                }
            }
        }
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}
