// fabricsim: discrete-event packet-level network simulator for AI-factory leaf/spine fabrics.
//! Node (base for Host and Switch): ports, compiled forwarding table, routing decision.

use std::collections::{HashMap, VecDeque};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::ip::Prefix;
use crate::packet::{stable_hash, FiveTuple, Packet};
use crate::port::Port;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutingMode {
    StaticHash,
    Adaptive,
}

impl RoutingMode {
    /// Parses the `topology.routing.mode` config value, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ecmp" | "hash" => Some(Self::StaticHash),
            "adaptive" | "adapt" => Some(Self::Adaptive),
            _ => None,
        }
    }
}

/// Routes installed on a Node: a human-readable map for introspection, plus a
/// bucket-per-prefix-length compiled form for fast longest-prefix-match lookup.
/// Rebuilt on every install, never recomputed on lookup.
#[derive(Debug, Clone, Default)]
pub struct ForwardingTable {
    readable: HashMap<String, Vec<usize>>,
    by_len: HashMap<u8, Vec<(u32, u32, usize)>>,
    lens_desc: Vec<u8>,
}

impl ForwardingTable {
    pub fn install(&mut self, prefix: Prefix, port_idx: usize) {
        self.readable
            .entry(prefix.to_string())
            .or_default()
            .push(port_idx);
        let len = prefix.prefix_len();
        let entries = self.by_len.entry(len).or_default();
        entries.push((prefix.network(), prefix.mask(), port_idx));
        if !self.lens_desc.contains(&len) {
            self.lens_desc.push(len);
            self.lens_desc.sort_unstable_by(|a, b| b.cmp(a));
        }
    }

    /// Longest-prefix match: the first non-empty prefix length (scanned descending) wins.
    pub fn lookup(&self, dst: u32) -> Vec<usize> {
        for &len in &self.lens_desc {
            if let Some(entries) = self.by_len.get(&len) {
                let matches: Vec<usize> = entries
                    .iter()
                    .filter(|(net, mask, _)| (dst & mask) == *net)
                    .map(|(_, _, port)| *port)
                    .collect();
                if !matches.is_empty() {
                    return matches;
                }
            }
        }
        Vec::new()
    }

    pub fn readable(&self) -> &HashMap<String, Vec<usize>> {
        &self.readable
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NodeId(pub usize);

pub struct HostState {
    pub ip: crate::ip::Ipv4Addr,
    pub received_count: u64,
    pub ecmp_flowlet_n_packets: u32,
    pub mtu: u32,
    pub ttl: u8,
}

pub struct SwitchState;

pub enum NodeKind {
    Host(HostState),
    Switch(SwitchState),
}

pub struct Node {
    pub name: String,
    pub ports: Vec<Port>,
    pub table: ForwardingTable,
    pub routing_mode: RoutingMode,
    pub ingress: VecDeque<Packet>,
    pub handle_scheduled: bool,
    pub verbose_route: bool,
    pub rng: StdRng,
    pub kind: NodeKind,
}

impl Node {
    pub fn new(name: String, routing_mode: RoutingMode, seed: u64, kind: NodeKind) -> Self {
        Self {
            name,
            ports: Vec::new(),
            table: ForwardingTable::default(),
            routing_mode,
            ingress: VecDeque::new(),
            handle_scheduled: false,
            verbose_route: false,
            rng: StdRng::seed_from_u64(seed),
            kind,
        }
    }

    pub fn add_port(&mut self) -> usize {
        let idx = self.ports.len();
        self.ports.push(Port::new(idx));
        idx
    }

    /// Longest-prefix match followed by equal-cost selection. Returns `None` if no
    /// installed prefix matches (the packet must then be dropped by the caller).
    pub fn select_egress_port(&mut self, five_tuple: &FiveTuple, dst_ip: u32) -> Option<usize> {
        let candidates = self.table.lookup(dst_ip);
        if candidates.is_empty() {
            return None;
        }
        match self.routing_mode {
            RoutingMode::StaticHash => {
                let idx = (stable_hash(five_tuple) as usize) % candidates.len();
                Some(candidates[idx])
            }
            RoutingMode::Adaptive => {
                let min_len = candidates
                    .iter()
                    .map(|&p| self.ports[p].queue_size())
                    .min()
                    .unwrap();
                let tied: Vec<usize> = candidates
                    .into_iter()
                    .filter(|&p| self.ports[p].queue_size() == min_len)
                    .collect();
                let pick = self.rng.gen_range(0..tied.len());
                Some(tied[pick])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ip::Ipv4Addr;
    use crate::packet::Protocol;

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

    #[test]
    fn longest_prefix_wins() {
        let mut table = ForwardingTable::default();
        table.install("10.0.0.0/8".parse().unwrap(), 0);
        table.install("10.0.0.0/24".parse().unwrap(), 1);
        let dst = Ipv4Addr::new(10, 0, 0, 5).to_u32();
        assert_eq!(table.lookup(dst), vec![1]);
    }

    #[test]
    fn adaptive_prefers_shorter_queue() {
        let mut node = Node::new("n".into(), RoutingMode::Adaptive, 1, NodeKind::Switch(SwitchState));
        node.add_port();
        node.add_port();
        node.table.install("10.0.0.0/24".parse().unwrap(), 0);
        node.table.install("10.0.0.0/24".parse().unwrap(), 1);
        // preload port 0's queue so port 1 (empty) is strictly preferred
        node.ports[0].test_push_len(1);
        let dst = Ipv4Addr::new(10, 0, 0, 5).to_u32();
        let chosen = node.select_egress_port(&tuple(), dst);
        assert_eq!(chosen, Some(1));
    }

    #[test]
    fn no_match_drops() {
        let mut node = Node::new("n".into(), RoutingMode::StaticHash, 1, NodeKind::Switch(SwitchState));
        let dst = Ipv4Addr::new(192, 168, 0, 1).to_u32();
        assert_eq!(node.select_egress_port(&tuple(), dst), None);
    }
}
