// fabricsim: discrete-event packet-level network simulator for AI-factory leaf/spine fabrics.
//! Packet data model: five-tuple, headers, tracking info.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::ip::Ipv4Addr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display)]
pub enum Protocol {
    Tcp,
    Udp,
    Control,
}

/// Five-tuple identifying a flow at the packet layer, plus a flowlet field the sender
/// bumps every N packets so the routing plane can repick an equal-cost path without
/// reordering packets within one flowlet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FiveTuple {
    pub src_ip: Ipv4Addr,
    pub dst_ip: Ipv4Addr,
    pub src_port: u16,
    pub dst_port: u16,
    pub protocol: Protocol,
    pub flowlet_field: u64,
}

/// Deterministic and stable across runs: unlike `HashMap`'s default hasher, `DefaultHasher::new()`
/// is not randomly seeded, so repeated runs with the same five-tuple always select the same path.
pub fn stable_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct L3Header {
    pub five_tuple: FiveTuple,
    pub seq_number: u32,
    pub size_bytes: u32,
    pub ttl: u8,
    pub dropped: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportHeader {
    pub flow_id: u64,
    pub flow_packet_count: u32,
    pub flow_seq: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackingInfo {
    pub global_packet_id: u64,
    pub birth_time: f64,
    pub hops_traversed: u32,
    pub verbose_route: Option<Vec<String>>,
    pub delivered: bool,
    pub arrival_time: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    pub l3: L3Header,
    pub transport: TransportHeader,
    pub tracking: TrackingInfo,
}

impl Packet {
    pub fn is_expired(&self) -> bool {
        self.l3.ttl == 0
    }
}
