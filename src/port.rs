// fabricsim: discrete-event packet-level network simulator for AI-factory leaf/spine fabrics.
//! Per-egress FIFO port queue. At most one drain event is ever in flight per port.

use std::collections::VecDeque;

use crate::packet::Packet;

pub struct Port {
    pub id: usize,
    pub link: Option<usize>,
    pub queue: VecDeque<Packet>,
    pub peak_queue_len: usize,
    pub drain_scheduled: bool,
}

impl Port {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            link: None,
            queue: VecDeque::new(),
            peak_queue_len: 0,
            drain_scheduled: false,
        }
    }

    pub fn queue_size(&self) -> usize {
        self.queue.len()
    }

    #[cfg(test)]
    pub fn test_push_len(&mut self, n: usize) {
        for _ in 0..n {
            self.queue.push_back(crate::packet::Packet {
                l3: crate::packet::L3Header {
                    five_tuple: crate::packet::FiveTuple {
                        src_ip: crate::ip::Ipv4Addr::new(0, 0, 0, 0),
                        dst_ip: crate::ip::Ipv4Addr::new(0, 0, 0, 0),
                        src_port: 0,
                        dst_port: 0,
                        protocol: crate::packet::Protocol::Control,
                        flowlet_field: 0,
                    },
                    seq_number: 0,
                    size_bytes: 0,
                    ttl: 0,
                    dropped: false,
                },
                transport: crate::packet::TransportHeader {
                    flow_id: 0,
                    flow_packet_count: 0,
                    flow_seq: 0,
                },
                tracking: crate::packet::TrackingInfo {
                    global_packet_id: 0,
                    birth_time: 0.0,
                    hops_traversed: 0,
                    verbose_route: None,
                    delivered: false,
                    arrival_time: None,
                },
            });
        }
    }
}
