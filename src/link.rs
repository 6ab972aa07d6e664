// fabricsim: discrete-event packet-level network simulator for AI-factory leaf/spine fabrics.
//! Full-duplex link: serializes bytes at a fixed bandwidth with a fixed propagation delay.

#[derive(Debug, Clone, Copy)]
pub struct PortRef {
    pub node: usize,
    pub port: usize,
}

pub struct Link {
    pub name: String,
    pub bandwidth_bps: f64,
    pub propagation_time: f64,
    pub endpoints: Option<(PortRef, PortRef)>,
    pub next_available_time: [f64; 2],
    pub failed: bool,
    pub accumulated_transmitting_time: f64,
    pub accumulated_bytes_transmitted: u64,
}

impl Link {
    pub fn new(name: String, bandwidth_bps: f64, propagation_time: f64) -> Self {
        Self {
            name,
            bandwidth_bps,
            propagation_time,
            endpoints: None,
            next_available_time: [0.0, 0.0],
            failed: false,
            accumulated_transmitting_time: 0.0,
            accumulated_bytes_transmitted: 0,
        }
    }

    /// Binds the first unbound endpoint to `port`. Errors after the second.
    pub fn connect(&mut self, port: PortRef) -> Result<(), crate::error::TopologyError> {
        match self.endpoints {
            None => {
                self.endpoints = Some((port, port));
                Ok(())
            }
            Some((a, b)) if a.node == b.node && a.port == b.port => {
                self.endpoints = Some((a, port));
                Ok(())
            }
            Some(_) => Err(crate::error::TopologyError::LinkAlreadyConnected {
                link: self.name.clone(),
            }),
        }
    }

    /// Direction index: 0 if `port` is the first endpoint, 1 if it is the second.
    pub fn direction_of(&self, port: PortRef) -> usize {
        let (a, _b) = self.endpoints.expect("link must be connected");
        if a.node == port.node && a.port == port.port {
            0
        } else {
            1
        }
    }

    pub fn peer_of(&self, port: PortRef) -> PortRef {
        let (a, b) = self.endpoints.expect("link must be connected");
        if a.node == port.node && a.port == port.port {
            b
        } else {
            a
        }
    }

    pub fn serialization_time(&self, size_bytes: u32) -> f64 {
        (size_bytes as f64) * 8.0 / self.bandwidth_bps
    }
}
