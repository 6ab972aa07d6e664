// fabricsim: discrete-event packet-level network simulator for AI-factory leaf/spine fabrics.
//! Workload orchestration: turns a hierarchical job description into time-ordered packet
//! injection events and barriers, plus the collective expander and background mice traffic
//! that feed it.

pub mod collective;
pub mod entities;
pub mod flow_injector;
pub mod mice;
pub mod runner;
