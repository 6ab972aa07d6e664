// fabricsim: discrete-event packet-level network simulator for AI-factory leaf/spine fabrics.
//! Scenario builders: compile a scenario's YAML params into `Job`s and launch them on a
//! built `Network`. `ai-factory-su-workload1-dp-heavy` maps to [`dp_heavy`];
//! `ai-factory-su-mixed_scenario` maps to [`mixed`].

pub mod dp_heavy;
pub mod mixed;
