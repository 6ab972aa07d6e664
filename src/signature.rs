// fabricsim: discrete-event packet-level network simulator for AI-factory leaf/spine fabrics.
//! First-step flow-signature hashing for determinism testing. Unlike legacy tooling that
//! hashed only `(src, dst, size, start, tag)`, `job_id` is included here too; see
//! DESIGN.md for why.

use sha1::{Digest, Sha1};

use crate::workload::entities::Flow;

fn signature_tuple(flow: &Flow) -> String {
    format!(
        "{}|{}|{}|{}|{}|{}",
        flow.src_node, flow.dst_node, flow.size_bytes, flow.earliest_start_time, flow.tag, flow.job_id
    )
}

/// Collects every flow's signature tuple from a job's first step, sorts the rendered
/// tuples, and SHA-1-hashes the concatenation. Deterministic across runs with the same
/// flows regardless of the order they were generated in.
pub fn first_step_signature(step0_flows: &[Flow]) -> String {
    let mut tuples: Vec<String> = step0_flows.iter().map(signature_tuple).collect();
    tuples.sort();
    let mut hasher = Sha1::new();
    for t in &tuples {
        hasher.update(t.as_bytes());
        hasher.update(b"\n");
    }
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
