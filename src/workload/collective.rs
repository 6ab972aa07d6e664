// fabricsim: discrete-event packet-level network simulator for AI-factory leaf/spine fabrics.
//! Ring-based collective expander: compiles a logical collective over P participants into
//! the concrete point-to-point Flow list with deterministic chunking and ring ordering.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::workload::entities::Flow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectiveKind {
    AllReduce,
    ReduceScatter,
    AllGather,
}

impl CollectiveKind {
    fn tag_prefix(self) -> &'static str {
        match self {
            CollectiveKind::AllReduce => "all_reduce",
            CollectiveKind::ReduceScatter => "reduce_scatter",
            CollectiveKind::AllGather => "all_gather",
        }
    }
}

/// Derives a stable ring order by a seeded Fisher-Yates shuffle, then emits one Flow per
/// participant per ring step. Returns an empty list for fewer than 2 participants.
#[allow(clippy::too_many_arguments)]
pub fn expand_ring(
    kind: CollectiveKind,
    participants: &[usize],
    bytes_per_participant: u32,
    start_time: f64,
    gap: f64,
    seed: u64,
    job_id: u64,
    step_id: usize,
    phase_id: usize,
    bucket_id: usize,
    next_flow_id: &mut impl FnMut() -> u64,
) -> Vec<Flow> {
    let p = participants.len();
    if p < 2 {
        return Vec::new();
    }
    let mut ring = participants.to_vec();
    let mut rng = StdRng::seed_from_u64(seed);
    ring.shuffle(&mut rng);

    let base_chunk = bytes_per_participant / p as u32;
    let remainder = bytes_per_participant % p as u32;

    let tag_prefix = kind.tag_prefix();
    let mut flows = Vec::with_capacity(p * (p - 1));
    for s in 0..(p - 1) {
        let chunk_size = if (s as u32) < remainder { base_chunk + 1 } else { base_chunk };
        let tag: &'static str = Box::leak(format!("{tag_prefix}/ring_step_{s}").into_boxed_str());
        let t = start_time + (s as f64) * gap;
        for i in 0..p {
            let src = ring[i];
            let dst = ring[(i + 1) % p];
            flows.push(Flow {
                flow_id: next_flow_id(),
                job_id,
                step_id,
                phase_id,
                bucket_id,
                tag,
                src_node: src,
                dst_node: dst,
                size_bytes: chunk_size,
                earliest_start_time: t,
            });
        }
    }
    flows
}
