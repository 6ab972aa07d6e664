// fabricsim: discrete-event packet-level network simulator for AI-factory leaf/spine fabrics.
//! Background Poisson-like small-flow generator: measures tail latency of short flows
//! under a running main workload without perturbing it.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::network::Network;
use crate::rack::rack_key;
use crate::stats::{mean, percentile};
use crate::workload::entities::Flow;

#[derive(Debug, Clone)]
pub struct MiceConfig {
    pub enabled: bool,
    pub seed: u64,
    pub start_delay: f64,
    pub end_time: f64,
    pub inter_arrival: f64,
    pub min_packets: u32,
    pub max_packets: u32,
    pub mtu: u32,
    pub force_cross_rack: bool,
}

const MICE_JOB_ID: u64 = u64::MAX;
const CROSS_RACK_MAX_TRIES: u32 = 16;

#[derive(Debug, Clone, Default)]
pub struct MiceSummary {
    pub flow_count: usize,
    pub fct_avg_ms: f64,
    pub fct_p95_ms: f64,
    pub fct_p99_ms: f64,
}

pub struct MiceState {
    config: MiceConfig,
    rng: StdRng,
    host_ids: Vec<usize>,
    host_racks: Vec<u32>,
    fct_samples_ms: Vec<f64>,
}

/// Installs mice state and schedules the first firing at `config.start_delay`. A no-op if
/// `config.enabled` is false or fewer than two hosts are available to pick src/dst from.
/// Rack keys are resolved once here from the host names; the run itself never needs to
/// borrow `Network` and `MiceState` at the same time.
pub fn start(net: &mut Network, config: MiceConfig, host_ids: Vec<usize>) {
    if !config.enabled || host_ids.len() < 2 {
        return;
    }
    let host_racks = host_ids.iter().map(|&id| rack_key(&net.nodes[id].name)).collect();
    let rng = StdRng::seed_from_u64(config.seed);
    let delay = config.start_delay;
    net.mice_state = Some(MiceState {
        config,
        rng,
        host_ids,
        host_racks,
        fct_samples_ms: Vec::new(),
    });
    net.scheduler.schedule(delay, fire);
}

fn fire(net: &mut Network) {
    let now = net.scheduler.current_time();
    let end_time = net.mice_state.as_ref().unwrap().config.end_time;
    if now >= end_time {
        publish(net);
        return;
    }

    let (src, dst, size_bytes, inter_arrival) = {
        let state = net.mice_state.as_mut().unwrap();
        let (src_idx, dst_idx) = pick_src_dst(state);
        let packets = state.rng.gen_range(state.config.min_packets..=state.config.max_packets);
        let size_bytes = packets * state.config.mtu;
        (state.host_ids[src_idx], state.host_ids[dst_idx], size_bytes, state.config.inter_arrival)
    };

    let flow_id = net.alloc_flow_id();
    let birth = now;
    let flow = Flow {
        flow_id,
        job_id: MICE_JOB_ID,
        step_id: 0,
        phase_id: 0,
        bucket_id: 0,
        tag: "mice",
        src_node: src,
        dst_node: dst,
        size_bytes,
        earliest_start_time: 0.0,
    };
    net.inject_flow(&flow, move |net| {
        let now = net.scheduler.current_time();
        let fct_ms = (now - birth) * 1000.0;
        net.mice_state.as_mut().unwrap().fct_samples_ms.push(fct_ms);
    });

    net.scheduler.schedule(inter_arrival, fire);
}

/// Picks (src, dst) indices into `state.host_ids`/`host_racks` uniformly at random, with
/// bounded rejection sampling to avoid `src == dst` and, if `force_cross_rack`, to avoid a
/// same-rack pick. Falls back to the unconstrained pick after `CROSS_RACK_MAX_TRIES`.
fn pick_src_dst(state: &mut MiceState) -> (usize, usize) {
    let n = state.host_ids.len();
    let src_idx = state.rng.gen_range(0..n);
    let mut dst_idx = state.rng.gen_range(0..n);
    let mut tries = 0;
    let rejects = |s: &MiceState, d: usize| -> bool {
        d == src_idx || (s.config.force_cross_rack && s.host_racks[d] == s.host_racks[src_idx])
    };
    while rejects(state, dst_idx) && tries < CROSS_RACK_MAX_TRIES {
        dst_idx = state.rng.gen_range(0..n);
        tries += 1;
    }
    (src_idx, dst_idx)
}

fn publish(net: &mut Network) {
    if let Some(state) = net.mice_state.take() {
        let mut samples = state.fct_samples_ms;
        let count = samples.len();
        let avg = mean(&samples);
        let p95 = percentile(&mut samples, 95.0);
        let p99 = percentile(&mut samples, 99.0);
        net.mice_summary = Some(MiceSummary {
            flow_count: count,
            fct_avg_ms: avg,
            fct_p95_ms: p95,
            fct_p99_ms: p99,
        });
    }
}
