// fabricsim: discrete-event packet-level network simulator for AI-factory leaf/spine fabrics.
//! `ai-factory-su-mixed_scenario`: two concurrent jobs, `tp_heavy` and `pp_dp`, sharing the
//! host set (see DESIGN.md for why these are the canonical names).

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Deserialize;

use crate::error::{ConfigError, TopologyError};
use crate::network::Network;
use crate::rack::rack_key;
use crate::scenario::dp_heavy::MiceParams;
use crate::signature::first_step_signature;
use crate::workload::collective::{expand_ring, CollectiveKind};
use crate::workload::entities::{Bucket, Flow, Job, JobStep, Phase};
use crate::workload::runner::JobRunner;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MixedParams {
    pub steps: usize,
    pub seed: u64,
    pub micro_collectives: usize,
    pub micro_collective_bytes: u32,
    pub dp_sync_bytes: u32,
    pub pipeline_microbatch_bytes: u32,
    pub compute_front: f64,
    pub compute_gap: f64,
    pub compute_tail: f64,
    pub pipeline_compute: f64,
    #[serde(default)]
    pub ring_gap: f64,
    pub allocation_mode: String,
    pub stage_placement_mode: String,
    #[serde(default)]
    pub record_first_step_flow_signatures: bool,
    #[serde(default)]
    pub mice: Option<MiceParams>,
}

pub struct BuiltMixedScenario {
    pub tp_heavy: Rc<RefCell<JobRunner>>,
    pub pp_dp: Rc<RefCell<JobRunner>>,
    pub tp_heavy_first_step_signature: Option<String>,
    pub pp_dp_first_step_signature: Option<String>,
}

fn racks_of(net: &Network, hosts: &[usize]) -> BTreeMap<u32, Vec<usize>> {
    let mut by_rack: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
    for &h in hosts {
        let rack = rack_key(&net.nodes[h].name);
        by_rack.entry(rack).or_default().push(h);
    }
    for hosts in by_rack.values_mut() {
        hosts.sort();
    }
    by_rack
}

/// Splits `hosts` (already `sorted(hosts)`) into (tp_heavy, pp_dp) per `allocation_mode`.
fn allocate_hosts(net: &Network, hosts: &[usize], allocation_mode: &str) -> Result<(Vec<usize>, Vec<usize>), ConfigError> {
    if hosts.len() % 2 != 0 {
        return Err(ConfigError::InvalidField {
            field: "topology.ai_factory_su (host count)".to_string(),
            reason: format!("mixed_scenario requires an even number of hosts, got {}", hosts.len()),
        });
    }
    match allocation_mode {
        "contiguous" => {
            let half = hosts.len() / 2;
            Ok((hosts[..half].to_vec(), hosts[half..].to_vec()))
        }
        "rack_balanced" => {
            let by_rack = racks_of(net, hosts);
            let sizes: Vec<usize> = by_rack.values().map(|v| v.len()).collect();
            let uniform = sizes.windows(2).all(|w| w[0] == w[1]);
            if !uniform {
                return Err(ConfigError::NonUniformRacks { sizes });
            }
            let mut tp_heavy = Vec::new();
            let mut pp_dp = Vec::new();
            for rack_hosts in by_rack.values() {
                let half = rack_hosts.len() / 2;
                tp_heavy.extend_from_slice(&rack_hosts[..half]);
                pp_dp.extend_from_slice(&rack_hosts[half..]);
            }
            Ok((tp_heavy, pp_dp))
        }
        other => Err(ConfigError::InvalidField {
            field: "scenario.params.allocation_mode".to_string(),
            reason: format!("unrecognized allocation mode {other:?}, expected \"contiguous\" or \"rack_balanced\""),
        }),
    }
}

/// Splits `pp_dp` participants into 4 equal-size, contiguous stage groups per
/// `stage_placement_mode`.
fn place_stages(net: &Network, pp_dp: &[usize], stage_placement_mode: &str, seed: u64) -> Result<Vec<Vec<usize>>, TopologyError> {
    if pp_dp.len() % 4 != 0 {
        return Err(TopologyError::NotDivisibleByFour(pp_dp.len()));
    }
    let ordered: Vec<usize> = match stage_placement_mode {
        "topology_aware" => {
            let mut v = pp_dp.to_vec();
            v.sort_by_key(|&h| (rack_key(&net.nodes[h].name), h));
            v
        }
        _ => {
            let mut v = pp_dp.to_vec();
            let mut rng = StdRng::seed_from_u64(seed);
            v.shuffle(&mut rng);
            v
        }
    };
    let stage_size = ordered.len() / 4;
    let stages: Vec<Vec<usize>> = ordered.chunks(stage_size).map(|c| c.to_vec()).collect();
    if stages.len() != 4 {
        return Err(TopologyError::WrongStageCount(stages.len()));
    }
    let stage_sizes: Vec<usize> = stages.iter().map(|s| s.len()).collect();
    if stage_sizes.iter().any(|&n| n != stage_size) {
        return Err(TopologyError::UnequalStageSizes(stage_sizes));
    }
    Ok(stages)
}

#[allow(clippy::too_many_arguments)]
fn expand_pipeline_pairs(
    from_stage: &[usize],
    to_stage: &[usize],
    bytes_per_transfer: u32,
    tag: &'static str,
    job_id: u64,
    step_id: usize,
    phase_id: usize,
    bucket_id: usize,
    earliest_start_time: f64,
    next_flow_id: &mut impl FnMut() -> u64,
) -> Vec<Flow> {
    from_stage
        .iter()
        .zip(to_stage.iter())
        .map(|(&src, &dst)| Flow {
            flow_id: next_flow_id(),
            job_id,
            step_id,
            phase_id,
            bucket_id,
            tag,
            src_node: src,
            dst_node: dst,
            size_bytes: bytes_per_transfer,
            earliest_start_time,
        })
        .collect()
}

fn build_tp_heavy(net: &mut Network, participants: Vec<usize>, params: &MixedParams) -> Job {
    let job_id = params.seed;
    let mut steps = Vec::with_capacity(params.steps);
    for step_id in 0..params.steps {
        let mut phases = vec![Phase::Compute { duration: params.compute_front }];
        for rep in 0..params.micro_collectives {
            let mut next_flow_id = || net.alloc_flow_id();
            let rs = expand_ring(
                CollectiveKind::ReduceScatter,
                &participants,
                params.micro_collective_bytes,
                0.0,
                params.ring_gap,
                params.seed.wrapping_add(step_id as u64 * 1000 + rep as u64),
                job_id,
                step_id,
                phases.len(),
                0,
                &mut next_flow_id,
            );
            let mut next_flow_id = || net.alloc_flow_id();
            let ag = expand_ring(
                CollectiveKind::AllGather,
                &participants,
                params.micro_collective_bytes,
                0.0,
                params.ring_gap,
                params.seed.wrapping_add(step_id as u64 * 1000 + rep as u64).wrapping_add(1),
                job_id,
                step_id,
                phases.len(),
                1,
                &mut next_flow_id,
            );
            phases.push(Phase::Comm {
                buckets: vec![Bucket { bucket_id: 0, flows: rs }, Bucket { bucket_id: 1, flows: ag }],
            });
            phases.push(Phase::Compute { duration: params.compute_gap });
        }
        {
            let mut next_flow_id = || net.alloc_flow_id();
            let rs = expand_ring(
                CollectiveKind::ReduceScatter,
                &participants,
                params.dp_sync_bytes,
                0.0,
                params.ring_gap,
                params.seed.wrapping_add(step_id as u64).wrapping_add(5000),
                job_id,
                step_id,
                phases.len(),
                0,
                &mut next_flow_id,
            );
            let mut next_flow_id = || net.alloc_flow_id();
            let ag = expand_ring(
                CollectiveKind::AllGather,
                &participants,
                params.dp_sync_bytes,
                0.0,
                params.ring_gap,
                params.seed.wrapping_add(step_id as u64).wrapping_add(5001),
                job_id,
                step_id,
                phases.len(),
                1,
                &mut next_flow_id,
            );
            phases.push(Phase::Comm {
                buckets: vec![Bucket { bucket_id: 0, flows: rs }, Bucket { bucket_id: 1, flows: ag }],
            });
        }
        phases.push(Phase::Compute { duration: params.compute_tail });
        steps.push(JobStep { step_id, phases });
    }
    Job {
        job_id,
        name: "tp_heavy".to_string(),
        participants,
        steps,
    }
}

fn build_pp_dp(net: &mut Network, participants: Vec<usize>, stages: &[Vec<usize>], params: &MixedParams) -> Job {
    let job_id = params.seed.wrapping_add(1);
    let mut steps = Vec::with_capacity(params.steps);
    for step_id in 0..params.steps {
        let mut phases = Vec::new();
        for s in 0..3 {
            let mut next_flow_id = || net.alloc_flow_id();
            let flows = expand_pipeline_pairs(
                &stages[s],
                &stages[s + 1],
                params.pipeline_microbatch_bytes,
                "pp_dp/forward",
                job_id,
                step_id,
                phases.len(),
                0,
                0.0,
                &mut next_flow_id,
            );
            phases.push(Phase::Comm { buckets: vec![Bucket { bucket_id: 0, flows }] });
            phases.push(Phase::Compute { duration: params.pipeline_compute });
        }
        for s in (1..4).rev() {
            let mut next_flow_id = || net.alloc_flow_id();
            let flows = expand_pipeline_pairs(
                &stages[s],
                &stages[s - 1],
                params.pipeline_microbatch_bytes,
                "pp_dp/backward",
                job_id,
                step_id,
                phases.len(),
                0,
                0.0,
                &mut next_flow_id,
            );
            phases.push(Phase::Comm { buckets: vec![Bucket { bucket_id: 0, flows }] });
            phases.push(Phase::Compute { duration: params.pipeline_compute });
        }
        {
            let mut next_flow_id = || net.alloc_flow_id();
            let rs = expand_ring(
                CollectiveKind::ReduceScatter,
                &participants,
                params.dp_sync_bytes,
                0.0,
                params.ring_gap,
                params.seed.wrapping_add(step_id as u64).wrapping_add(9000),
                job_id,
                step_id,
                phases.len(),
                0,
                &mut next_flow_id,
            );
            let mut next_flow_id = || net.alloc_flow_id();
            let ag = expand_ring(
                CollectiveKind::AllGather,
                &participants,
                params.dp_sync_bytes,
                0.0,
                params.ring_gap,
                params.seed.wrapping_add(step_id as u64).wrapping_add(9001),
                job_id,
                step_id,
                phases.len(),
                1,
                &mut next_flow_id,
            );
            phases.push(Phase::Comm {
                buckets: vec![Bucket { bucket_id: 0, flows: rs }, Bucket { bucket_id: 1, flows: ag }],
            });
        }
        phases.push(Phase::Compute { duration: params.compute_tail });
        steps.push(JobStep { step_id, phases });
    }
    Job {
        job_id,
        name: "pp_dp".to_string(),
        participants,
        steps,
    }
}

fn step0_flows(job: &Job) -> Vec<Flow> {
    job.steps[0]
        .phases
        .iter()
        .flat_map(|p| match p {
            Phase::Comm { buckets } => buckets.iter().flat_map(|b| b.flows.iter().copied()).collect::<Vec<_>>(),
            Phase::Compute { .. } => Vec::new(),
        })
        .collect()
}

pub fn build(net: &mut Network, hosts: Vec<usize>, params: &MixedParams) -> Result<BuiltMixedScenario, ConfigError> {
    let (tp_heavy_hosts, pp_dp_hosts) = allocate_hosts(net, &hosts, &params.allocation_mode)?;
    let stages = place_stages(net, &pp_dp_hosts, &params.stage_placement_mode, params.seed).map_err(|e| ConfigError::InvalidField {
        field: "scenario.params (pp_dp stage placement)".to_string(),
        reason: e.to_string(),
    })?;

    let tp_heavy_job = build_tp_heavy(net, tp_heavy_hosts, params);
    let pp_dp_job = build_pp_dp(net, pp_dp_hosts, &stages, params);

    let tp_heavy_first_step_signature = params.record_first_step_flow_signatures.then(|| first_step_signature(&step0_flows(&tp_heavy_job)));
    let pp_dp_first_step_signature = params.record_first_step_flow_signatures.then(|| first_step_signature(&step0_flows(&pp_dp_job)));

    let tp_heavy = Rc::new(RefCell::new(JobRunner::new(tp_heavy_job)));
    let pp_dp = Rc::new(RefCell::new(JobRunner::new(pp_dp_job)));
    crate::workload::runner::launch(net, tp_heavy.clone());
    crate::workload::runner::launch(net, pp_dp.clone());

    if let Some(mice) = &params.mice {
        crate::workload::mice::start(net, mice.clone().into(), hosts);
    }

    Ok(BuiltMixedScenario {
        tp_heavy,
        pp_dp,
        tp_heavy_first_step_signature,
        pp_dp_first_step_signature,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ip::Ipv4Addr;
    use crate::node::RoutingMode;

    fn mesh_net(names: &[&str]) -> (Network, Vec<usize>) {
        let mut net = Network::new();
        let mut hosts = Vec::new();
        for (i, name) in names.iter().enumerate() {
            let h = net.create_host(name, Ipv4Addr::new(10, 0, 0, (i + 1) as u8), RoutingMode::StaticHash, 1500, 64, i as u64);
            hosts.push(h);
        }
        for i in 0..hosts.len() {
            for j in 0..hosts.len() {
                if i == j {
                    continue;
                }
                let p = net.add_port(hosts[i]);
                let prefix: crate::ip::Prefix = format!("10.0.0.{}/32", j + 1).parse().unwrap();
                let q = net.add_port(hosts[j]);
                let link = net.create_link(&format!("l{i}_{j}"), 1e9, 0.0);
                net.connect(hosts[i], p, link).unwrap();
                net.connect(hosts[j], q, link).unwrap();
                net.install_route(hosts[i], prefix, p);
            }
        }
        (net, hosts)
    }

    #[test]
    fn rack_balanced_rejects_non_uniform_racks() {
        let (net, hosts) = mesh_net(&["su0_leaf0_srv0", "su0_leaf0_srv1", "su0_leaf1_srv0", "su0_leaf1_srv1", "su0_leaf1_srv2", "su0_leaf1_srv3"]);
        let err = allocate_hosts(&net, &hosts, "rack_balanced").unwrap_err();
        assert!(matches!(err, ConfigError::NonUniformRacks { .. }));
    }

    #[test]
    fn contiguous_splits_in_half() {
        let (net, hosts) = mesh_net(&["a", "b", "c", "d"]);
        let (tp, pp) = allocate_hosts(&net, &hosts, "contiguous").unwrap();
        assert_eq!(tp.len(), 2);
        assert_eq!(pp.len(), 2);
    }

    #[test]
    fn determinism_across_runs_with_same_seed() {
        let run_once = || {
            let (mut net, hosts) = mesh_net(&["su0_leaf0_srv0", "su0_leaf0_srv1", "su0_leaf1_srv0", "su0_leaf1_srv1"]);
            let params = MixedParams {
                steps: 1,
                seed: 7,
                micro_collectives: 1,
                micro_collective_bytes: 16,
                dp_sync_bytes: 64,
                pipeline_microbatch_bytes: 32,
                compute_front: 0.0001,
                compute_gap: 0.00005,
                compute_tail: 0.0001,
                pipeline_compute: 0.00005,
                ring_gap: 0.0,
                allocation_mode: "contiguous".to_string(),
                stage_placement_mode: "topology_aware".to_string(),
                record_first_step_flow_signatures: true,
                mice: None,
            };
            let built = build(&mut net, hosts, &params).unwrap();
            net.run();
            (built.tp_heavy_first_step_signature, built.pp_dp_first_step_signature)
        };
        assert_eq!(run_once(), run_once());
    }
}
