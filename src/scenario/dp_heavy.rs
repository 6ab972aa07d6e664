// fabricsim: discrete-event packet-level network simulator for AI-factory leaf/spine fabrics.
//! `ai-factory-su-workload1-dp-heavy`: a single data-parallel job. Each step is
//! `ComputePhase(fwd_bwd_compute) -> CommPhase(gradient_sync) -> ComputePhase(optimizer_compute)`,
//! where `gradient_sync` is one reduce-scatter bucket followed by one all-gather bucket.

use std::cell::RefCell;
use std::rc::Rc;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::network::Network;
use crate::signature::first_step_signature;
use crate::workload::collective::{expand_ring, CollectiveKind};
use crate::workload::entities::{Bucket, Job, JobStep, Phase};
use crate::workload::mice::MiceConfig;
use crate::workload::runner::JobRunner;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DpHeavyParams {
    pub steps: usize,
    pub seed: u64,
    pub bytes_per_participant: u32,
    pub fwd_bwd_compute: f64,
    pub optimizer_compute: f64,
    #[serde(default)]
    pub ring_gap: f64,
    #[serde(default)]
    pub record_first_step_flow_signatures: bool,
    #[serde(default)]
    pub mice: Option<MiceParams>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MiceParams {
    pub enabled: bool,
    pub seed: u64,
    pub start_delay: f64,
    pub end_time: f64,
    pub inter_arrival: f64,
    pub min_packets: u32,
    pub max_packets: u32,
    pub mtu: u32,
    #[serde(default)]
    pub force_cross_rack: bool,
}

impl From<MiceParams> for MiceConfig {
    fn from(p: MiceParams) -> Self {
        MiceConfig {
            enabled: p.enabled,
            seed: p.seed,
            start_delay: p.start_delay,
            end_time: p.end_time,
            inter_arrival: p.inter_arrival,
            min_packets: p.min_packets,
            max_packets: p.max_packets,
            mtu: p.mtu,
            force_cross_rack: p.force_cross_rack,
        }
    }
}

pub struct BuiltScenario {
    pub runner: Rc<RefCell<JobRunner>>,
    pub first_step_signature: Option<String>,
}

/// Builds the single DP-heavy job over `sorted(hosts)` and launches it. `hosts` must already
/// be node ids; the caller (CLI) is responsible for sorting them by name for determinism.
pub fn build(net: &mut Network, hosts: Vec<usize>, params: &DpHeavyParams) -> Result<BuiltScenario, ConfigError> {
    let job_id = params.seed;

    let mut steps = Vec::with_capacity(params.steps);
    for step_id in 0..params.steps {
        let mut next_flow_id = || net.alloc_flow_id();
        let reduce_scatter = expand_ring(
            CollectiveKind::ReduceScatter,
            &hosts,
            params.bytes_per_participant,
            0.0,
            params.ring_gap,
            params.seed.wrapping_add(step_id as u64),
            job_id,
            step_id,
            0,
            0,
            &mut next_flow_id,
        );
        let mut next_flow_id = || net.alloc_flow_id();
        let all_gather = expand_ring(
            CollectiveKind::AllGather,
            &hosts,
            params.bytes_per_participant,
            0.0,
            params.ring_gap,
            params.seed.wrapping_add(step_id as u64).wrapping_add(1),
            job_id,
            step_id,
            0,
            1,
            &mut next_flow_id,
        );
        steps.push(JobStep {
            step_id,
            phases: vec![
                Phase::Compute { duration: params.fwd_bwd_compute },
                Phase::Comm {
                    buckets: vec![
                        Bucket { bucket_id: 0, flows: reduce_scatter },
                        Bucket { bucket_id: 1, flows: all_gather },
                    ],
                },
                Phase::Compute { duration: params.optimizer_compute },
            ],
        });
    }

    let first_step_signature = if params.record_first_step_flow_signatures {
        let step0_flows: Vec<_> = match &steps[0].phases[1] {
            Phase::Comm { buckets } => buckets.iter().flat_map(|b| b.flows.iter().copied()).collect(),
            _ => unreachable!(),
        };
        Some(first_step_signature(&step0_flows))
    } else {
        None
    };

    let job = Job {
        job_id,
        name: "dp_heavy".to_string(),
        participants: hosts,
        steps,
    };
    let runner = Rc::new(RefCell::new(JobRunner::new(job)));
    crate::workload::runner::launch(net, runner.clone());

    if let Some(mice) = &params.mice {
        let host_ids = runner.borrow().job.participants.clone();
        crate::workload::mice::start(net, mice.clone().into(), host_ids);
    }

    Ok(BuiltScenario {
        runner,
        first_step_signature,
    })
}
