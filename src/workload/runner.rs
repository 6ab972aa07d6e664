// fabricsim: discrete-event packet-level network simulator for AI-factory leaf/spine fabrics.
//! Job Runner: advances `Job → Step → Phase → Bucket` by scheduling continuations on the
//! event loop, rather than suspending a coroutine. Each "next state" is a plain closure
//! captured at schedule time; the `Join` barrier is the one place multiple independent
//! flow-completion closures need shared mutable access, so it alone uses `Rc<RefCell<_>>`.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use crate::network::Network;
use crate::workload::entities::{Flow, Job, JobMetrics, Phase, StepMetrics};

struct Join {
    pending: HashSet<u64>,
    continuation: Option<Box<dyn FnOnce(&mut Network)>>,
}

pub struct JobRunner {
    pub job: Job,
    pub metrics: JobMetrics,
}

impl JobRunner {
    pub fn new(job: Job) -> Self {
        let metrics = JobMetrics {
            job_id: job.job_id,
            job_name: job.name.clone(),
            ..Default::default()
        };
        Self { job, metrics }
    }
}

/// Schedules `run_step(0)` at the current time, per the `JobStart` transition.
pub fn launch(net: &mut Network, runner: Rc<RefCell<JobRunner>>) {
    let now = net.scheduler.current_time();
    runner.borrow_mut().metrics.start_time = now;
    net.scheduler.schedule(0.0, move |net| run_step(net, runner, 0));
}

fn run_step(net: &mut Network, runner: Rc<RefCell<JobRunner>>, i: usize) {
    let n_steps = runner.borrow().job.steps.len();
    if i == n_steps {
        let now = net.scheduler.current_time();
        let metrics = {
            let mut r = runner.borrow_mut();
            r.metrics.end_time = now;
            r.metrics.clone()
        };
        net.job_metrics.push(metrics);
        return;
    }
    let now = net.scheduler.current_time();
    runner.borrow_mut().metrics.steps.push(StepMetrics {
        start_time: now,
        end_time: 0.0,
    });
    run_phase(net, runner, i, 0);
}

fn run_phase(net: &mut Network, runner: Rc<RefCell<JobRunner>>, i: usize, j: usize) {
    let n_phases = runner.borrow().job.steps[i].phases.len();
    if j == n_phases {
        let now = net.scheduler.current_time();
        {
            let mut r = runner.borrow_mut();
            let idx = r.metrics.steps.len() - 1;
            r.metrics.steps[idx].end_time = now;
        }
        run_step(net, runner, i + 1);
        return;
    }
    let duration = match &runner.borrow().job.steps[i].phases[j] {
        Phase::Compute { duration } => Some(*duration),
        Phase::Comm { .. } => None,
    };
    match duration {
        Some(duration) => {
            net.scheduler.schedule(duration, move |net| done_phase(net, runner, i, j));
        }
        None => run_bucket(net, runner, i, j, 0),
    }
}

fn done_phase(net: &mut Network, runner: Rc<RefCell<JobRunner>>, i: usize, j: usize) {
    run_phase(net, runner, i, j + 1);
}

fn run_bucket(net: &mut Network, runner: Rc<RefCell<JobRunner>>, i: usize, j: usize, k: usize) {
    let n_buckets = match &runner.borrow().job.steps[i].phases[j] {
        Phase::Comm { buckets } => buckets.len(),
        Phase::Compute { .. } => unreachable!("run_bucket only called for a CommPhase"),
    };
    if k == n_buckets {
        done_phase(net, runner, i, j);
        return;
    }
    let flows: Vec<Flow> = match &runner.borrow().job.steps[i].phases[j] {
        Phase::Comm { buckets } => buckets[k].flows.clone(),
        Phase::Compute { .. } => unreachable!("run_bucket only called for a CommPhase"),
    };
    if flows.is_empty() {
        run_bucket(net, runner, i, j, k + 1);
        return;
    }
    let pending: HashSet<u64> = flows.iter().map(|f| f.flow_id).collect();
    let runner_for_continuation = runner.clone();
    let join = Rc::new(RefCell::new(Join {
        pending,
        continuation: Some(Box::new(move |net: &mut Network| {
            run_bucket(net, runner_for_continuation, i, j, k + 1);
        })),
    }));
    let now = net.scheduler.current_time();
    for flow in flows {
        let delay = (flow.earliest_start_time - now).max(0.0);
        let join_for_flow = join.clone();
        net.scheduler.schedule(delay, move |net| {
            let join_for_complete = join_for_flow.clone();
            let flow_id = flow.flow_id;
            net.inject_flow(&flow, move |net| mark_complete(net, join_for_complete, flow_id));
        });
    }
}

/// Idempotent: a flow-id already removed from `pending` (redundant completion) is a no-op.
fn mark_complete(net: &mut Network, join: Rc<RefCell<Join>>, flow_id: u64) {
    let continuation = {
        let mut j = join.borrow_mut();
        j.pending.remove(&flow_id);
        if j.pending.is_empty() {
            j.continuation.take()
        } else {
            None
        }
    };
    if let Some(continuation) = continuation {
        continuation(net);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ip::Ipv4Addr;
    use crate::node::RoutingMode;
    use crate::workload::entities::{Bucket, JobStep};

    fn two_host_net() -> (Network, usize, usize) {
        let mut net = Network::new();
        let h0 = net.create_host("h0", Ipv4Addr::new(10, 0, 0, 1), RoutingMode::StaticHash, 1500, 64, 1);
        let h1 = net.create_host("h1", Ipv4Addr::new(10, 0, 0, 2), RoutingMode::StaticHash, 1500, 64, 2);
        let p0 = net.add_port(h0);
        let p1 = net.add_port(h1);
        let link = net.create_link("l0", 1_000_000.0, 0.0);
        net.connect(h0, p0, link).unwrap();
        net.connect(h1, p1, link).unwrap();
        net.install_route(h0, "10.0.0.2/32".parse().unwrap(), p0);
        net.install_route(h1, "10.0.0.1/32".parse().unwrap(), p1);
        (net, h0, h1)
    }

    #[test]
    fn single_bucket_job_records_step_times() {
        let (mut net, h0, h1) = two_host_net();
        let flow = Flow {
            flow_id: 1,
            job_id: 1,
            step_id: 0,
            phase_id: 0,
            bucket_id: 0,
            tag: "test",
            src_node: h0,
            dst_node: h1,
            size_bytes: 1000,
            earliest_start_time: 0.0,
        };
        let job = Job {
            job_id: 1,
            name: "test_job".into(),
            participants: vec![h0, h1],
            steps: vec![JobStep {
                step_id: 0,
                phases: vec![Phase::Comm {
                    buckets: vec![Bucket { bucket_id: 0, flows: vec![flow] }],
                }],
            }],
        };
        let runner = Rc::new(RefCell::new(JobRunner::new(job)));
        launch(&mut net, runner);
        net.run();
        assert_eq!(net.job_metrics.len(), 1);
        assert_eq!(net.job_metrics[0].steps.len(), 1);
        assert!(net.job_metrics[0].steps[0].end_time > net.job_metrics[0].steps[0].start_time);
    }

    #[test]
    fn second_bucket_delay_is_measured_from_now_not_from_zero() {
        let (mut net, h0, h1) = two_host_net();
        let first = Flow {
            flow_id: 1,
            job_id: 3,
            step_id: 0,
            phase_id: 0,
            bucket_id: 0,
            tag: "first",
            src_node: h0,
            dst_node: h1,
            size_bytes: 1000,
            earliest_start_time: 0.0,
        };
        // 1000 bytes over the 1 Mb/s link takes 0.008s, well past this bucket's own
        // earliest_start_time, so the gap between buckets should collapse to zero rather
        // than stack an extra 0.001s on top of however late `run_bucket` already started.
        let second = Flow {
            flow_id: 2,
            job_id: 3,
            step_id: 0,
            phase_id: 0,
            bucket_id: 1,
            tag: "second",
            src_node: h0,
            dst_node: h1,
            size_bytes: 1000,
            earliest_start_time: 0.001,
        };
        let job = Job {
            job_id: 3,
            name: "gapped_job".into(),
            participants: vec![h0, h1],
            steps: vec![JobStep {
                step_id: 0,
                phases: vec![Phase::Comm {
                    buckets: vec![
                        Bucket { bucket_id: 0, flows: vec![first] },
                        Bucket { bucket_id: 1, flows: vec![second] },
                    ],
                }],
            }],
        };
        let runner = Rc::new(RefCell::new(JobRunner::new(job)));
        launch(&mut net, runner);
        net.run();
        let end_time = net.job_metrics[0].steps[0].end_time;
        assert!((end_time - 0.016).abs() < 1e-9, "expected 0.016, got {end_time}");
    }

    #[test]
    fn empty_bucket_proceeds_immediately() {
        let (mut net, h0, h1) = two_host_net();
        let job = Job {
            job_id: 2,
            name: "empty_job".into(),
            participants: vec![h0, h1],
            steps: vec![JobStep {
                step_id: 0,
                phases: vec![Phase::Comm {
                    buckets: vec![Bucket { bucket_id: 0, flows: vec![] }],
                }],
            }],
        };
        let runner = Rc::new(RefCell::new(JobRunner::new(job)));
        launch(&mut net, runner);
        net.run();
        assert_eq!(net.job_metrics.len(), 1);
        assert_eq!(net.job_metrics[0].steps[0].end_time, 0.0);
    }
}
