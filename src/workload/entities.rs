// fabricsim: discrete-event packet-level network simulator for AI-factory leaf/spine fabrics.
//! Job/step/phase/bucket/flow value types and the metrics the Job Runner records.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Flow {
    pub flow_id: u64,
    pub job_id: u64,
    pub step_id: usize,
    pub phase_id: usize,
    pub bucket_id: usize,
    pub tag: &'static str,
    pub src_node: usize,
    pub dst_node: usize,
    pub size_bytes: u32,
    pub earliest_start_time: f64,
}

pub struct Bucket {
    pub bucket_id: usize,
    pub flows: Vec<Flow>,
}

pub enum Phase {
    Compute { duration: f64 },
    Comm { buckets: Vec<Bucket> },
}

pub struct JobStep {
    pub step_id: usize,
    pub phases: Vec<Phase>,
}

pub struct Job {
    pub job_id: u64,
    pub name: String,
    pub steps: Vec<JobStep>,
    pub participants: Vec<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct PhaseMetrics {
    pub start_time: f64,
    pub end_time: f64,
}

#[derive(Debug, Clone, Default)]
pub struct StepMetrics {
    pub start_time: f64,
    pub end_time: f64,
}

#[derive(Debug, Clone, Default)]
pub struct JobMetrics {
    pub job_id: u64,
    pub job_name: String,
    pub start_time: f64,
    pub end_time: f64,
    pub steps: Vec<StepMetrics>,
}

impl JobMetrics {
    pub fn step_times_ms(&self) -> Vec<f64> {
        self.steps
            .iter()
            .map(|s| (s.end_time - s.start_time) * 1000.0)
            .collect()
    }
}
