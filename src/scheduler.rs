// fabricsim: discrete-event packet-level network simulator for AI-factory leaf/spine fabrics.
//! Discrete-event scheduler: an ordered timeline with deterministic tie-breaking.
//!
//! Events are `(time, insertion_sequence, thunk)`. Two events scheduled for the same
//! simulated time fire in the order they were scheduled, never by wall-clock or hash order.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ordered_float::NotNan;

use crate::network::Network;

pub type Thunk = Box<dyn FnOnce(&mut Network)>;

struct Event {
    time: NotNan<f64>,
    seq: u64,
    thunk: Thunk,
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}
impl Eq for Event {}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Event {
    // Reversed so that `BinaryHeap`, a max-heap, pops the earliest (time, seq) first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

pub struct Scheduler {
    current_time: NotNan<f64>,
    next_seq: u64,
    queue: BinaryHeap<Event>,
    end_time: Option<f64>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            current_time: NotNan::new(0.0).unwrap(),
            next_seq: 0,
            queue: BinaryHeap::new(),
            end_time: None,
        }
    }

    pub fn current_time(&self) -> f64 {
        self.current_time.into_inner()
    }

    pub fn end_time(&self) -> Option<f64> {
        self.end_time
    }

    /// Schedule `thunk` to run `delay` seconds after the current time. `delay` must be
    /// non-negative; `f64::INFINITY` is allowed as an end-of-time sentinel.
    pub fn schedule(&mut self, delay: f64, thunk: impl FnOnce(&mut Network) + 'static) {
        assert!(delay >= 0.0, "scheduled delay must be non-negative, got {delay}");
        let time = NotNan::new(self.current_time.into_inner() + delay)
            .expect("scheduled time must not be NaN");
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Event {
            time,
            seq,
            thunk: Box::new(thunk),
        });
    }

    fn pop(&mut self) -> Option<Thunk> {
        let event = self.queue.pop()?;
        self.current_time = event.time;
        Some(event.thunk)
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Network {
    /// Run the scheduler to completion, popping events in `(time, seq)` order.
    pub fn run(&mut self) {
        while let Some(thunk) = self.scheduler.pop() {
            thunk(self);
        }
        self.scheduler.end_time = Some(self.scheduler.current_time());
    }
}
