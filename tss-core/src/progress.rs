//! Progress reporting. The core has no logging framework of its own — a
//! [`Tracer`] is this library's seam for callers who want `tracing`/`log`
//! output: implement the trait and forward each call into whichever
//! framework you use. [`NoTracer`] is the default, zero-cost no-op.

/// Called at coarse-grained points during a (potentially long-running,
/// CPU-bound) protocol run: entering/leaving a round, sending/receiving a
/// batch of messages, and named sub-stages within a round (safe-prime
/// search, proof generation, ...).
pub trait Tracer {
    fn protocol_begins(&mut self) {}
    fn protocol_ends(&mut self) {}
    fn round_begins(&mut self) {}
    fn stage(&mut self, _name: &'static str) {}
    fn send_msg(&mut self) {}
    fn msg_sent(&mut self) {}
    fn receive_msgs(&mut self) {}
    fn msgs_received(&mut self) {}
}

/// No-op tracer; used whenever the caller doesn't pass one.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTracer;
impl Tracer for NoTracer {}

// Blanket impl so `Option<&mut dyn Tracer>` and plain `&mut dyn Tracer`
// call sites both work without an explicit `NoTracer` at every call site.
impl Tracer for Option<&mut dyn Tracer> {
    fn protocol_begins(&mut self) {
        if let Some(t) = self {
            t.protocol_begins()
        }
    }
    fn protocol_ends(&mut self) {
        if let Some(t) = self {
            t.protocol_ends()
        }
    }
    fn round_begins(&mut self) {
        if let Some(t) = self {
            t.round_begins()
        }
    }
    fn stage(&mut self, name: &'static str) {
        if let Some(t) = self {
            t.stage(name)
        }
    }
    fn send_msg(&mut self) {
        if let Some(t) = self {
            t.send_msg()
        }
    }
    fn msg_sent(&mut self) {
        if let Some(t) = self {
            t.msg_sent()
        }
    }
    fn receive_msgs(&mut self) {
        if let Some(t) = self {
            t.receive_msgs()
        }
    }
    fn msgs_received(&mut self) {
        if let Some(t) = self {
            t.msgs_received()
        }
    }
}

/// Test/benchmark helper: records wall-clock durations between stages.
/// Grounded on the teacher's own practice of timing each `KeyRefreshBuilder`
/// stage when benchmarking key generation.
#[derive(Debug, Default)]
pub struct PerfProfiler {
    stages: Vec<(&'static str, std::time::Instant)>,
}

impl PerfProfiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&self) -> Vec<(&'static str, std::time::Duration)> {
        self.stages
            .windows(2)
            .map(|w| (w[0].0, w[1].1.duration_since(w[0].1)))
            .collect()
    }
}

impl Tracer for PerfProfiler {
    fn stage(&mut self, name: &'static str) {
        self.stages.push((name, std::time::Instant::now()));
    }
}
