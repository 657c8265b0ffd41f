use std::sync::Arc;

use crate::{
    core::Config,
    events::Bus,
    liveness::LivenessSource,
    reporters::{LogReporter, Report, ReporterSet},
};
use super::coordinator::Coordinator;

/// Builder for constructing a [`Coordinator`] with optional reporters.
pub struct CoordinatorBuilder {
    cfg: Config,
    source: Arc<dyn LivenessSource>,
    reporters: Vec<Arc<dyn Report>>,
}

impl CoordinatorBuilder {
    /// Creates a new builder with the given configuration and liveness source.
    pub fn new(cfg: Config, source: Arc<dyn LivenessSource>) -> Self {
        Self {
            cfg,
            source,
            reporters: Vec::new(),
        }
    }

    /// Adds one fault reporter.
    pub fn with_reporter(mut self, reporter: Arc<dyn Report>) -> Self {
        self.reporters.push(reporter);
        self
    }

    /// Sets fault reporters, replacing any added before.
    ///
    /// Reporters receive every background [`Fault`](crate::Fault)
    /// synchronously on the thread where it happened; keep them cheap.
    pub fn with_reporters(mut self, reporters: Vec<Arc<dyn Report>>) -> Self {
        self.reporters = reporters;
        self
    }

    /// Builds and returns the Coordinator instance.
    ///
    /// If no reporter was configured, a [`LogReporter`] is installed so that
    /// faults are never silently dropped.
    pub fn build(self) -> Arc<Coordinator> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());

        let reporters = if self.reporters.is_empty() {
            vec![Arc::new(LogReporter) as Arc<dyn Report>]
        } else {
            self.reporters
        };
        let reporters = ReporterSet::new(reporters, bus.clone());

        tracing::debug!(
            target: "tickvisor",
            source = self.source.name(),
            reporters = reporters.len(),
            bus_capacity = self.cfg.bus_capacity_clamped(),
            "coordinator built"
        );
        Arc::new(Coordinator::new_internal(self.cfg, bus, reporters, self.source))
    }
}
