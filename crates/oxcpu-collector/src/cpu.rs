use crate::error::Result;
use crate::stat::{StatLayout, StatReader};
use crate::store::{MetricCatalog, MetricStore};
use crate::Collector;
use chrono::Utc;
use oxcpu_common::namespace::Namespace;
use oxcpu_common::types::MetricDataPoint;
use std::collections::HashMap;
use std::path::Path;

/// Collects per-CPU counters from `<proc_path>/stat`.
///
/// The CPU rows and counter columns are probed once in [`CpuCollector::new`]
/// and stay fixed for the collector's lifetime.
pub struct CpuCollector {
    reader: StatReader,
    layout: StatLayout,
    store: MetricStore,
}

impl CpuCollector {
    pub fn new(proc_path: impl AsRef<Path>) -> Result<Self> {
        let reader = StatReader::new(proc_path);
        let layout = reader.probe()?;
        let store = MetricStore::new(MetricCatalog::new(&layout));
        tracing::info!(
            source = %reader.path().display(),
            cpus = layout.cpu_rows(),
            columns = layout.columns(),
            "CPU collector initialized"
        );
        Ok(Self {
            reader,
            layout,
            store,
        })
    }

    pub fn layout(&self) -> &StatLayout {
        &self.layout
    }

    pub fn store(&self) -> &MetricStore {
        &self.store
    }

    /// Read the source and fold it into the store. On failure the store keeps
    /// the last good state.
    pub fn refresh(&mut self) -> Result<()> {
        let samples = self
            .reader
            .parse(self.layout.cpu_rows(), &self.layout.counter_kinds)?;
        self.store.refresh(samples, &self.layout.counter_kinds)
    }
}

impl Collector for CpuCollector {
    fn name(&self) -> &str {
        "cpu"
    }

    fn discover(&self) -> Vec<Namespace> {
        self.store.catalog().namespaces()
    }

    fn collect(
        &mut self,
        agent_id: &str,
        requests: &[Namespace],
    ) -> Result<Vec<Result<MetricDataPoint>>> {
        self.refresh()?;
        let now = Utc::now();

        let points = requests
            .iter()
            .map(|ns| -> Result<MetricDataPoint> {
                let value = self.store.lookup_namespace(ns)?;
                let mut labels = HashMap::new();
                labels.insert("cpu".to_string(), ns.cpu.clone());
                labels.insert("metric".to_string(), ns.metric.to_string());
                labels.insert("representation".to_string(), ns.representation.to_string());
                Ok(MetricDataPoint {
                    timestamp: now,
                    agent_id: agent_id.to_string(),
                    namespace: ns.to_string(),
                    value: value.as_f64(),
                    labels,
                })
            })
            .collect();

        Ok(points)
    }
}
