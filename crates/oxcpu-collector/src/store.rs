//! Derived CPU metrics and the state needed to compute them.
//!
//! [`MetricStore`] keeps the previous [`CpuSample`] of every CPU and one
//! [`MetricRecord`] per `(cpu, metric)` pair. Each refresh turns the new
//! samples into absolute jiffies and into percentages of the interval since
//! the previous refresh.

use crate::error::{CollectorError, Result};
use crate::stat::{CpuSample, StatLayout};
use oxcpu_common::namespace::Namespace;
use oxcpu_common::types::{CounterKind, MetricKind, Representation};
use std::collections::HashMap;

/// Latest derived state of one metric on one CPU.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricRecord {
    /// Absolute value in jiffies.
    pub raw: u64,
    /// Share of the last interval, or `None` when the rate is undefined.
    pub percentage: Option<f64>,
}

/// Result of a point lookup.
///
/// `Percentage(None)` means the rate is undefined for the last interval. It is
/// a valid answer, not an error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Jiffies(u64),
    Percentage(Option<f64>),
}

impl MetricValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetricValue::Jiffies(raw) => Some(*raw as f64),
            MetricValue::Percentage(pct) => *pct,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SeriesKey {
    cpu: String,
    metric: MetricKind,
}

impl SeriesKey {
    fn new(cpu: &str, metric: MetricKind) -> Self {
        Self {
            cpu: cpu.to_string(),
            metric,
        }
    }
}

/// Every namespace the collector answers, fixed at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricCatalog {
    cpu_ids: Vec<String>,
    metrics: Vec<MetricKind>,
}

impl MetricCatalog {
    pub fn new(layout: &StatLayout) -> Self {
        Self {
            cpu_ids: layout.cpu_ids.clone(),
            metrics: MetricKind::ordered(&layout.counter_kinds),
        }
    }

    pub fn cpu_ids(&self) -> &[String] {
        &self.cpu_ids
    }

    pub fn metrics(&self) -> &[MetricKind] {
        &self.metrics
    }

    pub fn len(&self) -> usize {
        self.cpu_ids.len() * self.metrics.len() * Representation::ALL.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, namespace: &Namespace) -> bool {
        self.cpu_ids.contains(&namespace.cpu) && self.metrics.contains(&namespace.metric)
    }

    /// All namespaces, grouped by CPU then metric then representation.
    pub fn namespaces(&self) -> Vec<Namespace> {
        let mut out = Vec::with_capacity(self.len());
        for cpu in &self.cpu_ids {
            for metric in &self.metrics {
                for representation in Representation::ALL {
                    out.push(Namespace::new(cpu.clone(), *metric, representation));
                }
            }
        }
        out
    }
}

/// Owns previous samples and derived records for every CPU.
#[derive(Debug)]
pub struct MetricStore {
    catalog: MetricCatalog,
    previous: HashMap<String, CpuSample>,
    records: HashMap<SeriesKey, MetricRecord>,
}

impl MetricStore {
    pub fn new(catalog: MetricCatalog) -> Self {
        Self {
            catalog,
            previous: HashMap::new(),
            records: HashMap::new(),
        }
    }

    pub fn catalog(&self) -> &MetricCatalog {
        &self.catalog
    }

    /// Fold a new set of samples into the store.
    ///
    /// Metrics are computed in `MetricKind::ordered` order: `active` and
    /// `utilization` read the idle and iowait values committed earlier in the
    /// same refresh.
    ///
    /// # Errors
    ///
    /// Returns `Format` and leaves the store untouched if any sample's
    /// columns differ from `counter_kinds`.
    pub fn refresh(&mut self, samples: Vec<CpuSample>, counter_kinds: &[CounterKind]) -> Result<()> {
        for sample in &samples {
            let kinds: Vec<CounterKind> = sample.counters.iter().map(|(kind, _)| *kind).collect();
            if kinds != counter_kinds {
                return Err(CollectorError::Format(format!(
                    "CPU {} has {} counter columns, expected {}",
                    sample.id,
                    kinds.len(),
                    counter_kinds.len()
                )));
            }
        }

        let metrics = MetricKind::ordered(counter_kinds);
        for sample in samples {
            self.refresh_cpu(&sample, &metrics);
            self.previous.insert(sample.id.clone(), sample);
        }
        Ok(())
    }

    fn refresh_cpu(&mut self, sample: &CpuSample, metrics: &[MetricKind]) {
        let delta_sum = self
            .previous
            .get(&sample.id)
            .map(|prev| i128::from(sample.sum) - i128::from(prev.sum));

        if let Some(delta) = delta_sum.filter(|d| *d <= 0) {
            tracing::debug!(
                cpu = %sample.id,
                delta = %delta,
                "Counter sum did not advance, percentages undefined"
            );
        }

        for metric in metrics {
            let raw = match metric {
                MetricKind::Counter(kind) => sample.counter(*kind).unwrap_or(0),
                MetricKind::Active => sample
                    .sum
                    .saturating_sub(self.committed_raw(&sample.id, CounterKind::Idle)),
                MetricKind::Utilization => sample
                    .sum
                    .saturating_sub(self.committed_raw(&sample.id, CounterKind::Idle))
                    .saturating_sub(self.committed_raw(&sample.id, CounterKind::Iowait)),
            };

            let key = SeriesKey::new(&sample.id, *metric);
            let previous_raw = self.records.get(&key).map(|record| record.raw);

            let mut percentage = None;
            if let (Some(delta), Some(prev)) = (delta_sum, previous_raw) {
                if delta > 0 {
                    let pct = 100.0 * (raw as f64 - prev as f64) / delta as f64;
                    if pct < 0.0 {
                        tracing::warn!(
                            cpu = %sample.id,
                            metric = %metric,
                            previous = prev,
                            current = raw,
                            "Counter decreased, percentage undefined"
                        );
                    } else {
                        percentage = Some(pct);
                    }
                }
            }

            self.records.insert(key, MetricRecord { raw, percentage });
        }
    }

    /// Raw value committed for `kind`, or 0 when the column is absent.
    fn committed_raw(&self, cpu: &str, kind: CounterKind) -> u64 {
        self.records
            .get(&SeriesKey::new(cpu, MetricKind::Counter(kind)))
            .map(|record| record.raw)
            .unwrap_or(0)
    }

    pub fn record(&self, cpu: &str, metric: MetricKind) -> Option<&MetricRecord> {
        self.records.get(&SeriesKey::new(cpu, metric))
    }

    /// Point lookup of one metric.
    ///
    /// # Errors
    ///
    /// `UnknownMetric` if the CPU or the metric has never been computed.
    pub fn lookup(
        &self,
        cpu: &str,
        metric: MetricKind,
        representation: Representation,
    ) -> Result<MetricValue> {
        let record = self
            .record(cpu, metric)
            .ok_or_else(|| CollectorError::UnknownMetric {
                cpu: cpu.to_string(),
                metric: format!("{metric}_{representation}"),
            })?;

        Ok(match representation {
            Representation::Jiffies => MetricValue::Jiffies(record.raw),
            Representation::Percentage => MetricValue::Percentage(record.percentage),
        })
    }

    pub fn lookup_namespace(&self, namespace: &Namespace) -> Result<MetricValue> {
        self.lookup(&namespace.cpu, namespace.metric, namespace.representation)
    }
}
