//! CPU metric collection for the oxcpu agent.
//!
//! [`stat::StatReader`] parses the per-CPU rows of `/proc/stat`,
//! [`store::MetricStore`] turns successive samples into jiffies and
//! percentages, and [`cpu::CpuCollector`] ties both to the [`Collector`]
//! interface the host calls into.

pub mod cpu;
pub mod error;
pub mod stat;
pub mod store;


use error::{CollectorError, Result};
use oxcpu_common::namespace::Namespace;
use oxcpu_common::types::MetricDataPoint;

/// A metric collector driven by a monitoring host.
///
/// The host calls [`discover`](Collector::discover) once to enumerate the
/// namespaces it may request, then [`collect`](Collector::collect) at each
/// collection interval.
pub trait Collector: Send + Sync {
    /// Returns the collector name (e.g., `"cpu"`), used for logging.
    fn name(&self) -> &str;

    /// Every namespace this collector can answer.
    fn discover(&self) -> Vec<Namespace>;

    /// Refreshes the underlying source and answers each requested namespace.
    ///
    /// # Errors
    ///
    /// The outer error fails the whole cycle (source unreadable or
    /// malformed). Per-metric failures are returned in place so the rest of
    /// the batch still succeeds.
    fn collect(
        &mut self,
        agent_id: &str,
        requests: &[Namespace],
    ) -> Result<Vec<Result<MetricDataPoint>>>;
}

/// Resolve a namespace string, reporting malformed input as
/// [`CollectorError::InvalidNamespace`].
pub fn parse_namespace(s: &str) -> Result<Namespace> {
    s.parse()
        .map_err(|e: String| CollectorError::InvalidNamespace(format!("{s}: {e}")))
}
