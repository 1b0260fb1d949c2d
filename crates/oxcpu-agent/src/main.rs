mod config;

use anyhow::{Context, Result};
use oxcpu_collector::cpu::CpuCollector;
use oxcpu_collector::error::CollectorError;
use oxcpu_collector::{parse_namespace, Collector};
use oxcpu_common::namespace::Namespace;
use oxcpu_common::types::MetricDataPoint;
use std::io::Write;
use tokio::signal;
use tokio::time::{interval, sleep, Duration};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Collect on every interval until interrupted.
    Run,
    /// Print the metric catalog and exit.
    Discover,
    /// Collect twice, one interval apart, and exit.
    Collect,
}

impl std::str::FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "run" => Ok(Mode::Run),
            "discover" => Ok(Mode::Discover),
            "collect" => Ok(Mode::Collect),
            other => anyhow::bail!("unknown mode '{other}' (expected run, discover or collect)"),
        }
    }
}

/// Namespaces to request each cycle: the configured list, or the whole
/// catalog when none is configured.
fn resolve_requests(metrics: &[String], collector: &dyn Collector) -> Result<Vec<Namespace>> {
    let catalog = collector.discover();
    if metrics.is_empty() {
        return Ok(catalog);
    }

    let mut requests = Vec::with_capacity(metrics.len());
    for metric in metrics {
        let ns = parse_namespace(metric)?;
        if !catalog.contains(&ns) {
            tracing::warn!(namespace = %ns, "Requested metric is not in the catalog");
        }
        requests.push(ns);
    }
    Ok(requests)
}

/// Write data points as JSON lines and log per-metric failures.
fn emit(
    out: &mut impl Write,
    collector: &str,
    results: Vec<Result<MetricDataPoint, CollectorError>>,
) -> Result<usize> {
    let mut written = 0;
    for result in results {
        match result {
            Ok(point) => {
                serde_json::to_writer(&mut *out, &point)?;
                writeln!(out)?;
                written += 1;
            }
            Err(e) => tracing::warn!(collector, error = %e, "Metric lookup failed"),
        }
    }
    out.flush()?;
    Ok(written)
}

fn collect_once(collector: &mut dyn Collector, agent_id: &str, requests: &[Namespace]) {
    match collector.collect(agent_id, requests) {
        Ok(results) => {
            let stdout = std::io::stdout();
            match emit(&mut stdout.lock(), collector.name(), results) {
                Ok(count) => tracing::debug!(count, "Collected metrics"),
                Err(e) => tracing::error!(error = %e, "Failed to write metrics"),
            }
        }
        Err(e) => tracing::warn!(collector = collector.name(), error = %e, "Collection failed"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("oxcpu=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let config_path = args
        .next()
        .unwrap_or_else(|| "config/agent.toml".to_string());
    let mode = match args.next() {
        Some(m) => m.parse()?,
        None => Mode::Run,
    };

    let config = config::AgentConfig::load(&config_path)
        .with_context(|| format!("failed to load config from {config_path}"))?;
    tracing::info!(agent_id = %config.agent_id, ?mode, "oxcpu-agent starting");

    let mut collector: Box<dyn Collector> = Box::new(
        CpuCollector::new(&config.proc_path)
            .with_context(|| format!("failed to initialize CPU collector at {}", config.proc_path))?,
    );
    let period = Duration::from_secs(config.collection_interval_secs);

    match mode {
        Mode::Discover => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            for ns in collector.discover() {
                writeln!(out, "{ns}")?;
            }
        }
        Mode::Collect => {
            let requests = resolve_requests(&config.metrics, collector.as_ref())?;
            // The first cycle only primes the previous samples.
            if let Err(e) = collector.collect(&config.agent_id, &requests) {
                tracing::warn!(collector = collector.name(), error = %e, "Collection failed");
            }
            sleep(period).await;
            collect_once(collector.as_mut(), &config.agent_id, &requests);
        }
        Mode::Run => {
            let requests = resolve_requests(&config.metrics, collector.as_ref())?;
            let mut tick = interval(period);

            tracing::info!(
                interval_secs = config.collection_interval_secs,
                metrics = requests.len(),
                proc_path = %config.proc_path,
                "Starting collection loop"
            );

            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        collect_once(collector.as_mut(), &config.agent_id, &requests);
                    }
                    _ = signal::ctrl_c() => {
                        tracing::info!("Shutting down gracefully");
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn collector() -> (TempDir, CpuCollector) {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("stat"),
            "cpu 10 0 10 100 20 0 0 0\ncpu0 10 0 10 100 20 0 0 0\nintr 1\n",
        )
        .unwrap();
        let collector = CpuCollector::new(dir.path()).unwrap();
        (dir, collector)
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!("run".parse::<Mode>().unwrap(), Mode::Run);
        assert_eq!("discover".parse::<Mode>().unwrap(), Mode::Discover);
        assert_eq!("collect".parse::<Mode>().unwrap(), Mode::Collect);
        assert!("serve".parse::<Mode>().is_err());
    }

    #[test]
    fn test_empty_filter_requests_whole_catalog() {
        let (_dir, collector) = collector();
        let requests = resolve_requests(&[], &collector).unwrap();
        assert_eq!(requests.len(), 2 * 10 * 2);
    }

    #[test]
    fn test_filter_keeps_configured_order() {
        let (_dir, collector) = collector();
        let metrics = vec![
            "intel/procfs/cpu/0/utilization_percentage".to_string(),
            "intel/procfs/cpu/all/idle".to_string(),
        ];
        let requests = resolve_requests(&metrics, &collector).unwrap();
        assert_eq!(requests[0].to_string(), metrics[0]);
        assert_eq!(requests[1].to_string(), "intel/procfs/cpu/all/idle_jiffies");
    }

    #[test]
    fn test_invalid_filter_is_rejected() {
        let (_dir, collector) = collector();
        let metrics = vec!["intel/procfs/cpu/all".to_string()];
        assert!(resolve_requests(&metrics, &collector).is_err());
    }

    #[test]
    fn test_emit_writes_json_lines_and_skips_failures() {
        let (_dir, mut collector) = collector();
        let requests = vec![
            parse_namespace("intel/procfs/cpu/all/utilization_jiffies").unwrap(),
            parse_namespace("intel/procfs/cpu/9/user_jiffies").unwrap(),
            parse_namespace("intel/procfs/cpu/0/user_percentage").unwrap(),
        ];
        let results = collector.collect("web-01", &requests).unwrap();

        let mut out = Vec::new();
        assert_eq!(emit(&mut out, "cpu", results).unwrap(), 2);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["namespace"], "intel/procfs/cpu/all/utilization_jiffies");
        assert_eq!(lines[0]["value"], 20.0);
        assert!(lines[1]["value"].is_null());
    }
}
