//! Metric namespace addressing.
//!
//! A namespace has five segments: `{vendor}/{subsystem}/{plugin}/{cpu}/{metric}`.
//! The last segment optionally carries a `_jiffies` or `_percentage` suffix;
//! a bare metric name selects jiffies. The legacy six-segment form with a
//! trailing `percentage` segment is accepted on parse.

use crate::types::{MetricKind, Representation};
use serde::{Deserialize, Serialize};

pub const VENDOR: &str = "intel";
pub const SUBSYSTEM: &str = "procfs";
pub const PLUGIN_NAME: &str = "cpu";

/// CPU identifier used for the aggregate row.
pub const ALL_CPU: &str = "all";

const SEPARATOR: char = '/';

/// A fully resolved metric address.
///
/// # Examples
///
/// ```
/// use oxcpu_common::namespace::Namespace;
/// use oxcpu_common::types::{MetricKind, Representation};
///
/// let ns: Namespace = "intel/procfs/cpu/11/active_percentage".parse().unwrap();
/// assert_eq!(ns.cpu, "11");
/// assert_eq!(ns.metric, MetricKind::Active);
/// assert_eq!(ns.representation, Representation::Percentage);
/// assert_eq!(ns.to_string(), "intel/procfs/cpu/11/active_percentage");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Namespace {
    pub cpu: String,
    pub metric: MetricKind,
    pub representation: Representation,
}

impl Namespace {
    pub fn new(cpu: impl Into<String>, metric: MetricKind, representation: Representation) -> Self {
        Self {
            cpu: cpu.into(),
            metric,
            representation,
        }
    }

    /// The metric segment, e.g. `guest_nice_jiffies`.
    pub fn metric_segment(&self) -> String {
        format!("{}_{}", self.metric, self.representation)
    }

    /// Namespace as individual segments.
    pub fn segments(&self) -> Vec<String> {
        vec![
            VENDOR.to_string(),
            SUBSYSTEM.to_string(),
            PLUGIN_NAME.to_string(),
            self.cpu.clone(),
            self.metric_segment(),
        ]
    }

    /// Resolve a namespace from its segments.
    pub fn from_segments<S: AsRef<str>>(segments: &[S]) -> Result<Self, String> {
        let parts: Vec<&str> = segments.iter().map(AsRef::as_ref).collect();
        let (prefix, cpu, metric, trailing) = match parts.as_slice() {
            [v, s, p, cpu, metric] => ([*v, *s, *p], *cpu, *metric, None),
            [v, s, p, cpu, metric, repr] => ([*v, *s, *p], *cpu, *metric, Some(*repr)),
            _ => return Err(format!("incorrect namespace length (len = {})", parts.len())),
        };

        if prefix != [VENDOR, SUBSYSTEM, PLUGIN_NAME] {
            return Err(format!("unexpected namespace prefix: {}", prefix.join("/")));
        }
        if !is_cpu_id(cpu) {
            return Err(format!("incorrect CPU identifier: {cpu}"));
        }

        let (metric, representation) = match trailing {
            Some(repr) => (metric.parse::<MetricKind>()?, repr.parse::<Representation>()?),
            None => split_metric_segment(metric)?,
        };

        Ok(Self::new(cpu, metric, representation))
    }
}

/// `all` or a non-empty run of ASCII digits.
pub fn is_cpu_id(id: &str) -> bool {
    id == ALL_CPU || (!id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()))
}

fn split_metric_segment(segment: &str) -> Result<(MetricKind, Representation), String> {
    for representation in Representation::ALL {
        let suffix = format!("_{representation}");
        if let Some(metric) = segment.strip_suffix(suffix.as_str()) {
            return Ok((metric.parse()?, representation));
        }
    }
    Ok((segment.parse()?, Representation::Jiffies))
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{VENDOR}{SEPARATOR}{SUBSYSTEM}{SEPARATOR}{PLUGIN_NAME}{SEPARATOR}{}{SEPARATOR}{}",
            self.cpu,
            self.metric_segment()
        )
    }
}

impl std::str::FromStr for Namespace {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let segments: Vec<&str> = s.trim().split(SEPARATOR).collect();
        Self::from_segments(&segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CounterKind;

    #[test]
    fn test_bare_metric_selects_jiffies() {
        let ns: Namespace = "intel/procfs/cpu/all/idle".parse().unwrap();
        assert_eq!(ns.metric, MetricKind::Counter(CounterKind::Idle));
        assert_eq!(ns.representation, Representation::Jiffies);
    }

    #[test]
    fn test_underscored_counter_with_suffix() {
        let ns: Namespace = "intel/procfs/cpu/3/guest_nice_percentage".parse().unwrap();
        assert_eq!(ns.metric, MetricKind::Counter(CounterKind::GuestNice));
        assert_eq!(ns.representation, Representation::Percentage);

        let ns: Namespace = "intel/procfs/cpu/3/guest_nice".parse().unwrap();
        assert_eq!(ns.metric, MetricKind::Counter(CounterKind::GuestNice));
        assert_eq!(ns.representation, Representation::Jiffies);
    }

    #[test]
    fn test_legacy_six_segment_form() {
        let ns = Namespace::from_segments(&["intel", "procfs", "cpu", "0", "user", "percentage"])
            .unwrap();
        assert_eq!(ns.cpu, "0");
        assert_eq!(ns.representation, Representation::Percentage);
    }

    #[test]
    fn test_rejects_malformed_namespaces() {
        assert!("intel/procfs/cpu/all".parse::<Namespace>().is_err());
        assert!("acme/procfs/cpu/all/user".parse::<Namespace>().is_err());
        assert!("intel/procfs/cpu/cpu1/user".parse::<Namespace>().is_err());
        assert!("intel/procfs/cpu/all/load_percentage".parse::<Namespace>().is_err());
        assert!("intel/procfs/cpu/all/user/rate".parse::<Namespace>().is_err());
    }

    #[test]
    fn test_display_matches_segments() {
        let ns = Namespace::new("all", MetricKind::Utilization, Representation::Jiffies);
        assert_eq!(ns.to_string(), ns.segments().join("/"));
        assert_eq!(ns.to_string().parse::<Namespace>().unwrap(), ns);
    }
}
