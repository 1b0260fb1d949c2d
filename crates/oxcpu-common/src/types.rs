use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single collected value, tagged with the namespace it answers.
///
/// `value` is `None` when a percentage rate is undefined for the interval
/// (first sample, flat interval or counter regression).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricDataPoint {
    pub timestamp: DateTime<Utc>,
    pub agent_id: String,
    pub namespace: String,
    pub value: Option<f64>,
    pub labels: HashMap<String, String>,
}

/// A `/proc/stat` CPU counter column, in kernel column order.
///
/// # Examples
///
/// ```
/// use oxcpu_common::types::CounterKind;
///
/// let kind: CounterKind = "guest_nice".parse().unwrap();
/// assert_eq!(kind, CounterKind::GuestNice);
/// assert_eq!(kind.to_string(), "guest_nice");
/// assert_eq!(CounterKind::for_columns(7).len(), 7);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterKind {
    User,
    Nice,
    System,
    Idle,
    Iowait,
    Irq,
    Softirq,
    Steal,
    Guest,
    GuestNice,
}

impl CounterKind {
    /// Every column a kernel may expose, in file order.
    pub const ALL: [CounterKind; 10] = [
        CounterKind::User,
        CounterKind::Nice,
        CounterKind::System,
        CounterKind::Idle,
        CounterKind::Iowait,
        CounterKind::Irq,
        CounterKind::Softirq,
        CounterKind::Steal,
        CounterKind::Guest,
        CounterKind::GuestNice,
    ];

    /// The leading `columns` kinds. Older kernels only print a prefix of the
    /// full column set.
    pub fn for_columns(columns: usize) -> &'static [CounterKind] {
        &Self::ALL[..columns.min(Self::ALL.len())]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CounterKind::User => "user",
            CounterKind::Nice => "nice",
            CounterKind::System => "system",
            CounterKind::Idle => "idle",
            CounterKind::Iowait => "iowait",
            CounterKind::Irq => "irq",
            CounterKind::Softirq => "softirq",
            CounterKind::Steal => "steal",
            CounterKind::Guest => "guest",
            CounterKind::GuestNice => "guest_nice",
        }
    }
}

impl std::fmt::Display for CounterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CounterKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CounterKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown counter kind: {s}"))
    }
}

/// A queryable metric: a raw counter column or one of the derived figures.
///
/// `Active` is everything except idle; `Utilization` additionally excludes
/// iowait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Counter(CounterKind),
    Active,
    Utilization,
}

impl MetricKind {
    pub const DERIVED: [MetricKind; 2] = [MetricKind::Active, MetricKind::Utilization];

    /// The metric kinds available for a kernel exposing `counters`, in the
    /// order they must be computed: source columns first, derived last.
    pub fn ordered(counters: &[CounterKind]) -> Vec<MetricKind> {
        counters
            .iter()
            .copied()
            .map(MetricKind::Counter)
            .chain(Self::DERIVED)
            .collect()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter(kind) => kind.as_str(),
            MetricKind::Active => "active",
            MetricKind::Utilization => "utilization",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MetricKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(MetricKind::Active),
            "utilization" => Ok(MetricKind::Utilization),
            other => other
                .parse::<CounterKind>()
                .map(MetricKind::Counter)
                .map_err(|_| format!("unknown metric: {s}")),
        }
    }
}

/// How a metric value is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Representation {
    /// Cumulative jiffies since boot.
    Jiffies,
    /// Share of the interval since the previous sample, in percent.
    Percentage,
}

impl Representation {
    pub const ALL: [Representation; 2] = [Representation::Jiffies, Representation::Percentage];

    pub fn as_str(&self) -> &'static str {
        match self {
            Representation::Jiffies => "jiffies",
            Representation::Percentage => "percentage",
        }
    }
}

impl std::fmt::Display for Representation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Representation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "jiffies" => Ok(Representation::Jiffies),
            "percentage" => Ok(Representation::Percentage),
            _ => Err(format!("unknown representation: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_kind_round_trip_names() {
        for kind in CounterKind::ALL {
            assert_eq!(kind.as_str().parse::<CounterKind>().unwrap(), kind);
        }
        assert!("steal_time".parse::<CounterKind>().is_err());
    }

    #[test]
    fn test_for_columns_is_prefix() {
        assert_eq!(
            CounterKind::for_columns(8).last(),
            Some(&CounterKind::Steal)
        );
        assert_eq!(CounterKind::for_columns(10), &CounterKind::ALL[..]);
        assert_eq!(CounterKind::for_columns(42).len(), 10);
    }

    #[test]
    fn test_metric_kind_ordered_puts_derived_last() {
        let kinds = MetricKind::ordered(CounterKind::for_columns(7));
        assert_eq!(kinds.len(), 9);
        assert_eq!(kinds[3], MetricKind::Counter(CounterKind::Idle));
        assert_eq!(kinds[7], MetricKind::Active);
        assert_eq!(kinds[8], MetricKind::Utilization);
    }

    #[test]
    fn test_metric_kind_parse() {
        assert_eq!("active".parse::<MetricKind>().unwrap(), MetricKind::Active);
        assert_eq!(
            "iowait".parse::<MetricKind>().unwrap(),
            MetricKind::Counter(CounterKind::Iowait)
        );
        assert!("load".parse::<MetricKind>().is_err());
    }

    #[test]
    fn test_data_point_serializes_undefined_value_as_null() {
        let point = MetricDataPoint {
            timestamp: Utc::now(),
            agent_id: "web-01".to_string(),
            namespace: "intel/procfs/cpu/all/user_percentage".to_string(),
            value: None,
            labels: HashMap::new(),
        };
        let json = serde_json::to_value(&point).unwrap();
        assert!(json["value"].is_null());
        assert_eq!(json["agent_id"], "web-01");
    }
}
