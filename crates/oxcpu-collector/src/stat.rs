//! Reader for the per-CPU rows of `/proc/stat`.
//!
//! The kernel prints one aggregate `cpu` row followed by one `cpuN` row per
//! online core, each carrying cumulative jiffies for up to ten counters.
//! Older kernels print fewer columns, so the column count is probed once and
//! then enforced on every read.

use crate::error::{CollectorError, Result};
use oxcpu_common::namespace::ALL_CPU;
use oxcpu_common::types::CounterKind;
use std::path::{Path, PathBuf};

/// File name of the counter source inside the proc directory.
pub const STAT_FILE: &str = "stat";

/// Identifier prefix of CPU rows; the bare prefix is the aggregate row.
pub const CPU_ROW_PREFIX: &str = "cpu";

/// One CPU's counters at one sampling instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuSample {
    /// `"all"` for the aggregate row, otherwise the core index.
    pub id: String,
    /// Counter values in file order.
    pub counters: Vec<(CounterKind, u64)>,
    /// Sum of all counters.
    pub sum: u64,
}

impl CpuSample {
    pub fn counter(&self, kind: CounterKind) -> Option<u64> {
        self.counters
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, value)| *value)
    }
}

/// Shape of the counter source as seen at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatLayout {
    /// Identifiers of every CPU row, aggregate first.
    pub cpu_ids: Vec<String>,
    /// Counter columns exposed by this kernel, in file order.
    pub counter_kinds: Vec<CounterKind>,
}

impl StatLayout {
    pub fn cpu_rows(&self) -> usize {
        self.cpu_ids.len()
    }

    pub fn columns(&self) -> usize {
        self.counter_kinds.len()
    }
}

/// Opens, scans and closes the counter source on every call. Holds no state
/// besides the source path.
#[derive(Debug, Clone)]
pub struct StatReader {
    path: PathBuf,
}

impl StatReader {
    /// Reader for `<proc_path>/stat`.
    pub fn new(proc_path: impl AsRef<Path>) -> Self {
        Self {
            path: proc_path.as_ref().join(STAT_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Detect the number of CPU rows and counter columns.
    ///
    /// # Errors
    ///
    /// `SourceUnavailable` if the file cannot be read, `Format` if it is empty
    /// or the CPU rows disagree on their width.
    pub fn probe(&self) -> Result<StatLayout> {
        let layout = probe_str(&self.read()?)?;
        tracing::debug!(
            path = %self.path.display(),
            cpu_rows = layout.cpu_rows(),
            columns = layout.columns(),
            "Probed stat layout"
        );
        Ok(layout)
    }

    /// Read the first `cpu_rows` lines as CPU samples.
    ///
    /// # Errors
    ///
    /// Fails without returning any sample if a row is missing, has the wrong
    /// width or carries a non-numeric counter.
    pub fn parse(&self, cpu_rows: usize, counter_kinds: &[CounterKind]) -> Result<Vec<CpuSample>> {
        parse_str(&self.read()?, cpu_rows, counter_kinds)
    }

    fn read(&self) -> Result<String> {
        std::fs::read_to_string(&self.path).map_err(|source| CollectorError::SourceUnavailable {
            path: self.path.clone(),
            source,
        })
    }
}

/// Probe an in-memory copy of the counter source.
pub fn probe_str(content: &str) -> Result<StatLayout> {
    let mut lines = content.lines().map(|line| line.split_whitespace().collect::<Vec<_>>());

    let first = match lines.next() {
        Some(fields) if !fields.is_empty() => fields,
        _ => return Err(CollectorError::Format("no data in stat source".to_string())),
    };

    let columns = first.len() - 1;
    if columns == 0 || columns > CounterKind::ALL.len() {
        return Err(CollectorError::Format(format!(
            "unsupported number of counter columns: {columns}"
        )));
    }
    if !first[0].contains(CPU_ROW_PREFIX) {
        return Err(CollectorError::Format(format!(
            "first line is not a CPU row: {}",
            first[0]
        )));
    }

    let mut cpu_ids = Vec::new();
    for fields in std::iter::once(first).chain(lines) {
        match fields.first() {
            Some(token) if token.contains(CPU_ROW_PREFIX) => {}
            _ => break,
        }
        if fields.len() != columns + 1 {
            return Err(CollectorError::Format(format!(
                "CPU row {} has {} fields, expected {}",
                fields[0],
                fields.len(),
                columns + 1
            )));
        }
        cpu_ids.push(cpu_id(fields[0])?);
    }

    Ok(StatLayout {
        cpu_ids,
        counter_kinds: CounterKind::for_columns(columns).to_vec(),
    })
}

/// Parse an in-memory copy of the counter source.
pub fn parse_str(
    content: &str,
    cpu_rows: usize,
    counter_kinds: &[CounterKind],
) -> Result<Vec<CpuSample>> {
    let mut lines = content.lines();
    let mut samples = Vec::with_capacity(cpu_rows);

    for row in 0..cpu_rows {
        let line_no = row + 1;
        let line = lines.next().ok_or_else(|| {
            CollectorError::Format(format!("expected {cpu_rows} CPU rows, found {row}"))
        })?;

        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 2 || fields.len() - 1 != counter_kinds.len() {
            return Err(CollectorError::Format(format!(
                "incorrect length of line {line_no} (len: {}, expected {})",
                fields.len(),
                counter_kinds.len() + 1
            )));
        }

        let id = cpu_id(fields[0])?;
        let mut counters = Vec::with_capacity(counter_kinds.len());
        let mut sum: u64 = 0;
        for (index, (kind, raw)) in counter_kinds.iter().zip(&fields[1..]).enumerate() {
            let value = raw.parse::<u64>().map_err(|e| CollectorError::Parse {
                line: line_no,
                field: index + 1,
                reason: format!("{raw:?}: {e}"),
            })?;
            sum = sum.checked_add(value).ok_or_else(|| CollectorError::Parse {
                line: line_no,
                field: index + 1,
                reason: "counter sum overflows".to_string(),
            })?;
            counters.push((*kind, value));
        }

        samples.push(CpuSample { id, counters, sum });
    }

    Ok(samples)
}

/// Map a row identifier to a CPU id: `cpu` → `all`, `cpu11` → `11`.
pub fn cpu_id(token: &str) -> Result<String> {
    if token == CPU_ROW_PREFIX {
        return Ok(ALL_CPU.to_string());
    }
    match token.strip_prefix(CPU_ROW_PREFIX) {
        Some(index) if !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()) => {
            Ok(index.to_string())
        }
        _ => Err(CollectorError::Format(format!(
            "unexpected CPU row identifier: {token}"
        ))),
    }
}
