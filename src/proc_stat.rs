//! The kernel counter source: parses `/proc/stat` into [`Sample`]s and
//! batches them into [`SampleBundle`]s.

use crate::consts::{N_SAMPLES, PROC_STAT_PATH, TOTAL_SAMPLING_WINDOW};
use eyre::{Result, WrapErr};
use std::{collections::HashMap, fs, thread::sleep};
use thiserror::Error;

/// A `/proc/stat` line didn't match the kernel's documented format. The
/// format is kernel-supplied and stable, so every variant here is fatal:
/// there is no partial-parse fallback (§7: counter-file parse mismatch).
#[derive(Debug, Error)]
pub enum ParseError {
    /// A `cpu`/`cpuN` line reported a field that failed to parse as a
    /// nonnegative integer.
    #[error("malformed /proc/stat counter: {0}")]
    MalformedCounter(std::num::ParseIntError),
    /// A `cpu`/`cpuN` line reported fewer than the ten documented counters.
    #[error("unknown /proc/stat format: expected at least 10 counters, got {0}")]
    TooFewCounters(usize),
    /// A `cpuN` line's core id failed to parse.
    #[error("malformed cpuN id: {0}")]
    MalformedCoreId(std::num::ParseIntError),
    /// A `cpuN` line had no whitespace-separated id/field split.
    #[error("unknown /proc/stat format: malformed cpuN line")]
    MalformedCoreLine,
    /// The file had no aggregate `cpu` line at all.
    #[error("unknown /proc/stat format: no aggregate `cpu` line")]
    MissingAggregate,
}

/// One core's ten counters, straight off a `cpu`/`cpuN` line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CpuData {
    /// Time spent in user mode.
    pub user: u64,
    /// Time spent in user mode with low priority (nice).
    pub nice: u64,
    /// Time spent in system mode.
    pub system: u64,
    /// Time spent in the idle task.
    pub idle: u64,
    /// Time spent waiting for I/O to complete.
    pub iowait: u64,
    /// Time servicing interrupts.
    pub irq: u64,
    /// Time servicing softirqs.
    pub softirq: u64,
    /// Time stolen by other operating systems in a virtualized environment.
    pub steal: u64,
    /// Time spent running a guest operating system's virtual CPU.
    pub guest: u64,
    /// Time spent running a niced guest virtual CPU.
    pub guest_nice: u64,
    /// `false` for a core absent from this line of `/proc/stat`, or never
    /// reported at all (a gap in the `cpuN` numbering).
    pub online: bool,
}

/// One snapshot of every core's counters. Index 0 is the aggregate
/// "all-CPUs" row; index `c + 1` is core `c`.
#[derive(Clone, Debug, Default)]
pub struct Sample {
    /// Per-core counter rows, aggregate first.
    pub cpu_data: Vec<CpuData>,
}

impl Sample {
    /// Number of rows in this sample, aggregate included.
    #[must_use]
    pub fn length(&self) -> usize {
        self.cpu_data.len()
    }
}

/// `N_SAMPLES` samples taken at roughly equal sub-intervals over
/// [`TOTAL_SAMPLING_WINDOW`].
#[derive(Clone, Debug, Default)]
pub struct SampleBundle {
    /// Samples in acquisition order.
    pub samples: Vec<Sample>,
}

fn parse_fields(fields: &str) -> Result<CpuData, ParseError> {
    let mut values: Vec<u64> = fields
        .split_whitespace()
        .map(|field| field.parse::<u64>().map_err(ParseError::MalformedCounter))
        .collect::<Result<_, _>>()?;
    if values.len() < 10 {
        return Err(ParseError::TooFewCounters(values.len()));
    }
    values.truncate(10); // older kernel versions added fields over time; only the first 10 are defined here.
    let [user, nice, system, idle, iowait, irq, softirq, steal, guest, guest_nice] =
        <[u64; 10]>::try_from(values).expect("truncated to exactly 10 above");
    Ok(CpuData {
        user,
        nice,
        system,
        idle,
        iowait,
        irq,
        softirq,
        steal,
        guest,
        guest_nice,
        online: true,
    })
}

/// Reads and parses one `/proc/stat` snapshot. Parsing halts at the first
/// non-`cpu` line: everything after the per-core rows is irrelevant here.
/// Fatal on any I/O or format error (a machine without a well-formed
/// `/proc/stat` cannot be served, and there is no meaningful fallback).
pub fn read_sample() -> Result<Sample> {
    let text = fs::read_to_string(PROC_STAT_PATH).wrap_err("failed to read /proc/stat")?;
    Ok(parse_stat(&text)?)
}

fn parse_stat(text: &str) -> Result<Sample, ParseError> {
    let mut aggregate = None;
    let mut per_core: HashMap<usize, CpuData> = HashMap::new();
    let mut max_core: Option<usize> = None;

    for line in text.lines() {
        if !line.starts_with("cpu") {
            break;
        }
        if let Some(fields) = line.strip_prefix("cpu ") {
            aggregate = Some(parse_fields(fields.trim_start())?);
        } else if let Some(rest) = line.strip_prefix("cpu") {
            let (id, fields) =
                rest.split_once(char::is_whitespace).ok_or(ParseError::MalformedCoreLine)?;
            let core: usize = id.parse().map_err(ParseError::MalformedCoreId)?;
            per_core.insert(core, parse_fields(fields.trim_start())?);
            max_core = Some(max_core.map_or(core, |m| m.max(core)));
        } else {
            break;
        }
    }

    let Some(aggregate) = aggregate else {
        return Err(ParseError::MissingAggregate);
    };

    let mut cpu_data = vec![aggregate];
    if let Some(max_core) = max_core {
        for core in 0..=max_core {
            cpu_data.push(per_core.remove(&core).unwrap_or_default());
        }
    }
    Ok(Sample { cpu_data })
}

/// Collects one [`SampleBundle`], sleeping between sub-samples so the
/// whole bundle spans roughly [`TOTAL_SAMPLING_WINDOW`]. A signal
/// interrupting the sleep is benign: the caller re-checks the run flag on
/// the next iteration of its own loop, not this one.
pub fn read_bundle(mut ping: impl FnMut()) -> Result<SampleBundle> {
    let sub_interval = TOTAL_SAMPLING_WINDOW / N_SAMPLES as u32;
    let mut samples = Vec::with_capacity(N_SAMPLES);
    for i in 0..N_SAMPLES {
        ping();
        samples.push(read_sample()?);
        if i + 1 < N_SAMPLES {
            sleep(sub_interval);
        }
    }
    Ok(SampleBundle { samples })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(user: u64, idle: u64) -> String {
        format!("{user} 0 0 {idle} 0 0 0 0 0 0")
    }

    #[test]
    fn parses_aggregate_and_per_core_rows() {
        let text = format!(
            "cpu  {}\ncpu0 {}\ncpu1 {}\nintr 1234 ...\n",
            fields(100, 200),
            fields(50, 60),
            fields(40, 70),
        );
        let sample = parse_stat(&text).unwrap();
        assert_eq!(sample.length(), 3);
        assert!(sample.cpu_data.iter().all(|d| d.online));
        assert_eq!(sample.cpu_data[0].user, 100);
        assert_eq!(sample.cpu_data[1].idle, 60);
        assert_eq!(sample.cpu_data[2].idle, 70);
    }

    #[test]
    fn gaps_in_core_numbering_become_offline_rows() {
        let text = format!("cpu  {}\ncpu0 {}\ncpu2 {}\n", fields(10, 10), fields(1, 1), fields(1, 1));
        let sample = parse_stat(&text).unwrap();
        assert_eq!(sample.length(), 4); // aggregate + cpu0 + cpu1(missing) + cpu2
        assert!(sample.cpu_data[1].online);
        assert!(!sample.cpu_data[2].online);
        assert!(sample.cpu_data[3].online);
    }

    #[test]
    fn missing_aggregate_line_is_an_error() {
        assert!(parse_stat("intr 1\n").is_err());
    }
}
