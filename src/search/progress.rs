//! Throughput reporter attached to a search's step loop.
//!
//! Counts steps in windows. When a window fills up it logs the rate in the finest
//! time unit that gives a value of at least one, then resizes the next window so
//! reports arrive roughly every `report_rate`. Purely observational: it never sees
//! the choice sequence except as an opaque status value.

use crate::search::config::ProgressConfig;
use num_format::{Locale, ToFormattedString};
use std::fmt::{self, Debug};
use std::time::{Duration, Instant};
use tracing::info;

/// Unit ladder: each factor converts the previous unit's rate into this one.
const UNITS: [(&str, f64); 6] = [
    ("sec", 1.0),
    ("min", 60.0),
    ("hr", 60.0),
    ("day", 24.0),
    ("wk", 7.0),
    ("month", 4.0),
];

/// A rate expressed in a human-friendly unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rate {
    pub value: f64,
    pub unit: &'static str,
}

impl Rate {
    /// Scale a per-second rate up the unit ladder until it reads at least 1.
    pub fn from_per_second(per_second: f64) -> Self {
        let mut value = per_second;
        let mut unit = UNITS[0].0;
        for &(name, factor) in &UNITS {
            value *= factor;
            unit = name;
            if value >= 1.0 {
                break;
            }
        }
        Self { value, unit }
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", format_decimal(self.value), self.unit)
    }
}

/// Thousands-separated count.
pub fn format_count(n: u64) -> String {
    n.to_formatted_string(&Locale::en)
}

/// Thousands-separated value with two decimals.
pub fn format_decimal(x: f64) -> String {
    let cents = (x.max(0.0) * 100.0).round() as u64;
    format!("{}.{:02}", format_count(cents / 100), cents % 100)
}

/// Window size that takes about `report_rate` at `count` steps per `elapsed`.
pub fn next_increment(count: u64, report_rate: Duration, elapsed: Duration) -> u64 {
    let elapsed = elapsed.as_secs_f64().max(1e-9);
    let next = count as f64 * report_rate.as_secs_f64() / elapsed;
    (next as u64).max(1)
}

pub struct Progress {
    name: String,
    increment: u64,
    report_rate: Duration,
    count: u64,
    total_count: u64,
    window_start: Instant,
}

impl Progress {
    pub fn new(config: &ProgressConfig) -> Self {
        Self {
            name: config.name.clone(),
            increment: config.increment.max(1),
            report_rate: config.report_rate,
            count: 0,
            total_count: 0,
            window_start: Instant::now(),
        }
    }

    /// Count one step; logs and returns the window's rate when the window fills.
    pub fn report(&mut self, status: Option<&dyn Debug>) -> Option<Rate> {
        self.count += 1;
        if self.count < self.increment {
            return None;
        }

        let elapsed = self.window_start.elapsed();
        let rate = Rate::from_per_second(self.count as f64 / elapsed.as_secs_f64().max(1e-9));
        self.increment = next_increment(self.count, self.report_rate, elapsed);

        info!(target: "progress", "{}: {} ...", self.name, rate);
        if let Some(status) = status {
            info!(target: "progress", "{:?}", status);
        }
        self.reset();
        Some(rate)
    }

    /// Log the cumulative count and close the current window. Returns the total.
    pub fn finish(&mut self) -> u64 {
        self.reset();
        info!(
            target: "progress",
            "{}: total progress count: {}",
            self.name,
            format_count(self.total_count)
        );
        self.total_count
    }

    /// Fold the current window into the total and start a new one.
    pub fn reset(&mut self) {
        self.total_count += self.count;
        self.count = 0;
        self.window_start = Instant::now();
    }

    /// Steps in the current window.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Steps in all closed windows.
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    /// Size of the current window.
    pub fn increment(&self) -> u64 {
        self.increment
    }
}
