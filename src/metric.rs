//! Derived views over a region's cumulative series.
//!
//! A value is computed in a fixed order: the raw cumulative count (or its
//! smoothed daily change), then the per-capita scale, then the natural log.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::{date_range, day_before};
use crate::error::{Error, Result};
use crate::region::{Region, Series};

/// Number of trailing day-pairs averaged by a change view.
pub const CHANGE_WINDOW: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricConfig {
    pub series: Series,
    /// Scale factor `k` for `value * k / population`.
    #[serde(default)]
    pub per_capita: Option<f64>,
    #[serde(default)]
    pub change: bool,
    #[serde(default)]
    pub log: bool,
}

impl MetricConfig {
    pub fn new(series: Series) -> MetricConfig {
        MetricConfig {
            series,
            per_capita: None,
            change: false,
            log: false,
        }
    }

    pub fn with_per_capita(mut self, scale: f64) -> MetricConfig {
        self.per_capita = Some(scale);
        self
    }

    pub fn with_change(mut self) -> MetricConfig {
        self.change = true;
        self
    }

    pub fn with_log(mut self) -> MetricConfig {
        self.log = true;
        self
    }

    /// Y axis label, e.g. "Daily New Cases (5-day average, per 10000)".
    pub fn axis_label(&self) -> String {
        let base = if self.change {
            format!("Daily New {}", self.series.label())
        } else {
            format!("Cumulative Number of {}", self.series.label())
        };
        let mut qualifiers = vec![];
        if self.change {
            qualifiers.push(format!("{}-day average", CHANGE_WINDOW));
        }
        if let Some(k) = self.per_capita {
            qualifiers.push(format!("per {}", k));
        }
        if self.log {
            qualifiers.push("natural log".to_string());
        }
        if qualifiers.is_empty() {
            base
        } else {
            format!("{} ({})", base, qualifiers.join(", "))
        }
    }

    /// Chart title for `region_name`, e.g. "COVID-19 Cases Per Capita in Ohio".
    pub fn title(&self, region_name: &str) -> String {
        format!(
            "COVID-19 {}{}{} in {}",
            if self.change { "New " } else { "" },
            self.series.label(),
            if self.per_capita.is_some() { " Per Capita" } else { "" },
            region_name
        )
    }
}

impl fmt::Display for MetricConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.series.label().to_lowercase())?;
        if self.change {
            write!(f, " change")?;
        }
        if let Some(k) = self.per_capita {
            write!(f, " per {}", k)?;
        }
        if self.log {
            write!(f, " (ln)")?;
        }
        Ok(())
    }
}

/// Mean of the available one-day differences over the trailing window
/// ending at `date`. Pairs with a missing day are skipped.
pub fn trailing_change(series: &BTreeMap<NaiveDate, u64>, date: NaiveDate) -> Option<f64> {
    let diffs = (0..CHANGE_WINDOW)
        .filter_map(|i| {
            let current = series.get(&day_before(date, i))?;
            let previous = series.get(&day_before(date, i + 1))?;
            Some(*current as f64 - *previous as f64)
        })
        .collect::<Vec<f64>>();
    if diffs.is_empty() {
        return None;
    }
    Some(diffs.iter().sum::<f64>() / diffs.len() as f64)
}

/// `Ok(None)` means the value is absent: no data at `date`, not enough
/// history for a change, or no usable population or scale for a
/// per-capita view.
/// A log of a non-positive value is an [`Error::InvalidDomain`].
pub fn compute(region: &Region, date: NaiveDate, config: &MetricConfig) -> Result<Option<f64>> {
    let series = region.series(config.series);
    let base = if config.change {
        trailing_change(series, date)
    } else {
        series.get(&date).map(|&v| v as f64)
    };
    let mut value = match base {
        Some(value) => value,
        None => return Ok(None),
    };

    if let Some(scale) = config.per_capita {
        if !(scale.is_finite() && scale > 0.0) {
            log::debug!("{}: per-capita scale {} is not positive", region.name(), scale);
            return Ok(None);
        }
        match region.population() {
            Some(population) if population > 0 => value = value * scale / population as f64,
            _ => return Ok(None),
        }
    }

    if config.log {
        if !(value > 0.0) {
            return Err(Error::InvalidDomain(value));
        }
        value = value.ln();
    }

    Ok(Some(value))
}

/// [`compute`] at the region's latest date for the configured series.
pub fn compute_latest(region: &Region, config: &MetricConfig) -> Result<Option<f64>> {
    match region.latest_date(config.series) {
        Some(date) => compute(region, date, config),
        None => Ok(None),
    }
}

/// One point per calendar day in `[start, end]`. Days without a value,
/// including days whose log would be undefined, come out as `None`.
pub fn plot_series(
    region: &Region,
    start: NaiveDate,
    end: NaiveDate,
    config: &MetricConfig,
) -> Result<Vec<(NaiveDate, Option<f64>)>> {
    Ok(date_range(start, end)?
        .into_iter()
        .map(|date| match compute(region, date, config) {
            Ok(value) => (date, value),
            Err(e) => {
                log::trace!("{} on {}: {}", region.name(), date, e);
                (date, None)
            }
        })
        .collect())
}
