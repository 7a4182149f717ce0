use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::{parse_date, FORMAT};
use crate::error::{Error, Result};
use crate::metric::{self, MetricConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Series {
    Cases,
    Deaths,
}

impl Series {
    pub fn label(self) -> &'static str {
        match self {
            Series::Cases => "Cases",
            Series::Deaths => "Deaths",
        }
    }
}

/// A node in the nation → state → county hierarchy.
///
/// Children are owned by their parent and kept in insertion order. Two
/// secondary indices sit next to them: code → position, and name → code.
#[derive(Debug, Clone, Default)]
pub struct Region {
    code: Option<String>,
    name: String,
    population: Option<u64>,
    cases: BTreeMap<NaiveDate, u64>,
    deaths: BTreeMap<NaiveDate, u64>,
    latest_cases_date: Option<NaiveDate>,
    latest_deaths_date: Option<NaiveDate>,
    children: Vec<Region>,
    by_code: HashMap<String, usize>,
    by_name: HashMap<String, String>,
}

impl Region {
    /// The national node. It is the only region without a code.
    pub fn root(name: &str, population: Option<u64>) -> Region {
        Region {
            name: name.to_string(),
            population,
            ..Region::default()
        }
    }

    fn new(code: &str, name: &str, population: Option<u64>) -> Region {
        Region {
            code: Some(code.to_string()),
            ..Region::root(name, population)
        }
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn population(&self) -> Option<u64> {
        self.population
    }

    /// Inserts a child, replacing any sibling with the same code. A replaced
    /// child keeps its position in the insertion order but loses its series
    /// and its own children: this is last-write-wins, not a merge.
    pub fn add_child(&mut self, code: &str, name: &str, population: Option<u64>) -> &mut Region {
        let child = Region::new(code, name, population);
        let index = match self.by_code.get(code) {
            Some(&index) => {
                let old_name = std::mem::replace(&mut self.children[index], child).name;
                if self.by_name.get(&old_name).map(String::as_str) == Some(code) {
                    self.by_name.remove(&old_name);
                }
                index
            }
            None => {
                self.children.push(child);
                self.by_code.insert(code.to_string(), self.children.len() - 1);
                self.children.len() - 1
            }
        };
        self.by_name.insert(name.to_string(), code.to_string());
        &mut self.children[index]
    }

    pub fn children(&self) -> &[Region] {
        &self.children
    }

    pub fn child(&self, code: &str) -> Option<&Region> {
        self.by_code.get(code).map(|&i| &self.children[i])
    }

    pub fn child_mut(&mut self, code: &str) -> Option<&mut Region> {
        match self.by_code.get(code) {
            Some(&i) => Some(&mut self.children[i]),
            None => None,
        }
    }

    /// Looks a direct child up by display name. Names are only unique
    /// among siblings; the most recently inserted child wins.
    pub fn child_by_name(&self, name: &str) -> Option<&Region> {
        self.by_name.get(name).and_then(|code| self.child(code))
    }

    pub fn child_by_name_mut(&mut self, name: &str) -> Option<&mut Region> {
        let code = self.by_name.get(name)?.clone();
        self.child_mut(&code)
    }

    /// Depth-first search of this region and everything below it.
    pub fn find_by_code(&self, code: &str) -> Option<&Region> {
        if self.code() == Some(code) {
            return Some(self);
        }
        if let Some(child) = self.child(code) {
            return Some(child);
        }
        self.children.iter().find_map(|c| c.find_by_code(code))
    }

    pub fn find_by_code_mut(&mut self, code: &str) -> Option<&mut Region> {
        if self.code() == Some(code) {
            return Some(self);
        }
        if let Some(&i) = self.by_code.get(code) {
            return Some(&mut self.children[i]);
        }
        self.children.iter_mut().find_map(|c| c.find_by_code_mut(code))
    }

    pub fn series(&self, series: Series) -> &BTreeMap<NaiveDate, u64> {
        match series {
            Series::Cases => &self.cases,
            Series::Deaths => &self.deaths,
        }
    }

    pub fn value_at(&self, series: Series, date: NaiveDate) -> Option<u64> {
        self.series(series).get(&date).copied()
    }

    pub fn latest_date(&self, series: Series) -> Option<NaiveDate> {
        match series {
            Series::Cases => self.latest_cases_date,
            Series::Deaths => self.latest_deaths_date,
        }
    }

    /// Cumulative value at the latest recorded date, if any.
    pub fn latest_value(&self, series: Series) -> Option<u64> {
        self.latest_date(series).and_then(|d| self.value_at(series, d))
    }

    fn slot(&mut self, series: Series) -> (&mut BTreeMap<NaiveDate, u64>, &mut Option<NaiveDate>) {
        match series {
            Series::Cases => (&mut self.cases, &mut self.latest_cases_date),
            Series::Deaths => (&mut self.deaths, &mut self.latest_deaths_date),
        }
    }

    /// Sets `series[date] = value`. Values are not checked against earlier
    /// dates, so a revised feed can leave the series non-monotonic.
    pub fn update(&mut self, series: Series, date: NaiveDate, value: u64) {
        let (values, latest) = self.slot(series);
        values.insert(date, value);
        if latest.map_or(true, |l| date > l) {
            *latest = Some(date);
        }
    }

    /// Adds one row's cases and deaths to whatever is already recorded for
    /// `date`. Nothing is written if either total would overflow.
    pub fn accumulate(&mut self, date: NaiveDate, cases: u64, deaths: u64) -> Result<()> {
        let add = |series: &BTreeMap<NaiveDate, u64>, value: u64| {
            series
                .get(&date)
                .copied()
                .unwrap_or(0)
                .checked_add(value)
                .ok_or(Error::CountOverflow(date))
        };
        let cases = add(&self.cases, cases)?;
        let deaths = add(&self.deaths, deaths)?;
        self.update(Series::Cases, date, cases);
        self.update(Series::Deaths, date, deaths);
        Ok(())
    }

    /// String form of [`Region::update`], as the feeds deliver it.
    pub fn record(&mut self, series: Series, date: &str, value: &str) -> Result<()> {
        let date = parse_date(date)?;
        let value = parse_count(value)?;
        self.update(series, date, value);
        Ok(())
    }

    /// Children ordered by `config` evaluated at each child's own latest
    /// date, highest first. Children without a value are left out; ties
    /// keep insertion order.
    pub fn ranked_children(&self, config: &MetricConfig) -> Vec<&Region> {
        let mut ranked = self
            .children
            .iter()
            .filter_map(|child| match metric::compute_latest(child, config) {
                Ok(Some(value)) => Some((child, value)),
                Ok(None) => {
                    log::debug!("{}: no {} value, left out of ranking", child, config);
                    None
                }
                Err(e) => {
                    log::debug!("{}: {}, left out of ranking", child, e);
                    None
                }
            })
            .collect::<Vec<(&Region, f64)>>();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked.into_iter().map(|(region, _)| region).collect()
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.code().unwrap_or("-"))?;
        if let Some(date) = self.latest_date(Series::Cases) {
            write!(
                f,
                ": {}, {} ({})",
                total(self.latest_value(Series::Cases)),
                total(self.latest_value(Series::Deaths)),
                date.format(FORMAT)
            )?;
        }
        Ok(())
    }
}

/// A count for display; absent shows as `-`, never as zero.
pub fn total(value: Option<u64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

pub fn parse_count(s: &str) -> Result<u64> {
    s.trim().parse::<u64>().map_err(|_| Error::InvalidCount(s.to_string()))
}
