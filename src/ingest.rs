//! Builds the region tree from population tables and fills it from the two
//! case/death feeds.
//!
//! State feed rows are `date, state, fips, cases, deaths`; county feed rows
//! are `date, county, state, fips, cases, deaths`. Both start with a header
//! row. A row whose date, code or counts do not parse is skipped; a feed
//! with the wrong number of columns is an error.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;

use crate::dates::parse_date;
use crate::error::{Error, Result};
use crate::population::{PopulationSource, Scope};
use crate::region::{parse_count, Region, Series};

pub const NATION_NAME: &str = "USA";

const STATE_CODE_WIDTH: usize = 2;
const COUNTY_CODE_WIDTH: usize = 5;

type StateRow = (String, String, String, String, String);
type CountyRow = (String, String, String, String, String, String);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IngestSummary {
    pub rows: usize,
    /// Rows written to a region in the tree.
    pub applied: usize,
    /// Rows without a code.
    pub uncoded: usize,
    /// Rows naming a region that is not in the tree.
    pub unknown: usize,
    pub malformed: usize,
}

/// Root from the nation table, states beneath it, then each county beneath
/// the state named by the first two digits of its code.
pub fn build_tree(source: &dyn PopulationSource) -> Result<Region> {
    let nation = source.populations(Scope::Nation)?;
    let mut root = match nation.first() {
        Some(record) => Region::root(&record.name, record.population),
        None => Region::root(NATION_NAME, None),
    };

    for state in source.populations(Scope::States)? {
        root.add_child(&state.code, &state.name, state.population);
    }

    let mut orphans = 0;
    for county in source.populations(Scope::Counties)? {
        let parent = county.code.get(..STATE_CODE_WIDTH).and_then(|code| root.child_mut(code));
        match parent {
            Some(state) => {
                state.add_child(&county.code, &county.name, county.population);
            }
            None => {
                log::debug!("No state for county {} ({})", county.name, county.code);
                orphans += 1;
            }
        }
    }

    log::info!(
        "Built region tree: {} states, {} counties, {} counties without a state",
        root.children().len(),
        root.children().iter().map(|s| s.children().len()).sum::<usize>(),
        orphans
    );
    Ok(root)
}

/// Zero-pads a numeric code, e.g. `"6"` → `"06"`. Empty means no code.
fn parse_code(raw: &str, width: usize) -> Result<Option<String>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    let code = raw
        .parse::<u64>()
        .map_err(|_| Error::InvalidCode(raw.to_string()))?;
    Ok(Some(format!("{:0width$}", code, width = width)))
}

type ParsedRow = (NaiveDate, Option<String>, u64, u64);

fn parse_row(date: &str, fips: &str, width: usize, cases: &str, deaths: &str) -> Result<ParsedRow> {
    Ok((parse_date(date)?, parse_code(fips, width)?, parse_count(cases)?, parse_count(deaths)?))
}

fn records<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new().has_headers(true).from_reader(reader)
}

/// Applies the state feed. Every row, coded or not, is added to the root's
/// national totals.
pub fn ingest_states<R: Read>(tree: &mut Region, reader: R) -> Result<IngestSummary> {
    let mut summary = IngestSummary::default();
    let mut rdr = records(reader);

    for result in rdr.records() {
        let record = result?;
        summary.rows += 1;
        let (date, name, fips, cases, deaths): StateRow = record.deserialize(None)?;

        let (date, code, cases, deaths) = match parse_row(&date, &fips, STATE_CODE_WIDTH, &cases, &deaths) {
            Ok(parsed) => parsed,
            Err(e) => {
                log::warn!("Skipping state row {:?}: {}", record, e);
                summary.malformed += 1;
                continue;
            }
        };

        if let Err(e) = tree.accumulate(date, cases, deaths) {
            log::warn!("Skipping state row {:?}: {}", record, e);
            summary.malformed += 1;
            continue;
        }

        let code = match code {
            Some(code) => code,
            None => {
                summary.uncoded += 1;
                continue;
            }
        };
        match tree.child_mut(&code) {
            Some(state) => {
                state.update(Series::Cases, date, cases);
                state.update(Series::Deaths, date, deaths);
                summary.applied += 1;
            }
            None => {
                log::debug!("Unknown state {} ({})", name, code);
                summary.unknown += 1;
            }
        }
    }

    log::info!("State feed: {:?}", summary);
    Ok(summary)
}

/// Applies the county feed. Rows without a county code are dropped: the
/// national totals already come from the state feed.
pub fn ingest_counties<R: Read>(tree: &mut Region, reader: R) -> Result<IngestSummary> {
    let mut summary = IngestSummary::default();
    let mut rdr = records(reader);

    for result in rdr.records() {
        let record = result?;
        summary.rows += 1;
        let (date, county, state, fips, cases, deaths): CountyRow = record.deserialize(None)?;

        let (date, code, cases, deaths) = match parse_row(&date, &fips, COUNTY_CODE_WIDTH, &cases, &deaths) {
            Ok(parsed) => parsed,
            Err(e) => {
                log::warn!("Skipping county row {:?}: {}", record, e);
                summary.malformed += 1;
                continue;
            }
        };

        let code = match code {
            Some(code) => code,
            None => {
                summary.uncoded += 1;
                continue;
            }
        };
        match tree.child_by_name_mut(&state).and_then(|s| s.child_mut(&code)) {
            Some(region) => {
                region.update(Series::Cases, date, cases);
                region.update(Series::Deaths, date, deaths);
                summary.applied += 1;
            }
            None => {
                log::debug!("Unknown county {}, {} ({})", county, state, code);
                summary.unknown += 1;
            }
        }
    }

    log::info!("County feed: {:?}", summary);
    Ok(summary)
}

pub fn ingest_states_file(tree: &mut Region, path: &Path) -> Result<IngestSummary> {
    log::info!("Reading state feed {}", path.display());
    ingest_states(tree, File::open(path)?)
}

pub fn ingest_counties_file(tree: &mut Region, path: &Path) -> Result<IngestSummary> {
    log::info!("Reading county feed {}", path.display());
    ingest_counties(tree, File::open(path)?)
}
