//! Population tables used as per-capita denominators.
//!
//! The census estimates API answers with a JSON table whose first row is the
//! header, e.g. `[["NAME","POP","state"],["Alabama","4903185","01"]]`. Region
//! codes are the geography columns concatenated in order, so a county comes
//! out as its five digit state+county code.

use std::collections::HashMap;

use crate::download::fetch;
use crate::error::{Error, Result};

pub const CENSUS_URL: &str = "https://api.census.gov/data/2019/pep/population";

const NAME_COLUMN: &str = "NAME";
const POP_COLUMN: &str = "POP";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Nation,
    States,
    Counties,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PopulationRecord {
    pub code: String,
    pub name: String,
    pub population: Option<u64>,
}

pub trait PopulationSource {
    /// All records for `scope`. Called once per scope while the region tree
    /// is built.
    fn populations(&self, scope: Scope) -> Result<Vec<PopulationRecord>>;
}

pub struct CensusPopulation {
    base_url: String,
}

impl CensusPopulation {
    pub fn new(base_url: &str) -> CensusPopulation {
        CensusPopulation {
            base_url: base_url.to_string(),
        }
    }

    pub fn url(&self, scope: Scope) -> String {
        let geography = match scope {
            Scope::Nation => "us:*",
            Scope::States => "state:*",
            Scope::Counties => "county:*",
        };
        format!("{}?get={},{}&for={}", self.base_url, NAME_COLUMN, POP_COLUMN, geography)
    }
}

impl Default for CensusPopulation {
    fn default() -> Self {
        CensusPopulation::new(CENSUS_URL)
    }
}

impl PopulationSource for CensusPopulation {
    fn populations(&self, scope: Scope) -> Result<Vec<PopulationRecord>> {
        let url = self.url(scope);
        log::info!("Fetching {:?} population from {}", scope, url);
        parse_census_table(&fetch(&url)?)
    }
}

pub fn parse_census_table(body: &[u8]) -> Result<Vec<PopulationRecord>> {
    let table: Vec<Vec<Option<String>>> = serde_json::from_slice(body)?;
    let mut rows = table.into_iter();
    let header = rows
        .next()
        .ok_or_else(|| Error::InvalidTable("empty population table".to_string()))?
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect::<Vec<String>>();

    let column = |name: &str| {
        header
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| Error::InvalidTable(format!("population table has no {} column", name)))
    };
    let name_col = column(NAME_COLUMN)?;
    let pop_col = column(POP_COLUMN)?;
    let geo_cols = (0..header.len()).filter(|&i| i != name_col && i != pop_col).collect::<Vec<usize>>();

    let mut records = vec![];
    for row in rows {
        if row.len() != header.len() {
            log::warn!("Skipping population row with {} columns: {:?}", row.len(), row);
            continue;
        }
        let code = geo_cols
            .iter()
            .map(|&i| row[i].as_deref().unwrap_or(""))
            .collect::<String>();
        let name = row[name_col].as_deref().unwrap_or("");
        // counties arrive as "Autauga County, Alabama"
        let name = name.split(',').next().unwrap_or(name).trim().to_string();
        let population = row[pop_col].as_deref().and_then(|p| p.trim().parse::<u64>().ok());
        records.push(PopulationRecord { code, name, population });
    }
    Ok(records)
}

/// In-memory population tables, keyed by scope.
#[derive(Debug, Clone, Default)]
pub struct StaticPopulation {
    tables: HashMap<Scope, Vec<PopulationRecord>>,
}

impl StaticPopulation {
    pub fn new() -> StaticPopulation {
        StaticPopulation::default()
    }

    pub fn with(mut self, scope: Scope, code: &str, name: &str, population: Option<u64>) -> StaticPopulation {
        self.tables.entry(scope).or_insert_with(Vec::new).push(PopulationRecord {
            code: code.to_string(),
            name: name.to_string(),
            population,
        });
        self
    }
}

impl PopulationSource for StaticPopulation {
    fn populations(&self, scope: Scope) -> Result<Vec<PopulationRecord>> {
        Ok(self.tables.get(&scope).cloned().unwrap_or_default())
    }
}
