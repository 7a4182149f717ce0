use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::date_format;
use crate::error::{Error, Result};
use crate::metric::MetricConfig;
use crate::population::CENSUS_URL;
use crate::region::Series;

pub const CONFIG_FILE: &str = "charts.json";
pub const DEFAULT_TOP: usize = 20;
pub const PER_10K: f64 = 10_000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub states_feed: PathBuf,
    pub counties_feed: PathBuf,
    pub states_url: String,
    pub counties_url: String,
    pub census_url: String,
    pub output_dir: PathBuf,
    #[serde(with = "date_format")]
    pub start_date: NaiveDate,
    pub charts: Vec<ChartConfig>,
}

/// One output chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartConfig {
    /// Output file name inside the output directory.
    pub file: String,
    /// Code of the region to chart; the nation when absent.
    #[serde(default)]
    pub region: Option<String>,
    #[serde(flatten)]
    pub metric: MetricConfig,
    /// Plot the `top` highest ranked sub-regions instead of the region.
    #[serde(default)]
    pub top: Option<usize>,
}

impl ChartConfig {
    fn new(file: &str, region: Option<&str>, metric: MetricConfig, top: Option<usize>) -> ChartConfig {
        ChartConfig {
            file: file.to_string(),
            region: region.map(str::to_string),
            metric,
            top,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let cases = MetricConfig::new(Series::Cases);
        let deaths = MetricConfig::new(Series::Deaths);
        Config {
            states_feed: PathBuf::from("data/us-states.csv"),
            counties_feed: PathBuf::from("data/us-counties.csv"),
            states_url: "https://raw.githubusercontent.com/nytimes/covid-19-data/master/us-states.csv".to_string(),
            counties_url: "https://raw.githubusercontent.com/nytimes/covid-19-data/master/us-counties.csv".to_string(),
            census_url: CENSUS_URL.to_string(),
            output_dir: PathBuf::from("graphs"),
            start_date: NaiveDate::from_ymd_opt(2020, 3, 1).unwrap_or_default(),
            charts: vec![
                ChartConfig::new("us_cases.html", None, cases, None),
                ChartConfig::new("us_new_cases.html", None, cases.with_change(), None),
                ChartConfig::new("states_cases.html", None, cases.with_per_capita(PER_10K), Some(DEFAULT_TOP)),
                ChartConfig::new("states_deaths.html", None, deaths.with_per_capita(PER_10K), Some(DEFAULT_TOP)),
                ChartConfig::new(
                    "states_new_cases.html",
                    None,
                    cases.with_change().with_per_capita(PER_10K),
                    Some(DEFAULT_TOP),
                ),
                ChartConfig::new(
                    "ny_counties_cases.html",
                    Some("36"),
                    cases.with_per_capita(PER_10K).with_log(),
                    Some(DEFAULT_TOP),
                ),
            ],
        }
    }
}

impl Config {
    /// Reads `path` when it exists, otherwise returns the defaults.
    pub fn load(path: &Path) -> Result<Config> {
        if !path.exists() {
            log::info!("No {}, using default configuration", path.display());
            return Ok(Config::default());
        }
        let config: Config = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        for chart in &self.charts {
            if let Some(scale) = chart.metric.per_capita {
                if !(scale.is_finite() && scale > 0.0) {
                    return Err(Error::InvalidConfig(format!(
                        "{}: per_capita must be positive, got {}",
                        chart.file, scale
                    )));
                }
            }
            if chart.top == Some(0) {
                return Err(Error::InvalidConfig(format!("{}: top must be at least 1", chart.file)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.start_date, NaiveDate::from_ymd_opt(2020, 3, 1).unwrap());
        assert!(config.charts.iter().any(|c| c.region.as_deref() == Some("36")));
    }

    #[test]
    fn partial_json_fills_defaults() {
        let json = r#"{
            "start_date": "2020-04-15",
            "charts": [
                {"file": "ohio.html", "region": "39", "series": "deaths", "per_capita": 100000, "top": 5},
                {"file": "us.html", "series": "cases", "change": true, "log": true}
            ]
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.start_date, NaiveDate::from_ymd_opt(2020, 4, 15).unwrap());
        assert_eq!(config.output_dir, PathBuf::from("graphs"));
        assert_eq!(
            config.charts,
            vec![
                ChartConfig::new(
                    "ohio.html",
                    Some("39"),
                    MetricConfig::new(Series::Deaths).with_per_capita(100_000.0),
                    Some(5)
                ),
                ChartConfig::new("us.html", None, MetricConfig::new(Series::Cases).with_change().with_log(), None),
            ]
        );
    }

    #[test]
    fn rejects_loose_start_date() {
        let json = r#"{"start_date": "2020-4-15"}"#;
        assert!(serde_json::from_str::<Config>(json).is_err());
    }

    #[test]
    fn rejects_non_positive_scale() {
        let mut config = Config::default();
        config.charts = vec![ChartConfig::new(
            "bad.html",
            None,
            MetricConfig::new(Series::Cases).with_per_capita(0.0),
            None,
        )];
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn missing_file_gives_defaults() {
        let config = Config::load(Path::new("does/not/exist/charts.json")).unwrap();
        assert_eq!(config, Config::default());
    }
}
