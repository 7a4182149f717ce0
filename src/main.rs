use std::env;
use std::fs;
use std::path::Path;

use us_corona_data::chart::{build_chart, render};
use us_corona_data::config::{Config, CONFIG_FILE};
use us_corona_data::download::download_feeds;
use us_corona_data::ingest::{build_tree, ingest_counties_file, ingest_states_file};
use us_corona_data::population::CensusPopulation;
use us_corona_data::{Region, Result};

fn main() {
    pretty_env_logger::init();

    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let config = Config::load(Path::new(CONFIG_FILE))?;

    if args.contains(&"download".to_string()) {
        download_feeds(&config)?;
    }

    let tree = load_tree(&config)?;
    log::info!("{}", tree);

    fs::create_dir_all(&config.output_dir)?;
    for chart_config in &config.charts {
        let chart = build_chart(&tree, chart_config, config.start_date)?;
        render(&chart, &config.output_dir.join(&chart_config.file));
    }
    Ok(())
}

fn load_tree(config: &Config) -> Result<Region> {
    let census = CensusPopulation::new(&config.census_url);
    let mut tree = build_tree(&census)?;
    ingest_states_file(&mut tree, &config.states_feed)?;
    ingest_counties_file(&mut tree, &config.counties_feed)?;
    Ok(tree)
}
