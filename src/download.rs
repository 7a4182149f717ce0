use std::fs;
use std::path::Path;

use curl::easy::Easy;

use crate::config::Config;
use crate::error::{Error, Result};

/// GETs `url` and returns the body. Any status of 400 or above is an error.
pub fn fetch(url: &str) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    let mut handle = Easy::new();
    handle.url(url)?;
    handle.follow_location(true)?;
    {
        let mut transfer = handle.transfer();
        transfer.write_function(|data| {
            body.extend_from_slice(data);
            Ok(data.len())
        })?;
        transfer.perform()?;
    }
    let status = handle.response_code()?;
    if status >= 400 {
        return Err(Error::HttpStatus {
            status,
            url: url.to_string(),
        });
    }
    Ok(body)
}

pub fn download_file(url: &str, path: &Path) -> Result<()> {
    let body = fetch(url)?;
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    fs::write(path, &body)?;
    log::info!("Downloaded {} ({} bytes) to {}", url, body.len(), path.display());
    Ok(())
}

/// Refreshes the state and county feeds on disk.
pub fn download_feeds(config: &Config) -> Result<()> {
    download_file(&config.states_url, &config.states_feed)?;
    download_file(&config.counties_url, &config.counties_feed)?;
    Ok(())
}
