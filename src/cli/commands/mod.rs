//! CLI command implementations

pub mod completions;
pub mod config;
pub mod groups;
pub mod lookup;
pub mod status;

use miette::Result;
use tracing::debug;

use crate::cli::GlobalOpts;
use crate::core::{Config, MemorySource, ODataClient, RecordSource, ReferenceData};

/// Effective configuration for a command
pub fn load_config() -> Result<Config> {
    Config::load().map_err(|e| miette::miette!("{}", e))
}

/// Open the record source selected by the global options.
///
/// `--snapshot` serves entity sets from a JSON file; otherwise the
/// configured Nimbus OData API is used.
pub fn open_source(global: &GlobalOpts, config: &Config) -> Result<Box<dyn RecordSource>> {
    if let Some(ref path) = global.snapshot {
        debug!(path = %path.display(), "using snapshot source");
        let source = MemorySource::from_snapshot_file(path).map_err(|e| miette::miette!("{}", e))?;
        return Ok(Box::new(source));
    }

    let session = config.session().map_err(|e| miette::miette!("{}", e))?;
    let client = ODataClient::new(&session, Some(config.timeout_secs()))
        .map_err(|e| miette::miette!("{}", e))?;
    debug!(
        connection = %session.connection_key(),
        odata_root = client.odata_base(),
        "using OData source"
    );
    Ok(Box::new(client))
}

/// Configuration, record source and empty reference caches for a command
pub fn connect(global: &GlobalOpts) -> Result<(ReferenceData, Box<dyn RecordSource>)> {
    let config = load_config()?;
    let source = open_source(global, &config)?;
    let data = ReferenceData::from_config(&config).map_err(|e| miette::miette!("{}", e))?;
    Ok((data, source))
}
