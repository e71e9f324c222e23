use std::path::Path;

use pixnote_core::config::ClientConfig;
use serde::Serialize;

use crate::error::CliError;

#[derive(Serialize)]
struct ConfigView<'a> {
    #[serde(flatten)]
    config: &'a ClientConfig,
    api_token_set: bool,
}

pub fn run_config_show(config: &ClientConfig, config_path: &Path) -> Result<(), CliError> {
    let view = ConfigView {
        config,
        api_token_set: config.api_token.is_some(),
    };
    println!("# {}", config_path.display());
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

/// Apply the given values to the file at `config_path`; environment
/// overrides are not persisted.
pub fn run_config_set(
    config_path: &Path,
    api_url: Option<String>,
    page_size: Option<usize>,
    timeout: Option<u64>,
) -> Result<ClientConfig, CliError> {
    let mut config = ClientConfig::load(config_path)?;
    if let Some(api_url) = api_url {
        config.api_base_url = Some(api_url);
    }
    if let Some(page_size) = page_size {
        config.page_size = page_size;
    }
    if let Some(timeout) = timeout {
        config.request_timeout_secs = timeout;
    }

    let config = config.normalized()?;
    config.save(config_path)?;
    println!("{}", config_path.display());
    Ok(config)
}
