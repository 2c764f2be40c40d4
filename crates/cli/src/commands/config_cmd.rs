//! `folio config` — Print the effective configuration.

use folio_config::AppConfig;

pub fn run(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    print!("{}", config.to_toml());
    Ok(())
}
