use anyhow::Result;
use serde_json::json;

use dosekeeper::models::config::Config;
use dosekeeper::output;

use super::print_json;

pub fn run_show(human: bool) -> Result<()> {
    let config = Config::load()?;
    if human {
        println!("{}", toml::to_string_pretty(&config)?);
    } else {
        print_json(&output::success("config", json!({ "config": config })))?;
    }
    Ok(())
}

pub fn run_set(key: &str, value: &str) -> Result<()> {
    let mut config = Config::load()?;
    config.set(key, value)?;
    config.save()?;
    print_json(&output::success("config", json!({ "key": key, "value": value })))
}
