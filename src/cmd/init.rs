use anyhow::Result;
use serde_json::json;

use dosekeeper::db::Database;
use dosekeeper::models::config::Config;
use dosekeeper::output;

use super::print_json;

pub fn run(human: bool) -> Result<()> {
    let config = Config::load().unwrap_or_default();
    config.save()?;
    Database::open_with_timeout(&Config::db_path(), config.busy_timeout())?;

    if human {
        println!("Initialized {:?}", Config::data_dir());
        println!("  config:   {:?}", Config::path());
        println!("  database: {:?}", Config::db_path());
    } else {
        print_json(&output::success(
            "init",
            json!({
                "config": Config::path(),
                "database": Config::db_path(),
                "user": config.user.id,
            }),
        ))?;
    }
    Ok(())
}
