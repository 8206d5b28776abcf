pub mod completions;
pub mod config;
pub mod dose;
pub mod init;
pub mod med;
pub mod poll;
pub mod target;

use anyhow::Result;

use dosekeeper::db::Database;
use dosekeeper::models::config::Config;

/// Everything a command needs: loaded config, open store, acting user.
pub struct Session {
    pub config: Config,
    pub db: Database,
    pub user_id: String,
}

impl Session {
    pub fn open(user: Option<&str>) -> Result<Self> {
        let config = Config::load()?;
        let db = Database::open_with_timeout(&Config::db_path(), config.busy_timeout())?;
        let user_id = user
            .map(str::to_string)
            .unwrap_or_else(|| config.user.id.clone());
        Ok(Self {
            config,
            db,
            user_id,
        })
    }
}

pub fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}
