use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://mailagenda.db".into());
        Config { database_url }
    }
}
