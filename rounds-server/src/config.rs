use std::net::SocketAddr;

use clap::Parser;
use rounds_model::DEFAULT_BUFFER_DAYS;

/// Runtime configuration, sourced from CLI flags with environment
/// fallbacks. Call [`Config::load`] so a `.env` file is honored before
/// the environment is read.
#[derive(Parser, Debug, Clone)]
#[command(name = "rounds-server")]
#[command(about = "Multi-tenant recurring compliance inspection server")]
pub struct Config {
    /// Socket address to bind the HTTP listener to
    #[arg(long, env = "ROUNDS_BIND_ADDR", default_value = "0.0.0.0:8920")]
    pub bind_addr: SocketAddr,

    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Seconds between background recurrence sweeps
    #[arg(long, env = "ROUNDS_SWEEP_INTERVAL_SECS", default_value_t = 3600)]
    pub sweep_interval_secs: u64,

    /// Days ahead of the due date a pending inspection reads as due soon
    #[arg(long, env = "ROUNDS_BUFFER_DAYS", default_value_t = DEFAULT_BUFFER_DAYS)]
    pub buffer_days: i64,

    /// Maximum PostgreSQL connections in the pool
    #[arg(long, env = "ROUNDS_DB_MAX_CONNECTIONS", default_value_t = 10)]
    pub db_max_connections: u32,
}

/// What [`Config::load`] produced, with enough metadata to log once the
/// subscriber is installed.
#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub env_file_loaded: bool,
}

impl Config {
    pub fn load() -> ConfigLoad {
        let env_file_loaded = dotenvy::dotenv().is_ok();
        let mut config = Self::parse();
        if config.sweep_interval_secs == 0 {
            // interval(0) panics; clamp to the smallest sane period
            config.sweep_interval_secs = 1;
        }
        ConfigLoad {
            config,
            env_file_loaded,
        }
    }
}
