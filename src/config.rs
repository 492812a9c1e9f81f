use std::net::{IpAddr, SocketAddr};

use anyhow::Context;

const DEFAULT_DATABASE_URL: &str = "sqlite://movies.db?mode=rwc";
const DEFAULT_LOG_FILTER: &str = "info,movie_catalog=debug,sqlx=warn";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub listen: SocketAddr,
    pub database_url: String,
    pub log_filter: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key/value source; unset or blank keys take
    /// their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host: IpAddr = match var("HOST") {
            Some(host) => host.trim().parse().with_context(|| format!("HOST={host}"))?,
            None => IpAddr::from([0, 0, 0, 0]),
        };
        let port: u16 = match var("PORT") {
            Some(port) => port.trim().parse().with_context(|| format!("PORT={port}"))?,
            None => 3000,
        };

        Ok(Self {
            listen: SocketAddr::new(host, port),
            database_url: var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            log_filter: var("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        })
    }
}
