use std::{env, net::SocketAddr, path::PathBuf};
use tracing_subscriber::EnvFilter;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATA_PATH: &str = "data/goals.json";

const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub data_path: PathBuf,
    pub log_filter: Option<String>,
}

impl Config {
    /// Reads `PORT`, `APP_DATA_PATH` and `RUST_LOG`, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            port: parse_port(env::var("PORT").ok().as_deref()),
            data_path: resolve_data_path(env::var("APP_DATA_PATH").ok()),
            log_filter: env::var("RUST_LOG").ok(),
        }
    }

    /// `RUST_LOG` when it is set and parses, `info` otherwise.
    pub fn env_filter(&self) -> EnvFilter {
        build_env_filter(self.log_filter.as_deref())
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

fn parse_port(value: Option<&str>) -> u16 {
    value
        .and_then(|value| value.trim().parse::<u16>().ok())
        .unwrap_or(DEFAULT_PORT)
}

fn build_env_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .filter(|value| !value.trim().is_empty())
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn resolve_data_path(value: Option<String>) -> PathBuf {
    match value {
        Some(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => PathBuf::from(DEFAULT_DATA_PATH),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn bad_port_falls_back_to_default() {
        assert_eq!(parse_port(Some("not-a-port")), 8080);
        assert_eq!(parse_port(None), 8080);
        assert_eq!(parse_port(Some(" 9090 ")), 9090);
    }

    #[test]
    fn rust_log_level_is_not_overridden() {
        assert_eq!(build_env_filter(Some("debug")).max_level_hint(), Some(LevelFilter::DEBUG));
        assert_eq!(build_env_filter(Some("warn")).max_level_hint(), Some(LevelFilter::WARN));
        assert_eq!(build_env_filter(None).max_level_hint(), Some(LevelFilter::INFO));
        assert_eq!(build_env_filter(Some("  ")).max_level_hint(), Some(LevelFilter::INFO));
    }

    #[test]
    fn blank_data_path_uses_default() {
        assert_eq!(resolve_data_path(Some("  ".into())), PathBuf::from("data/goals.json"));
        assert_eq!(
            resolve_data_path(Some("/tmp/goals.json".into())),
            PathBuf::from("/tmp/goals.json")
        );
    }
}
