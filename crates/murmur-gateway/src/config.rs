//! Gateway configuration.

use std::path::PathBuf;

use clap::Parser;
use murmur_core::StorageConfig;

/// murmur HTTP/JSON Gateway command line arguments.
#[derive(Debug, Parser)]
#[command(name = "murmur-gateway")]
#[command(about = "HTTP/JSON Gateway for murmur accounts and notifications")]
pub struct Args {
    /// Address to listen on for HTTP requests.
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    pub listen: String,

    /// Directory holding the document store.
    #[arg(short, long, default_value = "./murmur-data")]
    pub data_path: PathBuf,

    /// Use a temporary store that is removed on exit.
    #[arg(long)]
    pub temporary: bool,

    /// Flush interval (ms) for the document store.
    #[arg(long, default_value_t = 500)]
    pub flush_every_ms: u64,

    /// Buffered notification events per subscriber.
    #[arg(long, default_value_t = 256)]
    pub notification_capacity: usize,

    /// Largest page size a list request may ask for.
    #[arg(long, default_value_t = 100)]
    pub max_limit: u64,

    /// Accept `limit=all` on list endpoints.
    #[arg(long)]
    pub allow_unbounded: bool,
}

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Address to listen on for HTTP requests.
    pub listen_addr: String,
    /// Directory holding the document store.
    pub data_path: PathBuf,
    /// Use a temporary store.
    pub temporary: bool,
    /// Flush interval for the document store.
    pub flush_every_ms: u64,
    /// Buffered notification events per subscriber.
    pub notification_capacity: usize,
    /// Largest page size a list request may ask for.
    pub max_limit: u64,
    /// Accept `limit=all` on list endpoints.
    pub allow_unbounded: bool,
}

impl GatewayConfig {
    /// Storage configuration derived from the gateway settings.
    pub fn storage_config(&self) -> StorageConfig {
        let config = if self.temporary {
            StorageConfig::temporary()
        } else {
            StorageConfig::new(&self.data_path)
        };
        config.with_flush_every_ms(Some(self.flush_every_ms))
    }
}

impl From<&Args> for GatewayConfig {
    fn from(args: &Args) -> Self {
        Self {
            listen_addr: args.listen.clone(),
            data_path: args.data_path.clone(),
            temporary: args.temporary,
            flush_every_ms: args.flush_every_ms,
            notification_capacity: args.notification_capacity,
            max_limit: args.max_limit,
            allow_unbounded: args.allow_unbounded,
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            data_path: PathBuf::from("./murmur-data"),
            temporary: false,
            flush_every_ms: 500,
            notification_capacity: 256,
            max_limit: 100,
            allow_unbounded: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults_match_config_defaults() {
        let args = Args::parse_from(["murmur-gateway"]);
        let config = GatewayConfig::from(&args);
        let defaults = GatewayConfig::default();

        assert_eq!(config.listen_addr, defaults.listen_addr);
        assert_eq!(config.data_path, defaults.data_path);
        assert_eq!(config.max_limit, defaults.max_limit);
        assert!(!config.allow_unbounded);
    }

    #[test]
    fn test_args_overrides() {
        let args = Args::parse_from([
            "murmur-gateway",
            "--listen",
            "127.0.0.1:9999",
            "--temporary",
            "--max-limit",
            "25",
            "--allow-unbounded",
        ]);
        let config = GatewayConfig::from(&args);

        assert_eq!(config.listen_addr, "127.0.0.1:9999");
        assert!(config.temporary);
        assert!(config.storage_config().temporary);
        assert_eq!(config.max_limit, 25);
        assert!(config.allow_unbounded);
    }
}
