use crate::coordinator::HubSettings;
use clap::Parser;
use std::time::Duration;

pub const DEFAULT_ADDR: &str = "127.0.0.1:7781";
pub const DEFAULT_UPSTREAM: &str = "http://127.0.0.1:8000/_/stream/";
pub const DEFAULT_LOG_DIR: &str = ".pagewatch/logs";

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: String,
    pub upstream_url: String,
    pub debug: bool,
    pub heartbeat_interval: Duration,
    pub write_timeout: Duration,
    pub queue_capacity: usize,
    pub log_dir: String,
}

#[derive(Parser, Debug)]
#[command(name = "pagewatch-hub")]
pub struct Args {
    #[arg(long, default_value = "")]
    pub addr: String,
    #[arg(long, default_value = "")]
    pub upstream: String,
    #[arg(long, default_value_t = false)]
    pub debug: bool,
    #[arg(long, default_value_t = 15)]
    pub heartbeat_interval: u64,
    #[arg(long, default_value_t = 2)]
    pub write_timeout: u64,
    #[arg(long, default_value_t = 64)]
    pub queue_capacity: usize,
    #[arg(long, default_value = "")]
    pub log_dir: String,
}

impl Config {
    pub fn hub_settings(&self) -> HubSettings {
        HubSettings {
            upstream_url: self.upstream_url.clone(),
            heartbeat_interval: self.heartbeat_interval,
            queue_capacity: self.queue_capacity,
        }
    }
}

pub fn load_config() -> Config {
    config_from_args(Args::parse())
}

pub fn config_from_args(args: Args) -> Config {
    Config {
        addr: resolve_addr(&args.addr),
        upstream_url: resolve_upstream(&args.upstream),
        debug: args.debug || env_true("PAGEWATCH_HUB_DEBUG"),
        heartbeat_interval: Duration::from_secs(args.heartbeat_interval),
        write_timeout: Duration::from_secs(args.write_timeout),
        queue_capacity: args.queue_capacity.max(1),
        log_dir: resolve_log_dir(&args.log_dir),
    }
}

pub fn env_true(key: &str) -> bool {
    match std::env::var(key) {
        Ok(value) => matches!(
            value.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => false,
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn resolve_addr(addr_flag: &str) -> String {
    if !addr_flag.trim().is_empty() {
        return addr_flag.to_string();
    }
    env_non_empty("PAGEWATCH_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string())
}

fn resolve_upstream(upstream_flag: &str) -> String {
    if !upstream_flag.trim().is_empty() {
        return upstream_flag.to_string();
    }
    env_non_empty("PAGEWATCH_UPSTREAM").unwrap_or_else(|| DEFAULT_UPSTREAM.to_string())
}

fn resolve_log_dir(log_dir_flag: &str) -> String {
    if !log_dir_flag.trim().is_empty() {
        return log_dir_flag.to_string();
    }
    env_non_empty("PAGEWATCH_LOG_DIR").unwrap_or_else(|| DEFAULT_LOG_DIR.to_string())
}
