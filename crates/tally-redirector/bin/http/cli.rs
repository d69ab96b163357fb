use clap::{Parser, ValueEnum};
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use tally_telemetry::LogFormat;

pub const LISTEN_ADDR_ENV: &str = "TALLY_LISTEN_ADDR";
pub const PORT_ENV: &str = "PORT";
pub const STORE_BACKEND_ENV: &str = "TALLY_STORE";
pub const DATABASE_URL_ENV: &str = "TALLY_DATABASE_URL";
pub const REDIRECT_TARGET_ENV: &str = "TALLY_REDIRECT_TARGET";
pub const COUNTER_PARAM_ENV: &str = "TALLY_COUNTER_PARAM";
pub const ALLOWED_ORIGINS_ENV: &str = "TALLY_ALLOWED_ORIGINS";
pub const SERVICE_STARTED_AT_ENV: &str = "TALLY_SERVICE_STARTED_AT";
pub const STORE_TIMEOUT_MS_ENV: &str = "TALLY_STORE_TIMEOUT_MS";
pub const STATS_TIMEOUT_MS_ENV: &str = "TALLY_STATS_TIMEOUT_MS";
pub const LOG_FORMAT_ENV: &str = "TALLY_LOG_FORMAT";

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_STORE_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_STATS_TIMEOUT_MS: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackendArg {
    #[value(name = "sqlite")]
    Sqlite,
    #[value(name = "memory")]
    Memory,
}

impl Display for StoreBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreBackendArg::Sqlite => write!(f, "sqlite"),
            StoreBackendArg::Memory => write!(f, "memory"),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "tally-redirector")]
pub struct CLI {
    #[arg(long, env = LISTEN_ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    /// Overrides the port of `--listen-addr`.
    #[arg(long, env = PORT_ENV)]
    pub port: Option<u16>,

    #[arg(
        long,
        env = STORE_BACKEND_ENV,
        value_enum,
        default_value_t = StoreBackendArg::Sqlite
    )]
    pub store: StoreBackendArg,

    #[arg(long, env = DATABASE_URL_ENV, required_if_eq("store", "sqlite"))]
    pub database_url: Option<String>,

    #[arg(long, env = REDIRECT_TARGET_ENV)]
    pub redirect_target: String,

    #[arg(long, env = COUNTER_PARAM_ENV, default_value = tally_redirector::target::DEFAULT_COUNTER_PARAM)]
    pub counter_param: String,

    #[arg(long, env = ALLOWED_ORIGINS_ENV, value_delimiter = ',')]
    pub allowed_origins: Vec<String>,

    /// Reported by `/info`; defaults to the process start time.
    #[arg(long, env = SERVICE_STARTED_AT_ENV)]
    pub service_started_at: Option<String>,

    #[arg(long, env = STORE_TIMEOUT_MS_ENV, default_value_t = DEFAULT_STORE_TIMEOUT_MS)]
    pub store_timeout_ms: u64,

    /// Bound for each `/info` store query; keep it under one second.
    #[arg(long, env = STATS_TIMEOUT_MS_ENV, default_value_t = DEFAULT_STATS_TIMEOUT_MS)]
    pub stats_timeout_ms: u64,

    #[arg(
        long,
        env = LOG_FORMAT_ENV,
        value_enum,
        default_value_t = LogFormat::Text
    )]
    pub log_format: LogFormat,
}

impl CLI {
    pub fn listen_addr(&self) -> SocketAddr {
        match self.port {
            Some(port) => SocketAddr::new(self.listen_addr.ip(), port),
            None => self.listen_addr,
        }
    }
}
