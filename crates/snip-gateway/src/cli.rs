use clap::builder::RangedU64ValueParser;
use clap::{Parser, ValueEnum};
use snip_store::ShortCode;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::path::PathBuf;

pub const LISTEN_ADDR_ENV: &str = "SNIP_LISTEN_ADDR";
pub const BASE_URL_ENV: &str = "SNIP_BASE_URL";
pub const CODE_LENGTH_ENV: &str = "SNIP_CODE_LENGTH";
pub const MAX_CODE_ATTEMPTS_ENV: &str = "SNIP_MAX_CODE_ATTEMPTS";
pub const STORAGE_BACKEND_ENV: &str = "SNIP_STORAGE_BACKEND";
pub const DATA_FILE_ENV: &str = "SNIP_DATA_FILE";
pub const DATABASE_URL_ENV: &str = "SNIP_DATABASE_URL";
pub const LOG_FORMAT_ENV: &str = "SNIP_LOG_FORMAT";

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:5001";
pub const DEFAULT_BASE_URL: &str = "http://localhost:5001";
pub const DEFAULT_DATA_FILE: &str = "urls.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "file")]
    File,
    #[value(name = "sqlite")]
    Sqlite,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::File => write!(f, "file"),
            StorageBackendArg::Sqlite => write!(f, "sqlite"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

impl Display for LogFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "snip", about = "URL shortener HTTP server")]
pub struct CLI {
    #[arg(long, env = LISTEN_ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    /// Public prefix of every short URL.
    #[arg(long, env = BASE_URL_ENV, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    #[arg(
        long,
        env = CODE_LENGTH_ENV,
        default_value_t = snip_generator::random::DEFAULT_CODE_LENGTH,
        value_parser = RangedU64ValueParser::<usize>::new()
            .range(ShortCode::MIN_LENGTH as u64..=ShortCode::MAX_LENGTH as u64),
    )]
    pub code_length: usize,

    /// Generated codes tried before a shorten gives up.
    #[arg(
        long,
        env = MAX_CODE_ATTEMPTS_ENV,
        default_value_t = snip_store::DEFAULT_MAX_CODE_ATTEMPTS,
        value_parser = clap::value_parser!(u32).range(1..),
    )]
    pub max_code_attempts: u32,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::File
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = DATA_FILE_ENV, default_value = DEFAULT_DATA_FILE)]
    pub data_file: PathBuf,

    #[arg(long, env = DATABASE_URL_ENV, required_if_eq("storage", "sqlite"))]
    pub database_url: Option<String>,

    #[arg(long, env = LOG_FORMAT_ENV, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}
