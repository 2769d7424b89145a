//! # CLI
//!
//! This module defines the command-line interface of `hotgate` using `clap`.
//!
//! Every option can also be set from the environment, which is how the gateway is usually
//! configured when it runs in a container.
use clap::{Parser, ValueEnum};
use std::{net::SocketAddr, path::PathBuf, time::Duration};

#[derive(Parser, Debug)]
#[command(
    name = "hotgate",
    version,
    about = "JSON-over-HTTP gateway with a hot-reloadable IDL"
)]
pub struct Cli {
    /// Address the HTTP server listens on
    #[arg(long, env = "HOTGATE_LISTEN", default_value = "127.0.0.1:8080")]
    pub listen: SocketAddr,

    /// URL of the backend gRPC server (e.g. http://127.0.0.1:8888)
    #[arg(long, env = "HOTGATE_BACKEND", default_value = "http://127.0.0.1:8888")]
    pub backend: String,

    /// IDL document loaded at startup. The bundled document is used when omitted
    #[arg(long, env = "HOTGATE_IDL")]
    pub idl: Option<PathBuf>,

    /// Per-call deadline for backend requests, in milliseconds
    #[arg(long, env = "HOTGATE_BACKEND_TIMEOUT_MS", value_parser = parse_millis)]
    pub backend_timeout_ms: Option<Duration>,

    /// Log filter directives (e.g. "info,hotgate_core=debug")
    #[arg(long, env = "HOTGATE_LOG", default_value = "info")]
    pub log_filter: String,

    /// Log output format
    #[arg(long, env = "HOTGATE_LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human readable, one line per event
    Compact,
    /// One JSON object per event
    Json,
}

fn parse_millis(value: &str) -> Result<Duration, String> {
    let millis: u64 = value
        .parse()
        .map_err(|_| format!("'{value}' is not a number of milliseconds"))?;

    if millis == 0 {
        return Err("the timeout must be greater than zero".to_string());
    }

    Ok(Duration::from_millis(millis))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["hotgate"]).unwrap();

        assert_eq!(cli.listen, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(cli.backend, "http://127.0.0.1:8888");
        assert_eq!(cli.idl, None);
        assert_eq!(cli.backend_timeout_ms, None);
        assert_eq!(cli.log_format, LogFormat::Compact);
    }

    #[test]
    fn parses_flags() {
        let cli = Cli::try_parse_from([
            "hotgate",
            "--listen",
            "0.0.0.0:9000",
            "--idl",
            "api.thrift",
            "--backend-timeout-ms",
            "250",
            "--log-format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.listen.port(), 9000);
        assert_eq!(cli.idl, Some(PathBuf::from("api.thrift")));
        assert_eq!(cli.backend_timeout_ms, Some(Duration::from_millis(250)));
        assert_eq!(cli.log_format, LogFormat::Json);
    }

    #[test]
    fn rejects_zero_timeout() {
        assert!(Cli::try_parse_from(["hotgate", "--backend-timeout-ms", "0"]).is_err());
    }
}
