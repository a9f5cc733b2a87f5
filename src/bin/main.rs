use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use mcp_toolbox::version::{self, VersionFlag};
use mcp_toolbox::{AppConfig, Console, ConfigOverrides, Logging, TransportMode};

#[derive(Parser, Debug)]
#[command(name = "mcp-toolbox")]
#[command(about = "MCP Server with multiple transport modes")]
#[command(
    long_about = "MCP Server supporting stdio, sse, and streamableHttp transport modes. \
                  Offers calculate and reverse_string tools."
)]
struct Cli {
    /// Config file (default is ./config.yaml, then /app/config.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Transport mode: stdio, sse, streamableHttp (or http)
    #[arg(short, long, env = "MCP_MODE", value_enum)]
    mode: Option<TransportMode>,

    /// Port for the HTTP/SSE server
    #[arg(short, long, env = "MCP_PORT")]
    port: Option<u16>,

    /// Host address for the HTTP/SSE server
    #[arg(long, env = "MCP_HOST")]
    host: Option<String>,

    /// Log level: trace, debug, info, warn, error
    #[arg(long, env = "MCP_LOG_LEVEL")]
    log_level: Option<String>,

    /// Print version information and quit (`--version=raw` for all fields)
    #[arg(
        long,
        value_enum,
        num_args = 0..=1,
        require_equals = true,
        default_value = "false",
        default_missing_value = "true"
    )]
    version: VersionFlag,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            config_file: self.config.clone(),
            mode: self.mode,
            host: self.host.clone(),
            port: self.port,
            log_level: self.log_level.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(text) = version::render(cli.version) {
        println!("{}", text);
        return ExitCode::SUCCESS;
    }

    let config = match AppConfig::load(&cli.overrides()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Unable to load config: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = match Logging::new(&config.log, Console::for_mode(config.mode))
        .and_then(|logging| logging.install())
    {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Unable to initialize logging: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    match &config.source {
        Some(path) => info!("Using config file {}", path.display()),
        None => info!("No config file found, using defaults"),
    }

    if let Err(e) = mcp_toolbox::run(&config).await {
        error!("Server error: {:#}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_leave_config_untouched() {
        let cli = Cli::try_parse_from(["mcp-toolbox"]).unwrap();
        assert_eq!(cli.version, VersionFlag::False);
        assert!(cli.config.is_none());
        assert!(cli.overrides().config_file.is_none());
    }

    #[test]
    fn test_flags() {
        let cli = Cli::try_parse_from([
            "mcp-toolbox",
            "-m",
            "sse",
            "-p",
            "9090",
            "--host",
            "127.0.0.1",
            "--log-level",
            "debug",
            "-c",
            "custom.yaml",
        ])
        .unwrap();

        let overrides = cli.overrides();
        assert_eq!(overrides.mode, Some(TransportMode::Sse));
        assert_eq!(overrides.port, Some(9090));
        assert_eq!(overrides.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(overrides.log_level.as_deref(), Some("debug"));
        assert_eq!(overrides.config_file, Some(PathBuf::from("custom.yaml")));
    }

    #[test]
    fn test_mode_aliases() {
        let cli = Cli::try_parse_from(["mcp-toolbox", "--mode", "http"]).unwrap();
        assert_eq!(cli.mode, Some(TransportMode::StreamableHttp));

        let cli = Cli::try_parse_from(["mcp-toolbox", "--mode", "streamableHttp"]).unwrap();
        assert_eq!(cli.mode, Some(TransportMode::StreamableHttp));

        assert!(Cli::try_parse_from(["mcp-toolbox", "--mode", "websocket"]).is_err());
    }

    #[test]
    fn test_version_flag() {
        let cli = Cli::try_parse_from(["mcp-toolbox", "--version"]).unwrap();
        assert_eq!(cli.version, VersionFlag::True);

        let cli = Cli::try_parse_from(["mcp-toolbox", "--version=raw"]).unwrap();
        assert_eq!(cli.version, VersionFlag::Raw);

        let cli = Cli::try_parse_from(["mcp-toolbox", "--version=false"]).unwrap();
        assert_eq!(cli.version, VersionFlag::False);
    }
}
