// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;
use tracing::error;

use lotto_live::config::LiveConfig;

#[derive(Debug, Parser)]
#[command(name = "lotto-live", version, about = "Live lottery notifications over WebSocket")]
struct Cli {
    #[command(flatten)]
    config: LiveConfig,

    /// Log format (json or text). Logs go to stderr; stdout carries notifications.
    #[arg(long, env = "LOTTO_LOG_FORMAT", default_value = "text")]
    log_format: String,

    /// Log level (trace, debug, info, warn, error) or a full filter directive.
    #[arg(long, env = "LOTTO_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli);

    let _ = rustls::crypto::ring::default_provider().install_default();

    if let Err(e) = lotto_live::run(cli.config).await {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}

fn init_tracing(cli: &Cli) {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    match cli.log_format.as_str() {
        "json" => {
            fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).json().init();
        }
        _ => {
            fmt::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
        }
    }
}
