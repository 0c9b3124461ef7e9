use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::ConfigArgs;

#[derive(Parser, Debug)]
#[command(name = "tunnelgate", version, about = "Tunnel resolution gateway")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the gateway.
    Serve {
        #[command(flatten)]
        config: ConfigArgs,

        /// Address to listen on (overrides server.listen_addr)
        #[arg(long)]
        listen_addr: Option<String>,

        /// Port to listen on (overrides server.listen_port)
        #[arg(long, short)]
        port: Option<u16>,

        /// Directory of static assets served outside the tunnel routes
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },

    /// Validate configuration and report problems without starting.
    Check {
        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Print the sanitized tunnel listing as the gateway would serve it.
    Tunnels {
        #[command(flatten)]
        config: ConfigArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Command::Serve {
            config,
            listen_addr,
            port,
            static_dir,
        } => commands::serve::run(&config, listen_addr, port, static_dir).await?,
        Command::Check { config } => commands::check::run(&config)?,
        Command::Tunnels { config } => commands::tunnels::run(&config).await?,
    }

    Ok(())
}
