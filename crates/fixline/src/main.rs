// SPDX-FileCopyrightText: 2026 Fixline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixline - a WhatsApp service-matching agent.
//!
//! This is the binary entry point for the Fixline service.

use clap::{Parser, Subcommand};

mod serve;
mod shutdown;

/// Fixline - a WhatsApp service-matching agent.
#[derive(Parser, Debug)]
#[command(name = "fixline", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Fixline agent server.
    Serve,
    /// Print the resolved configuration.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup.
    let config = match fixline_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            fixline_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Config) => match toml::to_string_pretty(&config) {
            Ok(rendered) => println!("{rendered}"),
            Err(e) => {
                eprintln!("fixline: failed to render config: {e}");
                std::process::exit(1);
            }
        },
        Some(Commands::Serve) | None => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("fixline: {e}");
                std::process::exit(1);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn binary_loads_config_defaults() {
        let config = fixline_config::load_and_validate()
            .expect("default config should be valid");
        assert_eq!(config.agent.name, "fixline");
    }
}
