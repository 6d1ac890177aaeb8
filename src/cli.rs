//! Command-line interface

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "gmail-autoresponder")]
#[command(version)]
#[command(about = "Replies once to Gmail threads that have no sent message or draft", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "autoresponder.toml")]
    pub config: PathBuf,

    /// Path to OAuth2 client secret file (overrides config)
    #[arg(long)]
    pub credentials: Option<PathBuf>,

    /// Path to the stored authorized-user token (overrides config)
    #[arg(long)]
    pub token: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Poll the mailbox and reply until interrupted (default)
    Run {
        /// Compose replies but do not send them
        #[arg(long)]
        dry_run: bool,
    },

    /// Run a single polling cycle and exit
    Once {
        /// Compose replies but do not send them
        #[arg(long)]
        dry_run: bool,
    },

    /// Authorize with Gmail and store the refresh token
    Auth {
        /// Discard the stored token and run the grant again
        #[arg(long)]
        force: bool,
    },

    /// Generate example configuration file
    InitConfig {
        /// Path to create config file
        #[arg(short, long, default_value = "autoresponder.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

impl Cli {
    /// Subcommand to execute, `run` when none was given
    pub fn command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or(Commands::Run { dry_run: false })
    }

    /// Apply path overrides and command flags on top of the loaded config
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(credentials) = &self.credentials {
            config.auth.credentials_path = credentials.clone();
        }
        if let Some(token) = &self.token {
            config.auth.token_path = token.clone();
        }
        if let Some(Commands::Run { dry_run: true } | Commands::Once { dry_run: true }) = &self.command {
            config.reply.dry_run = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_run() {
        let cli = Cli::parse_from(["gmail-autoresponder"]);
        assert_eq!(cli.command(), Commands::Run { dry_run: false });
        assert_eq!(cli.config, PathBuf::from("autoresponder.toml"));
        assert!(!cli.verbose);
    }

    #[test]
    fn test_path_overrides() {
        let cli = Cli::parse_from([
            "gmail-autoresponder",
            "--credentials",
            "/etc/autoresponder/client.json",
            "--token",
            "/var/lib/autoresponder/token.json",
            "once",
        ]);

        let mut config = Config::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.auth.credentials_path, PathBuf::from("/etc/autoresponder/client.json"));
        assert_eq!(config.auth.token_path, PathBuf::from("/var/lib/autoresponder/token.json"));
        assert!(!config.reply.dry_run);
        assert_eq!(cli.command(), Commands::Once { dry_run: false });
    }

    #[test]
    fn test_dry_run_flag_sets_config() {
        let cli = Cli::parse_from(["gmail-autoresponder", "run", "--dry-run"]);
        let mut config = Config::default();
        cli.apply_overrides(&mut config);
        assert!(config.reply.dry_run);
    }

    #[test]
    fn test_auth_force() {
        let cli = Cli::parse_from(["gmail-autoresponder", "-v", "auth", "--force"]);
        assert!(cli.verbose);
        assert_eq!(cli.command(), Commands::Auth { force: true });
    }

    #[test]
    fn test_init_config_defaults() {
        let cli = Cli::parse_from(["gmail-autoresponder", "init-config"]);
        assert_eq!(
            cli.command(),
            Commands::InitConfig {
                output: PathBuf::from("autoresponder.toml"),
                force: false
            }
        );
    }
}
