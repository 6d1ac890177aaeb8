use anyhow::Result;
use clap::Parser;
use gmail_autoresponder::auth::{self, Authenticator};
use gmail_autoresponder::cli::{Cli, Commands};
use gmail_autoresponder::client::{ClientOptions, GmailMailClient, MailClient};
use gmail_autoresponder::config::Config;
use gmail_autoresponder::credentials;
use gmail_autoresponder::error::AutoReplyError;
use gmail_autoresponder::scheduler::{GmailConnector, Responder, Scheduler};
use std::process;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Exit with proper code on error
    if let Err(e) = run().await {
        display_error(&e);
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Install default crypto provider for rustls
    // On non-Windows platforms, use aws-lc-rs; on Windows, use ring
    #[cfg(not(windows))]
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install default crypto provider"))?;

    #[cfg(windows)]
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install default crypto provider"))?;

    let cli = Cli::parse();
    init_tracing(&cli);

    let command = cli.command();

    if let Commands::InitConfig { output, force } = &command {
        if output.exists() && !force {
            return Err(AutoReplyError::Config(format!(
                "Configuration file already exists at {:?}. Use --force to overwrite.",
                output
            ))
            .into());
        }

        Config::create_example(output).await?;
        println!("Created example configuration file at: {:?}", output);
        println!("Edit [reply] to set the subject and body of the auto-reply.");
        return Ok(());
    }

    let mut config = Config::load(&cli.config).await?;
    cli.apply_overrides(&mut config);
    config.validate()?;

    let authenticator = Authenticator::installed(&config.auth.credentials_path, &config.auth.token_path);

    match command {
        Commands::Auth { force } => {
            if force && credentials::forget_credentials(authenticator.token_path()).await? {
                tracing::info!("Removed stored token {:?}", authenticator.token_path());
            }

            let credential = authenticator.authorize().await?;
            let hub = auth::build_gmail_hub(&credential).await?;
            let address = GmailMailClient::new(hub)
                .with_options(ClientOptions::from(&config.poll))
                .profile_address()
                .await?;

            println!("Authorized as {}", address);
            println!("Token stored at {:?}", authenticator.token_path());
            Ok(())
        }

        Commands::Once { .. } => {
            let scheduler = build_scheduler(authenticator, &config);
            let report = scheduler.run_once().await?;

            println!(
                "Threads: {}  Replied: {}  Skipped: {}  Failed: {}",
                report.threads_seen,
                report.replies_sent,
                report.skipped,
                report.failures.len()
            );
            for failure in &report.failures {
                println!("  - {}: {}", failure.thread_id, failure.error);
            }
            Ok(())
        }

        Commands::Run { .. } => {
            tracing::info!("Gmail auto-responder starting");
            if config.reply.dry_run {
                tracing::info!("Running in DRY RUN mode - replies will not be sent");
            }

            let scheduler = build_scheduler(authenticator, &config);
            scheduler
                .run(async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        tracing::error!("Failed to listen for Ctrl-C: {}", e);
                        std::future::pending::<()>().await;
                    }
                    tracing::info!("Ctrl-C received, stopping");
                })
                .await;
            Ok(())
        }

        Commands::InitConfig { .. } => Ok(()),
    }
}

fn build_scheduler(authenticator: Authenticator, config: &Config) -> Scheduler<GmailConnector> {
    let connector = GmailConnector::new(authenticator, config.poll.clone());
    let responder = Responder::new(config.reply.clone(), config.poll.max_concurrent_replies);
    Scheduler::new(connector, responder, &config.poll)
}

fn init_tracing(cli: &Cli) {
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("gmail_autoresponder=debug,info"))
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("gmail_autoresponder=info,warn"))
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if cli.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Display error with context
fn display_error(error: &anyhow::Error) {
    eprintln!("Error: {}", error);

    let mut cause = error.source();
    while let Some(e) = cause {
        eprintln!("  Caused by: {}", e);
        cause = e.source();
    }

    if let Some(err) = error.downcast_ref::<AutoReplyError>() {
        match err {
            AutoReplyError::Io(_) => {
                eprintln!("\nHint: Make sure credentials.json exists and is a valid OAuth client secret.");
                eprintln!("      You can download it from Google Cloud Console.");
            }
            AutoReplyError::Auth(_) | AutoReplyError::Unauthorized(_) => {
                eprintln!("\nHint: The stored token may be revoked.");
                eprintln!("      Try running: gmail-autoresponder auth --force");
            }
            AutoReplyError::Config(_) => {
                eprintln!("\nHint: Check your configuration file for errors.");
                eprintln!("      Run: gmail-autoresponder init-config --force");
            }
            _ => {}
        }
    }
}
