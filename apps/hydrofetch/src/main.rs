//! hydrofetch - Fetch HydroShare resources by DOI or URL
//!
//! This is the CLI host runtime: it loads configuration, selects a content
//! provider for the identifier, runs the fetch and displays the progress
//! events the provider emits.

mod cli;
mod display;
mod error;
mod events;
mod logging;

use crate::cli::{Cli, Commands};
use crate::display::{CommandResult, OutputRenderer};
use crate::error::CliError;
use crate::events::EventHandler;
use clap::Parser;
use hydrofetch_config::Config;
use hydrofetch_errors::ProviderError;
use hydrofetch_events::{EventReceiver, EventSender};
use hydrofetch_provider::{detect_provider, ContentProvider, Hydroshare};
use hydrofetch_types::{HostDescriptor, OutputFormat};
use std::collections::HashMap;
use std::process;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // Parse command line arguments first to check for JSON mode
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    init_tracing(json_mode, cli.global.debug);

    if let Err(e) = run(cli).await {
        error!("Application error: {}", e);
        if !json_mode {
            eprintln!("Error: {e}");
        }
        process::exit(1);
    }
}

/// Main application logic
async fn run(cli: Cli) -> Result<(), CliError> {
    info!("Starting hydrofetch v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration with proper precedence:
    // 1. Start with file config (or defaults)
    let mut config = Config::load_or_default(cli.global.config.as_deref()).await?;

    // 2. Merge environment variables
    config.merge_env()?;

    // 3. Apply CLI flags (highest precedence)
    apply_cli_config(&mut config, &cli.global, &cli.command)?;
    config.validate()?;

    let (event_sender, event_receiver) = hydrofetch_events::channel();

    let cancel = CancellationToken::new();
    spawn_interrupt_handler(cancel.clone());

    let output = config.general.default_output;
    let renderer = OutputRenderer::new(output, config.general.color);
    let colors_enabled = display::colors_enabled(
        output,
        config.general.color,
        &console::Term::stderr(),
    );
    let mut event_handler = EventHandler::new(
        colors_enabled,
        cli.global.debug,
        output == OutputFormat::Json,
    );

    let provider_hosts = config.hosts();
    let provider = Hydroshare::from_config(&config)?
        .with_event_sender(event_sender.clone())
        .with_cancellation(cancel);
    let providers: Vec<Box<dyn ContentProvider>> = vec![Box::new(provider)];

    let result = execute_command_with_events(
        cli.command,
        &providers,
        provider_hosts.as_slice(),
        event_sender,
        event_receiver,
        &mut event_handler,
    )
    .await?;

    renderer.render_result(&result)?;

    info!("Command completed successfully");
    Ok(())
}

/// Execute command with concurrent event handling
async fn execute_command_with_events(
    command: Commands,
    providers: &[Box<dyn ContentProvider>],
    hosts: &[HostDescriptor],
    event_sender: EventSender,
    mut event_receiver: EventReceiver,
    event_handler: &mut EventHandler,
) -> Result<CommandResult, CliError> {
    let mut command_future = Box::pin(execute_command(command, providers, hosts, event_sender));

    // Handle events concurrently with command execution
    loop {
        select! {
            // Command completed
            result = &mut command_future => {
                // Drain any remaining events
                while let Ok(event) = event_receiver.try_recv() {
                    event_handler.handle_event(event);
                }
                return result;
            }

            // Event received
            event = event_receiver.recv() => {
                match event {
                    Some(event) => event_handler.handle_event(event),
                    None => { /* Channel closed: keep waiting for command to finish */ }
                }
            }
        }
    }
}

/// Execute the specified command
async fn execute_command(
    command: Commands,
    providers: &[Box<dyn ContentProvider>],
    hosts: &[HostDescriptor],
    event_sender: EventSender,
) -> Result<CommandResult, CliError> {
    let extra_args = HashMap::new();

    match command {
        Commands::Detect {
            identifier,
            reference,
        } => {
            let detected =
                detect_provider(providers, &identifier, reference.as_deref(), &extra_args).await;
            let (provider, spec) = match detected {
                Some((provider, spec)) => (Some(provider.name().to_string()), Some(spec)),
                None => (None, None),
            };
            Ok(CommandResult::Detection {
                identifier,
                provider,
                spec,
            })
        }

        Commands::Fetch {
            identifier,
            output_dir,
            reference,
            ..
        } => {
            let Some((provider, spec)) =
                detect_provider(providers, &identifier, reference.as_deref(), &extra_args).await
            else {
                let error = hydrofetch_errors::Error::from(ProviderError::NotApplicable {
                    identifier,
                });
                return Err(error.into());
            };

            let report = provider.fetch(&spec, &output_dir, &event_sender).await?;
            Ok(CommandResult::Fetch(report))
        }

        Commands::Hosts => Ok(CommandResult::Hosts(hosts.to_vec())),
    }
}

/// Cancel running fetches on Ctrl-C
fn spawn_interrupt_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            cancel.cancel();
        }
    });
}

/// Initialize tracing/logging
fn init_tracing(json_mode: bool, debug_enabled_flag: bool) {
    // Check if debug logging is enabled
    let debug_enabled = std::env::var("RUST_LOG").is_ok() || debug_enabled_flag;

    if debug_enabled {
        // Debug mode: structured JSON logs to file
        let log_dir = Config::logs_dir();
        let log_file = log_dir.join(format!(
            "hydrofetch-{}.log",
            chrono::Utc::now().format("%Y%m%d-%H%M%S")
        ));

        let file =
            std::fs::create_dir_all(&log_dir).and_then(|()| std::fs::File::create(&log_file));
        match file {
            Ok(file) => {
                tracing_subscriber::fmt()
                    .json()
                    .with_writer(file)
                    .with_env_filter(
                        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(
                            |_| tracing_subscriber::EnvFilter::new("info,hydrofetch=debug"),
                        ),
                    )
                    .init();

                if !json_mode {
                    eprintln!("Debug logging enabled: {}", log_file.display());
                }
                return;
            }
            Err(e) => {
                if !json_mode {
                    eprintln!("Warning: Failed to create log file: {e}");
                }
            }
        }
    }

    if json_mode {
        // JSON mode: suppress console logging to avoid contaminating JSON
        tracing_subscriber::fmt()
            .with_writer(std::io::sink)
            .with_env_filter("off")
            .init();
    } else {
        // Normal mode: minimal logging to stderr
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .init();
    }
}

/// Apply CLI configuration overrides (highest precedence)
fn apply_cli_config(
    config: &mut Config,
    global: &cli::GlobalArgs,
    command: &Commands,
) -> Result<(), CliError> {
    // Global CLI flags override everything
    if global.json {
        config.general.default_output = OutputFormat::Json;
    }
    if let Some(color) = &global.color {
        config.general.color = *color;
    }
    if let Some(dir) = &global.scratch_dir {
        config.paths.scratch_dir = Some(dir.clone());
    }

    // Command-specific CLI flags
    if let Commands::Fetch {
        poll_interval,
        max_wait,
        ..
    } = command
    {
        if let Some(interval) = poll_interval {
            if *interval == 0 {
                return Err(CliError::InvalidArguments(
                    "--poll-interval must be at least 1 second".to_string(),
                ));
            }
            config.polling.interval = *interval;
        }
        if let Some(max_wait) = max_wait {
            config.polling.max_wait = Some(*max_wait);
        }
    }

    Ok(())
}
