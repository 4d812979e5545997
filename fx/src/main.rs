//! fx - sidefx command-line entry point

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result, eyre};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use sidefx::cli::{Cli, Command, get_log_path};
use sidefx::config::Config;
use sidefx::{App, HttpPostClient, InProcessScheduler, PeriodicScheduler, PostState};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_path = get_log_path();
    let log_dir = log_path.parent().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    // Setup logging with priority: CLI > config > INFO default
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Some(Command::Demo) | None => cmd_demo(config).await,
        Some(Command::Post { title, body, user_id }) => cmd_post(config, title, body, user_id).await,
        Some(Command::Schedule { interval_minutes }) => cmd_schedule(config, interval_minutes).await,
        Some(Command::Config) => cmd_config(&config),
    }
}

/// Build the app around the HTTP client and an in-process scheduler
async fn start_app(config: Config) -> Result<(App, Arc<InProcessScheduler>)> {
    let api = Arc::new(HttpPostClient::from_config(&config.api).context("Failed to create HTTP client")?);
    let scheduler = Arc::new(InProcessScheduler::new(&config.periodic));
    let app = App::start(config, api, scheduler.clone())
        .await
        .context("Failed to start lifecycle manager")?;
    Ok((app, scheduler))
}

async fn cmd_demo(config: Config) -> Result<()> {
    debug!("cmd_demo: called");
    let (app, scheduler) = start_app(config).await?;

    let mut changes = app.subscribe_changes();
    let status_printer = tokio::spawn(async move {
        while let Ok(status) = changes.recv().await {
            println!("  status: {}", status);
        }
    });

    let mut post_rx = app.subscribe_post_state();
    let post_printer = tokio::spawn(async move {
        while post_rx.changed().await.is_ok() {
            let state = post_rx.borrow_and_update().clone();
            println!("  post: {}", state);
        }
    });

    print_demo_help();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read input")? {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            continue;
        };
        debug!(%command, "cmd_demo: command received");
        match command {
            "tick" => println!("tick = {}", app.trigger_key_change().await?),
            "work" => println!("ad-hoc {} started", app.start_ad_hoc_work().await?),
            "cancel" => {
                if app.cancel_ad_hoc_work().await? {
                    println!("ad-hoc cancellation requested");
                } else {
                    println!("no ad-hoc task running");
                }
            }
            "cancel-effect" => {
                if app.cancel_effect_work().await? {
                    println!("effect cancellation requested");
                } else {
                    println!("no effect task running");
                }
            }
            "post" => {
                if app.create_default_post().is_none() {
                    println!("a post is already being created");
                }
            }
            "schedule" => {
                let interval = match words.next() {
                    Some(raw) => match raw.parse::<u64>() {
                        Ok(minutes) => minutes,
                        Err(_) => {
                            println!("invalid interval: {}", raw);
                            continue;
                        }
                    },
                    None => app.config().periodic.interval_minutes,
                };
                match app.schedule_periodic(interval).await {
                    Ok(()) => println!("periodic post scheduled every {} minutes", interval),
                    Err(e) => println!("schedule failed: {}", e),
                }
            }
            "status" => {
                println!("tick = {}", app.tick().await);
                println!("status: {}", app.status());
                println!("post: {}", app.post_state());
                for job in app.scheduled_jobs().await {
                    println!(
                        "job {}: every {}m, runs={} ok={} failed={}",
                        job.name,
                        job.interval.as_secs() / 60,
                        job.runs,
                        job.successes,
                        job.failures
                    );
                }
            }
            "help" => print_demo_help(),
            "quit" | "exit" => break,
            other => println!("unknown command: {} (try 'help')", other),
        }
    }

    scheduler.shutdown().await;
    app.shutdown().await.context("Failed to stop lifecycle manager")?;
    status_printer.abort();
    post_printer.abort();
    Ok(())
}

fn print_demo_help() {
    println!("Commands:");
    println!("  tick               change the effect key (restarts the effect task)");
    println!("  work               start ad-hoc work (supersedes running ad-hoc work)");
    println!("  cancel             cancel the ad-hoc work");
    println!("  cancel-effect      cancel the effect task");
    println!("  post               create one post");
    println!("  schedule [minutes] schedule the periodic post job");
    println!("  status             show current state");
    println!("  quit               exit");
}

async fn cmd_post(config: Config, title: Option<String>, body: Option<String>, user_id: Option<i64>) -> Result<()> {
    debug!(?title, ?body, ?user_id, "cmd_post: called");
    let defaults = config.post.clone();
    let (app, _) = start_app(config).await?;

    let handle = app
        .create_once_post(
            title.unwrap_or(defaults.title),
            body.unwrap_or(defaults.body),
            user_id.unwrap_or(defaults.user_id),
        )
        .ok_or_else(|| eyre!("A post is already being created"))?;
    let state = handle.await.context("Post task failed")?;
    app.shutdown().await.context("Failed to stop lifecycle manager")?;

    println!("{}", state);
    match state {
        PostState::Error { message } => Err(eyre!(message)),
        _ => Ok(()),
    }
}

async fn cmd_schedule(config: Config, interval_minutes: Option<u64>) -> Result<()> {
    debug!(?interval_minutes, "cmd_schedule: called");
    let interval = interval_minutes.unwrap_or(config.periodic.interval_minutes);
    let (app, scheduler) = start_app(config).await?;

    app.schedule_periodic(interval)
        .await
        .context("Failed to schedule periodic post")?;
    println!(
        "Periodic post job '{}' scheduled every {} minutes (Ctrl-C to stop)",
        app.config().periodic.job_name,
        interval
    );

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            _ = sigint.recv() => info!("SIGINT received, shutting down"),
            _ = sigterm.recv() => info!("SIGTERM received, shutting down"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Ctrl-C received, shutting down");
    }

    for job in scheduler.jobs().await {
        println!(
            "{}: runs={} ok={} failed={}",
            job.name, job.runs, job.successes, job.failures
        );
    }
    scheduler.shutdown().await;
    if let Err(e) = app.shutdown().await {
        warn!(error = %e, "cmd_schedule: lifecycle manager already stopped");
    }
    Ok(())
}

fn cmd_config(config: &Config) -> Result<()> {
    debug!("cmd_config: called");
    let yaml = serde_yaml::to_string(config).context("Failed to serialize configuration")?;
    print!("{}", yaml);
    Ok(())
}
