//! Process wiring. Everything is constructed here, explicitly, from the
//! loaded configuration; no module reaches for globals.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use tracing_subscriber::EnvFilter;

use nextaction_core::config::{AppConfig, LoadOptions, LogFormat, LoggingConfig};
use nextaction_db::repositories::{
    SqlContextRepository, SqlExportTokenRepository, SqlProjectRepository, SqlTaskRepository,
    SqlUserRepository,
};
use nextaction_db::{connect_with_settings, migrations, DbPool, PoolSettings};
use nextaction_slack::commands::CommandRouter;
use nextaction_slack::notify::HttpSlackNotifier;

use crate::reminders::ReminderSweeper;
use crate::webhooks::{self, AppState};
use crate::workflow::GtdWorkflow;

pub fn init_tracing(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match config.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

pub async fn build(config: &AppConfig) -> anyhow::Result<(axum::Router, DbPool)> {
    let pool = connect_with_settings(
        &config.database.url,
        PoolSettings {
            max_connections: config.database.max_connections,
            acquire_timeout_secs: config.database.timeout_secs,
            busy_timeout_ms: config.database.busy_timeout_ms,
        },
    )
    .await
    .context("opening the database")?;
    migrations::run_pending(&pool).await.context("running migrations")?;

    let tasks = Arc::new(SqlTaskRepository::new(pool.clone()));
    let notifier = Arc::new(HttpSlackNotifier::new(config.slack.bot_token.clone()));

    let workflow = GtdWorkflow::new(
        Arc::new(SqlUserRepository::new(pool.clone())),
        tasks.clone(),
        Arc::new(SqlProjectRepository::new(pool.clone())),
        Arc::new(SqlContextRepository::new(pool.clone())),
        Arc::new(SqlExportTokenRepository::new(pool.clone())),
        notifier.clone(),
        config.server.external_base_url(),
    );

    let state = AppState {
        command_router: Arc::new(CommandRouter::new(workflow.clone())),
        sweeper: Arc::new(ReminderSweeper::new(
            tasks,
            notifier,
            config.reminders.due_window_hours,
            config.reminders.inbox_digest_limit,
        )),
        workflow,
        signing_secret: config.slack.signing_secret.clone(),
        cron_secret: config.reminders.cron_secret.clone(),
        api_secret: config.reminders.api_secret.clone(),
        pool: pool.clone(),
    };

    Ok((webhooks::routes(state), pool))
}

pub async fn run() -> anyhow::Result<()> {
    let config = AppConfig::load(LoadOptions::default()).context("loading configuration")?;
    init_tracing(&config.logging);

    if config.slack.signing_secret.is_none() {
        tracing::warn!("slack signing secret is not configured, request verification is OFF");
    }

    let (router, _pool) = build(&config).await?;

    let addr = format!("{}:{}", config.server.bind_address, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "listening");

    let grace = Duration::from_secs(config.server.graceful_shutdown_secs);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(grace))
        .await
        .context("server terminated abnormally")
}

async fn shutdown_signal(grace: Duration) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "could not install ctrl-c handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "could not install sigterm handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown signal received, draining connections");

    // Hard stop if draining outlives the configured grace period.
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        tracing::warn!(grace_secs = grace.as_secs(), "grace period elapsed, exiting");
        std::process::exit(0);
    });
}
