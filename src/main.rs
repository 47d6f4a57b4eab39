//! Kudos bot
//!
//! A Telegram bot that links chat users to accounts on an external site
//! and awards points for helpful answers in group chats.

mod api;
mod bot;
mod classifier;
mod config;
mod linking;
mod points;
mod telegram;

#[cfg(test)]
mod testing;

use api::{create_router, AppState};
use bot::{command_menu, Dispatcher, DispatcherConfig, Poller};
use classifier::KeywordClassifier;
use config::BotConfig;
use linking::{run_sweeper, LinkSessionManager, MemoryLinkStore, SystemClock};
use points::MemoryLedger;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use telegram::TelegramClient;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kudos_bot=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    let config = BotConfig::from_env()?;

    // Bad credentials are fatal here rather than on the first poll
    let client = Arc::new(TelegramClient::new(
        &config.telegram_api_url,
        &config.bot_token,
        config.poll_timeout,
    )?);
    let me = client.get_me().await?;
    tracing::info!(bot_id = me.id, username = ?me.username, "Connected to Telegram");

    let debug_commands = config.debug_commands_enabled();
    if config.debug_commands && !debug_commands {
        tracing::warn!("KUDOS_DEBUG_COMMANDS is ignored in release builds");
    } else if debug_commands {
        tracing::warn!("Debug commands are enabled; /debug_link bypasses account linking");
    }
    if let Err(e) = client.set_my_commands(&command_menu(debug_commands)).await {
        tracing::warn!(error = %e, "Failed to register command menu");
    }

    let links = Arc::new(LinkSessionManager::new(
        Arc::new(MemoryLinkStore::new()),
        Arc::new(SystemClock),
        config.token_ttl,
        config.link_endpoint.clone(),
    ));
    tracing::info!(
        ttl_secs = config.token_ttl.num_seconds(),
        link_endpoint = %config.link_endpoint,
        "Link sessions ready"
    );

    let cancel = CancellationToken::new();

    let sweeper = tokio::spawn(run_sweeper(
        links.clone(),
        config.sweep_interval,
        cancel.clone(),
    ));

    // Callback API
    let state = AppState::new(links.clone(), client.clone(), config.callback_secret.clone());
    let app = create_router(state).layer(TraceLayer::new_for_http());
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Link callback API listening on {}", addr);

    let server = tokio::spawn(
        axum::serve(listener, app)
            .with_graceful_shutdown(cancel.clone().cancelled_owned())
            .into_future(),
    );

    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Shutdown requested");
                    cancel.cancel();
                }
                Err(e) => tracing::warn!(error = %e, "Cannot listen for shutdown signal"),
            }
        }
    });

    let dispatcher = Dispatcher::new(
        links,
        client.clone(),
        MemoryLedger::new(),
        KeywordClassifier::new(&config.helpful_keywords),
        DispatcherConfig {
            points_per_helpful: config.points_per_helpful,
            debug_commands,
            webapp_url: config.webapp_url.clone(),
            bot_username: me.username.clone(),
        },
    );
    let poller = Poller::new(client, dispatcher, config.poll_timeout);

    // The poller only returns early on a fatal error; stop everything else too
    let polled = poller.run(cancel.clone()).await;
    cancel.cancel();

    server.await??;
    sweeper.await?;
    polled?;

    tracing::info!("Shut down cleanly");
    Ok(())
}
