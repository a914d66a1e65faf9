//! Telegram runtime entrypoint.

use crate::bot::{self, Command};
use crate::config::{DeliveryMode, Settings};
use crate::inventory::{InventoryService, SectionMap, YandexDiskSource};
use anyhow::{anyhow, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use teloxide::update_listeners::webhooks;
use tracing::{error, info};

/// Run the bot until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the webhook cannot be registered or its URL is invalid.
pub async fn run_bot(settings: Arc<Settings>, mode: DeliveryMode) -> Result<()> {
    let service = init_inventory(&settings);
    let bot = Bot::new(settings.telegram_token.clone());

    let mut dispatcher = Dispatcher::builder(bot.clone(), setup_handler())
        .dependencies(dptree::deps![service])
        .enable_ctrlc_handler()
        .build();

    match mode {
        DeliveryMode::Polling => {
            info!("Bot is running in polling mode...");
            dispatcher.dispatch().await;
        }
        DeliveryMode::Webhook { host, port, path } => {
            let address = SocketAddr::from(([0, 0, 0, 0], port));
            let url = reqwest::Url::parse(&format!("https://{host}/{path}"))
                .map_err(|e| anyhow!("Invalid webhook URL for host {host}: {e}"))?;
            let listener = webhooks::axum(bot, webhooks::Options::new(address, url))
                .await
                .map_err(|e| anyhow!("Failed to register webhook: {e}"))?;

            info!(%address, %host, "Bot is running in webhook mode...");
            dispatcher
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the update listener"),
                )
                .await;
        }
    }

    Ok(())
}

fn init_inventory(settings: &Settings) -> Arc<InventoryService> {
    let source = YandexDiskSource::from_settings(settings);
    info!(
        "Initializing inventory (cache window: {}s, resolve timeout: {}s, download timeout: {}s)",
        settings.cache_ttl_secs, settings.resolve_timeout_secs, settings.download_timeout_secs
    );
    Arc::new(InventoryService::new(
        Arc::new(source),
        SectionMap::default(),
        settings.cache_ttl(),
    ))
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(Update::filter_callback_query().endpoint(handle_menu_callback))
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    service: Arc<InventoryService>,
) -> Result<(), teloxide::RequestError> {
    let res = match cmd {
        Command::Start => bot::start(bot, msg, service).await,
    };
    if let Err(e) = res {
        error!("Command error: {}", e);
    }
    respond(())
}

async fn handle_menu_callback(
    bot: Bot,
    q: CallbackQuery,
    service: Arc<InventoryService>,
) -> Result<(), teloxide::RequestError> {
    if let Err(e) = bot::handle_menu_callback(bot, q, service).await {
        error!("Menu callback handler error: {}", e);
    }
    respond(())
}
