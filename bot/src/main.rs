mod telegram;

use anyhow::{bail, Context, Result};
use config::{AppConfig, Runtime};
use conversation::{Controller, ControllerSettings};
use epay_core::{FileSequenceStore, SequenceStore};
use gateway::{expresspay::ExpressPayClient, mock::MockGateway, InvoiceGateway};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use teloxide::update_listeners::webhooks;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use webhook::audit::AuditLog;
use webhook::{Fanout, NotificationSink, WebhookState, NOTIFY_PATH};

const TELEGRAM_PATH: &str = "/telegram";

fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info,teloxide=warn".to_string());
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(env_filter))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn create_gateway(cfg: &AppConfig, runtime: &Runtime) -> Result<Arc<dyn InvoiceGateway>> {
    match cfg.provider.kind.as_str() {
        "mock" => {
            tracing::info!("Using mock payment gateway");
            Ok(MockGateway::new())
        }
        "expresspay" => {
            tracing::info!(base_url = %cfg.provider.base_url, "Using ExpressPay gateway");
            let client = ExpressPayClient::new(
                &cfg.provider.base_url,
                runtime.gateway_token.clone(),
                Duration::from_secs(cfg.provider.request_timeout_secs),
            )?;
            Ok(client)
        }
        other => bail!("Unknown payment provider `{}`", other),
    }
}

fn notification_sink(cfg: &AppConfig, bot: &Bot) -> Arc<dyn NotificationSink> {
    let mut sinks: Vec<Arc<dyn NotificationSink>> =
        vec![Arc::new(AuditLog::new(cfg.storage.audit_file.clone()))];
    if let Some(chat_id) = cfg.notify_chat_id {
        sinks.push(Arc::new(telegram::ChatNotifier {
            bot: bot.clone(),
            chat_id: ChatId(chat_id),
            currency_label: cfg.invoice.currency_label.clone(),
            display_prefix: cfg.invoice.account_display_prefix.clone(),
        }));
    }
    Arc::new(Fanout(sinks))
}

/// `epay-bot store-secret <name> <value>` writes a credential to the OS keychain.
/// `epay-bot set-notify-chat <chat-id>` persists the merchant chat for payment notices.
fn run_command(mut args: impl Iterator<Item = String>) -> Result<()> {
    match args.next().as_deref() {
        Some("store-secret") => {
            let (Some(name), Some(value)) = (args.next(), args.next()) else {
                bail!("usage: epay-bot store-secret <name> <value>");
            };
            config::store_secret(&name, &value)?;
            tracing::info!(%name, "Secret stored in keychain");
            Ok(())
        }
        Some("set-notify-chat") => {
            let chat_id: i64 = args
                .next()
                .context("usage: epay-bot set-notify-chat <chat-id>")?
                .parse()
                .context("chat id must be an integer")?;
            let mut cfg = config::load()?;
            cfg.notify_chat_id = Some(chat_id);
            config::store(&cfg)?;
            tracing::info!(chat_id, "Payment notifications will be forwarded to chat");
            Ok(())
        }
        Some(other) => bail!("Unknown command `{}`", other),
        None => Ok(()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let mut args = std::env::args().skip(1).peekable();
    if args.peek().is_some() {
        return run_command(args);
    }

    let runtime = Runtime::from_env().context("Startup configuration is incomplete")?;
    let cfg = config::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Falling back to default settings");
        AppConfig::default()
    });
    tracing::debug!(?runtime, "Runtime configuration resolved");

    let gateway = create_gateway(&cfg, &runtime)?;
    let store: Arc<dyn SequenceStore> =
        Arc::new(FileSequenceStore::new(cfg.storage.sequence_file.clone()));
    let controller = Arc::new(Controller::new(
        gateway,
        store,
        ControllerSettings {
            currency_code: cfg.invoice.currency_code,
            currency_label: cfg.invoice.currency_label.clone(),
            display_prefix: cfg.invoice.account_display_prefix.clone(),
            invoice_info: cfg.invoice.info.clone(),
            selection: cfg.invoice.status_selection,
        },
    ));

    let bot = Bot::new(runtime.bot_token.clone());
    let notify_router = webhook::router(WebhookState::new(
        runtime.gateway_secret.as_str(),
        notification_sink(&cfg, &bot),
    ));
    let addr = SocketAddr::from(([0, 0, 0, 0], runtime.port));

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(telegram::on_message))
        .branch(Update::filter_callback_query().endpoint(telegram::on_callback));

    let mut dispatcher = Dispatcher::builder(bot.clone(), handler)
        .dependencies(dptree::deps![controller])
        .enable_ctrlc_handler()
        .build();

    match &runtime.webhook_base_url {
        Some(base) => {
            let url: reqwest::Url = format!("{}{}", base, TELEGRAM_PATH)
                .parse()
                .context("WEBHOOK_BASE_URL is not a valid URL")?;
            let (listener, stop_flag, telegram_router) =
                webhooks::axum_to_router(bot.clone(), webhooks::Options::new(addr, url)).await?;
            let app = notify_router.merge(telegram_router);

            let tcp = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("Failed to bind {}", addr))?;
            tracing::info!(
                %addr,
                notify_url = %format!("{}{}", base, NOTIFY_PATH),
                "Serving Telegram webhook and payment notifications"
            );
            tokio::spawn(async move {
                if let Err(e) = axum::serve(tcp, app).with_graceful_shutdown(stop_flag).await {
                    tracing::error!(error = %e, "HTTP server stopped");
                }
            });

            dispatcher
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("Telegram update listener failed"),
                )
                .await;
        }
        None => {
            let tcp = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("Failed to bind {}", addr))?;
            tracing::info!(
                %addr,
                path = NOTIFY_PATH,
                "Serving payment notifications; Telegram via long polling"
            );
            tokio::spawn(async move {
                if let Err(e) = axum::serve(tcp, notify_router).await {
                    tracing::error!(error = %e, "HTTP server stopped");
                }
            });

            dispatcher.dispatch().await;
        }
    }

    Ok(())
}
