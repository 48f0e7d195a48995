use std::sync::Arc;

use event_registrar::channels::TelegramChannel;
use event_registrar::config::BotConfig;
use event_registrar::dialog::DialogController;
use event_registrar::reconcile::{DisabledLedger, LedgerSource, SheetsLedger};
use event_registrar::registry::JsonFileStore;
use tracing_subscriber::fmt::writer::MakeWriterExt;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = BotConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export REGISTRAR_BOT_TOKEN=123456:ABC-DEF...");
        std::process::exit(1);
    });

    // Initialize tracing: stderr plus a daily-rotated log file
    std::fs::create_dir_all(&config.log_dir)?;
    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "registrar.log");
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_ansi(false)
        .with_writer(file_writer.and(std::io::stderr))
        .init();

    eprintln!("🎟  Event Registrar v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Data: {}", config.data_dir.display());
    eprintln!("   Logs: {}", config.log_dir.display());
    eprintln!("   Admins: {}", config.admin_ids.len());

    let store = Arc::new(
        JsonFileStore::open(config.guests_path(), config.payments_path())
            .await
            .unwrap_or_else(|e| {
                eprintln!("Error: Failed to open data directory: {e}");
                std::process::exit(1);
            }),
    );

    let ledger: Arc<dyn LedgerSource> = match config.ledger.clone() {
        Some(ledger_config) => {
            eprintln!("   Ledger: sheet {}", ledger_config.sheet_id);
            Arc::new(SheetsLedger::new(ledger_config))
        }
        None => {
            eprintln!("   Ledger: disabled");
            Arc::new(DisabledLedger)
        }
    };

    let controller = Arc::new(
        DialogController::new(
            store,
            ledger,
            config.admin_ids.clone(),
            config.media_dir.clone(),
        )
        .await,
    );

    let channel = TelegramChannel::new(config.bot_token);
    channel.health_check().await?;
    eprintln!("   Telegram: token verified\n");

    channel.run(controller).await?;
    Ok(())
}
