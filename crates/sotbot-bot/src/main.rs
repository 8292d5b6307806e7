//! Telegram bot for the construction-supervision department: schedule and
//! final-inspection digests, remark filters, per-district cards with status
//! buttons, file attachments to Drive and password-gated analytics.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use sotbot_google::{
    AuthorizedUserCredentials, DriveClient, SheetsClient, TokenProvider,
};
use sotbot_store_sqlite::SqliteStore;
use sotbot_telegram::{BotClient, TelegramError};

mod app;

use app::App;

#[derive(Debug, Parser)]
#[command(name = "sotbot", about = "Construction-supervision department Telegram bot")]
struct Args {
    /// Telegram bot token.
    #[arg(long, env = "BOT_TOKEN", hide_env_values = true)]
    bot_token: String,

    /// Google Sheets spreadsheet id holding the remarks and schedule sheets.
    #[arg(long, env = "SOTBOT_SPREADSHEET_ID")]
    spreadsheet_id: String,

    /// Path to the SQLite history database.
    #[arg(long, env = "SOTBOT_DB_PATH", default_value = "./sotbot.sqlite3")]
    db_path: PathBuf,

    /// Path to an authorized-user Google credentials file.
    #[arg(long, env = "GOOGLE_CREDENTIALS_PATH", default_value = "./credentials.json")]
    google_credentials: PathBuf,

    /// Pre-issued Google access token; when set, the credentials file is
    /// not read.
    #[arg(long, env = "GOOGLE_ACCESS_TOKEN", hide_env_values = true)]
    google_access_token: Option<String>,

    /// Remarks worksheet name.
    #[arg(long, env = "SOTBOT_REMARKS_SHEET", default_value = "ПБ, АР,ММГН, АГО (2025)")]
    remarks_sheet: String,

    /// Schedule worksheet name.
    #[arg(long, env = "SOTBOT_SCHEDULE_SHEET", default_value = "График")]
    schedule_sheet: String,

    /// Password for the analytics section.
    #[arg(long, env = "SOTBOT_ANALYTICS_PASSWORD", default_value = "051995", hide_env_values = true)]
    analytics_password: String,

    /// Long-poll timeout in seconds.
    #[arg(long, default_value_t = 30)]
    poll_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut store = SqliteStore::open(&args.db_path)
        .with_context(|| format!("failed to open database at {}", args.db_path.display()))?;
    store.migrate().context("failed to apply schema migrations")?;

    let auth = Arc::new(match &args.google_access_token {
        Some(token) => TokenProvider::fixed(token),
        None => {
            let credentials = AuthorizedUserCredentials::from_file(&args.google_credentials)
                .with_context(|| {
                    format!(
                        "failed to load google credentials from {}",
                        args.google_credentials.display()
                    )
                })?;
            TokenProvider::authorized_user(credentials)
        }
    });

    let sheets = SheetsClient::new(Arc::clone(&auth), &args.spreadsheet_id)
        .context("failed to build sheets client")?;
    let drive = DriveClient::new(auth);
    let bot = BotClient::new(&args.bot_token);

    let mut app = App::new(
        bot,
        sheets,
        drive,
        store,
        args.remarks_sheet,
        args.schedule_sheet,
        args.analytics_password,
    );

    tracing::info!("bot started, polling for updates");
    run_loop(&mut app, args.poll_timeout_secs).await
}

async fn run_loop(app: &mut App, poll_timeout_secs: u64) -> Result<()> {
    let mut offset: Option<i64> = None;

    loop {
        match app.bot().get_updates(offset, poll_timeout_secs).await {
            Ok(updates) => {
                for update in updates {
                    offset = Some(update.update_id + 1);
                    if let Err(err) = app.handle_update(update).await {
                        tracing::error!(error = %err, "failed to handle update");
                    }
                }
            }
            Err(TelegramError::RateLimited { retry_after }) => {
                tracing::warn!(retry_after, "rate limited by telegram, backing off");
                tokio::time::sleep(Duration::from_secs(retry_after)).await;
            }
            Err(err) => {
                tracing::warn!(error = %err, "polling failed, retrying");
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
        }
    }
}
