// This is the entry point of the Houston Discord bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (backend API, database)
// - `discord/` = Discord-specific adapters (gateway, event handling)
// - `api/` = Control-plane HTTP surface the backend talks to
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Connect the Discord client
// 4. Spawn the rule fetch, message dispatcher and API server

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "api/api_layer.rs"]
mod api;
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::api::ApiState;
use crate::core::moderation::{ModerationService, ReportingClient, RuleCache, SpamTracker};
use crate::core::scheduling::SchedulerService;
use crate::discord::message_adapter::incoming_from_message;
use crate::discord::SerenityGateway;
use crate::infra::backend::BackendApiClient;
use crate::infra::scheduling::SqliteMessageStore;
use chrono::Utc;
use serenity::all::{GatewayIntents, Message, Ready};
use serenity::async_trait;
use serenity::client::{Context, EventHandler};
use std::sync::Arc;
use std::time::Duration;

/// Rule fetch retry policy applied once at startup.
const RULE_FETCH_ATTEMPTS: u32 = 3;
const RULE_FETCH_DELAY_SECS: u64 = 2;

struct Handler {
    moderation: Arc<ModerationService<SerenityGateway, BackendApiClient>>,
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, _ctx: Context, new_message: Message) {
        // Ignore bot messages (including our own)
        if new_message.author.bot {
            return;
        }

        let incoming = incoming_from_message(&new_message);
        self.moderation.evaluate_message(&incoming).await;
    }

    async fn ready(&self, _ctx: Context, ready: Ready) {
        tracing::info!(
            user = %ready.user.name,
            guilds = ready.guilds.len(),
            "Discord bot logged in"
        );
        println!("✅ 🤖 Discord bot logged in successfully!");
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    println!("🚀 Starting Houston Discord Bot...");

    let token = std::env::var("DISCORD_TOKEN").expect(
        "Missing DISCORD_TOKEN environment variable! Create a .env file with your bot token.",
    );
    let api_port: u16 = std::env::var("API_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let backend_url = std::env::var("BACKEND_API_URL")
        .unwrap_or_else(|_| "http://localhost:3001".to_string());
    let internal_api_key = std::env::var("INTERNAL_API_KEY").ok();
    if internal_api_key.is_none() {
        tracing::error!(
            "INTERNAL_API_KEY not configured; rule fetch, reporting and the \
             control-plane API will refuse to work until it is set"
        );
    }
    let jobs_forum_channel_id = std::env::var("JOBS_FORUM_CHANNEL_ID")
        .ok()
        .and_then(|v| v.parse::<u64>().ok());

    // Keep runtime databases in a dedicated folder so the repo root stays tidy.
    let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string());
    std::fs::create_dir_all(&data_dir).expect("Failed to create data directory for SQLite files");
    let scheduler_db_path = format!("{}/scheduler.db", data_dir);

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // Create our services with their dependencies.
    // This is the "composition root" where we wire everything together.

    let scheduler_pool = sqlx::sqlite::SqlitePoolOptions::new()
        .connect(&format!("sqlite://{}?mode=rwc", scheduler_db_path))
        .await
        .expect("Failed to connect to scheduler DB");
    let message_store = SqliteMessageStore::new(scheduler_pool);
    message_store
        .migrate()
        .await
        .expect("Failed to migrate scheduler DB");
    let scheduler_service = Arc::new(SchedulerService::new(message_store));

    let backend = Arc::new(
        BackendApiClient::new(backend_url, internal_api_key.clone())
            .expect("Failed to create backend API client"),
    );
    let rule_cache = Arc::new(RuleCache::new());
    let spam_tracker = Arc::new(SpamTracker::new());
    let reporting = Arc::new(ReportingClient::new(Arc::clone(&backend)));

    // A standalone HTTP handle shared by the gateway, the dispatcher and
    // the API; the serenity client keeps its own for gateway events.
    let http = Arc::new(serenity::http::Http::new(&token));
    let gateway = Arc::new(SerenityGateway::new(Arc::clone(&http)));

    let moderation_service = Arc::new(ModerationService::new(
        Arc::clone(&rule_cache),
        Arc::clone(&spam_tracker),
        Arc::clone(&gateway),
        Arc::clone(&reporting),
    ));

    // ========================================================================
    // DISCORD CLIENT SETUP
    // ========================================================================

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT // Required to read message content
        | GatewayIntents::GUILD_MEMBERS;

    let handler = Handler {
        moderation: Arc::clone(&moderation_service),
    };

    let mut client = serenity::Client::builder(token.as_str(), intents)
        .event_handler(handler)
        .await
        .expect("Error creating client");

    // ========================================================================
    // BACKGROUND TASKS
    // ========================================================================

    // Initial rule fetch. Failure is non-fatal: the bot runs with an empty
    // cache until the backend pushes a sync.
    {
        let rule_cache = Arc::clone(&rule_cache);
        let backend = Arc::clone(&backend);
        tokio::spawn(async move {
            rule_cache
                .fetch_and_load(
                    backend.as_ref(),
                    RULE_FETCH_ATTEMPTS,
                    Duration::from_secs(RULE_FETCH_DELAY_SECS),
                )
                .await;
        });
    }

    // Scheduled-message dispatcher.
    {
        let http = Arc::clone(&http);
        let scheduler_service = Arc::clone(&scheduler_service);
        tokio::spawn(async move {
            discord::dispatch::run_dispatch_loop(http, scheduler_service).await;
        });
    }

    // Control-plane API server.
    {
        let state = Arc::new(ApiState {
            http: Arc::clone(&http),
            cache: client.cache.clone(),
            rules: Arc::clone(&rule_cache),
            reporting: Arc::clone(&reporting),
            gateway: Arc::clone(&gateway),
            scheduler: Arc::clone(&scheduler_service),
            api_key: internal_api_key,
            jobs_forum_channel_id,
            started_at: Utc::now(),
        });
        tokio::spawn(async move {
            let router = api::build_router(state);
            let listener = tokio::net::TcpListener::bind(("0.0.0.0", api_port))
                .await
                .expect("Failed to bind API port");
            println!("✅ 🌐 API server is running on port {}", api_port);
            if let Err(err) = axum::serve(listener, router).await {
                tracing::error!(error = %err, "API server exited");
            }
        });
    }

    println!("⏳ Connecting to Discord...");
    client.start().await.expect("Error running bot");
}
