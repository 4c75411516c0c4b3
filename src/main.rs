mod config;
mod db;
mod dtos;
mod error;
mod handler;
mod middleware;
mod models;
mod routes;
mod service;
mod utils;

use std::sync::Arc;

use axum::http::{header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE}, HeaderValue, Method};
use config::Config;
use dotenv::dotenv;
use routes::create_router;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::watch;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::filter::LevelFilter;

use crate::db::db::DBClient;
use crate::db::supervisor::{ConnectivitySupervisor, PoolState, ReconnectPolicy};

// Import the services
use service::{
    payment_intent_service::PaymentIntentService,
    payout_account_service::PayoutAccountService,
    settlement_service::SettlementService,
    stripe_gateway::{PaymentGateway, StripeGateway},
    webhook_service::WebhookService,
};

pub struct AppState {
    pub env: Config,
    pub db_client: Arc<DBClient>,
    pub db_health: watch::Receiver<PoolState>,
    // Services
    pub payment_intent_service: Arc<PaymentIntentService<DBClient>>,
    pub settlement_service: Arc<SettlementService<DBClient>>,
    pub webhook_service: Arc<WebhookService<DBClient>>,
    pub payout_account_service: Arc<PayoutAccountService<DBClient>>,
}

impl AppState {
    pub fn new(
        db_client: DBClient,
        config: Config,
        gateway: Arc<dyn PaymentGateway>,
        db_health: watch::Receiver<PoolState>,
    ) -> Self {
        let db_client_arc = Arc::new(db_client);

        // Initialize all services
        let payout_account_service = Arc::new(PayoutAccountService::new(
            db_client_arc.clone(),
            gateway.clone(),
            config.app_url.clone(),
        ));

        let settlement_service = Arc::new(SettlementService::new(
            db_client_arc.clone(),
            gateway.clone(),
            payout_account_service.clone(),
        ));

        let payment_intent_service = Arc::new(PaymentIntentService::new(
            db_client_arc.clone(),
            gateway.clone(),
        ));

        let webhook_service = Arc::new(WebhookService::new(
            db_client_arc.clone(),
            settlement_service.clone(),
            payout_account_service.clone(),
            config.stripe_webhook_secret.clone(),
        ));

        Self {
            env: config,
            db_client: db_client_arc,
            db_health,
            payment_intent_service,
            settlement_service,
            webhook_service,
            payout_account_service,
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::DEBUG)
        .init();

    dotenv().ok();

    let config = Config::init();

    // Connect to PostgreSQL
    let pool = match PgPoolOptions::new()
        .max_connections(20)
        .min_connections(5)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            println!("✅ Connection to the database is successful!");
            pool
        }
        Err(err) => {
            println!("🔥 Failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    // Supervise the pool: bounded reconnect attempts with a fixed delay,
    // state surfaced on /health.
    let (supervisor, db_health) =
        ConnectivitySupervisor::new(pool.clone(), ReconnectPolicy::default());
    tokio::spawn(supervisor.run());

    let db_client = DBClient::new(pool);

    if config.stripe_webhook_secret.is_none() {
        println!("⚠️  STRIPE_WEBHOOK_SECRET not set - webhook events will be accepted unsigned");
    }

    let gateway: Arc<dyn PaymentGateway> = Arc::new(StripeGateway::new(&config));

    let allowed_origins = vec![
        config.app_url.parse::<HeaderValue>().unwrap(),
        "http://localhost:5173".parse::<HeaderValue>().unwrap(),
        "http://localhost:8000".parse::<HeaderValue>().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::PATCH]);

    let app_state = Arc::new(AppState::new(db_client, config.clone(), gateway, db_health));

    let app = create_router(app_state).layer(cors);

    println!(
        "🚀 Server is running on http://localhost:{}",
        config.port
    );

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", &config.port))
        .await
        .unwrap();

    axum::serve(listener, app).await.unwrap();
}
