// routes.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, patch, post, put},
    Extension, Json, Router,
};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::{
    handler::{payments, payout_accounts, webhooks},
    middleware::auth,
    AppState,
};

// Health check handler; reports ledger connectivity from the supervisor.
async fn health_check(
    Extension(app_state): Extension<Arc<AppState>>,
) -> Json<serde_json::Value> {
    let database = app_state.db_health.borrow().clone();
    Json(json!({
        "status": "ok",
        "database": database,
    }))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let payment_routes = Router::new()
        .route("/intents", post(payments::create_payment_intent))
        .route(
            "/intents/:payment_id/confirm",
            post(payments::confirm_payment),
        )
        .route("/earnings", get(payments::get_my_earnings))
        .route(
            "/earnings/:earning_id",
            patch(payments::update_earning_status),
        )
        .layer(middleware::from_fn(auth));

    let payout_account_routes = Router::new()
        .route("/", post(payout_accounts::create_payout_account))
        .route("/status", get(payout_accounts::get_payout_account_status))
        .route(
            "/bank-accounts",
            get(payout_accounts::get_bank_accounts).post(payout_accounts::add_bank_account),
        )
        .route(
            "/bank-accounts/:bank_account_id/default",
            put(payout_accounts::set_default_bank_account),
        )
        .route(
            "/bank-accounts/:bank_account_id",
            delete(payout_accounts::remove_bank_account),
        )
        .layer(middleware::from_fn(auth));

    // Public: authenticity is checked by signature, not by session.
    let webhook_routes = Router::new().route(
        "/payment-events",
        post(webhooks::payment_events_webhook),
    );

    let api_route = Router::new()
        .nest("/payments", payment_routes)
        .nest("/payout-accounts", payout_account_routes)
        .nest("/webhooks", webhook_routes)
        .layer(TraceLayer::new_for_http());

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_route)
        .layer(Extension(app_state))
}
