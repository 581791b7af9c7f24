//! HTTP service for beacon.
//!
//! Accepts issue-tracker webhooks, dispatches notifications and exposes
//! preferences, records, the delivery log and in-app feeds.

pub mod config;

pub use config::{BeaconConfig, ServerConfig, StoreBackend, StoreSettings};

use anyhow::Result;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use beacon_core::{
    CoreError, DeliveryLogEntry, DerivedRecord, DispatchReport, EventClassifier, FeedEntry,
    NotificationRequest, RecipientPreference, decode_webhook,
};
use beacon_ingest::{
    CategoryChain, ChangelogPipeline, DedupGuard, RecordBuilder, WebhookResponse,
};
use beacon_notify::{NotificationRouter, NotifyError, default_adapters};
use beacon_store::{DeliveryLog, FeedStore, PreferenceStore, RecordStore, Store, StoreError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Default page size for `GET /deliveries`.
const DEFAULT_DELIVERY_LIMIT: usize = 50;

/// Server state shared across handlers.
pub struct AppState {
    store: Arc<dyn Store>,
    router: Arc<NotificationRouter>,
    pipeline: ChangelogPipeline,
}

impl AppState {
    /// Wire the pipeline and router over one store.
    ///
    /// # Errors
    /// Returns error if an HTTP client cannot be constructed.
    pub fn new<S: Store + 'static>(config: &BeaconConfig, store: Arc<S>) -> Result<Self> {
        let adapters = default_adapters(&config.channels, store.clone())?;
        let router = Arc::new(
            NotificationRouter::new(config.routing.route_table(), store.clone(), store.clone())
                .with_adapters(adapters)
                .with_policy(config.routing.policy()),
        );

        let categories = CategoryChain::from_config(&config.ai)?;
        info!(strategies = ?categories.strategy_names(), "Category strategies");

        let pipeline = ChangelogPipeline::new(
            EventClassifier::default(),
            DedupGuard::new(store.clone(), config.ingest.store_timeout()),
            RecordBuilder::new(categories),
            store.clone(),
        )
        .with_notifier(router.clone(), config.ingest.reviewers.clone());

        Ok(Self {
            store,
            router,
            pipeline,
        })
    }
}

/// Build the HTTP application.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/webhooks/issue-tracker", post(receive_webhook))
        .route("/notifications/send", post(send_notification))
        .route(
            "/preferences/{user_id}",
            get(get_preference).post(put_preference),
        )
        .route("/records", get(list_records))
        .route("/deliveries", get(list_deliveries))
        .route("/feed/{user_id}", get(get_feed))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the server.
///
/// # Errors
/// Returns error if binding fails or server encounters an error.
pub async fn serve(state: AppState, host: &str, port: u16) -> Result<()> {
    let app = app(Arc::new(state));

    let addr = format!("{host}:{port}");
    info!(address = %addr, "Starting beacon server");

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// --- Request/Response types ---

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Debug, Deserialize)]
struct DeliveriesQuery {
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Handlers ---

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Always answers 200 unless the service itself failed, so the tracker
/// does not retry deliveries that were merely not relevant.
async fn receive_webhook(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<WebhookResponse>) {
    let event = match decode_webhook(body) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "Rejected webhook payload");
            return (
                StatusCode::BAD_REQUEST,
                Json(WebhookResponse {
                    success: false,
                    message: e.to_string(),
                    changelog_created: false,
                }),
            );
        }
    };

    match state.pipeline.process(&event).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome.response())),
        Err(e) => {
            error!(issue_key = %event.issue_key, error = %e, "Webhook processing failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(WebhookResponse {
                    success: false,
                    message: "internal error while processing webhook".to_string(),
                    changelog_created: false,
                }),
            )
        }
    }
}

async fn send_notification(
    State(state): State<Arc<AppState>>,
    Json(request): Json<NotificationRequest>,
) -> Result<Json<DispatchReport>, AppError> {
    let report = state.router.dispatch(&request).await?;
    Ok(Json(report))
}

async fn get_preference(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<RecipientPreference>, AppError> {
    let preference = state
        .store
        .get_preference(&user_id)
        .await?
        .unwrap_or_else(|| RecipientPreference::default_for(&user_id));
    Ok(Json(preference))
}

async fn put_preference(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(mut body): Json<Value>,
) -> Result<Json<RecipientPreference>, AppError> {
    // The path names the user; a `user_id` in the body is overridden.
    if let Value::Object(fields) = &mut body {
        fields.insert("user_id".to_string(), Value::String(user_id));
    }
    let preference: RecipientPreference = serde_json::from_value(body)?;

    state.store.put_preference(&preference).await?;
    info!(user_id = %preference.user_id, "Preference updated");

    Ok(Json(preference))
}

async fn list_records(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<DerivedRecord>>, AppError> {
    Ok(Json(state.store.list_records().await?))
}

async fn list_deliveries(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DeliveriesQuery>,
) -> Result<Json<Vec<DeliveryLogEntry>>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_DELIVERY_LIMIT);
    Ok(Json(state.store.recent_deliveries(limit).await?))
}

async fn get_feed(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<FeedEntry>>, AppError> {
    Ok(Json(state.store.feed_for(&user_id).await?))
}

// --- Error handling ---

struct AppError(anyhow::Error);

impl AppError {
    fn status(&self) -> StatusCode {
        if let Some(e) = self.0.downcast_ref::<NotifyError>() {
            return match e {
                NotifyError::Invalid(_) => StatusCode::BAD_REQUEST,
                NotifyError::PreferencesUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
        }
        if let Some(e) = self.0.downcast_ref::<StoreError>() {
            return match e {
                StoreError::Core(_) => StatusCode::BAD_REQUEST,
                e if e.is_unavailable() => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
        }
        if self.0.is::<CoreError>() || self.0.is::<serde_json::Error>() {
            return StatusCode::BAD_REQUEST;
        }
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        }

        let body = Json(ErrorResponse {
            error: self.0.to_string(),
        });

        (status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
