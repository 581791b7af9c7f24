//! Channel adapter implementations.

mod email;
mod in_app;
mod slack;
mod sms;
mod webhook;

pub use email::EmailAdapter;
pub use in_app::InAppAdapter;
pub use slack::SlackAdapter;
pub use sms::SmsAdapter;
pub use webhook::WebhookAdapter;

use crate::channel::ChannelAdapter;
use crate::config::ChannelConfig;
use crate::error::Result;
use beacon_store::FeedStore;
use reqwest::Client;
use std::sync::Arc;

/// Build one adapter per channel from configuration, sharing an HTTP client.
///
/// # Errors
/// Returns error if the HTTP client cannot be constructed.
pub fn default_adapters(
    config: &ChannelConfig,
    feed: Arc<dyn FeedStore>,
) -> Result<Vec<Arc<dyn ChannelAdapter>>> {
    let client = Client::builder().timeout(config.request_timeout()).build()?;

    Ok(vec![
        Arc::new(SlackAdapter::new(client.clone(), &config.slack)),
        Arc::new(EmailAdapter::new(client.clone(), &config.email)),
        Arc::new(SmsAdapter::new(client.clone(), &config.sms)),
        Arc::new(WebhookAdapter::new(client, &config.webhook)),
        Arc::new(InAppAdapter::new(feed)),
    ])
}

/// Local HTTP endpoint that records what providers would receive.
#[cfg(test)]
pub(crate) mod testing {
    use axum::Json;
    use axum::Router;
    use axum::http::{HeaderMap, StatusCode, header};
    use axum::routing::post;
    use serde_json::Value;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone)]
    pub struct Captured {
        pub authorization: Option<String>,
        pub body: Value,
    }

    pub type Capture = Arc<Mutex<Vec<Captured>>>;

    pub async fn spawn_endpoint(status: StatusCode) -> (String, Capture) {
        let capture: Capture = Arc::default();
        let state = capture.clone();
        let app = Router::new().route(
            "/",
            post(move |headers: HeaderMap, Json(body): Json<Value>| {
                let state = state.clone();
                async move {
                    let authorization = headers
                        .get(header::AUTHORIZATION)
                        .and_then(|v| v.to_str().ok())
                        .map(ToString::to_string);
                    state.lock().unwrap().push(Captured {
                        authorization,
                        body,
                    });
                    status
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{addr}/"), capture)
    }
}
