//! CLI command implementations.

use crate::output::{self, ClassificationView, OutputFormat};
use anyhow::{Context as _, Result};
use beacon_core::{Channel, EventClassifier, Priority, RecipientPreference, decode_webhook};
use beacon_server::{AppState, BeaconConfig, StoreBackend};
use beacon_store::{DeliveryLog, FsStore, MemoryStore, PreferenceStore, RecordStore};
use console::style;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Loaded configuration plus the resolved data directory.
pub struct Context {
    pub config: BeaconConfig,
    pub data_dir: PathBuf,
}

impl Context {
    /// Load the config file and apply environment overrides.
    pub fn load(config_path: &Path, data_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = BeaconConfig::load(config_path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        let data_dir = data_dir.unwrap_or_else(|| config.store.path.clone());
        Ok(Self { config, data_dir })
    }

    fn open_store(&self) -> Result<FsStore> {
        FsStore::open(&self.data_dir).with_context(|| {
            format!(
                "Failed to open data directory {} (run `beacon init` first)",
                self.data_dir.display()
            )
        })
    }
}

fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let rt = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    Ok(rt.block_on(future))
}

/// Initialize a data directory.
pub fn init(ctx: &Context, format: OutputFormat) -> Result<()> {
    FsStore::init(&ctx.data_dir).context("Failed to initialize data directory")?;
    output::print_success(
        &format!("Initialized data directory at {}", ctx.data_dir.display()),
        format,
    )
}

/// Start the HTTP service.
pub fn serve(ctx: Context, host: Option<String>, port: Option<u16>) -> Result<()> {
    let host = host.unwrap_or_else(|| ctx.config.server.host.clone());
    let port = port.unwrap_or(ctx.config.server.port);

    let state = match ctx.config.store.backend {
        StoreBackend::Fs => {
            let store = FsStore::open_or_init(&ctx.data_dir)
                .context("Failed to open data directory")?;
            info!(path = %store.root().display(), "Using filesystem store");
            AppState::new(&ctx.config, Arc::new(store))?
        }
        StoreBackend::Memory => {
            info!("Using in-memory store");
            AppState::new(&ctx.config, Arc::new(MemoryStore::new()))?
        }
    };

    eprintln!(
        "{} beacon listening on {}",
        style("→").green(),
        style(format!("http://{host}:{port}")).cyan()
    );

    block_on(beacon_server::serve(state, &host, port))?
}

/// Classify a webhook body without storing anything.
pub fn classify(file: &Path, format: OutputFormat) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let body: serde_json::Value = serde_json::from_str(&content)
        .with_context(|| format!("{} is not valid JSON", file.display()))?;
    let event = decode_webhook(body).context("Failed to decode webhook")?;

    let classification = EventClassifier::default().classify(&event);
    output::print(&ClassificationView::new(&event, classification), format)
}

/// List derived records.
pub fn records(ctx: &Context, format: OutputFormat) -> Result<()> {
    let store = ctx.open_store()?;
    let records = block_on(store.list_records())?.context("Failed to list records")?;
    output::print_record_list(&records, format)
}

/// Show recent dispatches.
pub fn deliveries(ctx: &Context, limit: usize, format: OutputFormat) -> Result<()> {
    let store = ctx.open_store()?;
    let entries = block_on(store.recent_deliveries(limit))?
        .context("Failed to read delivery log")?;
    output::print_list(&entries, format)
}

/// Show a user's preferences.
pub fn prefs_get(ctx: &Context, user_id: &str, format: OutputFormat) -> Result<()> {
    let store = ctx.open_store()?;
    let preference = block_on(store.get_preference(user_id))?
        .context("Failed to read preferences")?
        .unwrap_or_else(|| RecipientPreference::default_for(user_id));
    output::print(&preference, format)
}

/// Fields changed by `prefs set`.
pub struct PrefsUpdate {
    pub enable: Vec<Channel>,
    pub disable: Vec<Channel>,
    pub threshold: Option<Priority>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl PrefsUpdate {
    fn apply(&self, preference: &mut RecipientPreference) {
        for channel in &self.enable {
            preference.channels.set(*channel, true);
        }
        for channel in &self.disable {
            preference.channels.set(*channel, false);
        }
        if let Some(threshold) = self.threshold {
            preference.priority_threshold = threshold;
        }
        if let Some(email) = &self.email {
            preference.email = Some(email.clone()).filter(|e| !e.is_empty());
        }
        if let Some(phone) = &self.phone {
            preference.phone = Some(phone.clone()).filter(|p| !p.is_empty());
        }
    }
}

/// Update a user's preferences.
pub fn prefs_set(
    ctx: &Context,
    user_id: &str,
    update: &PrefsUpdate,
    format: OutputFormat,
) -> Result<()> {
    let store = ctx.open_store()?;
    let preference = block_on(async {
        let mut preference = store
            .get_preference(user_id)
            .await?
            .unwrap_or_else(|| RecipientPreference::default_for(user_id));
        update.apply(&mut preference);
        store.put_preference(&preference).await?;
        Ok::<_, beacon_store::StoreError>(preference)
    })?
    .context("Failed to update preferences")?;

    output::print(&preference, format)
}
