use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use tower_http::cors::CorsLayer;

use datapulse::api::{DataPulseApi, HttpApiClient};
use datapulse::config::ClientConfig;
use datapulse::onboarding::{
    OnboardingController, OnboardingRouteState, PreferenceNavigator, StateStore, TracingNotifier,
    onboarding_routes,
};
use datapulse::preferences::{JsonFilePreferenceStore, Preferences};
use datapulse::session::AuthGate;
use datapulse::sync_watch::SyncWatches;

/// How often the identity proxy is asked whether the session is still valid.
const SESSION_REFRESH: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = ClientConfig::from_env().context("invalid DATAPULSE_* configuration")?;

    eprintln!("📊 DataPulse onboarding v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: {}", config.api_base_url);
    eprintln!(
        "   Onboarding API: http://0.0.0.0:{}/api/onboarding/status",
        config.listen_port
    );
    eprintln!("   Preferences: {}", config.preferences_path.display());

    let app = build_app(&config)
        .await
        .context("failed to start onboarding service")?
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.listen_port))
        .await
        .with_context(|| format!("failed to bind port {}", config.listen_port))?;
    tracing::info!(port = config.listen_port, "Onboarding server started");
    axum::serve(listener, app).await?;

    Ok(())
}

/// Wire the API client, session gate, preferences and controller into the router.
async fn build_app(config: &ClientConfig) -> datapulse::error::Result<Router> {
    let api: Arc<dyn DataPulseApi> = Arc::new(HttpApiClient::from_config(config)?);

    // ── Session ─────────────────────────────────────────────────────────
    let auth = Arc::new(AuthGate::new());
    if !auth.refresh(api.as_ref()).await {
        eprintln!("   Session: not authenticated (onboarding routes answer 401)");
    }
    {
        let auth = Arc::clone(&auth);
        let api = Arc::clone(&api);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(SESSION_REFRESH);
            tick.tick().await;
            loop {
                tick.tick().await;
                auth.refresh(api.as_ref()).await;
            }
        });
    }

    // ── Onboarding ──────────────────────────────────────────────────────
    let store = JsonFilePreferenceStore::open(&config.preferences_path).await?;
    let preferences = Preferences::new(Arc::new(store));

    let controller = Arc::new(OnboardingController::new(
        Arc::clone(&api),
        StateStore::new(),
        Arc::new(PreferenceNavigator::new(preferences.clone())),
        Arc::new(TracingNotifier),
        preferences.clone(),
    ));

    if preferences.onboarding_active().await {
        if let Some(account_id) = preferences.last_account_id().await {
            match controller.resume(account_id).await {
                Ok(_) => eprintln!("   Resumed onboarding for workspace {account_id}"),
                Err(e) => tracing::warn!(account_id, "Could not resume onboarding: {e}"),
            }
        }
    }

    let sync_watches = Arc::new(SyncWatches::new(Arc::clone(&api), config.sync_poll_interval));

    Ok(onboarding_routes(OnboardingRouteState {
        controller,
        auth,
        sync_watches,
    }))
}
