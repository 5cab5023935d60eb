//! Actix server startup + app wiring.
//!
//! Builds the backend client, session registry and shared state, then serves
//! the routes plus the OpenAPI endpoints.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::task::{Context, Poll};

use actix_web::dev::{Service, ServiceRequest, ServiceResponse};
use actix_web::Error;
use actix_web::{web, App, HttpServer};
use anyhow::{Context as _, Result};
use futures_util::future::{ok, LocalBoxFuture, Ready};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api;
use crate::config;
use crate::events::{log_events, EventBus};
use crate::lavalink::LavalinkClient;
use crate::openapi;
use crate::session_registry::SessionRegistry;
use crate::state::AppState;
use crate::voice::TrackedVoiceTransport;

/// Build server state and start the Actix HTTP server.
pub(crate) async fn run(args: crate::Args) -> Result<()> {
    let cfg = load_config(args.config.as_ref())?;
    let bind = resolve_bind(args.bind, &cfg)?;
    let backend_settings = config::backend_from_config(&cfg, |key| std::env::var(key).ok());
    let controller_settings = config::controller_settings_from_config(&cfg);
    tracing::info!(
        bind = %bind,
        backend = %backend_settings.uri,
        advance_timeout_ms = controller_settings.advance_timeout.as_millis() as u64,
        default_volume = controller_settings.default_volume,
        "starting jukebox-hub"
    );

    let client = Arc::new(LavalinkClient::new(&backend_settings).context("create backend client")?);
    match client.info().await {
        Ok(info) => tracing::info!(version = %info.version.semver, "backend node reachable"),
        Err(err) => tracing::warn!(error = %err, "backend node not reachable yet"),
    }

    let events = EventBus::new();
    actix_web::rt::spawn(log_events(events.subscribe()));

    let registry = Arc::new(SessionRegistry::new(client.clone(), events, controller_settings));
    let state = web::Data::new(AppState::new(
        registry,
        client.clone(),
        client,
        Arc::new(TrackedVoiceTransport::new()),
    ));

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(FilteredLogger)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", openapi::ApiDoc::openapi()),
            )
            .configure(api::configure)
    })
    .bind(bind)
    .with_context(|| format!("bind {bind}"))?
    .run()
    .await?;

    Ok(())
}

/// Return true when the request path should be logged.
fn should_log_path(path: &str) -> bool {
    !matches!(path, "/health" | "/status" | "/events")
}

/// Actix middleware that filters noisy paths from logging.
struct FilteredLogger;

impl<S, B> actix_web::dev::Transform<S, ServiceRequest> for FilteredLogger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = FilteredLoggerMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(FilteredLoggerMiddleware { service })
    }
}

/// Service wrapper that applies the logging filter.
struct FilteredLoggerMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for FilteredLoggerMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, ctx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let path = req.path().to_string();
        let should_log = should_log_path(&path);
        let method = req.method().clone();
        let peer = req.connection_info().realip_remote_addr().unwrap_or("-").to_string();
        let start = std::time::Instant::now();
        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            if should_log {
                tracing::info!(
                    method = %method,
                    path = %path,
                    status = %res.status().as_u16(),
                    peer = %peer,
                    elapsed_ms = %start.elapsed().as_millis(),
                    "http request"
                );
            }
            Ok(res)
        })
    }
}

/// Load server config from `--config`, a `config.toml` beside the binary, or defaults.
fn load_config(path: Option<&PathBuf>) -> Result<config::ServerConfig> {
    if let Some(path) = path {
        return config::ServerConfig::load(path);
    }
    let auto_path = std::env::current_exe()
        .ok()
        .and_then(|path| path.parent().map(|dir| dir.join("config.toml")))
        .filter(|path| path.exists());
    match auto_path {
        Some(path) => config::ServerConfig::load(&path),
        None => {
            tracing::info!("no config file found; using defaults");
            Ok(config::ServerConfig::default())
        }
    }
}

/// Resolve the final bind address from args + config.
fn resolve_bind(bind: Option<SocketAddr>, cfg: &config::ServerConfig) -> Result<SocketAddr> {
    match bind {
        Some(addr) => Ok(addr),
        None => match config::bind_from_config(cfg)? {
            Some(addr) => Ok(addr),
            None => config::DEFAULT_BIND
                .parse()
                .with_context(|| format!("parse default bind {}", config::DEFAULT_BIND)),
        },
    }
}
