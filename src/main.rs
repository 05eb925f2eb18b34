use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, Method};
use clap::Parser;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use controller::auth::BootstrapOutcome;
use controller::cli;
use controller::config;
use controller::store::postgres::PgStore;
use controller::store::CredentialStore;
use controller::vault::{builtin::BuiltinCipher, SecretCipher};
use controller::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Export traces over OTLP only when an endpoint is configured; otherwise
    // plain stdout logging.
    use opentelemetry::KeyValue;

    use opentelemetry_sdk::{trace as sdktrace, Resource};

    let telemetry_layer = if std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok() {
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(opentelemetry_otlp::new_exporter().tonic())
            .with_trace_config(sdktrace::config().with_resource(Resource::new(vec![
                KeyValue::new("service.name", "chorus-controller"),
            ])))
            .install_batch(opentelemetry_sdk::runtime::Tokio)?;
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "controller=debug,chorus_controller=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .with(telemetry_layer)
        .init();

    let cfg = config::load()?;
    let args = cli::Cli::parse();

    let result = match args.command {
        Some(cli::Commands::Serve { port }) => run_server(cfg, port).await,
        Some(cli::Commands::Token { command }) => {
            let db = PgStore::connect(&cfg.database_url).await?;
            let state = AppState::new(Arc::new(db), &cfg.auth_settings()?);
            handle_token_command(command, &state).await
        }
        Some(cli::Commands::Secret { command }) => handle_secret_command(command, &cfg),
        None => run_server(cfg, None).await,
    };

    if let Err(ref e) = result {
        eprintln!("Error: {:?}", e);
    }
    result
}

async fn run_server(cfg: config::Config, port: Option<u16>) -> anyhow::Result<()> {
    if !cfg.is_production() {
        tracing::warn!(environment = %cfg.environment, "not running in production mode");
    }

    tracing::info!("Connecting to database...");
    let db = PgStore::connect(&cfg.database_url).await?;

    tracing::info!("Running migrations...");
    db.migrate().await?;

    let store: Arc<dyn CredentialStore> = Arc::new(db);
    let state = Arc::new(AppState::new(store, &cfg.auth_settings()?));

    tracing::info!("Ensuring system token...");
    match state.bootstrapper.ensure_system_credential().await? {
        BootstrapOutcome::Created(id) => tracing::info!(token_id = %id, "system token created"),
        BootstrapOutcome::Repaired(id) => tracing::info!(token_id = %id, "system token repaired"),
        BootstrapOutcome::Unchanged(id) => tracing::info!(token_id = %id, "system token ok"),
    }

    let app = controller::api::api_router(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers([
                    HeaderName::from_static("content-type"),
                    HeaderName::from_static("authorization"),
                    HeaderName::from_static("x-request-id"),
                ]),
        )
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(axum::middleware::from_fn(security_headers_middleware));

    let addr = SocketAddr::from(([0, 0, 0, 0], port.unwrap_or(cfg.port)));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Chorus controller listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Middleware: injects a unique X-Request-Id into every response.
async fn request_id_middleware(
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let req_id = uuid::Uuid::new_v4().to_string();
    let mut resp = next.run(req).await;
    if let Ok(val) = HeaderValue::from_str(&req_id) {
        resp.headers_mut().insert("x-request-id", val);
    }
    resp
}

/// Middleware: security headers on every response. Token responses must
/// never be cached.
async fn security_headers_middleware(
    req: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let mut resp = next.run(req).await;
    let headers = resp.headers_mut();

    headers.insert("X-Content-Type-Options", HeaderValue::from_static("nosniff"));
    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert("Cache-Control", HeaderValue::from_static("no-store"));
    headers.insert("Referrer-Policy", HeaderValue::from_static("no-referrer"));
    headers.remove("Server");

    resp
}

async fn handle_token_command(cmd: cli::TokenCommands, state: &AppState) -> anyhow::Result<()> {
    match cmd {
        cli::TokenCommands::Create {
            name,
            description,
            expires_at,
        } => {
            let issued = state.issuer.issue(&name, description, expires_at).await?;
            let expiry = issued
                .expires_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "never".into());
            println!(
                "Token created:\n  Name:    {}\n  Expires: {}\n  Use:     Authorization: Token {}",
                issued.name, expiry, issued.token
            );
        }
        cli::TokenCommands::List => {
            let tokens = state.store.list().await?;
            if tokens.is_empty() {
                println!("No tokens found.");
            } else {
                println!(
                    "{:<38} {:<20} {:<8} {:<8} EXPIRES",
                    "ID", "NAME", "ACTIVE", "SYSTEM"
                );
                for t in tokens {
                    println!(
                        "{:<38} {:<20} {:<8} {:<8} {}",
                        t.id,
                        t.name,
                        t.is_active,
                        t.is_system,
                        t.expires_at
                            .map(|e| e.format("%Y-%m-%d %H:%M").to_string())
                            .unwrap_or_else(|| "never".into())
                    );
                }
            }
        }
        cli::TokenCommands::System => {
            state.bootstrapper.ensure_system_credential().await?;
            for t in state.issuer.system_tokens().await? {
                println!("System token ({}):\n  Authorization: Token {}", t.id, t.token);
            }
        }
        cli::TokenCommands::Revoke { id } => {
            state.revocation.revoke_by_id(&id).await?;
            println!("Token revoked.");
        }
        cli::TokenCommands::Delete { id } => {
            state.revocation.hard_delete(&id).await?;
            println!("Token deleted.");
        }
    }
    Ok(())
}

fn handle_secret_command(cmd: cli::SecretCommands, cfg: &config::Config) -> anyhow::Result<()> {
    let cipher = BuiltinCipher::new(&cfg.encryption_key);
    match cmd {
        cli::SecretCommands::Encrypt { plaintext } => println!("{}", cipher.encrypt(&plaintext)?),
        cli::SecretCommands::Decrypt { ciphertext } => println!("{}", cipher.decrypt(&ciphertext)?),
    }
    Ok(())
}
