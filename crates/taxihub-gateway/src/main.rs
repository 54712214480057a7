//! TaxiHub Gateway - edge proxy for the driver and passenger services

use clap::Parser;
use taxihub_gateway::{run_server, GatewayConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "taxihub-gateway")]
#[command(about = "Rate-limiting, authenticating edge proxy for TaxiHub")]
#[command(version)]
struct Args {
    /// Host to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0", env = "GATEWAY_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "GATEWAY_PORT")]
    port: u16,

    /// Driver service base URL
    #[arg(long, default_value = "http://localhost:8081", env = "DRIVER_SERVICE_URL")]
    driver_service_url: String,

    /// Passenger service base URL
    #[arg(long, default_value = "http://localhost:8082", env = "PASSENGER_SERVICE_URL")]
    passenger_service_url: String,

    /// JWT secret for token validation
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    jwt_secret: String,

    /// Shared secret expected in the X-API-Key header
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    api_key: String,

    /// Token refill rate per client (requests per second)
    #[arg(long, default_value = "5", env = "RATE_LIMIT_RPS")]
    rate_limit_rps: u32,

    /// Token bucket capacity per client
    #[arg(long, default_value = "10", env = "RATE_LIMIT_BURST")]
    rate_limit_burst: u32,

    /// Timeout for a single upstream call (seconds)
    #[arg(long, default_value = "5", env = "UPSTREAM_TIMEOUT_SECS")]
    upstream_timeout_secs: u64,

    /// Timeout for a whole inbound request (seconds)
    #[arg(long, default_value = "10", env = "REQUEST_TIMEOUT_SECS")]
    request_timeout_secs: u64,

    /// Rate-limit on X-Forwarded-For / X-Real-IP instead of the peer address
    #[arg(long, env = "TRUST_FORWARDED_FOR")]
    trust_forwarded_for: bool,

    /// Drop idle rate limiter entries every N seconds (0 disables)
    #[arg(long, default_value = "0", env = "LIMITER_SWEEP_SECS")]
    limiter_sweep_secs: u64,

    /// Answer CORS preflights at the gateway (otherwise they are proxied)
    #[arg(long, env = "GATEWAY_CORS")]
    cors: bool,

    /// Enable debug logging
    #[arg(short, long, env = "GATEWAY_DEBUG")]
    debug: bool,

    /// Emit logs as JSON
    #[arg(long, env = "GATEWAY_LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Parse arguments
    let args = Args::parse();

    // Setup logging
    let log_level = if args.debug { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("taxihub_gateway={},tower_http={}", log_level, log_level).into());
    let registry = tracing_subscriber::registry().with(filter);
    if args.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting TaxiHub Gateway on {}:{}", args.host, args.port);
    tracing::info!("Driver service: {}", args.driver_service_url);
    tracing::info!("Passenger service: {}", args.passenger_service_url);

    if args.trust_forwarded_for {
        tracing::warn!("⚠️  Trusting X-Forwarded-For for rate limiting - only safe behind a proxy");
    }

    // Build configuration
    let config = GatewayConfig {
        host: args.host,
        port: args.port,
        driver_service_url: args.driver_service_url,
        passenger_service_url: args.passenger_service_url,
        jwt_secret: args.jwt_secret,
        api_key: args.api_key,
        rate_limit_rps: args.rate_limit_rps,
        rate_limit_burst: args.rate_limit_burst,
        upstream_timeout_secs: args.upstream_timeout_secs,
        request_timeout_secs: args.request_timeout_secs,
        trust_forwarded_for: args.trust_forwarded_for,
        limiter_sweep_secs: args.limiter_sweep_secs,
        cors_enabled: args.cors,
        ..Default::default()
    };

    if let Err(e) = config.validate() {
        tracing::error!("Invalid configuration: {}", e);
        return Err(e.into());
    }

    // Run the server
    run_server(config).await
}
