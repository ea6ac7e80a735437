use std::{net::SocketAddr, path::Path, sync::Arc, time::Duration};

use arc_swap::ArcSwap;
use axum::{
    Router,
    body::Body,
    extract::{ConnectInfo, Request},
    response::Response,
    routing::any,
};
use clap::Parser;
use color_eyre::{
    Result,
    eyre::{Context, eyre},
};
use wicket::{
    adapters::{ConsulRegistry, FileConfigProvider, GatewayHandler, HttpClientAdapter},
    config::{
        GatewayConfigValidator, load_config,
        models::{AppConfig, GatewayConfig},
        validation::validate_registry,
    },
    ports::{config_provider::ConfigProvider, http_client::HttpClient},
    tracing_setup,
    utils::GracefulShutdown,
};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    command: Option<Commands>,

    #[clap(short, long, default_value = "gateway.toml")]
    config: String,

    /// Use human-readable console logs instead of JSON
    #[clap(long)]
    pretty_logs: bool,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Run the gateway proxy (default)
    Gateway {
        /// Configuration file to use
        #[clap(short, long, default_value = "gateway.toml")]
        config: String,
    },
    /// Run the diagnostics backend
    App {
        /// Configuration file to use
        #[clap(short, long, default_value = "app.toml")]
        config: String,
    },
    /// Validate a gateway configuration file
    Validate {
        /// Configuration file to validate
        #[clap(short, long, default_value = "gateway.toml")]
        config: String,
    },
    /// Initialize a new gateway configuration file
    Init {
        /// Output path for the new config file
        #[clap(short, long, default_value = "gateway.toml")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let pretty_logs = args.pretty_logs;

    match args.command {
        Some(Commands::Validate { config }) => validate_config_command(&config).await,
        Some(Commands::Init { config }) => init_config_command(&config).await,
        Some(Commands::App { config }) => {
            tracing_setup::init(pretty_logs)?;
            run_app(&config).await
        }
        Some(Commands::Gateway { config }) => {
            tracing_setup::init(pretty_logs)?;
            run_gateway(&config).await
        }
        None => {
            tracing_setup::init(pretty_logs)?;
            run_gateway(&args.config).await
        }
    }
}

/// Spawn the OS signal listener feeding the shared shutdown coordinator.
fn spawn_signal_handler(shutdown: Arc<GracefulShutdown>) {
    tokio::spawn(async move {
        if let Err(e) = shutdown.run_signal_handler().await {
            tracing::error!("signal handler error: {e}");
        }
    });
}

/// Run the gateway: load and watch the config, proxy everything through the
/// delegating handler.
async fn run_gateway(config_path: &str) -> Result<()> {
    tracing::info!("loading gateway configuration from {config_path}");

    let provider = Arc::new(
        FileConfigProvider::<GatewayConfig>::new(config_path)
            .context("Failed to create config provider")?,
    );

    let initial: GatewayConfig = provider
        .load_config()
        .await
        .with_context(|| format!("Failed to load config from {config_path}"))?;

    GatewayConfigValidator::validate(&initial)
        .map_err(|e| eyre!("Invalid configuration:\n{e}"))?;

    let config_holder = Arc::new(ArcSwap::new(Arc::new(initial)));

    let http_client: Arc<dyn HttpClient> =
        Arc::new(HttpClientAdapter::new().context("Failed to create HTTP client adapter")?);
    let handler = Arc::new(GatewayHandler::new(config_holder.clone(), http_client));

    spawn_reload_task(provider, config_holder.clone(), config_path.to_string());

    let shutdown = Arc::new(GracefulShutdown::new());
    spawn_signal_handler(shutdown.clone());

    let make_request_route = |handler: Arc<GatewayHandler>| {
        any(
            move |ConnectInfo(client_addr): ConnectInfo<SocketAddr>, req: Request| {
                let handler = handler.clone();
                async move {
                    match handler.handle_request(req, Some(client_addr)).await {
                        Ok(response) => Ok::<Response<Body>, std::convert::Infallible>(response),
                        Err(e) => {
                            tracing::error!("request handling error: {e:?}");
                            let error_response = Response::builder()
                                .status(500)
                                .body(Body::from("Internal Server Error"))
                                .unwrap_or_else(|_| {
                                    Response::new(Body::from("Internal Server Error"))
                                });
                            Ok(error_response)
                        }
                    }
                }
            },
        )
    };

    let app = Router::new()
        .route("/{*path}", make_request_route(handler.clone()))
        .route("/", make_request_route(handler));

    let addr: SocketAddr = {
        let config = config_holder.load();
        for (prefix, route) in &config.routes {
            tracing::info!("route {prefix} -> {:?}", route.downstream);
        }
        config
            .listen_addr
            .parse()
            .context("Failed to parse listen address")?
    };

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    tracing::info!("Wicket gateway listening on {addr}");
    println!("Wicket gateway listening on {addr}");

    tokio::select! {
        result = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        ) => {
            result.context("Server error")
        },
        reason = shutdown.wait_for_shutdown_signal() => {
            tracing::info!(?reason, "gateway shutting down");
            Ok(())
        }
    }
}

/// Hot-reload task: on file change notifications, reload and validate the
/// config, swapping it in only when both succeed. Events are debounced since
/// editors often emit several per save.
fn spawn_reload_task(
    provider: Arc<FileConfigProvider<GatewayConfig>>,
    holder: Arc<ArcSwap<GatewayConfig>>,
    config_path: String,
) {
    let debounce = Duration::from_secs(2);
    let mut changes = provider.watch();

    tokio::spawn(async move {
        let mut last_attempt: Option<tokio::time::Instant> = None;

        while changes.recv().await.is_some() {
            if last_attempt.is_some_and(|t| t.elapsed() < debounce) {
                tracing::debug!("config change within debounce window, skipping");
                while changes.try_recv().is_ok() {}
                continue;
            }
            last_attempt = Some(tokio::time::Instant::now());

            tracing::info!("reloading configuration from {config_path}");
            match provider.load_config().await {
                Ok(new_config) => match GatewayConfigValidator::validate(&new_config) {
                    Ok(()) => {
                        holder.store(Arc::new(new_config));
                        tracing::info!("configuration reloaded");
                    }
                    Err(e) => {
                        tracing::error!("reloaded configuration is invalid, keeping old: {e}");
                    }
                },
                Err(e) => {
                    tracing::error!("configuration reload failed, keeping old: {e:#}");
                }
            }
            while changes.try_recv().is_ok() {}
        }
        tracing::info!("config reload task stopped");
    });
}

/// Run the diagnostics backend: serve the info endpoints and keep the service
/// registered with the Consul agent for as long as the process lives.
async fn run_app(config_path: &str) -> Result<()> {
    tracing::info!("loading app configuration from {config_path}");

    let config: AppConfig = load_config(config_path)
        .await
        .with_context(|| format!("Failed to load app config from {config_path}"))?;

    if let Some(registry_config) = &config.registry {
        validate_registry(registry_config).map_err(|errors| {
            eyre!(
                "Invalid registry configuration:\n{}",
                errors
                    .iter()
                    .map(|e| format!("  - {e}"))
                    .collect::<Vec<_>>()
                    .join("\n")
            )
        })?;
    }

    let registry = config
        .registry
        .as_ref()
        .map(ConsulRegistry::from_config)
        .transpose()?
        .flatten();

    if let Some(registry) = &registry {
        // A missing agent must not keep the demo backend from serving.
        if let Err(e) = registry.register().await {
            tracing::error!("service registration failed, continuing unregistered: {e:#}");
        }
    }

    let shutdown = Arc::new(GracefulShutdown::new());
    spawn_signal_handler(shutdown.clone());

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .context("Failed to parse listen address")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    tracing::info!("Wicket diagnostics backend listening on {addr}");
    println!("Wicket diagnostics backend listening on {addr}");

    let serve_result = tokio::select! {
        result = axum::serve(listener, wicket::app::router()) => {
            result.context("Server error")
        },
        reason = shutdown.wait_for_shutdown_signal() => {
            tracing::info!(?reason, "backend shutting down");
            Ok(())
        }
    };

    if let Some(registry) = &registry {
        if let Err(e) = registry.deregister().await {
            tracing::error!("service deregistration failed: {e:#}");
        }
    }

    serve_result
}

/// Validate configuration file and exit
async fn validate_config_command(config_path: &str) -> Result<()> {
    println!("Validating configuration file: {config_path}");

    if !Path::new(config_path).exists() {
        eprintln!("Error: Configuration file '{config_path}' not found");
        std::process::exit(1);
    }

    let config: GatewayConfig = match load_config(config_path).await {
        Ok(config) => {
            println!("Configuration parsing: OK");
            config
        }
        Err(e) => {
            eprintln!("Configuration parsing failed:");
            eprintln!("   {e}");
            std::process::exit(1);
        }
    };

    match GatewayConfigValidator::validate(&config) {
        Ok(()) => {
            println!("Configuration validation: OK");
            println!();
            println!("Configuration Summary:");
            println!("   Listen Address: {}", config.listen_addr);
            println!("   Routes: {}", config.routes.len());
            println!("   Registry configured: {}", config.registry.is_some());
            Ok(())
        }
        Err(e) => {
            eprintln!("Configuration validation failed:");
            eprintln!("{e}");
            println!();
            println!("Common fixes:");
            println!("   - Ensure downstream targets start with http:// or https://");
            println!("   - Verify listen address format (e.g., '127.0.0.1:8080')");
            println!("   - Check durations use valid units (ms, s, m)");
            std::process::exit(1);
        }
    }
}

/// Initialize a new configuration file
async fn init_config_command(config_path: &str) -> Result<()> {
    let path = Path::new(config_path);
    if path.exists() {
        eprintln!("Error: Configuration file '{config_path}' already exists");
        std::process::exit(1);
    }

    let default_config = r#"# Wicket gateway configuration

# The address to listen on
listen_addr = "127.0.0.1:8080"

# Example route: proxy /svc to the diagnostics backend and rewrite the
# outbound Host header. Exactly one "host" rule applies; zero or several
# leave the header untouched.
[[routes."/svc".downstream]]
target = "http://127.0.0.1:8081"
upstream_headers = [{ key = "Host", replace = "app.internal" }]

# Optional: registration against a Consul agent
# [registry]
# address = "http://consul01:8500"
# service_name = "gw"
# service_address = "10.0.0.5"
# service_port = 8080
"#;

    tokio::fs::write(path, default_config)
        .await
        .context("Failed to write config file")?;
    println!("Created default configuration at: {config_path}");
    println!("   Run 'wicket gateway --config {config_path}' to start the gateway");
    Ok(())
}
