//! `roundtripper` server binary.

// std
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
// crates.io
use clap::Parser;
use color_eyre::{Result, eyre::WrapErr};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
// self
use roundtripper::{
	config::{Config, DEFAULT_CONFIG_PATH},
	flows::Broker,
	http::TokenHttpClient,
	oauth::{OAuthFacade, StudioOAuth},
	store::{FileStore, TokenStore},
	studio::StudioTransport,
	web::{self, AppContext},
};

/// Round-trip documents through Studio review sessions.
#[derive(Debug, Parser)]
#[command(name = "roundtripper", version, about)]
struct Cli {
	/// Config file; when absent, CLIENT_ID, CLIENT_SECRET, and URL are read from the environment.
	#[arg(long, default_value = DEFAULT_CONFIG_PATH)]
	config: PathBuf,
	/// Listen address, overriding the config file.
	#[arg(long)]
	listen: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;
	dotenvy::dotenv().ok();
	tracing_subscriber::registry()
		.with(
			EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| "roundtripper=info,tower_http=info".into()),
		)
		.with(tracing_subscriber::fmt::layer())
		.init();

	let cli = Cli::parse();
	let mut config = Config::load(&cli.config).wrap_err("failed to load configuration")?;

	if let Some(listen) = cli.listen {
		config.listen = listen;
	}

	tracing::info!(?config, "loaded configuration");

	// No degraded mode without a token store.
	let store: Arc<dyn TokenStore> = Arc::new(
		FileStore::open(&config.store_path).wrap_err_with(|| {
			format!("failed to open token store {}", config.store_path.display())
		})?,
	);
	let oauth: Arc<dyn OAuthFacade> =
		Arc::new(StudioOAuth::from_config(&config, TokenHttpClient::new(config.request_timeout)?)?);
	let broker = Broker::new(oauth, store);
	let transport = StudioTransport::from_config(&config)?;
	let shutdown = CancellationToken::new();
	let app = web::router(AppContext::new(&config, broker, transport, shutdown.clone()));
	let listener = TcpListener::bind(config.listen)
		.await
		.wrap_err_with(|| format!("failed to bind {}", config.listen))?;

	tracing::info!(addr = %config.listen, "listening");

	axum::serve(listener, app).with_graceful_shutdown(shutdown_signal(shutdown)).await?;

	tracing::info!("server stopped");

	Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
	if let Err(e) = tokio::signal::ctrl_c().await {
		tracing::error!(error = %e, "failed to listen for the shutdown signal");
	}

	tracing::info!("shutting down");

	shutdown.cancel();
}
