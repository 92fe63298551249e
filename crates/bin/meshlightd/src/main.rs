//! # meshlightd — meshlight daemon
//!
//! Composition root that wires all adapters together and starts the server.
//!
//! ## Responsibilities
//! - Parse configuration (env vars, config file) and initialise logging
//! - Bootstrap the roster from a cloud session (demo roster or `[roster]`)
//! - Open the transport: the virtual mesh, or the broker connection
//! - Construct the mesh connector and the light service, and feed status
//!   messages into them
//! - Build the axum router, bind to a TCP port and serve
//! - Handle graceful shutdown (SIGTERM/SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;
mod roster;

use std::sync::Arc;

use meshlight_adapter_http_axum::state::AppState;
use meshlight_adapter_virtual::{VirtualMesh, VirtualSession};
use meshlight_app::connector::MeshConnector;
use meshlight_app::event_bus::InProcessEventBus;
use meshlight_app::ports::{MeshTransport, StatusFeed};
use meshlight_app::services::light_service::LightService;
use meshlight_app::setup::bootstrap_roster;
use meshlight_domain::device::Roster;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::roster::StaticRoster;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    init_tracing(&config.logging.filter);

    let event_bus = Arc::new(InProcessEventBus::new(256));

    if config.integrations.virtual_enabled {
        tracing::info!("virtual mesh enabled, serving the demo roster");
        let bootstrap = bootstrap_roster(&VirtualSession).await?;
        let (mesh, feed) = VirtualMesh::new(&bootstrap.roster);
        serve(&config, bootstrap.roster, Arc::new(mesh), feed, event_bus, true).await
    } else {
        let session = StaticRoster::new(config.roster.clone());
        let bootstrap = bootstrap_roster(&session).await?;
        let connection = meshlight_adapter_mqtt::connect(&config.mqtt, &bootstrap.channels);
        // The broker transport requests status itself once subscribed.
        let result = serve(
            &config,
            bootstrap.roster,
            Arc::new(connection.transport),
            connection.status,
            event_bus,
            false,
        )
        .await;
        connection.event_loop.abort();
        result
    }
}

fn init_tracing(filter: &str) {
    let env_filter = EnvFilter::try_new(filter).unwrap_or_else(|err| {
        eprintln!("invalid log filter {filter:?} ({err}), falling back to info");
        EnvFilter::new("info")
    });
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

async fn serve<T: MeshTransport>(
    config: &Config,
    roster: Roster,
    transport: Arc<T>,
    feed: StatusFeed,
    event_bus: Arc<InProcessEventBus>,
    request_status_on_start: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let connector = Arc::new(MeshConnector::new(
        roster,
        transport,
        config.queue_config(),
    ));
    let feed_task = tokio::spawn({
        let connector = Arc::clone(&connector);
        async move { connector.run_status_feed(feed).await }
    });

    let light_service = Arc::new(LightService::new(
        Arc::clone(&connector),
        Arc::clone(&event_bus),
        config.light_config(),
    ));
    let readings_task = light_service.attach();

    if request_status_on_start && let Err(err) = light_service.refresh().await {
        tracing::warn!(error = %err, "initial status request failed");
    }

    let app = meshlight_adapter_http_axum::router::build(AppState::new(light_service, event_bus));

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(%bind_addr, "meshlightd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    connector.shutdown().await;
    feed_task.abort();
    readings_task.abort();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received SIGINT, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
