//! perka-daemon: the Perka settlement daemon.
//!
//! Single OS process running a Tokio async runtime. External systems
//! (storefront backends, batch workers) talk to the settlement engine via
//! JSON-RPC over a Unix socket. No scheduler lives here: batch settlement
//! fires only on inbound request.

mod commands;
mod config;
mod rpc;

use std::sync::Arc;

use tracing::info;

use perka_gateway::{ContractCapabilities, MintGateway, StubContract};
use perka_settlement::SettlementService;

use crate::config::DaemonConfig;
use crate::rpc::RpcServer;

/// Daemon-wide shared state.
pub struct DaemonState {
    /// Database connection.
    pub db: tokio::sync::Mutex<rusqlite::Connection>,
    /// Configuration.
    pub config: DaemonConfig,
    /// Settlement service over the token contract gateway.
    pub service: SettlementService<StubContract>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("perka=info".parse()?),
        )
        .init();

    info!("Perka daemon starting");

    // 1. Load config
    let config = DaemonConfig::load()?;
    let data_dir = config.data_dir();
    std::fs::create_dir_all(&data_dir)?;

    // 2. Open database (schema version resolved here, once)
    let db_path = data_dir.join("perka.db");
    let conn = perka_db::open(&db_path)?;

    // 3. Build the gateway and settlement service.
    //    v1 runs against the stub contract; the capability flags come
    //    from config so deployments can mirror their real contract.
    let contract = StubContract::with_capabilities(ContractCapabilities {
        supports_burn: config.contract.supports_burn,
        supports_pause: config.contract.supports_pause,
    });
    let service = SettlementService::new(MintGateway::new(contract));

    // 4. Build daemon state
    let state = Arc::new(DaemonState {
        db: tokio::sync::Mutex::new(conn),
        config,
        service,
    });

    // 5. Serve JSON-RPC until shutdown
    let socket_path = data_dir.join("daemon.sock");
    let rpc_server = RpcServer::new(state, socket_path.clone());

    info!("Starting JSON-RPC server on {:?}", socket_path);

    tokio::select! {
        result = rpc_server.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
            let _ = std::fs::remove_file(&socket_path);
            Ok(())
        }
    }
}
