//! JSON-RPC Server
//!
//! JSON-RPC 2.0 over TCP, bound to localhost by default.

use crate::handler::RpcHandler;
use jobsync_core::application::Scheduler;
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::RpcModule;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tracing::info;

const DEFAULT_RPC_HOST: &str = "127.0.0.1";
const DEFAULT_RPC_PORT: u16 = 9527;

/// RPC Server Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
        }
    }
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
}

impl RpcServer {
    pub fn new(config: RpcServerConfig, scheduler: Arc<Scheduler>) -> Self {
        Self {
            config,
            handler: Arc::new(RpcHandler::new(scheduler)),
        }
    }

    /// Bind and start serving; the returned handle stops the server
    pub async fn start(self) -> Result<ServerHandle, String> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        info!(
            host = %self.config.host,
            port = %self.config.port,
            "Starting JSON-RPC server"
        );

        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|e| format!("Failed to build server on {}: {}", addr, e))?;

        let module = self.module()?;

        info!("JSON-RPC server started successfully");

        Ok(server.start(module))
    }

    fn module(&self) -> Result<RpcModule<()>, String> {
        let mut module = RpcModule::new(());

        // Task triggers
        register(&mut module, &self.handler, "pipeline.scrape.v1", |h| async move {
            Ok(h.scrape().await)
        })?;
        register(&mut module, &self.handler, "pipeline.cleanup.v1", |h| async move {
            Ok(h.cleanup().await)
        })?;
        register(&mut module, &self.handler, "pipeline.status_update.v1", |h| async move {
            Ok(h.status_update().await)
        })?;
        register(&mut module, &self.handler, "pipeline.error_trim.v1", |h| async move {
            Ok(h.error_trim().await)
        })?;
        register(&mut module, &self.handler, "system.health.v1", |h| async move {
            Ok(h.health().await)
        })?;

        // Scheduler admin
        register(&mut module, &self.handler, "scheduler.status.v1", |h| async move {
            h.status().await
        })?;
        register(&mut module, &self.handler, "scheduler.statistics.v1", |h| async move {
            h.statistics().await
        })?;
        register(&mut module, &self.handler, "scheduler.restart.v1", |h| async move {
            h.restart().await
        })?;

        Ok(module)
    }
}

/// Register a parameterless method backed by the shared handler
fn register<F, Fut>(
    module: &mut RpcModule<()>,
    handler: &Arc<RpcHandler>,
    name: &'static str,
    call: F,
) -> Result<(), String>
where
    F: Fn(Arc<RpcHandler>) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<crate::types::Envelope, jsonrpsee::types::ErrorObjectOwned>>
        + Send
        + 'static,
{
    let handler = handler.clone();
    module.register_async_method(name, move |_params, _, _| {
        let handler = handler.clone();
        let call = call.clone();
        async move { call(handler).await }
    })
    .map_err(|e| e.to_string())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::tests::scheduler;
    use crate::types::Envelope;
    use jobsync_core::config::ScheduleConfig;
    use jobsync_core::port::network_probe::mocks::MockNetworkProbe;
    use jsonrpsee::rpc_params;

    fn server() -> RpcServer {
        RpcServer::new(
            RpcServerConfig::default(),
            scheduler(MockNetworkProbe::reachable(), ScheduleConfig::default()),
        )
    }

    #[test]
    fn test_registers_every_control_method() {
        let module = server().module().unwrap();
        let mut names: Vec<&str> = module.method_names().collect();
        names.sort_unstable();

        assert_eq!(
            names,
            vec![
                "pipeline.cleanup.v1",
                "pipeline.error_trim.v1",
                "pipeline.scrape.v1",
                "pipeline.status_update.v1",
                "scheduler.restart.v1",
                "scheduler.statistics.v1",
                "scheduler.status.v1",
                "system.health.v1",
            ]
        );
    }

    #[tokio::test]
    async fn test_cleanup_call_returns_envelope() {
        let module = server().module().unwrap();

        let envelope: Envelope = module
            .call("pipeline.cleanup.v1", rpc_params![])
            .await
            .unwrap();

        assert!(envelope.success);
        assert_eq!(
            envelope.message.as_deref(),
            Some("Expired 0 postings, deleted 0")
        );
    }

    #[test]
    fn test_default_config_binds_localhost() {
        let config = RpcServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9527);
    }
}
