use std::net::SocketAddr;
use std::sync::Arc;

use signalmesh_node::{MeshConfig, MeshSocket, SocketState, Tumbler};
use signalmesh_schema::SchemaRegistry;
use signalmesh_wire::Message;
use tokio::sync::mpsc;
use tracing::info;

use crate::cmd::ListenArgs;
use crate::exit::{
    config_error, io_error, mesh_error, schema_error, CliError, CliResult, SUCCESS,
    TRANSPORT_ERROR,
};
use crate::output::{print_message, OutputFormat};

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let config = match (&args.config, args.port) {
        (Some(path), _) => MeshConfig::load(path).map_err(|err| config_error("invalid config", err))?,
        (None, Some(port)) => MeshConfig::new(port),
        (None, None) => MeshConfig::new(0),
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| io_error("runtime setup failed", err))?;
    runtime.block_on(listen(config, args, format))
}

async fn listen(config: MeshConfig, args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let mut socket = MeshSocket::new(config).map_err(|err| mesh_error("invalid config", err))?;

    if let Some(allow) = &args.allow {
        socket = socket.with_tumbler(Arc::new(Tumbler::new("cli", allow.iter().copied())));
    }
    if let Some(dir) = &args.validate {
        let registry =
            SchemaRegistry::from_directory(dir).map_err(|err| schema_error("schema load failed", err))?;
        info!(dir = %dir.display(), schemas = registry.signals().len(), "schema validation enabled");
        socket = socket.with_schema_registry(Arc::new(registry));
    }

    let (tx, mut rx) = mpsc::unbounded_channel::<(Message, SocketAddr)>();
    socket
        .on_any(move |message, from| {
            let _ = tx.send((message.clone(), from));
            Ok(())
        })
        .map_err(|err| mesh_error("handler setup failed", err))?;

    let addr = socket
        .start()
        .await
        .map_err(|err| mesh_error("bind failed", err))?;
    info!(%addr, "listening; press Ctrl-C to stop");

    let mut states = socket.subscribe();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut printed = 0usize;

    let outcome = loop {
        tokio::select! {
            _ = &mut ctrl_c => break Ok(SUCCESS),
            received = rx.recv() => {
                let Some((message, from)) = received else {
                    break Ok(SUCCESS);
                };
                print_message(&message, from, socket.peers().name_of(from), format);
                printed = printed.saturating_add(1);
                if args.count.is_some_and(|count| printed >= count) {
                    break Ok(SUCCESS);
                }
            }
            changed = states.changed() => {
                if changed.is_err() || *states.borrow() == SocketState::Failed {
                    break Err(CliError::new(TRANSPORT_ERROR, "receive loop failed"));
                }
            }
        }
    };

    socket.shutdown().await;
    info!(printed, "listener stopped");
    outcome
}
