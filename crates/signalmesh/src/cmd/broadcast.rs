use signalmesh_node::{MeshConfig, MeshSocket};

use crate::cmd::BroadcastArgs;
use crate::exit::{config_error, io_error, mesh_error, CliResult, SUCCESS, TRANSPORT_ERROR};
use crate::output::{print_broadcast, OutputFormat};

pub fn run(args: BroadcastArgs, format: OutputFormat) -> CliResult<i32> {
    let mut config =
        MeshConfig::load(&args.config).map_err(|err| config_error("invalid config", err))?;
    let payload = args.payload.resolve()?;

    // Send from an ephemeral port so a node already running on the
    // configured port is left alone.
    config.port = 0;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .build()
        .map_err(|err| io_error("runtime setup failed", err))?;

    let report = runtime.block_on(async {
        let mut socket = MeshSocket::new(config).map_err(|err| mesh_error("invalid config", err))?;
        socket
            .start()
            .await
            .map_err(|err| mesh_error("bind failed", err))?;
        let report = socket.broadcast(args.signal, &payload);
        socket.shutdown().await;
        CliResult::Ok(report)
    })?;

    print_broadcast(args.signal, &report, format);

    if report.is_complete() {
        Ok(SUCCESS)
    } else {
        Ok(TRANSPORT_ERROR)
    }
}
