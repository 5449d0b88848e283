use signalmesh_transport::LoopbackSocket;
use signalmesh_wire::{encode, signal_name};
use tracing::info;

use crate::cmd::SendArgs;
use crate::exit::{transport_error, wire_error, CliResult, SUCCESS};

pub fn run(args: SendArgs) -> CliResult<i32> {
    let payload = args.payload.resolve()?;
    let datagram = encode(args.signal, &payload).map_err(|err| wire_error("encode failed", err))?;

    let socket = LoopbackSocket::bind(0).map_err(|err| transport_error("bind failed", err))?;
    let written = socket
        .send_to(&datagram, args.port)
        .map_err(|err| transport_error("send failed", err))?;

    info!(
        signal = args.signal,
        signal_name = signal_name(args.signal),
        port = args.port,
        from = socket.port(),
        size = written,
        "datagram sent"
    );
    Ok(SUCCESS)
}
