use signalmesh_wire::known_signals;

use crate::cmd::SignalsArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_signals, OutputFormat};

pub fn run(_args: SignalsArgs, format: OutputFormat) -> CliResult<i32> {
    print_signals(known_signals(), format);
    Ok(SUCCESS)
}
