mod bindings;
mod cli;
mod run;

use anyhow::Result;
use cli::Command;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Command::Window(args) => run::run_window(args),
        Command::Still(args) => run::run_still(args),
        Command::Preset(args) => run::print_preset(args),
    }
}
