mod commands;
mod terminal;

use commands::{CommandLine, Commands, lookup, run, scan};

fn main() -> anyhow::Result<()> {
    let commands = CommandLine::parse_args();

    terminal::logging::init();

    match commands.command {
        Commands::Scan(args) => scan::scan(args),
        Commands::Lookup(args) => lookup::lookup(args),
        Commands::Run(args) => run::run(args),
    }
}
