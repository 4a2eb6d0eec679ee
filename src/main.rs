use anyhow::Result;
use clap::Parser;
use pathlen::{CLIArguments, flatten_main, measure_main};

fn main() -> Result<()> {
    env_logger::init();

    let args = CLIArguments::parse();

    match args {
        CLIArguments::Measure(args) => measure_main(args),
        CLIArguments::Flatten(args) => flatten_main(args),
    }
}
