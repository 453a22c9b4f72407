//! Entry point for the osm-layers command-line interface.
#![forbid(unsafe_code)]

use osmlayers_cli::CliError;

fn main() {
    match osmlayers_cli::run() {
        Ok(()) => {}
        Err(CliError::ArgumentParsing(err)) => err.exit(),
        Err(err) => {
            eprintln!("osm-layers: {err}");
            std::process::exit(1);
        }
    }
}
