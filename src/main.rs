use clap::Parser;
use tracing::error;
use webhook_eval::cli;

fn main() {
    let args = cli::Args::parse();
    if let Err(err) = cli::dispatch(args) {
        // Config errors can happen before a subscriber exists.
        if tracing::dispatcher::has_been_set() {
            error!("{:#}", err);
        } else {
            eprintln!("error: {:#}", err);
        }
        std::process::exit(1);
    }
}
