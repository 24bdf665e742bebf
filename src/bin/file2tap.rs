use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use tapgen::cli::{exit_on_parse_error, TapArgs};
use tapgen::format::address_from_i64;

fn main() {
    let args = TapArgs::try_parse().unwrap_or_else(|err| exit_on_parse_error(err));
    tapgen::cli::init_tracing(args.verbose);
    if let Some(Err(err)) = args.address.map(address_from_i64) {
        exit_on_parse_error(TapArgs::command().error(ErrorKind::ValueValidation, err));
    }
    if let Err(err) = tapgen::run_tap(args) {
        eprintln!("file2tap: {err:#}");
        std::process::exit(1);
    }
}
