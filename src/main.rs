use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use tapgen::cli::{exit_on_parse_error, finalize_compat_args, loader_options, LoaderArgs};

fn main() {
    let mut args = LoaderArgs::try_parse().unwrap_or_else(|err| exit_on_parse_error(err));
    tapgen::cli::init_tracing(args.verbose);
    if let Err(err) = finalize_compat_args(&mut args) {
        exit_on_parse_error(LoaderArgs::command().error(ErrorKind::ArgumentConflict, err));
    }
    if let Err(err) = loader_options(&args) {
        exit_on_parse_error(LoaderArgs::command().error(ErrorKind::ValueValidation, err));
    }
    if let Err(err) = tapgen::run_loader(args) {
        eprintln!("file2loader: {err:#}");
        std::process::exit(1);
    }
}
