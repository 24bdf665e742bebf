use clap::error::ErrorKind;
use clap::{ArgAction, Parser};
use tracing::Level;

use crate::bootstrap::{TargetVariable, DEFAULT_BLOCK_NAME};
use crate::format::tap::BlockName;
use crate::format::{address_from_i64, TapError};
use crate::relocate::{BankPage, RelocationRequest, SpecialMode};
use crate::writer::LoaderOptions;

fn parse_i64_with_hex(input: &str) -> Result<i64, String> {
    let s = input.trim();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let value = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).map_err(|e| format!("invalid hex value '{input}': {e}"))?
    } else {
        digits
            .parse::<i64>()
            .map_err(|e| format!("invalid decimal value '{input}': {e}"))?
    };
    Ok(if negative { -value } else { value })
}

#[derive(Debug, Parser)]
#[command(
    name = "file2loader",
    version,
    disable_version_flag = true,
    about = "Wraps machine code in a BASIC loader inside a TAP file"
)]
pub struct LoaderArgs {
    #[arg(value_name = "INPUT")]
    pub input: String,

    #[arg(value_name = "OUTPUT")]
    pub output: String,

    /// Legacy positional form: [block-name] [relocation-address] [stack-pointer]
    #[arg(value_name = "LEGACY")]
    pub legacy: Vec<String>,

    #[arg(short = 'n', value_name = "NAME")]
    pub block_name: Option<String>,

    #[arg(short = 'x', value_name = "ADDRESS", value_parser = parse_i64_with_hex, allow_hyphen_values = true)]
    pub relocation_address: Option<i64>,

    #[arg(short = 't', value_name = "ADDRESS", value_parser = parse_i64_with_hex, allow_hyphen_values = true)]
    pub execution_address: Option<i64>,

    #[arg(short = 's', value_name = "ADDRESS", value_parser = parse_i64_with_hex, allow_hyphen_values = true)]
    pub stack_pointer: Option<i64>,

    #[arg(short = 'p', value_name = "PAGE", value_parser = parse_i64_with_hex, allow_hyphen_values = true)]
    pub bank_page: Option<i64>,

    #[arg(short = 'a', value_name = "MODE", value_parser = parse_i64_with_hex, allow_hyphen_values = true)]
    pub special_mode: Option<i64>,

    #[arg(short = 'V', value_name = "LETTER")]
    pub variable: Option<char>,

    #[arg(long = "verbose")]
    pub verbose: bool,

    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    pub version: Option<bool>,
}

#[derive(Debug, Parser)]
#[command(
    name = "file2tap",
    version,
    disable_version_flag = true,
    about = "Wraps a raw file in a CODE block inside a TAP file"
)]
pub struct TapArgs {
    #[arg(value_name = "INPUT")]
    pub input: String,

    #[arg(value_name = "OUTPUT")]
    pub output: String,

    #[arg(value_name = "ADDRESS", value_parser = parse_i64_with_hex, allow_hyphen_values = true)]
    pub address: Option<i64>,

    #[arg(value_name = "NAME")]
    pub block_name: Option<String>,

    #[arg(long = "verbose")]
    pub verbose: bool,

    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    pub version: Option<bool>,
}

pub fn finalize_compat_args(args: &mut LoaderArgs) -> Result<(), String> {
    if args.legacy.len() > 3 {
        return Err(format!("unexpected argument '{}'", args.legacy[3]));
    }
    let legacy = std::mem::take(&mut args.legacy);
    let mut legacy = legacy.into_iter();

    if let Some(name) = legacy.next() {
        if args.block_name.is_some() {
            return Err("block name given both as -n and positionally".to_string());
        }
        args.block_name = Some(name);
    }
    if let Some(address) = legacy.next() {
        if args.relocation_address.is_some() {
            return Err("relocation address given both as -x and positionally".to_string());
        }
        args.relocation_address = Some(parse_i64_with_hex(&address)?);
    }
    if let Some(sp) = legacy.next() {
        if args.stack_pointer.is_some() {
            return Err("stack pointer given both as -s and positionally".to_string());
        }
        args.stack_pointer = Some(parse_i64_with_hex(&sp)?);
    }
    Ok(())
}

pub fn loader_options(args: &LoaderArgs) -> Result<LoaderOptions, TapError> {
    let block_name = BlockName::new(args.block_name.as_deref().unwrap_or(DEFAULT_BLOCK_NAME));
    let variable = args
        .variable
        .map(TargetVariable::new)
        .transpose()?
        .unwrap_or_default();
    let relocation = RelocationRequest {
        relocation_address: args.relocation_address.map(address_from_i64).transpose()?,
        execution_address: args.execution_address.map(address_from_i64).transpose()?,
        stack_pointer: args.stack_pointer.map(address_from_i64).transpose()?,
        bank_page: args.bank_page.map(BankPage::new).transpose()?,
        special_mode: args.special_mode.map(SpecialMode::new).transpose()?,
    };
    Ok(LoaderOptions {
        block_name,
        variable,
        relocation,
    })
}

pub fn exit_on_parse_error(err: clap::Error) -> ! {
    let code = if err.kind() == ErrorKind::DisplayVersion {
        0
    } else {
        1
    };
    let _ = err.print();
    std::process::exit(code);
}

pub fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let _ = tracing_subscriber::fmt()
        .without_time()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::{finalize_compat_args, loader_options, parse_i64_with_hex, LoaderArgs, TapArgs};
    use crate::format::TapError;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    fn parse(argv: &[&str]) -> LoaderArgs {
        let mut args = LoaderArgs::try_parse_from(argv).expect("parse");
        finalize_compat_args(&mut args).expect("compat");
        args
    }

    #[test]
    fn parses_decimal_hex_and_negative_numbers() {
        assert_eq!(parse_i64_with_hex("32768"), Ok(32768));
        assert_eq!(parse_i64_with_hex("0x8000"), Ok(0x8000));
        assert_eq!(parse_i64_with_hex("0XFF"), Ok(255));
        assert_eq!(parse_i64_with_hex("-1"), Ok(-1));
        assert!(parse_i64_with_hex("12ab").is_err());
    }

    #[test]
    fn maps_legacy_positional_form() {
        let args = parse(&["file2loader", "joy", "joy.tap", "JOY", "32768", "0xff00"]);
        assert_eq!(args.block_name.as_deref(), Some("JOY"));
        assert_eq!(args.relocation_address, Some(32768));
        assert_eq!(args.stack_pointer, Some(0xff00));
        assert!(args.legacy.is_empty());
    }

    #[test]
    fn parses_flag_form() {
        let args = parse(&[
            "file2loader", "in.bin", "out.tap", "-n", "GAME", "-x", "0xc000", "-t", "49200", "-p",
            "3", "-a", "1", "-V", "b",
        ]);
        let options = loader_options(&args).expect("options");
        assert_eq!(options.block_name.as_bytes(), b"GAME      ");
        assert_eq!(options.variable.letter(), 'B');
        assert_eq!(options.relocation.relocation_address, Some(0xc000));
        assert_eq!(options.relocation.execution_address, Some(49200));
        assert_eq!(options.relocation.bank_page.map(|p| p.value()), Some(3));
        assert_eq!(options.relocation.special_mode.map(|m| m.value()), Some(1));
    }

    #[test]
    fn defaults_block_name_to_loader() {
        let args = parse(&["file2loader", "in.bin", "out.tap"]);
        let options = loader_options(&args).expect("options");
        assert_eq!(options.block_name.as_bytes(), b"LOADER    ");
        assert_eq!(options.variable.letter(), 'A');
        assert_eq!(options.relocation.relocation_address, None);
    }

    #[test]
    fn rejects_out_of_range_options() {
        let args = parse(&["file2loader", "in", "out", "-x", "32768", "-p", "-1"]);
        assert!(matches!(loader_options(&args), Err(TapError::InvalidBankPage(-1))));

        let args = parse(&["file2loader", "in", "out", "-x", "32768", "-a", "4"]);
        assert!(matches!(loader_options(&args), Err(TapError::InvalidSpecialMode(4))));

        let args = parse(&["file2loader", "in", "out", "-V", "1"]);
        assert!(matches!(loader_options(&args), Err(TapError::InvalidVariable('1'))));

        let args = parse(&["file2loader", "in", "out", "-x", "65536"]);
        assert!(matches!(loader_options(&args), Err(TapError::AddressOutOfRange(65536))));
    }

    #[test]
    fn rejects_value_given_twice() {
        let mut args =
            LoaderArgs::try_parse_from(["file2loader", "in", "out", "NAME", "-n", "OTHER"])
                .expect("parse");
        assert!(finalize_compat_args(&mut args).is_err());
    }

    #[test]
    fn rejects_extra_positionals() {
        let mut args = LoaderArgs::try_parse_from(["file2loader", "i", "o", "N", "1", "2", "3"])
            .expect("parse");
        assert!(finalize_compat_args(&mut args).is_err());
    }

    #[test]
    fn parses_tap_arguments() {
        let args = TapArgs::try_parse_from(["file2tap", "pic.scr", "pic.tap"]).expect("parse");
        assert_eq!(args.address, None);
        assert_eq!(args.block_name, None);

        let args = TapArgs::try_parse_from(["file2tap", "a.bin", "a.tap", "0x8000", "CODE"])
            .expect("parse");
        assert_eq!(args.address, Some(0x8000));
        assert_eq!(args.block_name.as_deref(), Some("CODE"));
    }
}
