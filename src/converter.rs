use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::{debug, warn};

use crate::cli::{loader_options, LoaderArgs, TapArgs};
use crate::format::address_from_i64;
use crate::format::tap::BlockName;
use crate::writer::{emit, emit_code, plan_loader};

#[must_use]
pub fn default_load_address(path: &Path) -> Option<u16> {
    let ext = path.extension()?.to_str()?;
    if ext.eq_ignore_ascii_case("scr") {
        Some(0x4000)
    } else if ext.eq_ignore_ascii_case("rom") {
        Some(0)
    } else {
        None
    }
}

fn open_input(path: &str) -> Result<(File, usize)> {
    let file = File::open(path).with_context(|| format!("could not open {path}"))?;
    let len = file
        .metadata()
        .with_context(|| format!("could not stat {path}"))?
        .len();
    let len = usize::try_from(len).with_context(|| format!("{path} is too large"))?;
    Ok((file, len))
}

pub fn run_loader(args: LoaderArgs) -> Result<()> {
    let options = loader_options(&args)?;
    let (input, payload_len) = open_input(&args.input)?;
    let plan = plan_loader(&options, payload_len)
        .with_context(|| format!("cannot encode {}", args.input))?;

    for advisory in &plan.fragments.advisories {
        warn!("{advisory}");
    }
    debug!(
        payload = payload_len,
        attached = plan.body.code_length,
        block = plan.header.data_length,
        "planned loader"
    );
    for fragment in &plan.fragments.fragments {
        debug!(fragment = fragment.name(), len = fragment.len(), "relocation fragment");
    }

    let mut tap = Vec::with_capacity(plan.output_len());
    emit(
        &mut tap,
        &plan.header,
        &plan.body,
        &plan.fragments.fragments,
        &mut BufReader::new(input),
        plan.payload_len,
    )
    .with_context(|| format!("failed to read {}", args.input))?;

    std::fs::write(&args.output, &tap).with_context(|| format!("failed to write {}", args.output))?;
    debug!(output = %args.output, bytes = tap.len(), "wrote loader");
    Ok(())
}

pub fn run_tap(args: TapArgs) -> Result<()> {
    let input_path = Path::new(&args.input);
    let address = match args.address {
        Some(address) => address_from_i64(address)?,
        None => match default_load_address(input_path) {
            Some(address) => address,
            None => bail!("need a starting memory address for {}", args.input),
        },
    };
    let name = match &args.block_name {
        Some(name) => BlockName::new(name),
        None => BlockName::new(
            input_path
                .file_name()
                .and_then(|s| s.to_str())
                .unwrap_or(&args.input),
        ),
    };

    let (input, payload_len) = open_input(&args.input)?;
    debug!(payload = payload_len, address, "planned code block");

    let mut tap = Vec::new();
    emit_code(&mut tap, name, address, &mut BufReader::new(input), payload_len)
        .with_context(|| format!("cannot encode {}", args.input))?;

    std::fs::write(&args.output, &tap).with_context(|| format!("failed to write {}", args.output))?;
    debug!(output = %args.output, bytes = tap.len(), "wrote code block");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{default_load_address, run_loader, run_tap};
    use crate::cli::{LoaderArgs, TapArgs};
    use clap::Parser;
    use std::fs;
    use std::path::Path;

    #[test]
    fn sniffs_load_address_from_extension() {
        assert_eq!(default_load_address(Path::new("pic.scr")), Some(0x4000));
        assert_eq!(default_load_address(Path::new("PIC.SCR")), Some(0x4000));
        assert_eq!(default_load_address(Path::new("dir/48.rom")), Some(0));
        assert_eq!(default_load_address(Path::new("code.bin")), None);
        assert_eq!(default_load_address(Path::new("noext")), None);
    }

    #[test]
    fn loader_does_not_create_output_on_invalid_option() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("joy");
        let output = dir.path().join("joy.tap");
        fs::write(&input, [1, 2, 3, 4]).expect("write input");

        let args = LoaderArgs::try_parse_from([
            "file2loader",
            input.to_str().expect("utf8"),
            output.to_str().expect("utf8"),
            "-x",
            "32768",
            "-p",
            "8",
        ])
        .expect("parse");
        let err = run_loader(args).expect_err("must fail");
        assert!(err.to_string().contains("bank page 8"));
        assert!(!output.exists());
    }

    #[test]
    fn loader_reports_missing_input_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("missing.bin");
        let output = dir.path().join("out.tap");
        let args = LoaderArgs::try_parse_from([
            "file2loader",
            input.to_str().expect("utf8"),
            output.to_str().expect("utf8"),
        ])
        .expect("parse");
        let err = run_loader(args).expect_err("must fail");
        assert!(err.to_string().contains("missing.bin"));
        assert!(!output.exists());
    }

    #[test]
    fn tap_requires_address_for_unknown_extension() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("blob.bin");
        let output = dir.path().join("blob.tap");
        fs::write(&input, [0u8; 16]).expect("write input");
        let args = TapArgs::try_parse_from([
            "file2tap",
            input.to_str().expect("utf8"),
            output.to_str().expect("utf8"),
        ])
        .expect("parse");
        let err = run_tap(args).expect_err("must fail");
        assert!(err.to_string().contains("need a starting memory address"));
        assert!(!output.exists());
    }

    #[test]
    fn tap_names_block_after_input_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("title.scr");
        let output = dir.path().join("title.tap");
        fs::write(&input, vec![0x55u8; 6912]).expect("write input");
        let args = TapArgs::try_parse_from([
            "file2tap",
            input.to_str().expect("utf8"),
            output.to_str().expect("utf8"),
        ])
        .expect("parse");
        run_tap(args).expect("convert");

        let tap = fs::read(&output).expect("read output");
        assert_eq!(&tap[4..14], b"title.scr ");
        assert_eq!(&tap[16..18], &[0x00, 0x40]);
        assert_eq!(tap.len(), 21 + 2 + 1 + 6912 + 1);
    }
}
