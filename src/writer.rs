use std::io::{ErrorKind, Read, Write};

use crate::bootstrap::{build_bootstrap, BodyBlock, TargetVariable, DEFAULT_BLOCK_NAME};
use crate::format::tap::{block_length, BlockFlag, BlockName, Checksum, HeaderBlock};
use crate::format::TapError;
use crate::relocate::{build_fragments, Advisory, Fragment, FragmentPlan, RelocationRequest};

const COPY_CHUNK: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderOptions {
    pub block_name: BlockName,
    pub variable: TargetVariable,
    pub relocation: RelocationRequest,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            block_name: BlockName::new(DEFAULT_BLOCK_NAME),
            variable: TargetVariable::default(),
            relocation: RelocationRequest::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderPlan {
    pub header: HeaderBlock,
    pub body: BodyBlock,
    pub fragments: FragmentPlan,
    pub payload_len: usize,
}

impl LoaderPlan {
    #[must_use]
    pub fn output_len(&self) -> usize {
        crate::format::tap::HEADER_BLOCK_LEN + 2 + 1 + self.body.content_length() + 1
    }
}

pub fn plan_loader(options: &LoaderOptions, payload_len: usize) -> Result<LoaderPlan, TapError> {
    let count = u16::try_from(payload_len).map_err(|_| TapError::PayloadTooLarge(payload_len))?;
    // LDIR with BC = 0 copies 64K
    if count == 0 && options.relocation.relocation_address.is_some() {
        return Err(TapError::EmptyRelocation);
    }
    let fragments = build_fragments(&options.relocation, count);
    let code_length = fragments.total_len() + payload_len;
    let (header, body) = build_bootstrap(options.block_name, options.variable, code_length)?;
    Ok(LoaderPlan {
        header,
        body,
        fragments,
        payload_len,
    })
}

/// Writes header, body, fragments, payload and the closing checksum, in that order.
/// Only two checksums are written: the header's, and one spanning body, fragments and payload.
pub fn emit<R: Read, W: Write>(
    sink: &mut W,
    header: &HeaderBlock,
    body: &BodyBlock,
    fragments: &[Fragment],
    payload: &mut R,
    payload_len: usize,
) -> Result<(), TapError> {
    let attached = fragments.iter().map(Fragment::len).sum::<usize>() + payload_len;
    if usize::from(body.code_length) != attached {
        return Err(TapError::LengthMismatch {
            declared: usize::from(body.code_length),
            actual: attached,
        });
    }

    sink.write_all(&header.encode())?;

    let body_bytes = body.encode()?;
    let mut checksum = Checksum::new();
    checksum.update(&body_bytes[2..]);
    sink.write_all(&body_bytes)?;

    for fragment in fragments {
        let code = fragment.encode();
        checksum.update(&code);
        sink.write_all(&code)?;
    }

    let checksum = copy_payload(payload, payload_len, sink, checksum)?;
    sink.write_all(&[checksum.value()])?;
    Ok(())
}

pub fn copy_payload<R: Read, W: Write>(
    source: &mut R,
    length: usize,
    sink: &mut W,
    mut checksum: Checksum,
) -> Result<Checksum, TapError> {
    let mut buf = [0u8; COPY_CHUNK];
    let mut copied = 0usize;
    while copied < length {
        let want = (length - copied).min(COPY_CHUNK);
        let got = match source.read(&mut buf[..want]) {
            Ok(0) => {
                return Err(TapError::ShortPayload {
                    expected: length,
                    actual: copied,
                })
            }
            Ok(n) => n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        };
        checksum.update(&buf[..got]);
        sink.write_all(&buf[..got])?;
        copied += got;
    }
    Ok(checksum)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedLoader {
    pub bytes: Vec<u8>,
    pub advisories: Vec<Advisory>,
}

pub fn encode_loader(options: &LoaderOptions, payload: &[u8]) -> Result<EncodedLoader, TapError> {
    let plan = plan_loader(options, payload.len())?;
    let mut bytes = Vec::with_capacity(plan.output_len());
    let mut source = payload;
    emit(
        &mut bytes,
        &plan.header,
        &plan.body,
        &plan.fragments.fragments,
        &mut source,
        plan.payload_len,
    )?;
    Ok(EncodedLoader {
        bytes,
        advisories: plan.fragments.advisories,
    })
}

pub fn emit_code<R: Read, W: Write>(
    sink: &mut W,
    name: BlockName,
    load_address: u16,
    payload: &mut R,
    payload_len: usize,
) -> Result<(), TapError> {
    let length = block_length(payload_len)?;
    let data_length =
        u16::try_from(payload_len).map_err(|_| TapError::PayloadTooLarge(payload_len))?;
    sink.write_all(&HeaderBlock::code(name, data_length, load_address).encode())?;

    sink.write_all(&length.to_le_bytes())?;
    sink.write_all(&[BlockFlag::Data.to_u8()])?;
    let checksum = copy_payload(
        payload,
        payload_len,
        sink,
        Checksum::starting_with(BlockFlag::Data),
    )?;
    sink.write_all(&[checksum.value()])?;
    Ok(())
}
