use crate::format::tap::{block_length, BlockFlag, BlockName, HeaderBlock};
use crate::format::TapError;

pub const AUTOSTART_LINE: u16 = 10;
pub const DEFAULT_BLOCK_NAME: &str = "LOADER";

/// `10 RANDOMIZE USR (PEEK VAL "23627"+PEEK VAL "23628"*VAL "256"+VAL "3")`
/// 23627/23628 is VARS; the `+3` skips the string variable's tag and length, so
/// `USR` enters the first attached byte.
const PROGRAM_LINE: [u8; 40] = [
    0x00, 0x0a, // line 10, big-endian
    0x24, 0x00, // line length
    0xf9, 0xc0, b'(', // RANDOMIZE USR (
    0xbe, 0xb0, b'"', b'2', b'3', b'6', b'2', b'7', b'"', b'+', // PEEK VAL "23627"+
    0xbe, 0xb0, b'"', b'2', b'3', b'6', b'2', b'8', b'"', b'*', // PEEK VAL "23628"*
    0xb0, b'"', b'2', b'5', b'6', b'"', b'+', // VAL "256"+
    0xb0, b'"', b'3', b'"', b')', 0x0d, // VAL "3")
];

pub const VARIABLE_PREFIX_LEN: usize = 3;

pub const PROGRAM_LENGTH: u16 = PROGRAM_LINE.len() as u16;

pub const BODY_TEMPLATE_LEN: usize = PROGRAM_LINE.len() + VARIABLE_PREFIX_LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetVariable(u8);

impl Default for TargetVariable {
    fn default() -> Self {
        Self(b'A')
    }
}

impl TargetVariable {
    pub fn new(name: char) -> Result<Self, TapError> {
        if name.is_ascii_alphabetic() {
            Ok(Self(name.to_ascii_uppercase() as u8))
        } else {
            Err(TapError::InvalidVariable(name))
        }
    }

    #[must_use]
    pub fn tag(self) -> u8 {
        0x40 | (self.0 & 0x1f)
    }

    #[must_use]
    pub fn letter(self) -> char {
        char::from(self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyBlock {
    pub variable: TargetVariable,
    pub code_length: u16,
}

impl BodyBlock {
    #[must_use]
    pub fn content_length(&self) -> usize {
        BODY_TEMPLATE_LEN + usize::from(self.code_length)
    }

    pub fn encode(&self) -> Result<Vec<u8>, TapError> {
        let length = block_length(self.content_length())?;
        let mut body = Vec::with_capacity(3 + BODY_TEMPLATE_LEN);
        body.extend_from_slice(&length.to_le_bytes());
        body.push(BlockFlag::Data.to_u8());
        body.extend_from_slice(&PROGRAM_LINE);
        body.push(self.variable.tag());
        body.extend_from_slice(&self.code_length.to_le_bytes());
        Ok(body)
    }
}

pub fn build_bootstrap(
    name: BlockName,
    variable: TargetVariable,
    code_length: usize,
) -> Result<(HeaderBlock, BodyBlock), TapError> {
    let too_large = || TapError::PayloadTooLarge(code_length);
    let code_length = u16::try_from(code_length).map_err(|_| too_large())?;
    let body = BodyBlock {
        variable,
        code_length,
    };
    let content_length = body.content_length();
    block_length(content_length).map_err(|_| too_large())?;
    let data_length = u16::try_from(content_length).map_err(|_| too_large())?;
    let header = HeaderBlock::program(name, data_length, AUTOSTART_LINE, PROGRAM_LENGTH);
    Ok((header, body))
}
