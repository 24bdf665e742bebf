use crate::format::TapError;

pub const HEADER_BLOCK_LEN: usize = 21;
pub const BLOCK_NAME_LEN: usize = 10;

pub mod header_offset {
    pub const LENGTH: usize = 0;
    pub const FLAG: usize = 2;
    pub const KIND: usize = 3;
    pub const NAME: usize = 4;
    pub const DATA_LENGTH: usize = 14;
    pub const PARAM1: usize = 16;
    pub const PARAM2: usize = 18;
    pub const CHECKSUM: usize = 20;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockFlag {
    Header,
    Data,
}

impl BlockFlag {
    #[must_use]
    pub fn to_u8(self) -> u8 {
        match self {
            Self::Header => 0x00,
            Self::Data => 0xff,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderKind {
    Program,
    NumberArray,
    CharacterArray,
    Code,
}

impl HeaderKind {
    #[must_use]
    pub fn to_u8(self) -> u8 {
        match self {
            Self::Program => 0,
            Self::NumberArray => 1,
            Self::CharacterArray => 2,
            Self::Code => 3,
        }
    }

    #[must_use]
    pub fn from_u8(kind: u8) -> Option<Self> {
        match kind {
            0 => Some(Self::Program),
            1 => Some(Self::NumberArray),
            2 => Some(Self::CharacterArray),
            3 => Some(Self::Code),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockName([u8; BLOCK_NAME_LEN]);

impl BlockName {
    /// Left-justifies `name`, silently dropping everything past the tenth character.
    /// Characters outside printable ASCII become `?`.
    #[must_use]
    pub fn new(name: &str) -> Self {
        let mut bytes = [b' '; BLOCK_NAME_LEN];
        for (slot, ch) in bytes.iter_mut().zip(name.chars()) {
            *slot = if ch.is_ascii_graphic() || ch == ' ' {
                ch as u8
            } else {
                b'?'
            };
        }
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; BLOCK_NAME_LEN] {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Checksum(u8);

impl Checksum {
    #[must_use]
    pub fn new() -> Self {
        Self(0)
    }

    #[must_use]
    pub fn starting_with(flag: BlockFlag) -> Self {
        Self(flag.to_u8())
    }

    pub fn push(&mut self, byte: u8) {
        self.0 ^= byte;
    }

    pub fn update(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.push(b);
        }
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }
}

pub fn block_length(content_len: usize) -> Result<u16, TapError> {
    content_len
        .checked_add(2)
        .and_then(|v| u16::try_from(v).ok())
        .ok_or(TapError::PayloadTooLarge(content_len))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderBlock {
    pub kind: HeaderKind,
    pub name: BlockName,
    pub data_length: u16,
    pub param1: u16,
    pub param2: u16,
}

impl HeaderBlock {
    #[must_use]
    pub fn program(name: BlockName, data_length: u16, autostart_line: u16, program_length: u16) -> Self {
        Self {
            kind: HeaderKind::Program,
            name,
            data_length,
            param1: autostart_line,
            param2: program_length,
        }
    }

    #[must_use]
    pub fn code(name: BlockName, data_length: u16, load_address: u16) -> Self {
        Self {
            kind: HeaderKind::Code,
            name,
            data_length,
            param1: load_address,
            param2: 0,
        }
    }

    #[must_use]
    pub fn encode(&self) -> [u8; HEADER_BLOCK_LEN] {
        use header_offset as at;

        let mut h = [0u8; HEADER_BLOCK_LEN];
        put_u16_le(&mut h, at::LENGTH, (HEADER_BLOCK_LEN - 2) as u16);
        h[at::FLAG] = BlockFlag::Header.to_u8();
        h[at::KIND] = self.kind.to_u8();
        h[at::NAME..at::NAME + BLOCK_NAME_LEN].copy_from_slice(self.name.as_bytes());
        put_u16_le(&mut h, at::DATA_LENGTH, self.data_length);
        put_u16_le(&mut h, at::PARAM1, self.param1);
        put_u16_le(&mut h, at::PARAM2, self.param2);

        let mut checksum = Checksum::new();
        checksum.update(&h[at::FLAG..at::CHECKSUM]);
        h[at::CHECKSUM] = checksum.value();
        h
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, TapError> {
        use header_offset as at;

        if bytes.len() < HEADER_BLOCK_LEN {
            return Err(TapError::MalformedHeader("truncated"));
        }
        if usize::from(get_u16_le(bytes, at::LENGTH)) != HEADER_BLOCK_LEN - 2 {
            return Err(TapError::MalformedHeader("bad length prefix"));
        }
        if bytes[at::FLAG] != BlockFlag::Header.to_u8() {
            return Err(TapError::MalformedHeader("not a header flag"));
        }
        let mut checksum = Checksum::new();
        checksum.update(&bytes[at::FLAG..at::CHECKSUM]);
        if checksum.value() != bytes[at::CHECKSUM] {
            return Err(TapError::MalformedHeader("checksum mismatch"));
        }
        let kind = HeaderKind::from_u8(bytes[at::KIND])
            .ok_or(TapError::MalformedHeader("unknown header kind"))?;
        let mut name = [0u8; BLOCK_NAME_LEN];
        name.copy_from_slice(&bytes[at::NAME..at::NAME + BLOCK_NAME_LEN]);

        Ok(Self {
            kind,
            name: BlockName(name),
            data_length: get_u16_le(bytes, at::DATA_LENGTH),
            param1: get_u16_le(bytes, at::PARAM1),
            param2: get_u16_le(bytes, at::PARAM2),
        })
    }
}

pub(crate) fn put_u16_le(buf: &mut [u8], at: usize, v: u16) {
    buf[at..at + 2].copy_from_slice(&v.to_le_bytes());
}

pub(crate) fn get_u16_le(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}
