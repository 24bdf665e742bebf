use std::fmt;

use crate::format::tap::put_u16_le;
use crate::format::TapError;

use opcode::{
    hi, lo, OPED_LDIR, OPED_OUT_C_A, OP_ADD_HL_DE, OP_AND_N, OP_DI, OP_EI, OP_JP_NN, OP_LD_A_MNN,
    OP_LD_BC_NN, OP_LD_B_D, OP_LD_C_E, OP_LD_DE_NN, OP_LD_D_B, OP_LD_E_C, OP_LD_H_B, OP_LD_L_C,
    OP_LD_MNN_A, OP_LD_SP_NN, OP_NOP, OP_OR_N, OP_PREFIX_ED, PORT_128_PAGING, PORT_PLUS3_PAGING,
    SYSVAR_BANK678, SYSVAR_BANKM,
};

pub mod opcode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankPage(u8);

impl BankPage {
    pub fn new(page: i64) -> Result<Self, TapError> {
        match u8::try_from(page) {
            Ok(p @ 0..=7) => Ok(Self(p)),
            _ => Err(TapError::InvalidBankPage(page)),
        }
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialMode(u8);

impl SpecialMode {
    pub fn new(mode: i64) -> Result<Self, TapError> {
        match u8::try_from(mode) {
            Ok(m @ 0..=3) => Ok(Self(m)),
            _ => Err(TapError::InvalidSpecialMode(mode)),
        }
    }

    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    /// Port value: configuration in bits 1-2, special paging enable in bit 0.
    #[must_use]
    pub fn flag(self) -> u8 {
        (self.0 << 1) | 1
    }

    /// Modes 0 and 3 map a different bank over 0x4000-0x7fff, where BASIC keeps its workspace.
    #[must_use]
    pub fn displaces_workspace(self) -> bool {
        matches!(self.0, 0 | 3)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelocationRequest {
    pub relocation_address: Option<u16>,
    pub execution_address: Option<u16>,
    pub stack_pointer: Option<u16>,
    pub bank_page: Option<BankPage>,
    pub special_mode: Option<SpecialMode>,
}

/// BC is parked in DE across the port write; the stack may live in the bank being swapped out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSelect {
    pub page: BankPage,
}

impl PageSelect {
    pub const LEN: usize = 21;
    pub const PAGE_AT: usize = 12;

    const TEMPLATE: [u8; Self::LEN] = [
        OP_DI,
        OP_LD_D_B, OP_LD_E_C,
        OP_LD_BC_NN, lo(PORT_128_PAGING), hi(PORT_128_PAGING),
        OP_LD_A_MNN, lo(SYSVAR_BANKM), hi(SYSVAR_BANKM),
        OP_AND_N, 0xf8,
        OP_OR_N, 0x00,
        OP_LD_MNN_A, lo(SYSVAR_BANKM), hi(SYSVAR_BANKM),
        OP_PREFIX_ED, OPED_OUT_C_A,
        OP_LD_B_D, OP_LD_C_E,
        OP_EI,
    ];

    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut code = Self::TEMPLATE.to_vec();
        code[Self::PAGE_AT] = self.page.value();
        code
    }
}

/// Copies the payload that follows the fragment sequence to its destination.
/// Entered from `USR`, so BC holds the address of the first fragment byte.
/// Leaves BC set to the execution address for code that expects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveBlock {
    pub skip: u16,
    pub destination: u16,
    pub count: u16,
    pub stack_pointer: Option<u16>,
    pub execution: u16,
}

impl MoveBlock {
    pub const LEN: usize = 20;
    pub const SKIP_AT: usize = 3;
    pub const DESTINATION_AT: usize = 7;
    pub const COUNT_AT: usize = 10;
    pub const STACK_SLOT_AT: usize = 12;
    pub const EXECUTION_AT: usize = 18;

    const TEMPLATE: [u8; Self::LEN] = [
        OP_LD_H_B,
        OP_LD_L_C,
        OP_LD_DE_NN, 0x00, 0x00,
        OP_ADD_HL_DE,
        OP_LD_DE_NN, 0x00, 0x00,
        OP_LD_BC_NN, 0x00, 0x00,
        OP_NOP, OP_NOP, OP_NOP,
        OP_PREFIX_ED, OPED_LDIR,
        OP_LD_BC_NN, 0x00, 0x00,
    ];

    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut code = Self::TEMPLATE.to_vec();
        put_u16_le(&mut code, Self::SKIP_AT, self.skip);
        put_u16_le(&mut code, Self::DESTINATION_AT, self.destination);
        put_u16_le(&mut code, Self::COUNT_AT, self.count);
        if let Some(sp) = self.stack_pointer {
            code[Self::STACK_SLOT_AT] = OP_LD_SP_NN;
            put_u16_le(&mut code, Self::STACK_SLOT_AT + 1, sp);
        }
        put_u16_le(&mut code, Self::EXECUTION_AT, self.execution);
        code
    }
}

/// Interrupts stay disabled afterwards; the IM 1 vector may no longer be ROM.
/// Like [`PageSelect`], keeps BC (the execution address) in DE rather than on the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialPageSelect {
    pub mode: SpecialMode,
}

impl SpecialPageSelect {
    pub const LEN: usize = 20;
    pub const FLAG_AT: usize = 12;

    const TEMPLATE: [u8; Self::LEN] = [
        OP_DI,
        OP_LD_D_B, OP_LD_E_C,
        OP_LD_BC_NN, lo(PORT_PLUS3_PAGING), hi(PORT_PLUS3_PAGING),
        OP_LD_A_MNN, lo(SYSVAR_BANK678), hi(SYSVAR_BANK678),
        OP_AND_N, 0xf8,
        OP_OR_N, 0x00,
        OP_LD_MNN_A, lo(SYSVAR_BANK678), hi(SYSVAR_BANK678),
        OP_PREFIX_ED, OPED_OUT_C_A,
        OP_LD_B_D, OP_LD_C_E,
    ];

    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut code = Self::TEMPLATE.to_vec();
        code[Self::FLAG_AT] = self.mode.flag();
        code
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JumpToAddress {
    pub target: u16,
}

impl JumpToAddress {
    pub const LEN: usize = 3;
    pub const TARGET_AT: usize = 1;

    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut code = vec![OP_JP_NN, 0x00, 0x00];
        put_u16_le(&mut code, Self::TARGET_AT, self.target);
        code
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fragment {
    PageSelect(PageSelect),
    MoveBlock(MoveBlock),
    SpecialPageSelect(SpecialPageSelect),
    JumpToAddress(JumpToAddress),
}

impl Fragment {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::PageSelect(_) => PageSelect::LEN,
            Self::MoveBlock(_) => MoveBlock::LEN,
            Self::SpecialPageSelect(_) => SpecialPageSelect::LEN,
            Self::JumpToAddress(_) => JumpToAddress::LEN,
        }
    }

    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::PageSelect(f) => f.encode(),
            Self::MoveBlock(f) => f.encode(),
            Self::SpecialPageSelect(f) => f.encode(),
            Self::JumpToAddress(f) => f.encode(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::PageSelect(_) => "page-select",
            Self::MoveBlock(_) => "move-block",
            Self::SpecialPageSelect(_) => "special-page-select",
            Self::JumpToAddress(_) => "jump",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advisory {
    StackPointerChanged(u16),
    PagingWithoutStackChange,
    SpecialModeDisplacesWorkspace(SpecialMode),
    IgnoredWithoutRelocation(&'static str),
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StackPointerChanged(sp) => write!(
                f,
                "stack pointer set to {sp}: returning to BASIC may no longer work"
            ),
            Self::PagingWithoutStackChange => write!(
                f,
                "paging without moving the stack: the stack may be paged out"
            ),
            Self::SpecialModeDisplacesWorkspace(mode) => write!(
                f,
                "special paging mode {} replaces the BASIC workspace at 0x4000",
                mode.value()
            ),
            Self::IgnoredWithoutRelocation(option) => {
                write!(f, "{option} ignored without a relocation address")
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FragmentPlan {
    pub fragments: Vec<Fragment>,
    pub advisories: Vec<Advisory>,
}

impl FragmentPlan {
    #[must_use]
    pub fn total_len(&self) -> usize {
        self.fragments.iter().map(Fragment::len).sum()
    }

    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut code = Vec::with_capacity(self.total_len());
        for fragment in &self.fragments {
            code.extend_from_slice(&fragment.encode());
        }
        code
    }
}

/// Selects and patches the machine-code fragments that run ahead of the payload.
/// Order is fixed: page select, move, special page select, jump.
/// Without a relocation address the payload runs where it was loaded and no fragment is emitted.
#[must_use]
pub fn build_fragments(request: &RelocationRequest, payload_len: u16) -> FragmentPlan {
    let mut advisories = Vec::new();

    let Some(destination) = request.relocation_address else {
        let ignored = [
            (request.execution_address.is_some(), "execution address"),
            (request.stack_pointer.is_some(), "stack pointer"),
            (request.bank_page.is_some(), "bank page"),
            (request.special_mode.is_some(), "special paging mode"),
        ];
        for (set, option) in ignored {
            if set {
                advisories.push(Advisory::IgnoredWithoutRelocation(option));
            }
        }
        return FragmentPlan {
            fragments: Vec::new(),
            advisories,
        };
    };

    let execution = request.execution_address.unwrap_or(destination);

    if let Some(sp) = request.stack_pointer {
        advisories.push(Advisory::StackPointerChanged(sp));
    } else if request.bank_page.is_some() || request.special_mode.is_some() {
        advisories.push(Advisory::PagingWithoutStackChange);
    }
    if let Some(mode) = request.special_mode.filter(|m| m.displaces_workspace()) {
        advisories.push(Advisory::SpecialModeDisplacesWorkspace(mode));
    }

    let skip = request.bank_page.map_or(0, |_| PageSelect::LEN)
        + MoveBlock::LEN
        + request.special_mode.map_or(0, |_| SpecialPageSelect::LEN)
        + JumpToAddress::LEN;

    let mut fragments = Vec::with_capacity(4);
    if let Some(page) = request.bank_page {
        fragments.push(Fragment::PageSelect(PageSelect { page }));
    }
    fragments.push(Fragment::MoveBlock(MoveBlock {
        skip: skip as u16,
        destination,
        count: payload_len,
        stack_pointer: request.stack_pointer,
        execution,
    }));
    if let Some(mode) = request.special_mode {
        fragments.push(Fragment::SpecialPageSelect(SpecialPageSelect { mode }));
    }
    fragments.push(Fragment::JumpToAddress(JumpToAddress { target: execution }));

    FragmentPlan {
        fragments,
        advisories,
    }
}
