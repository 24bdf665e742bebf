pub const OP_NOP: u8 = 0x00;
pub const OP_LD_BC_NN: u8 = 0x01;
pub const OP_LD_DE_NN: u8 = 0x11;
pub const OP_ADD_HL_DE: u8 = 0x19;
pub const OP_LD_SP_NN: u8 = 0x31;
pub const OP_LD_MNN_A: u8 = 0x32;
pub const OP_LD_A_MNN: u8 = 0x3a;
pub const OP_LD_B_D: u8 = 0x42;
pub const OP_LD_C_E: u8 = 0x4b;
pub const OP_LD_D_B: u8 = 0x50;
pub const OP_LD_E_C: u8 = 0x59;
pub const OP_LD_H_B: u8 = 0x60;
pub const OP_LD_L_C: u8 = 0x69;
pub const OP_JP_NN: u8 = 0xc3;
pub const OP_AND_N: u8 = 0xe6;
pub const OP_DI: u8 = 0xf3;
pub const OP_OR_N: u8 = 0xf6;
pub const OP_EI: u8 = 0xfb;

pub const OP_PREFIX_ED: u8 = 0xed;
pub const OPED_OUT_C_A: u8 = 0x79;
pub const OPED_LDIR: u8 = 0xb0;

pub const PORT_128_PAGING: u16 = 0x7ffd;
pub const PORT_PLUS3_PAGING: u16 = 0x1ffd;
pub const SYSVAR_BANKM: u16 = 0x5b5c;
pub const SYSVAR_BANK678: u16 = 0x5b67;

pub const fn lo(v: u16) -> u8 {
    v.to_le_bytes()[0]
}

pub const fn hi(v: u16) -> u8 {
    v.to_le_bytes()[1]
}
