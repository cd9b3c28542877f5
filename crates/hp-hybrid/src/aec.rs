//! Memory address extension (the 5061-3001's banking unit).
//!
//! Every memory access carries a purpose tag, the "case", and the
//! extension unit picks one of the six block-select registers R32-R37
//! from (case, top/bottom half of the logical space). The selected block
//! number becomes bits 16+ of the physical address. While the interrupt
//! mode flag is set several table entries are overridden with fixed
//! block numbers so the CPU lands in a known environment on ISR entry.
//!
//! The 5061-3011 has no extension unit at all; its strategy is the
//! identity map.

/// Access-purpose tag fed to the address extension.
///
/// - `A`: instruction fetch and current-page operands
/// - `B`: base-page operands
/// - `C`: indirect/final-destination accesses (stack, vectors, pointers)
/// - `D`: DMA transfers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AecCase {
    A,
    B,
    C,
    D,
}

/// Part of R32-R37 that is actually output as address extension
/// (6 bits of block select code).
const BSC_REG_MASK: u16 = 0x3F;

/// Block-select state of the extension unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaeRegs {
    /// R32-R37, in that order. Only the low 6 bits matter.
    pub bsc: [u16; 6],
    /// When latched, the selected block is forced into the 0x20-0x2F
    /// range. Set at reset in boot mode; cleared by any access to the
    /// memory-mapped register range.
    pub forced_bsc_25: bool,
}

impl MaeRegs {
    /// Extension state at reset: R33 = 5, the rest 0.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bsc: [0, 5, 0, 0, 0, 0],
            forced_bsc_25: false,
        }
    }

    /// Map a logical address to a physical address.
    ///
    /// Block-select register per (case, half, interrupt mode):
    ///
    /// ```text
    /// IM == 0            IM == 1
    /// Case | Top | Bot   Case | Top | Bot
    ///   A  | R34 | R33     A  | R34 |  5
    ///   B  | R36 | R33     B  |  1  |  5
    ///   C  | R32 | R35     C  |  0  | R35
    ///   D  | R32 | R37     D  | R32 | R37
    /// ```
    #[must_use]
    pub fn map(&self, case: AecCase, addr: u16, interrupt_mode: bool) -> u32 {
        let top_half = addr & 0x8000 != 0;

        // Accesses to the top of the base page route through the
        // base-page block select even when tagged as case C.
        let case = if case == AecCase::C && addr & 0xFE00 == 0xFE00 {
            AecCase::B
        } else {
            case
        };

        // bsc[] holds R32..R37
        let bsc_reg = match case {
            AecCase::A => {
                if top_half {
                    self.bsc[2]
                } else if interrupt_mode {
                    5
                } else {
                    self.bsc[1]
                }
            }
            AecCase::B => {
                if top_half {
                    if interrupt_mode { 1 } else { self.bsc[4] }
                } else if interrupt_mode {
                    5
                } else {
                    self.bsc[1]
                }
            }
            AecCase::C => {
                if top_half {
                    if interrupt_mode { 0 } else { self.bsc[0] }
                } else {
                    self.bsc[3]
                }
            }
            AecCase::D => {
                if top_half {
                    self.bsc[0]
                } else {
                    self.bsc[5]
                }
            }
        };

        let mut block = bsc_reg & BSC_REG_MASK;

        if self.forced_bsc_25 {
            block = (block & 0xF) | 0x20;
        }

        u32::from(addr) | (u32::from(block) << 16)
    }
}

impl Default for MaeRegs {
    fn default() -> Self {
        Self::new()
    }
}

/// Address extension strategy, fixed per CPU model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mae {
    /// 5061-3001: full block-select mapping.
    Extended(MaeRegs),
    /// 5061-3011: logical addresses are physical addresses.
    Absent,
}

impl Mae {
    pub(crate) fn map(&self, case: AecCase, addr: u16, interrupt_mode: bool) -> u32 {
        match self {
            Self::Extended(regs) => regs.map(case, addr, interrupt_mode),
            Self::Absent => u32::from(addr),
        }
    }
}
