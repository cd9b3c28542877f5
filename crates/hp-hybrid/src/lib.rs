//! Cycle-stepped HP hybrid processor (5061-3001 / 5061-3011) emulator.
//!
//! The "hybrid" processors are the 16-bit CPUs of HP's late-70s desktop
//! computers. The 5061-3001 couples the binary processor chip with an
//! extended math chip (48-bit BCD arithmetic) and a memory address
//! extension unit that banks the 16-bit logical space into 64-word blocks
//! selected by the R32-R37 registers; the 5061-3011 is the same binary
//! processor without either.
//!
//! Each call to `execute` runs whole instructions (or stolen DMA cycles)
//! against a cycle budget, checking for interrupts after every
//! instruction.
//!
//! # Interrupt mode
//!
//! When an interrupt is recognized the address extension registers can be
//! in any state, so the CPU could not reliably save state and fetch the
//! vector through them. The hardware solves this with a hidden "interrupt
//! mode" flag: set when either interrupt level is acknowledged, cleared by
//! the `RET 0,P` that ends the service routine. While it is set no further
//! interrupts are recognized and a few address extension cases are
//! overridden with fixed block numbers, giving the ISR a deterministic
//! environment until it has reprogrammed the extension registers itself.
//!
//! Two opcodes that appear in no datasheet, CIM (0x7026) and SIM (0x7027),
//! clear and set that flag directly. They were reverse-engineered from
//! ROM dumps (the 9845B PPU executes both on every keyboard interrupt, and
//! an assembly-development ROM carries their mnemonics); their behavior
//! here reproduces what was observed, and nothing beyond these two is
//! guessed at.

mod aec;
mod cpu;
mod emc;
pub mod flags;
mod model;
pub mod registers;

pub use aec::{AecCase, MaeRegs};
pub use cpu::{DmaState, HpHybrid, IRH_LINE, IRL_LINE};
pub use flags::Flags;
pub use model::{Capabilities, CpuModel};
pub use registers::Registers;
