//! HP hybrid CPU core.
//!
//! The execution driver interleaves cycle-stealing DMA with instruction
//! execution: each pass either performs one DMA transfer cycle or
//! fetches-and-executes one instruction and then samples the interrupt
//! lines. The next opcode is always prefetched at the end of the current
//! instruction, so the instruction register holds the opcode about to
//! run.

mod execute;

use emu_core::{Bus, Cpu, Observable, Ticks, Value};

use crate::aec::{AecCase, Mae, MaeRegs};
use crate::emc::EmcRegs;
use crate::flags::{self, Flags};
use crate::model::CpuModel;
use crate::registers::{
    INT_LEVELS, IV_MASK, PA_MASK, REG_A_ADDR, REG_B_ADDR, REG_C_ADDR, REG_D_ADDR, REG_DMAC_ADDR,
    REG_DMAMA_ADDR, REG_DMAPA_ADDR, REG_IV_ADDR, REG_LAST_ADDR, REG_P_ADDR, REG_PA_ADDR,
    REG_R4_ADDR, REG_R7_ADDR, REG_R_ADDR, REG_W_ADDR, RESET_ADDR, Registers,
};

/// High-priority interrupt request line.
pub const IRH_LINE: u32 = 0;
/// Low-priority interrupt request line.
pub const IRL_LINE: u32 = 1;

/// Single-channel DMA state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DmaState {
    /// Peripheral address (4 bits).
    pub pa: u16,
    /// Memory address, auto-incremented every transfer cycle.
    pub ma: u16,
    /// Transfer down-counter.
    pub count: u16,
}

/// An HP hybrid processor (5061-3001 or 5061-3011).
pub struct HpHybrid {
    pub(crate) model: CpuModel,
    /// CPU registers, public for inspection and test setup.
    pub regs: Registers,
    /// DMA channel state.
    pub dma: DmaState,
    pub(crate) mae: Mae,
    pub(crate) emc: Option<EmcRegs>,
    /// Instruction register: the prefetched opcode about to execute.
    opcode: u16,
    /// Physical address the current instruction was fetched from.
    pub(crate) genpc: u32,
    pub(crate) icount: i64,
    boot_mode: bool,
    on_pa_changed: Option<Box<dyn FnMut(u8)>>,
}

impl HpHybrid {
    /// Create a CPU of the given model in power-on state.
    ///
    /// Call [`Cpu::reset`] before executing: reset performs the first
    /// instruction prefetch from the reset address.
    #[must_use]
    pub fn new(model: CpuModel) -> Self {
        let caps = model.capabilities();
        Self {
            model,
            regs: Registers::new(),
            dma: DmaState::default(),
            mae: if caps.mae {
                Mae::Extended(MaeRegs::new())
            } else {
                Mae::Absent
            },
            emc: if caps.emc { Some(EmcRegs::new()) } else { None },
            opcode: 0,
            genpc: 0,
            icount: 0,
            boot_mode: false,
            on_pa_changed: None,
        }
    }

    /// Select boot mode (5061-3001 only): reset latches the forced
    /// block-select override so the first fetches come from blocks
    /// 0x20-0x2F until an internal register is touched.
    #[must_use]
    pub fn with_boot_mode(mut self, enabled: bool) -> Self {
        self.boot_mode = enabled;
        self
    }

    /// Register the callback fired whenever the priority address
    /// changes (explicit writes, interrupt entry and interrupt return).
    pub fn set_pa_changed<F: FnMut(u8) + 'static>(&mut self, f: F) {
        self.on_pa_changed = Some(Box::new(f));
    }

    /// Current priority address.
    #[must_use]
    pub fn pa(&self) -> u8 {
        self.regs.pa[0]
    }

    /// Drive the DMA request line.
    pub fn set_dmar(&mut self, asserted: bool) {
        self.regs.flags.assign(flags::DMAR, asserted);
    }

    /// Drive the halt line. Only sampled by the SHS/SHC skips.
    pub fn set_halt(&mut self, asserted: bool) {
        self.regs.flags.assign(flags::HALT, asserted);
    }

    /// Drive the status line. Only sampled by the SSS/SSC skips.
    pub fn set_sts(&mut self, asserted: bool) {
        self.regs.flags.assign(flags::STS, asserted);
    }

    /// Drive the flag line. Only sampled by the SFS/SFC skips.
    pub fn set_flg(&mut self, asserted: bool) {
        self.regs.flags.assign(flags::FLG, asserted);
    }

    pub(crate) fn map_addr(&self, case: AecCase, addr: u16) -> u32 {
        self.mae.map(case, addr, self.regs.flags.is_set(flags::IM))
    }

    /// Read through the memory layer: internal registers shadow the low
    /// words of every block, everything else goes to the bus.
    pub(crate) fn read_mem<B: Bus>(&mut self, bus: &mut B, phys: u32) -> u16 {
        let logical = (phys & 0xFFFF) as u16;
        if logical <= REG_LAST_ADDR {
            self.read_reg(bus, logical)
        } else {
            bus.read_word(phys)
        }
    }

    pub(crate) fn write_mem<B: Bus>(&mut self, bus: &mut B, phys: u32, value: u16) {
        let logical = (phys & 0xFFFF) as u16;
        if logical <= REG_LAST_ADDR {
            self.write_reg(bus, logical, value);
        } else {
            bus.write_word(phys, value);
        }
    }

    pub(crate) fn read_case<B: Bus>(&mut self, bus: &mut B, case: AecCase, addr: u16) -> u16 {
        let phys = self.map_addr(case, addr);
        self.read_mem(bus, phys)
    }

    pub(crate) fn write_case<B: Bus>(&mut self, bus: &mut B, case: AecCase, addr: u16, value: u16) {
        let phys = self.map_addr(case, addr);
        self.write_mem(bus, phys, value);
    }

    /// Prefetch the opcode at P (case A), recording its physical address.
    pub(crate) fn fetch<B: Bus>(&mut self, bus: &mut B) -> u16 {
        self.genpc = self.map_addr(AecCase::A, self.regs.p);
        self.read_mem(bus, self.genpc)
    }

    fn clear_forced_bsc(&mut self) {
        if let Mae::Extended(m) = &mut self.mae {
            m.forced_bsc_25 = false;
        }
    }

    fn read_reg<B: Bus>(&mut self, bus: &mut B, addr: u16) -> u16 {
        // Any access to the register range drops the forced block latch
        self.clear_forced_bsc();

        match addr {
            REG_A_ADDR => self.regs.a,
            REG_B_ADDR => self.regs.b,
            REG_P_ADDR => self.regs.p,
            REG_R_ADDR => self.regs.r,
            REG_R4_ADDR..=REG_R7_ADDR => {
                bus.read_io(self.regs.pa[0], (addr - REG_R4_ADDR) as u8)
            }
            REG_IV_ADDR => self.regs.iv,
            REG_PA_ADDR => u16::from(self.regs.pa[0]),
            REG_W_ADDR => self.regs.w,
            REG_DMAPA_ADDR => {
                let mut tmp = self.dma.pa & PA_MASK;
                if self.regs.flags.is_set(flags::CB) {
                    tmp |= 1 << 15;
                }
                if self.regs.flags.is_set(flags::DB) {
                    tmp |= 1 << 14;
                }
                tmp
            }
            REG_DMAMA_ADDR => self.dma.ma,
            REG_DMAC_ADDR => self.dma.count,
            REG_C_ADDR => self.regs.c,
            REG_D_ADDR => self.regs.d,
            _ => self.read_aux_reg(addr),
        }
    }

    fn write_reg<B: Bus>(&mut self, bus: &mut B, addr: u16, value: u16) {
        self.clear_forced_bsc();

        match addr {
            REG_A_ADDR => self.regs.a = value,
            REG_B_ADDR => self.regs.b = value,
            REG_P_ADDR => self.regs.p = value,
            REG_R_ADDR => self.regs.r = value,
            REG_R4_ADDR..=REG_R7_ADDR => {
                bus.write_io(self.regs.pa[0], (addr - REG_R4_ADDR) as u8, value);
            }
            REG_IV_ADDR => self.regs.iv = value & IV_MASK,
            REG_PA_ADDR => {
                self.regs.pa[0] = (value & PA_MASK) as u8;
                self.notify_pa_changed();
            }
            REG_W_ADDR => self.regs.w = value,
            REG_DMAPA_ADDR => self.dma.pa = value & PA_MASK,
            REG_DMAMA_ADDR => self.dma.ma = value,
            REG_DMAC_ADDR => self.dma.count = value,
            REG_C_ADDR => self.regs.c = value,
            REG_D_ADDR => self.regs.d = value,
            _ => self.write_aux_reg(addr, value),
        }
    }

    fn notify_pa_changed(&mut self) {
        let pa = self.regs.pa[0];
        if let Some(cb) = self.on_pa_changed.as_mut() {
            cb(pa);
        }
    }

    /// Pop the priority address ring after an interrupt return.
    pub(crate) fn pop_pa_stack(&mut self) {
        self.regs.pa.copy_within(1..=INT_LEVELS, 0);
        self.notify_pa_changed();
    }

    /// Interrupt recognition, run after every instruction.
    fn check_for_interrupts<B: Bus>(&mut self, bus: &mut B) {
        if !self.regs.flags.is_set(flags::INTEN)
            || self.regs.flags.is_set(flags::IRH_SVC)
            || self.regs.flags.is_set(flags::IM)
        {
            return;
        }

        let line;
        if self.regs.flags.is_set(flags::IRH) {
            // Service high-level interrupt
            self.regs.flags.set(flags::IRH_SVC);
            line = IRH_LINE;
            if self.regs.flags.is_set(flags::IRL_SVC) {
                log::warn!("high level preempted low level at {:06x}", self.genpc);
            }
        } else if self.regs.flags.is_set(flags::IRL) && !self.regs.flags.is_set(flags::IRL_SVC) {
            // Service low-level interrupt
            self.regs.flags.set(flags::IRL_SVC);
            line = IRL_LINE;
        } else {
            return;
        }

        // The acknowledging peripheral drives a vector byte; the new
        // priority address is the index of its highest set bit. What a
        // zero vector produces is undocumented; assume bit 7.
        let vector = bus.irq_ack(line);
        let mut new_pa: u8 = 7;
        if vector != 0 {
            new_pa = 7 - vector.leading_zeros() as u8;
        }
        if line == IRH_LINE {
            new_pa |= 1 << 3;
        }

        // Push the priority address ring
        self.regs.pa.copy_within(0..INT_LEVELS, 1);
        self.regs.pa[0] = new_pa;
        self.notify_pa_changed();

        // The patent suggests the whole recognition sequence takes 32 cycles
        self.icount -= 32;

        self.enter_isr();

        // Double-indirect jump-and-save through the vector table
        self.regs.r = self.regs.r.wrapping_add(1);
        let (r, p) = (self.regs.r, self.regs.p);
        self.write_case(bus, AecCase::C, r, p);
        let vec_addr = self.regs.iv.wrapping_add(u16::from(self.regs.pa[0]));
        self.regs.p = self.read_case(bus, AecCase::C, vec_addr);
        self.opcode = self.fetch(bus);
    }

    fn enter_isr(&mut self) {
        match self.model {
            // The 3001 enters interrupt mode (see crate docs)
            CpuModel::Hp3001 => self.regs.flags.set(flags::IM),
            CpuModel::Hp3011 => {}
        }
    }

    /// One cycle-stealing DMA transfer.
    fn handle_dma<B: Bus>(&mut self, bus: &mut B) {
        // Terminal count is bit 15 of the counter being set after the
        // decrement (per the patent), not the counter reaching zero
        self.dma.count = self.dma.count.wrapping_sub(1);
        let tc = self.dma.count & 0x8000 != 0;
        let reg = if tc { 2 } else { 0 };
        let pa = (self.dma.pa & PA_MASK) as u8;

        if self.regs.flags.is_set(flags::DMADIR) {
            // Outward: memory to peripheral
            let ma = self.dma.ma;
            let v = self.read_case(bus, AecCase::D, ma);
            self.dma.ma = self.dma.ma.wrapping_add(1);
            bus.write_io(pa, reg, v);
            self.icount -= 10;
        } else {
            // Inward: peripheral to memory
            let v = bus.read_io(pa, reg);
            let ma = self.dma.ma;
            self.write_case(bus, AecCase::D, ma, v);
            self.dma.ma = self.dma.ma.wrapping_add(1);
            self.icount -= 9;
        }

        // DMA is not disabled at terminal count; the 9845 graphics
        // memory self-test depends on transfers continuing past it
    }
}

impl Cpu for HpHybrid {
    type Registers = Registers;

    fn execute<B: Bus>(&mut self, bus: &mut B, budget: Ticks) -> Ticks {
        self.icount = budget.get() as i64;

        loop {
            if self.regs.flags.is_set(flags::DMAEN) && self.regs.flags.is_set(flags::DMAR) {
                self.handle_dma(bus);
            } else {
                let opcode = self.opcode;
                self.opcode = self.execute_one(bus, opcode);

                // Check for interrupts
                self.check_for_interrupts(bus);
            }
            if self.icount <= 0 {
                break;
            }
        }

        Ticks::new((budget.get() as i64 - self.icount) as u64)
    }

    fn reset<B: Bus>(&mut self, bus: &mut B) {
        if let Mae::Extended(m) = &mut self.mae {
            *m = MaeRegs::new();
            m.forced_bsc_25 = self.boot_mode;
        }
        self.regs.p = RESET_ADDR;
        // Prefetch before the flags clear: a reset taken in interrupt
        // mode fetches through the overridden map
        self.opcode = self.fetch(bus);
        self.regs.flags = Flags::new();
    }

    fn pc(&self) -> u32 {
        self.genpc
    }

    fn registers(&self) -> Registers {
        self.regs
    }

    fn is_halted(&self) -> bool {
        self.regs.flags.is_set(flags::HALT)
    }

    fn set_input(&mut self, line: u32, asserted: bool) {
        match line {
            IRH_LINE => self.regs.flags.assign(flags::IRH, asserted),
            IRL_LINE => self.regs.flags.assign(flags::IRL, asserted),
            _ => {}
        }
    }
}

/// Fields common to both models.
const BASE_PATHS: &[&str] = &[
    "a", "b", "c", "d", "p", "r", "iv", "w", "i", "pa", "pa.1", "pa.2", "dmapa", "dmama", "dmac",
    "flags",
];

/// Fields of the 5061-3001 (common set plus MAE and EMC registers).
const FULL_PATHS: &[&str] = &[
    "a",
    "b",
    "c",
    "d",
    "p",
    "r",
    "iv",
    "w",
    "i",
    "pa",
    "pa.1",
    "pa.2",
    "dmapa",
    "dmama",
    "dmac",
    "flags",
    "ar2.0",
    "ar2.1",
    "ar2.2",
    "ar2.3",
    "se",
    "r25",
    "r26",
    "r27",
    "r32",
    "r33",
    "r34",
    "r35",
    "r36",
    "r37",
    "forced_bsc",
];

impl Observable for HpHybrid {
    fn query(&self, path: &str) -> Option<Value> {
        let bsc = |n: usize| -> Option<Value> {
            match &self.mae {
                Mae::Extended(m) => Some(m.bsc[n].into()),
                Mae::Absent => None,
            }
        };

        match path {
            "a" => Some(self.regs.a.into()),
            "b" => Some(self.regs.b.into()),
            "c" => Some(self.regs.c.into()),
            "d" => Some(self.regs.d.into()),
            "p" => Some(self.regs.p.into()),
            "r" => Some(self.regs.r.into()),
            "iv" => Some(self.regs.iv.into()),
            "w" => Some(self.regs.w.into()),
            "i" => Some(self.opcode.into()),
            "pa" => Some(self.regs.pa[0].into()),
            "pa.1" => Some(self.regs.pa[1].into()),
            "pa.2" => Some(self.regs.pa[2].into()),
            "dmapa" => Some(self.dma.pa.into()),
            "dmama" => Some(self.dma.ma.into()),
            "dmac" => Some(self.dma.count.into()),
            "flags" => Some(self.regs.flags.bits().into()),
            "ar2.0" => self.emc.as_ref().map(|e| e.ar2[0].into()),
            "ar2.1" => self.emc.as_ref().map(|e| e.ar2[1].into()),
            "ar2.2" => self.emc.as_ref().map(|e| e.ar2[2].into()),
            "ar2.3" => self.emc.as_ref().map(|e| e.ar2[3].into()),
            "se" => self.emc.as_ref().map(|e| e.se.into()),
            "r25" => self.emc.as_ref().map(|e| e.r25.into()),
            "r26" => self.emc.as_ref().map(|e| e.r26.into()),
            "r27" => self.emc.as_ref().map(|e| e.r27.into()),
            "r32" => bsc(0),
            "r33" => bsc(1),
            "r34" => bsc(2),
            "r35" => bsc(3),
            "r36" => bsc(4),
            "r37" => bsc(5),
            "forced_bsc" => match &self.mae {
                Mae::Extended(m) => Some(m.forced_bsc_25.into()),
                Mae::Absent => None,
            },
            _ => None,
        }
    }

    fn query_paths(&self) -> &'static [&'static str] {
        match self.model {
            CpuModel::Hp3001 => FULL_PATHS,
            CpuModel::Hp3011 => BASE_PATHS,
        }
    }
}
