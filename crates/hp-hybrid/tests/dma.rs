//! Cycle-stealing DMA tests: the terminal-count bit test, direction
//! handling, and interleaving with instruction execution.

use emu_core::{Cpu, SimpleBus, Ticks};
use hp_hybrid::{CpuModel, HpHybrid, flags};

fn setup(program: &[u16]) -> (HpHybrid, SimpleBus) {
    let mut bus = SimpleBus::new(0x1_0000);
    bus.load(0x20, program);
    let mut cpu = HpHybrid::new(CpuModel::Hp3011);
    cpu.reset(&mut bus);
    (cpu, bus)
}

fn step(cpu: &mut HpHybrid, bus: &mut SimpleBus) -> u64 {
    cpu.execute(bus, Ticks::new(1)).get()
}

#[test]
fn terminal_count_is_a_bit_test_not_a_zero_test() {
    // A counter of 0 wraps to 0xFFFF on the decrement: bit 15 set,
    // terminal count reported (the peripheral sees register 2)
    let (mut cpu, mut bus) = setup(&[0xF060]);
    cpu.regs.flags.set(flags::DMAEN | flags::DMADIR);
    cpu.set_dmar(true);
    cpu.dma.pa = 3;
    cpu.dma.ma = 0x1000;
    cpu.dma.count = 0x0000;
    bus.load(0x1000, &[0x1111]);

    assert_eq!(step(&mut cpu, &mut bus), 10, "outward transfer costs 10");
    assert_eq!(cpu.dma.count, 0xFFFF);
    assert_eq!(bus.io[3][2], 0x1111, "terminal count routes to register 2");
    assert_eq!(bus.io[3][0], 0x0000);

    // A counter of 2 decrements to 1: no terminal count even though the
    // counter is about to reach zero
    let (mut cpu, mut bus) = setup(&[0xF060]);
    cpu.regs.flags.set(flags::DMAEN | flags::DMADIR);
    cpu.set_dmar(true);
    cpu.dma.pa = 3;
    cpu.dma.ma = 0x1000;
    cpu.dma.count = 0x0002;
    bus.load(0x1000, &[0x2222]);

    step(&mut cpu, &mut bus);
    assert_eq!(cpu.dma.count, 0x0001);
    assert_eq!(bus.io[3][0], 0x2222, "normal transfers use register 0");
    assert_eq!(bus.io[3][2], 0x0000);

    // And 1 -> 0 is still not terminal count under the bit test
    step(&mut cpu, &mut bus);
    assert_eq!(cpu.dma.count, 0x0000);
    assert_eq!(bus.io[3][2], 0x0000);
}

#[test]
fn inward_transfer_writes_memory() {
    let (mut cpu, mut bus) = setup(&[0xF060]);
    cpu.regs.flags.set(flags::DMAEN);
    cpu.set_dmar(true);
    cpu.dma.pa = 3;
    cpu.dma.ma = 0x1500;
    cpu.dma.count = 0x0005;
    bus.io[3][0] = 0x2222;

    assert_eq!(step(&mut cpu, &mut bus), 9, "inward transfer costs 9");
    assert_eq!(bus.peek(0x1500), 0x2222);
    assert_eq!(cpu.dma.ma, 0x1501, "memory address auto-increments");
    assert_eq!(cpu.dma.count, 0x0004);
}

#[test]
fn dma_steals_the_pass_from_instructions() {
    let (mut cpu, mut bus) = setup(&[0xF060]); // CMA
    cpu.regs.flags.set(flags::DMAEN);
    cpu.set_dmar(true);
    cpu.dma.ma = 0x1500;
    cpu.dma.count = 0x0010;
    cpu.regs.a = 0x00FF;

    step(&mut cpu, &mut bus);
    assert_eq!(cpu.regs.p, 0x20, "no instruction executed");
    assert_eq!(cpu.regs.a, 0x00FF);
    assert_eq!(cpu.dma.ma, 0x1501);

    // Releasing the request lets the instruction stream resume
    cpu.set_dmar(false);
    step(&mut cpu, &mut bus);
    assert_eq!(cpu.regs.a, 0xFF00);
    assert_eq!(cpu.regs.p, 0x21);
}

#[test]
fn dma_pass_does_not_recognize_interrupts() {
    let (mut cpu, mut bus) = setup(&[0xF060]);
    cpu.regs.flags.set(flags::DMAEN | flags::INTEN | flags::IRL);
    cpu.set_dmar(true);
    cpu.dma.ma = 0x1500;
    cpu.dma.count = 0x0010;

    step(&mut cpu, &mut bus);
    assert!(
        !cpu.regs.flags.is_set(flags::IRL_SVC),
        "interrupts are sampled after instructions, not after DMA cycles"
    );
}

#[test]
fn dma_keeps_running_past_terminal_count() {
    let (mut cpu, mut bus) = setup(&[0xF060]);
    cpu.regs.flags.set(flags::DMAEN | flags::DMADIR);
    cpu.set_dmar(true);
    cpu.dma.pa = 1;
    cpu.dma.ma = 0x1000;
    cpu.dma.count = 0x0000;
    bus.load(0x1000, &[0xAAAA, 0xBBBB]);

    step(&mut cpu, &mut bus);
    assert_eq!(cpu.dma.count, 0xFFFF, "terminal count reached");
    assert!(cpu.regs.flags.is_set(flags::DMAEN), "channel stays enabled");

    step(&mut cpu, &mut bus);
    assert_eq!(cpu.dma.count, 0xFFFE, "transfers continue past it");
    assert_eq!(cpu.dma.ma, 0x1002);
    assert_eq!(bus.io[1][2], 0xBBBB, "still flagged as terminal to the peripheral");
}

#[test]
fn dma_enable_and_direction_via_instructions() {
    // DMA; SDO
    let (mut cpu, mut bus) = setup(&[0x7120, 0x7100]);

    assert_eq!(step(&mut cpu, &mut bus), 12);
    assert!(cpu.regs.flags.is_set(flags::DMAEN));

    step(&mut cpu, &mut bus);
    assert!(cpu.regs.flags.is_set(flags::DMADIR));

    // DDR and SDI undo them
    let (mut cpu, mut bus) = setup(&[0x7138, 0x7108]);
    cpu.regs.flags.set(flags::DMAEN | flags::DMADIR);
    step(&mut cpu, &mut bus);
    step(&mut cpu, &mut bus);
    assert!(!cpu.regs.flags.is_set(flags::DMAEN));
    assert!(!cpu.regs.flags.is_set(flags::DMADIR));
}
