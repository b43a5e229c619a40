// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! 32-bit timer (TIMER_A).
//!
//! The counter runs either as one 32-bit timer clocked by the high half's
//! controls, or in split mode as two independent 16-bit timers. Most
//! operations take a [`Half`] selecting which set of fields they touch; in
//! single mode only the high half's clock, mode and run bits matter.

use kernel::utilities::registers::interfaces::{ReadWriteable, Readable, Writeable};
use kernel::utilities::registers::{register_bitfields, register_structs, Field, ReadWrite};
use kernel::utilities::set_clear::SetClearRegister;
use kernel::utilities::StaticRef;
use kernel::{config::CONFIG, debug, param_check};

register_structs! {
    pub TimerRegisters {
        (0x00 => config: SetClearRegister<CONFIG::Register>),
        (0x10 => clkdiv: ReadWrite<u32, CLKDIV::Register>),
        (0x14 => _reserved0),
        (0x20 => count: ReadWrite<u32, COUNT::Register>),
        (0x24 => _reserved1),
        (0x30 => capture: ReadWrite<u32, CAPTURE::Register>),
        (0x34 => _reserved2),
        (0x40 => @END),
    }
}

register_bitfields![u32,
    CONFIG [
        LCLK OFFSET(0) NUMBITS(2) [],
        LMSTREN OFFSET(4) NUMBITS(1) [],
        SPLITEN OFFSET(5) NUMBITS(1) [],
        LEXIEN OFFSET(6) NUMBITS(1) [],
        LOVFIEN OFFSET(7) NUMBITS(1) [],
        LMD OFFSET(8) NUMBITS(3) [],
        LSTATE OFFSET(12) NUMBITS(1) [],
        LRUN OFFSET(13) NUMBITS(1) [],
        LEXI OFFSET(14) NUMBITS(1) [],
        LOVFI OFFSET(15) NUMBITS(1) [],
        HCLK OFFSET(16) NUMBITS(2) [],
        MSTRUN OFFSET(19) NUMBITS(1) [],
        HMSTREN OFFSET(20) NUMBITS(1) [],
        DBGMD OFFSET(21) NUMBITS(1) [
            Run = 0,
            Halt = 1
        ],
        HEXIEN OFFSET(22) NUMBITS(1) [],
        HOVFIEN OFFSET(23) NUMBITS(1) [],
        HMD OFFSET(24) NUMBITS(4) [],
        HSTATE OFFSET(28) NUMBITS(1) [],
        HRUN OFFSET(29) NUMBITS(1) [],
        HEXI OFFSET(30) NUMBITS(1) [],
        HOVFI OFFSET(31) NUMBITS(1) []
    ],
    CLKDIV [
        CLKDIVRL OFFSET(0) NUMBITS(8) [],
        CLKDIVCT OFFSET(16) NUMBITS(8) []
    ],
    COUNT [
        LCOUNT OFFSET(0) NUMBITS(16) [],
        HCOUNT OFFSET(16) NUMBITS(16) []
    ],
    CAPTURE [
        LCCR OFFSET(0) NUMBITS(16) [],
        HCCR OFFSET(16) NUMBITS(16) []
    ]
];

pub const TIMER0_BASE: StaticRef<TimerRegisters> =
    unsafe { StaticRef::new(0x4001_4000 as *const TimerRegisters) };
pub const TIMER1_BASE: StaticRef<TimerRegisters> =
    unsafe { StaticRef::new(0x4001_5000 as *const TimerRegisters) };
pub const TIMER2_BASE: StaticRef<TimerRegisters> =
    unsafe { StaticRef::new(0x4001_6000 as *const TimerRegisters) };

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Half {
    Low,
    High,
}

struct HalfFields {
    clock: Field<u32, CONFIG::Register>,
    master_sync: Field<u32, CONFIG::Register>,
    extra_enable: Field<u32, CONFIG::Register>,
    overflow_enable: Field<u32, CONFIG::Register>,
    mode: Field<u32, CONFIG::Register>,
    state: Field<u32, CONFIG::Register>,
    run: Field<u32, CONFIG::Register>,
    extra_flag: Field<u32, CONFIG::Register>,
    overflow_flag: Field<u32, CONFIG::Register>,
    count: Field<u32, COUNT::Register>,
    capture: Field<u32, CAPTURE::Register>,
}

static LOW: HalfFields = HalfFields {
    clock: CONFIG::LCLK,
    master_sync: CONFIG::LMSTREN,
    extra_enable: CONFIG::LEXIEN,
    overflow_enable: CONFIG::LOVFIEN,
    mode: CONFIG::LMD,
    state: CONFIG::LSTATE,
    run: CONFIG::LRUN,
    extra_flag: CONFIG::LEXI,
    overflow_flag: CONFIG::LOVFI,
    count: COUNT::LCOUNT,
    capture: CAPTURE::LCCR,
};

static HIGH: HalfFields = HalfFields {
    clock: CONFIG::HCLK,
    master_sync: CONFIG::HMSTREN,
    extra_enable: CONFIG::HEXIEN,
    overflow_enable: CONFIG::HOVFIEN,
    mode: CONFIG::HMD,
    state: CONFIG::HSTATE,
    run: CONFIG::HRUN,
    extra_flag: CONFIG::HEXI,
    overflow_flag: CONFIG::HOVFI,
    count: COUNT::HCOUNT,
    capture: CAPTURE::HCCR,
};

impl Half {
    fn fields(self) -> &'static HalfFields {
        match self {
            Half::Low => &LOW,
            Half::High => &HIGH,
        }
    }
}

fn bit(field: Field<u32, CONFIG::Register>) -> u32 {
    field.mask << field.shift
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum ClockSource {
    Apb = 0,
    ExternalOscillator = 1,
    /// Output of the shared clock divider (`CLKDIV`).
    ClockDivider = 2,
    /// Falling edges on the CT pin.
    CtFalling = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum Mode {
    AutoReload = 0,
    UpDown = 1,
    FallingEdgeCapture = 2,
    RisingEdgeCapture = 3,
    LowTimeCapture = 4,
    HighTimeCapture = 5,
    DutyCycleCapture = 6,
    OneShot = 7,
    /// High half only.
    SquareWave = 8,
    /// High half only.
    Pwm = 9,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interrupt {
    /// Capture or extra event.
    Extra,
    Overflow,
}

pub struct Timer {
    registers: StaticRef<TimerRegisters>,
}

impl Timer {
    pub const fn new(base: StaticRef<TimerRegisters>) -> Timer {
        Timer { registers: base }
    }

    pub fn initialize(&self, config: u32, clkdiv: u32, count: u32, capture: u32) {
        let regs = self.registers;
        if CONFIG.trace_init {
            debug!("timer: initialize config {:#010x}", config);
        }
        regs.config.set(config);
        regs.clkdiv.set(clkdiv);
        regs.count.set(count);
        regs.capture.set(capture);
    }

    #[inline]
    pub fn write_config(&self, config: u32) {
        self.registers.config.set(config);
    }

    #[inline]
    pub fn read_config(&self) -> u32 {
        self.registers.config.get()
    }

    pub fn select_clock_source(&self, half: Half, source: ClockSource) {
        self.registers
            .config
            .modify(half.fields().clock.val(source as u32));
    }

    #[inline]
    pub fn enable_master_sync(&self, half: Half) {
        self.registers.config.set_mask(bit(half.fields().master_sync));
    }

    #[inline]
    pub fn disable_master_sync(&self, half: Half) {
        self.registers.config.clear_mask(bit(half.fields().master_sync));
    }

    #[inline]
    pub fn enter_split_mode(&self) {
        self.registers.config.set_bits(CONFIG::SPLITEN::SET);
    }

    #[inline]
    pub fn enter_single_mode(&self) {
        self.registers.config.clear_bits(CONFIG::SPLITEN::SET);
    }

    #[inline]
    pub fn is_split_mode(&self) -> bool {
        self.registers.config.is_set(CONFIG::SPLITEN)
    }

    fn interrupt_enable(half: Half, interrupt: Interrupt) -> u32 {
        let fields = half.fields();
        match interrupt {
            Interrupt::Extra => bit(fields.extra_enable),
            Interrupt::Overflow => bit(fields.overflow_enable),
        }
    }

    fn interrupt_flag(half: Half, interrupt: Interrupt) -> u32 {
        let fields = half.fields();
        match interrupt {
            Interrupt::Extra => bit(fields.extra_flag),
            Interrupt::Overflow => bit(fields.overflow_flag),
        }
    }

    #[inline]
    pub fn enable_interrupt(&self, half: Half, interrupt: Interrupt) {
        self.registers
            .config
            .set_mask(Self::interrupt_enable(half, interrupt));
    }

    #[inline]
    pub fn disable_interrupt(&self, half: Half, interrupt: Interrupt) {
        self.registers
            .config
            .clear_mask(Self::interrupt_enable(half, interrupt));
    }

    #[inline]
    pub fn is_interrupt_enabled(&self, half: Half, interrupt: Interrupt) -> bool {
        self.registers.config.get() & Self::interrupt_enable(half, interrupt) != 0
    }

    #[inline]
    pub fn is_interrupt_pending(&self, half: Half, interrupt: Interrupt) -> bool {
        self.registers.config.get() & Self::interrupt_flag(half, interrupt) != 0
    }

    #[inline]
    pub fn clear_interrupt(&self, half: Half, interrupt: Interrupt) {
        self.registers
            .config
            .clear_mask(Self::interrupt_flag(half, interrupt));
    }

    /// Select the operating mode of one half. Square-wave and PWM exist only
    /// for the high half.
    pub fn select_mode(&self, half: Half, mode: Mode) {
        param_check!(half == Half::High || (mode as u32) <= Mode::OneShot as u32);
        let field = half.fields().mode;
        self.registers
            .config
            .modify(field.val(mode as u32 & field.mask));
    }

    pub fn get_mode(&self, half: Half) -> u32 {
        self.registers.config.read(half.fields().mode)
    }

    /// The state bit drives the output in square-wave and PWM modes and
    /// latches the edge in the capture modes.
    #[inline]
    pub fn set_state(&self, half: Half) {
        self.registers.config.set_mask(bit(half.fields().state));
    }

    #[inline]
    pub fn clear_state(&self, half: Half) {
        self.registers.config.clear_mask(bit(half.fields().state));
    }

    #[inline]
    pub fn get_state(&self, half: Half) -> bool {
        self.registers.config.is_set(half.fields().state)
    }

    #[inline]
    pub fn start(&self, half: Half) {
        self.registers.config.set_mask(bit(half.fields().run));
    }

    #[inline]
    pub fn stop(&self, half: Half) {
        self.registers.config.clear_mask(bit(half.fields().run));
    }

    #[inline]
    pub fn is_running(&self, half: Half) -> bool {
        self.registers.config.is_set(half.fields().run)
    }

    /// Starts every timer with master sync enabled at once.
    #[inline]
    pub fn start_master(&self) {
        self.registers.config.set_bits(CONFIG::MSTRUN::SET);
    }

    #[inline]
    pub fn stop_master(&self) {
        self.registers.config.clear_bits(CONFIG::MSTRUN::SET);
    }

    #[inline]
    pub fn enable_stall_in_debug_mode(&self) {
        self.registers.config.set_bits(CONFIG::DBGMD::Halt);
    }

    #[inline]
    pub fn disable_stall_in_debug_mode(&self) {
        self.registers.config.clear_bits(CONFIG::DBGMD::Halt);
    }

    #[inline]
    pub fn write_clkdiv(&self, clkdiv: u32) {
        self.registers.clkdiv.set(clkdiv);
    }

    #[inline]
    pub fn read_clkdiv(&self) -> u32 {
        self.registers.clkdiv.get()
    }

    /// Divider output is `f / (256 - reload)`.
    pub fn set_clock_divider_reload(&self, reload: u32) {
        param_check!(reload <= CLKDIV::CLKDIVRL.mask);
        self.registers
            .clkdiv
            .modify(CLKDIV::CLKDIVRL.val(reload & CLKDIV::CLKDIVRL.mask));
    }

    pub fn set_clock_divider_counter(&self, counter: u32) {
        param_check!(counter <= CLKDIV::CLKDIVCT.mask);
        self.registers
            .clkdiv
            .modify(CLKDIV::CLKDIVCT.val(counter & CLKDIV::CLKDIVCT.mask));
    }

    #[inline]
    pub fn get_clock_divider_counter(&self) -> u32 {
        self.registers.clkdiv.read(CLKDIV::CLKDIVCT)
    }

    #[inline]
    pub fn write_count(&self, count: u32) {
        self.registers.count.set(count);
    }

    #[inline]
    pub fn read_count(&self) -> u32 {
        self.registers.count.get()
    }

    pub fn set_count(&self, half: Half, count: u32) {
        let field = half.fields().count;
        param_check!(count <= field.mask);
        self.registers.count.modify(field.val(count & field.mask));
    }

    #[inline]
    pub fn get_count(&self, half: Half) -> u32 {
        self.registers.count.read(half.fields().count)
    }

    #[inline]
    pub fn write_capture(&self, capture: u32) {
        self.registers.capture.set(capture);
    }

    #[inline]
    pub fn read_capture(&self) -> u32 {
        self.registers.capture.get()
    }

    /// In the reload and PWM modes the capture register holds the reload
    /// value instead.
    pub fn set_reload(&self, half: Half, reload: u32) {
        let field = half.fields().capture;
        param_check!(reload <= field.mask);
        self.registers.capture.modify(field.val(reload & field.mask));
    }

    #[inline]
    pub fn get_capture(&self, half: Half) -> u32 {
        self.registers.capture.read(half.fields().capture)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::FakeBlock;

    const CONFIG_OFF: usize = 0x00;
    const CONFIG_SET: usize = 0x04;
    const CONFIG_CLR: usize = 0x08;
    const CLKDIV_OFF: usize = 0x10;
    const COUNT_OFF: usize = 0x20;
    const CAPTURE_OFF: usize = 0x30;

    fn fixture() -> (FakeBlock, Timer) {
        let block = FakeBlock::new(0x40);
        let timer = Timer::new(block.registers());
        (block, timer)
    }

    #[test]
    fn mode_select_replaces_only_the_mode_field() {
        let (_block, timer) = fixture();
        timer.write_config(0xFFFF_FFFF & !(0xF << 24));
        timer.select_mode(Half::Low, Mode::UpDown);
        assert_eq!(timer.read_config(), !(0xF << 24) & !(0x7 << 8) | (1 << 8));

        timer.select_mode(Half::High, Mode::Pwm);
        assert_eq!(timer.get_mode(Half::High), 9);
        assert_eq!(timer.get_mode(Half::Low), 1);
    }

    #[test]
    #[should_panic]
    fn pwm_is_high_half_only() {
        let (_block, timer) = fixture();
        timer.select_mode(Half::Low, Mode::Pwm);
    }

    #[test]
    fn clock_sources() {
        let (block, timer) = fixture();
        timer.select_clock_source(Half::Low, ClockSource::ClockDivider);
        timer.select_clock_source(Half::High, ClockSource::CtFalling);
        assert_eq!(block.peek(CONFIG_OFF), 2 | (3 << 16));
        timer.select_clock_source(Half::High, ClockSource::Apb);
        assert_eq!(block.peek(CONFIG_OFF), 2);
    }

    #[test]
    fn run_control_uses_the_shadow_words() {
        let (block, timer) = fixture();
        timer.enter_split_mode();
        assert!(timer.is_split_mode());
        timer.start(Half::Low);
        assert_eq!(block.peek(CONFIG_SET), 1 << 13);
        timer.start(Half::High);
        assert_eq!(block.peek(CONFIG_SET), 1 << 29);
        assert!(timer.is_running(Half::Low) && timer.is_running(Half::High));

        timer.stop(Half::Low);
        assert_eq!(block.peek(CONFIG_CLR), 1 << 13);
        assert!(!timer.is_running(Half::Low));

        timer.enable_master_sync(Half::High);
        timer.start_master();
        assert_eq!(block.peek(CONFIG_OFF), (1 << 5) | (1 << 29) | (1 << 20) | (1 << 19));
        timer.stop_master();
        timer.disable_master_sync(Half::High);
        timer.enter_single_mode();
        assert_eq!(block.peek(CONFIG_OFF), 1 << 29);
    }

    #[test]
    fn interrupts_per_half() {
        let (block, timer) = fixture();
        timer.enable_interrupt(Half::Low, Interrupt::Overflow);
        timer.enable_interrupt(Half::High, Interrupt::Extra);
        assert_eq!(block.peek(CONFIG_OFF), (1 << 7) | (1 << 22));
        assert!(timer.is_interrupt_enabled(Half::High, Interrupt::Extra));
        assert!(!timer.is_interrupt_enabled(Half::High, Interrupt::Overflow));

        block.poke(CONFIG_OFF, (1 << 31) | (1 << 14));
        assert!(timer.is_interrupt_pending(Half::High, Interrupt::Overflow));
        assert!(timer.is_interrupt_pending(Half::Low, Interrupt::Extra));
        assert!(!timer.is_interrupt_pending(Half::Low, Interrupt::Overflow));

        timer.clear_interrupt(Half::High, Interrupt::Overflow);
        assert_eq!(block.peek(CONFIG_CLR), 1 << 31);
        assert_eq!(block.peek(CONFIG_OFF), 1 << 14);
    }

    #[test]
    fn state_and_debug_stall() {
        let (block, timer) = fixture();
        timer.set_state(Half::High);
        timer.enable_stall_in_debug_mode();
        assert_eq!(block.peek(CONFIG_OFF), (1 << 28) | (1 << 21));
        assert!(timer.get_state(Half::High));
        assert!(!timer.get_state(Half::Low));
        timer.clear_state(Half::High);
        timer.disable_stall_in_debug_mode();
        assert_eq!(block.peek(CONFIG_OFF), 0);
    }

    #[test]
    fn counter_and_capture_halves() {
        let (block, timer) = fixture();
        timer.write_count(0x1111_2222);
        timer.set_count(Half::High, 0xABCD);
        assert_eq!(block.peek(COUNT_OFF), 0xABCD_2222);
        assert_eq!(timer.get_count(Half::Low), 0x2222);

        timer.set_reload(Half::Low, 0xFFF0);
        timer.set_reload(Half::High, 0x0100);
        assert_eq!(block.peek(CAPTURE_OFF), 0x0100_FFF0);
        assert_eq!(timer.get_capture(Half::High), 0x0100);
        assert_eq!(timer.read_capture(), 0x0100_FFF0);
    }

    #[test]
    #[should_panic]
    fn count_wider_than_a_half() {
        let (_block, timer) = fixture();
        timer.set_count(Half::Low, 0x1_0000);
    }

    #[test]
    fn clock_divider_fields() {
        let (block, timer) = fixture();
        timer.set_clock_divider_reload(0xF0);
        timer.set_clock_divider_counter(0x12);
        assert_eq!(block.peek(CLKDIV_OFF), 0x0012_00F0);
        assert_eq!(timer.get_clock_divider_counter(), 0x12);
        timer.write_clkdiv(0);
        assert_eq!(timer.read_clkdiv(), 0);
    }

    #[test]
    fn initialize_writes_every_register() {
        let (block, timer) = fixture();
        timer.initialize(0x2000_0100, 0x00FE, 5, 0xFFFF);
        assert_eq!(block.peek(CONFIG_OFF), 0x2000_0100);
        assert_eq!(block.peek(CLKDIV_OFF), 0x00FE);
        assert_eq!(block.peek(COUNT_OFF), 5);
        assert_eq!(block.peek(CAPTURE_OFF), 0xFFFF);
    }
}
