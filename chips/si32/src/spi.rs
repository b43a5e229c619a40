// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Serial Peripheral Interface (SPI_B).

use kernel::utilities::registers::interfaces::{Readable, Writeable};
use kernel::utilities::registers::{
    register_bitfields, register_structs, LocalRegisterCopy, ReadOnly, ReadWrite,
};
use kernel::utilities::set_clear::SetClearRegister;
use kernel::utilities::StaticRef;
use kernel::{config::CONFIG, debug, param_check};

use crate::fifo::DataPort;

register_structs! {
    pub SpiRegisters {
        (0x000 => data: DataPort),
        (0x004 => _reserved0),
        (0x010 => control: SetClearRegister<CONTROL::Register>),
        (0x020 => config: SetClearRegister<CONFIG::Register>),
        (0x030 => clkrate: ReadWrite<u32, CLKRATE::Register>),
        (0x034 => _reserved1),
        (0x040 => fstatus: ReadOnly<u32, FSTATUS::Register>),
        (0x044 => _reserved2),
        (0x050 => @END),
    }
}

register_bitfields![u32,
    CONTROL [
        RFRQI OFFSET(0) NUMBITS(1) [],
        RFORI OFFSET(1) NUMBITS(1) [],
        TFRQI OFFSET(2) NUMBITS(1) [],
        TFORI OFFSET(3) NUMBITS(1) [],
        SLVSELI OFFSET(4) NUMBITS(1) [],
        MDFI OFFSET(5) NUMBITS(1) [],
        URI OFFSET(6) NUMBITS(1) [],
        SREI OFFSET(7) NUMBITS(1) [],
        RFILI OFFSET(8) NUMBITS(1) [],
        TFILI OFFSET(9) NUMBITS(1) [],
        NSSSTS OFFSET(14) NUMBITS(1) [],
        BUSYF OFFSET(15) NUMBITS(1) [],
        RFCNT OFFSET(16) NUMBITS(4) [],
        TFCNT OFFSET(20) NUMBITS(4) [],
        DBGMD OFFSET(24) NUMBITS(1) []
    ],
    CONFIG [
        RFRQIEN OFFSET(0) NUMBITS(1) [],
        RFORIEN OFFSET(1) NUMBITS(1) [],
        TFRQIEN OFFSET(2) NUMBITS(1) [],
        TFORIEN OFFSET(3) NUMBITS(1) [],
        SLVSELIEN OFFSET(4) NUMBITS(1) [],
        MDFIEN OFFSET(5) NUMBITS(1) [],
        URIEN OFFSET(6) NUMBITS(1) [],
        SREIEN OFFSET(7) NUMBITS(1) [],
        SPIEN OFFSET(8) NUMBITS(1) [],
        MSTEN OFFSET(9) NUMBITS(1) [],
        CLKPOL OFFSET(10) NUMBITS(1) [],
        CLKPHA OFFSET(11) NUMBITS(1) [],
        NSSPOL OFFSET(12) NUMBITS(1) [],
        DDIRSEL OFFSET(13) NUMBITS(1) [],
        NSSMD OFFSET(14) NUMBITS(2) [
            ThreeWire = 0,
            FourWireSlave = 1,
            FourWireMasterNssLow = 2,
            FourWireMasterNssHigh = 3
        ],
        RFTH OFFSET(16) NUMBITS(2) [],
        TFTH OFFSET(18) NUMBITS(2) [],
        DSIZE OFFSET(20) NUMBITS(4) [],
        DMAEN OFFSET(24) NUMBITS(1) [],
        RFIFOFL OFFSET(29) NUMBITS(1) [],
        TFIFOFL OFFSET(30) NUMBITS(1) [],
        RESET OFFSET(31) NUMBITS(1) []
    ],
    CLKRATE [
        CLKDIV OFFSET(0) NUMBITS(16) []
    ],
    pub FSTATUS [
        RFRPTR OFFSET(0) NUMBITS(4) [],
        RFWPTR OFFSET(4) NUMBITS(4) [],
        TFRPTR OFFSET(8) NUMBITS(4) [],
        TFWPTR OFFSET(12) NUMBITS(4) []
    ]
];

pub const SPI0_BASE: StaticRef<SpiRegisters> =
    unsafe { StaticRef::new(0x4000_4000 as *const SpiRegisters) };
pub const SPI1_BASE: StaticRef<SpiRegisters> =
    unsafe { StaticRef::new(0x4000_5000 as *const SpiRegisters) };

/// Smallest and largest SCK divisor of the APB clock.
pub const CLOCK_DIVISOR_MIN: u32 = 2;
pub const CLOCK_DIVISOR_MAX: u32 = 2 * (CLKRATE::CLKDIV.mask + 1);

/// CONTROL flags 0..=9. The first eight have an enable bit at the same
/// position in CONFIG; the illegal access flags do not.
const INTERRUPT_FLAGS: u32 = 0x3FF;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum Interrupt {
    RxFifoReadRequest = 0,
    RxFifoOverrun = 1,
    TxFifoWriteRequest = 2,
    TxFifoOverrun = 3,
    SlaveSelected = 4,
    ModeFault = 5,
    Underrun = 6,
    ShiftRegisterEmpty = 7,
    IllegalRxFifoAccess = 8,
    IllegalTxFifoAccess = 9,
}

impl Interrupt {
    const fn mask(self) -> u32 {
        1 << self as u32
    }

    fn has_enable(self) -> bool {
        (self as u32) < 8
    }
}

/// SCK idle level and the edge data changes on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockMode {
    /// Idle low, data changes on the second edge.
    Mode0,
    /// Idle low, data changes on the first edge.
    Mode1,
    Mode2,
    Mode3,
}

impl ClockMode {
    fn fields(self) -> (u32, u32) {
        match self {
            ClockMode::Mode0 => (0, 0),
            ClockMode::Mode1 => (0, 1),
            ClockMode::Mode2 => (1, 0),
            ClockMode::Mode3 => (1, 1),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NssMode {
    ThreeWireMaster,
    ThreeWireSlave,
    FourWireSlave,
    /// Master driving NSS from the NSSMD field, initially low.
    FourWireMasterNssLow,
    FourWireMasterNssHigh,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum FifoThreshold {
    One = 0,
    Two = 1,
    Four = 2,
    Eight = 3,
}

pub struct Spi {
    registers: StaticRef<SpiRegisters>,
}

impl Spi {
    pub const fn new(base: StaticRef<SpiRegisters>) -> Spi {
        Spi { registers: base }
    }

    pub fn initialize(&self, control: u32, config: u32, clkrate: u32) {
        let regs = self.registers;
        if CONFIG.trace_init {
            debug!(
                "spi: initialize config {:#010x} clkrate {}",
                config, clkrate
            );
        }
        regs.control.set(control);
        regs.config.set(config);
        regs.clkrate.set(clkrate);
    }

    #[inline]
    pub fn write_tx_fifo_u32(&self, data: u32) {
        self.registers.data.write_u32(data);
    }

    #[inline]
    pub fn write_tx_fifo_u16(&self, data: u16) {
        self.registers.data.write_u16(data);
    }

    #[inline]
    pub fn write_tx_fifo_u8(&self, data: u8) {
        self.registers.data.write_u8(data);
    }

    #[inline]
    pub fn read_rx_fifo_u32(&self) -> u32 {
        self.registers.data.read_u32()
    }

    #[inline]
    pub fn read_rx_fifo_u16(&self) -> u16 {
        self.registers.data.read_u16()
    }

    #[inline]
    pub fn read_rx_fifo_u8(&self) -> u8 {
        self.registers.data.read_u8()
    }

    #[inline]
    pub fn write_control(&self, control: u32) {
        self.registers.control.set(control);
    }

    #[inline]
    pub fn read_control(&self) -> u32 {
        self.registers.control.get()
    }

    #[inline]
    pub fn write_config(&self, config: u32) {
        self.registers.config.set(config);
    }

    #[inline]
    pub fn read_config(&self) -> u32 {
        self.registers.config.get()
    }

    #[inline]
    pub fn enable_module(&self) {
        self.registers.config.set_bits(CONFIG::SPIEN::SET);
    }

    #[inline]
    pub fn disable_module(&self) {
        self.registers.config.clear_bits(CONFIG::SPIEN::SET);
    }

    /// Self-clearing.
    pub fn reset_module(&self) {
        if CONFIG.trace_init {
            debug!("spi: reset");
        }
        self.registers.config.set_bits(CONFIG::RESET::SET);
    }

    #[inline]
    pub fn is_module_reset_pending(&self) -> bool {
        self.registers.config.is_set(CONFIG::RESET)
    }

    #[inline]
    pub fn select_master_mode(&self) {
        self.registers.config.set_bits(CONFIG::MSTEN::SET);
    }

    #[inline]
    pub fn select_slave_mode(&self) {
        self.registers.config.clear_bits(CONFIG::MSTEN::SET);
    }

    pub fn select_clock_mode(&self, mode: ClockMode) {
        let (pol, pha) = mode.fields();
        self.registers
            .config
            .select(CONFIG::CLKPOL.val(pol) + CONFIG::CLKPHA.val(pha));
    }

    #[inline]
    pub fn select_clock_idle_high(&self) {
        self.registers.config.set_bits(CONFIG::CLKPOL::SET);
    }

    #[inline]
    pub fn select_clock_idle_low(&self) {
        self.registers.config.clear_bits(CONFIG::CLKPOL::SET);
    }

    #[inline]
    pub fn select_data_change_first_edge(&self) {
        self.registers.config.set_bits(CONFIG::CLKPHA::SET);
    }

    #[inline]
    pub fn select_data_change_second_edge(&self) {
        self.registers.config.clear_bits(CONFIG::CLKPHA::SET);
    }

    #[inline]
    pub fn select_nss_active_high(&self) {
        self.registers.config.set_bits(CONFIG::NSSPOL::SET);
    }

    #[inline]
    pub fn select_nss_active_low(&self) {
        self.registers.config.clear_bits(CONFIG::NSSPOL::SET);
    }

    #[inline]
    pub fn select_direction_lsb_first(&self) {
        self.registers.config.set_bits(CONFIG::DDIRSEL::SET);
    }

    #[inline]
    pub fn select_direction_msb_first(&self) {
        self.registers.config.clear_bits(CONFIG::DDIRSEL::SET);
    }

    /// Select the master/slave role together with the NSS pin function.
    pub fn select_nss_mode(&self, mode: NssMode) {
        let config = &self.registers.config;
        match mode {
            NssMode::ThreeWireMaster => {
                config.set_bits(CONFIG::MSTEN::SET);
                config.clear_field(CONFIG::NSSMD);
            }
            NssMode::ThreeWireSlave => {
                config.clear_bits(CONFIG::MSTEN::SET + CONFIG::NSSMD::FourWireMasterNssHigh);
            }
            NssMode::FourWireSlave => {
                config.clear_bits(CONFIG::MSTEN::SET + CONFIG::NSSMD::FourWireMasterNssHigh);
                config.set_bits(CONFIG::NSSMD::FourWireSlave);
            }
            NssMode::FourWireMasterNssLow => {
                config.clear_field(CONFIG::NSSMD);
                config.set_bits(CONFIG::NSSMD::FourWireMasterNssLow + CONFIG::MSTEN::SET);
            }
            NssMode::FourWireMasterNssHigh => {
                config.set_bits(CONFIG::NSSMD::FourWireMasterNssHigh + CONFIG::MSTEN::SET);
            }
        }
    }

    /// Drive NSS high in 4-wire master mode.
    #[inline]
    pub fn set_nss(&self) {
        self.registers.config.set_bits(CONFIG::NSSMD::FourWireSlave);
    }

    /// Drive NSS low in 4-wire master mode.
    #[inline]
    pub fn clear_nss(&self) {
        self.registers.config.clear_bits(CONFIG::NSSMD::FourWireSlave);
    }

    #[inline]
    pub fn select_rx_fifo_threshold(&self, threshold: FifoThreshold) {
        self.registers
            .config
            .select(CONFIG::RFTH.val(threshold as u32));
    }

    #[inline]
    pub fn select_tx_fifo_threshold(&self, threshold: FifoThreshold) {
        self.registers
            .config
            .select(CONFIG::TFTH.val(threshold as u32));
    }

    /// Bits per frame, 1 to 16.
    pub fn set_data_length(&self, bits: u32) {
        param_check!((1..=16).contains(&bits));
        self.registers
            .config
            .modify(CONFIG::DSIZE.val(bits.wrapping_sub(1) & CONFIG::DSIZE.mask));
    }

    #[inline]
    pub fn get_data_length(&self) -> u32 {
        self.registers.config.read(CONFIG::DSIZE) + 1
    }

    #[inline]
    pub fn enable_dma_requests(&self) {
        self.registers.config.set_bits(CONFIG::DMAEN::SET);
    }

    #[inline]
    pub fn disable_dma_requests(&self) {
        self.registers.config.clear_bits(CONFIG::DMAEN::SET);
    }

    #[inline]
    pub fn flush_rx_fifo(&self) {
        self.registers.config.set_bits(CONFIG::RFIFOFL::SET);
    }

    #[inline]
    pub fn flush_tx_fifo(&self) {
        self.registers.config.set_bits(CONFIG::TFIFOFL::SET);
    }

    #[inline]
    pub fn get_rx_fifo_count(&self) -> u32 {
        self.registers.control.read(CONTROL::RFCNT)
    }

    #[inline]
    pub fn get_tx_fifo_count(&self) -> u32 {
        self.registers.control.read(CONTROL::TFCNT)
    }

    #[inline]
    pub fn get_fifo_status(&self) -> LocalRegisterCopy<u32, FSTATUS::Register> {
        self.registers.fstatus.extract()
    }

    #[inline]
    pub fn enable_interrupt(&self, interrupt: Interrupt) {
        param_check!(interrupt.has_enable());
        self.registers.config.set_mask(interrupt.mask() & 0xFF);
    }

    #[inline]
    pub fn disable_interrupt(&self, interrupt: Interrupt) {
        param_check!(interrupt.has_enable());
        self.registers.config.clear_mask(interrupt.mask() & 0xFF);
    }

    #[inline]
    pub fn is_interrupt_enabled(&self, interrupt: Interrupt) -> bool {
        interrupt.has_enable() && self.registers.config.get() & interrupt.mask() != 0
    }

    #[inline]
    pub fn is_interrupt_pending(&self, interrupt: Interrupt) -> bool {
        self.registers.control.get() & interrupt.mask() != 0
    }

    /// Request flags follow the FIFO level and cannot be cleared.
    #[inline]
    pub fn clear_interrupt(&self, interrupt: Interrupt) {
        self.registers.control.clear_mask(interrupt.mask());
    }

    #[inline]
    pub fn is_any_interrupt_pending(&self) -> bool {
        self.registers.control.get() & INTERRUPT_FLAGS != 0
    }

    #[inline]
    pub fn clear_all_interrupts(&self) {
        self.registers.control.clear_mask(INTERRUPT_FLAGS);
    }

    /// State of the NSS input.
    #[inline]
    pub fn get_nss_pin(&self) -> bool {
        self.registers.control.is_set(CONTROL::NSSSTS)
    }

    #[inline]
    pub fn is_transfer_in_progress(&self) -> bool {
        self.registers.control.is_set(CONTROL::BUSYF)
    }

    #[inline]
    pub fn enable_stall_in_debug_mode(&self) {
        self.registers.control.set_bits(CONTROL::DBGMD::SET);
    }

    #[inline]
    pub fn disable_stall_in_debug_mode(&self) {
        self.registers.control.clear_bits(CONTROL::DBGMD::SET);
    }

    #[inline]
    pub fn write_clkrate(&self, clkrate: u32) {
        self.registers.clkrate.set(clkrate);
    }

    #[inline]
    pub fn read_clkrate(&self) -> u32 {
        self.registers.clkrate.get()
    }

    /// SCK = f_APB / `divisor`. Odd divisors round down to the next even one.
    pub fn set_clock_divisor(&self, divisor: u32) {
        param_check!((CLOCK_DIVISOR_MIN..=CLOCK_DIVISOR_MAX).contains(&divisor));
        let clkdiv = (divisor / 2).wrapping_sub(1) & CLKRATE::CLKDIV.mask;
        self.registers.clkrate.write(CLKRATE::CLKDIV.val(clkdiv));
    }

    #[inline]
    pub fn get_clock_divisor(&self) -> u32 {
        (self.registers.clkrate.read(CLKRATE::CLKDIV) + 1) * 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::FakeBlock;

    const CONTROL_OFF: usize = 0x010;
    const CONTROL_CLR: usize = 0x018;
    const CONFIG_OFF: usize = 0x020;
    const CONFIG_SET: usize = 0x024;
    const CONFIG_CLR: usize = 0x028;
    const CLKRATE_OFF: usize = 0x030;
    const FSTATUS_OFF: usize = 0x040;

    fn fixture() -> (FakeBlock, Spi) {
        let block = FakeBlock::new(0x50);
        let spi = Spi::new(block.registers());
        (block, spi)
    }

    #[test]
    fn clock_divisor_encoding() {
        let (block, spi) = fixture();
        spi.set_clock_divisor(2);
        assert_eq!(block.peek(CLKRATE_OFF), 0);
        spi.set_clock_divisor(10);
        assert_eq!(block.peek(CLKRATE_OFF), 4);
        assert_eq!(spi.get_clock_divisor(), 10);
        spi.set_clock_divisor(CLOCK_DIVISOR_MAX);
        assert_eq!(block.peek(CLKRATE_OFF), 0xFFFF);
        assert_eq!(spi.get_clock_divisor(), 131_072);
    }

    #[test]
    #[should_panic]
    fn clock_divisor_below_two() {
        let (_block, spi) = fixture();
        spi.set_clock_divisor(1);
    }

    #[test]
    #[should_panic]
    fn clock_divisor_above_max() {
        let (_block, spi) = fixture();
        spi.set_clock_divisor(CLOCK_DIVISOR_MAX + 2);
    }

    #[test]
    fn data_length_preserves_other_fields() {
        let (block, spi) = fixture();
        spi.write_config((1 << 8) | (1 << 9));
        spi.set_data_length(8);
        assert_eq!(block.peek(CONFIG_OFF), (1 << 8) | (1 << 9) | (7 << 20));
        spi.set_data_length(16);
        assert_eq!(spi.get_data_length(), 16);
        assert_eq!(spi.read_config() & 0x300, 0x300);
    }

    #[test]
    #[should_panic]
    fn data_length_zero() {
        let (_block, spi) = fixture();
        spi.set_data_length(0);
    }

    #[test]
    fn clock_mode_select_replaces_polarity_and_phase() {
        let (block, spi) = fixture();
        spi.write_config(1 << 8);
        spi.select_clock_mode(ClockMode::Mode3);
        assert_eq!(block.peek(CONFIG_OFF), (1 << 8) | (3 << 10));
        spi.select_clock_mode(ClockMode::Mode1);
        assert_eq!(block.peek(CONFIG_CLR), 3 << 10);
        assert_eq!(block.peek(CONFIG_OFF), (1 << 8) | (1 << 11));
    }

    #[test]
    fn nss_modes() {
        let (block, spi) = fixture();
        spi.select_nss_mode(NssMode::FourWireMasterNssHigh);
        assert_eq!(block.peek(CONFIG_OFF), (3 << 14) | (1 << 9));

        spi.clear_nss();
        assert_eq!(block.peek(CONFIG_OFF), (2 << 14) | (1 << 9));
        spi.set_nss();
        assert_eq!(block.peek(CONFIG_OFF), (3 << 14) | (1 << 9));

        spi.select_nss_mode(NssMode::FourWireSlave);
        assert_eq!(block.peek(CONFIG_OFF), 1 << 14);
        spi.select_nss_mode(NssMode::FourWireMasterNssLow);
        assert_eq!(block.peek(CONFIG_OFF), (2 << 14) | (1 << 9));
        spi.select_nss_mode(NssMode::ThreeWireMaster);
        assert_eq!(block.peek(CONFIG_OFF), 1 << 9);
        spi.select_nss_mode(NssMode::ThreeWireSlave);
        assert_eq!(block.peek(CONFIG_OFF), 0);
    }

    #[test]
    fn thresholds_and_flushes() {
        let (block, spi) = fixture();
        spi.select_rx_fifo_threshold(FifoThreshold::Four);
        spi.select_tx_fifo_threshold(FifoThreshold::Two);
        assert_eq!(block.peek(CONFIG_OFF), (2 << 16) | (1 << 18));

        spi.flush_rx_fifo();
        assert_eq!(block.peek(CONFIG_SET), 1 << 29);
        spi.flush_tx_fifo();
        assert_eq!(block.peek(CONFIG_SET), 1 << 30);
    }

    #[test]
    fn module_enable_and_reset() {
        let (block, spi) = fixture();
        spi.enable_module();
        spi.select_master_mode();
        spi.enable_dma_requests();
        assert_eq!(block.peek(CONFIG_OFF), (1 << 8) | (1 << 9) | (1 << 24));
        spi.disable_module();
        assert_eq!(block.peek(CONFIG_CLR), 1 << 8);

        spi.reset_module();
        assert!(spi.is_module_reset_pending());
    }

    #[test]
    fn interrupt_enables_share_flag_positions() {
        let (block, spi) = fixture();
        spi.enable_interrupt(Interrupt::ModeFault);
        spi.enable_interrupt(Interrupt::RxFifoOverrun);
        assert_eq!(block.peek(CONFIG_OFF), (1 << 5) | (1 << 1));
        assert!(spi.is_interrupt_enabled(Interrupt::ModeFault));
        assert!(!spi.is_interrupt_enabled(Interrupt::IllegalTxFifoAccess));
        spi.disable_interrupt(Interrupt::ModeFault);
        assert_eq!(block.peek(CONFIG_OFF), 1 << 1);
    }

    #[test]
    #[should_panic]
    fn illegal_access_flags_have_no_enable() {
        let (_block, spi) = fixture();
        spi.enable_interrupt(Interrupt::IllegalRxFifoAccess);
    }

    #[test]
    fn pending_flags_and_counts() {
        let (block, spi) = fixture();
        assert!(!spi.is_any_interrupt_pending());
        block.poke(
            CONTROL_OFF,
            (3 << 20) | (5 << 16) | (1 << 15) | (1 << 14) | (1 << 9) | (1 << 5),
        );
        block.poke(FSTATUS_OFF, 0x4321);

        assert_eq!(spi.get_rx_fifo_count(), 5);
        assert_eq!(spi.get_tx_fifo_count(), 3);
        assert!(spi.is_transfer_in_progress());
        assert!(spi.get_nss_pin());
        assert!(spi.is_interrupt_pending(Interrupt::IllegalTxFifoAccess));
        assert_eq!(spi.get_fifo_status().read(FSTATUS::TFWPTR), 4);

        spi.clear_interrupt(Interrupt::ModeFault);
        assert_eq!(block.peek(CONTROL_CLR), 1 << 5);
        assert!(!spi.is_interrupt_pending(Interrupt::ModeFault));

        spi.clear_all_interrupts();
        assert_eq!(block.peek(CONTROL_CLR), 0x3FF);
        assert!(!spi.is_any_interrupt_pending());
        assert_eq!(spi.get_rx_fifo_count(), 5);
    }

    #[test]
    fn narrow_data_access() {
        let (block, spi) = fixture();
        spi.write_tx_fifo_u8(0xA5);
        assert_eq!(block.peek(0), 0xA5);
        spi.write_tx_fifo_u16(0x1234);
        assert_eq!(spi.read_rx_fifo_u16(), 0x1234);
        spi.write_tx_fifo_u32(0xDEAD_BEEF);
        assert_eq!(spi.read_rx_fifo_u8(), 0xEF);
        assert_eq!(spi.read_rx_fifo_u32(), 0xDEAD_BEEF);
    }
}
