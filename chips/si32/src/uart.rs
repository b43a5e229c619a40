// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! UART with independent receiver and transmitter (UART_A).
//!
//! The receiver and transmitter each have their own framing, baud rate,
//! FIFO and enable controls. In `CONFIG` the transmitter fields are the
//! receiver fields moved up by 16 bits, so framing operations take a
//! [`Direction`] and shift accordingly. The other registers do not share
//! that symmetry and are matched field by field.

use kernel::utilities::registers::interfaces::{ReadWriteable, Readable, Writeable};
use kernel::utilities::registers::{
    register_bitfields, register_structs, Field, ReadWrite, RegisterLongName,
};
use kernel::utilities::set_clear::SetClearRegister;
use kernel::utilities::StaticRef;
use kernel::{config::CONFIG, debug, param_check};

use crate::fifo::DataPort;

register_structs! {
    pub UartRegisters {
        (0x00 => config: SetClearRegister<CONFIG::Register>),
        (0x10 => mode: SetClearRegister<MODE::Register>),
        (0x20 => flowcn: SetClearRegister<FLOWCN::Register>),
        (0x30 => control: SetClearRegister<CONTROL::Register>),
        (0x40 => ipdelay: ReadWrite<u32, IPDELAY::Register>),
        (0x44 => _reserved0),
        (0x50 => baudrate: ReadWrite<u32, BAUDRATE::Register>),
        (0x54 => _reserved1),
        (0x60 => fifocn: SetClearRegister<FIFOCN::Register>),
        (0x70 => data: DataPort),
        (0x74 => _reserved2),
        (0x80 => @END),
    }
}

// Receiver half of CONFIG. The transmitter half is identical at +16.
register_bitfields![u32,
    CONFIG [
        STRTEN OFFSET(0) NUMBITS(1) [],
        PAREN OFFSET(1) NUMBITS(1) [],
        STPEN OFFSET(2) NUMBITS(1) [],
        STPMD OFFSET(3) NUMBITS(2) [],
        PARMD OFFSET(5) NUMBITS(2) [],
        DATLN OFFSET(8) NUMBITS(3) [],
        SCEN OFFSET(12) NUMBITS(1) [],
        IRDAEN OFFSET(13) NUMBITS(1) [],
        INVEN OFFSET(14) NUMBITS(1) []
    ],
    MODE [
        DBGMD OFFSET(16) NUMBITS(1) [
            Run = 0,
            Halt = 1
        ],
        LBMD OFFSET(18) NUMBITS(2) [],
        DUPLEXMD OFFSET(27) NUMBITS(1) [
            Full = 0,
            Half = 1
        ],
        ITSEN OFFSET(30) NUMBITS(1) []
    ],
    FLOWCN [
        RTS OFFSET(0) NUMBITS(1) [],
        RX OFFSET(1) NUMBITS(1) [],
        RTSINVEN OFFSET(5) NUMBITS(1) [],
        RTSTH OFFSET(6) NUMBITS(1) [],
        RTSEN OFFSET(7) NUMBITS(1) [],
        CTS OFFSET(16) NUMBITS(1) [],
        TX OFFSET(17) NUMBITS(1) [],
        CTSINVEN OFFSET(21) NUMBITS(1) [],
        CTSEN OFFSET(23) NUMBITS(1) [],
        TIRDAPW OFFSET(28) NUMBITS(2) []
    ],
    CONTROL [
        RFRMERI OFFSET(0) NUMBITS(1) [],
        RPARERI OFFSET(1) NUMBITS(1) [],
        ROREI OFFSET(2) NUMBITS(1) [],
        RDREQI OFFSET(3) NUMBITS(1) [],
        RERIEN OFFSET(5) NUMBITS(1) [],
        RDREQIEN OFFSET(6) NUMBITS(1) [],
        MATMD OFFSET(8) NUMBITS(2) [],
        RABDEN OFFSET(10) NUMBITS(1) [],
        RBUSYF OFFSET(11) NUMBITS(1) [],
        RBIT OFFSET(12) NUMBITS(1) [],
        ROSEN OFFSET(13) NUMBITS(1) [],
        RINH OFFSET(14) NUMBITS(1) [],
        REN OFFSET(15) NUMBITS(1) [],
        TSCERI OFFSET(16) NUMBITS(1) [],
        TDREQI OFFSET(18) NUMBITS(1) [],
        TCPTI OFFSET(19) NUMBITS(1) [],
        TCPTTH OFFSET(20) NUMBITS(1) [],
        TERIEN OFFSET(21) NUMBITS(1) [],
        TDREQIEN OFFSET(22) NUMBITS(1) [],
        TCPTIEN OFFSET(23) NUMBITS(1) [],
        TBUSYF OFFSET(27) NUMBITS(1) [],
        TBIT OFFSET(28) NUMBITS(1) [],
        TINH OFFSET(30) NUMBITS(1) [],
        TEN OFFSET(31) NUMBITS(1) []
    ],
    IPDELAY [
        IPDELAY OFFSET(16) NUMBITS(8) []
    ],
    BAUDRATE [
        RBAUD OFFSET(0) NUMBITS(16) [],
        TBAUD OFFSET(16) NUMBITS(16) []
    ],
    FIFOCN [
        RCNT OFFSET(0) NUMBITS(3) [],
        RFTH OFFSET(4) NUMBITS(2) [],
        RFIFOFL OFFSET(8) NUMBITS(1) [],
        RFERI OFFSET(9) NUMBITS(1) [],
        RSRFULLF OFFSET(10) NUMBITS(1) [],
        TCNT OFFSET(16) NUMBITS(3) [],
        TFTH OFFSET(20) NUMBITS(2) [],
        TFIFOFL OFFSET(24) NUMBITS(1) [],
        TFERI OFFSET(25) NUMBITS(1) [],
        TSRFULLF OFFSET(26) NUMBITS(1) []
    ]
];

pub const UART0_BASE: StaticRef<UartRegisters> =
    unsafe { StaticRef::new(0x4000_2000 as *const UartRegisters) };
pub const UART1_BASE: StaticRef<UartRegisters> =
    unsafe { StaticRef::new(0x4000_3000 as *const UartRegisters) };

/// Largest value of the 16-bit RBAUD/TBAUD fields.
pub const BAUD_MAX: u32 = BAUDRATE::RBAUD.mask;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Rx,
    Tx,
}

impl Direction {
    const fn config_shift(self) -> usize {
        match self {
            Direction::Rx => 0,
            Direction::Tx => 16,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum StopBits {
    Half = 0,
    One = 1,
    OneAndHalf = 2,
    Two = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum Parity {
    Odd = 0,
    Even = 1,
    Mark = 2,
    Space = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum Loopback {
    Disabled = 0,
    /// RX input is driven from TX.
    Receive = 1,
    /// TX output is driven from RX.
    Transmit = 2,
    Both = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum FifoThreshold {
    One = 0,
    Two = 1,
    Four = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum IrdaPulseWidth {
    OneSixteenth = 0,
    OneEighth = 1,
    ThreeSixteenths = 2,
    OneFourth = 3,
}

/// Interrupt sources with an enable bit in CONTROL.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interrupt {
    RxError,
    RxDataRequest,
    TxError,
    TxDataRequest,
    TxComplete,
}

impl Interrupt {
    fn enable(self) -> Field<u32, CONTROL::Register> {
        match self {
            Interrupt::RxError => CONTROL::RERIEN,
            Interrupt::RxDataRequest => CONTROL::RDREQIEN,
            Interrupt::TxError => CONTROL::TERIEN,
            Interrupt::TxDataRequest => CONTROL::TDREQIEN,
            Interrupt::TxComplete => CONTROL::TCPTIEN,
        }
    }
}

/// Pending flags in CONTROL.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flag {
    RxFrameError,
    RxParityError,
    RxOverrun,
    /// Follows the RX FIFO level.
    RxDataRequest,
    TxSmartCardParityError,
    /// Follows the TX FIFO level, cannot be cleared.
    TxDataRequest,
    TxComplete,
}

impl Flag {
    fn field(self) -> Field<u32, CONTROL::Register> {
        match self {
            Flag::RxFrameError => CONTROL::RFRMERI,
            Flag::RxParityError => CONTROL::RPARERI,
            Flag::RxOverrun => CONTROL::ROREI,
            Flag::RxDataRequest => CONTROL::RDREQI,
            Flag::TxSmartCardParityError => CONTROL::TSCERI,
            Flag::TxDataRequest => CONTROL::TDREQI,
            Flag::TxComplete => CONTROL::TCPTI,
        }
    }
}

fn mask<R: RegisterLongName>(field: Field<u32, R>) -> u32 {
    field.mask << field.shift
}

pub struct Uart {
    registers: StaticRef<UartRegisters>,
}

impl Uart {
    pub const fn new(base: StaticRef<UartRegisters>) -> Uart {
        Uart { registers: base }
    }

    pub fn initialize(
        &self,
        config: u32,
        mode: u32,
        flowcn: u32,
        control: u32,
        ipdelay: u32,
        baudrate: u32,
        fifocn: u32,
    ) {
        let regs = self.registers;
        if CONFIG.trace_init {
            debug!(
                "uart: initialize config {:#010x} baudrate {:#010x}",
                config, baudrate
            );
        }
        regs.config.set(config);
        regs.mode.set(mode);
        regs.flowcn.set(flowcn);
        regs.control.set(control);
        regs.ipdelay.set(ipdelay);
        regs.baudrate.set(baudrate);
        regs.fifocn.set(fifocn);
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
    pub fn write_mode(&self, mode: u32) {
        self.registers.mode.set(mode);
    }

    #[inline]
    pub fn read_mode(&self) -> u32 {
        self.registers.mode.get()
    }

    #[inline]
    pub fn write_control(&self, control: u32) {
        self.registers.control.set(control);
    }

    #[inline]
    pub fn read_control(&self) -> u32 {
        self.registers.control.get()
    }

    // Framing

    fn config_set(&self, direction: Direction, field: Field<u32, CONFIG::Register>) {
        self.registers
            .config
            .set_mask(mask(field) << direction.config_shift());
    }

    fn config_clear(&self, direction: Direction, field: Field<u32, CONFIG::Register>) {
        self.registers
            .config
            .clear_mask(mask(field) << direction.config_shift());
    }

    fn config_select(&self, direction: Direction, field: Field<u32, CONFIG::Register>, value: u32) {
        let shift = direction.config_shift();
        let value = (value & field.mask) << field.shift;
        self.registers.config.clear_mask(mask(field) << shift);
        self.registers.config.set_mask(value << shift);
    }

    fn config_read(&self, direction: Direction, field: Field<u32, CONFIG::Register>) -> u32 {
        (self.registers.config.get() >> direction.config_shift() >> field.shift) & field.mask
    }

    #[inline]
    pub fn enable_start_bit(&self, direction: Direction) {
        self.config_set(direction, CONFIG::STRTEN);
    }

    #[inline]
    pub fn disable_start_bit(&self, direction: Direction) {
        self.config_clear(direction, CONFIG::STRTEN);
    }

    #[inline]
    pub fn enable_stop_bit(&self, direction: Direction) {
        self.config_set(direction, CONFIG::STPEN);
    }

    #[inline]
    pub fn disable_stop_bit(&self, direction: Direction) {
        self.config_clear(direction, CONFIG::STPEN);
    }

    #[inline]
    pub fn enable_parity_bit(&self, direction: Direction) {
        self.config_set(direction, CONFIG::PAREN);
    }

    #[inline]
    pub fn disable_parity_bit(&self, direction: Direction) {
        self.config_clear(direction, CONFIG::PAREN);
    }

    pub fn select_stop_bits(&self, direction: Direction, stop_bits: StopBits) {
        self.config_select(direction, CONFIG::STPMD, stop_bits as u32);
    }

    pub fn select_parity(&self, direction: Direction, parity: Parity) {
        self.config_select(direction, CONFIG::PARMD, parity as u32);
    }

    /// Data bits per frame, 5 to 9.
    pub fn select_data_length(&self, direction: Direction, bits: u32) {
        param_check!((5..=9).contains(&bits));
        self.config_select(direction, CONFIG::DATLN, bits.wrapping_sub(5));
    }

    pub fn get_data_length(&self, direction: Direction) -> u32 {
        self.config_read(direction, CONFIG::DATLN) + 5
    }

    #[inline]
    pub fn enable_smartcard_mode(&self, direction: Direction) {
        self.config_set(direction, CONFIG::SCEN);
    }

    #[inline]
    pub fn disable_smartcard_mode(&self, direction: Direction) {
        self.config_clear(direction, CONFIG::SCEN);
    }

    #[inline]
    pub fn enable_irda_mode(&self, direction: Direction) {
        self.config_set(direction, CONFIG::IRDAEN);
    }

    #[inline]
    pub fn disable_irda_mode(&self, direction: Direction) {
        self.config_clear(direction, CONFIG::IRDAEN);
    }

    #[inline]
    pub fn enable_signal_inversion(&self, direction: Direction) {
        self.config_set(direction, CONFIG::INVEN);
    }

    #[inline]
    pub fn disable_signal_inversion(&self, direction: Direction) {
        self.config_clear(direction, CONFIG::INVEN);
    }

    // Mode

    #[inline]
    pub fn select_loopback_mode(&self, loopback: Loopback) {
        self.registers.mode.select(MODE::LBMD.val(loopback as u32));
    }

    #[inline]
    pub fn select_half_duplex(&self) {
        self.registers.mode.set_bits(MODE::DUPLEXMD::Half);
    }

    #[inline]
    pub fn select_full_duplex(&self) {
        self.registers.mode.clear_bits(MODE::DUPLEXMD::Half);
    }

    #[inline]
    pub fn enable_stall_in_debug_mode(&self) {
        self.registers.mode.set_bits(MODE::DBGMD::Halt);
    }

    #[inline]
    pub fn disable_stall_in_debug_mode(&self) {
        self.registers.mode.clear_bits(MODE::DBGMD::Halt);
    }

    /// Tristate TX while the transmitter is idle.
    #[inline]
    pub fn enable_tx_idle_tristate(&self) {
        self.registers.mode.set_bits(MODE::ITSEN::SET);
    }

    #[inline]
    pub fn disable_tx_idle_tristate(&self) {
        self.registers.mode.clear_bits(MODE::ITSEN::SET);
    }

    // Flow control

    #[inline]
    pub fn enable_rts(&self) {
        self.registers.flowcn.set_bits(FLOWCN::RTSEN::SET);
    }

    #[inline]
    pub fn disable_rts(&self) {
        self.registers.flowcn.clear_bits(FLOWCN::RTSEN::SET);
    }

    #[inline]
    pub fn enable_cts(&self) {
        self.registers.flowcn.set_bits(FLOWCN::CTSEN::SET);
    }

    #[inline]
    pub fn disable_cts(&self) {
        self.registers.flowcn.clear_bits(FLOWCN::CTSEN::SET);
    }

    #[inline]
    pub fn enable_rts_inversion(&self) {
        self.registers.flowcn.set_bits(FLOWCN::RTSINVEN::SET);
    }

    #[inline]
    pub fn enable_cts_inversion(&self) {
        self.registers.flowcn.set_bits(FLOWCN::CTSINVEN::SET);
    }

    /// `true` deasserts RTS at the RX FIFO threshold instead of when the
    /// FIFO is full.
    #[inline]
    pub fn select_rts_threshold(&self, at_threshold: bool) {
        self.registers
            .flowcn
            .select(FLOWCN::RTSTH.val(at_threshold as u32));
    }

    #[inline]
    pub fn select_irda_pulse_width(&self, width: IrdaPulseWidth) {
        self.registers
            .flowcn
            .select(FLOWCN::TIRDAPW.val(width as u32));
    }

    /// Current level of the RX or TX pin.
    #[inline]
    pub fn read_pin(&self, direction: Direction) -> bool {
        match direction {
            Direction::Rx => self.registers.flowcn.is_set(FLOWCN::RX),
            Direction::Tx => self.registers.flowcn.is_set(FLOWCN::TX),
        }
    }

    #[inline]
    pub fn read_rts(&self) -> bool {
        self.registers.flowcn.is_set(FLOWCN::RTS)
    }

    #[inline]
    pub fn read_cts(&self) -> bool {
        self.registers.flowcn.is_set(FLOWCN::CTS)
    }

    /// Idle bit times between transmitted frames.
    pub fn set_interpacket_delay(&self, bits: u32) {
        param_check!(bits <= IPDELAY::IPDELAY.mask);
        self.registers
            .ipdelay
            .write(IPDELAY::IPDELAY.val(bits & IPDELAY::IPDELAY.mask));
    }

    // Baud rate

    /// Bit rate = f_APB / (2 * (`baud` + 1)).
    pub fn set_rx_baudrate(&self, baud: u32) {
        param_check!(baud <= BAUD_MAX);
        self.registers
            .baudrate
            .modify(BAUDRATE::RBAUD.val(baud & BAUD_MAX));
    }

    pub fn set_tx_baudrate(&self, baud: u32) {
        param_check!(baud <= BAUD_MAX);
        self.registers
            .baudrate
            .modify(BAUDRATE::TBAUD.val(baud & BAUD_MAX));
    }

    #[inline]
    pub fn get_rx_baudrate(&self) -> u32 {
        self.registers.baudrate.read(BAUDRATE::RBAUD)
    }

    #[inline]
    pub fn get_tx_baudrate(&self) -> u32 {
        self.registers.baudrate.read(BAUDRATE::TBAUD)
    }

    // Enable and inhibit

    pub fn enable(&self, direction: Direction) {
        match direction {
            Direction::Rx => self.registers.control.set_bits(CONTROL::REN::SET),
            Direction::Tx => self.registers.control.set_bits(CONTROL::TEN::SET),
        }
    }

    pub fn disable(&self, direction: Direction) {
        match direction {
            Direction::Rx => self.registers.control.clear_bits(CONTROL::REN::SET),
            Direction::Tx => self.registers.control.clear_bits(CONTROL::TEN::SET),
        }
    }

    pub fn is_enabled(&self, direction: Direction) -> bool {
        match direction {
            Direction::Rx => self.registers.control.is_set(CONTROL::REN),
            Direction::Tx => self.registers.control.is_set(CONTROL::TEN),
        }
    }

    pub fn inhibit(&self, direction: Direction) {
        match direction {
            Direction::Rx => self.registers.control.set_bits(CONTROL::RINH::SET),
            Direction::Tx => self.registers.control.set_bits(CONTROL::TINH::SET),
        }
    }

    pub fn uninhibit(&self, direction: Direction) {
        match direction {
            Direction::Rx => self.registers.control.clear_bits(CONTROL::RINH::SET),
            Direction::Tx => self.registers.control.clear_bits(CONTROL::TINH::SET),
        }
    }

    pub fn is_busy(&self, direction: Direction) -> bool {
        match direction {
            Direction::Rx => self.registers.control.is_set(CONTROL::RBUSYF),
            Direction::Tx => self.registers.control.is_set(CONTROL::TBUSYF),
        }
    }

    /// Auto baud detection on the next received sync byte.
    #[inline]
    pub fn enable_autobaud(&self) {
        self.registers.control.set_bits(CONTROL::RABDEN::SET);
    }

    #[inline]
    pub fn disable_autobaud(&self) {
        self.registers.control.clear_bits(CONTROL::RABDEN::SET);
    }

    /// Fire TX complete at the end of the stop bit instead of the start of it.
    #[inline]
    pub fn select_tx_complete_at_end(&self, at_end: bool) {
        self.registers.control.select(CONTROL::TCPTTH.val(at_end as u32));
    }

    // Interrupts

    #[inline]
    pub fn enable_interrupt(&self, interrupt: Interrupt) {
        self.registers.control.set_mask(mask(interrupt.enable()));
    }

    #[inline]
    pub fn disable_interrupt(&self, interrupt: Interrupt) {
        self.registers.control.clear_mask(mask(interrupt.enable()));
    }

    #[inline]
    pub fn is_interrupt_enabled(&self, interrupt: Interrupt) -> bool {
        self.registers.control.is_set(interrupt.enable())
    }

    #[inline]
    pub fn is_flag_set(&self, flag: Flag) -> bool {
        self.registers.control.is_set(flag.field())
    }

    pub fn clear_flag(&self, flag: Flag) {
        param_check!(flag != Flag::TxDataRequest);
        self.registers.control.clear_mask(mask(flag.field()));
    }

    // FIFOs

    pub fn select_fifo_threshold(&self, direction: Direction, threshold: FifoThreshold) {
        let field = match direction {
            Direction::Rx => FIFOCN::RFTH,
            Direction::Tx => FIFOCN::TFTH,
        };
        self.registers.fifocn.select(field.val(threshold as u32));
    }

    pub fn flush_fifo(&self, direction: Direction) {
        match direction {
            Direction::Rx => self.registers.fifocn.set_bits(FIFOCN::RFIFOFL::SET),
            Direction::Tx => self.registers.fifocn.set_bits(FIFOCN::TFIFOFL::SET),
        }
    }

    pub fn get_fifo_count(&self, direction: Direction) -> u32 {
        match direction {
            Direction::Rx => self.registers.fifocn.read(FIFOCN::RCNT),
            Direction::Tx => self.registers.fifocn.read(FIFOCN::TCNT),
        }
    }

    /// Set when the shift register holds a frame behind a full FIFO.
    pub fn is_shift_register_full(&self, direction: Direction) -> bool {
        match direction {
            Direction::Rx => self.registers.fifocn.is_set(FIFOCN::RSRFULLF),
            Direction::Tx => self.registers.fifocn.is_set(FIFOCN::TSRFULLF),
        }
    }

    /// FIFO access error: a read from an empty FIFO or a write to a full one.
    pub fn is_fifo_error(&self, direction: Direction) -> bool {
        match direction {
            Direction::Rx => self.registers.fifocn.is_set(FIFOCN::RFERI),
            Direction::Tx => self.registers.fifocn.is_set(FIFOCN::TFERI),
        }
    }

    pub fn clear_fifo_error(&self, direction: Direction) {
        match direction {
            Direction::Rx => self.registers.fifocn.clear_bits(FIFOCN::RFERI::SET),
            Direction::Tx => self.registers.fifocn.clear_bits(FIFOCN::TFERI::SET),
        }
    }

    // Data

    #[inline]
    pub fn write_data_u8(&self, data: u8) {
        self.registers.data.write_u8(data);
    }

    #[inline]
    pub fn write_data_u16(&self, data: u16) {
        self.registers.data.write_u16(data);
    }

    #[inline]
    pub fn write_data_u32(&self, data: u32) {
        self.registers.data.write_u32(data);
    }

    #[inline]
    pub fn read_data_u8(&self) -> u8 {
        self.registers.data.read_u8()
    }

    #[inline]
    pub fn read_data_u16(&self) -> u16 {
        self.registers.data.read_u16()
    }

    #[inline]
    pub fn read_data_u32(&self) -> u32 {
        self.registers.data.read_u32()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::FakeBlock;

    const CONFIG_OFF: usize = 0x00;
    const CONFIG_CLR: usize = 0x08;
    const MODE_OFF: usize = 0x10;
    const FLOWCN_OFF: usize = 0x20;
    const CONTROL_OFF: usize = 0x30;
    const CONTROL_CLR: usize = 0x38;
    const IPDELAY_OFF: usize = 0x40;
    const BAUDRATE_OFF: usize = 0x50;
    const FIFOCN_OFF: usize = 0x60;
    const FIFOCN_SET: usize = 0x64;

    fn fixture() -> (FakeBlock, Uart) {
        let block = FakeBlock::new(0x80);
        let uart = Uart::new(block.registers());
        (block, uart)
    }

    #[test]
    fn framing_lands_in_the_right_half() {
        let (block, uart) = fixture();
        uart.enable_start_bit(Direction::Rx);
        uart.enable_stop_bit(Direction::Tx);
        uart.enable_parity_bit(Direction::Tx);
        assert_eq!(block.peek(CONFIG_OFF), 1 | (1 << 18) | (1 << 17));

        uart.disable_parity_bit(Direction::Tx);
        assert_eq!(block.peek(CONFIG_CLR), 1 << 17);
        assert_eq!(block.peek(CONFIG_OFF), 1 | (1 << 18));
    }

    #[test]
    fn framing_selects_replace_one_field() {
        let (block, uart) = fixture();
        uart.write_config(0xFFFF_FFFF);
        uart.select_parity(Direction::Rx, Parity::Even);
        assert_eq!(block.peek(CONFIG_CLR), 3 << 5);
        assert_eq!(block.peek(CONFIG_OFF), !(3 << 5) | (1 << 5));

        uart.write_config(0);
        uart.select_stop_bits(Direction::Tx, StopBits::Two);
        uart.select_parity(Direction::Tx, Parity::Mark);
        assert_eq!(block.peek(CONFIG_OFF), (3 << 19) | (2 << 21));
    }

    #[test]
    fn data_length_offsets_by_five() {
        let (block, uart) = fixture();
        uart.select_data_length(Direction::Rx, 8);
        uart.select_data_length(Direction::Tx, 9);
        assert_eq!(block.peek(CONFIG_OFF), (3 << 8) | (4 << 24));
        assert_eq!(uart.get_data_length(Direction::Rx), 8);
        assert_eq!(uart.get_data_length(Direction::Tx), 9);
    }

    #[test]
    #[should_panic]
    fn data_length_out_of_range() {
        let (_block, uart) = fixture();
        uart.select_data_length(Direction::Rx, 4);
    }

    #[test]
    fn special_modes() {
        let (block, uart) = fixture();
        uart.enable_smartcard_mode(Direction::Tx);
        uart.enable_irda_mode(Direction::Rx);
        uart.enable_signal_inversion(Direction::Rx);
        assert_eq!(block.peek(CONFIG_OFF), (1 << 28) | (1 << 13) | (1 << 14));
        uart.disable_smartcard_mode(Direction::Tx);
        uart.disable_irda_mode(Direction::Rx);
        uart.disable_signal_inversion(Direction::Rx);
        assert_eq!(block.peek(CONFIG_OFF), 0);
    }

    #[test]
    fn mode_register() {
        let (block, uart) = fixture();
        uart.select_loopback_mode(Loopback::Both);
        uart.select_half_duplex();
        uart.enable_stall_in_debug_mode();
        uart.enable_tx_idle_tristate();
        assert_eq!(
            block.peek(MODE_OFF),
            (3 << 18) | (1 << 27) | (1 << 16) | (1 << 30)
        );
        uart.select_loopback_mode(Loopback::Receive);
        uart.select_full_duplex();
        uart.disable_stall_in_debug_mode();
        uart.disable_tx_idle_tristate();
        assert_eq!(uart.read_mode(), 1 << 18);
    }

    #[test]
    fn baud_fields_are_independent() {
        let (block, uart) = fixture();
        uart.set_rx_baudrate(0x1234);
        uart.set_tx_baudrate(BAUD_MAX);
        assert_eq!(block.peek(BAUDRATE_OFF), 0xFFFF_1234);
        assert_eq!(uart.get_rx_baudrate(), 0x1234);
        assert_eq!(uart.get_tx_baudrate(), 0xFFFF);
    }

    #[test]
    #[should_panic]
    fn baud_must_fit_sixteen_bits() {
        let (_block, uart) = fixture();
        uart.set_rx_baudrate(65_536);
    }

    #[test]
    fn enable_inhibit_and_busy() {
        let (block, uart) = fixture();
        uart.enable(Direction::Rx);
        uart.enable(Direction::Tx);
        uart.inhibit(Direction::Tx);
        assert_eq!(block.peek(CONTROL_OFF), (1 << 15) | (1 << 31) | (1 << 30));
        assert!(uart.is_enabled(Direction::Tx));
        uart.uninhibit(Direction::Tx);
        uart.disable(Direction::Rx);
        assert_eq!(block.peek(CONTROL_OFF), 1 << 31);
        assert!(!uart.is_enabled(Direction::Rx));

        block.poke(CONTROL_OFF, 1 << 27);
        assert!(uart.is_busy(Direction::Tx));
        assert!(!uart.is_busy(Direction::Rx));
    }

    #[test]
    fn interrupts_and_flags() {
        let (block, uart) = fixture();
        uart.enable_interrupt(Interrupt::RxDataRequest);
        uart.enable_interrupt(Interrupt::TxComplete);
        assert_eq!(block.peek(CONTROL_OFF), (1 << 6) | (1 << 23));
        assert!(uart.is_interrupt_enabled(Interrupt::TxComplete));
        uart.disable_interrupt(Interrupt::RxDataRequest);
        assert!(!uart.is_interrupt_enabled(Interrupt::RxDataRequest));

        block.poke(CONTROL_OFF, (1 << 2) | (1 << 19) | (1 << 3));
        assert!(uart.is_flag_set(Flag::RxOverrun));
        assert!(uart.is_flag_set(Flag::TxComplete));
        uart.clear_flag(Flag::RxOverrun);
        assert_eq!(block.peek(CONTROL_CLR), 1 << 2);
        assert_eq!(block.peek(CONTROL_OFF), (1 << 19) | (1 << 3));
    }

    #[test]
    fn rx_data_request_flag_clears() {
        let (block, uart) = fixture();
        block.poke(CONTROL_OFF, 1 << 3);
        uart.clear_flag(Flag::RxDataRequest);
        assert_eq!(block.peek(CONTROL_CLR), 1 << 3);
        assert!(!uart.is_flag_set(Flag::RxDataRequest));
    }

    #[test]
    #[should_panic]
    fn tx_data_request_flag_cannot_be_cleared() {
        let (_block, uart) = fixture();
        uart.clear_flag(Flag::TxDataRequest);
    }

    #[test]
    fn fifo_control() {
        let (block, uart) = fixture();
        uart.select_fifo_threshold(Direction::Rx, FifoThreshold::Four);
        uart.select_fifo_threshold(Direction::Tx, FifoThreshold::Two);
        assert_eq!(block.peek(FIFOCN_OFF), (2 << 4) | (1 << 20));

        uart.flush_fifo(Direction::Tx);
        assert_eq!(block.peek(FIFOCN_SET), 1 << 24);

        block.poke(FIFOCN_OFF, 3 | (4 << 16) | (1 << 25) | (1 << 10));
        assert_eq!(uart.get_fifo_count(Direction::Rx), 3);
        assert_eq!(uart.get_fifo_count(Direction::Tx), 4);
        assert!(uart.is_shift_register_full(Direction::Rx));
        assert!(uart.is_fifo_error(Direction::Tx));
        uart.clear_fifo_error(Direction::Tx);
        assert!(!uart.is_fifo_error(Direction::Tx));
    }

    #[test]
    fn flow_control_and_delay() {
        let (block, uart) = fixture();
        uart.enable_rts();
        uart.enable_cts();
        uart.select_irda_pulse_width(IrdaPulseWidth::OneFourth);
        assert_eq!(
            block.peek(FLOWCN_OFF),
            (1 << 7) | (1 << 23) | (3 << 28)
        );
        block.poke(FLOWCN_OFF, (1 << 1) | (1 << 16));
        assert!(uart.read_pin(Direction::Rx));
        assert!(!uart.read_pin(Direction::Tx));
        assert!(uart.read_cts());

        uart.set_interpacket_delay(0x20);
        assert_eq!(block.peek(IPDELAY_OFF), 0x20 << 16);
    }

    #[test]
    fn data_port_widths() {
        let (block, uart) = fixture();
        uart.write_data_u32(0x0102_0304);
        uart.write_data_u8(0xFF);
        assert_eq!(block.peek(0x70), 0x0102_03FF);
        assert_eq!(uart.read_data_u16(), 0x03FF);
    }
}
