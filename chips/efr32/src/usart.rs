// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Universal Synchronous/Asynchronous Receiver/Transmitter (USART).
//!
//! Asynchronous UART, IrDA, SPI and I2S on the series-2 USART. Unlike the
//! EUSART there is no FIFO watermark and no register synchronization: each
//! direction has a two frame buffer, and writes take effect immediately.
//!
//! In asynchronous mode the baud rate is
//!
//! ```text
//! baud = f_ref / (ovs * (1 + DIV / 256))
//! ```
//!
//! with `DIV` the raw `CLKDIV.DIV` field. In synchronous mode it is
//! `f_ref / (2 * (1 + DIV / 256))`.

use kernel::debug;
use kernel::utilities::registers::interfaces::{ReadWriteable, Readable, Writeable};
use kernel::utilities::registers::{
    register_bitfields, register_structs, FieldValue, LocalRegisterCopy, ReadOnly, ReadWrite,
    WriteOnly,
};
use kernel::utilities::set_clear::SetClearAlias;
use kernel::utilities::StaticRef;
use kernel::{config::CONFIG, param_check};

use crate::prs::{ChannelType, Consumer, Prs};

register_structs! {
    pub UsartRegisters {
        (0x000 => ipversion: ReadOnly<u32>),
        (0x004 => en: ReadWrite<u32, EN::Register>),
        (0x008 => ctrl: ReadWrite<u32, CTRL::Register>),
        (0x00C => frame: ReadWrite<u32, FRAME::Register>),
        (0x010 => trigctrl: ReadWrite<u32, TRIGCTRL::Register>),
        (0x014 => cmd: WriteOnly<u32, CMD::Register>),
        (0x018 => status: ReadOnly<u32, STATUS::Register>),
        (0x01C => clkdiv: ReadWrite<u32, CLKDIV::Register>),
        (0x020 => rxdatax: ReadOnly<u32, RXDATAX::Register>),
        (0x024 => rxdata: ReadOnly<u32>),
        (0x028 => rxdoublex: ReadOnly<u32>),
        (0x02C => rxdouble: ReadOnly<u32>),
        (0x030 => rxdataxp: ReadOnly<u32, RXDATAX::Register>),
        (0x034 => rxdoublexp: ReadOnly<u32>),
        (0x038 => txdatax: WriteOnly<u32>),
        (0x03C => txdata: WriteOnly<u32>),
        (0x040 => txdoublex: WriteOnly<u32>),
        (0x044 => txdouble: WriteOnly<u32>),
        (0x048 => intflag: ReadWrite<u32, INT::Register>),
        (0x04C => ien: ReadWrite<u32, INT::Register>),
        (0x050 => irctrl: ReadWrite<u32, IRCTRL::Register>),
        (0x054 => i2sctrl: ReadWrite<u32, I2SCTRL::Register>),
        (0x058 => timing: ReadWrite<u32, TIMING::Register>),
        (0x05C => ctrlx: ReadWrite<u32, CTRLX::Register>),
        (0x060 => @END),
    }
}

register_bitfields![u32,
    EN [
        EN OFFSET(0) NUMBITS(1) []
    ],
    CTRL [
        SYNC OFFSET(0) NUMBITS(1) [],
        LOOPBK OFFSET(1) NUMBITS(1) [],
        CCEN OFFSET(2) NUMBITS(1) [],
        MPM OFFSET(3) NUMBITS(1) [],
        MPAB OFFSET(4) NUMBITS(1) [],
        OVS OFFSET(5) NUMBITS(2) [
            X16 = 0,
            X8 = 1,
            X6 = 2,
            X4 = 3
        ],
        CLKPOL OFFSET(8) NUMBITS(1) [],
        CLKPHA OFFSET(9) NUMBITS(1) [],
        MSBF OFFSET(10) NUMBITS(1) [],
        CSMA OFFSET(11) NUMBITS(1) [],
        TXBIL OFFSET(12) NUMBITS(1) [],
        RXINV OFFSET(13) NUMBITS(1) [],
        TXINV OFFSET(14) NUMBITS(1) [],
        CSINV OFFSET(15) NUMBITS(1) [],
        AUTOCS OFFSET(16) NUMBITS(1) [],
        AUTOTRI OFFSET(17) NUMBITS(1) [],
        SCMODE OFFSET(18) NUMBITS(1) [],
        SCRETRANS OFFSET(19) NUMBITS(1) [],
        SKIPPERRF OFFSET(20) NUMBITS(1) [],
        BIT8DV OFFSET(21) NUMBITS(1) [],
        ERRSDMA OFFSET(22) NUMBITS(1) [],
        ERRSRX OFFSET(23) NUMBITS(1) [],
        ERRSTX OFFSET(24) NUMBITS(1) [],
        SSSEARLY OFFSET(25) NUMBITS(1) [],
        BYTESWAP OFFSET(28) NUMBITS(1) [],
        AUTOTX OFFSET(29) NUMBITS(1) [],
        MVDIS OFFSET(30) NUMBITS(1) [],
        SMSDELAY OFFSET(31) NUMBITS(1) []
    ],
    FRAME [
        DATABITS OFFSET(0) NUMBITS(4) [],
        PARITY OFFSET(8) NUMBITS(2) [],
        STOPBITS OFFSET(12) NUMBITS(2) []
    ],
    TRIGCTRL [
        RXTEN OFFSET(4) NUMBITS(1) [],
        TXTEN OFFSET(5) NUMBITS(1) [],
        AUTOTXTEN OFFSET(6) NUMBITS(1) []
    ],
    CMD [
        RXEN OFFSET(0) NUMBITS(1) [],
        RXDIS OFFSET(1) NUMBITS(1) [],
        TXEN OFFSET(2) NUMBITS(1) [],
        TXDIS OFFSET(3) NUMBITS(1) [],
        MASTEREN OFFSET(4) NUMBITS(1) [],
        MASTERDIS OFFSET(5) NUMBITS(1) [],
        RXBLOCKEN OFFSET(6) NUMBITS(1) [],
        RXBLOCKDIS OFFSET(7) NUMBITS(1) [],
        TXTRIEN OFFSET(8) NUMBITS(1) [],
        TXTRIDIS OFFSET(9) NUMBITS(1) [],
        CLEARTX OFFSET(10) NUMBITS(1) [],
        CLEARRX OFFSET(11) NUMBITS(1) []
    ],
    pub STATUS [
        RXENS OFFSET(0) NUMBITS(1) [],
        TXENS OFFSET(1) NUMBITS(1) [],
        MASTER OFFSET(2) NUMBITS(1) [],
        RXBLOCK OFFSET(3) NUMBITS(1) [],
        TXTRI OFFSET(4) NUMBITS(1) [],
        TXC OFFSET(5) NUMBITS(1) [],
        TXBL OFFSET(6) NUMBITS(1) [],
        RXDATAV OFFSET(7) NUMBITS(1) [],
        RXFULL OFFSET(8) NUMBITS(1) [],
        TXIDLE OFFSET(13) NUMBITS(1) [],
        TXBUFCNT OFFSET(16) NUMBITS(2) []
    ],
    CLKDIV [
        DIV OFFSET(3) NUMBITS(20) [],
        AUTOBAUDEN OFFSET(31) NUMBITS(1) []
    ],
    pub RXDATAX [
        RXDATA OFFSET(0) NUMBITS(9) [],
        PERR OFFSET(14) NUMBITS(1) [],
        FERR OFFSET(15) NUMBITS(1) []
    ],
    pub INT [
        TXC OFFSET(0) NUMBITS(1) [],
        TXBL OFFSET(1) NUMBITS(1) [],
        RXDATAV OFFSET(2) NUMBITS(1) [],
        RXFULL OFFSET(3) NUMBITS(1) [],
        RXOF OFFSET(4) NUMBITS(1) [],
        RXUF OFFSET(5) NUMBITS(1) [],
        TXOF OFFSET(6) NUMBITS(1) [],
        TXUF OFFSET(7) NUMBITS(1) [],
        PERR OFFSET(8) NUMBITS(1) [],
        FERR OFFSET(9) NUMBITS(1) [],
        MPAF OFFSET(10) NUMBITS(1) [],
        SSM OFFSET(11) NUMBITS(1) [],
        CCF OFFSET(12) NUMBITS(1) [],
        TXIDLE OFFSET(13) NUMBITS(1) [],
        TCMP0 OFFSET(14) NUMBITS(1) [],
        TCMP1 OFFSET(15) NUMBITS(1) [],
        TCMP2 OFFSET(16) NUMBITS(1) []
    ],
    IRCTRL [
        IREN OFFSET(0) NUMBITS(1) [],
        IRPW OFFSET(1) NUMBITS(2) [],
        IRFILT OFFSET(3) NUMBITS(1) []
    ],
    I2SCTRL [
        EN OFFSET(0) NUMBITS(1) [],
        MONO OFFSET(1) NUMBITS(1) [],
        JUSTIFY OFFSET(2) NUMBITS(1) [],
        DMASPLIT OFFSET(3) NUMBITS(1) [],
        DELAY OFFSET(4) NUMBITS(1) [],
        FORMAT OFFSET(8) NUMBITS(3) []
    ],
    TIMING [
        TXDELAY OFFSET(16) NUMBITS(3) [],
        CSSETUP OFFSET(20) NUMBITS(3) [],
        ICS OFFSET(24) NUMBITS(3) [],
        CSHOLD OFFSET(28) NUMBITS(3) []
    ],
    CTRLX [
        DBGHALT OFFSET(0) NUMBITS(1) [],
        CTSINV OFFSET(1) NUMBITS(1) [],
        CTSEN OFFSET(2) NUMBITS(1) [],
        RTSINV OFFSET(3) NUMBITS(1) [],
        RXPRSEN OFFSET(7) NUMBITS(1) [],
        CLKPRSEN OFFSET(15) NUMBITS(1) []
    ]
];

const CLKDIV_DIV_MASK: u32 = CLKDIV::DIV.mask << CLKDIV::DIV.shift;
/// Largest raw divider, asynchronous or synchronous.
pub const CLKDIV_MAX: u32 = CLKDIV::DIV.mask;

pub const INT_ALL: u32 = 0x0001_FFFF;

const FRAME_RESET: u32 = 0x0000_1005;

pub const USART0_BASE: StaticRef<UsartRegisters> =
    unsafe { StaticRef::new(0x4005_C000 as *const UsartRegisters) };
pub const USART1_BASE: StaticRef<UsartRegisters> =
    unsafe { StaticRef::new(0x4006_0000 as *const UsartRegisters) };

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum DataBits {
    /// Synchronous only, as are 5, 6, 7 and 10 and up.
    Four = 1,
    Five = 2,
    Six = 3,
    Seven = 4,
    Eight = 5,
    Nine = 6,
    Ten = 7,
    Eleven = 8,
    Twelve = 9,
    Thirteen = 10,
    Fourteen = 11,
    Fifteen = 12,
    Sixteen = 13,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum Oversampling {
    X16 = 0,
    X8 = 1,
    X6 = 2,
    X4 = 3,
}

impl Oversampling {
    pub const fn factor(self) -> u32 {
        match self {
            Oversampling::X16 => 16,
            Oversampling::X8 => 8,
            Oversampling::X6 => 6,
            Oversampling::X4 => 4,
        }
    }

    /// Decode a raw `CTRL.OVS` value.
    pub fn from_raw(value: u32) -> Option<Oversampling> {
        match value {
            0 => Some(Oversampling::X16),
            1 => Some(Oversampling::X8),
            2 => Some(Oversampling::X6),
            3 => Some(Oversampling::X4),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum Parity {
    None = 0,
    Even = 2,
    Odd = 3,
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
pub enum MajorityVote {
    Enable = 0,
    Disable = 1,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HwFlowControl {
    None,
    Cts,
    Rts,
    CtsRts,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockMode {
    /// Idle low, sample on the leading edge.
    Mode0,
    /// Idle low, sample on the trailing edge.
    Mode1,
    /// Idle high, sample on the leading edge.
    Mode2,
    /// Idle high, sample on the trailing edge.
    Mode3,
}

impl ClockMode {
    fn fields(self) -> FieldValue<u32, CTRL::Register> {
        match self {
            ClockMode::Mode0 => CTRL::CLKPOL::CLEAR + CTRL::CLKPHA::CLEAR,
            ClockMode::Mode1 => CTRL::CLKPOL::CLEAR + CTRL::CLKPHA::SET,
            ClockMode::Mode2 => CTRL::CLKPOL::SET + CTRL::CLKPHA::CLEAR,
            ClockMode::Mode3 => CTRL::CLKPOL::SET + CTRL::CLKPHA::SET,
        }
    }
}

/// IrDA pulse width: n/16 of a bit with X16 oversampling, n/8 with X8.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum IrdaPulseWidth {
    One = 0,
    Two = 1,
    Three = 2,
    Four = 3,
}

/// I2S word and data width.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum I2sFormat {
    W32D32 = 0,
    /// 32-bit data with the 8 LSBs masked.
    W32D24M = 1,
    W32D24 = 2,
    W32D16 = 3,
    W32D8 = 4,
    W16D16 = 5,
    W16D8 = 6,
    W8D8 = 7,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum I2sJustify {
    Left = 0,
    Right = 1,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AsyncInit {
    pub cs_invert: bool,
    pub auto_cs_enable: bool,
    pub prs_rx_enable: bool,
    pub prs_rx_channel: u8,
    /// Baud cycles, 0 to 7.
    pub auto_cs_hold: u8,
    /// Baud cycles, 0 to 7.
    pub auto_cs_setup: u8,
    /// Raw `CLKDIV.DIV`, see [`async_calculate_clock_div`].
    pub clock_div: u32,
    pub oversampling: Oversampling,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub majority_vote: MajorityVote,
    pub hw_flow_control: HwFlowControl,
}

impl Default for AsyncInit {
    fn default() -> Self {
        AsyncInit {
            cs_invert: false,
            auto_cs_enable: false,
            prs_rx_enable: false,
            prs_rx_channel: 0,
            auto_cs_hold: 0,
            auto_cs_setup: 0,
            clock_div: 0,
            oversampling: Oversampling::X16,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            majority_vote: MajorityVote::Disable,
            hw_flow_control: HwFlowControl::None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyncInit {
    pub master: bool,
    pub msb_first: bool,
    pub cs_invert: bool,
    pub auto_tx: bool,
    pub auto_cs_enable: bool,
    pub prs_rx_enable: bool,
    pub prs_rx_channel: u8,
    pub auto_cs_hold: u8,
    pub auto_cs_setup: u8,
    /// Raw `CLKDIV.DIV`, see [`sync_calculate_clock_div`].
    pub clock_div: u32,
    pub data_bits: DataBits,
    pub clock_mode: ClockMode,
}

impl Default for SyncInit {
    fn default() -> Self {
        SyncInit {
            master: true,
            msb_first: false,
            cs_invert: false,
            auto_tx: false,
            auto_cs_enable: false,
            prs_rx_enable: false,
            prs_rx_channel: 0,
            auto_cs_hold: 0,
            auto_cs_setup: 0,
            clock_div: 0,
            data_bits: DataBits::Eight,
            clock_mode: ClockMode::Mode0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IrdaInit {
    /// Invert RX ahead of the demodulator.
    pub rx_invert: bool,
    pub filter: bool,
    pub pulse_width: IrdaPulseWidth,
    pub uart: AsyncInit,
}

impl Default for IrdaInit {
    fn default() -> Self {
        IrdaInit {
            rx_invert: false,
            filter: false,
            pulse_width: IrdaPulseWidth::Three,
            uart: AsyncInit::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct I2sInit {
    /// One cycle between word clock edge and data, as standard I2S wants.
    pub delay: bool,
    pub dma_split: bool,
    pub mono: bool,
    pub format: I2sFormat,
    pub justify: I2sJustify,
    pub sync: SyncInit,
}

impl Default for I2sInit {
    fn default() -> Self {
        I2sInit {
            delay: true,
            dma_split: false,
            mono: false,
            format: I2sFormat::W16D16,
            justify: I2sJustify::Left,
            sync: SyncInit::default(),
        }
    }
}

/// PRS consumer inputs of one USART instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UsartConsumers {
    pub clk: Consumer,
    pub ir: Consumer,
    pub rx: Consumer,
    pub trigger: Consumer,
}

impl UsartConsumers {
    pub const USART0: UsartConsumers = UsartConsumers {
        clk: Consumer::USART0_CLK,
        ir: Consumer::USART0_IR,
        rx: Consumer::USART0_RX,
        trigger: Consumer::USART0_TRIGGER,
    };

    pub const USART1: UsartConsumers = UsartConsumers {
        clk: Consumer::USART1_CLK,
        ir: Consumer::USART1_IR,
        rx: Consumer::USART1_RX,
        trigger: Consumer::USART1_TRIGGER,
    };
}

fn oversample_checked(ref_freq: u32, baudrate: u32, ovs: Oversampling) -> u64 {
    let oversample = ovs.factor();
    param_check!(baudrate <= ref_freq / oversample);
    oversample as u64
}

/// Asynchronous `CLKDIV.DIV` value for `baudrate`, rounded to the nearest
/// fractional step.
pub fn async_calculate_clock_div(ref_freq: u32, baudrate: u32, ovs: Oversampling) -> u32 {
    param_check!(baudrate != 0);

    let denominator = oversample_checked(ref_freq, baudrate, ovs) * baudrate as u64;
    let clk_div = ((32 * ref_freq as u64 + denominator / 2) / denominator)
        .wrapping_sub(32)
        .wrapping_mul(8);

    param_check!(clk_div <= CLKDIV_DIV_MASK as u64);
    ((clk_div as u32) & CLKDIV_DIV_MASK) >> CLKDIV::DIV.shift
}

/// Asynchronous baud rate for a raw `CLKDIV.DIV` value.
pub fn async_calculate_baudrate(ref_freq: u32, clk_div: u32, ovs: Oversampling) -> u32 {
    let div = clk_div << CLKDIV::DIV.shift;
    param_check!(div <= CLKDIV_DIV_MASK);

    // 256 / ovs, kept integral by folding the 6 into the divisor.
    let (oversample, factor): (u64, u64) = match ovs {
        Oversampling::X16 => (1, 256 / 16),
        Oversampling::X8 => (1, 256 / 8),
        Oversampling::X6 => (3, 256 / 2),
        Oversampling::X4 => (1, 256 / 4),
    };

    let divisor = oversample * (256 + div as u64);
    let quotient = ref_freq as u64 / divisor;
    let remainder = ref_freq as u64 % divisor;

    (factor * quotient + (factor * remainder) / divisor) as u32
}

/// Like [`async_calculate_baudrate`] with `CTRL.OVS` as read from hardware.
/// Returns 0 for a reserved oversampling encoding.
pub fn async_calculate_baudrate_raw(ref_freq: u32, clk_div: u32, ovs: u32) -> u32 {
    match Oversampling::from_raw(ovs) {
        Some(ovs) => async_calculate_baudrate(ref_freq, clk_div, ovs),
        None => 0,
    }
}

/// Synchronous `CLKDIV.DIV` value for `baudrate`. Truncates, so the actual
/// rate is never above the request.
pub fn sync_calculate_clock_div(ref_freq: u32, baudrate: u32) -> u32 {
    param_check!(baudrate != 0);

    let clk_div = (128 * ref_freq as u64 / baudrate as u64).wrapping_sub(256);
    param_check!(clk_div <= CLKDIV_MAX as u64);
    (clk_div as u32) & CLKDIV_MAX
}

pub fn sync_calculate_baudrate(ref_freq: u32, clk_div: u32) -> u32 {
    param_check!(clk_div <= CLKDIV_MAX);
    (128 * ref_freq as u64 / (256 + clk_div as u64)) as u32
}

pub struct Usart<'a> {
    registers: StaticRef<UsartRegisters>,
    prs: &'a Prs,
    consumers: UsartConsumers,
}

impl<'a> Usart<'a> {
    pub const fn new(
        base: StaticRef<UsartRegisters>,
        prs: &'a Prs,
        consumers: UsartConsumers,
    ) -> Usart<'a> {
        Usart {
            registers: base,
            prs,
            consumers,
        }
    }

    /// Configure for asynchronous UART. Leaves the block enabled with both
    /// directions off.
    ///
    /// RTS needs its GPIO route enabled by the board; only CTS is handled
    /// here.
    pub fn init_async(&self, init: &AsyncInit) {
        let regs = self.registers;
        if CONFIG.trace_init {
            debug!(
                "usart: async init div {} ovs {:?}",
                init.clock_div, init.oversampling
            );
        }

        self.reset();
        self.enable();

        regs.ctrl.modify(
            CTRL::MVDIS.val(init.majority_vote as u32)
                + CTRL::AUTOCS.val(init.auto_cs_enable as u32)
                + CTRL::CSINV.val(init.cs_invert as u32),
        );

        if init.prs_rx_enable {
            self.prs_rx_input(init.prs_rx_channel);
        }

        regs.frame.write(
            FRAME::DATABITS.val(init.data_bits as u32)
                + FRAME::STOPBITS.val(init.stop_bits as u32)
                + FRAME::PARITY.val(init.parity as u32),
        );
        regs.ctrl.set_bits(CTRL::OVS.val(init.oversampling as u32));
        regs.clkdiv
            .set((init.clock_div << CLKDIV::DIV.shift) & CLKDIV_DIV_MASK);
        self.write_timing(init.auto_cs_hold, init.auto_cs_setup);

        if matches!(init.hw_flow_control, HwFlowControl::Cts | HwFlowControl::CtsRts) {
            regs.ctrlx.set_bits(CTRLX::CTSEN::SET);
        } else {
            regs.ctrlx.clear_bits(CTRLX::CTSEN::SET);
        }
    }

    /// Configure for SPI. A master is enabled as master on return.
    pub fn init_sync(&self, init: &SyncInit) {
        let regs = self.registers;
        if CONFIG.trace_init {
            debug!(
                "usart: sync init master {} div {} mode {:?}",
                init.master, init.clock_div, init.clock_mode
            );
        }

        self.reset();
        self.enable();

        regs.ctrl.modify(
            CTRL::SYNC::SET
                + init.clock_mode.fields()
                + CTRL::MSBF.val(init.msb_first as u32)
                + CTRL::AUTOTX.val(init.auto_tx as u32)
                + CTRL::AUTOCS.val(init.auto_cs_enable as u32)
                + CTRL::CSINV.val(init.cs_invert as u32),
        );

        if init.prs_rx_enable {
            self.prs_rx_input(init.prs_rx_channel);
        }

        // Stop bits and parity are unused, keep their reset values.
        regs.frame
            .set((FRAME_RESET & !FRAME::DATABITS.mask) | init.data_bits as u32);

        regs.cmd.write(CMD::MASTEREN.val(init.master as u32));

        regs.clkdiv
            .set((init.clock_div << CLKDIV::DIV.shift) & CLKDIV_DIV_MASK);
        self.write_timing(init.auto_cs_hold, init.auto_cs_setup);
    }

    /// Asynchronous init, then IrDA modulation (RZI) on top.
    pub fn init_irda(&self, init: &IrdaInit) {
        let regs = self.registers;
        self.init_async(&init.uart);

        regs.ctrl.modify(CTRL::TXINV::SET);
        if init.rx_invert {
            regs.ctrl.modify(CTRL::RXINV::SET);
        }

        regs.irctrl.write(
            IRCTRL::IRPW.val(init.pulse_width as u32) + IRCTRL::IRFILT.val(init.filter as u32),
        );
        regs.irctrl.set_bits(IRCTRL::IREN::SET);
    }

    pub fn init_i2s(&self, init: &I2sInit) {
        let regs = self.registers;
        self.disable_tx();
        self.init_sync(&init.sync);

        regs.i2sctrl.write(
            I2SCTRL::FORMAT.val(init.format as u32)
                + I2SCTRL::JUSTIFY.val(init.justify as u32)
                + I2SCTRL::DELAY.val(init.delay as u32)
                + I2SCTRL::DMASPLIT.val(init.dma_split as u32)
                + I2SCTRL::MONO.val(init.mono as u32)
                + I2SCTRL::EN::SET,
        );
    }

    fn write_timing(&self, hold: u8, setup: u8) {
        param_check!(hold <= 7 && setup <= 7);
        self.registers.timing.write(
            TIMING::CSHOLD.val(hold as u32 & 0x7) + TIMING::CSSETUP.val(setup as u32 & 0x7),
        );
    }

    fn prs_rx_input(&self, channel: u8) {
        self.prs
            .connect_channel_consumer(channel, ChannelType::Async, self.consumers.rx);
        self.registers.ctrlx.set_bits(CTRLX::RXPRSEN::SET);
    }

    /// Return to the hardware reset state. The block ends up disabled.
    pub fn reset(&self) {
        let regs = self.registers;
        if CONFIG.trace_init {
            debug!("usart: reset");
        }

        regs.en.set_bits(EN::EN::SET);

        regs.cmd.write(
            CMD::RXDIS::SET
                + CMD::TXDIS::SET
                + CMD::MASTERDIS::SET
                + CMD::RXBLOCKDIS::SET
                + CMD::TXTRIDIS::SET
                + CMD::CLEARTX::SET
                + CMD::CLEARRX::SET,
        );

        regs.ctrl.set(0);
        regs.ctrlx.set(0);
        regs.frame.set(FRAME_RESET);
        regs.trigctrl.set(0);
        regs.clkdiv.set(0);
        regs.ien.set(0);
        regs.intflag.clear_mask(INT_ALL);
        regs.timing.set(0);
        regs.irctrl.set(0);
        regs.i2sctrl.set(0);

        regs.en.clear_bits(EN::EN::SET);
    }

    fn connect_trigger(&self, channel: u8) {
        param_check!(self.registers.en.is_set(EN::EN));
        self.prs
            .connect_channel_consumer(channel, ChannelType::Async, self.consumers.trigger);
    }

    /// Enable the receiver on a PRS `channel` edge.
    pub fn enable_rx_prs_trigger(&self, channel: u8) {
        self.connect_trigger(channel);
        self.registers.trigctrl.set_bits(TRIGCTRL::RXTEN::SET);
    }

    pub fn disable_rx_prs_trigger(&self) {
        let regs = self.registers;
        param_check!(regs.en.is_set(EN::EN));
        regs.trigctrl.clear_bits(TRIGCTRL::RXTEN::SET);
    }

    /// Enable the transmitter on a PRS `channel` edge.
    pub fn enable_tx_prs_trigger(&self, channel: u8) {
        self.connect_trigger(channel);
        self.registers.trigctrl.set_bits(TRIGCTRL::TXTEN::SET);
    }

    pub fn disable_tx_prs_trigger(&self) {
        let regs = self.registers;
        param_check!(regs.en.is_set(EN::EN));
        regs.trigctrl.clear_bits(TRIGCTRL::TXTEN::SET);
    }

    #[inline]
    fn wait_tx_buffer(&self) {
        while !self.registers.status.is_set(STATUS::TXBL) {}
    }

    #[inline]
    pub fn tx(&self, data: u8) {
        self.wait_tx_buffer();
        self.registers.txdata.set(data as u32);
    }

    /// Two frames at once, first frame in the low byte.
    #[inline]
    pub fn tx_double(&self, data: u16) {
        self.wait_tx_buffer();
        self.registers.txdouble.set(data as u32);
    }

    /// One frame with control bits, see the TXDATAX layout.
    #[inline]
    pub fn tx_ext(&self, data: u16) {
        self.wait_tx_buffer();
        self.registers.txdatax.set(data as u32);
    }

    #[inline]
    pub fn tx_double_ext(&self, data: u32) {
        self.wait_tx_buffer();
        self.registers.txdoublex.set(data);
    }

    #[inline]
    pub fn rx(&self) -> u8 {
        let regs = self.registers;
        while !regs.status.is_set(STATUS::RXDATAV) {}
        regs.rxdata.get() as u8
    }

    /// Wait for both buffer slots and read them together.
    #[inline]
    pub fn rx_double(&self) -> u16 {
        let regs = self.registers;
        while !regs.status.is_set(STATUS::RXFULL) {}
        regs.rxdouble.get() as u16
    }

    /// One frame with its PERR and FERR bits.
    #[inline]
    pub fn rx_ext(&self) -> u16 {
        let regs = self.registers;
        while !regs.status.is_set(STATUS::RXDATAV) {}
        regs.rxdatax.get() as u16
    }

    #[inline]
    pub fn rx_double_ext(&self) -> u32 {
        let regs = self.registers;
        while !regs.status.is_set(STATUS::RXFULL) {}
        regs.rxdoublex.get()
    }

    /// Read RXDATA without waiting for data.
    #[inline]
    pub fn rx_get(&self) -> u8 {
        self.registers.rxdata.get() as u8
    }

    #[inline]
    pub fn rx_double_get(&self) -> u16 {
        self.registers.rxdouble.get() as u16
    }

    #[inline]
    pub fn rx_ext_get(&self) -> u16 {
        self.registers.rxdatax.get() as u16
    }

    #[inline]
    pub fn rx_double_ext_get(&self) -> u32 {
        self.registers.rxdoublex.get()
    }

    /// Oldest received frame with status bits, left in the buffer.
    #[inline]
    pub fn rx_peek_ext(&self) -> u16 {
        self.registers.rxdataxp.get() as u16
    }

    #[inline]
    pub fn rx_double_peek_ext(&self) -> u32 {
        self.registers.rxdoublexp.get()
    }

    /// Send one byte and return the byte clocked in with it.
    #[inline]
    pub fn spi_transfer(&self, data: u8) -> u8 {
        let regs = self.registers;
        self.wait_tx_buffer();
        regs.txdata.set(data as u32);
        while !regs.status.is_set(STATUS::TXC) {}
        regs.rxdata.get() as u8
    }

    #[inline]
    pub fn set_clock_div(&self, clock_div: u32) {
        param_check!(clock_div <= CLKDIV_MAX);
        self.registers
            .clkdiv
            .set((clock_div << CLKDIV::DIV.shift) & CLKDIV_DIV_MASK);
    }

    #[inline]
    pub fn get_clock_div(&self) -> u32 {
        let regs = self.registers;
        param_check!(regs.en.is_set(EN::EN));
        regs.clkdiv.read(CLKDIV::DIV)
    }

    #[inline]
    pub fn enable(&self) {
        self.registers.en.set_bits(EN::EN::SET);
    }

    #[inline]
    pub fn disable(&self) {
        let regs = self.registers;
        if !regs.en.is_set(EN::EN) {
            return;
        }
        regs.en.clear_bits(EN::EN::SET);
    }

    #[inline]
    pub fn enable_rx(&self) {
        self.registers.cmd.set_bits(CMD::RXEN::SET);
    }

    #[inline]
    pub fn disable_rx(&self) {
        self.registers.cmd.set_bits(CMD::RXDIS::SET);
    }

    #[inline]
    pub fn enable_tx(&self) {
        self.registers.cmd.set_bits(CMD::TXEN::SET);
    }

    #[inline]
    pub fn disable_tx(&self) {
        self.registers.cmd.set_bits(CMD::TXDIS::SET);
    }

    /// Discard the receive buffer. The receiver must be off.
    #[inline]
    pub fn clear_rx(&self) {
        let regs = self.registers;
        param_check!(!regs.status.is_set(STATUS::RXENS));
        regs.cmd.set_bits(CMD::CLEARRX::SET);
    }

    /// Discard the transmit buffer. The transmitter must be off.
    #[inline]
    pub fn clear_tx(&self) {
        let regs = self.registers;
        param_check!(!regs.status.is_set(STATUS::TXENS));
        regs.cmd.set_bits(CMD::CLEARTX::SET);
    }

    #[inline]
    pub fn get_status(&self) -> LocalRegisterCopy<u32, STATUS::Register> {
        self.registers.status.extract()
    }

    #[inline]
    pub fn clear_interrupts(&self, flags: FieldValue<u32, INT::Register>) {
        self.registers.intflag.clear_bits(flags);
    }

    #[inline]
    pub fn disable_interrupts(&self, flags: FieldValue<u32, INT::Register>) {
        self.registers.ien.clear_bits(flags);
    }

    #[inline]
    pub fn enable_interrupts(&self, flags: FieldValue<u32, INT::Register>) {
        self.registers.ien.set_bits(flags);
    }

    #[inline]
    pub fn get_pending_interrupts(&self) -> LocalRegisterCopy<u32, INT::Register> {
        self.registers.intflag.extract()
    }

    #[inline]
    pub fn get_enabled_pending_interrupts(&self) -> LocalRegisterCopy<u32, INT::Register> {
        let regs = self.registers;
        let ien = regs.ien.get();
        LocalRegisterCopy::new(regs.intflag.get() & ien)
    }

    #[inline]
    pub fn set_interrupts(&self, flags: FieldValue<u32, INT::Register>) {
        self.registers.intflag.set_bits(flags);
    }
}
