// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Enhanced Universal Synchronous/Asynchronous Receiver/Transmitter (EUSART).
//!
//! The EUSART runs as an asynchronous UART from either the high frequency
//! peripheral clock (with oversampling) or a low frequency clock (oversampling
//! disabled, usable in EM2). On top of plain UART framing it does IrDA, DALI
//! and SPI master/slave.
//!
//! Baud rate
//! ---------
//!
//! Asynchronous modes divide the reference clock by a fixed point divider
//! with 5 fractional bits, held in `CLKDIV.DIV` (bits 3..23):
//!
//! ```text
//! baud = f_ref / (ovs * (1 + DIV / 256))
//! ```
//!
//! where `DIV` is the raw field contents, i.e. the divider scaled by 8.
//! [`uart_calculate_clock_div`] and [`uart_calculate_baudrate`] go from one
//! to the other. SPI modes use the plain integer divider in `CFG2.SDIV`.
//!
//! Most registers only accept writes while the block is enabled and are
//! synchronized into the EUSART clock domain; the driver waits on `SYNCBUSY`
//! before touching them. Those waits spin with no timeout.

use core::cell::Cell;

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
    pub EusartRegisters {
        (0x000 => ipversion: ReadOnly<u32>),
        (0x004 => en: ReadWrite<u32, EN::Register>),
        (0x008 => cfg0: ReadWrite<u32, CFG0::Register>),
        (0x00C => cfg1: ReadWrite<u32, CFG1::Register>),
        (0x010 => cfg2: ReadWrite<u32, CFG2::Register>),
        (0x014 => framecfg: ReadWrite<u32, FRAMECFG::Register>),
        /// Data shifted out in slave mode when the TX FIFO is empty
        (0x018 => dtxdatcfg: ReadWrite<u32, DTXDATCFG::Register>),
        (0x01C => irhfcfg: ReadWrite<u32, IRHFCFG::Register>),
        (0x020 => irlfcfg: ReadWrite<u32, IRLFCFG::Register>),
        (0x024 => timingcfg: ReadWrite<u32, TIMINGCFG::Register>),
        (0x028 => startframecfg: ReadWrite<u32, FRAME::Register>),
        (0x02C => sigframecfg: ReadWrite<u32, FRAME::Register>),
        (0x030 => clkdiv: ReadWrite<u32, CLKDIV::Register>),
        (0x034 => trigctrl: ReadWrite<u32, TRIGCTRL::Register>),
        (0x038 => cmd: WriteOnly<u32, CMD::Register>),
        (0x03C => rxdata: ReadOnly<u32, DATA::Register>),
        /// RXDATA peek, does not pop the FIFO
        (0x040 => rxdatap: ReadOnly<u32, DATA::Register>),
        (0x044 => txdata: WriteOnly<u32, DATA::Register>),
        (0x048 => status: ReadOnly<u32, STATUS::Register>),
        (0x04C => intflag: ReadWrite<u32, INT::Register>),
        (0x050 => ien: ReadWrite<u32, INT::Register>),
        (0x054 => syncbusy: ReadOnly<u32, SYNCBUSY::Register>),
        (0x058 => dalicfg: ReadWrite<u32, DALICFG::Register>),
        (0x05C => @END),
    }
}

register_bitfields![u32,
    EN [
        EN OFFSET(0) NUMBITS(1) [],
        DISABLING OFFSET(1) NUMBITS(1) []
    ],
    CFG0 [
        SYNC OFFSET(0) NUMBITS(1) [],
        LOOPBK OFFSET(1) NUMBITS(1) [],
        CCEN OFFSET(2) NUMBITS(1) [],
        MPM OFFSET(3) NUMBITS(1) [],
        MPAB OFFSET(4) NUMBITS(1) [],
        OVS OFFSET(5) NUMBITS(3) [
            X16 = 0,
            X8 = 1,
            X6 = 2,
            X4 = 3,
            Disable = 4
        ],
        MSBF OFFSET(10) NUMBITS(1) [],
        RXINV OFFSET(13) NUMBITS(1) [],
        TXINV OFFSET(14) NUMBITS(1) [],
        AUTOTRI OFFSET(17) NUMBITS(1) [],
        SKIPPERRF OFFSET(20) NUMBITS(1) [],
        ERRSDMA OFFSET(22) NUMBITS(1) [],
        ERRSRX OFFSET(23) NUMBITS(1) [],
        ERRSTX OFFSET(24) NUMBITS(1) [],
        MVDIS OFFSET(30) NUMBITS(1) []
    ],
    CFG1 [
        DBGHALT OFFSET(0) NUMBITS(1) [],
        CTSINV OFFSET(1) NUMBITS(1) [],
        CTSEN OFFSET(2) NUMBITS(1) [],
        RTSINV OFFSET(3) NUMBITS(1) [],
        RXTIMEOUT OFFSET(4) NUMBITS(3) [],
        TXDMAWU OFFSET(9) NUMBITS(1) [],
        RXDMAWU OFFSET(10) NUMBITS(1) [],
        SFUBRX OFFSET(11) NUMBITS(1) [],
        RXPRSEN OFFSET(15) NUMBITS(1) [],
        TXFIW OFFSET(19) NUMBITS(4) [],
        RXFIW OFFSET(27) NUMBITS(4) []
    ],
    CFG2 [
        MASTER OFFSET(0) NUMBITS(1) [],
        CLKPOL OFFSET(1) NUMBITS(1) [],
        CLKPHA OFFSET(2) NUMBITS(1) [],
        CSINV OFFSET(3) NUMBITS(1) [],
        AUTOTX OFFSET(4) NUMBITS(1) [],
        AUTOCS OFFSET(5) NUMBITS(1) [],
        CLKPRSEN OFFSET(6) NUMBITS(1) [],
        FORCELOAD OFFSET(7) NUMBITS(1) [],
        SDIV OFFSET(24) NUMBITS(8) []
    ],
    FRAMECFG [
        DATABITS OFFSET(0) NUMBITS(4) [],
        PARITY OFFSET(8) NUMBITS(2) [],
        STOPBITS OFFSET(12) NUMBITS(2) []
    ],
    DTXDATCFG [
        DTXDAT OFFSET(0) NUMBITS(16) []
    ],
    IRHFCFG [
        IRHFEN OFFSET(0) NUMBITS(1) [],
        IRHFPW OFFSET(1) NUMBITS(2) [],
        IRHFFILT OFFSET(3) NUMBITS(1) []
    ],
    IRLFCFG [
        IRLFEN OFFSET(0) NUMBITS(1) []
    ],
    TIMINGCFG [
        TXDELAY OFFSET(0) NUMBITS(2) [],
        CSSETUP OFFSET(4) NUMBITS(3) [],
        CSHOLD OFFSET(8) NUMBITS(3) [],
        ICS OFFSET(12) NUMBITS(3) [],
        SETUPWINDOW OFFSET(16) NUMBITS(4) []
    ],
    FRAME [
        FRAME OFFSET(0) NUMBITS(9) []
    ],
    CLKDIV [
        DIV OFFSET(3) NUMBITS(20) []
    ],
    TRIGCTRL [
        RXTEN OFFSET(0) NUMBITS(1) [],
        TXTEN OFFSET(1) NUMBITS(1) [],
        AUTOTXTEN OFFSET(2) NUMBITS(1) []
    ],
    CMD [
        RXEN OFFSET(0) NUMBITS(1) [],
        RXDIS OFFSET(1) NUMBITS(1) [],
        TXEN OFFSET(2) NUMBITS(1) [],
        TXDIS OFFSET(3) NUMBITS(1) [],
        RXBLOCKEN OFFSET(4) NUMBITS(1) [],
        RXBLOCKDIS OFFSET(5) NUMBITS(1) [],
        TXTRIEN OFFSET(6) NUMBITS(1) [],
        TXTRIDIS OFFSET(7) NUMBITS(1) [],
        CLEARTX OFFSET(8) NUMBITS(1) [],
        CLEARRX OFFSET(9) NUMBITS(1) []
    ],
    DATA [
        DATA OFFSET(0) NUMBITS(16) []
    ],
    pub STATUS [
        RXENS OFFSET(0) NUMBITS(1) [],
        TXENS OFFSET(1) NUMBITS(1) [],
        RXBLOCK OFFSET(3) NUMBITS(1) [],
        TXTRI OFFSET(4) NUMBITS(1) [],
        TXC OFFSET(5) NUMBITS(1) [],
        TXFL OFFSET(6) NUMBITS(1) [],
        RXFL OFFSET(7) NUMBITS(1) [],
        RXFULL OFFSET(8) NUMBITS(1) [],
        RXIDLE OFFSET(12) NUMBITS(1) [],
        TXIDLE OFFSET(13) NUMBITS(1) [],
        TXFCNT OFFSET(16) NUMBITS(5) [],
        CLEARTXBUSY OFFSET(21) NUMBITS(1) [],
        CLEARRXBUSY OFFSET(22) NUMBITS(1) []
    ],
    pub INT [
        TXC OFFSET(0) NUMBITS(1) [],
        TXFL OFFSET(1) NUMBITS(1) [],
        RXFL OFFSET(2) NUMBITS(1) [],
        RXFULL OFFSET(3) NUMBITS(1) [],
        RXOF OFFSET(4) NUMBITS(1) [],
        RXUF OFFSET(5) NUMBITS(1) [],
        TXOF OFFSET(6) NUMBITS(1) [],
        TXUF OFFSET(7) NUMBITS(1) [],
        PERR OFFSET(8) NUMBITS(1) [],
        FERR OFFSET(9) NUMBITS(1) [],
        MPAF OFFSET(10) NUMBITS(1) [],
        LOADERR OFFSET(11) NUMBITS(1) [],
        CCF OFFSET(12) NUMBITS(1) [],
        TXIDLE OFFSET(13) NUMBITS(1) [],
        CSWU OFFSET(16) NUMBITS(1) [],
        STARTF OFFSET(18) NUMBITS(1) [],
        SIGF OFFSET(19) NUMBITS(1) [],
        AUTOBAUDDONE OFFSET(24) NUMBITS(1) [],
        RXTO OFFSET(25) NUMBITS(1) []
    ],
    SYNCBUSY [
        DIV OFFSET(0) NUMBITS(1) [],
        RXTEN OFFSET(1) NUMBITS(1) [],
        TXTEN OFFSET(2) NUMBITS(1) [],
        RXEN OFFSET(3) NUMBITS(1) [],
        RXDIS OFFSET(4) NUMBITS(1) [],
        TXEN OFFSET(5) NUMBITS(1) [],
        TXDIS OFFSET(6) NUMBITS(1) [],
        RXBLOCKEN OFFSET(7) NUMBITS(1) [],
        RXBLOCKDIS OFFSET(8) NUMBITS(1) [],
        TXTRIEN OFFSET(9) NUMBITS(1) [],
        TXTRIDIS OFFSET(10) NUMBITS(1) [],
        AUTOTXTEN OFFSET(11) NUMBITS(1) []
    ],
    DALICFG [
        DALIEN OFFSET(0) NUMBITS(1) [],
        DALITXDATABITS OFFSET(1) NUMBITS(5) [],
        DALIRXDATABITS OFFSET(8) NUMBITS(5) [],
        DALIRXENDT OFFSET(16) NUMBITS(4) []
    ]
];

/// The divider field of `CLKDIV`, in place.
pub const CLKDIV_DIV_MASK: u32 = CLKDIV::DIV.mask << CLKDIV::DIV.shift;
/// Largest value accepted by `uart_set_clock_div`.
pub const CLKDIV_MAX: u32 = CLKDIV::DIV.mask;
/// Largest SPI integer divider.
pub const SPI_CLKDIV_MAX: u32 = CFG2::SDIV.mask;

pub const SYNCBUSY_ALL: u32 = 0x0000_0FFF;
pub const INT_ALL: u32 = 0x030D_3FFF;

const FRAMECFG_RESET: u32 = 0x0000_1002;
const TIMINGCFG_RESET: u32 = 0x0005_0000;

pub const EUSART0_BASE: StaticRef<EusartRegisters> =
    unsafe { StaticRef::new(0x4A04_0000 as *const EusartRegisters) };

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum DataBits {
    Seven = 1,
    Eight = 2,
    Nine = 3,
    /// 10 and more are SPI only.
    Ten = 4,
    Eleven = 5,
    Twelve = 6,
    Thirteen = 7,
    Fourteen = 8,
    Fifteen = 9,
    Sixteen = 10,
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
pub enum Oversampling {
    X16 = 0,
    X8 = 1,
    X6 = 2,
    X4 = 3,
    /// Required with a low frequency clock.
    Disable = 4,
}

impl Oversampling {
    /// Samples taken per bit.
    pub const fn factor(self) -> u32 {
        match self {
            Oversampling::X16 => 16,
            Oversampling::X8 => 8,
            Oversampling::X6 => 6,
            Oversampling::X4 => 4,
            Oversampling::Disable => 1,
        }
    }

    fn from_field(value: u32) -> Option<Oversampling> {
        match value {
            0 => Some(Oversampling::X16),
            1 => Some(Oversampling::X8),
            2 => Some(Oversampling::X6),
            3 => Some(Oversampling::X4),
            4 => Some(Oversampling::Disable),
            _ => None,
        }
    }
}

/// Majority vote over the middle samples of each bit, for X16, X8 and X6.
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

/// RX/TX line inversion. Written as a two bit value at `CFG0.RXINV`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum InvertIo {
    Disable = 0,
    Rx = 1,
    Tx = 2,
    Both = 3,
}

impl InvertIo {
    fn fields(self) -> FieldValue<u32, CFG0::Register> {
        CFG0::RXINV.val(self as u32 & 1) + CFG0::TXINV.val((self as u32 >> 1) & 1)
    }
}

/// Delay between the end of one frame and the start of the next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum AutoTxDelay {
    None = 0,
    Single = 1,
    Double = 2,
    Triple = 3,
}

/// FIFO level at which RXFL/TXFL are raised, in frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FifoWatermark(u8);

impl FifoWatermark {
    pub const ONE_FRAME: FifoWatermark = FifoWatermark(0);

    /// `frames` must be in `1..=16`.
    pub fn frames(frames: u8) -> FifoWatermark {
        param_check!((1..=16).contains(&frames));
        FifoWatermark(frames.wrapping_sub(1) & 0xF)
    }

    fn value(self) -> u32 {
        self.0 as u32
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IrdaMode {
    HighFrequency,
    LowFrequency,
}

/// IrDA pulse width, in sixteenths of a bit period.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum IrdaPulseWidth {
    One = 0,
    Two = 1,
    Three = 2,
    Four = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum CsPolarity {
    ActiveLow = 0,
    ActiveHigh = 1,
}

/// SPI clock mode, in the usual CPOL/CPHA numbering.
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
    fn fields(self) -> FieldValue<u32, CFG2::Register> {
        let (pol, pha) = match self {
            ClockMode::Mode0 => (0, 0),
            ClockMode::Mode1 => (0, 1),
            ClockMode::Mode2 => (1, 0),
            ClockMode::Mode3 => (1, 1),
        };
        CFG2::CLKPOL.val(pol) + CFG2::CLKPHA.val(pha)
    }
}

/// Number of data bits in a DALI frame, 8 to 32.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DaliDataBits(u8);

impl DaliDataBits {
    pub const EIGHT: DaliDataBits = DaliDataBits(8);
    pub const SIXTEEN: DaliDataBits = DaliDataBits(16);
    pub const TWENTY_FOUR: DaliDataBits = DaliDataBits(24);
    pub const THIRTY_TWO: DaliDataBits = DaliDataBits(32);

    pub fn new(bits: u8) -> DaliDataBits {
        param_check!((8..=32).contains(&bits));
        DaliDataBits(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// 32-bit DALI frames move through the 16-bit FIFO as two halves.
    fn packets(self) -> u8 {
        if self.0 <= 16 {
            1
        } else {
            2
        }
    }

    fn value(self) -> u32 {
        self.0.wrapping_sub(8) as u32
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UartAdvancedInit {
    pub collision_detect: bool,
    pub msb_first: bool,
    pub dma_wakeup_on_rx: bool,
    pub dma_wakeup_on_tx: bool,
    pub dma_halt_on_error: bool,
    pub tx_auto_tristate: bool,
    /// Take RX from `prs_rx_channel` instead of the pin.
    pub prs_rx_enable: bool,
    pub multi_processor_enable: bool,
    pub multi_processor_address_bit_high: bool,
    pub prs_rx_channel: u8,
    /// Frame that triggers STARTF, or 0 for none.
    pub start_frame: u16,
    pub hw_flow_control: HwFlowControl,
    pub invert_io: InvertIo,
    pub auto_tx_delay: AutoTxDelay,
    pub rx_fifo_watermark: FifoWatermark,
    pub tx_fifo_watermark: FifoWatermark,
}

impl UartAdvancedInit {
    /// Advanced settings usually wanted for DALI: MSB first, everything else
    /// as default.
    pub const fn dali() -> UartAdvancedInit {
        UartAdvancedInit {
            msb_first: true,
            ..UartAdvancedInit::DEFAULT
        }
    }

    const DEFAULT: UartAdvancedInit = UartAdvancedInit {
        collision_detect: false,
        msb_first: false,
        dma_wakeup_on_rx: false,
        dma_wakeup_on_tx: false,
        dma_halt_on_error: false,
        tx_auto_tristate: false,
        prs_rx_enable: false,
        multi_processor_enable: false,
        multi_processor_address_bit_high: false,
        prs_rx_channel: 0,
        start_frame: 0,
        hw_flow_control: HwFlowControl::None,
        invert_io: InvertIo::Disable,
        auto_tx_delay: AutoTxDelay::None,
        rx_fifo_watermark: FifoWatermark::ONE_FRAME,
        tx_fifo_watermark: FifoWatermark::ONE_FRAME,
    };
}

impl Default for UartAdvancedInit {
    fn default() -> Self {
        UartAdvancedInit::DEFAULT
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UartInit {
    /// Raw `CLKDIV.DIV` value, see [`uart_calculate_clock_div`].
    pub clock_div: u32,
    pub oversampling: Oversampling,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub majority_vote: MajorityVote,
    pub loopback_enable: bool,
    pub advanced: Option<UartAdvancedInit>,
}

impl UartInit {
    /// Low frequency clock: oversampling and majority vote disabled.
    pub const fn low_frequency() -> UartInit {
        UartInit {
            oversampling: Oversampling::Disable,
            majority_vote: MajorityVote::Disable,
            ..UartInit::HIGH_FREQUENCY
        }
    }

    const HIGH_FREQUENCY: UartInit = UartInit {
        clock_div: 0,
        oversampling: Oversampling::X16,
        data_bits: DataBits::Eight,
        parity: Parity::None,
        stop_bits: StopBits::One,
        majority_vote: MajorityVote::Enable,
        loopback_enable: false,
        advanced: None,
    };
}

impl Default for UartInit {
    /// High frequency clock, 8N1, X16 oversampling.
    fn default() -> Self {
        UartInit::HIGH_FREQUENCY
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IrdaInit {
    pub hf_rx_filter_enable: bool,
    pub irda_mode: IrdaMode,
    pub pulse_width: IrdaPulseWidth,
    pub uart: UartInit,
}

impl IrdaInit {
    pub const fn low_frequency() -> IrdaInit {
        IrdaInit {
            hf_rx_filter_enable: false,
            irda_mode: IrdaMode::LowFrequency,
            pulse_width: IrdaPulseWidth::One,
            uart: UartInit::low_frequency(),
        }
    }
}

impl Default for IrdaInit {
    fn default() -> Self {
        IrdaInit {
            hf_rx_filter_enable: false,
            irda_mode: IrdaMode::HighFrequency,
            pulse_width: IrdaPulseWidth::One,
            uart: UartInit::HIGH_FREQUENCY,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DaliInit {
    pub low_frequency_enable: bool,
    pub tx_data_bits: DaliDataBits,
    pub rx_data_bits: DaliDataBits,
    pub uart: UartInit,
}

impl DaliInit {
    pub const fn low_frequency() -> DaliInit {
        DaliInit {
            low_frequency_enable: true,
            tx_data_bits: DaliDataBits::SIXTEEN,
            rx_data_bits: DaliDataBits::EIGHT,
            uart: UartInit::low_frequency(),
        }
    }
}

impl Default for DaliInit {
    /// Forward frames of 16 bits, backward frames of 8.
    fn default() -> Self {
        DaliInit {
            low_frequency_enable: false,
            tx_data_bits: DaliDataBits::SIXTEEN,
            rx_data_bits: DaliDataBits::EIGHT,
            uart: UartInit::HIGH_FREQUENCY,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpiAdvancedInit {
    pub auto_cs_enable: bool,
    pub msb_first: bool,
    pub dma_wakeup_on_rx: bool,
    pub prs_rx_enable: bool,
    /// Slave: load TX data into the shift register as soon as it is written.
    pub force_load: bool,
    pub prs_clock_enable: bool,
    pub auto_tx_enable: bool,
    pub prs_rx_channel: u8,
    pub prs_clock_channel: u8,
    /// Slave setup window before the sampling edge, in peripheral clocks.
    pub setup_window: u8,
    pub cs_polarity: CsPolarity,
    pub invert_io: InvertIo,
    /// Baud cycles, 0 to 7.
    pub auto_cs_setup_time: u8,
    /// Baud cycles, 0 to 7.
    pub auto_cs_hold_time: u8,
    /// Baud cycles between frames, 0 to 7.
    pub auto_inter_frame_time: u8,
    pub default_tx_data: u16,
    pub rx_fifo_watermark: FifoWatermark,
    pub tx_fifo_watermark: FifoWatermark,
}

impl Default for SpiAdvancedInit {
    fn default() -> Self {
        SpiAdvancedInit {
            auto_cs_enable: true,
            msb_first: false,
            dma_wakeup_on_rx: false,
            prs_rx_enable: false,
            force_load: true,
            prs_clock_enable: false,
            auto_tx_enable: false,
            prs_rx_channel: 0,
            prs_clock_channel: 1,
            setup_window: 4,
            cs_polarity: CsPolarity::ActiveLow,
            invert_io: InvertIo::Disable,
            auto_cs_setup_time: 0,
            auto_cs_hold_time: 0,
            auto_inter_frame_time: 0,
            default_tx_data: 0,
            rx_fifo_watermark: FifoWatermark::ONE_FRAME,
            tx_fifo_watermark: FifoWatermark::ONE_FRAME,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpiInit {
    pub master: bool,
    /// `CFG2.SDIV`, see [`spi_calculate_clock_div`].
    pub clock_div: u32,
    pub data_bits: DataBits,
    pub clock_mode: ClockMode,
    pub loopback_enable: bool,
    pub advanced: Option<SpiAdvancedInit>,
}

impl SpiInit {
    pub const fn slave() -> SpiInit {
        SpiInit {
            master: false,
            clock_div: 0,
            data_bits: DataBits::Eight,
            clock_mode: ClockMode::Mode0,
            loopback_enable: false,
            advanced: None,
        }
    }
}

impl Default for SpiInit {
    /// Master, 8 data bits, mode 0.
    fn default() -> Self {
        SpiInit {
            master: true,
            ..SpiInit::slave()
        }
    }
}

/// The PRS consumer inputs belonging to one EUSART instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EusartConsumers {
    pub clk: Consumer,
    pub rx: Consumer,
    pub trigger: Consumer,
}

impl EusartConsumers {
    pub const EUSART0: EusartConsumers = EusartConsumers {
        clk: Consumer::EUSART0_CLK,
        rx: Consumer::EUSART0_RX,
        trigger: Consumer::EUSART0_TRIGGER,
    };
}

/// Compute the `CLKDIV.DIV` value giving `baudrate` from `ref_freq` in an
/// asynchronous mode.
///
/// The result truncates toward a faster baud rate. Panics (with parameter
/// checks on) when the baud rate is zero, too fast for the oversampling, or
/// too slow to fit the divider field.
pub fn uart_calculate_clock_div(ref_freq: u32, baudrate: u32, ovs: Oversampling) -> u32 {
    param_check!(baudrate != 0);

    match ovs {
        Oversampling::X16 => param_check!(baudrate <= ref_freq / 16),
        Oversampling::X8 => param_check!(baudrate <= ref_freq / 8),
        Oversampling::Disable => param_check!(ref_freq as u64 >= 3 * baudrate as u64),
        Oversampling::X6 => param_check!(baudrate <= ref_freq / 6),
        Oversampling::X4 => param_check!(baudrate <= ref_freq / 4),
    }

    let oversample = ovs.factor() as u64;
    let clk_div = (32 * ref_freq as u64 / (baudrate as u64 * oversample))
        .wrapping_sub(32)
        .wrapping_mul(8);

    param_check!(clk_div <= CLKDIV_DIV_MASK as u64);
    ((clk_div as u32) & CLKDIV_DIV_MASK) >> CLKDIV::DIV.shift
}

/// Baud rate produced by a raw `CLKDIV.DIV` value. Inverse of
/// [`uart_calculate_clock_div`], up to rounding.
pub fn uart_calculate_baudrate(clk_div: u32, ovs: Oversampling, ref_freq: u32) -> u32 {
    let div = clk_div << CLKDIV::DIV.shift;
    param_check!(div <= CLKDIV_DIV_MASK);

    // Split into quotient and remainder so 256 * freq never overflows.
    let divisor = ovs.factor() * (256 + div);
    let quotient = ref_freq / divisor;
    let remainder = ref_freq % divisor;

    256 * quotient + (256 * remainder as u64 / divisor as u64) as u32
}

/// `CFG2.SDIV` value for an SPI bit rate of `baudrate`.
pub fn spi_calculate_clock_div(ref_freq: u32, baudrate: u32) -> u32 {
    param_check!(baudrate != 0);
    param_check!(baudrate <= ref_freq);

    let div = (ref_freq / baudrate).wrapping_sub(1);
    param_check!(div <= SPI_CLKDIV_MAX);
    div
}

pub fn spi_calculate_baudrate(clk_div: u32, ref_freq: u32) -> u32 {
    param_check!(ref_freq != 0);
    ref_freq / (clk_div + 1)
}

pub struct Eusart<'a> {
    registers: StaticRef<EusartRegisters>,
    prs: &'a Prs,
    consumers: EusartConsumers,
    dali_tx_packets: Cell<u8>,
    dali_rx_packets: Cell<u8>,
}

impl<'a> Eusart<'a> {
    pub const fn new(
        base: StaticRef<EusartRegisters>,
        prs: &'a Prs,
        consumers: EusartConsumers,
    ) -> Eusart<'a> {
        Eusart {
            registers: base,
            prs,
            consumers,
            dali_tx_packets: Cell::new(1),
            dali_rx_packets: Cell::new(1),
        }
    }

    /// Asynchronous UART from the high frequency clock.
    pub fn init_uart_hf(&self, init: &UartInit) {
        param_check!(init.oversampling != Oversampling::Disable);
        param_check!(init.data_bits as u32 <= DataBits::Nine as u32);

        self.async_init_common(init, None, None);
    }

    /// Asynchronous UART from a low frequency clock.
    pub fn init_uart_lf(&self, init: &UartInit) {
        param_check!(init.data_bits as u32 <= DataBits::Nine as u32);
        param_check!(init.oversampling == Oversampling::Disable);
        param_check!(init.majority_vote == MajorityVote::Disable);
        param_check!(init.stop_bits == StopBits::One || init.stop_bits == StopBits::Two);

        self.async_init_common(init, None, None);
    }

    pub fn init_irda(&self, init: &IrdaInit) {
        match init.irda_mode {
            IrdaMode::LowFrequency => {
                param_check!(init.uart.oversampling == Oversampling::Disable);
                param_check!(
                    init.uart.stop_bits == StopBits::One || init.uart.stop_bits == StopBits::Two
                );
            }
            IrdaMode::HighFrequency => {
                param_check!(init.uart.oversampling != Oversampling::Disable);
            }
        }

        self.async_init_common(&init.uart, Some(init), None);
    }

    pub fn init_dali(&self, init: &DaliInit) {
        if init.uart.loopback_enable {
            // The receiver only sees the transmitter when both frame sizes
            // agree.
            param_check!(init.tx_data_bits == init.rx_data_bits);
        }

        if init.low_frequency_enable {
            param_check!(init.uart.oversampling == Oversampling::Disable);
        } else {
            param_check!(init.uart.oversampling != Oversampling::Disable);
        }

        self.async_init_common(&init.uart, None, Some(init));
    }

    pub fn init_spi(&self, init: &SpiInit) {
        self.sync_init_common(init);
    }

    fn async_init_common(
        &self,
        init: &UartInit,
        irda: Option<&IrdaInit>,
        dali: Option<&DaliInit>,
    ) {
        let regs = self.registers;
        if CONFIG.trace_init {
            debug!(
                "eusart: async init div {} ovs {:?} irda {} dali {}",
                init.clock_div,
                init.oversampling,
                irda.is_some(),
                dali.is_some()
            );
        }

        self.reset();

        regs.framecfg.modify(
            FRAMECFG::DATABITS.val(init.data_bits as u32)
                + FRAMECFG::PARITY.val(init.parity as u32)
                + FRAMECFG::STOPBITS.val(init.stop_bits as u32),
        );
        regs.cfg0.modify(
            CFG0::OVS.val(init.oversampling as u32)
                + CFG0::LOOPBK.val(init.loopback_enable as u32)
                + CFG0::MVDIS.val(init.majority_vote as u32),
        );
        regs.clkdiv
            .set((init.clock_div << CLKDIV::DIV.shift) & CLKDIV_DIV_MASK);

        if let Some(adv) = init.advanced.as_ref() {
            self.uart_advanced_init(adv);
        }

        if let Some(irda) = irda {
            match irda.irda_mode {
                IrdaMode::LowFrequency => regs.irlfcfg.set_bits(IRLFCFG::IRLFEN::SET),
                IrdaMode::HighFrequency => regs.irhfcfg.set_bits(
                    IRHFCFG::IRHFEN::SET
                        + IRHFCFG::IRHFPW.val(irda.pulse_width as u32)
                        + IRHFCFG::IRHFFILT.val(irda.hf_rx_filter_enable as u32),
                ),
            }
        }

        if let Some(dali) = dali {
            if init.loopback_enable {
                regs.dalicfg.set_bits(DALICFG::DALIRXENDT.val(1));
            }

            self.dali_tx_packets.set(dali.tx_data_bits.packets());
            self.dali_rx_packets.set(dali.rx_data_bits.packets());

            regs.dalicfg.modify(
                DALICFG::DALITXDATABITS.val(dali.tx_data_bits.value())
                    + DALICFG::DALIRXDATABITS.val(dali.rx_data_bits.value()),
            );
            regs.dalicfg.set_bits(DALICFG::DALIEN::SET);
        }
    }

    fn uart_advanced_init(&self, adv: &UartAdvancedInit) {
        let regs = self.registers;

        regs.cfg0.modify(
            CFG0::ERRSDMA.val(adv.dma_halt_on_error as u32)
                + CFG0::AUTOTRI.val(adv.tx_auto_tristate as u32)
                + adv.invert_io.fields()
                + CFG0::CCEN.val(adv.collision_detect as u32)
                + CFG0::MPM.val(adv.multi_processor_enable as u32)
                + CFG0::MPAB.val(adv.multi_processor_address_bit_high as u32)
                + CFG0::MSBF.val(adv.msb_first as u32),
        );
        regs.cfg1.modify(
            CFG1::RXFIW.val(adv.rx_fifo_watermark.value())
                + CFG1::TXFIW.val(adv.tx_fifo_watermark.value())
                + CFG1::RXDMAWU.val(adv.dma_wakeup_on_rx as u32)
                + CFG1::TXDMAWU.val(adv.dma_wakeup_on_tx as u32),
        );

        // RTS is an output and needs its GPIO route enabled by the board.
        if matches!(adv.hw_flow_control, HwFlowControl::Cts | HwFlowControl::CtsRts) {
            regs.cfg1.set_bits(CFG1::CTSEN::SET);
        }

        regs.startframecfg.set_mask(adv.start_frame as u32);
        if adv.start_frame != 0 {
            regs.cfg1.set_bits(CFG1::SFUBRX::SET);
        }

        if adv.prs_rx_enable {
            regs.cfg1.set_bits(CFG1::RXPRSEN::SET);
            self.prs
                .connect_channel_consumer(adv.prs_rx_channel, ChannelType::Async, self.consumers.rx);
        }

        regs.timingcfg
            .modify(TIMINGCFG::TXDELAY.val(adv.auto_tx_delay as u32));
    }

    fn sync_init_common(&self, init: &SpiInit) {
        let regs = self.registers;
        if CONFIG.trace_init {
            debug!(
                "eusart: spi init master {} div {} mode {:?}",
                init.master, init.clock_div, init.clock_mode
            );
        }

        self.reset();

        regs.cfg2.modify(
            CFG2::MASTER.val(init.master as u32) + init.clock_mode.fields() + CFG2::FORCELOAD::SET,
        );
        regs.cfg0
            .modify(CFG0::SYNC::SET + CFG0::LOOPBK.val(init.loopback_enable as u32));
        regs.framecfg
            .modify(FRAMECFG::DATABITS.val(init.data_bits as u32));

        param_check!(init.clock_div <= SPI_CLKDIV_MAX);
        regs.cfg2.modify(CFG2::SDIV.val(init.clock_div & SPI_CLKDIV_MAX));

        if let Some(adv) = init.advanced.as_ref() {
            self.spi_advanced_init(adv);
        }
    }

    fn spi_advanced_init(&self, adv: &SpiAdvancedInit) {
        let regs = self.registers;
        param_check!(adv.auto_cs_setup_time <= 7);
        param_check!(adv.auto_cs_hold_time <= 7);
        param_check!(adv.auto_inter_frame_time <= 7);
        param_check!(adv.setup_window <= 15);

        regs.cfg2.modify(
            CFG2::FORCELOAD.val(adv.force_load as u32)
                + CFG2::AUTOCS.val(adv.auto_cs_enable as u32)
                + CFG2::AUTOTX.val(adv.auto_tx_enable as u32)
                + CFG2::CSINV.val(adv.cs_polarity as u32)
                + CFG2::CLKPRSEN.val(adv.prs_clock_enable as u32),
        );
        regs.cfg1.modify(
            CFG1::RXFIW.val(adv.rx_fifo_watermark.value())
                + CFG1::TXFIW.val(adv.tx_fifo_watermark.value())
                + CFG1::RXDMAWU.val(adv.dma_wakeup_on_rx as u32)
                + CFG1::RXPRSEN.val(adv.prs_rx_enable as u32),
        );
        regs.cfg0.modify(adv.invert_io.fields());
        if adv.msb_first {
            regs.cfg0.set_bits(CFG0::MSBF::SET);
        }
        regs.timingcfg.modify(
            TIMINGCFG::CSSETUP.val(adv.auto_cs_setup_time as u32)
                + TIMINGCFG::CSHOLD.val(adv.auto_cs_hold_time as u32)
                + TIMINGCFG::ICS.val(adv.auto_inter_frame_time as u32)
                + TIMINGCFG::SETUPWINDOW.val(adv.setup_window as u32),
        );
        regs.dtxdatcfg
            .write(DTXDATCFG::DTXDAT.val(adv.default_tx_data as u32));

        if adv.prs_rx_enable {
            self.prs
                .connect_channel_consumer(adv.prs_rx_channel, ChannelType::Async, self.consumers.rx);
        }
        if adv.prs_clock_enable {
            self.prs.connect_channel_consumer(
                adv.prs_clock_channel,
                ChannelType::Async,
                self.consumers.clk,
            );
        }
    }

    /// Disable the block and return every configuration register to its
    /// reset value. Drains and clears both FIFOs.
    pub fn reset(&self) {
        let regs = self.registers;
        if CONFIG.trace_init {
            debug!("eusart: reset");
        }

        self.disable_tx();
        self.disable_rx();
        self.wait_sync((SYNCBUSY::RXDIS::SET + SYNCBUSY::TXDIS::SET).value);
        self.disable();
        self.wait_ready();

        self.clear_rx();
        self.clear_tx();

        regs.cfg2.set(0);
        regs.cfg1.set(0);
        regs.cfg0.set(0);
        regs.framecfg.set(FRAMECFG_RESET);
        regs.timingcfg.set(TIMINGCFG_RESET);
        regs.irhfcfg.set(0);
        regs.irlfcfg.set(0);
        regs.dtxdatcfg.set(0);
        regs.dalicfg.set(0);
        regs.startframecfg.set(0);
        regs.sigframecfg.set(0);
        regs.ien.set(0);
        regs.intflag.clear_mask(INT_ALL);

        regs.clkdiv.set(0);
        regs.trigctrl.set(0);
        // CLKDIV is rewritten after TRIGCTRL so the divider sync completes last.
        regs.clkdiv.set(0);
    }

    /// Receive one frame.
    ///
    /// With the RX watermark at one frame this waits for RXFL. With a higher
    /// watermark RXFL may stay low while frames are queued, so this reads
    /// immediately and retries after an underflow.
    pub fn rx(&self) -> u16 {
        let regs = self.registers;

        if regs.cfg1.read(CFG1::RXFIW) == 0 {
            while !regs.status.is_set(STATUS::RXFL) {}
            return regs.rxdata.read(DATA::DATA) as u16;
        }

        let mut data = regs.rxdata.read(DATA::DATA) as u16;
        if regs.intflag.is_set(INT::RXUF) {
            while !regs.status.is_set(STATUS::RXFL) {}
            data = regs.rxdata.read(DATA::DATA) as u16;
        }
        data
    }

    /// Receive one frame with the status bits above the data.
    pub fn rx_extended(&self) -> u16 {
        let regs = self.registers;
        while !regs.status.is_set(STATUS::RXFL) {}
        regs.rxdata.get() as u16
    }

    pub fn tx(&self, data: u8) {
        let regs = self.registers;
        while !regs.status.is_set(STATUS::TXFL) {}
        regs.txdata.set(data as u32);
    }

    pub fn tx_extended(&self, data: u16) {
        let regs = self.registers;
        while !regs.status.is_set(STATUS::TXFL) {}
        regs.txdata.set(data as u32);
    }

    /// Full-duplex SPI: send one frame and return the frame clocked in.
    pub fn spi_tx_rx(&self, data: u16) -> u16 {
        let regs = self.registers;
        while !regs.status.is_set(STATUS::TXFL) {}
        regs.txdata.set(data as u32);
        while !regs.status.is_set(STATUS::RXFL) {}
        regs.rxdata.get() as u16
    }

    /// Send a DALI forward frame. Frames over 16 bits go low half first.
    pub fn dali_tx(&self, data: u32) {
        let regs = self.registers;
        while !regs.status.is_set(STATUS::TXFL) {}

        regs.txdata.set(data & 0xFFFF);
        if self.dali_tx_packets.get() == 2 {
            regs.txdata.set(data >> 16);
        }
    }

    pub fn dali_rx(&self) -> u32 {
        let regs = self.registers;
        while !regs.status.is_set(STATUS::RXFL) {}

        let mut data = regs.rxdata.get() & 0xFFFF;
        if self.dali_rx_packets.get() == 2 {
            data |= (regs.rxdata.get() & 0xFFFF) << 16;
        }
        data
    }

    /// Start receiving on a rising edge of PRS `channel`.
    pub fn enable_rx_prs_trigger(&self, channel: u8) {
        let regs = self.registers;
        param_check!(regs.en.is_set(EN::EN));

        self.prs
            .connect_channel_consumer(channel, ChannelType::Async, self.consumers.trigger);
        self.wait_sync((SYNCBUSY::RXDIS::SET + SYNCBUSY::RXTEN::SET).value);
        regs.trigctrl.set_bits(TRIGCTRL::RXTEN::SET);
    }

    pub fn disable_rx_prs_trigger(&self) {
        let regs = self.registers;
        param_check!(regs.en.is_set(EN::EN));

        self.wait_sync((SYNCBUSY::RXDIS::SET + SYNCBUSY::RXTEN::SET).value);
        regs.trigctrl.clear_bits(TRIGCTRL::RXTEN::SET);
    }

    /// Start transmitting on a rising edge of PRS `channel`.
    pub fn enable_tx_prs_trigger(&self, channel: u8) {
        let regs = self.registers;
        param_check!(regs.en.is_set(EN::EN));

        self.prs
            .connect_channel_consumer(channel, ChannelType::Async, self.consumers.trigger);
        self.wait_sync((SYNCBUSY::TXDIS::SET + SYNCBUSY::TXTEN::SET).value);
        regs.trigctrl.set_bits(TRIGCTRL::TXTEN::SET);
    }

    pub fn disable_tx_prs_trigger(&self) {
        let regs = self.registers;
        param_check!(regs.en.is_set(EN::EN));

        self.wait_sync((SYNCBUSY::TXDIS::SET + SYNCBUSY::TXTEN::SET).value);
        regs.trigctrl.clear_bits(TRIGCTRL::TXTEN::SET);
    }

    /// Spin until the `SYNCBUSY` bits in `mask` clear. Returns at once when
    /// the block is disabled, since nothing synchronizes then.
    #[inline]
    pub fn wait_sync(&self, mask: u32) {
        let regs = self.registers;
        while regs.en.is_set(EN::EN) && regs.syncbusy.get() & mask != 0 {}
    }

    #[inline]
    pub fn enable(&self) {
        self.wait_sync(SYNCBUSY_ALL);
        self.registers.en.set_bits(EN::EN::SET);
    }

    /// Disable the block, draining the RX FIFO first. No-op when already
    /// disabled.
    #[inline]
    pub fn disable(&self) {
        let regs = self.registers;
        if !regs.en.is_set(EN::EN) {
            return;
        }

        while regs.status.is_set(STATUS::RXFL) {
            let _ = regs.rxdata.get();
        }
        regs.en.clear_bits(EN::EN::SET);
    }

    /// Spin until a pending disable completes.
    #[inline]
    pub fn wait_ready(&self) {
        while self.registers.en.is_set(EN::DISABLING) {}
    }

    #[inline]
    pub fn enable_rx(&self) {
        self.wait_sync(SYNCBUSY_ALL);
        self.registers.cmd.set_bits(CMD::RXEN::SET);
    }

    #[inline]
    pub fn disable_rx(&self) {
        self.wait_sync(SYNCBUSY_ALL);
        self.registers.cmd.set_bits(CMD::RXDIS::SET);
    }

    #[inline]
    pub fn enable_tx(&self) {
        self.wait_sync(SYNCBUSY_ALL);
        self.registers.cmd.set_bits(CMD::TXEN::SET);
    }

    #[inline]
    pub fn disable_tx(&self) {
        self.wait_sync(SYNCBUSY_ALL);
        self.registers.cmd.set_bits(CMD::TXDIS::SET);
    }

    /// Discard incoming frames until `disable_block_rx`.
    #[inline]
    pub fn enable_block_rx(&self) {
        self.wait_sync(SYNCBUSY::RXBLOCKEN::SET.value);
        self.registers.cmd.set_bits(CMD::RXBLOCKEN::SET);
    }

    #[inline]
    pub fn disable_block_rx(&self) {
        self.wait_sync(SYNCBUSY::RXBLOCKDIS::SET.value);
        self.registers.cmd.set_bits(CMD::RXBLOCKDIS::SET);
    }

    #[inline]
    pub fn enable_tx_tristate(&self) {
        self.wait_sync(SYNCBUSY::TXTRIEN::SET.value);
        self.registers.cmd.set_bits(CMD::TXTRIEN::SET);
    }

    #[inline]
    pub fn disable_tx_tristate(&self) {
        self.wait_sync(SYNCBUSY::TXTRIDIS::SET.value);
        self.registers.cmd.set_bits(CMD::TXTRIDIS::SET);
    }

    /// Flush the RX FIFO. The receiver must be disabled.
    #[inline]
    pub fn clear_rx(&self) {
        let regs = self.registers;
        param_check!(!regs.status.is_set(STATUS::RXENS));

        regs.cmd.set_bits(CMD::CLEARRX::SET);
        while regs.status.is_set(STATUS::CLEARRXBUSY) {}
        while regs.status.is_set(STATUS::RXFL) {
            let _ = regs.rxdata.get();
        }
    }

    /// Flush the TX FIFO. The transmitter must be disabled.
    #[inline]
    pub fn clear_tx(&self) {
        let regs = self.registers;
        param_check!(!regs.status.is_set(STATUS::TXENS));

        regs.cmd.set_bits(CMD::CLEARTX::SET);
        while regs.status.is_set(STATUS::CLEARTXBUSY) {}
    }

    #[inline]
    pub fn get_status(&self) -> LocalRegisterCopy<u32, STATUS::Register> {
        self.registers.status.extract()
    }

    /// Set the raw `CLKDIV.DIV` value, e.g. from [`uart_calculate_clock_div`].
    #[inline]
    pub fn uart_set_clock_div(&self, clock_div: u32) {
        param_check!(clock_div <= CLKDIV_MAX);

        self.wait_sync(SYNCBUSY::DIV::SET.value);
        self.registers
            .clkdiv
            .set((clock_div << CLKDIV::DIV.shift) & CLKDIV_DIV_MASK);
    }

    #[inline]
    pub fn uart_get_clock_div(&self) -> u32 {
        let regs = self.registers;
        param_check!(regs.en.is_set(EN::EN));

        self.wait_sync(SYNCBUSY::DIV::SET.value);
        regs.clkdiv.read(CLKDIV::DIV)
    }

    /// `None` if `CFG0.OVS` holds a reserved encoding.
    #[inline]
    pub fn uart_get_oversampling(&self) -> Option<Oversampling> {
        self.wait_sync(SYNCBUSY_ALL);
        Oversampling::from_field(self.registers.cfg0.read(CFG0::OVS))
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

    /// Pending interrupts that are also enabled.
    #[inline]
    pub fn get_enabled_pending_interrupts(&self) -> LocalRegisterCopy<u32, INT::Register> {
        let regs = self.registers;
        let ien = regs.ien.get();
        LocalRegisterCopy::new(regs.intflag.get() & ien)
    }

    /// Raise interrupt flags from software.
    #[inline]
    pub fn set_interrupts(&self, flags: FieldValue<u32, INT::Register>) {
        self.registers.intflag.set_bits(flags);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prs::Prs;
    use crate::test::FakeBlock;

    const EN_OFF: usize = 0x004;
    const CFG0_OFF: usize = 0x008;
    const CFG1_OFF: usize = 0x00C;
    const CFG2_OFF: usize = 0x010;
    const FRAMECFG_OFF: usize = 0x014;
    const IRHFCFG_OFF: usize = 0x01C;
    const TIMINGCFG_OFF: usize = 0x024;
    const CLKDIV_OFF: usize = 0x030;
    const TRIGCTRL_OFF: usize = 0x034;
    const RXDATA_OFF: usize = 0x03C;
    const TXDATA_OFF: usize = 0x044;
    const STATUS_OFF: usize = 0x048;
    const IF_OFF: usize = 0x04C;
    const IEN_OFF: usize = 0x050;
    const DALICFG_OFF: usize = 0x058;

    const STATUS_TXFL: u32 = 1 << 6;
    const STATUS_RXFL: u32 = 1 << 7;

    struct Fixture {
        block: FakeBlock,
        prs_block: FakeBlock,
        eusart: Eusart<'static>,
    }

    fn fixture() -> Fixture {
        let block = FakeBlock::series2();
        let prs_block = FakeBlock::series2();
        let gpio = FakeBlock::new(0x100);
        let prs: &'static Prs = std::boxed::Box::leak(std::boxed::Box::new(Prs::new(
            prs_block.registers(),
            gpio.registers(),
        )));
        let eusart = Eusart::new(block.registers(), prs, EusartConsumers::EUSART0);
        Fixture {
            block,
            prs_block,
            eusart,
        }
    }

    #[test]
    fn clock_div_matches_reference_values() {
        assert_eq!(uart_calculate_clock_div(32_000_000, 9600, Oversampling::X16), 6634);
        assert_eq!(uart_calculate_clock_div(40_000_000, 115_200, Oversampling::X16), 662);
    }

    #[test]
    fn clock_div_truncates() {
        // 32 * 39 MHz / (16 * 115200) = 677.08, minus 32, times 8 = 5160
        assert_eq!(uart_calculate_clock_div(39_000_000, 115_200, Oversampling::X16), 645);
        assert_eq!(uart_calculate_clock_div(39_000_000, 115_200, Oversampling::X16) << 3, 5160);
    }

    #[test]
    fn oversampling_disabled_divider() {
        // 32 * 32768 / 9600 = 109 truncated, minus 32
        assert_eq!(uart_calculate_clock_div(32_768, 9600, Oversampling::Disable), 77);
        assert_eq!(
            uart_calculate_baudrate(77, Oversampling::Disable, 32_768),
            32_768 * 256 / (256 + 77 * 8)
        );
    }

    #[test]
    fn x6_and_x4_accept_their_limit() {
        assert_eq!(uart_calculate_clock_div(600_000, 100_000, Oversampling::X6), 0);
        assert_eq!(uart_calculate_clock_div(400_000, 100_000, Oversampling::X4), 0);
    }

    #[test]
    #[should_panic]
    fn x6_rejects_baudrate_above_ref_over_6() {
        uart_calculate_clock_div(600_000, 100_001, Oversampling::X6);
    }

    #[test]
    #[should_panic]
    fn x4_rejects_baudrate_above_ref_over_4() {
        uart_calculate_clock_div(400_000, 100_001, Oversampling::X4);
    }

    #[test]
    fn baudrate_recovers_exact_divider() {
        assert_eq!(uart_calculate_baudrate(6634, Oversampling::X16, 32_000_000), 9600);
    }

    #[test]
    fn baudrate_round_trip_is_close() {
        for &(freq, baud, ovs) in &[
            (40_000_000, 115_200, Oversampling::X16),
            (39_000_000, 921_600, Oversampling::X8),
            (19_000_000, 1_000_000, Oversampling::X6),
            (38_400_000, 2_000_000, Oversampling::X4),
            (32_000_000, 57_600, Oversampling::X16),
        ] {
            let div = uart_calculate_clock_div(freq, baud, ovs);
            let back = uart_calculate_baudrate(div, ovs, freq);
            // Truncation makes the divider small, so the baud rate comes back
            // high, by less than one divider step.
            let next = uart_calculate_baudrate(div + 1, ovs, freq);
            assert!(back >= baud, "{} -> {} -> {}", baud, div, back);
            assert!(next <= baud, "{} -> {} -> {}", baud, div + 1, next);
        }
    }

    #[test]
    #[should_panic]
    fn zero_baudrate_is_rejected() {
        uart_calculate_clock_div(32_000_000, 0, Oversampling::X16);
    }

    #[test]
    #[should_panic]
    fn baudrate_above_oversampled_limit_is_rejected() {
        uart_calculate_clock_div(16_000_000, 1_000_001, Oversampling::X16);
    }

    #[test]
    #[should_panic]
    fn divider_field_overflow_is_rejected() {
        // 32 * 40 MHz / (16 * 1) is far more than 20 bits.
        uart_calculate_clock_div(40_000_000, 1, Oversampling::X16);
    }

    #[test]
    fn spi_divider() {
        assert_eq!(spi_calculate_clock_div(40_000_000, 10_000_000), 3);
        assert_eq!(spi_calculate_baudrate(3, 40_000_000), 10_000_000);
        assert_eq!(spi_calculate_clock_div(40_000_000, 40_000_000), 0);
    }

    #[test]
    #[should_panic]
    fn spi_divider_too_large_is_rejected() {
        spi_calculate_clock_div(40_000_000, 100_000);
    }

    #[test]
    fn uart_hf_init_programs_frame_oversampling_and_divider() {
        let f = fixture();
        let init = UartInit {
            clock_div: uart_calculate_clock_div(40_000_000, 115_200, Oversampling::X8),
            oversampling: Oversampling::X8,
            parity: Parity::Even,
            stop_bits: StopBits::Two,
            ..UartInit::default()
        };
        f.eusart.init_uart_hf(&init);

        let framecfg = f.block.peek(FRAMECFG_OFF);
        assert_eq!(framecfg & 0xF, DataBits::Eight as u32);
        assert_eq!((framecfg >> 8) & 0x3, 2);
        assert_eq!((framecfg >> 12) & 0x3, 3);

        let cfg0 = f.block.peek(CFG0_OFF);
        assert_eq!((cfg0 >> 5) & 0x7, 1);
        assert_eq!(cfg0 & (1 << 30), 0);
        assert_eq!(cfg0 & (1 << 1), 0);

        assert_eq!(f.block.peek(CLKDIV_OFF), (init.clock_div << 3) & CLKDIV_DIV_MASK);
    }

    #[test]
    fn uart_lf_init_disables_majority_vote() {
        let f = fixture();
        f.eusart.init_uart_lf(&UartInit {
            clock_div: 77,
            ..UartInit::low_frequency()
        });

        let cfg0 = f.block.peek(CFG0_OFF);
        assert_eq!((cfg0 >> 5) & 0x7, Oversampling::Disable as u32);
        assert_ne!(cfg0 & (1 << 30), 0);
        assert_eq!(f.block.peek(CLKDIV_OFF), 77 << 3);
    }

    #[test]
    #[should_panic]
    fn uart_hf_rejects_disabled_oversampling() {
        let f = fixture();
        f.eusart.init_uart_hf(&UartInit::low_frequency());
    }

    #[test]
    #[should_panic]
    fn uart_lf_rejects_half_stop_bit() {
        let f = fixture();
        f.eusart.init_uart_lf(&UartInit {
            stop_bits: StopBits::Half,
            ..UartInit::low_frequency()
        });
    }

    #[test]
    fn reset_restores_defaults_and_clears_flags() {
        let f = fixture();
        f.block.poke(CFG0_OFF, 0xFFFF_FFFF);
        f.block.poke(TRIGCTRL_OFF, 0x3);
        f.block.poke(IEN_OFF, 0x0000_00FF);
        f.block.poke(IF_OFF, 0x0000_0123);

        f.eusart.reset();

        assert_eq!(f.block.peek(CFG0_OFF), 0);
        assert_eq!(f.block.peek(FRAMECFG_OFF), FRAMECFG_RESET);
        assert_eq!(f.block.peek(TIMINGCFG_OFF), TIMINGCFG_RESET);
        assert_eq!(f.block.peek(TRIGCTRL_OFF), 0);
        assert_eq!(f.block.peek(IEN_OFF), 0);
        assert_eq!(f.block.peek(IF_OFF), 0);
        // IF is cleared through its CLR alias with every flag.
        assert_eq!(f.block.peek(IF_OFF + 0x2000), INT_ALL);
    }

    #[test]
    fn disable_is_a_no_op_when_not_enabled() {
        let f = fixture();
        f.block.poke(STATUS_OFF, STATUS_RXFL);
        // With EN clear, disable must not try to drain the FIFO.
        f.eusart.disable();
        assert_eq!(f.block.peek(EN_OFF + 0x2000), 0);
    }

    #[test]
    fn advanced_uart_config() {
        let f = fixture();
        f.eusart.init_uart_hf(&UartInit {
            advanced: Some(UartAdvancedInit {
                msb_first: true,
                invert_io: InvertIo::Both,
                hw_flow_control: HwFlowControl::CtsRts,
                start_frame: 0x55,
                prs_rx_enable: true,
                prs_rx_channel: 3,
                auto_tx_delay: AutoTxDelay::Double,
                rx_fifo_watermark: FifoWatermark::frames(4),
                ..UartAdvancedInit::default()
            }),
            ..UartInit::default()
        });

        let cfg0 = f.block.peek(CFG0_OFF);
        assert_ne!(cfg0 & (1 << 10), 0);
        assert_eq!(cfg0 & (0x3 << 13), 0x3 << 13);

        let cfg1 = f.block.peek(CFG1_OFF);
        assert_ne!(cfg1 & (1 << 2), 0);
        assert_ne!(cfg1 & (1 << 11), 0);
        assert_ne!(cfg1 & (1 << 15), 0);
        assert_eq!((cfg1 >> 27) & 0xF, 3);

        assert_eq!(f.block.peek(0x028), 0x55);
        assert_eq!(f.block.peek(TIMINGCFG_OFF) & 0x3, 2);
        assert_eq!(f.prs_block.peek(Consumer::EUSART0_RX.offset()), 3);
    }

    #[test]
    fn irda_hf_sets_pulse_width_and_filter() {
        let f = fixture();
        f.eusart.init_irda(&IrdaInit {
            hf_rx_filter_enable: true,
            pulse_width: IrdaPulseWidth::Three,
            ..IrdaInit::default()
        });

        assert_eq!(f.block.peek(IRHFCFG_OFF), 0x1 | (2 << 1) | (1 << 3));
    }

    #[test]
    fn irda_lf_sets_irlfen() {
        let f = fixture();
        f.eusart.init_irda(&IrdaInit::low_frequency());
        assert_eq!(f.block.peek(0x020), 1);
    }

    #[test]
    fn dali_splits_and_joins_long_frames() {
        let f = fixture();
        f.eusart.init_dali(&DaliInit {
            tx_data_bits: DaliDataBits::TWENTY_FOUR,
            rx_data_bits: DaliDataBits::THIRTY_TWO,
            ..DaliInit::default()
        });

        let dalicfg = f.block.peek(DALICFG_OFF);
        assert_ne!(dalicfg & 1, 0);
        assert_eq!((dalicfg >> 1) & 0x1F, 16);
        assert_eq!((dalicfg >> 8) & 0x1F, 24);

        f.block.poke(STATUS_OFF, STATUS_TXFL);
        f.eusart.dali_tx(0x00AB_CDEF);
        // The second half is written last.
        assert_eq!(f.block.peek(TXDATA_OFF), 0x00AB);

        f.block.poke(STATUS_OFF, STATUS_RXFL);
        f.block.poke(RXDATA_OFF, 0x1234);
        assert_eq!(f.eusart.dali_rx(), 0x1234_1234);
    }

    #[test]
    fn dali_short_frames_use_one_packet() {
        let f = fixture();
        f.eusart.init_dali(&DaliInit::default());

        f.block.poke(STATUS_OFF, STATUS_TXFL);
        f.eusart.dali_tx(0xFFFF_1234);
        assert_eq!(f.block.peek(TXDATA_OFF), 0x1234);

        f.block.poke(STATUS_OFF, STATUS_RXFL);
        f.block.poke(RXDATA_OFF, 0x0001_00A5);
        assert_eq!(f.eusart.dali_rx(), 0x00A5);
    }

    #[test]
    #[should_panic]
    fn dali_loopback_needs_equal_frame_sizes() {
        let f = fixture();
        f.eusart.init_dali(&DaliInit {
            uart: UartInit {
                loopback_enable: true,
                ..UartInit::default()
            },
            ..DaliInit::default()
        });
    }

    #[test]
    fn spi_init_programs_cfg2() {
        let f = fixture();
        f.eusart.init_spi(&SpiInit {
            clock_div: 3,
            clock_mode: ClockMode::Mode3,
            data_bits: DataBits::Sixteen,
            advanced: Some(SpiAdvancedInit {
                msb_first: true,
                auto_cs_hold_time: 2,
                default_tx_data: 0xBEEF,
                prs_clock_enable: true,
                ..SpiAdvancedInit::default()
            }),
            ..SpiInit::default()
        });

        let cfg2 = f.block.peek(CFG2_OFF);
        // MASTER, CLKPOL, CLKPHA, AUTOCS, CLKPRSEN, FORCELOAD
        assert_eq!(cfg2 & 0xFF, 0x1 | 0x2 | 0x4 | 0x20 | 0x40 | 0x80);
        assert_eq!(cfg2 >> 24, 3);

        let cfg0 = f.block.peek(CFG0_OFF);
        assert_ne!(cfg0 & 1, 0);
        assert_ne!(cfg0 & (1 << 10), 0);
        assert_eq!(f.block.peek(FRAMECFG_OFF) & 0xF, DataBits::Sixteen as u32);
        assert_eq!((f.block.peek(TIMINGCFG_OFF) >> 8) & 0x7, 2);
        assert_eq!((f.block.peek(TIMINGCFG_OFF) >> 16) & 0xF, 4);
        assert_eq!(f.block.peek(0x018), 0xBEEF);
        assert_eq!(f.prs_block.peek(Consumer::EUSART0_CLK.offset()), 1);
    }

    #[test]
    fn prs_trigger_connects_consumer_and_sets_trigctrl() {
        let f = fixture();
        f.block.poke(EN_OFF, 1);

        f.eusart.enable_rx_prs_trigger(6);
        assert_eq!(f.prs_block.peek(Consumer::EUSART0_TRIGGER.offset()), 6);
        assert_eq!(f.block.peek(TRIGCTRL_OFF), 0x1);

        f.eusart.enable_tx_prs_trigger(2);
        assert_eq!(f.prs_block.peek(Consumer::EUSART0_TRIGGER.offset()), 2);
        assert_eq!(f.block.peek(TRIGCTRL_OFF), 0x3);

        f.eusart.disable_rx_prs_trigger();
        assert_eq!(f.block.peek(TRIGCTRL_OFF), 0x2);
        f.eusart.disable_tx_prs_trigger();
        assert_eq!(f.block.peek(TRIGCTRL_OFF), 0x0);
    }

    #[test]
    #[should_panic]
    fn prs_trigger_requires_enabled_block() {
        let f = fixture();
        f.eusart.enable_tx_prs_trigger(0);
    }

    #[test]
    fn rx_rereads_after_underflow_with_raised_watermark() {
        let f = fixture();
        f.block.poke(CFG1_OFF, 2 << 27);
        f.block.poke(RXDATA_OFF, 0x41);
        f.block.poke(IF_OFF, 1 << 5);
        f.block.poke(STATUS_OFF, STATUS_RXFL);
        assert_eq!(f.eusart.rx(), 0x41);

        f.block.poke(CFG1_OFF, 0);
        f.block.poke(RXDATA_OFF, 0x1_0042);
        assert_eq!(f.eusart.rx(), 0x42);
        assert_eq!(f.eusart.rx_extended(), 0x0042);
    }

    #[test]
    fn clock_div_accessors() {
        let f = fixture();
        f.block.poke(EN_OFF, 1);

        f.eusart.uart_set_clock_div(662);
        assert_eq!(f.block.peek(CLKDIV_OFF), 662 << 3);
        assert_eq!(f.eusart.uart_get_clock_div(), 662);

        f.block.poke(CFG0_OFF, 3 << 5);
        assert_eq!(f.eusart.uart_get_oversampling(), Some(Oversampling::X4));
        f.block.poke(CFG0_OFF, 7 << 5);
        assert_eq!(f.eusart.uart_get_oversampling(), None);
    }

    #[test]
    fn interrupt_flags() {
        let f = fixture();

        f.eusart.enable_interrupts(INT::RXFL::SET + INT::TXC::SET);
        assert_eq!(f.block.peek(IEN_OFF), 0x5);
        f.eusart.set_interrupts(INT::RXFL::SET + INT::PERR::SET);

        let pending = f.eusart.get_pending_interrupts();
        assert!(pending.is_set(INT::PERR));
        let enabled = f.eusart.get_enabled_pending_interrupts();
        assert!(enabled.is_set(INT::RXFL));
        assert!(!enabled.is_set(INT::PERR));

        f.eusart.clear_interrupts(INT::RXFL::SET);
        assert_eq!(f.block.peek(IF_OFF), 1 << 8);
        f.eusart.disable_interrupts(INT::TXC::SET);
        assert_eq!(f.block.peek(IEN_OFF), 0x4);
    }

    #[test]
    fn block_and_tristate_commands() {
        let f = fixture();
        f.eusart.enable_block_rx();
        f.eusart.enable_tx_tristate();
        assert_eq!(f.block.peek(0x038) & 0x50, 0x50);
        assert!(!f.eusart.get_status().is_set(STATUS::RXBLOCK));
    }
}
