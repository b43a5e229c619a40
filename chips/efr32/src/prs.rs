// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Peripheral Reflex System (PRS).
//!
//! The PRS routes single-bit signals from producer peripherals to consumer
//! peripherals without CPU involvement. There are two kinds of channel:
//!
//! - 12 asynchronous channels. Each has a logic block that can combine the
//!   channel with one auxiliary channel through any two-input truth table.
//! - 4 synchronous channels, clocked by the peripheral clock.
//!
//! A producer is selected on a channel by writing its source and signal
//! numbers into the channel `CTRL` register. A consumer listens to a channel
//! by writing the channel number into its own consumer register, which lives
//! in the PRS block rather than in the consuming peripheral.
//!
//! Usage
//! -----
//!
//! ```rust,ignore
//! let ch = prs.get_free_channel(ChannelType::Async)?;
//! prs.async_init_channel(&AsyncChannelInit {
//!     channel: ch,
//!     producer: Signal::new(TIMER0_SOURCE, CC0_SIGNAL),
//!     consumer: Consumer::EUSART0_TRIGGER,
//!     ..AsyncChannelInit::default()
//! });
//! ```

use kernel::debug;
use kernel::utilities::registers::interfaces::{ReadWriteable, Readable, Writeable};
use kernel::utilities::registers::{register_bitfields, register_structs, ReadOnly, ReadWrite};
use kernel::utilities::set_clear::SetClearAlias;
use kernel::utilities::StaticRef;
use kernel::{param_check, ErrorCode};

use kernel::config::CONFIG;

pub const ASYNC_CHANNEL_COUNT: usize = 12;
pub const SYNC_CHANNEL_COUNT: usize = 4;

const CONSUMER_WINDOW_START: usize = 0x054;
const CONSUMER_COUNT: usize = 64;

register_structs! {
    pub PrsRegisters {
        (0x000 => ipversion: ReadOnly<u32>),
        (0x004 => async_swpulse: ReadWrite<u32>),
        (0x008 => async_swlevel: ReadWrite<u32>),
        (0x00C => async_peek: ReadOnly<u32>),
        (0x010 => sync_peek: ReadOnly<u32>),
        (0x014 => async_ch: [ReadWrite<u32, CTRL::Register>; ASYNC_CHANNEL_COUNT]),
        (0x044 => sync_ch: [ReadWrite<u32, CTRL::Register>; SYNC_CHANNEL_COUNT]),
        /// Consumer selection registers, one word per consumer input.
        (0x054 => consumer: [ReadWrite<u32, CONSUMER::Register>; CONSUMER_COUNT]),
        (0x154 => @END),
    },

    /// The PRS pin routing slice of the GPIO block.
    pub GpioPrsRouteRegisters {
        (0x000 => routeen: ReadWrite<u32>),
        (0x004 => asynch_route: [ReadWrite<u32, ROUTE::Register>; ASYNC_CHANNEL_COUNT]),
        (0x034 => synch_route: [ReadWrite<u32, ROUTE::Register>; SYNC_CHANNEL_COUNT]),
        (0x044 => @END),
    }
}

register_bitfields![u32,
    CTRL [
        SIGSEL OFFSET(0) NUMBITS(3) [],
        SOURCESEL OFFSET(8) NUMBITS(7) [],
        /// Async only
        FNSEL OFFSET(16) NUMBITS(4) [],
        /// Async only
        AUXSEL OFFSET(24) NUMBITS(4) []
    ],
    CONSUMER [
        PRSSEL OFFSET(0) NUMBITS(4) [],
        SPRSSEL OFFSET(8) NUMBITS(2) []
    ],
    ROUTE [
        PORT OFFSET(0) NUMBITS(2) [],
        PIN OFFSET(16) NUMBITS(4) []
    ]
];

/// Async channel CTRL after reset: no producer, logic passes A through.
const ASYNC_CTRL_RESET: u32 = 0x000C_0000;
const SYNC_CTRL_RESET: u32 = 0x0000_0000;

/// ROUTEEN bit of async channel 0; sync channels follow the async ones.
const ROUTEEN_ASYNC_SHIFT: usize = 0;
const ROUTEEN_SYNC_SHIFT: usize = ASYNC_CHANNEL_COUNT;

pub const PRS_BASE: StaticRef<PrsRegisters> =
    unsafe { StaticRef::new(0x4003_8000 as *const PrsRegisters) };

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelType {
    Async,
    Sync,
}

/// Truth table applied by an async channel's logic block. `A` is the channel
/// itself, `B` the auxiliary channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum Logic {
    Zero = 0,
    ANorB = 1,
    NotAAndB = 2,
    NotA = 3,
    AAndNotB = 4,
    NotB = 5,
    AXorB = 6,
    ANandB = 7,
    AAndB = 8,
    AXnorB = 9,
    B = 10,
    NotAOrB = 11,
    A = 12,
    AOrNotB = 13,
    AOrB = 14,
    One = 15,
}

/// A producer signal: the SOURCESEL and SIGSEL pair of a channel CTRL
/// register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Signal {
    source: u8,
    signal: u8,
}

impl Signal {
    pub const NONE: Signal = Signal::new(0, 0);

    pub const fn new(source: u8, signal: u8) -> Signal {
        Signal { source, signal }
    }

    pub const fn source(&self) -> u8 {
        self.source
    }

    pub const fn signal(&self) -> u8 {
        self.signal
    }
}

/// A consumer input, named by the byte offset of its selection register in
/// the PRS block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Consumer(u16);

impl Consumer {
    pub const NONE: Consumer = Consumer(0);

    pub const EUSART0_CLK: Consumer = Consumer(0x05C);
    pub const EUSART0_RX: Consumer = Consumer(0x060);
    pub const EUSART0_TRIGGER: Consumer = Consumer(0x064);

    pub const TIMER0_CC0: Consumer = Consumer(0x0A0);
    pub const TIMER0_CC1: Consumer = Consumer(0x0A4);
    pub const TIMER0_CC2: Consumer = Consumer(0x0A8);
    pub const TIMER0_DTI: Consumer = Consumer(0x0AC);
    pub const TIMER1_CC0: Consumer = Consumer(0x0B0);
    pub const TIMER1_CC1: Consumer = Consumer(0x0B4);
    pub const TIMER1_CC2: Consumer = Consumer(0x0B8);
    pub const TIMER1_DTI: Consumer = Consumer(0x0BC);
    pub const TIMER2_CC0: Consumer = Consumer(0x0C0);
    pub const TIMER2_CC1: Consumer = Consumer(0x0C4);
    pub const TIMER2_CC2: Consumer = Consumer(0x0C8);
    pub const TIMER2_DTI: Consumer = Consumer(0x0CC);
    pub const TIMER3_CC0: Consumer = Consumer(0x0D0);
    pub const TIMER3_CC1: Consumer = Consumer(0x0D4);
    pub const TIMER3_CC2: Consumer = Consumer(0x0D8);
    pub const TIMER3_DTI: Consumer = Consumer(0x0DC);
    pub const TIMER4_CC0: Consumer = Consumer(0x0E0);
    pub const TIMER4_CC1: Consumer = Consumer(0x0E4);
    pub const TIMER4_CC2: Consumer = Consumer(0x0E8);
    pub const TIMER4_DTI: Consumer = Consumer(0x0EC);

    pub const USART0_CLK: Consumer = Consumer(0x0F0);
    pub const USART0_IR: Consumer = Consumer(0x0F4);
    pub const USART0_RX: Consumer = Consumer(0x0F8);
    pub const USART0_TRIGGER: Consumer = Consumer(0x0FC);
    pub const USART1_CLK: Consumer = Consumer(0x100);
    pub const USART1_IR: Consumer = Consumer(0x104);
    pub const USART1_RX: Consumer = Consumer(0x108);
    pub const USART1_TRIGGER: Consumer = Consumer(0x10C);

    pub const fn offset(&self) -> usize {
        self.0 as usize
    }

    fn index(&self) -> usize {
        param_check!(
            self.offset() >= CONSUMER_WINDOW_START
                && self.offset() < CONSUMER_WINDOW_START + 4 * CONSUMER_COUNT
                && self.offset() % 4 == 0,
            "PRS consumer offset {:#x} outside the consumer window",
            self.offset()
        );
        self.offset().wrapping_sub(CONSUMER_WINDOW_START) / 4
    }
}

#[derive(Clone, Copy, Debug)]
pub struct AsyncChannelInit {
    pub channel: u8,
    /// Channel fed into the logic block as input B.
    pub aux_prs: u8,
    pub logic: Logic,
    pub producer: Signal,
    pub consumer: Consumer,
}

impl Default for AsyncChannelInit {
    /// No producer, no consumer, and the logic block passing the channel
    /// through unchanged.
    fn default() -> Self {
        AsyncChannelInit {
            channel: 0,
            aux_prs: 0,
            logic: Logic::A,
            producer: Signal::NONE,
            consumer: Consumer::NONE,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct SyncChannelInit {
    pub channel: u8,
    pub producer: Signal,
    pub consumer: Consumer,
}

impl Default for SyncChannelInit {
    fn default() -> Self {
        SyncChannelInit {
            channel: 0,
            producer: Signal::NONE,
            consumer: Consumer::NONE,
        }
    }
}

pub struct Prs {
    registers: StaticRef<PrsRegisters>,
    gpio_route: StaticRef<GpioPrsRouteRegisters>,
}

impl Prs {
    pub const fn new(
        base: StaticRef<PrsRegisters>,
        gpio_route: StaticRef<GpioPrsRouteRegisters>,
    ) -> Prs {
        Prs {
            registers: base,
            gpio_route,
        }
    }

    fn channel_ctrl(&self, channel: u8, ty: ChannelType) -> &ReadWrite<u32, CTRL::Register> {
        match ty {
            ChannelType::Async => {
                param_check!((channel as usize) < ASYNC_CHANNEL_COUNT);
                &self.registers.async_ch[channel as usize % ASYNC_CHANNEL_COUNT]
            }
            ChannelType::Sync => {
                param_check!((channel as usize) < SYNC_CHANNEL_COUNT);
                &self.registers.sync_ch[channel as usize % SYNC_CHANNEL_COUNT]
            }
        }
    }

    /// Set up an async channel: logic function, producer and consumer.
    pub fn async_init_channel(&self, init: &AsyncChannelInit) {
        param_check!((init.channel as usize) < ASYNC_CHANNEL_COUNT);
        if CONFIG.trace_init {
            debug!(
                "prs: async ch{} source {} signal {} consumer {:#x}",
                init.channel,
                init.producer.source(),
                init.producer.signal(),
                init.consumer.offset()
            );
        }

        self.combine_signals(init.channel, init.aux_prs, init.logic);
        self.connect_channel_producer(init.channel, ChannelType::Async, init.producer);
        self.connect_channel_consumer(init.channel, ChannelType::Async, init.consumer);
    }

    pub fn sync_init_channel(&self, init: &SyncChannelInit) {
        param_check!((init.channel as usize) < SYNC_CHANNEL_COUNT);
        if CONFIG.trace_init {
            debug!(
                "prs: sync ch{} source {} signal {} consumer {:#x}",
                init.channel,
                init.producer.source(),
                init.producer.signal(),
                init.consumer.offset()
            );
        }

        self.connect_channel_producer(init.channel, ChannelType::Sync, init.producer);
        self.connect_channel_consumer(init.channel, ChannelType::Sync, init.consumer);
    }

    /// Find the lowest-numbered channel of `ty` with no producer selected.
    pub fn get_free_channel(&self, ty: ChannelType) -> Result<u8, ErrorCode> {
        let channels: &[ReadWrite<u32, CTRL::Register>] = match ty {
            ChannelType::Async => &self.registers.async_ch,
            ChannelType::Sync => &self.registers.sync_ch,
        };

        channels
            .iter()
            .position(|ch| ch.read(CTRL::SOURCESEL) == 0 && ch.read(CTRL::SIGSEL) == 0)
            .map(|i| i as u8)
            .ok_or(ErrorCode::FAIL)
    }

    /// Return every channel and the software level register to reset state.
    /// Consumer registers are left alone.
    pub fn reset(&self) {
        if CONFIG.trace_init {
            debug!("prs: reset");
        }

        self.registers.async_swlevel.set(0);
        for ch in self.registers.async_ch.iter() {
            ch.set(ASYNC_CTRL_RESET);
        }
        for ch in self.registers.sync_ch.iter() {
            ch.set(SYNC_CTRL_RESET);
        }
    }

    /// Make `consumer` listen to `channel`. `Consumer::NONE` is ignored.
    pub fn connect_channel_consumer(&self, channel: u8, ty: ChannelType, consumer: Consumer) {
        if consumer == Consumer::NONE {
            return;
        }

        let reg = &self.registers.consumer[consumer.index() % CONSUMER_COUNT];
        match ty {
            ChannelType::Async => {
                param_check!((channel as usize) < ASYNC_CHANNEL_COUNT);
                reg.write(CONSUMER::PRSSEL.val(channel as u32));
            }
            ChannelType::Sync => {
                param_check!((channel as usize) < SYNC_CHANNEL_COUNT);
                reg.write(CONSUMER::SPRSSEL.val(channel as u32));
            }
        }
    }

    /// Select `signal` as the producer of `channel`.
    pub fn connect_channel_producer(&self, channel: u8, ty: ChannelType, signal: Signal) {
        self.channel_ctrl(channel, ty).modify(
            CTRL::SOURCESEL.val(signal.source() as u32) + CTRL::SIGSEL.val(signal.signal() as u32),
        );
    }

    /// Drive `channel` out on a GPIO pin.
    pub fn pin_output(&self, channel: u8, ty: ChannelType, port: u8, pin: u8) {
        param_check!(port < 4 && pin < 16);
        let route = ROUTE::PORT.val(port as u32) + ROUTE::PIN.val(pin as u32);
        let regs = self.gpio_route;
        let bit = match ty {
            ChannelType::Async => {
                param_check!((channel as usize) < ASYNC_CHANNEL_COUNT);
                regs.asynch_route[channel as usize % ASYNC_CHANNEL_COUNT].write(route);
                ROUTEEN_ASYNC_SHIFT + channel as usize
            }
            ChannelType::Sync => {
                param_check!((channel as usize) < SYNC_CHANNEL_COUNT);
                regs.synch_route[channel as usize % SYNC_CHANNEL_COUNT].write(route);
                ROUTEEN_SYNC_SHIFT + channel as usize
            }
        };
        regs.routeen.set(regs.routeen.get() | 1 << bit);
    }

    pub fn async_set_channel_swlevel(&self, channel: u8, high: bool) {
        param_check!((channel as usize) < ASYNC_CHANNEL_COUNT);
        let mask = 1 << channel;
        if high {
            self.registers.async_swlevel.set_mask(mask);
        } else {
            self.registers.async_swlevel.clear_mask(mask);
        }
    }

    pub fn async_get_channel_swlevel(&self, channel: u8) -> bool {
        param_check!((channel as usize) < ASYNC_CHANNEL_COUNT);
        self.registers.async_swlevel.get() & (1 << channel) != 0
    }

    /// Emit a one-clock pulse on `channel`.
    pub fn async_set_channel_swpulse(&self, channel: u8) {
        param_check!((channel as usize) < ASYNC_CHANNEL_COUNT);
        self.registers.async_swpulse.set_mask(1 << channel);
    }

    /// Current level of `channel`.
    pub fn get_channel_value(&self, channel: u8, ty: ChannelType) -> bool {
        match ty {
            ChannelType::Async => {
                param_check!((channel as usize) < ASYNC_CHANNEL_COUNT);
                self.registers.async_peek.get() & (1 << channel) != 0
            }
            ChannelType::Sync => {
                param_check!((channel as usize) < SYNC_CHANNEL_COUNT);
                self.registers.sync_peek.get() & (1 << channel) != 0
            }
        }
    }

    /// Configure the logic block of async `channel` to compute
    /// `logic(channel, aux_prs)`.
    pub fn combine_signals(&self, channel: u8, aux_prs: u8, logic: Logic) {
        param_check!((channel as usize) < ASYNC_CHANNEL_COUNT);
        param_check!((aux_prs as usize) < ASYNC_CHANNEL_COUNT);
        self.channel_ctrl(channel, ChannelType::Async)
            .modify(CTRL::FNSEL.val(logic as u32) + CTRL::AUXSEL.val(aux_prs as u32));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::FakeBlock;
    use kernel::ErrorCode;

    const ASYNC_CH0: usize = 0x014;
    const SYNC_CH0: usize = 0x044;

    fn fixture() -> (FakeBlock, FakeBlock, Prs) {
        let block = FakeBlock::series2();
        let gpio = FakeBlock::new(0x100);
        let prs = Prs::new(block.registers(), gpio.registers());
        (block, gpio, prs)
    }

    #[test]
    fn free_channel_skips_channels_with_a_producer() {
        let (block, _gpio, prs) = fixture();

        assert_eq!(prs.get_free_channel(ChannelType::Async), Ok(0));
        prs.connect_channel_producer(0, ChannelType::Async, Signal::new(0x21, 1));
        prs.connect_channel_producer(1, ChannelType::Async, Signal::new(0x21, 2));
        assert_eq!(prs.get_free_channel(ChannelType::Async), Ok(2));

        // A channel with only a logic function set is still free.
        block.poke(ASYNC_CH0 + 2 * 4, ASYNC_CTRL_RESET);
        assert_eq!(prs.get_free_channel(ChannelType::Async), Ok(2));
    }

    #[test]
    fn free_channel_fails_when_all_taken() {
        let (_block, _gpio, prs) = fixture();
        for ch in 0..SYNC_CHANNEL_COUNT as u8 {
            prs.connect_channel_producer(ch, ChannelType::Sync, Signal::new(3, 0));
        }
        assert_eq!(prs.get_free_channel(ChannelType::Sync), Err(ErrorCode::FAIL));
        assert_eq!(prs.get_free_channel(ChannelType::Async), Ok(0));
    }

    #[test]
    fn async_init_programs_logic_producer_and_consumer() {
        let (block, _gpio, prs) = fixture();
        block.poke(ASYNC_CH0 + 5 * 4, ASYNC_CTRL_RESET);

        prs.async_init_channel(&AsyncChannelInit {
            channel: 5,
            aux_prs: 3,
            logic: Logic::AAndB,
            producer: Signal::new(0x12, 4),
            consumer: Consumer::EUSART0_TRIGGER,
        });

        assert_eq!(block.peek(ASYNC_CH0 + 5 * 4), 0x0308_1204);
        assert_eq!(block.peek(Consumer::EUSART0_TRIGGER.offset()), 5);
    }

    #[test]
    fn sync_consumer_uses_sprssel() {
        let (block, _gpio, prs) = fixture();
        prs.sync_init_channel(&SyncChannelInit {
            channel: 2,
            producer: Signal::new(0x05, 1),
            consumer: Consumer::TIMER1_CC0,
        });

        assert_eq!(block.peek(SYNC_CH0 + 2 * 4), 0x0000_0501);
        assert_eq!(block.peek(Consumer::TIMER1_CC0.offset()), 2 << 8);
    }

    #[test]
    fn producer_change_keeps_logic_fields() {
        let (block, _gpio, prs) = fixture();
        block.poke(ASYNC_CH0, 0x0A0C_3307);
        prs.connect_channel_producer(0, ChannelType::Async, Signal::new(0x01, 2));
        assert_eq!(block.peek(ASYNC_CH0), 0x0A0C_0102);
    }

    #[test]
    fn reset_restores_channel_defaults() {
        let (block, _gpio, prs) = fixture();
        prs.async_set_channel_swlevel(7, true);
        prs.connect_channel_producer(11, ChannelType::Async, Signal::new(9, 2));
        prs.connect_channel_producer(3, ChannelType::Sync, Signal::new(9, 1));

        prs.reset();

        assert_eq!(block.peek(0x008), 0);
        for ch in 0..ASYNC_CHANNEL_COUNT {
            assert_eq!(block.peek(ASYNC_CH0 + 4 * ch), ASYNC_CTRL_RESET);
        }
        for ch in 0..SYNC_CHANNEL_COUNT {
            assert_eq!(block.peek(SYNC_CH0 + 4 * ch), 0);
        }
    }

    #[test]
    fn software_level_and_pulse_use_aliases() {
        let (block, _gpio, prs) = fixture();

        prs.async_set_channel_swlevel(4, true);
        assert_eq!(block.peek(0x1008), 1 << 4);
        assert!(prs.async_get_channel_swlevel(4));
        prs.async_set_channel_swlevel(4, false);
        assert_eq!(block.peek(0x2008), 1 << 4);
        assert!(!prs.async_get_channel_swlevel(4));

        prs.async_set_channel_swpulse(9);
        assert_eq!(block.peek(0x1004), 1 << 9);
    }

    #[test]
    fn channel_value_reads_peek_registers() {
        let (block, _gpio, prs) = fixture();
        block.poke(0x00C, 1 << 6);
        block.poke(0x010, 1 << 1);

        assert!(prs.get_channel_value(6, ChannelType::Async));
        assert!(!prs.get_channel_value(5, ChannelType::Async));
        assert!(prs.get_channel_value(1, ChannelType::Sync));
    }

    #[test]
    fn pin_output_routes_and_enables() {
        let (_block, gpio, prs) = fixture();

        prs.pin_output(2, ChannelType::Async, 1, 7);
        assert_eq!(gpio.peek(0x004 + 2 * 4), (7 << 16) | 1);
        prs.pin_output(1, ChannelType::Sync, 3, 15);
        assert_eq!(gpio.peek(0x034 + 4), (15 << 16) | 3);

        assert_eq!(gpio.peek(0x000), (1 << 2) | (1 << 13));
    }

    #[test]
    #[should_panic]
    fn async_channel_out_of_range_is_rejected() {
        let (_block, _gpio, prs) = fixture();
        prs.combine_signals(12, 0, Logic::One);
    }
}
