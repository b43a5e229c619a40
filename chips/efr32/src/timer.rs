// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Series-2 TIMER: 16 or 32-bit counter with three compare/capture channels
//! and dead time insertion (DTI).
//!
//! Configuration registers (`CFG`, `CC[n].CFG`, `DTCFG`, `DTTIMECFG`,
//! `DTFCFG`) may only be written while the timer is disabled. Everything else
//! needs it enabled and is synchronized into the timer clock domain, which
//! `wait_sync` spins on. The init functions juggle `EN` accordingly and leave
//! the timer disabled.

use kernel::utilities::registers::interfaces::{Readable, Writeable};
use kernel::utilities::registers::{
    register_bitfields, register_structs, FieldValue, LocalRegisterCopy, ReadOnly, ReadWrite,
    WriteOnly,
};
use kernel::utilities::set_clear::SetClearAlias;
use kernel::utilities::StaticRef;
use kernel::{config::CONFIG, debug, param_check};

pub const CHANNEL_COUNT: usize = 3;

register_structs! {
    pub CcRegisters {
        (0x00 => cfg: ReadWrite<u32, CC_CFG::Register>),
        (0x04 => ctrl: ReadWrite<u32, CC_CTRL::Register>),
        /// Output compare value
        (0x08 => oc: ReadWrite<u32>),
        (0x0C => phase: ReadWrite<u32>),
        /// Output compare buffer, copied to OC on update
        (0x10 => ocb: ReadWrite<u32>),
        /// Input capture FIFO
        (0x14 => icf: ReadOnly<u32>),
        /// Input capture FIFO overflow
        (0x18 => icof: ReadOnly<u32>),
        (0x1C => phaseb: ReadWrite<u32>),
        (0x20 => dither: ReadWrite<u32, DITHER::Register>),
        (0x24 => ditherb: ReadWrite<u32, DITHER::Register>),
        (0x28 => _reserved0),
        (0x30 => @END),
    },

    pub TimerRegisters {
        (0x000 => ipversion: ReadOnly<u32>),
        (0x004 => cfg: ReadWrite<u32, CFG::Register>),
        (0x008 => ctrl: ReadWrite<u32, CTRL::Register>),
        (0x00C => cmd: WriteOnly<u32, CMD::Register>),
        (0x010 => status: ReadOnly<u32, STATUS::Register>),
        (0x014 => intflag: ReadWrite<u32, INT::Register>),
        (0x018 => ien: ReadWrite<u32, INT::Register>),
        (0x01C => top: ReadWrite<u32>),
        (0x020 => topb: ReadWrite<u32>),
        (0x024 => cnt: ReadWrite<u32>),
        (0x028 => status2: ReadOnly<u32, STATUS2::Register>),
        (0x02C => lock: WriteOnly<u32, LOCK::Register>),
        (0x030 => en: ReadWrite<u32, EN::Register>),
        (0x034 => _reserved0),
        (0x060 => cc: [CcRegisters; CHANNEL_COUNT]),
        (0x0F0 => dtcfg: ReadWrite<u32, DTCFG::Register>),
        (0x0F4 => dttimecfg: ReadWrite<u32, DTTIMECFG::Register>),
        (0x0F8 => dtfcfg: ReadWrite<u32, DTFCFG::Register>),
        (0x0FC => dtctrl: ReadWrite<u32, DTCTRL::Register>),
        (0x100 => dtogen: ReadWrite<u32>),
        (0x104 => dtfault: ReadOnly<u32, DTFAULT::Register>),
        (0x108 => dtfaultc: WriteOnly<u32, DTFAULT::Register>),
        (0x10C => dtlock: WriteOnly<u32, LOCK::Register>),
        (0x110 => @END),
    }
}

register_bitfields![u32,
    CFG [
        MODE OFFSET(0) NUMBITS(2) [],
        SYNC OFFSET(3) NUMBITS(1) [],
        OSMEN OFFSET(4) NUMBITS(1) [],
        QDM OFFSET(5) NUMBITS(1) [
            X2 = 0,
            X4 = 1
        ],
        DEBUGRUN OFFSET(6) NUMBITS(1) [],
        DMACLRACT OFFSET(7) NUMBITS(1) [],
        CLKSEL OFFSET(8) NUMBITS(2) [],
        RETIMEEN OFFSET(10) NUMBITS(1) [],
        DISSYNCOUT OFFSET(11) NUMBITS(1) [],
        UPDATEMODE OFFSET(13) NUMBITS(1) [],
        ATI OFFSET(16) NUMBITS(1) [],
        RSSCOIST OFFSET(17) NUMBITS(1) [],
        PRESC OFFSET(18) NUMBITS(10) []
    ],
    CTRL [
        RISEA OFFSET(0) NUMBITS(2) [],
        FALLA OFFSET(2) NUMBITS(2) [],
        X2CNT OFFSET(4) NUMBITS(1) []
    ],
    CMD [
        START OFFSET(0) NUMBITS(1) [],
        STOP OFFSET(1) NUMBITS(1) [],
        UPDATECMD OFFSET(2) NUMBITS(1) []
    ],
    pub STATUS [
        RUNNING OFFSET(0) NUMBITS(1) [],
        DIR OFFSET(1) NUMBITS(1) [
            Up = 0,
            Down = 1
        ],
        TOPBV OFFSET(2) NUMBITS(1) [],
        TIMERLOCKSTATUS OFFSET(4) NUMBITS(1) [],
        DTILOCKSTATUS OFFSET(5) NUMBITS(1) [],
        SYNCBUSY OFFSET(6) NUMBITS(1) [],
        OCBV0 OFFSET(8) NUMBITS(1) [],
        OCBV1 OFFSET(9) NUMBITS(1) [],
        OCBV2 OFFSET(10) NUMBITS(1) [],
        ICFEMPTY0 OFFSET(16) NUMBITS(1) [],
        ICFEMPTY1 OFFSET(17) NUMBITS(1) [],
        ICFEMPTY2 OFFSET(18) NUMBITS(1) [],
        CCPOL0 OFFSET(24) NUMBITS(1) [],
        CCPOL1 OFFSET(25) NUMBITS(1) [],
        CCPOL2 OFFSET(26) NUMBITS(1) []
    ],
    pub STATUS2 [
        UPDATEBUSY OFFSET(0) NUMBITS(1) []
    ],
    pub INT [
        OF OFFSET(0) NUMBITS(1) [],
        UF OFFSET(1) NUMBITS(1) [],
        DIRCHG OFFSET(2) NUMBITS(1) [],
        CC0 OFFSET(4) NUMBITS(1) [],
        CC1 OFFSET(5) NUMBITS(1) [],
        CC2 OFFSET(6) NUMBITS(1) [],
        ICFWLFULL0 OFFSET(16) NUMBITS(1) [],
        ICFWLFULL1 OFFSET(17) NUMBITS(1) [],
        ICFWLFULL2 OFFSET(18) NUMBITS(1) [],
        ICFOF0 OFFSET(20) NUMBITS(1) [],
        ICFOF1 OFFSET(21) NUMBITS(1) [],
        ICFOF2 OFFSET(22) NUMBITS(1) [],
        ICFUF0 OFFSET(24) NUMBITS(1) [],
        ICFUF1 OFFSET(25) NUMBITS(1) [],
        ICFUF2 OFFSET(26) NUMBITS(1) []
    ],
    LOCK [
        LOCKKEY OFFSET(0) NUMBITS(16) [
            Unlock = 0xCE80
        ]
    ],
    EN [
        EN OFFSET(0) NUMBITS(1) [],
        DISABLING OFFSET(1) NUMBITS(1) []
    ],
    CC_CFG [
        MODE OFFSET(0) NUMBITS(2) [],
        COIST OFFSET(4) NUMBITS(1) [],
        INSEL OFFSET(17) NUMBITS(2) [],
        PRSCONF OFFSET(19) NUMBITS(1) [],
        FILT OFFSET(20) NUMBITS(1) [],
        ICFWL OFFSET(21) NUMBITS(1) []
    ],
    CC_CTRL [
        OUTINV OFFSET(2) NUMBITS(1) [],
        CMOA OFFSET(8) NUMBITS(2) [],
        COFOA OFFSET(10) NUMBITS(2) [],
        CUFOA OFFSET(12) NUMBITS(2) [],
        ICEDGE OFFSET(24) NUMBITS(2) [],
        ICEVCTRL OFFSET(26) NUMBITS(2) []
    ],
    DITHER [
        DITHER OFFSET(0) NUMBITS(4) []
    ],
    DTCFG [
        DTEN OFFSET(0) NUMBITS(1) [],
        DTDAS OFFSET(1) NUMBITS(1) [],
        DTAR OFFSET(9) NUMBITS(1) [],
        DTFATS OFFSET(10) NUMBITS(1) [],
        DTPRSEN OFFSET(11) NUMBITS(1) []
    ],
    DTTIMECFG [
        DTPRESC OFFSET(0) NUMBITS(10) [],
        DTRISET OFFSET(10) NUMBITS(6) [],
        DTFALLT OFFSET(16) NUMBITS(6) []
    ],
    DTFCFG [
        DTFA OFFSET(16) NUMBITS(2) [],
        DTPRS0FEN OFFSET(24) NUMBITS(1) [],
        DTPRS1FEN OFFSET(25) NUMBITS(1) [],
        DTDBGFEN OFFSET(26) NUMBITS(1) [],
        DTLOCKUPFEN OFFSET(27) NUMBITS(1) [],
        DTEM23FEN OFFSET(28) NUMBITS(1) []
    ],
    DTCTRL [
        DTCINV OFFSET(1) NUMBITS(1) [],
        DTIPOL OFFSET(2) NUMBITS(1) []
    ],
    pub DTFAULT [
        DTPRS0F OFFSET(0) NUMBITS(1) [],
        DTPRS1F OFFSET(1) NUMBITS(1) [],
        DTDBGF OFFSET(2) NUMBITS(1) [],
        DTLOCKUPF OFFSET(3) NUMBITS(1) [],
        DTEM23F OFFSET(4) NUMBITS(1) []
    ]
];

pub const INT_ALL: u32 = 0x0777_0077;
const DTFAULT_ALL: u32 = 0x1F;
const DITHER_MAX: u8 = DITHER::DITHER.mask as u8;
const DT_TIME_MAX: u8 = DTTIMECFG::DTRISET.mask as u8;

/// DTI output enable bits for `DtiInit::output_enable`.
pub const DTOGEN_CC0: u8 = 1 << 0;
pub const DTOGEN_CC1: u8 = 1 << 1;
pub const DTOGEN_CC2: u8 = 1 << 2;
pub const DTOGEN_CDTI0: u8 = 1 << 3;
pub const DTOGEN_CDTI1: u8 = 1 << 4;
pub const DTOGEN_CDTI2: u8 = 1 << 5;

const fn timer_base(n: usize) -> StaticRef<TimerRegisters> {
    unsafe { StaticRef::new((0x4004_8000 + n * 0x4000) as *const TimerRegisters) }
}

pub const TIMER0_BASE: StaticRef<TimerRegisters> = timer_base(0);
pub const TIMER1_BASE: StaticRef<TimerRegisters> = timer_base(1);
pub const TIMER2_BASE: StaticRef<TimerRegisters> = timer_base(2);
pub const TIMER3_BASE: StaticRef<TimerRegisters> = timer_base(3);
pub const TIMER4_BASE: StaticRef<TimerRegisters> = timer_base(4);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum Mode {
    Up = 0,
    Down = 1,
    UpDown = 2,
    /// Quadrature decoder on CC0/CC1.
    QuadratureDecoder = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum ClockSelect {
    /// Prescaled peripheral clock.
    Prescaled = 0,
    /// Count edges on the CC1 input.
    Cc1 = 1,
    /// Count on overflow/underflow of the next lower timer.
    Cascade = 2,
}

/// Counter clock prescaler. The register holds the divider minus one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum Prescaler {
    Div1 = 0,
    Div2 = 1,
    Div4 = 3,
    Div8 = 7,
    Div16 = 15,
    Div32 = 31,
    Div64 = 63,
    Div128 = 127,
    Div256 = 255,
    Div512 = 511,
    Div1024 = 1023,
}

/// What an edge on the CC0 input does to the counter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum InputAction {
    None = 0,
    Start = 1,
    Stop = 2,
    ReloadStart = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum ChannelMode {
    Off = 0,
    Capture = 1,
    Compare = 2,
    Pwm = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum ChannelInput {
    Pin = 0,
    PrsSync = 1,
    PrsAsyncLevel = 2,
    PrsAsyncPulse = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum OutputAction {
    None = 0,
    Toggle = 1,
    Clear = 2,
    Set = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum InputEvent {
    EveryEdge = 0,
    EverySecondEdge = 1,
    Rising = 2,
    Falling = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum InputEdge {
    Rising = 0,
    Falling = 1,
    Both = 2,
    None = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum FaultAction {
    None = 0,
    Inactive = 1,
    Clear = 2,
    Tristate = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerInit {
    pub mode: Mode,
    pub clock_select: ClockSelect,
    pub prescaler: Prescaler,
    pub rise_action: InputAction,
    pub fall_action: InputAction,
    /// Start, stop and reload with the other timers.
    pub input_sync: bool,
    pub one_shot: bool,
    pub quadrature_x4: bool,
    pub debug_run: bool,
    pub dma_clear_on_active: bool,
    pub retime: bool,
    pub disable_sync_out: bool,
    pub always_track_input: bool,
    pub reload_start_sets_initial_state: bool,
    pub count_2x: bool,
    /// Copy buffered compare values only on `channel_update_registers`.
    pub manual_update: bool,
}

impl Default for TimerInit {
    /// Free running up counter on the undivided peripheral clock.
    fn default() -> Self {
        TimerInit {
            mode: Mode::Up,
            clock_select: ClockSelect::Prescaled,
            prescaler: Prescaler::Div1,
            rise_action: InputAction::None,
            fall_action: InputAction::None,
            input_sync: false,
            one_shot: false,
            quadrature_x4: false,
            debug_run: false,
            dma_clear_on_active: false,
            retime: false,
            disable_sync_out: false,
            always_track_input: false,
            reload_start_sets_initial_state: false,
            count_2x: false,
            manual_update: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelInit {
    pub phase: u32,
    pub dither: u8,
    pub mode: ChannelMode,
    pub input: ChannelInput,
    pub match_action: OutputAction,
    pub underflow_action: OutputAction,
    pub overflow_action: OutputAction,
    pub capture_event: InputEvent,
    pub capture_edge: InputEdge,
    /// Raise ICFWLFULL at two captures instead of one.
    pub watermark_two: bool,
    pub initial_output_high: bool,
    /// Drive PRS with a level instead of a pulse.
    pub prs_level: bool,
    pub filter: bool,
    pub invert_output: bool,
}

impl ChannelInit {
    /// PWM, toggling the output on compare match.
    pub const fn pwm() -> ChannelInit {
        ChannelInit {
            mode: ChannelMode::Pwm,
            match_action: OutputAction::Toggle,
            ..ChannelInit::OFF
        }
    }

    const OFF: ChannelInit = ChannelInit {
        phase: 0,
        dither: 0,
        mode: ChannelMode::Off,
        input: ChannelInput::Pin,
        match_action: OutputAction::None,
        underflow_action: OutputAction::None,
        overflow_action: OutputAction::None,
        capture_event: InputEvent::EveryEdge,
        capture_edge: InputEdge::Rising,
        watermark_two: false,
        initial_output_high: false,
        prs_level: false,
        filter: false,
        invert_output: false,
    };
}

impl Default for ChannelInit {
    fn default() -> Self {
        ChannelInit::OFF
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DtiInit {
    /// Restart DTI when the debugger exits.
    pub auto_restart: bool,
    pub ch0_always_running: bool,
    pub safe_state: bool,
    pub prs_input: bool,
    pub invert_complementary: bool,
    /// Primary outputs active low.
    pub output_polarity_low: bool,
    pub fault_on_em23: bool,
    pub fault_on_lockup: bool,
    pub fault_on_debugger: bool,
    pub fault_on_prs0: bool,
    pub fault_on_prs1: bool,
    pub prescaler: Prescaler,
    /// Dead time cycles on rising edges, 0 to 63.
    pub rise_time: u8,
    /// Dead time cycles on falling edges, 0 to 63.
    pub fall_time: u8,
    /// `DTOGEN_*` bits.
    pub output_enable: u8,
    pub fault_action: FaultAction,
}

impl Default for DtiInit {
    fn default() -> Self {
        DtiInit {
            auto_restart: false,
            ch0_always_running: false,
            safe_state: false,
            prs_input: false,
            invert_complementary: false,
            output_polarity_low: false,
            fault_on_em23: false,
            fault_on_lockup: false,
            fault_on_debugger: false,
            fault_on_prs0: false,
            fault_on_prs1: false,
            prescaler: Prescaler::Div1,
            rise_time: 0,
            fall_time: 0,
            output_enable: 0,
            fault_action: FaultAction::None,
        }
    }
}

pub struct Timer {
    registers: StaticRef<TimerRegisters>,
    max_count: u32,
    dti: bool,
}

impl Timer {
    /// `counter_bits` is 16 or 32 depending on the instance.
    pub const fn new(base: StaticRef<TimerRegisters>, counter_bits: u32, dti: bool) -> Timer {
        Timer {
            registers: base,
            max_count: if counter_bits >= 32 {
                u32::MAX
            } else {
                (1 << counter_bits) - 1
            },
            dti,
        }
    }

    pub fn max_count(&self) -> u32 {
        self.max_count
    }

    fn check_enabled(&self) {
        param_check!(self.registers.en.is_set(EN::EN));
    }

    fn channel(&self, channel: u8) -> &CcRegisters {
        param_check!((channel as usize) < CHANNEL_COUNT);
        &self.registers.cc[channel as usize % CHANNEL_COUNT]
    }

    pub fn init(&self, init: &TimerInit) {
        let regs = self.registers;
        if CONFIG.trace_init {
            debug!(
                "timer: init {:?} {:?} {:?}",
                init.mode, init.clock_select, init.prescaler
            );
        }

        self.disable();
        self.wait_ready();

        regs.cfg.write(
            CFG::SYNC.val(init.input_sync as u32)
                + CFG::OSMEN.val(init.one_shot as u32)
                + CFG::QDM.val(init.quadrature_x4 as u32)
                + CFG::DEBUGRUN.val(init.debug_run as u32)
                + CFG::DMACLRACT.val(init.dma_clear_on_active as u32)
                + CFG::RETIMEEN.val(init.retime as u32)
                + CFG::DISSYNCOUT.val(init.disable_sync_out as u32)
                + CFG::ATI.val(init.always_track_input as u32)
                + CFG::RSSCOIST.val(init.reload_start_sets_initial_state as u32)
                + CFG::MODE.val(init.mode as u32)
                + CFG::CLKSEL.val(init.clock_select as u32)
                + CFG::UPDATEMODE.val(init.manual_update as u32)
                + CFG::PRESC.val(init.prescaler as u32),
        );

        self.enable();
        regs.cnt.set(0);
        regs.ctrl.write(
            CTRL::RISEA.val(init.rise_action as u32)
                + CTRL::FALLA.val(init.fall_action as u32)
                + CTRL::X2CNT.val(init.count_2x as u32),
        );

        self.wait_sync();
        self.disable();
        self.wait_ready();
    }

    pub fn channel_init(&self, channel: u8, init: &ChannelInit) {
        if CONFIG.trace_init {
            debug!("timer: channel {} init {:?}", channel, init.mode);
        }
        let cc = self.channel(channel);
        param_check!(init.phase <= self.max_count);
        param_check!(init.dither <= DITHER_MAX);

        self.disable();
        self.wait_ready();

        cc.cfg.write(
            CC_CFG::COIST.val(init.initial_output_high as u32)
                + CC_CFG::PRSCONF.val(init.prs_level as u32)
                + CC_CFG::FILT.val(init.filter as u32)
                + CC_CFG::ICFWL.val(init.watermark_two as u32)
                + CC_CFG::INSEL.val(init.input as u32)
                + CC_CFG::MODE.val(init.mode as u32),
        );

        self.enable();
        cc.ctrl.write(
            CC_CTRL::OUTINV.val(init.invert_output as u32)
                + CC_CTRL::CMOA.val(init.match_action as u32)
                + CC_CTRL::CUFOA.val(init.underflow_action as u32)
                + CC_CTRL::COFOA.val(init.overflow_action as u32)
                + CC_CTRL::ICEVCTRL.val(init.capture_event as u32)
                + CC_CTRL::ICEDGE.val(init.capture_edge as u32),
        );
        cc.phase.set(init.phase);
        cc.dither.write(DITHER::DITHER.val(init.dither as u32));

        self.wait_sync();
        self.disable();
        self.wait_ready();
    }

    pub fn dti_init(&self, init: &DtiInit) {
        let regs = self.registers;
        param_check!(self.dti);
        param_check!(init.rise_time <= DT_TIME_MAX && init.fall_time <= DT_TIME_MAX);
        if CONFIG.trace_init {
            debug!(
                "timer: dti init rise {} fall {} outputs {:#x}",
                init.rise_time, init.fall_time, init.output_enable
            );
        }

        self.disable();
        self.wait_ready();
        self.dti_disable();

        regs.dtcfg.write(
            DTCFG::DTDAS.val(init.auto_restart as u32)
                + DTCFG::DTAR.val(init.ch0_always_running as u32)
                + DTCFG::DTFATS.val(init.safe_state as u32)
                + DTCFG::DTPRSEN.val(init.prs_input as u32),
        );
        regs.dttimecfg.write(
            DTTIMECFG::DTPRESC.val(init.prescaler as u32)
                + DTTIMECFG::DTRISET.val(init.rise_time as u32)
                + DTTIMECFG::DTFALLT.val(init.fall_time as u32),
        );
        regs.dtfcfg.write(
            DTFCFG::DTLOCKUPFEN.val(init.fault_on_lockup as u32)
                + DTFCFG::DTEM23FEN.val(init.fault_on_em23 as u32)
                + DTFCFG::DTDBGFEN.val(init.fault_on_debugger as u32)
                + DTFCFG::DTPRS0FEN.val(init.fault_on_prs0 as u32)
                + DTFCFG::DTPRS1FEN.val(init.fault_on_prs1 as u32)
                + DTFCFG::DTFA.val(init.fault_action as u32),
        );

        self.enable();
        regs.dtctrl.write(
            DTCTRL::DTIPOL.val(init.output_polarity_low as u32)
                + DTCTRL::DTCINV.val(init.invert_complementary as u32),
        );
        regs.dtogen.set(init.output_enable as u32);

        self.dti_clear_fault(self.dti_get_fault().get());

        self.wait_sync();
        self.disable();
        self.wait_ready();
    }

    /// Return every register except the pin routing to its reset value.
    /// Leaves the timer disabled.
    pub fn reset(&self) {
        let regs = self.registers;
        if CONFIG.trace_init {
            debug!("timer: reset");
        }

        self.enable();
        self.wait_sync();
        self.stop();

        regs.cmd.set(0);
        regs.ctrl.set(0);
        regs.ien.set(0);
        regs.intflag.clear_mask(INT_ALL);
        regs.topb.set(0);
        // TOP after TOPB clears STATUS.TOPBV.
        regs.top.set(self.max_count);
        regs.cnt.set(0);

        for cc in regs.cc.iter() {
            cc.ctrl.set(0);
            cc.oc.set(0);
            cc.ocb.set(0);
            cc.phase.set(0);
            cc.phaseb.set(0);
            cc.dither.set(0);
            cc.ditherb.set(0);
        }

        regs.dtlock.write(LOCK::LOCKKEY::Unlock);
        regs.dtctrl.set(0);
        regs.dtogen.set(0);
        regs.dtfaultc.set(DTFAULT_ALL);

        self.wait_sync();
        self.disable();
        self.wait_ready();

        regs.cfg.set(0);
        for cc in regs.cc.iter() {
            cc.cfg.set(0);
        }
        regs.dtcfg.set(0);
        regs.dtfcfg.set(0);
        regs.dttimecfg.set(0);
    }

    /// Spin while a write is crossing into the timer clock domain. Returns
    /// at once when disabled.
    #[inline]
    pub fn wait_sync(&self) {
        let regs = self.registers;
        while regs.en.is_set(EN::EN)
            && (regs.status.is_set(STATUS::SYNCBUSY) || regs.status2.is_set(STATUS2::UPDATEBUSY))
        {}
    }

    #[inline]
    pub fn wait_ready(&self) {
        while self.registers.en.is_set(EN::DISABLING) {}
    }

    #[inline]
    pub fn enable(&self) {
        let regs = self.registers;
        if regs.en.is_set(EN::EN) {
            return;
        }
        regs.en.set_bits(EN::EN::SET);
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
    pub fn start(&self) {
        self.check_enabled();
        self.wait_sync();
        self.registers.cmd.write(CMD::START::SET);
    }

    #[inline]
    pub fn stop(&self) {
        self.check_enabled();
        self.wait_sync();
        self.registers.cmd.write(CMD::STOP::SET);
    }

    /// With manual update mode, copy the buffered compare values into the
    /// active registers. No-op otherwise.
    #[inline]
    pub fn channel_update_registers(&self) {
        let regs = self.registers;
        if regs.cfg.is_set(CFG::UPDATEMODE) {
            regs.cmd.write(CMD::UPDATECMD::SET);
        }
    }

    /// Pop the oldest capture.
    #[inline]
    pub fn channel_get_capture(&self, channel: u8) -> u32 {
        let cc = self.channel(channel);
        self.wait_sync();
        cc.icf.get()
    }

    /// Newest capture, left after a FIFO overflow.
    #[inline]
    pub fn channel_get_capture_buffer(&self, channel: u8) -> u32 {
        let cc = self.channel(channel);
        self.wait_sync();
        cc.icof.get()
    }

    #[inline]
    pub fn channel_get_compare(&self, channel: u8) -> u32 {
        let cc = self.channel(channel);
        self.wait_sync();
        cc.oc.get()
    }

    #[inline]
    pub fn channel_get_compare_buffer(&self, channel: u8) -> u32 {
        let cc = self.channel(channel);
        self.wait_sync();
        cc.ocb.get()
    }

    #[inline]
    pub fn channel_set_compare(&self, channel: u8, value: u32) {
        let cc = self.channel(channel);
        param_check!(value <= self.max_count);
        self.check_enabled();
        self.wait_sync();
        cc.oc.set(value);
    }

    /// Takes effect at the next update event.
    #[inline]
    pub fn channel_set_compare_buffer(&self, channel: u8, value: u32) {
        let cc = self.channel(channel);
        param_check!(value <= self.max_count);
        self.check_enabled();
        self.wait_sync();
        cc.ocb.set(value);
    }

    #[inline]
    pub fn channel_set_phase(&self, channel: u8, phase: u32) {
        let cc = self.channel(channel);
        param_check!(phase <= self.max_count);
        self.check_enabled();
        self.wait_sync();
        cc.phase.set(phase);
    }

    #[inline]
    pub fn channel_get_phase(&self, channel: u8) -> u32 {
        let cc = self.channel(channel);
        self.wait_sync();
        cc.phase.get()
    }

    #[inline]
    pub fn channel_set_phase_buffer(&self, channel: u8, phase: u32) {
        let cc = self.channel(channel);
        param_check!(phase <= self.max_count);
        self.check_enabled();
        self.wait_sync();
        cc.phaseb.set(phase);
    }

    #[inline]
    pub fn channel_get_phase_buffer(&self, channel: u8) -> u32 {
        let cc = self.channel(channel);
        self.wait_sync();
        cc.phaseb.get()
    }

    #[inline]
    pub fn channel_set_dither(&self, channel: u8, dither: u8) {
        let cc = self.channel(channel);
        param_check!(dither <= DITHER_MAX);
        self.check_enabled();
        self.wait_sync();
        cc.dither.write(DITHER::DITHER.val(dither as u32));
    }

    #[inline]
    pub fn channel_get_dither(&self, channel: u8) -> u8 {
        let cc = self.channel(channel);
        self.wait_sync();
        cc.dither.read(DITHER::DITHER) as u8
    }

    #[inline]
    pub fn channel_set_dither_buffer(&self, channel: u8, dither: u8) {
        let cc = self.channel(channel);
        param_check!(dither <= DITHER_MAX);
        self.check_enabled();
        self.wait_sync();
        cc.ditherb.write(DITHER::DITHER.val(dither as u32));
        self.wait_sync();
    }

    #[inline]
    pub fn channel_get_dither_buffer(&self, channel: u8) -> u8 {
        let cc = self.channel(channel);
        self.wait_sync();
        cc.ditherb.read(DITHER::DITHER) as u8
    }

    #[inline]
    pub fn get_counter(&self) -> u32 {
        self.wait_sync();
        self.registers.cnt.get()
    }

    #[inline]
    pub fn set_counter(&self, value: u32) {
        param_check!(value <= self.max_count);
        self.check_enabled();
        self.wait_sync();
        self.registers.cnt.set(value);
    }

    /// Buffered TOP, loaded at the next overflow or underflow.
    #[inline]
    pub fn set_top_buffer(&self, value: u32) {
        param_check!(value <= self.max_count);
        self.check_enabled();
        self.wait_sync();
        self.registers.topb.set(value);
    }

    #[inline]
    pub fn set_top(&self, value: u32) {
        param_check!(value <= self.max_count);
        self.check_enabled();
        self.wait_sync();
        self.registers.top.set(value);
    }

    #[inline]
    pub fn get_top(&self) -> u32 {
        self.wait_sync();
        self.registers.top.get()
    }

    #[inline]
    pub fn get_status(&self) -> LocalRegisterCopy<u32, STATUS::Register> {
        self.registers.status.extract()
    }

    #[inline]
    pub fn get_status2(&self) -> LocalRegisterCopy<u32, STATUS2::Register> {
        self.registers.status2.extract()
    }

    /// Block writes to the timer configuration until `unlock`.
    #[inline]
    pub fn lock(&self) {
        self.registers.lock.set(!(LOCK::LOCKKEY::Unlock.value));
    }

    #[inline]
    pub fn unlock(&self) {
        self.registers.lock.write(LOCK::LOCKKEY::Unlock);
    }

    /// Turn DTI on. Disables the timer first.
    #[inline]
    pub fn dti_enable(&self) {
        param_check!(self.dti);
        self.disable();
        self.wait_ready();
        self.registers.dtcfg.set_bits(DTCFG::DTEN::SET);
    }

    #[inline]
    pub fn dti_disable(&self) {
        param_check!(self.dti);
        self.disable();
        self.wait_ready();
        self.registers.dtcfg.clear_bits(DTCFG::DTEN::SET);
    }

    #[inline]
    pub fn dti_get_fault(&self) -> LocalRegisterCopy<u32, DTFAULT::Register> {
        param_check!(self.dti);
        self.registers.dtfault.extract()
    }

    #[inline]
    pub fn dti_clear_fault(&self, flags: u32) {
        param_check!(self.dti);
        self.check_enabled();
        self.registers.dtfaultc.set(flags);
    }

    #[inline]
    pub fn dti_unlock(&self) {
        param_check!(self.dti);
        self.registers.dtlock.write(LOCK::LOCKKEY::Unlock);
    }

    #[inline]
    pub fn dti_lock(&self) {
        param_check!(self.dti);
        self.registers.dtlock.set(!(LOCK::LOCKKEY::Unlock.value));
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
