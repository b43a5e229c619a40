// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! AES accelerator (AES_B).
//!
//! Data moves through two 16-byte FIFOs. `XFRSIZE` holds the number of
//! 4-word blocks left to process, minus one. In software mode the core feeds
//! the FIFOs and sets `XFRSTA` to process each block; in DMA mode the DMA
//! engine does both.

use kernel::utilities::registers::interfaces::{Readable, Writeable};
use kernel::utilities::registers::{register_bitfields, register_structs, ReadWrite};
use kernel::utilities::set_clear::SetClearRegister;
use kernel::utilities::StaticRef;
use kernel::{config::CONFIG, debug, param_check};

use crate::fifo::DataPort;

register_structs! {
    /// A 32-bit register alone in its 16-byte slot.
    pub Word {
        (0x00 => value: ReadWrite<u32>),
        (0x04 => _reserved0),
        (0x10 => @END),
    },

    pub AesRegisters {
        (0x000 => control: SetClearRegister<CONTROL::Register>),
        (0x010 => xfrsize: ReadWrite<u32, XFRSIZE::Register>),
        (0x014 => _reserved0),
        (0x020 => datafifo: DataPort),
        (0x024 => _reserved1),
        (0x030 => xorfifo: DataPort),
        (0x034 => _reserved2),
        (0x040 => hwkey: [Word; 8]),
        (0x0C0 => hwctr: [Word; 4]),
        (0x100 => status: SetClearRegister<STATUS::Register>),
        (0x110 => @END),
    }
}

register_bitfields![u32,
    CONTROL [
        /// Process one block
        XFRSTA OFFSET(0) NUMBITS(1) [],
        /// Capture the last round key into HWKEY at the end of the operation
        KEYCPEN OFFSET(1) NUMBITS(1) [],
        EDMD OFFSET(2) NUMBITS(1) [
            Decrypt = 0,
            Encrypt = 1
        ],
        SWMDEN OFFSET(8) NUMBITS(1) [],
        /// Bypass the AES core, leaving only the XOR path
        BEN OFFSET(9) NUMBITS(1) [],
        XOREN OFFSET(10) NUMBITS(2) [],
        HCTREN OFFSET(12) NUMBITS(1) [],
        HCBCEN OFFSET(13) NUMBITS(1) [],
        KEYSIZE OFFSET(16) NUMBITS(2) [],
        ERRIEN OFFSET(24) NUMBITS(1) [],
        OCIEN OFFSET(25) NUMBITS(1) [],
        DBGMD OFFSET(30) NUMBITS(1) [
            Halt = 0,
            Run = 1
        ],
        RESET OFFSET(31) NUMBITS(1) []
    ],
    XFRSIZE [
        XFRSIZE OFFSET(0) NUMBITS(11) []
    ],
    STATUS [
        DFIFOLVL OFFSET(0) NUMBITS(5) [],
        XFIFOLVL OFFSET(8) NUMBITS(5) [],
        BUSYF OFFSET(24) NUMBITS(1) [],
        DURI OFFSET(28) NUMBITS(1) [],
        DORI OFFSET(29) NUMBITS(1) [],
        XORI OFFSET(30) NUMBITS(1) [],
        OCI OFFSET(31) NUMBITS(1) []
    ]
];

pub const AES0_BASE: StaticRef<AesRegisters> =
    unsafe { StaticRef::new(0x4002_7000 as *const AesRegisters) };

const XFRSIZE_MAX: u32 = XFRSIZE::XFRSIZE.mask;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum XorPath {
    None = 0,
    /// XOR the XOR FIFO into the data before the cipher.
    Input = 1,
    /// XOR the XOR FIFO into the cipher output.
    Output = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u32)]
pub enum KeySize {
    Aes128 = 0,
    Aes192 = 1,
    Aes256 = 2,
}

impl KeySize {
    /// Key length in 32-bit words.
    pub const fn words(self) -> usize {
        match self {
            KeySize::Aes128 => 4,
            KeySize::Aes192 => 6,
            KeySize::Aes256 => 8,
        }
    }

    fn from_field(raw: u32) -> KeySize {
        match raw {
            0 => KeySize::Aes128,
            1 => KeySize::Aes192,
            _ => KeySize::Aes256,
        }
    }
}

pub struct Aes {
    registers: StaticRef<AesRegisters>,
}

impl Aes {
    pub const fn new(base: StaticRef<AesRegisters>) -> Aes {
        Aes { registers: base }
    }

    /// Write CONTROL, XFRSIZE and STATUS in one go.
    pub fn initialize(&self, control: u32, xfrsize: u32, status: u32) {
        let regs = self.registers;
        if CONFIG.trace_init {
            debug!(
                "aes: initialize control {:#010x} xfrsize {}",
                control, xfrsize
            );
        }
        regs.control.set(control);
        regs.xfrsize.set(xfrsize);
        regs.status.set(status);
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
    pub fn enable_module(&self) {
        self.registers.control.clear_bits(CONTROL::RESET::SET);
    }

    /// Holds the module in reset.
    #[inline]
    pub fn disable_module(&self) {
        self.registers.control.set_bits(CONTROL::RESET::SET);
    }

    /// Pulse the module reset.
    pub fn reset_module(&self) {
        if CONFIG.trace_init {
            debug!("aes: reset");
        }
        self.registers.control.set_bits(CONTROL::RESET::SET);
        self.registers.control.clear_bits(CONTROL::RESET::SET);
    }

    #[inline]
    pub fn start_operation(&self) {
        self.registers.control.set_bits(CONTROL::XFRSTA::SET);
    }

    #[inline]
    pub fn is_busy(&self) -> bool {
        self.registers.status.is_set(STATUS::BUSYF)
    }

    #[inline]
    pub fn enable_key_capture(&self) {
        self.registers.control.set_bits(CONTROL::KEYCPEN::SET);
    }

    #[inline]
    pub fn disable_key_capture(&self) {
        self.registers.control.clear_bits(CONTROL::KEYCPEN::SET);
    }

    #[inline]
    pub fn select_encryption_mode(&self) {
        self.registers.control.set_bits(CONTROL::EDMD::Encrypt);
    }

    #[inline]
    pub fn select_decryption_mode(&self) {
        self.registers.control.clear_field(CONTROL::EDMD);
    }

    #[inline]
    pub fn select_software_mode(&self) {
        self.registers.control.set_bits(CONTROL::SWMDEN::SET);
    }

    #[inline]
    pub fn select_dma_mode(&self) {
        self.registers.control.clear_bits(CONTROL::SWMDEN::SET);
    }

    #[inline]
    pub fn enter_bypass_mode(&self) {
        self.registers.control.set_bits(CONTROL::BEN::SET);
    }

    #[inline]
    pub fn exit_bypass_mode(&self) {
        self.registers.control.clear_bits(CONTROL::BEN::SET);
    }

    #[inline]
    pub fn select_xor_path(&self, path: XorPath) {
        self.registers
            .control
            .select(CONTROL::XOREN.val(path as u32));
    }

    #[inline]
    pub fn enter_counter_mode(&self) {
        self.registers.control.set_bits(CONTROL::HCTREN::SET);
    }

    #[inline]
    pub fn exit_counter_mode(&self) {
        self.registers.control.clear_bits(CONTROL::HCTREN::SET);
    }

    #[inline]
    pub fn enter_cipher_block_chaining_mode(&self) {
        self.registers.control.set_bits(CONTROL::HCBCEN::SET);
    }

    #[inline]
    pub fn exit_cipher_block_chaining_mode(&self) {
        self.registers.control.clear_bits(CONTROL::HCBCEN::SET);
    }

    #[inline]
    pub fn select_key_size(&self, size: KeySize) {
        self.registers
            .control
            .select(CONTROL::KEYSIZE.val(size as u32));
    }

    #[inline]
    pub fn get_key_size(&self) -> KeySize {
        KeySize::from_field(self.registers.control.read(CONTROL::KEYSIZE))
    }

    #[inline]
    pub fn enable_error_interrupt(&self) {
        self.registers.control.set_bits(CONTROL::ERRIEN::SET);
    }

    #[inline]
    pub fn disable_error_interrupt(&self) {
        self.registers.control.clear_bits(CONTROL::ERRIEN::SET);
    }

    #[inline]
    pub fn is_error_interrupt_enabled(&self) -> bool {
        self.registers.control.is_set(CONTROL::ERRIEN)
    }

    #[inline]
    pub fn enable_operation_complete_interrupt(&self) {
        self.registers.control.set_bits(CONTROL::OCIEN::SET);
    }

    #[inline]
    pub fn disable_operation_complete_interrupt(&self) {
        self.registers.control.clear_bits(CONTROL::OCIEN::SET);
    }

    #[inline]
    pub fn is_operation_complete_interrupt_enabled(&self) -> bool {
        self.registers.control.is_set(CONTROL::OCIEN)
    }

    /// Halt the module while the core is stopped in the debugger.
    #[inline]
    pub fn enable_stall_in_debug_mode(&self) {
        self.registers.control.clear_field(CONTROL::DBGMD);
    }

    #[inline]
    pub fn disable_stall_in_debug_mode(&self) {
        self.registers.control.set_bits(CONTROL::DBGMD::Run);
    }

    /// `blocks` is the number of 16-byte blocks left to process, minus one.
    #[inline]
    pub fn write_xfrsize(&self, blocks: u32) {
        param_check!(blocks <= XFRSIZE_MAX);
        self.registers
            .xfrsize
            .write(XFRSIZE::XFRSIZE.val(blocks & XFRSIZE_MAX));
    }

    #[inline]
    pub fn read_xfrsize(&self) -> u32 {
        self.registers.xfrsize.read(XFRSIZE::XFRSIZE)
    }

    #[inline]
    pub fn write_datafifo_u32(&self, data: u32) {
        self.registers.datafifo.write_u32(data);
    }

    #[inline]
    pub fn write_datafifo_u16(&self, data: u16) {
        self.registers.datafifo.write_u16(data);
    }

    #[inline]
    pub fn write_datafifo_u8(&self, data: u8) {
        self.registers.datafifo.write_u8(data);
    }

    #[inline]
    pub fn read_datafifo_u32(&self) -> u32 {
        self.registers.datafifo.read_u32()
    }

    #[inline]
    pub fn read_datafifo_u16(&self) -> u16 {
        self.registers.datafifo.read_u16()
    }

    #[inline]
    pub fn read_datafifo_u8(&self) -> u8 {
        self.registers.datafifo.read_u8()
    }

    /// Push one 16-byte block, word 0 first.
    pub fn write_datafifo_full(&self, block: &[u32; 4]) {
        for word in block {
            self.registers.datafifo.write_u32(*word);
        }
    }

    /// Pop one 16-byte block, word 0 first.
    pub fn read_datafifo_full(&self) -> [u32; 4] {
        let mut block = [0; 4];
        for word in block.iter_mut() {
            *word = self.registers.datafifo.read_u32();
        }
        block
    }

    #[inline]
    pub fn write_xorfifo_u32(&self, data: u32) {
        self.registers.xorfifo.write_u32(data);
    }

    #[inline]
    pub fn write_xorfifo_u16(&self, data: u16) {
        self.registers.xorfifo.write_u16(data);
    }

    #[inline]
    pub fn write_xorfifo_u8(&self, data: u8) {
        self.registers.xorfifo.write_u8(data);
    }

    /// Push one 16-byte XOR vector, typically the IV.
    pub fn write_xorfifo_full(&self, vector: &[u32; 4]) {
        for word in vector {
            self.registers.xorfifo.write_u32(*word);
        }
    }

    /// Load all eight HWKEY registers, `key[0]` into HWKEY0.
    pub fn write_hardware_key(&self, key: &[u32; 8]) {
        for (reg, word) in self.registers.hwkey.iter().zip(key) {
            reg.value.set(*word);
        }
    }

    /// Read back as many key words as the selected key size uses. The
    /// remaining words are zero.
    pub fn read_hardware_key(&self) -> [u32; 8] {
        let mut key = [0; 8];
        let words = self.get_key_size().words();
        for (word, reg) in key.iter_mut().zip(self.registers.hwkey.iter()).take(words) {
            *word = reg.value.get();
        }
        key
    }

    pub fn write_hardware_counter(&self, counter: &[u32; 4]) {
        for (reg, word) in self.registers.hwctr.iter().zip(counter) {
            reg.value.set(*word);
        }
    }

    pub fn read_hardware_counter(&self) -> [u32; 4] {
        let mut counter = [0; 4];
        for (word, reg) in counter.iter_mut().zip(self.registers.hwctr.iter()) {
            *word = reg.value.get();
        }
        counter
    }

    #[inline]
    pub fn write_status(&self, status: u32) {
        self.registers.status.set(status);
    }

    #[inline]
    pub fn read_status(&self) -> u32 {
        self.registers.status.get()
    }

    /// Bytes in the data FIFO.
    #[inline]
    pub fn get_datafifo_count(&self) -> u32 {
        self.registers.status.read(STATUS::DFIFOLVL)
    }

    /// Bytes in the XOR FIFO.
    #[inline]
    pub fn get_xorfifo_count(&self) -> u32 {
        self.registers.status.read(STATUS::XFIFOLVL)
    }

    #[inline]
    pub fn has_data_underrun_occurred(&self) -> bool {
        self.registers.status.is_set(STATUS::DURI)
    }

    #[inline]
    pub fn clear_data_underrun_flag(&self) {
        self.registers.status.clear_bits(STATUS::DURI::SET);
    }

    #[inline]
    pub fn has_data_overrun_occurred(&self) -> bool {
        self.registers.status.is_set(STATUS::DORI)
    }

    #[inline]
    pub fn clear_data_overrun_flag(&self) {
        self.registers.status.clear_bits(STATUS::DORI::SET);
    }

    #[inline]
    pub fn has_xor_data_overrun_occurred(&self) -> bool {
        self.registers.status.is_set(STATUS::XORI)
    }

    #[inline]
    pub fn clear_xor_data_overrun_flag(&self) {
        self.registers.status.clear_bits(STATUS::XORI::SET);
    }

    #[inline]
    pub fn is_operation_complete_interrupt_pending(&self) -> bool {
        self.registers.status.is_set(STATUS::OCI)
    }

    #[inline]
    pub fn clear_operation_complete_interrupt(&self) {
        self.registers.status.clear_bits(STATUS::OCI::SET);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::FakeBlock;

    const CONTROL_OFF: usize = 0x000;
    const CONTROL_SET: usize = 0x004;
    const CONTROL_CLR: usize = 0x008;
    const XFRSIZE_OFF: usize = 0x010;
    const DATAFIFO_OFF: usize = 0x020;
    const XORFIFO_OFF: usize = 0x030;
    const HWKEY0_OFF: usize = 0x040;
    const HWCTR0_OFF: usize = 0x0C0;
    const STATUS_OFF: usize = 0x100;
    const STATUS_CLR: usize = 0x108;

    fn fixture() -> (FakeBlock, Aes) {
        let block = FakeBlock::new(0x110);
        let aes = Aes::new(block.registers());
        (block, aes)
    }

    #[test]
    fn module_reset_pulses_reset_bit() {
        let (block, aes) = fixture();
        aes.disable_module();
        assert_eq!(block.peek(CONTROL_SET), 1 << 31);
        assert_eq!(aes.read_control(), 1 << 31);

        aes.reset_module();
        assert_eq!(block.peek(CONTROL_CLR), 1 << 31);
        assert_eq!(aes.read_control(), 0);
    }

    #[test]
    fn mode_selects_touch_only_their_bits() {
        let (block, aes) = fixture();
        aes.write_control((1 << 25) | (1 << 9));

        aes.select_encryption_mode();
        aes.select_software_mode();
        aes.enter_counter_mode();
        aes.enable_key_capture();
        assert_eq!(
            aes.read_control(),
            (1 << 25) | (1 << 9) | (1 << 12) | (1 << 8) | (1 << 2) | (1 << 1)
        );

        aes.select_decryption_mode();
        assert_eq!(block.peek(CONTROL_CLR), 1 << 2);
        aes.exit_bypass_mode();
        assert!(aes.is_operation_complete_interrupt_enabled());
        assert_eq!(aes.read_control() & (1 << 9), 0);
    }

    #[test]
    fn xor_path_and_key_size_select() {
        let (block, aes) = fixture();
        aes.write_control(1 << 24);

        aes.select_xor_path(XorPath::Output);
        aes.select_key_size(KeySize::Aes192);
        assert_eq!(block.peek(CONTROL_OFF), (1 << 24) | (2 << 10) | (1 << 16));

        aes.select_xor_path(XorPath::Input);
        assert_eq!(block.peek(CONTROL_CLR), 3 << 10);
        assert_eq!(block.peek(CONTROL_OFF), (1 << 24) | (1 << 10) | (1 << 16));
        assert_eq!(aes.get_key_size(), KeySize::Aes192);
        assert!(aes.is_error_interrupt_enabled());
    }

    #[test]
    fn debug_stall_is_active_low() {
        let (_block, aes) = fixture();
        aes.disable_stall_in_debug_mode();
        assert_eq!(aes.read_control(), 1 << 30);
        aes.enable_stall_in_debug_mode();
        assert_eq!(aes.read_control(), 0);
    }

    #[test]
    fn hardware_key_follows_key_size() {
        let (block, aes) = fixture();
        let key = [1, 2, 3, 4, 5, 6, 7, 8];
        aes.write_hardware_key(&key);
        assert_eq!(block.peek(HWKEY0_OFF), 1);
        assert_eq!(block.peek(HWKEY0_OFF + 0x70), 8);

        assert_eq!(aes.read_hardware_key(), [1, 2, 3, 4, 0, 0, 0, 0]);
        aes.select_key_size(KeySize::Aes192);
        assert_eq!(aes.read_hardware_key(), [1, 2, 3, 4, 5, 6, 0, 0]);
        aes.select_key_size(KeySize::Aes256);
        assert_eq!(aes.read_hardware_key(), key);
    }

    #[test]
    fn hardware_counter_words() {
        let (block, aes) = fixture();
        aes.write_hardware_counter(&[0xA, 0xB, 0xC, 0xD]);
        assert_eq!(block.peek(HWCTR0_OFF + 0x10), 0xB);
        assert_eq!(block.peek(HWCTR0_OFF + 0x30), 0xD);
        assert_eq!(aes.read_hardware_counter(), [0xA, 0xB, 0xC, 0xD]);
    }

    #[test]
    fn fifo_block_writes_land_in_order() {
        let (block, aes) = fixture();
        aes.write_datafifo_full(&[1, 2, 3, 4]);
        // Plain memory keeps only the last word pushed.
        assert_eq!(block.peek(DATAFIFO_OFF), 4);
        aes.write_xorfifo_full(&[5, 6, 7, 8]);
        assert_eq!(block.peek(XORFIFO_OFF), 8);
        assert_eq!(aes.read_datafifo_full(), [4, 4, 4, 4]);
    }

    #[test]
    fn xfrsize_range() {
        let (block, aes) = fixture();
        aes.write_xfrsize(0x7FF);
        assert_eq!(block.peek(XFRSIZE_OFF), 0x7FF);
        assert_eq!(aes.read_xfrsize(), 0x7FF);
    }

    #[test]
    #[should_panic]
    fn xfrsize_too_large() {
        let (_block, aes) = fixture();
        aes.write_xfrsize(0x800);
    }

    #[test]
    fn status_flags_and_levels() {
        let (block, aes) = fixture();
        block.poke(STATUS_OFF, (1 << 31) | (1 << 28) | (1 << 24) | (3 << 8) | 16);

        assert!(aes.is_busy());
        assert_eq!(aes.get_datafifo_count(), 16);
        assert_eq!(aes.get_xorfifo_count(), 3);
        assert!(aes.has_data_underrun_occurred());
        assert!(!aes.has_data_overrun_occurred());
        assert!(aes.is_operation_complete_interrupt_pending());

        aes.clear_operation_complete_interrupt();
        assert_eq!(block.peek(STATUS_CLR), 1 << 31);
        aes.clear_data_underrun_flag();
        assert!(!aes.has_data_underrun_occurred());
        assert!(!aes.is_operation_complete_interrupt_pending());
    }
}
