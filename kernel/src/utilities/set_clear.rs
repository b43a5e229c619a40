// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Shadow register support.
//!
//! Both chip families let software flip bits without a read-modify-write:
//!
//! - SI32 peripherals lay out most registers as a 16-byte group: the register
//!   itself, a write-only SET word at +4 and a write-only CLR word at +8.
//!   Writing a mask to SET ORs it in, writing a mask to CLR ANDs it out. That
//!   group is `SetClearRegister`.
//! - EFR32 series-2 peripherals mirror the whole register block at fixed
//!   offsets from the block base: +0x1000 sets bits, +0x2000 clears bits and
//!   +0x3000 toggles bits. Any register in the block gets those aliases
//!   through the `SetClearAlias` extension trait.
//!
//! When `CONFIG.emulate_set_clear` is enabled the same operation is also
//! applied to the base register in software, which is what makes the drivers
//! testable against ordinary memory.

use core::ptr;

use tock_registers::fields::{Field, FieldValue};
use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};
use tock_registers::registers::{ReadWrite, WriteOnly};
use tock_registers::RegisterLongName;

use crate::config::CONFIG;

/// Distance from a series-2 register to its bit-set alias.
pub const SET_ALIAS_OFFSET: usize = 0x1000;
/// Distance from a series-2 register to its bit-clear alias.
pub const CLR_ALIAS_OFFSET: usize = 0x2000;
/// Distance from a series-2 register to its bit-toggle alias.
pub const TGL_ALIAS_OFFSET: usize = 0x3000;

/// An SI32 register with its SET and CLR shadow words.
#[repr(C)]
pub struct SetClearRegister<R: RegisterLongName = ()> {
    reg: ReadWrite<u32, R>,
    set: WriteOnly<u32, R>,
    clr: WriteOnly<u32, R>,
    _reserved: u32,
}

impl<R: RegisterLongName> SetClearRegister<R> {
    #[inline]
    pub fn get(&self) -> u32 {
        self.reg.get()
    }

    /// Overwrite the whole register.
    #[inline]
    pub fn set(&self, value: u32) {
        self.reg.set(value);
    }

    #[inline]
    pub fn read(&self, field: Field<u32, R>) -> u32 {
        self.reg.read(field)
    }

    #[inline]
    pub fn is_set(&self, field: Field<u32, R>) -> bool {
        self.reg.is_set(field)
    }

    #[inline]
    pub fn write(&self, value: FieldValue<u32, R>) {
        self.reg.write(value);
    }

    /// Read-modify-write through the base register.
    #[inline]
    pub fn modify(&self, value: FieldValue<u32, R>) {
        self.reg.modify(value);
    }

    #[inline]
    pub fn set_mask(&self, mask: u32) {
        self.set.set(mask);
        if CONFIG.emulate_set_clear {
            self.reg.set(self.reg.get() | mask);
        }
    }

    #[inline]
    pub fn clear_mask(&self, mask: u32) {
        self.clr.set(mask);
        if CONFIG.emulate_set_clear {
            self.reg.set(self.reg.get() & !mask);
        }
    }

    /// Set the bits of `bits` through the SET word.
    #[inline]
    pub fn set_bits(&self, bits: FieldValue<u32, R>) {
        self.set_mask(bits.value);
    }

    /// Clear the bits of `bits` through the CLR word.
    #[inline]
    pub fn clear_bits(&self, bits: FieldValue<u32, R>) {
        self.clear_mask(bits.value);
    }

    /// Clear every bit of `field`.
    #[inline]
    pub fn clear_field(&self, field: Field<u32, R>) {
        self.clear_mask(field.mask << field.shift);
    }

    /// Replace the fields covered by `value`: CLR with the field mask, then
    /// SET with the new contents. Two writes, so not atomic.
    #[inline]
    pub fn select(&self, value: FieldValue<u32, R>) {
        self.clear_mask(value.mask());
        self.set_mask(value.value);
    }
}

/// Bit set, clear and toggle through the series-2 block aliases.
///
/// Implemented for every 32-bit register type that can appear in a series-2
/// register block. The register must be located inside an MMIO block that
/// actually has aliases; anything else writes to unrelated memory.
pub trait SetClearAlias {
    type Reg: RegisterLongName;

    /// Address of the base register.
    fn base_ptr(&self) -> *mut u32;

    #[inline]
    fn set_mask(&self, mask: u32) {
        alias_write(self.base_ptr(), SET_ALIAS_OFFSET, mask, |v| v | mask);
    }

    #[inline]
    fn clear_mask(&self, mask: u32) {
        alias_write(self.base_ptr(), CLR_ALIAS_OFFSET, mask, |v| v & !mask);
    }

    #[inline]
    fn toggle_mask(&self, mask: u32) {
        alias_write(self.base_ptr(), TGL_ALIAS_OFFSET, mask, |v| v ^ mask);
    }

    #[inline]
    fn set_bits(&self, bits: FieldValue<u32, Self::Reg>) {
        self.set_mask(bits.value);
    }

    #[inline]
    fn clear_bits(&self, bits: FieldValue<u32, Self::Reg>) {
        self.clear_mask(bits.value);
    }

    #[inline]
    fn toggle_bits(&self, bits: FieldValue<u32, Self::Reg>) {
        self.toggle_mask(bits.value);
    }
}

fn alias_write<F: FnOnce(u32) -> u32>(base: *mut u32, offset: usize, mask: u32, emulate: F) {
    // SAFETY: `base` is a register inside a series-2 peripheral block, and the
    // block is mirrored at `offset`.
    unsafe {
        ptr::write_volatile(base.byte_add(offset), mask);
        if CONFIG.emulate_set_clear {
            ptr::write_volatile(base, emulate(ptr::read_volatile(base)));
        }
    }
}

impl<R: RegisterLongName> SetClearAlias for ReadWrite<u32, R> {
    type Reg = R;

    fn base_ptr(&self) -> *mut u32 {
        ptr::from_ref(self).cast::<u32>().cast_mut()
    }
}

impl<R: RegisterLongName> SetClearAlias for WriteOnly<u32, R> {
    type Reg = R;

    fn base_ptr(&self) -> *mut u32 {
        ptr::from_ref(self).cast::<u32>().cast_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::{SetClearAlias, SetClearRegister};
    use crate::config::CONFIG;
    use std::vec::Vec;
    use tock_registers::register_bitfields;
    use tock_registers::registers::ReadWrite;

    register_bitfields![u32,
        CTRL [
            EN OFFSET(0) NUMBITS(1) [],
            MODE OFFSET(4) NUMBITS(3) [
                A = 1,
                B = 5
            ],
            HIGH OFFSET(24) NUMBITS(8) []
        ]
    ];

    fn memory(words: usize, first: u32) -> *mut u32 {
        let mut mem = std::vec![0u32; words];
        mem[0] = first;
        Vec::leak(mem).as_mut_ptr()
    }

    fn word(base: *mut u32, index: usize) -> u32 {
        unsafe { base.add(index).read_volatile() }
    }

    #[test]
    fn set_and_clear_words_receive_exact_mask() {
        let base = memory(4, 0xAB00_0000);
        let reg = unsafe { &*base.cast::<SetClearRegister<CTRL::Register>>() };

        reg.set_bits(CTRL::EN::SET);
        assert_eq!(word(base, 1), 0x1);
        reg.clear_bits(CTRL::MODE::B);
        assert_eq!(word(base, 2), 0x50);
        reg.clear_field(CTRL::HIGH);
        assert_eq!(word(base, 2), 0xFF00_0000);

        if CONFIG.emulate_set_clear {
            assert_eq!(reg.get(), 0x0000_0001);
        } else {
            assert_eq!(reg.get(), 0xAB00_0000);
        }
    }

    #[test]
    fn select_replaces_only_the_target_field() {
        let base = memory(4, 0xAB00_0031);
        let reg = unsafe { &*base.cast::<SetClearRegister<CTRL::Register>>() };

        reg.select(CTRL::MODE::B);
        assert_eq!(word(base, 2), 0x70);
        assert_eq!(word(base, 1), 0x50);
        if CONFIG.emulate_set_clear {
            assert_eq!(reg.get(), 0xAB00_0051);
            assert_eq!(reg.read(CTRL::MODE), 5);
        }
    }

    #[test]
    fn block_aliases_are_offset_from_the_register() {
        let base = memory(0x1000, 0x0000_00F0);
        let reg = unsafe { &*base.cast::<ReadWrite<u32, CTRL::Register>>() };

        reg.set_mask(0x0000_0101);
        assert_eq!(word(base, 0x1000 / 4), 0x0000_0101);
        reg.clear_mask(0x0000_0030);
        assert_eq!(word(base, 0x2000 / 4), 0x0000_0030);
        reg.toggle_bits(CTRL::EN::SET);
        assert_eq!(word(base, 0x3000 / 4), 0x0000_0001);

        if CONFIG.emulate_set_clear {
            assert_eq!(word(base, 0), 0x0000_01C0);
        } else {
            assert_eq!(word(base, 0), 0x0000_00F0);
        }
    }
}
