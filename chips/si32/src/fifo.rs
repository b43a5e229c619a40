// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! FIFO data ports.
//!
//! SI32 FIFO registers (`DATA`, `DATAFIFO`, `XORFIFO`) decode the access
//! width: a byte store pushes one byte, a halfword store two, a word store
//! four. Reads pop the same way. `register_structs!` only knows one width
//! per offset, so the port is a 32-bit register with narrow accessors that
//! address its low-order bytes. SI32 parts are little-endian.

use core::ptr;

use kernel::utilities::registers::interfaces::{Readable, Writeable};
use kernel::utilities::registers::ReadWrite;

#[repr(transparent)]
pub struct DataPort(ReadWrite<u32>);

impl DataPort {
    fn ptr(&self) -> *mut u32 {
        ptr::from_ref(&self.0).cast::<u32>().cast_mut()
    }

    #[inline]
    pub fn read_u32(&self) -> u32 {
        self.0.get()
    }

    #[inline]
    pub fn read_u16(&self) -> u16 {
        // SAFETY: the port is a valid MMIO word, its low halfword is a valid
        // 16-bit access.
        unsafe { ptr::read_volatile(self.ptr().cast::<u16>()) }
    }

    #[inline]
    pub fn read_u8(&self) -> u8 {
        // SAFETY: as above, for the low byte.
        unsafe { ptr::read_volatile(self.ptr().cast::<u8>()) }
    }

    #[inline]
    pub fn write_u32(&self, value: u32) {
        self.0.set(value);
    }

    #[inline]
    pub fn write_u16(&self, value: u16) {
        // SAFETY: see `read_u16`.
        unsafe { ptr::write_volatile(self.ptr().cast::<u16>(), value) }
    }

    #[inline]
    pub fn write_u8(&self, value: u8) {
        // SAFETY: see `read_u8`.
        unsafe { ptr::write_volatile(self.ptr().cast::<u8>(), value) }
    }
}

#[cfg(test)]
mod tests {
    use super::DataPort;
    use crate::test::FakeBlock;
    use kernel::utilities::StaticRef;

    #[test]
    fn narrow_accesses_hit_the_low_bytes() {
        let block = FakeBlock::new(0x10);
        let port: StaticRef<DataPort> = block.registers();

        port.write_u32(0xAABB_CCDD);
        port.write_u16(0x1122);
        assert_eq!(block.peek(0), 0xAABB_1122);
        port.write_u8(0x33);
        assert_eq!(block.peek(0), 0xAABB_1133);

        assert_eq!(port.read_u8(), 0x33);
        assert_eq!(port.read_u16(), 0x1133);
        assert_eq!(port.read_u32(), 0xAABB_1133);
    }
}
