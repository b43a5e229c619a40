// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Plain memory standing in for a register block during host tests.

use core::ptr;
use kernel::utilities::StaticRef;
use std::vec::Vec;

pub struct FakeBlock {
    base: *mut u32,
}

impl FakeBlock {
    pub fn new(bytes: usize) -> FakeBlock {
        let mem = Vec::leak(std::vec![0u32; bytes / 4]);
        FakeBlock {
            base: mem.as_mut_ptr(),
        }
    }

    pub fn registers<T>(&self) -> StaticRef<T> {
        unsafe { StaticRef::new(self.base as *const T) }
    }

    pub fn peek(&self, offset: usize) -> u32 {
        unsafe { ptr::read_volatile(self.base.byte_add(offset)) }
    }

    pub fn poke(&self, offset: usize, value: u32) {
        unsafe { ptr::write_volatile(self.base.byte_add(offset), value) }
    }
}
