// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Peripheral drivers for Silicon Labs EFR32 series-2 devices.
//!
//! Base addresses and instance counts are those of the EFR32BG27. Every
//! series-2 register block is mirrored at +0x1000 (set), +0x2000 (clear) and
//! +0x3000 (toggle); the drivers reach those aliases through
//! `kernel::utilities::set_clear::SetClearAlias`.

#![no_std]
#![crate_name = "efr32"]
#![crate_type = "rlib"]

#[cfg(test)]
extern crate std;

pub mod eusart;
pub mod prs;
pub mod timer;
pub mod usart;
