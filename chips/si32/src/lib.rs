// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Peripheral drivers for Silicon Labs SiM3 (SI32) devices.
//!
//! Most SI32 control registers come with write-only SET and CLR words at +4
//! and +8, modelled by `kernel::utilities::set_clear::SetClearRegister`.
//! Single-bit operations go through those words. Multi-bit fields are
//! replaced either by a CLR of the field followed by a SET of the new value,
//! or by a read-modify-write of the base register.
//!
//! AES_B, SPI_B and TIMER_A base addresses are those of the SiM3L1xx, UART_A
//! those of the SiM3C1xx.

#![no_std]
#![crate_name = "si32"]
#![crate_type = "rlib"]

#[cfg(test)]
extern crate std;

pub mod aes;
pub mod fifo;
pub mod spi;
pub mod timer;
pub mod uart;

#[cfg(test)]
mod test;
