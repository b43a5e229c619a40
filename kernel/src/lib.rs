// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Support crate shared by the SI32 and EFR32 peripheral drivers.
//!
//! Holds the pieces every chip crate needs and that do not belong to any one
//! peripheral:
//!
//! - `utilities::StaticRef` and the `tock-registers` re-exports used to
//!   describe MMIO register blocks;
//! - `utilities::set_clear` for the two flavours of shadow set/clear
//!   registers;
//! - `ErrorCode` for the few fallible operations;
//! - the compile-time `config::CONFIG` object with the `param_check!` macro;
//! - the `debug!` macro.

#![no_std]

#[cfg(test)]
extern crate std;

#[macro_use]
pub mod debug;
#[macro_use]
pub mod config;
pub mod errorcode;
pub mod utilities;

pub use crate::errorcode::ErrorCode;
