// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Data structure for storing compile-time configuration options shared by
//! the chip crates.
//!
//! Configuration is a `const` object rather than a set of `#[cfg]` blocks.
//! Cargo features are still the switch, but they are only read here, once,
//! and turned into booleans. Every code path that tests one of these booleans
//! is type-checked by the compiler whether or not the option is enabled, and
//! after constant folding a disabled branch costs nothing in the final image.
//!
//! The chip crates read `CONFIG` through the macros exported by this crate
//! (`param_check!`) and directly for tracing, which is why the object is
//! public rather than crate-private.

/// Data structure holding compile-time configuration options.
///
/// To change the configuration, enable the matching cargo feature on the
/// `kernel` dependency of the crate producing the final binary.
pub struct Config {
    /// Whether parameter assertions in the peripheral drivers are evaluated.
    ///
    /// Out-of-range arguments (a zero baud rate, a divider that does not fit
    /// its register field, a channel past the end of the channel array) are
    /// programming errors. With checks on they panic at the call site; with
    /// checks off the value is masked into its field and the hardware does
    /// whatever it does with it.
    pub param_checks: bool,

    /// Whether peripheral initialization and reset paths print a line to the
    /// debug output.
    pub trace_init: bool,

    /// Whether writes to SET/CLR/TGL shadow addresses are also applied to the
    /// base register by software.
    ///
    /// Silicon does this in hardware, so this must stay off on a target. It
    /// exists for running the drivers against plain memory.
    pub emulate_set_clear: bool,
}

/// A unique instance of `Config` where compile-time configuration options are
/// defined. This is the only location in the workspace where `cfg!` is used
/// to read Cargo features.
pub const CONFIG: Config = Config {
    param_checks: cfg!(debug_assertions) && !cfg!(feature = "no_param_checks"),
    trace_init: cfg!(feature = "trace_init"),
    emulate_set_clear: cfg!(feature = "emulate_set_clear"),
};

/// Assert a driver parameter precondition when `CONFIG.param_checks` is set.
///
/// Takes the same arguments as `assert!`.
#[macro_export]
macro_rules! param_check {
    ($cond:expr $(,)?) => {
        if $crate::config::CONFIG.param_checks {
            assert!($cond);
        }
    };
    ($cond:expr, $($arg:tt)+) => {
        if $crate::config::CONFIG.param_checks {
            assert!($cond, $($arg)+);
        }
    };
}
