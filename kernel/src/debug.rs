// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Tock Contributors 2024.

//! Support for in-driver debug output.
//!
//! The board registers any `core::fmt::Write` sink (usually a blocking UART
//! writer) with `set_debug_writer`. The `debug!` macro then formats into it
//! with a `HAL_DEBUG: file:line: ` prefix:
//!
//! ```ignore
//! debug!("eusart: clock div {}", div);
//! ```
//!
//! Until a sink is registered, output is dropped.

use core::fmt::{write, Arguments, Write};
use core::ptr::addr_of_mut;

static mut DEBUG_WRITER: Option<&'static mut dyn Write> = None;

/// Register the sink used by `debug!`.
///
/// # Safety
///
/// Must not race with another call to this function or with `debug!`. Boards
/// call it once during setup, before interrupts are enabled.
pub unsafe fn set_debug_writer(writer: &'static mut dyn Write) {
    *addr_of_mut!(DEBUG_WRITER) = Some(writer);
}

fn with_writer<F: FnOnce(&mut dyn Write)>(f: F) {
    // Single core, and no driver in this workspace prints from interrupt
    // context.
    let writer = unsafe { &mut *addr_of_mut!(DEBUG_WRITER) };
    if let Some(writer) = writer.as_deref_mut() {
        f(writer);
    }
}

pub fn begin_debug_fmt(args: Arguments, file_line: &(&'static str, u32)) {
    with_writer(|writer| {
        let (file, line) = *file_line;
        let _ = writer.write_fmt(format_args!("HAL_DEBUG: {}:{}: ", file, line));
        let _ = write(writer, args);
        let _ = writer.write_str("\r\n");
    });
}

pub fn begin_debug(msg: &str, file_line: &(&'static str, u32)) {
    with_writer(|writer| {
        let (file, line) = *file_line;
        let _ = writer.write_fmt(format_args!("HAL_DEBUG: {}:{}: ", file, line));
        let _ = writer.write_fmt(format_args!("{}\r\n", msg));
    });
}

/// In-driver `println!()`-style output.
#[macro_export]
macro_rules! debug {
    () => ({
        // Allow an empty debug!() to print the location when hit
        $crate::debug!("")
    });
    ($msg:expr $(,)?) => ({
        $crate::debug::begin_debug($msg, {
            static _FILE_LINE: (&'static str, u32) = (file!(), line!());
            &_FILE_LINE
        })
    });
    ($fmt:expr, $($arg:tt)+) => ({
        $crate::debug::begin_debug_fmt(format_args!($fmt, $($arg)+), {
            static _FILE_LINE: (&'static str, u32) = (file!(), line!());
            &_FILE_LINE
        })
    });
}

#[cfg(test)]
mod tests {
    use core::fmt::{Result, Write};
    use std::boxed::Box;
    use std::string::String;

    struct Capture(String);

    impl Write for Capture {
        fn write_str(&mut self, s: &str) -> Result {
            self.0.push_str(s);
            Ok(())
        }
    }

    #[test]
    fn prefixes_file_and_line() {
        let sink: &'static mut Capture = Box::leak(Box::new(Capture(String::new())));
        let sink_ptr: *const Capture = sink;
        unsafe { super::set_debug_writer(sink) };

        let line = line!() + 1;
        debug!("divider {}", 662);

        let out = unsafe { &(*sink_ptr).0 };
        assert!(out.starts_with("HAL_DEBUG: "));
        assert!(out.contains(&std::format!(":{}: divider 662\r\n", line)));
    }
}
