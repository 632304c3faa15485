// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2022-2023 Andre Richter <andre.o.richter@gmail.com>

//! A console that buffers output during the init phase.

use super::interface;
use crate::{console, info, synchronization, synchronization::InitStateLock};
use core::fmt;

//--------------------------------------------------------------------------------------------------
// Private Definitions
//--------------------------------------------------------------------------------------------------

const BUF_SIZE: usize = 1024;

pub struct BufferConsoleInner {
    buf: [u8; BUF_SIZE],
    write_ptr: usize,
    overflowed: bool,
}

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

pub struct BufferConsole {
    inner: InitStateLock<BufferConsoleInner>,
}

//--------------------------------------------------------------------------------------------------
// Global instances
//--------------------------------------------------------------------------------------------------

pub static BUFFER_CONSOLE: BufferConsole = BufferConsole {
    inner: InitStateLock::new(BufferConsoleInner {
        // Zero-initialized, so this lands in .bss and does not waste space in the binary.
        buf: [0; BUF_SIZE],
        write_ptr: 0,
        overflowed: false,
    }),
};

//--------------------------------------------------------------------------------------------------
// Private Code
//--------------------------------------------------------------------------------------------------

impl BufferConsoleInner {
    fn write_bytes(&mut self, bytes: &[u8]) {
        let room = BUF_SIZE - self.write_ptr;
        let n = bytes.len().min(room);

        self.buf[self.write_ptr..self.write_ptr + n].copy_from_slice(&bytes[..n]);
        self.write_ptr += n;

        if n < bytes.len() {
            self.overflowed = true;
        }
    }
}

impl fmt::Write for BufferConsoleInner {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write_bytes(s.as_bytes());

        Ok(())
    }
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------
use synchronization::interface::ReadWriteEx;

impl BufferConsole {
    /// Dump the buffer.
    ///
    /// # Invariant
    ///
    /// It is expected that this is only called when self != crate::console::console().
    pub fn dump(&self) {
        self.inner.read(|inner| {
            console::console().write_bytes(&inner.buf[0..inner.write_ptr]);

            if inner.overflowed {
                info!("Boot log buffer overflowed");
            } else if inner.write_ptr > 0 {
                info!("End of boot log buffer")
            }
        });
    }
}

impl interface::Write for BufferConsole {
    fn write_char(&self, c: char) {
        let mut utf8 = [0; 4];

        self.write_bytes(c.encode_utf8(&mut utf8).as_bytes());
    }

    fn write_bytes(&self, bytes: &[u8]) {
        self.inner.write(|inner| inner.write_bytes(bytes));
    }

    fn write_fmt(&self, args: fmt::Arguments) -> fmt::Result {
        self.inner.write(|inner| fmt::Write::write_fmt(inner, args))
    }
}

impl interface::Statistics for BufferConsole {
    fn chars_written(&self) -> usize {
        self.inner.read(|inner| inner.write_ptr)
    }
}

impl interface::All for BufferConsole {}
