// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2022-2023 Andre Richter <andre.o.richter@gmail.com>

//! Display engine.
//!
//! Two registries live here. The video output is what the BSP provides to obtain a framebuffer.
//! The display is what the terminal renders into. Once [`init`] has set up the framebuffer, the
//! display is a [`text::TextScreen`] on it, and the kernel console prints there as well.

mod font;
pub mod text;

use crate::{
    config, console,
    synchronization::{self, interface::Mutex, IRQSafeNullLock, InitStateLock},
};
use core::{
    fmt,
    sync::atomic::{AtomicUsize, Ordering},
};

//--------------------------------------------------------------------------------------------------
// Public Definitions
//--------------------------------------------------------------------------------------------------

/// Display interfaces.
pub mod interface {
    pub use term_core::interface::Render;

    /// The hardware side of the display: hands out a framebuffer.
    pub trait VideoOutput {
        /// Configure the video output. Called once at boot.
        fn establish_video_surface(
            &self,
            width: u32,
            height: u32,
            depth: u32,
        ) -> Result<super::VideoSurface, &'static str>;

        /// Load `colors` (0xRRGGBB) into the palette, starting at index 0.
        fn set_palette(&self, colors: &[u32]) -> Result<(), &'static str>;
    }
}

/// A framebuffer as handed out by the video output.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct VideoSurface {
    /// CPU address of the first pixel.
    pub base: usize,

    /// Size in bytes.
    pub size: usize,

    /// Bytes per pixel line.
    pub pitch: usize,

    #[allow(missing_docs)]
    pub width: usize,
    #[allow(missing_docs)]
    pub height: usize,

    /// Bits per pixel.
    pub depth: usize,
}

/// The 16 xterm colors, 0xRRGGBB.
pub const XTERM_PALETTE: [u32; 16] = [
    0x000000, 0xCD0000, 0x00CD00, 0xCDCD00, 0x0000EE, 0xCD00CD, 0x00CDCD, 0xE5E5E5, //
    0x7F7F7F, 0xFF0000, 0x00FF00, 0xFFFF00, 0x5C5CFF, 0xFF00FF, 0x00FFFF, 0xFFFFFF, //
];

/// Renders into the text screen, once there is one.
pub struct FramebufferDisplay {
    screen: IRQSafeNullLock<Option<text::TextScreen>>,
}

/// Adapts whatever display is registered to the console interface.
pub struct DisplayConsole {
    chars_written: AtomicUsize,
}

//--------------------------------------------------------------------------------------------------
// Private Definitions
//--------------------------------------------------------------------------------------------------

struct NullVideoOutput;

struct NullDisplay;

/// `core::fmt::Write` sink on top of the display registry.
struct DisplayWriter<'a>(&'a DisplayConsole);

//--------------------------------------------------------------------------------------------------
// Global instances
//--------------------------------------------------------------------------------------------------

static NULL_VIDEO_OUTPUT: NullVideoOutput = NullVideoOutput;
static NULL_DISPLAY: NullDisplay = NullDisplay;

static FRAMEBUFFER_DISPLAY: FramebufferDisplay = FramebufferDisplay {
    screen: IRQSafeNullLock::new(None),
};

/// The console that prints to the screen.
pub static DISPLAY_CONSOLE: DisplayConsole = DisplayConsole {
    chars_written: AtomicUsize::new(0),
};

static CUR_VIDEO_OUTPUT: InitStateLock<&'static (dyn interface::VideoOutput + Sync)> =
    InitStateLock::new(&NULL_VIDEO_OUTPUT);

static CUR_DISPLAY: InitStateLock<&'static (dyn interface::Render + Sync)> =
    InitStateLock::new(&NULL_DISPLAY);

//--------------------------------------------------------------------------------------------------
// Private Code
//--------------------------------------------------------------------------------------------------

impl interface::VideoOutput for NullVideoOutput {
    fn establish_video_surface(&self, _: u32, _: u32, _: u32) -> Result<VideoSurface, &'static str> {
        Err("No video output registered")
    }

    fn set_palette(&self, _colors: &[u32]) -> Result<(), &'static str> {
        Err("No video output registered")
    }
}

impl interface::Render for NullDisplay {
    fn render_string(&self, _bytes: &[u8]) {}
}

impl fmt::Write for DisplayWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        console::interface::Write::write_bytes(self.0, s.as_bytes());

        Ok(())
    }
}

//--------------------------------------------------------------------------------------------------
// Public Code
//--------------------------------------------------------------------------------------------------
use synchronization::interface::ReadWriteEx;

/// Register a new video output.
pub fn register_video_output(new_output: &'static (dyn interface::VideoOutput + Sync)) {
    CUR_VIDEO_OUTPUT.write(|output| *output = new_output);
}

/// Return a reference to the currently registered video output.
pub fn video_output() -> &'static dyn interface::VideoOutput {
    CUR_VIDEO_OUTPUT.read(|output| *output)
}

/// Register a new display.
pub fn register_display(new_display: &'static (dyn interface::Render + Sync)) {
    CUR_DISPLAY.write(|display| *display = new_display);
}

/// Return a reference to the currently registered display.
pub fn display() -> &'static dyn interface::Render {
    CUR_DISPLAY.read(|display| *display)
}

/// Bring up the framebuffer text screen and make it the display.
///
/// Outside of test builds, it also becomes the kernel console.
pub fn init() -> Result<VideoSurface, &'static str> {
    let output = video_output();

    let surface = output.establish_video_surface(
        config::VIDEO_WIDTH,
        config::VIDEO_HEIGHT,
        config::VIDEO_DEPTH,
    )?;
    output.set_palette(&XTERM_PALETTE)?;

    let mut screen = text::TextScreen::new(surface)?;
    screen.clear();
    FRAMEBUFFER_DISPLAY.attach(screen)?;

    register_display(&FRAMEBUFFER_DISPLAY);

    #[cfg(not(feature = "test_build"))]
    console::register_console(&DISPLAY_CONSOLE);

    Ok(surface)
}

impl FramebufferDisplay {
    fn attach(&self, screen: text::TextScreen) -> Result<(), &'static str> {
        self.screen.lock(|slot| {
            if slot.is_some() {
                return Err("Framebuffer display already attached");
            }
            *slot = Some(screen);

            Ok(())
        })
    }

    /// Terminal size as (columns, rows), if a screen is attached.
    pub fn size(&self) -> Option<(usize, usize)> {
        self.screen.lock(|slot| slot.as_ref().map(|screen| screen.size()))
    }
}

impl interface::Render for FramebufferDisplay {
    fn render_char(&self, byte: u8) {
        self.screen.lock(|slot| {
            if let Some(screen) = slot {
                screen.write_byte(byte);
            }
        })
    }

    fn render_string(&self, bytes: &[u8]) {
        self.screen.lock(|slot| {
            if let Some(screen) = slot {
                screen.write_bytes(bytes);
            }
        })
    }
}

//------------------------------------------------------------------------------
// OS Interface Code
//------------------------------------------------------------------------------

impl console::interface::Write for DisplayConsole {
    fn write_char(&self, c: char) {
        let mut utf8 = [0; 4];

        self.write_bytes(c.encode_utf8(&mut utf8).as_bytes());
    }

    fn write_bytes(&self, bytes: &[u8]) {
        display().render_string(bytes);
        self.chars_written.fetch_add(bytes.len(), Ordering::Relaxed);
    }

    fn write_fmt(&self, args: fmt::Arguments) -> fmt::Result {
        fmt::Write::write_fmt(&mut DisplayWriter(self), args)
    }
}

impl console::interface::Statistics for DisplayConsole {
    fn chars_written(&self) -> usize {
        self.chars_written.load(Ordering::Relaxed)
    }
}

impl console::interface::All for DisplayConsole {}

//--------------------------------------------------------------------------------------------------
// Testing
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::{interface::Render, *};
    use test_macros::kernel_test;

    #[kernel_test]
    fn null_video_output_refuses() {
        use interface::VideoOutput;

        assert!(NULL_VIDEO_OUTPUT.establish_video_surface(640, 480, 8).is_err());
        assert!(NULL_VIDEO_OUTPUT.set_palette(&XTERM_PALETTE).is_err());
    }

    #[kernel_test]
    fn detached_framebuffer_display_discards() {
        let display = FramebufferDisplay {
            screen: IRQSafeNullLock::new(None),
        };

        display.render_string(b"lost");
        assert_eq!(display.size(), None);
    }

    #[kernel_test]
    fn display_console_counts_bytes() {
        use console::interface::{Statistics, Write};

        let console = DisplayConsole {
            chars_written: AtomicUsize::new(0),
        };
        console.write_bytes(b"abc");
        console.write_char('\u{e9}');

        assert_eq!(console.chars_written(), 5);
    }
}
