/*
    Copyright (C) 2026  ZX Spectrum core contributors

    This file is part of spectrum48-core, a cycle-accurate ZX Spectrum 48K
    emulation core.

    For the full copyright notice, see the lib.rs file.
*/
//! T-state timestamp types and frame constants.
//!
//! The 48K machine's master clock ticks at 3.5 MHz. One frame is exactly
//! [`FRAME_TSTATES`] T-states long; the ULA asserts its interrupt request at
//! the start of every frame and auto-deasserts it after [`IRQ_PULSE_TSTATES`].

/// A linear T-state counter. Signed so that contention deltas can be
/// reasoned about relative to a frame-local origin without wrapping tricks.
pub type FTs = i32;

/// CPU clock rate in Hz for the 48K machine.
pub const CPU_HZ: u32 = 3_500_000;

/// Number of T-states in a single 50 Hz video frame.
pub const FRAME_TSTATES: FTs = 69_888;

/// How long the ULA holds its interrupt request line active at the start of
/// a frame, in T-states.
pub const IRQ_PULSE_TSTATES: FTs = 32;

/// First scanline during which pixels are drawn (inclusive).
pub const FIRST_PIXEL_LINE: FTs = 0;
/// Last scanline during which pixels are drawn (inclusive).
pub const LAST_PIXEL_LINE: FTs = 191;
/// Number of T-states consumed per scanline (contended + non-contended).
pub const TSTATES_PER_LINE: FTs = 224;
/// Number of T-states of a scanline that fall within the contended window
/// (the 128 T-states during which the ULA is actively fetching pixel data).
pub const CONTENDED_TSTATES_PER_LINE: FTs = 128;

/// Returns `true` if `tstate` (frame-relative) falls within the ULA's
/// pixel-drawing window, where contended memory accesses are delayed.
#[inline]
pub fn in_pixel_drawing_window(tstate: FTs) -> bool {
    if tstate < 0 {
        return false;
    }
    let line = tstate / TSTATES_PER_LINE;
    if !(FIRST_PIXEL_LINE..=LAST_PIXEL_LINE).contains(&line) {
        return false;
    }
    let col = tstate % TSTATES_PER_LINE;
    col < CONTENDED_TSTATES_PER_LINE
}

/// The repeating 8-T-state contention delay pattern documented for the 48K
/// ULA: `6,5,4,3,2,1,0,0`.
pub const CONTENTION_PATTERN: [u32; 8] = [6, 5, 4, 3, 2, 1, 0, 0];

/// Returns the number of extra T-states a contended memory or IO access at
/// frame-relative `tstate` must wait, or 0 if the access falls outside the
/// pixel-drawing window.
#[inline]
pub fn contention_delay(tstate: FTs) -> u32 {
    if !in_pixel_drawing_window(tstate) {
        return 0;
    }
    let phase = (tstate % TSTATES_PER_LINE) % 8;
    CONTENTION_PATTERN[phase as usize]
}
