/*
    Copyright (C) 2026  ZX Spectrum core contributors

    This file is part of spectrum48-core, a cycle-accurate ZX Spectrum 48K
    emulation core.

    For the full copyright notice, see the lib.rs file.
*/
//! Wires the CPU, memory, ULA and keyboard into the machine the shell
//! drives frame by frame.
//!
//! [`Core`] owns every component outright and constructs a transient
//! [`BusCtx`] for each [`crate::cpu::Cpu::step`] call, so the CPU and ULA
//! never hold a back-reference to each other or to `Core` itself.
use log::trace;

use crate::bus::BusCtx;
use crate::clock::{FTs, FRAME_TSTATES};
use crate::cpu::{Cpu, RegisterSnapshot};
use crate::error::CoreError;
use crate::keyboard::{Key, KeyId, Keyboard};
use crate::memory::Memory;
use crate::ula::{SpeakerSample, Ula};

/// Why [`Core::run_frame`] or [`Core::run_for`] returned control to the
/// shell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The requested T-state budget was exhausted on a natural boundary.
    FrameComplete,
    /// The CPU's PC matched a configured breakpoint at an instruction
    /// boundary.
    BreakpointHit(u16),
    /// A configured watchpoint address was touched.
    WatchpointHit(u16, WatchpointKind),
    /// A single-instruction step request completed.
    StepComplete,
    /// The CPU is halted with interrupts disabled and no NMI pending: it
    /// will never resume on its own. A diagnostic convenience, not an
    /// error.
    HaltForever,
}

/// Which kind of access a watchpoint fired on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatchpointKind {
    Read,
    Write,
}

/// Result of a [`Core::run_frame`]/[`Core::run_for`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunResult {
    pub tstates_elapsed: u32,
    pub stop_reason: StopReason,
}

/// A complete ZX Spectrum 48K machine: CPU, paged memory, ULA and
/// keyboard, plus the debug scaffolding (breakpoints/watchpoints) a shell
/// needs to drive it.
pub struct Core {
    cpu: Cpu,
    memory: Memory,
    ula: Ula,
    keyboard: Keyboard,
    breakpoints: Vec<u16>,
    watchpoints: Vec<(u16, WatchpointKind)>,
    pending_nmi: bool,
}

impl Core {
    /// Builds a machine from a 16 KiB ROM image. Fails if `rom_bytes` is
    /// not exactly 16,384 bytes long.
    pub fn new(rom_bytes: &[u8]) -> Result<Self, CoreError> {
        Ok(Core {
            cpu: Cpu::new(),
            memory: Memory::new(rom_bytes)?,
            ula: Ula::new(),
            keyboard: Keyboard::new(),
            breakpoints: Vec::new(),
            watchpoints: Vec::new(),
            pending_nmi: false,
        })
    }

    /// CPU reset. RAM, ROM and the keyboard are untouched by a reset in
    /// real hardware terms, but the shell-visible contract zeroes the
    /// border and clears any held keys, matching a fresh power-on UI
    /// state.
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.ula.reset();
        self.keyboard.clear();
        self.pending_nmi = false;
    }

    pub fn press(&mut self, key_id: KeyId) {
        self.keyboard.press(key_id.position());
    }

    pub fn release(&mut self, key_id: KeyId) {
        self.keyboard.release(key_id.position());
    }

    /// Presses/releases by raw (half-row, bit) key, for hosts that already
    /// track their own layout.
    pub fn press_key(&mut self, key: Key) {
        self.keyboard.press(key);
    }

    pub fn release_key(&mut self, key: Key) {
        self.keyboard.release(key);
    }

    pub fn request_nmi(&mut self) {
        self.pending_nmi = true;
    }

    pub fn set_breakpoint(&mut self, pc: u16) {
        if !self.breakpoints.contains(&pc) {
            self.breakpoints.push(pc);
        }
    }

    pub fn clear_breakpoint(&mut self, pc: u16) {
        self.breakpoints.retain(|&bp| bp != pc);
    }

    pub fn set_watchpoint(&mut self, addr: u16, kind: WatchpointKind) {
        if !self.watchpoints.iter().any(|&(a, k)| a == addr && k == kind) {
            self.watchpoints.push((addr, kind));
        }
    }

    pub fn clear_watchpoint(&mut self, addr: u16, kind: WatchpointKind) {
        self.watchpoints.retain(|&(a, k)| !(a == addr && k == kind));
    }

    /// Runs until at least one full frame (69,888 T-states) has elapsed, or
    /// a breakpoint/watchpoint/HALT-forever condition fires first.
    pub fn run_frame(&mut self) -> RunResult {
        self.run_for(FRAME_TSTATES as u32)
    }

    /// Runs until at least `max_tstates` T-states have elapsed (always
    /// completing the in-flight instruction), or an earlier stop condition
    /// fires.
    pub fn run_for(&mut self, max_tstates: u32) -> RunResult {
        self.ula.begin_frame();
        self.cpu.begin_frame();
        let mut elapsed: u32 = 0;

        let stop_reason = loop {
            if let Some(reason) = self.check_halt_forever() {
                break reason;
            }
            if let Some(reason) = self.check_breakpoint() {
                break reason;
            }

            let irq_pending = self.ula.irq_line(self.cpu.frame_tstates);
            let (step_cost, accesses) = {
                let mut bus = BusCtx::new(&mut self.memory, &mut self.ula, &self.keyboard);
                let cost = if self.pending_nmi && self.cpu.nmi(&mut bus) {
                    self.pending_nmi = false;
                    0
                } else {
                    self.cpu.step(&mut bus, irq_pending)
                };
                (cost, bus.accesses)
            };
            elapsed += step_cost;

            if let Some(reason) = self.check_watchpoints(&accesses) {
                break reason;
            }

            if elapsed >= max_tstates {
                break StopReason::FrameComplete;
            }
        };

        self.ula.end_frame(&self.memory);
        trace!("run_for: {} T-states elapsed, stop={:?}", elapsed, stop_reason);
        RunResult {
            tstates_elapsed: elapsed,
            stop_reason,
        }
    }

    /// Executes exactly one instruction and returns, regardless of the
    /// frame boundary. Useful for single-stepping debuggers; does not call
    /// [`Ula::begin_frame`]/[`Ula::end_frame`] so it composes with a
    /// surrounding `run_for` loop driven externally.
    pub fn step(&mut self) -> RunResult {
        let irq_pending = self.ula.irq_line(self.cpu.frame_tstates);
        let mut bus = BusCtx::new(&mut self.memory, &mut self.ula, &self.keyboard);
        let cost = self.cpu.step(&mut bus, irq_pending);
        RunResult {
            tstates_elapsed: cost,
            stop_reason: StopReason::StepComplete,
        }
    }

    fn check_halt_forever(&self) -> Option<StopReason> {
        if self.cpu.regs.halted && !self.cpu.regs.iff1 && !self.pending_nmi {
            Some(StopReason::HaltForever)
        } else {
            None
        }
    }

    fn check_breakpoint(&self) -> Option<StopReason> {
        let pc = self.cpu.regs.pc;
        if self.breakpoints.contains(&pc) {
            Some(StopReason::BreakpointHit(pc))
        } else {
            None
        }
    }

    /// Checked against every memory address the instruction just executed
    /// touched (`accesses`, collected by the transient [`BusCtx`] as it
    /// serves reads/writes), not merely the PC: a watchpoint on a data
    /// address fires on the instruction that reads or writes it, wherever
    /// PC happens to be.
    fn check_watchpoints(&self, accesses: &[(u16, bool)]) -> Option<StopReason> {
        if self.watchpoints.is_empty() {
            return None;
        }
        for &(addr, is_write) in accesses {
            let kind = if is_write {
                WatchpointKind::Write
            } else {
                WatchpointKind::Read
            };
            if self.watchpoints.iter().any(|&(a, k)| a == addr && k == kind) {
                return Some(StopReason::WatchpointHit(addr, kind));
            }
        }
        None
    }

    pub fn pixel_buffer(&self) -> &[u32] {
        self.ula.pixel_buffer()
    }

    pub fn pixel_buffer_dimensions(&self) -> (usize, usize) {
        self.ula.pixel_buffer_dimensions()
    }

    pub fn speaker_samples(&self) -> &[SpeakerSample] {
        self.ula.speaker_samples()
    }

    pub fn border_color(&self) -> u8 {
        self.ula.border_color()
    }

    pub fn peek(&self, addr: u16) -> u8 {
        self.memory.peek(addr)
    }

    pub fn poke(&mut self, addr: u16, value: u8) {
        self.memory.poke(addr, value);
    }

    pub fn get_registers(&self) -> RegisterSnapshot {
        self.cpu.get_registers()
    }

    pub fn set_registers(&mut self, snapshot: RegisterSnapshot) {
        self.cpu.set_registers(snapshot);
    }

    pub fn total_tstates(&self) -> u64 {
        self.cpu.total_tstates
    }

    pub fn frame_tstates(&self) -> FTs {
        self.cpu.frame_tstates
    }

    pub fn ram_snapshot(&self) -> Vec<u8> {
        self.memory.ram_snapshot()
    }

    pub fn load_ram_snapshot(&mut self, bytes: &[u8]) -> Result<(), CoreError> {
        self.memory.load_ram_snapshot(bytes)
    }

    pub fn flash_counter(&self) -> u32 {
        self.ula.flash_counter()
    }

    pub fn set_flash_counter(&mut self, value: u32) {
        self.ula.set_flash_counter(value);
    }

    pub fn set_border_color(&mut self, color: u8) {
        self.ula.set_border_color(color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::ROM_SIZE;

    fn rom_that_loops_forever() -> Vec<u8> {
        // JP 0x0000 at address 0: an infinite loop, never halts, never
        // reaches a natural frame boundary early.
        let mut rom = vec![0u8; ROM_SIZE];
        rom[0] = 0xc3; // JP nn
        rom[1] = 0x00;
        rom[2] = 0x00;
        rom
    }

    #[test]
    fn rejects_wrong_size_rom() {
        assert!(Core::new(&[0u8; 10]).is_err());
    }

    #[test]
    fn run_frame_advances_at_least_one_frame() {
        let mut core = Core::new(&rom_that_loops_forever()).unwrap();
        let result = core.run_frame();
        assert!(result.tstates_elapsed >= FRAME_TSTATES as u32);
        assert_eq!(result.stop_reason, StopReason::FrameComplete);
    }

    #[test]
    fn breakpoint_stops_run_frame_early() {
        let mut core = Core::new(&rom_that_loops_forever()).unwrap();
        core.set_breakpoint(0x0000);
        // First iteration starts exactly at PC=0, so the breakpoint check
        // fires before any instruction executes.
        let result = core.run_frame();
        assert_eq!(result.stop_reason, StopReason::BreakpointHit(0x0000));
        assert_eq!(result.tstates_elapsed, 0);
    }

    #[test]
    fn halt_with_interrupts_disabled_is_reported() {
        let mut rom = vec![0u8; ROM_SIZE];
        rom[0] = 0xf3; // DI
        rom[1] = 0x76; // HALT
        let mut core = Core::new(&rom).unwrap();
        let result = core.run_frame();
        assert_eq!(result.stop_reason, StopReason::HaltForever);
    }

    #[test]
    fn poke_and_peek_round_trip_ram() {
        let mut core = Core::new(&vec![0u8; ROM_SIZE]).unwrap();
        core.poke(0x8000, 0x42);
        assert_eq!(core.peek(0x8000), 0x42);
    }

    #[test]
    fn watchpoint_fires_on_write_to_watched_address() {
        let mut rom = vec![0u8; ROM_SIZE];
        // LD HL,0x8000; LD (HL),0x42; JP 0x0000 — an infinite loop that
        // writes the watched address every pass.
        rom[0] = 0x21;
        rom[1] = 0x00;
        rom[2] = 0x80;
        rom[3] = 0x36;
        rom[4] = 0x42;
        rom[5] = 0xc3;
        rom[6] = 0x00;
        rom[7] = 0x00;
        let mut core = Core::new(&rom).unwrap();
        core.set_watchpoint(0x8000, WatchpointKind::Write);
        let result = core.run_frame();
        assert_eq!(
            result.stop_reason,
            StopReason::WatchpointHit(0x8000, WatchpointKind::Write)
        );
        assert_eq!(core.peek(0x8000), 0x42);
    }

    #[test]
    fn watchpoint_on_read_does_not_fire_for_unrelated_writes() {
        let mut rom = vec![0u8; ROM_SIZE];
        // LD HL,0x8000; LD (HL),0x42; JP 0x0000
        rom[0] = 0x21;
        rom[1] = 0x00;
        rom[2] = 0x80;
        rom[3] = 0x36;
        rom[4] = 0x42;
        rom[5] = 0xc3;
        rom[6] = 0x00;
        rom[7] = 0x00;
        let mut core = Core::new(&rom).unwrap();
        core.set_watchpoint(0x8000, WatchpointKind::Read);
        let result = core.run_frame();
        assert_eq!(result.stop_reason, StopReason::FrameComplete);
    }

    #[test]
    fn reset_clears_keyboard_and_border() {
        let mut core = Core::new(&vec![0u8; ROM_SIZE]).unwrap();
        core.press(KeyId::A);
        core.reset();
        assert_eq!(core.border_color(), 0);
    }
}
