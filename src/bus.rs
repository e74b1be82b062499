/*
    Copyright (C) 2026  ZX Spectrum core contributors

    This file is part of spectrum48-core, a cycle-accurate ZX Spectrum 48K
    emulation core.

    For the full copyright notice, see the lib.rs file.
*/
//! The system bus: paged memory + IO port dispatch.
//!
//! The bus itself holds no state; it is a thin, transient view over the
//! [`Memory`], [`Ula`] and [`Keyboard`] components, constructed fresh for
//! each [`crate::cpu::Cpu::step`] call by the owning [`crate::core::Core`].
//! This keeps the CPU/ULA relationship acyclic: the ULA is consulted for
//! contention and IO, but never holds a back-reference to the CPU.
use crate::clock::FTs;
use crate::keyboard::Keyboard;
use crate::memory::Memory;
use crate::ula::Ula;

/// Anything the CPU can fetch from, read, write, and perform IO against.
/// Every access is charged against the frame-relative T-state cursor passed
/// in, and returns the extra contention delay (if any) that the caller must
/// add to its own counter before the access is considered complete.
pub trait MemoryBus {
    fn read8(&mut self, addr: u16, tstate: FTs) -> (u8, u32);
    fn write8(&mut self, addr: u16, value: u8, tstate: FTs) -> u32;
    fn read_io(&mut self, port: u16, tstate: FTs) -> (u8, u32);
    fn write_io(&mut self, port: u16, value: u8, tstate: FTs) -> u32;
}

/// Value returned on port reads that no device answers.
pub const FLOATING_BUS_VALUE: u8 = 0xff;

/// A transient bus view, built at `step()` time from the core's owned
/// components.
pub struct BusCtx<'a> {
    pub memory: &'a mut Memory,
    pub ula: &'a mut Ula,
    pub keyboard: &'a Keyboard,
    /// Every memory address this context has served a read or write for
    /// since construction, in order, as `(addr, is_write)`. `Core` drains
    /// this after each instruction to drive memory watchpoints.
    pub accesses: Vec<(u16, bool)>,
}

impl<'a> BusCtx<'a> {
    pub fn new(memory: &'a mut Memory, ula: &'a mut Ula, keyboard: &'a Keyboard) -> Self {
        BusCtx {
            memory,
            ula,
            keyboard,
            accesses: Vec::new(),
        }
    }
}

impl<'a> MemoryBus for BusCtx<'a> {
    #[inline]
    fn read8(&mut self, addr: u16, tstate: FTs) -> (u8, u32) {
        let delay = self.ula.memory_contention_delay(addr, tstate);
        self.accesses.push((addr, false));
        (self.memory.read(addr), delay)
    }

    #[inline]
    fn write8(&mut self, addr: u16, value: u8, tstate: FTs) -> u32 {
        let delay = self.ula.memory_contention_delay(addr, tstate);
        self.memory.write(addr, value);
        self.accesses.push((addr, true));
        delay
    }

    #[inline]
    fn read_io(&mut self, port: u16, tstate: FTs) -> (u8, u32) {
        let delay = self.ula.io_contention_delay(port, tstate);
        let value = if port & 1 == 0 {
            self.ula.read_port_fe((port >> 8) as u8, self.keyboard)
        } else {
            FLOATING_BUS_VALUE
        };
        (value, delay)
    }

    #[inline]
    fn write_io(&mut self, port: u16, value: u8, tstate: FTs) -> u32 {
        let delay = self.ula.io_contention_delay(port, tstate);
        if port & 1 == 0 {
            self.ula.write_port_fe(value, tstate + delay as FTs);
        }
        delay
    }
}
