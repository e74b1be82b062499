/*
    Copyright (C) 2026  ZX Spectrum core contributors

    This file is part of spectrum48-core, a cycle-accurate ZX Spectrum 48K
    emulation core.

    For the full copyright notice, see the lib.rs file.
*/
//! The `CB`-prefixed rotate/shift/`BIT`/`RES`/`SET` table, and its `DDCB`/
//! `FDCB` forms.
//!
//! Register selection (`z`) is never redirected through `IXH`/`IXL` here —
//! that quirk is root-table only. Under a `DD`/`FD` prefix the operand
//! address becomes `(IX+d)`/`(IY+d)` regardless of `z`, and for the
//! undocumented `z != 6` encodings the result is additionally copied back
//! into the plain register named by `z`.
use super::alu::{self, ShiftOp};
use super::regs::{CpuFlags, IndexMode};
use super::Cpu;
use crate::bus::MemoryBus;

impl Cpu {
    fn plain_r8(&self, idx: u8) -> u8 {
        match idx {
            0 => self.regs.b,
            1 => self.regs.c,
            2 => self.regs.d,
            3 => self.regs.e,
            4 => self.regs.h,
            5 => self.regs.l,
            7 => self.regs.a,
            _ => unreachable!("z==6 is the (HL) operand, resolved via address"),
        }
    }

    fn set_plain_r8(&mut self, idx: u8, value: u8) {
        match idx {
            0 => self.regs.b = value,
            1 => self.regs.c = value,
            2 => self.regs.d = value,
            3 => self.regs.e = value,
            4 => self.regs.h = value,
            5 => self.regs.l = value,
            7 => self.regs.a = value,
            _ => unreachable!("z==6 is the (HL) operand, resolved via address"),
        }
    }

    fn resolve_cb_addr(&self, mode: IndexMode, displacement: Option<i8>, z: u8) -> Option<u16> {
        match mode {
            IndexMode::None => {
                if z == 6 {
                    Some(self.regs.hl())
                } else {
                    None
                }
            }
            IndexMode::Ix => Some(self.regs.ix.wrapping_add(displacement.unwrap() as i16 as u16)),
            IndexMode::Iy => Some(self.regs.iy.wrapping_add(displacement.unwrap() as i16 as u16)),
        }
    }

    fn store_cb_result<B: MemoryBus>(
        &mut self,
        bus: &mut B,
        z: u8,
        addr: Option<u16>,
        indexed: bool,
        result: u8,
    ) {
        if let Some(a) = addr {
            self.write_mem(bus, a, result);
            if indexed && z != 6 {
                self.set_plain_r8(z, result);
            }
        } else {
            self.set_plain_r8(z, result);
        }
    }

    pub(crate) fn execute_cb<B: MemoryBus>(
        &mut self,
        bus: &mut B,
        op: u8,
        mode: IndexMode,
        displacement: Option<i8>,
        start: u64,
    ) {
        let x = op >> 6;
        let y = (op >> 3) & 0x07;
        let z = op & 0x07;
        let indexed = mode != IndexMode::None;
        let addr = self.resolve_cb_addr(mode, displacement, z);
        let value = match addr {
            Some(a) => self.read_mem(bus, a),
            None => self.plain_r8(z),
        };

        let cost = match x {
            0 => {
                let shift_op = match y {
                    0 => ShiftOp::Rlc,
                    1 => ShiftOp::Rrc,
                    2 => ShiftOp::Rl,
                    3 => ShiftOp::Rr,
                    4 => ShiftOp::Sla,
                    5 => ShiftOp::Sra,
                    6 => ShiftOp::Sll,
                    7 => ShiftOp::Srl,
                    _ => unreachable!(),
                };
                let carry_in = self.regs.flags().contains(CpuFlags::C);
                let (result, carry_out) = alu::shift(shift_op, value, carry_in);
                let flags = alu::shift_flags(result, carry_out);
                self.regs.set_flags(flags);
                self.store_cb_result(bus, z, addr, indexed, result);
                if addr.is_some() {
                    if indexed { 23 } else { 15 }
                } else {
                    8
                }
            }
            1 => {
                let xy_source = match addr {
                    Some(a) => (a >> 8) as u8,
                    None => value,
                };
                let flags = alu::bit_test(y, value, xy_source, self.regs.flags());
                self.regs.set_flags(flags);
                if addr.is_some() {
                    if indexed { 20 } else { 12 }
                } else {
                    8
                }
            }
            2 => {
                let result = value & !(1 << y);
                self.store_cb_result(bus, z, addr, indexed, result);
                if addr.is_some() {
                    if indexed { 23 } else { 15 }
                } else {
                    8
                }
            }
            3 => {
                let result = value | (1 << y);
                self.store_cb_result(bus, z, addr, indexed, result);
                if addr.is_some() {
                    if indexed { 23 } else { 15 }
                } else {
                    8
                }
            }
            _ => unreachable!(),
        };

        self.pad_to_canonical(start, cost);
    }
}
