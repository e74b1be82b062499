/*
    Copyright (C) 2026  ZX Spectrum core contributors

    This file is part of spectrum48-core, a cycle-accurate ZX Spectrum 48K
    emulation core.

    For the full copyright notice, see the lib.rs file.
*/
//! The un-prefixed root opcode table, and its `DD`/`FD` (IX/IY) variants.
//!
//! Opcodes are decomposed as `x:2 y:3 z:3` (with `p = y>>1`, `q = y&1`),
//! the standard decomposition used by every Z80 reference and emulator.
use super::alu;
use super::regs::{CpuFlags, IndexMode, RegPair};
use super::Cpu;
use crate::bus::MemoryBus;

impl Cpu {
    pub(crate) fn indexed_addr<B: MemoryBus>(&mut self, bus: &mut B, mode: IndexMode) -> u16 {
        match mode {
            IndexMode::None => self.regs.hl(),
            IndexMode::Ix => {
                let d = self.fetch_byte(bus) as i8 as i16;
                self.regs.ix.wrapping_add(d as u16)
            }
            IndexMode::Iy => {
                let d = self.fetch_byte(bus) as i8 as i16;
                self.regs.iy.wrapping_add(d as u16)
            }
        }
    }

    pub(crate) fn read_r8<B: MemoryBus>(&mut self, bus: &mut B, idx: u8, mode: IndexMode) -> u8 {
        match idx {
            0 => self.regs.b,
            1 => self.regs.c,
            2 => self.regs.d,
            3 => self.regs.e,
            4 => match mode {
                IndexMode::None => self.regs.h,
                IndexMode::Ix => (self.regs.ix >> 8) as u8,
                IndexMode::Iy => (self.regs.iy >> 8) as u8,
            },
            5 => match mode {
                IndexMode::None => self.regs.l,
                IndexMode::Ix => self.regs.ix as u8,
                IndexMode::Iy => self.regs.iy as u8,
            },
            6 => {
                let addr = self.indexed_addr(bus, mode);
                self.read_mem(bus, addr)
            }
            7 => self.regs.a,
            _ => unreachable!(),
        }
    }

    pub(crate) fn write_r8<B: MemoryBus>(&mut self, bus: &mut B, idx: u8, mode: IndexMode, value: u8) {
        match idx {
            0 => self.regs.b = value,
            1 => self.regs.c = value,
            2 => self.regs.d = value,
            3 => self.regs.e = value,
            4 => match mode {
                IndexMode::None => self.regs.h = value,
                IndexMode::Ix => self.regs.ix = (self.regs.ix & 0x00ff) | ((value as u16) << 8),
                IndexMode::Iy => self.regs.iy = (self.regs.iy & 0x00ff) | ((value as u16) << 8),
            },
            5 => match mode {
                IndexMode::None => self.regs.l = value,
                IndexMode::Ix => self.regs.ix = (self.regs.ix & 0xff00) | value as u16,
                IndexMode::Iy => self.regs.iy = (self.regs.iy & 0xff00) | value as u16,
            },
            6 => {
                let addr = self.indexed_addr(bus, mode);
                self.write_mem(bus, addr, value);
            }
            7 => self.regs.a = value,
            _ => unreachable!(),
        }
    }

    pub(crate) fn rp_value(&self, p: u8, mode: IndexMode) -> u16 {
        match p {
            0 => self.regs.bc(),
            1 => self.regs.de(),
            2 => self.regs.index_value(mode),
            3 => self.regs.sp,
            _ => unreachable!(),
        }
    }

    pub(crate) fn set_rp_value(&mut self, p: u8, mode: IndexMode, value: u16) {
        match p {
            0 => self.regs.set_bc(value),
            1 => self.regs.set_de(value),
            2 => self.regs.set_index_value(mode, value),
            3 => self.regs.sp = value,
            _ => unreachable!(),
        }
    }

    fn rp2_value(&self, p: u8, mode: IndexMode) -> u16 {
        match p {
            0 => self.regs.bc(),
            1 => self.regs.de(),
            2 => self.regs.index_value(mode),
            3 => self.regs.af(),
            _ => unreachable!(),
        }
    }

    fn set_rp2_value(&mut self, p: u8, mode: IndexMode, value: u16) {
        match p {
            0 => self.regs.set_bc(value),
            1 => self.regs.set_de(value),
            2 => self.regs.set_index_value(mode, value),
            3 => self.regs.set_af(value),
            _ => unreachable!(),
        }
    }

    fn test_condition(&self, cc: u8) -> bool {
        let f = self.regs.flags();
        match cc {
            0 => !f.contains(CpuFlags::Z),
            1 => f.contains(CpuFlags::Z),
            2 => !f.contains(CpuFlags::C),
            3 => f.contains(CpuFlags::C),
            4 => !f.contains(CpuFlags::PV),
            5 => f.contains(CpuFlags::PV),
            6 => !f.contains(CpuFlags::S),
            7 => f.contains(CpuFlags::S),
            _ => unreachable!(),
        }
    }

    /// Applies `op` to `self.regs.a`, storing the result unless `op` is `CP`
    /// (y==7), which only sets flags.
    fn alu_op<B: MemoryBus>(&mut self, bus: &mut B, y: u8, operand_idx: u8, mode: IndexMode) {
        let operand = self.read_r8(bus, operand_idx, mode);
        self.apply_alu(y, operand);
    }

    fn apply_alu(&mut self, y: u8, operand: u8) {
        let a = self.regs.a;
        let carry = self.regs.flags().contains(CpuFlags::C);
        let (result, flags) = match y {
            0 => alu::add8(a, operand, false),
            1 => alu::add8(a, operand, carry),
            2 => alu::sub8(a, operand, false),
            3 => alu::sub8(a, operand, carry),
            4 => alu::and8(a, operand),
            5 => alu::xor8(a, operand),
            6 => alu::or8(a, operand),
            7 => (a, alu::cp8(a, operand)),
            _ => unreachable!(),
        };
        self.regs.set_flags(flags);
        if y != 7 {
            self.regs.a = result;
        }
    }

    pub(crate) fn execute_root<B: MemoryBus>(
        &mut self,
        bus: &mut B,
        op: u8,
        mode: IndexMode,
        start: u64,
    ) {
        let x = op >> 6;
        let y = (op >> 3) & 0x07;
        let z = op & 0x07;
        let p = y >> 1;
        let q = y & 1;
        let indexed = mode != IndexMode::None;
        // For x==2 (ALU A,r) only z selects the operand; for x==1 (LD r,r')
        // either side can be the (HL)/(IX+d) operand.
        let touches_mem = z == 6 || (x == 1 && (y == 6 || z == 6));

        let cost: u32 = match x {
            0 => self.exec_x0(bus, y, z, q, p, mode),
            1 => {
                if y == 6 && z == 6 {
                    // HALT (DD/FD HALT is just HALT with a wasted prefix).
                    self.regs.halted = true;
                    if indexed { 8 } else { 4 }
                } else {
                    let value = self.read_r8(bus, z, mode);
                    self.write_r8(bus, y, mode, value);
                    if touches_mem {
                        if indexed { 19 } else { 7 }
                    } else if indexed {
                        8
                    } else {
                        4
                    }
                }
            }
            2 => {
                self.alu_op(bus, y, z, mode);
                if touches_mem {
                    if indexed { 19 } else { 7 }
                } else if indexed {
                    8
                } else {
                    4
                }
            }
            3 => self.exec_x3(bus, y, z, q, p, mode),
            _ => unreachable!(),
        };
        self.pad_to_canonical(start, cost);
    }

    #[allow(clippy::too_many_arguments)]
    fn exec_x0<B: MemoryBus>(
        &mut self,
        bus: &mut B,
        y: u8,
        z: u8,
        q: u8,
        p: u8,
        mode: IndexMode,
    ) -> u32 {
        match z {
            0 => match y {
                0 => 4, // NOP
                1 => {
                    self.regs.ex_af_af();
                    4
                }
                2 => {
                    // DJNZ e
                    let e = self.fetch_byte(bus) as i8;
                    self.regs.b = self.regs.b.wrapping_sub(1);
                    if self.regs.b != 0 {
                        self.regs.pc = self.regs.pc.wrapping_add(e as u16);
                        13
                    } else {
                        8
                    }
                }
                3 => {
                    // JR e
                    let e = self.fetch_byte(bus) as i8;
                    self.regs.pc = self.regs.pc.wrapping_add(e as u16);
                    12
                }
                4..=7 => {
                    // JR cc,e  (cc = y-4)
                    let e = self.fetch_byte(bus) as i8;
                    if self.test_condition(y - 4) {
                        self.regs.pc = self.regs.pc.wrapping_add(e as u16);
                        12
                    } else {
                        7
                    }
                }
                _ => unreachable!(),
            },
            1 => {
                if q == 0 {
                    let nn = self.fetch_word(bus);
                    self.set_rp_value(p, mode, nn);
                    if mode != IndexMode::None { 14 } else { 10 }
                } else {
                    let hl = self.rp_value(p, mode);
                    let (result, flags) = alu::add16(self.regs.index_value(mode), hl, self.regs.flags());
                    self.regs.set_index_value(mode, result);
                    self.regs.set_flags(flags);
                    self.charge(7);
                    if mode != IndexMode::None { 15 } else { 11 }
                }
            }
            2 => {
                let indexed = mode != IndexMode::None;
                match (q, p) {
                    (0, 0) => {
                        let addr = self.regs.bc();
                        self.write_mem(bus, addr, self.regs.a);
                        7
                    }
                    (0, 1) => {
                        let addr = self.regs.de();
                        self.write_mem(bus, addr, self.regs.a);
                        7
                    }
                    (0, 2) => {
                        let nn = self.fetch_word(bus);
                        let hl = self.regs.index_value(mode);
                        self.write_mem(bus, nn, hl as u8);
                        self.write_mem(bus, nn.wrapping_add(1), (hl >> 8) as u8);
                        if indexed { 20 } else { 16 }
                    }
                    (0, 3) => {
                        let nn = self.fetch_word(bus);
                        self.write_mem(bus, nn, self.regs.a);
                        13
                    }
                    (1, 0) => {
                        let addr = self.regs.bc();
                        self.regs.a = self.read_mem(bus, addr);
                        7
                    }
                    (1, 1) => {
                        let addr = self.regs.de();
                        self.regs.a = self.read_mem(bus, addr);
                        7
                    }
                    (1, 2) => {
                        let nn = self.fetch_word(bus);
                        let lo = self.read_mem(bus, nn);
                        let hi = self.read_mem(bus, nn.wrapping_add(1));
                        self.regs.set_index_value(mode, ((hi as u16) << 8) | lo as u16);
                        if indexed { 20 } else { 16 }
                    }
                    (1, 3) => {
                        let nn = self.fetch_word(bus);
                        self.regs.a = self.read_mem(bus, nn);
                        13
                    }
                    _ => unreachable!(),
                }
            }
            3 => {
                let indexed = mode != IndexMode::None;
                let value = self.rp_value(p, mode);
                let result = if q == 0 {
                    value.wrapping_add(1)
                } else {
                    value.wrapping_sub(1)
                };
                self.set_rp_value(p, mode, result);
                self.charge(2);
                if indexed && p == 2 { 10 } else { 6 }
            }
            4 => {
                // Resolve the `(HL)`/`(IX+d)` address once: `read_r8`+`write_r8`
                // would each independently fetch a displacement byte.
                if y == 6 {
                    let addr = self.indexed_addr(bus, mode);
                    let old = self.read_mem(bus, addr);
                    let (result, flags) = alu::inc8(old, self.regs.flags());
                    self.write_mem(bus, addr, result);
                    self.regs.set_flags(flags);
                    if mode != IndexMode::None { 23 } else { 11 }
                } else {
                    let old = self.read_r8(bus, y, mode);
                    let (result, flags) = alu::inc8(old, self.regs.flags());
                    self.write_r8(bus, y, mode, result);
                    self.regs.set_flags(flags);
                    if mode != IndexMode::None { 8 } else { 4 }
                }
            }
            5 => {
                if y == 6 {
                    let addr = self.indexed_addr(bus, mode);
                    let old = self.read_mem(bus, addr);
                    let (result, flags) = alu::dec8(old, self.regs.flags());
                    self.write_mem(bus, addr, result);
                    self.regs.set_flags(flags);
                    if mode != IndexMode::None { 23 } else { 11 }
                } else {
                    let old = self.read_r8(bus, y, mode);
                    let (result, flags) = alu::dec8(old, self.regs.flags());
                    self.write_r8(bus, y, mode, result);
                    self.regs.set_flags(flags);
                    if mode != IndexMode::None { 8 } else { 4 }
                }
            }
            6 => {
                if y == 6 && mode != IndexMode::None {
                    // Encoding is `DD 36 d n`: displacement before immediate.
                    let addr = self.indexed_addr(bus, mode);
                    let n = self.fetch_byte(bus);
                    self.write_mem(bus, addr, n);
                    19
                } else {
                    let n = self.fetch_byte(bus);
                    self.write_r8(bus, y, mode, n);
                    if y == 6 {
                        10
                    } else if mode != IndexMode::None {
                        11
                    } else {
                        7
                    }
                }
            }
            7 => {
                self.exec_accumulator_misc(y);
                4
            }
            _ => unreachable!(),
        }
    }

    fn exec_accumulator_misc(&mut self, y: u8) {
        let a = self.regs.a;
        let flags = self.regs.flags();
        match y {
            0 => {
                let (r, carry) = alu::shift(alu::ShiftOp::Rlc, a, false);
                let mut f = flags & (CpuFlags::S | CpuFlags::Z | CpuFlags::PV);
                f = f.with_xy_from(r);
                if carry {
                    f |= CpuFlags::C;
                }
                self.regs.a = r;
                self.regs.set_flags(f);
            }
            1 => {
                let (r, carry) = alu::shift(alu::ShiftOp::Rrc, a, false);
                let mut f = flags & (CpuFlags::S | CpuFlags::Z | CpuFlags::PV);
                f = f.with_xy_from(r);
                if carry {
                    f |= CpuFlags::C;
                }
                self.regs.a = r;
                self.regs.set_flags(f);
            }
            2 => {
                let (r, carry) = alu::shift(alu::ShiftOp::Rl, a, flags.contains(CpuFlags::C));
                let mut f = flags & (CpuFlags::S | CpuFlags::Z | CpuFlags::PV);
                f = f.with_xy_from(r);
                if carry {
                    f |= CpuFlags::C;
                }
                self.regs.a = r;
                self.regs.set_flags(f);
            }
            3 => {
                let (r, carry) = alu::shift(alu::ShiftOp::Rr, a, flags.contains(CpuFlags::C));
                let mut f = flags & (CpuFlags::S | CpuFlags::Z | CpuFlags::PV);
                f = f.with_xy_from(r);
                if carry {
                    f |= CpuFlags::C;
                }
                self.regs.a = r;
                self.regs.set_flags(f);
            }
            4 => {
                let (result, f) = alu::daa(a, flags);
                self.regs.a = result;
                self.regs.set_flags(f);
            }
            5 => {
                let result = !a;
                let mut f = flags & (CpuFlags::S | CpuFlags::Z | CpuFlags::PV | CpuFlags::C);
                f |= CpuFlags::H | CpuFlags::N;
                f = f.with_xy_from(result);
                self.regs.a = result;
                self.regs.set_flags(f);
            }
            6 => {
                let mut f = flags & (CpuFlags::S | CpuFlags::Z | CpuFlags::PV);
                f |= CpuFlags::C;
                f = f.with_xy_from(a);
                self.regs.set_flags(f);
            }
            7 => {
                let mut f = flags & (CpuFlags::S | CpuFlags::Z | CpuFlags::PV);
                if flags.contains(CpuFlags::C) {
                    f |= CpuFlags::H;
                } else {
                    f |= CpuFlags::C;
                }
                f = f.with_xy_from(a);
                self.regs.set_flags(f);
            }
            _ => unreachable!(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn exec_x3<B: MemoryBus>(
        &mut self,
        bus: &mut B,
        y: u8,
        z: u8,
        q: u8,
        p: u8,
        mode: IndexMode,
    ) -> u32 {
        match z {
            0 => {
                // RET cc
                if self.test_condition(y) {
                    self.regs.pc = self.pop16(bus);
                    11
                } else {
                    5
                }
            }
            1 => {
                if q == 0 {
                    let value = self.pop16(bus);
                    self.set_rp2_value(p, mode, value);
                    if mode != IndexMode::None { 14 } else { 10 }
                } else {
                    match p {
                        0 => {
                            self.regs.pc = self.pop16(bus);
                            10
                        }
                        1 => {
                            self.regs.exx();
                            4
                        }
                        2 => {
                            self.regs.pc = self.regs.index_value(mode);
                            if mode != IndexMode::None { 8 } else { 4 }
                        }
                        3 => {
                            self.regs.sp = self.regs.index_value(mode);
                            if mode != IndexMode::None { 10 } else { 6 }
                        }
                        _ => unreachable!(),
                    }
                }
            }
            2 => {
                let nn = self.fetch_word(bus);
                if self.test_condition(y) {
                    self.regs.pc = nn;
                }
                10
            }
            3 => match y {
                0 => {
                    let nn = self.fetch_word(bus);
                    self.regs.pc = nn;
                    10
                }
                1 => unreachable!("0xCB is intercepted by fetch_prefix before reaching execute_root"),
                2 => {
                    let n = self.fetch_byte(bus);
                    self.write_port(bus, (self.regs.a as u16) << 8 | n as u16, self.regs.a);
                    11
                }
                3 => {
                    let n = self.fetch_byte(bus);
                    self.regs.a = self.read_port(bus, (self.regs.a as u16) << 8 | n as u16);
                    11
                }
                4 => {
                    // EX (SP),HL / EX (SP),IX/IY
                    let sp = self.regs.sp;
                    let lo = self.read_mem(bus, sp);
                    let hi = self.read_mem(bus, sp.wrapping_add(1));
                    let value = self.regs.index_value(mode);
                    self.write_mem(bus, sp, value as u8);
                    self.write_mem(bus, sp.wrapping_add(1), (value >> 8) as u8);
                    self.regs.set_index_value(mode, ((hi as u16) << 8) | lo as u16);
                    if mode != IndexMode::None { 23 } else { 19 }
                }
                5 => {
                    // EX DE,HL always operates on HL, never IX/IY.
                    let de = self.regs.de();
                    let hl = self.regs.hl();
                    self.regs.set_de(hl);
                    self.regs.set_hl(de);
                    4
                }
                6 => {
                    self.regs.iff1 = false;
                    self.regs.iff2 = false;
                    4
                }
                7 => {
                    self.regs.iff1 = true;
                    self.regs.iff2 = true;
                    self.regs.ei_delay = true;
                    4
                }
                _ => unreachable!(),
            },
            4 => {
                let nn = self.fetch_word(bus);
                if self.test_condition(y) {
                    self.push16(bus, self.regs.pc);
                    self.regs.pc = nn;
                    17
                } else {
                    10
                }
            }
            5 => {
                if q == 0 {
                    let value = self.rp2_value(p, mode);
                    self.push16(bus, value);
                    if mode != IndexMode::None { 15 } else { 11 }
                } else if p == 0 {
                    let nn = self.fetch_word(bus);
                    self.push16(bus, self.regs.pc);
                    self.regs.pc = nn;
                    17
                } else {
                    unreachable!("0xDD/0xED/0xFD are intercepted by fetch_prefix")
                }
            }
            6 => {
                let n = self.fetch_byte(bus);
                self.apply_alu(y, n);
                7
            }
            7 => {
                self.push16(bus, self.regs.pc);
                self.regs.pc = (y as u16) * 8;
                11
            }
            _ => unreachable!(),
        }
    }
}
