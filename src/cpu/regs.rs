/*
    Copyright (C) 2026  ZX Spectrum core contributors

    This file is part of spectrum48-core, a cycle-accurate ZX Spectrum 48K
    emulation core.

    For the full copyright notice, see the lib.rs file.
*/
//! Z80 register file.
use bitflags::bitflags;

bitflags! {
    /// The F register's bit layout: S Z Y H X P/V N C.
    ///
    /// Y and X mirror result bits 5 and 3; the 48K ROM's "scroll/attribute"
    /// routines inspect them, so every arithmetic/logic op must keep them
    /// in sync with the actual result byte.
    #[derive(Default)]
    pub struct CpuFlags: u8 {
        const C  = 0b0000_0001;
        const N  = 0b0000_0010;
        const PV = 0b0000_0100;
        const X  = 0b0000_1000;
        const H  = 0b0001_0000;
        const Y  = 0b0010_0000;
        const Z  = 0b0100_0000;
        const S  = 0b1000_0000;
    }
}

impl CpuFlags {
    /// Copies the X/Y bits (5 and 3) from a result byte, leaving the other
    /// flag bits untouched.
    #[inline]
    pub fn with_xy_from(mut self, result: u8) -> Self {
        self.remove(CpuFlags::X | CpuFlags::Y);
        self |= CpuFlags::from_bits_truncate(result & (CpuFlags::X.bits() | CpuFlags::Y.bits()));
        self
    }

    #[inline]
    pub fn sign_zero(result: u8) -> Self {
        let mut f = CpuFlags::empty();
        if result & 0x80 != 0 {
            f |= CpuFlags::S;
        }
        if result == 0 {
            f |= CpuFlags::Z;
        }
        f
    }
}

/// One of the six register-pair slots addressable by `dd`/`qq` opcode
/// fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegPair {
    Bc,
    De,
    Hl,
    Sp,
}

/// Selects which index register (if any) the current instruction's `(HL)`
/// and `H`/`L` register slots are redirected through.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexMode {
    None,
    Ix,
    Iy,
}

/// The full main + shadow register file, interrupt latches and control
/// flags of a Z80.
#[derive(Clone, Debug)]
pub struct Registers {
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,

    pub a_: u8,
    pub f_: u8,
    pub b_: u8,
    pub c_: u8,
    pub d_: u8,
    pub e_: u8,
    pub h_: u8,
    pub l_: u8,

    pub ix: u16,
    pub iy: u16,
    pub sp: u16,
    pub pc: u16,

    pub i: u8,
    pub r: u8,

    pub iff1: bool,
    pub iff2: bool,
    /// 0, 1 or 2.
    pub im: u8,

    pub halted: bool,
    /// Set for the one instruction following `EI`; interrupts remain
    /// disabled while this is set.
    pub ei_delay: bool,
}

impl Default for Registers {
    fn default() -> Self {
        Registers {
            a: 0xff,
            f: 0xff,
            b: 0,
            c: 0,
            d: 0,
            e: 0,
            h: 0,
            l: 0,
            a_: 0xff,
            f_: 0xff,
            b_: 0,
            c_: 0,
            d_: 0,
            e_: 0,
            h_: 0,
            l_: 0,
            ix: 0xffff,
            iy: 0xffff,
            sp: 0xffff,
            pc: 0,
            i: 0,
            r: 0,
            iff1: false,
            iff2: false,
            im: 0,
            halted: false,
            ei_delay: false,
        }
    }
}

macro_rules! pair_accessors {
    ($get:ident, $set:ident, $hi:ident, $lo:ident) => {
        #[inline]
        pub fn $get(&self) -> u16 {
            ((self.$hi as u16) << 8) | self.$lo as u16
        }
        #[inline]
        pub fn $set(&mut self, value: u16) {
            self.$hi = (value >> 8) as u8;
            self.$lo = value as u8;
        }
    };
}

impl Registers {
    pair_accessors!(bc, set_bc, b, c);
    pair_accessors!(de, set_de, d, e);
    pair_accessors!(hl, set_hl, h, l);
    pair_accessors!(af, set_af, a, f);

    #[inline]
    pub fn flags(&self) -> CpuFlags {
        CpuFlags::from_bits_truncate(self.f)
    }

    #[inline]
    pub fn set_flags(&mut self, flags: CpuFlags) {
        self.f = flags.bits();
    }

    pub fn get_pair(&self, pair: RegPair) -> u16 {
        match pair {
            RegPair::Bc => self.bc(),
            RegPair::De => self.de(),
            RegPair::Hl => self.hl(),
            RegPair::Sp => self.sp,
        }
    }

    pub fn set_pair(&mut self, pair: RegPair, value: u16) {
        match pair {
            RegPair::Bc => self.set_bc(value),
            RegPair::De => self.set_de(value),
            RegPair::Hl => self.set_hl(value),
            RegPair::Sp => self.sp = value,
        }
    }

    /// Swaps the main and shadow 8-bit register sets (`EXX`, excluding AF).
    pub fn exx(&mut self) {
        core::mem::swap(&mut self.b, &mut self.b_);
        core::mem::swap(&mut self.c, &mut self.c_);
        core::mem::swap(&mut self.d, &mut self.d_);
        core::mem::swap(&mut self.e, &mut self.e_);
        core::mem::swap(&mut self.h, &mut self.h_);
        core::mem::swap(&mut self.l, &mut self.l_);
    }

    /// Swaps AF with its shadow (`EX AF,AF'`).
    pub fn ex_af_af(&mut self) {
        core::mem::swap(&mut self.a, &mut self.a_);
        core::mem::swap(&mut self.f, &mut self.f_);
    }

    /// Returns the index register selected by `mode`, or `HL` if `None`.
    pub fn index_value(&self, mode: IndexMode) -> u16 {
        match mode {
            IndexMode::None => self.hl(),
            IndexMode::Ix => self.ix,
            IndexMode::Iy => self.iy,
        }
    }

    pub fn set_index_value(&mut self, mode: IndexMode, value: u16) {
        match mode {
            IndexMode::None => self.set_hl(value),
            IndexMode::Ix => self.ix = value,
            IndexMode::Iy => self.iy = value,
        }
    }
}
