/*
    Copyright (C) 2026  ZX Spectrum core contributors

    This file is part of spectrum48-core, a cycle-accurate ZX Spectrum 48K
    emulation core.

    For the full copyright notice, see the lib.rs file.
*/
//! Optional persisted-state import/export, gated behind the `snapshot`
//! feature.
//!
//! The on-disk layout is a flat record: all CPU registers in canonical
//! order, followed by the 49,152 bytes of RAM, the border latch and the
//! flash counter — the layout documented for the core's external
//! interface. A common ".sna"-like encoding is a valid concrete form of
//! this but is not required; [`Snapshot::to_base64`]/[`Snapshot::from_base64`]
//! give hosts a text-safe transport without committing to that format.
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::core::Core;
use crate::cpu::RegisterSnapshot;
use crate::error::CoreError;
use crate::memory::RAM_SIZE;

/// Number of bytes a [`Snapshot`]'s fixed register block occupies: a,f (2) +
/// bc,de,hl (6) + a',f' (2) + bc',de',hl' (6) + ix,iy,sp,pc (8) + i,r (2) +
/// iff byte (1) + im (1) + halted byte (1) = 29.
const REGISTER_BLOCK_LEN: usize = 29;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub registers: RegisterSnapshot,
    pub ram: Vec<u8>,
    pub border: u8,
    pub flash_counter: u32,
}

impl Snapshot {
    /// Captures the current state of `core`.
    pub fn capture(core: &Core) -> Self {
        Snapshot {
            registers: core.get_registers(),
            ram: core.ram_snapshot(),
            border: core.border_color(),
            flash_counter: core.flash_counter(),
        }
    }

    /// Restores `core` to this snapshot's state.
    pub fn restore(&self, core: &mut Core) -> Result<(), CoreError> {
        core.load_ram_snapshot(&self.ram)?;
        core.set_registers(self.registers);
        core.set_border_color(self.border);
        core.set_flash_counter(self.flash_counter);
        Ok(())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(REGISTER_BLOCK_LEN + RAM_SIZE + 5);
        let r = &self.registers;
        out.push(r.a);
        out.push(r.f);
        out.extend_from_slice(&r.bc.to_le_bytes());
        out.extend_from_slice(&r.de.to_le_bytes());
        out.extend_from_slice(&r.hl.to_le_bytes());
        out.push(r.a_);
        out.push(r.f_);
        out.extend_from_slice(&r.bc_.to_le_bytes());
        out.extend_from_slice(&r.de_.to_le_bytes());
        out.extend_from_slice(&r.hl_.to_le_bytes());
        out.extend_from_slice(&r.ix.to_le_bytes());
        out.extend_from_slice(&r.iy.to_le_bytes());
        out.extend_from_slice(&r.sp.to_le_bytes());
        out.extend_from_slice(&r.pc.to_le_bytes());
        out.push(r.i);
        out.push(r.r);
        out.push(u8::from(r.iff1) | (u8::from(r.iff2) << 1));
        out.push(r.im);
        out.push(u8::from(r.halted) | (u8::from(r.ei_delay) << 1));
        out.extend_from_slice(&self.ram);
        out.push(self.border);
        out.extend_from_slice(&self.flash_counter.to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        let expected = REGISTER_BLOCK_LEN + RAM_SIZE + 1 + 4;
        if bytes.len() != expected {
            return Err(CoreError::InvalidArgument(
                "snapshot buffer has the wrong length for register block + RAM + border + flash counter",
            ));
        }
        struct Cursor<'a> {
            bytes: &'a [u8],
            pos: usize,
        }
        impl<'a> Cursor<'a> {
            fn u8(&mut self) -> u8 {
                let b = self.bytes[self.pos];
                self.pos += 1;
                b
            }
            fn u16(&mut self) -> u16 {
                let v = u16::from_le_bytes([self.bytes[self.pos], self.bytes[self.pos + 1]]);
                self.pos += 2;
                v
            }
        }
        let mut cur = Cursor { bytes, pos: 0 };
        let a = cur.u8();
        let f = cur.u8();
        let bc = cur.u16();
        let de = cur.u16();
        let hl = cur.u16();
        let a_ = cur.u8();
        let f_ = cur.u8();
        let bc_ = cur.u16();
        let de_ = cur.u16();
        let hl_ = cur.u16();
        let ix = cur.u16();
        let iy = cur.u16();
        let sp = cur.u16();
        let pc = cur.u16();
        let i = cur.u8();
        let r = cur.u8();
        let iff_byte = cur.u8();
        let im = cur.u8();
        let halted_byte = cur.u8();
        debug_assert_eq!(cur.pos, REGISTER_BLOCK_LEN);
        let registers = RegisterSnapshot {
            a,
            f,
            bc,
            de,
            hl,
            a_,
            f_,
            bc_,
            de_,
            hl_,
            ix,
            iy,
            sp,
            pc,
            i,
            r,
            iff1: iff_byte & 0x01 != 0,
            iff2: iff_byte & 0x02 != 0,
            im,
            halted: halted_byte & 0x01 != 0,
            ei_delay: halted_byte & 0x02 != 0,
        };
        let ram_start = cur.pos;
        let ram_end = ram_start + RAM_SIZE;
        let ram = bytes[ram_start..ram_end].to_vec();
        let border = bytes[ram_end];
        let flash_counter = u32::from_le_bytes([
            bytes[ram_end + 1],
            bytes[ram_end + 2],
            bytes[ram_end + 3],
            bytes[ram_end + 4],
        ]);
        Ok(Snapshot {
            registers,
            ram,
            border,
            flash_counter,
        })
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(self.to_bytes())
    }

    pub fn from_base64(encoded: &str) -> Result<Self, CoreError> {
        let bytes = BASE64
            .decode(encoded)
            .map_err(|_| CoreError::InvalidArgument("snapshot is not valid base64"))?;
        Self::from_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::ROM_SIZE;

    #[test]
    fn capture_then_restore_round_trips() {
        let mut core = Core::new(&vec![0u8; ROM_SIZE]).unwrap();
        core.poke(0x8000, 0x42);
        core.set_border_color(4);
        let snap = Snapshot::capture(&core);

        let mut other = Core::new(&vec![0u8; ROM_SIZE]).unwrap();
        snap.restore(&mut other).unwrap();
        assert_eq!(other.peek(0x8000), 0x42);
        assert_eq!(other.border_color(), 4);
    }

    #[test]
    fn base64_round_trip() {
        let core = Core::new(&vec![0u8; ROM_SIZE]).unwrap();
        let snap = Snapshot::capture(&core);
        let encoded = snap.to_base64();
        let decoded = Snapshot::from_base64(&encoded).unwrap();
        assert_eq!(decoded, snap);
    }

    #[test]
    fn rejects_wrong_length_buffer() {
        assert!(Snapshot::from_bytes(&[0u8; 10]).is_err());
    }

    #[test]
    fn serializes_to_json_for_hosts_that_want_it() {
        let core = Core::new(&vec![0u8; ROM_SIZE]).unwrap();
        let snap = Snapshot::capture(&core);
        let json = serde_json::to_string(&snap).unwrap();
        let back: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snap);
    }
}
