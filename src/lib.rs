/*
    Copyright (C) 2026  ZX Spectrum core contributors

    This file is part of spectrum48-core, a cycle-accurate ZX Spectrum 48K
    emulation core.

    spectrum48-core is free software: you can redistribute it and/or modify
    it under the terms of the GNU Lesser General Public License (LGPL) as
    published by the Free Software Foundation, either version 3 of the
    License, or (at your option) any later version.

    spectrum48-core is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Lesser General Public License for more details.

    You should have received a copy of the GNU Lesser General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.

    Author contact information: see Cargo.toml file, section [package.authors].
*/
//! A deterministic, cycle-counted emulation core for the ZX Spectrum 48K.
//!
//! This crate implements the four components that make up the machine: a
//! [`cpu`] module with a cycle-accurate Z80 interpreter, a [`memory`] module
//! with the fixed ROM/RAM page layout, a [`ula`] module modelling the video
//! chip's frame clock, contention and raster, and a [`keyboard`] module for
//! the 8x5 key matrix. The [`core`] module wires these together behind the
//! `Core` type that a host shell drives frame by frame.
#![allow(clippy::upper_case_acronyms)]

#[macro_use]
extern crate bitflags;

pub mod bus;
pub mod clock;
pub mod core;
pub mod cpu;
pub mod error;
pub mod keyboard;
pub mod memory;
#[cfg(feature = "snapshot")]
pub mod snapshot;
pub mod ula;
pub mod video;

pub use crate::core::{Core, RunResult, StopReason, WatchpointKind};
pub use crate::error::CoreError;
