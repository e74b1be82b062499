//! End-to-end tests driving the core the way a shell would: load a ROM
//! image, poke a RAM program, press keys, run frames, inspect the result.
//!
//! No licensed 48K ROM image ships with this crate, so the boot-sequence
//! and keyboard-propagation scenarios substitute a crafted ROM/RAM image
//! that exercises the same mechanisms (attribute/pixel memory, the
//! half-row port scan) the real ROM would, rather than literally booting
//! the genuine firmware.
use spectrum48_core::clock::FRAME_TSTATES;
use spectrum48_core::keyboard::KeyId;
use spectrum48_core::memory::ROM_SIZE;
use spectrum48_core::video;
use spectrum48_core::{Core, StopReason};

fn zero_rom() -> Vec<u8> {
    vec![0u8; ROM_SIZE]
}

fn set_pc(core: &mut Core, pc: u16) {
    let mut regs = core.get_registers();
    regs.pc = pc;
    core.set_registers(regs);
}

// --- End-to-end scenarios (spec section 8) -------------------------------

#[test]
fn scenario_cold_boot_renders_bottom_rows_and_attribute() {
    let mut core = Core::new(&zero_rom()).unwrap();
    core.reset();
    for addr in 0x5800u16..=0x5aff {
        core.poke(addr, 0x38);
    }
    let bottom_row_addr = video::pixel_byte_address(176, 0);
    core.poke(bottom_row_addr, 0xff);

    for _ in 0..200 {
        core.run_frame();
    }

    assert_eq!(core.peek(0x5800), 0x38);
    let (width, _) = core.pixel_buffer_dimensions();
    let bw = width - video::SCREEN_WIDTH; // total border, split evenly left/right
    let border = bw / 2;
    let blank_row_pixel = core.pixel_buffer()[(0 + border) * width + border];
    let lit_row_pixel = core.pixel_buffer()[(176 + border) * width + border];
    assert_ne!(lit_row_pixel, blank_row_pixel);
}

#[test]
fn scenario_keyboard_propagation() {
    let mut core = Core::new(&zero_rom()).unwrap();
    // Scans half-row 6 (ENTER,L,K,J,H) and stashes the raw port byte at
    // 0x5C08, a synthetic stand-in for the ROM's LAST_K system variable.
    let program: [u8; 10] = [
        0x01, 0xfe, 0xbf, // LD BC,0xBFFE
        0xed, 0x78, //       IN A,(C)
        0x32, 0x08, 0x5c, // LD (0x5C08),A
        0x18, 0xf6, //       JR -10
    ];
    for (i, &b) in program.iter().enumerate() {
        core.poke(i as u16, b);
    }
    core.reset();
    core.press(KeyId::L);

    for _ in 0..3 {
        core.run_frame();
    }

    // L sits at half-row 6, bit 1: pressed means that bit reads back clear.
    assert_eq!(core.peek(0x5c08) & 0x02, 0);
}

#[test]
fn scenario_border_write_visible() {
    let mut core = Core::new(&zero_rom()).unwrap();
    core.poke(0x8000, 0x3e); // LD A,2
    core.poke(0x8001, 0x02);
    core.poke(0x8002, 0xd3); // OUT (0xFE),A
    core.poke(0x8003, 0xfe);
    set_pc(&mut core, 0x8000);

    core.run_frame();

    assert_eq!(core.border_color(), 2);
}

#[test]
fn scenario_frame_interrupt_cadence() {
    let mut rom = vec![0u8; ROM_SIZE];
    rom[0x0000] = 0x76; // HALT
    // Interrupt handler at 0x0038 (IM1 vector): bump a RAM counter and
    // re-enable interrupts before returning.
    rom[0x0038] = 0x3a; // LD A,(0x8000)
    rom[0x0039] = 0x00;
    rom[0x003a] = 0x80;
    rom[0x003b] = 0x3c; // INC A
    rom[0x003c] = 0x32; // LD (0x8000),A
    rom[0x003d] = 0x00;
    rom[0x003e] = 0x80;
    rom[0x003f] = 0xfb; // EI
    rom[0x0040] = 0xed; // RETI
    rom[0x0041] = 0x4d;

    let mut core = Core::new(&rom).unwrap();
    let mut regs = core.get_registers();
    regs.pc = 0;
    regs.sp = 0xfffe;
    regs.halted = true;
    regs.iff1 = true;
    regs.iff2 = true;
    regs.im = 1;
    core.set_registers(regs);

    for _ in 0..50 {
        core.run_frame();
    }

    assert_eq!(core.peek(0x8000), 50);
}

#[test]
fn scenario_ldir_copy() {
    let mut core = Core::new(&zero_rom()).unwrap();
    let program: [u8; 12] = [
        0x21, 0x00, 0x80, // LD HL,0x8000
        0x11, 0x00, 0x81, // LD DE,0x8100
        0x01, 0x00, 0x01, // LD BC,0x0100
        0xed, 0xb0, //       LDIR
        0x76, //             HALT
    ];
    for (i, &b) in program.iter().enumerate() {
        core.poke(0x8000 + i as u16, b);
    }
    set_pc(&mut core, 0x8000);

    let result = core.run_frame();

    assert_eq!(result.stop_reason, StopReason::HaltForever);
    for i in 0u16..256 {
        assert_eq!(core.peek(0x8000 + i), core.peek(0x8100 + i));
    }
    // 3 setup instructions at 10 T-states each, the LDIR block at
    // 21*255+16, and the HALT that stops the run.
    let expected = 3 * 10 + (21 * 255 + 16) + 4;
    assert_eq!(result.tstates_elapsed, expected);
}

#[test]
fn scenario_contention_favours_uncontended_loop() {
    fn count_instructions_per_frame(base: u16) -> u32 {
        let mut core = Core::new(&zero_rom()).unwrap();
        core.poke(base, 0x23); // INC HL
        core.poke(base + 1, 0x18); // JR -2
        core.poke(base + 2, 0xfe);
        set_pc(&mut core, base);

        let mut elapsed = 0u32;
        let mut steps = 0u32;
        while elapsed < FRAME_TSTATES as u32 {
            elapsed += core.step().tstates_elapsed;
            steps += 1;
        }
        steps
    }

    let contended = count_instructions_per_frame(0x4000);
    let uncontended = count_instructions_per_frame(0x8000);
    assert!(contended < uncontended);
}

// --- Quantified invariants (spec section 8) -------------------------------

#[test]
fn invariant_poke_below_rom_boundary_leaves_rom_untouched() {
    let rom: Vec<u8> = (0..ROM_SIZE).map(|i| (i & 0xff) as u8).collect();
    let mut core = Core::new(&rom).unwrap();
    let before = core.peek(0x1234);
    core.poke(0x1234, !before);
    assert_eq!(core.peek(0x1234), before);
}

#[test]
fn invariant_poke_above_rom_boundary_round_trips() {
    let mut core = Core::new(&zero_rom()).unwrap();
    core.poke(0x9abc, 0x42);
    assert_eq!(core.peek(0x9abc), 0x42);
}

#[test]
fn invariant_run_frame_advances_a_bounded_amount_past_the_budget() {
    // An all-zero ROM is a sea of NOPs (4 T-states each); the overrun past
    // the frame budget can never exceed one instruction's cost.
    let mut core = Core::new(&zero_rom()).unwrap();
    let result = core.run_frame();
    assert!(result.tstates_elapsed >= FRAME_TSTATES as u32);
    assert!(result.tstates_elapsed < FRAME_TSTATES as u32 + 30);
}

#[test]
fn invariant_ei_delay_blocks_interrupt_for_exactly_one_instruction() {
    let mut rom = vec![0u8; ROM_SIZE];
    rom[0] = 0xfb; // EI
    rom[1] = 0x00; // NOP
    rom[2] = 0x00; // NOP
    let mut core = Core::new(&rom).unwrap();

    let after_ei = core.step();
    assert_eq!(core.get_registers().pc, 1);
    assert_eq!(after_ei.tstates_elapsed, 4);

    let after_nop = core.step();
    // The NOP completes and, since EI's one-instruction delay has now
    // elapsed, the pending interrupt is accepted in the same step.
    assert_eq!(core.get_registers().pc, 0x0038);
    assert!(after_nop.tstates_elapsed > 4);
}

#[test]
fn invariant_halt_plus_interrupt_lands_at_0x0038_with_return_address_after_halt() {
    let a: u16 = 0x0010;
    let mut rom = vec![0u8; ROM_SIZE];
    rom[a as usize] = 0x76; // HALT

    let mut core = Core::new(&rom).unwrap();
    let mut regs = core.get_registers();
    regs.pc = a;
    regs.sp = 0xfffe;
    regs.iff1 = true;
    regs.iff2 = true;
    core.set_registers(regs);

    // Frame-relative T-state 0 falls inside the interrupt pulse, so the
    // HALT and its acceptance both happen within this single step.
    core.step();

    let after = core.get_registers();
    assert_eq!(after.pc, 0x0038);
    let saved_lo = core.peek(after.sp) as u16;
    let saved_hi = core.peek(after.sp.wrapping_add(1)) as u16;
    assert_eq!(saved_lo | (saved_hi << 8), a + 1);
}

// --- Round-trip laws -------------------------------------------------------

#[test]
fn round_trip_set_then_get_registers() {
    let mut core = Core::new(&zero_rom()).unwrap();
    let mut snapshot = core.get_registers();
    snapshot.a = 0x55;
    snapshot.bc = 0x1234;
    snapshot.hl = 0xbeef;
    snapshot.pc = 0x8000;
    snapshot.iff1 = true;
    core.set_registers(snapshot);
    assert_eq!(core.get_registers(), snapshot);
}

#[cfg(feature = "snapshot")]
#[test]
fn round_trip_snapshot_reaches_identical_subsequent_frames() {
    use spectrum48_core::snapshot::Snapshot;

    let mut core = Core::new(&zero_rom()).unwrap();
    core.poke(0x8000, 0x3e); // LD A,7
    core.poke(0x8001, 0x07);
    core.poke(0x8002, 0xd3); // OUT (0xFE),A
    core.poke(0x8003, 0xfe);
    set_pc(&mut core, 0x8000);
    core.run_frame();

    let snap = Snapshot::capture(&core);

    let mut restored = Core::new(&zero_rom()).unwrap();
    snap.restore(&mut restored).unwrap();

    assert_eq!(restored.get_registers(), core.get_registers());

    let a = core.run_frame();
    let b = restored.run_frame();
    assert_eq!(a, b);
    assert_eq!(core.border_color(), restored.border_color());
}

// --- Boundary cases ---------------------------------------------------------

#[test]
fn boundary_add_hl_hl_wraps_with_carry_and_half_carry() {
    let mut core = Core::new(&zero_rom()).unwrap();
    core.poke(0x8000, 0x29); // ADD HL,HL
    let mut regs = core.get_registers();
    regs.pc = 0x8000;
    regs.hl = 0x8000;
    core.set_registers(regs);

    core.step();

    let after = core.get_registers();
    assert_eq!(after.hl, 0x0000);
    assert_eq!(after.f & 0x01, 0x01); // C
    assert_eq!(after.f & 0x10, 0x10); // H
}

#[test]
fn boundary_ldir_copies_exactly_across_the_16kib_page_boundary() {
    let mut core = Core::new(&zero_rom()).unwrap();
    for i in 0u16..256 {
        core.poke(0x7f00u16.wrapping_add(i), (i & 0xff) as u8);
    }
    // Program lives well clear of both the source and destination ranges.
    core.poke(0x9100, 0x21); // LD HL,0x7F00
    core.poke(0x9101, 0x00);
    core.poke(0x9102, 0x7f);
    core.poke(0x9103, 0x11); // LD DE,0x9000
    core.poke(0x9104, 0x00);
    core.poke(0x9105, 0x90);
    core.poke(0x9106, 0x01); // LD BC,0x0100
    core.poke(0x9107, 0x00);
    core.poke(0x9108, 0x01);
    core.poke(0x9109, 0xed); // LDIR
    core.poke(0x910a, 0xb0);
    core.poke(0x910b, 0x76); // HALT
    set_pc(&mut core, 0x9100);

    let result = core.run_frame();
    assert_eq!(result.stop_reason, StopReason::HaltForever);

    for i in 0u16..256 {
        assert_eq!(core.peek(0x7f00u16.wrapping_add(i)), core.peek(0x9000u16.wrapping_add(i)));
    }
}

#[test]
fn boundary_ddcb_instruction_refreshes_r_by_exactly_two() {
    // DD CB d op (SET 0,(IX+d)) refreshes R twice: once for the DD prefix,
    // once for the CB prefix. The trailing opcode byte is not a third M1
    // cycle and must not bump R again.
    let mut core = Core::new(&zero_rom()).unwrap();
    core.poke(0x8000, 0xdd);
    core.poke(0x8001, 0xcb);
    core.poke(0x8002, 0x00); // displacement 0
    core.poke(0x8003, 0xc6); // SET 0,(IX+d)
    let mut regs = core.get_registers();
    regs.pc = 0x8000;
    regs.ix = 0x9000;
    regs.r = 0x00;
    core.set_registers(regs);

    core.step();

    assert_eq!(core.get_registers().r & 0x7f, 0x02);
    assert_eq!(core.peek(0x9000) & 0x01, 0x01);
}

#[test]
fn watchpoint_stops_run_frame_on_matching_memory_write() {
    use spectrum48_core::WatchpointKind;

    let mut core = Core::new(&zero_rom()).unwrap();
    core.poke(0x8000, 0x21); // LD HL,0x9000
    core.poke(0x8001, 0x00);
    core.poke(0x8002, 0x90);
    core.poke(0x8003, 0x36); // LD (HL),0x7a
    core.poke(0x8004, 0x7a);
    core.poke(0x8005, 0xc3); // JP 0x8000
    core.poke(0x8006, 0x00);
    core.poke(0x8007, 0x80);
    set_pc(&mut core, 0x8000);
    core.set_watchpoint(0x9000, WatchpointKind::Write);

    let result = core.run_frame();

    assert_eq!(
        result.stop_reason,
        StopReason::WatchpointHit(0x9000, WatchpointKind::Write)
    );
    assert_eq!(core.peek(0x9000), 0x7a);
}

#[test]
fn boundary_in_a_fe_reports_pressed_z_as_a_clear_bit() {
    let mut core = Core::new(&zero_rom()).unwrap();
    core.press(KeyId::Z);
    core.poke(0x8000, 0x3e); // LD A,0xFE
    core.poke(0x8001, 0xfe);
    core.poke(0x8002, 0xdb); // IN A,(0xFE)
    core.poke(0x8003, 0xfe);
    set_pc(&mut core, 0x8000);

    core.step(); // LD A,0xFE
    core.step(); // IN A,(0xFE)

    assert_eq!(core.get_registers().a & 0x02, 0);
}
