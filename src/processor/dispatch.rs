use super::{Handler, Processor};
use crate::error::ErrorDetail;
use crate::properties::{Properties, QuirkFlags, Variant};
use crate::video::BlendMode;

#[inline]
fn x(opcode: u16) -> u8 {
    ((opcode & 0x0F00) >> 8) as u8
}
#[inline]
fn y(opcode: u16) -> u8 {
    ((opcode & 0x00F0) >> 4) as u8
}
#[inline]
fn n(opcode: u16) -> u8 {
    (opcode & 0x000F) as u8
}
#[inline]
fn nn(opcode: u16) -> u8 {
    (opcode & 0x00FF) as u8
}
#[inline]
fn nnn(opcode: u16) -> u16 {
    opcode & 0x0FFF
}

/// Builds the 65,536-entry opcode dispatch table for `properties`: a common pass establishes
/// every base CHIP-8 opcode family, then a variant-specific pass layers overrides on top
/// (later entries win on overlapping patterns), mirroring the upstream mask/match population
/// order described for `Chip8GenericEmulator::setupInstructionSet`.
pub(crate) fn build_handler_table(properties: &Properties) -> Vec<Handler> {
    let mut table: Vec<Handler> = vec![op_invalid; 0x10000];
    populate(&mut table, &common_entries());
    match properties.behavior_base {
        Variant::Chip8 | Variant::Chip10 => {}
        Variant::Chip8E => populate(&mut table, &chip8e_entries()),
        Variant::Chip8X => populate(&mut table, &chip8x_entries()),
        Variant::Chip48 => {}
        Variant::SChip10 | Variant::SChip11 | Variant::SChipC | Variant::SChipModern => {
            populate(&mut table, &schip_entries());
        }
        Variant::MegaChip => {
            populate(&mut table, &schip_entries());
            populate(&mut table, &megachip_entries());
        }
        Variant::XoChip => {
            populate(&mut table, &schip_entries());
            populate(&mut table, &xochip_entries());
        }
    }
    table
}

fn populate(table: &mut [Handler], entries: &[(u16, u16, Handler)]) {
    for &(mask, pattern, handler) in entries {
        for opcode in 0..=0xFFFFu32 {
            let opcode = opcode as u16;
            if opcode & mask == pattern {
                table[opcode as usize] = handler;
            }
        }
    }
}

fn common_entries() -> Vec<(u16, u16, Handler)> {
    vec![
        (0xF000, 0x0000, op_0nnn_sys),
        (0xFFFF, 0x00E0, op_00e0_clear),
        (0xFFFF, 0x00EE, op_00ee_return),
        (0xF000, 0x1000, op_1nnn_jump),
        (0xF000, 0x2000, op_2nnn_call),
        (0xF000, 0x3000, op_3xnn_skip_eq),
        (0xF000, 0x4000, op_4xnn_skip_neq),
        (0xF00F, 0x5000, op_5xy0_skip_eq_reg),
        (0xF000, 0x6000, op_6xnn_load),
        (0xF000, 0x7000, op_7xnn_add),
        (0xF00F, 0x8000, op_8xy0_load),
        (0xF00F, 0x8001, op_8xy1_or),
        (0xF00F, 0x8002, op_8xy2_and),
        (0xF00F, 0x8003, op_8xy3_xor),
        (0xF00F, 0x8004, op_8xy4_add),
        (0xF00F, 0x8005, op_8xy5_sub),
        (0xF00F, 0x8006, op_8xy6_shr),
        (0xF00F, 0x8007, op_8xy7_subn),
        (0xF00F, 0x800E, op_8xye_shl),
        (0xF00F, 0x9000, op_9xy0_skip_neq_reg),
        (0xF000, 0xA000, op_annn_load_i),
        (0xF000, 0xB000, op_bnnn_jump_offset),
        (0xF000, 0xC000, op_cxnn_random),
        (0xF000, 0xD000, op_dxyn_draw),
        (0xF0FF, 0xE09E, op_ex9e_skip_key_down),
        (0xF0FF, 0xE0A1, op_exa1_skip_key_up),
        (0xF0FF, 0xF007, op_fx07_get_dt),
        (0xF0FF, 0xF00A, op_fx0a_wait_key),
        (0xF0FF, 0xF015, op_fx15_set_dt),
        (0xF0FF, 0xF018, op_fx18_set_st),
        (0xF0FF, 0xF01E, op_fx1e_add_i),
        (0xF0FF, 0xF029, op_fx29_font),
        (0xF0FF, 0xF033, op_fx33_bcd),
        (0xF0FF, 0xF055, op_fx55_store),
        (0xF0FF, 0xF065, op_fx65_load),
    ]
}

/// Opcodes SUPER-CHIP adds on top of the common set; every SCHIP/MEGACHIP/XO-CHIP preset
/// layers these before its own further overrides.
fn schip_entries() -> Vec<(u16, u16, Handler)> {
    vec![
        (0xFFF0, 0x00B0, op_00bn_scroll_up),
        (0xFFF0, 0x00C0, op_00cn_scroll_down),
        (0xFFFF, 0x00FB, op_00fb_scroll_right),
        (0xFFFF, 0x00FC, op_00fc_scroll_left),
        (0xFFFF, 0x00FD, op_00fd_halt),
        (0xFFFF, 0x00FE, op_00fe_lores),
        (0xFFFF, 0x00FF, op_00ff_hires),
        (0xF0FF, 0xF030, op_fx30_bigfont),
        (0xF0FF, 0xF075, op_fx75_save_rpl),
        (0xF0FF, 0xF085, op_fx85_load_rpl),
    ]
}

fn chip8e_entries() -> Vec<(u16, u16, Handler)> {
    vec![
        (0xFFFF, 0x00ED, op_00ed_halt),
        (0xFFFF, 0x0151, op_0151_dt_wait),
        (0xFFFF, 0x0188, op_0188_skip2),
        (0xF00F, 0x5001, op_5xy1_chip8e_skip_gt),
        (0xF00F, 0x5002, op_5xy2_chip8e_range_save),
        (0xF00F, 0x5003, op_5xy3_chip8e_range_load),
        (0xFF00, 0xBB00, op_bbnn_rel_jump_back),
        (0xFF00, 0xBF00, op_bfnn_rel_jump_fwd),
        (0xF0FF, 0xF01B, op_fx1b_pc_add_vx),
        (0xF0FF, 0xF04F, op_fx4f_dt_set_wait),
    ]
}

fn chip8x_entries() -> Vec<(u16, u16, Handler)> {
    vec![
        (0xFFFF, 0x02A0, op_02a0_bg_cycle),
        (0xF00F, 0x5001, op_5xy1_chip8x_add_sat),
        (0xF000, 0xB000, op_bxyn_chip8x_overlay),
        (0xF0FF, 0xE0F2, op_exf2_chip8x),
        (0xF0FF, 0xE0F5, op_exf5_chip8x),
        (0xF0FF, 0xF0F8, op_fxf8_chip8x_vp595),
        (0xF0FF, 0xF0FB, op_fxfb_chip8x),
    ]
}

fn megachip_entries() -> Vec<(u16, u16, Handler)> {
    vec![
        (0xFFFF, 0x0010, op_0010_megachip_leave),
        (0xFFFF, 0x0011, op_0011_megachip_enter),
        (0xFFFF, 0x00E0, op_00e0_megachip_swap),
        (0xFF00, 0x0100, op_01nn_megachip_load_i_wide),
        (0xFF00, 0x0200, op_02nn_megachip_palette),
        (0xFF00, 0x0300, op_03nn_megachip_sprite_width),
        (0xFF00, 0x0400, op_04nn_megachip_sprite_height),
        (0xFF00, 0x0500, op_05nn_megachip_screen_alpha),
        (0xFFF0, 0x0600, op_060n_megachip_play_sample),
        (0xFFFF, 0x0700, op_0700_megachip_stop_sample),
        (0xFFF0, 0x0800, op_080n_megachip_blend_mode),
        (0xFF00, 0x0900, op_09nn_megachip_collision_color),
        (0xF000, 0xD000, op_dxyn_draw_megachip),
    ]
}

fn xochip_entries() -> Vec<(u16, u16, Handler)> {
    vec![
        (0xFFF0, 0x00C0, op_00cn_scroll_down_masked),
        (0xFFF0, 0x00D0, op_00dn_scroll_up_masked),
        (0xFFFF, 0x00FB, op_00fb_scroll_right_masked),
        (0xFFFF, 0x00FC, op_00fc_scroll_left_masked),
        (0xF000, 0x3000, op_3xnn_skip_eq),
        (0xF000, 0x4000, op_4xnn_skip_neq),
        (0xF00F, 0x5000, op_5xy0_skip_eq_reg),
        (0xF00F, 0x5002, op_5xy2_xochip_range_save),
        (0xF00F, 0x5003, op_5xy3_xochip_range_load),
        (0xF00F, 0x9000, op_9xy0_skip_neq_reg),
        (0xF0FF, 0xE09E, op_ex9e_skip_key_down),
        (0xF0FF, 0xE0A1, op_exa1_skip_key_up),
        (0xFFFF, 0xF000, op_f000_load_i_wide),
        (0xF0FF, 0xF001, op_fx01_select_planes),
        (0xFFFF, 0xF002, op_f002_store_audio_pattern),
        (0xF0FF, 0xF03A, op_fx3a_set_pitch),
    ]
}

/// Returns `4` if the instruction at the current PC is a two-word form (`F000` or MEGACHIP's
/// `01nn`) that a skip must hop clean over, else `2` (`CONDITIONAL_SKIP_DISTANCE` upstream).
fn skip_distance(processor: &Processor) -> u16 {
    if !processor.quirks().contains(QuirkFlags::LONG_SKIP) {
        return 2;
    }
    match processor.memory().read_two_bytes(processor.pc() as usize) {
        Ok(next) if next & 0xFF00 == 0xF000 || next & 0xFF00 == 0x0100 => 4,
        _ => 2,
    }
}

fn conditional_skip(processor: &mut Processor, condition: bool) {
    if condition {
        let distance = skip_distance(processor);
        processor.advance_pc(distance);
    }
}

fn op_invalid(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    processor.warn_invalid_opcode(opcode);
    Err(ErrorDetail::UnknownInstruction { opcode })
}

fn op_0nnn_sys(_processor: &mut Processor, _opcode: u16) -> Result<(), ErrorDetail> {
    // RCA 1802 native call; every surviving CHIP-8 ROM relies on this being a no-op.
    Ok(())
}

fn op_00e0_clear(processor: &mut Processor, _opcode: u16) -> Result<(), ErrorDetail> {
    processor.host_mut().pre_clear();
    let mask = processor.planes();
    processor.video_mut().clear(mask);
    processor.host_mut().update_screen();
    Ok(())
}

fn op_00ee_return(processor: &mut Processor, _opcode: u16) -> Result<(), ErrorDetail> {
    let address = processor.stack_mut().pop()?;
    processor.set_pc(address);
    if processor.exec_mode() == crate::processor::ExecMode::StepOut {
        processor.pause();
    }
    Ok(())
}

fn op_1nnn_jump(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    processor.set_pc(nnn(opcode));
    Ok(())
}

fn op_2nnn_call(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let return_address = processor.pc();
    processor.stack_mut().push(return_address)?;
    processor.set_pc(nnn(opcode));
    Ok(())
}

fn op_3xnn_skip_eq(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let condition = processor.v(x(opcode)) == nn(opcode);
    conditional_skip(processor, condition);
    Ok(())
}

fn op_4xnn_skip_neq(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let condition = processor.v(x(opcode)) != nn(opcode);
    conditional_skip(processor, condition);
    Ok(())
}

fn op_5xy0_skip_eq_reg(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let condition = processor.v(x(opcode)) == processor.v(y(opcode));
    conditional_skip(processor, condition);
    Ok(())
}

fn op_6xnn_load(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    processor.set_v(x(opcode), nn(opcode));
    Ok(())
}

fn op_7xnn_add(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let result = processor.v(x(opcode)).wrapping_add(nn(opcode));
    processor.set_v(x(opcode), result);
    Ok(())
}

fn op_8xy0_load(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    processor.set_v(x(opcode), processor.v(y(opcode)));
    Ok(())
}

fn op_8xy1_or(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let result = processor.v(x(opcode)) | processor.v(y(opcode));
    processor.set_v(x(opcode), result);
    if !processor.quirks().contains(QuirkFlags::DONT_RESET_VF) {
        processor.set_v(0xF, 0);
    }
    Ok(())
}

fn op_8xy2_and(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let result = processor.v(x(opcode)) & processor.v(y(opcode));
    processor.set_v(x(opcode), result);
    if !processor.quirks().contains(QuirkFlags::DONT_RESET_VF) {
        processor.set_v(0xF, 0);
    }
    Ok(())
}

fn op_8xy3_xor(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let result = processor.v(x(opcode)) ^ processor.v(y(opcode));
    processor.set_v(x(opcode), result);
    if !processor.quirks().contains(QuirkFlags::DONT_RESET_VF) {
        processor.set_v(0xF, 0);
    }
    Ok(())
}

fn op_8xy4_add(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let result = processor.v(x(opcode)) as u16 + processor.v(y(opcode)) as u16;
    processor.set_v(x(opcode), result as u8);
    processor.set_v(0xF, (result >> 8) as u8);
    Ok(())
}

fn op_8xy5_sub(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let result = (processor.v(x(opcode)) as i16) - (processor.v(y(opcode)) as i16);
    processor.set_v(x(opcode), result as u8);
    processor.set_v(0xF, if result < 0 { 0 } else { 1 });
    Ok(())
}

fn op_8xy6_shr(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let source = if processor.quirks().contains(QuirkFlags::SHIFT_VX_ONLY) {
        processor.v(x(opcode))
    } else {
        processor.v(y(opcode))
    };
    processor.set_v(x(opcode), source >> 1);
    processor.set_v(0xF, source & 0x1);
    Ok(())
}

fn op_8xy7_subn(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let result = (processor.v(y(opcode)) as i16) - (processor.v(x(opcode)) as i16);
    processor.set_v(x(opcode), result as u8);
    processor.set_v(0xF, if result < 0 { 0 } else { 1 });
    Ok(())
}

fn op_8xye_shl(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let source = if processor.quirks().contains(QuirkFlags::SHIFT_VX_ONLY) {
        processor.v(x(opcode))
    } else {
        processor.v(y(opcode))
    };
    processor.set_v(x(opcode), source << 1);
    processor.set_v(0xF, source >> 7);
    Ok(())
}

fn op_9xy0_skip_neq_reg(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let condition = processor.v(x(opcode)) != processor.v(y(opcode));
    conditional_skip(processor, condition);
    Ok(())
}

fn op_annn_load_i(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    processor.set_i(nnn(opcode) as u32);
    Ok(())
}

fn op_bnnn_jump_offset(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let base = if processor.quirks().contains(QuirkFlags::JUMP0_BXNN) {
        processor.v(x(opcode)) as u16
    } else {
        processor.v(0) as u16
    };
    processor.set_pc(base.wrapping_add(nnn(opcode)));
    Ok(())
}

fn op_cxnn_random(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let random_byte: u8 = rand::random();
    processor.set_v(x(opcode), random_byte & nn(opcode));
    Ok(())
}

/// The common `Dxyn` sprite-draw, quirk-aware for resolution doubling, wrap-vs-clip, collision
/// counting style, and multi-plane selection (planes() defaults to 0x1 outside XO-CHIP).
fn op_dxyn_draw(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let vx = processor.v(x(opcode)) as usize % processor.video().width();
    let vy = processor.v(y(opcode)) as usize % processor.video().height();
    let rows = n(opcode) as usize;
    let quirks = processor.quirks();
    let lores_double = quirks.contains(QuirkFlags::SCHIP_LORES_DRAWING) && !processor.video().is_hires();
    let width_bits: usize = if rows == 0 {
        if quirks.contains(QuirkFlags::LORES_DXY0_IS_16X16) || processor.video().is_hires() {
            16
        } else if quirks.contains(QuirkFlags::LORES_DXY0_IS_8X16) {
            8
        } else {
            16
        }
    } else {
        8
    };
    let sprite_rows_count = if rows == 0 { 16 } else { rows };
    let i = processor.i() as usize;
    let byte_width = width_bits / 8;
    let mut sprite_rows: Vec<u16> = Vec::with_capacity(sprite_rows_count);
    for row in 0..sprite_rows_count {
        let mut word: u16 = 0;
        for b in 0..byte_width {
            let byte = processor.memory().read_byte(i + row * byte_width + b)?;
            word |= (byte as u16) << (8 * (byte_width - 1 - b));
        }
        sprite_rows.push(word);
    }
    let scale = if lores_double { 2 } else { 1 };
    let (erased, clipped) = if scale == 1 {
        processor
            .video_mut()
            .draw_sprite(vx, vy, &sprite_rows, width_bits, processor.planes(), quirks)
    } else {
        let mut total_erased = 0;
        let mut total_clipped = 0;
        for (row_offset, &row_bits) in sprite_rows.iter().enumerate() {
            let doubled_row = [row_bits];
            for dy in 0..2 {
                let (e, c) = processor.video_mut().draw_sprite(
                    vx * 2,
                    vy * 2 + row_offset * 2 + dy,
                    &doubled_row,
                    width_bits,
                    processor.planes(),
                    quirks,
                );
                total_erased += e;
                total_clipped += c;
            }
        }
        (total_erased, total_clipped)
    };
    let vf = if quirks.contains(QuirkFlags::SCHIP11_COLLISION) {
        (erased + clipped).min(255) as u8
    } else if erased > 0 {
        1
    } else {
        0
    };
    processor.set_v(0xF, vf);
    processor.host_mut().update_screen();
    Ok(())
}

fn op_ex9e_skip_key_down(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let key = processor.v(x(opcode)) & 0xF;
    let condition = processor.keystate().is_key_pressed(key)?;
    conditional_skip(processor, condition);
    Ok(())
}

fn op_exa1_skip_key_up(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let key = processor.v(x(opcode)) & 0xF;
    let condition = !processor.keystate().is_key_pressed(key)?;
    conditional_skip(processor, condition);
    Ok(())
}

fn op_fx07_get_dt(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    processor.set_v(x(opcode), processor.delay_timer());
    Ok(())
}

/// Blocks on key input by rewinding PC when nothing was pressed this poll; a key release
/// (negative report) nudges the sound timer briefly, matching the upstream feedback click.
fn op_fx0a_wait_key(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let key = processor.host_mut().get_key_pressed();
    if key > 0 {
        processor.set_v(x(opcode), (key - 1) as u8);
    } else {
        processor.set_pc(processor.pc().wrapping_sub(2));
        if key < 0 {
            processor.set_sound_timer(4);
        }
    }
    Ok(())
}

fn op_fx15_set_dt(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    processor.set_delay_timer(processor.v(x(opcode)));
    Ok(())
}

fn op_fx18_set_st(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    processor.set_sound_timer(processor.v(x(opcode)));
    Ok(())
}

fn op_fx1e_add_i(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let result = processor.i() + processor.v(x(opcode)) as u32;
    processor.set_i(result);
    Ok(())
}

fn op_fx29_font(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let digit = processor.v(x(opcode)) & 0xF;
    processor.set_i(processor.font_sprite_address(digit) as u32);
    Ok(())
}

fn op_fx33_bcd(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let value = processor.v(x(opcode));
    let i = processor.i() as usize;
    processor.memory_mut().write_byte(i, value / 100)?;
    processor.memory_mut().write_byte(i + 1, (value / 10) % 10)?;
    processor.memory_mut().write_byte(i + 2, value % 10)?;
    Ok(())
}

fn op_fx55_store(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let upto = x(opcode);
    let i = processor.i() as usize;
    for reg in 0..=upto {
        let value = processor.v(reg);
        processor.memory_mut().write_byte(i + reg as usize, value)?;
    }
    let quirks = processor.quirks();
    if quirks.contains(QuirkFlags::LOAD_STORE_INC_I_BY_X) {
        processor.set_i(processor.i() + upto as u32);
    } else if !quirks.contains(QuirkFlags::LOAD_STORE_INC_I_BY_X_PLUS_1) {
        processor.set_i(processor.i() + upto as u32 + 1);
    } else {
        processor.set_i(processor.i() + upto as u32 + 1);
    }
    Ok(())
}

fn op_fx65_load(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let upto = x(opcode);
    let i = processor.i() as usize;
    for reg in 0..=upto {
        let value = processor.memory().read_byte(i + reg as usize)?;
        processor.set_v(reg, value);
    }
    let quirks = processor.quirks();
    if quirks.contains(QuirkFlags::LOAD_STORE_INC_I_BY_X) {
        processor.set_i(processor.i() + upto as u32);
    } else {
        processor.set_i(processor.i() + upto as u32 + 1);
    }
    Ok(())
}

// --- SUPER-CHIP additions ---

fn op_00bn_scroll_up(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let count = n(opcode) as usize;
    let amount = scroll_amount(processor, count);
    processor.video_mut().scroll_up(amount, processor.planes());
    Ok(())
}

fn op_00cn_scroll_down(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let count = n(opcode) as usize;
    let amount = scroll_amount(processor, count);
    processor.video_mut().scroll_down(amount, processor.planes());
    Ok(())
}

fn op_00fb_scroll_right(processor: &mut Processor, _opcode: u16) -> Result<(), ErrorDetail> {
    let amount = scroll_amount(processor, 4);
    processor.video_mut().scroll_right(amount, processor.planes());
    Ok(())
}

fn op_00fc_scroll_left(processor: &mut Processor, _opcode: u16) -> Result<(), ErrorDetail> {
    let amount = scroll_amount(processor, 4);
    processor.video_mut().scroll_left(amount, processor.planes());
    Ok(())
}

/// SUPER-CHIP's scroll counts double in lores mode unless the half-pixel-scroll quirk is set.
fn scroll_amount(processor: &Processor, n: usize) -> usize {
    if processor.video().is_hires() || processor.quirks().contains(QuirkFlags::HALF_PIXEL_SCROLL) {
        n
    } else {
        n * 2
    }
}

fn op_00fd_halt(processor: &mut Processor, _opcode: u16) -> Result<(), ErrorDetail> {
    processor.pause();
    Ok(())
}

fn op_00fe_lores(processor: &mut Processor, _opcode: u16) -> Result<(), ErrorDetail> {
    processor.host_mut().pre_clear();
    let clear = processor.quirks().contains(QuirkFlags::MODE_CHANGE_CLEAR);
    processor.video_mut().set_hires(false, clear);
    Ok(())
}

fn op_00ff_hires(processor: &mut Processor, _opcode: u16) -> Result<(), ErrorDetail> {
    processor.host_mut().pre_clear();
    let clear = processor.quirks().contains(QuirkFlags::MODE_CHANGE_CLEAR);
    processor.video_mut().set_hires(true, clear);
    Ok(())
}

fn op_fx30_bigfont(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let digit = processor.v(x(opcode)) & 0xF;
    processor.set_i(processor.big_font_sprite_address(digit) as u32);
    Ok(())
}

fn op_fx75_save_rpl(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let upto = (x(opcode) & 0xF) as usize;
    for reg in 0..=upto {
        let value = processor.v(reg as u8);
        processor.rpl_flags_mut()[reg] = value;
    }
    Ok(())
}

fn op_fx85_load_rpl(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let upto = (x(opcode) & 0xF) as usize;
    for reg in 0..=upto {
        let value = processor.rpl_flags_mut()[reg];
        processor.set_v(reg as u8, value);
    }
    Ok(())
}

// --- CHIP-8E additions ---

fn op_00ed_halt(processor: &mut Processor, _opcode: u16) -> Result<(), ErrorDetail> {
    processor.pause();
    Ok(())
}

fn op_0151_dt_wait(processor: &mut Processor, _opcode: u16) -> Result<(), ErrorDetail> {
    if processor.cpu_state_ref() != crate::processor::CpuState::Wait {
        processor.set_cpu_state(crate::processor::CpuState::Wait);
    }
    if processor.delay_timer() > 0 {
        processor.set_pc(processor.pc().wrapping_sub(2));
    } else {
        processor.set_cpu_state(crate::processor::CpuState::Normal);
    }
    Ok(())
}

fn op_0188_skip2(processor: &mut Processor, _opcode: u16) -> Result<(), ErrorDetail> {
    processor.advance_pc(2);
    Ok(())
}

fn op_5xy1_chip8e_skip_gt(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let condition = processor.v(x(opcode)) > processor.v(y(opcode));
    if condition {
        processor.advance_pc(2);
    }
    Ok(())
}

fn op_5xy2_chip8e_range_save(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let (rx, ry) = (x(opcode), y(opcode));
    if rx < ry {
        let i = processor.i() as usize;
        for offset in 0..=(ry - rx) {
            let value = processor.v(rx + offset);
            processor.memory_mut().write_byte(i + offset as usize, value)?;
        }
        processor.set_i(processor.i() + (ry - rx) as u32 + 1);
    }
    Ok(())
}

fn op_5xy3_chip8e_range_load(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let (rx, ry) = (x(opcode), y(opcode));
    if rx < ry {
        let i = processor.i() as usize;
        for offset in 0..=(ry - rx) {
            let value = processor.memory().read_byte(i + offset as usize)?;
            processor.set_v(rx + offset, value);
        }
        processor.set_i(processor.i() + (ry - rx) as u32 + 1);
    }
    Ok(())
}

fn op_bbnn_rel_jump_back(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let pc = processor.pc().wrapping_sub(2).wrapping_sub(nn(opcode) as u16);
    processor.set_pc(pc);
    Ok(())
}

fn op_bfnn_rel_jump_fwd(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let pc = processor.pc().wrapping_sub(2).wrapping_add(nn(opcode) as u16);
    processor.set_pc(pc);
    Ok(())
}

fn op_fx1b_pc_add_vx(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let pc = processor.pc().wrapping_add(processor.v(x(opcode)) as u16);
    processor.set_pc(pc);
    Ok(())
}

/// Sets DT from Vx then busy-waits for it to reach zero. `CpuState::Wait` is the first-entry
/// sentinel (not "DT==0") so a Vx of 0 still waits out exactly one frame rather than falling
/// through immediately.
fn op_fx4f_dt_set_wait(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    if processor.cpu_state_ref() != crate::processor::CpuState::Wait {
        processor.set_delay_timer(processor.v(x(opcode)));
        processor.set_cpu_state(crate::processor::CpuState::Wait);
    }
    if processor.delay_timer() > 0 {
        processor.set_pc(processor.pc().wrapping_sub(2));
    } else {
        processor.set_cpu_state(crate::processor::CpuState::Normal);
    }
    Ok(())
}

// --- CHIP-8X additions ---

fn op_02a0_bg_cycle(processor: &mut Processor, _opcode: u16) -> Result<(), ErrorDetail> {
    let next = (processor.chip8x_background_color() + 1) & 0x3;
    processor.set_chip8x_background_color(next);
    Ok(())
}

fn op_5xy1_chip8x_add_sat(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let result = ((processor.v(x(opcode)) & 0x77) + (processor.v(y(opcode)) & 0x77)) & 0x77;
    processor.set_v(x(opcode), result);
    Ok(())
}

/// CHIP-8X's cell-based color overlay (`Bxy0`/`Bxyn`) addresses a separate per-cell color grid
/// the bit-plane video model here does not represent; logged and otherwise a no-op (see
/// DESIGN.md for the scope note).
fn op_bxyn_chip8x_overlay(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    log::trace!("chip8x color overlay opcode {:#06X} ignored (no overlay plane)", opcode);
    let _ = processor;
    Ok(())
}

fn op_exf2_chip8x(_processor: &mut Processor, _opcode: u16) -> Result<(), ErrorDetail> {
    Ok(())
}

fn op_exf5_chip8x(processor: &mut Processor, _opcode: u16) -> Result<(), ErrorDetail> {
    processor.advance_pc(2);
    Ok(())
}

fn op_fxf8_chip8x_vp595(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let value = processor.v(x(opcode));
    processor.set_vp595_frequency(if value == 0 { 0x80 } else { value });
    Ok(())
}

fn op_fxfb_chip8x(_processor: &mut Processor, _opcode: u16) -> Result<(), ErrorDetail> {
    Ok(())
}

// --- MEGACHIP additions ---

fn op_0010_megachip_leave(processor: &mut Processor, _opcode: u16) -> Result<(), ErrorDetail> {
    processor.video_mut().leave_megachip_mode();
    processor.host_mut().pre_clear();
    Ok(())
}

fn op_0011_megachip_enter(processor: &mut Processor, _opcode: u16) -> Result<(), ErrorDetail> {
    processor.video_mut().enter_megachip_mode();
    processor.host_mut().pre_clear();
    Ok(())
}

fn op_00e0_megachip_swap(processor: &mut Processor, _opcode: u16) -> Result<(), ErrorDetail> {
    processor.host_mut().pre_clear();
    processor.video_mut().mc_swap();
    processor.host_mut().update_screen();
    processor.video_mut().mc_clear();
    Ok(())
}

fn op_01nn_megachip_load_i_wide(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let hi = (opcode & 0xFF) as u32;
    let lo = processor.memory().read_two_bytes(processor.pc() as usize)? as u32;
    processor.set_i((hi << 16) | lo);
    processor.advance_pc(2);
    Ok(())
}

fn op_02nn_megachip_palette(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let count = nn(opcode) as usize;
    let i = processor.i() as usize;
    let mut colors: Vec<u32> = Vec::with_capacity(count);
    for idx in 0..count {
        let base = i + idx * 4;
        let a = processor.memory().read_byte(base)?;
        let r = processor.memory().read_byte(base + 1)?;
        let g = processor.memory().read_byte(base + 2)?;
        let b = processor.memory().read_byte(base + 3)?;
        let color = u32::from_be_bytes([r, g, b, a]);
        processor.mc_palette_mut()[idx + 1] = color;
        colors.push(color);
    }
    processor.host_mut().update_palette_range(&colors, 1);
    Ok(())
}

fn op_03nn_megachip_sprite_width(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let width = nn(opcode);
    let width = if width == 0 { 256 } else { width as u16 };
    processor.set_sprite_dimensions(width, processor.sprite_dimensions().1);
    Ok(())
}

fn op_04nn_megachip_sprite_height(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let height = nn(opcode);
    let height = if height == 0 { 256 } else { height as u16 };
    processor.set_sprite_dimensions(processor.sprite_dimensions().0, height);
    Ok(())
}

fn op_05nn_megachip_screen_alpha(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    processor.set_screen_alpha(nn(opcode));
    Ok(())
}

fn op_060n_megachip_play_sample(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let i = processor.i() as usize;
    let frequency = processor.memory().read_two_bytes(i)? as f64;
    let b2 = processor.memory().read_byte(i + 2)? as u32;
    let b3 = processor.memory().read_byte(i + 3)? as u32;
    let b4 = processor.memory().read_byte(i + 4)? as u32;
    let length = (b2 << 16) | (b3 << 8) | b4;
    let looped = n(opcode) == 0;
    processor.set_sample_descriptor((i + 6) as u32, frequency / 44_100.0, length, looped);
    Ok(())
}

fn op_0700_megachip_stop_sample(processor: &mut Processor, _opcode: u16) -> Result<(), ErrorDetail> {
    processor.set_sample_descriptor(0, 0.0, 0, false);
    Ok(())
}

fn op_080n_megachip_blend_mode(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let mode = match n(opcode) {
        0 => BlendMode::Normal,
        1 => BlendMode::Alpha25,
        2 => BlendMode::Alpha50,
        3 => BlendMode::Alpha75,
        4 => BlendMode::Add,
        5 => BlendMode::Mul,
        _ => BlendMode::Normal,
    };
    processor.set_blend_mode(mode);
    Ok(())
}

fn op_09nn_megachip_collision_color(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    processor.set_collision_color(nn(opcode));
    Ok(())
}

/// MEGACHIP's `Dxyn`: a normal bi-level sprite draw while `I < 0x100` (matching the common
/// handler's hires behavior), otherwise an indexed-bitmap blitter sized by the `spriteWidth`/
/// `spriteHeight` registers and composited via the active blend mode.
fn op_dxyn_draw_megachip(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    if !processor.video().is_megachip_mode {
        return op_dxyn_draw(processor, opcode);
    }
    let vx = processor.v(x(opcode)) as usize;
    let vy = processor.v(y(opcode)) as usize;
    processor.set_v(0xF, 0);
    if processor.i() < 0x100 {
        let rows = n(opcode) as usize;
        let i = processor.i() as usize;
        let mut sprite_rows: Vec<u16> = Vec::with_capacity(rows);
        for row in 0..rows {
            let byte = processor.memory().read_byte(i + row)? as u16;
            sprite_rows.push(byte << 8);
        }
        let (erased, _) = processor
            .video_mut()
            .draw_sprite(vx, vy, &sprite_rows, 8, 0x1, QuirkFlags::empty());
        if erased > 0 {
            processor.set_v(0xF, 1);
        }
        return Ok(());
    }
    let (width, height) = processor.sprite_dimensions();
    let (width, height) = (width as usize, height as usize);
    let i = processor.i() as usize;
    let indices = processor.memory().read_bytes(i, width * height)?.to_vec();
    let palette = *processor.mc_palette_mut();
    let blend_mode = processor.blend_mode();
    let collision_color = processor.collision_color();
    let collided = processor
        .video_mut()
        .mc_draw_bitmap(vx, vy, width, height, &indices, &palette, blend_mode, collision_color);
    if collided {
        processor.set_v(0xF, 1);
    }
    Ok(())
}

// --- XO-CHIP additions ---

fn op_00cn_scroll_down_masked(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let amount = scroll_amount(processor, n(opcode) as usize);
    processor.video_mut().scroll_down(amount, processor.planes());
    Ok(())
}

fn op_00dn_scroll_up_masked(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let amount = scroll_amount(processor, n(opcode) as usize);
    processor.video_mut().scroll_up(amount, processor.planes());
    Ok(())
}

fn op_00fb_scroll_right_masked(processor: &mut Processor, _opcode: u16) -> Result<(), ErrorDetail> {
    let amount = scroll_amount(processor, 4);
    processor.video_mut().scroll_right(amount, processor.planes());
    Ok(())
}

fn op_00fc_scroll_left_masked(processor: &mut Processor, _opcode: u16) -> Result<(), ErrorDetail> {
    let amount = scroll_amount(processor, 4);
    processor.video_mut().scroll_left(amount, processor.planes());
    Ok(())
}

fn op_5xy2_xochip_range_save(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let (rx, ry) = (x(opcode), y(opcode));
    let i = processor.i() as usize;
    let len = (rx as i16 - ry as i16).unsigned_abs() as u8;
    for offset in 0..=len {
        let reg = if rx < ry { rx + offset } else { rx - offset };
        let value = processor.v(reg);
        processor.memory_mut().write_byte(i + offset as usize, value)?;
    }
    Ok(())
}

fn op_5xy3_xochip_range_load(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    let (rx, ry) = (x(opcode), y(opcode));
    let i = processor.i() as usize;
    let len = (rx as i16 - ry as i16).unsigned_abs() as u8;
    for offset in 0..=len {
        let reg = if rx < ry { rx + offset } else { rx - offset };
        let value = processor.memory().read_byte(i + offset as usize)?;
        processor.set_v(reg, value);
    }
    Ok(())
}

fn op_f000_load_i_wide(processor: &mut Processor, _opcode: u16) -> Result<(), ErrorDetail> {
    let wide = processor.memory().read_two_bytes(processor.pc() as usize)?;
    processor.set_i(wide as u32);
    processor.advance_pc(2);
    Ok(())
}

fn op_fx01_select_planes(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    processor.set_planes(x(opcode));
    Ok(())
}

fn op_f002_store_audio_pattern(processor: &mut Processor, _opcode: u16) -> Result<(), ErrorDetail> {
    let i = processor.i() as usize;
    let bytes = processor.memory().read_bytes(i, 16)?.to_vec();
    let pattern = processor.xo_audio_pattern_mut();
    pattern.copy_from_slice(&bytes);
    Ok(())
}

fn op_fx3a_set_pitch(processor: &mut Processor, opcode: u16) -> Result<(), ErrorDetail> {
    processor.set_xo_pitch(processor.v(x(opcode)));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::HeadlessHost;
    use crate::processor::Processor;
    use crate::program::Program;
    use crate::variants::preset;

    fn processor_for(variant: Variant, program_bytes: Vec<u8>) -> Processor {
        let properties = preset(variant);
        let program = Program::new(program_bytes);
        let mut processor = Processor::initialise_and_load(program, properties).unwrap();
        processor.set_host(Box::new(HeadlessHost));
        processor
    }

    #[test]
    fn test_6xnn_then_7xnn_accumulates() {
        let mut processor = processor_for(Variant::Chip8, vec![0x60, 0x05, 0x70, 0x03]);
        processor.execute_instruction().unwrap();
        processor.execute_instruction().unwrap();
        assert_eq!(processor.v(0), 8);
    }

    #[test]
    fn test_3xnn_skips_when_equal() {
        let mut processor = processor_for(Variant::Chip8, vec![0x60, 0x05, 0x30, 0x05, 0x00, 0x00, 0x60, 0x09]);
        processor.execute_instruction().unwrap();
        let pc_before = processor.pc();
        processor.execute_instruction().unwrap();
        assert_eq!(processor.pc(), pc_before + 4);
    }

    #[test]
    fn test_8xy4_sets_carry_on_overflow() {
        let mut processor = processor_for(Variant::Chip8, vec![0x60, 0xFF, 0x61, 0x02, 0x80, 0x14]);
        processor.execute_instruction().unwrap();
        processor.execute_instruction().unwrap();
        processor.execute_instruction().unwrap();
        assert_eq!(processor.v(0), 1);
        assert_eq!(processor.v(0xF), 1);
    }

    #[test]
    fn test_annn_sets_index_register() {
        let mut processor = processor_for(Variant::Chip8, vec![0xA2, 0x34]);
        processor.execute_instruction().unwrap();
        assert_eq!(processor.i(), 0x234);
    }

    #[test]
    fn test_00e0_clears_screen() {
        let mut processor = processor_for(Variant::Chip8, vec![0x00, 0xE0]);
        processor.execute_instruction().unwrap();
        assert!(processor.video().plane(0).iter().all(|&p| p == 0));
    }

    #[test]
    fn test_2nnn_then_00ee_returns() {
        let mut processor = processor_for(Variant::Chip8, vec![0x22, 0x06, 0x00, 0x00, 0x00, 0x00, 0x00, 0xEE]);
        processor.execute_instruction().unwrap();
        assert_eq!(processor.pc(), 0x206);
        processor.execute_instruction().unwrap();
        assert_eq!(processor.pc(), 0x202);
    }

    #[test]
    fn test_8xy6_shift_vx_only_quirk() {
        let mut properties = preset(Variant::SChip11);
        properties.quirks.insert(QuirkFlags::SHIFT_VX_ONLY);
        let program = Program::new(vec![0x60, 0x03, 0x80, 0x16]);
        let mut processor = Processor::initialise_and_load(program, properties).unwrap();
        processor.set_host(Box::new(HeadlessHost));
        processor.execute_instruction().unwrap();
        processor.execute_instruction().unwrap();
        assert_eq!(processor.v(0), 1);
        assert_eq!(processor.v(0xF), 1);
    }

    #[test]
    fn test_fx33_writes_bcd_digits() {
        let mut processor = processor_for(Variant::Chip8, vec![0x60, 0x7B, 0xA3, 0x00, 0xF0, 0x33]);
        processor.execute_instruction().unwrap();
        processor.execute_instruction().unwrap();
        processor.execute_instruction().unwrap();
        assert_eq!(processor.memory().read_byte(0x300).unwrap(), 1);
        assert_eq!(processor.memory().read_byte(0x301).unwrap(), 2);
        assert_eq!(processor.memory().read_byte(0x302).unwrap(), 3);
    }

    #[test]
    fn test_fx0a_blocks_until_key_pressed() {
        let mut processor = processor_for(Variant::Chip8, vec![0xF0, 0x0A]);
        let pc_before = processor.pc();
        processor.execute_instruction().unwrap();
        assert_eq!(processor.pc(), pc_before);
    }

    #[test]
    fn test_00fd_halts_cleanly_without_error() {
        let mut processor = processor_for(Variant::SChip11, vec![0x00, 0xFD]);
        processor.execute_instruction().unwrap();
        assert_eq!(processor.exec_mode(), crate::processor::ExecMode::Paused);
        assert_eq!(processor.cpu_state(), crate::processor::CpuState::Normal);
    }

    #[test]
    fn test_00ff_enters_hires_mode() {
        let mut processor = processor_for(Variant::SChip11, vec![0x00, 0xFF]);
        processor.execute_instruction().unwrap();
        assert!(processor.video().is_hires());
    }

    #[test]
    fn test_unknown_opcode_errors() {
        let mut processor = processor_for(Variant::Chip8, vec![0x50, 0x01]);
        assert!(processor.execute_instruction().is_err());
        assert_eq!(processor.cpu_state(), crate::processor::CpuState::Error);
    }

    #[test]
    fn test_xochip_fx01_selects_planes() {
        let mut processor = processor_for(Variant::XoChip, vec![0xF3, 0x01]);
        processor.execute_instruction().unwrap();
        assert_eq!(processor.planes(), 0x3);
    }

    #[test]
    fn test_megachip_0011_enters_megachip_mode() {
        let mut processor = processor_for(Variant::MegaChip, vec![0x00, 0x11]);
        processor.execute_instruction().unwrap();
        assert!(processor.video().is_megachip_mode);
    }
}
