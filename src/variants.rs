use crate::properties::{MemorySize, Properties, QuirkFlags, ScreenRotation, Variant};

/// The default XO-CHIP/CHIP-8 presentation palette: off, on, and two extra colors used once a
/// second bit-plane is enabled.
const DEFAULT_PALETTE: [u32; 16] = [
    0x000000FF, 0xFFFFFFFF, 0xAAAAAAFF, 0x555555FF, 0xFF0000FF, 0x00FF00FF, 0x0000FFFF, 0xFFFF00FF,
    0xFF00FFFF, 0x00FFFFFF, 0x808080FF, 0xC0C0C0FF, 0x400000FF, 0x004000FF, 0x000040FF, 0x404040FF,
];

fn base(behavior_base: Variant) -> Properties {
    Properties {
        behavior_base,
        instructions_per_frame: 11,
        frame_rate: 60,
        memory: MemorySize::Bytes4K,
        start_address: 0x200,
        clean_ram: false,
        quirks: QuirkFlags::empty(),
        screen_rotation: ScreenRotation::Deg0,
        touch_input_mode: "SWIPE".to_string(),
        font_5px: "DEFAULT".to_string(),
        font_10px: "DEFAULT".to_string(),
        palette: DEFAULT_PALETTE,
        trace_log: false,
    }
}

/// Returns a fully populated [Properties] instance for the given closed-registry preset. This
/// is the sole constructor of "known-good" `Properties`; every field a variant depends on is
/// set here rather than left to a caller-supplied default.
pub fn preset(variant: Variant) -> Properties {
    match variant {
        Variant::Chip8 => {
            let mut p = base(variant);
            p.quirks = QuirkFlags::LOAD_STORE_INC_I_BY_X_PLUS_1;
            p
        }
        Variant::Chip10 => {
            let mut p = base(variant);
            p.quirks = QuirkFlags::LOAD_STORE_INC_I_BY_X_PLUS_1 | QuirkFlags::PAL_VIDEO;
            p
        }
        Variant::Chip8E => {
            let mut p = base(variant);
            p.quirks = QuirkFlags::LOAD_STORE_INC_I_BY_X_PLUS_1;
            p
        }
        Variant::Chip8X => {
            let mut p = base(variant);
            p.start_address = 0x300;
            p.quirks = QuirkFlags::LOAD_STORE_INC_I_BY_X_PLUS_1;
            p
        }
        Variant::Chip48 => {
            let mut p = base(variant);
            p.instructions_per_frame = 15;
            p.quirks = QuirkFlags::SHIFT_VX_ONLY
                | QuirkFlags::JUMP0_BXNN
                | QuirkFlags::LOAD_STORE_INC_I_BY_X;
            p
        }
        Variant::SChip10 => {
            let mut p = base(variant);
            p.instructions_per_frame = 15;
            p.quirks = QuirkFlags::SHIFT_VX_ONLY
                | QuirkFlags::JUMP0_BXNN
                | QuirkFlags::ALLOW_HIRES
                | QuirkFlags::LORES_DXY0_IS_16X16;
            p
        }
        Variant::SChip11 => {
            let mut p = base(variant);
            p.instructions_per_frame = 30;
            p.quirks = QuirkFlags::SHIFT_VX_ONLY
                | QuirkFlags::JUMP0_BXNN
                | QuirkFlags::ALLOW_HIRES
                | QuirkFlags::SCHIP11_COLLISION
                | QuirkFlags::LORES_DXY0_IS_16X16
                | QuirkFlags::MODE_CHANGE_CLEAR;
            p
        }
        Variant::SChipC => {
            let mut p = base(variant);
            p.instructions_per_frame = 30;
            p.quirks = QuirkFlags::SHIFT_VX_ONLY
                | QuirkFlags::JUMP0_BXNN
                | QuirkFlags::ALLOW_HIRES
                | QuirkFlags::WRAP_SPRITES
                | QuirkFlags::LORES_DXY0_IS_16X16
                | QuirkFlags::MODE_CHANGE_CLEAR;
            p
        }
        Variant::SChipModern => {
            let mut p = base(variant);
            p.instructions_per_frame = 30;
            p.quirks = QuirkFlags::SHIFT_VX_ONLY
                | QuirkFlags::JUMP0_BXNN
                | QuirkFlags::ALLOW_HIRES
                | QuirkFlags::LORES_DXY0_IS_8X16
                | QuirkFlags::MODE_CHANGE_CLEAR;
            p
        }
        Variant::MegaChip => {
            let mut p = base(variant);
            p.frame_rate = 50;
            p.memory = MemorySize::Bytes16M;
            p.quirks = QuirkFlags::SHIFT_VX_ONLY
                | QuirkFlags::JUMP0_BXNN
                | QuirkFlags::ALLOW_HIRES
                | QuirkFlags::HAS_16BIT_ADDR
                | QuirkFlags::LONG_SKIP
                | QuirkFlags::MODE_CHANGE_CLEAR;
            p
        }
        Variant::XoChip => {
            let mut p = base(variant);
            p.memory = MemorySize::Bytes64K;
            p.quirks = QuirkFlags::SHIFT_VX_ONLY
                | QuirkFlags::JUMP0_BXNN
                | QuirkFlags::ALLOW_HIRES
                | QuirkFlags::ALLOW_COLORS
                | QuirkFlags::HAS_16BIT_ADDR
                | QuirkFlags::XO_CHIP_SOUND
                | QuirkFlags::LONG_SKIP
                | QuirkFlags::LOAD_STORE_INC_I_BY_X_PLUS_1;
            p
        }
    }
}

/// Returns the human-readable name and one-line description for a preset, as used by an
/// embedder's variant picker. The core itself never reads these; they exist purely as metadata.
pub fn description(variant: Variant) -> (&'static str, &'static str) {
    match variant {
        Variant::Chip8 => ("CHIP-8", "The original 1977 COSMAC VIP interpreter."),
        Variant::Chip10 => ("CHIP-10", "A CHIP-8 derivative for PAL-region COSMAC machines."),
        Variant::Chip8E => ("CHIP-8E", "An extended instruction set atop CHIP-8."),
        Variant::Chip8X => ("CHIP-8X", "A COSMAC VIP variant with color and VP-595 audio."),
        Variant::Chip48 => ("CHIP-48", "The HP48 calculator port."),
        Variant::SChip10 => ("SCHIP-1.0", "SUPER-CHIP 1.0 for the HP48."),
        Variant::SChip11 => ("SCHIP-1.1", "SUPER-CHIP 1.1, the most widely imitated dialect."),
        Variant::SChipC => ("SCHIPC", "SUPER-CHIP compatibility mode (wraps instead of clips)."),
        Variant::SChipModern => ("SCHIP-MODERN", "A modern reading of SUPER-CHIP semantics."),
        Variant::MegaChip => ("MEGACHIP", "Extended 256x192 paletted mode with PCM audio."),
        Variant::XoChip => ("XO-CHIP", "Octo's extended dialect with four-plane color and a programmable waveform."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_presets_produce_distinct_properties() {
        let mut seen = Vec::new();
        for variant in Variant::ALL {
            let props = preset(variant);
            assert!(!seen.contains(&props), "duplicate properties for {:?}", variant);
            seen.push(props);
        }
    }

    #[test]
    fn test_chip8x_start_address() {
        assert_eq!(preset(Variant::Chip8X).start_address, 0x300);
    }

    #[test]
    fn test_megachip_frame_rate() {
        assert_eq!(preset(Variant::MegaChip).frame_rate, 50);
    }

    #[test]
    fn test_schip11_uses_schip_collision_quirk() {
        assert!(preset(Variant::SChip11)
            .quirks
            .contains(QuirkFlags::SCHIP11_COLLISION));
    }

    #[test]
    fn test_xochip_has_multiplane_support() {
        assert!(preset(Variant::XoChip).quirks.contains(QuirkFlags::ALLOW_COLORS));
    }
}
