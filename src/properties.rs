use bitflags::bitflags;
use serde_derive::{Deserialize, Serialize};

bitflags! {
    /// The ~20 orthogonal behavioral flags ("quirks") that distinguish CHIP-8 dialects from one
    /// another, combinable except where the data model calls out mutual exclusion (the two
    /// `Fx55`/`Fx65` increment-policy flags, and the two lores-`Dxy0` width flags).
    ///
    /// Field names mirror the property identifiers used by the upstream project this crate's
    /// specification was distilled from (`just-Shift-Vx`, `dont-Reset-Vf`, `wrap-sprites`, …),
    /// so a saved configuration file's quirk bits stay meaningful to a human reading the JSON.
    #[derive(Serialize, Deserialize)]
    pub struct QuirkFlags: u32 {
        /// `8xy6`/`8xyE` operate on Vx in place and ignore Vy.
        const SHIFT_VX_ONLY = 1 << 0;
        /// `8xy1`/`8xy2`/`8xy3` do not clear VF after writing their result.
        const DONT_RESET_VF = 1 << 1;
        /// `Fx55`/`Fx65` increments I by X+1.
        const LOAD_STORE_INC_I_BY_X_PLUS_1 = 1 << 2;
        /// `Fx55`/`Fx65` increments I by X (mutually exclusive with the above).
        const LOAD_STORE_INC_I_BY_X = 1 << 3;
        /// `Dxyn` wraps sprite pixels at screen edges instead of clipping.
        const WRAP_SPRITES = 1 << 4;
        /// `Dxyn` executes instantly rather than waiting for the next vblank.
        const INSTANT_DXYN = 1 << 5;
        /// Lores `Dxy0` draws an 8x16 sprite.
        const LORES_DXY0_IS_8X16 = 1 << 6;
        /// Lores `Dxy0` draws a 16x16 sprite (mutually exclusive with the above).
        const LORES_DXY0_IS_16X16 = 1 << 7;
        /// `Dxyn` collision count follows SUPER-CHIP 1.1 semantics (rows-with-erase + clipped rows).
        const SCHIP11_COLLISION = 1 << 8;
        /// In lores mode, sprites draw at double scale into the hires buffer.
        const SCHIP_LORES_DRAWING = 1 << 9;
        /// `00Cn`/`00Fx` scroll opcodes move by half pixels in lores.
        const HALF_PIXEL_SCROLL = 1 << 10;
        /// `00FE`/`00FF` clear the screen on a resolution change.
        const MODE_CHANGE_CLEAR = 1 << 11;
        /// `Bxnn` jumps to `Vx + nnn` instead of `V0 + nnn`.
        const JUMP0_BXNN = 1 << 12;
        /// 128x64 hires mode is reachable via `00FF`.
        const ALLOW_HIRES = 1 << 13;
        /// The variant only ever runs in 128x64 hires mode.
        const ONLY_HIRES = 1 << 14;
        /// Multiple bit-planes (XO-CHIP) are selectable via the plane mask.
        const ALLOW_COLORS = 1 << 15;
        /// Stack pointer overflow/underflow wraps modulo the stack depth instead of erroring.
        const CYCLIC_STACK = 1 << 16;
        /// The index register and addresses are 16 bits wide rather than 12.
        const HAS_16BIT_ADDR = 1 << 17;
        /// The XO-CHIP sound engine (`F000`/`Fx3A`/`F002`) is enabled.
        const XO_CHIP_SOUND = 1 << 18;
        /// Dxyn display-wait is emulated with cycle-accurate timing rather than a flat deferral.
        const EXTENDED_VBLANK = 1 << 19;
        /// PAL timing: 48 scanlines instead of 32 in lores.
        const PAL_VIDEO = 1 << 20;
        /// Skipping a two-word instruction (`F000`/`01nn`) advances PC by 4 instead of 2.
        const LONG_SKIP = 1 << 21;
    }
}

/// The amount of addressable RAM for the active variant, in bytes. The closed combo from §4.1;
/// every value is a power of two so `size_bytes() - 1` is always a valid address mask.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemorySize {
    Bytes2K,
    Bytes4K,
    Bytes8K,
    Bytes16K,
    Bytes32K,
    Bytes64K,
    Bytes16M,
}

impl MemorySize {
    pub fn size_bytes(&self) -> usize {
        match self {
            MemorySize::Bytes2K => 2048,
            MemorySize::Bytes4K => 4096,
            MemorySize::Bytes8K => 8192,
            MemorySize::Bytes16K => 16384,
            MemorySize::Bytes32K => 32768,
            MemorySize::Bytes64K => 65536,
            MemorySize::Bytes16M => 16_777_216,
        }
    }
}

/// Presentation-only screen rotation, consumed by a host's renderer and never by the core
/// itself (the core always draws into an unrotated coordinate space).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScreenRotation {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

/// The closed registry of base CHIP-8 dialects (`Behavior Base` combo, §4.1).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Variant {
    Chip8,
    Chip10,
    Chip8E,
    Chip8X,
    Chip48,
    SChip10,
    SChip11,
    SChipC,
    SChipModern,
    MegaChip,
    XoChip,
}

impl Variant {
    /// All eleven presets, in the order the upstream combo enumerates them.
    pub const ALL: [Variant; 11] = [
        Variant::Chip8,
        Variant::Chip10,
        Variant::Chip8E,
        Variant::Chip8X,
        Variant::Chip48,
        Variant::SChip10,
        Variant::SChip11,
        Variant::SChipC,
        Variant::SChipModern,
        Variant::MegaChip,
        Variant::XoChip,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Variant::Chip8 => "CHIP-8",
            Variant::Chip10 => "CHIP-10",
            Variant::Chip8E => "CHIP-8E",
            Variant::Chip8X => "CHIP-8X",
            Variant::Chip48 => "CHIP-48",
            Variant::SChip10 => "SCHIP-1.0",
            Variant::SChip11 => "SCHIP-1.1",
            Variant::SChipC => "SCHIPC",
            Variant::SChipModern => "SCHIP-MODERN",
            Variant::MegaChip => "MEGACHIP",
            Variant::XoChip => "XO-CHIP",
        }
    }
}

/// Declarative configuration for a single [Processor](crate::processor::Processor) instance: an
/// ordered set of named, typed options plus a 16-entry palette. Two `Properties` instances
/// compare equal iff every option and the palette match (the derived [PartialEq] does exactly
/// this since every field participates).
///
/// Instances are produced from [crate::variants::preset] and may be further adjusted by an
/// embedder before passing to [Processor::new](crate::processor::Processor::new); they are
/// copied in at construction and are otherwise immutable except via
/// [Processor::update_properties](crate::processor::Processor::update_properties), called
/// between frames.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Properties {
    pub behavior_base: Variant,
    /// 0 means "run until the frame's cycle budget elapses"; otherwise a fixed cycle budget.
    pub instructions_per_frame: u32,
    /// Timer tick frequency in Hz (50..100).
    pub frame_rate: u32,
    pub memory: MemorySize,
    /// Initial PC (0x200 typical; 0x300 for CHIP-8X; always 0x200 when a TPD-prefixed ROM loads).
    pub start_address: u16,
    /// If true, zero RAM on reset; if false, fill with a deterministic-seeded pseudorandom pattern.
    pub clean_ram: bool,
    pub quirks: QuirkFlags,
    pub screen_rotation: ScreenRotation,
    pub touch_input_mode: String,
    pub font_5px: String,
    pub font_10px: String,
    /// The 16-entry CHIP-8/XO-CHIP presentation palette (RGBA8888, one u32 per color).
    pub palette: [u32; 16],
    /// Whether trace-level per-instruction logging is emitted (`PROP_TRACE_LOG` upstream).
    pub trace_log: bool,
}

impl Properties {
    pub fn address_mask(&self) -> usize {
        self.memory.size_bytes() - 1
    }

    pub fn index_register_mask(&self) -> u32 {
        if self.behavior_base == Variant::MegaChip {
            0x00FF_FFFF
        } else if self.quirks.contains(QuirkFlags::HAS_16BIT_ADDR) {
            0xFFFF
        } else {
            self.address_mask() as u32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_size_is_power_of_two() {
        for size in [
            MemorySize::Bytes2K,
            MemorySize::Bytes4K,
            MemorySize::Bytes8K,
            MemorySize::Bytes16K,
            MemorySize::Bytes32K,
            MemorySize::Bytes64K,
            MemorySize::Bytes16M,
        ] {
            assert!(size.size_bytes().is_power_of_two());
        }
    }

    #[test]
    fn test_quirk_flags_combine() {
        let quirks = QuirkFlags::SHIFT_VX_ONLY | QuirkFlags::WRAP_SPRITES;
        assert!(quirks.contains(QuirkFlags::SHIFT_VX_ONLY));
        assert!(quirks.contains(QuirkFlags::WRAP_SPRITES));
        assert!(!quirks.contains(QuirkFlags::DONT_RESET_VF));
    }

    #[test]
    fn test_properties_equality() {
        let a = crate::variants::preset(Variant::Chip8);
        let b = crate::variants::preset(Variant::Chip8);
        assert_eq!(a, b);
    }

    #[test]
    fn test_properties_inequality_on_quirk_difference() {
        let a = crate::variants::preset(Variant::Chip8);
        let mut b = crate::variants::preset(Variant::Chip8);
        b.quirks.remove(QuirkFlags::WRAP_SPRITES);
        b.quirks.insert(QuirkFlags::DONT_RESET_VF);
        assert_ne!(a, b);
    }
}
