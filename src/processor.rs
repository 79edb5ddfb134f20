#![allow(non_snake_case)]

use crate::audio::{render_audio, AudioState, MegaChipSample};
use crate::clock::ClockedTime;
use crate::error::{CadmiumError, ErrorDetail, ErrorStateSnapshot};
use crate::font::Font;
use crate::host::{Host, HeadlessHost};
use crate::keystate::KeyState;
use crate::memory::Memory;
use crate::program::Program;
use crate::properties::{Properties, QuirkFlags, Variant};
use crate::stack::Stack;
use crate::video::{BlendMode, Video};
use log::{debug, trace, warn};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU8, Ordering};

pub mod dispatch;

/// The default CHIP-8 font start address within memory (§6: "0 .. (5·16−1)").
const DEFAULT_FONT_ADDRESS: usize = 0x0;
const BIG_FONT_ADDRESS: usize = 0x50;
const VARIABLE_REGISTER_COUNT: usize = 16;

/// The core's fetch/decode/execute/pause state machine (§4.2.2 / §3).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExecMode {
    Running,
    Paused,
    Step,
    StepOver,
    StepOut,
}

/// Whether the core is executing normally, blocked in a `Fx0A`/CHIP-8E `Fx4F`/`0151` wait, or
/// has transitioned to a terminal error state (§3, §7).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CpuState {
    Normal,
    Wait,
    Error,
}

/// A breakpoint: an address plus an optional condition gating whether it actually pauses
/// execution when hit, checked after PC has advanced to the next instruction (§5).
#[derive(Clone, Debug, PartialEq)]
pub struct Breakpoint {
    pub address: u16,
    pub condition: Option<BreakpointCondition>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum BreakpointCondition {
    RegisterEquals { register: u8, value: u8 },
}

impl Breakpoint {
    fn matches(&self, variable_registers: &[u8; VARIABLE_REGISTER_COUNT]) -> bool {
        match &self.condition {
            None => true,
            Some(BreakpointCondition::RegisterEquals { register, value }) => {
                variable_registers[*register as usize] == *value
            }
        }
    }
}

impl std::hash::Hash for Breakpoint {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.address.hash(state);
    }
}
impl Eq for Breakpoint {}

/// Verbosity of a requested [StateSnapshot].
pub enum StateSnapshotVerbosity {
    Minimal,
    Extended,
}

/// A copy of Cadmium's state returned to a hosting application for inspection or rendering.
pub enum StateSnapshot {
    MinimalSnapshot {
        video: Video,
    },
    ExtendedSnapshot {
        video: Video,
        stack: Stack,
        memory: Memory,
        program_counter: u16,
        index_register: u32,
        variable_registers: [u8; VARIABLE_REGISTER_COUNT],
        delay_timer: u8,
        sound_timer: u8,
        cycles: u64,
    },
}

type Handler = fn(&mut Processor, u16) -> Result<(), ErrorDetail>;

/// The core CHIP-8/SUPER-CHIP/MEGACHIP/XO-CHIP interpreter, and the primary public interface
/// of this crate.
///
/// A `Processor` owns every sub-component (memory, stack, registers, video, audio phase state,
/// keypad state) and exposes the scheduler surface (`execute_for`/`execute_frame`/
/// `execute_instruction`), the host callback surface, and read-only state export.
pub struct Processor {
    // CORE STATE (§3)
    video: Video,
    stack: Stack,
    memory: Memory,
    program_counter: u16,
    index_register: u32,
    variable_registers: [u8; VARIABLE_REGISTER_COUNT],
    delay_timer: u8,
    sound_timer: AtomicU8,
    planes: u8,
    rpl_flags: [u8; 16],
    xo_audio_pattern: [u8; 16],
    xo_pitch: u8,
    mc_palette: [u32; 256],
    sprite_width: u16,
    sprite_height: u16,
    screen_alpha: u8,
    collision_color: u8,
    blend_mode: BlendMode,
    sample_start: u32,
    sample_step: f64,
    sample_length: u32,
    sample_loop: bool,
    vp595_frequency: u8,
    chip8x_background_color: u8,
    clock: ClockedTime,
    exec_mode: ExecMode,
    cpu_state: CpuState,
    error_message: Option<String>,
    step_over_target_sp: usize,
    // BOOKKEEPING
    keystate: KeyState,
    audio_state: AudioState,
    host: Box<dyn Host>,
    breakpoints: HashSet<Breakpoint>,
    handler_table: Vec<Handler>,
    // CONFIG/SETUP
    font: Font,
    program: Program,
    font_start_address: usize,
    big_font_start_address: usize,
    big_font_char_size: usize,
    program_start_address: usize,
    properties: Properties,
}

impl Processor {
    /// Constructs a freshly-initialised `Processor` with the supplied program loaded into
    /// memory and ready for execution, using `properties` to configure the active variant.
    pub fn initialise_and_load(program: Program, properties: Properties) -> Result<Self, CadmiumError> {
        let memory = Memory::new(properties.memory.size_bytes(), !properties.clean_ram);
        let stack_cyclic = properties.quirks.contains(QuirkFlags::CYCLIC_STACK);
        let font = Font::for_5px(&properties.font_5px);
        let big_font = Font::for_10px(&properties.font_10px);
        let start_address = program.resolve_start_address(properties.start_address);
        let mut processor = Processor {
            video: Video::new(properties.quirks.contains(QuirkFlags::PAL_VIDEO)),
            stack: Stack::new(16, stack_cyclic),
            memory,
            program_counter: start_address,
            index_register: 0,
            variable_registers: [0; VARIABLE_REGISTER_COUNT],
            delay_timer: 0,
            sound_timer: AtomicU8::new(0),
            planes: 0x1,
            rpl_flags: [0; 16],
            xo_audio_pattern: [0; 16],
            xo_pitch: 64,
            mc_palette: [0; 256],
            sprite_width: 0,
            sprite_height: 0,
            screen_alpha: 0xFF,
            collision_color: 0,
            blend_mode: BlendMode::Normal,
            sample_start: 0,
            sample_step: 0.0,
            sample_length: 0,
            sample_loop: false,
            vp595_frequency: 0,
            chip8x_background_color: 0,
            clock: ClockedTime::new(),
            exec_mode: ExecMode::Running,
            cpu_state: CpuState::Normal,
            error_message: None,
            step_over_target_sp: 0,
            keystate: KeyState::new(),
            audio_state: AudioState::new(),
            host: Box::new(HeadlessHost),
            breakpoints: HashSet::new(),
            handler_table: dispatch::build_handler_table(&properties),
            font,
            program,
            font_start_address: DEFAULT_FONT_ADDRESS,
            big_font_start_address: BIG_FONT_ADDRESS,
            big_font_char_size: big_font.char_size(),
            program_start_address: start_address as usize,
            properties,
        };
        processor.load_font_data(&big_font)?;
        processor.load_program()?;
        Ok(processor)
    }

    /// Installs a new host implementation (keyboard/video/audio callback target).
    pub fn set_host(&mut self, host: Box<dyn Host>) {
        self.host = host;
    }

    fn wrap_error(&self, inner_error: ErrorDetail) -> CadmiumError {
        CadmiumError {
            state_snapshot_dump: ErrorStateSnapshot {
                program_counter: self.program_counter,
                index_register: self.index_register,
                variable_registers: self.variable_registers,
                stack_pointer: self.stack.pointer,
                cycles: self.clock.cycles(),
                exec_mode: self.exec_mode,
                cpu_state: self.cpu_state,
            },
            inner_error,
        }
    }

    fn load_font_data(&mut self, big_font: &Font) -> Result<(), CadmiumError> {
        self.memory
            .write_bytes(self.font_start_address, self.font.font_data())
            .map_err(|e| self.wrap_error(e))?;
        self.memory
            .write_bytes(self.big_font_start_address, big_font.font_data())
            .map_err(|e| self.wrap_error(e))?;
        Ok(())
    }

    fn load_program(&mut self) -> Result<(), CadmiumError> {
        self.memory
            .write_bytes(self.program_start_address, self.program.program_data())
            .map_err(|e| self.wrap_error(e))
    }

    /// Re-applies a (possibly adjusted) `Properties` between frames, rebuilding the handler
    /// table; per the data model's ownership note, this is the only way `Properties` may change
    /// once a `Processor` is constructed.
    pub fn update_properties(&mut self, properties: Properties) {
        self.handler_table = dispatch::build_handler_table(&properties);
        self.properties = properties;
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn exec_mode(&self) -> ExecMode {
        self.exec_mode
    }

    /// Pauses execution; safe to call at any time (§5).
    pub fn pause(&mut self) {
        self.exec_mode = ExecMode::Paused;
    }

    /// Resumes normal execution from a paused/stepped state.
    pub fn resume(&mut self) {
        self.exec_mode = ExecMode::Running;
    }

    /// Arms a single-instruction step: the next `execute_instruction` pauses once it completes.
    pub fn step(&mut self) {
        self.exec_mode = ExecMode::Step;
    }

    /// Arms a step-over: execution runs until control returns to at or above the current stack
    /// depth, so a stepped-over `call` runs to completion without pausing inside it.
    pub fn step_over(&mut self) {
        self.step_over_target_sp = self.stack.pointer;
        self.exec_mode = ExecMode::StepOver;
    }

    /// Arms a step-out: execution runs until the current subroutine returns (`00EE`).
    pub fn step_out(&mut self) {
        self.exec_mode = ExecMode::StepOut;
    }

    pub fn cpu_state(&self) -> CpuState {
        self.cpu_state
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn set_breakpoint(&mut self, address: u16, condition: Option<BreakpointCondition>) {
        self.breakpoints.insert(Breakpoint { address, condition });
    }

    pub fn clear_breakpoint(&mut self, address: u16) {
        self.breakpoints.retain(|b| b.address != address);
    }

    pub fn frames(&self) -> u64 {
        self.clock.frames()
    }

    pub fn cycles(&self) -> u64 {
        self.clock.cycles()
    }

    pub fn sound_timer_active(&self) -> bool {
        self.sound_timer.load(Ordering::Relaxed) > 0
    }

    /// Provides key press input, setting the state of `key` to pressed/not pressed.
    pub fn set_key_status(&mut self, key: u8, status: bool) -> Result<(), ErrorDetail> {
        self.keystate.set_key_status(key, status)
    }

    /// Returns a copy of the current state of Cadmium.
    pub fn export_state_snapshot(&self, verbosity: StateSnapshotVerbosity) -> StateSnapshot {
        match verbosity {
            StateSnapshotVerbosity::Minimal => StateSnapshot::MinimalSnapshot {
                video: self.video.clone(),
            },
            StateSnapshotVerbosity::Extended => StateSnapshot::ExtendedSnapshot {
                video: self.video.clone(),
                stack: self.stack.clone(),
                memory: self.memory.clone(),
                program_counter: self.program_counter,
                index_register: self.index_register,
                variable_registers: self.variable_registers,
                delay_timer: self.delay_timer,
                sound_timer: self.sound_timer.load(Ordering::Relaxed),
                cycles: self.clock.cycles(),
            },
        }
    }

    /// Synthesizes `frame_count` audio samples at `sample_rate` reflecting the current sound
    /// engine state. Safe to call from a separate audio-device thread per the concurrency model
    /// (§5): it only reads the atomically-shared sound timer and a snapshot of the pattern/pitch
    /// fields, plus the MEGACHIP sample cursor owned by `audio_state`.
    pub fn render_audio(&mut self, samples: &mut [i16], sample_rate: u32) {
        let megachip_sample = if self.properties.behavior_base == Variant::MegaChip && self.sample_length > 0 {
            let data = self
                .memory
                .read_bytes(self.sample_start as usize, self.sample_length as usize)
                .map(|slice| slice.to_vec())
                .unwrap_or_default();
            Some(MegaChipSample {
                data,
                step: self.sample_step,
                looped: self.sample_loop,
            })
        } else {
            None
        };
        render_audio(
            samples,
            sample_rate,
            self.sound_timer_active(),
            self.properties.behavior_base,
            self.properties.quirks,
            Some(&self.xo_audio_pattern),
            self.xo_pitch,
            self.vp595_frequency,
            megachip_sample,
            &mut self.audio_state,
        );
    }

    /// The step primitive: fetches, decodes, and dispatches exactly one instruction, honoring
    /// breakpoints and (when `properties.trace_log` is set) emitting one trace line per
    /// instruction via the `log` crate.
    pub fn execute_instruction(&mut self) -> Result<(), CadmiumError> {
        if self.cpu_state == CpuState::Error {
            return Err(self.wrap_error(ErrorDetail::UnknownError));
        }
        let opcode = match self.memory.read_two_bytes(self.program_counter as usize) {
            Ok(opcode) => opcode,
            Err(e) => {
                self.cpu_state = CpuState::Error;
                self.exec_mode = ExecMode::Paused;
                self.error_message = Some(e.to_string());
                return Err(self.wrap_error(e));
            }
        };
        let previous_pc = self.program_counter;
        self.advance_pc(2);
        self.clock.tick_cycle();
        if self.properties.trace_log {
            trace!(
                "cycle {} pc {:#06X} opcode {:#06X}",
                self.clock.cycles(),
                previous_pc,
                opcode
            );
        }
        let handler = self.handler_table[opcode as usize];
        if let Err(e) = handler(self, opcode) {
            self.cpu_state = CpuState::Error;
            self.exec_mode = ExecMode::Paused;
            self.error_message = Some(e.to_string());
            return Err(self.wrap_error(e));
        }
        // Jump-to-self detection (§4.2.1): a 1nnn whose target equals PC-2 is a clean halt idiom.
        if self.program_counter == previous_pc {
            self.exec_mode = ExecMode::Paused;
        }
        match self.exec_mode {
            ExecMode::Step => self.exec_mode = ExecMode::Paused,
            ExecMode::StepOver if self.stack.pointer <= self.step_over_target_sp => {
                self.exec_mode = ExecMode::Paused;
            }
            _ => {}
        }
        if self
            .breakpoints
            .iter()
            .any(|b| b.address == self.program_counter && b.matches(&self.variable_registers))
        {
            self.exec_mode = ExecMode::Paused;
            debug!("breakpoint hit at {:#06X}", self.program_counter);
        }
        Ok(())
    }

    /// Decrements DT/ST and advances the frame counter; called once per frame boundary (§5).
    fn handle_timer(&mut self) {
        if self.delay_timer > 0 {
            self.delay_timer -= 1;
        }
        let st = self.sound_timer.load(Ordering::Relaxed);
        if st > 0 {
            self.sound_timer.store(st - 1, Ordering::Relaxed);
        }
        self.clock.tick_frame();
        self.host.vblank();
    }

    /// Runs one frame's worth of cycles (the `Instructions per frame` budget, or the configured
    /// default of 11 when unset) followed by one timer tick.
    pub fn execute_frame(&mut self) -> Result<(), CadmiumError> {
        let runnable = matches!(
            self.exec_mode,
            ExecMode::Running | ExecMode::Step | ExecMode::StepOver | ExecMode::StepOut
        );
        if !runnable {
            return Ok(());
        }
        let ipf = if self.properties.instructions_per_frame == 0 {
            11
        } else {
            self.properties.instructions_per_frame
        };
        for _ in 0..ipf {
            if self.exec_mode == ExecMode::Paused {
                break;
            }
            self.execute_instruction()?;
        }
        self.handle_timer();
        Ok(())
    }

    /// Runs for approximately `micros` of wall-clock-equivalent time, in fixed-IPF mode
    /// executing in bursts bounded by frame boundaries. Returns the number of microseconds
    /// still owed (to be credited to the next call), possibly negative.
    pub fn execute_for(&mut self, micros: i64) -> Result<i64, CadmiumError> {
        let frame_rate = self.properties.frame_rate.max(1) as i64;
        let micros_per_frame = 1_000_000 / frame_rate;
        let mut remaining = micros;
        while remaining >= micros_per_frame {
            if self.exec_mode == ExecMode::Paused {
                return Ok(remaining);
            }
            self.execute_frame()?;
            remaining -= micros_per_frame;
        }
        Ok(remaining)
    }

    // Accessors used by the dispatch module; kept crate-private since the handler table lives
    // alongside the opcode implementations rather than duplicating this struct's fields there.
    pub(crate) fn v(&self, register: u8) -> u8 {
        self.variable_registers[register as usize]
    }
    pub(crate) fn set_v(&mut self, register: u8, value: u8) {
        self.variable_registers[register as usize] = value;
    }
    pub(crate) fn pc(&self) -> u16 {
        self.program_counter
    }
    pub(crate) fn set_pc(&mut self, value: u16) {
        self.program_counter = value & self.properties.address_mask() as u16;
    }
    pub(crate) fn advance_pc(&mut self, delta: u16) {
        self.program_counter =
            (self.program_counter.wrapping_add(delta)) & self.properties.address_mask() as u16;
    }
    pub(crate) fn i(&self) -> u32 {
        self.index_register
    }
    pub(crate) fn set_i(&mut self, value: u32) {
        self.index_register = value & self.properties.index_register_mask();
    }
    pub(crate) fn memory(&self) -> &Memory {
        &self.memory
    }
    pub(crate) fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }
    pub(crate) fn stack_mut(&mut self) -> &mut Stack {
        &mut self.stack
    }
    pub(crate) fn stack(&self) -> &Stack {
        &self.stack
    }
    pub(crate) fn video(&self) -> &Video {
        &self.video
    }
    pub(crate) fn video_mut(&mut self) -> &mut Video {
        &mut self.video
    }
    pub(crate) fn quirks(&self) -> QuirkFlags {
        self.properties.quirks
    }
    pub(crate) fn properties_ref(&self) -> &Properties {
        &self.properties
    }
    pub(crate) fn keystate(&self) -> &KeyState {
        &self.keystate
    }
    pub(crate) fn font_sprite_address(&self, digit: u8) -> usize {
        self.font_start_address + (digit as usize) * self.font.char_size()
    }
    pub(crate) fn big_font_sprite_address(&self, digit: u8) -> usize {
        self.big_font_start_address + (digit as usize) * self.big_font_char_size
    }
    pub(crate) fn set_delay_timer(&mut self, value: u8) {
        self.delay_timer = value;
    }
    pub(crate) fn delay_timer(&self) -> u8 {
        self.delay_timer
    }
    pub(crate) fn set_sound_timer(&mut self, value: u8) {
        self.sound_timer.store(value, Ordering::Relaxed);
    }
    pub(crate) fn host_mut(&mut self) -> &mut dyn Host {
        self.host.as_mut()
    }
    pub(crate) fn set_cpu_state(&mut self, state: CpuState) {
        self.cpu_state = state;
    }
    pub(crate) fn cpu_state_ref(&self) -> CpuState {
        self.cpu_state
    }
    pub(crate) fn set_planes(&mut self, planes: u8) {
        self.planes = planes & 0xF;
    }
    pub(crate) fn planes(&self) -> u8 {
        self.planes
    }
    pub(crate) fn rpl_flags_mut(&mut self) -> &mut [u8; 16] {
        &mut self.rpl_flags
    }
    pub(crate) fn xo_audio_pattern_mut(&mut self) -> &mut [u8; 16] {
        &mut self.xo_audio_pattern
    }
    pub(crate) fn set_xo_pitch(&mut self, pitch: u8) {
        self.xo_pitch = pitch;
    }
    pub(crate) fn mc_palette_mut(&mut self) -> &mut [u32; 256] {
        &mut self.mc_palette
    }
    pub(crate) fn set_sprite_dimensions(&mut self, width: u16, height: u16) {
        self.sprite_width = width;
        self.sprite_height = height;
    }
    pub(crate) fn sprite_dimensions(&self) -> (u16, u16) {
        (self.sprite_width, self.sprite_height)
    }
    pub(crate) fn set_blend_mode(&mut self, mode: BlendMode) {
        self.blend_mode = mode;
    }
    pub(crate) fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }
    pub(crate) fn set_collision_color(&mut self, color: u8) {
        self.collision_color = color;
    }
    pub(crate) fn collision_color(&self) -> u8 {
        self.collision_color
    }
    pub(crate) fn set_screen_alpha(&mut self, alpha: u8) {
        self.screen_alpha = alpha;
    }
    pub(crate) fn set_sample_descriptor(&mut self, start: u32, step: f64, length: u32, looped: bool) {
        self.sample_start = start;
        self.sample_step = step;
        self.sample_length = length;
        self.sample_loop = looped;
    }
    pub(crate) fn set_vp595_frequency(&mut self, freq: u8) {
        self.vp595_frequency = freq;
    }
    pub(crate) fn vp595_frequency(&self) -> u8 {
        self.vp595_frequency
    }
    pub(crate) fn set_chip8x_background_color(&mut self, color: u8) {
        self.chip8x_background_color = color & 0x3;
    }
    pub(crate) fn chip8x_background_color(&self) -> u8 {
        self.chip8x_background_color
    }
    pub(crate) fn warn_invalid_opcode(&self, opcode: u16) {
        warn!("INVALID OPCODE: {:#06X}", opcode);
    }
}

#[cfg(test)]
mod tests;
