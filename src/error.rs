use crate::processor::{CpuState, ExecMode};
use std::collections::HashMap;
use std::error;
use std::fmt;

/// An Error enum used throughout the Cadmium crate to communicate details of runtime errors
/// that have occurred.
///
/// Instances of [ErrorDetail] are bubbled-up to the hosting application through the public
/// API methods; the core never panics or unwinds across the host boundary.
#[derive(Clone, Debug, PartialEq)]
pub enum ErrorDetail {
    /// No handler was ever installed into the dispatch table slot for this opcode.
    UnknownInstruction { opcode: u16 },
    /// A recognised opcode was decoded but is not implemented by this build.
    UnimplementedInstruction { opcode: u16 },
    /// One or more operands fall outside expected ranges and cannot be safely used.
    /// The HashMap field holds the name of each potential faulty operand and its value.
    OperandsOutOfBounds { operands: HashMap<String, usize> },
    /// An attempt was made to pop the stack while it is empty (non-cyclic mode only).
    PopEmptyStack,
    /// An attempt was made to push the stack while it is full (non-cyclic mode only).
    PushFullStack,
    /// An attempt was made to read/write from an address outside the addressable range.
    MemoryAddressOutOfBounds { address: u16 },
    /// A key ordinal was referenced that is outside the valid CHIP-8 keypad range (0x0 to 0xF).
    InvalidKey { key: u8 },
    /// Error used for any configuration/ROM file I/O issues.
    FileError { file_path: String },
    /// General bucket for any unknown issues (to return *something* rather than panicking).
    UnknownError,
}

impl error::Error for ErrorDetail {}

impl fmt::Display for ErrorDetail {
    /// Returns a textual description of each enum variant for display purposes.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorDetail::UnknownInstruction { opcode } => {
                write!(f, "an unrecognised opcode {:#06X} was decoded", opcode)
            }
            ErrorDetail::UnimplementedInstruction { opcode } => {
                write!(f, "an unimplemented opcode {:#06X} was executed", opcode)
            }
            ErrorDetail::OperandsOutOfBounds { operands } => {
                write!(f, "an opcode contains invalid operands: {:?}", operands)
            }
            ErrorDetail::PopEmptyStack => {
                write!(f, "an attempt was made to pop the stack while empty")
            }
            ErrorDetail::PushFullStack => {
                write!(f, "an attempt was made to push the stack while full")
            }
            ErrorDetail::MemoryAddressOutOfBounds { address } => {
                write!(f, "invalid memory address {:#06X} was accessed", address)
            }
            ErrorDetail::InvalidKey { key } => {
                write!(f, "invalid key {:#04X} was specified", key)
            }
            ErrorDetail::FileError { file_path } => {
                write!(f, "invalid file path {} was specified", file_path)
            }
            ErrorDetail::UnknownError => {
                write!(f, "an unknown error occurred")
            }
        }
    }
}

/// Enough machine state to make an [ErrorDetail] actionable, captured at the moment the error
/// occurred. A reduced cousin of [StateSnapshot](crate::processor::StateSnapshot) - just the
/// fields useful for diagnosing a failure, independent of the active variant's screen/RAM size.
#[derive(Clone, Debug, PartialEq)]
pub struct ErrorStateSnapshot {
    pub program_counter: u16,
    pub index_register: u32,
    pub variable_registers: [u8; 16],
    pub stack_pointer: usize,
    pub cycles: u64,
    pub exec_mode: ExecMode,
    pub cpu_state: CpuState,
}

/// An Error struct used to bubble up Cadmium errors to the hosting application. This wraps
/// the more specific [ErrorDetail] error enum, and provides overall processor state context
/// at the point of the failure.
#[derive(Clone, Debug, PartialEq)]
pub struct CadmiumError {
    pub state_snapshot_dump: ErrorStateSnapshot,
    pub inner_error: ErrorDetail,
}

impl error::Error for CadmiumError {}

impl fmt::Display for CadmiumError {
    /// Returns a textual description of the error.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "an error occurred on cycle {}, with program_counter {:#06X}: ",
            self.state_snapshot_dump.cycles, self.state_snapshot_dump.program_counter
        )?;
        self.inner_error.fmt(f)
    }
}
