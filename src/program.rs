use crate::error::ErrorDetail;

/// The two-byte prefix ("TPD") some distributed ROMs carry that forces a 0x200 load address
/// regardless of the active variant's configured `Start Address` (§6).
const TPD_PREFIX: [u8; 2] = [0x02, 0x00];
const TPD_FORCED_START_ADDRESS: u16 = 0x200;

/// An abstraction of a CHIP-8 ROM, ready for loading into the core.
pub struct Program {
    /// A byte vector containing the program data as loaded from the ROM.
    program_data: Vec<u8>,
}

impl Default for Program {
    /// Constructor that returns an empty [Program] instance.
    fn default() -> Self {
        Program {
            program_data: Vec::new(),
        }
    }
}

impl Program {
    /// Constructor that returns a [Program] instance representing the passed program data.
    pub fn new(data: Vec<u8>) -> Self {
        Program { program_data: data }
    }

    /// Sets the program data as per the specified byte vector.
    ///
    /// # Arguments
    ///
    /// * `data` - the byte vector containing the program data to use
    pub fn set_program_data(&mut self, data: Vec<u8>) -> Result<(), ErrorDetail> {
        self.program_data = data;
        Ok(())
    }

    /// Returns a reference to the program data held in this instance.
    pub fn program_data(&self) -> &Vec<u8> {
        &self.program_data
    }

    /// Returns the size of the instance's program data (in bytes).
    pub(crate) fn program_data_size(&self) -> usize {
        self.program_data.len()
    }

    /// True if this ROM begins with the TPD prefix (`0x02 0x00`).
    pub fn has_tpd_prefix(&self) -> bool {
        self.program_data.starts_with(&TPD_PREFIX)
    }

    /// Resolves the effective load address for this ROM: `TPD_FORCED_START_ADDRESS` if the
    /// TPD prefix is present, otherwise the variant's configured start address.
    pub fn resolve_start_address(&self, configured_start_address: u16) -> u16 {
        if self.has_tpd_prefix() {
            TPD_FORCED_START_ADDRESS
        } else {
            configured_start_address
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_test_program() -> Vec<u8> {
        vec![0xA1, 0x14, 0x0C, 0xFD, 0xA3]
    }

    #[test]
    fn test_program_data() {
        let mut program: Program = Program::default();
        let test_program: Vec<u8> = setup_test_program();
        program.set_program_data(test_program.clone()).unwrap();
        assert_eq!(program.program_data(), &test_program);
    }

    #[test]
    fn test_program_data_size() {
        let mut program: Program = Program::default();
        let test_program: Vec<u8> = setup_test_program();
        program.set_program_data(test_program.clone()).unwrap();
        assert_eq!(program.program_data_size(), test_program.len());
    }

    #[test]
    fn test_has_tpd_prefix_true() {
        let program = Program::new(vec![0x02, 0x00, 0x12, 0x34]);
        assert!(program.has_tpd_prefix());
    }

    #[test]
    fn test_has_tpd_prefix_false() {
        let program = Program::new(setup_test_program());
        assert!(!program.has_tpd_prefix());
    }

    #[test]
    fn test_resolve_start_address_tpd_overrides_configured() {
        let program = Program::new(vec![0x02, 0x00]);
        assert_eq!(program.resolve_start_address(0x300), 0x200);
    }

    #[test]
    fn test_resolve_start_address_without_tpd_uses_configured() {
        let program = Program::new(setup_test_program());
        assert_eq!(program.resolve_start_address(0x300), 0x300);
    }
}
