use std::io;
use std::path::PathBuf;

/// Errors while loading a program image into memory.
#[derive(Debug, displaydoc::Display, thiserror::Error)]
pub enum LoadProgramError {
    /// Program is missing valid .ORIG header
    ProgramMissingOrigHeader,
    /// Cannot read program image {path:?}: {source}
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Errors that end the execution of a program other than by the HALT trap.
#[derive(Debug, displaydoc::Display, thiserror::Error)]
pub enum ExecutionError {
    /// Illegal opcode {opcode:#06b} at address {address:#06X}
    IllegalOpcode { opcode: u8, address: u16 },
    /// Execution interrupted
    Interrupted,
    /// Error during reading Stdin or writing program output to Stdout: {0}
    Io(#[source] io::Error),
}

impl From<io::Error> for ExecutionError {
    fn from(error: io::Error) -> Self {
        if error.kind() == io::ErrorKind::Interrupted {
            Self::Interrupted
        } else {
            Self::Io(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use googletest::prelude::*;

    #[gtest]
    fn test_messages() {
        expect_that!(
            ExecutionError::IllegalOpcode {
                opcode: 0b1101,
                address: 0x3000
            }
            .to_string(),
            eq("Illegal opcode 0b1101 at address 0x3000")
        );
        expect_that!(
            LoadProgramError::ProgramMissingOrigHeader.to_string(),
            eq("Program is missing valid .ORIG header")
        );
    }

    #[gtest]
    fn test_interrupted_io_error_maps_to_interrupted() {
        let err = ExecutionError::from(io::Error::from(io::ErrorKind::Interrupted));
        expect_that!(matches!(err, ExecutionError::Interrupted), eq(true));
        let err = ExecutionError::from(io::Error::other("broken pipe"));
        expect_that!(
            err.to_string(),
            eq("Error during reading Stdin or writing program output to Stdout: broken pipe")
        );
    }
}
