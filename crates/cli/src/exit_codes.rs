//! CLI Exit Code Registry
//!
//! Single source of truth for `sdash` exit codes. Scripts that run the
//! nightly reports rely on them.
//!
//! | Code | Meaning                                              |
//! |------|------------------------------------------------------|
//! | 0    | Success                                              |
//! | 1    | General error (unspecified)                          |
//! | 2    | Usage error (bad args, unreadable path)              |
//! | 3    | An input file could not be read by any backend       |
//! | 4    | A required input or column is missing                |
//! | 5    | Settings or a configuration file is invalid          |
//! | 6    | The workbook could not be written                    |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant with a doc comment saying what triggers it
//! 2. Update the table above
//! 3. Map it in `pipeline_exit_code` or the command that raises it

use salesdash_analytics::{ErrorKind, PipelineError};

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, input path that cannot be opened.
pub const EXIT_USAGE: u8 = 2;

/// Every reader backend failed on an input file.
pub const EXIT_READ: u8 = 3;

/// The analysis needs an input kind or column that is absent.
pub const EXIT_INPUT_SCHEMA: u8 = 4;

/// Settings failed validation, or `config check` found a broken file.
pub const EXIT_CONFIG: u8 = 5;

/// Writing the output workbook failed.
pub const EXIT_WRITE: u8 = 6;

pub fn pipeline_exit_code(err: &PipelineError) -> u8 {
    match err.kind {
        ErrorKind::ReadFailure { .. } => EXIT_READ,
        ErrorKind::MissingInput(_) | ErrorKind::MissingRequiredColumn { .. } => EXIT_INPUT_SCHEMA,
        ErrorKind::ConfigInvalid(_) => EXIT_CONFIG,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use salesdash_analytics::{InputKind, Stage};

    #[test]
    fn codes_are_distinct() {
        let codes = [EXIT_SUCCESS, EXIT_ERROR, EXIT_USAGE, EXIT_READ, EXIT_INPUT_SCHEMA, EXIT_CONFIG, EXIT_WRITE];
        let mut sorted = codes.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
    }

    #[test]
    fn pipeline_errors_map_by_kind() {
        let err = PipelineError::new(Stage::Read, ErrorKind::MissingInput(InputKind::Sales), "");
        assert_eq!(pipeline_exit_code(&err), EXIT_INPUT_SCHEMA);
    }
}
