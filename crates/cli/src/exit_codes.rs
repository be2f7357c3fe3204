//! CLI Exit Code Registry
//!
//! Exit codes are part of the shell contract: scripts rely on them.
//!
//! | Code | Meaning                                             |
//! |------|-----------------------------------------------------|
//! | 0    | Success                                             |
//! | 1    | Script failed (syntax or runtime error)             |
//! | 2    | CLI usage error (bad args, unparseable address)     |
//! | 3    | Analysis database could not be loaded               |
//! | 4    | Scripting session could not be initialized          |
//! | 5    | Script was cancelled or hit the watchdog timeout    |

use binlua_engine::ExecuteResult;

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Script failed.
pub const EXIT_SCRIPT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// The `--db` file is missing, unparseable or inconsistent.
pub const EXIT_DATABASE: u8 = 3;

/// The interpreter could not be created.
pub const EXIT_INIT: u8 = 4;

/// Execution was interrupted.
pub const EXIT_CANCELLED: u8 = 5;

/// Map a script execution result to its exit code.
pub fn execute_exit_code(result: ExecuteResult) -> u8 {
    match result {
        ExecuteResult::Successful => EXIT_SUCCESS,
        ExecuteResult::InvalidInput => EXIT_SCRIPT_ERROR,
        ExecuteResult::Cancelled => EXIT_CANCELLED,
    }
}
