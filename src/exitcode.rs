//! Standard exit codes (BSD sysexits.h compatible)

/// Successful termination
pub const OK: i32 = 0;

/// Command line usage error
pub const USAGE: i32 = 64;

/// Data format error, also rejected hierarchy operations
pub const DATAERR: i32 = 65;

/// Referenced node does not exist
pub const NOINPUT: i32 = 66;

/// Internal software error, also a corrupted hierarchy
pub const SOFTWARE: i32 = 70;

/// Input/output error
pub const IOERR: i32 = 74;

/// Temporary failure, retrying may succeed
pub const TEMPFAIL: i32 = 75;

/// Configuration error
pub const CONFIG: i32 = 78;
