/*
 * Service Numbers
 *
 * The external system-call ABI. A user process traps with the service
 * number in trap register 0 and arguments in registers 1 and up; the
 * return value comes back in register 0. These numbers are stable;
 * user-space links against them.
 *
 * Errors are reported as negative return values: -1 for "no such
 * resource" failures (unknown service, full tables, bad descriptor), -2
 * for conflicts (name already taken, no mutex by that name, unlocking a
 * mutex the caller does not hold, re-entrant lock of a non-recursive
 * mutex).
 */

/// Create a process from an executable path (register 1: path pointer).
/// Returns the new pid or -1.
pub const SYS_CREATE_PROCESS: usize = 0;

/// Terminate the calling process. Does not return.
pub const SYS_TERMINATE_PROCESS: usize = 1;

/// Write a buffer to the console (register 1: buffer pointer, register 2:
/// length). Returns 0.
pub const SYS_WRITE: usize = 2;

/// Return the caller's pid.
pub const SYS_GET_PID: usize = 3;

/// Sleep for a number of seconds (register 1). Returns 1 on wake-up.
pub const SYS_SLEEP: usize = 4;

/// Create a named mutex (register 1: name pointer, register 2: 0 for
/// non-recursive, anything else for recursive). Returns the mutex id,
/// -1 or -2.
pub const SYS_CREATE_MUTEX: usize = 5;

/// Open an existing mutex by name (register 1: name pointer). Returns the
/// mutex id, -1 or -2.
pub const SYS_OPEN_MUTEX: usize = 6;

/// Acquire a mutex (register 1: mutex id). Returns 0, -1 or -2.
pub const SYS_LOCK: usize = 7;

/// Release a mutex (register 1: mutex id). Returns 0, -1 or -2.
pub const SYS_UNLOCK: usize = 8;

/// Close a mutex descriptor (register 1: mutex id). Returns 0 or -1.
pub const SYS_CLOSE_MUTEX: usize = 9;

/// Number of services; anything at or above this returns -1.
pub const NSERVICES: usize = 10;
