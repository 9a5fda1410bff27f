/*
 * MINOS Kernel Core
 *
 * This crate implements the process control and synchronization subsystem of
 * the MINOS teaching kernel: the process table and its life cycle, the
 * ready/blocked/wait queues, the FIFO and round-robin schedulers, the
 * sleep/wake timer, a named-mutex facility, and the system-call dispatcher.
 *
 * Everything machine-facing is reached through two trait seams:
 * - `hal::Hal` for the hardware abstraction layer (interrupt masking,
 *   context switching, trap registers, counters, console)
 * - `loader::Loader` for executable images and stacks
 *
 * Why this is important:
 * - The core contains no architecture code at all, so a port only has to
 *   supply a `Hal` and a `Loader` and install the interrupt entry points
 * - The same property makes the whole subsystem testable on a development
 *   host: the test suite drives it through mock implementations
 * - All kernel state lives in one `Kernel` value; mutation happens only in
 *   interrupt and system-call handlers, which run to completion with the
 *   interrupt mask raised around every shared-state update
 */

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod hal;
pub mod interrupts;
pub mod kernel;
pub mod loader;
pub mod scheduler;
pub mod sync;
pub mod syscall;

#[cfg(test)]
mod tests;

/// Number of entries in the process table. Process ids are dense indexes
/// into it, stable for the lifetime of the process.
pub const MAX_PROCESSES: usize = 10;

/// Number of entries in the system-wide mutex table.
pub const MAX_MUTEXES: usize = 4;

/// Number of mutex-descriptor slots per process.
pub const MAX_MUTEXES_PER_PROCESS: usize = 4;

/// Buffer size reserved for a mutex name. Names may use at most
/// `MAX_MUTEX_NAME - 1` bytes; longer names are silently truncated.
pub const MAX_MUTEX_NAME: usize = 8;

/// Clock interrupts per second programmed into the HAL clock counter.
pub const TICK_RATE: u32 = 100;

/// Clock ticks a process may run before the clock handler requests an
/// involuntary context switch.
pub const TICKS_PER_SLICE: i32 = 5;

/// Stack size handed to the loader for every new process (64 KiB).
pub const TASK_STACK_SIZE: usize = 64 * 1024;
