/*
 * Synchronization Subsystem
 *
 * Kernel-level synchronization offered to user processes. The only
 * primitive is the named mutex: a system-wide table of mutexes addressed by
 * name at creation/open time and by per-process descriptors afterwards.
 */

pub mod mutex;

pub use mutex::{Mutex, MutexKind};
