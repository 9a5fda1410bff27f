/*
 * Process Control Blocks
 *
 * This module defines the PCB and its state machine. The kernel keeps a
 * fixed table of PCBs; a process id is simply the index of its slot, stable
 * for the whole lifetime of the process. Slots of terminated processes keep
 * the `Terminated` state and are not handed out again.
 */

use alloc::string::String;
use core::fmt;

use crate::MAX_MUTEXES_PER_PROCESS;
use crate::hal::Context;
use crate::loader::{ImageHandle, StackHandle};
use crate::sync::mutex::{MutexKind, MutexName};

/// Process identifier: the PCB's index in the process table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Pid(pub usize);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Process state machine.
///
/// `Unused` slots have never held a process; `Terminated` slots did and are
/// retired. Exactly one process is `Running` at any time, the head of the
/// ready queue, while the rest of the ready queue is `Ready` and every
/// sleeper or mutex waiter is `Blocked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Unused,
    Ready,
    Running,
    Blocked,
    Terminated,
}

/// What a blocked process is waiting for, and therefore how its suspended
/// service call finishes when the process is scheduled in again.
///
/// A wake-up never completes the service on the spot: the sleeper's return
/// value is written when it next runs, and the mutex operations re-run
/// their checks from the top because conditions may have changed between
/// the wake-up and the reschedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockedOn {
    /// Sleeping until the tick countdown expires; resumes by returning 1.
    Sleep,
    /// Waiting for a mutex to become free; resumes by retrying the lock.
    MutexLock { mutex_id: usize },
    /// Waiting for a free slot in the mutex table; resumes by retrying the
    /// whole creation.
    MutexCreate { name: MutexName, kind: MutexKind },
}

/// One process table entry.
pub struct Pcb {
    pub id: Pid,
    pub state: ProcessState,
    /// Program path, kept for diagnostics.
    pub name: String,
    /// Saved register context, owned by the HAL.
    pub context: Context,
    /// Stack allocation, owned by the loader.
    pub stack: Option<StackHandle>,
    /// Memory image, owned by the loader.
    pub image: Option<ImageHandle>,
    /// Link used while this PCB sits in a queue. A PCB is in at most one
    /// queue at a time.
    pub next: Option<usize>,
    /// Remaining ticks of sleep while blocked in the sleep queue. Signed so
    /// the expiry test is a simple `<= 0`.
    pub sleep_ticks: i64,
    /// Remaining round-robin budget.
    pub quantum: i32,
    /// Mutex-descriptor slots; 0 is a free slot, any other value is a mutex
    /// id (table slot + 1).
    pub descriptors: [usize; MAX_MUTEXES_PER_PROCESS],
    /// Continuation of a suspended service call, if any.
    pub blocked_on: Option<BlockedOn>,
}

impl Pcb {
    /// First free mutex-descriptor slot of this process, if any.
    pub fn free_descriptor_slot(&self) -> Option<usize> {
        self.descriptors.iter().position(|&d| d == 0)
    }

    /// Descriptor slot holding `mutex_id`, if this process has it open.
    /// Callers reject id 0 before the scan; free slots store 0.
    pub fn descriptor_slot(&self, mutex_id: usize) -> Option<usize> {
        self.descriptors.iter().position(|&d| d == mutex_id)
    }

    /// An unused table slot with a fixed id.
    pub fn new(idx: usize) -> Self {
        Self {
            id: Pid(idx),
            state: ProcessState::Unused,
            name: String::new(),
            context: Context::default(),
            stack: None,
            image: None,
            next: None,
            sleep_ticks: 0,
            quantum: 0,
            descriptors: [0; MAX_MUTEXES_PER_PROCESS],
            blocked_on: None,
        }
    }
}

impl fmt::Debug for Pcb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pcb")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state", &self.state)
            .field("blocked_on", &self.blocked_on)
            .finish()
    }
}
