/*
 * Kernel State and Entry Points
 *
 * All mutable kernel state (the process table, the scheduling queues, the
 * mutex table and the current-process pointer) lives in one `Kernel`
 * value. The machine-facing seams (HAL, loader) are boxed trait objects
 * inside it, so the same state value runs on real hardware behind a port
 * or on a development host behind mocks.
 *
 * For a running system the value sits in a global singleton; the interrupt
 * entry points installed on the HAL vectors reach it through
 * `with_kernel_mut`. Every handler runs to completion: context switches
 * are trap-frame switches that take effect when the handler returns, so
 * the singleton lock is never held across a suspension. On a single CPU
 * the interrupt mask discipline keeps handlers from nesting.
 */

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;

use crate::hal::{Hal, Vector};
use crate::loader::Loader;
use crate::scheduler::process::{Pcb, Pid, ProcessState};
use crate::scheduler::queue::PcbQueue;
use crate::sync::mutex::Mutex;
use crate::{MAX_MUTEXES, MAX_PROCESSES, TICK_RATE};

/// The kernel core: process control, scheduling and synchronization state
/// plus the two seams to the outside world.
pub struct Kernel {
    pub(crate) hal: Box<dyn Hal>,
    pub(crate) loader: Box<dyn Loader>,
    pub(crate) procs: [Pcb; MAX_PROCESSES],
    /// FIFO of runnable processes. The head is the running process and
    /// stays pinned there until it blocks, terminates or exhausts its
    /// quantum.
    pub(crate) ready: PcbQueue,
    /// Processes blocked in `sleep`, in no particular deadline order.
    pub(crate) sleeping: PcbQueue,
    /// Processes blocked in `create_mutex` because the mutex table was
    /// full, FIFO.
    pub(crate) create_waiters: PcbQueue,
    pub(crate) mutexes: [Mutex; MAX_MUTEXES],
    /// Index of the running process; `None` only before bootstrap.
    pub(crate) current: Option<usize>,
}

/// One row of the diagnostic process listing.
#[derive(Debug, Clone)]
pub struct ProcessSnapshot {
    pub pid: Pid,
    pub name: String,
    pub state: ProcessState,
}

impl Kernel {
    pub fn new(hal: Box<dyn Hal>, loader: Box<dyn Loader>) -> Self {
        Self {
            hal,
            loader,
            procs: core::array::from_fn(Pcb::new),
            ready: PcbQueue::new(),
            sleeping: PcbQueue::new(),
            create_waiters: PcbQueue::new(),
            mutexes: core::array::from_fn(|_| Mutex::empty()),
            current: None,
        }
    }

    /// Table index of the running process.
    pub(crate) fn current_idx(&self) -> usize {
        self.current.expect("no process is running")
    }

    /// Pid of the running process.
    pub fn current_pid(&self) -> Pid {
        self.procs[self.current_idx()].id
    }

    /// Wire the interrupt vectors, start the counters, create the initial
    /// process and switch into it. Called once by the platform bootstrap,
    /// with interrupts still disabled; the switch takes effect when the
    /// bootstrap trap frame unwinds.
    pub fn bootstrap(&mut self, init_program: &str) {
        self.hal
            .install_handler(Vector::ArithmeticFault, arithmetic_fault);
        self.hal.install_handler(Vector::MemoryFault, memory_fault);
        self.hal.install_handler(Vector::Clock, clock_interrupt);
        self.hal
            .install_handler(Vector::Terminal, terminal_interrupt);
        self.hal.install_handler(Vector::Syscall, syscall_trap);
        self.hal
            .install_handler(Vector::Software, software_interrupt);

        self.hal.start_interrupt_counter();
        self.hal.start_clock_counter(TICK_RATE);
        self.hal.start_keyboard_counter();

        if self.create_task(init_program) < 0 {
            self.hal.kernel_panic("initial process not found");
        }
        let first = self.schedule();
        self.procs[first].state = ProcessState::Running;
        self.current = Some(first);
        log::info!(
            "boot: entering process {first} (\"{}\")",
            self.procs[first].name
        );
        let Kernel { hal, procs, .. } = self;
        hal.context_switch(None, &procs[first].context);
    }

    /// Diagnostic listing of every slot that ever held a process.
    pub fn process_snapshot(&self) -> Vec<ProcessSnapshot> {
        self.procs
            .iter()
            .filter(|p| p.state != ProcessState::Unused)
            .map(|p| ProcessSnapshot {
                pid: p.id,
                name: p.name.clone(),
                state: p.state,
            })
            .collect()
    }
}

/// Global kernel instance. `None` until `start` publishes it.
static KERNEL: spin::Mutex<Option<Kernel>> = spin::Mutex::new(None);

/// Build the kernel, publish it and run the bootstrap. The platform calls
/// this once from its boot path; interrupts must still be disabled and are
/// first delivered after this returns into the initial process.
pub fn start(hal: Box<dyn Hal>, loader: Box<dyn Loader>, init_program: &str) {
    let mut guard = KERNEL.lock();
    let kernel = guard.insert(Kernel::new(hal, loader));
    kernel.bootstrap(init_program);
}

/// Run `f` against the global kernel.
pub(crate) fn with_kernel_mut<R>(f: impl FnOnce(&mut Kernel) -> R) -> R {
    let mut guard = KERNEL.lock();
    let kernel = guard.as_mut().expect("kernel not started");
    f(kernel)
}

// Entry points installed on the HAL vectors by `Kernel::bootstrap`.

pub fn clock_interrupt() {
    with_kernel_mut(|k| k.handle_clock())
}

pub fn terminal_interrupt() {
    with_kernel_mut(|k| k.handle_terminal())
}

pub fn arithmetic_fault() {
    with_kernel_mut(|k| k.handle_arithmetic_fault())
}

pub fn memory_fault() {
    with_kernel_mut(|k| k.handle_memory_fault())
}

pub fn syscall_trap() {
    with_kernel_mut(|k| k.handle_syscall())
}

pub fn software_interrupt() {
    with_kernel_mut(|k| k.handle_software_interrupt())
}
