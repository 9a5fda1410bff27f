/*
 * Kernel Test Suite
 *
 * Host-side tests for the whole core, driven through the mock HAL and
 * loader. Tests act as the machine: they load registers and issue the
 * trap, deliver clock ticks and software interrupts, and feed the idle
 * loop its wake-up interrupts. `check_invariants` asserts the structural
 * invariants that must hold whenever a handler has returned.
 */


use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::MAX_PROCESSES;
use crate::kernel::Kernel;
use crate::scheduler::process::{BlockedOn, ProcessState};
use crate::syscall::numbers::SYS_CREATE_PROCESS;

pub(crate) use mock::{LoaderState, MockHal, MockLoader, MockState};

pub(crate) type SharedHal = Arc<spin::Mutex<MockState>>;
pub(crate) type SharedLoader = Arc<spin::Mutex<LoaderState>>;

/// Build a kernel on mocks and boot it with an `init` process (pid 0,
/// running).
pub(crate) fn fresh_kernel() -> (Kernel, SharedHal, SharedLoader) {
    let (hal, hal_state) = MockHal::new();
    let (loader, loader_state) = MockLoader::new();
    let mut kernel = Kernel::new(Box::new(hal), Box::new(loader));
    kernel.bootstrap("init");
    (kernel, hal_state, loader_state)
}

/// Place a NUL-free string into mock user memory at `addr`.
pub(crate) fn put_str(hal: &SharedHal, addr: usize, s: &str) {
    hal.lock().user_mem.insert(addr, s.as_bytes().to_vec());
}

/// Issue a system call as the running process and return register 0.
///
/// When the call suspends, register 0 belongs to whichever process the
/// kernel switched to; suspension sites assert on kernel state instead of
/// this value.
pub(crate) fn syscall(
    kernel: &mut Kernel,
    hal: &SharedHal,
    service: usize,
    arg1: usize,
    arg2: usize,
) -> isize {
    {
        let mut state = hal.lock();
        state.regs[0] = service;
        state.regs[1] = arg1;
        state.regs[2] = arg2;
    }
    kernel.handle_syscall();
    hal.lock().regs[0] as isize
}

/// Create a process through the ABI, staging the path string at `addr`.
pub(crate) fn spawn(kernel: &mut Kernel, hal: &SharedHal, name: &str, addr: usize) -> isize {
    put_str(hal, addr, name);
    syscall(kernel, hal, SYS_CREATE_PROCESS, addr, 0)
}

/// Deliver `n` clock interrupts.
pub(crate) fn ticks(kernel: &mut Kernel, n: usize) {
    for _ in 0..n {
        kernel.handle_clock();
    }
}

/// Deliver a software interrupt (involuntary context switch).
pub(crate) fn rotate(kernel: &mut Kernel) {
    kernel.handle_software_interrupt();
}

pub(crate) fn ready_order(kernel: &Kernel) -> Vec<usize> {
    kernel.ready.iter(&kernel.procs).collect()
}

/// Structural invariants that hold at every handler exit.
pub(crate) fn check_invariants(kernel: &Kernel) {
    // Exactly one running process, pinned at the ready-queue head.
    let running: Vec<usize> = (0..MAX_PROCESSES)
        .filter(|&i| kernel.procs[i].state == ProcessState::Running)
        .collect();
    assert_eq!(running.len(), 1, "exactly one process must be running");
    assert_eq!(kernel.current, Some(running[0]));
    assert_eq!(kernel.ready.head(), Some(running[0]));

    // Each PCB is in exactly the queues its state says it is in.
    for idx in 0..MAX_PROCESSES {
        let in_ready = kernel.ready.contains(&kernel.procs, idx);
        let in_sleep = kernel.sleeping.contains(&kernel.procs, idx);
        let in_create = kernel.create_waiters.contains(&kernel.procs, idx);
        let in_mutexes = kernel
            .mutexes
            .iter()
            .filter(|m| m.waiters.contains(&kernel.procs, idx))
            .count();
        let memberships = in_ready as usize + in_sleep as usize + in_create as usize + in_mutexes;
        match kernel.procs[idx].state {
            ProcessState::Unused | ProcessState::Terminated => {
                assert_eq!(memberships, 0, "process {idx} must be in no queue");
            }
            ProcessState::Ready | ProcessState::Running => {
                assert!(in_ready, "runnable process {idx} must be in the ready queue");
                assert_eq!(memberships, 1, "process {idx} must be in one queue");
            }
            ProcessState::Blocked => {
                assert!(!in_ready, "blocked process {idx} must not be ready");
                assert_eq!(memberships, 1, "process {idx} must be in one wait queue");
            }
        }
    }

    // Mutex slots are coherent.
    for (slot, m) in kernel.mutexes.iter().enumerate() {
        if m.is_free() {
            assert_eq!(m.owner, None);
            assert_eq!(m.lock_count, 0);
            assert_eq!(m.open_count, 0);
            assert!(m.waiters.is_empty());
            continue;
        }
        match m.owner {
            Some(owner) => {
                assert!(
                    !matches!(
                        kernel.procs[owner].state,
                        ProcessState::Unused | ProcessState::Terminated
                    ),
                    "mutex {slot} held by dead process"
                );
                if m.lock_count == 0 {
                    // Ownership was handed off at unlock time; the new
                    // holder has not finished its retried lock yet.
                    assert_eq!(
                        kernel.procs[owner].blocked_on,
                        Some(BlockedOn::MutexLock { mutex_id: slot + 1 })
                    );
                }
            }
            None => assert_eq!(m.lock_count, 0),
        }
        for waiter in m.waiters.iter(&kernel.procs) {
            assert_eq!(kernel.procs[waiter].state, ProcessState::Blocked);
        }
    }

    // Live descriptors point at named slots.
    for p in &kernel.procs {
        if matches!(p.state, ProcessState::Unused | ProcessState::Terminated) {
            continue;
        }
        for &d in &p.descriptors {
            if d != 0 {
                assert!(
                    !kernel.mutexes[d - 1].is_free(),
                    "descriptor {d} of process {} points at a free slot",
                    p.id
                );
            }
        }
    }
}
