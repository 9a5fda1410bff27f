/*
 * Scheduler
 *
 * Process creation and release, the FIFO dispatcher, the idle loop and
 * round-robin preemption.
 *
 * SCHEDULING MODEL:
 * ================
 *
 * The ready queue is strictly FIFO over arrival, and its head IS the
 * running process: `schedule` never dequeues, it just reports the head
 * after waiting out any idle period. A process leaves the head by blocking
 * (sleep, mutex, full mutex table), terminating, or exhausting its quantum,
 * in which case the clock handler requests a software interrupt and the
 * software-interrupt handler rotates the head to the tail.
 *
 * The clock handler never switches contexts itself; it only requests a
 * software interrupt, the HAL's hook for involuntary switches, and the
 * rotation happens when that lower-priority vector is delivered.
 *
 * All queue surgery here runs with the interrupt mask raised; the blocking
 * paths restore the caller's mask level right before the context switch so
 * the resumed process continues at its own level.
 */

pub mod process;
pub mod queue;
pub mod timer;

use alloc::string::String;

use crate::hal::{Context, Hal, IntLevel, Vector};
use crate::kernel::Kernel;
use crate::scheduler::process::{Pcb, ProcessState};
use crate::{MAX_MUTEXES_PER_PROCESS, TASK_STACK_SIZE, TICKS_PER_SLICE};

/// Which queue a blocking process joins.
#[derive(Debug, Clone, Copy)]
pub(crate) enum WaitTarget {
    /// The sleep queue.
    Timer,
    /// The waiter queue of the given mutex table slot.
    Mutex(usize),
    /// The queue of processes waiting for a free mutex-table slot.
    MutexTable,
}

impl Kernel {
    /// Allocate and enqueue a new process running `path`.
    ///
    /// Claims the first never-used table slot, builds the image and stack
    /// through the loader, points the initial context at the image entry,
    /// and appends the process to the ready queue with a fresh quantum.
    /// Returns the new pid, or -1 when the table is full or the image
    /// cannot be loaded.
    pub(crate) fn create_task(&mut self, path: &str) -> isize {
        let Some(slot) = self
            .procs
            .iter()
            .position(|p| p.state == ProcessState::Unused)
        else {
            log::warn!("create_task: process table full");
            return -1;
        };
        let Some(image) = self.loader.load_image(path) else {
            log::warn!("create_task: cannot load \"{path}\"");
            return -1;
        };
        let stack = self.loader.alloc_stack(TASK_STACK_SIZE);
        let mut context = Context::default();
        self.loader
            .init_context(image.handle, stack, TASK_STACK_SIZE, image.entry, &mut context);

        let p = &mut self.procs[slot];
        p.state = ProcessState::Ready;
        p.name = String::from(path);
        p.context = context;
        p.stack = Some(stack);
        p.image = Some(image.handle);
        p.sleep_ticks = 0;
        p.quantum = TICKS_PER_SLICE;
        p.descriptors = [0; MAX_MUTEXES_PER_PROCESS];
        p.blocked_on = None;

        let prev = self.hal.set_int_level(IntLevel::Level3);
        {
            let Kernel { ready, procs, .. } = self;
            ready.push_back(procs, slot);
        }
        self.hal.set_int_level(prev);
        log::info!("created process {slot} (\"{path}\")");
        slot as isize
    }

    /// Pick the next process to run: the head of the ready queue, which is
    /// never dequeued. While the queue is empty the CPU waits for an
    /// interrupt that makes someone runnable.
    pub(crate) fn schedule(&mut self) -> usize {
        loop {
            if let Some(head) = self.ready.head() {
                return head;
            }
            self.idle_wait();
        }
    }

    /// One round of the idle loop: drop the mask to the minimum permissive
    /// level, halt until an interrupt is pending, restore the mask and
    /// dispatch the interrupt that ended the wait.
    fn idle_wait(&mut self) {
        let prev = self.hal.set_int_level(IntLevel::Level1);
        let vector = self.hal.halt();
        // the interrupt that ended the halt is handled before the mask
        // goes back up
        match vector {
            Vector::Clock => self.handle_clock(),
            Vector::Terminal => self.handle_terminal(),
            vector => log::warn!("ignoring {vector:?} interrupt while idle"),
        }
        self.hal.set_int_level(prev);
    }

    /// Move the running process out of the ready queue into `target`, pick
    /// a successor and switch to it. The caller has already recorded the
    /// process's continuation in `blocked_on` and raised the mask; the
    /// previous level is restored just before the switch.
    pub(crate) fn block_current(&mut self, target: WaitTarget, restore_level: IntLevel) {
        let caller = self.current_idx();
        debug_assert!(self.procs[caller].blocked_on.is_some());

        self.procs[caller].state = ProcessState::Blocked;
        {
            let Kernel { ready, procs, .. } = self;
            ready.remove(procs, caller);
        }
        match target {
            WaitTarget::Timer => {
                let Kernel {
                    sleeping, procs, ..
                } = self;
                sleeping.push_back(procs, caller);
            }
            WaitTarget::Mutex(slot) => {
                let Kernel { mutexes, procs, .. } = self;
                mutexes[slot].waiters.push_back(procs, caller);
            }
            WaitTarget::MutexTable => {
                let Kernel {
                    create_waiters,
                    procs,
                    ..
                } = self;
                create_waiters.push_back(procs, caller);
            }
        }

        let next = self.schedule();
        self.procs[next].state = ProcessState::Running;
        self.current = Some(next);
        log::debug!("context switch: {caller} -> {next}");
        self.hal.set_int_level(restore_level);
        let Kernel { hal, procs, .. } = self;
        hardware_switch(hal.as_mut(), procs, Some(caller), next);
    }

    /// Tear down the running process: close its descriptors, free its
    /// image, retire its table slot and switch into a successor.
    ///
    /// The stack backs the kernel frame that is executing this function,
    /// so it is freed only after the successor is chosen, and the one-way
    /// switch form is used because there is no stack left to save into.
    pub(crate) fn release_current(&mut self) {
        let prev = self.hal.set_int_level(IntLevel::Level3);
        let dying = self.current_idx();
        log::info!(
            "process {dying} (\"{}\") terminating",
            self.procs[dying].name
        );

        self.release_descriptors(dying);
        if let Some(image) = self.procs[dying].image.take() {
            self.loader.free_image(image);
        }
        self.procs[dying].state = ProcessState::Terminated;
        {
            let Kernel { ready, procs, .. } = self;
            ready.remove(procs, dying);
        }

        let next = self.schedule();
        self.procs[next].state = ProcessState::Running;
        self.current = Some(next);
        log::info!("context switch on exit: {dying} -> {next}");
        if let Some(stack) = self.procs[dying].stack.take() {
            self.loader.free_stack(stack);
        }
        self.hal.set_int_level(prev);
        let Kernel { hal, procs, .. } = self;
        hardware_switch(hal.as_mut(), procs, None, next);
    }

    /// Clock-handler half of round-robin: charge the tick to the running
    /// process and request a software interrupt when its quantum runs out.
    /// Nothing is charged while the clock interrupted the idle loop (the
    /// current process is then blocked or terminated).
    pub(crate) fn round_robin_tick(&mut self) {
        let Some(cur) = self.current else { return };
        if matches!(
            self.procs[cur].state,
            ProcessState::Ready | ProcessState::Running
        ) {
            self.procs[cur].quantum -= 1;
            if self.procs[cur].quantum == 0 {
                log::debug!("process {cur}: quantum exhausted, requesting preemption");
                self.hal.raise_software_interrupt();
            }
        }
    }

    /// Software-interrupt half of round-robin: rotate the ready-queue head
    /// to the tail, recharge the successor's quantum if it has run down and
    /// switch to it.
    pub(crate) fn preempt_switch(&mut self) {
        let prev = self.hal.set_int_level(IntLevel::Level3);
        let rotated = {
            let Kernel { ready, procs, .. } = self;
            ready.pop_front(procs)
        };
        if let Some(idx) = rotated {
            self.procs[idx].state = ProcessState::Ready;
            let Kernel { ready, procs, .. } = self;
            ready.push_back(procs, idx);
        }

        let next = self.schedule();
        if self.procs[next].quantum <= 0 {
            self.procs[next].quantum = TICKS_PER_SLICE;
        }
        self.procs[next].state = ProcessState::Running;
        let from = self.current.replace(next);
        self.hal.set_int_level(prev);

        if let Some(from) = from {
            if from != next {
                log::debug!("preempt: context switch {from} -> {next}");
                let Kernel { hal, procs, .. } = self;
                hardware_switch(hal.as_mut(), procs, Some(from), next);
            }
        }
    }
}

/// Hand two table slots to the HAL context switch, splitting the borrow so
/// the outgoing context is captured while the incoming one is read. A
/// switch to the same slot is a no-op.
pub(crate) fn hardware_switch(
    hal: &mut dyn Hal,
    procs: &mut [Pcb],
    from: Option<usize>,
    to: usize,
) {
    match from {
        None => hal.context_switch(None, &procs[to].context),
        Some(from) if from == to => {}
        Some(from) => {
            let (outgoing, incoming) = if from < to {
                let (left, right) = procs.split_at_mut(to);
                (&mut left[from], &right[0])
            } else {
                let (left, right) = procs.split_at_mut(from);
                (&mut right[0], &left[to])
            };
            hal.context_switch(Some(&mut outgoing.context), &incoming.context);
        }
    }
}
