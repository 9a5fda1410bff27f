/*
 * Sleep Timer
 *
 * The `sleep` service parks the caller in the sleep queue with a tick
 * countdown; the clock handler walks the queue once per tick and moves
 * expired sleepers back to the tail of the ready queue. Sleepers that
 * expire on the same tick wake in queue order.
 */

use crate::TICK_RATE;
use crate::hal::IntLevel;
use crate::kernel::Kernel;
use crate::scheduler::WaitTarget;
use crate::scheduler::process::{BlockedOn, ProcessState};
use crate::syscall::SyscallOutcome;

impl Kernel {
    /// Body of the `sleep` service: block the caller for `seconds` worth
    /// of clock ticks and switch to the next runnable process. The call
    /// completes with return value 1 when the process runs again.
    ///
    /// Sleeping 0 seconds is legal: the process parks and wakes on the
    /// next tick.
    pub(crate) fn sleep_current(&mut self, seconds: u32) -> SyscallOutcome {
        let prev = self.hal.set_int_level(IntLevel::Level3);
        let caller = self.current_idx();
        self.procs[caller].sleep_ticks = i64::from(seconds) * i64::from(TICK_RATE);
        self.procs[caller].blocked_on = Some(BlockedOn::Sleep);
        log::info!(
            "process {caller}: sleeping {seconds}s ({} ticks)",
            self.procs[caller].sleep_ticks
        );
        self.block_current(WaitTarget::Timer, prev);
        SyscallOutcome::Suspended
    }

    /// Per-tick bookkeeping, called from the clock handler. Counts every
    /// sleeper down and wakes the expired ones. The successor link is read
    /// before the decrement because waking unlinks the entry.
    pub(crate) fn timer_tick(&mut self) {
        let mut cursor = self.sleeping.head();
        while let Some(idx) = cursor {
            cursor = self.procs[idx].next;
            self.procs[idx].sleep_ticks -= 1;
            if self.procs[idx].sleep_ticks <= 0 {
                self.wake_sleeper(idx);
            }
        }
    }

    fn wake_sleeper(&mut self, idx: usize) {
        let prev = self.hal.set_int_level(IntLevel::Level3);
        log::debug!("process {idx}: sleep expired");
        self.procs[idx].state = ProcessState::Ready;
        {
            let Kernel {
                sleeping, procs, ..
            } = self;
            sleeping.remove(procs, idx);
        }
        {
            let Kernel { ready, procs, .. } = self;
            ready.push_back(procs, idx);
        }
        self.hal.set_int_level(prev);
    }
}
