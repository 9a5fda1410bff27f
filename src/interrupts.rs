/*
 * Interrupt and Exception Handlers
 *
 * Handler bodies for the five non-syscall vectors. The HAL delivers each
 * vector to the matching entry shim in `kernel`, which locks the global
 * kernel and calls in here.
 *
 * - Clock: sleep bookkeeping, then round-robin accounting
 * - Terminal: acknowledge the device; no effect on core state
 * - Arithmetic/memory fault: fatal in kernel mode, otherwise kills the
 *   offending process
 * - Software: the deferred involuntary context switch requested by the
 *   clock handler when a quantum runs out
 */

use alloc::format;

use crate::hal::TERMINAL_DATA_PORT;
use crate::kernel::Kernel;

impl Kernel {
    /// Clock interrupt.
    pub fn handle_clock(&mut self) {
        self.timer_tick();
        self.round_robin_tick();
    }

    /// Terminal interrupt: read the data port to acknowledge the device.
    pub fn handle_terminal(&mut self) {
        let byte = self.hal.read_port(TERMINAL_DATA_PORT);
        log::debug!("terminal interrupt: {byte:#04x}");
    }

    /// Arithmetic exception raised by the running process.
    pub fn handle_arithmetic_fault(&mut self) {
        self.user_fault("arithmetic exception");
    }

    /// Memory-access exception raised by the running process.
    pub fn handle_memory_fault(&mut self) {
        self.user_fault("memory exception");
    }

    /// Software interrupt: rotate the ready queue and switch.
    pub fn handle_software_interrupt(&mut self) {
        log::debug!("software interrupt: involuntary context switch");
        self.preempt_switch();
        self.resume_pending();
    }

    /// An exception from kernel mode means the kernel itself is broken; an
    /// exception from user mode kills the offending process and the system
    /// carries on.
    fn user_fault(&mut self, what: &str) {
        if !self.hal.came_from_user_mode() {
            let msg = format!("{what} while in kernel mode");
            self.hal.kernel_panic(&msg);
        }
        log::warn!("process {}: {what}, killing it", self.current_idx());
        self.release_current();
        self.resume_pending();
    }
}
