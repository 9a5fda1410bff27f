/*
 * Hardware Abstraction Layer Interface
 *
 * The kernel core never touches the machine directly. Every privileged
 * operation (masking interrupts, halting, switching register contexts,
 * reading trap registers, programming counters) goes through the `Hal`
 * trait defined here, and a port supplies the implementation for its
 * architecture.
 *
 * Context-switch model: a switch is a trap-frame switch. `context_switch`
 * installs the incoming register snapshot so that it takes effect when the
 * current trap returns to user space, optionally capturing the outgoing
 * snapshot first. Kernel handlers therefore always run to completion; a
 * service call that must block records a continuation in its PCB and is
 * finished when the process is next scheduled in (see `syscall`).
 */

use alloc::string::String;
use alloc::vec::Vec;

/// Number of trap registers visible to the kernel. Register 0 carries the
/// service number on entry and the return value on exit; registers 1.. carry
/// service arguments.
pub const NUM_TRAP_REGS: usize = 8;

/// Port address of the terminal data register, read to acknowledge a
/// terminal interrupt.
pub const TERMINAL_DATA_PORT: usize = 0x60;

/// Interrupt priority mask. Higher levels mask more sources; `Level3` masks
/// everything including the clock, `Level1` is the minimum permissive level
/// used while the idle loop waits, `Level0` leaves all sources open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IntLevel {
    Level0,
    Level1,
    Level2,
    Level3,
}

/// Interrupt and trap vectors the kernel installs handlers for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vector {
    /// Arithmetic exception raised by the running process.
    ArithmeticFault,
    /// Memory-access exception raised by the running process.
    MemoryFault,
    /// Periodic clock interrupt.
    Clock,
    /// Terminal (keyboard) interrupt.
    Terminal,
    /// System-call trap.
    Syscall,
    /// Software interrupt, the HAL's preemption hook.
    Software,
}

/// Saved register context of a process. The HAL owns the interpretation of
/// the fields; the kernel only stores one per PCB and passes them back to
/// `Hal::context_switch` and `Loader::init_context`.
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub pc: usize,
    pub sp: usize,
    pub regs: [usize; NUM_TRAP_REGS],
}

/// The hardware abstraction layer.
///
/// Implementations are single-CPU: the kernel relies on interrupt masking,
/// not locking, for mutual exclusion, and calls these methods only from
/// handler context.
pub trait Hal: Send {
    /// Raise or lower the interrupt mask. Returns the previous level so
    /// callers can restore it on every exit path.
    fn set_int_level(&mut self, level: IntLevel) -> IntLevel;

    /// Suspend the CPU until an interrupt is pending and return its vector
    /// for the caller to dispatch. Only the idle loop calls this.
    fn halt(&mut self) -> Vector;

    /// Install the handler function for an interrupt vector.
    fn install_handler(&mut self, vector: Vector, handler: fn());

    /// Switch register contexts when the current trap returns.
    ///
    /// # Arguments
    /// * `save` - where to capture the outgoing context, or `None` for the
    ///   one-way form used when the outgoing stack is already freed
    /// * `restore` - context that will run next
    fn context_switch(&mut self, save: Option<&mut Context>, restore: &Context);

    /// Read trap register `n` of the process that entered the kernel.
    fn read_register(&self, n: usize) -> usize;

    /// Write trap register `n` of the process that will leave the kernel.
    fn write_register(&mut self, n: usize, value: usize);

    /// Read a device port (used to acknowledge terminal input).
    fn read_port(&mut self, addr: usize) -> u8;

    /// Enable interrupt delivery machinery at boot.
    fn start_interrupt_counter(&mut self);

    /// Program the clock to fire `ticks_per_sec` times per second.
    fn start_clock_counter(&mut self, ticks_per_sec: u32);

    /// Enable keyboard interrupt generation at boot.
    fn start_keyboard_counter(&mut self);

    /// Request a software interrupt once the current handler finishes.
    fn raise_software_interrupt(&mut self);

    /// Whether the current trap interrupted user-mode execution. A trap
    /// taken from kernel mode on an exception vector is fatal.
    fn came_from_user_mode(&self) -> bool;

    /// Write bytes to the console device (sink of the `write` service).
    fn console_write(&mut self, bytes: &[u8]);

    /// Copy a NUL-terminated string out of the faulting process's user
    /// memory. Returns `None` if the address is not valid user memory.
    fn read_user_str(&self, addr: usize) -> Option<String>;

    /// Copy `len` bytes out of user memory, or `None` if the range is not
    /// valid user memory.
    fn read_user_bytes(&self, addr: usize, len: usize) -> Option<Vec<u8>>;

    /// Fatal kernel error. Does not return.
    fn kernel_panic(&mut self, msg: &str) -> !;
}
