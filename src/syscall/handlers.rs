/*
 * Service Routines
 *
 * One routine per service-table entry. Each reads its arguments from trap
 * registers 1.. through the HAL (user pointers are never dereferenced
 * directly; the HAL validates and copies them) and forwards to the
 * subsystem that does the work.
 */

use crate::kernel::Kernel;
use crate::sync::mutex::{MutexKind, truncated_name};
use crate::syscall::SyscallOutcome;

impl Kernel {
    pub(crate) fn sys_create_process(&mut self) -> SyscallOutcome {
        let addr = self.hal.read_register(1);
        let Some(path) = self.hal.read_user_str(addr) else {
            log::warn!("process {}: create_process: bad path pointer", self.current_idx());
            return SyscallOutcome::Done(-1);
        };
        log::info!("process {}: create_process \"{path}\"", self.current_idx());
        SyscallOutcome::Done(self.create_task(&path))
    }

    pub(crate) fn sys_terminate_process(&mut self) -> SyscallOutcome {
        self.release_current();
        SyscallOutcome::Suspended
    }

    pub(crate) fn sys_write(&mut self) -> SyscallOutcome {
        let addr = self.hal.read_register(1);
        let len = self.hal.read_register(2);
        let Some(bytes) = self.hal.read_user_bytes(addr, len) else {
            log::warn!("process {}: write: bad buffer", self.current_idx());
            return SyscallOutcome::Done(-1);
        };
        self.hal.console_write(&bytes);
        SyscallOutcome::Done(0)
    }

    pub(crate) fn sys_get_pid(&mut self) -> SyscallOutcome {
        SyscallOutcome::Done(self.current_pid().0 as isize)
    }

    pub(crate) fn sys_sleep(&mut self) -> SyscallOutcome {
        let seconds = self.hal.read_register(1) as u32;
        self.sleep_current(seconds)
    }

    pub(crate) fn sys_create_mutex(&mut self) -> SyscallOutcome {
        let addr = self.hal.read_register(1);
        let kind = MutexKind::from_raw(self.hal.read_register(2));
        let Some(raw) = self.hal.read_user_str(addr) else {
            log::warn!("process {}: create_mutex: bad name pointer", self.current_idx());
            return SyscallOutcome::Done(-1);
        };
        self.mutex_create(truncated_name(&raw), kind)
    }

    pub(crate) fn sys_open_mutex(&mut self) -> SyscallOutcome {
        let addr = self.hal.read_register(1);
        let Some(raw) = self.hal.read_user_str(addr) else {
            log::warn!("process {}: open_mutex: bad name pointer", self.current_idx());
            return SyscallOutcome::Done(-1);
        };
        SyscallOutcome::Done(self.mutex_open(&raw))
    }

    pub(crate) fn sys_lock(&mut self) -> SyscallOutcome {
        let mutex_id = self.hal.read_register(1);
        self.mutex_lock(mutex_id)
    }

    pub(crate) fn sys_unlock(&mut self) -> SyscallOutcome {
        let mutex_id = self.hal.read_register(1);
        SyscallOutcome::Done(self.mutex_unlock(mutex_id))
    }

    pub(crate) fn sys_close_mutex(&mut self) -> SyscallOutcome {
        let mutex_id = self.hal.read_register(1);
        SyscallOutcome::Done(self.mutex_close(mutex_id))
    }
}
