/*
 * Named Mutexes
 *
 * This module implements the kernel's named-mutex facility:
 * - A fixed system-wide table of mutex slots, addressed by name when
 *   creating or opening and by mutex id (slot index + 1) afterwards
 * - Per-process descriptor tables mapping small integers to mutex ids;
 *   descriptor value 0 marks a free slot, so id 0 is never valid
 * - Recursive and non-recursive locking with FIFO waiter queues and
 *   unlock-time ownership handoff
 *
 * Lifetime rules:
 * - A mutex lives until the last descriptor referring to it is closed,
 *   independent of which process created it
 * - Creation blocks while the table is full; freeing a slot wakes exactly
 *   one table-full waiter, which retries the whole creation
 * - Closing a descriptor while holding the lock releases it outright, so a
 *   process exiting with a held mutex cannot wedge its waiters
 *
 * Every operation here runs with the interrupt mask raised and restores the
 * previous level on each return path, including just before the context
 * switch on the blocking paths.
 */

use heapless::String;

use crate::hal::IntLevel;
use crate::kernel::Kernel;
use crate::scheduler::WaitTarget;
use crate::scheduler::process::{BlockedOn, ProcessState};
use crate::scheduler::queue::PcbQueue;
use crate::syscall::SyscallOutcome;
use crate::{MAX_MUTEX_NAME, MAX_MUTEXES};

/// Mutex name storage. The empty string marks a free table slot.
pub type MutexName = String<{ MAX_MUTEX_NAME - 1 }>;

/// Locking discipline of a mutex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutexKind {
    NonRecursive,
    Recursive,
}

impl MutexKind {
    /// Decode the ABI `type` argument: 0 is non-recursive, anything else is
    /// recursive.
    pub fn from_raw(raw: usize) -> Self {
        if raw == 0 {
            MutexKind::NonRecursive
        } else {
            MutexKind::Recursive
        }
    }
}

/// One slot of the system-wide mutex table.
pub struct Mutex {
    pub name: MutexName,
    pub kind: MutexKind,
    /// Process table index of the current holder.
    pub owner: Option<usize>,
    /// Unmatched lock calls by the holder.
    pub lock_count: u32,
    /// Processes blocked in `lock` on this mutex, FIFO.
    pub waiters: PcbQueue,
    /// Live descriptors referring to this slot across all processes. The
    /// slot is reclaimed when this reaches 0.
    pub open_count: u32,
}

impl Mutex {
    pub fn empty() -> Self {
        Self {
            name: MutexName::new(),
            kind: MutexKind::NonRecursive,
            owner: None,
            lock_count: 0,
            waiters: PcbQueue::new(),
            open_count: 0,
        }
    }

    pub fn is_free(&self) -> bool {
        self.name.is_empty()
    }

    /// Reset the slot to the free state. Waiters must already be gone: a
    /// waiter holds a descriptor, so a slot can only empty out without one.
    pub fn clear(&mut self) {
        debug_assert!(self.waiters.is_empty());
        *self = Mutex::empty();
    }
}

/// Clamp a requested mutex name to the storage limit, silently.
pub(crate) fn truncated_name(raw: &str) -> MutexName {
    let mut name = MutexName::new();
    for ch in raw.chars() {
        if name.push(ch).is_err() {
            log::warn!("mutex name \"{raw}\" too long, truncated to \"{name}\"");
            break;
        }
    }
    name
}

impl Kernel {
    /// Create a mutex named `name` and store a descriptor for it in the
    /// caller's first free slot.
    ///
    /// Returns the new mutex id, -1 when the caller has no free descriptor,
    /// -2 when the name is already taken. When the mutex table is full the
    /// caller blocks until a slot is freed and then retries from the
    /// descriptor check, because the table may have filled up again before
    /// it runs.
    pub(crate) fn mutex_create(&mut self, name: MutexName, kind: MutexKind) -> SyscallOutcome {
        let prev = self.hal.set_int_level(IntLevel::Level1);
        let caller = self.current_idx();

        let Some(dslot) = self.procs[caller].free_descriptor_slot() else {
            log::debug!("process {caller}: create_mutex: no free descriptor");
            self.hal.set_int_level(prev);
            return SyscallOutcome::Done(-1);
        };
        if self
            .mutexes
            .iter()
            .any(|m| m.name.as_str() == name.as_str())
        {
            log::debug!("process {caller}: create_mutex: name \"{name}\" already in use");
            self.hal.set_int_level(prev);
            return SyscallOutcome::Done(-2);
        }
        let Some(slot) = self.mutexes.iter().position(Mutex::is_free) else {
            log::info!("process {caller}: create_mutex: table full, waiting for a free slot");
            self.procs[caller].blocked_on = Some(BlockedOn::MutexCreate { name, kind });
            self.block_current(WaitTarget::MutexTable, prev);
            return SyscallOutcome::Suspended;
        };

        let m = &mut self.mutexes[slot];
        m.name = name;
        m.kind = kind;
        m.owner = None;
        m.lock_count = 0;
        m.open_count = 1;
        self.procs[caller].descriptors[dslot] = slot + 1;

        log::info!(
            "process {caller}: created mutex \"{}\" (id {})",
            self.mutexes[slot].name,
            slot + 1
        );
        self.hal.set_int_level(prev);
        SyscallOutcome::Done((slot + 1) as isize)
    }

    /// Open an existing mutex by name. Returns its id, -1 when the caller
    /// has no free descriptor, -2 when no such mutex exists.
    pub(crate) fn mutex_open(&mut self, name: &str) -> isize {
        let prev = self.hal.set_int_level(IntLevel::Level1);
        let caller = self.current_idx();

        let Some(dslot) = self.procs[caller].free_descriptor_slot() else {
            log::debug!("process {caller}: open_mutex: no free descriptor");
            self.hal.set_int_level(prev);
            return -1;
        };
        let found = self
            .mutexes
            .iter()
            .position(|m| !m.is_free() && m.name.as_str() == name);
        let Some(slot) = found else {
            log::debug!("process {caller}: open_mutex: no mutex named \"{name}\"");
            self.hal.set_int_level(prev);
            return -2;
        };

        self.procs[caller].descriptors[dslot] = slot + 1;
        self.mutexes[slot].open_count += 1;
        self.hal.set_int_level(prev);
        (slot + 1) as isize
    }

    /// Acquire the mutex behind one of the caller's descriptors.
    ///
    /// Returns 0 on acquisition, -1 when `mutex_id` is not among the
    /// caller's descriptors, -2 on a re-entrant lock of a non-recursive
    /// mutex. While another process holds the mutex the caller joins the
    /// FIFO waiter queue; ownership is assigned at unlock time, so the
    /// wake-up re-runs these checks rather than assuming success.
    pub(crate) fn mutex_lock(&mut self, mutex_id: usize) -> SyscallOutcome {
        let prev = self.hal.set_int_level(IntLevel::Level3);
        let caller = self.current_idx();

        if !self.descriptor_refers_to(caller, mutex_id) {
            log::debug!("process {caller}: lock({mutex_id}): not an open descriptor");
            self.hal.set_int_level(prev);
            return SyscallOutcome::Done(-1);
        }
        let slot = mutex_id - 1;

        match self.mutexes[slot].owner {
            Some(owner) if owner != caller => {
                log::debug!("process {caller}: lock({mutex_id}): held by process {owner}, blocking");
                self.procs[caller].blocked_on = Some(BlockedOn::MutexLock { mutex_id });
                self.block_current(WaitTarget::Mutex(slot), prev);
                SyscallOutcome::Suspended
            }
            owner => {
                if owner == Some(caller)
                    && self.mutexes[slot].kind == MutexKind::NonRecursive
                    && self.mutexes[slot].lock_count >= 1
                {
                    log::debug!("process {caller}: lock({mutex_id}): already held, not recursive");
                    self.hal.set_int_level(prev);
                    return SyscallOutcome::Done(-2);
                }
                self.mutexes[slot].owner = Some(caller);
                self.mutexes[slot].lock_count += 1;
                self.hal.set_int_level(prev);
                SyscallOutcome::Done(0)
            }
        }
    }

    /// Release one lock level of the mutex behind one of the caller's
    /// descriptors.
    ///
    /// Returns 0 on success, -1 when the descriptor is not the caller's,
    /// -2 when the caller is not the holder. Dropping the last lock level
    /// hands ownership to the oldest waiter, if any.
    pub(crate) fn mutex_unlock(&mut self, mutex_id: usize) -> isize {
        let prev = self.hal.set_int_level(IntLevel::Level3);
        let caller = self.current_idx();

        if !self.descriptor_refers_to(caller, mutex_id) {
            log::debug!("process {caller}: unlock({mutex_id}): not an open descriptor");
            self.hal.set_int_level(prev);
            return -1;
        }
        let slot = mutex_id - 1;
        if self.mutexes[slot].owner != Some(caller) {
            log::debug!("process {caller}: unlock({mutex_id}): caller does not hold it");
            self.hal.set_int_level(prev);
            return -2;
        }

        self.mutexes[slot].lock_count -= 1;
        if self.mutexes[slot].lock_count > 0 {
            self.hal.set_int_level(prev);
            return 0;
        }
        self.mutexes[slot].owner = None;
        if !self.mutexes[slot].waiters.is_empty() {
            self.hand_off(slot);
        }
        self.hal.set_int_level(prev);
        0
    }

    /// Close one of the caller's descriptors. Returns 0, or -1 when the
    /// descriptor is not the caller's.
    pub(crate) fn mutex_close(&mut self, mutex_id: usize) -> isize {
        let prev = self.hal.set_int_level(IntLevel::Level3);
        let caller = self.current_idx();

        let dslot = if mutex_id == 0 || mutex_id > MAX_MUTEXES {
            None
        } else {
            self.procs[caller].descriptor_slot(mutex_id)
        };
        let Some(dslot) = dslot else {
            log::debug!("process {caller}: close_mutex({mutex_id}): not an open descriptor");
            self.hal.set_int_level(prev);
            return -1;
        };

        self.close_descriptor(caller, dslot);
        self.hal.set_int_level(prev);
        0
    }

    /// Close every descriptor a process still holds. Used when the process
    /// is released.
    pub(crate) fn release_descriptors(&mut self, proc_idx: usize) {
        for dslot in 0..self.procs[proc_idx].descriptors.len() {
            if self.procs[proc_idx].descriptors[dslot] != 0 {
                self.close_descriptor(proc_idx, dslot);
            }
        }
    }

    /// Drop one descriptor of `proc_idx` and reclaim whatever that frees.
    ///
    /// A holder's close releases the lock outright. When the last
    /// descriptor goes away the slot is cleared and exactly one table-full
    /// waiter is woken to retry its creation; otherwise, if the mutex ended
    /// up free with processes still queued on it, ownership moves to the
    /// oldest waiter.
    fn close_descriptor(&mut self, proc_idx: usize, dslot: usize) {
        let mutex_id = self.procs[proc_idx].descriptors[dslot];
        debug_assert!(mutex_id != 0);
        let slot = mutex_id - 1;

        if self.mutexes[slot].owner == Some(proc_idx) {
            self.mutexes[slot].owner = None;
            self.mutexes[slot].lock_count = 0;
        }
        self.procs[proc_idx].descriptors[dslot] = 0;
        self.mutexes[slot].open_count -= 1;

        if self.mutexes[slot].open_count == 0 {
            log::info!(
                "mutex \"{}\" (id {mutex_id}) closed everywhere, freeing slot",
                self.mutexes[slot].name
            );
            self.mutexes[slot].clear();
            let woken = {
                let Kernel {
                    create_waiters,
                    procs,
                    ..
                } = self;
                create_waiters.pop_front(procs)
            };
            if let Some(idx) = woken {
                self.procs[idx].state = ProcessState::Ready;
                let Kernel { ready, procs, .. } = self;
                ready.push_back(procs, idx);
            }
        } else if self.mutexes[slot].owner.is_none() && !self.mutexes[slot].waiters.is_empty() {
            self.hand_off(slot);
        }
    }

    /// Move the oldest waiter of `slot` to the ready queue and make it the
    /// holder. Its lock count stays 0 until its retried `lock` completes.
    fn hand_off(&mut self, slot: usize) {
        let woken = {
            let Kernel { mutexes, procs, .. } = self;
            mutexes[slot].waiters.pop_front(procs)
        };
        if let Some(idx) = woken {
            self.procs[idx].state = ProcessState::Ready;
            {
                let Kernel { ready, procs, .. } = self;
                ready.push_back(procs, idx);
            }
            self.mutexes[slot].owner = Some(idx);
            log::debug!("mutex {}: ownership handed to process {idx}", slot + 1);
        }
    }

    /// Whether `mutex_id` is a valid id currently open in the process's
    /// descriptor table. Id 0 is rejected up front so the scan can never
    /// match a free descriptor slot.
    fn descriptor_refers_to(&self, proc_idx: usize, mutex_id: usize) -> bool {
        mutex_id != 0
            && mutex_id <= MAX_MUTEXES
            && self.procs[proc_idx].descriptor_slot(mutex_id).is_some()
    }
}
