/*
 * PCB Queues
 *
 * Every queue in the kernel (the ready queue, the sleep queue, the
 * mutex-table wait queue and each mutex's waiter queue) is a singly-linked
 * list threaded through the `next` field of the PCBs themselves, with head
 * and tail anchors held here. PCBs live in the fixed process table, so the
 * links are table indexes rather than pointers: `None` is the list
 * terminator and a PCB is a member of at most one queue at a time.
 *
 * Append and pop-head are O(1); removing an arbitrary member is a linear
 * scan. None of these operations are reentrant: callers run them with the
 * interrupt mask raised.
 */

use super::process::Pcb;

/// Head and tail anchors of one PCB queue.
#[derive(Debug, Clone, Copy)]
pub struct PcbQueue {
    head: Option<usize>,
    tail: Option<usize>,
}

impl PcbQueue {
    pub const fn new() -> Self {
        Self {
            head: None,
            tail: None,
        }
    }

    /// Index of the first queued PCB, if any.
    pub fn head(&self) -> Option<usize> {
        self.head
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Append `idx` at the tail. The PCB's previous link value is
    /// irrelevant; it must not currently be a member of any queue.
    pub fn push_back(&mut self, procs: &mut [Pcb], idx: usize) {
        procs[idx].next = None;
        match self.tail {
            Some(tail) => procs[tail].next = Some(idx),
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
    }

    /// Unlink and return the head. Popping the only element empties both
    /// anchors.
    pub fn pop_front(&mut self, procs: &mut [Pcb]) -> Option<usize> {
        let head = self.head?;
        self.head = procs[head].next.take();
        if self.head.is_none() {
            self.tail = None;
        }
        Some(head)
    }

    /// Unlink `idx` from anywhere in the queue. Linear scan; `idx` must be
    /// a member.
    pub fn remove(&mut self, procs: &mut [Pcb], idx: usize) {
        if self.head == Some(idx) {
            self.pop_front(procs);
            return;
        }
        let mut cursor = self.head;
        while let Some(at) = cursor {
            if procs[at].next == Some(idx) {
                procs[at].next = procs[idx].next.take();
                if self.tail == Some(idx) {
                    self.tail = Some(at);
                }
                return;
            }
            cursor = procs[at].next;
        }
    }

    /// Walk the queue front to back.
    pub fn iter<'a>(&self, procs: &'a [Pcb]) -> impl Iterator<Item = usize> + 'a {
        core::iter::successors(self.head, |&at| procs[at].next)
    }

    pub fn contains(&self, procs: &[Pcb], idx: usize) -> bool {
        self.iter(procs).any(|at| at == idx)
    }

    pub fn len(&self, procs: &[Pcb]) -> usize {
        self.iter(procs).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> [Pcb; 5] {
        core::array::from_fn(Pcb::new)
    }

    #[test]
    fn fifo_order() {
        let mut procs = table();
        let mut q = PcbQueue::new();
        q.push_back(&mut procs, 2);
        q.push_back(&mut procs, 0);
        q.push_back(&mut procs, 4);

        let order: alloc::vec::Vec<usize> = q.iter(&procs).collect();
        assert_eq!(order, [2, 0, 4]);
        assert_eq!(q.pop_front(&mut procs), Some(2));
        assert_eq!(q.pop_front(&mut procs), Some(0));
        assert_eq!(q.pop_front(&mut procs), Some(4));
        assert_eq!(q.pop_front(&mut procs), None);
        assert!(q.is_empty());
    }

    #[test]
    fn removing_only_element_clears_both_anchors() {
        let mut procs = table();
        let mut q = PcbQueue::new();
        q.push_back(&mut procs, 3);
        q.remove(&mut procs, 3);
        assert!(q.is_empty());

        // The anchors must be fully reset, not just the head.
        q.push_back(&mut procs, 1);
        assert_eq!(q.head(), Some(1));
        assert_eq!(q.len(&procs), 1);
    }

    #[test]
    fn remove_middle_and_tail() {
        let mut procs = table();
        let mut q = PcbQueue::new();
        for idx in [0, 1, 2, 3] {
            q.push_back(&mut procs, idx);
        }

        q.remove(&mut procs, 1);
        assert_eq!(q.iter(&procs).collect::<alloc::vec::Vec<_>>(), [0, 2, 3]);

        // Removing the tail must retarget the tail anchor so a later append
        // links after the new last element.
        q.remove(&mut procs, 3);
        q.push_back(&mut procs, 4);
        assert_eq!(q.iter(&procs).collect::<alloc::vec::Vec<_>>(), [0, 2, 4]);
    }

    #[test]
    fn reuse_after_pop() {
        let mut procs = table();
        let mut q = PcbQueue::new();
        q.push_back(&mut procs, 0);
        q.push_back(&mut procs, 1);
        let popped = q.pop_front(&mut procs).unwrap();
        q.push_back(&mut procs, popped);
        assert_eq!(q.iter(&procs).collect::<alloc::vec::Vec<_>>(), [1, 0]);
    }
}
