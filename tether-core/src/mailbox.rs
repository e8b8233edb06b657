//! Single-slot handoff between a subscription handler and the stepping loop.
use log::trace;
use std::sync::{Mutex, MutexGuard, PoisonError};

struct Slot<T> {
    item: Option<T>,
    closed: bool,
    n_deposits: usize,
    n_overwritten: usize,
    n_discarded: usize,
}

/// Counters of a [`Mailbox`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MailboxStat {
    /// Items accepted into the slot.
    pub n_deposits: usize,

    /// Items replaced by a newer one before being taken.
    pub n_overwritten: usize,

    /// Items arriving after [`Mailbox::close`].
    pub n_discarded: usize,
}

/// A single-slot, last-write-wins mailbox.
///
/// [`Mailbox::deposit`] is called from the transport's execution context and
/// [`Mailbox::try_take`] from the stepping loop. Both hold the same lock, so
/// check-and-clear is atomic and at most one item is held at any instant.
/// An item that is not taken before the next deposit is lost.
///
/// Share it between contexts with [`std::sync::Arc`].
pub struct Mailbox<T> {
    slot: Mutex<Slot<T>>,
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Mailbox<T> {
    /// Constructs an empty, open mailbox.
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                item: None,
                closed: false,
                n_deposits: 0,
                n_overwritten: 0,
                n_discarded: 0,
            }),
        }
    }

    // A panicking handler must not take the stepping loop down with it.
    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Puts an item into the slot, replacing any item not yet taken.
    ///
    /// Never blocks on the consumer and never fails. After [`Mailbox::close`]
    /// the item is dropped.
    pub fn deposit(&self, item: T) {
        let mut slot = self.lock();
        if slot.closed {
            slot.n_discarded += 1;
            trace!("Discarded item deposited into a closed mailbox");
            return;
        }
        if slot.item.replace(item).is_some() {
            slot.n_overwritten += 1;
            trace!("Overwrote an item not yet taken");
        }
        slot.n_deposits += 1;
    }

    /// Takes the item out of the slot, if any.
    pub fn try_take(&self) -> Option<T> {
        self.lock().item.take()
    }

    /// Drops the item in the slot, if any, and reopens the mailbox.
    pub fn clear(&self) {
        let mut slot = self.lock();
        slot.item = None;
        slot.closed = false;
    }

    /// Drops the item in the slot and discards all later deposits.
    pub fn close(&self) {
        let mut slot = self.lock();
        slot.item = None;
        slot.closed = true;
    }

    /// Returns `true` if the mailbox has been closed.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Returns the counters.
    pub fn stat(&self) -> MailboxStat {
        let slot = self.lock();
        MailboxStat {
            n_deposits: slot.n_deposits,
            n_overwritten: slot.n_overwritten,
            n_discarded: slot.n_discarded,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_last_write_wins() {
        let mailbox = Mailbox::new();
        mailbox.deposit("a1");
        mailbox.deposit("a2");
        assert_eq!(mailbox.try_take(), Some("a2"));
        assert_eq!(mailbox.try_take(), None);

        let stat = mailbox.stat();
        assert_eq!(stat.n_deposits, 2);
        assert_eq!(stat.n_overwritten, 1);
    }

    #[test]
    fn test_empty_take_does_not_block() {
        let mailbox = Mailbox::<u32>::new();
        assert_eq!(mailbox.try_take(), None);
        assert_eq!(mailbox.try_take(), None);
    }

    #[test]
    fn test_close_discards_late_deposits() {
        let mailbox = Mailbox::new();
        mailbox.deposit(1);
        mailbox.close();
        assert!(mailbox.is_closed());
        assert_eq!(mailbox.try_take(), None);

        mailbox.deposit(2);
        assert_eq!(mailbox.try_take(), None);
        assert_eq!(mailbox.stat().n_discarded, 1);

        mailbox.clear();
        mailbox.deposit(3);
        assert_eq!(mailbox.try_take(), Some(3));
    }

    #[test]
    fn test_concurrent_deposits_hold_one_item() {
        let mailbox = Arc::new(Mailbox::new());
        let n_threads = 4;
        let n_items = 500;

        let producers = (0..n_threads)
            .map(|t| {
                let mailbox = mailbox.clone();
                std::thread::spawn(move || {
                    for i in 0..n_items {
                        mailbox.deposit((t, i));
                    }
                })
            })
            .collect::<Vec<_>>();

        let mut taken = 0;
        let mut last_seen = vec![None; n_threads];
        while producers.iter().any(|h| !h.is_finished()) {
            if let Some((t, i)) = mailbox.try_take() {
                // Items of one producer come out in deposit order.
                if let Some(prev) = last_seen[t] {
                    assert!(i > prev);
                }
                last_seen[t] = Some(i);
                taken += 1;
            }
        }
        for h in producers {
            h.join().unwrap();
        }
        if mailbox.try_take().is_some() {
            taken += 1;
        }
        assert_eq!(mailbox.try_take(), None);

        let stat = mailbox.stat();
        assert_eq!(stat.n_deposits, n_threads * n_items);
        assert_eq!(stat.n_deposits, taken + stat.n_overwritten);
    }
}
