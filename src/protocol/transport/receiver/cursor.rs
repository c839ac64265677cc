//! Round-robin position over the receive mailboxes.
//!
//! The cursor outlives a single `read`: a call that returns as soon as its
//! packet completes leaves the cursor where it stopped, and the next call
//! resumes from there instead of mailbox 0. A busy low-index mailbox can
//! therefore never starve the higher ones.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
/// Index of the next receive mailbox to examine.
pub struct MailboxCursor {
    next: usize,
}

impl MailboxCursor {
    /// Cursor on mailbox 0.
    pub const fn new() -> Self {
        Self { next: 0 }
    }

    /// Mailbox the cursor points at, even past the end.
    #[inline]
    pub fn position(&self) -> usize {
        self.next
    }

    /// Start a new pass when the previous one went past the last mailbox.
    ///
    /// Returns `true` when the cursor wrapped back to mailbox 0.
    pub fn rewind_if_wrapped(&mut self, mailboxes: usize) -> bool {
        if self.next >= mailboxes {
            self.next = 0;
            true
        } else {
            false
        }
    }

    /// Mailbox to examine now, or `None` once the pass is over.
    #[inline]
    pub fn current(&self, mailboxes: usize) -> Option<usize> {
        (self.next < mailboxes).then_some(self.next)
    }

    /// Move to the following mailbox.
    #[inline]
    pub fn advance(&mut self) {
        self.next = self.next.saturating_add(1);
    }
}
