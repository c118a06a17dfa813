use parking_lot::Mutex;

/// Orders overlapping loads of the same state.
///
/// Every load draws a ticket when it starts. A load may only commit if no load
/// that started after it has committed already.
#[derive(Debug, Default)]
pub(crate) struct Tickets {
    inner: Mutex<TicketState>,
}

#[derive(Debug, Default)]
struct TicketState {
    issued: u64,
    committed: u64,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub(crate) struct Ticket(u64);

impl Tickets {
    pub(crate) fn issue(&self) -> Ticket {
        let mut state = self.inner.lock();
        state.issued += 1;
        Ticket(state.issued)
    }

    /// Marks `ticket` as committed and returns whether it is still current.
    pub(crate) fn try_commit(&self, ticket: Ticket) -> bool {
        let mut state = self.inner.lock();
        if ticket.0 <= state.committed {
            return false;
        }
        state.committed = ticket.0;
        true
    }

    /// The most recently issued ticket. Any load holding an equal or older
    /// ticket started before this call.
    pub(crate) fn latest(&self) -> Ticket {
        Ticket(self.inner.lock().issued)
    }

    /// Whether `ticket` is the latest one issued.
    pub(crate) fn is_latest(&self, ticket: Ticket) -> bool {
        self.inner.lock().issued == ticket.0
    }
}
