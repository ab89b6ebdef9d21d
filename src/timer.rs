use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Turn,
    Vote,
}

/// The two phase timers of a room. At most one is armed at a time.
#[derive(Debug, Default)]
pub struct PhaseTimers {
    armed: Option<(TimerKind, JoinHandle<()>)>,
}

impl PhaseTimers {
    /// Arms `kind`, cancelling whatever was armed before.
    pub fn arm(&mut self, kind: TimerKind, handle: JoinHandle<()>) {
        self.cancel();
        self.armed = Some((kind, handle));
    }

    /// Aborts the armed timer. Safe to call when nothing is armed or the
    /// task already finished.
    pub fn cancel(&mut self) {
        if let Some((_, handle)) = self.armed.take() {
            handle.abort();
        }
    }

    /// Forgets the handle without aborting it. A firing timer calls this on
    /// itself so arming the next phase does not abort the running callback.
    pub fn release(&mut self, kind: TimerKind) {
        if self.armed_kind() == Some(kind) {
            self.armed = None;
        }
    }

    pub fn armed_kind(&self) -> Option<TimerKind> {
        self.armed.as_ref().map(|(kind, _)| *kind)
    }
}

impl Drop for PhaseTimers {
    fn drop(&mut self) {
        self.cancel();
    }
}
