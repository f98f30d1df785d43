/// Confirmation step in front of cancellation.
///
/// The gate only records whether the user is being asked; what happens on
/// confirmation lives in `update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CancelGate {
    open: bool,
}

impl CancelGate {
    pub fn is_open(&self) -> bool {
        self.open
    }

    pub(crate) fn open(&mut self) -> bool {
        let changed = !self.open;
        self.open = true;
        changed
    }

    /// Closes the gate, returning whether it was open.
    pub(crate) fn close(&mut self) -> bool {
        std::mem::take(&mut self.open)
    }
}
