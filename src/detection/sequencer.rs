/// Decides whether an inference completion may still be applied
///
/// Completions race each other, so a response is only applied when it is
/// newer than everything applied so far and newer than the last teardown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequenceGuard {
    highest_applied: u64,
    floor: u64,
}

impl SequenceGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `sequence` as applied if it is fresh
    pub fn accept(&mut self, sequence: u64) -> bool {
        if sequence <= self.highest_applied || sequence <= self.floor {
            return false;
        }
        self.highest_applied = sequence;
        true
    }

    /// Reject everything issued up to and including `sequence`
    pub fn invalidate_through(&mut self, sequence: u64) {
        self.floor = self.floor.max(sequence);
    }

    pub fn highest_applied(&self) -> u64 {
        self.highest_applied
    }

    pub fn floor(&self) -> u64 {
        self.floor
    }
}
