use std::time::Duration;

/// Exponential reconnect delay in whole seconds.
///
/// Starts at the floor, doubles on every `advance` and never leaves
/// `[floor, ceiling]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    current_secs: u64,
    floor_secs: u64,
    ceiling_secs: u64,
}

impl Backoff {
    pub const FLOOR_SECS: u64 = 1;
    pub const CEILING_SECS: u64 = 30;

    /// Create a backoff with custom bounds; a zero floor is raised to one second
    /// and the ceiling is never below the floor.
    pub fn new(floor_secs: u64, ceiling_secs: u64) -> Self {
        let floor_secs = floor_secs.max(1);
        Self {
            current_secs: floor_secs,
            floor_secs,
            ceiling_secs: ceiling_secs.max(floor_secs),
        }
    }

    pub const fn current_secs(&self) -> u64 {
        self.current_secs
    }

    pub const fn current(&self) -> Duration {
        Duration::from_secs(self.current_secs)
    }

    /// Double the delay, capped at the ceiling
    pub fn advance(&mut self) {
        self.current_secs = self
            .current_secs
            .saturating_mul(2)
            .min(self.ceiling_secs);
    }

    /// Back to the floor after a successful handshake
    pub fn reset(&mut self) {
        self.current_secs = self.floor_secs;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Self::FLOOR_SECS, Self::CEILING_SECS)
    }
}
