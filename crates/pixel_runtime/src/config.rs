//! Runner configuration.

use core::time::Duration;

// ─────────────────────────────────────────────────────────────────────────────
// FaultPolicy
// ─────────────────────────────────────────────────────────────────────────────

/// Decides whether a fault aborts the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FaultPolicy {
    /// Each component's `continue_on_error` flag decides (default).
    #[default]
    PerComponent,
    /// Every fault is logged and swallowed.
    ContinueAlways,
    /// Every fault aborts, regardless of `continue_on_error`.
    AbortAlways,
}

impl FaultPolicy {
    /// Returns `true` if a fault of a component with the given flag is swallowed.
    #[must_use]
    pub fn swallows(self, continue_on_error: bool) -> bool {
        match self {
            FaultPolicy::PerComponent => continue_on_error,
            FaultPolicy::ContinueAlways => true,
            FaultPolicy::AbortAlways => false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RunnerConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Configuration of a [`ProcessRunner`](crate::ProcessRunner).
///
/// # Example
///
/// ```
/// use core::time::Duration;
/// use pixel_runtime::{FaultPolicy, RunnerConfig};
///
/// let config = RunnerConfig::default()
///     .with_fault_policy(FaultPolicy::AbortAlways)
///     .with_max_steps(10_000)
///     .with_step_timeout(Duration::from_secs(30))
///     .with_reset_before_run(false);
///
/// assert_eq!(config.max_steps(), Some(10_000));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    fault_policy: FaultPolicy,
    max_steps: Option<usize>,
    step_timeout: Option<Duration>,
    reset_before_run: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            fault_policy: FaultPolicy::default(),
            max_steps: Some(Self::DEFAULT_MAX_STEPS),
            step_timeout: None,
            reset_before_run: true,
        }
    }
}

impl RunnerConfig {
    /// Default cap on processed steps, loops included.
    pub const DEFAULT_MAX_STEPS: usize = 100_000;

    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the fault policy.
    #[must_use]
    pub fn with_fault_policy(mut self, policy: FaultPolicy) -> Self {
        self.fault_policy = policy;
        self
    }

    /// Sets the maximum number of steps a run may process.
    #[must_use]
    pub fn with_max_steps(mut self, max: usize) -> Self {
        self.max_steps = Some(max);
        self
    }

    /// Removes the step cap.
    ///
    /// # Warning
    ///
    /// A loop that never ends will then run forever.
    #[must_use]
    pub fn without_step_limit(mut self) -> Self {
        self.max_steps = None;
        self
    }

    /// Fails any single hook or action that runs longer than `timeout`.
    #[must_use]
    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout = Some(timeout);
        self
    }

    /// Sets whether the tree is reset before each run.
    #[must_use]
    pub fn with_reset_before_run(mut self, reset: bool) -> Self {
        self.reset_before_run = reset;
        self
    }

    /// Returns the fault policy.
    #[must_use]
    pub fn fault_policy(&self) -> FaultPolicy {
        self.fault_policy
    }

    /// Returns the step cap.
    #[must_use]
    pub fn max_steps(&self) -> Option<usize> {
        self.max_steps
    }

    /// Returns the per-step timeout.
    #[must_use]
    pub fn step_timeout(&self) -> Option<Duration> {
        self.step_timeout
    }

    /// Returns whether the tree is reset before each run.
    #[must_use]
    pub fn reset_before_run(&self) -> bool {
        self.reset_before_run
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = RunnerConfig::default();
        assert_eq!(config.fault_policy(), FaultPolicy::PerComponent);
        assert_eq!(config.max_steps(), Some(RunnerConfig::DEFAULT_MAX_STEPS));
        assert_eq!(config.step_timeout(), None);
        assert!(config.reset_before_run());
    }

    #[test]
    fn builder_overrides() {
        let config = RunnerConfig::new()
            .with_fault_policy(FaultPolicy::ContinueAlways)
            .without_step_limit()
            .with_step_timeout(Duration::from_millis(5))
            .with_reset_before_run(false);

        assert_eq!(config.fault_policy(), FaultPolicy::ContinueAlways);
        assert_eq!(config.max_steps(), None);
        assert_eq!(config.step_timeout(), Some(Duration::from_millis(5)));
        assert!(!config.reset_before_run());
    }

    #[test]
    fn policy_swallows() {
        assert!(FaultPolicy::PerComponent.swallows(true));
        assert!(!FaultPolicy::PerComponent.swallows(false));
        assert!(FaultPolicy::ContinueAlways.swallows(false));
        assert!(!FaultPolicy::AbortAlways.swallows(true));
    }
}
