//! Per-stage USD cost budgets.
//!
//! The type makes invalid states (negative spend, spend exceeding the
//! ceiling without a distinguished error) unrepresentable, rather than
//! checking ad hoc at every call site.

use thiserror::Error;

/// An upper bound on USD cost for one invocation or one stage. Always
/// non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Budget(u64); // stored as hundredths of a cent (1e-4 USD) to stay Eq/Ord-friendly

impl Budget {
    /// Default per-stage ceiling: $100 for every stage.
    pub const DEFAULT_STAGE_USD: f64 = 100.0;

    #[must_use]
    pub fn from_usd(usd: f64) -> Self {
        Self((usd.max(0.0) * 10_000.0).round() as u64)
    }

    #[must_use]
    pub fn as_usd(self) -> f64 {
        self.0 as f64 / 10_000.0
    }

    /// Split this budget by a fraction in `[0.0, 1.0]`, e.g. recon's 70/30
    /// explore/synthesize split.
    #[must_use]
    pub fn fraction(self, fraction: f64) -> Self {
        Self(((self.0 as f64) * fraction.clamp(0.0, 1.0)).round() as u64)
    }
}

impl Default for Budget {
    fn default() -> Self {
        Self::from_usd(Self::DEFAULT_STAGE_USD)
    }
}

/// Raised by the LLM invocation primitive when a call would exceed its
/// ceiling; fatal to the current stage.
#[derive(Debug, Clone, Copy, Error)]
#[error("budget exceeded: spent ${spent_usd:.2} of ${budget_usd:.2}")]
pub struct BudgetExceeded {
    pub spent_usd: f64,
    pub budget_usd: f64,
}

#[derive(Debug, Error)]
pub enum BudgetError {
    #[error(transparent)]
    Exceeded(#[from] BudgetExceeded),
}
