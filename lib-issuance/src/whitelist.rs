//! Whitelist gate: per-participant contribution bounds.
//!
//! Presence in the map is the sole membership test; absence means the
//! participant may not contribute. Entries are overwritten on re-add and
//! never auto-removed. Operator gating happens at the sale layer.

use std::collections::HashMap;

use lib_types::{Address, Amount};
use serde::{Deserialize, Serialize};

use crate::errors::{IssuanceError, IssuanceResult};

/// Contribution bounds for one whitelisted participant
///
/// Both bounds apply to the participant's *cumulative* contribution, not to
/// individual payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributionBounds {
    /// Minimum cumulative contribution
    pub min: Amount,
    /// Maximum cumulative contribution
    pub max: Amount,
}

/// The whitelist registry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WhitelistGate {
    entries: HashMap<Address, ContributionBounds>,
}

impl WhitelistGate {
    /// Create an empty whitelist
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or overwrite a participant entry
    ///
    /// Requires `min ≤ max`.
    pub fn add(&mut self, participant: Address, min: Amount, max: Amount) -> IssuanceResult<()> {
        if min > max {
            return Err(IssuanceError::InvalidBounds { min, max });
        }
        self.entries.insert(participant, ContributionBounds { min, max });
        Ok(())
    }

    /// Check membership
    pub fn is_listed(&self, participant: &Address) -> bool {
        self.entries.contains_key(participant)
    }

    /// Bounds for a participant, `NotListed` if absent
    pub fn bounds(&self, participant: &Address) -> IssuanceResult<ContributionBounds> {
        self.entries
            .get(participant)
            .copied()
            .ok_or(IssuanceError::NotListed)
    }

    /// Number of listed participants
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the whitelist is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
