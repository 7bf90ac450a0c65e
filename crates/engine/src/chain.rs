//! Well-known concept ids for the disbursement chain and its treasury
//! counterparts.
//!
//! The five named chain steps and the temporal projections write to fixed
//! concept ids. Defaults match the standard catalog layout; deployments with
//! a different numbering override them through settings.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// Fixed concept ids the engine owns.
///
/// Every id listed here is write-protected: the engine computes these values
/// and a direct user write is rejected exactly like a formula-derived
/// concept.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConcepts {
    /// Inclusive id range of the daily disbursement movement concepts.
    pub movement_range_lo: i32,
    pub movement_range_hi: i32,

    // Disbursement area.
    pub movement_subtotal: i32,
    pub prior_day_balance: i32,
    pub balance_difference: i32,
    pub opening_subtotal: i32,
    pub treasury_movement_mirror: i32,
    pub total_bank_balance: i32,
    /// Base concept: the bank-reported balance. Not engine-owned.
    pub bank_balance: i32,

    // Treasury area.
    /// Source of the cross-area mirror (read, not written).
    pub treasury_subtotal: i32,
    /// Counter-mirror kept equal to `movement_subtotal` (Phase D).
    pub treasury_window_mirror: i32,
    pub opening_balance: i32,
    /// Source of the treasury projection (read, not written).
    pub closing_balance: i32,
}

impl Default for ChainConcepts {
    fn default() -> Self {
        Self {
            movement_range_lo: 50,
            movement_range_hi: 99,
            movement_subtotal: 101,
            prior_day_balance: 100,
            balance_difference: 105,
            opening_subtotal: 102,
            treasury_movement_mirror: 103,
            total_bank_balance: 104,
            bank_balance: 106,
            treasury_subtotal: 110,
            treasury_window_mirror: 111,
            opening_balance: 112,
            closing_balance: 113,
        }
    }
}

impl ChainConcepts {
    /// The inclusive id range summed by the movement subtotal step.
    pub fn movement_range(&self) -> RangeInclusive<i32> {
        self.movement_range_lo..=self.movement_range_hi
    }

    /// Returns `true` for ids whose value only the engine may write.
    pub fn is_engine_owned(&self, concept_id: i32) -> bool {
        [
            self.movement_subtotal,
            self.prior_day_balance,
            self.balance_difference,
            self.opening_subtotal,
            self.treasury_movement_mirror,
            self.total_bank_balance,
            self.treasury_window_mirror,
            self.opening_balance,
        ]
        .contains(&concept_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_outputs_are_engine_owned() {
        let chain = ChainConcepts::default();
        assert!(chain.is_engine_owned(chain.movement_subtotal));
        assert!(chain.is_engine_owned(chain.total_bank_balance));
        assert!(chain.is_engine_owned(chain.opening_balance));
    }

    #[test]
    fn sources_stay_writable() {
        let chain = ChainConcepts::default();
        assert!(!chain.is_engine_owned(chain.bank_balance));
        assert!(!chain.is_engine_owned(chain.treasury_subtotal));
        assert!(!chain.is_engine_owned(chain.closing_balance));
        assert!(!chain.is_engine_owned(55));
    }
}
