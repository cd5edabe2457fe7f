//! Planned balance movements for one operation.
//!
//! A `BalanceDeltas` is the money half of a compute-then-commit plan: the
//! clearing code accumulates per-participant deltas here, checks that they
//! balance to exactly zero, and only then hands them to the ledger to apply
//! in one step.

use std::collections::BTreeMap;

use crate::error::{EngineError, EngineResult};
use crate::types::{Amount, MemberId};

/// Accumulated signed balance deltas, one slot per touched participant.
///
/// Member deltas live in a `BTreeMap` so iteration is always in ascending
/// id order, matching the ledger's canonical participant enumeration.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BalanceDeltas {
    members: BTreeMap<MemberId, Amount>,
    import: Amount,
    export: Amount,
}

impl BalanceDeltas {
    /// Start an empty delta set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulate a delta for a member, failing on overflow.
    pub fn add_member(&mut self, member: MemberId, delta: Amount) -> EngineResult<()> {
        let slot = self.members.entry(member).or_insert(0);
        *slot = slot
            .checked_add(delta)
            .ok_or(EngineError::ArithmeticOverflow {
                context: "member delta",
            })?;
        Ok(())
    }

    /// Accumulate a delta on the import aggregate account.
    pub fn add_import(&mut self, delta: Amount) -> EngineResult<()> {
        self.import = self
            .import
            .checked_add(delta)
            .ok_or(EngineError::ArithmeticOverflow {
                context: "import delta",
            })?;
        Ok(())
    }

    /// Accumulate a delta on the export aggregate account.
    pub fn add_export(&mut self, delta: Amount) -> EngineResult<()> {
        self.export = self
            .export
            .checked_add(delta)
            .ok_or(EngineError::ArithmeticOverflow {
                context: "export delta",
            })?;
        Ok(())
    }

    /// Member deltas in ascending id order.
    pub fn members(&self) -> impl Iterator<Item = (MemberId, Amount)> + '_ {
        self.members.iter().map(|(&id, &delta)| (id, delta))
    }

    /// Number of member slots touched.
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Import aggregate delta.
    pub fn import(&self) -> Amount {
        self.import
    }

    /// Export aggregate delta.
    pub fn export(&self) -> Amount {
        self.export
    }

    /// True if no participant is touched.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty() && self.import == 0 && self.export == 0
    }

    /// Exact sum across every touched participant, `None` on overflow.
    pub fn sum(&self) -> Option<Amount> {
        let mut total: Amount = 0;
        for (_, delta) in self.members() {
            total = total.checked_add(delta)?;
        }
        total = total.checked_add(self.import)?;
        total.checked_add(self.export)
    }

    /// A delta set is balanced when it sums to exactly zero.
    ///
    /// Every committed operation moves money between participants without
    /// creating or destroying any, so an unbalanced plan is a bug caught
    /// before the commit.
    pub fn is_balanced(&self) -> bool {
        self.sum() == Some(0)
    }
}
