//! Zero-sum ledger accounts.
//!
//! ## Design
//!
//! Balances live in a dense `Vec<Amount>` indexed by arena `MemberId`, plus
//! two scalar aggregate accounts standing for the external grid (`import`)
//! and external buyers (`export`). Every credit inside the community is
//! matched by an equal debit, so at all times:
//!
//! ```text
//! sum(member balances) + import_balance + export_balance == 0
//! ```
//!
//! ## Canonical Enumeration
//!
//! [`LedgerAccounts::participants`] is the ONE enumeration of ledger
//! participants: members in ascending id order (each exactly once, the
//! community member is an ordinary arena member), then `Import`, then
//! `Export`. Verification, reset, and state encoding all walk this same
//! iterator. No other code path may rebuild "all participants" on its own;
//! two independent enumerations is how a participant gets counted twice and
//! a correct ledger gets reported as corrupt.

use crate::error::{EngineError, EngineResult};
use crate::ledger::BalanceDeltas;
use crate::types::{Amount, MemberId};

/// One participant slot in the canonical enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Participant {
    /// A registered member (active or not)
    Member(MemberId),
    /// Aggregate counterparty for energy bought from the grid
    Import,
    /// Aggregate counterparty for energy sold out of the community
    Export,
}

/// Dense member balances plus the two aggregate accounts.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LedgerAccounts {
    balances: Vec<Amount>,
    import_balance: Amount,
    export_balance: Amount,
}

impl LedgerAccounts {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure a member id has a balance slot, zero-initialized.
    ///
    /// Called whenever the registry allocates a new arena record so the
    /// dense vector stays in step with the arena.
    pub fn ensure_member(&mut self, member: MemberId) {
        let needed = member as usize + 1;
        if self.balances.len() < needed {
            self.balances.resize(needed, 0);
        }
    }

    /// Number of member slots currently tracked.
    pub fn member_slots(&self) -> usize {
        self.balances.len()
    }

    /// Balance of a member slot. Ids without a slot read zero.
    pub fn balance(&self, member: MemberId) -> Amount {
        self.balances.get(member as usize).copied().unwrap_or(0)
    }

    /// Aggregate balance owed to/by the external grid.
    pub fn import_balance(&self) -> Amount {
        self.import_balance
    }

    /// Aggregate balance owed to/by external buyers.
    pub fn export_balance(&self) -> Amount {
        self.export_balance
    }

    /// The canonical participant enumeration.
    ///
    /// Members ascending by id, then `Import`, then `Export`. Every slot
    /// appears exactly once.
    pub fn participants(&self) -> impl Iterator<Item = Participant> + '_ {
        (0..self.balances.len() as MemberId)
            .map(Participant::Member)
            .chain([Participant::Import, Participant::Export])
    }

    /// Balance of any participant slot.
    pub fn balance_of(&self, participant: Participant) -> Amount {
        match participant {
            Participant::Member(member) => self.balance(member),
            Participant::Import => self.import_balance,
            Participant::Export => self.export_balance,
        }
    }

    fn set_balance(&mut self, participant: Participant, value: Amount) {
        match participant {
            Participant::Member(member) => {
                self.ensure_member(member);
                self.balances[member as usize] = value;
            }
            Participant::Import => self.import_balance = value,
            Participant::Export => self.export_balance = value,
        }
    }

    /// Check the zero-sum property over the canonical enumeration.
    ///
    /// # Returns
    ///
    /// `(holds, observed_sum)` where `holds` requires the sum to equal
    /// zero with exact integer equality. A sum that overflows `i128` is
    /// itself a violation and reports the saturated bound.
    pub fn verify_zero_sum(&self) -> (bool, Amount) {
        let mut sum: Amount = 0;
        for participant in self.participants() {
            sum = match sum.checked_add(self.balance_of(participant)) {
                Some(next) => next,
                None => return (false, Amount::MAX),
            };
        }
        (sum == 0, sum)
    }

    /// Check that applying `deltas` keeps every balance representable.
    ///
    /// Runs the same staged arithmetic as [`apply`](Self::apply) without
    /// writing anything, so callers can validate a plan before committing
    /// other state.
    pub fn check_apply(&self, deltas: &BalanceDeltas) -> EngineResult<()> {
        for (member, delta) in deltas.members() {
            self.balance(member)
                .checked_add(delta)
                .ok_or(EngineError::ArithmeticOverflow {
                    context: "member balance",
                })?;
        }
        self.import_balance
            .checked_add(deltas.import())
            .ok_or(EngineError::ArithmeticOverflow {
                context: "import balance",
            })?;
        self.export_balance
            .checked_add(deltas.export())
            .ok_or(EngineError::ArithmeticOverflow {
                context: "export balance",
            })?;
        Ok(())
    }

    /// Apply a validated delta set in one step.
    ///
    /// Every resulting balance is computed and bounds-checked before the
    /// first write, so a failing apply leaves the ledger untouched.
    pub fn apply(&mut self, deltas: &BalanceDeltas) -> EngineResult<()> {
        let mut staged: Vec<(MemberId, Amount)> = Vec::with_capacity(deltas.member_count());
        for (member, delta) in deltas.members() {
            let next = self.balance(member).checked_add(delta).ok_or(
                EngineError::ArithmeticOverflow {
                    context: "member balance",
                },
            )?;
            staged.push((member, next));
        }
        let import_next = self.import_balance.checked_add(deltas.import()).ok_or(
            EngineError::ArithmeticOverflow {
                context: "import balance",
            },
        )?;
        let export_next = self.export_balance.checked_add(deltas.export()).ok_or(
            EngineError::ArithmeticOverflow {
                context: "export balance",
            },
        )?;

        for (member, next) in staged {
            self.set_balance(Participant::Member(member), next);
        }
        self.import_balance = import_next;
        self.export_balance = export_next;
        Ok(())
    }

    /// Zero every participant balance via the canonical enumeration.
    pub fn reset(&mut self) {
        let participants: Vec<Participant> = self.participants().collect();
        for participant in participants {
            self.set_balance(participant, 0);
        }
    }

    /// Append the canonical little-endian encoding of every balance.
    ///
    /// Participant order is the canonical enumeration, so two ledgers with
    /// equal state always encode to identical bytes.
    pub fn encode_state(&self, out: &mut Vec<u8>) {
        for participant in self.participants() {
            out.extend_from_slice(&self.balance_of(participant).to_le_bytes());
        }
    }

    #[cfg(test)]
    pub(crate) fn force_balance(&mut self, participant: Participant, value: Amount) {
        self.set_balance(participant, value);
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer(ledger: &mut LedgerAccounts, from: MemberId, to: MemberId, amount: Amount) {
        let mut deltas = BalanceDeltas::new();
        deltas.add_member(from, -amount).unwrap();
        deltas.add_member(to, amount).unwrap();
        assert!(deltas.is_balanced());
        ledger.apply(&deltas).unwrap();
    }

    #[test]
    fn test_empty_ledger_is_zero_sum() {
        let ledger = LedgerAccounts::new();
        assert_eq!(ledger.verify_zero_sum(), (true, 0));
        assert_eq!(ledger.member_slots(), 0);
        assert_eq!(ledger.balance(5), 0);
    }

    #[test]
    fn test_ensure_member_grows_dense() {
        let mut ledger = LedgerAccounts::new();
        ledger.ensure_member(3);
        assert_eq!(ledger.member_slots(), 4);
        for id in 0..4 {
            assert_eq!(ledger.balance(id), 0);
        }
        // Growing never shrinks
        ledger.ensure_member(1);
        assert_eq!(ledger.member_slots(), 4);
    }

    #[test]
    fn test_apply_keeps_zero_sum() {
        let mut ledger = LedgerAccounts::new();
        ledger.ensure_member(2);
        transfer(&mut ledger, 2, 0, 104_000_000);

        assert_eq!(ledger.balance(2), -104_000_000);
        assert_eq!(ledger.balance(0), 104_000_000);
        assert_eq!(ledger.verify_zero_sum(), (true, 0));
    }

    #[test]
    fn test_apply_with_aggregates() {
        let mut ledger = LedgerAccounts::new();
        ledger.ensure_member(1);

        // Consumer pays an imported batch; exporter sells abroad
        let mut deltas = BalanceDeltas::new();
        deltas.add_member(0, -30_000_000).unwrap();
        deltas.add_import(30_000_000).unwrap();
        deltas.add_member(1, 50_000_000).unwrap();
        deltas.add_export(-50_000_000).unwrap();
        assert!(deltas.is_balanced());

        ledger.apply(&deltas).unwrap();
        assert_eq!(ledger.import_balance(), 30_000_000);
        assert_eq!(ledger.export_balance(), -50_000_000);
        assert_eq!(ledger.verify_zero_sum(), (true, 0));
    }

    #[test]
    fn test_apply_failure_leaves_ledger_untouched() {
        let mut ledger = LedgerAccounts::new();
        ledger.ensure_member(1);
        transfer(&mut ledger, 0, 1, 10);
        let before = ledger.clone();

        // Second slot overflows after the first would have been written
        let mut deltas = BalanceDeltas::new();
        deltas.add_member(0, 5).unwrap();
        deltas.add_member(1, Amount::MAX).unwrap();

        let err = ledger.apply(&deltas).unwrap_err();
        assert_eq!(
            err,
            EngineError::ArithmeticOverflow {
                context: "member balance"
            }
        );
        assert_eq!(ledger, before);
    }

    #[test]
    fn test_check_apply_matches_apply() {
        let mut ledger = LedgerAccounts::new();
        ledger.ensure_member(1);
        ledger.force_balance(Participant::Member(1), Amount::MAX - 4);
        ledger.force_balance(Participant::Export, -(Amount::MAX - 4));

        let mut fits = BalanceDeltas::new();
        fits.add_member(1, 4).unwrap();
        fits.add_export(-4).unwrap();
        assert!(ledger.check_apply(&fits).is_ok());

        let mut overflows = BalanceDeltas::new();
        overflows.add_member(1, 5).unwrap();
        overflows.add_export(-5).unwrap();
        let err = ledger.check_apply(&overflows).unwrap_err();
        assert_eq!(
            err,
            EngineError::ArithmeticOverflow {
                context: "member balance"
            }
        );
        // A dry run writes nothing
        assert_eq!(ledger.balance(1), Amount::MAX - 4);
    }

    #[test]
    fn test_verify_detects_corruption() {
        let mut ledger = LedgerAccounts::new();
        ledger.ensure_member(0);
        ledger.force_balance(Participant::Member(0), 7);

        let (holds, observed) = ledger.verify_zero_sum();
        assert!(!holds);
        assert_eq!(observed, 7);
    }

    #[test]
    fn test_participants_enumeration_order() {
        let mut ledger = LedgerAccounts::new();
        ledger.ensure_member(2);

        let order: Vec<Participant> = ledger.participants().collect();
        assert_eq!(
            order,
            vec![
                Participant::Member(0),
                Participant::Member(1),
                Participant::Member(2),
                Participant::Import,
                Participant::Export,
            ]
        );
    }

    #[test]
    fn test_reset_zeroes_every_slot() {
        let mut ledger = LedgerAccounts::new();
        ledger.ensure_member(1);
        let mut deltas = BalanceDeltas::new();
        deltas.add_member(0, -80).unwrap();
        deltas.add_member(1, 30).unwrap();
        deltas.add_import(100).unwrap();
        deltas.add_export(-50).unwrap();
        ledger.apply(&deltas).unwrap();

        ledger.reset();

        for participant in ledger.participants().collect::<Vec<_>>() {
            assert_eq!(ledger.balance_of(participant), 0);
        }
        assert_eq!(ledger.verify_zero_sum(), (true, 0));
        // Slots survive the reset; only values are cleared
        assert_eq!(ledger.member_slots(), 2);
    }

    #[test]
    fn test_encode_state_is_deterministic() {
        let mut a = LedgerAccounts::new();
        let mut b = LedgerAccounts::new();
        for ledger in [&mut a, &mut b] {
            ledger.ensure_member(1);
            transfer(ledger, 0, 1, 42);
        }

        let mut bytes_a = Vec::new();
        let mut bytes_b = Vec::new();
        a.encode_state(&mut bytes_a);
        b.encode_state(&mut bytes_b);

        // 2 members + import + export, 16 bytes each
        assert_eq!(bytes_a.len(), 4 * 16);
        assert_eq!(bytes_a, bytes_b);

        let mut c = b.clone();
        transfer(&mut c, 0, 1, 1);
        let mut bytes_c = Vec::new();
        c.encode_state(&mut bytes_c);
        assert_ne!(bytes_a, bytes_c);
    }
}
