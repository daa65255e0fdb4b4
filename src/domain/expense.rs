use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Amount, DEFAULT_CATEGORY, Member, MemberId, SETTLEMENT_EPSILON};

pub type ExpenseId = Uuid;

/// The share one member owes toward a single expense. Non-negative by
/// convention, but nothing downstream assumes positivity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Split {
    pub member_id: MemberId,
    pub amount: Amount,
}

/// A shared expense: one member fronted the full amount, every split names
/// a member's share of it. Splits are expected to sum to the total, but a
/// mismatch is a data-quality issue for the caller, not an invariant here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    pub description: String,
    pub amount: Amount,
    pub date: DateTime<Utc>,
    /// The member who fronted the money
    pub paid_by: MemberId,
    pub category: String,
    pub splits: Vec<Split>,
    /// When we recorded this expense in the system
    pub recorded_at: DateTime<Utc>,
}

impl Expense {
    pub fn new(description: String, amount: Amount, paid_by: MemberId, date: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            description,
            amount,
            date,
            paid_by,
            category: DEFAULT_CATEGORY.to_string(),
            splits: Vec::new(),
            recorded_at: Utc::now(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_splits(mut self, splits: Vec<Split>) -> Self {
        self.splits = splits;
        self
    }

    /// Split the full amount evenly across the given members. Every share
    /// is amount/n at full precision; nothing is rounded here.
    pub fn with_equal_splits(self, members: &[Member]) -> Self {
        let share = if members.is_empty() {
            0.0
        } else {
            self.amount / members.len() as Amount
        };
        let splits = members
            .iter()
            .map(|m| Split {
                member_id: m.id,
                amount: share,
            })
            .collect();
        self.with_splits(splits)
    }

    pub fn split_total(&self) -> Amount {
        self.splits.iter().map(|s| s.amount).sum()
    }

    /// True when the splits do not add back up to the expense total. Such
    /// expenses are still accepted; the discrepancy shows up as a nonzero
    /// sum across all balances.
    pub fn has_split_mismatch(&self) -> bool {
        (self.split_total() - self.amount).abs() > SETTLEMENT_EPSILON
    }
}
