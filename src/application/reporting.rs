use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Amount, MemberId};

/// Spending overview for one group: total pot plus paid/share/net per
/// member. Net is paid minus share, i.e. the member's resolver balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSummary {
    pub group_name: String,
    pub total_spent: Amount,
    pub expense_count: usize,
    pub members: Vec<MemberStats>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberStats {
    pub member_id: MemberId,
    pub name: String,
    pub paid: Amount,
    pub share: Amount,
    pub net: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryReport {
    pub group_name: String,
    pub from_date: DateTime<Utc>,
    pub to_date: DateTime<Utc>,
    pub categories: Vec<CategorySummary>,
    pub total: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: String,
    pub total: Amount,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyReport {
    pub group_name: String,
    pub months: Vec<MonthlyFlow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyFlow {
    /// Calendar month in "YYYY-MM" form; sorts chronologically as text.
    pub month: String,
    pub total: Amount,
    pub count: usize,
}
