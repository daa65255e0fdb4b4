use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Expense, Member, MemberId};

pub type GroupId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupType {
    /// Flatmates sharing rent and recurring bills
    Apartment,
    /// One-off travel with a shared pot
    Trip,
    Other,
}

impl GroupType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupType::Apartment => "apartment",
            GroupType::Trip => "trip",
            GroupType::Other => "other",
        }
    }
}

impl std::str::FromStr for GroupType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "apartment" => Ok(GroupType::Apartment),
            "trip" => Ok(GroupType::Trip),
            "other" => Ok(GroupType::Other),
            other => Err(format!("unknown group type '{}'", other)),
        }
    }
}

impl std::fmt::Display for GroupType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A set of members sharing a pool of expenses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub description: String,
    pub group_type: GroupType,
    pub members: Vec<Member>,
    pub expenses: Vec<Expense>,
    pub created_at: DateTime<Utc>,
}

impl Group {
    pub fn new(name: String, group_type: GroupType) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            description: String::new(),
            group_type,
            members: Vec::new(),
            expenses: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn member(&self, id: MemberId) -> Option<&Member> {
        self.members.iter().find(|m| m.id == id)
    }

    /// Display name for a member id, falling back to "Unknown" for ids that
    /// no longer map to a current member (e.g. removed after their expenses
    /// were recorded).
    pub fn member_name(&self, id: MemberId) -> &str {
        self.member(id).map(|m| m.name.as_str()).unwrap_or("Unknown")
    }

    pub fn total_spent(&self) -> f64 {
        self.expenses.iter().map(|e| e.amount).sum()
    }
}
