use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::domain::{
    Amount, Balances, Debt, Expense, ExpenseId, Group, GroupType, Member, MemberId, Split,
    compute_balances, simplify_debts, suggest_category,
};
use crate::storage::Repository;

use super::{AppError, CategoryReport, CategorySummary, GroupSummary, MemberStats, MonthlyFlow, MonthlyReport};

/// Application service providing high-level operations over groups, people
/// and expenses. This is the primary interface for any client (CLI, API,
/// import/export tooling).
pub struct SplitService {
    repo: Repository,
}

/// Result of recording an expense
pub struct ExpenseResult {
    pub expense: Expense,
    pub group_name: String,
    pub payer_name: String,
    /// Set when the recorded splits do not sum to the expense amount. The
    /// expense is stored anyway; the discrepancy will show up in balances.
    pub split_mismatch: bool,
}

/// One member's net position in a group
pub struct BalanceEntry {
    pub member_id: MemberId,
    pub name: String,
    pub balance: Amount,
}

/// A suggested settlement transfer with display names resolved
pub struct TransferSuggestion {
    pub debt: Debt,
    pub from_name: String,
    pub to_name: String,
}

/// Filter for querying a group's expenses
#[derive(Default)]
pub struct ExpenseFilter {
    pub category: Option<String>,
    pub paid_by: Option<String>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl SplitService {
    /// Create a new service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    // ========================
    // Group operations
    // ========================

    /// Create a new group.
    pub async fn create_group(
        &self,
        name: String,
        group_type: GroupType,
        description: Option<String>,
    ) -> Result<Group, AppError> {
        if self.repo.get_group_by_name(&name).await?.is_some() {
            return Err(AppError::GroupAlreadyExists(name));
        }

        let mut group = Group::new(name, group_type);
        if let Some(desc) = description {
            group = group.with_description(desc);
        }

        self.repo.save_group(&group).await?;
        Ok(group)
    }

    /// Get a group by name, hydrated with its members and expenses.
    pub async fn get_group(&self, name: &str) -> Result<Group, AppError> {
        let mut group = self
            .repo
            .get_group_by_name(name)
            .await?
            .ok_or_else(|| AppError::GroupNotFound(name.to_string()))?;

        group.members = self.repo.list_group_members(group.id).await?;
        group.expenses = self.repo.list_expenses(group.id).await?;
        Ok(group)
    }

    /// List all groups (shallow: members and expenses not loaded).
    pub async fn list_groups(&self) -> Result<Vec<Group>, AppError> {
        Ok(self.repo.list_groups().await?)
    }

    /// Delete a group and all of its expenses, splits and memberships.
    pub async fn delete_group(&self, name: &str) -> Result<Group, AppError> {
        let group = self
            .repo
            .get_group_by_name(name)
            .await?
            .ok_or_else(|| AppError::GroupNotFound(name.to_string()))?;
        self.repo.delete_group(group.id).await?;
        Ok(group)
    }

    // ========================
    // People & membership
    // ========================

    /// Add a person to the global roster.
    pub async fn add_person(
        &self,
        name: String,
        email: Option<String>,
    ) -> Result<Member, AppError> {
        if self.repo.get_person_by_name(&name).await?.is_some() {
            return Err(AppError::PersonAlreadyExists(name));
        }

        let mut person = Member::new(name);
        if let Some(email) = email {
            person = person.with_email(email);
        }

        self.repo.save_person(&person).await?;
        Ok(person)
    }

    /// Get a person from the roster by name.
    pub async fn get_person(&self, name: &str) -> Result<Member, AppError> {
        self.repo
            .get_person_by_name(name)
            .await?
            .ok_or_else(|| AppError::PersonNotFound(name.to_string()))
    }

    /// List the global people roster.
    pub async fn list_people(&self) -> Result<Vec<Member>, AppError> {
        Ok(self.repo.list_people().await?)
    }

    /// Attach a person from the roster to a group.
    pub async fn add_member(&self, group_name: &str, person_name: &str) -> Result<Member, AppError> {
        let group = self
            .repo
            .get_group_by_name(group_name)
            .await?
            .ok_or_else(|| AppError::GroupNotFound(group_name.to_string()))?;
        let person = self.get_person(person_name).await?;

        if self.repo.is_group_member(group.id, person.id).await? {
            return Err(AppError::AlreadyMember {
                person: person.name,
                group: group.name,
            });
        }

        self.repo.add_group_member(group.id, person.id).await?;
        Ok(person)
    }

    /// Detach a person from a group. Their recorded expenses and splits are
    /// kept; future balance runs book those under an id with no member
    /// entry, which the balance views render as "Unknown".
    pub async fn remove_member(&self, group_name: &str, person_name: &str) -> Result<Member, AppError> {
        let group = self
            .repo
            .get_group_by_name(group_name)
            .await?
            .ok_or_else(|| AppError::GroupNotFound(group_name.to_string()))?;
        let person = self.get_person(person_name).await?;

        if !self.repo.is_group_member(group.id, person.id).await? {
            return Err(AppError::NotAMember {
                person: person.name,
                group: group.name,
            });
        }

        self.repo.remove_group_member(group.id, person.id).await?;
        Ok(person)
    }

    // ========================
    // Expense operations
    // ========================

    /// Record an expense in a group. With `splits = None` the amount is
    /// divided evenly across the group's current members. With an explicit
    /// split list, every named person must be a group member. When no
    /// category is given, one is suggested from the description.
    pub async fn add_expense(
        &self,
        group_name: &str,
        description: String,
        amount: Amount,
        date: DateTime<Utc>,
        paid_by: &str,
        category: Option<String>,
        splits: Option<Vec<(String, Amount)>>,
    ) -> Result<ExpenseResult, AppError> {
        if amount <= 0.0 || !amount.is_finite() {
            return Err(AppError::InvalidAmount(
                "Amount must be positive".to_string(),
            ));
        }

        let group = self.get_group(group_name).await?;
        let payer = self.resolve_member(&group, paid_by)?.clone();

        let category = category.unwrap_or_else(|| suggest_category(&description).to_string());

        let mut expense =
            Expense::new(description, amount, payer.id, date).with_category(category);

        expense = match splits {
            Some(named_splits) => {
                let mut resolved = Vec::with_capacity(named_splits.len());
                for (name, share) in named_splits {
                    let member = self.resolve_member(&group, &name)?;
                    resolved.push(Split {
                        member_id: member.id,
                        amount: share,
                    });
                }
                expense.with_splits(resolved)
            }
            None => expense.with_equal_splits(&group.members),
        };

        let split_mismatch = expense.has_split_mismatch();
        self.repo.save_expense(group.id, &expense).await?;

        Ok(ExpenseResult {
            payer_name: payer.name.clone(),
            group_name: group.name,
            expense,
            split_mismatch,
        })
    }

    /// Delete an expense from a group.
    pub async fn delete_expense(
        &self,
        group_name: &str,
        expense_id: ExpenseId,
    ) -> Result<Expense, AppError> {
        let group = self
            .repo
            .get_group_by_name(group_name)
            .await?
            .ok_or_else(|| AppError::GroupNotFound(group_name.to_string()))?;

        let expense = self
            .repo
            .get_expense(group.id, expense_id)
            .await?
            .ok_or_else(|| AppError::ExpenseNotFound(expense_id.to_string()))?;

        self.repo.delete_expense(expense_id).await?;
        Ok(expense)
    }

    /// List a group's expenses, newest first, optionally filtered.
    pub async fn list_expenses(
        &self,
        group_name: &str,
        filter: ExpenseFilter,
    ) -> Result<Vec<Expense>, AppError> {
        let group = self
            .repo
            .get_group_by_name(group_name)
            .await?
            .ok_or_else(|| AppError::GroupNotFound(group_name.to_string()))?;

        let paid_by = match &filter.paid_by {
            Some(name) => Some(self.get_person(name).await?.id),
            None => None,
        };

        Ok(self
            .repo
            .list_expenses_filtered(
                group.id,
                filter.category.as_deref(),
                paid_by,
                filter.from_date,
                filter.to_date,
                filter.limit,
            )
            .await?)
    }

    // ========================
    // Balances & settlement
    // ========================

    /// Net balance per member, creditors first. Ids referenced by expenses
    /// but no longer in the member list show up as "Unknown".
    pub async fn group_balances(&self, group_name: &str) -> Result<Vec<BalanceEntry>, AppError> {
        let group = self.get_group(group_name).await?;
        let balances = compute_balances(&group.members, &group.expenses);
        Ok(self.named_balances(&group, &balances))
    }

    /// Suggested settlement transfers for a group.
    pub async fn settlement_plan(
        &self,
        group_name: &str,
    ) -> Result<Vec<TransferSuggestion>, AppError> {
        let group = self.get_group(group_name).await?;
        let balances = compute_balances(&group.members, &group.expenses);
        let debts = simplify_debts(&balances);

        Ok(debts
            .into_iter()
            .map(|debt| TransferSuggestion {
                from_name: group.member_name(debt.from).to_string(),
                to_name: group.member_name(debt.to).to_string(),
                debt,
            })
            .collect())
    }

    fn named_balances(&self, group: &Group, balances: &Balances) -> Vec<BalanceEntry> {
        let mut entries: Vec<BalanceEntry> = balances
            .iter()
            .map(|(&member_id, &balance)| BalanceEntry {
                member_id,
                name: group.member_name(member_id).to_string(),
                balance,
            })
            .collect();
        entries.sort_by(|a, b| {
            b.balance
                .partial_cmp(&a.balance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.name.cmp(&b.name))
        });
        entries
    }

    // ========================
    // Reports
    // ========================

    /// Spending overview: group total plus paid/share/net per member.
    pub async fn group_summary(&self, group_name: &str) -> Result<GroupSummary, AppError> {
        let group = self.get_group(group_name).await?;
        let balances = compute_balances(&group.members, &group.expenses);

        let mut paid: HashMap<MemberId, Amount> = HashMap::new();
        let mut share: HashMap<MemberId, Amount> = HashMap::new();
        for expense in &group.expenses {
            *paid.entry(expense.paid_by).or_insert(0.0) += expense.amount;
            for split in &expense.splits {
                *share.entry(split.member_id).or_insert(0.0) += split.amount;
            }
        }

        let mut members: Vec<MemberStats> = balances
            .iter()
            .map(|(&member_id, &net)| MemberStats {
                member_id,
                name: group.member_name(member_id).to_string(),
                paid: paid.get(&member_id).copied().unwrap_or(0.0),
                share: share.get(&member_id).copied().unwrap_or(0.0),
                net,
            })
            .collect();
        members.sort_by(|a, b| a.name.cmp(&b.name).then(a.member_id.cmp(&b.member_id)));

        Ok(GroupSummary {
            total_spent: group.total_spent(),
            expense_count: group.expenses.len(),
            group_name: group.name,
            members,
        })
    }

    /// Per-category spending breakdown over a date range.
    pub async fn category_report(
        &self,
        group_name: &str,
        from_date: DateTime<Utc>,
        to_date: DateTime<Utc>,
    ) -> Result<CategoryReport, AppError> {
        let group = self.get_group(group_name).await?;

        let mut totals: HashMap<String, (Amount, usize)> = HashMap::new();
        let mut total = 0.0;
        for expense in group
            .expenses
            .iter()
            .filter(|e| e.date >= from_date && e.date <= to_date)
        {
            let entry = totals.entry(expense.category.clone()).or_insert((0.0, 0));
            entry.0 += expense.amount;
            entry.1 += 1;
            total += expense.amount;
        }

        let mut categories: Vec<CategorySummary> = totals
            .into_iter()
            .map(|(category, (cat_total, count))| CategorySummary {
                category,
                total: cat_total,
                count,
                percentage: if total > 0.0 {
                    cat_total / total * 100.0
                } else {
                    0.0
                },
            })
            .collect();
        categories.sort_by(|a, b| {
            b.total
                .partial_cmp(&a.total)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.category.cmp(&b.category))
        });

        Ok(CategoryReport {
            group_name: group.name,
            from_date,
            to_date,
            categories,
            total,
        })
    }

    /// Month-by-month spending trend across the group's whole history.
    pub async fn monthly_report(&self, group_name: &str) -> Result<MonthlyReport, AppError> {
        let group = self.get_group(group_name).await?;

        let mut months: HashMap<String, (Amount, usize)> = HashMap::new();
        for expense in &group.expenses {
            let month = expense.date.format("%Y-%m").to_string();
            let entry = months.entry(month).or_insert((0.0, 0));
            entry.0 += expense.amount;
            entry.1 += 1;
        }

        let mut months: Vec<MonthlyFlow> = months
            .into_iter()
            .map(|(month, (total, count))| MonthlyFlow {
                month,
                total,
                count,
            })
            .collect();
        months.sort_by(|a, b| a.month.cmp(&b.month));

        Ok(MonthlyReport {
            group_name: group.name,
            months,
        })
    }

    fn resolve_member<'a>(&self, group: &'a Group, name: &str) -> Result<&'a Member, AppError> {
        group
            .members
            .iter()
            .find(|m| m.name == name)
            .ok_or_else(|| AppError::NotAMember {
                person: name.to_string(),
                group: group.name.clone(),
            })
    }
}
