use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::{Expense, ExpenseId, Group, GroupId, GroupType, Member, MemberId, Split};

use super::MIGRATION_001_INITIAL;

/// Repository for persisting and querying people, groups and expenses.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given path.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // People
    // ========================

    /// Save a new person to the roster.
    pub async fn save_person(&self, person: &Member) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO people (id, name, email, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(person.id.to_string())
        .bind(&person.name)
        .bind(&person.email)
        .bind(person.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save person")?;
        Ok(())
    }

    /// Get a person by id.
    pub async fn get_person(&self, id: MemberId) -> Result<Option<Member>> {
        let row = sqlx::query("SELECT id, name, email, created_at FROM people WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch person")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_person(&row)?)),
            None => Ok(None),
        }
    }

    /// Get a person by name.
    pub async fn get_person_by_name(&self, name: &str) -> Result<Option<Member>> {
        let row = sqlx::query("SELECT id, name, email, created_at FROM people WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch person by name")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_person(&row)?)),
            None => Ok(None),
        }
    }

    /// List the whole roster.
    pub async fn list_people(&self) -> Result<Vec<Member>> {
        let rows = sqlx::query("SELECT id, name, email, created_at FROM people ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list people")?;

        rows.iter().map(Self::row_to_person).collect()
    }

    fn row_to_person(row: &sqlx::sqlite::SqliteRow) -> Result<Member> {
        let id_str: String = row.get("id");
        let created_at_str: String = row.get("created_at");

        Ok(Member {
            id: Uuid::parse_str(&id_str).context("Invalid person ID")?,
            name: row.get("name"),
            email: row.get("email"),
            created_at: parse_timestamp(&created_at_str)?,
        })
    }

    // ========================
    // Groups & membership
    // ========================

    /// Save a new group row. Members and expenses are stored separately.
    pub async fn save_group(&self, group: &Group) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO groups (id, name, description, group_type, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(group.id.to_string())
        .bind(&group.name)
        .bind(&group.description)
        .bind(group.group_type.as_str())
        .bind(group.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save group")?;
        Ok(())
    }

    /// Get a group row by name (members and expenses not loaded).
    pub async fn get_group_by_name(&self, name: &str) -> Result<Option<Group>> {
        let row = sqlx::query(
            "SELECT id, name, description, group_type, created_at FROM groups WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch group by name")?;

        match row {
            Some(row) => Ok(Some(Self::row_to_group(&row)?)),
            None => Ok(None),
        }
    }

    /// List all group rows, alphabetically.
    pub async fn list_groups(&self) -> Result<Vec<Group>> {
        let rows = sqlx::query(
            "SELECT id, name, description, group_type, created_at FROM groups ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list groups")?;

        rows.iter().map(Self::row_to_group).collect()
    }

    /// Delete a group with its memberships, expenses and splits.
    pub async fn delete_group(&self, id: GroupId) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        let group_id = id.to_string();

        sqlx::query(
            "DELETE FROM splits WHERE expense_id IN (SELECT id FROM expenses WHERE group_id = ?)",
        )
        .bind(&group_id)
        .execute(&mut *tx)
        .await
        .context("Failed to delete group splits")?;

        sqlx::query("DELETE FROM expenses WHERE group_id = ?")
            .bind(&group_id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete group expenses")?;

        sqlx::query("DELETE FROM group_members WHERE group_id = ?")
            .bind(&group_id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete group memberships")?;

        sqlx::query("DELETE FROM groups WHERE id = ?")
            .bind(&group_id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete group")?;

        tx.commit().await.context("Failed to commit group deletion")?;
        Ok(())
    }

    /// Attach a person to a group.
    pub async fn add_group_member(&self, group_id: GroupId, member_id: MemberId) -> Result<()> {
        sqlx::query("INSERT INTO group_members (group_id, member_id) VALUES (?, ?)")
            .bind(group_id.to_string())
            .bind(member_id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to add group member")?;
        Ok(())
    }

    /// Detach a person from a group. Expense history is left untouched.
    pub async fn remove_group_member(&self, group_id: GroupId, member_id: MemberId) -> Result<()> {
        sqlx::query("DELETE FROM group_members WHERE group_id = ? AND member_id = ?")
            .bind(group_id.to_string())
            .bind(member_id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to remove group member")?;
        Ok(())
    }

    /// Check whether a person belongs to a group.
    pub async fn is_group_member(&self, group_id: GroupId, member_id: MemberId) -> Result<bool> {
        let row = sqlx::query(
            "SELECT 1 AS present FROM group_members WHERE group_id = ? AND member_id = ?",
        )
        .bind(group_id.to_string())
        .bind(member_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to check group membership")?;
        Ok(row.is_some())
    }

    /// List a group's members, alphabetically.
    pub async fn list_group_members(&self, group_id: GroupId) -> Result<Vec<Member>> {
        let rows = sqlx::query(
            r#"
            SELECT p.id, p.name, p.email, p.created_at
            FROM people p
            JOIN group_members gm ON gm.member_id = p.id
            WHERE gm.group_id = ?
            ORDER BY p.name
            "#,
        )
        .bind(group_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list group members")?;

        rows.iter().map(Self::row_to_person).collect()
    }

    fn row_to_group(row: &sqlx::sqlite::SqliteRow) -> Result<Group> {
        let id_str: String = row.get("id");
        let group_type_str: String = row.get("group_type");
        let created_at_str: String = row.get("created_at");

        Ok(Group {
            id: Uuid::parse_str(&id_str).context("Invalid group ID")?,
            name: row.get("name"),
            description: row.get("description"),
            group_type: group_type_str
                .parse::<GroupType>()
                .map_err(|e| anyhow::anyhow!("Invalid group type: {}", e))?,
            members: Vec::new(),
            expenses: Vec::new(),
            created_at: parse_timestamp(&created_at_str)?,
        })
    }

    // ========================
    // Expenses & splits
    // ========================

    /// Save an expense with its splits in one transaction.
    pub async fn save_expense(&self, group_id: GroupId, expense: &Expense) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        sqlx::query(
            r#"
            INSERT INTO expenses (id, group_id, description, amount, date, paid_by, category, recorded_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(expense.id.to_string())
        .bind(group_id.to_string())
        .bind(&expense.description)
        .bind(expense.amount)
        .bind(expense.date.to_rfc3339())
        .bind(expense.paid_by.to_string())
        .bind(&expense.category)
        .bind(expense.recorded_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .context("Failed to save expense")?;

        for split in &expense.splits {
            sqlx::query("INSERT INTO splits (expense_id, member_id, amount) VALUES (?, ?, ?)")
                .bind(expense.id.to_string())
                .bind(split.member_id.to_string())
                .bind(split.amount)
                .execute(&mut *tx)
                .await
                .context("Failed to save split")?;
        }

        tx.commit().await.context("Failed to commit expense")?;
        Ok(())
    }

    /// Get one of a group's expenses by id, splits included.
    pub async fn get_expense(
        &self,
        group_id: GroupId,
        expense_id: ExpenseId,
    ) -> Result<Option<Expense>> {
        let row = sqlx::query(
            r#"
            SELECT id, description, amount, date, paid_by, category, recorded_at
            FROM expenses
            WHERE id = ? AND group_id = ?
            "#,
        )
        .bind(expense_id.to_string())
        .bind(group_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch expense")?;

        match row {
            Some(row) => {
                let mut expense = Self::row_to_expense(&row)?;
                expense.splits = self.list_splits(expense.id).await?;
                Ok(Some(expense))
            }
            None => Ok(None),
        }
    }

    /// Delete an expense and its splits.
    pub async fn delete_expense(&self, expense_id: ExpenseId) -> Result<()> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;
        let id = expense_id.to_string();

        sqlx::query("DELETE FROM splits WHERE expense_id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete splits")?;

        sqlx::query("DELETE FROM expenses WHERE id = ?")
            .bind(&id)
            .execute(&mut *tx)
            .await
            .context("Failed to delete expense")?;

        tx.commit().await.context("Failed to commit expense deletion")?;
        Ok(())
    }

    /// List a group's expenses, newest first, splits included.
    pub async fn list_expenses(&self, group_id: GroupId) -> Result<Vec<Expense>> {
        self.list_expenses_filtered(group_id, None, None, None, None, None)
            .await
    }

    /// List a group's expenses with optional filters, newest first.
    pub async fn list_expenses_filtered(
        &self,
        group_id: GroupId,
        category: Option<&str>,
        paid_by: Option<MemberId>,
        from_date: Option<DateTime<Utc>>,
        to_date: Option<DateTime<Utc>>,
        limit: Option<usize>,
    ) -> Result<Vec<Expense>> {
        let mut sql = String::from(
            "SELECT id, description, amount, date, paid_by, category, recorded_at \
             FROM expenses WHERE group_id = ?",
        );
        if category.is_some() {
            sql.push_str(" AND category = ?");
        }
        if paid_by.is_some() {
            sql.push_str(" AND paid_by = ?");
        }
        // RFC 3339 timestamps in UTC compare correctly as text.
        if from_date.is_some() {
            sql.push_str(" AND date >= ?");
        }
        if to_date.is_some() {
            sql.push_str(" AND date <= ?");
        }
        sql.push_str(" ORDER BY date DESC, recorded_at DESC");
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let mut query = sqlx::query(&sql).bind(group_id.to_string());
        if let Some(category) = category {
            query = query.bind(category.to_string());
        }
        if let Some(paid_by) = paid_by {
            query = query.bind(paid_by.to_string());
        }
        if let Some(from_date) = from_date {
            query = query.bind(from_date.to_rfc3339());
        }
        if let Some(to_date) = to_date {
            query = query.bind(to_date.to_rfc3339());
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .context("Failed to list expenses")?;

        let mut expenses = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut expense = Self::row_to_expense(row)?;
            expense.splits = self.list_splits(expense.id).await?;
            expenses.push(expense);
        }
        Ok(expenses)
    }

    async fn list_splits(&self, expense_id: ExpenseId) -> Result<Vec<Split>> {
        let rows = sqlx::query("SELECT member_id, amount FROM splits WHERE expense_id = ?")
            .bind(expense_id.to_string())
            .fetch_all(&self.pool)
            .await
            .context("Failed to list splits")?;

        rows.iter()
            .map(|row| {
                let member_id_str: String = row.get("member_id");
                Ok(Split {
                    member_id: Uuid::parse_str(&member_id_str).context("Invalid split member ID")?,
                    amount: row.get("amount"),
                })
            })
            .collect()
    }

    fn row_to_expense(row: &sqlx::sqlite::SqliteRow) -> Result<Expense> {
        let id_str: String = row.get("id");
        let date_str: String = row.get("date");
        let paid_by_str: String = row.get("paid_by");
        let recorded_at_str: String = row.get("recorded_at");

        Ok(Expense {
            id: Uuid::parse_str(&id_str).context("Invalid expense ID")?,
            description: row.get("description"),
            amount: row.get("amount"),
            date: parse_timestamp(&date_str)?,
            paid_by: Uuid::parse_str(&paid_by_str).context("Invalid payer ID")?,
            category: row.get("category"),
            splits: Vec::new(),
            recorded_at: parse_timestamp(&recorded_at_str)?,
        })
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)
        .context("Invalid timestamp")?
        .with_timezone(&Utc))
}
