use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Group not found: {0}")]
    GroupNotFound(String),

    #[error("Group already exists: {0}")]
    GroupAlreadyExists(String),

    #[error("Person not found: {0}")]
    PersonNotFound(String),

    #[error("Person already exists: {0}")]
    PersonAlreadyExists(String),

    #[error("{person} is already a member of {group}")]
    AlreadyMember { person: String, group: String },

    #[error("{person} is not a member of {group}")]
    NotAMember { person: String, group: String },

    #[error("Expense not found: {0}")]
    ExpenseNotFound(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}
