use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::application::{ExpenseFilter, SplitService};
use crate::domain::{Amount, GroupType, format_amount, format_signed_amount, parse_amount};

/// Splitledger - Shared Expense Tracker
#[derive(Parser)]
#[command(name = "splitledger")]
#[command(about = "A local-first tracker for group expenses and settlements")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "splitledger.db")]
    pub database: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Group management commands
    #[command(subcommand)]
    Group(GroupCommands),

    /// People roster commands
    #[command(subcommand)]
    Person(PersonCommands),

    /// Group membership commands
    #[command(subcommand)]
    Member(MemberCommands),

    /// Expense commands
    #[command(subcommand)]
    Expense(ExpenseCommands),

    /// Show net balances for a group
    Balance {
        /// Group name
        group: String,
    },

    /// Suggest settlement transfers for a group
    Settle {
        /// Group name
        group: String,
    },

    /// Generate reports and analytics
    #[command(subcommand)]
    Report(ReportCommands),

    /// Export group data to CSV or JSON
    Export {
        /// Group name
        group: String,

        /// What to export: expenses, balances, full
        export_type: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Import expenses from CSV
    Import {
        /// Group name
        group: String,

        /// Input file (stdin if omitted)
        #[arg(short, long)]
        input: Option<String>,

        /// Preview without importing
        #[arg(long)]
        dry_run: bool,

        /// Create roster entries and memberships for unknown names
        #[arg(long)]
        create_members: bool,
    },
}

#[derive(Subcommand)]
pub enum GroupCommands {
    /// Create a new group
    Create {
        /// Group name (must be unique)
        name: String,

        /// Group type: apartment, trip, other
        #[arg(short = 't', long = "type", default_value = "other")]
        group_type: String,

        /// Description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// List all groups
    List,

    /// Show detailed group information
    Show {
        /// Group name
        name: String,
    },

    /// Delete a group and all of its expenses
    Delete {
        /// Group name
        name: String,
    },
}

#[derive(Subcommand)]
pub enum PersonCommands {
    /// Add a person to the global roster
    Add {
        /// Person name (must be unique)
        name: String,

        /// Email address
        #[arg(short, long)]
        email: Option<String>,
    },

    /// List the roster
    List,
}

#[derive(Subcommand)]
pub enum MemberCommands {
    /// Add a person to a group
    Add {
        /// Group name
        group: String,

        /// Person name
        person: String,
    },

    /// Remove a person from a group (their expense history is kept)
    Remove {
        /// Group name
        group: String,

        /// Person name
        person: String,
    },
}

#[derive(Subcommand)]
pub enum ExpenseCommands {
    /// Record an expense in a group
    Add {
        /// Group name
        group: String,

        /// Amount paid (e.g., "45.00" or "45")
        amount: String,

        /// What the expense was for
        description: String,

        /// Who paid (person name)
        #[arg(short, long)]
        paid_by: String,

        /// Category (suggested from the description if omitted)
        #[arg(short, long)]
        category: Option<String>,

        /// Date of the expense (YYYY-MM-DD, defaults to now)
        #[arg(long)]
        date: Option<String>,

        /// Explicit share as name:amount (repeatable; omit for an equal split)
        #[arg(short, long = "split")]
        splits: Vec<String>,
    },

    /// List a group's expenses
    List {
        /// Group name
        group: String,

        /// Filter by category
        #[arg(long)]
        category: Option<String>,

        /// Filter by payer name
        #[arg(long)]
        paid_by: Option<String>,

        /// Filter from date (YYYY-MM-DD)
        #[arg(long)]
        from_date: Option<String>,

        /// Filter to date (YYYY-MM-DD)
        #[arg(long)]
        to_date: Option<String>,

        /// Maximum number of expenses to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Delete an expense
    Delete {
        /// Group name
        group: String,

        /// Expense ID
        id: String,
    },
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Group totals and per-member paid/share/net
    Summary {
        /// Group name
        group: String,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Category spending breakdown
    Spending {
        /// Group name
        group: String,

        /// Start date (YYYY-MM-DD, defaults to start of current month)
        #[arg(long)]
        from: Option<String>,

        /// End date (YYYY-MM-DD, defaults to now)
        #[arg(long)]
        to: Option<String>,

        /// Output format: table, json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Month-by-month spending trend
    Monthly {
        /// Group name
        group: String,

        /// Output format: table, json, csv
        #[arg(long, default_value = "table")]
        format: String,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Init => {
                SplitService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Group(group_cmd) => {
                let service = SplitService::connect(&self.database).await?;
                run_group_command(&service, group_cmd).await?;
            }

            Commands::Person(person_cmd) => {
                let service = SplitService::connect(&self.database).await?;
                run_person_command(&service, person_cmd).await?;
            }

            Commands::Member(member_cmd) => {
                let service = SplitService::connect(&self.database).await?;
                run_member_command(&service, member_cmd).await?;
            }

            Commands::Expense(expense_cmd) => {
                let service = SplitService::connect(&self.database).await?;
                run_expense_command(&service, expense_cmd, self.verbose).await?;
            }

            Commands::Balance { group } => {
                let service = SplitService::connect(&self.database).await?;
                run_balance_command(&service, &group).await?;
            }

            Commands::Settle { group } => {
                let service = SplitService::connect(&self.database).await?;
                run_settle_command(&service, &group).await?;
            }

            Commands::Report(report_cmd) => {
                let service = SplitService::connect(&self.database).await?;
                run_report_command(&service, report_cmd).await?;
            }

            Commands::Export {
                group,
                export_type,
                output,
            } => {
                let service = SplitService::connect(&self.database).await?;
                run_export_command(&service, &group, &export_type, output.as_deref()).await?;
            }

            Commands::Import {
                group,
                input,
                dry_run,
                create_members,
            } => {
                let service = SplitService::connect(&self.database).await?;
                run_import_command(&service, &group, input.as_deref(), dry_run, create_members)
                    .await?;
            }
        }

        Ok(())
    }
}

async fn run_group_command(service: &SplitService, cmd: GroupCommands) -> Result<()> {
    match cmd {
        GroupCommands::Create {
            name,
            group_type,
            description,
        } => {
            let gt: GroupType = group_type.parse().map_err(|e| {
                anyhow::anyhow!(
                    "Invalid group type '{}'. Valid types: apartment, trip, other. Error: {}",
                    group_type,
                    e
                )
            })?;

            let group = service.create_group(name, gt, description).await?;
            println!("Created group: {} ({})", group.name, group.group_type);
        }

        GroupCommands::List => {
            let groups = service.list_groups().await?;
            if groups.is_empty() {
                println!("No groups found.");
            } else {
                println!("{:<20} {:<12} {:<40}", "NAME", "TYPE", "DESCRIPTION");
                println!("{}", "-".repeat(72));
                for group in groups {
                    println!(
                        "{:<20} {:<12} {:<40}",
                        group.name,
                        group.group_type,
                        truncate(&group.description, 40)
                    );
                }
            }
        }

        GroupCommands::Show { name } => {
            let group = service.get_group(&name).await?;

            println!("Group: {}", group.name);
            println!("  ID:          {}", group.id);
            println!("  Type:        {}", group.group_type);
            if !group.description.is_empty() {
                println!("  Description: {}", group.description);
            }
            println!(
                "  Created:     {}",
                group.created_at.format("%Y-%m-%d %H:%M:%S")
            );
            println!();
            println!("  Members ({}):", group.members.len());
            for member in &group.members {
                match &member.email {
                    Some(email) => println!("    {} <{}>", member.name, email),
                    None => println!("    {}", member.name),
                }
            }
            println!();
            println!(
                "  Expenses:    {} totalling {}",
                group.expenses.len(),
                format_amount(group.total_spent())
            );
        }

        GroupCommands::Delete { name } => {
            let group = service.delete_group(&name).await?;
            println!("Deleted group: {}", group.name);
        }
    }
    Ok(())
}

async fn run_person_command(service: &SplitService, cmd: PersonCommands) -> Result<()> {
    match cmd {
        PersonCommands::Add { name, email } => {
            let person = service.add_person(name, email).await?;
            println!("Added person: {}", person.name);
        }

        PersonCommands::List => {
            let people = service.list_people().await?;
            if people.is_empty() {
                println!("No people found.");
            } else {
                println!("{:<20} {:<30}", "NAME", "EMAIL");
                println!("{}", "-".repeat(50));
                for person in people {
                    println!(
                        "{:<20} {:<30}",
                        person.name,
                        person.email.as_deref().unwrap_or("-")
                    );
                }
            }
        }
    }
    Ok(())
}

async fn run_member_command(service: &SplitService, cmd: MemberCommands) -> Result<()> {
    match cmd {
        MemberCommands::Add { group, person } => {
            let member = service.add_member(&group, &person).await?;
            println!("Added {} to {}", member.name, group);
        }

        MemberCommands::Remove { group, person } => {
            let member = service.remove_member(&group, &person).await?;
            println!(
                "Removed {} from {} (their recorded expenses are kept)",
                member.name, group
            );
        }
    }
    Ok(())
}

async fn run_expense_command(
    service: &SplitService,
    cmd: ExpenseCommands,
    verbose: bool,
) -> Result<()> {
    match cmd {
        ExpenseCommands::Add {
            group,
            amount,
            description,
            paid_by,
            category,
            date,
            splits,
        } => {
            let amount =
                parse_amount(&amount).context("Invalid amount format. Use '45.00' or '45'")?;

            let date = match date {
                Some(date_str) => parse_date(&date_str).with_context(|| {
                    format!("Invalid date format '{}'. Use YYYY-MM-DD", date_str)
                })?,
                None => Utc::now(),
            };

            let splits = if splits.is_empty() {
                None
            } else {
                Some(parse_split_args(&splits)?)
            };

            let result = service
                .add_expense(&group, description, amount, date, &paid_by, category, splits)
                .await?;

            println!(
                "Recorded expense: {} {} paid by {} [{}] ({})",
                format_amount(result.expense.amount),
                result.expense.description,
                result.payer_name,
                result.expense.category,
                result.expense.id
            );
            if result.split_mismatch {
                eprintln!(
                    "Warning: splits total {} but the expense amount is {}; balances will not sum to zero",
                    format_amount(result.expense.split_total()),
                    format_amount(result.expense.amount)
                );
            }
            if verbose {
                for split in &result.expense.splits {
                    eprintln!("  share {} -> {}", split.member_id, format_amount(split.amount));
                }
            }
        }

        ExpenseCommands::List {
            group,
            category,
            paid_by,
            from_date,
            to_date,
            limit,
        } => {
            let filter = ExpenseFilter {
                category,
                paid_by,
                from_date: from_date.as_deref().map(parse_date).transpose()?,
                to_date: to_date.as_deref().map(parse_date).transpose()?,
                limit,
            };

            let hydrated = service.get_group(&group).await?;
            let expenses = service.list_expenses(&group, filter).await?;

            if expenses.is_empty() {
                println!("No expenses found.");
            } else {
                println!(
                    "{:<36} {:<12} {:<24} {:>10} {:<12} {:<14}",
                    "ID", "DATE", "DESCRIPTION", "AMOUNT", "PAID BY", "CATEGORY"
                );
                println!("{}", "-".repeat(112));
                for expense in expenses {
                    println!(
                        "{:<36} {:<12} {:<24} {:>10} {:<12} {:<14}",
                        expense.id,
                        expense.date.format("%Y-%m-%d"),
                        truncate(&expense.description, 24),
                        format_amount(expense.amount),
                        truncate(hydrated.member_name(expense.paid_by), 12),
                        truncate(&expense.category, 14)
                    );
                }
            }
        }

        ExpenseCommands::Delete { group, id } => {
            let expense_id =
                Uuid::parse_str(&id).context("Invalid expense ID format (expected UUID)")?;
            let expense = service.delete_expense(&group, expense_id).await?;
            println!(
                "Deleted expense: {} {}",
                format_amount(expense.amount),
                expense.description
            );
        }
    }
    Ok(())
}

async fn run_balance_command(service: &SplitService, group: &str) -> Result<()> {
    let balances = service.group_balances(group).await?;

    if balances.is_empty() {
        println!("No members or expenses yet.");
        return Ok(());
    }

    println!("{:<20} {:>12}", "MEMBER", "BALANCE");
    println!("{}", "-".repeat(33));
    for entry in &balances {
        println!(
            "{:<20} {:>12}",
            truncate(&entry.name, 20),
            format_signed_amount(entry.balance)
        );
    }

    Ok(())
}

async fn run_settle_command(service: &SplitService, group: &str) -> Result<()> {
    let plan = service.settlement_plan(group).await?;

    if plan.is_empty() {
        println!("Everyone is settled up!");
        return Ok(());
    }

    println!("Suggested settlements:");
    for suggestion in &plan {
        println!(
            "  {} -> {}  {}",
            suggestion.from_name,
            suggestion.to_name,
            format_amount(suggestion.debt.amount)
        );
    }
    println!(
        "{} transfer(s) settle the whole group.",
        plan.len()
    );

    Ok(())
}

async fn run_report_command(service: &SplitService, cmd: ReportCommands) -> Result<()> {
    match cmd {
        ReportCommands::Summary { group, format } => {
            let summary = service.group_summary(&group).await?;

            match format.as_str() {
                "json" => {
                    println!("{}", serde_json::to_string_pretty(&summary)?);
                }
                _ => {
                    // Table format
                    println!("Summary for {}", summary.group_name);
                    println!(
                        "  {} expense(s) totalling {}",
                        summary.expense_count,
                        format_amount(summary.total_spent)
                    );
                    println!();
                    println!(
                        "{:<20} {:>12} {:>12} {:>12}",
                        "MEMBER", "PAID", "SHARE", "NET"
                    );
                    println!("{}", "-".repeat(60));
                    for member in &summary.members {
                        println!(
                            "{:<20} {:>12} {:>12} {:>12}",
                            truncate(&member.name, 20),
                            format_amount(member.paid),
                            format_amount(member.share),
                            format_signed_amount(member.net)
                        );
                    }
                }
            }
        }

        ReportCommands::Spending {
            group,
            from,
            to,
            format,
        } => {
            let (from_date, to_date) = parse_date_range(from, to)?;
            let report = service.category_report(&group, from_date, to_date).await?;

            match format.as_str() {
                "json" => {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
                "csv" => {
                    println!("category,total,count,percentage");
                    for cat in &report.categories {
                        println!(
                            "{},{},{},{:.2}",
                            cat.category,
                            format_amount(cat.total),
                            cat.count,
                            cat.percentage
                        );
                    }
                }
                _ => {
                    // Table format
                    println!("Category Spending Report for {}", report.group_name);
                    println!(
                        "Period: {} to {}",
                        from_date.format("%Y-%m-%d"),
                        to_date.format("%Y-%m-%d")
                    );
                    println!();
                    println!(
                        "{:<20} {:>12} {:>8} {:>8}",
                        "CATEGORY", "TOTAL", "COUNT", "PERCENT"
                    );
                    println!("{}", "-".repeat(52));

                    for cat in &report.categories {
                        println!(
                            "{:<20} {:>12} {:>8} {:>7.1}%",
                            truncate(&cat.category, 20),
                            format_amount(cat.total),
                            cat.count,
                            cat.percentage
                        );
                    }

                    println!("{}", "-".repeat(52));
                    println!("{:<20} {:>12}", "TOTAL", format_amount(report.total));
                }
            }
        }

        ReportCommands::Monthly { group, format } => {
            let report = service.monthly_report(&group).await?;

            match format.as_str() {
                "json" => {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                }
                "csv" => {
                    println!("month,total,count");
                    for month in &report.months {
                        println!("{},{},{}", month.month, format_amount(month.total), month.count);
                    }
                }
                _ => {
                    // Table format
                    println!("Monthly Spending for {}", report.group_name);
                    println!();
                    println!("{:<10} {:>12} {:>8}", "MONTH", "TOTAL", "COUNT");
                    println!("{}", "-".repeat(32));
                    for month in &report.months {
                        println!(
                            "{:<10} {:>12} {:>8}",
                            month.month,
                            format_amount(month.total),
                            month.count
                        );
                    }
                }
            }
        }
    }
    Ok(())
}

async fn run_export_command(
    service: &SplitService,
    group: &str,
    export_type: &str,
    output: Option<&str>,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{Write, stdout};

    let exporter = Exporter::new(service);

    // Determine output writer
    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    match export_type {
        "expenses" => {
            let count = exporter.export_expenses_csv(group, writer).await?;
            if output.is_some() {
                eprintln!("Exported {} expenses", count);
            }
        }
        "balances" => {
            let count = exporter.export_balances_csv(group, writer).await?;
            if output.is_some() {
                eprintln!("Exported {} balances", count);
            }
        }
        "full" => {
            let snapshot = exporter.export_full_json(group, writer).await?;
            if output.is_some() {
                eprintln!(
                    "Exported group '{}': {} members, {} expenses",
                    snapshot.group.name,
                    snapshot.group.members.len(),
                    snapshot.group.expenses.len()
                );
            }
        }
        _ => {
            anyhow::bail!(
                "Invalid export type '{}'. Valid types: expenses, balances, full",
                export_type
            );
        }
    }

    Ok(())
}

async fn run_import_command(
    service: &SplitService,
    group: &str,
    input: Option<&str>,
    dry_run: bool,
    create_members: bool,
) -> Result<()> {
    use crate::io::{ImportOptions, Importer};
    use std::fs::File;
    use std::io::{Read, stdin};

    let importer = Importer::new(service);

    // Determine input reader
    let reader: Box<dyn Read> = match input {
        Some(path) => {
            let file =
                File::open(path).with_context(|| format!("Failed to open input file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdin()),
    };

    let options = ImportOptions {
        dry_run,
        create_missing_members: create_members,
    };

    let result = importer.import_expenses_csv(group, reader, options).await?;

    if dry_run {
        println!("Validation complete (nothing imported)");
    } else {
        println!("Import complete");
    }
    println!("  Imported: {}", result.imported);
    println!("  Skipped:  {}", result.skipped);
    println!("  Errors:   {}", result.errors.len());

    if !result.errors.is_empty() {
        println!("\nErrors:");
        for error in result.errors.iter().take(10) {
            println!(
                "  Line {}: {}",
                error.line,
                error
                    .field
                    .as_ref()
                    .map(|f| format!("{}: ", f))
                    .unwrap_or_default()
                    + &error.error
            );
        }
        if result.errors.len() > 10 {
            println!("  ... and {} more errors", result.errors.len() - 10);
        }
    }

    Ok(())
}

fn parse_split_args(args: &[String]) -> Result<Vec<(String, Amount)>> {
    args.iter()
        .map(|arg| {
            let (name, amount) = arg.split_once(':').with_context(|| {
                format!("Invalid split '{}'. Expected name:amount, e.g. Alice:12.50", arg)
            })?;
            let amount = parse_amount(amount)
                .with_context(|| format!("Invalid share amount in split '{}'", arg))?;
            Ok((name.trim().to_string(), amount))
        })
        .collect()
}

fn parse_date(date_str: &str) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")?;
    Ok(date
        .and_hms_opt(0, 0, 0)
        .context("Invalid time of day")?
        .and_utc())
}

fn parse_date_range(
    from: Option<String>,
    to: Option<String>,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let now = Utc::now();

    let from_date = match from {
        Some(s) => parse_date(&s)
            .with_context(|| format!("Invalid date format '{}'. Use YYYY-MM-DD", s))?,
        None => Utc
            .with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
            .single()
            .context("Invalid start of month")?,
    };

    let to_date = match to {
        Some(s) => parse_date(&s)
            .with_context(|| format!("Invalid date format '{}'. Use YYYY-MM-DD", s))?,
        None => now,
    };

    Ok((from_date, to_date))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}
