mod common;

use anyhow::Result;
use common::{StandardGroup, parse_date, test_service};
use splitledger::domain::GroupType;
use splitledger::io::{Exporter, ImportOptions, Importer};

#[tokio::test]
async fn test_export_expenses_csv() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardGroup::create_flat(&service).await?;

    service
        .add_expense(
            "Flat",
            "Takeout".into(),
            30.0,
            parse_date("2026-01-06"),
            "Bob",
            Some("Dining".into()),
            Some(vec![("Bob".into(), 20.0), ("Carol".into(), 10.0)]),
        )
        .await?;

    let exporter = Exporter::new(&service);
    let mut buffer = Vec::new();
    let count = exporter.export_expenses_csv("Flat", &mut buffer).await?;
    assert_eq!(count, 1);

    let csv = String::from_utf8(buffer)?;
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("id,date,description,amount,paid_by,category,splits")
    );
    let row = lines.next().unwrap();
    assert!(row.contains("Takeout"));
    assert!(row.contains("30.00"));
    assert!(row.contains("Bob:20.00;Carol:10.00"));

    Ok(())
}

#[tokio::test]
async fn test_export_balances_csv() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardGroup::create_flat(&service).await?;
    StandardGroup::add_equal_expense(
        &service,
        "Flat",
        "Dinner",
        30.0,
        "Alice",
        parse_date("2026-01-05"),
    )
    .await?;

    let exporter = Exporter::new(&service);
    let mut buffer = Vec::new();
    let count = exporter.export_balances_csv("Flat", &mut buffer).await?;
    assert_eq!(count, 3);

    let csv = String::from_utf8(buffer)?;
    assert!(csv.starts_with("member,balance"));
    assert!(csv.contains("Alice,20.00"));
    assert!(csv.contains("Bob,-10.00"));

    Ok(())
}

#[tokio::test]
async fn test_export_full_json_snapshot() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardGroup::create_flat(&service).await?;
    StandardGroup::add_equal_expense(
        &service,
        "Flat",
        "Dinner",
        30.0,
        "Alice",
        parse_date("2026-01-05"),
    )
    .await?;

    let exporter = Exporter::new(&service);
    let mut buffer = Vec::new();
    let snapshot = exporter.export_full_json("Flat", &mut buffer).await?;

    assert_eq!(snapshot.group.members.len(), 3);
    assert_eq!(snapshot.group.expenses.len(), 1);

    let parsed: serde_json::Value = serde_json::from_slice(&buffer)?;
    assert_eq!(parsed["group"]["name"], "Flat");
    assert_eq!(parsed["group"]["group_type"], "apartment");
    assert_eq!(parsed["group"]["expenses"][0]["description"], "Dinner");

    Ok(())
}

#[tokio::test]
async fn test_import_expenses_csv() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardGroup::create_flat(&service).await?;

    let csv = "\
date,description,amount,paid_by,category,splits
2026-01-05,Dinner,30.00,Alice,Dining,
2026-01-06,Takeout,30.00,Bob,,Bob:20.00;Carol:10.00
";

    let importer = Importer::new(&service);
    let result = importer
        .import_expenses_csv("Flat", csv.as_bytes(), ImportOptions::default())
        .await?;

    assert_eq!(result.imported, 2);
    assert!(result.errors.is_empty());

    let group = service.get_group("Flat").await?;
    assert_eq!(group.expenses.len(), 2);
    // Empty splits column means an equal three-way split
    let dinner = group
        .expenses
        .iter()
        .find(|e| e.description == "Dinner")
        .unwrap();
    assert_eq!(dinner.splits.len(), 3);

    Ok(())
}

#[tokio::test]
async fn test_import_collects_line_errors() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardGroup::create_flat(&service).await?;

    let csv = "\
date,description,amount,paid_by,category,splits
2026-01-05,Dinner,not-a-number,Alice,,
someday,Taxi,10.00,Alice,,
2026-01-07,Valid,12.00,Bob,,
";

    let importer = Importer::new(&service);
    let result = importer
        .import_expenses_csv("Flat", csv.as_bytes(), ImportOptions::default())
        .await?;

    assert_eq!(result.imported, 1, "good lines import despite bad ones");
    assert_eq!(result.errors.len(), 2);
    assert_eq!(result.errors[0].line, 2);
    assert_eq!(result.errors[0].field.as_deref(), Some("amount"));
    assert_eq!(result.errors[1].line, 3);
    assert_eq!(result.errors[1].field.as_deref(), Some("date"));

    Ok(())
}

#[tokio::test]
async fn test_import_dry_run_writes_nothing() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardGroup::create_flat(&service).await?;

    let csv = "\
date,description,amount,paid_by,category,splits
2026-01-05,Dinner,30.00,Alice,,
";

    let importer = Importer::new(&service);
    let result = importer
        .import_expenses_csv(
            "Flat",
            csv.as_bytes(),
            ImportOptions {
                dry_run: true,
                ..Default::default()
            },
        )
        .await?;

    assert_eq!(result.imported, 0);
    assert_eq!(result.skipped, 1);

    let group = service.get_group("Flat").await?;
    assert!(group.expenses.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_import_creates_missing_members() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service
        .create_group("Fresh".into(), GroupType::Other, None)
        .await?;

    let csv = "\
date,description,amount,paid_by,category,splits
2026-01-05,Kickoff lunch,24.00,Newcomer,,Newcomer:12.00;Plusone:12.00
";

    let importer = Importer::new(&service);
    let result = importer
        .import_expenses_csv(
            "Fresh",
            csv.as_bytes(),
            ImportOptions {
                create_missing_members: true,
                ..Default::default()
            },
        )
        .await?;

    assert_eq!(result.imported, 1, "errors: {:?}", result.errors);

    let group = service.get_group("Fresh").await?;
    assert_eq!(group.members.len(), 2);
    assert_eq!(group.expenses.len(), 1);

    Ok(())
}
