//! End-to-end cascade tests against an in-memory store.

use chrono::NaiveDate;
use engine::{
    Amount, Area, Concept, Dependency, Engine, EngineError, EntryKey, RecomputeCmd, SignCode,
    TriggerKind, WriteEntryCmd,
};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

const ACCOUNT: i32 = 1;
const COMPANY: i32 = 1;

// 2026-08-21 is a Friday, 2026-08-24 the following Monday.
fn friday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 8, 21).unwrap()
}

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 8, 24).unwrap()
}

async fn init() -> (DatabaseConnection, Engine) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    Migrator::up(&db, None).await.unwrap();

    let mut engine = Engine::builder().database(db.clone()).build().await.unwrap();
    seed_catalog(&mut engine).await;
    (db, engine)
}

async fn seed_concept(
    engine: &mut Engine,
    id: i32,
    name: &str,
    code: Option<SignCode>,
    area: Area,
    formula: Option<&str>,
) {
    let dependency = formula.map(|f| Dependency::parse(f).unwrap());
    engine
        .new_concept(Concept {
            id,
            name: name.to_string(),
            code,
            area,
            active: true,
            display_order: id,
            dependency,
        })
        .await
        .unwrap();
}

/// The standard catalog layout: two movement concepts, the chain slots and
/// the treasury sources, all under account 1.
async fn seed_catalog(engine: &mut Engine) {
    use Area::{Disbursement, Treasury};

    seed_concept(engine, 55, "income", Some(SignCode::Credit), Disbursement, None).await;
    seed_concept(engine, 56, "expense", Some(SignCode::Debit), Disbursement, None).await;

    for (id, name) in [
        (100, "prior day balance"),
        (101, "movement subtotal"),
        (102, "opening subtotal"),
        (103, "treasury movement mirror"),
        (104, "total bank balance"),
        (105, "balance difference"),
        (106, "bank balance"),
    ] {
        seed_concept(engine, id, name, None, Disbursement, None).await;
    }
    for (id, name) in [
        (110, "treasury subtotal"),
        (111, "treasury window mirror"),
        (112, "opening balance"),
        (113, "closing balance"),
    ] {
        seed_concept(engine, id, name, None, Treasury, None).await;
    }

    engine
        .new_account(engine::Account::new(
            ACCOUNT,
            "operating account".to_string(),
            COMPANY,
            "EUR".to_string(),
        ))
        .await
        .unwrap();
}

/// Inserts a ledger row directly, bypassing the write protection. Used to
/// seed engine-owned slots the way historical data or an import would.
async fn seed_entry(
    db: &DatabaseConnection,
    date: NaiveDate,
    concept_id: i32,
    area: Area,
    cents: i64,
) {
    db.execute(Statement::from_sql_and_values(
        db.get_database_backend(),
        "INSERT INTO ledger_entries (id, date, concept_id, account_id, area, amount_minor, company_id) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        [
            uuid::Uuid::new_v4().to_string().into(),
            date.to_string().into(),
            concept_id.into(),
            ACCOUNT.into(),
            area.as_str().into(),
            cents.into(),
            COMPANY.into(),
        ],
    ))
    .await
    .unwrap();
}

async fn write(engine: &Engine, date: NaiveDate, concept_id: i32, area: Area, cents: i64) {
    engine
        .write_entry(WriteEntryCmd {
            date,
            concept_id,
            account_id: ACCOUNT,
            area,
            amount: Amount::new(cents),
            actor: Some("tester".to_string()),
        })
        .await
        .unwrap();
}

async fn amount_at(engine: &Engine, date: NaiveDate, concept_id: i32, area: Area) -> Option<i64> {
    engine
        .entry(EntryKey::new(date, concept_id, ACCOUNT, area))
        .await
        .unwrap()
        .map(|entry| entry.amount.cents())
}

#[tokio::test]
async fn full_chain_cascades_from_base_writes() {
    let (db, engine) = init().await;
    let day = friday();

    // Yesterday's closing was seeded by hand: 300.00.
    seed_entry(&db, day, 100, Area::Disbursement, 30_000).await;

    write(&engine, day, 55, Area::Disbursement, 80_000).await;
    write(&engine, day, 56, Area::Disbursement, 30_000).await;

    // 800 (credit) − 300 (debit) = 500.
    assert_eq!(amount_at(&engine, day, 101, Area::Disbursement).await, Some(50_000));
    // movement + prior = 500 + 300 = 800.
    assert_eq!(amount_at(&engine, day, 102, Area::Disbursement).await, Some(80_000));
    // The counter-mirror follows the movement subtotal.
    assert_eq!(amount_at(&engine, day, 111, Area::Treasury).await, Some(50_000));

    write(&engine, day, 110, Area::Treasury, 100_000).await;

    assert_eq!(amount_at(&engine, day, 103, Area::Disbursement).await, Some(100_000));
    // opening + mirror = 800 + 1000 = 1800.
    assert_eq!(amount_at(&engine, day, 104, Area::Disbursement).await, Some(180_000));
    // Friday's total opens the following Monday.
    assert_eq!(
        amount_at(&engine, monday(), 100, Area::Disbursement).await,
        Some(180_000)
    );
}

#[tokio::test]
async fn recompute_is_idempotent() {
    let (db, engine) = init().await;
    let day = friday();

    seed_entry(&db, day, 100, Area::Disbursement, 30_000).await;
    write(&engine, day, 55, Area::Disbursement, 80_000).await;
    write(&engine, day, 110, Area::Treasury, 100_000).await;

    engine.recompute(RecomputeCmd::for_date(day)).await.unwrap();
    let second = engine.recompute(RecomputeCmd::for_date(day)).await.unwrap();

    assert!(second.entries_changed.is_empty());
}

#[tokio::test]
async fn sign_rule_ignores_stored_signs() {
    let (_db, engine) = init().await;
    let day = friday();

    // A credit stored negative still adds, a debit stored positive still
    // subtracts: |−200| − |300| = −100.
    write(&engine, day, 55, Area::Disbursement, -20_000).await;
    write(&engine, day, 56, Area::Disbursement, 30_000).await;

    assert_eq!(amount_at(&engine, day, 101, Area::Disbursement).await, Some(-10_000));
}

#[tokio::test]
async fn balance_difference_defaults_missing_operands_to_zero() {
    let (_db, engine) = init().await;
    let day = friday();

    // Only the bank balance exists: difference = 100 − 0.
    write(&engine, day, 106, Area::Disbursement, 10_000).await;

    assert_eq!(amount_at(&engine, day, 105, Area::Disbursement).await, Some(10_000));
    // The rest of the chain has no operands and writes nothing, so there is
    // no total to project forward either.
    assert_eq!(amount_at(&engine, day, 104, Area::Disbursement).await, None);
    assert_eq!(amount_at(&engine, monday(), 100, Area::Disbursement).await, None);
}

#[tokio::test]
async fn balance_difference_against_seeded_prior_day() {
    let (db, engine) = init().await;
    let day = friday();

    // Only a hand-seeded prior-day balance exists: difference = 0 − 300.
    seed_entry(&db, day, 100, Area::Disbursement, 30_000).await;
    engine.recompute(RecomputeCmd::for_date(day)).await.unwrap();

    assert_eq!(amount_at(&engine, day, 105, Area::Disbursement).await, Some(-30_000));
}

#[tokio::test]
async fn projection_skips_the_weekend() {
    let (_db, engine) = init().await;
    let day = friday();

    write(&engine, day, 55, Area::Disbursement, 160_000).await;

    let saturday = day.succ_opt().unwrap();
    let sunday = saturday.succ_opt().unwrap();
    assert_eq!(amount_at(&engine, saturday, 100, Area::Disbursement).await, None);
    assert_eq!(amount_at(&engine, sunday, 100, Area::Disbursement).await, None);
    assert_eq!(
        amount_at(&engine, monday(), 100, Area::Disbursement).await,
        Some(160_000)
    );
}

#[tokio::test]
async fn treasury_projection_carries_closing_into_opening() {
    let (_db, engine) = init().await;
    let day = friday();

    write(&engine, day, 113, Area::Treasury, 42_000).await;

    assert_eq!(
        amount_at(&engine, monday(), 112, Area::Treasury).await,
        Some(42_000)
    );
}

#[tokio::test]
async fn derived_writes_are_rejected_without_side_effects() {
    let (_db, mut engine) = init().await;
    let day = friday();

    seed_concept(
        &mut engine,
        10,
        "net movements",
        None,
        Area::Disbursement,
        Some("SUMA(55,56)"),
    )
    .await;

    for concept_id in [10, 101, 104, 111] {
        let area = if concept_id == 111 {
            Area::Treasury
        } else {
            Area::Disbursement
        };
        let err = engine
            .write_entry(WriteEntryCmd {
                date: day,
                concept_id,
                account_id: ACCOUNT,
                area,
                amount: Amount::new(1),
                actor: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::DerivedConceptWrite(_)));
        assert_eq!(amount_at(&engine, day, concept_id, area).await, None);
    }
}

#[tokio::test]
async fn formula_concepts_follow_their_dependencies() {
    let (_db, mut engine) = init().await;
    let day = friday();

    seed_concept(
        &mut engine,
        10,
        "net movements",
        None,
        Area::Disbursement,
        Some("SUMA(55,56)"),
    )
    .await;
    seed_concept(
        &mut engine,
        11,
        "bank minus prior",
        None,
        Area::Disbursement,
        Some("RESTA(106,100)"),
    )
    .await;

    write(&engine, day, 55, Area::Disbursement, 80_000).await;
    write(&engine, day, 56, Area::Disbursement, 30_000).await;
    write(&engine, day, 106, Area::Disbursement, 50_000).await;

    assert_eq!(amount_at(&engine, day, 10, Area::Disbursement).await, Some(50_000));
    // RESTA works on raw stored values, no sign rule.
    assert_eq!(amount_at(&engine, day, 11, Area::Disbursement).await, Some(50_000));
}

#[tokio::test]
async fn malformed_descriptor_degrades_to_base_concept() {
    let (db, _engine) = init().await;

    db.execute(Statement::from_sql_and_values(
        db.get_database_backend(),
        "INSERT INTO concepts (id, name, code, area, active, display_order, formula) \
         VALUES (?, ?, NULL, ?, ?, ?, ?)",
        [
            20.into(),
            "broken".into(),
            "disbursement".into(),
            true.into(),
            20.into(),
            "MEDIA(1,2)".into(),
        ],
    ))
    .await
    .unwrap();

    let engine = Engine::builder().database(db.clone()).build().await.unwrap();
    let concept = engine.concept(20).unwrap();
    assert!(!concept.is_derived());

    // A degraded concept accepts writes like any other base concept.
    write(&engine, friday(), 20, Area::Disbursement, 100).await;
}

#[tokio::test]
async fn treasury_mirror_falls_back_to_legacy_rows() {
    let (db, engine) = init().await;
    let day = friday();

    // Legacy data stored the treasury subtotal in the disbursement area.
    seed_entry(&db, day, 110, Area::Disbursement, 70_000).await;
    engine.recompute(RecomputeCmd::for_date(day)).await.unwrap();

    assert_eq!(amount_at(&engine, day, 103, Area::Disbursement).await, Some(70_000));

    // A real treasury row takes precedence over the legacy one.
    write(&engine, day, 110, Area::Treasury, 90_000).await;
    assert_eq!(amount_at(&engine, day, 103, Area::Disbursement).await, Some(90_000));
}

#[tokio::test]
async fn duplicate_catalog_ids_are_rejected() {
    let (_db, mut engine) = init().await;

    let err = engine
        .new_concept(Concept {
            id: 55,
            name: "income again".to_string(),
            code: None,
            area: Area::Disbursement,
            active: true,
            display_order: 55,
            dependency: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::ExistingKey("55".to_string()));
    // The original row is untouched.
    assert_eq!(engine.concept(55).unwrap().name, "income");

    let err = engine
        .new_account(engine::Account::new(
            ACCOUNT,
            "operating again".to_string(),
            COMPANY,
            "EUR".to_string(),
        ))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::ExistingKey(ACCOUNT.to_string()));
}

#[tokio::test]
async fn unknown_keys_are_rejected() {
    let (_db, engine) = init().await;

    let err = engine
        .write_entry(WriteEntryCmd {
            date: friday(),
            concept_id: 999,
            account_id: ACCOUNT,
            area: Area::Disbursement,
            amount: Amount::new(100),
            actor: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    let err = engine
        .write_entry(WriteEntryCmd {
            date: friday(),
            concept_id: 55,
            account_id: 999,
            area: Area::Disbursement,
            amount: Amount::new(100),
            actor: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn entry_history_is_append_only_newest_first() {
    let (_db, engine) = init().await;
    let day = friday();
    let key = EntryKey::new(day, 55, ACCOUNT, Area::Disbursement);

    write(&engine, day, 55, Area::Disbursement, 80_000).await;
    write(&engine, day, 55, Area::Disbursement, 90_000).await;
    // Same amount again: nothing changes, nothing is recorded.
    write(&engine, day, 55, Area::Disbursement, 90_000).await;

    let history = engine.entry_history(key).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].new_amount, Amount::new(90_000));
    assert_eq!(history[0].previous_amount, Some(Amount::new(80_000)));
    assert_eq!(history[1].previous_amount, None);
    assert!(history.iter().all(|p| p.trigger == TriggerKind::UserEdit));
    assert!(history.iter().all(|p| p.actor.as_deref() == Some("tester")));
}

#[tokio::test]
async fn recompute_covers_every_active_account() {
    let (db, engine) = init().await;
    let day = friday();

    engine
        .new_account(engine::Account::new(
            2,
            "second account".to_string(),
            COMPANY,
            "EUR".to_string(),
        ))
        .await
        .unwrap();

    write(&engine, day, 55, Area::Disbursement, 10_000).await;
    db.execute(Statement::from_sql_and_values(
        db.get_database_backend(),
        "INSERT INTO ledger_entries (id, date, concept_id, account_id, area, amount_minor, company_id) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
        [
            uuid::Uuid::new_v4().to_string().into(),
            day.to_string().into(),
            55.into(),
            2.into(),
            Area::Disbursement.as_str().into(),
            20_000i64.into(),
            COMPANY.into(),
        ],
    ))
    .await
    .unwrap();

    let outcome = engine.recompute(RecomputeCmd::for_date(day)).await.unwrap();
    assert!(outcome.change_for(101, 2).is_some());

    let second = engine
        .entry(EntryKey::new(day, 101, 2, Area::Disbursement))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second.amount, Amount::new(20_000));
    assert_eq!(amount_at(&engine, day, 101, Area::Disbursement).await, Some(10_000));
}

#[tokio::test]
async fn day_sheet_orders_by_display_order() {
    let (_db, engine) = init().await;
    let day = friday();

    write(&engine, day, 56, Area::Disbursement, 30_000).await;
    write(&engine, day, 55, Area::Disbursement, 80_000).await;

    let sheet = engine.day_sheet(day, ACCOUNT, Area::Disbursement).await.unwrap();
    let ids: Vec<i32> = sheet.iter().map(|e| e.concept_id).collect();
    let pos_55 = ids.iter().position(|&id| id == 55).unwrap();
    let pos_56 = ids.iter().position(|&id| id == 56).unwrap();
    assert!(pos_55 < pos_56);
}
