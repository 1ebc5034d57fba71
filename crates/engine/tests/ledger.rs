use chrono::{Duration, Utc};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use uuid::Uuid;

use engine::{
    Engine, EngineError, ExpenseCmd, Money, PersonalExpenseCmd, SettlementCmd, Split,
    TransactionKind, TransactionListFilter,
};
use migration::MigratorTrait;

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let backend = db.get_database_backend();
    for username in ["alice", "bob", "carol", "dave"] {
        db.execute(Statement::from_sql_and_values(
            backend,
            "INSERT INTO users (username, password) VALUES (?, ?)",
            vec![username.into(), "password".into()],
        ))
        .await
        .unwrap();
    }
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();
    (engine, db)
}

async fn engine_with_file_db() -> (Engine, DatabaseConnection, String, std::path::PathBuf) {
    let root = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../target/test_dbs");
    std::fs::create_dir_all(&root).unwrap();

    let path = root.join(format!("engine_{}.db", Uuid::new_v4()));
    let url = format!("sqlite:{}?mode=rwc", path.display());

    let db = Database::connect(&url).await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let backend = db.get_database_backend();
    for username in ["alice", "bob", "carol", "dave"] {
        db.execute(Statement::from_sql_and_values(
            backend,
            "INSERT INTO users (username, password) VALUES (?, ?)",
            vec![username.into(), "password".into()],
        ))
        .await
        .unwrap();
    }
    let engine = Engine::builder()
        .database(db.clone())
        .build()
        .await
        .unwrap();

    (engine, db, url, path)
}

/// A group owned by alice with bob and carol as plain members.
async fn trip_group(engine: &Engine) -> String {
    let group_id = engine.new_group("Trip", "alice").await.unwrap();
    engine
        .upsert_group_member(&group_id, "bob", "member", "alice")
        .await
        .unwrap();
    engine
        .upsert_group_member(&group_id, "carol", "member", "alice")
        .await
        .unwrap();
    group_id
}

#[tokio::test]
async fn new_group_creates_owner_membership() {
    let (engine, _db) = engine_with_db().await;

    let group_id = engine.new_group("Trip", "alice").await.unwrap();

    let (group, members) = engine
        .group_details(Some(&group_id), None, "alice")
        .await
        .unwrap();
    assert_eq!(group.name, "Trip");
    assert_eq!(group.user_id, "alice");
    assert_eq!(members, vec![("alice".to_string(), "owner".to_string())]);

    let groups = engine.list_user_groups("alice").await.unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].id, group_id);
}

#[tokio::test]
async fn duplicate_group_name_for_same_owner_is_rejected() {
    let (engine, _db) = engine_with_db().await;

    engine.new_group("Trip", "alice").await.unwrap();
    let err = engine.new_group(" trip ", "alice").await.unwrap_err();
    assert_eq!(err, EngineError::ExistingKey("trip".to_string()));

    // A different owner can reuse the name.
    engine.new_group("Trip", "bob").await.unwrap();
}

#[tokio::test]
async fn group_resolves_by_name_for_members_only() {
    let (engine, _db) = engine_with_db().await;
    let group_id = trip_group(&engine).await;

    let (group, _) = engine
        .group_details(None, Some("trip".to_string()), "bob")
        .await
        .unwrap();
    assert_eq!(group.id, group_id);

    let err = engine
        .group_details(None, Some("Trip".to_string()), "dave")
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("group not exists".to_string()));
}

#[tokio::test]
async fn shared_expense_nets_payers_against_participants() {
    let (engine, _db) = engine_with_db().await;
    let group_id = trip_group(&engine).await;

    // Alice fronts 30.00 for dinner, split evenly three ways.
    let cmd = ExpenseCmd::new(&group_id, "alice", Money::new(3000), Utc::now())
        .description("Dinner")
        .splits(vec![
            Split::new("alice", Money::new(3000), Money::new(1000)),
            Split::new("bob", Money::ZERO, Money::new(1000)),
            Split::new("carol", Money::ZERO, Money::new(1000)),
        ]);
    engine.record_expense(cmd).await.unwrap();

    let balances = engine.group_balances(&group_id, "alice").await.unwrap();
    assert_eq!(balances["alice"], Money::new(2000));
    assert_eq!(balances["bob"], Money::new(-1000));
    assert_eq!(balances["carol"], Money::new(-1000));
}

#[tokio::test]
async fn expense_with_mismatched_sums_is_rejected() {
    let (engine, _db) = engine_with_db().await;
    let group_id = trip_group(&engine).await;

    let cmd = ExpenseCmd::new(&group_id, "alice", Money::new(10000), Utc::now()).splits(vec![
        Split::new("alice", Money::new(10000), Money::new(5000)),
        Split::new("bob", Money::ZERO, Money::new(4000)),
    ]);
    let err = engine.record_expense(cmd).await.unwrap_err();
    assert_eq!(
        err,
        EngineError::Validation(
            "split sums must match the total: paid 100.00, owed 90.00, total 100.00".to_string()
        )
    );

    // Rejected whole: nothing was recorded.
    let (entries, _) = engine
        .list_group_transactions(&group_id, "alice", 10, None, &TransactionListFilter::default())
        .await
        .unwrap();
    assert!(entries.is_empty());
}

#[tokio::test]
async fn expense_split_for_non_member_is_rejected() {
    let (engine, _db) = engine_with_db().await;
    let group_id = trip_group(&engine).await;

    let cmd = ExpenseCmd::new(&group_id, "alice", Money::new(2000), Utc::now()).splits(vec![
        Split::new("alice", Money::new(2000), Money::new(1000)),
        Split::new("dave", Money::ZERO, Money::new(1000)),
    ]);
    let err = engine.record_expense(cmd).await.unwrap_err();
    assert_eq!(
        err,
        EngineError::Validation("user dave is not a member of the group".to_string())
    );
}

#[tokio::test]
async fn groups_are_hidden_from_non_members() {
    let (engine, _db) = engine_with_db().await;
    let group_id = trip_group(&engine).await;

    // A non-member gets the same error as for a group that does not exist.
    let err = engine.group_balances(&group_id, "dave").await.unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("group not exists".to_string()));

    let err = engine
        .group_balances("no-such-group", "dave")
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("group not exists".to_string()));

    let cmd = ExpenseCmd::new(&group_id, "dave", Money::new(100), Utc::now())
        .split(Split::new("dave", Money::new(100), Money::new(100)));
    let err = engine.record_expense(cmd).await.unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("group not exists".to_string()));
}

#[tokio::test]
async fn expense_replay_with_same_key_returns_original_entry() {
    let (engine, _db) = engine_with_db().await;
    let group_id = trip_group(&engine).await;

    let cmd = ExpenseCmd::new(&group_id, "alice", Money::new(3000), Utc::now())
        .idempotency_key("expense-1")
        .splits(vec![
            Split::new("alice", Money::new(3000), Money::new(1500)),
            Split::new("bob", Money::ZERO, Money::new(1500)),
        ]);

    let first = engine.record_expense(cmd.clone()).await.unwrap();
    let second = engine.record_expense(cmd).await.unwrap();
    assert_eq!(first, second);

    let (entries, _) = engine
        .list_group_transactions(&group_id, "alice", 10, None, &TransactionListFilter::default())
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);

    // The retry did not double the debt.
    let balances = engine.group_balances(&group_id, "alice").await.unwrap();
    assert_eq!(balances["bob"], Money::new(-1500));
}

#[tokio::test]
async fn personal_expenses_stay_out_of_group_ledgers() {
    let (engine, _db) = engine_with_db().await;
    let group_id = trip_group(&engine).await;

    engine
        .record_personal_expense(
            PersonalExpenseCmd::new("alice", Money::new(1500), Utc::now()).description("Groceries"),
        )
        .await
        .unwrap();

    let (personal, next) = engine
        .list_personal_transactions("alice", 10, None, &TransactionListFilter::default())
        .await
        .unwrap();
    assert_eq!(personal.len(), 1);
    assert_eq!(personal[0].amount, Money::new(1500));
    assert_eq!(personal[0].group_id, None);
    assert_eq!(personal[0].description.as_deref(), Some("Groceries"));
    assert!(next.is_none());

    let (group_entries, _) = engine
        .list_group_transactions(&group_id, "alice", 10, None, &TransactionListFilter::default())
        .await
        .unwrap();
    assert!(group_entries.is_empty());

    let (bob_entries, _) = engine
        .list_personal_transactions("bob", 10, None, &TransactionListFilter::default())
        .await
        .unwrap();
    assert!(bob_entries.is_empty());
}

#[tokio::test]
async fn group_listing_paginates_newest_first() {
    let (engine, _db) = engine_with_db().await;
    let group_id = trip_group(&engine).await;

    let base = Utc::now();
    for (i, label) in ["first", "second", "third"].iter().enumerate() {
        let cmd = ExpenseCmd::new(
            &group_id,
            "alice",
            Money::new(3000),
            base + Duration::seconds(i as i64),
        )
        .description(*label)
        .splits(vec![
            Split::new("alice", Money::new(3000), Money::new(1500)),
            Split::new("bob", Money::ZERO, Money::new(1500)),
        ]);
        engine.record_expense(cmd).await.unwrap();
    }

    let filter = TransactionListFilter::default();
    let (page, cursor) = engine
        .list_group_transactions(&group_id, "alice", 2, None, &filter)
        .await
        .unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].description.as_deref(), Some("third"));
    assert_eq!(page[1].description.as_deref(), Some("second"));
    let cursor = cursor.expect("a third entry is left");

    let (rest, end) = engine
        .list_group_transactions(&group_id, "alice", 2, Some(&cursor), &filter)
        .await
        .unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].description.as_deref(), Some("first"));
    assert!(end.is_none());
}

#[tokio::test]
async fn listing_filters_by_kind_and_time_range() {
    let (engine, _db) = engine_with_db().await;
    let group_id = trip_group(&engine).await;

    let base = Utc::now();
    let dinner = ExpenseCmd::new(&group_id, "alice", Money::new(3000), base)
        .description("Dinner")
        .splits(vec![
            Split::new("alice", Money::new(3000), Money::new(1500)),
            Split::new("bob", Money::ZERO, Money::new(1500)),
        ]);
    engine.record_expense(dinner).await.unwrap();

    engine
        .record_settlement(SettlementCmd::new(
            &group_id,
            "bob",
            "bob",
            "alice",
            Money::new(1000),
            base + Duration::seconds(10),
        ))
        .await
        .unwrap();

    let taxi = ExpenseCmd::new(
        &group_id,
        "alice",
        Money::new(1000),
        base + Duration::seconds(20),
    )
    .description("Taxi")
    .splits(vec![
        Split::new("alice", Money::new(1000), Money::new(500)),
        Split::new("bob", Money::ZERO, Money::new(500)),
    ]);
    engine.record_expense(taxi).await.unwrap();

    let settlements_only = TransactionListFilter {
        kinds: Some(vec![TransactionKind::Settlement]),
        ..Default::default()
    };
    let (entries, _) = engine
        .list_group_transactions(&group_id, "bob", 10, None, &settlements_only)
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, TransactionKind::Settlement);

    let expenses_only = TransactionListFilter {
        kinds: Some(vec![TransactionKind::Expense]),
        ..Default::default()
    };
    let (entries, _) = engine
        .list_group_transactions(&group_id, "bob", 10, None, &expenses_only)
        .await
        .unwrap();
    assert_eq!(entries.len(), 2);

    let middle = TransactionListFilter {
        from: Some(base + Duration::seconds(5)),
        to: Some(base + Duration::seconds(15)),
        kinds: None,
    };
    let (entries, _) = engine
        .list_group_transactions(&group_id, "bob", 10, None, &middle)
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, TransactionKind::Settlement);
}

#[tokio::test]
async fn invalid_list_filters_are_rejected() {
    let (engine, _db) = engine_with_db().await;
    let group_id = trip_group(&engine).await;

    let now = Utc::now();
    let inverted = TransactionListFilter {
        from: Some(now),
        to: Some(now - Duration::seconds(1)),
        kinds: None,
    };
    let err = engine
        .list_group_transactions(&group_id, "alice", 10, None, &inverted)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Validation("invalid range: from must be < to".to_string())
    );

    let empty_kinds = TransactionListFilter {
        kinds: Some(Vec::new()),
        ..Default::default()
    };
    let err = engine
        .list_group_transactions(&group_id, "alice", 10, None, &empty_kinds)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Validation("kinds must not be empty".to_string())
    );

    let err = engine
        .list_group_transactions(
            &group_id,
            "alice",
            10,
            Some("not-a-cursor"),
            &TransactionListFilter::default(),
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidCursor("invalid transactions cursor".to_string())
    );
}

#[tokio::test]
async fn transaction_detail_includes_ordered_splits() {
    let (engine, _db) = engine_with_db().await;
    let group_id = trip_group(&engine).await;

    let cmd = ExpenseCmd::new(&group_id, "carol", Money::new(3000), Utc::now()).splits(vec![
        Split::new("carol", Money::new(3000), Money::new(1000)),
        Split::new("alice", Money::ZERO, Money::new(1000)),
        Split::new("bob", Money::ZERO, Money::new(1000)),
    ]);
    let id = engine.record_expense(cmd).await.unwrap();

    let tx = engine.transaction_detail(&group_id, id, "bob").await.unwrap();
    assert_eq!(tx.id, id);
    assert_eq!(tx.amount, Money::new(3000));
    assert_eq!(tx.created_by, "carol");
    assert_eq!(
        tx.splits,
        vec![
            Split::new("alice", Money::ZERO, Money::new(1000)),
            Split::new("bob", Money::ZERO, Money::new(1000)),
            Split::new("carol", Money::new(3000), Money::new(1000)),
        ]
    );

    let err = engine
        .transaction_detail(&group_id, Uuid::new_v4(), "bob")
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::KeyNotFound("transaction not exists".to_string())
    );
}

#[tokio::test]
async fn membership_changes_are_owner_only() {
    let (engine, _db) = engine_with_db().await;
    let group_id = trip_group(&engine).await;

    let err = engine
        .upsert_group_member(&group_id, "dave", "member", "bob")
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Forbidden("group owner role required".to_string())
    );

    let err = engine
        .upsert_group_member(&group_id, "nobody", "member", "alice")
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("user not exists".to_string()));

    let err = engine
        .upsert_group_member(&group_id, "bob", "boss", "alice")
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Validation("invalid membership role: boss".to_string())
    );

    let err = engine
        .upsert_group_member(&group_id, "alice", "member", "alice")
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Validation("cannot change the group owner role".to_string())
    );

    // Promoting bob lets him manage members afterwards.
    engine
        .upsert_group_member(&group_id, "bob", "owner", "alice")
        .await
        .unwrap();
    engine
        .upsert_group_member(&group_id, "dave", "member", "bob")
        .await
        .unwrap();

    let members = engine.list_group_members(&group_id, "dave").await.unwrap();
    assert_eq!(
        members,
        vec![
            ("alice".to_string(), "owner".to_string()),
            ("bob".to_string(), "owner".to_string()),
            ("carol".to_string(), "member".to_string()),
            ("dave".to_string(), "member".to_string()),
        ]
    );
}

#[tokio::test]
async fn delete_group_removes_its_ledger() {
    let (engine, db) = engine_with_db().await;
    let backend = db.get_database_backend();
    let group_id = trip_group(&engine).await;

    let cmd = ExpenseCmd::new(&group_id, "alice", Money::new(3000), Utc::now()).splits(vec![
        Split::new("alice", Money::new(3000), Money::new(1500)),
        Split::new("bob", Money::ZERO, Money::new(1500)),
    ]);
    engine.record_expense(cmd).await.unwrap();

    let err = engine.delete_group(&group_id, "bob").await.unwrap_err();
    assert_eq!(
        err,
        EngineError::Forbidden("group owner role required".to_string())
    );

    engine.delete_group(&group_id, "alice").await.unwrap();

    let err = engine.group_balances(&group_id, "alice").await.unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("group not exists".to_string()));

    for table in ["splits", "transactions", "group_memberships", "groups"] {
        let row = db
            .query_one(Statement::from_string(
                backend,
                format!("SELECT COUNT(*) AS n FROM {table}"),
            ))
            .await
            .unwrap()
            .unwrap();
        let n: i64 = row.try_get("", "n").unwrap();
        assert_eq!(n, 0, "{table} still has rows");
    }
}

#[tokio::test]
async fn restart_engine_reads_same_ledger() {
    let (engine, db, url, path) = engine_with_file_db().await;
    let group_id = trip_group(&engine).await;

    let cmd = ExpenseCmd::new(&group_id, "alice", Money::new(3000), Utc::now()).splits(vec![
        Split::new("alice", Money::new(3000), Money::new(1500)),
        Split::new("bob", Money::ZERO, Money::new(1500)),
    ]);
    engine.record_expense(cmd).await.unwrap();

    drop(engine);
    drop(db);

    let db2 = Database::connect(&url).await.unwrap();
    let engine2 = Engine::builder()
        .database(db2.clone())
        .build()
        .await
        .unwrap();

    let balances = engine2.group_balances(&group_id, "alice").await.unwrap();
    assert_eq!(balances["alice"], Money::new(1500));
    assert_eq!(balances["bob"], Money::new(-1500));

    let plan = engine2
        .suggested_settlements(&group_id, "bob")
        .await
        .unwrap();
    assert_eq!(plan.version, 1);

    drop(db2);
    let _ = std::fs::remove_file(path);
}
