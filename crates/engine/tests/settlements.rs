use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use engine::{
    CreateGroupCmd, DebtRecord, Engine, EngineError, Expense, ExpenseOrigin, LedgerEvent,
    LedgerStore, LedgerTx, MemoryEvents, MemoryLedger, MoneyCents, RecordExpenseCmd,
    RequestSettlementCmd, Settlement, SettlementStatus,
};

fn cents(value: i64) -> MoneyCents {
    MoneyCents::new(value)
}

async fn engine_with_group() -> (Engine<MemoryLedger>, MemoryEvents, Uuid) {
    let events = MemoryEvents::new();
    let engine = Engine::builder()
        .store(MemoryLedger::new())
        .events(Arc::new(events.clone()))
        .build()
        .unwrap();
    let group = engine
        .create_group(
            CreateGroupCmd::new("Flat", "alice")
                .member("alice", "Alice")
                .member("bob", "Bob")
                .member("carol", "Carol"),
        )
        .await
        .unwrap();
    (engine, events, group.id)
}

/// `paid_by` pays `amount` for `owner`, leaving one unpaid debt.
async fn personal_debt(
    engine: &Engine<MemoryLedger>,
    group_id: Uuid,
    owner: &str,
    paid_by: &str,
    amount: i64,
) -> Expense {
    engine
        .record_expense(
            RecordExpenseCmd::new(group_id, paid_by, cents(amount), "Dinner", Utc::now())
                .category("food")
                .on_behalf_of(owner),
        )
        .await
        .unwrap()
}

async fn request(
    engine: &Engine<MemoryLedger>,
    group_id: Uuid,
    from: &str,
    to: &str,
    amount: i64,
) -> Settlement {
    engine
        .request_settlement(RequestSettlementCmd::new(
            group_id,
            from,
            to,
            cents(amount),
            from,
            Utc::now(),
        ))
        .await
        .unwrap()
}

async fn all_debts(engine: &Engine<MemoryLedger>, group_id: Uuid) -> Vec<DebtRecord> {
    let mut tx = engine.store().begin().await.unwrap();
    tx.list_group_debt_records(group_id, false).await.unwrap()
}

async fn all_expenses(engine: &Engine<MemoryLedger>, group_id: Uuid) -> Vec<Expense> {
    let mut tx = engine.store().begin().await.unwrap();
    tx.list_group_expenses(group_id).await.unwrap()
}

fn balance_of(balances: &[engine::MemberBalance], member_id: &str) -> i64 {
    balances
        .iter()
        .find(|b| b.member_id == member_id)
        .map(|b| b.balance.cents())
        .unwrap()
}

#[tokio::test]
async fn shared_expense_balances_and_proposals() {
    let (engine, events, group_id) = engine_with_group().await;
    engine
        .record_expense(
            RecordExpenseCmd::new(group_id, "alice", cents(300), "Groceries", Utc::now())
                .split_with_group(),
        )
        .await
        .unwrap();

    let balances = engine.compute_balances(group_id).await.unwrap();
    assert_eq!(balance_of(&balances, "alice"), -200);
    assert_eq!(balance_of(&balances, "bob"), 100);
    assert_eq!(balance_of(&balances, "carol"), 100);

    let proposals = engine
        .compute_settlement_proposals(group_id, Utc::now())
        .await
        .unwrap();
    let pairs: Vec<_> = proposals
        .iter()
        .map(|p| (p.from.as_str(), p.to.as_str(), p.amount.cents()))
        .collect();
    assert_eq!(pairs, vec![("bob", "alice", 100), ("carol", "alice", 100)]);
    assert!(proposals.iter().all(|p| p.status == SettlementStatus::Pending));

    let shared: Vec<_> = events
        .snapshot()
        .into_iter()
        .filter(|e| matches!(e, LedgerEvent::ExpenseShared { .. }))
        .map(|e| e.recipient().to_string())
        .collect();
    assert_eq!(shared, vec!["bob".to_string(), "carol".to_string()]);
}

#[tokio::test]
async fn full_confirmation_pays_debt_and_removes_expense() {
    let (engine, events, group_id) = engine_with_group().await;
    let original = personal_debt(&engine, group_id, "alice", "bob", 150).await;
    let settlement = request(&engine, group_id, "alice", "bob", 150).await;

    let confirmed = engine
        .confirm_settlement(settlement.id, "bob", Utc::now())
        .await
        .unwrap();
    assert_eq!(confirmed.status, SettlementStatus::Confirmed);
    assert!(confirmed.confirmed_at.is_some());

    let debts = all_debts(&engine, group_id).await;
    assert_eq!(debts.len(), 1);
    assert!(debts[0].paid);

    let expenses = all_expenses(&engine, group_id).await;
    assert!(expenses.iter().all(|e| e.id != original.id));
    let mirror = expenses
        .iter()
        .find(|e| e.origin == ExpenseOrigin::SettlementMirror)
        .unwrap();
    assert_eq!(mirror.owner, "alice");
    assert_eq!(mirror.paid_by, "alice");
    assert_eq!(mirror.amount, cents(150));
    assert_eq!(mirror.category.as_deref(), Some("food"));
    assert_eq!(mirror.description, "Debt settlement - Dinner");

    let balances = engine.compute_balances(group_id).await.unwrap();
    assert!(balances.iter().all(|b| b.balance.is_zero()));

    let last = events.snapshot().pop().unwrap();
    assert_eq!(last.recipient(), "alice");
    match last {
        LedgerEvent::SettlementConfirmed {
            amount,
            creditor_name,
            ..
        } => {
            assert_eq!(amount, cents(150));
            assert_eq!(creditor_name, "Bob");
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn partial_confirmation_splits_debt_record() {
    let (engine, _events, group_id) = engine_with_group().await;
    let original = personal_debt(&engine, group_id, "alice", "bob", 900).await;
    let settlement = request(&engine, group_id, "alice", "bob", 500).await;

    engine
        .confirm_settlement(settlement.id, "bob", Utc::now())
        .await
        .unwrap();

    let debts = all_debts(&engine, group_id).await;
    assert_eq!(debts.len(), 2);
    assert!(debts.iter().all(|d| d.expense_id == original.id));
    let paid: Vec<_> = debts.iter().filter(|d| d.paid).collect();
    let unpaid: Vec<_> = debts.iter().filter(|d| !d.paid).collect();
    assert_eq!(paid.len(), 1);
    assert_eq!(paid[0].amount, cents(500));
    assert_eq!(unpaid.len(), 1);
    assert_eq!(unpaid[0].amount, cents(400));

    let reduced = all_expenses(&engine, group_id)
        .await
        .into_iter()
        .find(|e| e.id == original.id)
        .unwrap();
    assert_eq!(reduced.amount, cents(400));
    assert_eq!(reduced.normalized_amount, cents(400));
    assert_eq!(reduced.origin, ExpenseOrigin::SettlementAdjustment);

    let debts = engine.member_debts(group_id, "alice").await.unwrap();
    assert_eq!(debts.owes.len(), 1);
    assert_eq!(debts.owes[0].total, cents(400));
    assert_eq!(debts.owes[0].display_name.as_deref(), Some("Bob"));
    assert_eq!(debts.net, cents(-400));
}

#[tokio::test]
async fn settlement_spanning_several_records_pays_oldest_first() {
    let (engine, _events, group_id) = engine_with_group().await;
    personal_debt(&engine, group_id, "alice", "bob", 100).await;
    personal_debt(&engine, group_id, "alice", "bob", 200).await;
    let settlement = request(&engine, group_id, "alice", "bob", 250).await;

    engine
        .confirm_settlement(settlement.id, "bob", Utc::now())
        .await
        .unwrap();

    let debts = engine.member_debts(group_id, "alice").await.unwrap();
    assert_eq!(debts.owes[0].total, cents(50));
    assert_eq!(debts.owes[0].record_ids.len(), 1);
}

#[tokio::test]
async fn second_confirmation_conflicts_without_mutation() {
    let (engine, events, group_id) = engine_with_group().await;
    personal_debt(&engine, group_id, "alice", "bob", 900).await;
    let settlement = request(&engine, group_id, "alice", "bob", 500).await;
    engine
        .confirm_settlement(settlement.id, "bob", Utc::now())
        .await
        .unwrap();

    let debts_before = all_debts(&engine, group_id).await;
    let expenses_before = all_expenses(&engine, group_id).await;
    let events_before = events.snapshot().len();

    let err = engine
        .confirm_settlement(settlement.id, "bob", Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    assert_eq!(all_debts(&engine, group_id).await, debts_before);
    assert_eq!(all_expenses(&engine, group_id).await, expenses_before);
    assert_eq!(events.snapshot().len(), events_before);
}

#[tokio::test]
async fn concurrent_confirmations_apply_once() {
    let (engine, _events, group_id) = engine_with_group().await;
    personal_debt(&engine, group_id, "alice", "bob", 300).await;
    let settlement = request(&engine, group_id, "alice", "bob", 100).await;

    let (first, second) = tokio::join!(
        engine.confirm_settlement(settlement.id, "bob", Utc::now()),
        engine.confirm_settlement(settlement.id, "bob", Utc::now()),
    );
    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        outcomes
            .iter()
            .any(|r| matches!(r, Err(EngineError::Conflict(_))))
    );

    let paid: Vec<_> = all_debts(&engine, group_id)
        .await
        .into_iter()
        .filter(|d| d.paid)
        .collect();
    assert_eq!(paid.len(), 1);
    assert_eq!(paid[0].amount, cents(100));
}

#[tokio::test]
async fn only_the_creditor_resolves() {
    let (engine, _events, group_id) = engine_with_group().await;
    personal_debt(&engine, group_id, "alice", "bob", 150).await;
    let settlement = request(&engine, group_id, "alice", "bob", 150).await;

    for member in ["alice", "carol", "mallory"] {
        let err = engine
            .confirm_settlement(settlement.id, member, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Forbidden(_)));
        let err = engine
            .reject_settlement(settlement.id, member, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Forbidden(_)));
    }

    let err = engine
        .confirm_settlement(Uuid::new_v4(), "bob", Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn rejection_leaves_ledger_untouched() {
    let (engine, events, group_id) = engine_with_group().await;
    personal_debt(&engine, group_id, "alice", "bob", 150).await;
    let settlement = request(&engine, group_id, "alice", "bob", 150).await;
    let debts_before = all_debts(&engine, group_id).await;
    let expenses_before = all_expenses(&engine, group_id).await;

    let rejected = engine
        .reject_settlement(settlement.id, "bob", Utc::now())
        .await
        .unwrap();
    assert_eq!(rejected.status, SettlementStatus::Rejected);
    assert!(rejected.rejected_at.is_some());
    assert!(rejected.confirmed_at.is_none());

    assert_eq!(all_debts(&engine, group_id).await, debts_before);
    assert_eq!(all_expenses(&engine, group_id).await, expenses_before);

    let last = events.snapshot().pop().unwrap();
    assert!(matches!(last, LedgerEvent::SettlementRejected { .. }));
    assert_eq!(last.recipient(), "alice");

    let err = engine
        .confirm_settlement(settlement.id, "bob", Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
}

#[tokio::test]
async fn uncovered_settlement_rolls_back() {
    let (engine, events, group_id) = engine_with_group().await;
    personal_debt(&engine, group_id, "alice", "bob", 100).await;

    // Written straight to the store: requests cannot exceed the debt.
    let settlement = Settlement::new(group_id, "alice", "bob", cents(250), Utc::now()).unwrap();
    let mut tx = engine.store().begin().await.unwrap();
    tx.insert_settlement(settlement.clone()).await.unwrap();
    tx.commit().await.unwrap();

    let debts_before = all_debts(&engine, group_id).await;
    let expenses_before = all_expenses(&engine, group_id).await;
    let events_before = events.snapshot().len();

    let err = engine
        .confirm_settlement(settlement.id, "bob", Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InconsistentLedger(_)));

    assert_eq!(all_debts(&engine, group_id).await, debts_before);
    assert_eq!(all_expenses(&engine, group_id).await, expenses_before);
    assert_eq!(events.snapshot().len(), events_before);
    let history = engine.list_settlements(group_id, "bob").await.unwrap();
    assert_eq!(history.pending.len(), 1);
}

#[tokio::test]
async fn missing_originating_expense_is_tolerated() {
    let (engine, _events, group_id) = engine_with_group().await;
    let record = DebtRecord::new(
        group_id,
        Uuid::new_v4(),
        "alice",
        "bob",
        cents(80),
        Utc::now(),
    )
    .unwrap();
    let mut tx = engine.store().begin().await.unwrap();
    tx.insert_debt_record(record).await.unwrap();
    tx.commit().await.unwrap();

    let settlement = request(&engine, group_id, "alice", "bob", 80).await;
    engine
        .confirm_settlement(settlement.id, "bob", Utc::now())
        .await
        .unwrap();

    let expenses = all_expenses(&engine, group_id).await;
    assert_eq!(expenses.len(), 1);
    assert_eq!(expenses[0].description, "Debt settlement");
    assert_eq!(expenses[0].category, None);
    assert_eq!(expenses[0].note.as_deref(), Some("Settled with Bob"));
}

#[tokio::test]
async fn request_validations() {
    let (engine, events, group_id) = engine_with_group().await;
    personal_debt(&engine, group_id, "alice", "bob", 150).await;

    let cmd = |from: &str, to: &str, amount: i64, acting: &str| {
        RequestSettlementCmd::new(group_id, from, to, cents(amount), acting, Utc::now())
    };

    let cases = [
        (cmd("alice", "bob", 0, "alice"), "validation"),
        (cmd("alice", "alice", 10, "alice"), "validation"),
        (cmd("alice", "bob", 10, "carol"), "forbidden"),
        (cmd("alice", "bob", 10, "mallory"), "forbidden"),
        (cmd("mallory", "bob", 10, "bob"), "not_found"),
        (cmd("carol", "bob", 10, "carol"), "validation"),
        (cmd("alice", "bob", 151, "alice"), "validation"),
    ];
    for (cmd, expected) in cases {
        let err = engine.request_settlement(cmd).await.unwrap_err();
        let kind = match err {
            EngineError::Validation(_) => "validation",
            EngineError::Forbidden(_) => "forbidden",
            EngineError::KeyNotFound(_) => "not_found",
            other => panic!("unexpected error {other:?}"),
        };
        assert_eq!(kind, expected);
    }

    let requested = engine
        .request_settlement(cmd("alice", "bob", 100, "bob").note("  cash  "))
        .await
        .unwrap();
    assert_eq!(requested.note.as_deref(), Some("cash"));
    let last = events.snapshot().pop().unwrap();
    assert!(matches!(last, LedgerEvent::SettlementRequested { .. }));
    assert_eq!(last.recipient(), "alice");

    let err = engine
        .request_settlement(cmd("alice", "bob", 10, "alice"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
}

#[tokio::test]
async fn settlement_history_is_for_members_only() {
    let (engine, _events, group_id) = engine_with_group().await;
    personal_debt(&engine, group_id, "alice", "bob", 500).await;
    personal_debt(&engine, group_id, "carol", "bob", 500).await;

    let first = request(&engine, group_id, "alice", "bob", 100).await;
    engine
        .confirm_settlement(first.id, "bob", Utc::now())
        .await
        .unwrap();
    let second = request(&engine, group_id, "carol", "bob", 100).await;

    let history = engine.list_settlements(group_id, "carol").await.unwrap();
    assert_eq!(history.pending.len(), 1);
    assert_eq!(history.pending[0].id, second.id);
    assert_eq!(history.history.len(), 1);
    assert_eq!(history.history[0].id, first.id);

    let err = engine
        .list_settlements(group_id, "mallory")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[tokio::test]
async fn debt_balances_net_to_zero() {
    let (engine, _events, group_id) = engine_with_group().await;
    engine
        .record_expense(
            RecordExpenseCmd::new(group_id, "alice", cents(100), "Taxi", Utc::now())
                .split_with_group(),
        )
        .await
        .unwrap();
    personal_debt(&engine, group_id, "bob", "carol", 70).await;

    let balances = engine.debt_balances(group_id).await.unwrap();
    assert_eq!(balances.len(), 3);
    let total: MoneyCents = balances.iter().map(|b| b.net).sum();
    assert!(total.is_zero());

    let alice = &balances[0];
    assert_eq!(alice.member_id, "alice");
    // 100 split three ways: alice keeps the extra cent.
    assert_eq!(alice.net, cents(66));
}

#[tokio::test]
async fn expense_recording_validates_members() {
    let (engine, _events, group_id) = engine_with_group().await;

    let err = engine
        .record_expense(RecordExpenseCmd::new(
            group_id,
            "mallory",
            cents(100),
            "Taxi",
            Utc::now(),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    let err = engine
        .record_expense(
            RecordExpenseCmd::new(group_id, "alice", cents(100), "Taxi", Utc::now())
                .on_behalf_of("alice"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .record_expense(RecordExpenseCmd::new(
            Uuid::new_v4(),
            "alice",
            cents(100),
            "Taxi",
            Utc::now(),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    assert!(all_expenses(&engine, group_id).await.is_empty());
}

#[tokio::test]
async fn overflowing_expense_is_rejected_at_recording() {
    let (engine, _events, group_id) = engine_with_group().await;
    let half = cents(i64::MAX / 2 + 10);

    engine
        .record_expense(RecordExpenseCmd::new(
            group_id,
            "alice",
            half,
            "Flat deposit",
            Utc::now(),
        ))
        .await
        .unwrap();
    let err = engine
        .record_expense(RecordExpenseCmd::new(
            group_id,
            "alice",
            half,
            "Flat deposit",
            Utc::now(),
        ))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::Validation("amount overflow".to_string()));

    assert_eq!(all_expenses(&engine, group_id).await.len(), 1);
    let balances = engine.compute_balances(group_id).await.unwrap();
    assert!(balances.iter().all(|b| b.balance.is_zero()));
}

#[tokio::test]
async fn settlement_removes_expense_whose_normalized_amount_runs_out() {
    let (engine, _events, group_id) = engine_with_group().await;
    let converted = engine
        .record_expense(
            RecordExpenseCmd::new(group_id, "bob", cents(300), "Museum", Utc::now())
                .normalized_amount(cents(100))
                .on_behalf_of("alice"),
        )
        .await
        .unwrap();
    personal_debt(&engine, group_id, "alice", "bob", 100).await;

    let settlement = request(&engine, group_id, "alice", "bob", 200).await;
    engine
        .confirm_settlement(settlement.id, "bob", Utc::now())
        .await
        .unwrap();

    let expenses = all_expenses(&engine, group_id).await;
    assert!(expenses.iter().all(|e| e.id != converted.id));
    assert!(expenses.iter().all(|e| e.normalized_amount.is_positive()));
    assert!(all_debts(&engine, group_id).await.iter().all(|d| d.paid));
}
