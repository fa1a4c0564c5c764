// ABOUTME: Tests for the transaction lifecycle service
// ABOUTME: Covers state-machine legality, quantity conservation, and overdue handling

use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;
use sqlx::SqlitePool;

use super::*;
use labstock_inventory::types::{ComponentCategory, ComponentCreateInput};

async fn setup_test_db() -> SqlitePool {
    let pool = SqlitePool::connect(":memory:").await.unwrap();
    labstock_storage::run_migrations(&pool).await.unwrap();
    pool
}

async fn seed_component(pool: &SqlitePool, name: &str, total: i64) -> Component {
    ComponentStorage::new(pool.clone())
        .create_component(
            Some("admin-1"),
            ComponentCreateInput {
                name: name.to_string(),
                description: None,
                category: ComponentCategory::Microcontroller,
                total_quantity: total,
                available_quantity: total,
                location: Some("Shelf A3".to_string()),
                image_url: None,
                tags: vec![],
            },
        )
        .await
        .unwrap()
}

fn student() -> Requester {
    Requester {
        user_id: "student-1".to_string(),
        name: "Ada Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        roll_number: None,
    }
}

fn borrow(component_id: &str, quantity: i64) -> BorrowRequestInput {
    BorrowRequestInput {
        component_id: component_id.to_string(),
        quantity,
        purpose: Some("course project".to_string()),
        expected_return_date: None,
    }
}

async fn available(pool: &SqlitePool, component_id: &str) -> i64 {
    sqlx::query_scalar("SELECT available_quantity FROM components WHERE id = ?")
        .bind(component_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

/// available + sum of issued/overdue quantities must always equal total.
async fn assert_conserved(pool: &SqlitePool, service: &LendingService, component_id: &str) {
    let component_available = available(pool, component_id).await;
    let outstanding = service
        .transactions()
        .outstanding_quantity(component_id)
        .await
        .unwrap();
    let total: i64 = sqlx::query_scalar("SELECT total_quantity FROM components WHERE id = ?")
        .bind(component_id)
        .fetch_one(pool)
        .await
        .unwrap();
    assert_eq!(component_available + outstanding, total);
}

#[tokio::test]
async fn test_request_approve_return_scenario() {
    let pool = setup_test_db().await;
    let component = seed_component(&pool, "ESP32", 5).await;
    let service = LendingService::new(pool.clone());

    // Request does not reserve stock
    let tx = service
        .request(borrow(&component.id, 3), &student())
        .await
        .unwrap();
    assert_eq!(tx.status, TransactionStatus::Pending);
    assert_eq!(available(&pool, &component.id).await, 5);
    assert_conserved(&pool, &service, &component.id).await;

    // Approval commits the reservation
    let before = Utc::now();
    let tx = service.approve(&tx.id, "admin-1", 7).await.unwrap();
    assert_eq!(tx.status, TransactionStatus::Issued);
    assert_eq!(tx.approved_by.as_deref(), Some("admin-1"));
    assert_eq!(available(&pool, &component.id).await, 2);
    let due = tx.due_date.unwrap();
    assert!(due >= before + Duration::days(7));
    assert!(due <= Utc::now() + Duration::days(7));
    assert_conserved(&pool, &service, &component.id).await;

    // Return restores stock
    let tx = service
        .return_component(&tx.id, ReturnCondition::Good)
        .await
        .unwrap();
    assert_eq!(tx.status, TransactionStatus::Returned);
    assert_eq!(tx.return_condition, Some(ReturnCondition::Good));
    assert!(tx.return_date.is_some());
    assert_eq!(available(&pool, &component.id).await, 5);
    assert_conserved(&pool, &service, &component.id).await;

    // A second return must fail and must not double-increment
    let err = service
        .return_component(&tx.id, ReturnCondition::Good)
        .await
        .unwrap_err();
    assert!(matches!(err, LendingError::InvalidState { .. }));
    assert_eq!(available(&pool, &component.id).await, 5);
}

#[tokio::test]
async fn test_request_rejects_bad_quantities() {
    let pool = setup_test_db().await;
    let component = seed_component(&pool, "ESP32", 5).await;
    let service = LendingService::new(pool.clone());

    for quantity in [0, -3, MAX_REQUEST_QUANTITY + 1] {
        let err = service
            .request(borrow(&component.id, quantity), &student())
            .await
            .unwrap_err();
        assert!(matches!(err, LendingError::InvalidQuantity(_)));
    }

    let err = service
        .request(borrow(&component.id, 6), &student())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LendingError::InsufficientAvailability {
            requested: 6,
            available: 5
        }
    ));

    let err = service
        .request(borrow("no-such-component", 1), &student())
        .await
        .unwrap_err();
    assert!(matches!(err, LendingError::NotFound(_)));
}

#[tokio::test]
async fn test_approve_revalidates_availability() {
    let pool = setup_test_db().await;
    let component = seed_component(&pool, "ESP32", 5).await;
    let service = LendingService::new(pool.clone());

    // Two requests both pass the soft check against 5 available
    let first = service
        .request(borrow(&component.id, 4), &student())
        .await
        .unwrap();
    let second = service
        .request(borrow(&component.id, 4), &student())
        .await
        .unwrap();

    service.approve(&first.id, "admin-1", 7).await.unwrap();

    // Stock moved since the second request; approval must re-check
    let err = service.approve(&second.id, "admin-1", 7).await.unwrap_err();
    assert!(matches!(
        err,
        LendingError::InsufficientAvailability {
            requested: 4,
            available: 1
        }
    ));

    // The failed approval left the request pending and stock untouched
    let second = service
        .transactions()
        .get_transaction(&second.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second.status, TransactionStatus::Pending);
    assert_eq!(available(&pool, &component.id).await, 1);
    assert_conserved(&pool, &service, &component.id).await;
}

#[tokio::test]
async fn test_state_machine_legality() {
    let pool = setup_test_db().await;
    let component = seed_component(&pool, "ESP32", 5).await;
    let service = LendingService::new(pool.clone());

    let tx = service
        .request(borrow(&component.id, 1), &student())
        .await
        .unwrap();

    // Return before issue
    let err = service
        .return_component(&tx.id, ReturnCondition::Good)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LendingError::InvalidState {
            operation: "return",
            status: TransactionStatus::Pending
        }
    ));

    service.approve(&tx.id, "admin-1", 7).await.unwrap();

    // Approve twice
    let err = service.approve(&tx.id, "admin-1", 7).await.unwrap_err();
    assert!(matches!(
        err,
        LendingError::InvalidState {
            operation: "approve",
            status: TransactionStatus::Issued
        }
    ));

    // Reject after issue
    let err = service.reject(&tx.id, Some("late")).await.unwrap_err();
    assert!(matches!(
        err,
        LendingError::InvalidState {
            operation: "reject",
            status: TransactionStatus::Issued
        }
    ));

    // Failed transitions left state and stock unchanged
    assert_eq!(available(&pool, &component.id).await, 4);
    assert_conserved(&pool, &service, &component.id).await;
}

#[tokio::test]
async fn test_reject_keeps_stock_untouched() {
    let pool = setup_test_db().await;
    let component = seed_component(&pool, "ESP32", 5).await;
    let service = LendingService::new(pool.clone());

    let tx = service
        .request(borrow(&component.id, 2), &student())
        .await
        .unwrap();
    let tx = service.reject(&tx.id, Some("out of policy")).await.unwrap();

    assert_eq!(tx.status, TransactionStatus::Rejected);
    assert_eq!(tx.admin_notes.as_deref(), Some("out of policy"));
    assert_eq!(available(&pool, &component.id).await, 5);

    let err = service.reject(&tx.id, None).await.unwrap_err();
    assert!(matches!(err, LendingError::InvalidState { .. }));
}

#[tokio::test]
async fn test_direct_issue_commits_atomically() {
    let pool = setup_test_db().await;
    let component = seed_component(&pool, "ESP32", 5).await;
    let service = LendingService::new(pool.clone());

    let kiosk_user = Requester::from_roll_number("21bce042", "Grace Hopper");
    assert_eq!(kiosk_user.roll_number.as_deref(), Some("21BCE042"));

    let tx = service
        .direct_issue(borrow(&component.id, 2), &kiosk_user, 7)
        .await
        .unwrap();
    assert_eq!(tx.status, TransactionStatus::Issued);
    assert!(tx.issue_date.is_some());
    assert!(tx.due_date.is_some());
    assert_eq!(available(&pool, &component.id).await, 3);
    assert_conserved(&pool, &service, &component.id).await;

    // Same roll number cannot borrow the same component again
    let err = service
        .direct_issue(borrow(&component.id, 1), &kiosk_user, 7)
        .await
        .unwrap_err();
    assert!(matches!(err, LendingError::AlreadyBorrowed { .. }));

    // Returning clears the guard
    service
        .return_component(&tx.id, ReturnCondition::Good)
        .await
        .unwrap();
    service
        .direct_issue(borrow(&component.id, 1), &kiosk_user, 7)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_direct_issue_insufficient_stock() {
    let pool = setup_test_db().await;
    let component = seed_component(&pool, "ESP32", 2).await;
    let service = LendingService::new(pool.clone());

    let err = service
        .direct_issue(
            borrow(&component.id, 3),
            &Requester::from_roll_number("21BCE001", "A"),
            7,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LendingError::InsufficientAvailability { .. }));
    assert_eq!(available(&pool, &component.id).await, 2);
}

#[tokio::test]
async fn test_due_days_bounds() {
    let pool = setup_test_db().await;
    let component = seed_component(&pool, "ESP32", 5).await;
    let service = LendingService::new(pool.clone());

    let tx = service
        .request(borrow(&component.id, 1), &student())
        .await
        .unwrap();

    for due_days in [0, -1, MAX_DUE_DAYS + 1] {
        let err = service.approve(&tx.id, "admin-1", due_days).await.unwrap_err();
        assert!(matches!(err, LendingError::InvalidDueDays(_)));
    }

    service.approve(&tx.id, "admin-1", MAX_DUE_DAYS).await.unwrap();
}

#[tokio::test]
async fn test_concurrent_approvals_of_last_unit() {
    let dir = tempfile::tempdir().unwrap();
    let pool = labstock_storage::connect(&dir.path().join("labstock.db"))
        .await
        .unwrap();
    let component = seed_component(&pool, "ESP32", 1).await;
    let service = std::sync::Arc::new(LendingService::new(pool.clone()));

    let first = service
        .request(borrow(&component.id, 1), &student())
        .await
        .unwrap();
    let second = service
        .request(borrow(&component.id, 1), &student())
        .await
        .unwrap();

    let (a, b) = tokio::join!(
        {
            let service = service.clone();
            let id = first.id.clone();
            async move { service.approve(&id, "admin-1", 7).await }
        },
        {
            let service = service.clone();
            let id = second.id.clone();
            async move { service.approve(&id, "admin-2", 7).await }
        }
    );

    // Exactly one approval wins the conditional decrement
    let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1);
    let failure = if a.is_err() { a } else { b };
    assert!(matches!(
        failure.unwrap_err(),
        LendingError::InsufficientAvailability { .. }
    ));

    assert_eq!(available(&pool, &component.id).await, 0);
    assert_conserved(&pool, &service, &component.id).await;
}

#[tokio::test]
async fn test_is_overdue_predicate() {
    let pool = setup_test_db().await;
    let component = seed_component(&pool, "ESP32", 5).await;
    let service = LendingService::new(pool.clone());
    let now = Utc::now();

    let tx = service
        .request(borrow(&component.id, 1), &student())
        .await
        .unwrap();
    assert!(!is_overdue(&tx, now));

    let tx = service.approve(&tx.id, "admin-1", 7).await.unwrap();
    assert!(!is_overdue(&tx, now));
    assert!(is_overdue(&tx, now + Duration::days(8)));

    let tx = service
        .return_component(&tx.id, ReturnCondition::Good)
        .await
        .unwrap();
    assert!(!is_overdue(&tx, now + Duration::days(8)));
}

#[tokio::test]
async fn test_overdue_sweep_is_idempotent_and_reversible_only_by_return() {
    let pool = setup_test_db().await;
    let component = seed_component(&pool, "ESP32", 5).await;
    let service = LendingService::new(pool.clone());

    let tx = service
        .request(borrow(&component.id, 2), &student())
        .await
        .unwrap();
    service.approve(&tx.id, "admin-1", 7).await.unwrap();

    // Not yet due
    assert_eq!(service.sweep_overdue(Utc::now()).await.unwrap(), 0);

    let later = Utc::now() + Duration::days(8);
    assert_eq!(service.sweep_overdue(later).await.unwrap(), 1);
    // Second run finds nothing new
    assert_eq!(service.sweep_overdue(later).await.unwrap(), 0);

    let tx = service
        .transactions()
        .get_transaction(&tx.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(tx.status, TransactionStatus::Overdue);
    // Overdue still holds stock
    assert_conserved(&pool, &service, &component.id).await;

    // Returning an overdue loan restores stock and closes it out
    let tx = service
        .return_component(&tx.id, ReturnCondition::Damaged)
        .await
        .unwrap();
    assert_eq!(tx.status, TransactionStatus::Returned);
    assert_eq!(available(&pool, &component.id).await, 5);
    assert_eq!(service.sweep_overdue(later).await.unwrap(), 0);
}
