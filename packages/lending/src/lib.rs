// ABOUTME: Borrow/return transaction lifecycle package
// ABOUTME: State machine, quantity reservation, and overdue tracking for loans

pub mod service;
pub mod storage;
pub mod types;

pub use service::{is_overdue, LendingError, LendingResult, LendingService};
pub use storage::TransactionStorage;
pub use types::{
    BorrowRequestInput, Requester, ReturnCondition, TopComponent, Transaction,
    TransactionFilter, TransactionStatus,
};
