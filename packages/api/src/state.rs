// ABOUTME: Shared application state for API handlers
// ABOUTME: Holds the pool and per-domain storage/service handles

use std::sync::Arc;

use sqlx::SqlitePool;

use labstock_chat::ChatService;
use labstock_inventory::ComponentStorage;
use labstock_lending::{LendingService, TransactionStorage};

/// Database state shared across handlers via axum's `State` extractor.
#[derive(Clone)]
pub struct DbState {
    pub pool: SqlitePool,
    pub components: Arc<ComponentStorage>,
    pub transactions: Arc<TransactionStorage>,
    pub lending: Arc<LendingService>,
    pub chat: Arc<ChatService>,
}

impl DbState {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            components: Arc::new(ComponentStorage::new(pool.clone())),
            transactions: Arc::new(TransactionStorage::new(pool.clone())),
            lending: Arc::new(LendingService::new(pool.clone())),
            chat: Arc::new(ChatService::new(pool.clone())),
            pool,
        }
    }
}
