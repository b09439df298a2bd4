pub mod call_repository;
pub mod database;
pub mod refund_repository;
pub mod slot_repository;

use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct Repository {
    pub pool: Arc<SqlitePool>,
    pub slots: slot_repository::SlotRepository,
    pub calls: call_repository::CallRepository,
    pub refunds: refund_repository::RefundRepository,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        let pool = Arc::new(pool);
        Self {
            slots: slot_repository::SlotRepository::new(pool.clone()),
            calls: call_repository::CallRepository::new(pool.clone()),
            refunds: refund_repository::RefundRepository::new(pool.clone()),
            pool,
        }
    }
}
