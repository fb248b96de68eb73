use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use crate::journal::Journal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tracing::error;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub order_id: u64,
    pub name: String,
    pub transport_id: u64,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Order {0} not found")]
    NotFound(u64),

    #[error("Order store lock is poisoned.")]
    Poisoned,

    #[error("Journal I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Journal encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Journal entry {0} is corrupt.")]
    CorruptJournal(u64),
}

impl<T> From<PoisonError<T>> for StoreError {
    fn from(_err: PoisonError<T>) -> Self {
        Self::Poisoned
    }
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        match self {
            StoreError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        }
        .into_response()
    }
}

#[derive(Default)]
struct Table {
    orders: HashMap<u64, Order>,
    journal: Option<Journal>,
}

/// Order table keyed by `order_id`, optionally backed by an on-disk [`Journal`].
#[derive(Clone, Default)]
pub struct OrderStore {
    table: Arc<RwLock<Table>>,
}

impl OrderStore {
    /// A store that lives only in memory.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// A store persisted in `dir`, snapshotting after every `snapshot_every` committed inserts.
    pub fn open(dir: impl AsRef<Path>, snapshot_every: u64) -> Result<Self, StoreError> {
        let (journal, orders) = Journal::open(dir, snapshot_every)?;
        Ok(Self {
            table: Arc::new(RwLock::new(Table {
                orders,
                journal: Some(journal),
            })),
        })
    }

    /// An in-memory store holding `count` placeholder orders with ids `0..count`.
    pub fn with_test_orders(count: u64) -> Result<Self, StoreError> {
        let store = Self::in_memory();
        store.seed_test_orders(count)?;
        Ok(store)
    }

    /// Insert `count` placeholder orders, but only into an empty store. Returns whether it did.
    pub fn seed_test_orders(&self, count: u64) -> Result<bool, StoreError> {
        if !self.is_empty()? {
            return Ok(false);
        }

        for order_id in 0..count {
            self.insert(Order {
                order_id,
                name: "TestOrder".to_string(),
                transport_id: 2,
            })?;
        }
        Ok(true)
    }

    /// Insert or replace the order with the same id. With a journal, the insert is committed to
    /// disk before it becomes visible.
    pub fn insert(&self, order: Order) -> Result<(), StoreError> {
        let mut table = self.table.write()?;
        let Table { orders, journal } = &mut *table;

        if let Some(journal) = journal.as_mut() {
            journal.append(&order)?;
        }
        orders.insert(order.order_id, order);

        if let Some(journal) = journal.as_mut().filter(|journal| journal.needs_snapshot()) {
            if let Err(err) = journal.snapshot(orders) {
                error!("Snapshot failed, journal keeps growing: {err}");
            }
        }
        Ok(())
    }

    pub fn get(&self, order_id: u64) -> Result<Order, StoreError> {
        self.table
            .read()?
            .orders
            .get(&order_id)
            .cloned()
            .ok_or(StoreError::NotFound(order_id))
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.table.read()?.orders.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}
