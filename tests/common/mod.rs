#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tombstone::{
    Backend, EntityType, FixedClock, InMemoryBackend, Record, Relation, Result, Row, Store,
    StoreError, TableSchema, UniquenessRule, Value,
};

pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

/// Store over a fresh in-memory backend, with a pinned clock.
pub fn store() -> (Store, Arc<InMemoryBackend>) {
    let backend = Arc::new(InMemoryBackend::new());
    let store = Store::new(backend.clone()).with_clock(Arc::new(FixedClock(fixed_time())));
    (store, backend)
}

/// `users(email, tenant_id, deleted_at)` with a uniqueness rule on email.
pub async fn users_store(rule: UniquenessRule) -> (Store, Arc<InMemoryBackend>) {
    let (store, backend) = store();
    let users = store
        .define("users")
        .attributes(["email", "tenant_id"])
        .tombstoned()
        .validates_uniqueness_of(rule)
        .build()
        .unwrap();
    store.register(users).await.unwrap();
    (store, backend)
}

pub async fn create_user(store: &Store, email: &str) -> Record {
    let mut user = store.new_record("users").unwrap().with("email", email);
    assert!(store.save(&mut user).await.unwrap(), "{:?}", user.errors);
    user
}

pub async fn visible_count(store: &Store, name: &str) -> usize {
    store
        .all(name)
        .unwrap()
        .count(store.backend().as_ref())
        .await
        .unwrap()
}

pub async fn total_count(store: &Store, name: &str) -> usize {
    store
        .with_tombstoned(name)
        .unwrap()
        .count(store.backend().as_ref())
        .await
        .unwrap()
}

/// Backend that can be told to fail reads or writes.
pub struct FailingBackend {
    inner: InMemoryBackend,
    pub fail_reads: AtomicBool,
    pub fail_writes: AtomicBool,
}

impl FailingBackend {
    pub fn new() -> Self {
        Self {
            inner: InMemoryBackend::new(),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
        }
    }

    fn check(&self, flag: &AtomicBool, op: &str) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            Err(StoreError::Storage(format!("{} unavailable", op)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Backend for FailingBackend {
    async fn create_table(&self, schema: TableSchema) -> Result<()> {
        self.inner.create_table(schema).await
    }

    async fn insert(&self, table: &str, row: Row) -> Result<i64> {
        self.check(&self.fail_writes, "insert")?;
        self.inner.insert(table, row).await
    }

    async fn update(&self, table: &str, id: i64, row: Row) -> Result<()> {
        self.check(&self.fail_writes, "update")?;
        self.inner.update(table, id, row).await
    }

    async fn update_column(&self, table: &str, id: i64, column: &str, value: Value) -> Result<()> {
        self.check(&self.fail_writes, "update_column")?;
        self.inner.update_column(table, id, column, value).await
    }

    async fn delete(&self, table: &str, id: i64) -> Result<bool> {
        self.check(&self.fail_writes, "delete")?;
        self.inner.delete(table, id).await
    }

    async fn select(&self, relation: &Relation) -> Result<Vec<(i64, Row)>> {
        self.check(&self.fail_reads, "select")?;
        self.inner.select(relation).await
    }

    async fn count(&self, relation: &Relation) -> Result<usize> {
        self.check(&self.fail_reads, "count")?;
        self.inner.count(relation).await
    }

    async fn exists(&self, relation: &Relation) -> Result<bool> {
        self.check(&self.fail_reads, "exists")?;
        self.inner.exists(relation).await
    }
}

pub async fn failing_users_store() -> (Store, Arc<FailingBackend>) {
    let backend = Arc::new(FailingBackend::new());
    let store = Store::new(backend.clone());
    let users: EntityType = store
        .define("users")
        .attribute("email")
        .tombstoned()
        .validates_uniqueness_of(UniquenessRule::new("email"))
        .build()
        .unwrap();
    store.register(users).await.unwrap();
    (store, backend)
}
