use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use crate::database::user_gateway::UserGateway;
use crate::error::{Error, Result};
use crate::models::user::{NewUser, User};

#[derive(Debug, Default)]
struct Table {
    next_id: i64,
    rows: Vec<User>,
}

/// Process-local gateway with the same contract as the Postgres one.
///
/// Rows live in insertion order, ids come from a counter that never reuses a
/// value, and email uniqueness is an exact, case-sensitive match.
#[derive(Clone, Debug, Default)]
pub struct InMemoryUserGateway {
    table: Arc<Mutex<Table>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemoryUserGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with [`Error::Connection`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Rows currently stored. Ignores the unavailable switch.
    pub fn row_count(&self) -> Result<usize> {
        Ok(self.lock()?.rows.len())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Table>> {
        self.table
            .lock()
            .map_err(|_| Error::Internal("in-memory user table poisoned".to_string()))
    }

    fn with_table<T>(&self, f: impl FnOnce(&mut Table) -> Result<T>) -> Result<T> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(Error::Connection("in-memory store marked unavailable".to_string()));
        }
        let mut guard = self.lock()?;
        f(&mut guard)
    }
}

#[async_trait]
impl UserGateway for InMemoryUserGateway {
    async fn list_users(&self) -> Result<Vec<User>> {
        self.with_table(|table| Ok(table.rows.clone()))
    }

    async fn insert_user(&self, new_user: NewUser) -> Result<User> {
        self.with_table(|table| {
            if table.rows.iter().any(|u| u.email == new_user.email) {
                return Err(Error::ConstraintViolation(format!(
                    "A user with email {} already exists",
                    new_user.email
                )));
            }

            table.next_id += 1;
            // Keep created_at non-decreasing even if the wall clock steps back.
            let now = Utc::now();
            let created_at = match table.rows.last() {
                Some(last) if last.created_at > now => last.created_at,
                _ => now,
            };
            let user = User {
                id: table.next_id,
                name: new_user.name,
                email: new_user.email,
                created_at,
            };
            table.rows.push(user.clone());
            Ok(user)
        })
    }

    async fn delete_user(&self, id: i64) -> Result<()> {
        self.with_table(|table| {
            table.rows.retain(|u| u.id != id);
            Ok(())
        })
    }

    async fn ping(&self) -> Result<()> {
        self.with_table(|_| Ok(()))
    }
}
