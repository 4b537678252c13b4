use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::users::repo::UserRepository;
use crate::users::repo_types::{UserChanges, UserFilter, UserRow};

#[derive(Default)]
struct Table {
    rows: HashMap<Uuid, (u64, UserRow)>,
    next_seq: u64,
}

impl Table {
    fn email_owner(&self, email: &str) -> Option<Uuid> {
        self.rows
            .values()
            .find(|(_, r)| r.email == email)
            .map(|(_, r)| r.id)
    }
}

/// Process-local `UserRepository`. Every write takes the table lock, so the
/// email check and the write happen atomically.
#[derive(Clone, Default)]
pub struct InMemoryUserRepository {
    table: Arc<RwLock<Table>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn insert(&self, user: UserRow) -> AppResult<UserRow> {
        let mut table = self.table.write().await;
        if table.email_owner(&user.email).is_some() {
            return Err(AppError::email_taken());
        }
        if table.rows.contains_key(&user.id) {
            return Err(AppError::Internal(anyhow::anyhow!(
                "duplicate primary key {}",
                user.id
            )));
        }
        let seq = table.next_seq;
        table.next_seq += 1;
        table.rows.insert(user.id, (seq, user.clone()));
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<UserRow>> {
        let table = self.table.read().await;
        Ok(table.rows.get(&id).map(|(_, r)| r.clone()))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserRow>> {
        let table = self.table.read().await;
        let row = table
            .rows
            .values()
            .find(|(_, r)| r.email == email)
            .map(|(_, r)| r.clone());
        Ok(row)
    }

    async fn list(&self, filter: &UserFilter) -> AppResult<(Vec<UserRow>, i64)> {
        let table = self.table.read().await;
        let mut hits: Vec<&(u64, UserRow)> = table
            .rows
            .values()
            .filter(|(_, r)| filter.matches(r))
            .collect();
        let total = hits.len() as i64;

        // newest first; insertion order breaks timestamp ties
        hits.sort_by(|(sa, a), (sb, b)| b.created_at.cmp(&a.created_at).then(sb.cmp(sa)));

        let rows = hits
            .into_iter()
            .skip(usize::try_from(filter.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(filter.limit).unwrap_or(0))
            .map(|(_, r)| r.clone())
            .collect();
        Ok((rows, total))
    }

    async fn update(
        &self,
        id: Uuid,
        changes: &UserChanges,
        updated_at: OffsetDateTime,
    ) -> AppResult<Option<UserRow>> {
        let mut table = self.table.write().await;
        if let Some(email) = &changes.email {
            if table.email_owner(email).is_some_and(|owner| owner != id) {
                return Err(AppError::email_taken());
            }
        }
        let Some((_, row)) = table.rows.get_mut(&id) else {
            return Ok(None);
        };
        changes.apply(row, updated_at);
        Ok(Some(row.clone()))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let mut table = self.table.write().await;
        Ok(table.rows.remove(&id).is_some())
    }

    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
