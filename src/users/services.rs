use std::sync::Arc;

use anyhow::Context;
use time::OffsetDateTime;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::users::{
    dto::{CreateUserRequest, ListUsersQuery, UpdateUserRequest, UserPage, UserView},
    password::SecretHasher,
    repo::UserRepository,
    repo_types::{UserChanges, UserRow},
    validation::{validate_create, validate_query, validate_update},
};

/// The user record store: validates input, enforces email uniqueness and
/// hashes passwords before anything reaches the repository.
#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
    hasher: Arc<dyn SecretHasher>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>, hasher: Arc<dyn SecretHasher>) -> Self {
        Self { repo, hasher }
    }

    pub async fn create(&self, input: CreateUserRequest) -> AppResult<UserView> {
        let new_user = validate_create(input)?;

        if self.repo.find_by_email(&new_user.email).await?.is_some() {
            warn!(email = %new_user.email, "email already registered");
            return Err(AppError::email_taken());
        }

        let hasher = self.hasher.clone();
        let plain = new_user.password;
        let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&plain))
            .await
            .context("password hashing task")??;

        let now = OffsetDateTime::now_utc();
        let row = UserRow {
            id: Uuid::new_v4(),
            first_name: new_user.first_name,
            last_name: new_user.last_name,
            email: new_user.email,
            password_hash,
            age: new_user.age,
            phone: new_user.phone,
            role: new_user.role,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        // the unique constraint still decides a race between two creates
        let user = self.repo.insert(row).await.inspect_err(|e| {
            if matches!(e, AppError::Conflict(_)) {
                warn!("email claimed concurrently");
            }
        })?;

        info!(user_id = %user.id, email = %user.email, "user created");
        Ok(user.into())
    }

    pub async fn list(&self, query: ListUsersQuery) -> AppResult<UserPage> {
        let filter = validate_query(query)?;
        let (rows, total) = self.repo.list(&filter).await?;
        let total_pages = (total + filter.limit - 1) / filter.limit;
        Ok(UserPage {
            users: rows.into_iter().map(UserView::from).collect(),
            total,
            page: filter.page,
            limit: filter.limit,
            total_pages,
        })
    }

    pub async fn get(&self, id: Uuid) -> AppResult<UserView> {
        let user = self.repo.find_by_id(id).await?.ok_or_else(|| {
            warn!(user_id = %id, "user not found");
            AppError::user_not_found()
        })?;
        Ok(user.into())
    }

    pub async fn update(&self, id: Uuid, input: UpdateUserRequest) -> AppResult<UserView> {
        let changes = validate_update(input)?;
        let user = self.apply(id, changes).await?;
        info!(user_id = %user.id, "user updated");
        Ok(user.into())
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        if !self.repo.delete(id).await? {
            warn!(user_id = %id, "delete of unknown user");
            return Err(AppError::user_not_found());
        }
        info!(user_id = %id, "user deleted");
        Ok(())
    }

    pub async fn deactivate(&self, id: Uuid) -> AppResult<()> {
        self.apply(id, UserChanges::deactivate()).await?;
        info!(user_id = %id, "user deactivated");
        Ok(())
    }

    pub async fn ping(&self) -> bool {
        match self.repo.ping().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "store ping failed");
                false
            }
        }
    }

    async fn apply(&self, id: Uuid, changes: UserChanges) -> AppResult<UserRow> {
        let current = self.repo.find_by_id(id).await?.ok_or_else(|| {
            warn!(user_id = %id, "update of unknown user");
            AppError::user_not_found()
        })?;

        if let Some(email) = &changes.email {
            if *email != current.email {
                if let Some(owner) = self.repo.find_by_email(email).await? {
                    if owner.id != id {
                        warn!(user_id = %id, email = %email, "email already registered");
                        return Err(AppError::email_taken());
                    }
                }
            }
        }

        self.repo
            .update(id, &changes, OffsetDateTime::now_utc())
            .await?
            .ok_or_else(AppError::user_not_found)
    }
}
