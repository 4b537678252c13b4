use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::User => write!(f, "user"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            _ => Err(format!("unknown role: {s}")),
        }
    }
}

/// User record as stored. Only `UserView` leaves the store.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
    pub age: Option<i32>,
    pub phone: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Validated partial update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub age: Option<i32>,
    pub phone: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

impl UserChanges {
    pub fn deactivate() -> Self {
        Self {
            is_active: Some(false),
            ..Self::default()
        }
    }

    pub fn apply(&self, row: &mut UserRow, updated_at: OffsetDateTime) {
        if let Some(v) = &self.first_name {
            row.first_name = v.clone();
        }
        if let Some(v) = &self.last_name {
            row.last_name = v.clone();
        }
        if let Some(v) = &self.email {
            row.email = v.clone();
        }
        if let Some(v) = self.age {
            row.age = Some(v);
        }
        if let Some(v) = &self.phone {
            row.phone = Some(v.clone());
        }
        if let Some(v) = self.role {
            row.role = v;
        }
        if let Some(v) = self.is_active {
            row.is_active = v;
        }
        row.updated_at = updated_at;
    }
}

/// Validated list query: search OR-ed across name/email fields, AND-ed with the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserFilter {
    pub search: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub page: i64,
    pub limit: i64,
}

impl Default for UserFilter {
    fn default() -> Self {
        Self {
            search: None,
            role: None,
            is_active: None,
            page: 1,
            limit: 10,
        }
    }
}

impl UserFilter {
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn matches(&self, row: &UserRow) -> bool {
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let hit = row.first_name.to_lowercase().contains(&needle)
                || row.last_name.to_lowercase().contains(&needle)
                || row.email.to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }
        if let Some(role) = self.role {
            if row.role != role {
                return false;
            }
        }
        if let Some(active) = self.is_active {
            if row.is_active != active {
                return false;
            }
        }
        true
    }

    /// ILIKE pattern with `%`, `_` and `\` matched literally.
    pub fn like_pattern(&self) -> Option<String> {
        self.search.as_ref().map(|s| {
            let mut escaped = String::with_capacity(s.len() + 2);
            escaped.push('%');
            for c in s.chars() {
                if matches!(c, '%' | '_' | '\\') {
                    escaped.push('\\');
                }
                escaped.push(c);
            }
            escaped.push('%');
            escaped
        })
    }
}
