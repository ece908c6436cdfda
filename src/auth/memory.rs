use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::Mutex;

use crate::auth::{
    repo::UserStore,
    repo_types::{NewUser, User},
};

/// In-process [`UserStore`] used by tests.
#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<User>>,
}

impl MemoryUserStore {
    fn insert(users: &mut Vec<User>, new: NewUser) -> User {
        let user = User {
            id: users.len() as i64 + 1,
            email: new.email,
            password_hash: new.password_hash,
            first_name: new.first_name,
            last_name: new.last_name,
            is_staff: new.is_staff,
            is_superuser: new.is_superuser,
            created_at: OffsetDateTime::now_utc(),
        };
        users.push(user.clone());
        user
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let users = self.users.lock().await;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
        let users = self.users.lock().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn create(&self, new: NewUser) -> anyhow::Result<User> {
        let mut users = self.users.lock().await;
        if users.iter().any(|u| u.email == new.email) {
            anyhow::bail!("duplicate key value violates unique constraint users_email_key");
        }
        Ok(Self::insert(&mut users, new))
    }

    async fn get_or_create(&self, new: NewUser) -> anyhow::Result<(User, bool)> {
        let mut users = self.users.lock().await;
        if let Some(existing) = users.iter().find(|u| u.email == new.email) {
            return Ok((existing.clone(), false));
        }
        Ok((Self::insert(&mut users, new), true))
    }
}
