//! # Session auth provider
//!
//! Process-local implementation of `AuthProvider`: holds at most one
//! signed-in user. The hosted backend owns real sessions; this stands in for
//! it in the CLI and in tests.

use async_trait::async_trait;
use domains::models::User;
use domains::traits::AuthProvider;
use tokio::sync::RwLock;
use tracing::info;

#[derive(Default)]
pub struct SessionAuthProvider {
    current: RwLock<Option<User>>,
}

impl SessionAuthProvider {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn signed_in(user: User) -> Self {
        Self {
            current: RwLock::new(Some(user)),
        }
    }

    pub async fn sign_in(&self, user: User) {
        info!(user = %user.username, "signed in");
        *self.current.write().await = Some(user);
    }

    pub async fn sign_out(&self) {
        *self.current.write().await = None;
    }
}

#[async_trait]
impl AuthProvider for SessionAuthProvider {
    async fn current_user(&self) -> Option<User> {
        self.current.read().await.clone()
    }
}
