//! Identity collaborator: users and their roles.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use domain::{Role, UserId};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{Result, SagaError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub role: Role,
}

#[async_trait]
pub trait IdentityService: Send + Sync {
    async fn get_user(&self, id: UserId) -> Result<User>;
}

/// In-memory identity service for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIdentityService {
    users: Arc<RwLock<HashMap<UserId, User>>>,
}

impl InMemoryIdentityService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new user with the given role.
    pub async fn register(&self, role: Role) -> User {
        let user = User {
            id: UserId::new(),
            role,
        };
        self.users.write().await.insert(user.id, user);
        user
    }
}

#[async_trait]
impl IdentityService for InMemoryIdentityService {
    async fn get_user(&self, id: UserId) -> Result<User> {
        self.users
            .read()
            .await
            .get(&id)
            .copied()
            .ok_or_else(|| SagaError::not_found("user", id))
    }
}
