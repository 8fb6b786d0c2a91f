// 用户操作：注册、登录、查询自己

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::error::ServiceError;
use crate::models::{NewUser, User};
use crate::store::DocumentStore;
use crate::utils::{hash_password_blocking, verify_password_blocking};

pub struct UserOperation {
    store: Arc<dyn DocumentStore>,
    bcrypt_cost: u32,
}

impl UserOperation {
    pub fn new(store: Arc<dyn DocumentStore>, bcrypt_cost: u32) -> Self {
        Self { store, bcrypt_cost }
    }

    pub async fn register(&self, input: NewUser) -> Result<User, ServiceError> {
        let valid = input.validate()?;
        let password_hash = hash_password_blocking(valid.password, self.bcrypt_cost).await?;

        let user = User {
            id: Uuid::new_v4(),
            email: valid.email,
            username: valid.username,
            full_name: valid.full_name,
            password_hash,
            created_at: Utc::now(),
        };
        self.store.insert_user(&user).await?;

        tracing::info!(user_id = %user.id, username = %user.username, "user registered");
        Ok(user)
    }

    /// 邮箱不存在和密码错误返回同一个错误
    pub async fn login(&self, email: &str, password: &str) -> Result<User, ServiceError> {
        let email = email.trim().to_lowercase();
        let Some(user) = self.store.find_user_by_email(&email).await? else {
            tracing::debug!(%email, "login for unknown email");
            return Err(ServiceError::Unauthenticated);
        };

        if !verify_password_blocking(password.to_string(), user.password_hash.clone()).await? {
            tracing::warn!(user_id = %user.id, "login with wrong password");
            return Err(ServiceError::Unauthenticated);
        }
        Ok(user)
    }

    pub async fn me(&self, caller: Uuid) -> Result<User, ServiceError> {
        self.store
            .find_user(caller)
            .await?
            .ok_or(ServiceError::NotFound("User"))
    }
}
