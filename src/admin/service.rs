use chrono::{DateTime, Months, NaiveTime, Utc};
use uuid::Uuid;

use crate::admin::dto::{
    CreateUserRequest, DashboardStats, ListUsersQuery, RecentUser, UpdateUserRequest,
};
use crate::admin::repository::{AdminRepository, UserChanges};
use crate::auth::auth_repository::RefreshTokenRepository;
use crate::auth::password::hash_password_async;
use crate::error::{AppError, Result};
use crate::pagination::{PageParams, PaginatedResponse};
use crate::user::{NewUser, Role, User, UserRepository, UserResponse};

const RECENT_USERS_LIMIT: i64 = 5;

#[derive(Clone)]
pub struct AdminService {
    repository: AdminRepository,
    user_repository: UserRepository,
    refresh_token_repository: RefreshTokenRepository,
}

impl AdminService {
    pub fn new(
        repository: AdminRepository,
        user_repository: UserRepository,
        refresh_token_repository: RefreshTokenRepository,
    ) -> Self {
        Self {
            repository,
            user_repository,
            refresh_token_repository,
        }
    }

    pub async fn dashboard_stats(&self, now: DateTime<Utc>) -> Result<DashboardStats> {
        let today = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        let week_start = today - chrono::Duration::days(7);
        let month_start = today.checked_sub_months(Months::new(1)).unwrap_or(week_start);

        let recent_users = self
            .repository
            .find_recent_users(RECENT_USERS_LIMIT)
            .await?
            .into_iter()
            .map(RecentUser::from)
            .collect();

        Ok(DashboardStats {
            total_users: self.repository.count_users().await?,
            active_users: self.repository.count_active_users().await?,
            admin_users: self.repository.count_users_with_role(Role::Admin).await?,
            new_users_today: self.repository.count_users_created_since(today).await?,
            new_users_this_week: self.repository.count_users_created_since(week_start).await?,
            new_users_this_month: self.repository.count_users_created_since(month_start).await?,
            recent_users,
        })
    }

    pub async fn list_users(&self, query: &ListUsersQuery) -> Result<PaginatedResponse<UserResponse>> {
        let (page, page_size) = query.page_params().normalize();
        let offset = PageParams::offset(page, page_size);

        let (users, total) = self.repository.find_users(query, page_size, offset).await?;
        let items = users.into_iter().map(UserResponse::from).collect();

        Ok(PaginatedResponse::new(items, total, page, page_size))
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<User> {
        self.user_repository
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    pub async fn create_user(&self, input: CreateUserRequest) -> Result<User> {
        let password_hash = hash_password_async(input.password).await?;
        let name = input.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());

        let mut new_user = NewUser::new(
            input.email,
            password_hash,
            name,
            input.role.unwrap_or(Role::User),
        );
        new_user.is_active = input.is_active.unwrap_or(true);

        let user = self
            .user_repository
            .create(&new_user)
            .await
            .map_err(|err| match err {
                AppError::UserExists => AppError::Conflict("Email already exists".to_string()),
                other => other,
            })?;

        tracing::info!(user_id = %user.id, role = user.role.as_str(), "User created by admin");
        Ok(user)
    }

    /// A password change or deactivation also ends every session of the user.
    pub async fn update_user(&self, user_id: Uuid, input: UpdateUserRequest) -> Result<User> {
        let password_hash = match input.password {
            Some(password) => Some(hash_password_async(password).await?),
            None => None,
        };
        let revoke_sessions = password_hash.is_some() || input.is_active == Some(false);

        let changes = UserChanges {
            email: input.email,
            password_hash,
            name: input.name.map(|n| n.trim().to_string()),
            role: input.role,
            is_active: input.is_active,
        };

        let mut tx = self.repository.pool().begin().await?;
        let user = self
            .repository
            .update_user_with_tx(&mut tx, user_id, changes)
            .await?;
        if revoke_sessions {
            self.refresh_token_repository
                .delete_all_for_user_with_tx(&mut tx, user_id)
                .await?;
        }
        tx.commit().await?;

        tracing::info!(%user_id, revoke_sessions, "User updated by admin");
        Ok(user)
    }

    /// Soft-deletes the user and drops their refresh tokens.
    pub async fn delete_user(&self, actor_id: Uuid, user_id: Uuid) -> Result<()> {
        if actor_id == user_id {
            return Err(AppError::BadRequest(
                "You cannot delete your own account".to_string(),
            ));
        }

        let mut tx = self.repository.pool().begin().await?;
        if !self
            .repository
            .soft_delete_with_tx(&mut tx, user_id, Utc::now())
            .await?
        {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        self.refresh_token_repository
            .delete_all_for_user_with_tx(&mut tx, user_id)
            .await?;
        tx.commit().await?;

        tracing::info!(%user_id, %actor_id, "User deleted by admin");
        Ok(())
    }
}
