use crate::database::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::*;

#[derive(Clone)]
pub struct UserService {
    pool: DbPool,
}

impl UserService {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn get_user(&self, user_id: i64) -> AppResult<User> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    pub async fn get_profile(&self, user_id: i64) -> AppResult<UserResponse> {
        Ok(UserResponse::from(self.get_user(user_id).await?))
    }

    pub async fn update_profile(
        &self,
        user_id: i64,
        request: UpdateUserRequest,
    ) -> AppResult<UserResponse> {
        if request.first_name.is_none()
            && request.last_name.is_none()
            && request.current_year.is_none()
            && request.graduation_year.is_none()
            && request.major.is_none()
        {
            return Err(AppError::ValidationError("No fields to update".to_string()));
        }

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET
                first_name = COALESCE($2, first_name),
                last_name = COALESCE($3, last_name),
                current_year = COALESCE($4, current_year),
                graduation_year = COALESCE($5, graduation_year),
                major = COALESCE($6, major),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(&request.first_name)
        .bind(&request.last_name)
        .bind(&request.current_year)
        .bind(request.graduation_year)
        .bind(&request.major)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        Ok(UserResponse::from(user))
    }

    pub async fn admin_status(&self, user_id: i64) -> AppResult<AdminStatusResponse> {
        let user = self.get_user(user_id).await?;
        Ok(AdminStatusResponse {
            is_admin: user.is_admin,
        })
    }

    /// Reject callers without the admin flag.
    pub async fn ensure_admin(&self, user_id: i64) -> AppResult<()> {
        let is_admin =
            sqlx::query_scalar::<_, bool>("SELECT is_admin FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?
                .unwrap_or(false);

        if is_admin {
            Ok(())
        } else {
            Err(AppError::PermissionDenied)
        }
    }

    pub async fn list_users(
        &self,
        params: &PaginationParams,
    ) -> AppResult<PaginatedResponse<UserResponse>> {
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        let users = sqlx::query_as::<_, User>(
            "SELECT * FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(params.get_limit() as i64)
        .bind(params.get_offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let items: Vec<UserResponse> = users.into_iter().map(UserResponse::from).collect();
        Ok(PaginatedResponse::new(items, params, total))
    }

    pub async fn set_admin(&self, user_id: i64, is_admin: bool) -> AppResult<UserResponse> {
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET is_admin = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(user_id)
        .bind(is_admin)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        log::info!("Admin flag for user {} set to {}", user_id, is_admin);
        Ok(UserResponse::from(user))
    }
}
