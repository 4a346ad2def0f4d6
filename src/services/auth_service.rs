use crate::database::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::utils::{hash_password, validate_password, verify_password, JwtService};

#[derive(Clone)]
pub struct AuthService {
    pool: DbPool,
    jwt_service: JwtService,
}

impl AuthService {
    pub fn new(pool: DbPool, jwt_service: JwtService) -> Self {
        Self { pool, jwt_service }
    }

    pub async fn signup(&self, request: SignupRequest) -> AppResult<AuthResponse> {
        let email = request.email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(AppError::ValidationError("Invalid email address".to_string()));
        }
        if request.first_name.trim().is_empty() || request.last_name.trim().is_empty() {
            return Err(AppError::ValidationError("Name is required".to_string()));
        }
        validate_password(&request.password)?;

        let existing = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE email = $1")
            .bind(&email)
            .fetch_optional(&self.pool)
            .await?;
        if existing.is_some() {
            return Err(AppError::Conflict("Email is already registered".to_string()));
        }

        let password_hash = hash_password(&request.password)?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, first_name, last_name, password_hash, university, current_year, graduation_year, major)
            VALUES ($1, $2, $3, $4, COALESCE($5, 'University of Toronto'), COALESCE($6, '1st year'), $7, $8)
            RETURNING *
            "#,
        )
        .bind(&email)
        .bind(request.first_name.trim())
        .bind(request.last_name.trim())
        .bind(&password_hash)
        .bind(&request.university)
        .bind(&request.current_year)
        .bind(request.graduation_year)
        .bind(&request.major)
        .fetch_one(&self.pool)
        .await?;

        log::info!("New user registered: {}", user.email);
        self.build_auth_response(user)
    }

    pub async fn login(&self, request: LoginRequest) -> AppResult<AuthResponse> {
        let email = request.email.trim().to_lowercase();

        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(&email)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::AuthError("Invalid email or password".to_string()))?;

        if !verify_password(&request.password, &user.password_hash)? {
            return Err(AppError::AuthError("Invalid email or password".to_string()));
        }

        self.build_auth_response(user)
    }

    pub async fn refresh(&self, refresh_token: &str) -> AppResult<AuthResponse> {
        let claims = self.jwt_service.verify_refresh_token(refresh_token)?;
        let user_id: i64 = claims
            .sub
            .parse()
            .map_err(|_| AppError::AuthError("Invalid token subject".to_string()))?;

        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::AuthError("User no longer exists".to_string()))?;

        self.build_auth_response(user)
    }

    fn build_auth_response(&self, user: User) -> AppResult<AuthResponse> {
        let access_token = self.jwt_service.generate_access_token(user.id, &user.email)?;
        let refresh_token = self.jwt_service.generate_refresh_token(user.id, &user.email)?;
        let expires_in = self.jwt_service.get_access_token_expires_in();

        Ok(AuthResponse {
            user: UserResponse::from(user),
            access_token,
            refresh_token,
            expires_in,
        })
    }
}
