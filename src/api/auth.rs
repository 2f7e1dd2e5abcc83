//! Authentication: registration, bearer-token sessions, and the extractors
//! that gate protected routes.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{request::Parts, HeaderMap, StatusCode},
    Json,
};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::db::{
    DbPool, LoginRequest, LoginResponse, MessageResponse, RegisterRequest, Session,
    UpdatePasswordRequest, UpdateProfileRequest, User, UserResponse,
};
use crate::utils::now;
use crate::AppState;

use super::error::ApiError;
use super::validation::{
    validate_email, validate_name, validate_password, validate_whatsapp,
};

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Generate a random opaque session token
fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    hex::encode(bytes)
}

/// Hash a token for storage
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Extract the bearer token from request headers
fn extract_token(headers: &HeaderMap) -> Option<String> {
    let auth_header = headers.get("Authorization").and_then(|h| h.to_str().ok())?;
    auth_header
        .strip_prefix("Bearer ")
        .map(|token| token.to_string())
}

/// Session expiry timestamp, `ttl_days` from now.
fn session_expiry(ttl_days: i64) -> String {
    (chrono::Utc::now() + chrono::Duration::days(ttl_days))
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Resolve a token to its user. Fails uniformly for missing, unknown, and
/// expired sessions.
pub async fn get_current_user(pool: &DbPool, token: &str) -> Result<User, ApiError> {
    let token_hash = hash_token(token);

    let session: Option<Session> = sqlx::query_as(
        "SELECT * FROM sessions WHERE token_hash = ? AND expires_at > datetime('now')",
    )
    .bind(&token_hash)
    .fetch_optional(pool)
    .await?;

    let session = session.ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))?;

    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = ?")
        .bind(session.user_id)
        .fetch_optional(pool)
        .await?;

    user.ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))
}

/// Extractor for the current authenticated user
#[async_trait]
impl FromRequestParts<Arc<AppState>> for User {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(&parts.headers)
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;
        get_current_user(&state.db, &token).await
    }
}

/// Extractor that additionally requires the `admin` role
pub struct Admin(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Admin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = User::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(ApiError::forbidden("Admin access required"));
        }
        Ok(Admin(user))
    }
}

fn validate_register_request(req: &RegisterRequest) -> Result<(), ApiError> {
    validate_name(&req.nama, "Name").map_err(ApiError::bad_request)?;
    validate_name(&req.asal_kampus, "Campus").map_err(ApiError::bad_request)?;
    validate_email(&req.email).map_err(ApiError::bad_request)?;
    validate_password(&req.password).map_err(ApiError::bad_request)?;
    if let Some(ref whatsapp) = req.whatsapp {
        if !whatsapp.is_empty() {
            validate_whatsapp(whatsapp).map_err(ApiError::bad_request)?;
        }
    }
    Ok(())
}

/// Register a new user account
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    validate_register_request(&req)?;

    let existing: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE email = ?")
        .bind(&req.email)
        .fetch_optional(&state.db)
        .await?;
    if existing.is_some() {
        return Err(ApiError::conflict("Email is already registered"));
    }

    let password_hash = hash_password(&req.password)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))?;
    let timestamp = now();
    let whatsapp = req.whatsapp.filter(|w| !w.is_empty());

    sqlx::query(
        r#"
        INSERT INTO users (nama, asal_kampus, email, whatsapp, password_hash, role, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, 'user', ?, ?)
        "#,
    )
    .bind(req.nama.trim())
    .bind(req.asal_kampus.trim())
    .bind(&req.email)
    .bind(&whatsapp)
    .bind(&password_hash)
    .bind(&timestamp)
    .bind(&timestamp)
    .execute(&state.db)
    .await?;

    tracing::info!("Registered new user: {}", req.email);

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Registration successful")),
    ))
}

/// Login endpoint
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
        .bind(&req.email)
        .fetch_optional(&state.db)
        .await?;

    // Same message whether the email exists or the password is wrong
    let user = user.ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;
    if !verify_password(&req.password, &user.password_hash) {
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let token = generate_token();
    let token_hash = hash_token(&token);
    let expires_at = session_expiry(state.config.auth.session_ttl_days);

    let session_id = uuid::Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO sessions (id, user_id, token_hash, expires_at, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&session_id)
    .bind(user.id)
    .bind(&token_hash)
    .bind(&expires_at)
    .bind(now())
    .execute(&state.db)
    .await?;

    Ok(Json(LoginResponse {
        token,
        message: "Login successful".to_string(),
    }))
}

/// Logout: delete the presented session.
///
/// Succeeds even when the token is missing or already invalid, so a client
/// clearing a stale token never sees an error here.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, ApiError> {
    if let Some(token) = extract_token(&headers) {
        sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(hash_token(&token))
            .execute(&state.db)
            .await?;
    }
    Ok(Json(MessageResponse::new("Logged out")))
}

/// Current user ("who am I")
pub async fn me(user: User) -> Json<UserResponse> {
    Json(UserResponse::from(user))
}

/// Helper to merge optional string values
/// - None means "don't change" -> keep existing
/// - Some("") means "clear" -> set to None
/// - Some(value) means "set" -> use the value
fn merge_optional_string(new_val: &Option<String>, existing: &Option<String>) -> Option<String> {
    match new_val {
        Some(s) if s.is_empty() => None,
        Some(s) => Some(s.clone()),
        None => existing.clone(),
    }
}

/// Update profile fields of the current user
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if let Some(ref nama) = req.nama {
        validate_name(nama, "Name").map_err(ApiError::bad_request)?;
    }
    if let Some(ref asal_kampus) = req.asal_kampus {
        validate_name(asal_kampus, "Campus").map_err(ApiError::bad_request)?;
    }
    if let Some(ref whatsapp) = req.whatsapp {
        if !whatsapp.is_empty() {
            validate_whatsapp(whatsapp).map_err(ApiError::bad_request)?;
        }
    }

    let nama = req.nama.as_deref().map(str::trim).unwrap_or(&user.nama);
    let asal_kampus = req
        .asal_kampus
        .as_deref()
        .map(str::trim)
        .unwrap_or(&user.asal_kampus);
    let whatsapp = merge_optional_string(&req.whatsapp, &user.whatsapp);

    sqlx::query("UPDATE users SET nama = ?, asal_kampus = ?, whatsapp = ?, updated_at = ? WHERE id = ?")
        .bind(nama)
        .bind(asal_kampus)
        .bind(&whatsapp)
        .bind(now())
        .bind(user.id)
        .execute(&state.db)
        .await?;

    Ok(Json(MessageResponse::new("Profile updated")))
}

/// Change the current user's password
pub async fn update_password(
    State(state): State<Arc<AppState>>,
    user: User,
    Json(req): Json<UpdatePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !verify_password(&req.old_password, &user.password_hash) {
        return Err(ApiError::bad_request("Old password is incorrect"));
    }
    validate_password(&req.new_password).map_err(ApiError::bad_request)?;

    let password_hash = hash_password(&req.new_password)
        .map_err(|e| ApiError::internal(format!("Failed to hash password: {}", e)))?;

    sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
        .bind(&password_hash)
        .bind(now())
        .bind(user.id)
        .execute(&state.db)
        .await?;

    Ok(Json(MessageResponse::new("Password updated")))
}

/// Ensure the configured admin account exists. Called once at startup.
///
/// If no password is configured, one is generated and logged a single time.
pub async fn ensure_admin_user(
    pool: &DbPool,
    admin_email: &str,
    admin_password: Option<&str>,
) -> anyhow::Result<()> {
    let existing: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE email = ?")
        .bind(admin_email)
        .fetch_optional(pool)
        .await?;
    if existing.is_some() {
        return Ok(());
    }

    let generated;
    let password = match admin_password {
        Some(p) => p,
        None => {
            generated = generate_token();
            tracing::info!("Generated admin password: {}", &generated[..16]);
            &generated[..16]
        }
    };

    let password_hash =
        hash_password(password).map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;
    let timestamp = now();

    sqlx::query(
        r#"
        INSERT INTO users (nama, asal_kampus, email, whatsapp, password_hash, role, created_at, updated_at)
        VALUES ('Admin', 'PasarKampus', ?, NULL, ?, 'admin', ?, ?)
        "#,
    )
    .bind(admin_email)
    .bind(&password_hash)
    .bind(&timestamp)
    .bind(&timestamp)
    .execute(pool)
    .await?;

    tracing::info!("Created admin account: {}", admin_email);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{login_as, register_user, test_state};

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("rahasia123").unwrap();
        assert!(verify_password("rahasia123", &hash));
        assert!(!verify_password("salah123", &hash));
        assert!(!verify_password("rahasia123", "not-a-hash"));
    }

    #[test]
    fn test_generate_token_is_random_hex() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_token_is_deterministic() {
        assert_eq!(hash_token("abc"), hash_token("abc"));
        assert_ne!(hash_token("abc"), hash_token("abd"));
    }

    #[test]
    fn test_extract_token() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", "Bearer tok123".parse().unwrap());
        assert_eq!(extract_token(&headers).as_deref(), Some("tok123"));

        let mut bad = HeaderMap::new();
        bad.insert("Authorization", "Basic dXNlcg==".parse().unwrap());
        assert_eq!(extract_token(&bad), None);
        assert_eq!(extract_token(&HeaderMap::new()), None);
    }

    #[tokio::test]
    async fn test_register_login_me_flow() {
        let state = test_state().await;
        register_user(&state, "budi@kampus.ac.id", "rahasia123").await;

        let token = login_as(&state, "budi@kampus.ac.id", "rahasia123").await;
        let user = get_current_user(&state.db, &token).await.unwrap();
        assert_eq!(user.email, "budi@kampus.ac.id");
        assert_eq!(user.role, "user");
    }

    #[tokio::test]
    async fn test_register_duplicate_email_conflicts() {
        let state = test_state().await;
        register_user(&state, "budi@kampus.ac.id", "rahasia123").await;

        let req = RegisterRequest {
            nama: "Budi Kedua".to_string(),
            asal_kampus: "UI".to_string(),
            whatsapp: None,
            email: "budi@kampus.ac.id".to_string(),
            password: "rahasia456".to_string(),
        };
        let err = register(State(state.clone()), Json(req)).await.err().unwrap();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_login_bad_credentials_uniform_message() {
        let state = test_state().await;
        register_user(&state, "budi@kampus.ac.id", "rahasia123").await;

        let wrong_password = login(
            State(state.clone()),
            Json(LoginRequest {
                email: "budi@kampus.ac.id".to_string(),
                password: "salah".to_string(),
            }),
        )
        .await
        .err()
        .unwrap();

        let unknown_email = login(
            State(state.clone()),
            Json(LoginRequest {
                email: "ghost@kampus.ac.id".to_string(),
                password: "rahasia123".to_string(),
            }),
        )
        .await
        .err()
        .unwrap();

        assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_password.message(), unknown_email.message());
    }

    #[tokio::test]
    async fn test_logout_invalidates_token() {
        let state = test_state().await;
        register_user(&state, "budi@kampus.ac.id", "rahasia123").await;
        let token = login_as(&state, "budi@kampus.ac.id", "rahasia123").await;

        let mut headers = HeaderMap::new();
        headers.insert(
            "Authorization",
            format!("Bearer {}", token).parse().unwrap(),
        );
        logout(State(state.clone()), headers).await.unwrap();

        let err = get_current_user(&state.db, &token).await.err().unwrap();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_logout_without_token_still_succeeds() {
        let state = test_state().await;
        let response = logout(State(state), HeaderMap::new()).await.unwrap();
        assert_eq!(response.0.message, "Logged out");
    }

    #[tokio::test]
    async fn test_expired_session_is_rejected() {
        let state = test_state().await;
        let user = register_user(&state, "budi@kampus.ac.id", "rahasia123").await;

        let token = generate_token();
        sqlx::query(
            "INSERT INTO sessions (id, user_id, token_hash, expires_at, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(user.id)
        .bind(hash_token(&token))
        .bind("2020-01-01 00:00:00")
        .bind(now())
        .execute(&state.db)
        .await
        .unwrap();

        let err = get_current_user(&state.db, &token).await.err().unwrap();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_update_profile_partial_merge() {
        let state = test_state().await;
        register_user(&state, "budi@kampus.ac.id", "rahasia123").await;
        let token = login_as(&state, "budi@kampus.ac.id", "rahasia123").await;
        let user = get_current_user(&state.db, &token).await.unwrap();

        update_profile(
            State(state.clone()),
            user,
            Json(UpdateProfileRequest {
                nama: Some("Budi Baru".to_string()),
                asal_kampus: None,
                whatsapp: Some("081234567890".to_string()),
            }),
        )
        .await
        .unwrap();

        let updated = get_current_user(&state.db, &token).await.unwrap();
        assert_eq!(updated.nama, "Budi Baru");
        assert_eq!(updated.asal_kampus, "Universitas Indonesia");
        assert_eq!(updated.whatsapp.as_deref(), Some("081234567890"));

        // Empty string clears the optional field
        update_profile(
            State(state.clone()),
            updated,
            Json(UpdateProfileRequest {
                nama: None,
                asal_kampus: None,
                whatsapp: Some(String::new()),
            }),
        )
        .await
        .unwrap();
        let cleared = get_current_user(&state.db, &token).await.unwrap();
        assert_eq!(cleared.whatsapp, None);
    }

    #[tokio::test]
    async fn test_update_password_checks_old_password() {
        let state = test_state().await;
        register_user(&state, "budi@kampus.ac.id", "rahasia123").await;
        let token = login_as(&state, "budi@kampus.ac.id", "rahasia123").await;
        let user = get_current_user(&state.db, &token).await.unwrap();

        let err = update_password(
            State(state.clone()),
            user.clone(),
            Json(UpdatePasswordRequest {
                old_password: "salah".to_string(),
                new_password: "barubaru123".to_string(),
            }),
        )
        .await
        .err()
        .unwrap();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        update_password(
            State(state.clone()),
            user,
            Json(UpdatePasswordRequest {
                old_password: "rahasia123".to_string(),
                new_password: "barubaru123".to_string(),
            }),
        )
        .await
        .unwrap();

        let token = login_as(&state, "budi@kampus.ac.id", "barubaru123").await;
        assert!(get_current_user(&state.db, &token).await.is_ok());
    }

    #[tokio::test]
    async fn test_ensure_admin_user_is_idempotent() {
        let state = test_state().await;
        ensure_admin_user(&state.db, "admin@pasarkampus.local", Some("adminpass123"))
            .await
            .unwrap();
        ensure_admin_user(&state.db, "admin@pasarkampus.local", Some("adminpass123"))
            .await
            .unwrap();

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE role = 'admin'")
            .fetch_one(&state.db)
            .await
            .unwrap();
        assert_eq!(count.0, 1);

        let token = login_as(&state, "admin@pasarkampus.local", "adminpass123").await;
        let admin = get_current_user(&state.db, &token).await.unwrap();
        assert!(admin.is_admin());
    }
}
