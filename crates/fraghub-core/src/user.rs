use crate::auth;
use crate::error::CoreError;
use crate::permissions::{require_role, Actor};
use crate::AppConfig;
use fraghub_db::users::UserRow;
use fraghub_db::{DbError, DbPool};
use fraghub_models::role::Role;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_USERNAME_LEN: usize = 150;

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub session_id: String,
    pub user: UserRow,
}

/// Public profile with activity counts.
#[derive(Debug, Clone)]
pub struct Profile {
    pub user: UserRow,
    pub post_count: i64,
    pub gallery_count: i64,
}

fn validate_registration(username: &str, email: &str, password: &str) -> Result<(), CoreError> {
    let username = username.trim();
    if username.is_empty() || username.chars().count() > MAX_USERNAME_LEN {
        return Err(CoreError::BadRequest(format!(
            "username must be 1-{MAX_USERNAME_LEN} characters"
        )));
    }
    if !username
        .chars()
        .all(|ch| ch.is_alphanumeric() || matches!(ch, '_' | '-' | '.'))
    {
        return Err(CoreError::BadRequest(
            "username may contain letters, digits, '_', '-' and '.'".into(),
        ));
    }
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
        _ => return Err(CoreError::BadRequest("invalid email address".into())),
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(CoreError::BadRequest(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Create an account; the very first account becomes admin.
pub async fn register(
    pool: &DbPool,
    config: &AppConfig,
    username: &str,
    email: &str,
    password: &str,
) -> Result<UserRow, CoreError> {
    if !config.registration_enabled {
        return Err(CoreError::Forbidden);
    }
    validate_registration(username, email, password)?;
    let hash = auth::hash_password(password)?;
    let user = fraghub_db::users::create_user_as_first_admin(pool, username, email, &hash)
        .await
        .map_err(|e| match e {
            DbError::UniqueViolation => CoreError::Conflict("username or email already taken".into()),
            other => other.into(),
        })?;
    tracing::info!(user_id = user.id, role = %user.role, "user registered");
    Ok(user)
}

pub async fn login(
    pool: &DbPool,
    config: &AppConfig,
    username: &str,
    password: &str,
) -> Result<Session, CoreError> {
    let auth_row = fraghub_db::users::get_user_auth_by_username(pool, username)
        .await?
        .ok_or(CoreError::Unauthorized)?;
    if !auth::verify_password(password, &auth_row.password_hash) {
        tracing::debug!(username = %auth_row.username, "login rejected");
        return Err(CoreError::Unauthorized);
    }
    let user = fraghub_db::users::get_user_by_id(pool, auth_row.id)
        .await?
        .ok_or(CoreError::Unauthorized)?;

    let session_id = auth::new_session_id();
    let token = auth::create_token(user.id, &session_id, &config.jwt_secret, config.jwt_expiry_seconds)?;
    tracing::info!(user_id = user.id, "user logged in");
    Ok(Session {
        token,
        session_id,
        user,
    })
}

pub async fn get_profile(pool: &DbPool, user_id: i64) -> Result<Profile, CoreError> {
    let user = fraghub_db::users::get_user_by_id(pool, user_id)
        .await?
        .ok_or(CoreError::NotFound)?;
    Ok(Profile {
        post_count: fraghub_db::posts::count_posts_by_user(pool, user_id).await?,
        gallery_count: fraghub_db::gallery::count_by_user(pool, user_id).await?,
        user,
    })
}

fn clean_optional(value: Option<&str>) -> Option<&str> {
    value.map(str::trim)
}

pub async fn update_profile(
    pool: &DbPool,
    actor: &Actor,
    bio: Option<&str>,
    avatar_url: Option<&str>,
    steam_profile: Option<&str>,
) -> Result<UserRow, CoreError> {
    if bio.is_some_and(|bio| bio.chars().count() > 500) {
        return Err(CoreError::BadRequest("bio must be at most 500 characters".into()));
    }
    Ok(fraghub_db::users::update_profile(
        pool,
        actor.user_id,
        clean_optional(bio),
        clean_optional(avatar_url),
        clean_optional(steam_profile),
    )
    .await?)
}

pub async fn list_users(pool: &DbPool, actor: &Actor, role: Option<Role>) -> Result<Vec<UserRow>, CoreError> {
    require_role(actor, Role::Moderator)?;
    Ok(fraghub_db::users::list_users(pool, role).await?)
}

pub async fn set_role(pool: &DbPool, actor: &Actor, user_id: i64, role: Role) -> Result<UserRow, CoreError> {
    require_role(actor, Role::Admin)?;
    if actor.user_id == user_id && role != Role::Admin {
        return Err(CoreError::BadRequest("admins cannot demote themselves".into()));
    }
    let user = fraghub_db::users::set_role(pool, user_id, role).await?;
    tracing::info!(user_id, role = %role, by = actor.user_id, "role changed");
    Ok(user)
}

pub async fn delete_user(pool: &DbPool, actor: &Actor, user_id: i64) -> Result<(), CoreError> {
    require_role(actor, Role::Admin)?;
    if actor.user_id == user_id {
        return Err(CoreError::BadRequest("admins cannot delete themselves".into()));
    }
    if !fraghub_db::users::delete_user(pool, user_id).await? {
        return Err(CoreError::NotFound);
    }
    tracing::info!(user_id, by = actor.user_id, "user deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{actor, test_pool};

    fn config() -> AppConfig {
        AppConfig {
            jwt_secret: "test-secret".into(),
            ..AppConfig::default()
        }
    }

    #[tokio::test]
    async fn register_then_login() {
        let pool = test_pool().await;
        let first = register(&pool, &config(), "s1mple", "s1mple@example.com", "awp-god-123")
            .await
            .unwrap();
        assert_eq!(first.role(), Role::Admin);

        let session = login(&pool, &config(), "s1mple", "awp-god-123").await.unwrap();
        let claims = auth::validate_token(&session.token, "test-secret").unwrap();
        assert_eq!(claims.sub, first.id);
        assert_eq!(claims.sid, session.session_id);

        assert!(matches!(
            login(&pool, &config(), "s1mple", "wrong-password").await,
            Err(CoreError::Unauthorized)
        ));
        assert!(matches!(
            login(&pool, &config(), "nobody", "awp-god-123").await,
            Err(CoreError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn registration_validation_and_conflicts() {
        let pool = test_pool().await;
        assert!(matches!(
            register(&pool, &config(), "ok", "bad-email", "longenough").await,
            Err(CoreError::BadRequest(_))
        ));
        assert!(matches!(
            register(&pool, &config(), "ok", "ok@example.com", "short").await,
            Err(CoreError::BadRequest(_))
        ));
        register(&pool, &config(), "taken", "taken@example.com", "longenough")
            .await
            .unwrap();
        assert!(matches!(
            register(&pool, &config(), "Taken", "other@example.com", "longenough").await,
            Err(CoreError::Conflict(_))
        ));

        let closed = AppConfig {
            registration_enabled: false,
            ..config()
        };
        assert!(matches!(
            register(&pool, &closed, "late", "late@example.com", "longenough").await,
            Err(CoreError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn role_management_is_admin_only() {
        let pool = test_pool().await;
        let admin = actor(&pool, "admin", Role::Admin).await;
        let moderator = actor(&pool, "mod", Role::Moderator).await;
        let user = actor(&pool, "user", Role::User).await;

        assert!(matches!(
            set_role(&pool, &moderator, user.user_id, Role::Moderator).await,
            Err(CoreError::Forbidden)
        ));
        let promoted = set_role(&pool, &admin, user.user_id, Role::Moderator).await.unwrap();
        assert_eq!(promoted.role(), Role::Moderator);
        assert!(matches!(
            set_role(&pool, &admin, admin.user_id, Role::User).await,
            Err(CoreError::BadRequest(_))
        ));

        assert_eq!(list_users(&pool, &moderator, Some(Role::Moderator)).await.unwrap().len(), 2);
        assert!(matches!(list_users(&pool, &user, None).await, Err(CoreError::Forbidden)));
        delete_user(&pool, &admin, user.user_id).await.unwrap();
        assert!(matches!(get_profile(&pool, user.user_id).await, Err(CoreError::NotFound)));
    }

    #[tokio::test]
    async fn profile_counts_activity() {
        let pool = test_pool().await;
        let user = actor(&pool, "author", Role::User).await;
        fraghub_db::posts::create_post(
            &pool,
            user.user_id,
            "gg",
            fraghub_models::content::PostMediaType::None,
            None,
            &[],
        )
        .await
        .unwrap();
        update_profile(&pool, &user, Some("entry fragger"), None, None).await.unwrap();

        let profile = get_profile(&pool, user.user_id).await.unwrap();
        assert_eq!(profile.post_count, 1);
        assert_eq!(profile.gallery_count, 0);
        assert_eq!(profile.user.bio.as_deref(), Some("entry fragger"));
    }
}
