use actix_web::{HttpRequest, HttpResponse, Responder, web};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument};

use crate::{
    auth::{
        identity::{AuthUser, bearer_token},
        jwt::{TokenSubject, generate_access_token, generate_refresh_token, verify_token},
        password::verify_password,
    },
    config::Config,
    model::{role::Role, user::User, user::UserSummary},
    models::{Claims, LoginReqDto, LoginResponse, TokenType},
};

fn server_error() -> HttpResponse {
    HttpResponse::InternalServerError().json(json!({
        "success": false,
        "error": "Internal Server Error"
    }))
}

fn invalid_credentials() -> HttpResponse {
    HttpResponse::Unauthorized().json(json!({
        "success": false,
        "error": "Invalid credentials"
    }))
}

async fn employee_id_for_user(pool: &MySqlPool, user_id: u64) -> Result<Option<u64>, sqlx::Error> {
    sqlx::query_scalar::<_, u64>("SELECT id FROM employees WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

async fn store_refresh_token(pool: &MySqlPool, claims: &Claims) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(claims.user_id)
    .bind(&claims.jti)
    .bind(claims.exp as i64)
    .execute(pool)
    .await
    .map(|_| ())
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Email or password missing"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(pool, config, body),
    fields(email = %body.email)
)]
pub async fn login(
    body: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    info!("Login request received");

    let email = body.email.trim().to_lowercase();
    if email.is_empty() || body.password.is_empty() {
        info!("Validation failed: empty email or password");
        return HttpResponse::BadRequest().json(json!({
            "success": false,
            "error": "Email and password are required"
        }));
    }

    debug!("Fetching user from database");

    let user = match sqlx::query_as::<_, User>(
        r#"
        SELECT id, name, email, password, role_id, profile_image, created_at
        FROM users
        WHERE email = ?
        "#,
    )
    .bind(&email)
    .fetch_optional(pool.get_ref())
    .await
    {
        Ok(Some(user)) => user,
        Ok(None) => {
            info!("Invalid credentials: user not found");
            return invalid_credentials();
        }
        Err(e) => {
            error!(error = %e, "Database error while fetching user");
            return server_error();
        }
    };

    if let Err(e) = verify_password(&body.password, &user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return invalid_credentials();
    }

    let Some(role) = Role::from_id(user.role_id) else {
        error!(user_id = user.id, role_id = user.role_id, "User has unknown role");
        return server_error();
    };

    let employee_id = match employee_id_for_user(pool.get_ref(), user.id).await {
        Ok(id) => id,
        Err(e) => {
            error!(error = %e, "Failed to resolve employee for user");
            return server_error();
        }
    };

    let subject = TokenSubject {
        user_id: user.id,
        email: user.email.clone(),
        role: user.role_id,
        employee_id,
    };

    debug!("Generating tokens");

    let tokens = generate_access_token(&subject, &config.jwt_secret, config.access_token_ttl).and_then(
        |access| {
            generate_refresh_token(&subject, &config.jwt_secret, config.refresh_token_ttl)
                .map(|(refresh, claims)| (access, refresh, claims))
        },
    );
    let (access_token, refresh_token, refresh_claims) = match tokens {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "Failed to sign tokens");
            return server_error();
        }
    };

    debug!(user_id = user.id, jti = %refresh_claims.jti, "Storing refresh token");

    if let Err(e) = store_refresh_token(pool.get_ref(), &refresh_claims).await {
        error!(error = %e, "Failed to store refresh token");
        return server_error();
    }

    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
        .bind(user.id)
        .execute(pool.get_ref())
        .await
    {
        // not fatal for the login itself
        error!(error = %e, "Failed to update last_login_at");
    }

    info!("Login successful");

    HttpResponse::Ok().json(LoginResponse {
        success: true,
        access_token,
        refresh_token,
        user: UserSummary {
            id: user.id,
            name: user.name,
            email: user.email,
            role,
            employee_id,
        },
    })
}

/// Returns the user behind the bearer token
#[utoipa::path(
    get,
    path = "/api/auth/verify",
    responses(
        (status = 200, description = "Token is valid", body = UserSummary),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "User no longer exists")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn verify(auth: AuthUser, pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    let name = sqlx::query_scalar::<_, String>("SELECT name FROM users WHERE id = ?")
        .bind(auth.user_id)
        .fetch_optional(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, user_id = auth.user_id, "Failed to load user");
            actix_web::error::ErrorInternalServerError("Internal Server Error")
        })?;

    let Some(name) = name else {
        return Ok(HttpResponse::NotFound().json(json!({
            "success": false,
            "error": "User not found"
        })));
    };

    let user = UserSummary {
        id: auth.user_id,
        name,
        email: auth.email,
        role: auth.role,
        employee_id: auth.employee_id,
    };

    Ok(HttpResponse::Ok().json(json!({ "success": true, "user": user })))
}

/// Exchanges a refresh token for a new token pair; the old one is revoked
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New token pair"),
        (status = 401, description = "Refresh token missing, invalid or revoked")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let Some(token) = bearer_token(&req) else {
        return HttpResponse::Unauthorized().json(json!({"success": false, "error": "No token"}));
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) if c.token_type == TokenType::Refresh => c,
        _ => return HttpResponse::Unauthorized().finish(),
    };

    let record = match sqlx::query_as::<_, (u64, bool)>(
        "SELECT id, revoked FROM refresh_tokens WHERE jti = ?",
    )
    .bind(&claims.jti)
    .fetch_optional(pool.get_ref())
    .await
    {
        Ok(r) => r,
        Err(e) => {
            error!(error = %e, "Failed to look up refresh token");
            return server_error();
        }
    };

    let record_id = match record {
        Some((id, false)) => id,
        _ => return HttpResponse::Unauthorized().finish(),
    };

    if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE id = ?")
        .bind(record_id)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to revoke refresh token");
        return server_error();
    }

    let subject = TokenSubject::from(&claims);

    let (new_refresh_token, new_claims) =
        match generate_refresh_token(&subject, &config.jwt_secret, config.refresh_token_ttl) {
            Ok(t) => t,
            Err(e) => {
                error!(error = %e, "Failed to sign refresh token");
                return server_error();
            }
        };

    if let Err(e) = store_refresh_token(pool.get_ref(), &new_claims).await {
        error!(error = %e, "Failed to store refresh token");
        return server_error();
    }

    let access_token =
        match generate_access_token(&subject, &config.jwt_secret, config.access_token_ttl) {
            Ok(t) => t,
            Err(e) => {
                error!(error = %e, "Failed to sign access token");
                return server_error();
            }
        };

    HttpResponse::Ok().json(json!({
        "success": true,
        "access_token": access_token,
        "refresh_token": new_refresh_token
    }))
}

/// Revokes the refresh token in the Authorization header. Always 204.
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Logged out")),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let Some(token) = bearer_token(&req) else {
        return HttpResponse::NoContent().finish();
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) if c.token_type == TokenType::Refresh => c,
        _ => return HttpResponse::NoContent().finish(),
    };

    // idempotent
    if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to revoke refresh token on logout");
    }

    HttpResponse::NoContent().finish()
}
