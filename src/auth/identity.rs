use actix_web::{
    FromRequest, HttpMessage, HttpRequest,
    dev::Payload,
    error::{ErrorForbidden, ErrorInternalServerError, ErrorUnauthorized},
    web::Data,
};
use futures::future::{Ready, ready};

use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::model::role::Role;
use crate::models::{Claims, TokenType};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub email: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

impl TryFrom<Claims> for AuthUser {
    type Error = &'static str;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        if claims.token_type != TokenType::Access {
            return Err("Access token required");
        }
        let role = Role::from_id(claims.role).ok_or("Invalid role")?;

        Ok(AuthUser {
            user_id: claims.user_id,
            email: claims.sub,
            role,
            employee_id: claims.employee_id,
        })
    }
}

/// Pulls the bearer token out of the Authorization header
pub fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // Set by auth_middleware on protected scopes
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let token = match bearer_token(req) {
            Some(t) => t,
            None => return ready(Err(ErrorUnauthorized("Missing token"))),
        };

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => return ready(Err(ErrorInternalServerError("Config missing"))),
        };

        let claims = match verify_token(token, &config.jwt_secret) {
            Ok(c) => c,
            Err(_) => return ready(Err(ErrorUnauthorized("Invalid token"))),
        };

        ready(AuthUser::try_from(claims).map_err(ErrorUnauthorized))
    }
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> actix_web::Result<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ErrorForbidden("Admin only"))
        }
    }

    /// Admins see every employee; everyone else only their own record
    pub fn can_access_employee(&self, employee_id: u64) -> bool {
        self.is_admin() || self.employee_id == Some(employee_id)
    }

    pub fn require_admin_or_self(&self, employee_id: u64) -> actix_web::Result<()> {
        if self.can_access_employee(employee_id) {
            Ok(())
        } else {
            Err(ErrorForbidden("Not allowed to access this employee"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role, employee_id: Option<u64>) -> AuthUser {
        AuthUser {
            user_id: 1,
            email: "x@company.com".to_string(),
            role,
            employee_id,
        }
    }

    #[test]
    fn admins_reach_everyone_employees_only_themselves() {
        let admin = user(Role::Admin, None);
        assert!(admin.require_admin().is_ok());
        assert!(admin.can_access_employee(99));

        let employee = user(Role::Employee, Some(5));
        assert!(employee.require_admin().is_err());
        assert!(employee.can_access_employee(5));
        assert!(!employee.can_access_employee(6));
        assert!(employee.require_admin_or_self(6).is_err());
    }

    #[test]
    fn refresh_claims_are_not_an_identity() {
        let claims = Claims {
            user_id: 1,
            sub: "x@company.com".to_string(),
            role: 1,
            exp: 0,
            jti: "j".to_string(),
            token_type: TokenType::Refresh,
            employee_id: None,
        };
        assert!(AuthUser::try_from(claims.clone()).is_err());

        let access = Claims {
            token_type: TokenType::Access,
            ..claims
        };
        assert_eq!(AuthUser::try_from(access).unwrap().role, Role::Admin);
    }
}
