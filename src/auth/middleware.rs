use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use serde_json::json;

use crate::auth::identity::AuthUser;
use crate::auth::jwt::verify_token;
use crate::config::Config;

fn unauthorized(req: ServiceRequest, body: serde_json::Value) -> ServiceResponse<BoxBody> {
    let resp = HttpResponse::Unauthorized().json(body);
    req.into_response(resp.map_into_boxed_body())
}

pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .cloned()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;

    let header_value = match req.headers().get("Authorization") {
        Some(h) => match h.to_str() {
            Ok(v) => v.to_owned(),
            Err(_) => {
                return Ok(unauthorized(
                    req,
                    json!({"success": false, "error": "Invalid Authorization header encoding"}),
                ));
            }
        },
        None => {
            return Ok(unauthorized(
                req,
                json!({"success": false, "error": "Unauthorized: No token provided"}),
            ));
        }
    };

    let token = match header_value.strip_prefix("Bearer ") {
        Some(t) => t,
        None => {
            return Ok(unauthorized(
                req,
                json!({"success": false, "error": "Authorization header must start with Bearer"}),
            ));
        }
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(e) => {
            return Ok(unauthorized(
                req,
                json!({"success": false, "error": "Unauthorized: Invalid token", "details": e}),
            ));
        }
    };

    let auth_user = match AuthUser::try_from(claims) {
        Ok(user) => user,
        Err(reason) => {
            return Ok(unauthorized(req, json!({"success": false, "error": reason})));
        }
    };

    req.extensions_mut().insert(auth_user);

    next.call(req).await
}

#[cfg(test)]
mod tests {
    use actix_web::{App, HttpResponse, middleware::from_fn, test, web};

    use super::*;
    use crate::auth::jwt::{TokenSubject, generate_access_token, generate_refresh_token};
    use crate::model::role::Role;

    async fn whoami(user: AuthUser) -> HttpResponse {
        HttpResponse::Ok().json(json!({ "email": user.email, "role": user.role }))
    }

    fn subject() -> TokenSubject {
        TokenSubject {
            user_id: 10,
            email: "emp@company.com".to_string(),
            role: Role::Employee.id(),
            employee_id: Some(4),
        }
    }

    macro_rules! app {
        () => {
            test::init_service(
                App::new().app_data(Data::new(Config::for_tests())).service(
                    web::scope("/api")
                        .wrap(from_fn(auth_middleware))
                        .route("/whoami", web::get().to(whoami)),
                ),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn missing_header_is_unauthorized() {
        let app = app!();
        let req = test::TestRequest::get().uri("/api/whoami").to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), actix_web::http::StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Unauthorized: No token provided");
    }

    #[actix_web::test]
    async fn valid_access_token_reaches_handler() {
        let app = app!();
        let token = generate_access_token(&subject(), &Config::for_tests().jwt_secret, 60).unwrap();
        let req = test::TestRequest::get()
            .uri("/api/whoami")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert!(resp.status().is_success());
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["email"], "emp@company.com");
        assert_eq!(body["role"], "employee");
    }

    #[actix_web::test]
    async fn refresh_token_cannot_call_the_api() {
        let app = app!();
        let (token, _) = generate_refresh_token(&subject(), &Config::for_tests().jwt_secret, 60).unwrap();
        let req = test::TestRequest::get()
            .uri("/api/whoami")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), actix_web::http::StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn token_signed_elsewhere_is_rejected() {
        let app = app!();
        let token = generate_access_token(&subject(), "some-other-secret", 60).unwrap();
        let req = test::TestRequest::get()
            .uri("/api/whoami")
            .insert_header(("Authorization", format!("Bearer {token}")))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), actix_web::http::StatusCode::UNAUTHORIZED);
    }
}
