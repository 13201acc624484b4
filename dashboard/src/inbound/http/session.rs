//! Session HTTP handlers.
//!
//! ```text
//! POST /api/v1/session/signup
//! POST /api/v1/session/login
//! POST /api/v1/session/logout
//! GET  /api/v1/session
//! ```
//!
//! Identity changes made here are published by the provider; the watchlist
//! follows them through the identity subscription, not through these
//! handlers.

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::ports::IdentityProviderError;
use crate::domain::{Credentials, CredentialsValidationError, Error, UserIdentity};
use crate::inbound::http::ApiResult;
use crate::inbound::http::error::invalid_field;
use crate::inbound::http::state::HttpState;

/// E-mail/password request body.
#[derive(Debug, Deserialize, Serialize)]
pub struct CredentialsRequest {
    /// Account e-mail address.
    pub email: String,
    /// Account password.
    pub password: String,
}

/// Public view of a signed-in identity.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IdentityResponse {
    /// Provider-assigned user id.
    pub uid: String,
    /// E-mail address, when known.
    pub email: Option<String>,
    /// Name shown in the header.
    pub display_name: String,
}

impl From<&UserIdentity> for IdentityResponse {
    fn from(identity: &UserIdentity) -> Self {
        Self {
            uid: identity.uid().to_string(),
            email: identity.email().map(str::to_owned),
            display_name: identity.display_name().to_owned(),
        }
    }
}

/// Result of a session operation.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    /// Human-readable summary.
    pub message: String,
    /// Identity after the operation.
    pub user: Option<IdentityResponse>,
}

fn parse_credentials(payload: &CredentialsRequest) -> Result<Credentials, Error> {
    Credentials::try_from_parts(&payload.email, &payload.password).map_err(|error| {
        let field = match error {
            CredentialsValidationError::EmptyEmail => "email",
            CredentialsValidationError::EmptyPassword => "password",
        };
        invalid_field(field, error)
    })
}

fn map_identity_error(error: IdentityProviderError, failure: &str) -> Error {
    match &error {
        IdentityProviderError::Rejected { message } => match message.as_str() {
            "EMAIL_EXISTS" => Error::conflict(format!("{failure}: email already registered")),
            "WEAK_PASSWORD" | "INVALID_EMAIL" => {
                Error::invalid_request(format!("{failure}: {message}"))
            }
            _ => Error::unauthorized(format!("{failure}. Please check your credentials.")),
        },
        IdentityProviderError::Transport { .. } => Error::service_unavailable(failure),
        IdentityProviderError::Decode { .. } => Error::internal(error.to_string()),
    }
}

/// Create an account and sign it in.
#[post("/session/signup")]
pub async fn sign_up(
    state: web::Data<HttpState>,
    payload: web::Json<CredentialsRequest>,
) -> ApiResult<HttpResponse> {
    let credentials = parse_credentials(&payload)?;
    let identity = state
        .identity
        .sign_up(&credentials)
        .await
        .map_err(|error| map_identity_error(error, "Error signing up"))?;
    Ok(HttpResponse::Created().json(SessionResponse {
        message: "User registered successfully".to_owned(),
        user: Some(IdentityResponse::from(&identity)),
    }))
}

/// Sign in with existing credentials.
#[post("/session/login")]
pub async fn login(
    state: web::Data<HttpState>,
    payload: web::Json<CredentialsRequest>,
) -> ApiResult<HttpResponse> {
    let credentials = parse_credentials(&payload)?;
    let identity = state
        .identity
        .sign_in(&credentials)
        .await
        .map_err(|error| map_identity_error(error, "Error logging in"))?;
    Ok(HttpResponse::Ok().json(SessionResponse {
        message: "User logged in successfully".to_owned(),
        user: Some(IdentityResponse::from(&identity)),
    }))
}

/// Sign the current identity out.
#[post("/session/logout")]
pub async fn logout(state: web::Data<HttpState>) -> ApiResult<HttpResponse> {
    state
        .identity
        .sign_out()
        .await
        .map_err(|error| map_identity_error(error, "Error signing out"))?;
    info!("session closed");
    Ok(HttpResponse::Ok().json(SessionResponse {
        message: "User signed out successfully".to_owned(),
        user: None,
    }))
}

/// Current identity, or `null` when signed out.
#[get("/session")]
pub async fn current_session(state: web::Data<HttpState>) -> HttpResponse {
    let user = state
        .identity
        .current_identity()
        .as_ref()
        .map(IdentityResponse::from);
    HttpResponse::Ok()
        .insert_header(("Cache-Control", "no-store"))
        .json(serde_json::json!({ "user": user }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use actix_web::http::StatusCode;
    use actix_web::{App, test as actix_test};
    use serde_json::Value;

    use super::*;
    use crate::domain::ports::{MockIdentityProvider, MockWatchlistMembership};
    use crate::domain::UserId;
    use crate::inbound::http::test_utils::fixture_markets;

    fn identity() -> UserIdentity {
        UserIdentity::new(
            UserId::new("u1").expect("uid"),
            Some("ada@example.com".to_owned()),
        )
    }

    fn state(provider: MockIdentityProvider) -> HttpState {
        HttpState::new(
            Arc::new(provider),
            Arc::new(MockWatchlistMembership::new()),
            fixture_markets(),
        )
    }

    fn body(email: &str, password: &str) -> CredentialsRequest {
        CredentialsRequest {
            email: email.to_owned(),
            password: password.to_owned(),
        }
    }

    #[actix_web::test]
    async fn login_returns_identity() {
        let mut provider = MockIdentityProvider::new();
        provider
            .expect_sign_in()
            .withf(|creds| creds.email() == "ada@example.com")
            .times(1)
            .returning(|_| Ok(identity()));
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(state(provider)))
                .service(web::scope("/api/v1").service(login)),
        )
        .await;

        let request = actix_test::TestRequest::post()
            .uri("/api/v1/session/login")
            .set_json(body("ada@example.com", "hunter22"))
            .to_request();
        let response = actix_test::call_service(&app, request).await;

        assert_eq!(response.status(), StatusCode::OK);
        let json: Value = actix_test::read_body_json(response).await;
        assert_eq!(json["user"]["displayName"], "ada");
        assert_eq!(json["message"], "User logged in successfully");
    }

    #[actix_web::test]
    async fn blank_email_is_rejected_before_provider_call() {
        let mut provider = MockIdentityProvider::new();
        provider.expect_sign_up().times(0);
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(state(provider)))
                .service(web::scope("/api/v1").service(sign_up)),
        )
        .await;

        let request = actix_test::TestRequest::post()
            .uri("/api/v1/session/signup")
            .set_json(body("  ", "hunter22"))
            .to_request();
        let response = actix_test::call_service(&app, request).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json: Value = actix_test::read_body_json(response).await;
        assert_eq!(json["details"]["field"], "email");
    }

    #[rstest::rstest]
    #[case(IdentityProviderError::rejected("EMAIL_EXISTS"), StatusCode::CONFLICT)]
    #[case(IdentityProviderError::rejected("WEAK_PASSWORD"), StatusCode::BAD_REQUEST)]
    #[case(
        IdentityProviderError::rejected("INVALID_LOGIN_CREDENTIALS"),
        StatusCode::UNAUTHORIZED
    )]
    #[case(IdentityProviderError::transport("offline"), StatusCode::SERVICE_UNAVAILABLE)]
    #[actix_web::test]
    async fn provider_failures_map_to_statuses(
        #[case] failure: IdentityProviderError,
        #[case] expected: StatusCode,
    ) {
        let mut provider = MockIdentityProvider::new();
        provider
            .expect_sign_up()
            .times(1)
            .return_once(move |_| Err(failure));
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(state(provider)))
                .service(web::scope("/api/v1").service(sign_up)),
        )
        .await;

        let request = actix_test::TestRequest::post()
            .uri("/api/v1/session/signup")
            .set_json(body("ada@example.com", "hunter22"))
            .to_request();
        let response = actix_test::call_service(&app, request).await;

        assert_eq!(response.status(), expected);
    }

    #[actix_web::test]
    async fn current_session_is_null_when_signed_out() {
        let mut provider = MockIdentityProvider::new();
        provider.expect_current_identity().returning(|| None);
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(state(provider)))
                .service(web::scope("/api/v1").service(current_session)),
        )
        .await;

        let request = actix_test::TestRequest::get()
            .uri("/api/v1/session")
            .to_request();
        let json: Value = actix_test::call_and_read_body_json(&app, request).await;

        assert_eq!(json, serde_json::json!({ "user": null }));
    }

    #[actix_web::test]
    async fn logout_signs_out() {
        let mut provider = MockIdentityProvider::new();
        provider.expect_sign_out().times(1).returning(|| Ok(()));
        let app = actix_test::init_service(
            App::new()
                .app_data(web::Data::new(state(provider)))
                .service(web::scope("/api/v1").service(logout)),
        )
        .await;

        let request = actix_test::TestRequest::post()
            .uri("/api/v1/session/logout")
            .to_request();
        let response = actix_test::call_service(&app, request).await;

        assert_eq!(response.status(), StatusCode::OK);
    }
}
