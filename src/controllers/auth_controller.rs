use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;

use crate::{services::auth_service, AppState};

fn is_valid_email(email: &str) -> bool {
    let re = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
    re.is_match(email)
}

fn errors_response(status: StatusCode, errs: auth_service::FieldErrors) -> Response {
    (status, Json(json!({ "errors": errs }))).into_response()
}

// ---------------- Register ----------------

#[derive(Deserialize)]
pub struct RegisterBody {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

pub async fn post_register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<RegisterBody>,
) -> Response {
    let mut errs = auth_service::FieldErrors::new();

    let username = body.username.trim();
    if username.is_empty() {
        errs.insert("username".into(), "Username is required.".into());
    } else if username.len() < 2 {
        errs.insert("username".into(), "Username must be at least 2 characters.".into());
    }

    let email = body.email.trim().to_lowercase();
    if email.is_empty() {
        errs.insert("email".into(), "Email is required.".into());
    } else if !is_valid_email(&email) {
        errs.insert("email".into(), "Invalid email.".into());
    }

    if body.password.is_empty() {
        errs.insert("password".into(), "Password is required.".into());
    } else if body.password.len() < 6 {
        errs.insert("password".into(), "Password must be at least 6 characters.".into());
    }

    if !errs.is_empty() {
        return errors_response(StatusCode::BAD_REQUEST, errs);
    }

    let user_id = match auth_service::register_user(&state, username, &email, &body.password).await
    {
        Ok(id) => id,
        Err(errs) => return errors_response(StatusCode::CONFLICT, errs),
    };

    let token = match auth_service::make_jwt_with_days(&state, &user_id, 7) {
        Ok(t) => t,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e })),
            )
                .into_response()
        }
    };

    let jar = jar.add(auth_service::auth_cookie(&state, token));

    (
        StatusCode::CREATED,
        jar,
        Json(json!({ "id": user_id.to_hex() })),
    )
        .into_response()
}

// ---------------- Login ----------------

#[derive(Deserialize)]
pub struct LoginBody {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

pub async fn post_login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginBody>,
) -> Response {
    let mut errs = auth_service::FieldErrors::new();

    let email = body.email.trim().to_lowercase();
    if email.is_empty() {
        errs.insert("email".into(), "Email is required.".into());
    } else if !is_valid_email(&email) {
        errs.insert("email".into(), "Invalid email.".into());
    }

    if body.password.is_empty() {
        errs.insert("password".into(), "Password is required.".into());
    }

    if !errs.is_empty() {
        return errors_response(StatusCode::BAD_REQUEST, errs);
    }

    let user = match auth_service::login_user(&state, &email, &body.password).await {
        Ok(u) => u,
        Err(errs) => return errors_response(StatusCode::UNAUTHORIZED, errs),
    };

    let token = match auth_service::make_jwt_with_days(&state, &user.id, 7) {
        Ok(t) => t,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e })),
            )
                .into_response()
        }
    };

    let jar = jar.add(auth_service::auth_cookie(&state, token));

    (
        StatusCode::OK,
        jar,
        Json(json!({
            "user": {
                "id": user.id.to_hex(),
                "email": user.email,
                "username": user.username,
            }
        })),
    )
        .into_response()
}

pub async fn post_logout(State(state): State<AppState>, jar: CookieJar) -> Response {
    let jar = jar.add(auth_service::clear_auth_cookie(&state));
    (StatusCode::OK, jar, Json(json!({ "success": true }))).into_response()
}
