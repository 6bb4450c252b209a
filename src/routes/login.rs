use actix_web::{
    cookie::{time::Duration as CookieDuration, Cookie, SameSite},
    get, post, route,
    web::{self, Data},
    Either, HttpRequest, HttpResponse,
};

use crate::{
    auth::{request_token, verify_password, CurrentUser},
    errors::{blocking, ApiError},
    models::{LoginForm, LoginResponse, SessionResponse, SuccessResponse},
    session::{Role, SESSION_COOKIE},
    state::AppState,
};

fn session_cookie(token: String, max_age_secs: i64) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(CookieDuration::seconds(max_age_secs))
        .finish()
}

/// Admin logs in with the configured credentials, callers with their stored account
#[post("/login")]
pub async fn login(
    state: Data<AppState>,
    form: Either<web::Json<LoginForm>, web::Form<LoginForm>>,
) -> Result<HttpResponse, ApiError> {
    let form = match form {
        Either::Left(json) => json.into_inner(),
        Either::Right(form) => form.into_inner(),
    };

    let username = form.username.trim().to_string();

    log::debug!("Login attempt: username={} admin={}", username, form.is_admin_login());

    let (user, role) = match form.is_admin_login() {
        true => {
            if !state.admin.matches(&username, &form.password) {
                log::warn!("Invalid admin credentials attempt for user={}", username);
                return Err(ApiError::Unauthorized("Invalid admin credentials.".to_string()));
            }

            (username, Role::Admin)
        }
        false => {
            let store = state.store.clone();
            let lookup = username.clone();

            let caller = blocking(move || store.find_caller(&lookup))
                .await?
                .ok_or_else(|| ApiError::Unauthorized("Caller not found.".to_string()))?;

            if !caller.is_active() {
                return Err(ApiError::Forbidden("Caller account is inactive.".to_string()));
            }

            let password_hash = caller.password_hash.clone();
            let password = form.password;

            // Argon2 verification is CPU heavy
            let verified = web::block(move || verify_password(&password_hash, &password)).await?;

            if !verified {
                return Err(ApiError::Unauthorized("Incorrect password.".to_string()));
            }

            (caller.username, Role::from_label(&caller.role))
        }
    };

    let token = state.sessions.create(&user, role);

    log::info!("Login successful: user={} role={:?}", user, role);

    Ok(HttpResponse::Ok()
        .cookie(session_cookie(token.clone(), state.sessions.ttl().num_seconds()))
        .json(LoginResponse {
            success: true,
            user,
            role,
            token,
        }))
}

#[route("/logout", method = "GET", method = "POST")]
pub async fn logout(state: Data<AppState>, req: HttpRequest) -> HttpResponse {
    if let Some(token) = request_token(&req) {
        state.sessions.remove(&token);
    }

    let mut removal = session_cookie(String::new(), 0);
    removal.make_removal();

    HttpResponse::Ok().cookie(removal).json(SuccessResponse::ok())
}

#[get("/api/session")]
pub async fn current_session(user: CurrentUser) -> HttpResponse {
    let session = user.0;

    HttpResponse::Ok().json(SessionResponse {
        success: true,
        user: session.user,
        role: session.role,
        expires_at: session.expires_at,
    })
}
