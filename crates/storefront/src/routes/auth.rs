//! Customer authentication route handlers.
//!
//! Credentials are checked by the commerce backend. On success the returned
//! token and profile are kept in the visitor's client storage under
//! `authInfo`, which is what checkout and order history read.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use tracing::{info, instrument, warn};

use shopfront_core::auth::{AuthInfo, LoginForm, SignupForm};
use shopfront_core::form::FieldErrors;

use crate::backend::BackendError;
use crate::error::{Result, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{CspNonce, StoreScope};
use crate::models::Flash;
use crate::routes::layout::{Layout, Shop};
use crate::session_storage::SessionStorage;
use crate::state::AppState;

/// Shown when the backend fails without a message of its own.
pub const GENERIC_AUTH_ERROR: &str = "Something went wrong. Please try again.";

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/login.html")]
pub struct LoginTemplate {
    pub layout: Layout,
    pub form: LoginForm,
    pub errors: FieldErrors,
    pub error: Option<String>,
}

/// Signup page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/signup.html")]
pub struct SignupTemplate {
    pub layout: Layout,
    pub form: SignupForm,
    pub errors: FieldErrors,
    pub error: Option<String>,
}

/// Account menu fragment template (HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "fragments/account_menu.html")]
pub struct AccountMenuTemplate {
    pub customer_name: Option<String>,
}

/// Message for a failed auth call.
fn failure_message(error: &BackendError) -> String {
    error.user_message().unwrap_or(GENERIC_AUTH_ERROR).to_owned()
}

fn welcome(name: &str) -> String {
    match name.trim() {
        "" => "Welcome back!".to_owned(),
        name => format!("Welcome back, {name}!"),
    }
}

// =============================================================================
// Login
// =============================================================================

/// Display the login page.
#[instrument(skip_all, fields(store_id = %scope.store_id))]
pub async fn login_page(
    State(state): State<AppState>,
    nonce: CspNonce,
    mut scope: StoreScope,
) -> Result<Response> {
    if AuthInfo::load(&mut scope.storage).is_some() {
        scope.save().await?;
        return Ok(Redirect::to("/").into_response());
    }

    let shop = Shop::load(&state, &mut scope).await;
    let layout = Layout::load(&state, &scope, &shop, nonce, Some("Sign in")).await?;
    scope.save().await?;

    Ok(LoginTemplate {
        layout,
        form: LoginForm::default(),
        errors: FieldErrors::new(),
        error: None,
    }
    .into_response())
}

/// Handle login form submission.
#[instrument(skip_all, fields(store_id = %scope.store_id))]
pub async fn login(
    State(state): State<AppState>,
    nonce: CspNonce,
    mut scope: StoreScope,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let errors = form.validate();
    let error = if errors.is_empty() {
        match state
            .backend()
            .login(&scope.store_id, form.email.trim(), &form.password)
            .await
        {
            Ok(auth) => {
                auth.save(&mut scope.storage)?;
                set_sentry_user(&auth.data.customer_id, Some(&auth.data.email));
                info!(customer_id = %auth.data.customer_id, "customer signed in");

                let session = scope.storage.session().clone();
                scope.save().await?;
                Flash::success(welcome(&auth.data.name)).push(&session).await;
                return Ok(Redirect::to("/").into_response());
            }
            Err(e) => {
                warn!(error = %e, "login failed");
                Some(failure_message(&e))
            }
        }
    } else {
        None
    };

    let shop = Shop::load(&state, &mut scope).await;
    let layout = Layout::load(&state, &scope, &shop, nonce, Some("Sign in")).await?;
    scope.save().await?;

    Ok(LoginTemplate {
        layout,
        form: LoginForm {
            password: String::new(),
            ..form
        },
        errors,
        error,
    }
    .into_response())
}

// =============================================================================
// Signup
// =============================================================================

/// Display the signup page.
#[instrument(skip_all, fields(store_id = %scope.store_id))]
pub async fn signup_page(
    State(state): State<AppState>,
    nonce: CspNonce,
    mut scope: StoreScope,
) -> Result<Response> {
    if AuthInfo::load(&mut scope.storage).is_some() {
        scope.save().await?;
        return Ok(Redirect::to("/").into_response());
    }

    let shop = Shop::load(&state, &mut scope).await;
    let layout = Layout::load(&state, &scope, &shop, nonce, Some("Create account")).await?;
    scope.save().await?;

    Ok(SignupTemplate {
        layout,
        form: SignupForm::default(),
        errors: FieldErrors::new(),
        error: None,
    }
    .into_response())
}

/// Handle signup form submission.
#[instrument(skip_all, fields(store_id = %scope.store_id))]
pub async fn signup(
    State(state): State<AppState>,
    nonce: CspNonce,
    mut scope: StoreScope,
    Form(form): Form<SignupForm>,
) -> Result<Response> {
    let errors = form.validate();
    let error = if errors.is_empty() {
        match state
            .backend()
            .signup(&scope.store_id, form.name.trim(), form.email.trim(), &form.password)
            .await
        {
            Ok(auth) => {
                auth.save(&mut scope.storage)?;
                set_sentry_user(&auth.data.customer_id, Some(&auth.data.email));
                add_breadcrumb("auth", "Customer signed up", None);

                let session = scope.storage.session().clone();
                scope.save().await?;
                Flash::success("Your account has been created.").push(&session).await;
                return Ok(Redirect::to("/").into_response());
            }
            Err(e) => {
                warn!(error = %e, "signup failed");
                Some(failure_message(&e))
            }
        }
    } else {
        None
    };

    let shop = Shop::load(&state, &mut scope).await;
    let layout = Layout::load(&state, &scope, &shop, nonce, Some("Create account")).await?;
    scope.save().await?;

    Ok(SignupTemplate {
        layout,
        form: SignupForm {
            password: String::new(),
            ..form
        },
        errors,
        error,
    }
    .into_response())
}

// =============================================================================
// Logout
// =============================================================================

/// Sign out and go home.
#[instrument(skip_all)]
pub async fn logout(mut storage: SessionStorage) -> Result<Response> {
    AuthInfo::clear(&mut storage);
    clear_sentry_user();

    let session = storage.session().clone();
    storage.save().await?;
    Flash::success("You have been signed out.").push(&session).await;

    Ok(Redirect::to("/").into_response())
}

/// Account menu for the nav (HTMX).
#[instrument(skip_all)]
pub async fn account_menu(mut storage: SessionStorage) -> Result<impl IntoResponse> {
    let customer_name = AuthInfo::load(&mut storage).map(|auth| auth.data.name);
    storage.save().await?;

    Ok(AccountMenuTemplate { customer_name })
}
