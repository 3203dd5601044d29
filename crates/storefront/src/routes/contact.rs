//! Contact page route handlers.
//!
//! The page shows the store's contact details and a message form guarded by
//! a small arithmetic challenge. The challenge lives in the server session,
//! so a submission can only be checked against the question actually shown.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use rand::Rng;
use tower_sessions::Session;
use tracing::{info, instrument};

use shopfront_core::content::{Captcha, ContactForm};
use shopfront_core::country::StorePreference;
use shopfront_core::form::FieldErrors;

use crate::error::{Result, add_breadcrumb};
use crate::middleware::{CspNonce, StoreScope};
use crate::models::{Flash, session_keys};
use crate::routes::layout::{Layout, Shop};
use crate::state::AppState;

/// Store contact details shown next to the form and in the footer fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreContact {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl StoreContact {
    #[must_use]
    pub fn new(preference: &StorePreference) -> Self {
        let present = |value: &Option<String>| value.clone().filter(|v| !v.trim().is_empty());
        let address = preference.full_address();
        Self {
            email: present(&preference.store_email),
            phone: present(&preference.store_phone).or_else(|| present(&preference.store_telephone)),
            address: (!address.is_empty()).then_some(address),
        }
    }

    /// Whether there is anything to show.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.email.is_none() && self.phone.is_none() && self.address.is_none()
    }
}

/// Contact page template.
#[derive(Template, WebTemplate)]
#[template(path = "pages/contact.html")]
pub struct ContactTemplate {
    pub layout: Layout,
    pub contact: StoreContact,
    pub form: ContactForm,
    pub errors: FieldErrors,
    pub captcha: Captcha,
}

fn random_captcha() -> Captcha {
    let mut rng = rand::rng();
    Captcha::new(rng.random_range(1..=10), rng.random_range(1..=10))
}

/// Show a fresh challenge and remember it for the submission.
async fn issue_captcha(session: &Session) -> Result<Captcha> {
    let captcha = random_captcha();
    session.insert(session_keys::CONTACT_CAPTCHA, captcha).await?;
    Ok(captcha)
}

/// Display the contact page.
#[instrument(skip_all, fields(store_id = %scope.store_id))]
pub async fn show(
    State(state): State<AppState>,
    nonce: CspNonce,
    mut scope: StoreScope,
) -> Result<Response> {
    let shop = Shop::load(&state, &mut scope).await;
    let captcha = issue_captcha(scope.storage.session()).await?;
    let layout = Layout::load(&state, &scope, &shop, nonce, Some("Contact us")).await?;
    scope.save().await?;

    Ok(ContactTemplate {
        layout,
        contact: StoreContact::new(&shop.preference),
        form: ContactForm::default(),
        errors: FieldErrors::new(),
        captcha,
    }
    .into_response())
}

/// Handle a contact form submission.
///
/// The message is acknowledged only; the challenge is single use either way.
#[instrument(skip_all, fields(store_id = %scope.store_id))]
pub async fn submit(
    State(state): State<AppState>,
    nonce: CspNonce,
    mut scope: StoreScope,
    Form(form): Form<ContactForm>,
) -> Result<Response> {
    let session = scope.storage.session().clone();
    let expected = session.remove::<Captcha>(session_keys::CONTACT_CAPTCHA).await?;

    let errors = form.validate(expected);
    if errors.is_empty() {
        info!(subject = %form.subject.trim(), "contact message received");
        add_breadcrumb("contact", "Contact form submitted", None);

        scope.save().await?;
        Flash::success("Thanks for reaching out! We'll get back to you soon.")
            .push(&session)
            .await;
        return Ok(Redirect::to("/contact").into_response());
    }

    let shop = Shop::load(&state, &mut scope).await;
    let captcha = issue_captcha(&session).await?;
    let layout = Layout::load(&state, &scope, &shop, nonce, Some("Contact us")).await?;
    scope.save().await?;

    Ok(ContactTemplate {
        layout,
        contact: StoreContact::new(&shop.preference),
        form: ContactForm {
            captcha: String::new(),
            ..form
        },
        errors,
        captcha,
    }
    .into_response())
}
