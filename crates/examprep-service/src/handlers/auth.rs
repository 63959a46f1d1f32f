//! Student sign-in: request an OTP, verify it, refresh tokens.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use examprep_core::{User, UserId, UserType};
use examprep_store::StoreError;

use super::{ok, ApiResponse};
use crate::auth::{TokenKind, TokenPair};
use crate::error::ApiError;
use crate::otp::Contact;
use crate::state::AppState;

/// `POST /v1/auth/student` request.
#[derive(Debug, Deserialize)]
pub struct StudentLoginRequest {
    /// Email address or phone number.
    pub phone_or_email: String,
    /// Dialling code for phone numbers (default `+91`).
    #[serde(default)]
    pub country_code: Option<String>,
}

/// `POST /v1/auth/student` response.
#[derive(Debug, Serialize)]
pub struct StudentLoginResponse {
    /// The student the code was sent for.
    pub user_id: UserId,
    /// Whether this request registered the student.
    pub is_new_user: bool,
    /// When the code expires.
    pub expires_at: DateTime<Utc>,
    /// The code, only when OTP exposure is enabled for development.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp: Option<String>,
}

/// `POST /v1/auth/verify` request.
#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    /// Email address or phone number used to request the code.
    pub phone_or_email: String,
    /// Dialling code for phone numbers (default `+91`).
    #[serde(default)]
    pub country_code: Option<String>,
    /// The code.
    pub otp: String,
}

/// Public view of a user.
#[derive(Debug, Serialize)]
pub struct UserSummary {
    /// User ID.
    pub id: UserId,
    /// Display name.
    pub full_name: String,
    /// Email, if any.
    pub email: Option<String>,
    /// Phone, if any.
    pub phone: Option<String>,
    /// Role.
    pub user_type: UserType,
    /// Current balance.
    pub credit_balance: i64,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            user_type: user.user_type,
            credit_balance: user.credit_balance,
        }
    }
}

/// Token pair plus the signed-in user.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    /// Tokens.
    #[serde(flatten)]
    pub tokens: TokenPair,
    /// The user.
    pub user: UserSummary,
}

/// `POST /v1/auth/refresh` request.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// A refresh token from an earlier sign-in.
    pub refresh_token: String,
}

async fn find_by_contact(state: &AppState, contact: &Contact) -> Result<Option<User>, ApiError> {
    let user = match contact {
        Contact::Email(email) => state.store.find_user_by_email(email).await?,
        Contact::Phone(phone) => state.store.find_user_by_phone(phone).await?,
    };
    Ok(user)
}

/// Look up the student for `contact`, registering them with welcome credits
/// when unknown. Returns the user and whether they were created.
async fn find_or_register(state: &AppState, contact: &Contact) -> Result<(User, bool), ApiError> {
    if let Some(user) = find_by_contact(state, contact).await? {
        return Ok((user, false));
    }

    let (email, phone) = match contact {
        Contact::Email(email) => (Some(email.clone()), None),
        Contact::Phone(phone) => (None, Some(phone.clone())),
    };
    let user = User::new_student(email, phone, contact.default_name());
    let welcome_credits = state.default_credits.get_default_credits().await?;

    match state.store.create_user(&user, welcome_credits).await {
        Ok(user) => {
            tracing::info!(
                user_id = %user.id,
                welcome_credits,
                "Student registered"
            );
            Ok((user, true))
        }
        // Lost a race with a concurrent registration for the same contact.
        Err(StoreError::Conflict(_)) => find_by_contact(state, contact)
            .await?
            .map(|user| (user, false))
            .ok_or_else(|| ApiError::Conflict("User registration conflict".into())),
        Err(e) => Err(e.into()),
    }
}

/// Request a sign-in code, registering the student on first contact.
pub async fn request_otp(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StudentLoginRequest>,
) -> Result<Json<ApiResponse<StudentLoginResponse>>, ApiError> {
    let contact = Contact::parse(&req.phone_or_email, req.country_code.as_deref())?;
    let (user, is_new_user) = find_or_register(&state, &contact).await?;
    let issued = state.otp.issue(user.id, &contact).await?;

    Ok(ok(StudentLoginResponse {
        user_id: user.id,
        is_new_user,
        expires_at: issued.expires_at,
        otp: issued.code,
    }))
}

/// Verify a sign-in code and start a session.
pub async fn verify_otp(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VerifyOtpRequest>,
) -> Result<Json<ApiResponse<SessionResponse>>, ApiError> {
    let contact = Contact::parse(&req.phone_or_email, req.country_code.as_deref())?;
    let mut user = find_by_contact(&state, &contact)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    state.otp.verify(user.id, req.otp.trim()).await?;

    user.is_active = true;
    user.last_login_at = Some(Utc::now());
    state.store.update_user_profile(&user).await?;

    let tokens = state.jwt.issue(&user)?;
    tracing::info!(user_id = %user.id, "Student signed in");

    Ok(ok(SessionResponse {
        tokens,
        user: UserSummary::from(&user),
    }))
}

/// Exchange a refresh token for a new token pair.
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<ApiResponse<SessionResponse>>, ApiError> {
    let claims = state.jwt.verify(&req.refresh_token, TokenKind::Refresh)?;
    let user_id: UserId = claims.sub.parse().map_err(|_| ApiError::Unauthorized)?;

    let user = state
        .store
        .get_user(&user_id)
        .await?
        .filter(|u| u.is_active)
        .ok_or(ApiError::Unauthorized)?;

    let tokens = state.jwt.issue(&user)?;
    Ok(ok(SessionResponse {
        tokens,
        user: UserSummary::from(&user),
    }))
}
