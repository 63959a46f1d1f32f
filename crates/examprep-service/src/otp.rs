//! One-time passwords for student sign-in.
//!
//! Codes live in process memory as HMAC digests keyed by user; the plain
//! code only exists long enough to hand it to an [`OtpSender`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::Rng;
use tokio::sync::Mutex;

use examprep_core::UserId;

use crate::config::OtpSettings;
use crate::crypto::{constant_time_eq, hmac_sha256_hex};
use crate::error::ApiError;

/// Country code used when a phone number arrives without one.
pub const DEFAULT_COUNTRY_CODE: &str = "+91";

/// OTP failures.
#[derive(Debug, thiserror::Error)]
pub enum OtpError {
    /// Neither a valid email nor a phone number.
    #[error("invalid phone number or email: {0}")]
    InvalidContact(String),

    /// Too many codes requested inside the generation window.
    #[error("Too many OTP requests. Please try again after 15 minutes.")]
    RateLimited,

    /// No code is pending for this user.
    #[error("OTP not found or expired")]
    NotFound,

    /// The pending code is past its expiry.
    #[error("OTP expired")]
    Expired,

    /// The pending code was guessed wrong too often.
    #[error("Maximum verification attempts exceeded")]
    TooManyAttempts,

    /// Wrong code.
    #[error("Invalid OTP code ({attempts_remaining} attempts remaining)")]
    Invalid {
        /// Guesses left before the code is burned.
        attempts_remaining: u32,
    },

    /// The sender could not deliver the code.
    #[error("failed to send OTP: {0}")]
    Delivery(String),
}

impl From<OtpError> for ApiError {
    fn from(err: OtpError) -> Self {
        match err {
            OtpError::RateLimited => Self::TooManyRequests(err.to_string()),
            OtpError::Delivery(msg) => Self::ExternalService(msg),
            _ => Self::BadRequest(err.to_string()),
        }
    }
}

/// Where a code is delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Contact {
    /// Lower-cased email address.
    Email(String),
    /// Phone number in `+<country><number>` form.
    Phone(String),
}

impl Contact {
    /// Classify `input` as an email or a phone number.
    ///
    /// Phones are reduced to digits and prefixed with `country_code`
    /// (default `+91`) unless they already start with it.
    pub fn parse(input: &str, country_code: Option<&str>) -> Result<Self, OtpError> {
        let input = input.trim();
        if is_email(input) {
            return Ok(Self::Email(input.to_ascii_lowercase()));
        }

        let digits: String = input.chars().filter(char::is_ascii_digit).collect();
        if digits.len() < 6 || input.contains('@') {
            return Err(OtpError::InvalidContact(input.to_string()));
        }

        let code = country_code.unwrap_or(DEFAULT_COUNTRY_CODE);
        let code_digits: String = code.chars().filter(char::is_ascii_digit).collect();
        if digits.starts_with(&code_digits) {
            Ok(Self::Phone(format!("+{digits}")))
        } else {
            Ok(Self::Phone(format!("+{code_digits}{digits}")))
        }
    }

    /// The normalised address.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Email(s) | Self::Phone(s) => s,
        }
    }

    /// Display name for a student registered with this contact.
    #[must_use]
    pub fn default_name(&self) -> String {
        match self {
            Self::Email(email) => email.split('@').next().unwrap_or("Student").to_string(),
            Self::Phone(_) => "Student".to_string(),
        }
    }
}

/// `local@domain.tld` with a two-letter-or-longer alphabetic TLD.
fn is_email(input: &str) -> bool {
    let Some((local, domain)) = input.split_once('@') else {
        return false;
    };
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    let local_ok = !local.is_empty()
        && local
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "._%+-".contains(c));
    let host_ok = !host.is_empty()
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    let tld_ok = tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic());
    local_ok && host_ok && tld_ok
}

/// Delivers codes to users.
#[async_trait]
pub trait OtpSender: Send + Sync {
    /// Send `code` to `contact`.
    async fn send(&self, contact: &Contact, code: &str, ttl_minutes: u64) -> Result<(), OtpError>;
}

/// Writes codes to the log instead of sending them. Development only.
#[derive(Debug, Default)]
pub struct LogOtpSender;

#[async_trait]
impl OtpSender for LogOtpSender {
    async fn send(&self, contact: &Contact, code: &str, ttl_minutes: u64) -> Result<(), OtpError> {
        tracing::info!(
            contact = %contact.as_str(),
            code = %code,
            ttl_minutes,
            "OTP generated (log sender)"
        );
        Ok(())
    }
}

/// Result of [`OtpService::issue`].
#[derive(Debug, Clone)]
pub struct IssuedOtp {
    /// When the code stops being accepted.
    pub expires_at: DateTime<Utc>,
    /// The code itself, only when `expose_code` is on.
    pub code: Option<String>,
}

#[derive(Debug)]
struct PendingCode {
    digest: String,
    expires_at: DateTime<Utc>,
    attempts: u32,
}

#[derive(Debug, Default)]
struct OtpTables {
    pending: HashMap<UserId, PendingCode>,
    issued_at: HashMap<UserId, Vec<DateTime<Utc>>>,
}

impl OtpTables {
    /// Drop expired codes and generation timestamps outside the rate window.
    fn sweep(&mut self, now: DateTime<Utc>, window: chrono::Duration) {
        self.pending.retain(|_, code| now <= code.expires_at);
        self.issued_at.retain(|_, history| {
            history.retain(|t| now - *t < window);
            !history.is_empty()
        });
    }
}

/// Issues and verifies one-time passwords.
pub struct OtpService {
    settings: OtpSettings,
    secret: String,
    sender: Arc<dyn OtpSender>,
    tables: Mutex<OtpTables>,
}

impl OtpService {
    /// Create a service. `secret` keys the stored digests.
    #[must_use]
    pub fn new(settings: OtpSettings, secret: String, sender: Arc<dyn OtpSender>) -> Self {
        Self {
            settings,
            secret,
            sender,
            tables: Mutex::new(OtpTables::default()),
        }
    }

    /// Generate a code for `user_id`, replace any pending one and send it.
    pub async fn issue(&self, user_id: UserId, contact: &Contact) -> Result<IssuedOtp, OtpError> {
        let code = self.generate_code();
        let expires_at = self.store_code(user_id, &code, Utc::now()).await?;

        let ttl_minutes = self.settings.ttl.as_secs() / 60;
        if let Err(e) = self.sender.send(contact, &code, ttl_minutes).await {
            tracing::warn!(user_id = %user_id, error = %e, "OTP delivery failed");
            self.tables.lock().await.pending.remove(&user_id);
            return Err(e);
        }

        tracing::info!(user_id = %user_id, expires_at = %expires_at, "OTP issued");
        Ok(IssuedOtp {
            expires_at,
            code: self.settings.expose_code.then_some(code),
        })
    }

    /// Check `code` against the pending code. A correct code is consumed.
    pub async fn verify(&self, user_id: UserId, code: &str) -> Result<(), OtpError> {
        self.verify_at(user_id, code, Utc::now()).await
    }

    fn generate_code(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..self.settings.length)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect()
    }

    fn digest(&self, user_id: UserId, code: &str) -> String {
        hmac_sha256_hex(&self.secret, format!("{user_id}:{code}").as_bytes())
    }

    async fn store_code(
        &self,
        user_id: UserId,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, OtpError> {
        let window = chrono::Duration::from_std(self.settings.generation_window)
            .unwrap_or_else(|_| chrono::Duration::minutes(15));
        let ttl = chrono::Duration::from_std(self.settings.ttl)
            .unwrap_or_else(|_| chrono::Duration::minutes(10));

        let mut tables = self.tables.lock().await;
        tables.sweep(now, window);
        let history = tables.issued_at.entry(user_id).or_default();
        if history.len() >= self.settings.max_generations {
            tracing::warn!(user_id = %user_id, "OTP generation rate limit hit");
            return Err(OtpError::RateLimited);
        }
        history.push(now);

        let expires_at = now + ttl;
        let digest = self.digest(user_id, code);
        tables.pending.insert(
            user_id,
            PendingCode {
                digest,
                expires_at,
                attempts: 0,
            },
        );
        Ok(expires_at)
    }

    async fn verify_at(&self, user_id: UserId, code: &str, now: DateTime<Utc>) -> Result<(), OtpError> {
        let digest = self.digest(user_id, code.trim());
        let mut tables = self.tables.lock().await;
        let pending = tables.pending.get_mut(&user_id).ok_or(OtpError::NotFound)?;

        if now > pending.expires_at {
            tables.pending.remove(&user_id);
            return Err(OtpError::Expired);
        }
        if pending.attempts >= self.settings.max_attempts {
            tables.pending.remove(&user_id);
            return Err(OtpError::TooManyAttempts);
        }
        if !constant_time_eq(&pending.digest, &digest) {
            pending.attempts += 1;
            return Err(OtpError::Invalid {
                attempts_remaining: self.settings.max_attempts.saturating_sub(pending.attempts),
            });
        }

        tables.pending.remove(&user_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> OtpService {
        OtpService::new(
            OtpSettings::default(),
            "otp-secret".into(),
            Arc::new(LogOtpSender),
        )
    }

    #[test]
    fn contact_detects_email() {
        assert_eq!(
            Contact::parse(" Asha@Example.com ", None).unwrap(),
            Contact::Email("asha@example.com".into())
        );
        assert!(Contact::parse("asha@example", None).is_err());
        assert!(Contact::parse("@example.com", None).is_err());
    }

    #[test]
    fn contact_normalises_phone_numbers() {
        assert_eq!(
            Contact::parse("98765 43210", None).unwrap(),
            Contact::Phone("+919876543210".into())
        );
        assert_eq!(
            Contact::parse("+91-98765-43210", None).unwrap(),
            Contact::Phone("+919876543210".into())
        );
        assert_eq!(
            Contact::parse("5551234567", Some("+1")).unwrap(),
            Contact::Phone("+15551234567".into())
        );
        assert!(Contact::parse("12", None).is_err());
    }

    #[test]
    fn default_name_uses_email_local_part() {
        assert_eq!(Contact::Email("asha@example.com".into()).default_name(), "asha");
        assert_eq!(Contact::Phone("+919876543210".into()).default_name(), "Student");
    }

    #[test]
    fn generated_codes_have_configured_length() {
        let code = service().generate_code();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    #[tokio::test]
    async fn correct_code_verifies_once() {
        let otp = service();
        let user = UserId::generate();
        let now = Utc::now();
        otp.store_code(user, "123456", now).await.unwrap();

        otp.verify_at(user, "123456", now).await.unwrap();
        assert!(matches!(
            otp.verify_at(user, "123456", now).await,
            Err(OtpError::NotFound)
        ));
    }

    #[tokio::test]
    async fn wrong_guesses_burn_the_code() {
        let otp = service();
        let user = UserId::generate();
        let now = Utc::now();
        otp.store_code(user, "123456", now).await.unwrap();

        for remaining in [2, 1, 0] {
            match otp.verify_at(user, "000000", now).await {
                Err(OtpError::Invalid { attempts_remaining }) => {
                    assert_eq!(attempts_remaining, remaining);
                }
                other => panic!("expected invalid code, got {other:?}"),
            }
        }
        assert!(matches!(
            otp.verify_at(user, "123456", now).await,
            Err(OtpError::TooManyAttempts)
        ));
    }

    #[tokio::test]
    async fn expired_code_is_rejected() {
        let otp = service();
        let user = UserId::generate();
        let now = Utc::now();
        otp.store_code(user, "123456", now).await.unwrap();

        let later = now + chrono::Duration::minutes(11);
        assert!(matches!(
            otp.verify_at(user, "123456", later).await,
            Err(OtpError::Expired)
        ));
    }

    #[tokio::test]
    async fn generation_is_rate_limited_per_window() {
        let otp = service();
        let user = UserId::generate();
        let now = Utc::now();
        for _ in 0..3 {
            otp.store_code(user, "123456", now).await.unwrap();
        }
        assert!(matches!(
            otp.store_code(user, "123456", now).await,
            Err(OtpError::RateLimited)
        ));

        let later = now + chrono::Duration::minutes(16);
        otp.store_code(user, "654321", later).await.unwrap();
        otp.verify_at(user, "654321", later).await.unwrap();
    }

    #[tokio::test]
    async fn stale_codes_and_histories_are_swept() {
        let otp = service();
        let idle = UserId::generate();
        let now = Utc::now();
        otp.store_code(idle, "123456", now).await.unwrap();

        let later = now + chrono::Duration::minutes(16);
        let active = UserId::generate();
        otp.store_code(active, "654321", later).await.unwrap();

        let tables = otp.tables.lock().await;
        assert!(!tables.pending.contains_key(&idle));
        assert!(!tables.issued_at.contains_key(&idle));
        assert_eq!(tables.pending.len(), 1);
        assert_eq!(tables.issued_at.len(), 1);
    }

    #[tokio::test]
    async fn issue_exposes_code_only_when_enabled() {
        let user = UserId::generate();
        let contact = Contact::Email("a@b.co".into());
        assert!(service().issue(user, &contact).await.unwrap().code.is_none());

        let otp = OtpService::new(
            OtpSettings {
                expose_code: true,
                ..OtpSettings::default()
            },
            "otp-secret".into(),
            Arc::new(LogOtpSender),
        );
        let issued = otp.issue(user, &contact).await.unwrap();
        let code = issued.code.unwrap();
        otp.verify(user, &code).await.unwrap();
    }
}
