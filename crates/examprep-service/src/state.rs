//! Application state.

use std::sync::Arc;
use std::time::Duration;

use examprep_store::Store;

use crate::auth::JwtKeys;
use crate::config::ServiceConfig;
use crate::credits::CreditService;
use crate::default_credits::DefaultCreditService;
use crate::generator::{HttpPaperGenerator, PaperGenerator, SampleGenerator};
use crate::notify::{LogNotifier, Notifier, WebhookNotifier};
use crate::otp::{LogOtpSender, OtpService};
use crate::papers::PaperService;

/// Timeout for a single call to the question generator.
const GENERATOR_TIMEOUT: Duration = Duration::from_secs(60);

/// Application state shared across handlers.
pub struct AppState {
    /// The storage backend.
    pub store: Arc<dyn Store>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// Token signing keys.
    pub jwt: JwtKeys,

    /// Balances and the ledger.
    pub credits: Arc<CreditService>,

    /// Paper generation.
    pub papers: PaperService,

    /// Welcome-credit configuration.
    pub default_credits: DefaultCreditService,

    /// One-time passwords for student sign-in.
    pub otp: OtpService,
}

impl AppState {
    /// Create a new application state and start the generation worker.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: ServiceConfig) -> Self {
        let notifier: Arc<dyn Notifier> = match config.low_credit_webhook_url.as_deref() {
            Some(url) => match WebhookNotifier::new(url) {
                Ok(notifier) => {
                    tracing::info!(url = %url, "Low-credit webhook enabled");
                    Arc::new(notifier)
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to create low-credit webhook client");
                    Arc::new(LogNotifier)
                }
            },
            None => {
                tracing::warn!("Low-credit webhook not configured - notifications will be logged");
                Arc::new(LogNotifier)
            }
        };

        let generator: Arc<dyn PaperGenerator> = match config.generator_url.as_deref() {
            Some(url) => match HttpPaperGenerator::new(url, GENERATOR_TIMEOUT) {
                Ok(generator) => {
                    tracing::info!(url = %url, "Question generator enabled");
                    Arc::new(generator)
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to create generator client");
                    Arc::new(SampleGenerator)
                }
            },
            None => {
                tracing::warn!("Generator not configured - papers get a sample question");
                Arc::new(SampleGenerator)
            }
        };

        if config.razorpay_webhook_secret.is_none() {
            tracing::warn!("Razorpay webhook secret not configured - signatures will not be checked");
        }

        let credits = Arc::new(CreditService::new(Arc::clone(&store), notifier));
        let (papers, worker) = PaperService::new(
            Arc::clone(&store),
            Arc::clone(&credits),
            generator,
            config.worker.clone(),
        );
        tokio::spawn(worker.run());

        let jwt = JwtKeys::new(
            &config.jwt_secret,
            config.access_token_ttl,
            config.refresh_token_ttl,
        );
        let otp = OtpService::new(
            config.otp.clone(),
            config.jwt_secret.clone(),
            Arc::new(LogOtpSender),
        );

        Self {
            default_credits: DefaultCreditService::new(Arc::clone(&store)),
            store,
            config,
            jwt,
            credits,
            papers,
            otp,
        }
    }
}
