//! Authentication service.
//!
//! Sign-in, sign-out and the email-verified registration workflow. State
//! lives in the caller's session; the service borrows it for one step and
//! only mutates it once every network call of that step has resolved.

mod error;

pub use error::{LoginError, RegistrationFailure};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use celesta_core::Email;
use celesta_core::countdown::Countdown;
use celesta_core::registration::{RegistrationFlow, RegistrationForm};

use crate::models::CurrentUser;
use crate::services::backend::BackendApi;
use crate::services::identity::{BearerToken, IdentityError, IdentityProvider, IdentitySession};
use crate::services::mailer::OtpMailer;
use crate::services::ticker::TimerRegistry;

/// Authentication service.
pub struct AuthService<'a> {
    identity: &'a dyn IdentityProvider,
    backend: &'a dyn BackendApi,
    mailer: &'a dyn OtpMailer,
    timers: &'a TimerRegistry,
}

impl<'a> AuthService<'a> {
    #[must_use]
    pub const fn new(
        identity: &'a dyn IdentityProvider,
        backend: &'a dyn BackendApi,
        mailer: &'a dyn OtpMailer,
        timers: &'a TimerRegistry,
    ) -> Self {
        Self {
            identity,
            backend,
            mailer,
            timers,
        }
    }

    fn resend_after(&self) -> chrono::Duration {
        chrono::Duration::seconds(i64::from(self.timers.initial_secs()))
    }

    /// Resend countdown of the active challenge, read from its live timer.
    ///
    /// Complete when there is no active challenge, or when `challenge_id` is
    /// given and names some other one (the flow reports that as stale).
    async fn countdown(
        &self,
        flow: &RegistrationFlow,
        challenge_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Countdown {
        match flow.challenge() {
            Some(challenge) if challenge_id.is_none_or(|id| id == challenge.id) => {
                let timer = self
                    .timers
                    .get_or_resume(challenge.id, challenge.resend_deadline, now)
                    .await;
                let mut countdown = Countdown::new(self.timers.initial_secs());
                countdown.restart(timer.time_left());
                countdown
            }
            _ => Countdown::new(0),
        }
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Validate the form, send a code and start the resend countdown.
    ///
    /// Resubmitting while a code is out replaces it, so it is held to the
    /// same countdown as [`AuthService::resend_code`].
    ///
    /// Returns the id of the new challenge.
    ///
    /// # Errors
    ///
    /// Validation errors and `ResendNotReady` (no network call is made), or
    /// [`RegistrationFailure::Dispatch`] if the code could not be sent. The
    /// flow is unchanged on error.
    pub async fn send_code(
        &self,
        flow: &mut RegistrationFlow,
        form: RegistrationForm,
        now: DateTime<Utc>,
    ) -> Result<Uuid, RegistrationFailure> {
        let countdown = self.countdown(flow, None, now).await;
        let issue = flow.prepare_submit(
            form,
            &countdown,
            &mut rand::rng(),
            now,
            self.resend_after(),
        )?;

        self.mailer
            .send_code(issue.email(), issue.code())
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "OTP send error");
                RegistrationFailure::Dispatch(e)
            })?;

        let previous = flow.challenge().map(|c| c.id);
        let id = issue.challenge_id();
        flow.commit(issue);

        if let Some(previous) = previous {
            self.timers.remove(previous).await;
        }
        self.timers.start(id).await;

        tracing::info!(challenge = %id, "OTP sent");
        Ok(id)
    }

    /// Send a replacement code once the resend countdown is complete.
    ///
    /// Returns the id of the replacement challenge.
    ///
    /// # Errors
    ///
    /// [`RegistrationError::ResendNotReady`](celesta_core::registration::RegistrationError::ResendNotReady)
    /// while the countdown runs, other state errors, or a dispatch failure.
    pub async fn resend_code(
        &self,
        flow: &mut RegistrationFlow,
        challenge_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Uuid, RegistrationFailure> {
        let countdown = self.countdown(flow, Some(challenge_id), now).await;

        let issue = flow.prepare_resend(
            challenge_id,
            &countdown,
            &mut rand::rng(),
            now,
            self.resend_after(),
        )?;

        self.mailer
            .send_code(issue.email(), issue.code())
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "OTP resend error");
                RegistrationFailure::Dispatch(e)
            })?;

        let id = issue.challenge_id();
        flow.commit(issue);
        self.timers.remove(challenge_id).await;
        self.timers.start(id).await;

        tracing::info!(challenge = %id, "OTP resent");
        Ok(id)
    }

    /// Check the code, create the account and its profile.
    ///
    /// On success the flow is `Verified` and the new account is signed in.
    /// If profile creation fails the identity account is deleted again.
    ///
    /// # Errors
    ///
    /// [`RegistrationFailure::Invalid`] for a missing or wrong code (the flow
    /// stays `OtpSent`), or a remote failure.
    pub async fn verify(
        &self,
        flow: &mut RegistrationFlow,
        challenge_id: Uuid,
        code: &str,
    ) -> Result<CurrentUser, RegistrationFailure> {
        let (email, form) = flow.check_code(challenge_id, code)?;
        let (email, form) = (email.clone(), form.clone());

        let session = self
            .identity
            .create_account(&email, &form.password)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Registration error");
                RegistrationFailure::Identity(e)
            })?;

        let status = match self
            .backend
            .register(&session.id_token, &form.name, &form.dob.compose())
            .await
        {
            Ok(status) if status.success => status,
            Ok(_) => {
                tracing::warn!(user = %session.user, "Profile creation rejected");
                self.compensate(&session).await;
                return Err(RegistrationFailure::ProfileRejected);
            }
            Err(e) => {
                tracing::warn!(error = %e, user = %session.user, "Profile creation failed");
                self.compensate(&session).await;
                return Err(RegistrationFailure::Backend(e));
            }
        };

        flow.mark_verified();
        self.timers.remove(challenge_id).await;

        tracing::info!(user = %session.user, "Registered successfully");
        Ok(CurrentUser {
            user: session.user,
            email: session.email,
            role: status.role,
            refresh_token: session.refresh_token,
        })
    }

    /// Delete an identity account whose profile could not be created.
    ///
    /// Failure is logged and not retried.
    async fn compensate(&self, session: &IdentitySession) {
        if let Err(e) = self
            .identity
            .delete_account(&session.user, &session.id_token)
            .await
        {
            tracing::error!(
                error = %e,
                user = %session.user,
                "Failed to delete identity account after profile creation failed"
            );
        }
    }

    // =========================================================================
    // Sign in / sign out
    // =========================================================================

    /// Sign in and look up the account's role.
    ///
    /// # Errors
    ///
    /// [`LoginError::MissingFields`] for blank input, otherwise a remote failure.
    pub async fn login(&self, email: &str, password: &str) -> Result<CurrentUser, LoginError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(LoginError::MissingFields);
        }

        let email = Email::parse(email).map_err(|_| IdentityError::InvalidCredentials)?;
        let session = self.identity.sign_in(&email, password).await?;
        let status = self.backend.login(&session.id_token).await?;

        if !status.success {
            return Err(LoginError::Rejected);
        }

        tracing::info!(user = %session.user, role = ?status.role, "Signed in");
        Ok(CurrentUser {
            user: session.user,
            email: session.email,
            role: status.role,
            refresh_token: session.refresh_token,
        })
    }

    /// Sign the visitor out with the identity provider.
    ///
    /// # Errors
    ///
    /// Returns the provider's error.
    pub async fn logout(&self, user: &CurrentUser) -> Result<(), IdentityError> {
        self.identity.sign_out(&user.user).await
    }

    /// Mint a bearer token for backend calls on behalf of `user`.
    ///
    /// # Errors
    ///
    /// [`IdentityError::SessionExpired`] once the refresh token stops working.
    pub async fn bearer_for(&self, user: &CurrentUser) -> Result<BearerToken, IdentityError> {
        self.identity
            .issue_token(&user.user, &user.refresh_token)
            .await
    }
}
