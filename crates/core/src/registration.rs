//! Registration workflow.
//!
//! A registration moves through three states:
//!
//! ```text
//! Idle --submit--> OtpSent --verify--> Verified
//!                   |    ^
//!                   +----+ resend (once the countdown is complete)
//! ```
//!
//! This module holds the pure half of the workflow: validation, code issuance
//! and code checking. Every transition that depends on a network call is split
//! in two. `prepare_*` validates and returns what should be sent without
//! touching the state; the caller performs the call and only then commits the
//! result. A failed call therefore leaves the flow exactly where it was.

use core::fmt;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::countdown::Countdown;
use crate::otp::{OtpChallenge, OtpCode};
use crate::types::{Email, EmailError};

/// Errors surfaced to the visitor by the registration workflow.
///
/// Display strings are the notices shown on the form.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("All fields are required!")]
    MissingFields,
    #[error("Passwords do not match!")]
    PasswordMismatch,
    #[error("Please enter a valid email address")]
    InvalidEmail(#[from] EmailError),
    #[error("Please enter OTP")]
    MissingCode,
    #[error("Invalid OTP")]
    CodeMismatch,
    #[error("You can resend the OTP in {remaining}s")]
    ResendNotReady { remaining: u32 },
    #[error("No verification in progress")]
    NoActiveChallenge,
    #[error("This verification code has been replaced, use the latest email")]
    StaleChallenge,
    #[error("Already verified")]
    AlreadyVerified,
}

/// Date of birth as three free-text fields.
///
/// Only presence is checked. The composed string is sent to the backend
/// exactly as typed, so `"7"` stays `"7"` rather than becoming `"07"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateOfBirth {
    pub day: String,
    pub month: String,
    pub year: String,
}

impl DateOfBirth {
    /// `YYYY-MM-DD` built from the year, month and day fields in that order.
    #[must_use]
    pub fn compose(&self) -> String {
        format!("{}-{}-{}", self.year, self.month, self.day)
    }

    fn is_complete(&self) -> bool {
        !(self.day.is_empty() || self.month.is_empty() || self.year.is_empty())
    }
}

/// Everything the visitor typed on the registration form.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub dob: DateOfBirth,
}

impl fmt::Debug for RegistrationForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationForm")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("confirm_password", &"[REDACTED]")
            .field("dob", &self.dob)
            .finish()
    }
}

impl RegistrationForm {
    /// Check required fields, password confirmation and email shape.
    ///
    /// # Errors
    ///
    /// [`RegistrationError::MissingFields`] if any field is empty,
    /// [`RegistrationError::PasswordMismatch`] if the passwords differ, and
    /// [`RegistrationError::InvalidEmail`] if the email can't be parsed.
    pub fn validate(&self) -> Result<Email, RegistrationError> {
        if self.name.is_empty()
            || self.email.is_empty()
            || self.password.is_empty()
            || self.confirm_password.is_empty()
            || !self.dob.is_complete()
        {
            return Err(RegistrationError::MissingFields);
        }

        if self.password != self.confirm_password {
            return Err(RegistrationError::PasswordMismatch);
        }

        Ok(Email::parse(&self.email)?)
    }
}

/// A code that has been generated but not yet delivered.
///
/// Produced by [`RegistrationFlow::prepare_submit`] and
/// [`RegistrationFlow::prepare_resend`]; handed back to
/// [`RegistrationFlow::commit`] once delivery succeeded.
#[derive(Debug, Clone)]
pub struct OtpIssue {
    email: Email,
    form: RegistrationForm,
    challenge: OtpChallenge,
}

impl OtpIssue {
    #[must_use]
    pub const fn email(&self) -> &Email {
        &self.email
    }

    #[must_use]
    pub const fn code(&self) -> &OtpCode {
        &self.challenge.code
    }

    #[must_use]
    pub const fn challenge_id(&self) -> Uuid {
        self.challenge.id
    }
}

/// Where a registration currently stands.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RegistrationState {
    #[default]
    Idle,
    OtpSent {
        email: Email,
        form: RegistrationForm,
        challenge: OtpChallenge,
    },
    Verified {
        email: Email,
    },
}

/// Registration workflow state machine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationFlow {
    state: RegistrationState,
}

impl RegistrationFlow {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn state(&self) -> &RegistrationState {
        &self.state
    }

    /// The active challenge, if a code has been sent.
    #[must_use]
    pub const fn challenge(&self) -> Option<&OtpChallenge> {
        match &self.state {
            RegistrationState::OtpSent { challenge, .. } => Some(challenge),
            _ => None,
        }
    }

    /// The form captured when the code was sent.
    #[must_use]
    pub const fn form(&self) -> Option<&RegistrationForm> {
        match &self.state {
            RegistrationState::OtpSent { form, .. } => Some(form),
            _ => None,
        }
    }

    /// Validate `form` and generate a code for it.
    ///
    /// Allowed from `Idle`, and from `OtpSent` so a visitor can go back and
    /// correct the form. A corrected form sends a new code, so from `OtpSent`
    /// it waits for `countdown` (the active challenge's resend timer) exactly
    /// like a resend; the old challenge is replaced on commit.
    ///
    /// # Errors
    ///
    /// Any validation error from [`RegistrationForm::validate`],
    /// [`RegistrationError::ResendNotReady`] while a code is out and the
    /// countdown runs, or [`RegistrationError::AlreadyVerified`] once the flow
    /// has finished.
    pub fn prepare_submit<R: Rng + ?Sized>(
        &self,
        form: RegistrationForm,
        countdown: &Countdown,
        rng: &mut R,
        now: DateTime<Utc>,
        resend_after: Duration,
    ) -> Result<OtpIssue, RegistrationError> {
        match self.state {
            RegistrationState::Verified { .. } => return Err(RegistrationError::AlreadyVerified),
            RegistrationState::OtpSent { .. } if !countdown.is_complete() => {
                return Err(RegistrationError::ResendNotReady {
                    remaining: countdown.time_left(),
                });
            }
            _ => {}
        }

        let email = form.validate()?;
        Ok(OtpIssue {
            email,
            form,
            challenge: OtpChallenge::issue(rng, now, resend_after),
        })
    }

    /// Generate a replacement code for the active challenge.
    ///
    /// `countdown` is the resend timer; resending is refused until it is complete.
    ///
    /// # Errors
    ///
    /// [`RegistrationError::NoActiveChallenge`] outside `OtpSent`,
    /// [`RegistrationError::StaleChallenge`] if `challenge_id` is not the active
    /// one, and [`RegistrationError::ResendNotReady`] while the countdown runs.
    pub fn prepare_resend<R: Rng + ?Sized>(
        &self,
        challenge_id: Uuid,
        countdown: &Countdown,
        rng: &mut R,
        now: DateTime<Utc>,
        resend_after: Duration,
    ) -> Result<OtpIssue, RegistrationError> {
        let RegistrationState::OtpSent {
            email,
            form,
            challenge,
        } = &self.state
        else {
            return Err(RegistrationError::NoActiveChallenge);
        };

        if challenge.id != challenge_id {
            return Err(RegistrationError::StaleChallenge);
        }

        if !countdown.is_complete() {
            return Err(RegistrationError::ResendNotReady {
                remaining: countdown.time_left(),
            });
        }

        Ok(OtpIssue {
            email: email.clone(),
            form: form.clone(),
            challenge: OtpChallenge::issue(rng, now, resend_after),
        })
    }

    /// Record a delivered code. Moves to `OtpSent`.
    ///
    /// The confirmation has served its purpose once the form validated, so
    /// only the password itself is kept for account creation.
    pub fn commit(&mut self, issue: OtpIssue) {
        let mut form = issue.form;
        form.confirm_password.clear();
        self.state = RegistrationState::OtpSent {
            email: issue.email,
            form,
            challenge: issue.challenge,
        };
    }

    /// Compare `input` with the active code.
    ///
    /// Does not change state; call [`RegistrationFlow::mark_verified`] once the
    /// account and profile have both been created.
    ///
    /// # Errors
    ///
    /// [`RegistrationError::MissingCode`] for empty input,
    /// [`RegistrationError::NoActiveChallenge`] outside `OtpSent`,
    /// [`RegistrationError::StaleChallenge`] for an old form, and
    /// [`RegistrationError::CodeMismatch`] when the code differs.
    pub fn check_code(
        &self,
        challenge_id: Uuid,
        input: &str,
    ) -> Result<(&Email, &RegistrationForm), RegistrationError> {
        if input.is_empty() {
            return Err(RegistrationError::MissingCode);
        }

        let RegistrationState::OtpSent {
            email,
            form,
            challenge,
        } = &self.state
        else {
            return Err(RegistrationError::NoActiveChallenge);
        };

        if challenge.id != challenge_id {
            return Err(RegistrationError::StaleChallenge);
        }

        if !challenge.code.matches(input) {
            return Err(RegistrationError::CodeMismatch);
        }

        Ok((email, form))
    }

    /// Finish the flow. Only meaningful from `OtpSent`.
    pub fn mark_verified(&mut self) {
        if let RegistrationState::OtpSent { email, .. } = &self.state {
            self.state = RegistrationState::Verified {
                email: email.clone(),
            };
        }
    }

    /// Abandon the flow and return to `Idle`.
    pub fn reset(&mut self) {
        self.state = RegistrationState::Idle;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn form() -> RegistrationForm {
        RegistrationForm {
            name: "Asha Verma".to_owned(),
            email: "asha@iitp.ac.in".to_owned(),
            password: "hunter22".to_owned(),
            confirm_password: "hunter22".to_owned(),
            dob: DateOfBirth {
                day: "7".to_owned(),
                month: "03".to_owned(),
                year: "2004".to_owned(),
            },
        }
    }

    fn sent_flow(rng: &mut StdRng) -> (RegistrationFlow, Uuid, String) {
        let mut flow = RegistrationFlow::new();
        let issue = flow
            .prepare_submit(form(), &Countdown::new(0), rng, Utc::now(), Duration::seconds(30))
            .unwrap();
        let id = issue.challenge_id();
        let code = issue.code().as_str().to_owned();
        flow.commit(issue);
        (flow, id, code)
    }

    #[test]
    fn test_missing_fields() {
        let mut rng = StdRng::seed_from_u64(0);
        let flow = RegistrationFlow::new();

        for blank in 0..5 {
            let mut f = form();
            match blank {
                0 => f.name.clear(),
                1 => f.email.clear(),
                2 => f.password.clear(),
                3 => f.confirm_password.clear(),
                _ => f.dob.year.clear(),
            }
            let err = flow
                .prepare_submit(f, &Countdown::new(0), &mut rng, Utc::now(), Duration::seconds(30))
                .unwrap_err();
            assert_eq!(err, RegistrationError::MissingFields);
        }
        assert_eq!(flow.state(), &RegistrationState::Idle);
    }

    #[test]
    fn test_password_mismatch_stays_idle() {
        let mut rng = StdRng::seed_from_u64(0);
        let flow = RegistrationFlow::new();
        let mut f = form();
        f.confirm_password = "hunter23".to_owned();

        let err = flow
            .prepare_submit(f, &Countdown::new(0), &mut rng, Utc::now(), Duration::seconds(30))
            .unwrap_err();

        assert_eq!(err, RegistrationError::PasswordMismatch);
        assert_eq!(err.to_string(), "Passwords do not match!");
        assert_eq!(flow.state(), &RegistrationState::Idle);
    }

    #[test]
    fn test_invalid_email() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut f = form();
        f.email = "not-an-email".to_owned();
        let err = RegistrationFlow::new()
            .prepare_submit(f, &Countdown::new(0), &mut rng, Utc::now(), Duration::seconds(30))
            .unwrap_err();
        assert!(matches!(err, RegistrationError::InvalidEmail(_)));
    }

    #[test]
    fn test_prepare_does_not_change_state_until_commit() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut flow = RegistrationFlow::new();
        let issue = flow
            .prepare_submit(form(), &Countdown::new(0), &mut rng, Utc::now(), Duration::seconds(30))
            .unwrap();
        assert_eq!(flow.state(), &RegistrationState::Idle);

        flow.commit(issue);
        assert!(matches!(flow.state(), RegistrationState::OtpSent { .. }));
    }

    #[test]
    fn test_exact_code_passes_check() {
        let mut rng = StdRng::seed_from_u64(11);
        let (mut flow, id, code) = sent_flow(&mut rng);

        let (email, f) = flow.check_code(id, &code).unwrap();
        assert_eq!(email.as_str(), "asha@iitp.ac.in");
        assert_eq!(f.dob.compose(), "2004-03-7");

        flow.mark_verified();
        assert!(matches!(flow.state(), RegistrationState::Verified { .. }));
    }

    #[test]
    fn test_other_six_digit_codes_mismatch() {
        let mut rng = StdRng::seed_from_u64(12);
        let (flow, id, code) = sent_flow(&mut rng);

        for candidate in ["100000", "999999", "123456", "654321"] {
            if candidate == code {
                continue;
            }
            assert_eq!(
                flow.check_code(id, candidate).unwrap_err(),
                RegistrationError::CodeMismatch
            );
        }
        assert!(matches!(flow.state(), RegistrationState::OtpSent { .. }));
    }

    #[test]
    fn test_code_not_trimmed() {
        let mut rng = StdRng::seed_from_u64(13);
        let (flow, id, code) = sent_flow(&mut rng);
        assert_eq!(
            flow.check_code(id, &format!(" {code}")).unwrap_err(),
            RegistrationError::CodeMismatch
        );
    }

    #[test]
    fn test_empty_code() {
        let mut rng = StdRng::seed_from_u64(14);
        let (flow, id, _) = sent_flow(&mut rng);
        assert_eq!(
            flow.check_code(id, "").unwrap_err(),
            RegistrationError::MissingCode
        );
    }

    #[test]
    fn test_stale_challenge_rejected() {
        let mut rng = StdRng::seed_from_u64(15);
        let (flow, _, code) = sent_flow(&mut rng);
        assert_eq!(
            flow.check_code(Uuid::new_v4(), &code).unwrap_err(),
            RegistrationError::StaleChallenge
        );
    }

    #[test]
    fn test_check_without_challenge() {
        assert_eq!(
            RegistrationFlow::new()
                .check_code(Uuid::new_v4(), "123456")
                .unwrap_err(),
            RegistrationError::NoActiveChallenge
        );
    }

    #[test]
    fn test_resend_rejected_while_countdown_runs() {
        let mut rng = StdRng::seed_from_u64(16);
        let (flow, id, _) = sent_flow(&mut rng);
        let mut countdown = Countdown::new(30);
        countdown.tick();

        let err = flow
            .prepare_resend(id, &countdown, &mut rng, Utc::now(), Duration::seconds(30))
            .unwrap_err();
        assert_eq!(err, RegistrationError::ResendNotReady { remaining: 29 });
    }

    #[test]
    fn test_resend_after_countdown_replaces_challenge() {
        let mut rng = StdRng::seed_from_u64(17);
        let (mut flow, id, _) = sent_flow(&mut rng);
        let mut countdown = Countdown::new(2);
        countdown.tick();
        countdown.tick();

        let issue = flow
            .prepare_resend(id, &countdown, &mut rng, Utc::now(), Duration::seconds(30))
            .unwrap();
        let new_id = issue.challenge_id();
        let new_code = issue.code().as_str().to_owned();
        flow.commit(issue);

        assert_ne!(new_id, id);
        assert_eq!(
            flow.check_code(id, &new_code).unwrap_err(),
            RegistrationError::StaleChallenge
        );
        assert!(flow.check_code(new_id, &new_code).is_ok());
    }

    #[test]
    fn test_resubmit_waits_for_countdown() {
        let mut rng = StdRng::seed_from_u64(20);
        let (mut flow, id, _) = sent_flow(&mut rng);
        let mut countdown = Countdown::new(30);
        countdown.tick();

        let mut corrected = form();
        corrected.name = "Asha V.".to_owned();
        let err = flow
            .prepare_submit(corrected.clone(), &countdown, &mut rng, Utc::now(), Duration::seconds(30))
            .unwrap_err();
        assert_eq!(err, RegistrationError::ResendNotReady { remaining: 29 });
        assert_eq!(flow.challenge().unwrap().id, id);

        let issue = flow
            .prepare_submit(corrected, &Countdown::new(0), &mut rng, Utc::now(), Duration::seconds(30))
            .unwrap();
        flow.commit(issue);
        assert_ne!(flow.challenge().unwrap().id, id);
        assert_eq!(flow.form().unwrap().name, "Asha V.");
    }

    #[test]
    fn test_commit_drops_password_confirmation() {
        let mut rng = StdRng::seed_from_u64(21);
        let (flow, _, _) = sent_flow(&mut rng);
        let stored = flow.form().unwrap();
        assert_eq!(stored.password, "hunter22");
        assert!(stored.confirm_password.is_empty());
    }

    #[test]
    fn test_submit_after_verified_rejected() {
        let mut rng = StdRng::seed_from_u64(18);
        let (mut flow, _, _) = sent_flow(&mut rng);
        flow.mark_verified();
        assert_eq!(
            flow.prepare_submit(form(), &Countdown::new(0), &mut rng, Utc::now(), Duration::seconds(30))
                .unwrap_err(),
            RegistrationError::AlreadyVerified
        );
    }

    #[test]
    fn test_form_debug_redacts_passwords() {
        let rendered = format!("{:?}", form());
        assert!(!rendered.contains("hunter22"));
    }

    #[test]
    fn test_flow_survives_session_serialization() {
        let mut rng = StdRng::seed_from_u64(19);
        let (flow, id, code) = sent_flow(&mut rng);
        let json = serde_json::to_value(&flow).unwrap();
        let restored: RegistrationFlow = serde_json::from_value(json).unwrap();
        assert!(restored.check_code(id, &code).is_ok());
    }
}
