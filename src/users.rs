//! User/session manager collaborator contract.
//!
//! Sessions, credentials, activation emails and 2FA flows live in an
//! external service; the frontend consumes them through this trait. Status
//! strings returned by the collaborator are passed through to API responses
//! verbatim.

use async_trait::async_trait;
use serde::Deserialize;

/// Login credentials presented to `userLogin`.
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub login: String,
    pub password: String,
    #[serde(default)]
    pub totp: Option<String>,
}

/// Fields accepted by `userCreate`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub login: String,
    pub password: String,
    pub email: String,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub is_read_only: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub login: String,
    pub name: String,
    pub email: String,
    pub registration_date: i64,
}

/// Per-coin payout settings of one user.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    pub coin: String,
    #[serde(default)]
    pub address: Option<String>,
    pub payout_threshold: String,
    pub auto_payout_enabled: bool,
}

/// One row of the administrative user listing.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub login: String,
    pub email: String,
    pub registration_date: i64,
    pub workers: u64,
    pub last_share_time: i64,
}

/// External user/session manager.
///
/// All calls are asynchronous and single-shot. Methods returning `String`
/// yield a status for the API response; session resolution returns `None`
/// for any invalid, expired or under-privileged session so callers cannot
/// distinguish which sessions exist.
#[async_trait]
pub trait UserManager: Send + Sync {
    /// Resolve a session to the login it may act as.
    ///
    /// With `target_login` set, the session must be allowed to act on that
    /// user (an administrator session); the resolved login is then the
    /// target. `require_write` rejects read-only sessions.
    async fn validate_session(
        &self,
        session_id: &str,
        target_login: Option<&str>,
        require_write: bool,
    ) -> Option<String>;

    /// Authenticate and open a session. `Ok` carries the session id, `Err`
    /// the status to report.
    async fn login(&self, credentials: Credentials) -> Result<String, String>;

    async fn logout(&self, session_id: &str) -> String;

    async fn create(&self, user: NewUser) -> String;

    /// Complete an emailed action (activation, password recovery, ...).
    async fn action(&self, action_id: &str, new_password: Option<&str>, totp: Option<&str>)
        -> String;

    async fn resend_email(&self, login: &str) -> String;

    async fn change_email(&self, login: &str, new_email: &str) -> String;

    async fn change_password(&self, login: &str, new_password: &str) -> String;

    /// Start an email-confirmed password change for the given login.
    async fn change_password_initiate(&self, login: &str) -> String;

    /// Start password recovery for the given login.
    async fn recovery_password(&self, login: &str) -> String;

    async fn get_credentials(&self, login: &str) -> Option<UserCredentials>;

    async fn get_settings(&self, login: &str) -> Vec<UserSettings>;

    async fn update_credentials(&self, login: &str, name: &str) -> String;

    async fn update_settings(&self, login: &str, settings: UserSettings) -> String;

    async fn enumerate_all(&self) -> Vec<UserRecord>;

    async fn activate_2fa_initiate(&self, login: &str) -> String;

    async fn deactivate_2fa_initiate(&self, login: &str) -> String;
}
