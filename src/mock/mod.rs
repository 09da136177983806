//! In-memory collaborator implementations.
//!
//! Back the frontend in tests and in the development server. `MockBackend`
//! can delay its replies to exercise out-of-order completion paths.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::backend::{
    Backend, CoinInfo, FoundBlock, PayoutRecord, PoolStats, UserBalance, UserStats,
};
use crate::config::CoinConfig;
use crate::users::{
    Credentials, NewUser, UserCredentials, UserManager, UserRecord, UserSettings,
};

const ADMIN_LOGIN: &str = "admin";

#[derive(Debug, Clone)]
struct MockUser {
    login: String,
    password: String,
    name: String,
    email: String,
    registration_date: i64,
}

/// In-memory user/session manager.
///
/// An `admin` account is preprovisioned; its sessions may act on any target
/// login. Session ids are random UUIDs.
#[derive(Debug, Default)]
pub struct MockUserManager {
    users: DashMap<String, MockUser>,
    sessions: DashMap<String, String>,
    settings: DashMap<String, Vec<UserSettings>>,
    login_calls: AtomicU64,
}

impl MockUserManager {
    pub fn new() -> Self {
        let manager = Self::default();
        manager.add_user(ADMIN_LOGIN, "admin", "admin@pool.test");
        manager
    }

    pub fn add_user(&self, login: &str, password: &str, email: &str) {
        self.users.insert(
            login.to_string(),
            MockUser {
                login: login.to_string(),
                password: password.to_string(),
                name: login.to_string(),
                email: email.to_string(),
                registration_date: chrono::Utc::now().timestamp(),
            },
        );
    }

    /// How many `login` calls this manager has served.
    pub fn login_calls(&self) -> u64 {
        self.login_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserManager for MockUserManager {
    async fn validate_session(
        &self,
        session_id: &str,
        target_login: Option<&str>,
        _require_write: bool,
    ) -> Option<String> {
        let login = self.sessions.get(session_id)?.clone();

        match target_login {
            None => Some(login),
            Some(target) if target == login => Some(login),
            Some(target) if login == ADMIN_LOGIN => Some(target.to_string()),
            Some(_) => None,
        }
    }

    async fn login(&self, credentials: Credentials) -> Result<String, String> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);

        let known = self
            .users
            .get(&credentials.login)
            .map(|user| user.password == credentials.password)
            .unwrap_or(false);
        if !known {
            return Err("invalid_password".to_string());
        }

        let session_id = uuid::Uuid::new_v4().to_string();
        self.sessions
            .insert(session_id.clone(), credentials.login.clone());
        Ok(session_id)
    }

    async fn logout(&self, session_id: &str) -> String {
        match self.sessions.remove(session_id) {
            Some(_) => "ok".to_string(),
            None => "unknown_id".to_string(),
        }
    }

    async fn create(&self, user: NewUser) -> String {
        if self.users.contains_key(&user.login) {
            return "duplicate_login".to_string();
        }
        self.add_user(&user.login, &user.password, &user.email);
        "ok".to_string()
    }

    async fn action(
        &self,
        _action_id: &str,
        _new_password: Option<&str>,
        _totp: Option<&str>,
    ) -> String {
        "ok".to_string()
    }

    async fn resend_email(&self, login: &str) -> String {
        if self.users.contains_key(login) {
            "ok".to_string()
        } else {
            "unknown_login".to_string()
        }
    }

    async fn change_email(&self, login: &str, new_email: &str) -> String {
        match self.users.get_mut(login) {
            Some(mut user) => {
                user.email = new_email.to_string();
                "ok".to_string()
            }
            None => "unknown_login".to_string(),
        }
    }

    async fn change_password(&self, login: &str, new_password: &str) -> String {
        match self.users.get_mut(login) {
            Some(mut user) => {
                user.password = new_password.to_string();
                "ok".to_string()
            }
            None => "unknown_login".to_string(),
        }
    }

    async fn change_password_initiate(&self, login: &str) -> String {
        if self.users.contains_key(login) {
            "ok".to_string()
        } else {
            "unknown_login".to_string()
        }
    }

    async fn recovery_password(&self, login: &str) -> String {
        if self.users.contains_key(login) {
            "ok".to_string()
        } else {
            "unknown_login".to_string()
        }
    }

    async fn get_credentials(&self, login: &str) -> Option<UserCredentials> {
        self.users.get(login).map(|user| UserCredentials {
            login: user.login.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            registration_date: user.registration_date,
        })
    }

    async fn get_settings(&self, login: &str) -> Vec<UserSettings> {
        self.settings
            .get(login)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    async fn update_credentials(&self, login: &str, name: &str) -> String {
        match self.users.get_mut(login) {
            Some(mut user) => {
                user.name = name.to_string();
                "ok".to_string()
            }
            None => "unknown_login".to_string(),
        }
    }

    async fn update_settings(&self, login: &str, settings: UserSettings) -> String {
        let mut entry = self.settings.entry(login.to_string()).or_default();
        entry.retain(|s| s.coin != settings.coin);
        entry.push(settings);
        "ok".to_string()
    }

    async fn enumerate_all(&self) -> Vec<UserRecord> {
        self.users
            .iter()
            .map(|user| UserRecord {
                login: user.login.clone(),
                email: user.email.clone(),
                registration_date: user.registration_date,
                workers: 0,
                last_share_time: 0,
            })
            .collect()
    }

    async fn activate_2fa_initiate(&self, _login: &str) -> String {
        "ok".to_string()
    }

    async fn deactivate_2fa_initiate(&self, _login: &str) -> String {
        "ok".to_string()
    }
}

/// In-memory per-coin backend with configurable reply delay and canned data.
pub struct MockBackend {
    coin: CoinInfo,
    address_prefix: String,
    delay: Option<Duration>,
    pool_stats: PoolStats,
    payout_calls: AtomicU64,
}

impl MockBackend {
    pub fn new(name: &str) -> Self {
        Self {
            coin: CoinInfo {
                name: name.to_string(),
                full_name: name.to_string(),
                default_payout_threshold: "0.01".to_string(),
            },
            address_prefix: "1".to_string(),
            delay: None,
            pool_stats: PoolStats::default(),
            payout_calls: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &CoinConfig) -> Self {
        Self {
            coin: CoinInfo {
                name: config.name.clone(),
                full_name: config.full_name.clone(),
                default_payout_threshold: config.default_payout_threshold.clone(),
            },
            address_prefix: config.address_prefix.clone(),
            delay: None,
            pool_stats: PoolStats::default(),
            payout_calls: AtomicU64::new(0),
        }
    }

    /// Delay every async reply, to exercise out-of-order completions.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_pool_stats(mut self, stats: PoolStats) -> Self {
        self.pool_stats = stats;
        self
    }

    pub fn with_address_prefix(mut self, prefix: &str) -> Self {
        self.address_prefix = prefix.to_string();
        self
    }

    pub fn into_arc(self) -> Arc<dyn Backend> {
        Arc::new(self)
    }

    pub fn payout_calls(&self) -> u64 {
        self.payout_calls.load(Ordering::SeqCst)
    }

    async fn simulate_latency(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn coin(&self) -> &CoinInfo {
        &self.coin
    }

    fn validate_address(&self, address: &str) -> bool {
        address.len() >= 8
            && address.starts_with(&self.address_prefix)
            && address.chars().all(|c| c.is_ascii_alphanumeric())
    }

    async fn query_pool_stats(&self) -> PoolStats {
        self.simulate_latency().await;
        self.pool_stats.clone()
    }

    async fn query_user_stats(&self, _login: &str) -> UserStats {
        self.simulate_latency().await;
        UserStats::default()
    }

    async fn query_user_balance(&self, _login: &str) -> UserBalance {
        self.simulate_latency().await;
        UserBalance {
            balance: "0.0".to_string(),
            requested: "0.0".to_string(),
            paid: "0.0".to_string(),
        }
    }

    async fn query_found_blocks(&self, count: usize) -> Vec<FoundBlock> {
        self.simulate_latency().await;
        (0..count.min(3) as u64)
            .map(|i| FoundBlock {
                height: 800_000 + i,
                hash: format!("{:064x}", i + 1),
                time: chrono::Utc::now().timestamp(),
                generated_coins: "6.25".to_string(),
            })
            .collect()
    }

    async fn query_payouts(&self, _login: &str, count: usize) -> Vec<PayoutRecord> {
        self.simulate_latency().await;
        (0..count.min(3) as u64)
            .map(|i| PayoutRecord {
                time: chrono::Utc::now().timestamp(),
                tx_id: format!("{:064x}", i + 1),
                value: "0.1".to_string(),
            })
            .collect()
    }

    async fn manual_payout(&self, _login: &str) -> String {
        self.simulate_latency().await;
        self.payout_calls.fetch_add(1, Ordering::SeqCst);
        "ok".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn login_and_session_round_trip() {
        let manager = MockUserManager::new();
        manager.add_user("alice", "secret", "alice@pool.test");

        let session = manager
            .login(Credentials {
                login: "alice".to_string(),
                password: "secret".to_string(),
                totp: None,
            })
            .await
            .unwrap();

        assert_eq!(
            manager.validate_session(&session, None, false).await,
            Some("alice".to_string())
        );
        assert_eq!(manager.logout(&session).await, "ok");
        assert_eq!(manager.validate_session(&session, None, false).await, None);
    }

    #[tokio::test]
    async fn admin_session_may_target_other_logins() {
        let manager = MockUserManager::new();
        manager.add_user("alice", "secret", "alice@pool.test");

        let admin_session = manager
            .login(Credentials {
                login: "admin".to_string(),
                password: "admin".to_string(),
                totp: None,
            })
            .await
            .unwrap();

        assert_eq!(
            manager
                .validate_session(&admin_session, Some("alice"), true)
                .await,
            Some("alice".to_string())
        );

        let alice_session = manager
            .login(Credentials {
                login: "alice".to_string(),
                password: "secret".to_string(),
                totp: None,
            })
            .await
            .unwrap();

        assert_eq!(
            manager
                .validate_session(&alice_session, Some("admin"), false)
                .await,
            None
        );
    }

    #[test]
    fn address_validation_uses_prefix() {
        let backend = MockBackend::new("BTC");
        assert!(backend.validate_address("1BvBMSEYst"));
        assert!(!backend.validate_address("3BvBMSEYst"));
        assert!(!backend.validate_address("1short"));
        assert!(!backend.validate_address("1BvBMSEY!t"));
    }
}
