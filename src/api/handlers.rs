//! One handler per API route.
//!
//! Every handler parses its body, resolves authorization, awaits whatever
//! collaborator calls it needs, and only then builds the JSON payload in one
//! synchronous pass. Request-format, authorization and validation failures
//! are answered in-band with a status payload and never propagate.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::api::{status_payload, ApiStatus};
use crate::backend::{fanout, FoundBlock, PayoutRecord, PoolStats, UserBalance, UserStats};
use crate::manager::Manager;
use crate::protocol::json::JsonStream;
use crate::users::{Credentials, NewUser, UserRecord, UserSettings};

fn default_count() -> usize {
    20
}

fn default_sort_column() -> String {
    "login".to_string()
}

const SORT_COLUMNS: &[&str] = &["login", "registrationDate", "lastShareTime", "workers"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionRequest {
    id: String,
    #[serde(default)]
    target_login: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateRequest {
    #[serde(default)]
    id: Option<String>,
    #[serde(flatten)]
    user: NewUser,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActionRequest {
    action_id: String,
    #[serde(default)]
    new_password: Option<String>,
    #[serde(default)]
    totp: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginOnlyRequest {
    login: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangeEmailRequest {
    id: String,
    #[serde(default)]
    target_login: Option<String>,
    new_email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordRequest {
    id: String,
    #[serde(default)]
    target_login: Option<String>,
    new_password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateCredentialsRequest {
    id: String,
    #[serde(default)]
    target_login: Option<String>,
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateSettingsRequest {
    id: String,
    #[serde(default)]
    target_login: Option<String>,
    #[serde(flatten)]
    settings: UserSettings,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnumerateRequest {
    id: String,
    #[serde(default = "default_sort_column")]
    sort_by: String,
}

#[derive(Debug, Deserialize)]
struct CoinQueryRequest {
    #[serde(default)]
    coin: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionCoinRequest {
    id: String,
    #[serde(default)]
    target_login: Option<String>,
    #[serde(default)]
    coin: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManualPayoutRequest {
    id: String,
    #[serde(default)]
    target_login: Option<String>,
    coin: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FoundBlocksRequest {
    coin: String,
    #[serde(default = "default_count")]
    count: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PayoutsRequest {
    id: String,
    #[serde(default)]
    target_login: Option<String>,
    coin: String,
    #[serde(default = "default_count")]
    count: usize,
}

/// Parse a request body. JSON syntax errors and schema mismatches map to
/// distinct statuses; an empty body reads as the empty object.
fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiStatus> {
    let raw: &[u8] = if body.is_empty() { b"{}" } else { body };
    let value: serde_json::Value =
        serde_json::from_slice(raw).map_err(|_| ApiStatus::InvalidJson)?;
    serde_json::from_value(value).map_err(|_| ApiStatus::JsonFormatError)
}

/// Resolve a session or fail with `unknown_id`, never revealing whether the
/// session exists.
async fn resolve_session(
    manager: &Manager,
    session_id: &str,
    target_login: Option<&str>,
    require_write: bool,
) -> Result<String, ApiStatus> {
    manager
        .users()
        .validate_session(session_id, target_login, require_write)
        .await
        .ok_or(ApiStatus::UnknownId)
}

macro_rules! try_status {
    ($expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(status) => return status_payload(&status),
        }
    };
}

pub async fn user_login(manager: &Manager, body: &[u8]) -> Vec<u8> {
    let credentials: Credentials = try_status!(parse_body(body));

    match manager.users().login(credentials).await {
        Ok(session_id) => {
            let mut json = JsonStream::new();
            json.begin_object();
            json.field_str("status", ApiStatus::Ok.as_str());
            json.field_str("sessionid", &session_id);
            json.end_object();
            json.finish()
        }
        Err(status) => status_payload(&ApiStatus::passthrough(status)),
    }
}

pub async fn user_logout(manager: &Manager, body: &[u8]) -> Vec<u8> {
    let request: SessionRequest = try_status!(parse_body(body));
    let status = manager.users().logout(&request.id).await;
    status_payload(&ApiStatus::passthrough(status))
}

pub async fn user_create(manager: &Manager, body: &[u8]) -> Vec<u8> {
    let request: CreateRequest = try_status!(parse_body(body));

    // Self-registration needs no session; creating another account does.
    if let Some(id) = &request.id {
        try_status!(resolve_session(manager, id, Some(&request.user.login), true).await);
    }

    let status = manager.users().create(request.user).await;
    status_payload(&ApiStatus::passthrough(status))
}

pub async fn user_action(manager: &Manager, body: &[u8]) -> Vec<u8> {
    let request: ActionRequest = try_status!(parse_body(body));
    let status = manager
        .users()
        .action(
            &request.action_id,
            request.new_password.as_deref(),
            request.totp.as_deref(),
        )
        .await;
    status_payload(&ApiStatus::passthrough(status))
}

pub async fn user_resend_email(manager: &Manager, body: &[u8]) -> Vec<u8> {
    let request: LoginOnlyRequest = try_status!(parse_body(body));
    let status = manager.users().resend_email(&request.login).await;
    status_payload(&ApiStatus::passthrough(status))
}

pub async fn user_change_email(manager: &Manager, body: &[u8]) -> Vec<u8> {
    let request: ChangeEmailRequest = try_status!(parse_body(body));
    let login = try_status!(
        resolve_session(manager, &request.id, request.target_login.as_deref(), true).await
    );
    let status = manager.users().change_email(&login, &request.new_email).await;
    status_payload(&ApiStatus::passthrough(status))
}

pub async fn user_change_password(manager: &Manager, body: &[u8]) -> Vec<u8> {
    let request: ChangePasswordRequest = try_status!(parse_body(body));
    let login = try_status!(
        resolve_session(manager, &request.id, request.target_login.as_deref(), true).await
    );
    let status = manager
        .users()
        .change_password(&login, &request.new_password)
        .await;
    status_payload(&ApiStatus::passthrough(status))
}

pub async fn user_change_password_initiate(manager: &Manager, body: &[u8]) -> Vec<u8> {
    let request: LoginOnlyRequest = try_status!(parse_body(body));
    let status = manager
        .users()
        .change_password_initiate(&request.login)
        .await;
    status_payload(&ApiStatus::passthrough(status))
}

pub async fn user_recovery_password(manager: &Manager, body: &[u8]) -> Vec<u8> {
    let request: LoginOnlyRequest = try_status!(parse_body(body));
    let status = manager.users().recovery_password(&request.login).await;
    status_payload(&ApiStatus::passthrough(status))
}

pub async fn user_get_credentials(manager: &Manager, body: &[u8]) -> Vec<u8> {
    let request: SessionRequest = try_status!(parse_body(body));
    let login = try_status!(
        resolve_session(manager, &request.id, request.target_login.as_deref(), false).await
    );

    let Some(credentials) = manager.users().get_credentials(&login).await else {
        return status_payload(&ApiStatus::UnknownId);
    };

    let mut json = JsonStream::new();
    json.begin_object();
    json.field_str("status", ApiStatus::Ok.as_str());
    json.field_str("login", &credentials.login);
    json.field_str("name", &credentials.name);
    json.field_str("email", &credentials.email);
    json.field_i64("registrationDate", credentials.registration_date);
    json.end_object();
    json.finish()
}

pub async fn user_get_settings(manager: &Manager, body: &[u8]) -> Vec<u8> {
    let request: SessionRequest = try_status!(parse_body(body));
    let login = try_status!(
        resolve_session(manager, &request.id, request.target_login.as_deref(), false).await
    );

    let settings = manager.users().get_settings(&login).await;

    let mut json = JsonStream::new();
    json.begin_object();
    json.field_str("status", ApiStatus::Ok.as_str());
    json.begin_array_field("coins");
    for entry in &settings {
        json.begin_object();
        json.field_str("name", &entry.coin);
        match &entry.address {
            Some(address) => json.field_str("address", address),
            None => json.field_null("address"),
        }
        json.field_str("payoutThreshold", &entry.payout_threshold);
        json.field_bool("autoPayoutEnabled", entry.auto_payout_enabled);
        json.end_object();
    }
    json.end_array();
    json.end_object();
    json.finish()
}

pub async fn user_update_credentials(manager: &Manager, body: &[u8]) -> Vec<u8> {
    let request: UpdateCredentialsRequest = try_status!(parse_body(body));
    let login = try_status!(
        resolve_session(manager, &request.id, request.target_login.as_deref(), true).await
    );
    let status = manager.users().update_credentials(&login, &request.name).await;
    status_payload(&ApiStatus::passthrough(status))
}

pub async fn user_update_settings(manager: &Manager, body: &[u8]) -> Vec<u8> {
    let request: UpdateSettingsRequest = try_status!(parse_body(body));
    let login = try_status!(
        resolve_session(manager, &request.id, request.target_login.as_deref(), true).await
    );

    let Some(backend) = manager.backends().get(&request.settings.coin) else {
        return status_payload(&ApiStatus::InvalidCoin);
    };

    if let Some(address) = &request.settings.address {
        if !backend.validate_address(address) {
            return status_payload(&ApiStatus::InvalidAddress);
        }
    }

    let status = manager
        .users()
        .update_settings(&login, request.settings)
        .await;
    status_payload(&ApiStatus::passthrough(status))
}

pub async fn user_enumerate_all(manager: &Manager, body: &[u8]) -> Vec<u8> {
    let request: EnumerateRequest = try_status!(parse_body(body));
    try_status!(resolve_session(manager, &request.id, None, false).await);

    if !SORT_COLUMNS.contains(&request.sort_by.as_str()) {
        return status_payload(&ApiStatus::UnknownColumnName);
    }

    let mut users = manager.users().enumerate_all().await;
    sort_users(&mut users, &request.sort_by);

    let mut json = JsonStream::new();
    json.begin_object();
    json.field_str("status", ApiStatus::Ok.as_str());
    json.begin_array_field("users");
    for user in &users {
        json.begin_object();
        json.field_str("login", &user.login);
        json.field_str("email", &user.email);
        json.field_i64("registrationDate", user.registration_date);
        json.field_u64("workers", user.workers);
        json.field_i64("lastShareTime", user.last_share_time);
        json.end_object();
    }
    json.end_array();
    json.end_object();
    json.finish()
}

fn sort_users(users: &mut [UserRecord], column: &str) {
    match column {
        "registrationDate" => users.sort_by_key(|u| u.registration_date),
        "lastShareTime" => users.sort_by_key(|u| u.last_share_time),
        "workers" => users.sort_by_key(|u| u.workers),
        _ => users.sort_by(|a, b| a.login.cmp(&b.login)),
    }
}

pub async fn user_activate_2fa_initiate(manager: &Manager, body: &[u8]) -> Vec<u8> {
    let request: SessionRequest = try_status!(parse_body(body));
    let login = try_status!(
        resolve_session(manager, &request.id, request.target_login.as_deref(), true).await
    );
    let status = manager.users().activate_2fa_initiate(&login).await;
    status_payload(&ApiStatus::passthrough(status))
}

pub async fn user_deactivate_2fa_initiate(manager: &Manager, body: &[u8]) -> Vec<u8> {
    let request: SessionRequest = try_status!(parse_body(body));
    let login = try_status!(
        resolve_session(manager, &request.id, request.target_login.as_deref(), true).await
    );
    let status = manager.users().deactivate_2fa_initiate(&login).await;
    status_payload(&ApiStatus::passthrough(status))
}

pub async fn backend_manual_payout(manager: &Manager, body: &[u8]) -> Vec<u8> {
    let request: ManualPayoutRequest = try_status!(parse_body(body));
    let login = try_status!(
        resolve_session(manager, &request.id, request.target_login.as_deref(), true).await
    );

    let Some(backend) = manager.backends().get(&request.coin) else {
        return status_payload(&ApiStatus::InvalidCoin);
    };

    let status = backend.manual_payout(&login).await;
    status_payload(&ApiStatus::passthrough(status))
}

pub async fn backend_query_user_balance(manager: &Manager, body: &[u8]) -> Vec<u8> {
    let request: SessionCoinRequest = try_status!(parse_body(body));
    let login = try_status!(
        resolve_session(manager, &request.id, request.target_login.as_deref(), false).await
    );

    let balances: Vec<(String, UserBalance)> = match &request.coin {
        Some(coin) => {
            let Some(backend) = manager.backends().get(coin) else {
                return status_payload(&ApiStatus::InvalidCoin);
            };
            vec![(coin.clone(), backend.query_user_balance(&login).await)]
        }
        None => {
            fanout::query_all(manager.backends().all(), |backend| {
                let login = login.clone();
                async move {
                    let balance = backend.query_user_balance(&login).await;
                    (backend.coin().name.clone(), balance)
                }
            })
            .await
        }
    };

    let mut json = JsonStream::new();
    json.begin_object();
    json.field_str("status", ApiStatus::Ok.as_str());
    json.begin_array_field("balances");
    for (coin, balance) in &balances {
        json.begin_object();
        json.field_str("coin", coin);
        json.field_str("balance", &balance.balance);
        json.field_str("requested", &balance.requested);
        json.field_str("paid", &balance.paid);
        json.end_object();
    }
    json.end_array();
    json.end_object();
    json.finish()
}

pub async fn backend_query_user_stats(manager: &Manager, body: &[u8]) -> Vec<u8> {
    let request: SessionCoinRequest = try_status!(parse_body(body));
    let login = try_status!(
        resolve_session(manager, &request.id, request.target_login.as_deref(), false).await
    );

    let stats: Vec<(String, UserStats)> = match &request.coin {
        Some(coin) => {
            let Some(backend) = manager.backends().get(coin) else {
                return status_payload(&ApiStatus::InvalidCoin);
            };
            vec![(coin.clone(), backend.query_user_stats(&login).await)]
        }
        None => {
            fanout::query_all(manager.backends().all(), |backend| {
                let login = login.clone();
                async move {
                    let stats = backend.query_user_stats(&login).await;
                    (backend.coin().name.clone(), stats)
                }
            })
            .await
        }
    };

    let mut json = JsonStream::new();
    json.begin_object();
    json.field_str("status", ApiStatus::Ok.as_str());
    json.begin_array_field("stats");
    for (coin, entry) in &stats {
        json.begin_object();
        json.field_str("coin", coin);
        json.field_u64("workers", entry.workers);
        json.field_u64("hashRate", entry.hash_rate);
        json.field_f64("sharesPerSecond", entry.shares_per_second);
        json.field_i64("lastShareTime", entry.last_share_time);
        json.end_object();
    }
    json.end_array();
    json.end_object();
    json.finish()
}

pub async fn backend_query_pool_stats(manager: &Manager, body: &[u8]) -> Vec<u8> {
    let request: CoinQueryRequest = try_status!(parse_body(body));

    let stats: Vec<(String, PoolStats)> = match &request.coin {
        Some(coin) => {
            let Some(backend) = manager.backends().get(coin) else {
                return status_payload(&ApiStatus::InvalidCoin);
            };
            vec![(coin.clone(), backend.query_pool_stats().await)]
        }
        None => {
            fanout::query_all(manager.backends().all(), |backend| async move {
                let stats = backend.query_pool_stats().await;
                (backend.coin().name.clone(), stats)
            })
            .await
        }
    };

    let mut json = JsonStream::new();
    json.begin_object();
    json.field_str("status", ApiStatus::Ok.as_str());
    json.begin_array_field("stats");
    for (coin, entry) in &stats {
        json.begin_object();
        json.field_str("coin", coin);
        json.field_u64("clients", entry.clients);
        json.field_u64("workers", entry.workers);
        json.field_u64("hashRate", entry.hash_rate);
        json.field_f64("sharesPerSecond", entry.shares_per_second);
        json.field_i64("lastShareTime", entry.last_share_time);
        json.end_object();
    }
    json.end_array();
    json.end_object();
    json.finish()
}

pub async fn backend_query_found_blocks(manager: &Manager, body: &[u8]) -> Vec<u8> {
    let request: FoundBlocksRequest = try_status!(parse_body(body));

    let Some(backend) = manager.backends().get(&request.coin) else {
        return status_payload(&ApiStatus::InvalidCoin);
    };

    let blocks: Vec<FoundBlock> = backend.query_found_blocks(request.count).await;

    let mut json = JsonStream::new();
    json.begin_object();
    json.field_str("status", ApiStatus::Ok.as_str());
    json.begin_array_field("blocks");
    for block in &blocks {
        json.begin_object();
        json.field_u64("height", block.height);
        json.field_str("hash", &block.hash);
        json.field_i64("time", block.time);
        json.field_str("generatedCoins", &block.generated_coins);
        json.end_object();
    }
    json.end_array();
    json.end_object();
    json.finish()
}

pub async fn backend_query_payouts(manager: &Manager, body: &[u8]) -> Vec<u8> {
    let request: PayoutsRequest = try_status!(parse_body(body));
    let login = try_status!(
        resolve_session(manager, &request.id, request.target_login.as_deref(), false).await
    );

    let Some(backend) = manager.backends().get(&request.coin) else {
        return status_payload(&ApiStatus::InvalidCoin);
    };

    let payouts: Vec<PayoutRecord> = backend.query_payouts(&login, request.count).await;

    let mut json = JsonStream::new();
    json.begin_object();
    json.field_str("status", ApiStatus::Ok.as_str());
    json.begin_array_field("payouts");
    for payout in &payouts {
        json.begin_object();
        json.field_i64("time", payout.time);
        json.field_str("txid", &payout.tx_id);
        json.field_str("value", &payout.value);
        json.end_object();
    }
    json.end_array();
    json.end_object();
    json.finish()
}

pub async fn instance_enumerate_all(manager: &Manager, _body: &[u8]) -> Vec<u8> {
    let instances = &manager.config().instances;

    let mut json = JsonStream::new();
    json.begin_object();
    json.field_str("status", ApiStatus::Ok.as_str());
    json.begin_array_field("instances");
    for instance in instances {
        json.begin_object();
        json.field_str("name", &instance.name);
        json.field_str("type", &instance.kind);
        json.field_str("protocol", &instance.protocol);
        json.begin_array_field("backends");
        for coin in &instance.backends {
            json.item_str(coin);
        }
        json.end_array();
        json.end_object();
    }
    json.end_array();
    json.end_object();
    json.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockBackend, MockUserManager};
    use crate::Config;
    use std::sync::Arc;

    fn manager() -> Manager {
        let users = MockUserManager::new();
        users.add_user("alice", "secret", "alice@pool.test");
        Manager::new(
            Arc::new(Config::default()),
            Arc::new(users),
            vec![
                MockBackend::new("BTC").into_arc(),
                MockBackend::new("LTC").into_arc(),
            ],
        )
    }

    fn parse(payload: Vec<u8>) -> serde_json::Value {
        serde_json::from_slice(&payload).expect("handler emitted valid JSON")
    }

    #[tokio::test]
    async fn login_returns_session_id() {
        let manager = manager();
        let payload = user_login(
            &manager,
            br#"{"login":"alice","password":"secret"}"#,
        )
        .await;
        let value = parse(payload);
        assert_eq!(value["status"], "ok");
        assert!(!value["sessionid"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn login_syntax_error_is_invalid_json() {
        let manager = manager();
        let payload = user_login(&manager, b"{not json").await;
        assert_eq!(parse(payload)["status"], "invalid_json");
    }

    #[tokio::test]
    async fn login_missing_field_is_json_format_error() {
        let manager = manager();
        let payload = user_login(&manager, br#"{"login":"alice"}"#).await;
        assert_eq!(parse(payload)["status"], "json_format_error");
    }

    #[tokio::test]
    async fn mutating_route_with_unknown_session_is_unknown_id() {
        let manager = manager();
        let payload = user_update_settings(
            &manager,
            br#"{"id":"bogus","coin":"BTC","payoutThreshold":"0.1","autoPayoutEnabled":true}"#,
        )
        .await;
        assert_eq!(parse(payload)["status"], "unknown_id");
    }

    #[tokio::test]
    async fn update_settings_unknown_coin_is_invalid_coin() {
        let manager = manager();
        let session = manager
            .users()
            .login(Credentials {
                login: "alice".to_string(),
                password: "secret".to_string(),
                totp: None,
            })
            .await
            .unwrap();

        let body = format!(
            r#"{{"id":"{session}","coin":"XMR","payoutThreshold":"0.1","autoPayoutEnabled":true}}"#
        );
        let payload = user_update_settings(&manager, body.as_bytes()).await;
        assert_eq!(parse(payload)["status"], "invalid_coin");
    }

    #[tokio::test]
    async fn update_settings_bad_address_is_invalid_address() {
        let manager = manager();
        let session = manager
            .users()
            .login(Credentials {
                login: "alice".to_string(),
                password: "secret".to_string(),
                totp: None,
            })
            .await
            .unwrap();

        let body = format!(
            r#"{{"id":"{session}","coin":"BTC","address":"!!bad","payoutThreshold":"0.1","autoPayoutEnabled":true}}"#
        );
        let payload = user_update_settings(&manager, body.as_bytes()).await;
        assert_eq!(parse(payload)["status"], "invalid_address");
    }

    #[tokio::test]
    async fn enumerate_unknown_column() {
        let manager = manager();
        let session = manager
            .users()
            .login(Credentials {
                login: "alice".to_string(),
                password: "secret".to_string(),
                totp: None,
            })
            .await
            .unwrap();

        let body = format!(r#"{{"id":"{session}","sortBy":"shoeSize"}}"#);
        let payload = user_enumerate_all(&manager, body.as_bytes()).await;
        assert_eq!(parse(payload)["status"], "unknown_column_name");
    }

    #[tokio::test]
    async fn pool_stats_fans_out_in_coin_order() {
        let manager = manager();
        let payload = backend_query_pool_stats(&manager, b"{}").await;
        let value = parse(payload);
        assert_eq!(value["status"], "ok");
        let coins: Vec<_> = value["stats"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["coin"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(coins, ["BTC", "LTC"]);
    }

    #[tokio::test]
    async fn pool_stats_unknown_coin() {
        let manager = manager();
        let payload = backend_query_pool_stats(&manager, br#"{"coin":"XMR"}"#).await;
        assert_eq!(parse(payload)["status"], "invalid_coin");
    }
}
