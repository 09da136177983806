//! Route handlers and the API status vocabulary.

pub mod handlers;

use crate::manager::Manager;
use crate::protocol::json::JsonStream;
use crate::protocol::routes::RouteId;

/// Status strings carried in every JSON response.
///
/// `Other` passes collaborator-reported statuses through verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiStatus {
    Ok,
    JsonFormatError,
    InvalidJson,
    UnknownId,
    InvalidCoin,
    InvalidAddress,
    RequestFormatError,
    UnknownColumnName,
    Other(String),
}

impl ApiStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Ok => "ok",
            Self::JsonFormatError => "json_format_error",
            Self::InvalidJson => "invalid_json",
            Self::UnknownId => "unknown_id",
            Self::InvalidCoin => "invalid_coin",
            Self::InvalidAddress => "invalid_address",
            Self::RequestFormatError => "request_format_error",
            Self::UnknownColumnName => "unknown_column_name",
            Self::Other(status) => status,
        }
    }

    /// Wrap a collaborator-reported status.
    pub fn passthrough(status: String) -> Self {
        if status == "ok" {
            Self::Ok
        } else {
            Self::Other(status)
        }
    }
}

impl std::fmt::Display for ApiStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The minimal `{"status": ...}` payload.
pub fn status_payload(status: &ApiStatus) -> Vec<u8> {
    let mut json = JsonStream::new();
    json.begin_object();
    json.field_str("status", status.as_str());
    json.end_object();
    json.finish()
}

/// Invoke the handler bound to `route` and return the JSON payload.
///
/// Handlers recover every request-format, authorization and validation
/// condition into a status payload; dispatch itself cannot fail.
pub async fn dispatch(manager: &Manager, route: RouteId, body: &[u8]) -> Vec<u8> {
    match route {
        RouteId::UserAction => handlers::user_action(manager, body).await,
        RouteId::UserCreate => handlers::user_create(manager, body).await,
        RouteId::UserResendEmail => handlers::user_resend_email(manager, body).await,
        RouteId::UserLogin => handlers::user_login(manager, body).await,
        RouteId::UserLogout => handlers::user_logout(manager, body).await,
        RouteId::UserChangeEmail => handlers::user_change_email(manager, body).await,
        RouteId::UserChangePassword => handlers::user_change_password(manager, body).await,
        RouteId::UserChangePasswordInitiate => {
            handlers::user_change_password_initiate(manager, body).await
        }
        RouteId::UserRecoveryPassword => handlers::user_recovery_password(manager, body).await,
        RouteId::UserGetCredentials => handlers::user_get_credentials(manager, body).await,
        RouteId::UserGetSettings => handlers::user_get_settings(manager, body).await,
        RouteId::UserUpdateCredentials => handlers::user_update_credentials(manager, body).await,
        RouteId::UserUpdateSettings => handlers::user_update_settings(manager, body).await,
        RouteId::UserEnumerateAll => handlers::user_enumerate_all(manager, body).await,
        RouteId::UserActivate2faInitiate => {
            handlers::user_activate_2fa_initiate(manager, body).await
        }
        RouteId::UserDeactivate2faInitiate => {
            handlers::user_deactivate_2fa_initiate(manager, body).await
        }
        RouteId::BackendManualPayout => handlers::backend_manual_payout(manager, body).await,
        RouteId::BackendQueryUserBalance => {
            handlers::backend_query_user_balance(manager, body).await
        }
        RouteId::BackendQueryUserStats => handlers::backend_query_user_stats(manager, body).await,
        RouteId::BackendQueryPoolStats => handlers::backend_query_pool_stats(manager, body).await,
        RouteId::BackendQueryFoundBlocks => {
            handlers::backend_query_found_blocks(manager, body).await
        }
        RouteId::BackendQueryPayouts => handlers::backend_query_payouts(manager, body).await,
        RouteId::InstanceEnumerateAll => handlers::instance_enumerate_all(manager, body).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings() {
        assert_eq!(ApiStatus::Ok.as_str(), "ok");
        assert_eq!(ApiStatus::UnknownId.as_str(), "unknown_id");
        assert_eq!(
            ApiStatus::Other("insufficient_balance".to_string()).as_str(),
            "insufficient_balance"
        );
    }

    #[test]
    fn passthrough_folds_ok() {
        assert_eq!(ApiStatus::passthrough("ok".to_string()), ApiStatus::Ok);
        assert_eq!(
            ApiStatus::passthrough("duplicate_login".to_string()),
            ApiStatus::Other("duplicate_login".to_string())
        );
    }

    #[test]
    fn status_payload_shape() {
        let payload = status_payload(&ApiStatus::InvalidCoin);
        assert_eq!(payload, br#"{"status":"invalid_coin"}"#);
    }
}
