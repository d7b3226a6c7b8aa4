//! Post-authentication hook seam
//!
//! Collaborator interface invoked once an account has authenticated, e.g. to
//! open a per-connection session on the application side. Hooks live outside
//! the relay core; a failing hook is logged and ignored so it can never
//! affect relay behavior.

use std::sync::Arc;

use futures::future::BoxFuture;
use log::warn;

use crate::common::Result;

/// Account information handed to hooks after authentication.
#[derive(Debug, Clone)]
pub struct AccountSummary {
    /// Authenticated account name.
    pub name: String,
    /// Whether the account is an anonymous login.
    pub is_anonymous: bool,
}

/// Hook invoked after an account has been authorized.
pub trait AuthorizationHook: Send + Sync {
    fn account_authorized(&self, account: AccountSummary) -> BoxFuture<'_, Result<()>>;
}

/// Invoke every hook with the account, swallowing individual failures.
pub async fn notify_authorized(hooks: &[Arc<dyn AuthorizationHook>], account: &AccountSummary) {
    for hook in hooks {
        if let Err(e) = hook.account_authorized(account.clone()).await {
            warn!("authorization hook failed (ignored): {}", e);
        }
    }
}
