//! Environment identity resolution.
//!
//! Never fails: absent or empty inputs fall back to documented defaults.

use super::types::{Environment, DEFAULT_ENV_NAME, DEFAULT_REGION};

/// Variable the account id is read from.
pub const ACCOUNT_VAR: &str = "CDK_DEFAULT_ACCOUNT";

/// Variable the region is read from.
pub const REGION_VAR: &str = "CDK_DEFAULT_REGION";

/// Resolve a normalized environment from raw inputs.
pub fn resolve(
    context_env_name: Option<&str>,
    account: Option<&str>,
    region: Option<&str>,
) -> Environment {
    Environment {
        name: non_empty(context_env_name)
            .unwrap_or(DEFAULT_ENV_NAME)
            .to_string(),
        account: non_empty(account).map(str::to_string),
        region: non_empty(region).unwrap_or(DEFAULT_REGION).to_string(),
        vpc_id: None,
    }
}

/// Resolve with account and region taken from the process environment.
pub fn resolve_from_process(context_env_name: Option<&str>) -> Environment {
    resolve_from_vars(context_env_name, |key| std::env::var(key).ok())
}

/// Resolve with account and region read through `var`.
pub fn resolve_from_vars<F>(context_env_name: Option<&str>, var: F) -> Environment
where
    F: Fn(&str) -> Option<String>,
{
    let account = var(ACCOUNT_VAR);
    let region = var(REGION_VAR);
    resolve(context_env_name, account.as_deref(), region.as_deref())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
