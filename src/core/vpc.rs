//! VPC lookup from the per-environment context table.

use super::error::SynthError;
use super::types::{ContextTable, Environment, NetworkRef};
use tracing::info;

/// Config path of the vpc id for an environment.
pub fn vpc_id_path(env_name: &str) -> String {
    format!("environments.{}.vpc-id", env_name)
}

/// Resolve the VPC an environment's function joins.
///
/// Fails when the environment has no `vpc-id` or a blank one.
pub fn lookup(env: &Environment, context: &ContextTable) -> Result<NetworkRef, SynthError> {
    let vpc_id = context
        .get(&env.name)
        .and_then(|ctx| ctx.vpc_id.as_deref())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| SynthError::missing(vpc_id_path(&env.name)))?;

    info!(vpc_id, environment = %env.name, "using VPC {} for environment {}", vpc_id, env.name);
    Ok(NetworkRef::new(vpc_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::environment;
    use crate::core::types::EnvironmentContext;
    use proptest::prelude::*;

    fn table(entries: &[(&str, Option<&str>)]) -> ContextTable {
        entries
            .iter()
            .map(|(name, vpc)| {
                (
                    name.to_string(),
                    EnvironmentContext {
                        vpc_id: vpc.map(str::to_string),
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_lookup_present() {
        let ctx = table(&[("prod", Some("vpc-123"))]);
        let env = environment::resolve(Some("prod"), None, None);
        assert_eq!(lookup(&env, &ctx).unwrap(), NetworkRef::new("vpc-123"));
    }

    #[test]
    fn test_lookup_absent_env() {
        let ctx = table(&[("prod", Some("vpc-123"))]);
        let env = environment::resolve(Some("staging"), None, None);
        let err = lookup(&env, &ctx).unwrap_err();
        assert_eq!(
            err,
            SynthError::Configuration {
                path: "environments.staging.vpc-id".to_string()
            }
        );
    }

    #[test]
    fn test_lookup_empty_vpc_id() {
        let ctx = table(&[("qa", Some(""))]);
        let env = environment::resolve(Some("qa"), None, None);
        assert!(lookup(&env, &ctx)
            .unwrap_err()
            .to_string()
            .contains("environments.qa.vpc-id"));
    }

    #[test]
    fn test_lookup_missing_key() {
        let ctx = table(&[("qa", None)]);
        let env = environment::resolve(Some("qa"), None, None);
        assert!(matches!(
            lookup(&env, &ctx),
            Err(SynthError::Configuration { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_lookup_returns_configured_id(
            name in "[a-z][a-z0-9-]{0,15}",
            vpc in "vpc-[0-9a-f]{3,17}",
        ) {
            let ctx = table(&[(name.as_str(), Some(vpc.as_str()))]);
            let env = environment::resolve(Some(&name), None, None);
            prop_assert_eq!(lookup(&env, &ctx).unwrap().vpc_id, vpc);
        }

        #[test]
        fn prop_lookup_unknown_env_names_path(name in "[a-z][a-z0-9-]{0,15}") {
            let ctx = table(&[("zz-configured", Some("vpc-1"))]);
            prop_assume!(name != "zz-configured");
            let env = environment::resolve(Some(&name), None, None);
            let err = lookup(&env, &ctx).unwrap_err();
            prop_assert_eq!(err, SynthError::missing(vpc_id_path(&name)));
        }
    }
}
