//! Synthesis run orchestration.
//!
//! resolve environment → look up VPC (environment-aware only) → build graph →
//! wire references → order into a plan → emit outputs.
//!
//! Environment and network are fully resolved before the builder runs. Any
//! stage failure aborts the run; no partial plan is produced.

use super::builder::{self, BuildSettings};
use super::environment;
use super::error::SynthError;
use super::resolver;
use super::types::*;
use super::vpc;
use super::wiring;
use indexmap::IndexMap;
use tracing::info;

/// Inputs for one synthesis run.
pub struct SynthRequest<'a> {
    pub config: &'a StackConfig,
    /// Environment name from the invocation context
    pub env_name: Option<&'a str>,
    pub account: Option<&'a str>,
    pub region: Option<&'a str>,
    /// Overrides the config's build mode
    pub mode: Option<BuildMode>,
}

/// Everything a synthesis run produces.
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub plan: DeploymentPlan,
    pub graph: ResourceGraph,
}

impl Synthesis {
    pub fn outputs(&self) -> &IndexMap<String, String> {
        &self.plan.outputs
    }
}

/// Run the full pipeline.
pub fn synthesize(req: &SynthRequest) -> Result<Synthesis, SynthError> {
    let mode = req.mode.unwrap_or(req.config.mode);
    let env = environment::resolve(req.env_name, req.account, req.region);

    let network = if mode.requires_network() {
        Some(vpc::lookup(&env, &req.config.environments)?)
    } else {
        None
    };
    let env = match network {
        Some(ref net) => env.with_network(net),
        None => env,
    };

    let settings = BuildSettings::from_config(req.config, mode);
    let graph = builder::build(&env, network.as_ref(), &settings)?;
    let graph = wiring::wire(graph)?;
    let plan = resolver::plan(&graph, &env, mode, &req.config.name)?;

    info!(
        stack = %plan.name,
        environment = %env.name,
        mode = %mode,
        steps = plan.steps.len(),
        fingerprint = %plan.fingerprint,
        "plan synthesized"
    );
    Ok(Synthesis { plan, graph })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::builder::ids;
    use crate::core::parser;

    fn config() -> StackConfig {
        parser::parse_config(
            r#"
version: "1.0"
environments:
  prod:
    vpc-id: vpc-123
"#,
        )
        .unwrap()
    }

    fn request<'a>(config: &'a StackConfig, env: Option<&'a str>) -> SynthRequest<'a> {
        SynthRequest {
            config,
            env_name: env,
            account: None,
            region: None,
            mode: None,
        }
    }

    #[test]
    fn test_synth_environment_aware() {
        let cfg = config();
        let s = synthesize(&request(&cfg, Some("prod"))).unwrap();
        assert_eq!(s.plan.environment.vpc_id.as_deref(), Some("vpc-123"));
        assert_eq!(s.plan.mode, BuildMode::EnvironmentAware);
        let f = &s.plan.steps[s.plan.position(ids::FUNCTION).unwrap()];
        assert!(f.depends_on.contains(&ids::NETWORK.to_string()));
        assert_eq!(f.config["vpc_id"], "vpc-123");
        assert_eq!(s.outputs().len(), 3);
    }

    #[test]
    fn test_synth_missing_vpc_aborts() {
        let cfg = config();
        let err = synthesize(&request(&cfg, Some("staging"))).unwrap_err();
        assert_eq!(err, SynthError::missing("environments.staging.vpc-id"));
    }

    #[test]
    fn test_synth_default_env_requires_dev_vpc() {
        let cfg = config();
        let err = synthesize(&request(&cfg, None)).unwrap_err();
        assert_eq!(err, SynthError::missing("environments.dev.vpc-id"));
    }

    #[test]
    fn test_synth_minimal_skips_lookup() {
        let cfg = config();
        let mut req = request(&cfg, Some("staging"));
        req.mode = Some(BuildMode::Minimal);
        let s = synthesize(&req).unwrap();
        assert!(s.plan.environment.vpc_id.is_none());
        assert!(s.plan.position(ids::NETWORK).is_none());
        let f = &s.plan.steps[s.plan.position(ids::FUNCTION).unwrap()];
        assert!(!f.config.contains_key("subnet_selection"));
        assert_eq!(f.config["function_name"], "staging-AIHandler");
    }

    #[test]
    fn test_synth_fingerprint_stable_and_env_sensitive() {
        let mut cfg = config();
        cfg.mode = BuildMode::Minimal;
        let a = synthesize(&request(&cfg, Some("qa"))).unwrap();
        let b = synthesize(&request(&cfg, Some("qa"))).unwrap();
        let c = synthesize(&request(&cfg, Some("uat"))).unwrap();
        assert_eq!(a.plan.fingerprint, b.plan.fingerprint);
        assert_ne!(a.plan.fingerprint, c.plan.fingerprint);
    }

    #[test]
    fn test_synth_account_region_pass_through() {
        let cfg = config();
        let mut req = request(&cfg, Some("prod"));
        req.account = Some("123456789012");
        req.region = Some("eu-central-1");
        let s = synthesize(&req).unwrap();
        assert_eq!(s.plan.environment.account.as_deref(), Some("123456789012"));
        assert_eq!(s.plan.environment.region, "eu-central-1");
    }
}
