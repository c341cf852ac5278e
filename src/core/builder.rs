//! Resource graph construction for the serverless stack.
//!
//! Nodes are declared in a fixed dependency order: function role, function,
//! API logging, API, storage, distribution, asset publishing, outputs.
//! Reference targets are always declared before their consumers, so wiring
//! never needs a forward declaration.

use super::error::SynthError;
use super::types::*;
use serde_json::json;
use tracing::info;

/// Node ids of the stack.
pub mod ids {
    pub const NETWORK: &str = "ExistingVpc";
    pub const FUNCTION_ROLE: &str = "AIFunctionRole";
    pub const FUNCTION: &str = "AIHandler";
    pub const API_LOG_ROLE: &str = "ApiGatewayCloudWatchRole";
    pub const API_ACCOUNT: &str = "ApiGatewayAccount";
    pub const ACCESS_LOGS: &str = "ApiGatewayAccessLogs";
    pub const API: &str = "AIAPI";
    pub const EDGE_IDENTITY: &str = "WebsiteOAI";
    pub const WEBSITE_BUCKET: &str = "awsAiWebsiteBucket";
    pub const LOG_BUCKET: &str = "AWSAiLogBucket";
    pub const DISTRIBUTION: &str = "Distribution";
    pub const DEPLOY_ROLE: &str = "BucketDeploymentRole";
    pub const ASSET_DEPLOYMENT: &str = "awsAiDeploymentBucket";
    pub const OUTPUT_BUCKET_NAME: &str = "BucketName";
    pub const OUTPUT_DISTRIBUTION_URL: &str = "CloudFrontURL";
    pub const OUTPUT_API_URL: &str = "ApiURL";
}

/// The three output node ids, in emission order.
pub const OUTPUT_IDS: [&str; 3] = [
    ids::OUTPUT_BUCKET_NAME,
    ids::OUTPUT_DISTRIBUTION_URL,
    ids::OUTPUT_API_URL,
];

const LAMBDA_PRINCIPAL: &str = "lambda.amazonaws.com";
const API_GATEWAY_PRINCIPAL: &str = "apigateway.amazonaws.com";
const BASIC_EXECUTION_POLICY: &str = "service-role/AWSLambdaBasicExecutionRole";
const PUSH_LOGS_POLICY: &str = "service-role/AmazonAPIGatewayPushToCloudWatchLogs";

/// Everything besides the environment that shapes the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildSettings {
    pub stack_name: String,
    pub profile: RouteProfile,
    pub logging: ApiLogging,
    pub model_resources: Vec<String>,
}

impl BuildSettings {
    /// Settings derived from a stack config for the given mode.
    pub fn from_config(config: &StackConfig, mode: BuildMode) -> Self {
        Self {
            stack_name: config.name.clone(),
            profile: RouteProfile::resolve(mode, &config.profile),
            logging: config.logging.clone(),
            model_resources: config.model_resources.clone(),
        }
    }

    /// Default settings for a mode.
    pub fn for_mode(mode: BuildMode) -> Self {
        Self::from_config(&StackConfig::default(), mode)
    }
}

/// Deterministic function name for an environment.
pub fn function_name(env: &Environment) -> String {
    format!("{}-AIHandler", env.name)
}

/// Build the full resource graph.
///
/// `network` must already be resolved; the function's VPC placement is
/// declared only when it is present.
pub fn build(
    env: &Environment,
    network: Option<&NetworkRef>,
    settings: &BuildSettings,
) -> Result<ResourceGraph, SynthError> {
    let mut graph = ResourceGraph::new();

    if let Some(net) = network {
        graph.add(
            ResourceSpec::new(ids::NETWORK, ResourceKind::Network)
                .with("vpc_id", net.vpc_id.as_str())
                .with("lookup", true),
        )?;
    }

    add_function(&mut graph, env, network.is_some(), &settings.model_resources)?;
    add_api_logging(&mut graph, &settings.logging)?;
    add_api(&mut graph, &settings.profile, &settings.logging)?;
    add_storage(&mut graph, &settings.stack_name)?;
    add_distribution(&mut graph, &settings.profile)?;
    add_asset_publishing(&mut graph)?;
    add_outputs(&mut graph)?;

    info!(
        environment = %env.name,
        nodes = graph.len(),
        references = graph.references.len(),
        vpc = network.is_some(),
        "resource graph built"
    );
    Ok(graph)
}

fn add_function(
    graph: &mut ResourceGraph,
    env: &Environment,
    in_vpc: bool,
    models: &[String],
) -> Result<(), SynthError> {
    graph.add(
        ResourceSpec::new(ids::FUNCTION_ROLE, ResourceKind::Role)
            .with("assumed_by", LAMBDA_PRINCIPAL)
            .with("managed_policies", json!([BASIC_EXECUTION_POLICY]))
            .with("inline_policies", json!([model_invoke_statement(models)])),
    )?;

    let mut function = ResourceSpec::new(ids::FUNCTION, ResourceKind::Function)
        .with("function_name", function_name(env))
        .with("runtime", "python3.9")
        .with("handler", "lambdaAiHandler.lambda_handler")
        .with("code", json!({ "asset": "lambda" }))
        .with("timeout_seconds", 30)
        .with("retry_attempts", 2)
        .with("environment", json!({}))
        .after(ids::FUNCTION_ROLE);
    if in_vpc {
        function = function
            .with("subnet_selection", "private_with_egress")
            .after(ids::NETWORK);
    }
    graph.add(function)?;

    graph.reference(ids::FUNCTION, "role", ids::FUNCTION_ROLE, "arn")?;
    if in_vpc {
        graph.reference(ids::FUNCTION, "vpc_id", ids::NETWORK, "vpc_id")?;
    }
    Ok(())
}

/// Statement scoping the function role to invoking the configured models.
fn model_invoke_statement(models: &[String]) -> serde_json::Value {
    json!({
        "effect": "Allow",
        "actions": ["bedrock:InvokeModel", "bedrock:InvokeModelWithResponseStream"],
        "resources": models,
    })
}

fn add_api_logging(graph: &mut ResourceGraph, logging: &ApiLogging) -> Result<(), SynthError> {
    graph.add(
        ResourceSpec::new(ids::API_LOG_ROLE, ResourceKind::Role)
            .with("assumed_by", API_GATEWAY_PRINCIPAL)
            .with("managed_policies", json!([PUSH_LOGS_POLICY])),
    )?;
    graph.add(
        ResourceSpec::new(ids::API_ACCOUNT, ResourceKind::ApiAccount).after(ids::API_LOG_ROLE),
    )?;
    graph.reference(ids::API_ACCOUNT, "cloud_watch_role_arn", ids::API_LOG_ROLE, "arn")?;
    graph.add(
        ResourceSpec::new(ids::ACCESS_LOGS, ResourceKind::LogGroup)
            .with("retention_days", logging.access_log_retention_days),
    )
}

fn add_api(
    graph: &mut ResourceGraph,
    profile: &RouteProfile,
    logging: &ApiLogging,
) -> Result<(), SynthError> {
    graph.add(
        ResourceSpec::new(ids::API, ResourceKind::Api)
            .with("rest_api_name", ids::API)
            .with(
                "route",
                json!({ "method": "POST", "path": format!("/{}", profile.route_path) }),
            )
            .with("integration_type", "lambda_proxy")
            .with(
                "cors",
                json!({
                    "allow_origins": ["*"],
                    "allow_methods": profile.cors_allow_methods,
                    "allow_headers": profile.cors_allow_headers,
                    "allow_credentials": profile.cors_allow_credentials,
                }),
            )
            .with(
                "deploy_options",
                json!({
                    "stage_name": profile.stage_name,
                    "logging_level": logging.logging_level,
                    "data_trace_enabled": logging.data_trace_enabled,
                    "tracing_enabled": logging.tracing_enabled,
                    "metrics_enabled": logging.metrics_enabled,
                    "access_log_format": logging.access_log_format,
                }),
            )
            .with("cloud_watch_role", true)
            .after(ids::FUNCTION)
            .after(ids::API_ACCOUNT)
            .after(ids::ACCESS_LOGS),
    )?;
    graph.reference(ids::API, "integration_function_arn", ids::FUNCTION, "arn")?;
    graph.reference(ids::API, "access_log_destination", ids::ACCESS_LOGS, "arn")
}

fn add_storage(graph: &mut ResourceGraph, stack_name: &str) -> Result<(), SynthError> {
    graph.add(
        ResourceSpec::new(ids::EDGE_IDENTITY, ResourceKind::OriginAccessIdentity)
            .with("comment", format!("OAI for {}", stack_name)),
    )?;

    graph.add(
        hardened_bucket(ids::WEBSITE_BUCKET)
            .with(
                "read_grant",
                json!({ "actions": ["s3:GetObject"], "objects": "*" }),
            )
            .after(ids::EDGE_IDENTITY),
    )?;
    graph.reference(
        ids::WEBSITE_BUCKET,
        "read_principal",
        ids::EDGE_IDENTITY,
        "canonical_user_id",
    )?;

    graph.add(hardened_bucket(ids::LOG_BUCKET).with("object_ownership", "object_writer"))
}

/// Bucket with public access blocked, encryption and TLS enforced, and
/// contents purged on teardown.
fn hardened_bucket(id: &str) -> ResourceSpec {
    ResourceSpec::new(id, ResourceKind::Bucket)
        .with("block_public_access", "block_all")
        .with("encryption", "s3_managed")
        .with("enforce_ssl", true)
        .with("removal_policy", "destroy")
        .with("auto_delete_objects", true)
}

fn add_distribution(graph: &mut ResourceGraph, profile: &RouteProfile) -> Result<(), SynthError> {
    graph.add(
        ResourceSpec::new(ids::DISTRIBUTION, ResourceKind::Distribution)
            .with(
                "default_behavior",
                json!({
                    "origin": "website_bucket",
                    "viewer_protocol_policy": "redirect_to_https",
                    "cache_policy": "caching_optimized",
                    "allowed_methods": "allow_all",
                }),
            )
            .with(
                "additional_behaviors",
                json!([{
                    "path_pattern": profile.behavior_path_pattern,
                    "origin": "api",
                    "allowed_methods": "allow_all",
                    "cache_policy": "caching_disabled",
                    "origin_request_policy": "all_viewer",
                    "viewer_protocol_policy": "allow_all",
                    "response_headers_policy": "cors_allow_all_origins",
                }]),
            )
            .with("api_origin_path", format!("/{}", profile.stage_name))
            .with("removal_policy", "destroy")
            .after(ids::WEBSITE_BUCKET)
            .after(ids::EDGE_IDENTITY)
            .after(ids::API),
    )?;
    graph.reference(
        ids::DISTRIBUTION,
        "bucket_origin_domain",
        ids::WEBSITE_BUCKET,
        "regional_domain_name",
    )?;
    graph.reference(
        ids::DISTRIBUTION,
        "origin_access_identity",
        ids::EDGE_IDENTITY,
        "id",
    )?;
    graph.reference(ids::DISTRIBUTION, "api_origin_domain", ids::API, "domain_name")
}

fn add_asset_publishing(graph: &mut ResourceGraph) -> Result<(), SynthError> {
    let distribution_arn = graph
        .get(ids::DISTRIBUTION)
        .and_then(|d| d.export("arn"))
        .ok_or_else(|| SynthError::DanglingReference {
            from: ids::DEPLOY_ROLE.to_string(),
            attribute: "inline_policies".to_string(),
            to: ids::DISTRIBUTION.to_string(),
        })?;
    graph.add(
        ResourceSpec::new(ids::DEPLOY_ROLE, ResourceKind::Role)
            .with("assumed_by", LAMBDA_PRINCIPAL)
            .with("managed_policies", json!([BASIC_EXECUTION_POLICY]))
            .with(
                "inline_policies",
                json!([{
                    "name": "CloudFrontInvalidation",
                    "effect": "Allow",
                    "actions": ["cloudfront:GetInvalidation", "cloudfront:CreateInvalidation"],
                    "resources": [distribution_arn],
                }]),
            )
            .after(ids::DISTRIBUTION),
    )?;

    graph.add(
        ResourceSpec::new(ids::ASSET_DEPLOYMENT, ResourceKind::AssetDeployment)
            .with("sources", json!(["./website"]))
            .with("distribution_paths", json!(["/*"]))
            .with("prune", false)
            .with("memory_limit_mb", 1024)
            .after(ids::WEBSITE_BUCKET)
            .after(ids::DISTRIBUTION)
            .after(ids::DEPLOY_ROLE),
    )?;
    graph.reference(
        ids::ASSET_DEPLOYMENT,
        "destination_bucket",
        ids::WEBSITE_BUCKET,
        "bucket_name",
    )?;
    graph.reference(ids::ASSET_DEPLOYMENT, "distribution_id", ids::DISTRIBUTION, "id")?;
    graph.reference(ids::ASSET_DEPLOYMENT, "role", ids::DEPLOY_ROLE, "arn")
}

fn add_outputs(graph: &mut ResourceGraph) -> Result<(), SynthError> {
    graph.add(
        ResourceSpec::new(ids::OUTPUT_BUCKET_NAME, ResourceKind::Output)
            .with("description", "Website bucket name"),
    )?;
    graph.reference(ids::OUTPUT_BUCKET_NAME, "value", ids::WEBSITE_BUCKET, "bucket_name")?;

    graph.add(
        ResourceSpec::new(ids::OUTPUT_DISTRIBUTION_URL, ResourceKind::Output)
            .with("description", "Distribution address"),
    )?;
    graph.reference_with(
        ids::OUTPUT_DISTRIBUTION_URL,
        "value",
        ids::DISTRIBUTION,
        "domain_name",
        "https://{{value}}",
    )?;

    graph.add(
        ResourceSpec::new(ids::OUTPUT_API_URL, ResourceKind::Output)
            .with("description", "API address"),
    )?;
    graph.reference(ids::OUTPUT_API_URL, "value", ids::API, "url")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::environment;
    use std::collections::HashSet;

    fn env(name: &str) -> Environment {
        environment::resolve(Some(name), None, None)
    }

    fn build_aware(name: &str) -> ResourceGraph {
        let net = NetworkRef::new("vpc-123");
        let e = env(name).with_network(&net);
        build(&e, Some(&net), &BuildSettings::for_mode(BuildMode::EnvironmentAware)).unwrap()
    }

    fn build_minimal(name: &str) -> ResourceGraph {
        build(&env(name), None, &BuildSettings::for_mode(BuildMode::Minimal)).unwrap()
    }

    #[test]
    fn test_function_depends_on_network_when_present() {
        let g = build_aware("prod");
        let f = g.get(ids::FUNCTION).unwrap();
        assert!(f.depends_on.contains(ids::NETWORK));
        assert!(f.config.contains_key("subnet_selection"));
        assert!(f.config.contains_key("vpc_id"));
        assert_eq!(g.ids()[0], ids::NETWORK);
    }

    #[test]
    fn test_function_has_no_network_when_absent() {
        let g = build_minimal("dev");
        let f = g.get(ids::FUNCTION).unwrap();
        assert!(!f.depends_on.contains(ids::NETWORK));
        assert!(!f.config.contains_key("subnet_selection"));
        assert!(!f.config.contains_key("vpc_id"));
        assert!(g.get(ids::NETWORK).is_none());
    }

    #[test]
    fn test_function_name_is_deterministic() {
        let g = build_aware("prod");
        assert_eq!(
            g.get(ids::FUNCTION).unwrap().literal("function_name"),
            Some(&json!("prod-AIHandler"))
        );
    }

    #[test]
    fn test_model_invoke_is_policy_on_role() {
        let g = build_minimal("dev");
        let role = g.get(ids::FUNCTION_ROLE).unwrap();
        let policies = role.literal("inline_policies").unwrap().as_array().unwrap();
        assert_eq!(policies.len(), 1);
        assert_eq!(policies[0]["resources"].as_array().unwrap().len(), 2);
        assert!(policies[0]["actions"]
            .as_array()
            .unwrap()
            .contains(&json!("bedrock:InvokeModel")));
    }

    #[test]
    fn test_route_per_mode() {
        let g = build_aware("prod");
        let api = g.get(ids::API).unwrap();
        assert_eq!(api.literal("route").unwrap()["path"], "/generate/content");
        let dist = g.get(ids::DISTRIBUTION).unwrap();
        assert_eq!(
            dist.literal("additional_behaviors").unwrap()[0]["path_pattern"],
            "/generate/content"
        );

        let g = build_minimal("dev");
        let api = g.get(ids::API).unwrap();
        assert_eq!(api.literal("route").unwrap()["path"], "/generate");
        let dist = g.get(ids::DISTRIBUTION).unwrap();
        assert_eq!(
            dist.literal("additional_behaviors").unwrap()[0]["path_pattern"],
            "/dev/generate"
        );
    }

    #[test]
    fn test_structural_dependencies() {
        let g = build_aware("prod");
        let api = g.get(ids::API).unwrap();
        assert!(api.depends_on.contains(ids::FUNCTION));
        assert!(api.depends_on.contains(ids::API_ACCOUNT));
        assert!(g
            .get(ids::DISTRIBUTION)
            .unwrap()
            .depends_on
            .contains(ids::WEBSITE_BUCKET));
        let publish = g.get(ids::ASSET_DEPLOYMENT).unwrap();
        assert!(publish.depends_on.contains(ids::WEBSITE_BUCKET));
        assert!(publish.depends_on.contains(ids::DISTRIBUTION));
    }

    #[test]
    fn test_log_bucket_hardening() {
        let g = build_minimal("dev");
        let b = g.get(ids::LOG_BUCKET).unwrap();
        assert_eq!(b.literal("object_ownership"), Some(&json!("object_writer")));
        assert_eq!(b.literal("enforce_ssl"), Some(&json!(true)));
        assert_eq!(b.literal("block_public_access"), Some(&json!("block_all")));
    }

    #[test]
    fn test_ids_unique_and_outputs_present() {
        let g = build_aware("prod");
        let ids: HashSet<_> = g.ids().into_iter().collect();
        assert_eq!(ids.len(), g.len());
        for out in OUTPUT_IDS {
            assert_eq!(g.get(out).unwrap().kind, ResourceKind::Output);
        }
    }

    #[test]
    fn test_graph_is_acyclic() {
        let g = build_aware("prod");
        for id in g.ids() {
            assert!(!g.depends_transitively(id, id), "{} reaches itself", id);
        }
    }

    #[test]
    fn test_invalidation_policy_scoped_to_distribution() {
        let g = build_minimal("dev");
        let role = g.get(ids::DEPLOY_ROLE).unwrap();
        let policies = role.literal("inline_policies").unwrap().as_array().unwrap();
        assert_eq!(policies.len(), 1);
        assert_eq!(policies[0]["name"], "CloudFrontInvalidation");
        assert_eq!(policies[0]["resources"], json!(["${Distribution.arn}"]));
        assert!(role.depends_on.contains(ids::DISTRIBUTION));
    }

    #[test]
    fn test_model_invoke_uses_configured_resources() {
        let mut settings = BuildSettings::for_mode(BuildMode::Minimal);
        settings.model_resources = vec!["arn:aws:bedrock:eu-west-1::foundation-model/x".into()];
        let g = build(&env("dev"), None, &settings).unwrap();
        let role = g.get(ids::FUNCTION_ROLE).unwrap();
        let policies = role.literal("inline_policies").unwrap();
        assert_eq!(
            policies[0]["resources"],
            json!(["arn:aws:bedrock:eu-west-1::foundation-model/x"])
        );
    }

    #[test]
    fn test_publish_invalidates_all_paths() {
        let g = build_minimal("dev");
        let publish = g.get(ids::ASSET_DEPLOYMENT).unwrap();
        assert_eq!(publish.literal("distribution_paths"), Some(&json!(["/*"])));
    }
}
