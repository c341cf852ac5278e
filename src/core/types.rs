//! Stack configuration, resource graph, and deployment plan types.
//!
//! The config types derive Serialize/Deserialize/JsonSchema so the same
//! definitions drive YAML/JSON/TOML parsing and `stackplan schema`.

use indexmap::{IndexMap, IndexSet};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fallback environment name when none is supplied.
pub const DEFAULT_ENV_NAME: &str = "dev";

/// Fallback region when none is supplied.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Model resources the function may invoke unless the config overrides them.
pub const DEFAULT_MODEL_RESOURCES: [&str; 2] = [
    "arn:aws:bedrock:us-east-1::foundation-model/amazon.nova-pro-v1:0",
    "arn:aws:bedrock:us-east-1:198846368196:inference-profile/us.amazon.nova-pro-v1:0",
];

// ============================================================================
// Stack config file
// ============================================================================

/// Root configuration, loaded from `stackplan.yaml` (or .json / .toml).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StackConfig {
    /// Schema version (must be "1.0")
    pub version: String,

    /// Stack name, used as the plan name
    #[serde(default = "default_stack_name")]
    pub name: String,

    /// Optional description
    #[serde(default)]
    pub description: Option<String>,

    /// Whether network placement is resolved per environment
    #[serde(default)]
    pub mode: BuildMode,

    /// Route/CORS overrides on top of the mode defaults
    #[serde(default)]
    pub profile: ProfileOverrides,

    /// API logging settings, passed through to the plan untouched
    #[serde(default)]
    pub logging: ApiLogging,

    /// Model resources the function is allowed to invoke
    #[serde(default = "default_model_resources")]
    pub model_resources: Vec<String>,

    /// Per-environment context (environment name -> settings)
    #[serde(default)]
    pub environments: ContextTable,
}

/// Environment name -> environment context.
pub type ContextTable = IndexMap<String, EnvironmentContext>;

/// Settings for one named environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EnvironmentContext {
    /// Pre-existing VPC the function joins
    #[serde(rename = "vpc-id", default)]
    pub vpc_id: Option<String>,
}

fn default_stack_name() -> String {
    "AwsaiDemoStack".to_string()
}

fn default_model_resources() -> Vec<String> {
    DEFAULT_MODEL_RESOURCES.iter().map(|s| s.to_string()).collect()
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            name: default_stack_name(),
            description: None,
            mode: BuildMode::default(),
            profile: ProfileOverrides::default(),
            logging: ApiLogging::default(),
            model_resources: default_model_resources(),
            environments: ContextTable::new(),
        }
    }
}

/// Build mode, resolved once at the start of synthesis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum BuildMode {
    /// No network placement; the function runs outside any VPC.
    Minimal,
    /// Every environment must name the VPC its function joins.
    #[default]
    EnvironmentAware,
}

impl BuildMode {
    /// Whether this mode performs the VPC lookup.
    pub fn requires_network(self) -> bool {
        matches!(self, Self::EnvironmentAware)
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Minimal => write!(f, "minimal"),
            Self::EnvironmentAware => write!(f, "environment_aware"),
        }
    }
}

/// API access logging and tracing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ApiLogging {
    #[serde(default = "default_logging_level")]
    pub logging_level: String,
    #[serde(default = "default_true")]
    pub data_trace_enabled: bool,
    #[serde(default = "default_true")]
    pub tracing_enabled: bool,
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
    /// Access log group retention
    #[serde(default = "default_retention_days")]
    pub access_log_retention_days: u32,
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
}

impl Default for ApiLogging {
    fn default() -> Self {
        Self {
            logging_level: default_logging_level(),
            data_trace_enabled: true,
            tracing_enabled: true,
            metrics_enabled: true,
            access_log_retention_days: default_retention_days(),
            access_log_format: default_access_log_format(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_logging_level() -> String {
    "INFO".to_string()
}

fn default_retention_days() -> u32 {
    7
}

fn default_access_log_format() -> String {
    "json_with_standard_fields".to_string()
}

// ============================================================================
// Route profile
// ============================================================================

/// Route, edge behavior, and CORS parameters for the HTTP front door.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteProfile {
    /// API resource path, without leading slash (e.g. `generate/content`)
    pub route_path: String,
    /// Distribution path pattern proxied to the API
    pub behavior_path_pattern: String,
    /// API deployment stage
    pub stage_name: String,
    pub cors_allow_credentials: bool,
    pub cors_allow_methods: Vec<String>,
    pub cors_allow_headers: Vec<String>,
}

impl RouteProfile {
    /// Defaults for a build mode.
    pub fn for_mode(mode: BuildMode) -> Self {
        let (route_path, behavior_path_pattern) = match mode {
            BuildMode::Minimal => ("generate", "/dev/generate"),
            BuildMode::EnvironmentAware => ("generate/content", "/generate/content"),
        };
        Self {
            route_path: route_path.to_string(),
            behavior_path_pattern: behavior_path_pattern.to_string(),
            stage_name: "dev".to_string(),
            cors_allow_credentials: true,
            cors_allow_methods: ["GET", "POST", "OPTIONS"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            cors_allow_headers: ["Content-Type", "Authorization", "Origin", "Accept"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    /// Mode defaults with any configured overrides applied.
    pub fn resolve(mode: BuildMode, overrides: &ProfileOverrides) -> Self {
        let mut profile = Self::for_mode(mode);
        if let Some(ref p) = overrides.route_path {
            profile.route_path.clone_from(p);
        }
        if let Some(ref p) = overrides.behavior_path_pattern {
            profile.behavior_path_pattern.clone_from(p);
        }
        if let Some(ref s) = overrides.stage_name {
            profile.stage_name.clone_from(s);
        }
        if let Some(c) = overrides.cors_allow_credentials {
            profile.cors_allow_credentials = c;
        }
        if let Some(ref m) = overrides.cors_allow_methods {
            profile.cors_allow_methods.clone_from(m);
        }
        if let Some(ref h) = overrides.cors_allow_headers {
            profile.cors_allow_headers.clone_from(h);
        }
        profile
    }
}

/// Optional overrides for [`RouteProfile`] fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ProfileOverrides {
    #[serde(default)]
    pub route_path: Option<String>,
    #[serde(default)]
    pub behavior_path_pattern: Option<String>,
    #[serde(default)]
    pub stage_name: Option<String>,
    #[serde(default)]
    pub cors_allow_credentials: Option<bool>,
    #[serde(default)]
    pub cors_allow_methods: Option<Vec<String>>,
    #[serde(default)]
    pub cors_allow_headers: Option<Vec<String>>,
}

// ============================================================================
// Environment
// ============================================================================

/// Normalized deployment environment identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub name: String,
    #[serde(default)]
    pub account: Option<String>,
    pub region: String,
    #[serde(default)]
    pub vpc_id: Option<String>,
}

impl Environment {
    /// A copy of this environment placed in `network`.
    pub fn with_network(&self, network: &NetworkRef) -> Self {
        Self {
            vpc_id: Some(network.vpc_id.clone()),
            ..self.clone()
        }
    }
}

/// Reference to a pre-existing network segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkRef {
    pub vpc_id: String,
}

impl NetworkRef {
    pub fn new(vpc_id: impl Into<String>) -> Self {
        Self {
            vpc_id: vpc_id.into(),
        }
    }
}

// ============================================================================
// Resource graph
// ============================================================================

/// Kind of a resource node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Network,
    Role,
    Function,
    LogGroup,
    ApiAccount,
    Api,
    OriginAccessIdentity,
    Bucket,
    Distribution,
    AssetDeployment,
    Output,
}

impl ResourceKind {
    /// Attributes other nodes may reference on a node of this kind.
    pub fn exports(self) -> &'static [&'static str] {
        match self {
            Self::Network => &["vpc_id"],
            Self::Role => &["arn", "role_name"],
            Self::Function => &["arn", "function_name"],
            Self::LogGroup => &["arn", "log_group_name"],
            Self::ApiAccount => &["id"],
            Self::Api => &["id", "url", "domain_name", "root_resource_id"],
            Self::OriginAccessIdentity => &["id", "canonical_user_id"],
            Self::Bucket => &["arn", "bucket_name", "regional_domain_name"],
            Self::Distribution => &["arn", "id", "domain_name"],
            Self::AssetDeployment => &["id"],
            Self::Output => &["value"],
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Network => "network",
            Self::Role => "role",
            Self::Function => "function",
            Self::LogGroup => "log_group",
            Self::ApiAccount => "api_account",
            Self::Api => "api",
            Self::OriginAccessIdentity => "origin_access_identity",
            Self::Bucket => "bucket",
            Self::Distribution => "distribution",
            Self::AssetDeployment => "asset_deployment",
            Self::Output => "output",
        };
        write!(f, "{}", s)
    }
}

/// A config slot: a concrete value, or one waiting on a cross-reference.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Value(serde_json::Value),
    Pending,
}

impl AttrValue {
    pub fn as_value(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Value(v) => Some(v),
            Self::Pending => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// A single resource node.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSpec {
    /// Unique id within the graph
    pub id: String,

    pub kind: ResourceKind,

    /// Attribute name -> value (declaration order preserved)
    pub config: IndexMap<String, AttrValue>,

    /// Ids of nodes that must be provisioned first
    pub depends_on: IndexSet<String>,
}

impl ResourceSpec {
    pub fn new(id: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            id: id.into(),
            kind,
            config: IndexMap::new(),
            depends_on: IndexSet::new(),
        }
    }

    /// Set a literal config attribute.
    pub fn with(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.config
            .insert(key.to_string(), AttrValue::Value(value.into()));
        self
    }

    /// Add a dependency edge.
    pub fn after(mut self, id: &str) -> Self {
        self.depends_on.insert(id.to_string());
        self
    }

    /// Literal value of a config attribute, if resolved.
    pub fn literal(&self, key: &str) -> Option<&serde_json::Value> {
        self.config.get(key).and_then(AttrValue::as_value)
    }

    /// Value this node exports for `attribute`.
    ///
    /// A literal config value wins (deterministic names are known at
    /// synthesis time); otherwise the engine fills in a `${id.attribute}`
    /// token. `None` if the kind does not export the attribute.
    pub fn export(&self, attribute: &str) -> Option<serde_json::Value> {
        if !self.kind.exports().iter().any(|a| *a == attribute) {
            return None;
        }
        match self.literal(attribute) {
            Some(v) => Some(v.clone()),
            None => Some(serde_json::Value::String(format!(
                "${{{}.{}}}",
                self.id, attribute
            ))),
        }
    }
}

/// "`from_id.attribute` is filled by `to_id.to_attribute`."
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrossReference {
    pub from_id: String,
    pub attribute: String,
    pub to_id: String,
    pub to_attribute: String,
    /// Optional string template; `{{value}}` is replaced by the resolved value
    pub template: Option<String>,
}

/// All nodes of one synthesis run plus the references between them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceGraph {
    pub nodes: IndexMap<String, ResourceSpec>,
    pub references: Vec<CrossReference>,
}

// ============================================================================
// Plan
// ============================================================================

/// One fully resolved node in a deployment plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub id: String,
    pub kind: ResourceKind,
    pub config: IndexMap<String, serde_json::Value>,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

/// Ordered, fully wired plan handed to the provisioning engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentPlan {
    /// Stack name
    pub name: String,

    pub environment: Environment,

    pub mode: BuildMode,

    /// BLAKE3 digest of the ordered steps
    pub fingerprint: String,

    /// Steps in topological order
    pub steps: Vec<PlanStep>,

    /// Named outputs (post-apply values or engine tokens)
    pub outputs: IndexMap<String, String>,
}

impl DeploymentPlan {
    /// Step ids in execution order.
    pub fn order(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.id.as_str()).collect()
    }

    /// Position of a step in the order.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.id == id)
    }
}
