//! CLI subcommands: init, validate, synth, plan, outputs, schema, completion.

use crate::core::environment::{ACCOUNT_VAR, REGION_VAR};
use crate::core::synth::{self, Synthesis, SynthRequest};
use crate::core::{parser, resolver, types};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "stackplan",
    version,
    about = "Synthesize environment-aware deployment plans for a serverless stack"
)]
pub struct Cli {
    /// Debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a template stackplan.yaml
    Init {
        /// Directory to initialize (default: current)
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Validate a stack config without synthesizing
    Validate {
        /// Path to the stack config
        #[arg(short, long, default_value = "stackplan.yaml")]
        file: PathBuf,
    },

    /// Synthesize the deployment plan for the provisioning engine
    Synth {
        #[command(flatten)]
        target: TargetArgs,

        /// Output format
        #[arg(long, value_enum, default_value_t = PlanFormat::Yaml)]
        format: PlanFormat,

        /// Write the plan here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the ordered plan with dependencies
    Plan {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Show the stack outputs
    Outputs {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Print the JSON Schema of the stack config
    Schema,

    /// Print shell completions
    Completion {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Which config and environment to synthesize.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Path to the stack config
    #[arg(short, long, default_value = "stackplan.yaml")]
    pub file: PathBuf,

    /// Environment name (default: dev)
    #[arg(short, long)]
    pub env: Option<String>,

    /// Target account id
    #[arg(long, env = ACCOUNT_VAR)]
    pub account: Option<String>,

    /// Target region (default: us-east-1)
    #[arg(long, env = REGION_VAR)]
    pub region: Option<String>,

    /// Override the config's build mode
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Minimal,
    #[value(alias = "environment_aware")]
    EnvironmentAware,
}

impl From<ModeArg> for types::BuildMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Minimal => Self::Minimal,
            ModeArg::EnvironmentAware => Self::EnvironmentAware,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PlanFormat {
    Yaml,
    Json,
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<(), String> {
    match cmd {
        Commands::Init { path } => cmd_init(&path),
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Synth {
            target,
            format,
            output,
        } => cmd_synth(&target, format, output.as_deref()),
        Commands::Plan { target } => cmd_plan(&target),
        Commands::Outputs { target } => cmd_outputs(&target),
        Commands::Schema => cmd_schema(),
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "stackplan", &mut std::io::stdout());
            Ok(())
        }
    }
}

const INIT_TEMPLATE: &str = r#"version: "1.0"
name: AwsaiDemoStack
description: "Serverless generation stack"

# environment_aware: every environment must name its VPC
# minimal: no network placement
mode: environment_aware

profile: {}

logging:
  logging_level: INFO
  data_trace_enabled: true
  tracing_enabled: true
  metrics_enabled: true
  access_log_retention_days: 7

environments:
  dev:
    vpc-id: vpc-00000000
"#;

fn cmd_init(path: &Path) -> Result<(), String> {
    let config_path = path.join("stackplan.yaml");
    if config_path.exists() {
        return Err(format!("{} already exists", config_path.display()));
    }
    std::fs::create_dir_all(path)
        .map_err(|e| format!("cannot create {}: {}", path.display(), e))?;
    std::fs::write(&config_path, INIT_TEMPLATE)
        .map_err(|e| format!("cannot write {}: {}", config_path.display(), e))?;

    println!("Initialized stackplan project at {}", path.display());
    println!("  Created: {}", config_path.display());
    Ok(())
}

fn cmd_validate(file: &Path) -> Result<(), String> {
    let config = parser::parse_config_file(file).map_err(|e| e.to_string())?;
    let errors = parser::validate_config(&config);

    if errors.is_empty() {
        println!(
            "OK: {} ({}, {} environments)",
            config.name,
            config.mode,
            config.environments.len()
        );
        Ok(())
    } else {
        for e in &errors {
            eprintln!("  ERROR: {}", e);
        }
        Err(format!("{} validation error(s)", errors.len()))
    }
}

/// Parse and validate a stack config, returning errors if invalid.
fn parse_and_validate(file: &Path) -> Result<types::StackConfig, String> {
    let config = parser::parse_config_file(file).map_err(|e| e.to_string())?;
    let errors = parser::validate_config(&config);
    if errors.is_empty() {
        return Ok(config);
    }
    for e in &errors {
        eprintln!("  ERROR: {}", e);
    }
    Err("validation failed".to_string())
}

fn run_synthesis(target: &TargetArgs) -> Result<Synthesis, String> {
    let config = parse_and_validate(&target.file)?;
    let req = SynthRequest {
        config: &config,
        env_name: target.env.as_deref(),
        account: target.account.as_deref(),
        region: target.region.as_deref(),
        mode: target.mode.map(Into::into),
    };
    synth::synthesize(&req).map_err(|e| e.to_string())
}

/// Serialize a plan in the requested format.
fn render_plan(plan: &types::DeploymentPlan, format: PlanFormat) -> Result<String, String> {
    match format {
        PlanFormat::Yaml => {
            serde_yaml_ng::to_string(plan).map_err(|e| format!("serialize error: {}", e))
        }
        PlanFormat::Json => {
            serde_json::to_string_pretty(plan).map_err(|e| format!("serialize error: {}", e))
        }
    }
}

fn cmd_synth(target: &TargetArgs, format: PlanFormat, output: Option<&Path>) -> Result<(), String> {
    let synthesis = run_synthesis(target)?;
    let rendered = render_plan(&synthesis.plan, format)?;
    match output {
        Some(path) => {
            std::fs::write(path, &rendered)
                .map_err(|e| format!("cannot write {}: {}", path.display(), e))?;
            println!(
                "Wrote {} steps to {} ({})",
                synthesis.plan.steps.len(),
                path.display(),
                synthesis.plan.fingerprint
            );
        }
        None => print!("{}", rendered),
    }
    Ok(())
}

fn cmd_plan(target: &TargetArgs) -> Result<(), String> {
    let synthesis = run_synthesis(target)?;
    print_plan(&synthesis.plan);
    Ok(())
}

/// Display a plan to stdout.
fn print_plan(plan: &types::DeploymentPlan) {
    let env = &plan.environment;
    println!(
        "Planning: {} (env {}, region {}, {})",
        plan.name, env.name, env.region, plan.mode
    );
    if let Some(ref vpc) = env.vpc_id {
        println!("  VPC: {}", vpc);
    }
    println!();

    for step in &plan.steps {
        println!("  + {}", resolver::describe_step(step));
    }

    println!();
    println!("Outputs:");
    for (name, value) in &plan.outputs {
        println!("  {} = {}", name, value);
    }
    println!();
    println!("Plan: {} to provision. Fingerprint: {}", plan.steps.len(), plan.fingerprint);
}

fn cmd_outputs(target: &TargetArgs) -> Result<(), String> {
    let synthesis = run_synthesis(target)?;
    for (name, value) in synthesis.outputs() {
        println!("{}={}", name, value);
    }
    Ok(())
}

fn cmd_schema() -> Result<(), String> {
    let schema = schemars::schema_for!(types::StackConfig);
    let json =
        serde_json::to_string_pretty(&schema).map_err(|e| format!("serialize error: {}", e))?;
    println!("{}", json);
    Ok(())
}
