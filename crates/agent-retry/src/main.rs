//! agent-retry - run agent queries with retries, backoff and a deadline.
//!
//! # Usage
//!
//! ```bash
//! # One query, three attempts, 30 second deadline
//! agent-retry query --tool Read "Read the Cargo.toml file and summarize it."
//!
//! # Structured output
//! agent-retry query --schema analysis.schema.json "Analyze src/lib.rs"
//!
//! # Fall back through smaller tool sets
//! agent-retry degrade "What is this project about? Check the README."
//!
//! # Follow-up questions in one session
//! agent-retry chat "What's the capital of France?" "What's its population?"
//!
//! # Delegate to sub-agents defined in a JSON file
//! agent-retry query --agents agents.json "Review src/lib.rs, then document it."
//! ```

use agent_retry::output::{self, OutputFormat};
use agent_retry::{
    degrade, parse_agents, AgentOptions, CapabilityTier, Conversation, RequestRetrier, Settings,
    SettingsOverrides,
};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "agent-retry")]
#[command(about = "Run agent queries with retries, backoff and a deadline", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "human")]
    format: OutputFormatArg,

    #[command(flatten)]
    retry: RetryArgs,
}

#[derive(Args)]
struct RetryArgs {
    /// Attempt budget (overrides settings)
    #[arg(long, global = true)]
    max_attempts: Option<u32>,

    /// Delay before the second attempt, in seconds (overrides settings)
    #[arg(long, global = true)]
    base_delay: Option<f64>,

    /// Deadline for the whole call, in seconds (overrides settings)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Agent program (overrides settings)
    #[arg(long, global = true)]
    program: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormatArg {
    Human,
    Json,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Human => OutputFormat::Human,
            OutputFormatArg::Json => OutputFormat::Json,
        }
    }
}

#[derive(Args)]
struct AgentArgs {
    /// Tool the agent may use (repeatable)
    #[arg(short, long = "tool")]
    tools: Vec<String>,

    /// System prompt
    #[arg(long)]
    system_prompt: Option<String>,

    /// Maximum agent turns
    #[arg(long)]
    max_turns: Option<u32>,

    /// Model alias or id
    #[arg(long)]
    model: Option<String>,

    /// Working directory for the agent
    #[arg(long)]
    cwd: Option<PathBuf>,

    /// JSON schema file the result must satisfy
    #[arg(long)]
    schema: Option<PathBuf>,

    /// JSON file defining sub-agents by name
    #[arg(long)]
    agents: Option<PathBuf>,

    /// Session id to continue
    #[arg(long)]
    resume: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single query
    Query {
        /// Prompt to send
        prompt: String,

        #[command(flatten)]
        agent: AgentArgs,
    },

    /// Try capability tiers from most to least capable
    Degrade {
        /// Prompt to send
        prompt: String,

        /// Tier as LABEL=TOOL,TOOL (repeatable; defaults to full/limited/minimal)
        #[arg(long = "tier", value_parser = parse_tier)]
        tiers: Vec<CapabilityTier>,

        #[command(flatten)]
        agent: AgentArgs,
    },

    /// Send prompts as turns of one conversation
    Chat {
        /// Prompts to send, in order
        #[arg(required = true)]
        prompts: Vec<String>,

        #[command(flatten)]
        agent: AgentArgs,
    },
}

#[tokio::main]
async fn main() {
    match run().await {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            output::error(format!("{:#}", e));
            process::exit(1);
        }
    }
}

async fn run() -> Result<bool> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let mut settings = Settings::load(cli.config.as_deref())
        .await
        .context("Failed to load settings")?;
    settings.apply_overrides(&SettingsOverrides::from(&cli.retry));
    settings.validate().context("Invalid settings")?;

    let policy = settings.retry_policy()?;
    let agent = settings.command_query();
    let format = OutputFormat::from(cli.format);

    match cli.command {
        Commands::Query {
            prompt,
            agent: agent_args,
        } => {
            let options = agent_options(&settings, agent_args).await?;
            let outcome = RequestRetrier::new("query")
                .query(&agent, &prompt, &options, &policy, settings.deadline())
                .await;
            output::render_outcome(&outcome, format);
            Ok(outcome.is_success())
        }
        Commands::Degrade {
            prompt,
            tiers,
            agent: agent_args,
        } => {
            let options = agent_options(&settings, agent_args).await?;
            let tiers = if tiers.is_empty() {
                CapabilityTier::defaults()
            } else {
                tiers
            };
            let report = degrade(
                &RequestRetrier::new("degrade"),
                &agent,
                &prompt,
                &options,
                &tiers,
                &policy,
                settings.deadline(),
            )
            .await?;
            output::render_degrade_report(&report, format);
            Ok(report.outcome.is_success())
        }
        Commands::Chat {
            prompts,
            agent: agent_args,
        } => {
            let options = agent_options(&settings, agent_args).await?;
            let retrier = RequestRetrier::new("chat");
            let mut conversation = Conversation::new(&retrier, &agent, options);

            for (turn, prompt) in prompts.iter().enumerate() {
                if format == OutputFormat::Human {
                    output::header(format!("Turn {}: {}", turn + 1, prompt));
                }
                let outcome = conversation.send(prompt, &policy, settings.deadline()).await;
                output::render_outcome(&outcome, format);
                if !outcome.is_success() {
                    return Ok(false);
                }
            }
            if let Some(session_id) = conversation.session_id() {
                if format == OutputFormat::Human {
                    output::success(format!("Session: {}", session_id));
                }
            }
            Ok(true)
        }
    }
}

impl From<&RetryArgs> for SettingsOverrides {
    fn from(args: &RetryArgs) -> Self {
        Self {
            max_attempts: args.max_attempts,
            base_delay_secs: args.base_delay,
            timeout_secs: args.timeout,
            program: args.program.clone(),
        }
    }
}

async fn agent_options(settings: &Settings, args: AgentArgs) -> Result<AgentOptions> {
    let mut options = settings.agent_options();
    options.allowed_tools = args.tools;
    if args.system_prompt.is_some() {
        options.system_prompt = args.system_prompt;
    }
    if args.max_turns.is_some() {
        options.max_turns = args.max_turns;
    }
    if args.model.is_some() {
        options.model = args.model;
    }
    options.cwd = match args.cwd {
        Some(cwd) => Some(cwd),
        None => Some(std::env::current_dir().context("Failed to read working directory")?),
    };
    if let Some(path) = args.schema {
        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read schema {}", path.display()))?;
        let schema = serde_json::from_str(&content)
            .with_context(|| format!("Schema {} is not valid JSON", path.display()))?;
        options.output_schema = Some(schema);
    }
    if let Some(path) = args.agents {
        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read sub-agents {}", path.display()))?;
        options.agents = parse_agents(&content)
            .with_context(|| format!("Invalid sub-agents in {}", path.display()))?;
    }
    if args.resume.is_some() {
        options.resume = args.resume;
    }
    Ok(options)
}

fn parse_tier(value: &str) -> std::result::Result<CapabilityTier, String> {
    let (label, tools) = value
        .split_once('=')
        .ok_or_else(|| format!("expected LABEL=TOOL,TOOL, got '{}'", value))?;
    let tools: Vec<&str> = tools
        .split(',')
        .map(str::trim)
        .filter(|tool| !tool.is_empty())
        .collect();
    Ok(CapabilityTier::new(label.trim(), tools))
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("agent_retry=debug,info")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("agent_retry=warn,warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
