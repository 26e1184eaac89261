//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// llm-gateway: one chat interface over `OpenAI` and Ollama.
#[derive(Parser, Debug)]
#[command(name = "llm-gateway")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// Provider to route to (openai, ollama).
    ///
    /// Defaults to the local Ollama runtime.
    #[arg(short, long, global = true, env = "GATEWAY_PROVIDER")]
    pub provider: Option<String>,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send a single message and print the reply.
    #[command(after_help = r#"Examples:
  llm-gateway chat "hello"                    # Local runtime (default)
  llm-gateway --provider openai chat "hello"  # API provider
"#)]
    Chat {
        /// Message text.
        message: String,
    },

    /// Send a conversation read from a JSON request file.
    ///
    /// The file holds `message`, and optionally `systemPrompt`,
    /// `conversationHistory`, `options` and `provider`.
    #[command(after_help = r#"Examples:
  llm-gateway roles request.json
  cat request.json | llm-gateway roles -
"#)]
    Roles {
        /// Path to the request file, or `-` for stdin.
        request: PathBuf,
    },

    /// Stream a reply as it is generated. Ctrl-C stops the stream.
    Stream {
        /// Message text.
        message: String,

        /// System instruction.
        #[arg(short, long)]
        system: Option<String>,

        /// Sampling temperature.
        #[arg(short, long)]
        temperature: Option<f32>,

        /// Maximum tokens to generate.
        #[arg(long)]
        max_tokens: Option<u32>,

        /// Nucleus sampling cutoff.
        #[arg(long)]
        top_p: Option<f32>,

        /// Presence penalty (ignored by the local runtime).
        #[arg(long, allow_hyphen_values = true)]
        presence_penalty: Option<f32>,
    },

    /// Ask for a reply in a structured shape.
    #[command(after_help = r#"Shapes:
  answer      Topic, summary, key points, steps, risks, references
  trip-plan   Destination, total days and a day-by-day plan
  trip-plans  A list of trip plans
  list        A list of strings
  map         A free-form JSON object

Examples:
  llm-gateway structured "Three days in Lisbon" --shape trip-plan
  llm-gateway --format json structured "Rust web frameworks" --shape list
"#)]
    Structured {
        /// Message text.
        message: String,

        /// Shape preset.
        #[arg(short, long, default_value = "answer")]
        shape: String,
    },

    /// List prompt templates, or render one.
    #[command(after_help = r#"Examples:
  llm-gateway templates                                  # List all
  llm-gateway templates rewrite --var tone=friendly \
      --var length=50 --var text="Hi there"              # Render one
"#)]
    Templates {
        /// Template id to show or render.
        id: Option<String>,

        /// Variable value as `name=value` (repeatable).
        #[arg(long = "var", value_parser = parse_key_value)]
        vars: Vec<(String, String)>,

        /// Directory holding `<id>.st` template overrides.
        #[arg(long, env = "GATEWAY_TEMPLATE_DIR")]
        template_dir: Option<PathBuf>,
    },
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected name=value, got `{s}`"))
}
