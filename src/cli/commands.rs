//! CLI command implementations.
//!
//! Each command builds its request, runs it on a fresh tokio runtime and
//! returns the formatted output. Only `stream` writes to stdout directly,
//! chunk by chunk, as the reply arrives.

use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::path::Path;

use futures_util::StreamExt;
use serde::Deserialize;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cli::output::{
    OutputFormat, format_reply, format_structured, format_template, format_template_list,
};
use crate::cli::parser::{Cli, Commands};
use crate::config::GatewayConfig;
use crate::conversation::{ConversationModel, ConversationTurn};
use crate::error::{GatewayError, Result};
use crate::gateway::Gateway;
use crate::options::SamplingOptions;
use crate::provider::ProviderKind;
use crate::structured::TargetShape;
use crate::structured::presets::{
    STRUCTURED_ANSWER_SYSTEM_PROMPT, TRIP_GUIDE_SYSTEM_PROMPT, structured_answer, trip_plan,
    trip_plans,
};
use crate::templates::TemplateCatalog;

/// Request file accepted by the `roles` command.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleChatRequest {
    /// System instruction.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Prior turns in chronological order.
    #[serde(default)]
    pub conversation_history: Vec<ConversationTurn>,
    /// The new user message.
    pub message: String,
    /// Sampling options.
    #[serde(default)]
    pub options: SamplingOptions,
    /// Provider name; the `--provider` flag takes precedence.
    #[serde(default)]
    pub provider: Option<String>,
}

impl RoleChatRequest {
    /// Builds the conversation this request describes.
    #[must_use]
    pub fn conversation(&self) -> ConversationModel {
        ConversationModel {
            system_prompt: self.system_prompt.clone(),
            history: self.conversation_history.clone(),
            user_message: self.message.clone(),
        }
    }
}

/// Executes the CLI command.
///
/// # Errors
///
/// Returns an error if configuration is incomplete, the request is
/// invalid, or the provider call fails.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);

    match &cli.command {
        Commands::Templates {
            id,
            vars,
            template_dir,
        } => cmd_templates(id.as_deref(), vars, template_dir.as_deref(), format),
        Commands::Chat { message } => {
            let selector = ProviderKind::resolve(cli.provider.as_deref());
            cmd_chat(message, selector, format)
        }
        Commands::Roles { request } => cmd_roles(request, cli.provider.as_deref(), format),
        Commands::Stream {
            message,
            system,
            temperature,
            max_tokens,
            top_p,
            presence_penalty,
        } => {
            let mut conversation = ConversationModel::new(message.as_str());
            conversation.system_prompt.clone_from(system);
            let options = SamplingOptions {
                temperature: *temperature,
                max_tokens: *max_tokens,
                top_p: *top_p,
                presence_penalty: *presence_penalty,
            };
            let selector = ProviderKind::resolve(cli.provider.as_deref());
            cmd_stream(&conversation, &options, selector, format)
        }
        Commands::Structured { message, shape } => {
            let selector = ProviderKind::resolve(cli.provider.as_deref());
            cmd_structured(message, shape, selector, format)
        }
    }
}

fn connect() -> Result<Gateway> {
    let config = GatewayConfig::from_env()?;
    Gateway::from_config(&config)
}

fn runtime() -> Result<Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}

fn cmd_chat(message: &str, selector: ProviderKind, format: OutputFormat) -> Result<String> {
    let gateway = connect()?;
    let response = runtime()?.block_on(gateway.simple_chat(message, Some(selector)))?;
    format_reply(selector, &response, format)
}

/// Reads a `roles` request from a file, or stdin when `path` is `-`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid request.
pub fn read_request(path: &Path) -> Result<RoleChatRequest> {
    let text = if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path)?
    };
    Ok(serde_json::from_str(&text)?)
}

fn cmd_roles(path: &Path, provider: Option<&str>, format: OutputFormat) -> Result<String> {
    let request = read_request(path)?;
    let selector = ProviderKind::resolve(provider.or(request.provider.as_deref()));
    debug!(
        provider = %selector,
        history = request.conversation_history.len(),
        "loaded role chat request"
    );

    let gateway = connect()?;
    let response = runtime()?.block_on(gateway.role_chat(
        &request.conversation(),
        &request.options,
        Some(selector),
    ))?;
    format_reply(selector, &response, format)
}

fn cmd_stream(
    conversation: &ConversationModel,
    options: &SamplingOptions,
    selector: ProviderKind,
    format: OutputFormat,
) -> Result<String> {
    let gateway = connect()?;

    runtime()?.block_on(async {
        let cancel = CancellationToken::new();
        let on_interrupt = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                on_interrupt.cancel();
            }
        });

        let mut stream = gateway
            .stream_chat_cancellable(conversation, options, Some(selector), cancel.clone())
            .await?;

        let mut stdout = io::stdout();
        let mut text = String::new();
        let mut chunks = 0_usize;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if format == OutputFormat::Text {
                stdout.write_all(chunk.text.as_bytes())?;
                stdout.flush()?;
            }
            text.push_str(&chunk.text);
            chunks += 1;
        }

        let cancelled = cancel.is_cancelled();
        if cancelled {
            info!(chunks, "stream cancelled by user");
        }

        match format {
            OutputFormat::Text if cancelled => Ok("\n[cancelled]\n".to_string()),
            OutputFormat::Text => Ok("\n".to_string()),
            OutputFormat::Json => format.to_json(&serde_json::json!({
                "provider": selector.as_str(),
                "response": text,
                "chunks": chunks,
                "cancelled": cancelled,
            })),
        }
    })
}

/// Resolves a structured shape preset name to its shape and system prompt.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidRequest`] for an unknown preset.
pub fn shape_preset(name: &str) -> Result<(TargetShape, Option<&'static str>)> {
    match name.trim().to_lowercase().as_str() {
        "answer" => Ok((structured_answer(), Some(STRUCTURED_ANSWER_SYSTEM_PROMPT))),
        "trip-plan" => Ok((trip_plan(), Some(TRIP_GUIDE_SYSTEM_PROMPT))),
        "trip-plans" => Ok((trip_plans(), Some(TRIP_GUIDE_SYSTEM_PROMPT))),
        "list" => Ok((TargetShape::ListOfStrings, None)),
        "map" => Ok((TargetShape::Mapping, None)),
        other => Err(GatewayError::invalid_request(format!(
            "unknown shape `{other}` (expected answer, trip-plan, trip-plans, list, map)"
        ))),
    }
}

fn cmd_structured(
    message: &str,
    shape: &str,
    selector: ProviderKind,
    format: OutputFormat,
) -> Result<String> {
    let (target, system_prompt) = shape_preset(shape)?;
    let mut conversation = ConversationModel::new(message);
    conversation.system_prompt = system_prompt.map(String::from);

    let gateway = connect()?;
    let result = runtime()?.block_on(gateway.structured_chat_with(
        &conversation,
        &target,
        Some(selector),
    ))?;
    format_structured(&target.name(), &result, format)
}

fn cmd_templates(
    id: Option<&str>,
    vars: &[(String, String)],
    template_dir: Option<&Path>,
    format: OutputFormat,
) -> Result<String> {
    let catalog = TemplateCatalog::load(template_dir);

    let Some(id) = id else {
        return format_template_list(&catalog, format);
    };
    let template = catalog
        .get(id)
        .ok_or_else(|| GatewayError::invalid_request(format!("unknown template `{id}`")))?;

    if vars.is_empty() {
        return format_template(template, format);
    }

    let values: HashMap<String, String> = vars.iter().cloned().collect();
    let rendered = template.render(&values)?;
    match format {
        OutputFormat::Text => Ok(rendered),
        OutputFormat::Json => format.to_json(&serde_json::json!({
            "id": template.id,
            "prompt": rendered,
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Role;
    use test_case::test_case;

    #[test_case("answer", "structured_answer"; "answer")]
    #[test_case("trip-plan", "trip_plan"; "trip plan")]
    #[test_case("Trip-Plans", "list_of_trip_plan"; "trip plans any case")]
    #[test_case("list", "list_of_strings"; "list")]
    #[test_case("map", "mapping"; "map")]
    fn test_shape_preset(name: &str, expected: &str) {
        let (shape, _) = shape_preset(name).unwrap_or_else(|e| unreachable!("{e}"));
        assert_eq!(shape.name(), expected);
    }

    #[test]
    fn test_unknown_shape_preset() {
        let err = shape_preset("table").err();
        assert!(matches!(err, Some(GatewayError::InvalidRequest { .. })));
    }

    #[test]
    fn test_read_request_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap_or_else(|_| unreachable!());
        let _ = write!(
            file,
            r#"{{
                "systemPrompt": "Be brief.",
                "conversationHistory": [
                    {{"role": "user", "content": "hi"}},
                    {{"role": "assistant", "content": "hello"}}
                ],
                "message": "bye",
                "options": {{"temperature": 0.3}},
                "provider": "openai"
            }}"#
        );

        let request = read_request(file.path()).unwrap_or_else(|e| unreachable!("{e}"));
        let conversation = request.conversation();
        assert_eq!(conversation.user_message, "bye");
        assert_eq!(conversation.system_prompt(), Some("Be brief."));
        let roles: Vec<Role> = conversation.retained_turns().map(|(r, _)| r).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
        assert_eq!(request.options.temperature, Some(0.3));
        assert!(request.options.max_tokens.is_none());
        assert_eq!(request.provider.as_deref(), Some("openai"));
    }

    #[test]
    fn test_read_request_missing_message_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap_or_else(|_| unreachable!());
        let _ = write!(file, r#"{{"systemPrompt": "x"}}"#);
        assert!(matches!(read_request(file.path()), Err(GatewayError::Json(_))));
    }

    #[test]
    fn test_render_template_from_vars() {
        let vars = vec![
            ("tone".to_string(), "friendly".to_string()),
            ("length".to_string(), "50".to_string()),
            ("text".to_string(), "Quarterly numbers are in.".to_string()),
        ];
        let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        let output = cmd_templates(Some("rewrite"), &vars, Some(dir.path()), OutputFormat::Text)
            .unwrap_or_else(|e| unreachable!("{e}"));
        assert!(output.contains("friendly"));
        assert!(output.contains("Quarterly numbers are in."));
        assert!(!output.contains("{tone}"));
    }

    #[test]
    fn test_unknown_template() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        let result = cmd_templates(Some("nope"), &[], Some(dir.path()), OutputFormat::Text);
        assert!(matches!(result, Err(GatewayError::InvalidRequest { .. })));
    }
}
