use std::path::PathBuf;

use clap::{ArgAction, Parser, ValueEnum};
use scout_report::OutputShape;

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_output_shape(value: &str) -> Result<OutputShape, String> {
    value.parse::<OutputShape>()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliProvider {
    Google,
    Openai,
}

impl CliProvider {
    pub fn default_model(self) -> &'static str {
        match self {
            Self::Google => "gemini-1.5-pro-latest",
            Self::Openai => "gpt-4o-mini",
        }
    }

    /// Provider-specific key variable consulted when `--api-key` is unset.
    pub fn api_key_env(self) -> &'static str {
        match self {
            Self::Google => "GEMINI_API_KEY",
            Self::Openai => "OPENAI_API_KEY",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliStoreBackend {
    None,
    Memory,
    Sqlite,
    Postgrest,
}

#[derive(Debug, Parser)]
#[command(
    name = "scout",
    about = "Slack slash command relay that researches a tool URL and posts the report back",
    version
)]
pub struct Cli {
    #[arg(
        long,
        env = "SCOUT_BIND",
        default_value = "127.0.0.1:8790",
        help = "Address the slash command server listens on (host:port)"
    )]
    pub bind: String,

    #[arg(
        long,
        env = "SCOUT_PROVIDER",
        value_enum,
        default_value = "google",
        help = "Completion provider used for research"
    )]
    pub provider: CliProvider,

    #[arg(
        long,
        env = "SCOUT_MODEL",
        help = "Model identifier; defaults to gemini-1.5-pro-latest for google and gpt-4o-mini for openai"
    )]
    pub model: Option<String>,

    #[arg(
        long = "api-base",
        env = "SCOUT_API_BASE",
        help = "Override the provider API base URL"
    )]
    pub api_base: Option<String>,

    #[arg(
        long = "api-key",
        env = "SCOUT_API_KEY",
        hide_env_values = true,
        help = "Provider API key; falls back to GEMINI_API_KEY or OPENAI_API_KEY"
    )]
    pub api_key: Option<String>,

    #[arg(
        long = "openai-organization",
        env = "OPENAI_ORGANIZATION",
        help = "Optional OpenAI organization header"
    )]
    pub openai_organization: Option<String>,

    #[arg(
        long = "request-timeout-ms",
        env = "SCOUT_REQUEST_TIMEOUT_MS",
        default_value_t = 120_000,
        value_parser = parse_positive_u64,
        help = "Timeout for a single completion request"
    )]
    pub request_timeout_ms: u64,

    #[arg(
        long = "search-grounding",
        env = "SCOUT_SEARCH_GROUNDING",
        default_value_t = false,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        help = "Enable Google Search grounding for Gemini research requests"
    )]
    pub search_grounding: bool,

    #[arg(
        long = "output-shape",
        env = "SCOUT_OUTPUT_SHAPE",
        default_value = "json",
        value_parser = parse_output_shape,
        help = "Report shape requested from the model: templated or json"
    )]
    pub output_shape: OutputShape,

    #[arg(
        long = "alternate-language-token",
        env = "SCOUT_ALTERNATE_LANGUAGE_TOKEN",
        default_value = "english",
        help = "Trailing word in the command text that switches the report to English"
    )]
    pub alternate_language_token: String,

    #[arg(
        long,
        env = "SCOUT_STORE",
        value_enum,
        default_value = "none",
        help = "Report persistence backend"
    )]
    pub store: CliStoreBackend,

    #[arg(
        long = "sqlite-path",
        env = "SCOUT_SQLITE_PATH",
        default_value = ".scout/reports.sqlite",
        help = "SQLite database path used by --store sqlite"
    )]
    pub sqlite_path: PathBuf,

    #[arg(
        long = "postgrest-url",
        env = "SCOUT_POSTGREST_URL",
        help = "PostgREST/Supabase project URL used by --store postgrest"
    )]
    pub postgrest_url: Option<String>,

    #[arg(
        long = "postgrest-key",
        env = "SCOUT_POSTGREST_KEY",
        hide_env_values = true,
        help = "PostgREST/Supabase API key used by --store postgrest"
    )]
    pub postgrest_key: Option<String>,

    #[arg(
        long = "postgrest-table",
        env = "SCOUT_POSTGREST_TABLE",
        default_value = "tool_reports",
        help = "Table receiving report upserts"
    )]
    pub postgrest_table: String,

    #[arg(
        long = "callback-timeout-ms",
        env = "SCOUT_CALLBACK_TIMEOUT_MS",
        default_value_t = 10_000,
        value_parser = parse_positive_u64,
        help = "Timeout for the response_url callback POST"
    )]
    pub callback_timeout_ms: u64,
}

impl Cli {
    pub fn model(&self) -> String {
        self.model
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(self.provider.default_model())
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, CliProvider, CliStoreBackend};
    use clap::Parser;
    use scout_report::OutputShape;

    #[test]
    fn unit_cli_defaults_match_documented_values() {
        let cli = Cli::try_parse_from(["scout"]).expect("parse defaults");
        assert_eq!(cli.bind, "127.0.0.1:8790");
        assert_eq!(cli.provider, CliProvider::Google);
        assert_eq!(cli.model(), "gemini-1.5-pro-latest");
        assert_eq!(cli.request_timeout_ms, 120_000);
        assert!(!cli.search_grounding);
        assert_eq!(cli.output_shape, OutputShape::Json);
        assert_eq!(cli.alternate_language_token, "english");
        assert_eq!(cli.store, CliStoreBackend::None);
        assert_eq!(cli.postgrest_table, "tool_reports");
        assert_eq!(cli.callback_timeout_ms, 10_000);
    }

    #[test]
    fn functional_cli_parses_overrides() {
        let cli = Cli::try_parse_from([
            "scout",
            "--provider",
            "openai",
            "--output-shape",
            "templated",
            "--search-grounding",
            "--store",
            "sqlite",
            "--sqlite-path",
            "/tmp/reports.sqlite",
        ])
        .expect("parse overrides");
        assert_eq!(cli.provider, CliProvider::Openai);
        assert_eq!(cli.model(), "gpt-4o-mini");
        assert_eq!(cli.output_shape, OutputShape::Templated);
        assert!(cli.search_grounding);
        assert_eq!(cli.store, CliStoreBackend::Sqlite);
    }

    #[test]
    fn regression_cli_rejects_zero_timeouts_and_unknown_shapes() {
        assert!(Cli::try_parse_from(["scout", "--request-timeout-ms", "0"]).is_err());
        assert!(Cli::try_parse_from(["scout", "--output-shape", "yaml"]).is_err());
    }
}
