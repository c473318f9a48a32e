//! Display language for rendered reports and status messages.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
/// Spanish is the default locale; English is selected by the alternate
/// language token at the end of a command.
pub enum Locale {
    #[default]
    Spanish,
    English,
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Spanish => "es",
            Self::English => "en",
        }
    }

    /// Language name as written inside prompts.
    pub fn language_name(&self) -> &'static str {
        match self {
            Self::Spanish => "Spanish",
            Self::English => "English",
        }
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    pub fn ack_text(&self, provider: &str, model: &str) -> String {
        match self {
            Self::Spanish => format!(
                "✅ Petición recibida. Iniciando investigación con {provider} ({model})..."
            ),
            Self::English => {
                format!("✅ Request received. Starting research with {provider} ({model})...")
            }
        }
    }

    pub fn usage_text(&self, command: &str) -> String {
        match self {
            Self::Spanish => format!(
                "⚠️ Indica la URL de la herramienta a analizar, por ejemplo: `{command} https://example.com`"
            ),
            Self::English => format!(
                "⚠️ Provide the URL of the tool to analyze, for example: `{command} https://example.com`"
            ),
        }
    }

    pub fn upstream_failure_text(&self, provider: &str, detail: &str) -> String {
        match self {
            Self::Spanish => format!(
                "❌ El servicio {provider} respondió con un error y no se pudo completar el análisis: {detail}"
            ),
            Self::English => format!(
                "❌ The {provider} service returned an error and the analysis could not be completed: {detail}"
            ),
        }
    }

    pub fn malformed_failure_text(&self, provider: &str, detail: &str) -> String {
        match self {
            Self::Spanish => format!(
                "❌ La respuesta de {provider} no contenía un informe legible: {detail}"
            ),
            Self::English => format!(
                "❌ The {provider} response did not contain a readable report: {detail}"
            ),
        }
    }

    pub fn delivery_failure_text(&self, detail: &str) -> String {
        match self {
            Self::Spanish => format!("❌ No se pudo preparar el informe para su entrega: {detail}"),
            Self::English => format!("❌ The report could not be prepared for delivery: {detail}"),
        }
    }

    /// Text for a research task that stopped unexpectedly.
    pub fn internal_failure_text(&self, detail: &str) -> String {
        match self {
            Self::Spanish => format!(
                "❌ El análisis se interrumpió inesperadamente y no se generó ningún informe: {detail}"
            ),
            Self::English => format!(
                "❌ The analysis stopped unexpectedly and no report was produced: {detail}"
            ),
        }
    }
}
