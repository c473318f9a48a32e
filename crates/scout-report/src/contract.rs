//! Prompt contract sent to the completion service and the output shape it
//! promises.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::extract::SECTION_DELIMITER;
use crate::locale::Locale;
use crate::report::Report;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OutputShape {
    /// Markdown filled into the delimited report template.
    Templated,
    /// A single JSON object following the report schema.
    #[default]
    Json,
}

impl OutputShape {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Templated => "templated",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for OutputShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputShape {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "templated" | "template" | "text" => Ok(Self::Templated),
            "json" => Ok(Self::Json),
            other => Err(format!(
                "unsupported output shape '{other}': expected templated or json"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Maximum number of items kept per list field.
pub struct ListCaps {
    pub categories: usize,
    pub target_audience: usize,
    pub key_features: usize,
    pub pros: usize,
    pub cons: usize,
    pub alternatives: usize,
}

impl Default for ListCaps {
    fn default() -> Self {
        Self {
            categories: 4,
            target_audience: 4,
            key_features: 6,
            pros: 4,
            cons: 4,
            alternatives: 4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Two-part prompt sent to the completion service.
pub struct ExtractionRequest {
    pub system_contract: String,
    pub user_directive: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExtractionContract {
    shape: OutputShape,
    caps: ListCaps,
}

const RESEARCH_RULES: &str = "Tu misión es actuar como analista experto de herramientas digitales. Tu regla más importante es NUNCA INVENTAR INFORMACIÓN.

Dada una URL, investiga en internet para encontrar información actual y fiable. Contrasta cada dato consultando varias fuentes, con especial atención a G2, Product Hunt, TechCrunch, Medium y Reddit.

Si después de investigar no encuentras un dato concreto, escribe exactamente \"N/A\". No uses tu conocimiento interno de entrenamiento ni simules una respuesta.";

const TEMPLATE_SECTIONS: &[&str] = &[
    "*Nombre:*\n<nombre real de la aplicación>",
    "🌐 *URL oficial:*\n<url oficial>",
    "*Descripción corta:*\n<descripción breve y precisa>",
    "📂 *Categorías:*\n• <categoría relevante>\n• <categoría relevante>",
    "🎯 *Público objetivo:*\n• <público relevante>\n• <público relevante>",
    "✨ *Características clave:*\n• <característica relevante>\n• <característica relevante>",
    "💰 *Precio:*\n<modelo de precios>\n<detalles específicos>",
    "🔄 *Alternativas:*\n1. *<nombre alternativa 1>* — <url 1>\n2. *<nombre alternativa 2>* — <url 2>",
    "✅ *Pros:*\n• <ventaja relevante>\n• <ventaja relevante>",
    "⚠️ *Contras:*\n• <desventaja relevante>\n• <desventaja relevante>",
    "🔍 *Coincidencia web vs internet:*\n• <porcentaje>%",
    "✍️ *Metodología de análisis:*\n<cómo se obtuvo la información>",
];

impl ExtractionContract {
    pub fn new(shape: OutputShape) -> Self {
        Self {
            shape,
            caps: ListCaps::default(),
        }
    }

    pub fn with_caps(mut self, caps: ListCaps) -> Self {
        self.caps = caps;
        self
    }

    pub fn shape(&self) -> OutputShape {
        self.shape
    }

    pub fn caps(&self) -> &ListCaps {
        &self.caps
    }

    pub fn system_contract(&self) -> String {
        match self.shape {
            OutputShape::Templated => {
                let mut contract = String::from(RESEARCH_RULES);
                contract.push_str("\n\nAplica esta plantilla de informe:\n\n");
                contract.push_str(SECTION_DELIMITER);
                for section in TEMPLATE_SECTIONS {
                    contract.push_str("\n\n");
                    contract.push_str(section);
                    contract.push_str("\n\n");
                    contract.push_str(SECTION_DELIMITER);
                }
                contract
            }
            OutputShape::Json => {
                let caps = &self.caps;
                format!(
                    "{RESEARCH_RULES}

Responde ÚNICAMENTE con un objeto JSON válido, sin texto adicional, con exactamente estas claves:
{{
  \"name\": string,
  \"official_url\": string,
  \"short_description\": string,
  \"categories\": [string] (máximo {categories}),
  \"target_audience\": [string] (máximo {target_audience}),
  \"key_features\": [string] (máximo {key_features}),
  \"pricing\": string,
  \"alternatives\": [{{\"name\": string, \"url\": string}}] (máximo {alternatives}),
  \"pros\": [string] (máximo {pros}),
  \"cons\": [string] (máximo {cons}),
  \"web_match_percentage\": number (0-100),
  \"methodology\": string
}}
Usa \"N/A\" para textos desconocidos, [] para listas desconocidas y 0 para el porcentaje desconocido.",
                    categories = caps.categories,
                    target_audience = caps.target_audience,
                    key_features = caps.key_features,
                    alternatives = caps.alternatives,
                    pros = caps.pros,
                    cons = caps.cons,
                )
            }
        }
    }

    /// Builds the research prompt for `subject`.
    ///
    /// Templated output is written directly in the requested locale; JSON
    /// output is always requested in the default locale and translated later.
    pub fn build_request(&self, subject: &str, locale: Locale) -> ExtractionRequest {
        let mut user_directive = format!(
            "Por favor, sigue tus instrucciones para la siguiente URL y completa el informe: {}",
            subject.trim()
        );
        if self.shape == OutputShape::Templated && !locale.is_default() {
            user_directive.push_str(&format!(
                "\n\nWrite every section of the report in {}, keeping the template layout.",
                locale.language_name()
            ));
        }

        ExtractionRequest {
            system_contract: self.system_contract(),
            user_directive,
        }
    }

    /// Builds the secondary prompt that translates a structured report.
    pub fn translation_request(
        &self,
        report: &Report,
        locale: Locale,
    ) -> Result<ExtractionRequest, serde_json::Error> {
        let payload = serde_json::to_string_pretty(report)?;
        Ok(ExtractionRequest {
            system_contract: format!(
                "You translate JSON documents. Translate every string value into {language}. \
Keep every key, URL, number and the literal \"N/A\" unchanged, keep list order, \
and reply with only the translated JSON object.",
                language = locale.language_name()
            ),
            user_directive: payload,
        })
    }
}
