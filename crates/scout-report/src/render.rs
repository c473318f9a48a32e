//! Slack markdown rendering for research reports.

use crate::extract::{ExtractedReport, SECTION_DELIMITER};
use crate::locale::Locale;
use crate::report::{is_sentinel, Report, SENTINEL};

/// Slack rejects message text beyond roughly 40k characters.
pub const SLACK_MESSAGE_MAX_CHARS: usize = 38_000;

struct SectionLabels {
    name: &'static str,
    official_url: &'static str,
    short_description: &'static str,
    categories: &'static str,
    target_audience: &'static str,
    key_features: &'static str,
    pricing: &'static str,
    alternatives: &'static str,
    pros: &'static str,
    cons: &'static str,
    web_match: &'static str,
    methodology: &'static str,
}

const SPANISH_LABELS: SectionLabels = SectionLabels {
    name: "*Nombre:*",
    official_url: "🌐 *URL oficial:*",
    short_description: "*Descripción corta:*",
    categories: "📂 *Categorías:*",
    target_audience: "🎯 *Público objetivo:*",
    key_features: "✨ *Características clave:*",
    pricing: "💰 *Precio:*",
    alternatives: "🔄 *Alternativas:*",
    pros: "✅ *Pros:*",
    cons: "⚠️ *Contras:*",
    web_match: "🔍 *Coincidencia web vs internet:*",
    methodology: "✍️ *Metodología de análisis:*",
};

const ENGLISH_LABELS: SectionLabels = SectionLabels {
    name: "*Name:*",
    official_url: "🌐 *Official URL:*",
    short_description: "*Short description:*",
    categories: "📂 *Categories:*",
    target_audience: "🎯 *Target audience:*",
    key_features: "✨ *Key features:*",
    pricing: "💰 *Pricing:*",
    alternatives: "🔄 *Alternatives:*",
    pros: "✅ *Pros:*",
    cons: "⚠️ *Cons:*",
    web_match: "🔍 *Web vs internet match:*",
    methodology: "✍️ *Analysis methodology:*",
};

fn labels_for(locale: Locale) -> &'static SectionLabels {
    match locale {
        Locale::Spanish => &SPANISH_LABELS,
        Locale::English => &ENGLISH_LABELS,
    }
}

/// Renders `report` as delimiter-separated Slack sections.
///
/// Scalar sections always render (showing the sentinel when unknown); list
/// sections render only when they have items.
pub fn render_report(report: &Report, locale: Locale) -> String {
    let labels = labels_for(locale);
    let mut sections = vec![
        scalar_section(labels.name, &report.name),
        scalar_section(labels.official_url, &report.official_url),
        scalar_section(labels.short_description, &report.short_description),
    ];
    sections.extend(bullet_section(labels.categories, &report.categories));
    sections.extend(bullet_section(labels.target_audience, &report.target_audience));
    sections.extend(bullet_section(labels.key_features, &report.key_features));
    sections.push(scalar_section(labels.pricing, &report.pricing));
    if !report.alternatives.is_empty() {
        let lines = report
            .alternatives
            .iter()
            .enumerate()
            .map(|(index, alternative)| {
                if is_sentinel(&alternative.url) {
                    format!("{}. *{}*", index + 1, alternative.name)
                } else {
                    format!("{}. *{}* — {}", index + 1, alternative.name, alternative.url)
                }
            })
            .collect::<Vec<_>>();
        sections.push(format!("{}\n{}", labels.alternatives, lines.join("\n")));
    }
    sections.extend(bullet_section(labels.pros, &report.pros));
    sections.extend(bullet_section(labels.cons, &report.cons));
    sections.push(format!(
        "{}\n• {}%",
        labels.web_match,
        format_percentage(report.web_match_percentage)
    ));
    sections.push(scalar_section(labels.methodology, &report.methodology));

    let mut rendered = String::from(SECTION_DELIMITER);
    for section in sections {
        rendered.push_str("\n\n");
        rendered.push_str(&section);
        rendered.push_str("\n\n");
        rendered.push_str(SECTION_DELIMITER);
    }
    truncate_for_slack(&rendered, SLACK_MESSAGE_MAX_CHARS)
}

/// Renders either shape of extracted report.
pub fn render_extracted(extracted: &ExtractedReport, locale: Locale) -> String {
    match extracted {
        ExtractedReport::Text(text) => truncate_for_slack(text, SLACK_MESSAGE_MAX_CHARS),
        ExtractedReport::Structured(report) => render_report(report, locale),
    }
}

pub fn truncate_for_slack(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let mut truncated = value.chars().take(max_chars).collect::<String>();
    truncated.push_str("...");
    truncated
}

fn scalar_section(label: &str, value: &str) -> String {
    let value = if value.trim().is_empty() {
        SENTINEL
    } else {
        value
    };
    format!("{label}\n{value}")
}

fn bullet_section(label: &str, items: &[String]) -> Option<String> {
    if items.is_empty() {
        return None;
    }
    let bullets = items
        .iter()
        .map(|item| format!("• {item}"))
        .collect::<Vec<_>>()
        .join("\n");
    Some(format!("{label}\n{bullets}"))
}

fn format_percentage(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}

#[cfg(test)]
mod tests {
    use super::{render_extracted, render_report, truncate_for_slack};
    use crate::extract::{ExtractedReport, SECTION_DELIMITER};
    use crate::locale::Locale;
    use crate::report::{Alternative, Report, SENTINEL};

    fn acme() -> Report {
        Report {
            name: "Acme".to_string(),
            official_url: "https://example.com".to_string(),
            categories: vec!["Productivity".to_string(), "Notes".to_string()],
            alternatives: vec![
                Alternative {
                    name: "Beta".to_string(),
                    url: "https://beta.example".to_string(),
                },
                Alternative {
                    name: "Gamma".to_string(),
                    url: SENTINEL.to_string(),
                },
            ],
            web_match_percentage: 87.5,
            ..Report::default()
        }
    }

    #[test]
    fn functional_empty_list_sections_are_omitted_and_scalars_show_sentinel() {
        let report = Report {
            name: "Acme".to_string(),
            ..Report::default()
        };
        let rendered = render_report(&report, Locale::English);
        assert!(rendered.contains("*Name:*\nAcme"));
        assert!(rendered.contains("💰 *Pricing:*\nN/A"));
        assert!(!rendered.contains("Categories"));
        assert!(!rendered.contains("Alternatives"));
        assert!(rendered.contains("🔍 *Web vs internet match:*\n• 0%"));
    }

    #[test]
    fn functional_sections_are_delimited_and_lists_keep_source_order() {
        let rendered = render_report(&acme(), Locale::Spanish);
        assert!(rendered.starts_with(SECTION_DELIMITER));
        assert!(rendered.ends_with(SECTION_DELIMITER));
        assert!(rendered.contains("📂 *Categorías:*\n• Productivity\n• Notes"));
        assert!(rendered.contains("1. *Beta* — https://beta.example\n2. *Gamma*"));
        assert!(rendered.contains("• 87.5%"));

        let productivity = rendered.find("Productivity").expect("first item");
        let notes = rendered.find("• Notes").expect("second item");
        assert!(productivity < notes);
    }

    #[test]
    fn unit_rendering_is_deterministic() {
        let report = acme();
        assert_eq!(
            render_report(&report, Locale::English),
            render_report(&report, Locale::English)
        );
    }

    #[test]
    fn unit_text_reports_render_verbatim() {
        let extracted = ExtractedReport::Text("----------\n*Nombre:*\nAcme".to_string());
        assert_eq!(
            render_extracted(&extracted, Locale::English),
            "----------\n*Nombre:*\nAcme"
        );
    }

    #[test]
    fn regression_truncate_for_slack_preserves_unicode_boundaries() {
        let value = "ta🌊u-message";
        assert_eq!(truncate_for_slack(value, 20), value);
        assert_eq!(truncate_for_slack(value, 3), "ta🌊...");
        assert_eq!(truncate_for_slack(value, 0), "...");
    }
}
