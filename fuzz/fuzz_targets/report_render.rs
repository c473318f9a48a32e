#![no_main]

use libfuzzer_sys::fuzz_target;
use scout_report::{
    extract_structured, render_report, ListCaps, Locale, SECTION_DELIMITER,
    SLACK_MESSAGE_MAX_CHARS,
};

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);
    let caps = ListCaps::default();
    let Ok(report) = extract_structured(&raw, &caps) else {
        return;
    };

    assert!(report.categories.len() <= caps.categories);
    assert!(report.key_features.len() <= caps.key_features);
    assert!(report.alternatives.len() <= caps.alternatives);
    assert!((0.0..=100.0).contains(&report.web_match_percentage));

    for locale in [Locale::Spanish, Locale::English] {
        let rendered = render_report(&report, locale);
        assert!(rendered.starts_with(SECTION_DELIMITER));
        assert!(rendered.chars().count() <= SLACK_MESSAGE_MAX_CHARS + 3);
    }
});
