#![no_main]

use libfuzzer_sys::fuzz_target;
use scout_report::{extract_json_payload, extract_templated, ExtractError, SECTION_DELIMITER};

fuzz_target!(|data: &[u8]| {
    let raw = String::from_utf8_lossy(data);

    match extract_json_payload(&raw) {
        Ok(value) => assert!(value.is_object()),
        Err(ExtractError::Empty) => assert!(raw.trim().is_empty()),
        Err(ExtractError::NoJsonObject) => assert!(!raw.contains('{')),
        Err(_) => {}
    }

    if let Ok(text) = extract_templated(&raw) {
        if raw.contains(SECTION_DELIMITER) {
            assert!(text.starts_with(SECTION_DELIMITER));
        } else {
            assert_eq!(text, &*raw);
        }
    }
});
