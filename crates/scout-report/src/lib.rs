//! Extraction contract, report model, tolerant extraction and markdown
//! rendering for tool research reports.
//!
//! Everything in this crate is pure: no network, no clock, no filesystem.

pub mod contract;
pub mod extract;
pub mod locale;
pub mod render;
pub mod report;

pub use contract::{ExtractionContract, ExtractionRequest, ListCaps, OutputShape};
pub use extract::{
    extract_json_payload, extract_report, extract_structured, extract_templated, ExtractError,
    ExtractedReport, SECTION_DELIMITER,
};
pub use locale::Locale;
pub use render::{render_extracted, render_report, truncate_for_slack, SLACK_MESSAGE_MAX_CHARS};
pub use report::{Alternative, Report, SENTINEL};
