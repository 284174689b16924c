/// Candidate text extraction from records of varying upstream shape
use crate::record::types::Record;

/// Field holding the full model output in current producers
pub const OUTPUT_FIELD: &str = "output";

/// Legacy alias used by older producers
pub const LEGACY_OUTPUT_FIELD: &str = "teacher_solution";

/// Fallback fields concatenated in this order when neither output field is usable
pub const FALLBACK_FIELDS: [&str; 3] = ["code", "solution", "text"];

/// Where a record's candidate text came from. Resolved once at the boundary;
/// later stages only see the canonical text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CandidateSource {
    ModelOutput(String),
    LegacyAlias(String),
    Assembled(Vec<String>),
    Missing,
}

impl CandidateSource {
    pub fn detect(record: &Record) -> Self {
        if let Some(text) = usable_str(record, OUTPUT_FIELD) {
            return CandidateSource::ModelOutput(text.to_string());
        }
        if let Some(text) = usable_str(record, LEGACY_OUTPUT_FIELD) {
            return CandidateSource::LegacyAlias(text.to_string());
        }

        let parts: Vec<String> = FALLBACK_FIELDS
            .iter()
            .filter_map(|field| usable_str(record, field))
            .map(str::to_string)
            .collect();

        if parts.is_empty() {
            CandidateSource::Missing
        } else {
            CandidateSource::Assembled(parts)
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CandidateSource::ModelOutput(_) => OUTPUT_FIELD,
            CandidateSource::LegacyAlias(_) => LEGACY_OUTPUT_FIELD,
            CandidateSource::Assembled(_) => "assembled",
            CandidateSource::Missing => "missing",
        }
    }

    pub fn into_text(self) -> String {
        match self {
            CandidateSource::ModelOutput(text) | CandidateSource::LegacyAlias(text) => text,
            CandidateSource::Assembled(parts) => parts.join("\n\n"),
            CandidateSource::Missing => String::new(),
        }
    }
}

/// Best candidate raw text for a record, or empty when nothing usable exists
pub fn extract_candidate_text(record: &Record) -> String {
    CandidateSource::detect(record).into_text()
}

fn usable_str<'a>(record: &'a Record, key: &str) -> Option<&'a str> {
    record.get_str(key).filter(|s| !s.trim().is_empty())
}
