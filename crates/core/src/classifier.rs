use crate::config::AgentConfig;
use crate::models::{Category, ClassificationResult};

pub fn normalize_text(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

/// Keyword-scored intent classifier. Matching is plain substring, not
/// word-bounded ("am" matches inside "amenities") -- kept that way for parity
/// with the production keyword tables this was tuned against.
#[derive(Debug, Clone)]
pub struct KeywordIntentClassifier {
    table: Vec<(Category, Vec<String>)>,
}

impl KeywordIntentClassifier {
    pub fn new(config: &AgentConfig) -> Self {
        let table = config
            .keywords
            .iter()
            .map(|set| {
                let keywords = set
                    .keywords
                    .iter()
                    .map(|keyword| keyword.to_lowercase())
                    .collect();
                (set.category, keywords)
            })
            .collect();

        Self { table }
    }

    /// Total over all inputs: empty text, very long text, and non-ASCII text
    /// all resolve to some category, with the fallback winning on zero score.
    pub fn classify(&self, text: &str) -> Category {
        self.classify_scored(text).category
    }

    pub fn classify_scored(&self, text: &str) -> ClassificationResult {
        let lower = text.to_lowercase();

        let mut best = ClassificationResult {
            category: Category::GeneralInquiry,
            score: 0,
        };

        // Strictly-greater comparison keeps ties on the earliest declared
        // category, which makes routing deterministic and testable.
        for (category, keywords) in &self.table {
            let score = keywords
                .iter()
                .filter(|keyword| lower.contains(keyword.as_str()))
                .count();
            if score > best.score {
                best = ClassificationResult {
                    category: *category,
                    score,
                };
            }
        }

        best
    }
}

/// Best-effort guest-name extraction: take the token after a "name"/"is"/"am"
/// marker, skipping markers that chain ("my name is ..."). Intentionally weak;
/// callers that know the name should pass it structurally instead.
pub fn extract_guest_name(text: &str) -> String {
    const MARKERS: [&str; 3] = ["name", "is", "am"];

    let words: Vec<&str> = text.split_whitespace().collect();
    for (idx, word) in words.iter().enumerate() {
        if !MARKERS.contains(&word.to_lowercase().as_str()) {
            continue;
        }
        if let Some(next) = words.get(idx + 1) {
            if MARKERS.contains(&next.to_lowercase().as_str()) {
                continue;
            }
            let cleaned = next.trim_matches(|c: char| c.is_ascii_punctuation());
            if !cleaned.is_empty() {
                return cleaned.to_string();
            }
        }
    }

    "Unknown Guest".to_string()
}
