use std::path::Path;

use anyhow::{Context, Result};
use coral_core::PolicyEntry;
use regex::Regex;
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct KnowledgeStats {
    pub entries: usize,
    pub loaded_docs: usize,
}

/// Static in-memory policy index. Matching is presence/absence substring
/// search over title, content, and example strings -- no ranking, results in
/// declaration order.
#[derive(Debug, Clone)]
pub struct PolicyKnowledgeBase {
    entries: Vec<PolicyEntry>,
    loaded_docs: usize,
}

impl PolicyKnowledgeBase {
    pub fn builtin() -> Self {
        Self {
            entries: builtin_policies(),
            loaded_docs: 0,
        }
    }

    /// Built-in policies plus every `.md`/`.json` document under `root`.
    /// Markdown titles come from the first heading, falling back to the file
    /// stem; JSON documents are flattened into searchable text.
    pub fn from_dir(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let heading_regex = Regex::new(r"(?m)^#\s+(.+)$")?;

        let mut entries = builtin_policies();
        let mut loaded_docs = 0usize;

        for entry in WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                matches!(
                    entry.path().extension().and_then(|ext| ext.to_str()),
                    Some("md") | Some("json")
                )
            })
        {
            let path = entry.path();
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed reading policy document: {}", path.display()))?;

            let is_json = path.extension().and_then(|ext| ext.to_str()) == Some("json");
            let content = if is_json {
                serde_json::from_str::<serde_json::Value>(&raw)
                    .map(|value| json_to_search_text(&value))
                    .unwrap_or(raw)
            } else {
                raw
            };

            let rel_path = path
                .strip_prefix(root)
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_else(|_| path.to_string_lossy().to_string());

            let title = heading_regex
                .captures(&content)
                .and_then(|captures| {
                    captures
                        .get(1)
                        .map(|value| value.as_str().trim().to_string())
                })
                .unwrap_or_else(|| {
                    path.file_stem()
                        .and_then(|stem| stem.to_str())
                        .unwrap_or("untitled")
                        .replace('-', " ")
                });

            entries.push(PolicyEntry {
                key: rel_path.replace('/', "::"),
                title,
                content,
                examples: Vec::new(),
            });
            loaded_docs += 1;
        }

        Ok(Self {
            entries,
            loaded_docs,
        })
    }

    pub fn stats(&self) -> KnowledgeStats {
        KnowledgeStats {
            entries: self.entries.len(),
            loaded_docs: self.loaded_docs,
        }
    }

    /// An entry matches when the lowercased query appears in its title,
    /// content, or any example string. Empty result means "no match", never
    /// an error. An empty query returns no entries: literal substring
    /// containment would have it match everything, which is useless as a
    /// search result.
    pub fn search(&self, query: &str) -> Vec<PolicyEntry> {
        let query_lower = query.to_lowercase();
        if query_lower.trim().is_empty() {
            return Vec::new();
        }

        self.entries
            .iter()
            .filter(|entry| {
                entry.title.to_lowercase().contains(&query_lower)
                    || entry.content.to_lowercase().contains(&query_lower)
                    || entry
                        .examples
                        .iter()
                        .any(|example| example.to_lowercase().contains(&query_lower))
            })
            .cloned()
            .collect()
    }

    pub fn entries(&self) -> &[PolicyEntry] {
        &self.entries
    }
}

fn builtin_policies() -> Vec<PolicyEntry> {
    vec![
        policy(
            "cancellation",
            "Cancellation Policy",
            "Reservations can be cancelled up to 24 hours before check-in for a full refund. Cancellations within 24 hours are subject to a one-night charge. Late cancellation fee: $50 per room. Emergency cancellations are handled case-by-case.",
            &[
                "24-hour cancellation window",
                "One-night penalty for late cancellation",
            ],
        ),
        policy(
            "check_in",
            "Check-in Policy",
            "Check-in time is 3:00 PM. Early check-in may be available based on room availability. Valid ID required.",
            &[
                "3:00 PM check-in time",
                "Valid ID required",
                "Early check-in subject to availability",
            ],
        ),
        policy(
            "pets",
            "Pet Policy",
            "Pets are welcome in designated pet-friendly rooms for an additional $25 per night. Maximum 2 pets per room. Pet-friendly rooms are limited.",
            &[
                "$25 per night pet fee",
                "Maximum 2 pets",
                "Limited pet-friendly rooms",
            ],
        ),
        policy(
            "amenities",
            "Amenity Usage",
            "Pool hours are 6 AM to 10 PM. Spa services require advance booking with 24-hour notice. Fitness center is open 24/7 for guests. Breakfast 7-10 AM, dinner 6-9 PM. Concierge available around the clock.",
            &[
                "Pool: 6 AM - 10 PM",
                "Spa: Advance booking required",
                "Fitness: 24/7 access",
            ],
        ),
        policy(
            "emergency",
            "Emergency Procedures",
            "For emergencies, call 911 immediately. For non-emergency issues, contact front desk at extension 0. Emergency exits are clearly marked.",
            &[
                "Call 911 for emergencies",
                "Front desk: extension 0",
                "Follow emergency exit signs",
            ],
        ),
        policy(
            "complaint_resolution",
            "Complaint Resolution",
            "Escalation path: Level 1 Front Desk, Level 2 Manager, Level 3 General Manager. Initial response within 2 hours, target resolution within 24 hours.",
            &[
                "Initial response within 2 hours",
                "Resolution within 24 hours",
            ],
        ),
    ]
}

fn policy(key: &str, title: &str, content: &str, examples: &[&str]) -> PolicyEntry {
    PolicyEntry {
        key: key.to_string(),
        title: title.to_string(),
        content: content.to_string(),
        examples: examples.iter().map(|e| e.to_string()).collect(),
    }
}

fn json_to_search_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::Bool(v) => v.to_string(),
        serde_json::Value::Number(v) => v.to_string(),
        serde_json::Value::String(v) => v.clone(),
        serde_json::Value::Array(values) => values
            .iter()
            .map(json_to_search_text)
            .filter(|v| !v.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
        serde_json::Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("{} {}", k, json_to_search_text(v)))
            .collect::<Vec<_>>()
            .join(" "),
    }
}
