//! Configuration validation engine.
//!
//! Reports syntax errors, unknown or misspelled fields, and settings that
//! would make a delivery run fail before the first upload.

use std::{collections::HashMap, path::Path};

use {secrecy::ExposeSecret, serde_json::Value};

use crate::{loader, schema::PixelpostConfig};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "unknown-field", "type-error", "delivery",
    /// "file-ref"
    pub category: &'static str,
    /// Dotted path, e.g. "telegram.chat_id"
    pub path: String,
    pub message: String,
}

/// Result of validating a configuration file.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<std::path::PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

// ── Known keys ──────────────────────────────────────────────────────────────

const OUTPUT_KEYS: &[&str] = &["directory", "filename_prefix", "embed_metadata"];
const TELEGRAM_KEYS: &[&str] = &[
    "token",
    "chat_id",
    "send_as",
    "grouping",
    "timeout_secs",
    "api_url",
];
const WEBHOOK_KEYS: &[&str] = &["callback_url", "id", "timeout_secs"];

fn known_sections() -> HashMap<&'static str, &'static [&'static str]> {
    HashMap::from([
        ("output", OUTPUT_KEYS),
        ("telegram", TELEGRAM_KEYS),
        ("webhook", WEBHOOK_KEYS),
    ])
}

// ── Levenshtein distance ────────────────────────────────────────────────────

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let b_len = b.chars().count();
    if a.is_empty() {
        return b_len;
    }
    if b_len == 0 {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.chars().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_len]
}

/// Closest candidate within `max_distance` edits, if any.
fn suggest<'a>(needle: &str, candidates: &[&'a str], max_distance: usize) -> Option<&'a str> {
    candidates
        .iter()
        .map(|&c| (c, levenshtein(needle, c)))
        .filter(|&(_, d)| d > 0 && d <= max_distance)
        .min_by_key(|&(_, d)| d)
        .map(|(c, _)| c)
}

// ── Core validation ─────────────────────────────────────────────────────────

/// Validate a config file at the given path, or discover the default config
/// file location if `path` is `None`.
#[must_use]
pub fn validate(path: Option<&Path>) -> ValidationResult {
    let config_path = path
        .map(Path::to_path_buf)
        .or_else(loader::find_config_file);

    let Some(actual_path) = config_path else {
        return ValidationResult {
            diagnostics: vec![Diagnostic {
                severity: Severity::Info,
                category: "file-ref",
                path: String::new(),
                message: "no config file found; using defaults".into(),
            }],
            config_path: None,
        };
    };

    let diagnostics = match loader::load_config_value(&actual_path) {
        Ok(value) => validate_value(value),
        Err(e) => vec![Diagnostic {
            severity: Severity::Error,
            category: "syntax",
            path: String::new(),
            message: e.to_string(),
        }],
    };

    ValidationResult {
        diagnostics,
        config_path: Some(actual_path),
    }
}

/// Validate an already parsed config tree.
#[must_use]
pub fn validate_value(value: Value) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    check_unknown_fields(&value, &mut diagnostics);

    match serde_json::from_value::<PixelpostConfig>(value) {
        Ok(config) => check_semantics(&config, &mut diagnostics),
        Err(e) => diagnostics.push(Diagnostic {
            severity: Severity::Error,
            category: "type-error",
            path: String::new(),
            message: format!("type error: {e}"),
        }),
    }

    diagnostics
}

fn check_unknown_fields(value: &Value, diagnostics: &mut Vec<Diagnostic>) {
    let Some(root) = value.as_object() else {
        return;
    };
    let sections = known_sections();
    let section_names: Vec<&str> = sections.keys().copied().collect();

    for (key, child) in root {
        let Some(fields) = sections.get(key.as_str()) else {
            diagnostics.push(unknown_field(key.clone(), key, &section_names, true));
            continue;
        };
        let Some(table) = child.as_object() else {
            continue;
        };
        for field in table.keys().filter(|f| !fields.contains(&f.as_str())) {
            diagnostics.push(unknown_field(format!("{key}.{field}"), field, fields, false));
        }
    }
}

fn unknown_field(path: String, key: &str, candidates: &[&str], top_level: bool) -> Diagnostic {
    let level = if top_level {
        " at top level"
    } else {
        ""
    };
    let message = match suggest(key, candidates, 3) {
        Some(s) => format!("unknown field{level} (did you mean \"{s}\"?)"),
        None => format!("unknown field{level}"),
    };
    Diagnostic {
        severity: Severity::Error,
        category: "unknown-field",
        path,
        message,
    }
}

fn check_semantics(config: &PixelpostConfig, diagnostics: &mut Vec<Diagnostic>) {
    let mut push = |severity, path: &str, message: &str| {
        diagnostics.push(Diagnostic {
            severity,
            category: "delivery",
            path: path.into(),
            message: message.into(),
        });
    };

    let output = &config.output;
    if output.directory.trim().is_empty() {
        push(Severity::Error, "output.directory", "output directory is empty");
    }
    if output.filename_prefix.trim().is_empty() {
        push(
            Severity::Error,
            "output.filename_prefix",
            "filename prefix is empty",
        );
    } else if Path::new(&output.filename_prefix).is_absolute() {
        push(
            Severity::Error,
            "output.filename_prefix",
            "filename prefix must be relative to the output directory",
        );
    }

    if let Some(tg) = &config.telegram {
        let token = tg.token.expose_secret();
        if token.is_empty() {
            push(Severity::Error, "telegram.token", "bot token is empty");
        } else if token.contains("${") {
            push(
                Severity::Warning,
                "telegram.token",
                "bot token still contains an unresolved ${...} placeholder",
            );
        } else if !token.contains(':') {
            push(
                Severity::Warning,
                "telegram.token",
                "bot token does not look like <id>:<secret>",
            );
        }
        if tg.chat_id.trim().is_empty() {
            push(Severity::Error, "telegram.chat_id", "chat id is empty");
        }
        if tg.timeout_secs == 0 {
            push(
                Severity::Error,
                "telegram.timeout_secs",
                "timeout must be at least one second",
            );
        }
        if !is_http_url(&tg.api_url) {
            push(
                Severity::Error,
                "telegram.api_url",
                "api_url must start with http:// or https://",
            );
        }
    }

    if let Some(hook) = &config.webhook {
        if !is_http_url(&hook.callback_url) {
            push(
                Severity::Error,
                "webhook.callback_url",
                "callback_url must start with http:// or https://",
            );
        }
        if hook.id.is_empty() {
            push(
                Severity::Warning,
                "webhook.id",
                "job id is empty; the receiver cannot match callbacks",
            );
        }
        if hook.timeout_secs == 0 {
            push(
                Severity::Error,
                "webhook.timeout_secs",
                "timeout must be at least one second",
            );
        }
    }

    if config.telegram.is_none() && config.webhook.is_none() {
        push(
            Severity::Info,
            "",
            "no delivery target configured; pass everything on the command line",
        );
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    fn find<'a>(diagnostics: &'a [Diagnostic], path: &str) -> Option<&'a Diagnostic> {
        diagnostics.iter().find(|d| d.path == path)
    }

    fn errors(diagnostics: &[Diagnostic]) -> Vec<&Diagnostic> {
        diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .collect()
    }

    #[test]
    fn levenshtein_distances() {
        assert_eq!(levenshtein("chat_id", "chat_id"), 0);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("chatid", "chat_id"), 1);
        assert_eq!(levenshtein("telegarm", "telegram"), 2);
    }

    #[test]
    fn complete_config_has_no_errors() {
        let diagnostics = validate_value(json!({
            "output": {"directory": "out", "filename_prefix": "cats/run"},
            "telegram": {"token": "123:abc", "chat_id": "-100200", "grouping": "grouped"},
            "webhook": {"callback_url": "https://example.com/cb", "id": "job-9"},
        }));
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
    }

    #[test]
    fn empty_config_only_notes_missing_targets() {
        let diagnostics = validate_value(json!({}));
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].severity, Severity::Info);
    }

    #[test]
    fn misspelled_section_gets_suggestion() {
        let diagnostics = validate_value(json!({"telegarm": {"chat_id": "1"}}));
        let d = find(&diagnostics, "telegarm").unwrap();
        assert_eq!(d.category, "unknown-field");
        assert!(d.message.contains("\"telegram\""), "{}", d.message);
    }

    #[test]
    fn misspelled_field_gets_suggestion() {
        let diagnostics = validate_value(json!({
            "telegram": {"token": "1:a", "chatid": "1", "chat_id": "1"}
        }));
        let d = find(&diagnostics, "telegram.chatid").unwrap();
        assert!(d.message.contains("chat_id"));
        assert!(find(&diagnostics, "telegram.chat_id").is_none());
        assert!(find(&diagnostics, "telegram.token").is_none());
    }

    #[test]
    fn empty_token_and_chat_are_errors() {
        let diagnostics = validate_value(json!({"telegram": {"timeout_secs": 0}}));
        let paths: Vec<&str> = errors(&diagnostics).iter().map(|d| d.path.as_str()).collect();
        assert!(paths.contains(&"telegram.token"));
        assert!(paths.contains(&"telegram.chat_id"));
        assert!(paths.contains(&"telegram.timeout_secs"));
    }

    #[test]
    fn unresolved_placeholder_is_a_warning() {
        let diagnostics = validate_value(json!({
            "telegram": {"token": "${TG_TOKEN}", "chat_id": "1"}
        }));
        let d = find(&diagnostics, "telegram.token").unwrap();
        assert_eq!(d.severity, Severity::Warning);
    }

    #[test]
    fn bad_urls_are_errors() {
        let diagnostics = validate_value(json!({
            "telegram": {"token": "1:a", "chat_id": "1", "api_url": "api.telegram.org"},
            "webhook": {"callback_url": "", "id": "x"},
        }));
        assert!(find(&diagnostics, "telegram.api_url").is_some());
        assert!(find(&diagnostics, "webhook.callback_url").is_some());
    }

    #[test]
    fn wrong_type_is_reported() {
        let diagnostics = validate_value(json!({"telegram": {"send_as": "video"}}));
        assert!(diagnostics.iter().any(|d| d.category == "type-error"));
    }

    #[test]
    fn absolute_prefix_is_rejected() {
        let diagnostics = validate_value(json!({"output": {"filename_prefix": "/etc/x"}}));
        assert!(find(&diagnostics, "output.filename_prefix").is_some());
    }

    #[test]
    fn validates_file_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixelpost.toml");
        std::fs::write(&path, "[webhook]\ncallback_url = \"http://localhost/cb\"\nid = \"a\"\n")
            .unwrap();
        let result = validate(Some(&path));
        assert!(!result.has_errors(), "{:?}", result.diagnostics);
        assert_eq!(result.config_path.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn unreadable_file_is_a_syntax_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixelpost.toml");
        std::fs::write(&path, "[output\n").unwrap();
        let result = validate(Some(&path));
        assert!(result.has_errors());
        assert_eq!(result.count(Severity::Error), 1);
        assert_eq!(result.diagnostics[0].category, "syntax");
    }
}
