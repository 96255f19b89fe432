//! Startup validation of a loaded configuration.
//!
//! Errors make the process refuse to start; warnings are logged and
//! tolerated.

use secrecy::ExposeSecret;

use crate::schema::TunedropConfig;

/// Telegram's documented upload limit for bots.
const TRANSPORT_MAX_BYTES: u64 = 50 * 1000 * 1000;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "delivery.size_budget_bytes"
    pub path: &'static str,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} [{}]: {}", self.severity, self.path, self.message)
    }
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    fn push(&mut self, severity: Severity, path: &'static str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            path,
            message: message.into(),
        });
    }
}

/// Check a loaded config for values the bot cannot run with.
pub fn validate(config: &TunedropConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    let token = config.bot_token.expose_secret();
    if token.trim().is_empty() {
        result.push(Severity::Error, "bot_token", "bot token is empty");
    } else if token.contains('$') {
        result.push(
            Severity::Warning,
            "bot_token",
            "bot token contains '$'; an env placeholder may be unresolved",
        );
    }

    let delivery = &config.delivery;
    if delivery.size_budget_bytes == 0 {
        result.push(
            Severity::Error,
            "delivery.size_budget_bytes",
            "size budget must be greater than zero",
        );
    } else if delivery.size_budget_bytes >= TRANSPORT_MAX_BYTES {
        result.push(
            Severity::Warning,
            "delivery.size_budget_bytes",
            format!(
                "size budget {} leaves no headroom below the {TRANSPORT_MAX_BYTES} byte upload limit",
                delivery.size_budget_bytes
            ),
        );
    }

    if delivery.audio_bitrate_kbps == 0 {
        result.push(
            Severity::Error,
            "delivery.audio_bitrate_kbps",
            "audio bitrate must be greater than zero",
        );
    }

    if delivery.audio_format.trim().is_empty() {
        result.push(
            Severity::Error,
            "delivery.audio_format",
            "audio format must not be empty",
        );
    } else if !delivery
        .audio_format
        .chars()
        .all(|c| c.is_ascii_alphanumeric())
    {
        result.push(
            Severity::Error,
            "delivery.audio_format",
            format!(
                "audio format {:?} must be a bare extension such as \"mp3\"",
                delivery.audio_format
            ),
        );
    }

    if config.tools.acquire_timeout_secs == 0 {
        result.push(
            Severity::Error,
            "tools.acquire_timeout_secs",
            "timeout must be greater than zero",
        );
    }
    if config.tools.segment_timeout_secs == 0 {
        result.push(
            Severity::Error,
            "tools.segment_timeout_secs",
            "timeout must be greater than zero",
        );
    }

    result
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, secrecy::Secret};

    fn valid() -> TunedropConfig {
        TunedropConfig {
            bot_token: Secret::new("123:ABC".into()),
            ..Default::default()
        }
    }

    #[test]
    fn defaults_with_token_are_valid() {
        let result = validate(&valid());
        assert!(!result.has_errors(), "{:?}", result.diagnostics);
        assert_eq!(result.warnings().count(), 0);
    }

    #[test]
    fn empty_token_is_an_error() {
        let result = validate(&TunedropConfig::default());
        assert!(result.has_errors());
        assert!(result.errors().any(|d| d.path == "bot_token"));
    }

    #[test]
    fn unresolved_placeholder_warns() {
        let cfg = TunedropConfig {
            bot_token: Secret::new("${TELEGRAM_TOKEN}".into()),
            ..Default::default()
        };
        let result = validate(&cfg);
        assert!(!result.has_errors());
        assert!(result.warnings().any(|d| d.path == "bot_token"));
    }

    #[test]
    fn zero_budget_and_bitrate_are_errors() {
        let mut cfg = valid();
        cfg.delivery.size_budget_bytes = 0;
        cfg.delivery.audio_bitrate_kbps = 0;
        let paths: Vec<_> = validate(&cfg).errors().map(|d| d.path).collect();
        assert!(paths.contains(&"delivery.size_budget_bytes"));
        assert!(paths.contains(&"delivery.audio_bitrate_kbps"));
    }

    #[test]
    fn budget_at_transport_limit_warns() {
        let mut cfg = valid();
        cfg.delivery.size_budget_bytes = TRANSPORT_MAX_BYTES;
        let result = validate(&cfg);
        assert!(!result.has_errors());
        assert!(
            result
                .warnings()
                .any(|d| d.path == "delivery.size_budget_bytes")
        );
    }

    #[test]
    fn audio_format_must_be_bare_extension() {
        let mut cfg = valid();
        cfg.delivery.audio_format = "../mp3".into();
        assert!(validate(&cfg).errors().any(|d| d.path == "delivery.audio_format"));
    }

    #[test]
    fn diagnostic_display() {
        let d = Diagnostic {
            severity: Severity::Error,
            path: "bot_token",
            message: "bot token is empty".into(),
        };
        assert_eq!(d.to_string(), "error [bot_token]: bot token is empty");
    }
}
