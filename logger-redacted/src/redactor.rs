use base64::{engine::general_purpose, Engine as _};
use lazy_static::lazy_static;
use regex::Regex;
use sha2::{Digest, Sha256};

// Patterns are literals; compilation cannot fail at runtime.
#[allow(clippy::unwrap_used)]
mod patterns {
    use super::*;

    lazy_static! {
        pub static ref BEARER_REGEX: Regex = Regex::new(r"(?i)\bbearer\s+[A-Za-z0-9\-._~+/]+=*").unwrap();
        pub static ref SECRET_PAIR_REGEX: Regex = Regex::new(
            r#"(?i)\b(api[_-]?token|token|secret|client[_-]?secret|password|authorization)(["']?\s*[:=]\s*["']?)([^\s"',}&]+)"#
        )
        .unwrap();
        pub static ref EMAIL_REGEX: Regex = Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap();
    }
}

use patterns::{BEARER_REGEX, EMAIL_REGEX, SECRET_PAIR_REGEX};

/// Redaction configuration
#[derive(Debug, Clone)]
pub struct RedactionConfig {
    pub redact_bearer_tokens: bool,
    pub redact_secret_pairs: bool,
    pub redact_emails: bool,
    pub hash_for_correlation: bool,
    pub custom_patterns: Vec<(Regex, String)>,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            redact_bearer_tokens: true,
            redact_secret_pairs: true,
            redact_emails: true,
            hash_for_correlation: true,
            custom_patterns: Vec::new(),
        }
    }
}

/// Masks credentials and identities in text before it reaches a log sink.
///
/// Authorization-engine error bodies echo request headers and tuple users, so
/// they pass through here before being logged.
#[derive(Debug, Clone, Default)]
pub struct CredentialRedactor {
    config: RedactionConfig,
}

impl CredentialRedactor {
    pub fn new(config: RedactionConfig) -> Self {
        Self { config }
    }

    pub fn redact(&self, text: &str) -> String {
        let mut result = text.to_string();

        if self.config.redact_bearer_tokens {
            result = BEARER_REGEX.replace_all(&result, "Bearer [REDACTED]").into_owned();
        }

        if self.config.redact_secret_pairs {
            result = SECRET_PAIR_REGEX
                .replace_all(&result, "${1}${2}[REDACTED]")
                .into_owned();
        }

        if self.config.redact_emails {
            result = self.redact_emails(&result);
        }

        for (pattern, replacement) in &self.config.custom_patterns {
            result = pattern.replace_all(&result, replacement.as_str()).into_owned();
        }

        result
    }

    fn redact_emails(&self, text: &str) -> String {
        EMAIL_REGEX
            .replace_all(text, |caps: &regex::Captures| {
                let email = &caps[0];
                if self.config.hash_for_correlation {
                    format!("EMAIL[{}]", hash_value(email))
                } else {
                    let (local, domain) = email.split_once('@').unwrap_or((email, ""));
                    let first = local.chars().next().map(String::from).unwrap_or_default();
                    let domain_first = domain.chars().next().map(String::from).unwrap_or_default();
                    format!("{first}***@{domain_first}***")
                }
            })
            .into_owned()
    }
}

/// Short, stable digest so redacted values can still be correlated across
/// log lines
pub fn hash_value(value: &str) -> String {
    let digest = Sha256::digest(value.as_bytes());
    general_purpose::STANDARD_NO_PAD.encode(&digest[..8])
}
