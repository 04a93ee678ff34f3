//! Provider detection by API-key prefix.

/// A chat-completion provider and the models used against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Provider {
    /// Short name, used in logs and status output.
    pub name: &'static str,
    /// Chat-completion endpoint URL.
    pub endpoint: &'static str,
    /// Model used for tactical move requests.
    pub tactical_model: &'static str,
    /// Smaller model used for memory updates.
    pub memory_model: &'static str,
    /// Whether the endpoint accepts strict `json_schema` response formats.
    /// Providers without it get `json_object` mode instead.
    pub supports_schema: bool,
}

/// Groq's OpenAI-compatible endpoint.
pub const GROQ: Provider = Provider {
    name: "groq",
    endpoint: "https://api.groq.com/openai/v1/chat/completions",
    tactical_model: "llama-3.3-70b-versatile",
    memory_model: "llama-3.1-8b-instant",
    supports_schema: false,
};

/// OpenAI.
pub const OPENAI: Provider = Provider {
    name: "openai",
    endpoint: "https://api.openai.com/v1/chat/completions",
    tactical_model: "gpt-4o-mini",
    memory_model: "gpt-4o-mini",
    supports_schema: true,
};

/// Key prefixes checked in order; first match wins.
const PREFIX_TABLE: [(&str, &Provider); 2] = [("gsk_", &GROQ), ("sk-", &OPENAI)];

impl Provider {
    /// Detect the provider from an API key prefix.
    ///
    /// Unknown prefixes fall back to `default`.
    #[must_use]
    pub fn detect(api_key: &str, default: &'static Provider) -> &'static Provider {
        for (prefix, provider) in PREFIX_TABLE {
            if api_key.starts_with(prefix) {
                return provider;
            }
        }
        default
    }

    /// Look up a provider by its short name.
    #[must_use]
    pub fn by_name(name: &str) -> Option<&'static Provider> {
        match name {
            "groq" => Some(&GROQ),
            "openai" => Some(&OPENAI),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_groq_keys() {
        let p = Provider::detect("gsk_abc123", &OPENAI);
        assert_eq!(p.name, "groq");
        assert!(!p.supports_schema);
    }

    #[test]
    fn test_detects_openai_keys() {
        let p = Provider::detect("sk-proj-abc123", &GROQ);
        assert_eq!(p.name, "openai");
        assert!(p.supports_schema);
    }

    #[test]
    fn test_unknown_prefix_falls_back() {
        let p = Provider::detect("xyz-unknown", &GROQ);
        assert_eq!(p.name, "groq");
    }

    #[test]
    fn test_lookup_by_name() {
        assert_eq!(Provider::by_name("openai"), Some(&OPENAI));
        assert_eq!(Provider::by_name("groq"), Some(&GROQ));
        assert_eq!(Provider::by_name("anthropic"), None);
    }
}
