//! Supported conversation languages
//!
//! Codes follow the `xx-IN` locale form the upstream speech services accept.

use serde::Serialize;

/// Locale assumed when neither the transcription service nor the caller names one
pub const DEFAULT_LANGUAGE: &str = "en-IN";

/// Language selected by the interactive client before the user picks one
pub const CLIENT_DEFAULT_LANGUAGE: &str = "hi-IN";

/// A language the relay can transcribe and speak
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Language {
    pub code: &'static str,
    pub name: &'static str,
}

/// All languages offered to clients, in display order
pub const LANGUAGES: &[Language] = &[
    Language { code: "hi-IN", name: "Hindi" },
    Language { code: "en-IN", name: "English" },
    Language { code: "bn-IN", name: "Bengali" },
    Language { code: "gu-IN", name: "Gujarati" },
    Language { code: "kn-IN", name: "Kannada" },
    Language { code: "ml-IN", name: "Malayalam" },
    Language { code: "mr-IN", name: "Marathi" },
    Language { code: "od-IN", name: "Odia" },
    Language { code: "pa-IN", name: "Punjabi" },
    Language { code: "ta-IN", name: "Tamil" },
    Language { code: "te-IN", name: "Telugu" },
];

/// Look up a supported language by code (case-insensitive)
#[must_use]
pub fn find(code: &str) -> Option<&'static Language> {
    let code = code.trim();
    LANGUAGES.iter().find(|l| l.code.eq_ignore_ascii_case(code))
}

/// Whether `code` names a supported language
#[must_use]
pub fn is_supported(code: &str) -> bool {
    find(code).is_some()
}

/// Normalize a caller-provided hint to its canonical code
///
/// Blank hints are treated as absent. Unknown codes are passed through
/// trimmed so the upstream service decides whether it can handle them.
#[must_use]
pub fn normalize_hint(hint: Option<&str>) -> Option<String> {
    let hint = hint.map(str::trim).filter(|h| !h.is_empty())?;
    Some(find(hint).map_or_else(|| hint.to_string(), |l| l.code.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_is_case_insensitive() {
        assert_eq!(find("TA-in").map(|l| l.name), Some("Tamil"));
        assert!(find("fr-FR").is_none());
    }

    #[test]
    fn test_defaults_are_supported() {
        assert!(is_supported(DEFAULT_LANGUAGE));
        assert!(is_supported(CLIENT_DEFAULT_LANGUAGE));
    }

    #[test]
    fn test_normalize_hint() {
        assert_eq!(normalize_hint(Some(" hi-in ")).as_deref(), Some("hi-IN"));
        assert_eq!(normalize_hint(Some("xx-YY")).as_deref(), Some("xx-YY"));
        assert_eq!(normalize_hint(Some("   ")), None);
        assert_eq!(normalize_hint(None), None);
    }
}
