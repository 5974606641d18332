use regex::Regex;
use std::sync::OnceLock;

fn fence() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?s)```(?:python3|python|py)[ \t]*\r?\n(.*?)\r?\n```")
            .expect("code fence pattern is valid")
    })
}

/// Returns the interior of the first fenced Python block in `text`, or an
/// empty string when there is none. Callers treat empty as "nothing generated".
pub fn extract_code(text: &str) -> String {
    fence()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}
