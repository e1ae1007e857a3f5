use regex::Regex;

/// Compile a built-in pattern. Every pattern is a literal exercised by the unit tests.
pub(crate) fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in pattern must compile")
}
