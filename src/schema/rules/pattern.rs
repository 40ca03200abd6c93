//! Full-match regular expressions for the `pattern` constraint.
use regex::Regex;

/// Compiles `pattern` anchored at both ends, so a match must consume the
/// whole value rather than a prefix of it.
pub fn compile(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{})$", pattern))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("abc", "abc", true)]
    #[case("abc", "abcd", false)]
    #[case("abc", "xabc", false)]
    #[case("a|ab", "ab", true)]
    #[case("[0-9]+", "123", true)]
    #[case("[0-9]+", "123a", false)]
    fn test_full_match(#[case] pattern: &str, #[case] text: &str, #[case] expected: bool) {
        assert_eq!(compile(pattern).unwrap().is_match(text), expected);
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        assert!(compile("([a-z]").is_err());
    }
}
