//! `sub_type_pattern` (§3 "Observer"): "either an exact string or a
//! compiled regex; a null pattern matches anything of the given type."

use regex::Regex;

pub enum SubTypePattern {
    /// A null pattern: matches any sub-type of the given message type.
    Any,
    Exact(String),
    Regex(Regex),
}

impl SubTypePattern {
    pub fn matches(&self, sub_type: &str) -> bool {
        match self {
            SubTypePattern::Any => true,
            SubTypePattern::Exact(expected) => expected == sub_type,
            SubTypePattern::Regex(re) => re.is_match(sub_type),
        }
    }
}

impl From<&str> for SubTypePattern {
    fn from(s: &str) -> Self {
        SubTypePattern::Exact(s.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn regex_pattern_matches_prefix_family() {
        let pattern = SubTypePattern::Regex(Regex::new(r"^item-\d+$").unwrap());
        assert!(pattern.matches("item-42"));
        assert!(!pattern.matches("item-"));
    }

    #[test]
    fn any_pattern_matches_everything() {
        assert!(SubTypePattern::Any.matches(""));
        assert!(SubTypePattern::Any.matches("whatever"));
    }
}
