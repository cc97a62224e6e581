//! Test selection from command-line specs
//!
//! Each positional argument is a spec; commas inside a spec separate further
//! alternatives. A test runs if any alternative selects it. Within one
//! alternative every pattern must match:
//!
//! | Pattern | Matches |
//! |---|---|
//! | `Support for*` | test name, `*` matches any run of characters |
//! | `[Parallel]` | tests carrying the tag |
//! | `[Serial][Case_cavity]` | tests carrying both tags |
//! | `~[Parallel]`, `~name` | tests not matched by the pattern |
//!
//! Name and tag comparison is case-insensitive. Hidden tests (`[.]`,
//! `[!hide]`, `[.name]`) only run when an alternative with a positive
//! pattern selects them.

use crate::error::{EngineError, Result};
use crate::registry::TestCase;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Pattern {
    Name(String),
    Tag(String),
}

impl Pattern {
    fn matches(&self, case: &TestCase) -> bool {
        match self {
            Pattern::Name(glob) => wildcard_match(glob, &case.name().to_lowercase()),
            Pattern::Tag(tag) => {
                case.tags().contains(tag)
                    || (tag == "." && case.tags().is_hidden())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Term {
    pattern: Pattern,
    negated: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Alternative {
    terms: Vec<Term>,
}

impl Alternative {
    fn matches(&self, case: &TestCase) -> bool {
        let has_positive = self.terms.iter().any(|t| !t.negated);
        if case.tags().is_hidden() && !has_positive {
            return false;
        }
        self.terms
            .iter()
            .all(|t| t.pattern.matches(case) != t.negated)
    }
}

/// Parsed test selection. An empty spec selects every visible test.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestSpec {
    alternatives: Vec<Alternative>,
}

impl TestSpec {
    /// Parse the positional test specs of a command line.
    ///
    /// # Errors
    ///
    /// Returns an error on unbalanced brackets, empty tags, or a dangling
    /// `~`.
    pub fn parse<S: AsRef<str>>(specs: &[S]) -> Result<Self> {
        let mut alternatives = Vec::new();
        for spec in specs {
            for part in spec.as_ref().split(',') {
                let alternative = parse_alternative(part).map_err(|reason| {
                    EngineError::InvalidSpec {
                        spec: spec.as_ref().to_string(),
                        reason,
                    }
                })?;
                if !alternative.terms.is_empty() {
                    alternatives.push(alternative);
                }
            }
        }
        Ok(Self { alternatives })
    }

    /// Whether no filter was given
    pub fn is_empty(&self) -> bool {
        self.alternatives.is_empty()
    }

    /// Whether the spec selects `case`
    pub fn matches(&self, case: &TestCase) -> bool {
        if self.alternatives.is_empty() {
            return !case.tags().is_hidden();
        }
        self.alternatives.iter().any(|alt| alt.matches(case))
    }
}

fn parse_alternative(text: &str) -> std::result::Result<Alternative, String> {
    let mut terms = Vec::new();
    let mut negated = false;
    let mut name = String::new();
    let mut chars = text.chars().peekable();

    let flush_name = |name: &mut String, negated: &mut bool, terms: &mut Vec<Term>| {
        let trimmed = name.trim();
        if !trimmed.is_empty() {
            terms.push(Term {
                pattern: Pattern::Name(trimmed.to_lowercase()),
                negated: *negated,
            });
            *negated = false;
        }
        name.clear();
    };

    while let Some(c) = chars.next() {
        match c {
            '~' if name.trim().is_empty() => {
                name.clear();
                negated = true;
            }
            '[' => {
                flush_name(&mut name, &mut negated, &mut terms);
                let mut tag = String::new();
                loop {
                    match chars.next() {
                        Some(']') => break,
                        Some('[') | None => return Err("unclosed tag".to_string()),
                        Some(c) => tag.push(c),
                    }
                }
                let tag = tag.trim();
                if tag.is_empty() {
                    return Err("empty tag".to_string());
                }
                terms.push(Term {
                    pattern: Pattern::Tag(tag.to_string()),
                    negated,
                });
                negated = false;
            }
            ']' => return Err("unexpected ']'".to_string()),
            '\\' => {
                if let Some(escaped) = chars.next() {
                    name.push(escaped);
                }
            }
            c => name.push(c),
        }
    }
    flush_name(&mut name, &mut negated, &mut terms);
    if negated {
        return Err("'~' must be followed by a pattern".to_string());
    }
    Ok(Alternative { terms })
}

/// Match `text` against a pattern where `*` stands for any run of
/// characters.
fn wildcard_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && pattern[p] == '*' {
            backtrack = Some((p, t));
            p += 1;
        } else if p < pattern.len() && pattern[p] == text[t] {
            p += 1;
            t += 1;
        } else if let Some((star, matched)) = backtrack {
            p = star + 1;
            t = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|c| *c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TestContext;
    use crate::registry::TestRegistry;

    fn noop(_: &mut TestContext) -> anyhow::Result<()> {
        Ok(())
    }

    fn registry() -> TestRegistry {
        let mut registry = TestRegistry::new();
        registry
            .register("Support for serial and parallel runs", "[Serial][Parallel][Case_cavity]", noop)
            .unwrap()
            .register("Serial only mesh check", "[Serial]", noop)
            .unwrap()
            .register("Parallel only reduction", "[Parallel][nProcs_2]", noop)
            .unwrap()
            .register("Slow decomposition sweep", "[.][Parallel]", noop)
            .unwrap();
        registry
    }

    fn selected(specs: &[&str]) -> Vec<String> {
        let spec = TestSpec::parse(specs).unwrap();
        registry()
            .cases()
            .iter()
            .filter(|c| spec.matches(c))
            .map(|c| c.name().to_string())
            .collect()
    }

    #[test]
    fn test_empty_spec_selects_visible_tests() {
        let names = selected(&[]);
        assert_eq!(names.len(), 3);
        assert!(!names.iter().any(|n| n.starts_with("Slow")));
    }

    #[test]
    fn test_tag_filter() {
        assert_eq!(
            selected(&["[Parallel]"]),
            vec![
                "Support for serial and parallel runs",
                "Parallel only reduction",
                "Slow decomposition sweep",
            ]
        );
    }

    #[test]
    fn test_tags_are_anded() {
        assert_eq!(
            selected(&["[serial][case_cavity]"]),
            vec!["Support for serial and parallel runs"]
        );
    }

    #[test]
    fn test_negation_does_not_reveal_hidden() {
        assert_eq!(
            selected(&["~[Serial]"]),
            vec!["Parallel only reduction"]
        );
    }

    #[test]
    fn test_name_wildcards() {
        assert_eq!(selected(&["*only*"]).len(), 2);
        assert_eq!(
            selected(&["support for*"]),
            vec!["Support for serial and parallel runs"]
        );
        assert!(selected(&["Support"]).is_empty());
    }

    #[test]
    fn test_alternatives_are_ored() {
        assert_eq!(selected(&["Serial only mesh check", "[nProcs_2]"]).len(), 2);
        assert_eq!(selected(&["Serial only mesh check,[nProcs_2]"]).len(), 2);
    }

    #[test]
    fn test_hidden_selected_explicitly() {
        assert_eq!(selected(&["[.]"]), vec!["Slow decomposition sweep"]);
        assert_eq!(selected(&["Slow*"]), vec!["Slow decomposition sweep"]);
    }

    #[test]
    fn test_malformed_specs() {
        assert!(TestSpec::parse(&["[Serial"]).is_err());
        assert!(TestSpec::parse(&["Serial]"]).is_err());
        assert!(TestSpec::parse(&["[]"]).is_err());
        assert!(TestSpec::parse(&["~"]).is_err());
    }

    #[test]
    fn test_wildcard_match() {
        assert!(wildcard_match("*", ""));
        assert!(wildcard_match("a*c", "abbbc"));
        assert!(wildcard_match("*b*", "abc"));
        assert!(!wildcard_match("a*d", "abc"));
        assert!(wildcard_match("abc", "abc"));
    }
}
