//! Ordered text rules: a matcher paired with an action.
//!
//! The cleaner's denylists (translation menus, promos, embed counters,
//! listicle openers) and the validator's URL checks are all expressed as
//! `Vec<Rule>` evaluated top to bottom, so extending them is a data change.

use anyhow::{Context, Result};
use regex::Regex;
use std::borrow::Cow;

#[derive(Debug, Clone)]
pub enum Matcher {
    Prefix(String),
    Contains(String),
    Pattern(Regex),
}

impl Matcher {
    pub fn prefix(s: &str) -> Self {
        Matcher::Prefix(s.to_string())
    }

    pub fn contains(s: &str) -> Self {
        Matcher::Contains(s.to_string())
    }

    pub fn pattern(re: &str) -> Result<Self> {
        let compiled = Regex::new(re).with_context(|| format!("Invalid rule pattern: {}", re))?;
        Ok(Matcher::Pattern(compiled))
    }

    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Matcher::Prefix(p) => text.starts_with(p.as_str()),
            Matcher::Contains(s) => text.contains(s.as_str()),
            Matcher::Pattern(re) => re.is_match(text),
        }
    }

    /// Remove every occurrence of the matched text.
    pub fn strip<'a>(&self, text: &'a str) -> Cow<'a, str> {
        match self {
            Matcher::Prefix(p) => match text.strip_prefix(p.as_str()) {
                Some(rest) => Cow::Borrowed(rest),
                None => Cow::Borrowed(text),
            },
            Matcher::Contains(s) if text.contains(s.as_str()) => Cow::Owned(text.replace(s.as_str(), "")),
            Matcher::Contains(_) => Cow::Borrowed(text),
            Matcher::Pattern(re) => re.replace_all(text, ""),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Discard the whole input (line, page, URL)
    Drop,
    /// Remove the matched text and keep the rest
    Strip,
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub name: &'static str,
    pub matcher: Matcher,
    pub action: Action,
}

impl Rule {
    pub fn drop(name: &'static str, matcher: Matcher) -> Self {
        Self {
            name,
            matcher,
            action: Action::Drop,
        }
    }

    pub fn strip(name: &'static str, matcher: Matcher) -> Self {
        Self {
            name,
            matcher,
            action: Action::Strip,
        }
    }
}

/// Result of running a rule list over one input.
#[derive(Debug, PartialEq)]
pub enum Verdict<'a> {
    Keep(Cow<'a, str>),
    Dropped { rule: &'static str },
}

/// Evaluate rules in order. The first matching `Drop` rule wins; `Strip`
/// rules rewrite the text seen by the rules after them.
pub fn apply<'a>(rules: &[Rule], text: &'a str) -> Verdict<'a> {
    let mut current: Cow<'a, str> = Cow::Borrowed(text);
    for rule in rules {
        if !rule.matcher.is_match(&current) {
            continue;
        }
        match rule.action {
            Action::Drop => return Verdict::Dropped { rule: rule.name },
            Action::Strip => {
                let stripped = rule.matcher.strip(&current).into_owned();
                current = Cow::Owned(stripped);
            }
        }
    }
    Verdict::Keep(current)
}

/// First rule matching `text`, regardless of action.
pub fn first_match<'r>(rules: &'r [Rule], text: &str) -> Option<&'r Rule> {
    rules.iter().find(|r| r.matcher.is_match(text))
}
