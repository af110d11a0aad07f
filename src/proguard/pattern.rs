// ProGuard wildcard patterns
//
// Class and type names:
//   ?     any single character except the package separator
//   *     any run of characters except the package separator
//   **    any run of characters, including package separators
//   ***   any type, including primitives and arrays
//   %     any primitive type
//   !     (leading) negates the whole pattern
//
// Parameter lists are comma separated type patterns; `...` matches any
// remaining parameters.

use crate::error::{AnalysisError, Result};
use regex::Regex;

const PRIMITIVES: &str = "(?:boolean|byte|char|short|int|long|float|double|void)";

/// A compiled name or type pattern
#[derive(Debug, Clone)]
pub struct NamePattern {
    source: String,
    negated: bool,
    /// `None` matches everything
    regex: Option<Regex>,
}

impl NamePattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let trimmed = pattern.trim();
        let (negated, body) = match trimmed.strip_prefix('!') {
            Some(rest) => (true, rest.trim()),
            None => (false, trimmed),
        };

        let regex = Regex::new(&to_regex(body)).map_err(|source| AnalysisError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;

        Ok(Self {
            source: trimmed.to_string(),
            negated,
            regex: Some(regex),
        })
    }

    /// Pattern matching every name
    pub fn any() -> Self {
        Self {
            source: "***".to_string(),
            negated: false,
            regex: None,
        }
    }

    pub fn matches(&self, text: &str) -> bool {
        self.regex.as_ref().map_or(true, |r| r.is_match(text)) != self.negated
    }

    /// True for `*`, `**` and `***`: the pattern names no specific target
    pub fn is_unconstrained(&self) -> bool {
        !self.negated && !self.source.is_empty() && self.source.chars().all(|c| c == '*')
    }
}

fn to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() * 2 + 2);
    out.push('^');

    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' => {
                let mut stars = 0;
                while i < chars.len() && chars[i] == '*' {
                    stars += 1;
                    i += 1;
                }
                out.push_str(if stars == 1 { "[^.]*" } else { ".*" });
                continue;
            }
            '?' => out.push_str("[^.]"),
            '%' => out.push_str(PRIMITIVES),
            c => out.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }

    out.push('$');
    out
}

#[derive(Debug, Clone)]
enum ParamElement {
    Type(NamePattern),
    Rest,
}

/// A compiled parameter list pattern such as `int,...`
#[derive(Debug, Clone)]
pub struct ParamPattern {
    elements: Vec<ParamElement>,
}

impl ParamPattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let trimmed = pattern.trim().trim_start_matches('(').trim_end_matches(')').trim();
        if trimmed.is_empty() {
            return Ok(Self { elements: Vec::new() });
        }

        let elements = trimmed
            .split(',')
            .map(|part| match part.trim() {
                "..." => Ok(ParamElement::Rest),
                ty => NamePattern::new(ty).map(ParamElement::Type),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { elements })
    }

    /// Pattern matching any parameter list
    pub fn any() -> Self {
        Self {
            elements: vec![ParamElement::Rest],
        }
    }

    pub fn matches(&self, params: &[String]) -> bool {
        match_elements(&self.elements, params)
    }
}

fn match_elements(elements: &[ParamElement], params: &[String]) -> bool {
    match elements.split_first() {
        None => params.is_empty(),
        Some((ParamElement::Rest, rest)) => (0..=params.len()).any(|skip| match_elements(rest, &params[skip..])),
        Some((ParamElement::Type(pattern), rest)) => params
            .split_first()
            .is_some_and(|(first, tail)| pattern.matches(first) && match_elements(rest, tail)),
    }
}
