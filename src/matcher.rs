// src/matcher.rs

//! Target matching
//!
//! A command-line target selects a package when it equals the archive file
//! name, equals the package name, or is a shell glob matching `name-version`.

use crate::cache::PackageCache;
use crate::db::models::Package;
use glob::{MatchOptions, Pattern};
use std::cell::OnceCell;

/// fnmatch(3) with no flags: case sensitive, `*` crosses `/` and leading dots
const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// A command-line target with its glob compiled once
#[derive(Debug, Clone)]
pub struct Target {
    raw: String,
    /// `None` when the target is not a valid glob; it can then only match
    /// exactly
    pattern: Option<Pattern>,
}

impl Target {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let pattern = Pattern::new(&translate(&raw)).ok();
        Self { raw, pattern }
    }

    /// Whether this target identifies `pkg`
    pub fn matches(&self, pkg: &Package) -> bool {
        self.matches_candidate(&Candidate::new(pkg))
    }

    fn matches_candidate(&self, candidate: &Candidate<'_>) -> bool {
        if self.raw.is_empty() {
            return false;
        }
        if self.raw == candidate.pkg.filename || self.raw == candidate.pkg.name {
            return true;
        }

        match &self.pattern {
            Some(pattern) => pattern.matches_with(candidate.full_name(), GLOB_OPTIONS),
            None => false,
        }
    }
}

/// Rewrite an fnmatch(3) pattern into the `glob` crate's dialect
///
/// Runs of `*` collapse into one and `\x` becomes a literal `x`. Bracket
/// expressions are copied through unchanged.
fn translate(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '*' => {
                while chars.next_if_eq(&'*').is_some() {}
                out.push('*');
            }
            '\\' => match chars.next() {
                Some(escaped) => out.push_str(&Pattern::escape(escaped.encode_utf8(&mut [0; 4]))),
                None => out.push('\\'),
            },
            '[' => {
                out.push('[');
                if let Some(bang) = chars.next_if_eq(&'!') {
                    out.push(bang);
                }
                // A leading ']' is a member, not the terminator
                if let Some(close) = chars.next_if_eq(&']') {
                    out.push(close);
                }
                for member in chars.by_ref() {
                    out.push(member);
                    if member == ']' {
                        break;
                    }
                }
            }
            _ => out.push(c),
        }
    }

    out
}

/// A package's identity, with `name-version` computed at most once
struct Candidate<'a> {
    pkg: &'a Package,
    full_name: OnceCell<String>,
}

impl<'a> Candidate<'a> {
    fn new(pkg: &'a Package) -> Self {
        Self {
            pkg,
            full_name: OnceCell::new(),
        }
    }

    fn full_name(&self) -> &str {
        self.full_name.get_or_init(|| self.pkg.full_name())
    }
}

/// Whether `target` identifies `pkg`
pub fn matches(pkg: &Package, target: &str) -> bool {
    Target::new(target).matches(pkg)
}

/// Whether any of `targets` identifies `pkg`
pub fn match_targets(pkg: &Package, targets: &[Target]) -> bool {
    let candidate = Candidate::new(pkg);
    targets.iter().any(|t| t.matches_candidate(&candidate))
}

/// Names of every cached record `target` identifies, in cache order
pub fn glob_cache(cache: &PackageCache, target: &str) -> Vec<String> {
    let target = Target::new(target);
    cache
        .iter()
        .filter(|pkg| target.matches(pkg))
        .map(|pkg| pkg.name.clone())
        .collect()
}
