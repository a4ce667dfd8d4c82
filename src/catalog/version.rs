//! Versions and version ranges.
//!
//! Requested versions are normalized to `major.minor.patch`: a leading `v`
//! is accepted and missing trailing components are zero-padded, so `"0.4"`
//! and `"v0.4.0"` are the same version.
//!
//! Ranges are parsed with the grammar in `version.pest` and compiled into
//! [`Predicate`]s once, when the catalog is loaded. The accepted operators
//! cover both the PEP 440 forms builder catalogs are usually written in
//! (`>=0.1.0, <0.2.0`, `~=0.1`, `==0.1.*`) and the semver shorthands (`^`,
//! `~`, `1.x`). See [`VersionReq`] for the exact meaning of each.

use std::fmt;
use std::str::FromStr;

use miette::Diagnostic;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use thiserror::Error;

#[derive(Parser)]
#[grammar = "catalog/version.pest"]
struct RangeGrammar;

// ============================================================================
// VERSIONS
// ============================================================================

/// A normalized `major.minor.patch` version.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    fn from_components(components: &[u64]) -> Self {
        let get = |i: usize| components.get(i).copied().unwrap_or(0);
        Self::new(get(0), get(1), get(2))
    }

    fn component(&self, index: usize) -> u64 {
        match index {
            0 => self.major,
            1 => self.minor,
            _ => self.patch,
        }
    }

    /// Increments the component at `index` and zeroes the ones after it.
    fn bump(&self, index: usize) -> Self {
        match index {
            0 => Self::new(self.major.saturating_add(1), 0, 0),
            1 => Self::new(self.major, self.minor.saturating_add(1), 0),
            _ => Self::new(self.major, self.minor, self.patch.saturating_add(1)),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl FromStr for Version {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        normalize(s).ok_or(())
    }
}

/// Normalizes a requested version; `None` when it is not a version at all.
pub fn normalize(raw: &str) -> Option<Version> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);
    let parts: Vec<&str> = digits.split('.').collect();
    if parts.is_empty() || parts.len() > 3 {
        return None;
    }
    let components = parts
        .iter()
        .map(|part| {
            if !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()) {
                part.parse::<u64>().ok()
            } else {
                None
            }
        })
        .collect::<Option<Vec<u64>>>()?;
    Some(Version::from_components(&components))
}

// ============================================================================
// RANGES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum RangeError {
    #[error("invalid version range `{range}`")]
    #[diagnostic(code(buildscope::catalog::range))]
    Syntax {
        range: String,
        #[help]
        message: String,
    },

    #[error("`~={pattern}` needs at least two version components")]
    #[diagnostic(
        code(buildscope::catalog::range),
        help("write `~=1.0` instead of `~=1`")
    )]
    CompatibleRelease { pattern: String },
}

/// One comparator of a range.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Predicate {
    Any,
    Never,
    Exactly(Version),
    Not(Version),
    AtLeast(Version),
    Above(Version),
    AtMost(Version),
    Below(Version),
    /// `[low, high)`
    Within(Version, Version),
    /// Complement of `Within`.
    Outside(Version, Version),
}

impl Predicate {
    fn matches(&self, version: &Version) -> bool {
        match self {
            Predicate::Any => true,
            Predicate::Never => false,
            Predicate::Exactly(v) => version == v,
            Predicate::Not(v) => version != v,
            Predicate::AtLeast(v) => version >= v,
            Predicate::Above(v) => version > v,
            Predicate::AtMost(v) => version <= v,
            Predicate::Below(v) => version < v,
            Predicate::Within(low, high) => version >= low && version < high,
            Predicate::Outside(low, high) => version < low || version >= high,
        }
    }
}

/// A compiled version range.
///
/// | Operator | Meaning |
/// |---|---|
/// | none, `=` | exact when fully specified, otherwise the prefix range (`0.1` is `>=0.1.0 <0.2.0`) |
/// | `==`, `===` | zero-padded exact; wildcards give the prefix range |
/// | `!=` | negation of `==` |
/// | `>=` `>` `<=` `<` | ordered comparison against the zero-padded pattern, so `<=0.2` is `<=0.2.0` and `>1.x` is `>1.0.0` (npm would read `<0.3.0` and `>=2.0.0`) |
/// | `~=` | compatible release: `~=0.1.2` is `>=0.1.2 <0.2.0`, `~=0.1` is `>=0.1.0 <1.0.0` |
/// | `^` | leftmost non-zero component fixed |
/// | `~` | `~1.2.3` is `>=1.2.3 <1.3.0`, `~1` is `>=1.0.0 <2.0.0` |
///
/// Comparators separated by commas or whitespace must all hold; `||`
/// separates alternatives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionReq {
    raw: String,
    alternatives: Vec<Vec<Predicate>>,
}

impl VersionReq {
    pub fn parse(raw: &str) -> Result<Self, RangeError> {
        let mut pairs = RangeGrammar::parse(Rule::range, raw).map_err(|e| RangeError::Syntax {
            range: raw.to_string(),
            message: e.to_string(),
        })?;
        let range = pairs.next().ok_or_else(|| RangeError::Syntax {
            range: raw.to_string(),
            message: "empty range".to_string(),
        })?;

        let alternatives = range
            .into_inner()
            .filter(|pair| pair.as_rule() == Rule::alternative)
            .map(|alternative| {
                alternative
                    .into_inner()
                    .map(compile_comparator)
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            raw: raw.to_string(),
            alternatives,
        })
    }

    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives
            .iter()
            .any(|all| all.iter().all(|predicate| predicate.matches(version)))
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for VersionReq {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionReq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

// ============================================================================
// COMPILATION
// ============================================================================

/// A version pattern: numeric components up to the first wildcard.
struct Pattern {
    text: String,
    fixed: Vec<u64>,
    wildcard: bool,
}

impl Pattern {
    fn from_pair(pair: Pair<Rule>) -> Result<Self, RangeError> {
        let text = pair.as_str().to_string();
        let mut fixed = Vec::new();
        let mut wildcard = false;
        for component in pair.into_inner() {
            let value = component.as_str();
            if matches!(value, "*" | "x" | "X") {
                wildcard = true;
            } else if !wildcard {
                let number = value.parse::<u64>().map_err(|e| RangeError::Syntax {
                    range: text.clone(),
                    message: e.to_string(),
                })?;
                fixed.push(number);
            }
        }
        Ok(Self {
            text,
            fixed,
            wildcard,
        })
    }

    fn padded(&self) -> Version {
        Version::from_components(&self.fixed)
    }

    fn is_exact(&self) -> bool {
        !self.wildcard && self.fixed.len() == 3
    }

    /// Versions starting with the fixed components.
    fn prefix_range(&self) -> Predicate {
        match self.fixed.len() {
            0 => Predicate::Any,
            3 => Predicate::Exactly(self.padded()),
            n => Predicate::Within(self.padded(), self.padded().bump(n - 1)),
        }
    }
}

fn compile_comparator(pair: Pair<Rule>) -> Result<Predicate, RangeError> {
    let mut operator = "";
    let mut pattern = None;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::operator => operator = inner.as_str(),
            Rule::pattern => pattern = Some(Pattern::from_pair(inner)?),
            _ => {}
        }
    }
    let Some(pattern) = pattern else {
        return Ok(Predicate::Any);
    };

    // Wildcard-only patterns under an ordering operator constrain nothing.
    if pattern.fixed.is_empty() && operator != "!=" {
        return Ok(Predicate::Any);
    }

    let padded = pattern.padded();
    let predicate = match operator {
        "" | "=" | "==" | "===" => {
            let plain = operator.is_empty() || operator == "=";
            if pattern.wildcard || (plain && !pattern.is_exact()) {
                pattern.prefix_range()
            } else {
                Predicate::Exactly(padded)
            }
        }
        "!=" => match pattern.prefix_range() {
            _ if !pattern.wildcard => Predicate::Not(padded),
            Predicate::Any => Predicate::Never,
            Predicate::Within(low, high) => Predicate::Outside(low, high),
            Predicate::Exactly(v) => Predicate::Not(v),
            other => other,
        },
        ">=" => Predicate::AtLeast(padded),
        ">" => Predicate::Above(padded),
        "<=" => Predicate::AtMost(padded),
        "<" => Predicate::Below(padded),
        "~=" => {
            if pattern.fixed.len() < 2 {
                return Err(RangeError::CompatibleRelease {
                    pattern: pattern.text,
                });
            }
            Predicate::Within(padded, padded.bump(pattern.fixed.len() - 2))
        }
        "^" => {
            let fixed = pattern.fixed.len();
            let pivot = (0..fixed)
                .find(|&i| padded.component(i) != 0)
                .unwrap_or(fixed - 1);
            Predicate::Within(padded, padded.bump(pivot))
        }
        "~" => {
            let pivot = if pattern.fixed.len() >= 2 { 1 } else { 0 };
            Predicate::Within(padded, padded.bump(pivot))
        }
        other => {
            return Err(RangeError::Syntax {
                range: pattern.text,
                message: format!("unsupported operator `{other}`"),
            })
        }
    };
    Ok(predicate)
}
