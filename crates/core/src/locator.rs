//! Turns a screen dump plus a UI expression into a tap coordinate.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::logger;
use crate::types::{BoundingBox, Point};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LocateError {
    #[error("no match for expression {pattern}")]
    NotFound { pattern: String },

    #[error("no expression registered for element {name}")]
    UnknownElement { name: String },

    #[error("malformed bounds literal {literal:?}")]
    Parse { literal: String },
}

fn bounds_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*\[(\d+),(\d+)\]\[(\d+),(\d+)\]\s*$")
            .unwrap_or_else(|e| panic!("bounds regex: {}", e))
    })
}

/// Parse a `[x1,y1][x2,y2]` literal. Rejects anything else, including
/// negative coordinates, inverted boxes and out-of-range numbers.
pub fn parse_bounds(literal: &str) -> Result<BoundingBox, LocateError> {
    let parse_err = || LocateError::Parse { literal: literal.to_string() };

    let caps = bounds_re().captures(literal).ok_or_else(parse_err)?;
    let mut n = [0i32; 4];
    for (i, slot) in n.iter_mut().enumerate() {
        *slot = caps[i + 1].parse().map_err(|_| parse_err())?;
    }

    let [l, t, r, b] = n;
    if r < l || b < t {
        return Err(parse_err());
    }
    Ok(BoundingBox { l, t, r, b })
}

/// Apply `pattern` to `screen` and return the center of the bounds captured
/// by its first group.
///
/// A non-match is logged and returned as [`LocateError::NotFound`]; while
/// polling that is the expected outcome, not a failure of the locator.
pub fn locate(pattern: &Regex, screen: &str) -> Result<Point, LocateError> {
    let Some(literal) = pattern
        .captures(screen)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
    else {
        logger::warn_p("locate", &format!("unable to find match for exp {}", pattern.as_str()));
        return Err(LocateError::NotFound {
            pattern: pattern.as_str().to_string(),
        });
    };

    let bounds = parse_bounds(literal)?;
    Ok(bounds.center())
}
