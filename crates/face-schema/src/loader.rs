//! Loader for `.iface` schema text.
//!
//! The schema is a line-oriented format. Relevant record kinds:
//!
//! ```text
//! # comment attached to the next feature
//! cat Basic
//! val INDIC_MAX=31
//! fun void AddText=2001(int length, string text)
//! get int GetCurrentPos=2008(,)
//! set void SetCurrentPos=2141(position caret,)
//! ```
//!
//! `evt`, `enu`, `lex`, and `ali` records are recognized and skipped: events
//! and enumeration groupings are not part of the command interface. Errors
//! are collected with byte spans rather than aborting at the first bad line,
//! so the caller can report all of them at once.

use rustc_hash::FxHashSet;
use std::fmt;

use serde::Serialize;

use crate::feature::{Param, RawFeature, RawKind};

/// A loader error with location information.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    /// Byte range of the offending line.
    pub span: (usize, usize),
    /// 1-based source line.
    pub line: usize,
}

/// The specific kind of loader error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ParseErrorKind {
    /// The line starts with a record kind the loader does not know.
    UnknownRecordKind(String),
    /// A `val` record without an `=` separator.
    MissingValue(String),
    /// A feature record missing its `name=opcode` part.
    MissingOpcode(String),
    /// A feature record missing or truncating its parameter list.
    MalformedParamList(String),
    /// A parameter slot that is neither empty nor `type name[=value]`.
    MalformedParam(String),
    /// More than two parameter slots.
    TooManyParams(String),
    /// A second record with an already-declared name.
    DuplicateFeature(String),
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownRecordKind(k) => write!(f, "unknown record kind: {k}"),
            Self::MissingValue(n) => write!(f, "constant `{n}` has no value"),
            Self::MissingOpcode(n) => write!(f, "feature `{n}` has no opcode"),
            Self::MalformedParamList(n) => write!(f, "feature `{n}` has a malformed parameter list"),
            Self::MalformedParam(p) => write!(f, "malformed parameter: {p}"),
            Self::TooManyParams(n) => write!(f, "feature `{n}` declares more than two parameters"),
            Self::DuplicateFeature(n) => write!(f, "duplicate feature name: {n}"),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.kind)
    }
}

impl std::error::Error for ParseError {}

/// The result of loading a schema: ordered features plus collected errors.
#[derive(Debug)]
pub struct LoadResult {
    pub features: Vec<RawFeature>,
    pub errors: Vec<ParseError>,
}

/// Read `.iface` text into an ordered collection of raw features.
///
/// Declaration order is preserved; duplicate names are errors. Comment lines
/// attach to the next feature record; category markers reset any pending
/// comment so section banners do not leak onto the following feature.
pub fn load(source: &str) -> LoadResult {
    let mut features: Vec<RawFeature> = Vec::new();
    let mut errors: Vec<ParseError> = Vec::new();
    let mut pending_comment: Vec<String> = Vec::new();
    let mut seen: FxHashSet<String> = FxHashSet::default();

    let mut offset = 0usize;
    for (idx, raw_line) in source.lines().enumerate() {
        let line_no = idx + 1;
        let span = (offset, offset + raw_line.len());
        offset += raw_line.len() + 1;

        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(text) = line.strip_prefix('#') {
            pending_comment.push(text.strip_prefix(' ').unwrap_or(text).to_string());
            continue;
        }

        let (kind_tok, rest) = match line.split_once(char::is_whitespace) {
            Some((k, r)) => (k, r.trim()),
            None => (line, ""),
        };

        let kind = match kind_tok {
            "cat" | "evt" | "enu" | "lex" | "ali" => {
                pending_comment.clear();
                continue;
            }
            "val" => RawKind::Val,
            "fun" => RawKind::Fun,
            "get" => RawKind::Get,
            "set" => RawKind::Set,
            other => {
                pending_comment.clear();
                errors.push(ParseError {
                    kind: ParseErrorKind::UnknownRecordKind(other.to_string()),
                    span,
                    line: line_no,
                });
                continue;
            }
        };

        let comment = std::mem::take(&mut pending_comment);
        let parsed = if kind == RawKind::Val {
            parse_constant(rest, comment, line_no)
        } else {
            parse_feature(kind, rest, comment, line_no)
        };

        match parsed {
            Ok(feature) => {
                if seen.contains(&feature.name) {
                    errors.push(ParseError {
                        kind: ParseErrorKind::DuplicateFeature(feature.name.clone()),
                        span,
                        line: line_no,
                    });
                } else {
                    seen.insert(feature.name.clone());
                    features.push(feature);
                }
            }
            Err(kind) => errors.push(ParseError {
                kind,
                span,
                line: line_no,
            }),
        }
    }

    LoadResult { features, errors }
}

/// Parse `NAME=value` into a constant record.
fn parse_constant(
    rest: &str,
    comment: Vec<String>,
    line: usize,
) -> Result<RawFeature, ParseErrorKind> {
    let Some((name, value)) = rest.split_once('=') else {
        return Err(ParseErrorKind::MissingValue(rest.to_string()));
    };
    Ok(RawFeature {
        name: name.trim().to_string(),
        kind: RawKind::Val,
        return_type: None,
        params: Vec::new(),
        value: Some(value.trim().to_string()),
        comment,
        line,
    })
}

/// Parse `<ret> <Name>=<opcode>(<p1>,<p2>)` into a feature record.
fn parse_feature(
    kind: RawKind,
    rest: &str,
    comment: Vec<String>,
    line: usize,
) -> Result<RawFeature, ParseErrorKind> {
    let Some((ret_tok, decl)) = rest.split_once(char::is_whitespace) else {
        return Err(ParseErrorKind::MissingOpcode(rest.to_string()));
    };
    let decl = decl.trim();
    let Some((name, tail)) = decl.split_once('=') else {
        return Err(ParseErrorKind::MissingOpcode(decl.to_string()));
    };
    let name = name.trim().to_string();
    let Some((opcode, param_text)) = tail.split_once('(') else {
        return Err(ParseErrorKind::MalformedParamList(name));
    };
    let Some(param_text) = param_text.strip_suffix(')') else {
        return Err(ParseErrorKind::MalformedParamList(name));
    };

    let params = parse_params(param_text, &name)?;
    let return_type = match ret_tok {
        "void" => None,
        other => Some(other.to_string()),
    };

    Ok(RawFeature {
        name,
        kind,
        return_type,
        params,
        value: Some(opcode.trim().to_string()),
        comment,
        line,
    })
}

/// Parse the comma-separated parameter slots. An empty slot stays in place
/// as a void parameter; an entirely empty list means zero parameters.
fn parse_params(text: &str, feature: &str) -> Result<Vec<Param>, ParseErrorKind> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let slots: Vec<&str> = text.split(',').collect();
    if slots.len() > 2 {
        return Err(ParseErrorKind::TooManyParams(feature.to_string()));
    }
    slots.into_iter().map(parse_param).collect()
}

fn parse_param(slot: &str) -> Result<Param, ParseErrorKind> {
    let slot = slot.trim();
    if slot.is_empty() {
        return Ok(Param::void());
    }
    let (decl, value) = match slot.split_once('=') {
        Some((d, v)) => (d.trim(), Some(v.trim().to_string())),
        None => (slot, None),
    };
    let mut words = decl.split_whitespace();
    match (words.next(), words.next(), words.next()) {
        (Some(tag), Some(name), None) => Ok(Param {
            tag: tag.to_string(),
            name: name.to_string(),
            value,
        }),
        _ => Err(ParseErrorKind::MalformedParam(slot.to_string())),
    }
}
