use std::fmt;

use serde::Serialize;

/// A fatal generation error.
///
/// Generation errors abort the run and must carry enough context to point
/// at the offending schema feature. Runtime failures (wrong argument shape,
/// unknown identifier) are a property of the *generated* code, not of the
/// generator, and never appear here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum GenError {
    /// A feature references a semantic type tag absent from the registry.
    UnknownType { feature: String, tag: String },
    /// The registry knows the tag but has no template of the required kind
    /// (e.g. no native parameter type, no direct accessor).
    MissingTemplate {
        feature: String,
        tag: String,
        template: &'static str,
    },
    /// Two distinct declared names derive the same identifier.
    IdentifierCollision {
        identifier: String,
        first: String,
        second: String,
    },
}

impl fmt::Display for GenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownType { feature, tag } => {
                write!(f, "feature `{feature}` references unknown type tag `{tag}`")
            }
            Self::MissingTemplate {
                feature,
                tag,
                template,
            } => {
                write!(
                    f,
                    "no {template} available for type `{tag}` while generating `{feature}`"
                )
            }
            Self::IdentifierCollision {
                identifier,
                first,
                second,
            } => {
                write!(
                    f,
                    "features `{first}` and `{second}` both derive identifier `{identifier}`"
                )
            }
        }
    }
}

impl std::error::Error for GenError {}
