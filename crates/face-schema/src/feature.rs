use serde::{Deserialize, Serialize};

/// The record kind as declared in the schema text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RawKind {
    /// A plain function.
    Fun,
    /// A getter-shaped feature (classification may still demote it).
    Get,
    /// A setter-shaped feature (classification may still demote it).
    Set,
    /// A named constant.
    Val,
}

/// One parameter slot of a feature.
///
/// Void slots are kept in place rather than dropped: their position is what
/// the native argument-count accounting needs (the control's dispatch entry
/// point receives a literal zero at that position).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Param {
    /// Semantic type tag (`"void"` for an empty slot).
    pub tag: String,
    pub name: String,
    /// Optional literal default recorded in the schema.
    pub value: Option<String>,
}

impl Param {
    pub fn void() -> Self {
        Param {
            tag: "void".into(),
            name: String::new(),
            value: None,
        }
    }

    pub fn is_void(&self) -> bool {
        self.tag == "void"
    }
}

/// A feature exactly as the loader read it, before classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawFeature {
    pub name: String,
    pub kind: RawKind,
    /// Semantic return type tag; `None` means void.
    pub return_type: Option<String>,
    /// Up to two parameter slots, void slots included.
    pub params: Vec<Param>,
    /// Constant value (`val` records) or feature opcode number.
    pub value: Option<String>,
    /// Free-text comment lines preceding the declaration.
    pub comment: Vec<String>,
    /// 1-based source line of the declaration.
    pub line: usize,
}

/// The classification of a canonical feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FeatureKind {
    Constant,
    Getter,
    Setter,
    Function,
    /// A derived feature displaced by a manual override; excluded from every
    /// generated surface in favor of the manual implementation.
    Overridden,
}

/// A canonical feature record, produced once by the schema fixer and treated
/// as immutable by every emitter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feature {
    pub name: String,
    pub kind: FeatureKind,
    pub return_type: Option<String>,
    pub params: Vec<Param>,
    /// Count of non-void parameter slots.
    pub param_count: usize,
    /// Name of the paired getter (for a setter) or setter (for a getter).
    /// A by-name, non-owning relation.
    pub matching: Option<String>,
    /// True for manual overrides: excluded from the generated interface
    /// description but present in dispatch tables and the wrapper.
    pub suppress_schema: bool,
    pub comment: Vec<String>,
    /// Constant value for `Constant` features.
    pub value: Option<String>,
    /// Hand-written body for manual overrides.
    pub manual_code: Option<String>,
}

impl Feature {
    /// The return type tag, with void spelled out.
    pub fn return_tag(&self) -> &str {
        self.return_type.as_deref().unwrap_or("void")
    }

    /// A getter with a live setter partner renders as a read/write attribute.
    pub fn is_read_write(&self) -> bool {
        self.kind == FeatureKind::Getter && self.matching.is_some()
    }
}

/// A hand-written getter or setter supplied through configuration.
///
/// These take precedence over derived classification, never appear in the
/// generated interface description, and always appear in dispatch tables and
/// the wrapper. The code body may use the `{target}` placeholder for the
/// lvalue receiving a produced script value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualOverride {
    #[serde(default)]
    pub return_type: Option<String>,
    pub code: String,
}
