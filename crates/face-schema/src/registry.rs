//! The type registry: per-semantic-tag marshaling knowledge.
//!
//! Every parameter and return value in the schema carries a semantic type
//! tag (`int`, `position`, `stringresult`, ...). The registry maps each tag
//! to an immutable [`TypeDescriptor`]: how the tag is spelled on the
//! scriptable interface, which direction it flows, how a script value of
//! that type is checked, and the conversion templates both ways across the
//! script/native boundary.
//!
//! Templates are plain Rust functions over a fixed [`Slots`] struct. There
//! is no template language: escaping of literal characters in the emitted
//! text is handled where the text is written, independent of substitution.
//!
//! A tag absent from the registry is a fatal generation error naming the
//! feature and the tag -- never skipped, never defaulted.

use rustc_hash::FxHashMap;
use serde::Serialize;

use face_common::error::GenError;

/// Named substitution slots available to a conversion template.
#[derive(Debug, Clone, Copy)]
pub struct Slots<'a> {
    /// Expression for the value being converted: the incoming script value
    /// (`args[0]`, `*value`) or, for native-to-script templates, the native
    /// result variable.
    pub arg: &'a str,
    /// Lvalue receiving a produced script value (e.g. `*result`).
    pub target: &'a str,
    /// Positional index, used to keep generated locals unique.
    pub index: usize,
}

/// A conversion template: generated text from the fixed slot set.
pub type Template = fn(&Slots) -> String;

/// A direct-accessor template for zero-argument getters; receives the
/// opcode symbol of the feature being read.
pub type AccessorTemplate = fn(&str) -> String;

/// Parameter direction on the scriptable interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    In,
    Out,
    InOut,
    /// Only the `void` pseudo-type; never rendered as a parameter.
    Unused,
}

impl Direction {
    pub fn keyword(self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
            Direction::InOut => "inout",
            Direction::Unused => "unused",
        }
    }
}

/// Everything the emitters need to know about one semantic type tag.
#[derive(Debug)]
pub struct TypeDescriptor {
    pub tag: &'static str,
    /// Type name on the scriptable interface description.
    pub schema_type: &'static str,
    pub direction: Direction,
    /// Script-value predicate used to validate arguments, fail closed.
    pub check: &'static str,
    /// Native parameter type for direct stubs, when the type supports them.
    pub native_param: Option<&'static str>,
    /// Native result type (pointee) for direct stubs returning this type.
    pub native_return: Option<&'static str>,
    /// Script value -> native word conversion.
    pub from_script: Option<Template>,
    /// Statements required before the word conversion (scratch buffers,
    /// decoded locals).
    pub from_script_pre: Option<Template>,
    /// Statements required after the control call (write-back side effects).
    pub from_script_post: Option<Template>,
    /// Native word -> script value conversion.
    pub to_script: Option<Template>,
    /// Native-typed variable -> word argument for direct stubs.
    pub to_native_arg: Option<Template>,
    /// Direct accessor for simple zero-argument getters.
    pub accessor: Option<AccessorTemplate>,
}

/// The immutable tag -> descriptor lookup table.
pub struct TypeRegistry {
    by_tag: FxHashMap<&'static str, TypeDescriptor>,
}

impl TypeRegistry {
    /// The built-in registry covering every tag the control's schema uses.
    pub fn builtin() -> Self {
        let mut by_tag = FxHashMap::default();
        for desc in builtin_descriptors() {
            by_tag.insert(desc.tag, desc);
        }
        TypeRegistry { by_tag }
    }

    pub fn lookup(&self, tag: &str) -> Option<&TypeDescriptor> {
        self.by_tag.get(tag)
    }

    /// Lookup that fails with a [`GenError::UnknownType`] naming the feature
    /// whose parameter or return value referenced the tag.
    pub fn lookup_or_err(&self, feature: &str, tag: &str) -> Result<&TypeDescriptor, GenError> {
        self.lookup(tag).ok_or_else(|| GenError::UnknownType {
            feature: feature.to_string(),
            tag: tag.to_string(),
        })
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// A descriptor with every optional part unset.
fn base(
    tag: &'static str,
    schema_type: &'static str,
    direction: Direction,
    check: &'static str,
) -> TypeDescriptor {
    TypeDescriptor {
        tag,
        schema_type,
        direction,
        check,
        native_param: None,
        native_return: None,
        from_script: None,
        from_script_pre: None,
        from_script_post: None,
        to_script: None,
        to_native_arg: None,
        accessor: None,
    }
}

/// An `int`-flavored descriptor; `position`, `colour`, and `keymod` all
/// share the word-sized integer representation.
fn int_like(tag: &'static str) -> TypeDescriptor {
    TypeDescriptor {
        native_param: Some("int32_t"),
        native_return: Some("int32_t"),
        from_script: Some(|s| format!("(uptr_t)SCRIPTVAL_TO_INT({})", s.arg)),
        to_script: Some(|s| format!("INT_TO_SCRIPTVAL((int32_t){}, {});", s.arg, s.target)),
        to_native_arg: Some(|s| format!("(uptr_t){}", s.arg)),
        accessor: Some(|opcode| {
            format!("INT_TO_SCRIPTVAL((int32_t)SendCommand({opcode}, 0, 0), *result);")
        }),
        ..base(tag, "long", Direction::In, "SCRIPTVAL_IS_INT")
    }
}

fn builtin_descriptors() -> Vec<TypeDescriptor> {
    vec![
        TypeDescriptor {
            native_param: Some("const char *"),
            from_script: Some(|s| format!("(uptr_t)(SCRIPTVAL_TO_STRING({}).chars)", s.arg)),
            to_native_arg: Some(|s| format!("(uptr_t)({})", s.arg)),
            ..base("string", "string", Direction::In, "SCRIPTVAL_IS_STRING")
        },
        // An out-parameter: the control writes into a scratch buffer, which
        // is copied into a script-owned string after the call and stored on
        // the out object's `value` property.
        TypeDescriptor {
            from_script_pre: Some(|s| {
                format!(
                    "static char buffer_{i}[32 * 1024];\n\
                     buffer_{i}[sizeof(buffer_{i}) - 1] = '\\0';",
                    i = s.index
                )
            }),
            from_script: Some(|s| format!("(uptr_t)(buffer_{})", s.index)),
            from_script_post: Some(|s| {
                format!(
                    "ScriptVal strval_{i};\n\
                     size_t len_{i} = strlen(buffer_{i});\n\
                     char *copy_{i} = (char *)host_alloc(len_{i} + 1);\n\
                     if (!copy_{i}) return false;\n\
                     memcpy(copy_{i}, buffer_{i}, len_{i} + 1);\n\
                     STRINGZ_TO_SCRIPTVAL(copy_{i}, strval_{i});\n\
                     host_set_property(instance, SCRIPTVAL_TO_OBJECT({arg}),\n\
                     \x20               host_ident(\"value\"), &strval_{i});",
                    i = s.index,
                    arg = s.arg
                )
            }),
            ..base(
                "stringresult",
                "wstring",
                Direction::Out,
                "SCRIPTVAL_IS_OBJECT",
            )
        },
        int_like("int"),
        int_like("position"),
        int_like("colour"),
        TypeDescriptor {
            accessor: None,
            ..int_like("keymod")
        },
        TypeDescriptor {
            native_param: Some("bool"),
            native_return: Some("bool"),
            from_script: Some(|s| format!("(uptr_t)SCRIPTVAL_TO_BOOL({})", s.arg)),
            to_script: Some(|s| format!("BOOL_TO_SCRIPTVAL({} != 0, {});", s.arg, s.target)),
            to_native_arg: Some(|s| format!("(uptr_t){}", s.arg)),
            accessor: Some(|opcode| {
                format!("BOOL_TO_SCRIPTVAL(SendCommand({opcode}, 0, 0) != 0, *result);")
            }),
            ..base("bool", "boolean", Direction::In, "SCRIPTVAL_IS_BOOL")
        },
        // The script host has no safe encoding for a raw word-sized value,
        // so pointers travel as a nibble-per-byte string: each byte becomes
        // two characters offset from 'A' (0 = 'A', 15 = 'P').
        TypeDescriptor {
            from_script_pre: Some(ptr_decode),
            from_script: Some(|s| format!("ptrarg_{}", s.index)),
            to_script: Some(ptr_encode),
            accessor: Some(|opcode| {
                let word = format!("sptr_t ptrval = SendCommand({opcode}, 0, 0);\n");
                let body = ptr_encode(&Slots {
                    arg: "ptrval",
                    target: "*result",
                    index: 0,
                });
                format!("{word}{body}")
            }),
            ..base("ptr", "string", Direction::In, "SCRIPTVAL_IS_STRING")
        },
        TypeDescriptor {
            native_param: Some("const char *"),
            from_script: Some(|s| format!("(uptr_t)(SCRIPTVAL_TO_STRING({}).chars)", s.arg)),
            to_native_arg: Some(|s| format!("(uptr_t)({})", s.arg)),
            ..base("cells", "string", Direction::In, "SCRIPTVAL_IS_STRING")
        },
        TypeDescriptor {
            from_script: Some(|s| format!("(uptr_t)(SCRIPTVAL_TO_STRING({}).chars)", s.arg)),
            ..base("textrange", "string", Direction::InOut, "SCRIPTVAL_IS_STRING")
        },
        TypeDescriptor {
            to_script: Some(|s| format!("VOID_TO_SCRIPTVAL({});", s.target)),
            ..base("void", "void", Direction::Unused, "SCRIPTVAL_IS_VOID")
        },
    ]
}

/// Decode a nibble-encoded pointer argument into `ptrarg_<i>`.
fn ptr_decode(s: &Slots) -> String {
    format!(
        "uptr_t ptrarg_{i};\n\
         if (SCRIPTVAL_TO_STRING({arg}).len == 0) {{\n\
         \x20   ptrarg_{i} = 0;\n\
         }} else if (SCRIPTVAL_TO_STRING({arg}).len == sizeof(uptr_t) * 2) {{\n\
         \x20   const char *enc_{i} = SCRIPTVAL_TO_STRING({arg}).chars;\n\
         \x20   for (size_t b = 0; b < sizeof(uptr_t); ++b) {{\n\
         \x20       ((unsigned char *)&ptrarg_{i})[b] =\n\
         \x20           (((enc_{i}[b * 2] - 'A') & 0x0F) << 4) |\n\
         \x20           ((enc_{i}[b * 2 + 1] - 'A') & 0x0F);\n\
         \x20   }}\n\
         }} else {{\n\
         \x20   host_warn(\"pointer argument has invalid length\");\n\
         \x20   return false;\n\
         }}",
        i = s.index,
        arg = s.arg
    )
}

/// Encode the word in `slots.arg` as a nibble string into `slots.target`.
fn ptr_encode(s: &Slots) -> String {
    format!(
        "char *encbuf_{i} = (char *)host_alloc(sizeof(uptr_t) * 2);\n\
         if (!encbuf_{i}) return false;\n\
         for (size_t b = 0; b < sizeof(uptr_t); ++b) {{\n\
         \x20   encbuf_{i}[b * 2] = ((((unsigned char *)&{arg})[b] & 0xF0) >> 4) + 'A';\n\
         \x20   encbuf_{i}[b * 2 + 1] = (((unsigned char *)&{arg})[b] & 0x0F) + 'A';\n\
         }}\n\
         STRINGN_TO_SCRIPTVAL(encbuf_{i}, sizeof(uptr_t) * 2, {target});",
        i = s.index,
        arg = s.arg,
        target = s.target
    )
}
