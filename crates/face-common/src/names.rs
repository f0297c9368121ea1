//! Derived-name transforms.
//!
//! Every identifier that appears in a generated fragment -- script method
//! names, attribute names, opcode symbols, runtime identifier symbols -- is
//! a pure deterministic function of the declared feature name. Keeping the
//! transforms here, free of any emitter state, is what makes the global
//! injectivity check possible.

/// Which accessor a [`pair_candidate`] transform should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accessor {
    Getter,
    Setter,
}

/// Lower-case the first character: the form used for script-visible names.
pub fn script_name(name: &str) -> String {
    recase_first(name, false)
}

/// Upper-case the first character: the form used for native method names.
pub fn native_name(name: &str) -> String {
    recase_first(name, true)
}

fn recase_first(name: &str, upper: bool) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) => {
            let first: String = if upper {
                c.to_uppercase().collect()
            } else {
                c.to_lowercase().collect()
            };
            format!("{first}{}", chars.as_str())
        }
        None => String::new(),
    }
}

/// The opcode symbol referencing the control's message constant.
///
/// Declared constants (which already contain an underscore) keep their own
/// name; feature names are prefixed, e.g. `GotoLine` -> `EV_GOTOLINE`.
pub fn opcode_symbol(name: &str, prefix: &str) -> String {
    let upper = name.to_ascii_uppercase();
    if upper.contains('_') {
        upper
    } else {
        format!("{prefix}{upper}")
    }
}

/// The attribute name a getter or setter exposes on the scriptable surface.
///
/// A leading `get`/`set` (any case) is stripped; otherwise the first
/// capitalized `Get`/`Set` infix is removed. The capitalization requirement
/// on the infix keeps names like `offset` intact. Paired accessors must map
/// to the same attribute name, which this transform guarantees for all the
/// shapes [`pair_candidate`] produces.
pub fn attribute_name(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    if lower.starts_with("get") || lower.starts_with("set") {
        return script_name(&name[3..]);
    }
    if let Some(x) = name.find("Get") {
        return script_name(&format!("{}{}", &name[..x], &name[x + 3..]));
    }
    if let Some(x) = name.find("Set") {
        return script_name(&format!("{}{}", &name[..x], &name[x + 3..]));
    }
    script_name(name)
}

/// Compute the candidate partner name for an accessor.
///
/// Given a setter name, `pair_candidate(name, Accessor::Getter)` is the name
/// its getter would have (and vice versa). Three transform rules apply in
/// fixed priority order:
///
/// 1. lower-case prefix swap (`setText` -> `getText`)
/// 2. first capitalized infix swap (`SetCurrentPos` -> `GetCurrentPos`)
/// 3. fallback prefix (`text` -> `gettext`)
///
/// The transform is purely textual; whether the candidate exists (or is
/// actually classified as an accessor) is the schema fixer's business.
pub fn pair_candidate(name: &str, toward: Accessor) -> String {
    let (from_prefix, to_prefix, from_infix, to_infix) = match toward {
        Accessor::Getter => ("set", "get", "Set", "Get"),
        Accessor::Setter => ("get", "set", "Get", "Set"),
    };
    if let Some(rest) = name.strip_prefix(from_prefix) {
        return format!("{to_prefix}{rest}");
    }
    if let Some(x) = name.find(from_infix) {
        return format!("{}{}{}", &name[..x], to_infix, &name[x + 3..]);
    }
    format!("{to_prefix}{name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_and_native_names() {
        assert_eq!(script_name("GetCurrentPos"), "getCurrentPos");
        assert_eq!(native_name("gotoLine"), "GotoLine");
        assert_eq!(script_name(""), "");
    }

    #[test]
    fn opcode_symbols() {
        assert_eq!(opcode_symbol("GotoLine", "EV_"), "EV_GOTOLINE");
        assert_eq!(opcode_symbol("SCI_START", "EV_"), "SCI_START");
    }

    #[test]
    fn attribute_names_strip_accessor_prefixes() {
        assert_eq!(attribute_name("GetCurrentPos"), "currentPos");
        assert_eq!(attribute_name("setText"), "text");
        assert_eq!(attribute_name("LineGetVisible"), "lineVisible");
    }

    #[test]
    fn attribute_name_ignores_lowercase_infix() {
        // "offset" contains "set" but not the capitalized infix.
        assert_eq!(attribute_name("offset"), "offset");
    }

    #[test]
    fn pair_candidates_apply_rules_in_priority_order() {
        assert_eq!(pair_candidate("setText", Accessor::Getter), "getText");
        assert_eq!(
            pair_candidate("SetCurrentPos", Accessor::Getter),
            "GetCurrentPos"
        );
        assert_eq!(pair_candidate("text", Accessor::Getter), "gettext");
        assert_eq!(pair_candidate("GetAnchor", Accessor::Setter), "SetAnchor");
    }

    #[test]
    fn paired_shapes_share_an_attribute_name() {
        for name in ["setText", "SetCurrentPos", "LineSetVisible"] {
            let getter = pair_candidate(name, Accessor::Getter);
            assert_eq!(attribute_name(&getter), attribute_name(name));
        }
    }
}
