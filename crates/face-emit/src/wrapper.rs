//! Delegating script wrapper.
//!
//! The wrapper object stands between application script and the control:
//! it registers every interface chunk, then forwards each property and
//! method to the wrapped control instance. Names come from the same
//! sorted unions the dispatch tables use, so the two surfaces stay in
//! agreement.

use std::collections::BTreeSet;

use face_common::names::{attribute_name, script_name};
use face_schema::{Feature, FeatureKind};

use crate::schema::Chunk;
use crate::writer::Fragment;
use crate::EmitConfig;

pub fn emit_wrapper(features: &[Feature], chunks: &[Chunk], cfg: &EmitConfig) -> String {
    let mut getters = BTreeSet::new();
    let mut setters = BTreeSet::new();
    let mut methods: BTreeSet<String> = cfg
        .manual_functions
        .iter()
        .map(|m| script_name(m))
        .filter(|m| !cfg.is_discarded(m))
        .collect();
    for feature in features {
        if cfg.is_discarded(&feature.name) {
            continue;
        }
        match feature.kind {
            FeatureKind::Getter => {
                getters.insert(attribute_name(&feature.name));
            }
            FeatureKind::Setter => {
                setters.insert(attribute_name(&feature.name));
            }
            FeatureKind::Function => {
                methods.insert(script_name(&feature.name));
            }
            _ => {}
        }
    }

    let wrapper = &cfg.wrapper;
    let mut frag = Fragment::new();
    for index in 0..chunks.len() {
        frag.line(
            0,
            &format!(
                "{}.prototype._interfaces.push(Host.interfaces.{}_Part{});",
                wrapper, cfg.interface, index
            ),
        );
    }
    frag.blank();
    for getter in &getters {
        frag.line(0, &format!("{wrapper}.prototype.__defineGetter__(\"{getter}\","));
        frag.line(4, &format!("function() {{ return this.__control.{getter}; }});"));
    }
    for setter in &setters {
        frag.line(0, &format!("{wrapper}.prototype.__defineSetter__(\"{setter}\","));
        frag.line(4, &format!("function(v) {{ this.__control.{setter} = v; }});"));
    }
    for method in &methods {
        frag.line(0, &format!("{wrapper}.prototype.{method} ="));
        frag.line(
            4,
            &format!(
                "function() {{ return this.__control.{method}.apply(this.__control, arguments); }};"
            ),
        );
    }
    frag.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use face_schema::Param;

    fn feature(name: &str, kind: FeatureKind) -> Feature {
        let params = if kind == FeatureKind::Setter {
            vec![Param {
                tag: "int".to_owned(),
                name: "value".to_owned(),
                value: None,
            }]
        } else {
            Vec::new()
        };
        Feature {
            name: name.to_owned(),
            kind,
            return_type: Some("int".to_owned()),
            param_count: params.len(),
            params,
            matching: None,
            suppress_schema: false,
            comment: Vec::new(),
            value: None,
            manual_code: None,
        }
    }

    fn chunk() -> Chunk {
        Chunk {
            id: "u".to_owned(),
            body: String::new(),
            slots: 0,
        }
    }

    #[test]
    fn wrapper_registers_every_chunk() {
        let out = emit_wrapper(&[], &[chunk(), chunk()], &EmitConfig::default());
        assert!(out.contains("editorWrapper.prototype._interfaces.push(Host.interfaces.IEditView_Part0);"));
        assert!(out.contains("editorWrapper.prototype._interfaces.push(Host.interfaces.IEditView_Part1);"));
    }

    #[test]
    fn wrapper_forwards_properties_and_methods() {
        let features = vec![
            feature("GetCurrentPos", FeatureKind::Getter),
            feature("SetCurrentPos", FeatureKind::Setter),
            feature("GotoLine", FeatureKind::Function),
        ];
        let mut cfg = EmitConfig::default();
        cfg.manual_functions.insert("sendUpdateCommands".to_owned());
        let out = emit_wrapper(&features, &[chunk()], &cfg);
        assert!(out.contains("editorWrapper.prototype.__defineGetter__(\"currentPos\","));
        assert!(out.contains("function() { return this.__control.currentPos; });"));
        assert!(out.contains("editorWrapper.prototype.__defineSetter__(\"currentPos\","));
        assert!(out.contains("function(v) { this.__control.currentPos = v; });"));
        assert!(out.contains("editorWrapper.prototype.gotoLine ="));
        assert!(out.contains("editorWrapper.prototype.sendUpdateCommands ="));
    }

    #[test]
    fn discarded_features_are_not_forwarded() {
        let features = vec![feature("GotoLine", FeatureKind::Function)];
        let mut cfg = EmitConfig::default();
        cfg.discard.insert("gotoLine".to_owned());
        let out = emit_wrapper(&features, &[chunk()], &cfg);
        assert!(!out.contains("gotoLine"));
    }
}
