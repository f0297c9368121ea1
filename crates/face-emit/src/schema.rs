//! Scriptable interface fragment.
//!
//! The full interface is split into chunks of at most [`SLOT_CEILING`]
//! vtable slots so that no single generated interface outgrows what the
//! host's reflection layer will register. A read/write attribute costs
//! two slots, everything else one. The chunk closes as soon as its cost
//! exceeds the ceiling, so a trailing read/write attribute may push a
//! chunk to 151.

use std::collections::BTreeSet;

use face_common::error::GenError;
use face_common::names::{attribute_name, script_name};
use face_schema::{Feature, FeatureKind, TypeRegistry};
use uuid::Uuid;

use crate::writer::Fragment;
use crate::EmitConfig;

/// Slot cost at which a chunk closes.
pub const SLOT_CEILING: u32 = 150;

/// How chunk uuids are produced. `Random` matches what ships; the
/// sequential mode exists so regeneration can be compared byte for byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChunkIds {
    #[default]
    Random,
    Sequential,
}

struct ChunkIdGen {
    mode: ChunkIds,
    next: u32,
}

impl ChunkIdGen {
    fn new(mode: ChunkIds) -> ChunkIdGen {
        ChunkIdGen { mode, next: 0 }
    }

    fn next(&mut self) -> String {
        match self.mode {
            ChunkIds::Random => Uuid::new_v4().to_string(),
            ChunkIds::Sequential => {
                let id = format!("00000000-0000-0000-0000-{:012x}", self.next);
                self.next += 1;
                id
            }
        }
    }
}

/// One emitted interface chunk.
#[derive(Debug)]
pub struct Chunk {
    pub id: String,
    pub body: String,
    pub slots: u32,
}

/// Render a method's scriptable signature, or fail on the first
/// parameter or return tag the registry does not know.
pub fn method_signature(feature: &Feature, registry: &TypeRegistry) -> Result<String, GenError> {
    let mut args = Vec::new();
    for param in &feature.params {
        if param.is_void() {
            continue;
        }
        let desc = registry.lookup_or_err(&feature.name, &param.tag)?;
        args.push(format!("{} {} {}", desc.direction.keyword(), desc.schema_type, param.name));
    }
    let ret = registry.lookup_or_err(&feature.name, feature.return_tag())?;
    Ok(format!(
        "{} {}({});",
        ret.schema_type,
        script_name(&feature.name),
        args.join(", ")
    ))
}

/// Render an attribute declaration for a getter feature.
pub fn attribute_signature(feature: &Feature, registry: &TypeRegistry) -> Result<String, GenError> {
    let desc = registry.lookup_or_err(&feature.name, feature.return_tag())?;
    let readonly = if feature.is_read_write() { "" } else { "readonly " };
    Ok(format!(
        "{}attribute {} {};",
        readonly,
        desc.schema_type,
        attribute_name(&feature.name)
    ))
}

pub struct SchemaEmitter<'a> {
    registry: &'a TypeRegistry,
    cfg: &'a EmitConfig,
    ids: ChunkIdGen,
    errors: Vec<GenError>,
}

impl<'a> SchemaEmitter<'a> {
    pub fn new(registry: &'a TypeRegistry, cfg: &'a EmitConfig) -> SchemaEmitter<'a> {
        SchemaEmitter {
            registry,
            cfg,
            ids: ChunkIdGen::new(cfg.chunk_ids),
            errors: Vec::new(),
        }
    }

    /// Emit the lite interface body and report which features it claimed.
    /// Claimed features are excluded from the chunked interface and get
    /// direct native stubs instead of dispatch-table entries.
    pub fn emit_lite(&mut self, features: &[Feature]) -> (String, BTreeSet<String>) {
        let mut frag = Fragment::new();
        let mut claimed = BTreeSet::new();
        for feature in features {
            if feature.suppress_schema || self.cfg.is_discarded(&feature.name) {
                continue;
            }
            let selected = self.cfg.lite.contains(&script_name(&feature.name))
                || self.cfg.lite.contains(&attribute_name(&feature.name));
            if !selected {
                continue;
            }
            match feature.kind {
                FeatureKind::Function => {
                    self.method_fragment(&mut frag, feature, 8);
                }
                FeatureKind::Getter => {
                    self.attribute_fragment(&mut frag, feature, 8);
                }
                FeatureKind::Setter => {}
                _ => continue,
            }
            claimed.insert(feature.name.clone());
        }
        (frag.finish(), claimed)
    }

    /// Walk the surviving methods and attributes in schema order and pack
    /// them into chunks.
    pub fn emit_full(&mut self, features: &[Feature], claimed: &BTreeSet<String>) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut body = Fragment::new();
        let mut id = self.ids.next();
        let mut slots = 0u32;
        for feature in features {
            if feature.suppress_schema
                || claimed.contains(&feature.name)
                || self.cfg.is_discarded(&feature.name)
                || self.cfg.schema_omit.contains(&script_name(&feature.name))
            {
                continue;
            }
            slots += match feature.kind {
                FeatureKind::Function => self.method_fragment(&mut body, feature, 8),
                FeatureKind::Getter => self.attribute_fragment(&mut body, feature, 8),
                _ => continue,
            };
            if slots > SLOT_CEILING {
                chunks.push(Chunk {
                    id: std::mem::replace(&mut id, self.ids.next()),
                    body: std::mem::take(&mut body).finish(),
                    slots,
                });
                slots = 0;
            }
        }
        chunks.push(Chunk { id, body: body.finish(), slots });
        chunks
    }

    pub fn into_errors(self) -> Vec<GenError> {
        self.errors
    }

    fn method_fragment(&mut self, frag: &mut Fragment, feature: &Feature, indent: usize) -> u32 {
        frag.comments(indent, &feature.comment);
        match method_signature(feature, self.registry) {
            Ok(line) => frag.line(indent, &line),
            Err(err) => {
                if let GenError::UnknownType { tag, .. } = &err {
                    frag.line(
                        indent,
                        &format!(
                            "/* method {} has missing type {} */",
                            script_name(&feature.name),
                            tag
                        ),
                    );
                }
                self.errors.push(err);
            }
        }
        1
    }

    fn attribute_fragment(&mut self, frag: &mut Fragment, feature: &Feature, indent: usize) -> u32 {
        frag.comments(indent, &feature.comment);
        match attribute_signature(feature, self.registry) {
            Ok(line) => {
                frag.line(indent, &line);
                if feature.is_read_write() {
                    2
                } else {
                    1
                }
            }
            Err(err) => {
                if let GenError::UnknownType { tag, .. } = &err {
                    frag.line(
                        indent,
                        &format!(
                            "/* attribute {} has missing type {} */",
                            attribute_name(&feature.name),
                            tag
                        ),
                    );
                }
                self.errors.push(err);
                1
            }
        }
    }
}

/// Stitch the chunks into interface declarations.
pub fn render_interface(chunks: &[Chunk], interface: &str) -> String {
    let mut out = String::new();
    for (index, chunk) in chunks.iter().enumerate() {
        out.push_str(&format!("[scriptable, uuid({})]\n", chunk.id));
        out.push_str(&format!("interface {interface}_Part{index} : IHostSupports {{\n"));
        out.push_str(&chunk.body);
        out.push_str("};\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use face_schema::Param;

    fn method(name: &str, ret: &str, params: &[(&str, &str)]) -> Feature {
        let params: Vec<Param> = params
            .iter()
            .map(|(tag, pname)| Param {
                tag: (*tag).to_owned(),
                name: (*pname).to_owned(),
                value: None,
            })
            .collect();
        Feature {
            name: name.to_owned(),
            kind: FeatureKind::Function,
            return_type: Some(ret.to_owned()),
            param_count: params.iter().filter(|p| !p.is_void()).count(),
            params,
            matching: None,
            suppress_schema: false,
            comment: Vec::new(),
            value: None,
            manual_code: None,
        }
    }

    fn attribute(name: &str, ret: &str, matching: Option<&str>) -> Feature {
        Feature {
            name: name.to_owned(),
            kind: FeatureKind::Getter,
            return_type: Some(ret.to_owned()),
            params: Vec::new(),
            param_count: 0,
            matching: matching.map(str::to_owned),
            suppress_schema: false,
            comment: Vec::new(),
            value: None,
            manual_code: None,
        }
    }

    fn registry() -> TypeRegistry {
        TypeRegistry::builtin()
    }

    fn sequential_cfg() -> EmitConfig {
        EmitConfig { chunk_ids: ChunkIds::Sequential, ..EmitConfig::default() }
    }

    #[test]
    fn method_signature_renders_directions() {
        let feature = method("AddText", "void", &[("int", "length"), ("string", "text")]);
        let sig = method_signature(&feature, &registry()).unwrap();
        insta::assert_snapshot!(sig, @"void addText(in long length, in string text);");
    }

    #[test]
    fn method_signature_rejects_unknown_tags() {
        let feature = method("FindText", "int", &[("findtext", "ft")]);
        let err = method_signature(&feature, &registry()).unwrap_err();
        assert!(matches!(err, GenError::UnknownType { ref tag, .. } if tag == "findtext"));
    }

    #[test]
    fn attribute_signature_marks_readonly() {
        let registry = registry();
        let ro = attribute("GetLength", "position", None);
        assert_eq!(
            attribute_signature(&ro, &registry).unwrap(),
            "readonly attribute long length;"
        );
        let rw = attribute("GetCurrentPos", "position", Some("SetCurrentPos"));
        assert_eq!(
            attribute_signature(&rw, &registry).unwrap(),
            "attribute long currentPos;"
        );
    }

    #[test]
    fn chunks_close_after_exceeding_the_ceiling() {
        // 75 read/write attributes cost 150 slots, the 76th tips the
        // chunk to 152 and closes it.
        let mut features = Vec::new();
        for i in 0..76 {
            features.push(attribute(&format!("GetProp{i}"), "int", Some("ignored")));
        }
        let registry = registry();
        let cfg = sequential_cfg();
        let mut emitter = SchemaEmitter::new(&registry, &cfg);
        let chunks = emitter.emit_full(&features, &BTreeSet::new());
        assert!(emitter.into_errors().is_empty());
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].slots, 152);
        assert_eq!(chunks[1].slots, 0);
        assert_eq!(chunks[0].id, "00000000-0000-0000-0000-000000000000");
        assert_eq!(chunks[1].id, "00000000-0000-0000-0000-000000000001");
    }

    #[test]
    fn missing_type_leaves_a_diagnostic_comment() {
        let features = vec![method("FindText", "int", &[("findtext", "ft")])];
        let registry = registry();
        let cfg = sequential_cfg();
        let mut emitter = SchemaEmitter::new(&registry, &cfg);
        let chunks = emitter.emit_full(&features, &BTreeSet::new());
        assert!(chunks[0].body.contains("/* method findText has missing type findtext */"));
        assert_eq!(emitter.into_errors().len(), 1);
    }

    #[test]
    fn lite_features_are_claimed_and_skipped_by_full_walk() {
        let features = vec![
            method("AddText", "void", &[("int", "length"), ("string", "text")]),
            attribute("GetCurrentPos", "position", Some("SetCurrentPos")),
        ];
        let registry = registry();
        let mut cfg = sequential_cfg();
        cfg.lite.insert("addText".to_owned());
        let mut emitter = SchemaEmitter::new(&registry, &cfg);
        let (lite, claimed) = emitter.emit_lite(&features);
        assert!(lite.contains("void addText(in long length, in string text);"));
        assert!(claimed.contains("AddText"));
        let chunks = emitter.emit_full(&features, &claimed);
        assert!(!chunks[0].body.contains("addText"));
        assert!(chunks[0].body.contains("attribute long currentPos;"));
    }

    #[test]
    fn rendered_interfaces_are_numbered() {
        let chunks = vec![
            Chunk { id: "u0".to_owned(), body: String::new(), slots: 0 },
            Chunk { id: "u1".to_owned(), body: String::new(), slots: 0 },
        ];
        let out = render_interface(&chunks, "IEditView");
        assert!(out.contains("[scriptable, uuid(u0)]\ninterface IEditView_Part0 : IHostSupports {\n};"));
        assert!(out.contains("interface IEditView_Part1 : IHostSupports {"));
    }
}
