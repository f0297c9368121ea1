//! Binding-fragment emitters.
//!
//! Takes the fixed feature list and produces the five generated
//! surfaces:
//!
//! 1. chunked scriptable interface description ([`schema`])
//! 2. constants fragment ([`consts`])
//! 3. direct native stubs for the lite subset ([`stubs`])
//! 4. runtime dispatch tables ([`dispatch`])
//! 5. delegating script wrapper ([`wrapper`])
//!
//! [`generate`] runs them in that order against one [`EmitConfig`] and
//! returns all five texts. Emitters never mutate features; everything
//! they need beyond the feature list lives in the config and the type
//! registry.

pub mod consts;
pub mod dispatch;
pub mod schema;
pub mod stubs;
pub mod wrapper;
pub mod writer;

use std::collections::BTreeSet;

use face_common::error::GenError;
use face_common::names::opcode_symbol;
use face_schema::{Feature, TypeRegistry};

pub use schema::{Chunk, ChunkIds, SLOT_CEILING};

/// Project-level emitter settings, assembled by the driver from its
/// configuration file.
#[derive(Debug, Clone)]
pub struct EmitConfig {
    /// Scriptable interface base name; chunks append `_PartN`.
    pub interface: String,
    /// Native class the stubs and dispatch tables belong to.
    pub class: String,
    /// Prefix for derived opcode symbols.
    pub opcode_prefix: String,
    /// Script object the wrapper fragment extends.
    pub wrapper: String,
    /// Features dropped from every surface, by declared or script name.
    pub discard: BTreeSet<String>,
    /// Script names left out of the interface description only.
    pub schema_omit: BTreeSet<String>,
    /// Hand-implemented methods reached through `Invoke`.
    pub manual_functions: BTreeSet<String>,
    /// Script or attribute names claimed by the lite interface.
    pub lite: BTreeSet<String>,
    pub chunk_ids: ChunkIds,
}

impl Default for EmitConfig {
    fn default() -> EmitConfig {
        EmitConfig {
            interface: "IEditView".to_owned(),
            class: "EditView".to_owned(),
            opcode_prefix: "EV_".to_owned(),
            wrapper: "editorWrapper".to_owned(),
            discard: BTreeSet::new(),
            schema_omit: BTreeSet::new(),
            manual_functions: BTreeSet::new(),
            lite: BTreeSet::new(),
            chunk_ids: ChunkIds::default(),
        }
    }
}

impl EmitConfig {
    /// Discards match either the declared name or its script form.
    pub fn is_discarded(&self, name: &str) -> bool {
        self.discard.contains(name)
            || self.discard.contains(&face_common::names::script_name(name))
    }

    /// The opcode symbol for a feature under this project's prefix.
    pub fn opcode(&self, name: &str) -> String {
        opcode_symbol(name, &self.opcode_prefix)
    }
}

/// The five generated fragments.
#[derive(Debug)]
pub struct Artifacts {
    pub schema: String,
    pub schema_lite: String,
    pub constants: String,
    pub stubs: String,
    pub dispatch: String,
    pub wrapper: String,
}

/// Run every emitter over the fixed feature list.
///
/// The schema emitter runs first because the lite claim set and the
/// chunk list feed the other surfaces. Schema-level missing types are
/// collected during the walk so the diagnostic comment lands in the
/// fragment, then the first one is surfaced as the overall error.
pub fn generate(
    features: &[Feature],
    registry: &TypeRegistry,
    cfg: &EmitConfig,
) -> Result<Artifacts, GenError> {
    let mut schema_emitter = schema::SchemaEmitter::new(registry, cfg);
    let (schema_lite, claimed) = schema_emitter.emit_lite(features);
    let chunks = schema_emitter.emit_full(features, &claimed);
    if let Some(err) = schema_emitter.into_errors().into_iter().next() {
        return Err(err);
    }
    let schema = schema::render_interface(&chunks, &cfg.interface);
    let constants = consts::emit_constants(features, cfg);
    let stubs = stubs::StubEmitter::new(registry, cfg).emit_direct_stubs(features, &claimed)?;
    let dispatch = dispatch::DispatchEmitter::new(registry, cfg).emit(features, &claimed)?;
    let wrapper = wrapper::emit_wrapper(features, &chunks, cfg);
    Ok(Artifacts {
        schema,
        schema_lite,
        constants,
        stubs,
        dispatch,
        wrapper,
    })
}
