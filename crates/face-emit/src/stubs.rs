//! Direct native stubs.
//!
//! Features claimed by the lite interface bypass the script dispatch
//! tables entirely: the host binds them through the scriptable interface
//! description, so each one gets a strongly typed native method that
//! forwards straight to `SendCommand`. Every stub carries its scriptable
//! signature in an `#if 0` block for reference.
//!
//! Direct stubs only exist for types with a native representation
//! (`native_param`/`native_return` in the registry); selecting a feature
//! whose types have none is a fatal generation error.

use std::collections::BTreeSet;

use face_common::error::GenError;
use face_common::names::{native_name, script_name};
use face_schema::{Feature, FeatureKind, Slots, TypeRegistry};

use crate::schema::{attribute_signature, method_signature};
use crate::writer::Fragment;
use crate::EmitConfig;

pub struct StubEmitter<'a> {
    registry: &'a TypeRegistry,
    cfg: &'a EmitConfig,
}

impl<'a> StubEmitter<'a> {
    pub fn new(registry: &'a TypeRegistry, cfg: &'a EmitConfig) -> StubEmitter<'a> {
        StubEmitter { registry, cfg }
    }

    /// Emit direct stubs for every claimed feature, in schema order.
    pub fn emit_direct_stubs(
        &self,
        features: &[Feature],
        claimed: &BTreeSet<String>,
    ) -> Result<String, GenError> {
        let mut frag = Fragment::new();
        for feature in features {
            if !claimed.contains(&feature.name)
                || feature.manual_code.is_some()
                || self.cfg.is_discarded(&feature.name)
                || self.cfg.manual_functions.contains(&script_name(&feature.name))
            {
                continue;
            }
            match feature.kind {
                FeatureKind::Function => self.direct_method(&mut frag, feature)?,
                FeatureKind::Getter => self.direct_getter(&mut frag, feature)?,
                FeatureKind::Setter => self.direct_setter(&mut frag, feature)?,
                _ => {}
            }
        }
        Ok(frag.finish())
    }

    fn direct_method(&self, frag: &mut Fragment, feature: &Feature) -> Result<(), GenError> {
        let mut sig_params = Vec::new();
        let mut call_args = Vec::new();
        for (index, param) in feature.params.iter().enumerate() {
            if param.is_void() {
                call_args.push("0".to_owned());
                continue;
            }
            let desc = self.registry.lookup_or_err(&feature.name, &param.tag)?;
            let native = desc.native_param.ok_or_else(|| GenError::MissingTemplate {
                feature: feature.name.clone(),
                tag: param.tag.clone(),
                template: "native parameter type",
            })?;
            sig_params.push(declare(native, &param.name));
            let convert = desc.to_native_arg.ok_or_else(|| GenError::MissingTemplate {
                feature: feature.name.clone(),
                tag: param.tag.clone(),
                template: "native argument conversion",
            })?;
            call_args.push(convert(&Slots {
                arg: &param.name,
                target: "",
                index,
            }));
        }
        while call_args.len() < 2 {
            call_args.push("0".to_owned());
        }

        let native = native_name(&feature.name);
        let opcode = self.cfg.opcode(&feature.name);
        let return_tag = feature.return_tag();
        let call = format!(
            "SendCommand({}, {}, {})",
            opcode, call_args[0], call_args[1]
        );
        let call_line = if return_tag == "void" {
            format!("{call};")
        } else {
            let desc = self.registry.lookup_or_err(&feature.name, return_tag)?;
            let ret = desc.native_return.ok_or_else(|| GenError::MissingTemplate {
                feature: feature.name.clone(),
                tag: return_tag.to_owned(),
                template: "native return type",
            })?;
            sig_params.push(format!("{ret} *out_result"));
            format!("*out_result = ({ret}){call};")
        };

        self.reference_signature(frag, &method_signature(feature, self.registry)?);
        frag.line(
            0,
            &format!(
                "HostResult {}::{}({}) {{",
                self.cfg.class,
                native,
                sig_params.join(", ")
            ),
        );
        frag.line(4, &format!("HOST_TRACE(\"{}::{}\");", self.cfg.class, native));
        frag.line(4, &format!("HOST_CHECK_VALID(\"{native}\")"));
        frag.line(4, &call_line);
        frag.line(4, "return HOST_OK;");
        frag.line(0, "}");
        frag.blank();
        Ok(())
    }

    fn direct_getter(&self, frag: &mut Fragment, feature: &Feature) -> Result<(), GenError> {
        let return_tag = feature.return_tag();
        let desc = self.registry.lookup_or_err(&feature.name, return_tag)?;
        let ret = desc.native_return.ok_or_else(|| GenError::MissingTemplate {
            feature: feature.name.clone(),
            tag: return_tag.to_owned(),
            template: "native return type",
        })?;
        let native = native_name(&feature.name);
        self.reference_signature(frag, &attribute_signature(feature, self.registry)?);
        frag.line(
            0,
            &format!("HostResult {}::{}({} *out_value) {{", self.cfg.class, native, ret),
        );
        frag.line(4, &format!("HOST_TRACE(\"{}::{}\");", self.cfg.class, native));
        frag.line(4, &format!("HOST_CHECK_VALID(\"{native}\")"));
        frag.line(
            4,
            &format!(
                "*out_value = ({})SendCommand({}, 0, 0);",
                ret,
                self.cfg.opcode(&feature.name)
            ),
        );
        frag.line(4, "return HOST_OK;");
        frag.line(0, "}");
        frag.blank();
        Ok(())
    }

    fn direct_setter(&self, frag: &mut Fragment, feature: &Feature) -> Result<(), GenError> {
        let param = feature
            .params
            .iter()
            .find(|p| !p.is_void())
            .cloned()
            .unwrap_or_else(face_schema::Param::void);
        let desc = self.registry.lookup_or_err(&feature.name, &param.tag)?;
        let native = desc.native_param.ok_or_else(|| GenError::MissingTemplate {
            feature: feature.name.clone(),
            tag: param.tag.clone(),
            template: "native parameter type",
        })?;
        let convert = desc.to_native_arg.ok_or_else(|| GenError::MissingTemplate {
            feature: feature.name.clone(),
            tag: param.tag.clone(),
            template: "native argument conversion",
        })?;
        let arg = convert(&Slots {
            arg: &param.name,
            target: "",
            index: 0,
        });
        let method = native_name(&feature.name);
        frag.line(
            0,
            &format!(
                "HostResult {}::{}({}) {{",
                self.cfg.class,
                method,
                declare(native, &param.name)
            ),
        );
        frag.line(4, &format!("HOST_TRACE(\"{}::{}\");", self.cfg.class, method));
        frag.line(4, &format!("HOST_CHECK_VALID(\"{method}\")"));
        frag.line(
            4,
            &format!("SendCommand({}, {}, 0);", self.cfg.opcode(&feature.name), arg),
        );
        frag.line(4, "return HOST_OK;");
        frag.line(0, "}");
        frag.blank();
        Ok(())
    }

    fn reference_signature(&self, frag: &mut Fragment, signature: &str) {
        frag.line(0, "#if 0");
        frag.line(4, signature);
        frag.line(0, "#endif");
    }
}

/// Join a native type and a parameter name; pointer types already end in
/// `*` and take no separating space.
fn declare(native: &str, name: &str) -> String {
    if native.ends_with('*') {
        format!("{native}{name}")
    } else {
        format!("{native} {name}")
    }
}
