//! Runtime dispatch tables.
//!
//! Everything that is not lite-claimed reaches the control through the
//! script host's property and method hooks. This emitter produces, in
//! order: the identifier declarations, the one-shot identifier
//! initializer, `HasMethod`/`Invoke`, and `HasProperty`/`GetProperty`/
//! `SetProperty`. Identifier sets are sorted unions so regeneration is
//! stable, and every unknown-identifier path warns and fails closed.

use std::collections::BTreeSet;

use face_common::error::GenError;
use face_common::names::{attribute_name, native_name, script_name};
use face_schema::{Feature, FeatureKind, Slots, TypeRegistry};

use crate::writer::Fragment;
use crate::EmitConfig;

pub struct DispatchEmitter<'a> {
    registry: &'a TypeRegistry,
    cfg: &'a EmitConfig,
}

impl<'a> DispatchEmitter<'a> {
    pub fn new(registry: &'a TypeRegistry, cfg: &'a EmitConfig) -> DispatchEmitter<'a> {
        DispatchEmitter { registry, cfg }
    }

    pub fn emit(&self, features: &[Feature], claimed: &BTreeSet<String>) -> Result<String, GenError> {
        let methods = self.method_names(features, claimed);
        let props = self.prop_names(features, claimed);
        let mut frag = Fragment::new();
        self.identifiers(&mut frag, &methods, &props);
        self.init(&mut frag, &methods, &props);
        self.has_method(&mut frag, &methods);
        self.invoke(&mut frag, features, claimed)?;
        self.has_property(&mut frag, &props);
        self.get_property(&mut frag, features, claimed)?;
        self.set_property(&mut frag, features, claimed)?;
        Ok(frag.finish())
    }

    /// Script-visible method names: generated functions plus the manual
    /// function table, minus discards and lite claims.
    fn method_names(&self, features: &[Feature], claimed: &BTreeSet<String>) -> BTreeSet<String> {
        let mut methods: BTreeSet<String> = features
            .iter()
            .filter(|f| {
                f.kind == FeatureKind::Function
                    && !claimed.contains(&f.name)
                    && !self.cfg.is_discarded(&f.name)
            })
            .map(|f| script_name(&f.name))
            .collect();
        for manual in &self.cfg.manual_functions {
            let name = script_name(manual);
            if !self.cfg.is_discarded(&name) {
                methods.insert(name);
            }
        }
        methods
    }

    /// Script-visible property names: one per surviving getter or setter.
    fn prop_names(&self, features: &[Feature], claimed: &BTreeSet<String>) -> BTreeSet<String> {
        features
            .iter()
            .filter(|f| {
                matches!(f.kind, FeatureKind::Getter | FeatureKind::Setter)
                    && !claimed.contains(&f.name)
                    && !self.cfg.is_discarded(&f.name)
            })
            .map(|f| attribute_name(&f.name))
            .collect()
    }

    fn identifiers(&self, frag: &mut Fragment, methods: &BTreeSet<String>, props: &BTreeSet<String>) {
        for method in methods {
            frag.line(0, &format!("static ScriptIdent METHOD_{};", method.to_ascii_uppercase()));
        }
        for prop in props {
            frag.line(0, &format!("static ScriptIdent PROP_{};", prop.to_ascii_uppercase()));
        }
        frag.blank();
    }

    fn init(&self, frag: &mut Fragment, methods: &BTreeSet<String>, props: &BTreeSet<String>) {
        frag.line(0, "static bool identifiers_initialized = false;");
        frag.blank();
        frag.line(0, &format!("void {}::InitIdentifiers() {{", self.cfg.class));
        frag.line(4, "if (identifiers_initialized) {");
        frag.line(8, "return;");
        frag.line(4, "}");
        frag.line(4, "identifiers_initialized = true;");
        for method in methods {
            frag.line(
                4,
                &format!("METHOD_{} = host_ident(\"{}\");", method.to_ascii_uppercase(), method),
            );
        }
        for prop in props {
            frag.line(
                4,
                &format!("PROP_{} = host_ident(\"{}\");", prop.to_ascii_uppercase(), prop),
            );
        }
        frag.line(0, "}");
        frag.blank();
    }

    fn has_method(&self, frag: &mut Fragment, methods: &BTreeSet<String>) {
        frag.line(0, &format!("bool {}::HasMethod(ScriptIdent ident) {{", self.cfg.class));
        frag.line(4, "if (false ||");
        for method in methods {
            frag.line(8, &format!("ident == METHOD_{} ||", method.to_ascii_uppercase()));
        }
        frag.line(8, "false)");
        frag.line(8, "return true;");
        frag.line(4, "return false;");
        frag.line(0, "}");
        frag.blank();
    }

    fn has_property(&self, frag: &mut Fragment, props: &BTreeSet<String>) {
        frag.line(0, &format!("bool {}::HasProperty(ScriptIdent ident) {{", self.cfg.class));
        frag.line(4, "if (false ||");
        for prop in props {
            frag.line(8, &format!("ident == PROP_{} ||", prop.to_ascii_uppercase()));
        }
        frag.line(8, "false)");
        frag.line(8, "return true;");
        frag.line(4, "return false;");
        frag.line(0, "}");
        frag.blank();
    }

    fn invoke(
        &self,
        frag: &mut Fragment,
        features: &[Feature],
        claimed: &BTreeSet<String>,
    ) -> Result<(), GenError> {
        frag.line(
            0,
            &format!(
                "bool {}::Invoke(HostInstance instance, ScriptIdent ident, const ScriptVal *args,",
                self.cfg.class
            ),
        );
        let align = " ".repeat("bool ::Invoke(".len() + self.cfg.class.len());
        frag.line(0, &format!("{align}uint32_t argCount, ScriptVal *result) {{"));
        let mut emitted = BTreeSet::new();
        for feature in features {
            if feature.kind != FeatureKind::Function
                || claimed.contains(&feature.name)
                || self.cfg.is_discarded(&feature.name)
            {
                continue;
            }
            let script = script_name(&feature.name);
            if self.cfg.manual_functions.contains(&script) {
                self.manual_invoke_fragment(frag, &script);
            } else {
                self.invoke_fragment(frag, feature)?;
            }
            emitted.insert(script);
        }
        // Manual functions with no schema record still answer here.
        for manual in &self.cfg.manual_functions {
            let script = script_name(manual);
            if !emitted.contains(&script) && !self.cfg.is_discarded(&script) {
                self.manual_invoke_fragment(frag, &script);
            }
        }
        frag.line(
            4,
            &format!(
                "host_warn(\"{}::Invoke: unknown method %s\", host_ident_name(ident));",
                self.cfg.class
            ),
        );
        frag.line(4, "return false;");
        frag.line(0, "}");
        frag.blank();
        Ok(())
    }

    fn invoke_fragment(&self, frag: &mut Fragment, feature: &Feature) -> Result<(), GenError> {
        let script = script_name(&feature.name);
        let native = native_name(&feature.name);
        frag.line(4, &format!("if (ident == METHOD_{}) {{", script.to_ascii_uppercase()));
        frag.line(8, &format!("/* ## generated method: {script} ## */"));
        frag.line(8, &format!("HOST_TRACE(\"{}::{}\");", self.cfg.class, native));
        frag.line(8, &format!("HOST_CHECK_STATE(\"{native}\", false)"));
        frag.line(8, &format!("if (argCount != {}) return false;", feature.param_count));

        let mut call_args = Vec::new();
        let mut post_blocks = Vec::new();
        let mut used_args = 0usize;
        for param in &feature.params {
            if param.is_void() {
                frag.line(8, &format!("/* arg {used_args} of type void */"));
                call_args.push("0".to_owned());
                continue;
            }
            let desc = self.registry.lookup_or_err(&feature.name, &param.tag)?;
            let arg = format!("args[{used_args}]");
            let slots = Slots {
                arg: &arg,
                target: "*result",
                index: used_args,
            };
            frag.line(8, &format!("/* arg {} of type {} */", used_args, param.tag));
            frag.line(8, &format!("if (!{}({})) return false;", desc.check, arg));
            if let Some(pre) = desc.from_script_pre {
                frag.block(8, &pre(&slots));
            }
            let convert = desc.from_script.ok_or_else(|| GenError::MissingTemplate {
                feature: feature.name.clone(),
                tag: param.tag.clone(),
                template: "script-to-native conversion",
            })?;
            call_args.push(convert(&slots));
            if let Some(post) = desc.from_script_post {
                post_blocks.push(post(&slots));
            }
            used_args += 1;
        }
        while call_args.len() < 2 {
            call_args.push("0".to_owned());
        }

        frag.line(
            8,
            &format!(
                "sptr_t rv = SendCommand({}, {}, {});",
                self.cfg.opcode(&feature.name),
                call_args[0],
                call_args[1]
            ),
        );
        let return_tag = feature.return_tag();
        if return_tag == "void" {
            frag.line(8, "/* eat unused return value */");
            frag.line(8, "(void)rv;");
        } else {
            let desc = self.registry.lookup_or_err(&feature.name, return_tag)?;
            let to_script = desc.to_script.ok_or_else(|| GenError::MissingTemplate {
                feature: feature.name.clone(),
                tag: return_tag.to_owned(),
                template: "native-to-script conversion",
            })?;
            frag.line(8, &format!("/* return value of type {return_tag} */"));
            frag.block(
                8,
                &to_script(&Slots {
                    arg: "rv",
                    target: "*result",
                    index: 0,
                }),
            );
        }
        for block in post_blocks {
            frag.block(8, &block);
        }
        frag.line(8, "return true;");
        frag.line(4, "}");
        Ok(())
    }

    fn manual_invoke_fragment(&self, frag: &mut Fragment, script: &str) {
        let native = native_name(script);
        frag.line(4, &format!("if (ident == METHOD_{}) {{", script.to_ascii_uppercase()));
        frag.line(8, &format!("/* ## manually implemented method: {script} ## */"));
        frag.line(8, &format!("HOST_TRACE(\"{}::{}\");", self.cfg.class, native));
        frag.line(8, &format!("HOST_CHECK_STATE(\"{native}\", false)"));
        frag.line(8, &format!("return {native}(args, argCount, result);"));
        frag.line(4, "}");
    }

    fn get_property(
        &self,
        frag: &mut Fragment,
        features: &[Feature],
        claimed: &BTreeSet<String>,
    ) -> Result<(), GenError> {
        frag.line(
            0,
            &format!("bool {}::GetProperty(ScriptIdent ident, ScriptVal *result) {{", self.cfg.class),
        );
        for feature in features {
            if feature.kind != FeatureKind::Getter
                || claimed.contains(&feature.name)
                || self.cfg.is_discarded(&feature.name)
            {
                continue;
            }
            if feature.manual_code.is_some() {
                self.manual_accessor_fragment(frag, feature, "getter");
            } else {
                self.getter_fragment(frag, feature)?;
            }
        }
        frag.line(
            4,
            &format!(
                "host_warn(\"{}::GetProperty: unknown property %s\", host_ident_name(ident));",
                self.cfg.class
            ),
        );
        frag.line(4, "return false;");
        frag.line(0, "}");
        frag.blank();
        Ok(())
    }

    fn getter_fragment(&self, frag: &mut Fragment, feature: &Feature) -> Result<(), GenError> {
        let attribute = attribute_name(&feature.name);
        let native = native_name(&feature.name);
        let desc = self.registry.lookup_or_err(&feature.name, feature.return_tag())?;
        let accessor = desc.accessor.ok_or_else(|| GenError::MissingTemplate {
            feature: feature.name.clone(),
            tag: feature.return_tag().to_owned(),
            template: "direct accessor",
        })?;
        frag.line(4, &format!("if (ident == PROP_{}) {{", attribute.to_ascii_uppercase()));
        frag.line(8, &format!("/* ## generated getter: {attribute} ## */"));
        frag.line(8, &format!("HOST_TRACE(\"{}::{}\");", self.cfg.class, native));
        frag.line(8, &format!("HOST_CHECK_STATE(\"{native}\", false)"));
        frag.block(8, &accessor(&self.cfg.opcode(&feature.name)));
        frag.line(8, "return true;");
        frag.line(4, "}");
        Ok(())
    }

    fn set_property(
        &self,
        frag: &mut Fragment,
        features: &[Feature],
        claimed: &BTreeSet<String>,
    ) -> Result<(), GenError> {
        frag.line(
            0,
            &format!(
                "bool {}::SetProperty(ScriptIdent ident, const ScriptVal *value) {{",
                self.cfg.class
            ),
        );
        for feature in features {
            if feature.kind != FeatureKind::Setter
                || claimed.contains(&feature.name)
                || self.cfg.is_discarded(&feature.name)
            {
                continue;
            }
            if feature.manual_code.is_some() {
                self.manual_accessor_fragment(frag, feature, "setter");
            } else {
                self.setter_fragment(frag, feature)?;
            }
        }
        frag.line(
            4,
            &format!(
                "host_warn(\"{}::SetProperty: unknown property %s\", host_ident_name(ident));",
                self.cfg.class
            ),
        );
        frag.line(4, "return false;");
        frag.line(0, "}");
        frag.blank();
        Ok(())
    }

    fn setter_fragment(&self, frag: &mut Fragment, feature: &Feature) -> Result<(), GenError> {
        let attribute = attribute_name(&feature.name);
        let native = native_name(&feature.name);
        frag.line(4, &format!("if (ident == PROP_{}) {{", attribute.to_ascii_uppercase()));
        frag.line(8, &format!("/* ## generated setter: {attribute} ## */"));
        frag.line(8, &format!("HOST_TRACE(\"{}::{}\");", self.cfg.class, native));
        frag.line(8, &format!("HOST_CHECK_STATE(\"{native}\", false)"));

        let mut call_args = Vec::new();
        let mut post_blocks = Vec::new();
        let mut used_args = 0usize;
        for param in &feature.params {
            if param.is_void() {
                call_args.push("0".to_owned());
                continue;
            }
            let desc = self.registry.lookup_or_err(&feature.name, &param.tag)?;
            let slots = Slots {
                arg: "*value",
                target: "*result",
                index: used_args,
            };
            frag.line(8, &format!("/* arg {} of type {} */", used_args, param.tag));
            frag.line(8, &format!("if (!{}(*value)) {{", desc.check));
            frag.line(12, &format!("host_warn(\"{attribute} setter: argument has invalid type\");"));
            frag.line(12, "return false;");
            frag.line(8, "}");
            if let Some(pre) = desc.from_script_pre {
                frag.block(8, &pre(&slots));
            }
            let convert = desc.from_script.ok_or_else(|| GenError::MissingTemplate {
                feature: feature.name.clone(),
                tag: param.tag.clone(),
                template: "script-to-native conversion",
            })?;
            call_args.push(convert(&slots));
            if let Some(post) = desc.from_script_post {
                post_blocks.push(post(&slots));
            }
            used_args += 1;
        }
        while call_args.len() < 2 {
            call_args.push("0".to_owned());
        }

        frag.line(
            8,
            &format!(
                "SendCommand({}, {}, {});",
                self.cfg.opcode(&feature.name),
                call_args[0],
                call_args[1]
            ),
        );
        for block in post_blocks {
            frag.block(8, &block);
        }
        frag.line(8, "return true;");
        frag.line(4, "}");
        Ok(())
    }

    /// A hand-written accessor body, pasted verbatim with `{target}`
    /// resolved. The body is expected to return; falling off its end is a
    /// generation-time bug surfaced at runtime.
    fn manual_accessor_fragment(&self, frag: &mut Fragment, feature: &Feature, which: &str) {
        let attribute = attribute_name(&feature.name);
        frag.line(4, &format!("if (ident == PROP_{}) {{", attribute.to_ascii_uppercase()));
        frag.line(8, &format!("/* ## manually implemented {which}: {attribute} ## */"));
        let code = feature
            .manual_code
            .as_deref()
            .unwrap_or_default()
            .replace("{target}", "*result");
        frag.block(8, &code);
        frag.line(
            8,
            &format!(
                "host_warn(\"{}::{}: ran past end of manual {}\");",
                self.cfg.class, attribute, which
            ),
        );
        frag.line(8, "return false;");
        frag.line(4, "}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use face_schema::Param;

    fn function(name: &str, ret: Option<&str>, params: &[(&str, &str)]) -> Feature {
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
            return_type: ret.map(str::to_owned),
            param_count: params.iter().filter(|p| !p.is_void()).count(),
            params,
            matching: None,
            suppress_schema: false,
            comment: Vec::new(),
            value: None,
            manual_code: None,
        }
    }

    fn getter(name: &str, tag: &str) -> Feature {
        Feature {
            name: name.to_owned(),
            kind: FeatureKind::Getter,
            return_type: Some(tag.to_owned()),
            params: Vec::new(),
            param_count: 0,
            matching: None,
            suppress_schema: false,
            comment: Vec::new(),
            value: None,
            manual_code: None,
        }
    }

    fn setter(name: &str, tag: &str) -> Feature {
        Feature {
            name: name.to_owned(),
            kind: FeatureKind::Setter,
            return_type: None,
            params: vec![Param {
                tag: tag.to_owned(),
                name: "value".to_owned(),
                value: None,
            }],
            param_count: 1,
            matching: None,
            suppress_schema: false,
            comment: Vec::new(),
            value: None,
            manual_code: None,
        }
    }

    fn emit(features: &[Feature], cfg: &EmitConfig) -> String {
        let registry = TypeRegistry::builtin();
        DispatchEmitter::new(&registry, cfg)
            .emit(features, &BTreeSet::new())
            .unwrap()
    }

    #[test]
    fn identifiers_are_declared_and_initialized_once() {
        let features = vec![
            function("GotoLine", None, &[("int", "line")]),
            getter("GetCurrentPos", "position"),
        ];
        let out = emit(&features, &EmitConfig::default());
        assert!(out.contains("static ScriptIdent METHOD_GOTOLINE;"));
        assert!(out.contains("static ScriptIdent PROP_CURRENTPOS;"));
        assert!(out.contains("if (identifiers_initialized) {"));
        assert!(out.contains("METHOD_GOTOLINE = host_ident(\"gotoLine\");"));
        assert!(out.contains("PROP_CURRENTPOS = host_ident(\"currentPos\");"));
    }

    #[test]
    fn invoke_branch_checks_marshals_and_calls() {
        let features = vec![function("GotoLine", None, &[("int", "line")])];
        let out = emit(&features, &EmitConfig::default());
        assert!(out.contains("if (ident == METHOD_GOTOLINE) {"));
        assert!(out.contains("if (argCount != 1) return false;"));
        assert!(out.contains("if (!SCRIPTVAL_IS_INT(args[0])) return false;"));
        assert!(out.contains(
            "sptr_t rv = SendCommand(EV_GOTOLINE, (uptr_t)SCRIPTVAL_TO_INT(args[0]), 0);"
        ));
        assert!(out.contains("(void)rv;"));
        assert!(out.contains("host_warn(\"EditView::Invoke: unknown method %s\", host_ident_name(ident));"));
    }

    #[test]
    fn invoke_branch_converts_the_return_value() {
        let features = vec![function("LineFromPosition", Some("int"), &[("position", "pos")])];
        let out = emit(&features, &EmitConfig::default());
        assert!(out.contains("/* return value of type int */"));
        assert!(out.contains("INT_TO_SCRIPTVAL((int32_t)rv, *result);"));
    }

    #[test]
    fn stringresult_argument_produces_post_call_write_back() {
        let features = vec![function(
            "GetCurLine",
            Some("int"),
            &[("int", "length"), ("stringresult", "text")],
        )];
        let out = emit(&features, &EmitConfig::default());
        assert!(out.contains("static char buffer_1[32 * 1024];"));
        // The write-back runs after the call converts the return value.
        let call = out.find("sptr_t rv = SendCommand(EV_GETCURLINE,").unwrap();
        let post = out.find("host_set_property(instance, SCRIPTVAL_TO_OBJECT(args[1]),").unwrap();
        assert!(post > call);
    }

    #[test]
    fn manual_functions_dispatch_without_marshaling() {
        let mut cfg = EmitConfig::default();
        cfg.manual_functions.insert("sendUpdateCommands".to_owned());
        let out = emit(&[], &cfg);
        assert!(out.contains("static ScriptIdent METHOD_SENDUPDATECOMMANDS;"));
        assert!(out.contains("/* ## manually implemented method: sendUpdateCommands ## */"));
        assert!(out.contains("return SendUpdateCommands(args, argCount, result);"));
    }

    #[test]
    fn getter_and_setter_branches() {
        let features = vec![getter("GetCurrentPos", "position"), setter("SetCurrentPos", "position")];
        let out = emit(&features, &EmitConfig::default());
        assert!(out.contains(
            "INT_TO_SCRIPTVAL((int32_t)SendCommand(EV_GETCURRENTPOS, 0, 0), *result);"
        ));
        assert!(out.contains("host_warn(\"currentPos setter: argument has invalid type\");"));
        assert!(out.contains("SendCommand(EV_SETCURRENTPOS, (uptr_t)SCRIPTVAL_TO_INT(*value), 0);"));
    }

    #[test]
    fn manual_getter_body_is_pasted_with_target_resolved() {
        let mut feature = getter("GetText", "string");
        feature.suppress_schema = true;
        feature.manual_code = Some("STRINGZ_TO_SCRIPTVAL(copy, {target});\nreturn true;".to_owned());
        let out = emit(&[feature], &EmitConfig::default());
        assert!(out.contains("/* ## manually implemented getter: text ## */"));
        assert!(out.contains("STRINGZ_TO_SCRIPTVAL(copy, *result);"));
        assert!(out.contains("host_warn(\"EditView::text: ran past end of manual getter\");"));
    }

    #[test]
    fn discarded_and_claimed_features_never_dispatch() {
        let features = vec![
            function("GotoLine", None, &[("int", "line")]),
            function("AddText", None, &[("int", "length"), ("string", "text")]),
        ];
        let mut cfg = EmitConfig::default();
        cfg.discard.insert("gotoLine".to_owned());
        let registry = TypeRegistry::builtin();
        let claimed: BTreeSet<String> = ["AddText".to_owned()].into();
        let out = DispatchEmitter::new(&registry, &cfg)
            .emit(&features, &claimed)
            .unwrap();
        assert!(!out.contains("METHOD_GOTOLINE"));
        assert!(!out.contains("METHOD_ADDTEXT"));
    }
}
