//! Project configuration file (facegen.toml).

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use face_emit::{ChunkIds, EmitConfig};
use face_schema::ManualOverride;

/// Parsed facegen.toml. Every section is optional; an absent file means
/// the built-in defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub naming: Naming,
    /// Features dropped from every generated surface.
    #[serde(default)]
    pub discard: Vec<String>,
    /// Script names left out of the interface description only.
    #[serde(default)]
    pub schema_omit: Vec<String>,
    /// Hand-implemented methods reached through the dispatch tables.
    #[serde(default)]
    pub manual_functions: Vec<String>,
    /// Script or attribute names claimed by the lite interface.
    #[serde(default)]
    pub lite: Vec<String>,
    #[serde(default)]
    pub manual: Manual,
}

/// Names of the generated native and script entities, from the [naming]
/// section.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Naming {
    #[serde(default = "default_interface")]
    pub interface: String,
    #[serde(default = "default_class")]
    pub class: String,
    #[serde(default = "default_opcode_prefix")]
    pub opcode_prefix: String,
    #[serde(default = "default_wrapper")]
    pub wrapper: String,
}

fn default_interface() -> String {
    "IEditView".to_owned()
}

fn default_class() -> String {
    "EditView".to_owned()
}

fn default_opcode_prefix() -> String {
    "EV_".to_owned()
}

fn default_wrapper() -> String {
    "editorWrapper".to_owned()
}

impl Default for Naming {
    fn default() -> Naming {
        Naming {
            interface: default_interface(),
            class: default_class(),
            opcode_prefix: default_opcode_prefix(),
            wrapper: default_wrapper(),
        }
    }
}

/// Hand-written accessor bodies from the [manual.getters.X] and
/// [manual.setters.X] tables, keyed by attribute name.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manual {
    #[serde(default)]
    pub getters: BTreeMap<String, ManualOverride>,
    #[serde(default)]
    pub setters: BTreeMap<String, ManualOverride>,
}

impl Config {
    /// Read and parse a facegen.toml from a file path.
    pub fn from_file(path: &Path) -> Result<Config, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
        Self::from_str(&content)
    }

    /// Parse a facegen.toml from a string.
    pub fn from_str(content: &str) -> Result<Config, String> {
        toml::from_str(content).map_err(|e| format!("Failed to parse config: {}", e))
    }

    /// Collapse the file-shaped config into emitter settings.
    pub fn emit_config(&self, stable_ids: bool) -> EmitConfig {
        EmitConfig {
            interface: self.naming.interface.clone(),
            class: self.naming.class.clone(),
            opcode_prefix: self.naming.opcode_prefix.clone(),
            wrapper: self.naming.wrapper.clone(),
            discard: self.discard.iter().cloned().collect(),
            schema_omit: self.schema_omit.iter().cloned().collect(),
            manual_functions: self.manual_functions.iter().cloned().collect(),
            lite: self.lite.iter().cloned().collect(),
            chunk_ids: if stable_ids {
                ChunkIds::Sequential
            } else {
                ChunkIds::Random
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let toml = r#"
discard = ["SCI_START", "formatRange"]
schema_omit = ["getStyledText"]
manual_functions = ["sendUpdateCommands"]
lite = ["addText", "currentPos"]

[naming]
interface = "IScintilla"
class = "Scintilla"
opcode_prefix = "SCI_"
wrapper = "scimozWrapper"

[manual.getters.text]
return_type = "string"
code = "return GetTextValue(result);"

[manual.setters.text]
code = "return SetTextValue(value);"
"#;
        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.naming.interface, "IScintilla");
        assert_eq!(config.naming.opcode_prefix, "SCI_");
        assert_eq!(config.discard, vec!["SCI_START", "formatRange"]);
        assert_eq!(config.manual.getters["text"].return_type.as_deref(), Some("string"));
        assert!(config.manual.setters["text"].return_type.is_none());

        let emit = config.emit_config(true);
        assert_eq!(emit.class, "Scintilla");
        assert!(emit.lite.contains("currentPos"));
        assert_eq!(emit.chunk_ids, ChunkIds::Sequential);
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config.naming.interface, "IEditView");
        assert_eq!(config.naming.class, "EditView");
        assert_eq!(config.naming.opcode_prefix, "EV_");
        assert_eq!(config.naming.wrapper, "editorWrapper");
        assert!(config.discard.is_empty());
        assert!(config.manual.getters.is_empty());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Config::from_str("[namign]\ninterface = \"X\"").is_err());
    }
}
