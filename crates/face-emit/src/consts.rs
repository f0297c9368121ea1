//! Constants fragment.

use face_schema::{Feature, FeatureKind};

use crate::writer::Fragment;
use crate::EmitConfig;

/// Render every surviving constant as a scriptable `const long`
/// declaration, preceded by its schema comments. Constants land in a
/// dedicated fragment so they never count against chunk slots.
pub fn emit_constants(features: &[Feature], cfg: &EmitConfig) -> String {
    let mut frag = Fragment::new();
    for feature in features {
        if feature.kind != FeatureKind::Constant || cfg.is_discarded(&feature.name) {
            continue;
        }
        frag.comments(8, &feature.comment);
        let value = feature.value.as_deref().unwrap_or("0");
        frag.line(8, &format!("const long {} = {};", feature.name, value));
    }
    frag.finish()
}
