//! The schema fixer: raw feature records in, canonical feature table out.
//!
//! Classification is a two-pass fixed point:
//!
//! 1. Shape pass: getters with zero parameters stay getters and record a
//!    tentative partner; setters with exactly one parameter pair with an
//!    existing candidate or fall back to functions; anything displaced by a
//!    manual-getter override is marked overridden.
//! 2. Demotion pass: a setter whose recorded partner did not survive as a
//!    getter becomes a function; a getter whose recorded partner did not
//!    survive as a setter becomes read-only.
//!
//! Manual override tables merge last, suppressed from the generated schema
//! but pairing against the now-final getter set exactly like derived
//! features. Pairing failure is never an error; only derived-identifier
//! collisions are ([`verify_identifiers`]).
//!
//! The arity thresholds are deliberately asymmetric (`getter: 0 parameters`,
//! `setter: exactly 1`) and are load-bearing; see the tests.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use face_common::error::GenError;
use face_common::names::{attribute_name, opcode_symbol, pair_candidate, script_name, Accessor};
use face_schema::{Feature, FeatureKind, ManualOverride, RawFeature, RawKind};

/// Produce the canonical ordered feature table.
///
/// Deterministic given deterministic input order. Never fails: pairing
/// ambiguity resolves to function classification, and type tags are not
/// inspected here (emitters own that check, against the registry).
pub fn fix(
    raw: Vec<RawFeature>,
    manual_getters: &BTreeMap<String, ManualOverride>,
    manual_setters: &BTreeMap<String, ManualOverride>,
) -> Vec<Feature> {
    let mut features: Vec<Feature> = raw.into_iter().map(initial_feature).collect();
    let mut index: FxHashMap<String, usize> = features
        .iter()
        .enumerate()
        .map(|(i, f)| (f.name.clone(), i))
        .collect();

    classify_shapes(&mut features, &index, manual_getters);
    demote_unpaired(&mut features, &index);
    merge_manual(&mut features, &mut index, manual_getters, manual_setters);

    features
}

/// Map a raw record onto its initial (pre-classification) feature.
fn initial_feature(raw: RawFeature) -> Feature {
    let kind = match raw.kind {
        RawKind::Val => FeatureKind::Constant,
        RawKind::Fun => FeatureKind::Function,
        RawKind::Get => FeatureKind::Getter,
        RawKind::Set => FeatureKind::Setter,
    };
    let param_count = raw.params.iter().filter(|p| !p.is_void()).count();
    Feature {
        name: raw.name,
        kind,
        return_type: raw.return_type,
        params: raw.params,
        param_count,
        matching: None,
        suppress_schema: false,
        comment: raw.comment,
        value: raw.value,
        manual_code: None,
    }
}

/// Pass 1: classify by shape, record tentative pairing, apply manual-getter
/// displacement.
fn classify_shapes(
    features: &mut [Feature],
    index: &FxHashMap<String, usize>,
    manual_getters: &BTreeMap<String, ManualOverride>,
) {
    for i in 0..features.len() {
        let name = features[i].name.clone();
        match features[i].kind {
            FeatureKind::Getter => {
                if features[i].param_count != 0 {
                    // A getter with an argument reads nothing; it is a call.
                    features[i].kind = FeatureKind::Function;
                } else {
                    let candidate = pair_candidate(&name, Accessor::Setter);
                    features[i].matching = index.contains_key(&candidate).then_some(candidate);
                }
            }
            FeatureKind::Setter => {
                if features[i].param_count != 1 {
                    features[i].kind = FeatureKind::Function;
                } else {
                    let candidate = pair_candidate(&name, Accessor::Getter);
                    if index.contains_key(&candidate) {
                        features[i].matching = Some(candidate);
                    } else {
                        // A setter with no getter is really a function.
                        features[i].kind = FeatureKind::Function;
                    }
                }
            }
            _ => {}
        }

        if matches!(
            features[i].kind,
            FeatureKind::Function | FeatureKind::Getter
        ) && manual_getters.contains_key(&attribute_name(&name))
        {
            features[i].kind = FeatureKind::Overridden;
            features[i].matching = None;
        }
    }
}

/// Pass 2: demote setters whose partner is not a getter, then drop getter
/// links pointing at anything that is not a setter.
///
/// Returns whether anything changed, so the fixed point is checkable.
fn demote_unpaired(features: &mut [Feature], index: &FxHashMap<String, usize>) -> bool {
    let mut changed = false;
    for i in 0..features.len() {
        if features[i].kind != FeatureKind::Setter {
            continue;
        }
        let partner_kind = features[i]
            .matching
            .as_ref()
            .and_then(|m| index.get(m))
            .map(|&j| features[j].kind);
        if partner_kind != Some(FeatureKind::Getter) {
            features[i].kind = FeatureKind::Function;
            features[i].matching = None;
            changed = true;
        }
    }
    for i in 0..features.len() {
        if features[i].kind != FeatureKind::Getter {
            continue;
        }
        let partner_kind = features[i]
            .matching
            .as_ref()
            .and_then(|m| index.get(m))
            .map(|&j| features[j].kind);
        if features[i].matching.is_some() && partner_kind != Some(FeatureKind::Setter) {
            features[i].matching = None;
            changed = true;
        }
    }
    changed
}

/// Merge the manual override tables, getters first.
///
/// A manual entry with the same declared name as an existing feature of the
/// same accessor kind replaces it. Manual setters pair against the final
/// getter set and install the reverse link on the paired getter, making its
/// attribute read/write. A setter whose declared name is itself a getter's
/// name (the tables commonly share one attribute key) keeps both records,
/// paired with each other.
fn merge_manual(
    features: &mut Vec<Feature>,
    index: &mut FxHashMap<String, usize>,
    manual_getters: &BTreeMap<String, ManualOverride>,
    manual_setters: &BTreeMap<String, ManualOverride>,
) {
    for (name, entry) in manual_getters {
        let feature = manual_feature(name, FeatureKind::Getter, entry, None);
        upsert(features, index, feature);
    }
    for (name, entry) in manual_setters {
        let same_name_getter = index
            .get(name)
            .copied()
            .filter(|&gi| features[gi].kind == FeatureKind::Getter);
        if let Some(gi) = same_name_getter {
            features[gi].matching = Some(name.clone());
            let feature =
                manual_feature(name, FeatureKind::Setter, entry, Some(name.clone()));
            // The name already indexes the getter; the setter rides along
            // unindexed, exactly like a derived accessor pair sharing an
            // attribute.
            features.push(feature);
            continue;
        }
        let candidate = pair_candidate(name, Accessor::Getter);
        let getter = index
            .get(&candidate)
            .copied()
            .filter(|&gi| features[gi].kind == FeatureKind::Getter);
        if let Some(gi) = getter {
            features[gi].matching = Some(name.clone());
        }
        let matching = getter.map(|_| candidate);
        let feature = manual_feature(name, FeatureKind::Setter, entry, matching);
        upsert(features, index, feature);
    }
}

fn manual_feature(
    name: &str,
    kind: FeatureKind,
    entry: &ManualOverride,
    matching: Option<String>,
) -> Feature {
    Feature {
        name: name.to_string(),
        kind,
        return_type: entry.return_type.clone(),
        params: Vec::new(),
        param_count: usize::from(kind == FeatureKind::Setter),
        matching,
        suppress_schema: true,
        comment: Vec::new(),
        value: None,
        manual_code: Some(entry.code.clone()),
    }
}

fn upsert(features: &mut Vec<Feature>, index: &mut FxHashMap<String, usize>, feature: Feature) {
    match index.get(&feature.name) {
        Some(&i) => features[i] = feature,
        None => {
            index.insert(feature.name.clone(), features.len());
            features.push(feature);
        }
    }
}

/// Verify the global injectivity invariant: no two distinct declared names
/// may derive the same runtime identifier. The single allowed overlap is a
/// paired getter/setter sharing one attribute name, which never reaches this
/// check because setters route through their getter's identifier.
pub fn verify_identifiers(features: &[Feature], opcode_prefix: &str) -> Result<(), GenError> {
    let mut seen: FxHashMap<String, &str> = FxHashMap::default();
    for feature in features {
        let identifier = match feature.kind {
            FeatureKind::Constant => opcode_symbol(&feature.name, opcode_prefix),
            FeatureKind::Function => format!(
                "METHOD_{}",
                script_name(&feature.name).to_ascii_uppercase()
            ),
            FeatureKind::Getter => format!(
                "PROP_{}",
                attribute_name(&feature.name).to_ascii_uppercase()
            ),
            FeatureKind::Setter | FeatureKind::Overridden => continue,
        };
        if let Some(first) = seen.get(&identifier) {
            return Err(GenError::IdentifierCollision {
                identifier,
                first: first.to_string(),
                second: feature.name.clone(),
            });
        }
        seen.insert(identifier, &feature.name);
    }
    Ok(())
}
