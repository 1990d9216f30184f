use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Used only when the catalog has no canonical groups at all.
pub const UNCATEGORIZED_GROUP: &str = "Other";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub keywords: Vec<String>,
    pub group: String,
}

/// Lookup tables for resolving free-text muscle labels to canonical groups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MuscleRules {
    pub synonyms: BTreeMap<String, String>,
    pub keywords: Vec<KeywordRule>,
}

type Layer = fn(&MuscleRules, &str, &[String]) -> Option<String>;

// Evaluated top to bottom; the first layer returning a group wins.
const LAYERS: [Layer; 4] = [
    MuscleRules::match_synonym,
    MuscleRules::match_compound,
    MuscleRules::match_whole_canonical,
    MuscleRules::match_keyword,
];

impl Default for MuscleRules {
    fn default() -> Self {
        // Values use the catalog's own spelling so canonical labels resolve to themselves.
        let synonyms = [
            ("quads", "Quads"),
            ("hamstrings", "Hamstrings"),
            ("hams", "Hamstrings"),
            ("glutes", "Glutes"),
            ("calves", "Calves"),
            ("abs", "Abs"),
            ("abs, core", "Abs"),
            ("biceps", "Biceps"),
            ("triceps", "Triceps"),
            ("chest", "Chest"),
            ("pecs", "Chest"),
            ("shoulders", "Shoulders"),
            ("delts", "Shoulders"),
            ("lats", "Lats"),
            ("traps", "Traps"),
            ("forearms", "Forearms"),
            ("lower back", "Lower Back"),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect::<BTreeMap<_, _>>();

        let keywords = [
            (&["chest", "pec"][..], "Chest"),
            (&["shoulder", "deltoid"][..], "Shoulders"),
            (&["back", "lat"][..], "Lats"),
            (&["bicep"][..], "Biceps"),
            (&["tricep"][..], "Triceps"),
            (&["quad", "thigh"][..], "Quads"),
            (&["hamstring"][..], "Hamstrings"),
            (&["glute"][..], "Glutes"),
            (&["calf"][..], "Calves"),
            (&["ab", "core"][..], "Abs"),
        ]
        .into_iter()
        .map(|(keywords, group)| KeywordRule {
            keywords: keywords.iter().map(|keyword| keyword.to_string()).collect(),
            group: group.to_string(),
        })
        .collect::<Vec<_>>();

        Self { synonyms, keywords }
    }
}

impl MuscleRules {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read muscle rules file: {}", path.display()))?;
        let parsed: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse muscle rules file: {}", path.display()))?;

        Ok(parsed.normalized())
    }

    /// Resolves `raw` to exactly one group. Never fails: unknown labels fall
    /// back to the first canonical group.
    pub fn normalize(&self, raw: &str, canonical: &[String]) -> String {
        LAYERS
            .iter()
            .find_map(|layer| layer(self, raw, canonical))
            .unwrap_or_else(|| {
                let fallback = canonical
                    .first()
                    .cloned()
                    .unwrap_or_else(|| UNCATEGORIZED_GROUP.to_string());
                warn!(label = raw, fallback = %fallback, "unrecognized muscle group label");
                fallback
            })
    }

    fn match_synonym(&self, raw: &str, canonical: &[String]) -> Option<String> {
        // A label the catalog already uses is never rewritten.
        if match_canonical(raw, canonical).is_some() {
            return None;
        }

        self.synonyms.get(&raw.trim().to_lowercase()).cloned()
    }

    fn match_compound(&self, raw: &str, canonical: &[String]) -> Option<String> {
        if !raw.contains(',') {
            return None;
        }

        raw.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .find_map(|part| {
                self.match_synonym(part, canonical)
                    .or_else(|| match_canonical(part, canonical))
            })
    }

    fn match_whole_canonical(&self, raw: &str, canonical: &[String]) -> Option<String> {
        match_canonical(raw, canonical)
    }

    fn match_keyword(&self, raw: &str, _canonical: &[String]) -> Option<String> {
        let lowered = raw.to_lowercase();

        self.keywords
            .iter()
            .find(|rule| {
                rule.keywords
                    .iter()
                    .any(|keyword| lowered.contains(keyword.as_str()))
            })
            .map(|rule| rule.group.clone())
    }

    fn normalized(self) -> Self {
        let synonyms = self
            .synonyms
            .into_iter()
            .map(|(key, value)| (key.trim().to_lowercase(), value.trim().to_string()))
            .collect::<BTreeMap<_, _>>();

        let keywords = self
            .keywords
            .into_iter()
            .map(|rule| KeywordRule {
                keywords: rule
                    .keywords
                    .into_iter()
                    .map(|keyword| keyword.trim().to_lowercase())
                    .filter(|keyword| !keyword.is_empty())
                    .collect(),
                group: rule.group.trim().to_string(),
            })
            .collect::<Vec<_>>();

        Self { synonyms, keywords }
    }
}

fn match_canonical(raw: &str, canonical: &[String]) -> Option<String> {
    let needle = raw.trim().to_lowercase();

    canonical
        .iter()
        .find(|group| group.trim().to_lowercase() == needle)
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::{KeywordRule, MuscleRules, UNCATEGORIZED_GROUP};
    use std::collections::BTreeMap;

    fn canonical(groups: &[&str]) -> Vec<String> {
        groups.iter().map(|group| group.to_string()).collect()
    }

    #[test]
    fn canonical_labels_are_returned_unchanged() {
        let rules = MuscleRules::default();
        let groups = canonical(&["Pectorals", "Upper Back", "Rear Delts"]);

        for group in &groups {
            assert_eq!(&rules.normalize(group, &groups), group);
        }
    }

    #[test]
    fn catalog_spelling_wins_over_synonyms() {
        let rules = MuscleRules::default();
        let groups = canonical(&["Delts", "quads", "Pecs", "Hams", "abs"]);

        for group in &groups {
            assert_eq!(&rules.normalize(group, &groups), group);
        }
        assert_eq!(rules.normalize("DELTS", &groups), "Delts");
        assert_eq!(rules.normalize("back, pecs", &groups), "Pecs");
    }

    #[test]
    fn synonyms_resolve_spellings_missing_from_catalog() {
        let rules = MuscleRules::default();
        let groups = canonical(&["Quadriceps"]);

        assert_eq!(rules.normalize("QUADS", &groups), "Quads");
        assert_eq!(rules.normalize("Abs, Core", &groups), "Abs");
    }

    #[test]
    fn compound_label_uses_first_resolvable_part() {
        let rules = MuscleRules::default();
        let groups = canonical(&["Chest", "Biceps"]);

        assert_eq!(rules.normalize("back, biceps", &groups), "Biceps");
        assert_eq!(rules.normalize("Forearm Flexors, chest", &groups), "Chest");
    }

    #[test]
    fn compound_part_can_match_canonical_case_insensitively() {
        let rules = MuscleRules::default();
        let groups = canonical(&["Serratus"]);

        assert_eq!(rules.normalize("neck, serratus", &groups), "Serratus");
    }

    #[test]
    fn keyword_fallback_follows_declared_order() {
        let rules = MuscleRules::default();
        let groups = canonical(&["Glutes"]);

        assert_eq!(rules.normalize("Upper Chest Fibers", &groups), "Chest");
        assert_eq!(rules.normalize("Lateral Deltoid", &groups), "Shoulders");
        assert_eq!(rules.normalize("inner thigh", &groups), "Quads");
        assert_eq!(rules.normalize("Calf raise target", &groups), "Calves");
    }

    #[test]
    fn unknown_label_falls_back_to_first_canonical_group() {
        let rules = MuscleRules::default();
        let groups = canonical(&["Chest", "Biceps"]);

        assert_eq!(rules.normalize("unknown_muscle_xyz", &groups), "Chest");
    }

    #[test]
    fn unknown_label_without_catalog_uses_placeholder() {
        let rules = MuscleRules::default();

        assert_eq!(rules.normalize("zzz", &[]), UNCATEGORIZED_GROUP);
    }

    #[test]
    fn loaded_rules_are_normalized() {
        let rules = MuscleRules {
            synonyms: BTreeMap::from([(" Pecs ".to_string(), " Chest ".to_string())]),
            keywords: vec![KeywordRule {
                keywords: vec![" NECK ".to_string()],
                group: "Traps".to_string(),
            }],
        };

        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("muscle_rules.json");
        std::fs::write(&path, serde_json::to_string(&rules).expect("json")).expect("write");

        let loaded = MuscleRules::load(&path).expect("loaded");

        assert_eq!(loaded.normalize("pecs", &[]), "Chest");
        assert_eq!(loaded.normalize("Neck Flexors", &[]), "Traps");
    }
}
