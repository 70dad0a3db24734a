//! Exercise catalog
//!
//! Maps exercise id + language to the data the adapters need: the entry
//! point name, the harness source and the test cases. The catalog is
//! reference data owned outside the engine; the core only ever reads it
//! through the [`ExerciseCatalog`] trait.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use serde::Deserialize;

use crate::adapter::Language;

/// One stdin/stdout test case: feed `input`, expect `expected` verbatim
/// (after trimming surrounding whitespace of the captured stdout).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TestCase {
    pub input: String,
    pub expected: String,
}

/// Per-language definition of one exercise.
#[derive(Debug, Clone)]
pub struct LanguageExercise {
    /// Name of the function the submission must define.
    pub entry_point: String,
    /// Harness source staged next to the submission: the stdin/stdout entry
    /// script for interpreted languages, the test-framework class for
    /// compiled ones.
    pub harness: String,
    /// stdin/stdout cases. Empty for framework-tested languages, whose
    /// cases are embedded in the harness.
    pub cases: Vec<TestCase>,
}

/// Read-only lookup of exercise definitions.
pub trait ExerciseCatalog: Send + Sync {
    fn get(&self, exercise_id: &str, language: Language) -> Option<&LanguageExercise>;

    /// Whether any definition exists for this exercise id, in any language.
    fn contains(&self, exercise_id: &str) -> bool;
}

/// Raw TOML shape of one per-language definition
#[derive(Debug, Deserialize)]
struct RawLanguageExercise {
    entry_point: String,
    harness: String,
    #[serde(default)]
    cases: Vec<TestCase>,
}

/// Catalog backed by a TOML document:
///
/// ```toml
/// [even-numbers.python]
/// entry_point = "get_even_numbers"
/// harness = "..."
/// [[even-numbers.python.cases]]
/// input = "1 2 3 4 5 6"
/// expected = "[2, 4, 6]"
/// ```
#[derive(Debug)]
pub struct TomlCatalog {
    exercises: HashMap<String, HashMap<Language, LanguageExercise>>,
}

impl TomlCatalog {
    /// Parse and validate a TOML catalog document.
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let raw: HashMap<String, HashMap<String, RawLanguageExercise>> =
            toml::from_str(content).context("Invalid exercise catalog document")?;

        let mut exercises = HashMap::new();

        for (exercise_id, languages) in raw {
            let mut per_language = HashMap::new();

            for (language_name, raw_def) in languages {
                let language: Language = language_name.parse().with_context(|| {
                    format!(
                        "Exercise {} declares unsupported language {}",
                        exercise_id, language_name
                    )
                })?;

                if raw_def.harness.trim().is_empty() {
                    anyhow::bail!(
                        "Exercise {} has an empty {} harness",
                        exercise_id,
                        language_name
                    );
                }

                if language.tests_embedded_in_harness() {
                    if !raw_def.cases.is_empty() {
                        anyhow::bail!(
                            "Exercise {} declares stdin/stdout cases for {}, whose cases live in the harness",
                            exercise_id,
                            language_name
                        );
                    }
                } else if raw_def.cases.is_empty() {
                    anyhow::bail!(
                        "Exercise {} declares no test cases for {}",
                        exercise_id,
                        language_name
                    );
                }

                per_language.insert(
                    language,
                    LanguageExercise {
                        entry_point: raw_def.entry_point,
                        harness: raw_def.harness,
                        cases: raw_def.cases,
                    },
                );
            }

            exercises.insert(exercise_id, per_language);
        }

        Ok(Self { exercises })
    }

    /// Load a catalog from a TOML file on disk.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read exercise catalog {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// All exercise ids in the catalog.
    pub fn exercise_ids(&self) -> Vec<&str> {
        self.exercises.keys().map(String::as_str).collect()
    }
}

impl ExerciseCatalog for TomlCatalog {
    fn get(&self, exercise_id: &str, language: Language) -> Option<&LanguageExercise> {
        self.exercises.get(exercise_id)?.get(&language)
    }

    fn contains(&self, exercise_id: &str) -> bool {
        self.exercises.contains_key(exercise_id)
    }
}
