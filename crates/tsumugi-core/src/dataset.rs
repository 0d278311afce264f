//! # Dataset Registry
//!
//! Descriptors of the parallel corpora the pipeline knows how to prepare.
//! The registry is an ordinary value: start from [`DatasetRegistry::builtin`],
//! register more descriptors or merge a JSON file, and hand it to the
//! pipeline.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TsumugiError};
use crate::types::Side;

/// Name of the dataset shipped in the built-in registry.
pub const WMT14_EN_DE: &str = "wmt14/en-de";

/// Where a parallel corpus lives and which files make it up.
///
/// All file names are relative to `base_url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub source_lang: String,
    pub target_lang: String,
    pub base_url: String,
    /// Training corpora, source first.
    pub train_files: [String; 2],
    #[serde(default)]
    pub vocab_files: Vec<String>,
    #[serde(default)]
    pub dictionary_files: Vec<String>,
    #[serde(default)]
    pub test_files: Vec<String>,
}

impl DatasetConfig {
    /// Training file for one side.
    #[must_use]
    pub fn train_file(&self, side: Side) -> &str {
        &self.train_files[side.index()]
    }

    #[must_use]
    pub fn lang(&self, side: Side) -> &str {
        match side {
            Side::Source => &self.source_lang,
            Side::Target => &self.target_lang,
        }
    }

    /// Every configured file in download order: train, vocab, dictionary, test.
    pub fn all_files(&self) -> impl Iterator<Item = &str> {
        self.train_files
            .iter()
            .chain(&self.vocab_files)
            .chain(&self.dictionary_files)
            .chain(&self.test_files)
            .map(String::as_str)
    }

    #[must_use]
    pub fn url_for(&self, file: &str) -> String {
        format!("{}{}", self.base_url, file)
    }

    fn validate(&self, name: &str) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(TsumugiError::Config(format!(
                "dataset {name:?} has an empty base_url"
            )));
        }
        if self.train_files.iter().any(|f| f.trim().is_empty()) {
            return Err(TsumugiError::Config(format!(
                "dataset {name:?} has an empty training file name"
            )));
        }
        if self.train_files[0] == self.train_files[1] {
            return Err(TsumugiError::Config(format!(
                "dataset {name:?} uses the same training file for both sides"
            )));
        }
        Ok(())
    }
}

/// Named dataset descriptors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatasetRegistry {
    datasets: BTreeMap<String, DatasetConfig>,
}

impl DatasetRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry containing the WMT'14 English-German corpus.
    pub fn builtin() -> Self {
        let test_files = [2012, 2013, 2014, 2015]
            .iter()
            .flat_map(|year| [format!("newstest{year}.en"), format!("newstest{year}.de")])
            .collect();

        let mut registry = Self::new();
        registry.datasets.insert(
            WMT14_EN_DE.to_string(),
            DatasetConfig {
                source_lang: "en".into(),
                target_lang: "de".into(),
                base_url: "https://nlp.stanford.edu/projects/nmt/data/wmt14.en-de/".into(),
                train_files: ["train.en".into(), "train.de".into()],
                vocab_files: vec!["vocab.50K.en".into(), "vocab.50K.de".into()],
                dictionary_files: vec!["dict.en-de".into()],
                test_files,
            },
        );
        registry
    }

    /// Adds or replaces a descriptor.
    pub fn register(&mut self, name: impl Into<String>, config: DatasetConfig) -> Result<()> {
        let name = name.into();
        config.validate(&name)?;
        self.datasets.insert(name, config);
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_dataset(mut self, name: impl Into<String>, config: DatasetConfig) -> Result<Self> {
        self.register(name, config)?;
        Ok(self)
    }

    /// Looks up a dataset by name.
    ///
    /// # Errors
    ///
    /// Returns [`TsumugiError::UnknownDataset`] if no descriptor is registered
    /// under `name`.
    pub fn get(&self, name: &str) -> Result<&DatasetConfig> {
        self.datasets
            .get(name)
            .ok_or_else(|| TsumugiError::UnknownDataset {
                name: name.to_string(),
            })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.datasets.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DatasetConfig)> {
        self.datasets.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Parses a JSON object mapping names to descriptors.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let parsed: Self = serde_json::from_str(json)?;
        for (name, config) in &parsed.datasets {
            config.validate(name)?;
        }
        Ok(parsed)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| TsumugiError::io(path, e))?;
        Self::from_json_str(&json)
    }

    /// Adds every descriptor of `other`, replacing same-named entries.
    pub fn merge(&mut self, other: DatasetRegistry) {
        self.datasets.extend(other.datasets);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny() -> DatasetConfig {
        DatasetConfig {
            source_lang: "en".into(),
            target_lang: "fr".into(),
            base_url: "http://localhost/tiny/".into(),
            train_files: ["tiny.en".into(), "tiny.fr".into()],
            vocab_files: vec![],
            dictionary_files: vec![],
            test_files: vec!["test.en".into()],
        }
    }

    #[test]
    fn builtin_has_wmt14() {
        let registry = DatasetRegistry::builtin();
        let wmt = registry.get(WMT14_EN_DE).unwrap();
        assert_eq!(wmt.train_file(Side::Source), "train.en");
        assert_eq!(wmt.train_file(Side::Target), "train.de");
        assert_eq!(wmt.lang(Side::Target), "de");
        assert_eq!(wmt.all_files().count(), 2 + 2 + 1 + 8);
        assert_eq!(
            wmt.url_for("dict.en-de"),
            "https://nlp.stanford.edu/projects/nmt/data/wmt14.en-de/dict.en-de"
        );
    }

    #[test]
    fn unknown_dataset_is_an_error() {
        let err = DatasetRegistry::builtin().get("wmt15/fr-en").unwrap_err();
        assert!(matches!(err, TsumugiError::UnknownDataset { name } if name == "wmt15/fr-en"));
    }

    #[test]
    fn register_extends_registry() {
        let registry = DatasetRegistry::builtin()
            .with_dataset("tiny/en-fr", tiny())
            .unwrap();
        let names: Vec<_> = registry.names().collect();
        assert_eq!(names, vec!["tiny/en-fr", WMT14_EN_DE]);
        let order: Vec<_> = registry.get("tiny/en-fr").unwrap().all_files().collect();
        assert_eq!(order, vec!["tiny.en", "tiny.fr", "test.en"]);
    }

    #[test]
    fn register_rejects_identical_train_files() {
        let mut config = tiny();
        config.train_files[1] = "tiny.en".into();
        assert!(DatasetRegistry::new().register("bad", config).is_err());
    }

    #[test]
    fn json_registry_merges_over_builtin() {
        let json = r#"{
            "tiny/en-fr": {
                "source_lang": "en",
                "target_lang": "fr",
                "base_url": "http://localhost/tiny/",
                "train_files": ["tiny.en", "tiny.fr"]
            }
        }"#;
        let mut registry = DatasetRegistry::builtin();
        registry.merge(DatasetRegistry::from_json_str(json).unwrap());

        assert!(registry.get(WMT14_EN_DE).is_ok());
        assert!(registry.get("tiny/en-fr").unwrap().test_files.is_empty());
    }

    #[test]
    fn json_requires_two_train_files() {
        let json = r#"{
            "broken": {
                "source_lang": "en",
                "target_lang": "fr",
                "base_url": "http://localhost/",
                "train_files": ["only.en"]
            }
        }"#;
        assert!(matches!(
            DatasetRegistry::from_json_str(json),
            Err(TsumugiError::Json(_))
        ));
    }
}
