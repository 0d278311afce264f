//! Train-or-load for one language side's subword model.

use std::path::{Path, PathBuf};

use tracing::info;
use tsumugi_core::store::with_suffix;
use tsumugi_core::vocab::SPECIAL_TOKENS;
use tsumugi_core::{ArtifactStore, Result, TsumugiError, VocabularyIndex};

use crate::backend::{SubwordBackend, TrainRequest};

pub const MODEL_SUFFIX: &str = ".model";
pub const VOCAB_SUFFIX: &str = ".vocab";

/// Persisted model/vocabulary pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubwordModel {
    pub model_path: PathBuf,
    pub vocab_path: PathBuf,
}

impl SubwordModel {
    /// `<prefix>.model` and `<prefix>.vocab`.
    #[must_use]
    pub fn from_prefix(prefix: &Path) -> Self {
        Self {
            model_path: with_suffix(prefix, MODEL_SUFFIX),
            vocab_path: with_suffix(prefix, VOCAB_SUFFIX),
        }
    }
}

/// Trains a subword model unless a complete one is already on disk.
pub struct SubwordModelTrainer<'a, B: ?Sized> {
    backend: &'a B,
    store: &'a ArtifactStore,
}

impl<'a, B: SubwordBackend + ?Sized> SubwordModelTrainer<'a, B> {
    pub fn new(backend: &'a B, store: &'a ArtifactStore) -> Self {
        Self { backend, store }
    }

    /// Returns the model for `model_prefix`, training it on `corpus` first
    /// if either artifact is missing or empty.
    ///
    /// Both artifacts are written to `.partial` paths and renamed into place
    /// only after training succeeded and the reserved tokens were verified.
    ///
    /// # Errors
    ///
    /// Returns [`TsumugiError::Config`] if `vocab_size` cannot hold the
    /// reserved tokens, and [`TsumugiError::Training`] if the backend fails or
    /// assigns a reserved token to the wrong id.
    pub fn train_or_load(
        &self,
        corpus: &Path,
        model_prefix: &Path,
        vocab_size: usize,
    ) -> Result<SubwordModel> {
        let model = SubwordModel::from_prefix(model_prefix);
        if self.store.is_complete(&model.model_path) && self.store.is_complete(&model.vocab_path) {
            info!(
                model = %model.model_path.display(),
                vocab = %model.vocab_path.display(),
                "subword model exists, skipping training"
            );
            return Ok(model);
        }

        if vocab_size <= SPECIAL_TOKENS.len() {
            return Err(TsumugiError::Config(format!(
                "vocab_size {vocab_size} leaves no room beyond the {} reserved tokens",
                SPECIAL_TOKENS.len()
            )));
        }

        let partial_model = self.store.partial_path(&model.model_path);
        let partial_vocab = self.store.partial_path(&model.vocab_path);
        info!(
            corpus = %corpus.display(),
            model = %model.model_path.display(),
            vocab_size,
            "subword model missing, training"
        );
        self.backend.train(&TrainRequest {
            corpus,
            model_out: &partial_model,
            vocab_out: &partial_vocab,
            vocab_size,
        })?;
        check_reserved_ids(&partial_vocab)?;

        self.store.commit(&partial_vocab, &model.vocab_path)?;
        self.store.commit(&partial_model, &model.model_path)?;
        Ok(model)
    }
}

fn check_reserved_ids(vocab_path: &Path) -> Result<()> {
    let vocab = VocabularyIndex::load(vocab_path)?;
    for (id, expected) in SPECIAL_TOKENS.iter().enumerate() {
        let found = vocab.id_to_token(id as u32);
        if found != Some(*expected) {
            return Err(TsumugiError::Training(format!(
                "reserved id {id} holds {found:?} instead of {expected:?}"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::backend::PieceEncoder;
    use crate::backend::testing::WordBackend;

    fn setup() -> (tempfile::TempDir, ArtifactStore, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let corpus = store.resolve("train.en");
        fs::write(&corpus, "hello world\ngood morning").unwrap();
        (dir, store, corpus)
    }

    #[test]
    fn trains_when_missing() {
        let (_dir, store, corpus) = setup();
        let backend = WordBackend::default();
        let trainer = SubwordModelTrainer::new(&backend, &store);

        let prefix = with_suffix(&corpus, ".segmented");
        let model = trainer.train_or_load(&corpus, &prefix, 16).unwrap();

        assert_eq!(backend.trained.get(), 1);
        assert!(model.model_path.ends_with("train.en.segmented.model"));
        assert!(store.is_complete(&model.model_path));
        assert!(store.is_complete(&model.vocab_path));
        assert!(!store.partial_path(&model.vocab_path).exists());
    }

    #[test]
    fn existing_pair_skips_training() {
        let (_dir, store, corpus) = setup();
        let prefix = with_suffix(&corpus, ".segmented");
        let expected = SubwordModel::from_prefix(&prefix);
        fs::write(&expected.model_path, "model").unwrap();
        fs::write(&expected.vocab_path, "<pad>\n<unk>\n<s>\n</s>\n").unwrap();

        let backend = WordBackend::default();
        let model = SubwordModelTrainer::new(&backend, &store)
            .train_or_load(&corpus, &prefix, 16)
            .unwrap();

        assert_eq!(model, expected);
        assert_eq!(backend.trained.get(), 0);
    }

    #[test]
    fn empty_artifact_is_retrained() {
        let (_dir, store, corpus) = setup();
        let prefix = with_suffix(&corpus, ".segmented");
        let expected = SubwordModel::from_prefix(&prefix);
        fs::write(&expected.model_path, "model").unwrap();
        fs::write(&expected.vocab_path, "").unwrap();

        let backend = WordBackend::default();
        SubwordModelTrainer::new(&backend, &store)
            .train_or_load(&corpus, &prefix, 16)
            .unwrap();

        assert_eq!(backend.trained.get(), 1);
        let vocab = VocabularyIndex::load(&expected.vocab_path).unwrap();
        assert_eq!(vocab.token_to_id("hello"), Some(5));
    }

    #[test]
    fn tiny_vocab_size_is_rejected() {
        let (_dir, store, corpus) = setup();
        let backend = WordBackend::default();
        let err = SubwordModelTrainer::new(&backend, &store)
            .train_or_load(&corpus, &with_suffix(&corpus, ".segmented"), 4)
            .unwrap_err();

        assert!(matches!(err, TsumugiError::Config(_)));
        assert_eq!(backend.trained.get(), 0);
    }

    struct MisorderedBackend;

    impl SubwordBackend for MisorderedBackend {
        fn train(&self, request: &TrainRequest<'_>) -> Result<()> {
            fs::write(request.model_out, "model").unwrap();
            fs::write(request.vocab_out, "<unk>\n<pad>\n<s>\n</s>\nhello\n").unwrap();
            Ok(())
        }

        fn load_encoder(&self, _model_path: &Path) -> Result<Box<dyn PieceEncoder>> {
            unreachable!("not used by the trainer")
        }
    }

    #[test]
    fn misplaced_reserved_token_is_not_committed() {
        let (_dir, store, corpus) = setup();
        let prefix = with_suffix(&corpus, ".segmented");

        let err = SubwordModelTrainer::new(&MisorderedBackend, &store)
            .train_or_load(&corpus, &prefix, 16)
            .unwrap_err();

        assert!(matches!(err, TsumugiError::Training(_)));
        let model = SubwordModel::from_prefix(&prefix);
        assert!(!model.model_path.exists());
        assert!(!model.vocab_path.exists());
    }
}
