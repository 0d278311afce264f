//! # Preparation Pipeline
//!
//! Runs the stages in a fixed order for one dataset: download, normalize,
//! train-or-load one subword model per side, load both vocabularies, segment,
//! encode. Every stage checks the data directory first, so a second run only
//! loads caches.
//!
//! Two pipelines must not run against the same data directory at once: the
//! exists-then-write pattern of every stage is not locked.

use std::path::{Path, PathBuf};

use tracing::info;
use tsumugi_core::fetch::basename;
use tsumugi_core::store::with_suffix;
use tsumugi_core::{
    ArtifactStore, CorpusFile, CorpusNormalizer, DatasetConfig, DatasetRegistry,
    EncodedSequence, FetchProgress, Fetcher, HttpTransport, Result, SequenceCodec, Side, Stage,
    Transport, TsumugiError, VocabularyIndex,
};
use tsumugi_subword::{BpeBackend, Segmenter, SubwordBackend, SubwordModel, SubwordModelTrainer};

use crate::config::PipelineConfig;

pub const SEGMENTED_SUFFIX: &str = ".segmented";
pub const SEQUENCES_SUFFIX: &str = ".sequences";

/// The vocabulary pair owned by one pipeline run.
#[derive(Debug, Clone)]
pub struct Vocabularies {
    pub source: VocabularyIndex,
    pub target: VocabularyIndex,
}

impl Vocabularies {
    #[must_use]
    pub fn get(&self, side: Side) -> &VocabularyIndex {
        match side {
            Side::Source => &self.source,
            Side::Target => &self.target,
        }
    }
}

/// On-disk artifacts of one side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SideArtifacts {
    pub corpus: PathBuf,
    pub model: SubwordModel,
    pub sequences: PathBuf,
}

/// Parallel-corpus preparation for one dataset and data directory.
pub struct Pipeline<B = BpeBackend> {
    dataset_name: String,
    dataset: DatasetConfig,
    config: PipelineConfig,
    store: ArtifactStore,
    fetcher: Fetcher,
    normalizer: CorpusNormalizer,
    backend: B,
    vocabularies: Option<Vocabularies>,
}

impl Pipeline<BpeBackend> {
    /// Pipeline over the built-in registry, downloading over HTTP and
    /// training BPE models.
    ///
    /// # Errors
    ///
    /// Returns [`TsumugiError::UnknownDataset`] if `dataset_name` is not a
    /// built-in dataset.
    pub fn new(dataset_name: &str, data_dir: impl Into<PathBuf>, vocab_size: usize) -> Result<Self> {
        let config = PipelineConfig::new().with_vocab_size(vocab_size);
        Self::with_registry(&DatasetRegistry::builtin(), dataset_name, data_dir, config)
    }

    /// Like [`new`](Self::new) with a custom registry and configuration.
    pub fn with_registry(
        registry: &DatasetRegistry,
        dataset_name: &str,
        data_dir: impl Into<PathBuf>,
        config: PipelineConfig,
    ) -> Result<Self> {
        let transport = HttpTransport::new(config.fetch_timeout)?;
        Self::from_parts(
            registry,
            dataset_name,
            data_dir,
            config,
            Box::new(transport),
            BpeBackend::new(),
        )
    }
}

impl<B: SubwordBackend> Pipeline<B> {
    /// Assembles a pipeline from explicit collaborators.
    pub fn from_parts(
        registry: &DatasetRegistry,
        dataset_name: &str,
        data_dir: impl Into<PathBuf>,
        config: PipelineConfig,
        transport: Box<dyn Transport>,
        backend: B,
    ) -> Result<Self> {
        let dataset = registry.get(dataset_name)?.clone();
        let store = ArtifactStore::new(data_dir);

        Ok(Self {
            dataset_name: dataset_name.to_string(),
            dataset,
            config,
            fetcher: Fetcher::new(store.clone(), transport),
            normalizer: CorpusNormalizer::new(store.clone()),
            store,
            backend,
            vocabularies: None,
        })
    }

    /// Replaces the download progress reporter.
    pub fn with_progress(mut self, progress: Box<dyn FetchProgress>) -> Self {
        self.fetcher = self.fetcher.with_progress(progress);
        self
    }

    #[must_use]
    pub fn dataset(&self) -> &DatasetConfig {
        &self.dataset
    }

    #[must_use]
    pub fn data_dir(&self) -> &Path {
        self.store.root()
    }

    /// Paths of the corpus, model pair and segmentation cache for `side`.
    pub fn artifacts(&self, side: Side) -> Result<SideArtifacts> {
        let url = self.dataset.url_for(self.dataset.train_file(side));
        let corpus = self.store.resolve(basename(&url)?);
        let prefix = with_suffix(&corpus, SEGMENTED_SUFFIX);
        Ok(SideArtifacts {
            model: SubwordModel::from_prefix(&prefix),
            sequences: with_suffix(&prefix, SEQUENCES_SUFFIX),
            corpus,
        })
    }

    /// Runs every stage and returns the encoded source and target corpora.
    ///
    /// Any failure aborts the run; artifacts completed so far stay on disk
    /// and are reused by the next call.
    pub fn load(&mut self) -> Result<(Vec<EncodedSequence>, Vec<EncodedSequence>)> {
        info!(dataset = %self.dataset_name, dir = %self.store.root().display(), "#1 download data");
        self.fetcher.fetch_all(&self.dataset)?;

        info!("#2 normalize corpora");
        let mut corpora = Vec::with_capacity(Side::BOTH.len());
        for side in Side::BOTH {
            let artifacts = self.artifacts(side)?;
            let mut corpus = CorpusFile::raw(&artifacts.corpus, side);
            let lines = self.normalizer.normalize(corpus.path())?;
            corpus.advance(Stage::Normalized);
            corpora.push((corpus, lines, artifacts));
        }

        info!(vocab_size = self.config.vocab_size, "#3 train subword models");
        let trainer = SubwordModelTrainer::new(&self.backend, &self.store);
        for (corpus, _, artifacts) in &mut corpora {
            let prefix = with_suffix(corpus.path(), SEGMENTED_SUFFIX);
            artifacts.model = trainer.train_or_load(corpus.path(), &prefix, self.config.vocab_size)?;
        }

        info!("#4 load vocabularies");
        let vocabularies = Vocabularies {
            source: VocabularyIndex::load(&corpora[0].2.model.vocab_path)?,
            target: VocabularyIndex::load(&corpora[1].2.model.vocab_path)?,
        };

        info!("#5 segment and encode");
        let segmenter = Segmenter::new(&self.backend, &self.store);
        let mut encoded = Vec::with_capacity(Side::BOTH.len());
        for (corpus, lines, artifacts) in &mut corpora {
            let pieces = segmenter.segment(
                lines.as_slice(),
                &artifacts.model.model_path,
                &artifacts.sequences,
            )?;
            corpus.advance(Stage::Segmented);
            encoded.push(SequenceCodec::new(vocabularies.get(corpus.side)).encode(&pieces));
        }

        let target = encoded.pop().unwrap_or_default();
        let source = encoded.pop().unwrap_or_default();
        if let (Some(s), Some(t)) = (source.first(), target.first()) {
            info!(source = ?s, target = ?t, "sequence example");
        }

        self.vocabularies = Some(vocabularies);
        Ok((source, target))
    }

    /// Vocabulary of `side`, available after [`load`](Self::load).
    #[must_use]
    pub fn vocabulary(&self, side: Side) -> Option<&VocabularyIndex> {
        self.vocabularies.as_ref().map(|v| v.get(side))
    }

    /// Decodes id sequences back into tokens, boundary markers included.
    ///
    /// # Errors
    ///
    /// Returns [`TsumugiError::NotLoaded`] before [`load`](Self::load) ran.
    pub fn sequences_to_texts(
        &self,
        sequences: &[EncodedSequence],
        side: Side,
    ) -> Result<Vec<Vec<String>>> {
        let vocab = self.vocabulary(side).ok_or(TsumugiError::NotLoaded)?;
        Ok(SequenceCodec::new(vocab).decode(sequences))
    }

    /// Encodes space-joined piece lines with the vocabulary of `side`.
    pub fn texts_to_sequences<S: AsRef<str>>(
        &self,
        piece_lines: &[S],
        side: Side,
    ) -> Result<Vec<EncodedSequence>> {
        let vocab = self.vocabulary(side).ok_or(TsumugiError::NotLoaded)?;
        Ok(SequenceCodec::new(vocab).encode(piece_lines))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::HashMap;
    use std::fs;
    use std::io::Cursor;
    use std::rc::Rc;

    use tsumugi_core::fetch::Download;
    use tsumugi_core::vocab::{BOS_ID, EOS_ID};
    use tsumugi_subword::{PieceEncoder, TrainRequest};

    use super::*;

    const DATASET: &str = "tiny/en-de";

    fn registry() -> DatasetRegistry {
        DatasetRegistry::builtin()
            .with_dataset(
                DATASET,
                DatasetConfig {
                    source_lang: "en".into(),
                    target_lang: "de".into(),
                    base_url: "http://mirror.local/tiny/".into(),
                    train_files: ["train.en".into(), "train.de".into()],
                    vocab_files: vec![],
                    dictionary_files: vec!["dict.en-de".into()],
                    test_files: vec![],
                },
            )
            .unwrap()
    }

    #[derive(Clone)]
    struct MirrorTransport {
        files: HashMap<String, String>,
        opened: Rc<Cell<usize>>,
    }

    impl MirrorTransport {
        fn new(files: &[(&str, &str)]) -> Self {
            Self {
                files: files
                    .iter()
                    .map(|(name, body)| (format!("http://mirror.local/tiny/{name}"), body.to_string()))
                    .collect(),
                opened: Rc::new(Cell::new(0)),
            }
        }

        fn full() -> Self {
            Self::new(&[
                ("train.en", "hello world\ngood morning\n"),
                ("train.de", "hallo welt\nguten morgen\n"),
                ("dict.en-de", "hello hallo\n"),
            ])
        }
    }

    impl Transport for MirrorTransport {
        fn open(&self, url: &str) -> Result<Download> {
            self.opened.set(self.opened.get() + 1);
            let body = self.files.get(url).ok_or_else(|| TsumugiError::Fetch {
                url: url.to_string(),
                reason: "404 Not Found".into(),
            })?;
            Ok(Download {
                total: Some(body.len() as u64),
                reader: Box::new(Cursor::new(body.clone().into_bytes())),
            })
        }
    }

    struct CountingBackend {
        inner: BpeBackend,
        trained: Rc<Cell<usize>>,
    }

    impl CountingBackend {
        fn new() -> Self {
            Self {
                inner: BpeBackend::new(),
                trained: Rc::new(Cell::new(0)),
            }
        }
    }

    impl SubwordBackend for CountingBackend {
        fn train(&self, request: &TrainRequest<'_>) -> Result<()> {
            self.trained.set(self.trained.get() + 1);
            self.inner.train(request)
        }

        fn load_encoder(&self, model_path: &Path) -> Result<Box<dyn PieceEncoder>> {
            self.inner.load_encoder(model_path)
        }
    }

    fn pipeline(
        dir: &Path,
        transport: MirrorTransport,
        backend: CountingBackend,
        vocab_size: usize,
    ) -> Pipeline<CountingBackend> {
        Pipeline::from_parts(
            &registry(),
            DATASET,
            dir,
            PipelineConfig::new().with_vocab_size(vocab_size),
            Box::new(transport),
            backend,
        )
        .unwrap()
    }

    #[test]
    fn second_run_only_reads_caches() {
        let dir = tempfile::tempdir().unwrap();

        let transport = MirrorTransport::full();
        let opened = transport.opened.clone();
        let backend = CountingBackend::new();
        let trained = backend.trained.clone();
        let first = pipeline(dir.path(), transport.clone(), backend, 24).load().unwrap();
        assert_eq!(opened.get(), 3);
        assert_eq!(trained.get(), 2);

        let backend = CountingBackend::new();
        let retrained = backend.trained.clone();
        let second = pipeline(dir.path(), transport, backend, 24).load().unwrap();

        assert_eq!(first, second);
        assert_eq!(opened.get(), 3);
        assert_eq!(retrained.get(), 0);
    }

    #[test]
    fn prepared_corpus_yields_bracketed_sequences() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("train.en"), "hello world\ngood morning").unwrap();
        fs::write(dir.path().join("train.de"), "hallo welt\nguten morgen").unwrap();
        fs::write(dir.path().join("dict.en-de"), "hello hallo").unwrap();

        let transport = MirrorTransport::new(&[]);
        let opened = transport.opened.clone();
        let (source, target) = pipeline(dir.path(), transport, CountingBackend::new(), 16)
            .load()
            .unwrap();

        assert_eq!(opened.get(), 0);
        assert_eq!(source.len(), 2);
        assert_eq!(target.len(), 2);
        for sequence in source.iter().chain(&target) {
            assert!(sequence.len() >= 3);
            assert_eq!(sequence.first(), Some(&BOS_ID));
            assert_eq!(sequence.last(), Some(&EOS_ID));
        }
    }

    #[test]
    fn decoding_recovers_the_sentence() {
        let dir = tempfile::tempdir().unwrap();
        let mut pipeline = pipeline(dir.path(), MirrorTransport::full(), CountingBackend::new(), 24);

        let (source, _) = pipeline.load().unwrap();
        let texts = pipeline.sequences_to_texts(&source, Side::Source).unwrap();

        let tokens = &texts[0];
        assert_eq!(tokens.first().map(String::as_str), Some("<s>"));
        assert_eq!(tokens.last().map(String::as_str), Some("</s>"));
        let sentence = tokens[1..tokens.len() - 1].concat().replace('▁', " ");
        assert_eq!(sentence.trim(), "hello world");

        let pieces = fs::read_to_string(pipeline.artifacts(Side::Source).unwrap().sequences).unwrap();
        let first_line: Vec<&str> = pieces.lines().take(1).collect();
        assert_eq!(
            pipeline.texts_to_sequences(&first_line, Side::Source).unwrap()[0],
            source[0]
        );
    }

    #[test]
    fn irregular_whitespace_and_marker_literals_still_load() {
        let dir = tempfile::tempdir().unwrap();
        let transport = MirrorTransport::new(&[
            ("train.en", "hello\tworld\r\ngood\u{a0}morning\n\nsay </s> twice\n"),
            ("train.de", "hallo\u{3000}welt\nguten  morgen\n\nsag <s> zweimal\n"),
            ("dict.en-de", "hello hallo\n"),
        ]);
        let (source, target) = pipeline(dir.path(), transport, CountingBackend::new(), 32)
            .load()
            .unwrap();

        assert_eq!(source.len(), 4);
        assert_eq!(target.len(), 4);
        for sequence in source.iter().chain(&target) {
            assert_eq!(sequence.first(), Some(&BOS_ID));
            assert_eq!(sequence.last(), Some(&EOS_ID));
            assert_eq!(sequence.iter().filter(|&&id| id == BOS_ID).count(), 1);
            assert_eq!(sequence.iter().filter(|&&id| id == EOS_ID).count(), 1);
        }
        assert_eq!(source[2], vec![BOS_ID, EOS_ID]);
    }

    #[test]
    fn decoding_requires_a_loaded_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(dir.path(), MirrorTransport::full(), CountingBackend::new(), 24);

        let err = pipeline.sequences_to_texts(&[vec![2, 3]], Side::Target).unwrap_err();
        assert!(matches!(err, TsumugiError::NotLoaded));
    }

    #[test]
    fn unknown_dataset_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result = Pipeline::from_parts(
            &registry(),
            "wmt15/fr-en",
            dir.path(),
            PipelineConfig::new(),
            Box::new(MirrorTransport::full()),
            CountingBackend::new(),
        );
        assert!(matches!(result, Err(TsumugiError::UnknownDataset { .. })));
    }

    #[test]
    fn failed_run_resumes_from_completed_downloads() {
        let dir = tempfile::tempdir().unwrap();
        let broken = MirrorTransport::new(&[("train.en", "hello world\ngood morning\n")]);
        let err = pipeline(dir.path(), broken, CountingBackend::new(), 24)
            .load()
            .unwrap_err();
        assert!(matches!(err, TsumugiError::Fetch { .. }));
        assert!(dir.path().join("train.en").exists());
        assert!(!dir.path().join("train.de").exists());

        let transport = MirrorTransport::full();
        let opened = transport.opened.clone();
        pipeline(dir.path(), transport, CountingBackend::new(), 24)
            .load()
            .unwrap();
        assert_eq!(opened.get(), 2);
    }

    #[test]
    fn artifact_layout_follows_train_files() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(dir.path(), MirrorTransport::full(), CountingBackend::new(), 24);

        let target = pipeline.artifacts(Side::Target).unwrap();
        assert_eq!(target.corpus, dir.path().join("train.de"));
        assert_eq!(target.model.model_path, dir.path().join("train.de.segmented.model"));
        assert_eq!(target.model.vocab_path, dir.path().join("train.de.segmented.vocab"));
        assert_eq!(target.sequences, dir.path().join("train.de.segmented.sequences"));
    }
}
