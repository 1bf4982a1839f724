//! Shared application layer behind the CLI, MCP and HTTP adapters.
//!
//! Each operation opens its own [`Store`] on the data directory, so
//! concurrent requests race only through the aggregate's version check.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dream_core::{
    ClassifiedDream, Classifier, Config, DreamEngine, DreamError, DreamRecord, DreamText,
    Submission, SymbolParams, SymbolRenderer, UserStats,
};
use dream_store::{DataDir, Store, StoreError};
use serde::Serialize;
use uuid::Uuid;

use crate::render::SvgRenderer;

#[derive(Debug)]
pub enum ServiceError {
    Dream(DreamError),
    Store(StoreError),
    NotFound(String),
    /// A blocking task panicked or was cancelled.
    Join(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Dream(e) => write!(f, "{e}"),
            ServiceError::Store(e) => write!(f, "{e}"),
            ServiceError::NotFound(msg) => write!(f, "{msg}"),
            ServiceError::Join(msg) => write!(f, "background task failed: {msg}"),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServiceError::Dream(e) => Some(e),
            ServiceError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DreamError> for ServiceError {
    fn from(e: DreamError) -> Self {
        ServiceError::Dream(e)
    }
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        ServiceError::Store(e)
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;

/// Current symbol of one user.
#[derive(Clone, Debug, Serialize)]
pub struct SymbolView {
    pub user_id: String,
    pub dream_count: u64,
    /// `(energy, valence)` of the latest dream, `(0, 0)` without one.
    pub coordinates: (f64, f64),
    pub params: SymbolParams,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub svg: Option<String>,
}

/// What is stored in a data directory.
#[derive(Clone, Debug)]
pub struct StoreInfo {
    pub data_dir: PathBuf,
    pub schema_version: Option<i64>,
    pub users: Vec<String>,
    pub total_dreams: u64,
}

#[derive(Clone)]
pub struct DreamService {
    data_dir: DataDir,
    config: Arc<Config>,
    classifier: Arc<Classifier>,
    renderer: SvgRenderer,
}

impl DreamService {
    /// Load and validate config, build the classifier once and make sure
    /// the database schema exists.
    pub fn open(data_dir: DataDir) -> Result<Self> {
        let config = data_dir.load_config()?;
        let classifier = Arc::new(Classifier::new(&config)?);
        data_dir.open_store()?;
        tracing::debug!("data directory {}", data_dir.root().display());
        Ok(Self {
            data_dir,
            config: Arc::new(config),
            classifier,
            renderer: SvgRenderer::default(),
        })
    }

    pub fn data_dir(&self) -> &DataDir {
        &self.data_dir
    }

    fn engine(&self) -> Result<DreamEngine<Store>> {
        let store = self.data_dir.open_store()?;
        Ok(DreamEngine::with_classifier(
            Arc::clone(&self.classifier),
            &self.config,
            store,
        ))
    }

    pub fn classify(&self, text: &str) -> Result<ClassifiedDream> {
        Ok(self.classifier.classify_dream(text)?)
    }

    /// Classify and record a dream. The returned record carries the
    /// store's `created_at`.
    pub fn submit(&self, user_id: &str, text: &str, keywords: &[String]) -> Result<Submission> {
        let dream = DreamText::new(text)?.with_keywords(keywords);
        let engine = self.engine()?;
        let mut submission = engine.submit(user_id, &dream)?;
        if let Some(stored) = engine.store().get_dream(submission.record.id)? {
            submission.record.created_at = stored.created_at;
        }
        tracing::info!(
            user = user_id,
            sequence = submission.record.sequence,
            quadrant = %submission.record.classified.quadrant,
            attempts = submission.attempts,
            "dream recorded"
        );
        Ok(submission)
    }

    pub fn symbol(&self, user_id: &str, with_svg: bool) -> Result<SymbolView> {
        let engine = self.engine()?;
        let (aggregate, latest) = engine.store().read_snapshot(|| -> Result<_> {
            let aggregate = engine.load_aggregate(user_id)?;
            Ok((aggregate, engine.store().latest_dream(user_id)?))
        })?;
        let coordinates = latest
            .map(|d| (d.classified.axis_score.energy, d.classified.axis_score.valence))
            .unwrap_or((0.0, 0.0));
        let params = aggregate.symbol_params;
        Ok(SymbolView {
            user_id: user_id.to_string(),
            dream_count: aggregate.dream_count,
            coordinates,
            params,
            svg: with_svg.then(|| self.renderer.render(&params)),
        })
    }

    pub fn stats(&self, user_id: &str) -> Result<UserStats> {
        Ok(self.engine()?.stats(user_id)?)
    }

    /// Oldest first; `limit` keeps the most recent entries.
    pub fn history(&self, user_id: &str, limit: Option<usize>) -> Result<Vec<DreamRecord>> {
        let engine = self.engine()?;
        engine.load_aggregate(user_id)?;
        Ok(engine.store().user_dreams(user_id, limit)?)
    }

    pub fn dream(&self, id: Uuid) -> Result<DreamRecord> {
        self.data_dir
            .open_store()?
            .get_dream(id)?
            .ok_or_else(|| ServiceError::NotFound("Dream not found".to_string()))
    }

    pub fn export(&self, user_id: &str, path: &Path) -> Result<()> {
        let engine = self.engine()?;
        engine.load_aggregate(user_id)?;
        engine.store().export_json_file(user_id, path)?;
        tracing::info!(user = user_id, "exported profile to {}", path.display());
        Ok(())
    }

    pub fn info(&self) -> Result<StoreInfo> {
        let store = self.data_dir.open_store()?;
        store.read_snapshot(|| -> Result<_> {
            Ok(StoreInfo {
                data_dir: self.data_dir.root().to_path_buf(),
                schema_version: store.schema_version()?,
                users: store.users()?,
                total_dreams: store.dream_count()?,
            })
        })
    }

    /// Run a blocking operation off the async runtime.
    pub async fn run<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&DreamService) -> Result<T> + Send + 'static,
    {
        let service = self.clone();
        tokio::task::spawn_blocking(move || op(&service))
            .await
            .map_err(|e| ServiceError::Join(e.to_string()))?
    }
}
