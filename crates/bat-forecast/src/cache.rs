//! The session's single trained model.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};

use crate::engine::Leaderboard;
use crate::error::{ForecastError, Result};
use crate::schema::{FeatureSchema, SchemaFingerprint};

/// A trained model together with everything needed to use it safely.
#[derive(Debug)]
pub struct CachedModel<M> {
    model: Arc<M>,
    leaderboard: Leaderboard,
    schema: FeatureSchema,
    fingerprint: SchemaFingerprint,
    trained_at: DateTime<Utc>,
}

impl<M> CachedModel<M> {
    pub fn model(&self) -> &M {
        &self.model
    }

    /// A shared handle to the model, usable after the cache lock is released.
    pub fn shared_model(&self) -> Arc<M> {
        Arc::clone(&self.model)
    }

    pub fn leaderboard(&self) -> &Leaderboard {
        &self.leaderboard
    }

    /// The schema the model was trained under.
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn fingerprint(&self) -> &SchemaFingerprint {
        &self.fingerprint
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }
}

/// Holds at most one model per session.
///
/// A model is only handed out for a schema whose fingerprint matches the
/// one it was trained under. When a dataset replacement retires the model,
/// its fingerprint is kept so a later prediction is reported as stale
/// rather than as "no model".
#[derive(Debug)]
pub struct ModelCache<M> {
    entry: Option<CachedModel<M>>,
    retired: Option<SchemaFingerprint>,
}

impl<M> Default for ModelCache<M> {
    fn default() -> Self {
        Self {
            entry: None,
            retired: None,
        }
    }
}

impl<M> ModelCache<M> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace whatever is cached with a freshly trained model.
    pub fn store(&mut self, model: M, leaderboard: Leaderboard, schema: FeatureSchema) {
        let fingerprint = schema.fingerprint();
        info!(
            "Caching model '{}' for schema {}",
            leaderboard.model_name, fingerprint
        );
        self.entry = Some(CachedModel {
            model: Arc::new(model),
            leaderboard,
            schema,
            fingerprint,
            trained_at: Utc::now(),
        });
        self.retired = None;
    }

    /// Drop the model because the user asked for a retrain.
    pub fn clear(&mut self) {
        if self.entry.take().is_some() {
            debug!("Discarded cached model");
        }
        self.retired = None;
    }

    /// Drop the model because the data it was trained on is gone.
    pub fn retire(&mut self) {
        if let Some(entry) = self.entry.take() {
            debug!("Retired cached model for schema {}", entry.fingerprint);
            self.retired = Some(entry.fingerprint);
        }
    }

    #[must_use]
    pub fn get(&self) -> Option<&CachedModel<M>> {
        self.entry.as_ref()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entry.is_none()
    }

    #[must_use]
    pub fn leaderboard(&self) -> Option<&Leaderboard> {
        self.entry.as_ref().map(|e| &e.leaderboard)
    }

    /// Whether the cached (or retired) model no longer matches `live`.
    #[must_use]
    pub fn is_stale(&self, live: Option<&SchemaFingerprint>) -> bool {
        match (&self.entry, &self.retired) {
            (Some(entry), _) => live != Some(&entry.fingerprint),
            (None, Some(_)) => true,
            (None, None) => false,
        }
    }

    /// The cached model, if it was trained under the `live` schema.
    pub fn model_for(&self, live: Option<&SchemaFingerprint>) -> Result<&CachedModel<M>> {
        match (&self.entry, &self.retired) {
            (Some(entry), _) if live == Some(&entry.fingerprint) => Ok(entry),
            (Some(entry), _) => Err(ForecastError::StaleModel {
                trained: entry.fingerprint.clone(),
                live: live.cloned(),
            }),
            (None, Some(retired)) => Err(ForecastError::StaleModel {
                trained: retired.clone(),
                live: live.cloned(),
            }),
            (None, None) => Err(ForecastError::NoModel),
        }
    }
}
