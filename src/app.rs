//! Application layer tying the store, the embedder and the resolver
//! together. One `App` per process; all components are shared handles.

use anyhow::{Context, Result};
use homedir::my_home;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use crate::boxes::{BackendJson, BoxCreate, BoxRecord, BoxUpdate, RecordManager};
use crate::codes::{self, BoxId};
use crate::config::Config;
use crate::search::{QueryResolver, ResolverOptions, SearchOutcome, SearchRequest};
use crate::semantic::{self, Embedder, EmbeddingService};
use crate::storage::{BackendLocal, StorageManager};
use crate::vision::{self, VisionError};

/// Resolved data directory layout.
pub struct AppPaths {
    pub base_path: String,
    pub boxes_path: String,
    pub uploads_path: String,
}

impl AppPaths {
    /// Resolve paths from SNAPFIND_BASE_PATH or the default data dir.
    pub fn resolve() -> Result<AppPaths> {
        let base_path = match std::env::var("SNAPFIND_BASE_PATH") {
            Ok(path) if !path.is_empty() => path,
            _ => {
                let home = my_home()
                    .context("Could not determine home directory")?
                    .context("Home directory path is empty")?;
                format!("{}/.local/share/snapfind", home.to_string_lossy())
            }
        };

        Ok(Self::at(&base_path))
    }

    pub fn at(base_path: &str) -> AppPaths {
        AppPaths {
            base_path: base_path.to_string(),
            boxes_path: format!("{base_path}/boxes.json"),
            uploads_path: format!("{base_path}/uploads"),
        }
    }
}

pub struct App {
    records: Arc<dyn RecordManager>,
    blobs: Arc<dyn StorageManager>,
    embedder: Arc<EmbeddingService>,
    config: Arc<RwLock<Config>>,
}

impl App {
    pub fn open(paths: &AppPaths) -> Result<App> {
        std::fs::create_dir_all(&paths.base_path)
            .context("Failed to create application base directory")?;

        let config = Config::load_with(&paths.base_path);
        let records = BackendJson::load(&paths.boxes_path)?;
        let blobs = BackendLocal::new(&paths.uploads_path)?;
        let embedder = EmbeddingService::new(
            &config.search.model,
            PathBuf::from(&paths.base_path),
        );

        Ok(App::with_components(
            Arc::new(records),
            Arc::new(blobs),
            Arc::new(embedder),
            Arc::new(RwLock::new(config)),
        ))
    }

    pub fn with_components(
        records: Arc<dyn RecordManager>,
        blobs: Arc<dyn StorageManager>,
        embedder: Arc<EmbeddingService>,
        config: Arc<RwLock<Config>>,
    ) -> App {
        App {
            records,
            blobs,
            embedder,
            config,
        }
    }

    pub fn config(&self) -> Arc<RwLock<Config>> {
        self.config.clone()
    }

    /// Create a box: assign a unique code, stash the photo, embed the
    /// item text. A failed embedding is logged and the save proceeds.
    pub fn create(&self, create: BoxCreate) -> Result<BoxRecord> {
        let code = loop {
            let code = codes::generate_code();
            if self.records.get_by_code(&code)?.is_none() {
                break code;
            }
            log::debug!("Code collision on '{}', regenerating", code);
        };

        let mut record = BoxRecord::new(code, create.location, create.items);

        if let Some(image) = create.image {
            let image_id = BoxId::new().to_string();
            self.blobs.write(&image_id, &image)?;
            record.image_id = Some(image_id);
        }

        let (embedding, items_hash) = self.embed_items(&record.items);
        record.embedding = embedding;
        record.items_hash = items_hash;

        self.records.put(record.clone())?;
        log::info!("Created box {} ({})", record.code, record.id);

        Ok(record)
    }

    /// Update a box. The embedding is regenerated only when the item
    /// text actually changed; a failed regeneration clears the stale
    /// vector rather than leaving it attached to the new text.
    pub fn update(&self, id: &BoxId, update: BoxUpdate) -> Result<Option<BoxRecord>> {
        let Some(mut record) = self.records.get(id)? else {
            return Ok(None);
        };

        if let Some(location) = update.location {
            record.location = location;
        }

        if let Some(items) = update.items {
            if record.items_hash != Some(semantic::items_hash(&items)) {
                let (embedding, items_hash) = self.embed_items(&items);
                record.embedding = embedding;
                record.items_hash = items_hash;
            }
            record.items = items;
        }

        if let Some(image) = update.image {
            let image_id = record
                .image_id
                .clone()
                .unwrap_or_else(|| BoxId::new().to_string());
            self.blobs.write(&image_id, &image)?;
            record.image_id = Some(image_id);
        }

        self.records.put(record.clone())?;
        Ok(Some(record))
    }

    /// Delete a box and its photo. Idempotent.
    pub fn delete(&self, id: &BoxId) -> Result<()> {
        if let Some(record) = self.records.get(id)? {
            if let Some(image_id) = &record.image_id {
                if let Err(err) = self.blobs.delete(image_id) {
                    log::warn!("Couldn't delete photo blob {}: {}", image_id, err);
                }
            }
        }
        self.records.delete(id)?;
        Ok(())
    }

    pub fn get(&self, id: &BoxId) -> Result<Option<BoxRecord>> {
        Ok(self.records.get(id)?)
    }

    pub fn get_by_code(&self, code: &str) -> Result<Option<BoxRecord>> {
        Ok(self.records.get_by_code(&codes::normalize_code(code))?)
    }

    pub fn list_all(&self) -> Result<Vec<BoxRecord>> {
        Ok(self.records.list_all()?)
    }

    pub fn read_image(&self, record: &BoxRecord) -> Result<Option<Vec<u8>>> {
        match &record.image_id {
            Some(image_id) => Ok(Some(self.blobs.read(image_id)?)),
            None => Ok(None),
        }
    }

    pub fn search(&self, request: &SearchRequest) -> Result<SearchOutcome> {
        let opts = self.resolver_options();
        let resolver = QueryResolver::new(self.records.as_ref(), self.embedder.as_ref(), opts);
        Ok(resolver.resolve(request)?)
    }

    /// Resolve an externally-decoded QR/code string.
    pub fn resolve_scan(&self, raw_code: &str) -> Result<Option<BoxRecord>> {
        let opts = self.resolver_options();
        let resolver = QueryResolver::new(self.records.as_ref(), self.embedder.as_ref(), opts);
        Ok(resolver.resolve_scan(raw_code)?)
    }

    /// Run the configured vision provider over a photo.
    pub fn analyze_image(&self, image: &[u8]) -> Result<Vec<String>, VisionError> {
        let vision = self.config.read().unwrap().vision.clone();
        let tagger = vision::build_tagger(
            &vision.provider,
            &vision.api_key,
            vision.request_timeout_secs,
        )?;
        tagger.analyze(image)
    }

    pub fn locations(&self) -> Vec<String> {
        self.config.read().unwrap().locations.clone()
    }

    fn resolver_options(&self) -> ResolverOptions {
        let search = self.config.read().unwrap().search.clone();
        ResolverOptions {
            threshold: search.threshold,
            result_cap: search.result_cap,
            code_query_max_len: search.code_query_max_len,
            keyword_fallback: search.keyword_fallback,
        }
    }

    fn embed_items(&self, items: &[String]) -> (Option<Vec<f32>>, Option<u64>) {
        let Some(text) = semantic::items_text(items) else {
            return (None, None);
        };

        match self.embedder.embed(&text) {
            Ok(vector) => (Some(vector), Some(semantic::items_hash(items))),
            Err(err) => {
                log::warn!("Embedding failed, saving box without a vector: {}", err);
                (None, None)
            }
        }
    }
}
