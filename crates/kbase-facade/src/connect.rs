use std::time::Duration;

use tracing::{info, warn};

use kbase_core::config::{CounterBackend, EngineBackend, Settings};
use kbase_core::error::Result;
use kbase_core::traits::{CounterStore, SearchEngine};
use kbase_counter::{FileCounterStore, MemoryCounterStore, RedisCounterStore};
use kbase_elastic::ElasticClient;
use kbase_text::TantivyEngine;

use crate::knowledge_base::KnowledgeBase;

pub type DynKnowledgeBase = KnowledgeBase<Box<dyn SearchEngine>, Box<dyn CounterStore>>;

/// Opens the configured engine and counter store.
pub fn connect(settings: &Settings) -> Result<DynKnowledgeBase> {
    let engine: Box<dyn SearchEngine> = match settings.engine.backend {
        EngineBackend::Tantivy => Box::new(TantivyEngine::open(&settings.engine.index_dir)?),
        EngineBackend::Elastic => {
            let client = ElasticClient::new(&settings.engine.url, settings.engine.timeout_secs.map(Duration::from_secs))?;
            match &settings.engine.username {
                Some(user) => Box::new(client.with_basic_auth(user.as_str(), settings.engine.password.clone())),
                None => Box::new(client),
            }
        }
    };
    let counters: Box<dyn CounterStore> = match settings.counter.backend {
        CounterBackend::File => Box::new(FileCounterStore::open(&settings.counter.path)?),
        CounterBackend::Memory => {
            warn!("memory counter store: view counts are lost when the process exits");
            Box::new(MemoryCounterStore::new())
        }
        CounterBackend::Redis => Box::new(RedisCounterStore::connect(&settings.counter.url, &settings.counter.key_prefix)?),
    };
    info!(
        engine = ?settings.engine.backend,
        counter = ?settings.counter.backend,
        index = %settings.knowledge_base.index,
        "connected knowledge base"
    );
    Ok(KnowledgeBase::new(engine, counters)
        .with_index(settings.knowledge_base.index.clone())
        .with_max_hits(settings.knowledge_base.max_hits))
}
