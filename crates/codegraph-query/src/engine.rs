//! Structural query engine: thin, cached facade over [`GraphStore`].
//! Simple lookups target sub-100ms; bounded traversals target sub-1s and
//! are the reason every multi-hop operation takes an explicit `depth`.

use std::str::FromStr;

use codegraph_core::{Entity, EntityType, GraphStore, Relationship, RelationshipType};
use serde::Serialize;
use serde_json::{json, Value};

use crate::cache::ResultCache;
use crate::error::{QueryError, QueryResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotspotMetric {
    Complexity,
    Changes,
    Coupling,
}

impl HotspotMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Complexity => "complexity",
            Self::Changes => "changes",
            Self::Coupling => "coupling",
        }
    }
}

pub struct QueryEngine {
    store: GraphStore,
    cache: ResultCache,
}

impl QueryEngine {
    pub fn new(store: GraphStore) -> Self {
        Self {
            store,
            cache: ResultCache::default(),
        }
    }

    pub fn with_cache(store: GraphStore, cache: ResultCache) -> Self {
        Self { store, cache }
    }

    /// Free-text structural search over entity names/signatures, via the
    /// Graph Store's FTS5 index. This backs the tool-call interface's
    /// `query` operation (distinct from `semantic_search`, which goes
    /// through the vector index instead).
    pub fn query(&self, query: &str, limit: usize) -> QueryResult<Value> {
        #[derive(Serialize)]
        struct Req<'a> {
            op: &'static str,
            query: &'a str,
            limit: usize,
        }
        let key = ResultCache::key(&Req { op: "query", query, limit });
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }

        let entities = self.store.text_search(query, limit)?;
        let value = json!({ "results": entities });
        self.cache.put(key, value.clone());
        Ok(value)
    }

    pub fn list_file_entities(&self, file_path: &str, types: Option<&[String]>) -> QueryResult<Value> {
        #[derive(Serialize)]
        struct Req<'a> {
            op: &'static str,
            file_path: &'a str,
            types: Option<&'a [String]>,
        }
        let key = ResultCache::key(&Req { op: "list_file_entities", file_path, types });
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }

        let mut entities = self.store.list_file_entities(file_path)?;
        if let Some(types) = types {
            let wanted: Vec<EntityType> = types.iter().filter_map(|t| EntityType::from_str(t).ok()).collect();
            entities.retain(|e| wanted.contains(&e.entity_type));
        }

        let value = json!({ "entities": entities });
        self.cache.put(key, value.clone());
        Ok(value)
    }

    pub fn list_entity_relationships(
        &self,
        entity_name: &str,
        file_path: Option<&str>,
        depth: usize,
        types: Option<&[String]>,
    ) -> QueryResult<Value> {
        #[derive(Serialize)]
        struct Req<'a> {
            op: &'static str,
            entity_name: &'a str,
            file_path: Option<&'a str>,
            depth: usize,
            types: Option<&'a [String]>,
        }
        let key = ResultCache::key(&Req { op: "list_entity_relationships", entity_name, file_path, depth, types });
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }

        let mut candidates = self.store.find_entities_by_name(entity_name)?;
        if let Some(file_path) = file_path {
            candidates.retain(|e| e.file_path == file_path);
        }
        if candidates.is_empty() {
            return Err(QueryError::EntityNotFound(entity_name.to_string()));
        }

        let wanted: Option<Vec<RelationshipType>> =
            types.map(|ts| ts.iter().filter_map(|t| RelationshipType::from_str(t).ok()).collect());

        let mut matches = Vec::new();
        for entity in &candidates {
            let (entities, relationships) = self.store.get_subgraph(&entity.id, depth)?;
            let relationships = filter_relationship_types(relationships, wanted.as_deref());
            matches.push(json!({
                "root": entity,
                "entities": entities,
                "relationships": relationships,
            }));
        }

        let value = json!({ "matches": matches });
        self.cache.put(key, value.clone());
        Ok(value)
    }

    pub fn get_subgraph(&self, entity_id: &str, depth: usize) -> QueryResult<Value> {
        #[derive(Serialize)]
        struct Req<'a> {
            op: &'static str,
            entity_id: &'a str,
            depth: usize,
        }
        let key = ResultCache::key(&Req { op: "get_subgraph", entity_id, depth });
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }

        let (entities, relationships) = self.store.get_subgraph(entity_id, depth)?;
        if entities.is_empty() {
            return Err(QueryError::EntityNotFound(entity_id.to_string()));
        }

        let value = json!({ "entities": entities, "relationships": relationships });
        self.cache.put(key, value.clone());
        Ok(value)
    }

    pub fn analyze_hotspots(&self, metric: HotspotMetric, limit: usize) -> QueryResult<Value> {
        #[derive(Serialize)]
        struct Req {
            op: &'static str,
            metric: &'static str,
            limit: usize,
        }
        let key = ResultCache::key(&Req { op: "analyze_hotspots", metric: metric.as_str(), limit });
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }

        let ranked: Vec<Value> = match metric {
            HotspotMetric::Complexity => self
                .store
                .top_by_complexity(limit)?
                .into_iter()
                .map(|(entity, score)| hotspot_entry(&entity, score))
                .collect(),
            HotspotMetric::Coupling => self
                .store
                .top_by_coupling(limit)?
                .into_iter()
                .map(|(entity, score)| hotspot_entry(&entity, score))
                .collect(),
            HotspotMetric::Changes => self
                .store
                .top_by_churn(limit)?
                .into_iter()
                .map(|(file, score)| json!({ "file_path": file.path, "score": score }))
                .collect(),
        };

        let value = json!({ "metric": metric.as_str(), "hotspots": ranked });
        self.cache.put(key, value.clone());
        Ok(value)
    }

    pub fn analyze_code_impact(&self, entity_id: &str, depth: usize) -> QueryResult<Value> {
        #[derive(Serialize)]
        struct Req<'a> {
            op: &'static str,
            entity_id: &'a str,
            depth: usize,
        }
        let key = ResultCache::key(&Req { op: "analyze_code_impact", entity_id, depth });
        if let Some(hit) = self.cache.get(&key) {
            return Ok(hit);
        }

        let (entities, relationships) = self.store.reverse_impact(entity_id, depth)?;
        if entities.is_empty() {
            return Err(QueryError::EntityNotFound(entity_id.to_string()));
        }

        let impacted: Vec<&Entity> = entities.iter().filter(|e| e.id != entity_id).collect();
        let value = json!({
            "root": entity_id,
            "impacted": impacted,
            "relationships": relationships,
        });
        self.cache.put(key, value.clone());
        Ok(value)
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}

fn filter_relationship_types(relationships: Vec<Relationship>, wanted: Option<&[RelationshipType]>) -> Vec<Relationship> {
    match wanted {
        None => relationships,
        Some(types) => relationships
            .into_iter()
            .filter(|r| types.contains(&r.relationship_type))
            .collect(),
    }
}

fn hotspot_entry(entity: &Entity, score: i64) -> Value {
    json!({
        "entity_id": entity.id,
        "name": entity.name,
        "file_path": entity.file_path,
        "score": score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegraph_core::{Location, Position, Storage};
    use serde_json::json as j;

    fn entity(id: &str, name: &str, file: &str, complexity: u32) -> Entity {
        Entity {
            id: id.to_string(),
            name: name.to_string(),
            entity_type: EntityType::Function,
            file_path: file.to_string(),
            location: Location {
                start: Position { line: 0, column: 0, byte_index: 0 },
                end: Position { line: 1, column: 0, byte_index: 10 },
            },
            hash: "h".to_string(),
            language: "rust".to_string(),
            size_bytes: 10,
            complexity_score: complexity,
            metadata: j!({}),
            created_at: 0,
            updated_at: 0,
        }
    }

    fn engine() -> QueryEngine {
        let storage = Storage::open_in_memory().unwrap();
        QueryEngine::new(GraphStore::new(storage))
    }

    #[test]
    fn list_file_entities_filters_by_type() {
        let engine = engine();
        engine
            .store
            .upsert_batch(&[entity("e1", "foo", "a.rs", 1)], &[], 100)
            .unwrap();

        let result = engine.list_file_entities("a.rs", None).unwrap();
        assert_eq!(result["entities"].as_array().unwrap().len(), 1);

        let filtered = engine
            .list_file_entities("a.rs", Some(&["class".to_string()]))
            .unwrap();
        assert_eq!(filtered["entities"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn hotspots_by_complexity_orders_descending() {
        let engine = engine();
        engine
            .store
            .upsert_batch(
                &[entity("e1", "low", "a.rs", 1), entity("e2", "high", "a.rs", 9)],
                &[],
                100,
            )
            .unwrap();

        let result = engine.analyze_hotspots(HotspotMetric::Complexity, 10).unwrap();
        let hotspots = result["hotspots"].as_array().unwrap();
        assert_eq!(hotspots[0]["entity_id"], "e2");
    }

    #[test]
    fn cache_hits_repeat_request() {
        let engine = engine();
        engine
            .store
            .upsert_batch(&[entity("e1", "foo", "a.rs", 1)], &[], 100)
            .unwrap();

        engine.list_file_entities("a.rs", None).unwrap();
        engine.list_file_entities("a.rs", None).unwrap();
        assert_eq!(engine.cache_len(), 1);
    }

    #[test]
    fn query_finds_entity_by_text() {
        let engine = engine();
        engine.store.upsert_batch(&[entity("e1", "parse_config", "a.rs", 1)], &[], 100).unwrap();

        let result = engine.query("parse_config", 10).unwrap();
        assert_eq!(result["results"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn missing_entity_errors() {
        let engine = engine();
        let err = engine.get_subgraph("missing", 1).unwrap_err();
        assert!(matches!(err, QueryError::EntityNotFound(_)));
    }
}
