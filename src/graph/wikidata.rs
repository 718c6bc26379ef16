//! Wikidata Client
//!
//! Talks to the Wikibase action API (`wbgetentities`, `wbgetclaims`).
//! Transport problems become `GraphError::Fetch`, unreadable payloads
//! become `GraphError::Malformed`.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use super::{Claim, ClaimRank, EntityDetail, EntityRef, KnowledgeGraph, PropertyId};
use crate::config::FaunaConfig;
use crate::error::{GraphError, GraphResult};

/// Knowledge graph backed by a live Wikibase instance
pub struct WikidataClient {
    client: Client,
    api: String,
    site: String,
    language: String,
}

impl WikidataClient {
    pub fn new(config: &FaunaConfig) -> Self {
        Self {
            client: Client::builder()
                .user_agent(config.user_agent.clone())
                .timeout(config.request_timeout())
                .build()
                .unwrap_or_default(),
            api: config.wikidata_api.clone(),
            site: config.site.clone(),
            language: config.language.clone(),
        }
    }

    async fn get_json(&self, params: &[(&str, &str)]) -> GraphResult<Value> {
        let response = self.client
            .get(&self.api)
            .query(params)
            .send()
            .await?;

        check_status(response.status())?;
        let body: Value = response.json().await?;
        check_api_body(body)
    }
}

/// Any non-2xx answer is a transport failure, whatever the body says
fn check_status(status: StatusCode) -> GraphResult<()> {
    if status.is_success() {
        Ok(())
    } else {
        Err(GraphError::Fetch(format!("Wikidata API error: {}", status)))
    }
}

/// Wikibase reports request-level failures (maxlag, bad parameters) as a 200
/// with an `error` object.
fn check_api_body(body: Value) -> GraphResult<Value> {
    if let Some(err) = body.get("error") {
        let code = err["code"].as_str().unwrap_or("unknown");
        let info = err["info"].as_str().unwrap_or_default();
        return Err(GraphError::Fetch(format!("{}: {}", code, info)));
    }
    Ok(body)
}

#[async_trait]
impl KnowledgeGraph for WikidataClient {
    async fn resolve_entity(&self, label: &str) -> GraphResult<EntityRef> {
        debug!("Resolving '{}' against {}", label, self.site);
        let body = self.get_json(&[
            ("action", "wbgetentities"),
            ("sites", self.site.as_str()),
            ("titles", label),
            ("props", "info"),
            ("normalize", "1"),
            ("format", "json"),
        ]).await?;

        parse_title_lookup(body, label)
    }

    async fn fetch_claims(&self, entity: &EntityRef, property: &PropertyId) -> GraphResult<Vec<Claim>> {
        debug!("Fetching {} claims of {}", property, entity);
        let body = self.get_json(&[
            ("action", "wbgetclaims"),
            ("entity", entity.as_str()),
            ("property", property.as_str()),
            ("format", "json"),
        ]).await?;

        parse_claims(body, entity, property)
    }

    async fn entity_detail(&self, entity: &EntityRef) -> GraphResult<EntityDetail> {
        debug!("Fetching label and claims of {}", entity);
        let body = self.get_json(&[
            ("action", "wbgetentities"),
            ("ids", entity.as_str()),
            ("props", "labels|claims"),
            ("languages", self.language.as_str()),
            ("format", "json"),
        ]).await?;

        parse_entity_detail(body, entity, &self.language)
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// RESPONSE SHAPES
// ──────────────────────────────────────────────────────────────────────────────

/// Entities keyed by id. Key order is not response order; title lookups send a
/// single title, so at most one entry is a real match.
#[derive(Debug, Deserialize)]
struct EntitiesResponse {
    #[serde(default, deserialize_with = "map_or_empty")]
    entities: BTreeMap<String, RawEntity>,
}

#[derive(Debug, Deserialize)]
struct ClaimsResponse {
    #[serde(default, deserialize_with = "map_or_empty")]
    claims: HashMap<String, Vec<RawStatement>>,
}

#[derive(Debug, Deserialize)]
struct RawEntity {
    id: Option<String>,
    missing: Option<Value>,
    #[serde(default, deserialize_with = "map_or_empty")]
    labels: HashMap<String, RawLabel>,
    #[serde(default, deserialize_with = "map_or_empty")]
    claims: HashMap<String, Vec<RawStatement>>,
}

#[derive(Debug, Deserialize)]
struct RawLabel {
    value: String,
}

#[derive(Debug, Deserialize)]
struct RawStatement {
    mainsnak: RawSnak,
    #[serde(default)]
    rank: ClaimRank,
}

#[derive(Debug, Deserialize)]
struct RawSnak {
    snaktype: String,
    datavalue: Option<RawDataValue>,
}

#[derive(Debug, Deserialize)]
struct RawDataValue {
    value: Value,
}

/// Wikibase serializes empty objects as `[]`
fn map_or_empty<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    match Value::deserialize(deserializer)? {
        Value::Array(items) if items.is_empty() => Ok(T::default()),
        Value::Null => Ok(T::default()),
        other => serde_json::from_value(other).map_err(serde::de::Error::custom),
    }
}

impl RawSnak {
    fn entity_value(&self) -> Option<EntityRef> {
        if self.snaktype != "value" {
            return None;
        }
        self.datavalue
            .as_ref()
            .and_then(|dv| dv.value.get("id"))
            .and_then(Value::as_str)
            .map(EntityRef::from)
    }
}

fn to_claims(subject: &EntityRef, property: &str, statements: Vec<RawStatement>) -> Vec<Claim> {
    statements
        .into_iter()
        .map(|s| {
            Claim::new(subject.clone(), PropertyId::new(property), s.mainsnak.entity_value())
                .with_rank(s.rank)
        })
        .collect()
}

/// The entity that is not the `missing` placeholder. Only one title is ever
/// requested, so there is nothing to choose between.
fn parse_title_lookup(body: Value, label: &str) -> GraphResult<EntityRef> {
    let response: EntitiesResponse = serde_json::from_value(body)?;
    response
        .entities
        .into_values()
        .filter(|e| e.missing.is_none())
        .find_map(|e| e.id)
        .map(EntityRef::new)
        .ok_or_else(|| GraphError::NotFound(label.to_string()))
}

fn parse_claims(body: Value, entity: &EntityRef, property: &PropertyId) -> GraphResult<Vec<Claim>> {
    let mut response: ClaimsResponse = serde_json::from_value(body)?;
    let statements = response.claims.remove(property.as_str()).unwrap_or_default();
    Ok(to_claims(entity, property.as_str(), statements))
}

fn parse_entity_detail(body: Value, entity: &EntityRef, language: &str) -> GraphResult<EntityDetail> {
    let mut response: EntitiesResponse = serde_json::from_value(body)?;
    let raw = response
        .entities
        .remove(entity.as_str())
        .ok_or_else(|| GraphError::Malformed(format!("response does not mention {}", entity)))?;

    if raw.missing.is_some() {
        return Err(GraphError::NotFound(entity.to_string()));
    }

    let mut labels = raw.labels;
    let claims = raw
        .claims
        .into_iter()
        .map(|(property, statements)| {
            let claims = to_claims(entity, &property, statements);
            (property, claims)
        })
        .collect();

    Ok(EntityDetail {
        label: labels.remove(language).map(|l| l.value),
        claims,
    })
}
