//! Stateless request builder and response normalizer for the PokeAPI.
//!
//! # Design
//! `CatalogClient` holds only an `UpstreamConfig` and carries no mutable
//! state between calls. Each operation is split into a `build_*` method that
//! produces an `HttpRequest` and a `parse_*` method that consumes an
//! `HttpResponse`. The list operation goes through the GraphQL endpoint; the
//! detail operation goes through the REST endpoint, which is the only one
//! that reports a missing record with a 404.

use serde::Deserialize;

use crate::config::{ImagePolicy, UpstreamConfig};
use crate::error::{ApiError, Outcome, UNKNOWN_QUERY_ERROR};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::query::build_list_query;
use crate::types::{
    Ability, CatalogEntryDetail, CatalogEntrySummary, Cursor, Form, ListQuery, Move, PagedResult,
    Stat, VersionGroupDetail,
};

// ---------------------------------------------------------------------------
// Upstream wire shapes
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: Option<String>,
}

#[derive(Deserialize)]
struct PokemonListData {
    pokemon_v2_pokemon: Vec<RawSummary>,
}

#[derive(Deserialize)]
struct RawSummary {
    id: u32,
    name: String,
}

#[derive(Deserialize)]
struct NamedResource {
    name: String,
    #[serde(default)]
    url: String,
}

#[derive(Deserialize)]
struct RawDetail {
    id: u32,
    name: String,
    height: u32,
    weight: u32,
    base_experience: Option<u32>,
    #[serde(default)]
    sprites: Option<RawSprites>,
    #[serde(default)]
    types: Vec<RawType>,
    #[serde(default)]
    abilities: Vec<RawAbility>,
    #[serde(default)]
    moves: Vec<RawMove>,
    #[serde(default)]
    forms: Vec<NamedResource>,
    #[serde(default)]
    stats: Vec<RawStat>,
}

#[derive(Deserialize)]
struct RawSprites {
    front_default: Option<String>,
    other: Option<RawOtherSprites>,
}

#[derive(Deserialize)]
struct RawOtherSprites {
    #[serde(rename = "official-artwork")]
    official_artwork: Option<RawArtwork>,
}

#[derive(Deserialize)]
struct RawArtwork {
    front_default: Option<String>,
}

#[derive(Deserialize)]
struct RawType {
    slot: u32,
    #[serde(rename = "type")]
    kind: NamedResource,
}

#[derive(Deserialize)]
struct RawAbility {
    ability: NamedResource,
    is_hidden: bool,
    slot: u32,
}

#[derive(Deserialize)]
struct RawMove {
    #[serde(rename = "move")]
    kind: NamedResource,
    #[serde(default)]
    version_group_details: Vec<RawVersionGroupDetail>,
}

#[derive(Deserialize)]
struct RawVersionGroupDetail {
    level_learned_at: u32,
    move_learn_method: NamedResource,
    version_group: NamedResource,
}

#[derive(Deserialize)]
struct RawStat {
    base_stat: u32,
    effort: u32,
    stat: NamedResource,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Stateless client for the PokeAPI catalog.
///
/// Builds `HttpRequest` values and normalizes `HttpResponse` values without
/// touching the network. The caller executes the round-trip between
/// `build_*` and `parse_*`, and maps its own transport failures to
/// `ApiError::Transport`.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    config: UpstreamConfig,
}

impl CatalogClient {
    pub fn new(mut config: UpstreamConfig) -> Self {
        for url in [
            &mut config.graphql_url,
            &mut config.rest_base_url,
            &mut config.sprite_base_url,
        ] {
            let trimmed = url.trim_end_matches('/').len();
            url.truncate(trimmed);
        }
        Self { config }
    }

    pub fn config(&self) -> &UpstreamConfig {
        &self.config
    }

    /// Templated sprite URL; the only image source for list entries.
    pub fn image_url(&self, id: u32) -> String {
        format!("{}/{id}.png", self.config.sprite_base_url)
    }

    pub fn build_list_pokemon(&self, query: &ListQuery) -> Result<HttpRequest, ApiError> {
        let document = build_list_query(query);
        let body = serde_json::to_string(&serde_json::json!({ "query": document }))
            .map_err(|e| ApiError::SerializationError(e.to_string()))?;
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: self.config.graphql_url.clone(),
            headers: vec![
                ("content-type".to_string(), "application/json".to_string()),
                ("accept".to_string(), "application/json".to_string()),
            ],
            body: Some(body),
        })
    }

    /// `id` may be a dex number or a name; the upstream resolves either.
    pub fn build_get_pokemon(&self, id: &str) -> Result<HttpRequest, ApiError> {
        let id = id.trim();
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-') {
            return Err(ApiError::InvalidParameter(format!(
                "invalid pokemon id: {id:?}"
            )));
        }
        Ok(HttpRequest {
            method: HttpMethod::Get,
            url: format!("{}/pokemon/{}", self.config.rest_base_url, id.to_ascii_lowercase()),
            headers: vec![("accept".to_string(), "application/json".to_string())],
            body: None,
        })
    }

    /// Normalize one GraphQL page. `query` must be the one the request was
    /// built from: the upstream reports neither a total nor the page bounds.
    pub fn parse_list_pokemon(
        &self,
        query: &ListQuery,
        response: HttpResponse,
    ) -> Outcome<PagedResult<CatalogEntrySummary>> {
        check_success(&response)?;
        let envelope: GraphQlResponse<PokemonListData> = serde_json::from_str(&response.body)
            .map_err(|e| ApiError::DeserializationError(e.to_string()))?;

        if let Some(errors) = envelope.errors.filter(|errors| !errors.is_empty()) {
            let message = errors
                .into_iter()
                .find_map(|e| e.message)
                .unwrap_or_else(|| UNKNOWN_QUERY_ERROR.to_string());
            return Err(ApiError::Query(message));
        }
        let data = envelope.data.ok_or_else(|| {
            ApiError::DeserializationError("response has neither data nor errors".to_string())
        })?;

        let items: Vec<CatalogEntrySummary> = data
            .pokemon_v2_pokemon
            .into_iter()
            .map(|raw| CatalogEntrySummary {
                id: raw.id,
                name: raw.name,
                number: raw.id,
                image_url: self.image_url(raw.id),
            })
            .collect();

        let returned = u32::try_from(items.len()).unwrap_or(u32::MAX);
        Ok(PagedResult {
            total_count: self.total_count(query, returned),
            next_cursor: next_cursor(query, returned),
            previous_cursor: previous_cursor(query),
            items,
        })
    }

    pub fn parse_get_pokemon(&self, response: HttpResponse) -> Outcome<CatalogEntryDetail> {
        if response.status == 404 {
            return Err(ApiError::NotFound);
        }
        check_success(&response)?;
        let raw: RawDetail = serde_json::from_str(&response.body)
            .map_err(|e| ApiError::DeserializationError(e.to_string()))?;
        Ok(self.normalize_detail(raw))
    }

    /// Approximate under a search filter: the upstream exposes no filtered
    /// total, so a short page is taken as the whole result set.
    fn total_count(&self, query: &ListQuery, returned: u32) -> u32 {
        if query.search().is_none() {
            self.config.catalog_size
        } else if returned < query.limit() {
            returned
        } else {
            query.offset().saturating_add(returned)
        }
    }

    fn normalize_detail(&self, raw: RawDetail) -> CatalogEntryDetail {
        let image_url = match self.config.image_policy {
            ImagePolicy::Synthesized => None,
            ImagePolicy::PreferUpstream => raw.sprites.and_then(|sprites| {
                sprites.front_default.or_else(|| {
                    sprites
                        .other
                        .and_then(|other| other.official_artwork)
                        .and_then(|artwork| artwork.front_default)
                })
            }),
        }
        .unwrap_or_else(|| self.image_url(raw.id));

        let mut types = raw.types;
        types.sort_by_key(|t| t.slot);

        CatalogEntryDetail {
            id: raw.id,
            name: raw.name,
            number: raw.id,
            image_url,
            height: raw.height,
            weight: raw.weight,
            base_experience: raw.base_experience,
            types: types.into_iter().map(|t| t.kind.name).collect(),
            abilities: raw
                .abilities
                .into_iter()
                .map(|a| Ability {
                    name: a.ability.name,
                    is_hidden: a.is_hidden,
                    slot: a.slot,
                })
                .collect(),
            moves: raw
                .moves
                .into_iter()
                .map(|m| Move {
                    name: m.kind.name,
                    version_group_details: m
                        .version_group_details
                        .into_iter()
                        .map(|d| VersionGroupDetail {
                            level_learned_at: d.level_learned_at,
                            move_learn_method: d.move_learn_method.name,
                            version_group: d.version_group.name,
                        })
                        .collect(),
                })
                .collect(),
            forms: raw
                .forms
                .into_iter()
                .map(|f| Form {
                    name: f.name,
                    url: f.url,
                })
                .collect(),
            stats: raw
                .stats
                .into_iter()
                .map(|s| Stat {
                    name: s.stat.name,
                    base_stat: s.base_stat,
                    effort: s.effort,
                })
                .collect(),
        }
    }
}

/// A full page hints that more entries may follow.
fn next_cursor(query: &ListQuery, returned: u32) -> Option<Cursor> {
    (returned == query.limit()).then(|| Cursor {
        offset: query.offset().saturating_add(query.limit()),
        limit: query.limit(),
    })
}

fn previous_cursor(query: &ListQuery) -> Option<Cursor> {
    (query.offset() > 0).then(|| Cursor {
        offset: query.offset().saturating_sub(query.limit()),
        limit: query.limit(),
    })
}

/// Map non-success status codes to `ApiError::HttpError`.
fn check_success(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    Err(ApiError::HttpError {
        status: response.status,
        body: response.body.clone(),
    })
}
