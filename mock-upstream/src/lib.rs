//! Fixture PokeAPI: a GraphQL list endpoint and a REST detail endpoint over
//! a small in-memory dataset.
//!
//! Only the subset of GraphQL the proxy emits is understood: `limit`,
//! `offset`, an `_eq` id filter or an `_ilike` name filter, and
//! `order_by` on `id` or `name`.

use std::{sync::Arc, time::Duration};

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;

pub use axum::http::StatusCode;

pub const SPRITE_BASE: &str = "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon";

#[derive(Clone, Debug)]
pub struct Species {
    pub id: u32,
    pub name: &'static str,
    pub types: &'static [&'static str],
    pub abilities: &'static [(&'static str, bool)],
}

const fn species(
    id: u32,
    name: &'static str,
    types: &'static [&'static str],
    abilities: &'static [(&'static str, bool)],
) -> Species {
    Species {
        id,
        name,
        types,
        abilities,
    }
}

const GRASS_POISON: &[&str] = &["grass", "poison"];
const FIRE: &[&str] = &["fire"];
const FIRE_FLYING: &[&str] = &["fire", "flying"];
const WATER: &[&str] = &["water"];
const BUG: &[&str] = &["bug"];
const BUG_FLYING: &[&str] = &["bug", "flying"];
const BUG_POISON: &[&str] = &["bug", "poison"];
const NORMAL: &[&str] = &["normal"];
const NORMAL_FLYING: &[&str] = &["normal", "flying"];
const POISON: &[&str] = &["poison"];
const ELECTRIC: &[&str] = &["electric"];
const GROUND: &[&str] = &["ground"];
const PSYCHIC_FAIRY: &[&str] = &["psychic", "fairy"];

const OVERGROW: &[(&str, bool)] = &[("overgrow", false), ("chlorophyll", true)];
const BLAZE: &[(&str, bool)] = &[("blaze", false), ("solar-power", true)];
const TORRENT: &[(&str, bool)] = &[("torrent", false), ("rain-dish", true)];
const SHIELD_DUST: &[(&str, bool)] = &[("shield-dust", false), ("run-away", true)];
const SHED_SKIN: &[(&str, bool)] = &[("shed-skin", false)];
const KEEN_EYE: &[(&str, bool)] = &[("keen-eye", false), ("tangled-feet", false), ("big-pecks", true)];
const RUN_AWAY: &[(&str, bool)] = &[("run-away", false), ("guts", false), ("hustle", true)];
const INTIMIDATE: &[(&str, bool)] = &[("intimidate", false), ("shed-skin", false), ("unnerve", true)];
const STATIC: &[(&str, bool)] = &[("static", false), ("lightning-rod", true)];
const SAND_VEIL: &[(&str, bool)] = &[("sand-veil", false), ("sand-rush", true)];
const POISON_POINT: &[(&str, bool)] = &[("poison-point", false), ("rivalry", false), ("hustle", true)];
const SOUNDPROOF: &[(&str, bool)] = &[("soundproof", false), ("filter", false), ("technician", true)];
const TRACE: &[(&str, bool)] = &[("trace", false), ("download", false), ("analytic", true)];

/// First thirty dex entries plus a few names with digits and punctuation.
pub fn standard_species() -> Vec<Species> {
    vec![
        species(1, "bulbasaur", GRASS_POISON, OVERGROW),
        species(2, "ivysaur", GRASS_POISON, OVERGROW),
        species(3, "venusaur", GRASS_POISON, OVERGROW),
        species(4, "charmander", FIRE, BLAZE),
        species(5, "charmeleon", FIRE, BLAZE),
        species(6, "charizard", FIRE_FLYING, BLAZE),
        species(7, "squirtle", WATER, TORRENT),
        species(8, "wartortle", WATER, TORRENT),
        species(9, "blastoise", WATER, TORRENT),
        species(10, "caterpie", BUG, SHIELD_DUST),
        species(11, "metapod", BUG, SHED_SKIN),
        species(12, "butterfree", BUG_FLYING, SHIELD_DUST),
        species(13, "weedle", BUG_POISON, SHIELD_DUST),
        species(14, "kakuna", BUG_POISON, SHED_SKIN),
        species(15, "beedrill", BUG_POISON, SHIELD_DUST),
        species(16, "pidgey", NORMAL_FLYING, KEEN_EYE),
        species(17, "pidgeotto", NORMAL_FLYING, KEEN_EYE),
        species(18, "pidgeot", NORMAL_FLYING, KEEN_EYE),
        species(19, "rattata", NORMAL, RUN_AWAY),
        species(20, "raticate", NORMAL, RUN_AWAY),
        species(21, "spearow", NORMAL_FLYING, KEEN_EYE),
        species(22, "fearow", NORMAL_FLYING, KEEN_EYE),
        species(23, "ekans", POISON, INTIMIDATE),
        species(24, "arbok", POISON, INTIMIDATE),
        species(25, "pikachu", ELECTRIC, STATIC),
        species(26, "raichu", ELECTRIC, STATIC),
        species(27, "sandshrew", GROUND, SAND_VEIL),
        species(28, "sandslash", GROUND, SAND_VEIL),
        species(29, "nidoran-f", POISON, POISON_POINT),
        species(30, "nidorina", POISON, POISON_POINT),
        species(83, "farfetchd", NORMAL_FLYING, KEEN_EYE),
        species(122, "mr-mime", PSYCHIC_FAIRY, SOUNDPROOF),
        species(233, "porygon2", NORMAL, TRACE),
    ]
}

/// What the fixture serves. Failure knobs let tests exercise the proxy's
/// error mapping without a real outage.
#[derive(Clone, Debug)]
pub struct Fixture {
    pub species: Vec<Species>,
    /// Answer every GraphQL request with this query-level error.
    pub query_error: Option<String>,
    /// Answer every request with this bare status code.
    pub fail_status: Option<StatusCode>,
    /// Hold every response this long before answering.
    pub delay: Option<Duration>,
}

impl Fixture {
    pub fn standard() -> Self {
        Self {
            species: standard_species(),
            query_error: None,
            fail_status: None,
            delay: None,
        }
    }

    pub fn with_query_error(message: &str) -> Self {
        Self {
            query_error: Some(message.to_string()),
            ..Self::standard()
        }
    }

    pub fn failing(status: StatusCode) -> Self {
        Self {
            fail_status: Some(status),
            ..Self::standard()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::standard()
        }
    }
}

type Shared = Arc<Fixture>;

#[derive(Deserialize)]
pub struct GraphQlRequest {
    pub query: String,
}

pub fn app() -> Router {
    app_with(Fixture::standard())
}

pub fn app_with(fixture: Fixture) -> Router {
    Router::new()
        .route("/graphql", post(graphql))
        .route("/pokemon/{id}", get(pokemon_detail))
        .with_state(Arc::new(fixture))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with(listener: TcpListener, fixture: Fixture) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(fixture)).await
}

async fn graphql(State(fixture): State<Shared>, Json(request): Json<GraphQlRequest>) -> Response {
    if let Some(delay) = fixture.delay {
        tokio::time::sleep(delay).await;
    }
    if let Some(status) = fixture.fail_status {
        return status.into_response();
    }
    if let Some(message) = &fixture.query_error {
        return Json(json!({ "errors": [{ "message": message }] })).into_response();
    }
    match ListDocument::parse(&request.query) {
        Ok(doc) => {
            let rows: Vec<Value> = doc
                .select(&fixture.species)
                .into_iter()
                .map(|s| json!({ "id": s.id, "name": s.name }))
                .collect();
            Json(json!({ "data": { "pokemon_v2_pokemon": rows } })).into_response()
        }
        Err(message) => Json(json!({ "errors": [{ "message": message }] })).into_response(),
    }
}

async fn pokemon_detail(State(fixture): State<Shared>, Path(id): Path<String>) -> Response {
    if let Some(delay) = fixture.delay {
        tokio::time::sleep(delay).await;
    }
    if let Some(status) = fixture.fail_status {
        return status.into_response();
    }
    let found = fixture
        .species
        .iter()
        .find(|s| s.id.to_string() == id || s.name == id);
    match found {
        Some(species) => Json(detail_json(species)).into_response(),
        None => (StatusCode::NOT_FOUND, "Not Found").into_response(),
    }
}

/// Full detail record in the upstream's REST shape.
pub fn detail_json(species: &Species) -> Value {
    let id = species.id;
    let named = |kind: &str, name: &str| {
        json!({ "name": name, "url": format!("https://pokeapi.co/api/v2/{kind}/{name}/") })
    };
    let types: Vec<Value> = species
        .types
        .iter()
        .enumerate()
        .map(|(i, t)| json!({ "slot": i + 1, "type": named("type", *t) }))
        .collect();
    let abilities: Vec<Value> = species
        .abilities
        .iter()
        .enumerate()
        .map(|(i, (name, hidden))| {
            let slot = if *hidden { 3 } else { i + 1 };
            json!({ "ability": named("ability", *name), "is_hidden": *hidden, "slot": slot })
        })
        .collect();
    let stats: Vec<Value> = [
        "hp",
        "attack",
        "defense",
        "special-attack",
        "special-defense",
        "speed",
    ]
    .iter()
    .enumerate()
    .map(|(i, stat)| {
        json!({
            "base_stat": 40 + (id as usize * 7 + i * 5) % 60,
            "effort": usize::from(i == 0),
            "stat": named("stat", *stat),
        })
    })
    .collect();

    json!({
        "id": id,
        "name": species.name,
        "height": 3 + id % 17,
        "weight": 20 + id * 9,
        "base_experience": 50 + id,
        "sprites": {
            "front_default": format!("{SPRITE_BASE}/{id}.png"),
            "other": {
                "official-artwork": {
                    "front_default": format!("{SPRITE_BASE}/other/official-artwork/{id}.png"),
                }
            }
        },
        "types": types,
        "abilities": abilities,
        "moves": [
            {
                "move": named("move", "tackle"),
                "version_group_details": [
                    {
                        "level_learned_at": 1,
                        "move_learn_method": named("move-learn-method", "level-up"),
                        "version_group": named("version-group", "red-blue"),
                    },
                    {
                        "level_learned_at": 0,
                        "move_learn_method": named("move-learn-method", "egg"),
                        "version_group": named("version-group", "gold-silver"),
                    }
                ]
            },
            {
                "move": named("move", "rest"),
                "version_group_details": [
                    {
                        "level_learned_at": 0,
                        "move_learn_method": named("move-learn-method", "machine"),
                        "version_group": named("version-group", "red-blue"),
                    }
                ]
            }
        ],
        "forms": [
            { "name": species.name, "url": format!("https://pokeapi.co/api/v2/pokemon-form/{id}/") }
        ],
        "stats": stats,
    })
}

// ---------------------------------------------------------------------------
// GraphQL subset
// ---------------------------------------------------------------------------

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ListDocument {
    pub limit: Option<usize>,
    pub offset: usize,
    pub id_eq: Option<u32>,
    pub name_ilike: Option<String>,
    pub order_by_name: bool,
}

impl ListDocument {
    pub fn parse(query: &str) -> Result<Self, String> {
        if !query.trim_start().starts_with("query") || !query.contains("pokemon_v2_pokemon(") {
            return Err("query root 'pokemon_v2_pokemon' not found".to_string());
        }
        Ok(Self {
            limit: int_arg(query, "limit: ")?.map(|n| n as usize),
            offset: int_arg(query, "offset: ")?.unwrap_or(0) as usize,
            id_eq: int_arg(query, "_eq: ")?,
            name_ilike: string_arg(query, "_ilike: \"")?,
            order_by_name: query.contains("order_by: {name: asc}"),
        })
    }

    pub fn select<'a>(&self, species: &'a [Species]) -> Vec<&'a Species> {
        let mut rows: Vec<&Species> = species
            .iter()
            .filter(|s| self.id_eq.map_or(true, |id| s.id == id))
            .filter(|s| {
                self.name_ilike
                    .as_deref()
                    .map_or(true, |pattern| ilike(s.name, pattern))
            })
            .collect();
        if self.order_by_name {
            rows.sort_by_key(|s| s.name);
        } else {
            rows.sort_by_key(|s| s.id);
        }
        rows.into_iter()
            .skip(self.offset)
            .take(self.limit.unwrap_or(usize::MAX))
            .collect()
    }
}

/// A GraphQL `Int` argument. Values past 32 bits are rejected the way the
/// real endpoint rejects them.
fn int_arg(query: &str, key: &str) -> Result<Option<u32>, String> {
    let Some(start) = query.find(key).map(|i| i + key.len()) else {
        return Ok(None);
    };
    let digits: String = query[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        return Ok(None);
    }
    let name = key.trim_end_matches([':', ' ']);
    digits
        .parse::<i32>()
        .map(|n| Some(n.unsigned_abs()))
        .map_err(|_| format!("expected a value of type Int for {name}, got {digits}"))
}

/// Read a double-quoted literal that starts right after `key`, undoing the
/// escapes a GraphQL string may carry.
fn string_arg(query: &str, key: &str) -> Result<Option<String>, String> {
    let Some(start) = query.find(key).map(|i| i + key.len()) else {
        return Ok(None);
    };
    let mut out = String::new();
    let mut chars = query[start..].chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => return Ok(Some(out)),
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('t') => out.push('\t'),
                Some('u') => {
                    let hex: String = chars.by_ref().take(4).collect();
                    let code = u32::from_str_radix(&hex, 16).map_err(|e| e.to_string())?;
                    out.push(char::from_u32(code).ok_or("bad unicode escape")?);
                }
                Some(other) => out.push(other),
                None => break,
            },
            c => out.push(c),
        }
    }
    Err("unterminated string literal".to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LikeToken {
    AnyRun,
    AnyOne,
    Literal(char),
}

/// Case-insensitive SQL LIKE: `%` and `_` wildcards, `\` escapes the next
/// character.
fn ilike(name: &str, pattern: &str) -> bool {
    let name: Vec<char> = name.to_lowercase().chars().collect();
    let pattern = pattern.to_lowercase();
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '%' => LikeToken::AnyRun,
            '_' => LikeToken::AnyOne,
            '\\' => LikeToken::Literal(chars.next().unwrap_or('\\')),
            c => LikeToken::Literal(c),
        });
    }
    like_match(&name, &tokens)
}

fn like_match(name: &[char], tokens: &[LikeToken]) -> bool {
    match tokens.split_first() {
        None => name.is_empty(),
        Some((LikeToken::AnyRun, rest)) => {
            (0..=name.len()).any(|skip| like_match(&name[skip..], rest))
        }
        Some((LikeToken::AnyOne, rest)) => !name.is_empty() && like_match(&name[1..], rest),
        Some((LikeToken::Literal(c), rest)) => {
            name.first() == Some(c) && like_match(&name[1..], rest)
        }
    }
}
