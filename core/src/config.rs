//! Upstream endpoints and normalization policy, injected at construction.

use std::fmt;
use std::str::FromStr;

pub const DEFAULT_GRAPHQL_URL: &str = "https://beta.pokeapi.co/graphql/v1beta";
pub const DEFAULT_REST_BASE_URL: &str = "https://pokeapi.co/api/v2";
pub const DEFAULT_SPRITE_BASE_URL: &str =
    "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon";

/// Number of entries the unfiltered catalog reports. The GraphQL endpoint
/// does not return a total alongside a page, so this is fixed.
pub const DEFAULT_CATALOG_SIZE: u32 = 1302;

/// Where a detail record's `image_url` comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImagePolicy {
    /// Always the templated sprite URL built from the id.
    #[default]
    Synthesized,
    /// `sprites.front_default`, then the official artwork, then the
    /// templated URL.
    PreferUpstream,
}

impl fmt::Display for ImagePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImagePolicy::Synthesized => write!(f, "synthesized"),
            ImagePolicy::PreferUpstream => write!(f, "prefer-upstream"),
        }
    }
}

impl FromStr for ImagePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "synthesized" => Ok(ImagePolicy::Synthesized),
            "prefer-upstream" | "prefer_upstream" => Ok(ImagePolicy::PreferUpstream),
            other => Err(format!("unknown image policy: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamConfig {
    pub graphql_url: String,
    pub rest_base_url: String,
    pub sprite_base_url: String,
    pub catalog_size: u32,
    pub image_policy: ImagePolicy,
}

impl UpstreamConfig {
    /// Points both endpoints at one fixture host, the way the mock upstream
    /// serves them (`/graphql` and `/pokemon/{id}`).
    pub fn for_host(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            graphql_url: format!("{base}/graphql"),
            rest_base_url: base.to_string(),
            ..Self::default()
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            graphql_url: DEFAULT_GRAPHQL_URL.to_string(),
            rest_base_url: DEFAULT_REST_BASE_URL.to_string(),
            sprite_base_url: DEFAULT_SPRITE_BASE_URL.to_string(),
            catalog_size: DEFAULT_CATALOG_SIZE,
            image_policy: ImagePolicy::default(),
        }
    }
}
