use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Upper bound on how many recent actions inform sequence scoring.
pub const SEQUENCE_WINDOW: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionType {
    #[serde(rename = "rate")]
    Rate,
    #[serde(rename = "watchTime")]
    WatchTime,
    #[serde(rename = "add_watchlist")]
    AddWatchlist,
    #[serde(rename = "view")]
    View,
    #[serde(rename = "click")]
    Click,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionMetadata {
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub directors: Vec<String>,
    #[serde(default)]
    pub actors: Vec<String>,
    pub runtime: Option<u32>,
    pub release_year: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub id: Uuid,
    pub user_id: String,
    pub item_id: i64,
    pub action_type: ActionType,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    pub metadata: Option<ActionMetadata>,
}

impl Action {
    pub fn new(user_id: impl Into<String>, item_id: i64, action_type: ActionType, value: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            item_id,
            action_type,
            value,
            timestamp: Utc::now(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: ActionMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movie {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub directors: Vec<String>,
    #[serde(default)]
    pub actors: Vec<String>,
    pub release_year: i32,
    pub runtime: u32,
    pub average_rating: f64,
    pub rating_count: u64,
    pub popularity: f64,
}

impl Movie {
    pub fn new(id: i64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            genres: Vec::new(),
            directors: Vec::new(),
            actors: Vec::new(),
            release_year: 2000,
            runtime: 120,
            average_rating: 0.0,
            rating_count: 0,
            popularity: 0.0,
        }
    }

    pub fn with_genres(mut self, genres: Vec<String>) -> Self {
        self.genres = genres;
        self
    }

    pub fn with_directors(mut self, directors: Vec<String>) -> Self {
        self.directors = directors;
        self
    }

    pub fn with_actors(mut self, actors: Vec<String>) -> Self {
        self.actors = actors;
        self
    }

    pub fn with_release_year(mut self, year: i32) -> Self {
        self.release_year = year;
        self
    }

    pub fn with_runtime(mut self, runtime: u32) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn with_rating_stats(mut self, average_rating: f64, rating_count: u64) -> Self {
        self.average_rating = average_rating;
        self.rating_count = rating_count;
        self
    }

    pub fn with_popularity(mut self, popularity: f64) -> Self {
        self.popularity = popularity;
        self
    }
}

/// Preferred runtime window in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RuntimePreference {
    pub min: f64,
    pub max: f64,
    pub ideal: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct YearPreference {
    pub min: i32,
    pub max: i32,
}

/// Derived taste model. Attribute weights live in [-1, 1]; an absent key
/// means "unknown", not "disliked".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preferences {
    pub genres: HashMap<String, f64>,
    pub directors: HashMap<String, f64>,
    pub actors: HashMap<String, f64>,
    pub runtime: Option<RuntimePreference>,
    pub year: Option<YearPreference>,
    pub rating_threshold: f64,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            genres: HashMap::new(),
            directors: HashMap::new(),
            actors: HashMap::new(),
            runtime: None,
            year: None,
            rating_threshold: 6.5,
        }
    }
}

impl Preferences {
    pub fn is_empty(&self) -> bool {
        self.genres.is_empty() && self.directors.is_empty() && self.actors.is_empty()
    }
}

/// Per-request preference model, derived from the action history and
/// discarded after the response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub rating_count: usize,
    pub avg_rating: f64,
    pub rating_variance: f64,
    pub time_active_days: i64,
    pub engagement: f64,
    pub session_depth: f64,
    pub recency_score: f64,
    pub recent_actions: Vec<Action>,
    pub preferences: Preferences,
}

impl UserProfile {
    /// Zero profile used when the tracking backend cannot be read.
    pub fn degenerate(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            rating_count: 0,
            avg_rating: 0.0,
            rating_variance: 0.0,
            time_active_days: 0,
            engagement: 0.0,
            session_depth: 0.0,
            recency_score: 0.0,
            recent_actions: Vec::new(),
            preferences: Preferences::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreSource {
    #[serde(rename = "content")]
    Content,
    #[serde(rename = "content-cold")]
    ContentCold,
    #[serde(rename = "collaborative-matrix")]
    CollaborativeMatrix,
    #[serde(rename = "collaborative-user")]
    CollaborativeUser,
    #[serde(rename = "collaborative-cold")]
    CollaborativeCold,
    #[serde(rename = "sequence")]
    Sequence,
    #[serde(rename = "sequence-cold")]
    SequenceCold,
    #[serde(rename = "rule")]
    Rule,
    #[serde(rename = "rule-cold")]
    RuleCold,
    #[serde(rename = "hybrid")]
    Hybrid,
}

impl ScoreSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreSource::Content => "content",
            ScoreSource::ContentCold => "content-cold",
            ScoreSource::CollaborativeMatrix => "collaborative-matrix",
            ScoreSource::CollaborativeUser => "collaborative-user",
            ScoreSource::CollaborativeCold => "collaborative-cold",
            ScoreSource::Sequence => "sequence",
            ScoreSource::SequenceCold => "sequence-cold",
            ScoreSource::Rule => "rule",
            ScoreSource::RuleCold => "rule-cold",
            ScoreSource::Hybrid => "hybrid",
        }
    }

    pub fn is_cold(&self) -> bool {
        matches!(
            self,
            ScoreSource::ContentCold
                | ScoreSource::CollaborativeCold
                | ScoreSource::SequenceCold
                | ScoreSource::RuleCold
        )
    }
}

/// One strategy's score for one candidate, always in [0, 1].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub item_id: i64,
    pub movie: Movie,
    pub score: f64,
    pub source: ScoreSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategyWeights {
    pub content: f64,
    pub collaborative: f64,
    pub sequence: f64,
    pub rule: f64,
}

impl StrategyWeights {
    pub fn sum(&self) -> f64 {
        self.content + self.collaborative + self.sequence + self.rule
    }

    /// Clamp each weight at zero and rescale onto the unit simplex. A zero
    /// sum is treated as one so degenerate inputs stay finite.
    pub fn normalized(self) -> Self {
        let content = self.content.max(0.0);
        let collaborative = self.collaborative.max(0.0);
        let sequence = self.sequence.max(0.0);
        let rule = self.rule.max(0.0);
        let sum = content + collaborative + sequence + rule;
        let divisor = if sum == 0.0 { 1.0 } else { sum };
        Self {
            content: content / divisor,
            collaborative: collaborative / divisor,
            sequence: sequence / divisor,
            rule: rule / divisor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReasonTag {
    #[serde(rename = "STRONG_CONTENT")]
    StrongContent,
    #[serde(rename = "SIMILAR_USERS")]
    SimilarUsers,
    #[serde(rename = "SESSION_FLOW")]
    SessionFlow,
    #[serde(rename = "ONBOARDING_MATCH")]
    OnboardingMatch,
}

/// Fused record carrying every per-strategy score, the weights that blended
/// them, and the final hybrid score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HybridRecord {
    pub item_id: i64,
    pub movie: Movie,
    pub content_score: f64,
    pub collaborative_score: f64,
    pub sequence_score: f64,
    pub rule_score: f64,
    pub weights: StrategyWeights,
    pub score: f64,
    pub source: ScoreSource,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reasons: Vec<ReasonTag>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecommendOptions {
    pub count: usize,
    pub exclude_rated: bool,
    pub exclude_watchlist: bool,
    pub min_score: f64,
    pub diversity_factor: f64,
    pub include_explanations: bool,
}

impl Default for RecommendOptions {
    fn default() -> Self {
        Self {
            count: 25,
            exclude_rated: true,
            exclude_watchlist: true,
            min_score: 0.5,
            diversity_factor: 0.25,
            include_explanations: false,
        }
    }
}

impl RecommendOptions {
    /// Stable encoding used in cache keys. Fields are emitted in a fixed
    /// alphabetical order so semantically-equal options always collide.
    pub fn canonical_key(&self) -> String {
        format!(
            "count={}&diversity_factor={}&exclude_rated={}&exclude_watchlist={}&include_explanations={}&min_score={}",
            self.count,
            self.diversity_factor,
            self.exclude_rated,
            self.exclude_watchlist,
            self.include_explanations,
            self.min_score,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarUser {
    pub user_id: String,
    pub similarity: f64,
}

/// Latent-model output for one `(user, item)` pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Prediction {
    pub item_id: i64,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub user_id: String,
    pub recommendations: Vec<HybridRecord>,
    pub generated_at: DateTime<Utc>,
}
