use chrono::{Duration, Utc};
use cinerec::algorithms::LatentFactorModel;
use cinerec::models::{
    Action, ActionMetadata, ActionType, Movie, RecommendOptions, ScoreSource, StrategyWeights,
};
use cinerec::services::cache::InMemoryCache;
use cinerec::services::catalog::InMemoryCatalog;
use cinerec::services::engine::RecommendationEngine;
use cinerec::services::fusion::{apply_diversity, fuse, rank, StrategyOutputs};
use cinerec::services::tracking::{InMemoryTrackingStore, RatingOverlapSimilarity};
use cinerec::utils;
use cinerec::utils::metrics::EngineMetrics;
use cinerec::Config;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;

const GENRES: &[&str] = &[
    "Action", "Comedy", "Drama", "Horror", "Romance", "Sci-Fi", "Thriller", "Western",
];

fn synthetic_movie(id: i64) -> Movie {
    let genre = GENRES[(id as usize) % GENRES.len()];
    Movie::new(id, format!("movie-{}", id))
        .with_genres(vec![genre.to_string()])
        .with_directors(vec![format!("director-{}", id % 40)])
        .with_release_year(1970 + (id % 55) as i32)
        .with_runtime(80 + (id % 80) as u32)
        .with_rating_stats(5.0 + (id % 50) as f64 / 10.0, (id as u64 % 2000) * 5)
        .with_popularity((id % 100) as f64)
}

fn synthetic_actions(user: &str, count: i64) -> Vec<Action> {
    (0..count)
        .map(|i| {
            Action::new(user, i, ActionType::Rate, 4.0 + (i % 7) as f64)
                .with_timestamp(Utc::now() - Duration::minutes(i * 17))
                .with_metadata(ActionMetadata {
                    genres: vec![GENRES[(i as usize) % GENRES.len()].to_string()],
                    runtime: Some(100 + (i % 60) as u32),
                    release_year: Some(1980 + (i % 40) as i32),
                    ..Default::default()
                })
        })
        .collect()
}

fn benchmark_session_grouping(c: &mut Criterion) {
    let actions = synthetic_actions("bench", 1000);

    c.bench_function("group_by_sessions_1000", |b| {
        b.iter(|| {
            black_box(utils::group_by_sessions(
                black_box(&actions),
                utils::session_timeout(),
            ));
        });
    });
}

fn benchmark_fusion_pipeline(c: &mut Criterion) {
    let weights = StrategyWeights {
        content: 0.35,
        collaborative: 0.25,
        sequence: 0.25,
        rule: 0.15,
    };

    let outputs = || {
        let make = |source: ScoreSource, offset: f64| {
            (0..500)
                .map(|id| cinerec::ScoreRecord {
                    item_id: id,
                    movie: synthetic_movie(id),
                    score: ((id as f64 * offset) % 100.0) / 100.0,
                    source,
                })
                .collect::<Vec<_>>()
        };
        StrategyOutputs {
            content: make(ScoreSource::Content, 0.37),
            collaborative: make(ScoreSource::CollaborativeMatrix, 0.53),
            sequence: make(ScoreSource::Sequence, 0.71),
            rule: make(ScoreSource::Rule, 0.29),
        }
    };

    c.bench_function("fuse_500_candidates", |b| {
        b.iter(|| {
            black_box(fuse(outputs(), weights, false));
        });
    });

    c.bench_function("diversity_and_rank_500", |b| {
        b.iter(|| {
            let mut records = fuse(outputs(), weights, false);
            apply_diversity(&mut records, 0.25);
            black_box(rank(records, 0.5, 25));
        });
    });
}

fn benchmark_end_to_end(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    let config = Config::default();
    let tracking = Arc::new(InMemoryTrackingStore::new());
    let catalog = Arc::new(InMemoryCatalog::new());
    let model = Arc::new(LatentFactorModel::new(config.model.factor_dim));

    for movie_id in 0..500 {
        catalog.insert(synthetic_movie(movie_id));
    }
    for action in synthetic_actions("bench-user", 200) {
        tracking.record(action);
    }
    rt.block_on(async {
        model.seed_user("bench-user").await;
        for movie_id in 0..500 {
            model.seed_item(movie_id).await;
        }
    });

    let engine = RecommendationEngine::new(
        tracking.clone(),
        catalog,
        Arc::new(InMemoryCache::new()),
        model,
        Arc::new(RatingOverlapSimilarity::new(tracking)),
        Arc::new(EngineMetrics::new()),
        config.engine.clone(),
        config.tracking.clone(),
    );

    c.bench_function("recommend_500_candidates", |b| {
        b.to_async(&rt).iter(|| async {
            // Unique options per iteration defeat the request cache so the
            // full pipeline runs every time.
            let options = RecommendOptions {
                min_score: 0.0,
                diversity_factor: 0.25 + (rand_offset() % 1000) as f64 * 1e-9,
                ..Default::default()
            };
            black_box(engine.recommend("bench-user", &options).await.unwrap());
        });
    });
}

fn rand_offset() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .subsec_nanos() as u64
}

criterion_group!(
    benches,
    benchmark_session_grouping,
    benchmark_fusion_pipeline,
    benchmark_end_to_end
);
criterion_main!(benches);
