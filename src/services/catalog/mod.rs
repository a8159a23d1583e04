use crate::models::Movie;
use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;

/// Source of candidate items. The engine applies exclusion filtering on
/// top of whatever this returns.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn available_movies(&self) -> Result<Vec<Movie>>;
    async fn get_movie(&self, id: i64) -> Result<Option<Movie>>;
}

#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    movies: DashMap<i64, Movie>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, movie: Movie) {
        self.movies.insert(movie.id, movie);
    }

    pub fn len(&self) -> usize {
        self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }
}

#[async_trait]
impl CatalogSource for InMemoryCatalog {
    async fn available_movies(&self) -> Result<Vec<Movie>> {
        let mut movies: Vec<Movie> = self.movies.iter().map(|entry| entry.value().clone()).collect();
        movies.sort_by_key(|m| m.id);
        Ok(movies)
    }

    async fn get_movie(&self, id: i64) -> Result<Option<Movie>> {
        Ok(self.movies.get(&id).map(|entry| entry.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_insert_and_list() {
        let catalog = InMemoryCatalog::new();
        catalog.insert(Movie::new(3, "c"));
        catalog.insert(Movie::new(1, "a"));
        catalog.insert(Movie::new(2, "b"));

        let movies = catalog.available_movies().await.unwrap();
        let ids: Vec<i64> = movies.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        assert!(catalog.get_movie(2).await.unwrap().is_some());
        assert!(catalog.get_movie(9).await.unwrap().is_none());
    }
}
