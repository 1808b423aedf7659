use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::{self, doc};
use mongodb::{Client, Collection};
use std::env;

use crate::models::{Movie, PopulatedShow, Show};

const DEFAULT_DATABASE: &str = "boxoffice";

#[async_trait]
pub trait ShowStore: Send + Sync {
    async fn movie(&self, id: &str) -> Result<Option<Movie>>;
    /// Insert the movie unless a document with the same id already exists.
    /// Safe to race: the losing writer is a no-op.
    async fn create_movie_if_absent(&self, movie: &Movie) -> Result<()>;
    async fn insert_shows(&self, shows: Vec<Show>) -> Result<()>;
    /// Shows at or after `after`, each joined with its movie document,
    /// ordered by date-time ascending.
    async fn upcoming_shows(&self, after: DateTime<Utc>) -> Result<Vec<PopulatedShow>>;
    async fn shows_for_movie(&self, movie_id: &str, after: DateTime<Utc>) -> Result<Vec<Show>>;
}

pub struct MongoStore {
    movies: Collection<Movie>,
    shows: Collection<Show>,
}

impl MongoStore {
    pub async fn connect(uri: &str, database: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri)
            .await
            .context("connecting to MongoDB failed")?;
        let db = client.database(database);
        Ok(Self {
            movies: db.collection("movies"),
            shows: db.collection("shows"),
        })
    }

    pub async fn from_env() -> Result<Self> {
        let uri = env::var("MONGODB_URI").context("MONGODB_URI not set")?;
        let database =
            env::var("MONGODB_DATABASE").unwrap_or_else(|_| DEFAULT_DATABASE.to_string());
        Self::connect(&uri, &database).await
    }
}

#[async_trait]
impl ShowStore for MongoStore {
    async fn movie(&self, id: &str) -> Result<Option<Movie>> {
        let found = self.movies.find_one(doc! { "_id": id }).await?;
        Ok(found)
    }

    async fn create_movie_if_absent(&self, movie: &Movie) -> Result<()> {
        let record = bson::to_document(movie).context("serializing movie failed")?;
        self.movies
            .update_one(doc! { "_id": &movie.id }, doc! { "$setOnInsert": record })
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn insert_shows(&self, shows: Vec<Show>) -> Result<()> {
        self.shows.insert_many(shows).await?;
        Ok(())
    }

    async fn upcoming_shows(&self, after: DateTime<Utc>) -> Result<Vec<PopulatedShow>> {
        let pipeline = vec![
            doc! { "$match": { "showDateTime": { "$gte": bson::DateTime::from_chrono(after) } } },
            doc! { "$sort": { "showDateTime": 1 } },
            doc! { "$lookup": {
                "from": "movies",
                "localField": "movie",
                "foreignField": "_id",
                "as": "movie",
            } },
            doc! { "$unwind": "$movie" },
        ];
        let mut cursor = self.shows.aggregate(pipeline).await?;
        let mut populated = Vec::new();
        while let Some(document) = cursor.try_next().await? {
            populated
                .push(bson::from_document(document).context("decoding populated show failed")?);
        }
        Ok(populated)
    }

    async fn shows_for_movie(&self, movie_id: &str, after: DateTime<Utc>) -> Result<Vec<Show>> {
        let filter = doc! {
            "movie": movie_id,
            "showDateTime": { "$gte": bson::DateTime::from_chrono(after) },
        };
        let shows = self.shows.find(filter).await?.try_collect().await?;
        Ok(shows)
    }
}
