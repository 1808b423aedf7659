use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Genre {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CastMember {
    pub name: String,
    #[serde(default)]
    pub character: Option<String>,
    #[serde(default)]
    pub profile_path: Option<String>,
}

/// Movie document. `_id` is the metadata provider's movie id, used verbatim;
/// the record is written once on first reference and never updated here.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Movie {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub overview: String,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub genres: Vec<Genre>,
    pub casts: Vec<CastMember>,
    pub release_date: Option<String>,
    pub original_language: String,
    pub tagline: String,
    pub vote_average: f32,
    pub runtime: Option<u32>,
}

/// One screening instance. Seat occupancy is mutated by the booking flow,
/// never by this service.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Show {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub movie: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub show_date_time: DateTime<Utc>,
    pub show_price: f64,
    pub occupied_seats: HashMap<String, String>,
}

impl Show {
    pub fn new(movie: String, show_date_time: DateTime<Utc>, show_price: f64) -> Self {
        Self {
            id: None,
            movie,
            show_date_time,
            show_price,
            occupied_seats: HashMap::new(),
        }
    }
}

/// A show joined with its movie document (`$lookup` output).
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PopulatedShow {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub movie: Movie,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub show_date_time: DateTime<Utc>,
    pub show_price: f64,
    pub occupied_seats: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AddShowRequest {
    pub movie_id: String,
    pub show_input: Vec<ShowInputEntry>,
    pub show_price: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ShowInputEntry {
    pub date: String,
    pub times: Vec<String>,
}

/// One slot in the per-movie showtime calendar.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ShowtimeEntry {
    pub time: DateTime<Utc>,
    pub show_id: String,
}
