use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashSet};
use tracing::{info, warn};

use crate::app::AppState;
use crate::error::ShowError;
use crate::models::{AddShowRequest, Movie, Show, ShowtimeEntry};
use crate::tmdb::{MovieCredits, MovieDetails};

pub const SHOW_ADDED_EVENT: &str = "app/show.added";

pub async fn now_playing(state: &AppState) -> Result<Vec<Value>, ShowError> {
    state.tmdb.now_playing().await.map_err(ShowError::Provider)
}

pub async fn add_show(state: &AppState, req: AddShowRequest) -> Result<(), ShowError> {
    let movie = match state
        .store
        .movie(&req.movie_id)
        .await
        .map_err(ShowError::Database)?
    {
        Some(existing) => existing,
        None => {
            // Both requests must land; the first failure aborts the join.
            let (details, credits) = tokio::try_join!(
                state.tmdb.movie_details(&req.movie_id),
                state.tmdb.movie_credits(&req.movie_id),
            )
            .map_err(ShowError::Provider)?;
            let movie = movie_record(req.movie_id.clone(), details, credits);
            state
                .store
                .create_movie_if_absent(&movie)
                .await
                .map_err(ShowError::Database)?;
            info!("Created movie record '{}' ({})", movie.title, movie.id);
            movie
        }
    };

    let mut batch = Vec::new();
    for entry in &req.show_input {
        for time in &entry.times {
            let at = parse_show_datetime(&entry.date, time)?;
            batch.push(Show::new(req.movie_id.clone(), at, req.show_price));
        }
    }
    if !batch.is_empty() {
        let count = batch.len();
        state
            .store
            .insert_shows(batch)
            .await
            .map_err(ShowError::Database)?;
        info!("Inserted {} show(s) for movie {}", count, req.movie_id);
    }

    // Best-effort notification; persistence already happened.
    let events = state.events.clone();
    let title = movie.title;
    tokio::spawn(async move {
        if let Err(e) = events
            .send(SHOW_ADDED_EVENT, json!({ "movieTitle": title }))
            .await
        {
            warn!("Failed to dispatch show-added event: {e:#}");
        }
    });

    Ok(())
}

/// Upcoming shows collapsed to one entry per distinct movie, earliest
/// showtime first.
pub async fn upcoming_movies(state: &AppState) -> Result<Vec<Movie>, ShowError> {
    let shows = state
        .store
        .upcoming_shows(Utc::now())
        .await
        .map_err(ShowError::Database)?;

    let mut seen = HashSet::new();
    let mut movies = Vec::new();
    for show in shows {
        if seen.insert(show.movie.id.clone()) {
            movies.push(show.movie);
        }
    }
    Ok(movies)
}

pub async fn movie_calendar(
    state: &AppState,
    movie_id: &str,
) -> Result<(Option<Movie>, BTreeMap<String, Vec<ShowtimeEntry>>), ShowError> {
    let now = Utc::now();
    let shows = state
        .store
        .shows_for_movie(movie_id, now)
        .await
        .map_err(ShowError::Database)?;
    // No existence check on purpose: an unknown id yields a null movie.
    let movie = state
        .store
        .movie(movie_id)
        .await
        .map_err(ShowError::Database)?;

    let mut calendar: BTreeMap<String, Vec<ShowtimeEntry>> = BTreeMap::new();
    for show in shows {
        let date = show.show_date_time.date_naive().to_string();
        calendar.entry(date).or_default().push(ShowtimeEntry {
            time: show.show_date_time,
            show_id: show.id.map(|id| id.to_hex()).unwrap_or_default(),
        });
    }
    Ok((movie, calendar))
}

fn movie_record(id: String, details: MovieDetails, credits: MovieCredits) -> Movie {
    Movie {
        id,
        title: details.title,
        overview: details.overview,
        poster_path: details.poster_path,
        backdrop_path: details.backdrop_path,
        genres: details.genres,
        casts: credits.cast,
        release_date: details.release_date,
        original_language: details.original_language,
        tagline: details.tagline.unwrap_or_default(),
        vote_average: details.vote_average,
        runtime: details.runtime,
    }
}

/// Submitted dates and times are venue wall-clock; the whole pipeline
/// interprets them as UTC.
fn parse_show_datetime(date: &str, time: &str) -> Result<DateTime<Utc>, ShowError> {
    let raw = format!("{date}T{time}");
    let parsed = NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M"))
        .map_err(|e| ShowError::InvalidInput(format!("bad show date-time '{raw}': {e}")))?;
    Ok(parsed.and_utc())
}
