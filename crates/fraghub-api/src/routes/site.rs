use axum::{extract::State, Json};
use chrono::Utc;
use fraghub_core::site::{Activity, Totals};
use fraghub_core::AppState;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::routes::{announcements, events, posts, votes};

fn totals_to_json(t: &Totals) -> Value {
    json!({
        "users": t.users,
        "posts": t.posts,
        "topics": t.topics,
        "gallery_items": t.gallery_items,
    })
}

fn activity_to_json(a: &Activity) -> Value {
    json!({ "users": a.users, "posts": a.posts, "topics": a.topics })
}

pub async fn home(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let now = Utc::now();
    let home = fraghub_core::site::home(&state.db, now).await?;
    let latest_posts: Vec<Value> = home.latest_posts.iter().map(posts::post_to_json).collect();
    let hashtags: Vec<Value> = home
        .trending_hashtags
        .iter()
        .map(posts::hashtag_to_json)
        .collect();
    let upcoming: Vec<Value> = home.upcoming_events.iter().map(events::event_to_json).collect();
    let pinned: Vec<Value> = home
        .pinned_announcements
        .iter()
        .map(announcements::announcement_to_json)
        .collect();
    let open_votes: Vec<Value> = home
        .open_votes
        .iter()
        .map(|v| votes::vote_to_json(v, now))
        .collect();

    Ok(Json(json!({
        "latest_posts": latest_posts,
        "trending_hashtags": hashtags,
        "upcoming_events": upcoming,
        "pinned_announcements": pinned,
        "open_votes": open_votes,
        "totals": totals_to_json(&home.totals),
    })))
}

pub async fn stats(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<Json<Value>, ApiError> {
    let stats = fraghub_core::site::stats(&state.db, Utc::now()).await?;
    let top_posters: Vec<Value> = stats
        .top_posters
        .iter()
        .map(|p| {
            json!({
                "user_id": p.user_id,
                "username": p.username,
                "post_count": p.post_count,
            })
        })
        .collect();
    Ok(Json(json!({
        "totals": totals_to_json(&stats.totals),
        "last_7_days": activity_to_json(&stats.last_7_days),
        "last_30_days": activity_to_json(&stats.last_30_days),
        "top_posters": top_posters,
    })))
}

pub async fn status(State(state): State<AppState>) -> Json<Value> {
    let status = fraghub_core::site::status(&state.db, *state.started_at).await;
    Json(json!({
        "status": if status.database_ok { "ok" } else { "degraded" },
        "database_ok": status.database_ok,
        "response_time_ms": status.response_time_ms,
        "server_time": status.server_time.to_rfc3339(),
        "uptime_seconds": status.uptime_seconds,
        "totals": status.totals.as_ref().map(totals_to_json),
        "engagement": status.engagement,
    }))
}
