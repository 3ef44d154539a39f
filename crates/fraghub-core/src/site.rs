//! Site-wide aggregate views: the home page, community statistics and the
//! service status report.

use crate::error::CoreError;
use crate::observability::{metrics, MetricsSnapshot};
use chrono::{DateTime, Duration, Utc};
use fraghub_db::announcements::AnnouncementRow;
use fraghub_db::events::EventRow;
use fraghub_db::posts::{HashtagCountRow, PostRow};
use fraghub_db::users::PosterRow;
use fraghub_db::votes::VoteRow;
use fraghub_db::DbPool;
use std::time::Instant;

const HOME_POSTS: i64 = 5;
const HOME_HASHTAGS: i64 = 10;
const HOME_EVENTS: i64 = 3;
const HOME_ANNOUNCEMENTS: i64 = 3;
const HOME_VOTES: i64 = 3;
const TOP_POSTERS: i64 = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Totals {
    pub users: i64,
    pub posts: i64,
    pub topics: i64,
    pub gallery_items: i64,
}

async fn totals(pool: &DbPool) -> Result<Totals, CoreError> {
    Ok(Totals {
        users: fraghub_db::users::count_users(pool).await?,
        posts: fraghub_db::posts::count_posts(pool).await?,
        topics: fraghub_db::forum::count_topics(pool).await?,
        gallery_items: fraghub_db::gallery::count_approved(pool).await?,
    })
}

#[derive(Debug, Clone)]
pub struct Home {
    pub latest_posts: Vec<PostRow>,
    pub trending_hashtags: Vec<HashtagCountRow>,
    pub upcoming_events: Vec<EventRow>,
    pub pinned_announcements: Vec<AnnouncementRow>,
    pub open_votes: Vec<VoteRow>,
    pub totals: Totals,
}

pub async fn home(pool: &DbPool, now: DateTime<Utc>) -> Result<Home, CoreError> {
    Ok(Home {
        latest_posts: fraghub_db::posts::list_latest_posts(pool, HOME_POSTS).await?,
        trending_hashtags: fraghub_db::posts::trending_hashtags(pool, HOME_HASHTAGS).await?,
        upcoming_events: fraghub_db::events::list_upcoming(pool, now, HOME_EVENTS).await?,
        pinned_announcements: fraghub_db::announcements::list_announcements(
            pool,
            true,
            HOME_ANNOUNCEMENTS,
        )
        .await?,
        open_votes: fraghub_db::votes::list_open_votes(pool, now, HOME_VOTES).await?,
        totals: totals(pool).await?,
    })
}

/// New registrations and content over a trailing window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Activity {
    pub users: i64,
    pub posts: i64,
    pub topics: i64,
}

async fn activity_since(pool: &DbPool, since: DateTime<Utc>) -> Result<Activity, CoreError> {
    Ok(Activity {
        users: fraghub_db::users::count_users_since(pool, since).await?,
        posts: fraghub_db::posts::count_posts_since(pool, since).await?,
        topics: fraghub_db::forum::count_topics_since(pool, since).await?,
    })
}

#[derive(Debug, Clone)]
pub struct Stats {
    pub totals: Totals,
    pub last_7_days: Activity,
    pub last_30_days: Activity,
    pub top_posters: Vec<PosterRow>,
}

pub async fn stats(pool: &DbPool, now: DateTime<Utc>) -> Result<Stats, CoreError> {
    Ok(Stats {
        totals: totals(pool).await?,
        last_7_days: activity_since(pool, now - Duration::days(7)).await?,
        last_30_days: activity_since(pool, now - Duration::days(30)).await?,
        top_posters: fraghub_db::users::top_posters(pool, TOP_POSTERS).await?,
    })
}

#[derive(Debug, Clone)]
pub struct Status {
    pub database_ok: bool,
    pub response_time_ms: f64,
    pub server_time: DateTime<Utc>,
    pub uptime_seconds: u64,
    /// Absent when the database is unreachable.
    pub totals: Option<Totals>,
    pub engagement: MetricsSnapshot,
}

/// Never fails: an unreachable database is reported, not raised.
pub async fn status(pool: &DbPool, started_at: Instant) -> Status {
    let ping_started = Instant::now();
    let database_ok = match fraghub_db::ping(pool).await {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!("status: database ping failed: {err}");
            false
        }
    };
    let totals = if database_ok {
        totals(pool).await.ok()
    } else {
        None
    };
    Status {
        database_ok,
        response_time_ms: ping_started.elapsed().as_secs_f64() * 1000.0,
        server_time: Utc::now(),
        uptime_seconds: started_at.elapsed().as_secs(),
        totals,
        engagement: metrics().snapshot(),
    }
}
