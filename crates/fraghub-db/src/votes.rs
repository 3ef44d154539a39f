use crate::{classify, DbError, DbPool};
use chrono::{DateTime, Utc};
use fraghub_models::vote::VoteType;

const VOTE_COLUMNS: &str = "id, title, description, vote_type, is_active, created_at, end_date";
const OPTION_COLUMNS: &str = "id, vote_id, text, image_url, votes";
const BALLOT_COLUMNS: &str = "id, user_id, vote_id, option_id, voted_at";

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VoteRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub vote_type: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
}

impl VoteRow {
    /// Accepting ballots: the active flag is set and the end date, if any, is still ahead.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.end_date.is_none_or(|end| end > now)
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VoteOptionRow {
    pub id: i64,
    pub vote_id: i64,
    pub text: String,
    pub image_url: Option<String>,
    pub votes: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserVoteRow {
    pub id: i64,
    pub user_id: i64,
    pub vote_id: i64,
    pub option_id: i64,
    pub voted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VoteTotalRow {
    pub id: i64,
    pub title: String,
    pub vote_type: String,
    pub is_active: bool,
    pub total_votes: i64,
}

pub async fn create_vote(
    pool: &DbPool,
    title: &str,
    description: &str,
    vote_type: VoteType,
    is_active: bool,
    end_date: Option<DateTime<Utc>>,
) -> Result<VoteRow, DbError> {
    let sql = format!(
        "INSERT INTO votes (title, description, vote_type, is_active, end_date)
         VALUES (?1, ?2, ?3, ?4, ?5)
         RETURNING {VOTE_COLUMNS}"
    );
    let row = sqlx::query_as::<_, VoteRow>(&sql)
        .bind(title)
        .bind(description)
        .bind(vote_type.as_str())
        .bind(is_active)
        .bind(end_date)
        .fetch_one(pool)
        .await?;
    Ok(row)
}

pub async fn get_vote(pool: &DbPool, id: i64) -> Result<Option<VoteRow>, DbError> {
    let sql = format!("SELECT {VOTE_COLUMNS} FROM votes WHERE id = ?1");
    let row = sqlx::query_as::<_, VoteRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Full replacement of the editable fields.
pub async fn update_vote(
    pool: &DbPool,
    id: i64,
    title: &str,
    description: &str,
    vote_type: VoteType,
    is_active: bool,
    end_date: Option<DateTime<Utc>>,
) -> Result<VoteRow, DbError> {
    let sql = format!(
        "UPDATE votes
         SET title = ?2, description = ?3, vote_type = ?4, is_active = ?5, end_date = ?6
         WHERE id = ?1
         RETURNING {VOTE_COLUMNS}"
    );
    sqlx::query_as::<_, VoteRow>(&sql)
        .bind(id)
        .bind(title)
        .bind(description)
        .bind(vote_type.as_str())
        .bind(is_active)
        .bind(end_date)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

pub async fn delete_vote(pool: &DbPool, id: i64) -> Result<bool, DbError> {
    let result = sqlx::query("DELETE FROM votes WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn list_votes(pool: &DbPool) -> Result<Vec<VoteRow>, DbError> {
    let sql = format!("SELECT {VOTE_COLUMNS} FROM votes ORDER BY created_at DESC, id DESC");
    let rows = sqlx::query_as::<_, VoteRow>(&sql).fetch_all(pool).await?;
    Ok(rows)
}

pub async fn list_open_votes(
    pool: &DbPool,
    now: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<VoteRow>, DbError> {
    let sql = format!(
        "SELECT {VOTE_COLUMNS} FROM votes
         WHERE is_active = 1
           AND (end_date IS NULL OR julianday(end_date) > julianday(?1))
         ORDER BY created_at DESC, id DESC
         LIMIT ?2"
    );
    let rows = sqlx::query_as::<_, VoteRow>(&sql)
        .bind(now)
        .bind(limit)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn list_votes_by_type(pool: &DbPool, vote_type: VoteType) -> Result<Vec<VoteRow>, DbError> {
    let sql = format!(
        "SELECT {VOTE_COLUMNS} FROM votes WHERE vote_type = ?1 ORDER BY created_at DESC, id DESC"
    );
    let rows = sqlx::query_as::<_, VoteRow>(&sql)
        .bind(vote_type.as_str())
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn list_votes_created_since(
    pool: &DbPool,
    since: DateTime<Utc>,
) -> Result<Vec<VoteRow>, DbError> {
    let sql = format!(
        "SELECT {VOTE_COLUMNS} FROM votes
         WHERE julianday(created_at) >= julianday(?1)
         ORDER BY created_at DESC, id DESC"
    );
    let rows = sqlx::query_as::<_, VoteRow>(&sql)
        .bind(since)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

/// Votes ranked by the number of ballots they have collected.
pub async fn list_popular_votes(pool: &DbPool, limit: i64) -> Result<Vec<VoteTotalRow>, DbError> {
    let rows = sqlx::query_as::<_, VoteTotalRow>(
        "SELECT v.id, v.title, v.vote_type, v.is_active, COALESCE(SUM(o.votes), 0) AS total_votes
         FROM votes v
         LEFT JOIN vote_options o ON o.vote_id = v.id
         GROUP BY v.id
         ORDER BY total_votes DESC, v.id DESC
         LIMIT ?1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Returns `(active, inactive)` counts by the stored flag.
pub async fn count_votes_by_state(pool: &DbPool) -> Result<(i64, i64), DbError> {
    let (active, inactive): (i64, i64) = sqlx::query_as(
        "SELECT COALESCE(SUM(is_active = 1), 0), COALESCE(SUM(is_active = 0), 0) FROM votes",
    )
    .fetch_one(pool)
    .await?;
    Ok((active, inactive))
}

pub async fn create_option(
    pool: &DbPool,
    vote_id: i64,
    text: &str,
    image_url: Option<&str>,
) -> Result<VoteOptionRow, DbError> {
    let sql = format!(
        "INSERT INTO vote_options (vote_id, text, image_url)
         VALUES (?1, ?2, ?3)
         RETURNING {OPTION_COLUMNS}"
    );
    let row = sqlx::query_as::<_, VoteOptionRow>(&sql)
        .bind(vote_id)
        .bind(text)
        .bind(image_url)
        .fetch_one(pool)
        .await?;
    Ok(row)
}

pub async fn get_option(pool: &DbPool, id: i64) -> Result<Option<VoteOptionRow>, DbError> {
    let sql = format!("SELECT {OPTION_COLUMNS} FROM vote_options WHERE id = ?1");
    let row = sqlx::query_as::<_, VoteOptionRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Edits the label and image; the counter is only ever touched by [`record_ballot`].
pub async fn update_option(
    pool: &DbPool,
    id: i64,
    text: &str,
    image_url: Option<&str>,
) -> Result<VoteOptionRow, DbError> {
    let sql = format!(
        "UPDATE vote_options SET text = ?2, image_url = ?3 WHERE id = ?1 RETURNING {OPTION_COLUMNS}"
    );
    sqlx::query_as::<_, VoteOptionRow>(&sql)
        .bind(id)
        .bind(text)
        .bind(image_url)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}

/// Deletes an option nobody has picked yet. Returns false when the option is
/// missing or already carries ballots.
pub async fn delete_option(pool: &DbPool, id: i64) -> Result<bool, DbError> {
    let result = sqlx::query(
        "DELETE FROM vote_options
         WHERE id = ?1 AND NOT EXISTS (SELECT 1 FROM user_votes WHERE option_id = ?1)",
    )
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Options of a vote, most voted first.
pub async fn get_vote_options(pool: &DbPool, vote_id: i64) -> Result<Vec<VoteOptionRow>, DbError> {
    let sql = format!(
        "SELECT {OPTION_COLUMNS} FROM vote_options WHERE vote_id = ?1 ORDER BY votes DESC, id ASC"
    );
    let rows = sqlx::query_as::<_, VoteOptionRow>(&sql)
        .bind(vote_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn get_user_ballot(
    pool: &DbPool,
    user_id: i64,
    vote_id: i64,
) -> Result<Option<UserVoteRow>, DbError> {
    let sql = format!("SELECT {BALLOT_COLUMNS} FROM user_votes WHERE user_id = ?1 AND vote_id = ?2");
    let row = sqlx::query_as::<_, UserVoteRow>(&sql)
        .bind(user_id)
        .bind(vote_id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

pub async fn count_votes(pool: &DbPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM votes")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Store a ballot and bump the option counter in one transaction.
///
/// The insert is guarded by the vote being open at `now` and the option belonging
/// to the vote; `Ok(None)` means the guard rejected it and nothing was written.
/// A second ballot by the same user fails with [`DbError::UniqueViolation`].
pub async fn record_ballot(
    pool: &DbPool,
    user_id: i64,
    vote_id: i64,
    option_id: i64,
    now: DateTime<Utc>,
) -> Result<Option<UserVoteRow>, DbError> {
    let mut tx = pool.begin().await?;

    // The insert is the first statement so the write lock is taken before any read.
    let sql = format!(
        "INSERT INTO user_votes (user_id, vote_id, option_id, voted_at)
         SELECT ?1, v.id, o.id, ?4
         FROM votes v
         JOIN vote_options o ON o.vote_id = v.id
         WHERE v.id = ?2
           AND o.id = ?3
           AND v.is_active = 1
           AND (v.end_date IS NULL OR julianday(v.end_date) > julianday(?4))
         RETURNING {BALLOT_COLUMNS}"
    );
    let ballot = sqlx::query_as::<_, UserVoteRow>(&sql)
        .bind(user_id)
        .bind(vote_id)
        .bind(option_id)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await
        .map_err(classify)?;

    let Some(ballot) = ballot else {
        tx.rollback().await?;
        return Ok(None);
    };

    sqlx::query("UPDATE vote_options SET votes = votes + 1 WHERE id = ?1")
        .bind(option_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(Some(ballot))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{test_pool, user};
    use chrono::Duration;

    async fn vote_with_options(pool: &DbPool) -> (VoteRow, VoteOptionRow, VoteOptionRow) {
        let vote = create_vote(pool, "Best highlight", "", VoteType::Highlight, true, None)
            .await
            .unwrap();
        let a = create_option(pool, vote.id, "A", None).await.unwrap();
        let b = create_option(pool, vote.id, "B", None).await.unwrap();
        (vote, a, b)
    }

    #[tokio::test]
    async fn record_ballot_increments_the_option() {
        let pool = test_pool().await;
        let voter = user(&pool, "voter").await;
        let (vote, a, _) = vote_with_options(&pool).await;

        let ballot = record_ballot(&pool, voter, vote.id, a.id, Utc::now())
            .await
            .unwrap()
            .expect("ballot recorded");
        assert_eq!(ballot.option_id, a.id);
        assert_eq!(get_option(&pool, a.id).await.unwrap().unwrap().votes, 1);
    }

    #[tokio::test]
    async fn picked_options_survive_until_the_vote_goes() {
        let pool = test_pool().await;
        let voter = user(&pool, "voter").await;
        let (vote, a, b) = vote_with_options(&pool).await;
        record_ballot(&pool, voter, vote.id, a.id, Utc::now())
            .await
            .unwrap();

        assert!(!delete_option(&pool, a.id).await.unwrap());
        assert!(get_user_ballot(&pool, voter, vote.id).await.unwrap().is_some());
        assert!(delete_option(&pool, b.id).await.unwrap());

        assert!(delete_vote(&pool, vote.id).await.unwrap());
        assert!(get_user_ballot(&pool, voter, vote.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn second_ballot_is_a_unique_violation_and_leaves_counters() {
        let pool = test_pool().await;
        let voter = user(&pool, "voter").await;
        let (vote, a, b) = vote_with_options(&pool).await;

        record_ballot(&pool, voter, vote.id, a.id, Utc::now())
            .await
            .unwrap();
        let err = record_ballot(&pool, voter, vote.id, b.id, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation));
        assert_eq!(get_option(&pool, b.id).await.unwrap().unwrap().votes, 0);
    }

    #[tokio::test]
    async fn guard_rejects_foreign_option() {
        let pool = test_pool().await;
        let voter = user(&pool, "voter").await;
        let (vote, _, _) = vote_with_options(&pool).await;
        let other = create_vote(&pool, "Other", "", VoteType::Other, true, None)
            .await
            .unwrap();
        let foreign = create_option(&pool, other.id, "X", None).await.unwrap();

        let outcome = record_ballot(&pool, voter, vote.id, foreign.id, Utc::now())
            .await
            .unwrap();
        assert!(outcome.is_none());
        assert!(get_user_ballot(&pool, voter, vote.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn guard_rejects_expired_vote() {
        let pool = test_pool().await;
        let voter = user(&pool, "voter").await;
        let now = Utc::now();
        let vote = create_vote(
            &pool,
            "Expired",
            "",
            VoteType::Weapon,
            true,
            Some(now - Duration::minutes(1)),
        )
        .await
        .unwrap();
        let option = create_option(&pool, vote.id, "A1", None).await.unwrap();

        assert!(!vote.is_open(now));
        let outcome = record_ballot(&pool, voter, vote.id, option.id, now)
            .await
            .unwrap();
        assert!(outcome.is_none());
        assert_eq!(get_option(&pool, option.id).await.unwrap().unwrap().votes, 0);
    }

    #[tokio::test]
    async fn options_are_ordered_by_votes() {
        let pool = test_pool().await;
        let (vote, a, b) = vote_with_options(&pool).await;
        let u1 = user(&pool, "u1").await;
        record_ballot(&pool, u1, vote.id, b.id, Utc::now())
            .await
            .unwrap();

        let options = get_vote_options(&pool, vote.id).await.unwrap();
        assert_eq!(options[0].id, b.id);
        assert_eq!(options[1].id, a.id);
    }

    #[tokio::test]
    async fn open_listing_skips_closed_and_expired() {
        let pool = test_pool().await;
        let now = Utc::now();
        create_vote(&pool, "open", "", VoteType::Post, true, None)
            .await
            .unwrap();
        create_vote(&pool, "future", "", VoteType::Post, true, Some(now + Duration::days(1)))
            .await
            .unwrap();
        create_vote(&pool, "closed", "", VoteType::Post, false, None)
            .await
            .unwrap();
        create_vote(&pool, "expired", "", VoteType::Post, true, Some(now - Duration::days(1)))
            .await
            .unwrap();

        let open = list_open_votes(&pool, now, 10).await.unwrap();
        let titles: Vec<&str> = open.iter().map(|v| v.title.as_str()).collect();
        assert_eq!(titles.len(), 2);
        assert!(titles.contains(&"open"));
        assert!(titles.contains(&"future"));
        assert_eq!(count_votes_by_state(&pool).await.unwrap(), (3, 1));
    }

    #[tokio::test]
    async fn popular_votes_rank_by_ballots() {
        let pool = test_pool().await;
        let (quiet, _, _) = vote_with_options(&pool).await;
        let busy = create_vote(&pool, "Busy", "", VoteType::Other, true, None)
            .await
            .unwrap();
        let option = create_option(&pool, busy.id, "yes", None).await.unwrap();
        for name in ["a", "b"] {
            let voter = user(&pool, name).await;
            record_ballot(&pool, voter, busy.id, option.id, Utc::now())
                .await
                .unwrap();
        }

        let ranked = list_popular_votes(&pool, 10).await.unwrap();
        assert_eq!(ranked[0].id, busy.id);
        assert_eq!(ranked[0].total_votes, 2);
        assert_eq!(ranked[1].id, quiet.id);
        assert_eq!(ranked[1].total_votes, 0);
    }
}
