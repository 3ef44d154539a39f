use crate::error::CoreError;
use crate::observability::metrics;
use crate::permissions::{require_role, Actor};
use chrono::{DateTime, Duration, Utc};
use fraghub_db::votes::{UserVoteRow, VoteOptionRow, VoteRow};
use fraghub_db::{DbError, DbPool};
use fraghub_models::role::Role;
use fraghub_models::vote::{OptionResult, VoteResults, VoteType};

/// Share of `part` in `total` as a percentage; 0 when nothing was counted.
pub fn percentage(part: i64, total: i64) -> f64 {
    if total <= 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

/// Vote with its options (most voted first) and the viewer's ballot, if any.
#[derive(Debug, Clone)]
pub struct VoteDetail {
    pub vote: VoteRow,
    pub options: Vec<VoteOptionRow>,
    pub is_open: bool,
    pub ballot: Option<UserVoteRow>,
}

#[derive(Debug, Clone)]
pub struct VoteInput {
    pub title: String,
    pub description: String,
    pub vote_type: VoteType,
    pub is_active: bool,
    pub end_date: Option<DateTime<Utc>>,
}

impl VoteInput {
    fn validate(&self) -> Result<(), CoreError> {
        if self.title.trim().is_empty() {
            return Err(CoreError::BadRequest("title is required".into()));
        }
        Ok(())
    }
}

pub async fn get_vote_detail(
    pool: &DbPool,
    vote_id: i64,
    viewer: Option<i64>,
    now: DateTime<Utc>,
) -> Result<VoteDetail, CoreError> {
    let vote = fraghub_db::votes::get_vote(pool, vote_id)
        .await?
        .ok_or(CoreError::NotFound)?;
    let options = fraghub_db::votes::get_vote_options(pool, vote_id).await?;
    let ballot = match viewer {
        Some(user_id) => fraghub_db::votes::get_user_ballot(pool, user_id, vote_id).await?,
        None => None,
    };
    Ok(VoteDetail {
        is_open: vote.is_open(now),
        vote,
        options,
        ballot,
    })
}

async fn cast_vote_inner(
    pool: &DbPool,
    user_id: i64,
    vote_id: i64,
    option_id: i64,
    now: DateTime<Utc>,
) -> Result<UserVoteRow, CoreError> {
    let vote = fraghub_db::votes::get_vote(pool, vote_id)
        .await?
        .ok_or(CoreError::NotFound)?;
    if !vote.is_open(now) {
        return Err(CoreError::NotActive);
    }
    if fraghub_db::votes::get_user_ballot(pool, user_id, vote_id)
        .await?
        .is_some()
    {
        return Err(CoreError::AlreadyVoted);
    }
    let option_matches = fraghub_db::votes::get_option(pool, option_id)
        .await?
        .is_some_and(|option| option.vote_id == vote_id);
    if !option_matches {
        return Err(CoreError::InvalidOption);
    }

    match fraghub_db::votes::record_ballot(pool, user_id, vote_id, option_id, now).await {
        Ok(Some(ballot)) => Ok(ballot),
        Err(DbError::UniqueViolation) => Err(CoreError::AlreadyVoted),
        Err(e) => Err(e.into()),
        // The vote closed or the option was removed after the pre-checks.
        Ok(None) => {
            let still_open = fraghub_db::votes::get_vote(pool, vote_id)
                .await?
                .is_some_and(|vote| vote.is_open(now));
            if still_open {
                Err(CoreError::InvalidOption)
            } else {
                Err(CoreError::NotActive)
            }
        }
    }
}

/// Record `user_id`'s ballot for `option_id` and increment the option counter.
pub async fn cast_vote(
    pool: &DbPool,
    user_id: i64,
    vote_id: i64,
    option_id: i64,
    now: DateTime<Utc>,
) -> Result<UserVoteRow, CoreError> {
    match cast_vote_inner(pool, user_id, vote_id, option_id, now).await {
        Ok(ballot) => {
            metrics().ballot_cast();
            tracing::info!(user_id, vote_id, option_id, "ballot cast");
            Ok(ballot)
        }
        Err(err) => {
            metrics().observe_error(&err);
            Err(err)
        }
    }
}

pub async fn compute_results(pool: &DbPool, vote_id: i64) -> Result<VoteResults, CoreError> {
    fraghub_db::votes::get_vote(pool, vote_id)
        .await?
        .ok_or(CoreError::NotFound)?;
    let options = fraghub_db::votes::get_vote_options(pool, vote_id).await?;
    let total_votes: i64 = options.iter().map(|option| option.votes).sum();

    Ok(VoteResults {
        vote_id,
        total_votes,
        options: options
            .into_iter()
            .map(|option| OptionResult {
                option_id: option.id,
                percentage: percentage(option.votes, total_votes),
                text: option.text,
                votes: option.votes,
            })
            .collect(),
    })
}

/// Votes created since midnight UTC of `now`'s day.
pub async fn list_daily_votes(pool: &DbPool, now: DateTime<Utc>) -> Result<Vec<VoteRow>, CoreError> {
    let midnight = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|start| start.and_utc())
        .unwrap_or(now);
    Ok(fraghub_db::votes::list_votes_created_since(pool, midnight).await?)
}

pub async fn list_weekly_votes(pool: &DbPool, now: DateTime<Utc>) -> Result<Vec<VoteRow>, CoreError> {
    Ok(fraghub_db::votes::list_votes_created_since(pool, now - Duration::days(7)).await?)
}

pub async fn create_vote(pool: &DbPool, actor: &Actor, input: &VoteInput) -> Result<VoteRow, CoreError> {
    require_role(actor, Role::Moderator)?;
    input.validate()?;
    let vote = fraghub_db::votes::create_vote(
        pool,
        input.title.trim(),
        &input.description,
        input.vote_type,
        input.is_active,
        input.end_date,
    )
    .await?;
    tracing::info!(vote_id = vote.id, by = actor.user_id, "vote created");
    Ok(vote)
}

pub async fn update_vote(
    pool: &DbPool,
    actor: &Actor,
    vote_id: i64,
    input: &VoteInput,
) -> Result<VoteRow, CoreError> {
    require_role(actor, Role::Moderator)?;
    input.validate()?;
    Ok(fraghub_db::votes::update_vote(
        pool,
        vote_id,
        input.title.trim(),
        &input.description,
        input.vote_type,
        input.is_active,
        input.end_date,
    )
    .await?)
}

pub async fn delete_vote(pool: &DbPool, actor: &Actor, vote_id: i64) -> Result<(), CoreError> {
    require_role(actor, Role::Moderator)?;
    if !fraghub_db::votes::delete_vote(pool, vote_id).await? {
        return Err(CoreError::NotFound);
    }
    tracing::info!(vote_id, by = actor.user_id, "vote deleted");
    Ok(())
}

pub async fn add_option(
    pool: &DbPool,
    actor: &Actor,
    vote_id: i64,
    text: &str,
    image_url: Option<&str>,
) -> Result<VoteOptionRow, CoreError> {
    require_role(actor, Role::Moderator)?;
    if text.trim().is_empty() {
        return Err(CoreError::BadRequest("option text is required".into()));
    }
    fraghub_db::votes::get_vote(pool, vote_id)
        .await?
        .ok_or(CoreError::NotFound)?;
    Ok(fraghub_db::votes::create_option(pool, vote_id, text.trim(), image_url).await?)
}

/// Fetch an option and make sure it belongs to `vote_id`.
async fn option_of_vote(pool: &DbPool, vote_id: i64, option_id: i64) -> Result<VoteOptionRow, CoreError> {
    fraghub_db::votes::get_option(pool, option_id)
        .await?
        .filter(|option| option.vote_id == vote_id)
        .ok_or(CoreError::NotFound)
}

pub async fn update_option(
    pool: &DbPool,
    actor: &Actor,
    vote_id: i64,
    option_id: i64,
    text: &str,
    image_url: Option<&str>,
) -> Result<VoteOptionRow, CoreError> {
    require_role(actor, Role::Moderator)?;
    if text.trim().is_empty() {
        return Err(CoreError::BadRequest("option text is required".into()));
    }
    option_of_vote(pool, vote_id, option_id).await?;
    Ok(fraghub_db::votes::update_option(pool, option_id, text.trim(), image_url).await?)
}

pub async fn delete_option(
    pool: &DbPool,
    actor: &Actor,
    vote_id: i64,
    option_id: i64,
) -> Result<(), CoreError> {
    require_role(actor, Role::Moderator)?;
    option_of_vote(pool, vote_id, option_id).await?;
    // Ballots are never discarded; an option that has been picked stays.
    if !fraghub_db::votes::delete_option(pool, option_id).await? {
        return Err(CoreError::Conflict("option already has ballots".into()));
    }
    Ok(())
}
