use crate::error::CoreError;
use crate::permissions::{require_owner_or_role, require_role, Actor};
use fraghub_db::posts::{CommentRow, PostRow};
use fraghub_db::DbPool;
use fraghub_models::content::PostMediaType;
use fraghub_models::role::Role;

pub const MAX_POST_LEN: usize = 280;
pub const MAX_COMMENT_LEN: usize = 500;

/// Split a comma-separated hashtag field into normalised names.
///
/// Names are trimmed, stripped of leading `#`, lower-cased and deduplicated in
/// order of first appearance; empty entries are dropped.
pub fn parse_hashtags(raw: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for part in raw.split(',') {
        let name = part.trim().trim_start_matches('#').trim().to_lowercase();
        if !name.is_empty() && !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

#[derive(Debug, Clone)]
pub struct PostInput {
    pub content: String,
    pub media_type: PostMediaType,
    pub media_url: Option<String>,
    /// Raw comma-separated hashtag field.
    pub hashtags: String,
}

impl PostInput {
    fn validate(&self) -> Result<(), CoreError> {
        let len = self.content.trim().chars().count();
        if len == 0 || len > MAX_POST_LEN {
            return Err(CoreError::BadRequest(format!(
                "content must be 1-{MAX_POST_LEN} characters"
            )));
        }
        if self.media_type != PostMediaType::None && self.media_url.is_none() {
            return Err(CoreError::BadRequest("media_url is required for media posts".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PostDetail {
    pub post: PostRow,
    pub hashtags: Vec<String>,
    pub comments: Vec<CommentRow>,
    pub liked: bool,
}

async fn load_post(pool: &DbPool, post_id: i64) -> Result<PostRow, CoreError> {
    fraghub_db::posts::get_post(pool, post_id)
        .await?
        .ok_or(CoreError::NotFound)
}

pub async fn get_post_detail(
    pool: &DbPool,
    post_id: i64,
    viewer: Option<i64>,
) -> Result<PostDetail, CoreError> {
    let post = load_post(pool, post_id).await?;
    let liked = match viewer {
        Some(user_id) => fraghub_db::posts::has_liked(pool, post_id, user_id).await?,
        None => false,
    };
    Ok(PostDetail {
        hashtags: fraghub_db::posts::get_post_hashtags(pool, post_id).await?,
        comments: fraghub_db::posts::list_comments(pool, post_id).await?,
        post,
        liked,
    })
}

pub async fn create_post(pool: &DbPool, actor: &Actor, input: &PostInput) -> Result<PostRow, CoreError> {
    input.validate()?;
    let post = fraghub_db::posts::create_post(
        pool,
        actor.user_id,
        input.content.trim(),
        input.media_type,
        input.media_url.as_deref(),
        &parse_hashtags(&input.hashtags),
    )
    .await?;
    tracing::info!(post_id = post.id, author = actor.user_id, "post created");
    Ok(post)
}

/// Replace a post's content, media and hashtags.
pub async fn update_post(
    pool: &DbPool,
    actor: &Actor,
    post_id: i64,
    input: &PostInput,
) -> Result<PostRow, CoreError> {
    let post = load_post(pool, post_id).await?;
    require_owner_or_role(actor, post.author_id, Role::Moderator)?;
    input.validate()?;
    Ok(fraghub_db::posts::update_post(
        pool,
        post_id,
        input.content.trim(),
        input.media_type,
        input.media_url.as_deref(),
        &parse_hashtags(&input.hashtags),
    )
    .await?)
}

pub async fn delete_post(pool: &DbPool, actor: &Actor, post_id: i64) -> Result<(), CoreError> {
    let post = load_post(pool, post_id).await?;
    require_owner_or_role(actor, post.author_id, Role::Moderator)?;
    fraghub_db::posts::delete_post(pool, post_id).await?;
    Ok(())
}

/// Returns `(liked, like_count)` after the toggle.
pub async fn toggle_like(pool: &DbPool, actor: &Actor, post_id: i64) -> Result<(bool, i64), CoreError> {
    load_post(pool, post_id).await?;
    let liked = fraghub_db::posts::toggle_like(pool, post_id, actor.user_id).await?;
    let post = load_post(pool, post_id).await?;
    Ok((liked, post.like_count))
}

pub async fn toggle_pin(pool: &DbPool, actor: &Actor, post_id: i64) -> Result<bool, CoreError> {
    require_role(actor, Role::Moderator)?;
    Ok(fraghub_db::posts::toggle_pin(pool, post_id).await?)
}

fn validate_comment(content: &str) -> Result<(), CoreError> {
    let len = content.trim().chars().count();
    if len == 0 || len > MAX_COMMENT_LEN {
        return Err(CoreError::BadRequest(format!(
            "comment must be 1-{MAX_COMMENT_LEN} characters"
        )));
    }
    Ok(())
}

pub async fn add_comment(
    pool: &DbPool,
    actor: &Actor,
    post_id: i64,
    content: &str,
) -> Result<CommentRow, CoreError> {
    validate_comment(content)?;
    load_post(pool, post_id).await?;
    Ok(fraghub_db::posts::create_comment(pool, post_id, actor.user_id, content.trim()).await?)
}

async fn load_comment(pool: &DbPool, comment_id: i64) -> Result<CommentRow, CoreError> {
    fraghub_db::posts::get_comment(pool, comment_id)
        .await?
        .ok_or(CoreError::NotFound)
}

pub async fn update_comment(
    pool: &DbPool,
    actor: &Actor,
    comment_id: i64,
    content: &str,
) -> Result<CommentRow, CoreError> {
    let comment = load_comment(pool, comment_id).await?;
    require_owner_or_role(actor, comment.author_id, Role::Moderator)?;
    validate_comment(content)?;
    Ok(fraghub_db::posts::update_comment(pool, comment_id, content.trim()).await?)
}

/// Returns the id of the post the comment belonged to.
pub async fn delete_comment(pool: &DbPool, actor: &Actor, comment_id: i64) -> Result<i64, CoreError> {
    let comment = load_comment(pool, comment_id).await?;
    require_owner_or_role(actor, comment.author_id, Role::Moderator)?;
    fraghub_db::posts::delete_comment(pool, comment_id).await?;
    Ok(comment.post_id)
}
