use crate::error::CoreError;
use crate::permissions::{require_owner_or_role, require_role, Actor};
use fraghub_db::forum::{MessageRow, TopicRow};
use fraghub_db::DbPool;
use fraghub_models::role::Role;

pub const MAX_TITLE_LEN: usize = 200;

#[derive(Debug, Clone)]
pub struct TopicDetail {
    pub topic: TopicRow,
    pub messages: Vec<MessageRow>,
}

fn validate_topic(title: &str, content: &str) -> Result<(), CoreError> {
    let title_len = title.trim().chars().count();
    if title_len == 0 || title_len > MAX_TITLE_LEN {
        return Err(CoreError::BadRequest(format!(
            "title must be 1-{MAX_TITLE_LEN} characters"
        )));
    }
    if content.trim().is_empty() {
        return Err(CoreError::BadRequest("content is required".into()));
    }
    Ok(())
}

fn validate_message(text: &str) -> Result<(), CoreError> {
    if text.trim().is_empty() {
        return Err(CoreError::BadRequest("message text is required".into()));
    }
    Ok(())
}

async fn load_topic(pool: &DbPool, topic_id: i64) -> Result<TopicRow, CoreError> {
    fraghub_db::forum::get_topic(pool, topic_id)
        .await?
        .ok_or(CoreError::NotFound)
}

async fn ensure_category(pool: &DbPool, category_id: i64) -> Result<(), CoreError> {
    fraghub_db::forum::get_category(pool, category_id)
        .await?
        .ok_or(CoreError::NotFound)?;
    Ok(())
}

pub async fn get_topic_detail(pool: &DbPool, topic_id: i64) -> Result<TopicDetail, CoreError> {
    let topic = load_topic(pool, topic_id).await?;
    Ok(TopicDetail {
        messages: fraghub_db::forum::list_messages(pool, topic_id).await?,
        topic,
    })
}

pub async fn create_topic(
    pool: &DbPool,
    actor: &Actor,
    category_id: i64,
    title: &str,
    content: &str,
) -> Result<TopicRow, CoreError> {
    validate_topic(title, content)?;
    ensure_category(pool, category_id).await?;
    let topic =
        fraghub_db::forum::create_topic(pool, category_id, actor.user_id, title.trim(), content.trim()).await?;
    tracing::info!(topic_id = topic.id, author = actor.user_id, "topic created");
    Ok(topic)
}

pub async fn update_topic(
    pool: &DbPool,
    actor: &Actor,
    topic_id: i64,
    category_id: i64,
    title: &str,
    content: &str,
) -> Result<TopicRow, CoreError> {
    let topic = load_topic(pool, topic_id).await?;
    require_owner_or_role(actor, topic.created_by, Role::Moderator)?;
    validate_topic(title, content)?;
    ensure_category(pool, category_id).await?;
    Ok(fraghub_db::forum::update_topic(pool, topic_id, category_id, title.trim(), content.trim()).await?)
}

pub async fn delete_topic(pool: &DbPool, actor: &Actor, topic_id: i64) -> Result<(), CoreError> {
    let topic = load_topic(pool, topic_id).await?;
    require_owner_or_role(actor, topic.created_by, Role::Moderator)?;
    fraghub_db::forum::delete_topic(pool, topic_id).await?;
    Ok(())
}

pub async fn toggle_pin(pool: &DbPool, actor: &Actor, topic_id: i64) -> Result<bool, CoreError> {
    require_role(actor, Role::Moderator)?;
    Ok(fraghub_db::forum::toggle_topic_pin(pool, topic_id).await?)
}

pub async fn toggle_closed(pool: &DbPool, actor: &Actor, topic_id: i64) -> Result<bool, CoreError> {
    require_role(actor, Role::Moderator)?;
    let closed = fraghub_db::forum::toggle_topic_closed(pool, topic_id).await?;
    tracing::info!(topic_id, closed, by = actor.user_id, "topic close toggled");
    Ok(closed)
}

/// Reply to a topic. Closed topics only accept replies from moderators.
pub async fn post_message(
    pool: &DbPool,
    actor: &Actor,
    topic_id: i64,
    text: &str,
) -> Result<MessageRow, CoreError> {
    validate_message(text)?;
    let topic = load_topic(pool, topic_id).await?;
    if topic.is_closed && !actor.is_moderator() {
        return Err(CoreError::Forbidden);
    }
    Ok(fraghub_db::forum::create_message(pool, topic_id, actor.user_id, text.trim()).await?)
}

async fn load_message(pool: &DbPool, message_id: i64) -> Result<MessageRow, CoreError> {
    fraghub_db::forum::get_message(pool, message_id)
        .await?
        .ok_or(CoreError::NotFound)
}

pub async fn update_message(
    pool: &DbPool,
    actor: &Actor,
    message_id: i64,
    text: &str,
) -> Result<MessageRow, CoreError> {
    let message = load_message(pool, message_id).await?;
    require_owner_or_role(actor, message.author_id, Role::Moderator)?;
    validate_message(text)?;
    Ok(fraghub_db::forum::update_message(pool, message_id, text.trim()).await?)
}

/// Returns the id of the topic the message belonged to.
pub async fn delete_message(pool: &DbPool, actor: &Actor, message_id: i64) -> Result<i64, CoreError> {
    let message = load_message(pool, message_id).await?;
    require_owner_or_role(actor, message.author_id, Role::Moderator)?;
    fraghub_db::forum::delete_message(pool, message_id).await?;
    Ok(message.topic_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{actor, test_pool};

    #[tokio::test]
    async fn closed_topic_only_accepts_moderators() {
        let pool = test_pool().await;
        let author = actor(&pool, "author", Role::User).await;
        let moderator = actor(&pool, "mod", Role::Moderator).await;
        let topic = create_topic(&pool, &author, 1, "Ancient callouts", "share yours").await.unwrap();

        post_message(&pool, &author, topic.id, "cave, temple").await.unwrap();
        assert!(toggle_closed(&pool, &moderator, topic.id).await.unwrap());
        assert!(matches!(
            post_message(&pool, &author, topic.id, "one more").await,
            Err(CoreError::Forbidden)
        ));
        post_message(&pool, &moderator, topic.id, "locked, see rules").await.unwrap();

        let detail = get_topic_detail(&pool, topic.id).await.unwrap();
        assert_eq!(detail.messages.len(), 2);
        assert_eq!(detail.messages[0].text, "cave, temple");
    }

    #[tokio::test]
    async fn unknown_category_is_not_found() {
        let pool = test_pool().await;
        let author = actor(&pool, "author", Role::User).await;
        assert!(matches!(
            create_topic(&pool, &author, 99, "title", "body").await,
            Err(CoreError::NotFound)
        ));
        assert!(matches!(
            create_topic(&pool, &author, 1, "  ", "body").await,
            Err(CoreError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn ownership_rules_for_topics_and_messages() {
        let pool = test_pool().await;
        let author = actor(&pool, "author", Role::User).await;
        let other = actor(&pool, "other", Role::User).await;
        let moderator = actor(&pool, "mod", Role::Moderator).await;
        let topic = create_topic(&pool, &author, 2, "Patch notes", "discuss").await.unwrap();
        let reply = post_message(&pool, &other, topic.id, "nerf awp").await.unwrap();

        assert!(matches!(
            update_topic(&pool, &other, topic.id, 2, "mine", "x").await,
            Err(CoreError::Forbidden)
        ));
        assert!(matches!(toggle_pin(&pool, &author, topic.id).await, Err(CoreError::Forbidden)));
        update_message(&pool, &other, reply.id, "buff awp").await.unwrap();
        assert_eq!(delete_message(&pool, &moderator, reply.id).await.unwrap(), topic.id);
        delete_topic(&pool, &author, topic.id).await.unwrap();
    }
}
