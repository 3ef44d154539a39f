use crate::error::CoreError;
use crate::permissions::{require_role, Actor};
use chrono::{DateTime, Utc};
use fraghub_db::events::{EventFields, EventRow};
use fraghub_db::DbPool;
use fraghub_models::content::EventType;
use fraghub_models::role::Role;

#[derive(Debug, Clone)]
pub struct EventInput {
    pub title: String,
    pub description: String,
    pub event_type: EventType,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub location: String,
    pub image_url: Option<String>,
    pub is_active: bool,
}

impl EventInput {
    fn validate(&self) -> Result<(), CoreError> {
        if self.title.trim().is_empty() {
            return Err(CoreError::BadRequest("title is required".into()));
        }
        if self.ends_at.is_some_and(|end| end < self.starts_at) {
            return Err(CoreError::BadRequest("ends_at must not precede starts_at".into()));
        }
        Ok(())
    }

    fn fields(&self) -> EventFields<'_> {
        EventFields {
            title: self.title.trim(),
            description: &self.description,
            event_type: self.event_type,
            starts_at: self.starts_at,
            ends_at: self.ends_at,
            location: self.location.trim(),
            image_url: self.image_url.as_deref(),
            is_active: self.is_active,
        }
    }
}

pub async fn create_event(pool: &DbPool, actor: &Actor, input: &EventInput) -> Result<EventRow, CoreError> {
    require_role(actor, Role::Moderator)?;
    input.validate()?;
    let event = fraghub_db::events::create_event(pool, &input.fields()).await?;
    tracing::info!(event_id = event.id, by = actor.user_id, "event created");
    Ok(event)
}

pub async fn update_event(
    pool: &DbPool,
    actor: &Actor,
    event_id: i64,
    input: &EventInput,
) -> Result<EventRow, CoreError> {
    require_role(actor, Role::Moderator)?;
    input.validate()?;
    Ok(fraghub_db::events::update_event(pool, event_id, &input.fields()).await?)
}

pub async fn delete_event(pool: &DbPool, actor: &Actor, event_id: i64) -> Result<(), CoreError> {
    require_role(actor, Role::Moderator)?;
    if !fraghub_db::events::delete_event(pool, event_id).await? {
        return Err(CoreError::NotFound);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{actor, test_pool};
    use chrono::Duration;

    fn input(starts_at: DateTime<Utc>, ends_at: Option<DateTime<Utc>>) -> EventInput {
        EventInput {
            title: "Cologne Major".into(),
            description: "Playoffs".into(),
            event_type: EventType::Tournament,
            starts_at,
            ends_at,
            location: "Cologne".into(),
            image_url: None,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn moderators_manage_events() {
        let pool = test_pool().await;
        let user = actor(&pool, "user", Role::User).await;
        let moderator = actor(&pool, "mod", Role::Moderator).await;
        let start = Utc::now() + Duration::days(3);

        assert!(matches!(
            create_event(&pool, &user, &input(start, None)).await,
            Err(CoreError::Forbidden)
        ));
        let event = create_event(&pool, &moderator, &input(start, Some(start + Duration::days(4))))
            .await
            .unwrap();
        assert_eq!(event.location, "Cologne");
        delete_event(&pool, &moderator, event.id).await.unwrap();
        assert!(matches!(
            delete_event(&pool, &moderator, event.id).await,
            Err(CoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn end_before_start_is_rejected() {
        let pool = test_pool().await;
        let moderator = actor(&pool, "mod", Role::Moderator).await;
        let start = Utc::now();
        assert!(matches!(
            create_event(&pool, &moderator, &input(start, Some(start - Duration::hours(1)))).await,
            Err(CoreError::BadRequest(_))
        ));
    }
}
