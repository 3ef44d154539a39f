pub mod error;
pub mod middleware;
pub mod routes;

use axum::{
    http::{header, Method},
    routing::{get, post, put},
    Router,
};
use fraghub_core::AppState;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use routes::{
    announcements, auth, events, forum, gallery, materials, portfolio, posts, site, surveys, users, votes,
};

pub fn build_router() -> Router<AppState> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    Router::new()
        // Site
        .route("/", get(site::home))
        .route("/stats/", get(site::stats))
        .route("/status/", get(site::status))
        // Accounts
        .route("/auth/register/", post(auth::register))
        .route("/auth/login/", post(auth::login))
        .route("/users/", get(users::list_users))
        .route("/users/me/", get(users::get_me).patch(users::update_me))
        .route("/users/{user_id}/", get(users::get_profile).delete(users::delete_user))
        .route("/users/{user_id}/role/", put(users::set_role))
        .route("/users/{user_id}/posts/", get(posts::list_user_posts))
        .route("/users/{user_id}/gallery/", get(gallery::list_user_items))
        .route("/users/{user_id}/portfolio/", get(portfolio::list_user_items))
        // Votes
        .route("/vote/", get(votes::list_votes).post(votes::create_vote))
        .route("/vote/active/", get(votes::list_active))
        .route("/vote/popular/", get(votes::list_popular))
        .route("/vote/daily/", get(votes::list_daily))
        .route("/vote/weekly/", get(votes::list_weekly))
        .route("/vote/type/{vote_type}/", get(votes::list_by_type))
        .route(
            "/vote/{vote_id}/",
            get(votes::get_vote).put(votes::update_vote).delete(votes::delete_vote),
        )
        .route("/vote/{vote_id}/cast/", post(votes::cast_vote))
        .route("/vote/{vote_id}/results/", get(votes::get_results))
        .route("/vote/{vote_id}/options/", post(votes::add_option))
        .route(
            "/vote/{vote_id}/options/{option_id}/",
            put(votes::update_option).delete(votes::delete_option),
        )
        // Surveys
        .route("/survey/", get(surveys::list_surveys).post(surveys::create_survey))
        .route("/survey/active/", get(surveys::list_active))
        .route(
            "/survey/{survey_id}/",
            get(surveys::get_survey)
                .put(surveys::update_survey)
                .delete(surveys::delete_survey),
        )
        .route("/survey/{survey_id}/take/", get(surveys::get_take).post(surveys::post_take))
        .route(
            "/survey/{survey_id}/page/{page}/",
            get(surveys::get_page).post(surveys::post_page),
        )
        .route("/survey/{survey_id}/results/", get(surveys::get_results))
        .route("/survey/{survey_id}/questions/", post(surveys::add_question))
        .route(
            "/survey/{survey_id}/questions/{question_id}/",
            put(surveys::update_question).delete(surveys::delete_question),
        )
        .route(
            "/survey/{survey_id}/questions/{question_id}/choices/",
            post(surveys::add_choice),
        )
        .route(
            "/survey/{survey_id}/choices/{choice_id}/",
            put(surveys::update_choice).delete(surveys::delete_choice),
        )
        // Posts
        .route("/posts/", get(posts::list_posts).post(posts::create_post))
        .route(
            "/posts/{post_id}/",
            get(posts::get_post).put(posts::update_post).delete(posts::delete_post),
        )
        .route("/posts/{post_id}/like/", post(posts::toggle_like))
        .route("/posts/{post_id}/pin/", post(posts::toggle_pin))
        .route("/posts/{post_id}/comments/", post(posts::add_comment))
        .route(
            "/comments/{comment_id}/",
            put(posts::update_comment).delete(posts::delete_comment),
        )
        .route("/hashtags/", get(posts::list_hashtags))
        .route("/hashtags/{name}/", get(posts::list_hashtag_posts))
        // Forum
        .route("/forum/", get(forum::list_categories))
        .route("/forum/topics/", get(forum::list_topics).post(forum::create_topic))
        .route(
            "/forum/topics/{topic_id}/",
            get(forum::get_topic).put(forum::update_topic).delete(forum::delete_topic),
        )
        .route("/forum/topics/{topic_id}/pin/", post(forum::toggle_pin))
        .route("/forum/topics/{topic_id}/close/", post(forum::toggle_closed))
        .route("/forum/topics/{topic_id}/messages/", post(forum::post_message))
        .route(
            "/forum/messages/{message_id}/",
            put(forum::update_message).delete(forum::delete_message),
        )
        // Gallery
        .route("/gallery/", get(gallery::list_items).post(gallery::create_item))
        .route("/gallery/popular/", get(gallery::list_popular))
        .route("/gallery/moderation/", get(gallery::moderation_queue))
        .route(
            "/gallery/{item_id}/",
            get(gallery::get_item).put(gallery::update_item).delete(gallery::delete_item),
        )
        .route("/gallery/{item_id}/like/", post(gallery::like_item))
        .route("/gallery/{item_id}/approve/", post(gallery::approve_item))
        .route("/gallery/{item_id}/reject/", post(gallery::reject_item))
        // Portfolio
        .route("/portfolio/", get(portfolio::list_items).post(portfolio::create_item))
        .route("/portfolio/moderation/", get(portfolio::moderation_queue))
        .route(
            "/portfolio/{item_id}/",
            get(portfolio::get_item)
                .put(portfolio::update_item)
                .delete(portfolio::delete_item),
        )
        .route("/portfolio/{item_id}/approve/", post(portfolio::approve_item))
        .route("/portfolio/{item_id}/reject/", post(portfolio::reject_item))
        // Materials
        .route(
            "/materials/",
            get(materials::list_materials).post(materials::create_material),
        )
        .route("/materials/popular/", get(materials::list_popular))
        .route("/materials/category/{category}/", get(materials::list_by_category))
        .route(
            "/materials/{material_id}/",
            get(materials::get_material)
                .put(materials::update_material)
                .delete(materials::delete_material),
        )
        .route("/materials/{material_id}/download/", get(materials::download))
        // Events
        .route("/events/", get(events::list_events).post(events::create_event))
        .route("/events/upcoming/", get(events::list_upcoming))
        .route("/events/past/", get(events::list_past))
        .route(
            "/events/{event_id}/",
            get(events::get_event).put(events::update_event).delete(events::delete_event),
        )
        // Announcements
        .route(
            "/announcements/",
            get(announcements::list_announcements).post(announcements::create_announcement),
        )
        .route(
            "/announcements/type/{announcement_type}/",
            get(announcements::list_by_type),
        )
        .route(
            "/announcements/{announcement_id}/",
            get(announcements::get_announcement)
                .put(announcements::update_announcement)
                .delete(announcements::delete_announcement),
        )
        .route(
            "/announcements/{announcement_id}/pin/",
            post(announcements::toggle_pin),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}
