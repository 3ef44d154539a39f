use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use fraghub_core::{AppConfig, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn app() -> Router {
    let pool = fraghub_db::create_pool("sqlite::memory:", 1).await.unwrap();
    fraghub_db::run_migrations(&pool).await.unwrap();
    let config = AppConfig {
        jwt_secret: "integration-secret".into(),
        ..AppConfig::default()
    };
    fraghub_api::build_router().with_state(AppState::new(pool, config))
}

struct Reply {
    status: StatusCode,
    location: Option<String>,
    body: Value,
}

async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Reply {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let location = response
        .headers()
        .get(header::LOCATION)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    Reply { status, location, body }
}

/// Registers and logs in, returning the bearer token.
async fn sign_up(app: &Router, username: &str) -> String {
    let registered = send(
        app,
        Method::POST,
        "/auth/register/",
        None,
        Some(json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "dust2-long-a",
        })),
    )
    .await;
    assert_eq!(registered.status, StatusCode::CREATED);

    let login = send(
        app,
        Method::POST,
        "/auth/login/",
        None,
        Some(json!({ "username": username, "password": "dust2-long-a" })),
    )
    .await;
    assert_eq!(login.status, StatusCode::OK);
    login.body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn first_account_is_admin_and_login_rejects_bad_password() {
    let app = app().await;
    let token = sign_up(&app, "zywoo").await;

    let me = send(&app, Method::GET, "/users/me/", Some(&token), None).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["user"]["role"], "admin");

    let bad = send(
        &app,
        Method::POST,
        "/auth/login/",
        None,
        Some(json!({ "username": "zywoo", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(bad.status, StatusCode::UNAUTHORIZED);
    assert_eq!(bad.body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let app = app().await;
    let missing = send(&app, Method::GET, "/users/me/", None, None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);

    let forged = send(&app, Method::GET, "/vote/", Some("not-a-jwt"), None).await;
    assert_eq!(forged.status, StatusCode::OK);

    let forged_optional = send(&app, Method::GET, "/posts/1/", Some("not-a-jwt"), None).await;
    assert_eq!(forged_optional.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn casting_a_ballot_counts_once_and_redirects_repeat_voters() {
    let app = app().await;
    let admin = sign_up(&app, "admin").await;
    let player = sign_up(&app, "niko").await;

    let vote = send(
        &app,
        Method::POST,
        "/vote/",
        Some(&admin),
        Some(json!({ "title": "Best AWP flick", "vote_type": "highlight" })),
    )
    .await;
    assert_eq!(vote.status, StatusCode::CREATED);
    let vote_id = vote.body["id"].as_i64().unwrap();

    let mut option_ids = Vec::new();
    for text in ["Inferno banana", "Mirage window"] {
        let option = send(
            &app,
            Method::POST,
            &format!("/vote/{vote_id}/options/"),
            Some(&admin),
            Some(json!({ "text": text })),
        )
        .await;
        assert_eq!(option.status, StatusCode::CREATED);
        option_ids.push(option.body["id"].as_i64().unwrap());
    }

    let non_moderator = send(
        &app,
        Method::POST,
        "/vote/",
        Some(&player),
        Some(json!({ "title": "Nope", "vote_type": "other" })),
    )
    .await;
    assert_eq!(non_moderator.status, StatusCode::FORBIDDEN);

    let cast = send(
        &app,
        Method::POST,
        &format!("/vote/{vote_id}/cast/"),
        Some(&player),
        Some(json!({ "option": option_ids[1] })),
    )
    .await;
    assert_eq!(cast.status, StatusCode::OK);
    assert_eq!(cast.body["option_id"], option_ids[1]);

    let again = send(
        &app,
        Method::POST,
        &format!("/vote/{vote_id}/cast/"),
        Some(&player),
        Some(json!({ "option": option_ids[0] })),
    )
    .await;
    assert_eq!(again.status, StatusCode::CONFLICT);
    assert_eq!(again.body["code"], "ALREADY_VOTED");
    assert_eq!(again.body["details"]["redirect"], format!("/vote/{vote_id}/"));

    let foreign = send(
        &app,
        Method::POST,
        &format!("/vote/{vote_id}/cast/"),
        Some(&admin),
        Some(json!({ "option": 9999 })),
    )
    .await;
    assert_eq!(foreign.status, StatusCode::BAD_REQUEST);
    assert_eq!(foreign.body["code"], "INVALID_OPTION");

    let detail = send(&app, Method::GET, &format!("/vote/{vote_id}/"), Some(&player), None).await;
    assert_eq!(detail.body["has_voted"], true);
    assert_eq!(detail.body["ballot"]["option_id"], option_ids[1]);

    let results = send(&app, Method::GET, &format!("/vote/{vote_id}/results/"), None, None).await;
    assert_eq!(results.status, StatusCode::OK);
    assert_eq!(results.body["total_votes"], 1);
    assert_eq!(results.body["options"][0]["option_id"], option_ids[1]);
    assert_eq!(results.body["options"][0]["percentage"], 100.0);
    assert_eq!(results.body["options"][1]["votes"], 0);
}

#[tokio::test]
async fn multi_page_survey_walks_pages_then_locks_the_respondent_out() {
    let app = app().await;
    let admin = sign_up(&app, "admin").await;
    let player = sign_up(&app, "ropz").await;

    let survey = send(
        &app,
        Method::POST,
        "/survey/",
        Some(&admin),
        Some(json!({ "title": "Map pool", "is_multi_page": true })),
    )
    .await;
    assert_eq!(survey.status, StatusCode::CREATED);
    let survey_id = survey.body["id"].as_i64().unwrap();

    let mut answers = Vec::new();
    for (page, text) in [(1, "Best map?"), (2, "Worst map?")] {
        let question = send(
            &app,
            Method::POST,
            &format!("/survey/{survey_id}/questions/"),
            Some(&admin),
            Some(json!({ "text": text, "page": page })),
        )
        .await;
        assert_eq!(question.status, StatusCode::CREATED);
        let question_id = question.body["id"].as_i64().unwrap();
        let choice = send(
            &app,
            Method::POST,
            &format!("/survey/{survey_id}/questions/{question_id}/choices/"),
            Some(&admin),
            Some(json!({ "text": "Ancient" })),
        )
        .await;
        assert_eq!(choice.status, StatusCode::CREATED);
        answers.push((question_id, choice.body["id"].as_i64().unwrap()));
    }

    let [(q1, c1), (q2, c2)] = [answers[0], answers[1]];
    let take = send(&app, Method::GET, &format!("/survey/{survey_id}/take/"), Some(&player), None).await;
    assert_eq!(take.status, StatusCode::SEE_OTHER);
    assert_eq!(take.location.as_deref(), Some(format!("/survey/{survey_id}/page/1/").as_str()));

    let first = send(
        &app,
        Method::POST,
        &format!("/survey/{survey_id}/page/1/"),
        Some(&player),
        Some(json!({ "answers": { q1.to_string(): c1 } })),
    )
    .await;
    assert_eq!(first.status, StatusCode::SEE_OTHER);
    assert_eq!(first.location.as_deref(), Some(format!("/survey/{survey_id}/page/2/").as_str()));

    let empty = send(
        &app,
        Method::POST,
        &format!("/survey/{survey_id}/page/2/"),
        Some(&player),
        Some(json!({ "answers": {} })),
    )
    .await;
    assert_eq!(empty.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(empty.body["details"]["missing"], json!([q2]));
    assert_eq!(
        empty.body["details"]["redirect"],
        format!("/survey/{survey_id}/page/2/")
    );

    let last = send(
        &app,
        Method::POST,
        &format!("/survey/{survey_id}/page/2/"),
        Some(&player),
        Some(json!({ "answers": { q2.to_string(): c2 } })),
    )
    .await;
    assert_eq!(last.status, StatusCode::SEE_OTHER);
    let results_path = format!("/survey/{survey_id}/results/");
    assert_eq!(last.location.as_deref(), Some(results_path.as_str()));
    assert_eq!(last.body["redirect"], results_path);

    let results = send(&app, Method::GET, &results_path, None, None).await;
    assert_eq!(results.body["responses"], 1);
    assert_eq!(results.body["questions"][0]["total_votes"], 1);

    let retry = send(&app, Method::GET, &format!("/survey/{survey_id}/page/1/"), Some(&player), None).await;
    assert_eq!(retry.status, StatusCode::CONFLICT);
    assert_eq!(retry.body["code"], "ALREADY_RESPONDED");
    assert_eq!(retry.body["details"]["redirect"], results_path);
}

#[tokio::test]
async fn incomplete_single_page_survey_lists_missing_questions() {
    let app = app().await;
    let admin = sign_up(&app, "admin").await;

    let survey = send(
        &app,
        Method::POST,
        "/survey/",
        Some(&admin),
        Some(json!({ "title": "Crosshair" })),
    )
    .await;
    let survey_id = survey.body["id"].as_i64().unwrap();
    let question = send(
        &app,
        Method::POST,
        &format!("/survey/{survey_id}/questions/"),
        Some(&admin),
        Some(json!({ "text": "Dot or no dot?" })),
    )
    .await;
    let question_id = question.body["id"].as_i64().unwrap();
    send(
        &app,
        Method::POST,
        &format!("/survey/{survey_id}/questions/{question_id}/choices/"),
        Some(&admin),
        Some(json!({ "text": "Dot" })),
    )
    .await;

    let reply = send(
        &app,
        Method::POST,
        &format!("/survey/{survey_id}/take/"),
        Some(&admin),
        Some(json!({ "answers": {} })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(reply.body["code"], "INCOMPLETE_SUBMISSION");
    assert_eq!(reply.body["details"]["missing"], json!([question_id]));
    assert_eq!(
        reply.body["details"]["redirect"],
        format!("/survey/{survey_id}/take/")
    );
}

#[tokio::test]
async fn posts_feed_and_hashtags() {
    let app = app().await;
    let token = sign_up(&app, "donk").await;

    let created = send(
        &app,
        Method::POST,
        "/posts/",
        Some(&token),
        Some(json!({ "content": "1v4 on Nuke", "hashtags": "#Nuke, clutch" })),
    )
    .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let post_id = created.body["id"].as_i64().unwrap();

    let like = send(&app, Method::POST, &format!("/posts/{post_id}/like/"), Some(&token), None).await;
    assert_eq!(like.body["liked"], true);
    assert_eq!(like.body["like_count"], 1);

    let tagged = send(&app, Method::GET, "/hashtags/nuke/", None, None).await;
    assert_eq!(tagged.status, StatusCode::OK);
    assert_eq!(tagged.body["posts"][0]["id"], post_id);

    let unknown = send(&app, Method::GET, "/hashtags/overpass/", None, None).await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn status_reports_database_and_engagement() {
    let app = app().await;
    let reply = send(&app, Method::GET, "/status/", None, None).await;
    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["database_ok"], true);
    assert_eq!(reply.body["totals"]["users"], 0);
    assert!(reply.body["engagement"]["ballots_cast"].is_u64());

    let stats = send(&app, Method::GET, "/stats/", None, None).await;
    assert_eq!(stats.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn portfolio_items_wait_for_approval_and_filter_by_map() {
    let app = app().await;
    let admin = sign_up(&app, "admin").await;
    let player = sign_up(&app, "m0nesy").await;

    let created = send(
        &app,
        Method::POST,
        "/portfolio/",
        Some(&player),
        Some(json!({
            "title": "No-scope ace",
            "item_type": "highlight",
            "file_url": "https://cdn.example.com/ace.mp4",
            "player_role": "awper",
            "game_map": "de_Mirage",
        })),
    )
    .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.body["is_approved"], false);
    let item_id = created.body["id"].as_i64().unwrap();

    let hidden = send(&app, Method::GET, &format!("/portfolio/{item_id}/"), None, None).await;
    assert_eq!(hidden.status, StatusCode::NOT_FOUND);
    let own = send(&app, Method::GET, &format!("/portfolio/{item_id}/"), Some(&player), None).await;
    assert_eq!(own.body["can_edit"], true);

    let forbidden = send(&app, Method::POST, &format!("/portfolio/{item_id}/approve/"), Some(&player), None).await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);
    let approved = send(&app, Method::POST, &format!("/portfolio/{item_id}/approve/"), Some(&admin), None).await;
    assert_eq!(approved.body["is_approved"], true);

    let mirage = send(&app, Method::GET, "/portfolio/?map=mirage&role=awper", None, None).await;
    assert_eq!(mirage.body["items"][0]["id"], item_id);
    let inferno = send(&app, Method::GET, "/portfolio/?map=inferno", None, None).await;
    assert_eq!(inferno.body["items"], json!([]));
    let bad_role = send(&app, Method::GET, "/portfolio/?role=coach", None, None).await;
    assert_eq!(bad_role.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn material_download_counts_and_redirects_to_the_file() {
    let app = app().await;
    let admin = sign_up(&app, "admin").await;
    let player = sign_up(&app, "b1t").await;

    let denied = send(
        &app,
        Method::POST,
        "/materials/",
        Some(&player),
        Some(json!({ "title": "cfg", "category": "configs" })),
    )
    .await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    let created = send(
        &app,
        Method::POST,
        "/materials/",
        Some(&admin),
        Some(json!({
            "title": "Pro autoexec",
            "category": "configs",
            "file_url": "https://cdn.example.com/autoexec.cfg",
        })),
    )
    .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let material_id = created.body["id"].as_i64().unwrap();

    let download = send(&app, Method::GET, &format!("/materials/{material_id}/download/"), None, None).await;
    assert_eq!(download.status, StatusCode::SEE_OTHER);
    assert_eq!(download.location.as_deref(), Some("https://cdn.example.com/autoexec.cfg"));
    assert_eq!(download.body["downloads"], 1);

    let listing = send(&app, Method::GET, "/materials/", None, None).await;
    assert_eq!(listing.body["materials"][0]["downloads"], 1);
    assert_eq!(listing.body["categories"][0], json!({ "category": "configs", "count": 1 }));

    let popular = send(&app, Method::GET, "/materials/popular/", None, None).await;
    assert_eq!(popular.body["materials"][0]["id"], material_id);
    let guides = send(&app, Method::GET, "/materials/category/guides/", None, None).await;
    assert_eq!(guides.body["materials"], json!([]));
}

#[tokio::test]
async fn hidden_gallery_items_cannot_be_liked() {
    let app = app().await;
    let _admin = sign_up(&app, "admin").await;
    let owner = sign_up(&app, "owner").await;
    let stranger = sign_up(&app, "stranger").await;

    let created = send(
        &app,
        Method::POST,
        "/gallery/",
        Some(&owner),
        Some(json!({
            "title": "Jumpthrow",
            "media_url": "https://cdn.example.com/jump.png",
            "media_type": "screenshot",
        })),
    )
    .await;
    let item_id = created.body["id"].as_i64().unwrap();

    let like = send(&app, Method::POST, &format!("/gallery/{item_id}/like/"), Some(&stranger), None).await;
    assert_eq!(like.status, StatusCode::NOT_FOUND);
    let own = send(&app, Method::GET, &format!("/gallery/{item_id}/"), Some(&owner), None).await;
    assert_eq!(own.body["likes"], 0);
}
