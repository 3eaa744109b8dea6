use crate::common::{TestApp, open_competition_body, routes};
use serde_json::json;

mod competition_crud {
    use super::*;

    #[tokio::test]
    async fn admin_creates_competition_with_defaults() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("a1", "admin").await;

        let res = app
            .post_with_token(routes::COMPETITIONS, &open_competition_body("Spring Cup"), &admin)
            .await;

        assert_eq!(res.status, 201, "{}", res.text);
        assert_eq!(res.body["title"], "Spring Cup");
        assert_eq!(res.body["is_active"], true);
        assert_eq!(res.body["mode"], "online");
        assert_eq!(res.body["level"], "level1");
        assert_eq!(res.body["created_by"], "a1");
    }

    #[tokio::test]
    async fn participant_cannot_create() {
        let app = TestApp::spawn().await;
        let token = app.token_for("p1");

        let res = app
            .post_with_token(routes::COMPETITIONS, &open_competition_body("Nope"), &token)
            .await;
        assert_eq!(res.status, 403);
        assert_eq!(res.body["code"], "PERMISSION_DENIED");
    }

    #[tokio::test]
    async fn offline_competition_requires_venue() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("a1", "admin").await;

        let mut body = open_competition_body("Offline");
        body["mode"] = json!("offline");
        let res = app.post_with_token(routes::COMPETITIONS, &body, &admin).await;
        assert_eq!(res.status, 400);

        body["venue"] = json!("Main Hall");
        let res = app.post_with_token(routes::COMPETITIONS, &body, &admin).await;
        assert_eq!(res.status, 201, "{}", res.text);
    }

    #[tokio::test]
    async fn patch_checks_deadlines_against_stored_values() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("a1", "admin").await;
        let id = app.create_open_competition(&admin, "Cup").await;

        let res = app
            .patch_with_token(
                &routes::competition(id),
                &json!({ "end_deadline": "2000-01-01T00:00:00Z" }),
                &admin,
            )
            .await;
        assert_eq!(res.status, 400);

        let res = app
            .patch_with_token(&routes::competition(id), &json!({ "is_featured": true }), &admin)
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["is_featured"], true);
        assert_eq!(res.body["title"], "Cup");
    }

    #[tokio::test]
    async fn inactive_competition_is_hidden_from_participants() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("a1", "admin").await;
        let mut body = open_competition_body("Hidden");
        body["is_active"] = json!(false);
        let id = app.create_competition(&admin, body).await;
        let visible = app.create_open_competition(&admin, "Visible").await;

        let token = app.token_for("p1");
        let res = app.get_with_token(&routes::competition(id), &token).await;
        assert_eq!(res.status, 404);

        let res = app.get_with_token(routes::COMPETITIONS, &token).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["pagination"]["total"], 1);
        assert_eq!(res.body["data"][0]["id"], visible);

        let res = app.get_with_token(routes::COMPETITIONS, &admin).await;
        assert_eq!(res.body["pagination"]["total"], 2);
    }

    #[tokio::test]
    async fn huge_page_number_returns_empty_page() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("a1", "admin").await;
        app.create_open_competition(&admin, "Cup").await;

        let path = format!("{}?page={}&per_page=100", routes::COMPETITIONS, u64::MAX);
        let res = app.get_with_token(&path, &admin).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["data"], json!([]));
        assert_eq!(res.body["pagination"]["total"], 1);
    }

    #[tokio::test]
    async fn delete_cascades_to_everything() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("a1", "admin").await;
        let id = app.create_open_competition(&admin, "Doomed").await;
        let ch = app.create_challenge(id, &admin, "Task").await;
        let p1 = app.token_for("p1");
        app.register(id, &p1).await;
        let res = app.submit(id, ch, &p1, "my prompt").await;
        assert_eq!(res.status, 200, "{}", res.text);

        let res = app.delete_with_token(&routes::competition(id), &admin).await;
        assert_eq!(res.status, 204);

        let res = app.get_with_token(&routes::competition(id), &admin).await;
        assert_eq!(res.status, 404);
    }
}

mod challenges {
    use super::*;

    #[tokio::test]
    async fn statements_hidden_until_start() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("a1", "admin").await;
        let id = app
            .create_competition(
                &admin,
                json!({
                    "title": "Future",
                    "description": "Later",
                    "start_deadline": "2098-01-01T00:00:00Z",
                    "end_deadline": "2099-01-01T00:00:00Z",
                }),
            )
            .await;
        let ch = app.create_challenge(id, &admin, "Secret").await;

        let token = app.token_for("p1");
        let res = app.get_with_token(&routes::challenges(id), &token).await;
        assert_eq!(res.status, 400);

        app.register(id, &token).await;
        let res = app
            .get_with_token(&routes::my_submission(id, ch), &token)
            .await;
        assert_eq!(res.status, 400, "{}", res.text);
        assert!(res.body.get("problem_statement").is_none());

        let res = app.get_with_token(&routes::challenges(id), &admin).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn challenge_from_other_competition_is_not_found() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("a1", "admin").await;
        let a = app.create_open_competition(&admin, "A").await;
        let b = app.create_open_competition(&admin, "B").await;
        let ch = app.create_challenge(a, &admin, "Task").await;

        let res = app.get_with_token(&routes::challenge(b, ch), &admin).await;
        assert_eq!(res.status, 404);
    }
}

mod participants {
    use super::*;

    #[tokio::test]
    async fn register_twice_conflicts() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("a1", "admin").await;
        let id = app.create_open_competition(&admin, "Cup").await;
        let p1 = app.token_for("p1");

        app.register(id, &p1).await;
        let res = app
            .post_with_token(&routes::register(id), &json!({}), &p1)
            .await;
        assert_eq!(res.status, 409);
    }

    #[tokio::test]
    async fn listing_requires_view_all() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("a1", "admin").await;
        let id = app.create_open_competition(&admin, "Cup").await;
        let p1 = app.token_for("p1");
        app.register(id, &p1).await;

        let res = app.get_with_token(&routes::participants(id), &p1).await;
        assert_eq!(res.status, 403);

        let res = app.get_with_token(&routes::participants(id), &admin).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body[0]["user_id"], "p1");
        assert_eq!(res.body[0]["completed_challenges"], 0);
    }

    #[tokio::test]
    async fn dashboard_reflects_registration() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("a1", "admin").await;
        let id = app.create_open_competition(&admin, "Cup").await;
        app.create_challenge(id, &admin, "Task").await;
        let p1 = app.token_for("p1");

        let res = app.get_with_token(&routes::dashboard(id), &p1).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["dashboard"]["state"], "not_participant");
        assert_eq!(res.body["challenges"], json!([]));

        app.register(id, &p1).await;
        let res = app.get_with_token(&routes::dashboard(id), &p1).await;
        assert_eq!(res.body["dashboard"]["state"], "active");
        assert_eq!(res.body["challenges"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn level2_participant_without_batch_sees_no_batch() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("a1", "admin").await;
        let mut body = open_competition_body("Finals");
        body["level"] = json!("level2");
        let id = app.create_competition(&admin, body).await;
        let ch = app.create_challenge(id, &admin, "Task").await;
        let p1 = app.token_for("p1");
        app.register(id, &p1).await;

        let res = app.get_with_token(&routes::dashboard(id), &p1).await;
        assert_eq!(res.body["dashboard"]["state"], "no_batch");

        let res = app.submit(id, ch, &p1, "prompt").await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["message"], "No batch assigned");

        let start = chrono::Utc::now() - chrono::Duration::hours(1);
        let res = app
            .post_with_token(
                &routes::batches(id),
                &json!({
                    "name": "Morning",
                    "start_time": start.to_rfc3339(),
                    "end_time": "2098-01-01T00:00:00Z",
                }),
                &admin,
            )
            .await;
        assert_eq!(res.status, 201, "{}", res.text);
        let batch_id = res.id();

        let res = app
            .put_with_token(
                &routes::batch_participants(id, batch_id),
                &json!({ "user_ids": ["p1"] }),
                &admin,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        let res = app.get_with_token(&routes::dashboard(id), &p1).await;
        assert_eq!(res.body["dashboard"]["state"], "active");
        let res = app.submit(id, ch, &p1, "prompt").await;
        assert_eq!(res.status, 200, "{}", res.text);

        let res = app.get_with_token(&routes::batch(id, batch_id), &p1).await;
        assert_eq!(res.status, 200);
    }

    #[tokio::test]
    async fn batch_outside_competition_deadlines_is_rejected() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("a1", "admin").await;
        let mut body = open_competition_body("Finals");
        body["level"] = json!("level2");
        let id = app.create_competition(&admin, body).await;
        let before = chrono::Utc::now() - chrono::Duration::days(3);

        for (start, end) in [
            (before.to_rfc3339(), "2098-01-01T00:00:00Z".to_string()),
            ("2098-01-01T00:00:00Z".to_string(), "2100-01-01T00:00:00Z".to_string()),
            ("2099-06-01T00:00:00Z".to_string(), "2099-07-01T00:00:00Z".to_string()),
        ] {
            let res = app
                .post_with_token(
                    &routes::batches(id),
                    &json!({ "name": "Late", "start_time": start, "end_time": end }),
                    &admin,
                )
                .await;
            assert_eq!(res.status, 400, "{}", res.text);
        }

        let res = app.get_with_token(&routes::batches(id), &admin).await;
        assert_eq!(res.body, json!([]));
    }

    #[tokio::test]
    async fn batch_assignment_rejects_unregistered_users() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("a1", "admin").await;
        let mut body = open_competition_body("Finals");
        body["level"] = json!("level2");
        let id = app.create_competition(&admin, body).await;

        let res = app
            .post_with_token(
                &routes::batches(id),
                &json!({
                    "name": "Evening",
                    "start_time": "2098-01-01T00:00:00Z",
                    "end_time": "2098-01-02T00:00:00Z",
                }),
                &admin,
            )
            .await;
        let batch_id = res.id();

        let res = app
            .put_with_token(
                &routes::batch_participants(id, batch_id),
                &json!({ "user_ids": ["ghost"] }),
                &admin,
            )
            .await;
        assert_eq!(res.status, 400);

        let res = app
            .put_with_token(
                &routes::batch_participants(id, batch_id),
                &json!({ "user_ids": ["x", "x"] }),
                &admin,
            )
            .await;
        assert_eq!(res.status, 400);
    }
}
