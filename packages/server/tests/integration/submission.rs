use crate::common::{TestApp, routes};
use serde_json::json;

async fn setup(app: &TestApp) -> (String, i32, i32) {
    let admin = app.create_user_with_role("a1", "admin").await;
    let id = app.create_open_competition(&admin, "Prompt Cup").await;
    let ch = app.create_challenge(id, &admin, "Summarize").await;
    (admin, id, ch)
}

mod submit {
    use super::*;

    #[tokio::test]
    async fn registered_participant_submits() {
        let app = TestApp::spawn().await;
        let (_, id, ch) = setup(&app).await;
        let p1 = app.token_for("p1");
        app.register(id, &p1).await;

        let res = app.submit(id, ch, &p1, "You are a careful summarizer.").await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["participant_id"], "p1");
        assert_eq!(res.body["challenge_id"], ch);
        assert_eq!(res.body["status"], "Submitted");
        assert_eq!(res.body["prompt_text"], "You are a careful summarizer.");
    }

    #[tokio::test]
    async fn unregistered_user_is_forbidden() {
        let app = TestApp::spawn().await;
        let (_, id, ch) = setup(&app).await;
        let p1 = app.token_for("p1");

        let res = app.submit(id, ch, &p1, "prompt").await;
        assert_eq!(res.status, 403);
    }

    #[tokio::test]
    async fn empty_prompt_is_rejected() {
        let app = TestApp::spawn().await;
        let (_, id, ch) = setup(&app).await;
        let p1 = app.token_for("p1");
        app.register(id, &p1).await;

        let res = app.submit(id, ch, &p1, "   ").await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn resubmission_overwrites_single_row() {
        let app = TestApp::spawn().await;
        let (admin, id, ch) = setup(&app).await;
        let p1 = app.token_for("p1");
        app.register(id, &p1).await;

        app.submit(id, ch, &p1, "first").await;
        let res = app.submit(id, ch, &p1, "second").await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["prompt_text"], "second");

        let res = app.get_with_token(&routes::participants(id), &admin).await;
        assert_eq!(res.body[0]["completed_challenges"], 1);

        let res = app.get_with_token(&routes::my_submission(id, ch), &p1).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["submission"]["prompt_text"], "second");
    }

    #[tokio::test]
    async fn resubmission_clears_previous_judge_score() {
        let app = TestApp::spawn().await;
        let (admin, id, ch) = setup(&app).await;
        let p1 = app.token_for("p1");
        app.register(id, &p1).await;
        app.submit(id, ch, &p1, "first").await;

        let res = app.score(id, "p1", ch, &admin, 7, false).await;
        assert_eq!(res.status, 200, "{}", res.text);

        let res = app.submit(id, ch, &p1, "second").await;
        assert_eq!(res.body["status"], "Submitted");

        let res = app.get_with_token(&routes::judge_sheet(id, "p1"), &admin).await;
        assert_eq!(res.body["remaining"], 1);
        assert!(res.body["submissions"][0]["judge_score"].is_null());
    }

    #[tokio::test]
    async fn ended_competition_refuses() {
        let app = TestApp::spawn().await;
        let (admin, id, ch) = setup(&app).await;
        let p1 = app.token_for("p1");
        app.register(id, &p1).await;

        let ended = chrono::Utc::now() - chrono::Duration::hours(1);
        let res = app
            .patch_with_token(
                &routes::competition(id),
                &json!({ "end_deadline": ended.to_rfc3339() }),
                &admin,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        let res = app.submit(id, ch, &p1, "too late").await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["message"], "Competition has ended");
    }

    #[tokio::test]
    async fn ended_and_deactivated_competition_reports_ended() {
        let app = TestApp::spawn().await;
        let (admin, id, ch) = setup(&app).await;
        let p1 = app.token_for("p1");
        app.register(id, &p1).await;

        let ended = chrono::Utc::now() - chrono::Duration::hours(1);
        let res = app
            .patch_with_token(
                &routes::competition(id),
                &json!({ "is_active": false, "end_deadline": ended.to_rfc3339() }),
                &admin,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        let res = app.submit(id, ch, &p1, "too late").await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["message"], "Competition has ended");
    }

    #[tokio::test]
    async fn locked_competition_refuses() {
        let app = TestApp::spawn().await;
        let (admin, id, ch) = setup(&app).await;
        let p1 = app.token_for("p1");
        app.register(id, &p1).await;

        app.patch_with_token(&routes::competition(id), &json!({ "is_locked": true }), &admin)
            .await;

        let res = app.submit(id, ch, &p1, "prompt").await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["message"], "Competition is locked");
    }

    #[tokio::test]
    async fn challenge_past_deadline_refuses() {
        let app = TestApp::spawn().await;
        let (admin, id, ch) = setup(&app).await;
        let p1 = app.token_for("p1");
        app.register(id, &p1).await;

        let past = chrono::Utc::now() - chrono::Duration::minutes(5);
        let res = app
            .patch_with_token(
                &routes::challenge(id, ch),
                &json!({ "end_deadline": past.to_rfc3339() }),
                &admin,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        let res = app.submit(id, ch, &p1, "prompt").await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["message"], "Challenge deadline has passed");
    }
}

mod my_submission {
    use super::*;

    #[tokio::test]
    async fn reports_open_gate_before_first_submission() {
        let app = TestApp::spawn().await;
        let (_, id, ch) = setup(&app).await;
        let p1 = app.token_for("p1");
        app.register(id, &p1).await;

        let res = app.get_with_token(&routes::my_submission(id, ch), &p1).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert!(res.body["submission"].is_null());
        assert_eq!(res.body["can_submit"], true);
        assert_eq!(res.body["phase"], "open");
        assert!(res.body["closed_reason"].is_null());
        assert_eq!(res.body["challenge"]["title"], "Summarize");
    }

    #[tokio::test]
    async fn explains_why_submission_is_closed() {
        let app = TestApp::spawn().await;
        let (admin, id, ch) = setup(&app).await;
        let p1 = app.token_for("p1");
        app.register(id, &p1).await;
        app.patch_with_token(&routes::competition(id), &json!({ "is_locked": true }), &admin)
            .await;

        let res = app.get_with_token(&routes::my_submission(id, ch), &p1).await;
        assert_eq!(res.body["can_submit"], false);
        assert_eq!(res.body["closed_reason"], "Competition is locked");
    }

    #[tokio::test]
    async fn outsiders_are_forbidden() {
        let app = TestApp::spawn().await;
        let (_, id, ch) = setup(&app).await;
        let stranger = app.token_for("stranger");

        let res = app
            .get_with_token(&routes::my_submission(id, ch), &stranger)
            .await;
        assert_eq!(res.status, 403);
    }
}

mod dashboard {
    use super::*;

    #[tokio::test]
    async fn challenge_tiles_carry_submission_badges() {
        let app = TestApp::spawn().await;
        let (admin, id, ch) = setup(&app).await;
        let other = app.create_challenge(id, &admin, "Translate").await;
        let p1 = app.token_for("p1");
        app.register(id, &p1).await;
        app.submit(id, ch, &p1, "prompt").await;

        let res = app.get_with_token(&routes::dashboard(id), &p1).await;
        assert_eq!(res.status, 200, "{}", res.text);
        let tiles = res.body["challenges"].as_array().unwrap();
        let tile = |cid: i32| tiles.iter().find(|t| t["id"] == cid).unwrap();
        assert_eq!(tile(ch)["submitted"], true);
        assert_eq!(tile(ch)["status"], "Submitted");
        assert_eq!(tile(other)["submitted"], false);
        assert!(tile(other)["status"].is_null());
        assert!(res.body["refresh_at"].is_string());
    }

    #[tokio::test]
    async fn ended_competition_hides_tiles() {
        let app = TestApp::spawn().await;
        let (admin, id, _) = setup(&app).await;
        let p1 = app.token_for("p1");
        app.register(id, &p1).await;
        let ended = chrono::Utc::now() - chrono::Duration::hours(1);
        app.patch_with_token(
            &routes::competition(id),
            &json!({ "end_deadline": ended.to_rfc3339() }),
            &admin,
        )
        .await;

        let res = app.get_with_token(&routes::dashboard(id), &p1).await;
        assert_eq!(res.body["dashboard"]["state"], "ended");
        assert_eq!(res.body["challenges"], json!([]));
        assert!(res.body["refresh_at"].is_null());
    }

    #[tokio::test]
    async fn deactivated_competition_still_reports_ended_to_participants() {
        let app = TestApp::spawn().await;
        let (admin, id, _) = setup(&app).await;
        let p1 = app.token_for("p1");
        let outsider = app.token_for("p2");
        app.register(id, &p1).await;
        let ended = chrono::Utc::now() - chrono::Duration::hours(1);
        let res = app
            .patch_with_token(
                &routes::competition(id),
                &json!({ "is_active": false, "end_deadline": ended.to_rfc3339() }),
                &admin,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        let res = app.get_with_token(&routes::dashboard(id), &p1).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["dashboard"]["state"], "ended");
        assert_eq!(res.body["challenges"], json!([]));

        let res = app.get_with_token(&routes::dashboard(id), &outsider).await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn deactivated_running_competition_stays_hidden() {
        let app = TestApp::spawn().await;
        let (admin, id, _) = setup(&app).await;
        let p1 = app.token_for("p1");
        app.register(id, &p1).await;
        app.patch_with_token(&routes::competition(id), &json!({ "is_active": false }), &admin)
            .await;

        let res = app.get_with_token(&routes::dashboard(id), &p1).await;
        assert_eq!(res.status, 404);
    }
}
