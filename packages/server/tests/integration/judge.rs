use crate::common::{TestApp, TestResponse, routes};
use serde_json::json;

/// One open competition with two challenges and participant `p1` who answered both.
async fn judged_setup(app: &TestApp) -> (String, i32, [i32; 2]) {
    let admin = app.create_user_with_role("a1", "admin").await;
    let id = app.create_open_competition(&admin, "Judged Cup").await;
    let a = app.create_challenge(id, &admin, "First").await;
    let b = app.create_challenge(id, &admin, "Second").await;
    let p1 = app.token_for("p1");
    app.register(id, &p1).await;
    app.submit(id, a, &p1, "prompt a").await;
    app.submit(id, b, &p1, "prompt b").await;
    let judge = app.create_user_with_role("j1", "judge").await;
    (judge, id, [a, b])
}

async fn lock(
    app: &TestApp,
    id: i32,
    user: &str,
    token: &str,
    confirmation: &str,
) -> TestResponse {
    app.post_with_token(
        &routes::lock(id, user),
        &json!({ "confirmation": confirmation }),
        token,
    )
    .await
}

mod scoring {
    use super::*;

    #[tokio::test]
    async fn judge_scores_a_submission() {
        let app = TestApp::spawn().await;
        let (judge, id, [a, _]) = judged_setup(&app).await;

        let res = app.score(id, "p1", a, &judge, 8, false).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["score"], 8);
        assert_eq!(res.body["judge_id"], "j1");

        let res = app.get_with_token(&routes::judge_sheet(id, "p1"), &judge).await;
        assert_eq!(res.body["remaining"], 1);
        let first = &res.body["submissions"][0];
        assert_eq!(first["challenge_id"], a);
        assert_eq!(first["status"], "Judged");
        assert_eq!(first["judge_score"]["score"], 8);
    }

    #[tokio::test]
    async fn out_of_range_scores_are_rejected() {
        let app = TestApp::spawn().await;
        let (judge, id, [a, _]) = judged_setup(&app).await;

        for bad in [0, 11, -3] {
            let res = app.score(id, "p1", a, &judge, bad, false).await;
            assert_eq!(res.status, 400, "score {bad} accepted");
        }
    }

    #[tokio::test]
    async fn participants_cannot_score() {
        let app = TestApp::spawn().await;
        let (_, id, [a, _]) = judged_setup(&app).await;
        let p1 = app.token_for("p1");

        let res = app.score(id, "p1", a, &p1, 10, false).await;
        assert_eq!(res.status, 403);
    }

    #[tokio::test]
    async fn missing_submission_is_not_found() {
        let app = TestApp::spawn().await;
        let (judge, id, [a, _]) = judged_setup(&app).await;
        app.register(id, &app.token_for("p2")).await;

        let res = app.score(id, "p2", a, &judge, 5, false).await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn overwrite_needs_confirmation() {
        let app = TestApp::spawn().await;
        let (judge, id, [a, _]) = judged_setup(&app).await;
        app.score(id, "p1", a, &judge, 6, false).await;

        let res = app.score(id, "p1", a, &judge, 9, false).await;
        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "CONFIRMATION_REQUIRED");
        assert_eq!(res.body["existing_score"], 6);

        let res = app.score(id, "p1", a, &judge, 9, true).await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["score"], 9);
    }

    #[tokio::test]
    async fn participant_list_counts_progress() {
        let app = TestApp::spawn().await;
        let (judge, id, [a, _]) = judged_setup(&app).await;
        app.score(id, "p1", a, &judge, 4, false).await;

        let res = app
            .get_with_token(&routes::judge_participants(id), &judge)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        let row = &res.body[0];
        assert_eq!(row["user_id"], "p1");
        assert_eq!(row["total_submissions"], 2);
        assert_eq!(row["scored_submissions"], 1);
        assert_eq!(row["locked"], false);
    }
}

mod locking {
    use super::*;

    #[tokio::test]
    async fn confirmation_must_be_exact() {
        let app = TestApp::spawn().await;
        let (judge, id, _) = judged_setup(&app).await;

        for phrase in ["", "sure", "SURE ", "yes"] {
            let res = lock(&app, id, "p1", &judge, phrase).await;
            assert_eq!(res.status, 400, "accepted {phrase:?}");
        }
    }

    #[tokio::test]
    async fn unscored_submissions_block_lock() {
        let app = TestApp::spawn().await;
        let (judge, id, [a, _]) = judged_setup(&app).await;
        app.score(id, "p1", a, &judge, 7, false).await;

        let res = lock(&app, id, "p1", &judge, "SURE").await;
        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "UNSCORED_SUBMISSIONS");
        assert_eq!(res.body["remaining"], 1);
    }

    #[tokio::test]
    async fn lock_finalizes_and_freezes() {
        let app = TestApp::spawn().await;
        let (judge, id, [a, b]) = judged_setup(&app).await;
        app.score(id, "p1", a, &judge, 7, false).await;
        app.score(id, "p1", b, &judge, 3, false).await;

        let res = lock(&app, id, "p1", &judge, "SURE").await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["locked"], true);
        assert_eq!(res.body["locked_by"], "j1");
        assert_eq!(res.body["finalized_submissions"], 2);

        let res = app.get_with_token(&routes::judge_sheet(id, "p1"), &judge).await;
        assert_eq!(res.body["locked"], true);
        for s in res.body["submissions"].as_array().unwrap() {
            assert_eq!(s["status"], "Finalized");
        }

        let res = lock(&app, id, "p1", &judge, "SURE").await;
        assert_eq!(res.status, 409);
        assert_eq!(res.body["code"], "CONFLICT");

        let res = app.score(id, "p1", a, &judge, 10, true).await;
        assert_eq!(res.status, 409);

        let p1 = app.token_for("p1");
        let res = app.submit(id, a, &p1, "rewrite").await;
        assert_eq!(res.status, 409);
    }

    #[tokio::test]
    async fn locked_participant_cannot_be_removed() {
        let app = TestApp::spawn().await;
        let (judge, id, [a, b]) = judged_setup(&app).await;
        let admin = app.token_for("a1");
        app.score(id, "p1", a, &judge, 7, false).await;
        app.score(id, "p1", b, &judge, 7, false).await;
        lock(&app, id, "p1", &judge, "SURE").await;

        let res = app
            .delete_with_token(&routes::participant(id, "p1"), &admin)
            .await;
        assert_eq!(res.status, 409);
    }

    #[tokio::test]
    async fn unknown_participant_is_not_found() {
        let app = TestApp::spawn().await;
        let (judge, id, _) = judged_setup(&app).await;

        let res = lock(&app, id, "ghost", &judge, "SURE").await;
        assert_eq!(res.status, 404);
    }
}
