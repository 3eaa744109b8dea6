use crate::common::{TestApp, TestResponse, routes};
use chrono::{Duration, Utc};
use sea_orm::EntityTrait;
use sea_orm::prelude::Expr;
use serde_json::{Value, json};
use server::entity::daily_stats;

fn open_daily_body(title: &str) -> Value {
    json!({
        "title": title,
        "problem_statement": "Write the shortest prompt that makes the model rhyme.",
        "start_time": (Utc::now() - Duration::hours(1)).to_rfc3339(),
        "end_time": (Utc::now() + Duration::hours(23)).to_rfc3339(),
    })
}

async fn create_daily(app: &TestApp, token: &str, body: Value) -> i32 {
    let res = app
        .post_with_token(routes::DAILY_CHALLENGES, &body, token)
        .await;
    assert_eq!(res.status, 201, "create_daily failed: {}", res.text);
    res.id()
}

async fn submit_daily(app: &TestApp, id: i32, token: &str, prompt: &str) -> TestResponse {
    app.put_with_token(
        &routes::daily_submission(id),
        &json!({ "prompt_text": prompt }),
        token,
    )
    .await
}

async fn stats(app: &TestApp, token: &str) -> (i64, i64) {
    let res = app.get_with_token(routes::DAILY_STATS, token).await;
    assert_eq!(res.status, 200, "{}", res.text);
    (
        res.body["total_challenges"].as_i64().unwrap(),
        res.body["total_submissions"].as_i64().unwrap(),
    )
}

/// Overwrite the counters directly to simulate drift.
async fn force_stats(app: &TestApp, challenges: i64, submissions: i64) {
    daily_stats::Entity::update_many()
        .col_expr(daily_stats::Column::TotalChallenges, Expr::value(challenges))
        .col_expr(daily_stats::Column::TotalSubmissions, Expr::value(submissions))
        .exec(&app.db)
        .await
        .unwrap();
}

mod challenges {
    use super::*;

    #[tokio::test]
    async fn create_and_delete_move_counters() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("a1", "admin").await;
        assert_eq!(stats(&app, &admin).await, (0, 0));

        let a = create_daily(&app, &admin, open_daily_body("Rhymes")).await;
        create_daily(&app, &admin, open_daily_body("Haiku")).await;
        assert_eq!(stats(&app, &admin).await, (2, 0));

        submit_daily(&app, a, &app.token_for("p1"), "rhyme please").await;
        submit_daily(&app, a, &app.token_for("p2"), "make it rhyme").await;
        assert_eq!(stats(&app, &admin).await, (2, 2));

        let res = app.delete_with_token(&routes::daily(a), &admin).await;
        assert_eq!(res.status, 204);
        assert_eq!(stats(&app, &admin).await, (1, 0));

        let res = app.get_with_token(&routes::daily(a), &admin).await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn counters_never_go_negative() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("a1", "admin").await;
        let id = create_daily(&app, &admin, open_daily_body("Rhymes")).await;
        submit_daily(&app, id, &app.token_for("p1"), "rhyme").await;

        force_stats(&app, 0, 0).await;

        let res = app.delete_with_token(&routes::daily(id), &admin).await;
        assert_eq!(res.status, 204);
        assert_eq!(stats(&app, &admin).await, (0, 0));
    }

    #[tokio::test]
    async fn inactive_challenges_hidden_from_participants() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("a1", "admin").await;
        let mut body = open_daily_body("Draft");
        body["is_active"] = json!(false);
        let hidden = create_daily(&app, &admin, body).await;
        let shown = create_daily(&app, &admin, open_daily_body("Live")).await;
        let p1 = app.token_for("p1");

        let res = app.get_with_token(&routes::daily(hidden), &p1).await;
        assert_eq!(res.status, 404);

        let res = app
            .get_with_token(&format!("{}?active=false", routes::DAILY_CHALLENGES), &p1)
            .await;
        assert_eq!(res.body["pagination"]["total"], 1);
        assert_eq!(res.body["data"][0]["id"], shown);

        let res = app.get_with_token(routes::DAILY_CHALLENGES, &admin).await;
        assert_eq!(res.body["pagination"]["total"], 2);
    }

    #[tokio::test]
    async fn participants_cannot_manage() {
        let app = TestApp::spawn().await;
        let p1 = app.token_for("p1");

        let res = app
            .post_with_token(routes::DAILY_CHALLENGES, &open_daily_body("Nope"), &p1)
            .await;
        assert_eq!(res.status, 403);
    }

    #[tokio::test]
    async fn patch_rejects_inverted_window() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("a1", "admin").await;
        let id = create_daily(&app, &admin, open_daily_body("Rhymes")).await;

        let res = app
            .patch_with_token(
                &routes::daily(id),
                &json!({ "end_time": "2000-01-01T00:00:00Z" }),
                &admin,
            )
            .await;
        assert_eq!(res.status, 400);

        let res = app
            .patch_with_token(&routes::daily(id), &json!({ "title": "Limericks" }), &admin)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["title"], "Limericks");
    }
}

mod submissions {
    use super::*;

    #[tokio::test]
    async fn resubmission_counts_once() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("a1", "admin").await;
        let id = create_daily(&app, &admin, open_daily_body("Rhymes")).await;
        let p1 = app.token_for("p1");

        let res = submit_daily(&app, id, &p1, "first").await;
        assert_eq!(res.status, 200, "{}", res.text);
        let res = submit_daily(&app, id, &p1, "second").await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["prompt_text"], "second");

        let res = app.get_with_token(&routes::daily(id), &p1).await;
        assert_eq!(res.body["total_submissions"], 1);
        assert_eq!(stats(&app, &p1).await.1, 1);
    }

    #[tokio::test]
    async fn closed_window_refuses() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("a1", "admin").await;
        let id = create_daily(
            &app,
            &admin,
            json!({
                "title": "Tomorrow",
                "problem_statement": "Later.",
                "start_time": "2098-01-01T00:00:00Z",
                "end_time": "2098-01-02T00:00:00Z",
            }),
        )
        .await;

        let res = submit_daily(&app, id, &app.token_for("p1"), "early").await;
        assert_eq!(res.status, 400);
        assert_eq!(res.body["message"], "Daily challenge is not open for submissions");
    }

    #[tokio::test]
    async fn list_orders_by_votes() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("a1", "admin").await;
        let id = create_daily(&app, &admin, open_daily_body("Rhymes")).await;
        let (p1, p2, p3) = (app.token_for("p1"), app.token_for("p2"), app.token_for("p3"));
        submit_daily(&app, id, &p1, "older").await;
        submit_daily(&app, id, &p2, "newer").await;

        app.post_with_token(&routes::daily_vote(id, "p2"), &json!({}), &p3)
            .await;

        let res = app
            .get_with_token(&routes::daily_submissions(id), &p1)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body[0]["user_id"], "p2");
        assert_eq!(res.body[0]["vote_count"], 1);
        assert_eq!(res.body[1]["user_id"], "p1");
    }
}

mod votes {
    use super::*;

    #[tokio::test]
    async fn vote_once_then_withdraw() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("a1", "admin").await;
        let id = create_daily(&app, &admin, open_daily_body("Rhymes")).await;
        submit_daily(&app, id, &app.token_for("p1"), "rhyme").await;
        let voter = app.token_for("p2");

        let res = app
            .post_with_token(&routes::daily_vote(id, "p1"), &json!({}), &voter)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["vote_count"], 1);

        let res = app
            .post_with_token(&routes::daily_vote(id, "p1"), &json!({}), &voter)
            .await;
        assert_eq!(res.status, 409);

        let res = app
            .delete_with_token(&routes::daily_vote(id, "p1"), &voter)
            .await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body["vote_count"], 0);

        let res = app
            .delete_with_token(&routes::daily_vote(id, "p1"), &voter)
            .await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn self_vote_is_rejected() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("a1", "admin").await;
        let id = create_daily(&app, &admin, open_daily_body("Rhymes")).await;
        let p1 = app.token_for("p1");
        submit_daily(&app, id, &p1, "rhyme").await;

        let res = app
            .post_with_token(&routes::daily_vote(id, "p1"), &json!({}), &p1)
            .await;
        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn vote_for_missing_submission_is_not_found() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("a1", "admin").await;
        let id = create_daily(&app, &admin, open_daily_body("Rhymes")).await;

        let res = app
            .post_with_token(
                &routes::daily_vote(id, "ghost"),
                &json!({}),
                &app.token_for("p2"),
            )
            .await;
        assert_eq!(res.status, 404);
    }
}

mod reconcile {
    use super::*;

    #[tokio::test]
    async fn reconcile_repairs_drift() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("a1", "admin").await;
        let id = create_daily(&app, &admin, open_daily_body("Rhymes")).await;
        submit_daily(&app, id, &app.token_for("p1"), "a").await;
        submit_daily(&app, id, &app.token_for("p2"), "b").await;

        force_stats(&app, 40, 7).await;
        assert_eq!(stats(&app, &admin).await, (40, 7));

        let res = app
            .post_with_token(routes::DAILY_STATS_RECONCILE, &json!({}), &admin)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["total_challenges"], 1);
        assert_eq!(res.body["total_submissions"], 2);
        assert_eq!(stats(&app, &admin).await, (1, 2));
    }

    #[tokio::test]
    async fn reconcile_runs_alongside_first_submissions() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("a1", "admin").await;
        let id = create_daily(&app, &admin, open_daily_body("Rhymes")).await;

        for i in 0..10 {
            let token = app.token_for(&format!("p{i}"));
            let empty = json!({});
            let (reconciled, submitted) = tokio::join!(
                app.post_with_token(routes::DAILY_STATS_RECONCILE, &empty, &admin),
                submit_daily(&app, id, &token, "rhyme"),
            );
            assert_eq!(reconciled.status, 200, "{}", reconciled.text);
            assert_eq!(submitted.status, 200, "{}", submitted.text);
        }

        assert_eq!(stats(&app, &admin).await, (1, 10));
        let res = app.get_with_token(&routes::daily(id), &admin).await;
        assert_eq!(res.body["total_submissions"], 10);
    }

    #[tokio::test]
    async fn reconcile_requires_daily_manage() {
        let app = TestApp::spawn().await;
        let res = app
            .post_with_token(
                routes::DAILY_STATS_RECONCILE,
                &json!({}),
                &app.token_for("p1"),
            )
            .await;
        assert_eq!(res.status, 403);
    }
}
