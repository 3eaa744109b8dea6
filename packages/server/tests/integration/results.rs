use std::sync::atomic::Ordering;

use crate::common::{TestApp, routes};
use common::evaluator::{GENERATE_LEADERBOARD_PATH, START_EVALUATION_PATH};
use serde_json::json;

/// Open competition with one challenge answered by `p1` and `p2`.
async fn evaluated_setup(app: &TestApp) -> (String, i32, i32) {
    let admin = app.create_user_with_role("a1", "admin").await;
    let id = app.create_open_competition(&admin, "Scored Cup").await;
    let ch = app.create_challenge(id, &admin, "Classify").await;
    let prompts = [
        ("p1", "Label each review as positive or negative."),
        ("p2", "Sort these tickets by urgency."),
    ];
    for (user, prompt) in prompts {
        let token = app.token_for(user);
        app.register(id, &token).await;
        let res = app.submit(id, ch, &token, prompt).await;
        assert_eq!(res.status, 200, "{}", res.text);
    }
    (admin, id, ch)
}

mod evaluator_jobs {
    use super::*;

    #[tokio::test]
    async fn start_evaluation_forwards_to_evaluator() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("a1", "admin").await;
        let id = app.create_open_competition(&admin, "Cup").await;

        let res = app
            .post_with_token(&routes::evaluations_start(id), &json!({}), &admin)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["competition_id"], id);
        assert_eq!(res.body["evaluator"]["status"], "queued");

        let calls = app.evaluator.calls.lock().unwrap().clone();
        assert_eq!(calls, vec![(START_EVALUATION_PATH.to_string(), id)]);
    }

    #[tokio::test]
    async fn generate_leaderboard_forwards_to_evaluator() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("a1", "admin").await;
        let id = app.create_open_competition(&admin, "Cup").await;

        let res = app
            .post_with_token(&routes::leaderboard_generate(id), &json!({}), &admin)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        let calls = app.evaluator.calls.lock().unwrap().clone();
        assert_eq!(calls, vec![(GENERATE_LEADERBOARD_PATH.to_string(), id)]);
    }

    #[tokio::test]
    async fn evaluator_failure_is_bad_gateway() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("a1", "admin").await;
        let id = app.create_open_competition(&admin, "Cup").await;
        app.evaluator.fail.store(true, Ordering::Relaxed);

        let res = app
            .post_with_token(&routes::evaluations_start(id), &json!({}), &admin)
            .await;
        assert_eq!(res.status, 502);
        assert_eq!(res.body["code"], "EVALUATOR_UNAVAILABLE");
    }

    #[tokio::test]
    async fn jobs_require_permission() {
        let app = TestApp::spawn().await;
        let admin = app.create_user_with_role("a1", "admin").await;
        let id = app.create_open_competition(&admin, "Cup").await;
        let judge = app.create_user_with_role("j1", "judge").await;

        let res = app
            .post_with_token(&routes::evaluations_start(id), &json!({}), &judge)
            .await;
        assert_eq!(res.status, 403);
        assert!(app.evaluator.calls.lock().unwrap().is_empty());
    }
}

mod evaluations {
    use super::*;

    #[tokio::test]
    async fn ingest_marks_submissions_evaluated() {
        let app = TestApp::spawn().await;
        let (admin, id, ch) = evaluated_setup(&app).await;

        let res = app
            .post_with_token(
                &routes::evaluation_results(id),
                &json!({ "results": [
                    { "participant_id": "p1", "challenge_id": ch, "model": "gpt", "score": 80.0, "rationale": "clear" },
                    { "participant_id": "p1", "challenge_id": ch, "model": "claude", "score": 90.0, "rationale": "precise" },
                ]}),
                &admin,
            )
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["ingested"], 2);

        let res = app
            .get_with_token(&format!("{}?search=label", routes::evaluations(id)), &admin)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["pagination"]["total"], 1);
        let item = &res.body["data"][0];
        assert_eq!(item["participant_id"], "p1");
        assert_eq!(item["status"], "Evaluated");
        assert_eq!(item["challenge_title"], "Classify");
        assert_eq!(item["average_score"], 85.0);
        assert_eq!(item["score_cards"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn reingest_replaces_card_of_same_model() {
        let app = TestApp::spawn().await;
        let (admin, id, ch) = evaluated_setup(&app).await;
        let card = |score: f64| {
            json!({ "results": [
                { "participant_id": "p2", "challenge_id": ch, "model": "gpt", "score": score, "rationale": "" },
            ]})
        };

        app.post_with_token(&routes::evaluation_results(id), &card(40.0), &admin)
            .await;
        app.post_with_token(&routes::evaluation_results(id), &card(60.0), &admin)
            .await;

        let res = app
            .get_with_token(&routes::participant_results(id, "p2"), &admin)
            .await;
        let cards = res.body["submissions"][0]["score_cards"].as_array().unwrap();
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0]["score"], 60.0);
    }

    #[tokio::test]
    async fn ingest_rejects_unknown_submission_atomically() {
        let app = TestApp::spawn().await;
        let (admin, id, ch) = evaluated_setup(&app).await;

        let res = app
            .post_with_token(
                &routes::evaluation_results(id),
                &json!({ "results": [
                    { "participant_id": "p1", "challenge_id": ch, "model": "gpt", "score": 70.0, "rationale": "" },
                    { "participant_id": "nobody", "challenge_id": ch, "model": "gpt", "score": 70.0, "rationale": "" },
                ]}),
                &admin,
            )
            .await;
        assert_eq!(res.status, 400);

        let res = app.get_with_token(&routes::evaluations(id), &admin).await;
        for item in res.body["data"].as_array().unwrap() {
            assert_eq!(item["status"], "Submitted");
            assert!(item["average_score"].is_null());
        }
    }

    #[tokio::test]
    async fn ingest_rejects_scores_outside_range() {
        let app = TestApp::spawn().await;
        let (admin, id, ch) = evaluated_setup(&app).await;

        let res = app
            .post_with_token(
                &routes::evaluation_results(id),
                &json!({ "results": [
                    { "participant_id": "p1", "challenge_id": ch, "model": "gpt", "score": 101.0, "rationale": "" },
                ]}),
                &admin,
            )
            .await;
        assert_eq!(res.status, 400);
    }

    #[tokio::test]
    async fn browser_searches_display_names() {
        let app = TestApp::spawn().await;
        let (admin, id, _) = evaluated_setup(&app).await;
        app.put_with_token(
            routes::MY_PROFILE,
            &json!({ "display_name": "Zelda Quill" }),
            &app.token_for("p2"),
        )
        .await;

        let res = app
            .get_with_token(&format!("{}?search=quill", routes::evaluations(id)), &admin)
            .await;
        assert_eq!(res.body["pagination"]["total"], 1);
        assert_eq!(res.body["data"][0]["participant_id"], "p2");
        assert_eq!(res.body["data"][0]["display_name"], "Zelda Quill");
    }

    #[tokio::test]
    async fn browser_requires_view_all() {
        let app = TestApp::spawn().await;
        let (_, id, _) = evaluated_setup(&app).await;

        let res = app
            .get_with_token(&routes::evaluations(id), &app.token_for("p1"))
            .await;
        assert_eq!(res.status, 403);
    }
}

mod leaderboard {
    use super::*;

    #[tokio::test]
    async fn empty_until_published() {
        let app = TestApp::spawn().await;
        let (_, id, _) = evaluated_setup(&app).await;

        let res = app
            .get_with_token(&routes::leaderboard(id), &app.token_for("p1"))
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["entries"], json!([]));
    }

    #[tokio::test]
    async fn publish_replaces_entries_in_rank_order() {
        let app = TestApp::spawn().await;
        let (admin, id, _) = evaluated_setup(&app).await;

        let first = json!({ "entries": [
            { "user_id": "p1", "rank": 1, "total_score": 10.0 },
        ]});
        app.put_with_token(&routes::leaderboard(id), &first, &admin)
            .await;

        let second = json!({ "entries": [
            { "user_id": "p1", "rank": 2, "total_score": 70.5, "llm_score": 80.0, "judge_score": 6.0 },
            { "user_id": "p2", "rank": 1, "total_score": 88.0 },
        ]});
        let res = app
            .put_with_token(&routes::leaderboard(id), &second, &admin)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);

        let res = app
            .get_with_token(&routes::leaderboard(id), &app.token_for("p1"))
            .await;
        let entries = res.body["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["user_id"], "p2");
        assert_eq!(entries[1]["user_id"], "p1");
        assert_eq!(entries[1]["llm_score"], 80.0);
        assert!(entries[0]["judge_score"].is_null());
    }

    #[tokio::test]
    async fn publish_rejects_duplicates_and_bad_ranks() {
        let app = TestApp::spawn().await;
        let (admin, id, _) = evaluated_setup(&app).await;

        let dup = json!({ "entries": [
            { "user_id": "p1", "rank": 1, "total_score": 1.0 },
            { "user_id": "p1", "rank": 2, "total_score": 1.0 },
        ]});
        let res = app.put_with_token(&routes::leaderboard(id), &dup, &admin).await;
        assert_eq!(res.status, 400);

        let zero = json!({ "entries": [{ "user_id": "p1", "rank": 0, "total_score": 1.0 }]});
        let res = app.put_with_token(&routes::leaderboard(id), &zero, &admin).await;
        assert_eq!(res.status, 400);

        let res = app
            .put_with_token(
                &routes::leaderboard(id),
                &json!({ "entries": [] }),
                &app.token_for("p1"),
            )
            .await;
        assert_eq!(res.status, 403);
    }

    #[tokio::test]
    async fn publish_accepts_the_maximum_entry_count() {
        let app = TestApp::spawn().await;
        let (admin, id, _) = evaluated_setup(&app).await;

        let entries: Vec<_> = (1..=10_000)
            .map(|i| json!({ "user_id": format!("racer-{i}"), "rank": i, "total_score": 1.0 }))
            .collect();
        let res = app
            .put_with_token(&routes::leaderboard(id), &json!({ "entries": entries }), &admin)
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        let entries = res.body["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 10_000);
        assert_eq!(entries[0]["user_id"], "racer-1");
        assert_eq!(entries[9_999]["rank"], 10_000);
    }

    #[tokio::test]
    async fn participant_results_combine_scores() {
        let app = TestApp::spawn().await;
        let (admin, id, ch) = evaluated_setup(&app).await;
        app.post_with_token(
            &routes::evaluation_results(id),
            &json!({ "results": [
                { "participant_id": "p1", "challenge_id": ch, "model": "gpt", "score": 75.0, "rationale": "ok" },
            ]}),
            &admin,
        )
        .await;
        app.put_with_token(
            &routes::judge_score(id, "p1", ch),
            &json!({ "score": 9, "comment": "sharp" }),
            &admin,
        )
        .await;
        app.put_with_token(
            &routes::leaderboard(id),
            &json!({ "entries": [{ "user_id": "p1", "rank": 1, "total_score": 84.0 }]}),
            &admin,
        )
        .await;

        let res = app
            .get_with_token(&routes::participant_results(id, "p1"), &app.token_for("p2"))
            .await;
        assert_eq!(res.status, 200, "{}", res.text);
        assert_eq!(res.body["entry"]["rank"], 1);
        let detail = &res.body["submissions"][0];
        assert_eq!(detail["challenge_title"], "Classify");
        assert_eq!(detail["judge_score"], 9);
        assert_eq!(detail["judge_comment"], "sharp");
        assert_eq!(detail["status"], "Judged");
        assert_eq!(detail["score_cards"][0]["model"], "gpt");
    }
}
