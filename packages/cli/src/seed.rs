use std::fmt;

use anyhow::{Context, bail};
use chrono::{Duration, Utc};
use clap::Args;
use common::{CompetitionLevel, CompetitionMode, Role, SubmissionStatus};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sea_orm::sea_query::OnConflict;
use sea_orm::*;
use server::entity::{challenge, competition, judge_score, participant, submission, user};
use tracing::info;

const FIRST_NAMES: &[&str] = &[
    "Ada", "Alan", "Grace", "Edsger", "Barbara", "Donald", "Frances", "Ken", "Radia", "Niklaus",
];
const LAST_NAMES: &[&str] = &[
    "Lovelace", "Turing", "Hopper", "Dijkstra", "Liskov", "Knuth", "Allen", "Thompson", "Perlman",
    "Wirth",
];
const INSTITUTIONS: &[&str] = &[
    "Northfield University",
    "Lakeside Institute of Technology",
    "Riverside College",
    "Hillcrest Academy",
];
const PROMPT_OPENERS: &[&str] = &[
    "You are a meticulous assistant.",
    "Act as a senior reviewer.",
    "Think step by step before answering.",
    "Answer concisely and cite your assumptions.",
];

const SEED_JUDGE_ID: &str = "seed-judge";

#[derive(Args, Debug)]
pub struct SeedArgs {
    #[arg(long, env = "ARENA__DATABASE__URL")]
    pub database_url: String,
    /// Title of the competition to create. Ignored with `--competition-id`.
    #[arg(long, default_value = "Seeded Prompt Competition")]
    pub competition_title: String,
    /// Add data to an existing competition instead of creating one.
    #[arg(long)]
    pub competition_id: Option<i32>,
    #[arg(long, default_value_t = 10)]
    pub participants: u32,
    #[arg(long, default_value_t = 3)]
    pub challenges: u32,
    /// RNG seed; the same seed produces the same data.
    #[arg(long)]
    pub seed: Option<u64>,
    /// Also store a random 1-10 judge score for every submission.
    #[arg(long)]
    pub with_scores: bool,
}

/// One synthetic participant and their prompts, one per challenge.
#[derive(Debug, Clone, PartialEq)]
struct SyntheticParticipant {
    user_id: String,
    display_name: String,
    institution: String,
    prompts: Vec<String>,
    scores: Vec<Option<i32>>,
}

fn pick<'a>(rng: &mut StdRng, items: &[&'a str]) -> &'a str {
    items[rng.random_range(0..items.len())]
}

fn plan(
    competition_id: i32,
    participants: u32,
    challenges: u32,
    with_scores: bool,
    rng: &mut StdRng,
) -> Vec<SyntheticParticipant> {
    (0..participants)
        .map(|i| {
            let display_name = format!(
                "{} {}",
                pick(rng, FIRST_NAMES),
                pick(rng, LAST_NAMES)
            );
            let institution = pick(rng, INSTITUTIONS).to_string();
            let prompts = (0..challenges)
                .map(|c| {
                    format!(
                        "{} Solve challenge {} and explain the result in {} sentences.",
                        pick(rng, PROMPT_OPENERS),
                        c + 1,
                        rng.random_range(2..=6)
                    )
                })
                .collect();
            let scores = (0..challenges)
                .map(|_| with_scores.then(|| rng.random_range(1..=10)))
                .collect();
            SyntheticParticipant {
                user_id: format!("seed-{competition_id}-{i:04}"),
                display_name,
                institution,
                prompts,
                scores,
            }
        })
        .collect()
}

pub struct SeedSummary {
    competition_id: i32,
    challenges: usize,
    participants: usize,
    submissions: usize,
    scores: usize,
}

impl fmt::Display for SeedSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "competition {}: {} challenges, {} participants, {} submissions, {} judge scores",
            self.competition_id, self.challenges, self.participants, self.submissions, self.scores
        )
    }
}

async fn upsert_user<C: ConnectionTrait>(
    db: &C,
    id: &str,
    display_name: &str,
    institution: Option<&str>,
    role: Role,
) -> Result<(), DbErr> {
    let now = Utc::now();
    let model = user::ActiveModel {
        id: Set(id.to_string()),
        email: Set(Some(format!("{id}@example.com"))),
        display_name: Set(display_name.to_string()),
        institution: Set(institution.map(str::to_string)),
        role: Set(role.as_str().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    };
    user::Entity::insert(model)
        .on_conflict(
            OnConflict::column(user::Column::Id)
                .update_columns([
                    user::Column::DisplayName,
                    user::Column::Institution,
                    user::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(())
}

pub async fn run(db: &DatabaseConnection, args: &SeedArgs) -> anyhow::Result<SeedSummary> {
    if args.challenges == 0 {
        bail!("--challenges must be at least 1");
    }
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let now = Utc::now();
    let txn = db.begin().await?;

    let competition = match args.competition_id {
        Some(id) => competition::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .with_context(|| format!("Competition {id} not found"))?,
        None => {
            competition::ActiveModel {
                title: Set(args.competition_title.clone()),
                description: Set("Generated by `arena seed`.".into()),
                start_deadline: Set(now - Duration::days(1)),
                end_deadline: Set(now + Duration::days(7)),
                is_active: Set(true),
                is_locked: Set(false),
                is_featured: Set(false),
                mode: Set(CompetitionMode::Online),
                venue: Set(None),
                level: Set(CompetitionLevel::Level1),
                prize_money: Set(0),
                system_prompt: Set("Score the prompt from 0 to 100.".into()),
                created_by: Set("seed".into()),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?
        }
    };
    info!(competition_id = competition.id, "Seeding competition");

    let mut challenge_ids = Vec::with_capacity(args.challenges as usize);
    for n in 1..=args.challenges {
        let model = challenge::ActiveModel {
            competition_id: Set(competition.id),
            title: Set(format!("Challenge {n}")),
            problem_statement: Set(format!("Write a prompt that solves task {n}.")),
            guidelines: Set(String::new()),
            end_deadline: Set(competition.end_deadline),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        challenge_ids.push(model.id);
    }

    if args.with_scores {
        upsert_user(&txn, SEED_JUDGE_ID, "Seed Judge", None, Role::Judge).await?;
    }

    let people = plan(
        competition.id,
        args.participants,
        args.challenges,
        args.with_scores,
        &mut rng,
    );
    let mut submissions = 0usize;
    let mut scores = 0usize;

    for person in &people {
        upsert_user(
            &txn,
            &person.user_id,
            &person.display_name,
            Some(&person.institution),
            Role::Participant,
        )
        .await?;

        let member = participant::ActiveModel {
            competition_id: Set(competition.id),
            user_id: Set(person.user_id.clone()),
            batch_id: Set(None),
            locked: Set(false),
            locked_by: Set(None),
            locked_at: Set(None),
            completed_challenges: Set(0),
            registered_at: Set(now),
        };
        let inserted = participant::Entity::insert(member)
            .on_conflict(
                OnConflict::columns([
                    participant::Column::CompetitionId,
                    participant::Column::UserId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(&txn)
            .await;
        match inserted {
            Ok(_) | Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e.into()),
        }

        for ((challenge_id, prompt), score) in
            challenge_ids.iter().zip(&person.prompts).zip(&person.scores)
        {
            let status = if score.is_some() {
                SubmissionStatus::Judged
            } else {
                SubmissionStatus::Submitted
            };
            submission::ActiveModel {
                competition_id: Set(competition.id),
                participant_id: Set(person.user_id.clone()),
                challenge_id: Set(*challenge_id),
                prompt_text: Set(prompt.clone()),
                status: Set(status),
                submitted_at: Set(now),
            }
            .insert(&txn)
            .await?;
            submissions += 1;

            if let Some(score) = score {
                judge_score::ActiveModel {
                    competition_id: Set(competition.id),
                    participant_id: Set(person.user_id.clone()),
                    challenge_id: Set(*challenge_id),
                    judge_id: Set(SEED_JUDGE_ID.into()),
                    score: Set(*score),
                    comment: Set(String::new()),
                    updated_at: Set(now),
                }
                .insert(&txn)
                .await?;
                scores += 1;
            }
        }

        let completed = submission::Entity::find()
            .filter(submission::Column::CompetitionId.eq(competition.id))
            .filter(submission::Column::ParticipantId.eq(person.user_id.as_str()))
            .count(&txn)
            .await?;
        participant::Entity::update_many()
            .filter(participant::Column::CompetitionId.eq(competition.id))
            .filter(participant::Column::UserId.eq(person.user_id.as_str()))
            .col_expr(
                participant::Column::CompletedChallenges,
                sea_orm::prelude::Expr::value(i32::try_from(completed).unwrap_or(i32::MAX)),
            )
            .exec(&txn)
            .await?;
    }

    txn.commit().await?;

    Ok(SeedSummary {
        competition_id: competition.id,
        challenges: challenge_ids.len(),
        participants: people.len(),
        submissions,
        scores,
    })
}
