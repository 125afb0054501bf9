//! Postgres-backed stores
//!
//! Queries run through the runtime `query_as` API; rows join the owning
//! exercise and student so a loaded participation is immediately usable
//! for kind dispatch.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::constants::exercise_kinds;
use crate::error::{AppError, AppResult};
use crate::models::{
    Exercise, ExerciseResult, InitializationState, Participation, ProgrammingExercise,
    QuizExercise, QuizQuestion, QuizSubmission, User,
};

use super::{ParticipationStore, ResultStore, UserLookup};

const PARTICIPATION_SELECT: &str = r#"
    SELECT
        p.id, p.initialization_state, p.initialization_date,
        p.repository_url, p.build_plan_id,
        e.id AS exercise_id, e.course_id, e.title, e.kind,
        e.base_repository_url, e.base_build_plan_id,
        e.release_date, e.end_date, e.questions,
        u.id AS student_id, u.login AS student_login,
        u.display_name AS student_display_name, u.created_at AS student_created_at
    FROM participations p
    JOIN exercises e ON e.id = p.exercise_id
    LEFT JOIN users u ON u.id = p.student_id
"#;

/// Joined participation row
#[derive(FromRow)]
struct ParticipationRow {
    id: Uuid,
    initialization_state: Option<String>,
    initialization_date: Option<DateTime<Utc>>,
    repository_url: Option<String>,
    build_plan_id: Option<String>,
    exercise_id: Uuid,
    course_id: Uuid,
    title: String,
    kind: String,
    base_repository_url: Option<String>,
    base_build_plan_id: Option<String>,
    release_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
    questions: Option<Json<Vec<QuizQuestion>>>,
    student_id: Option<Uuid>,
    student_login: Option<String>,
    student_display_name: Option<String>,
    student_created_at: Option<DateTime<Utc>>,
}

impl ParticipationRow {
    fn into_participation(self) -> AppResult<Participation> {
        let exercise = match self.kind.as_str() {
            exercise_kinds::PROGRAMMING => Exercise::Programming(ProgrammingExercise {
                id: self.exercise_id,
                course_id: self.course_id,
                title: self.title,
                base_repository_url: self.base_repository_url.unwrap_or_default(),
                base_build_plan_id: self.base_build_plan_id.unwrap_or_default(),
            }),
            exercise_kinds::QUIZ => Exercise::Quiz(QuizExercise {
                id: self.exercise_id,
                course_id: self.course_id,
                title: self.title,
                release_date: self.release_date,
                end_date: self.end_date,
                questions: self.questions.map(|Json(questions)| questions).unwrap_or_default(),
            }),
            other => {
                return Err(AppError::Database(format!("unknown exercise kind: {}", other)));
            }
        };

        let initialization_state = self
            .initialization_state
            .map(|raw| {
                InitializationState::from_str(&raw).ok_or_else(|| {
                    AppError::Database(format!("unknown initialization state: {}", raw))
                })
            })
            .transpose()?;

        let student = match (self.student_id, self.student_login, self.student_created_at) {
            (Some(id), Some(login), Some(created_at)) => Some(User {
                id,
                login,
                display_name: self.student_display_name,
                created_at,
            }),
            _ => None,
        };

        Ok(Participation {
            id: Some(self.id),
            exercise: Some(exercise),
            student,
            initialization_state,
            initialization_date: self.initialization_date,
            repository_url: self.repository_url,
            build_plan_id: self.build_plan_id,
            results: Vec::new(),
        })
    }
}

/// Result row with the submission embedded as JSONB
#[derive(FromRow)]
struct ResultRow {
    id: Uuid,
    participation_id: Uuid,
    submission: Option<Json<QuizSubmission>>,
    rated: bool,
    completion_date: Option<DateTime<Utc>>,
    score: Option<i64>,
}

impl ResultRow {
    fn into_result(self) -> ExerciseResult {
        ExerciseResult {
            id: Some(self.id),
            participation_id: Some(self.participation_id),
            submission: self.submission.map(|Json(submission)| submission),
            rated: self.rated,
            completion_date: self.completion_date,
            score: self.score,
        }
    }
}

async fn fetch_results_for(pool: &PgPool, participation_id: Uuid) -> AppResult<Vec<ExerciseResult>> {
    let rows = sqlx::query_as::<_, ResultRow>(
        r#"
        SELECT id, participation_id, submission, rated, completion_date, score
        FROM results
        WHERE participation_id = $1
        ORDER BY completion_date
        "#,
    )
    .bind(participation_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(ResultRow::into_result).collect())
}

async fn attach_results(
    pool: &PgPool,
    participations: Vec<Participation>,
) -> AppResult<Vec<Participation>> {
    try_join_all(participations.into_iter().map(|mut participation| async move {
        if let Some(id) = participation.id {
            participation.results = fetch_results_for(pool, id).await?;
        }
        Ok::<_, AppError>(participation)
    }))
    .await
}

fn rows_into_participations(rows: Vec<ParticipationRow>) -> AppResult<Vec<Participation>> {
    rows.into_iter().map(ParticipationRow::into_participation).collect()
}

/// Postgres participation store
pub struct PgParticipationStore {
    pool: PgPool,
}

impl PgParticipationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ParticipationStore for PgParticipationStore {
    async fn save(&self, mut participation: Participation) -> AppResult<Participation> {
        let exercise_id = participation
            .exercise_id()
            .ok_or_else(|| AppError::Validation("participation has no exercise".to_string()))?;
        let id = *participation.id.get_or_insert_with(Uuid::new_v4);

        sqlx::query(
            r#"
            INSERT INTO participations (
                id, exercise_id, student_id, initialization_state,
                initialization_date, repository_url, build_plan_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                exercise_id = EXCLUDED.exercise_id,
                student_id = EXCLUDED.student_id,
                initialization_state = EXCLUDED.initialization_state,
                initialization_date = EXCLUDED.initialization_date,
                repository_url = EXCLUDED.repository_url,
                build_plan_id = EXCLUDED.build_plan_id
            "#,
        )
        .bind(id)
        .bind(exercise_id)
        .bind(participation.student.as_ref().map(|user| user.id))
        .bind(participation.initialization_state.map(|state| state.as_str()))
        .bind(participation.initialization_date)
        .bind(participation.repository_url.as_deref())
        .bind(participation.build_plan_id.as_deref())
        .execute(&self.pool)
        .await?;

        Ok(participation)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Participation>> {
        let sql = format!("{} WHERE p.id = $1", PARTICIPATION_SELECT);
        let row = sqlx::query_as::<_, ParticipationRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(ParticipationRow::into_participation).transpose()
    }

    async fn find_by_exercise_and_student(
        &self,
        exercise_id: Uuid,
        login: &str,
    ) -> AppResult<Option<Participation>> {
        let sql = format!("{} WHERE e.id = $1 AND u.login = $2", PARTICIPATION_SELECT);
        let row = sqlx::query_as::<_, ParticipationRow>(&sql)
            .bind(exercise_id)
            .bind(login)
            .fetch_optional(&self.pool)
            .await?;

        row.map(ParticipationRow::into_participation).transpose()
    }

    async fn find_by_exercise_and_student_in_state(
        &self,
        exercise_id: Uuid,
        login: &str,
        state: InitializationState,
    ) -> AppResult<Option<Participation>> {
        let sql = format!(
            "{} WHERE e.id = $1 AND u.login = $2 AND p.initialization_state = $3",
            PARTICIPATION_SELECT
        );
        let row = sqlx::query_as::<_, ParticipationRow>(&sql)
            .bind(exercise_id)
            .bind(login)
            .bind(state.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(ParticipationRow::into_participation).transpose()
    }

    async fn find_all(&self) -> AppResult<Vec<Participation>> {
        let sql = format!("{} ORDER BY p.id", PARTICIPATION_SELECT);
        let rows = sqlx::query_as::<_, ParticipationRow>(&sql)
            .fetch_all(&self.pool)
            .await?;

        rows_into_participations(rows)
    }

    async fn find_all_paged(&self, limit: i64, offset: i64) -> AppResult<Vec<Participation>> {
        let sql = format!("{} ORDER BY p.id OFFSET $1 LIMIT $2", PARTICIPATION_SELECT);
        let rows = sqlx::query_as::<_, ParticipationRow>(&sql)
            .bind(offset)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        rows_into_participations(rows)
    }

    async fn find_by_exercise_id(&self, exercise_id: Uuid) -> AppResult<Vec<Participation>> {
        let sql = format!("{} WHERE e.id = $1 ORDER BY p.id", PARTICIPATION_SELECT);
        let rows = sqlx::query_as::<_, ParticipationRow>(&sql)
            .bind(exercise_id)
            .fetch_all(&self.pool)
            .await?;

        rows_into_participations(rows)
    }

    async fn find_by_exercise_id_with_results(
        &self,
        exercise_id: Uuid,
    ) -> AppResult<Vec<Participation>> {
        let participations = self.find_by_exercise_id(exercise_id).await?;
        attach_results(&self.pool, participations).await
    }

    async fn find_by_course_id(&self, course_id: Uuid) -> AppResult<Vec<Participation>> {
        let sql = format!("{} WHERE e.course_id = $1 ORDER BY p.id", PARTICIPATION_SELECT);
        let rows = sqlx::query_as::<_, ParticipationRow>(&sql)
            .bind(course_id)
            .fetch_all(&self.pool)
            .await?;

        rows_into_participations(rows)
    }

    async fn find_by_build_plan_id_and_state(
        &self,
        build_plan_id: &str,
        state: InitializationState,
    ) -> AppResult<Vec<Participation>> {
        let sql = format!(
            "{} WHERE p.build_plan_id = $1 AND p.initialization_state = $2 ORDER BY p.id",
            PARTICIPATION_SELECT
        );
        let rows = sqlx::query_as::<_, ParticipationRow>(&sql)
            .bind(build_plan_id)
            .bind(state.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows_into_participations(rows)
    }

    async fn find_with_results_by_student(&self, login: &str) -> AppResult<Vec<Participation>> {
        let sql = format!("{} WHERE u.login = $1 ORDER BY p.id", PARTICIPATION_SELECT);
        let rows = sqlx::query_as::<_, ParticipationRow>(&sql)
            .bind(login)
            .fetch_all(&self.pool)
            .await?;

        let participations = rows_into_participations(rows)?;
        attach_results(&self.pool, participations).await
    }

    async fn delete_by_id(&self, id: Uuid) -> AppResult<()> {
        sqlx::query(r#"DELETE FROM participations WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// Postgres result store
pub struct PgResultStore {
    pool: PgPool,
}

impl PgResultStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResultStore for PgResultStore {
    async fn save(&self, mut result: ExerciseResult) -> AppResult<ExerciseResult> {
        let id = *result.id.get_or_insert_with(Uuid::new_v4);

        sqlx::query(
            r#"
            INSERT INTO results (id, participation_id, submission, rated, completion_date, score)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                participation_id = EXCLUDED.participation_id,
                submission = EXCLUDED.submission,
                rated = EXCLUDED.rated,
                completion_date = EXCLUDED.completion_date,
                score = EXCLUDED.score
            "#,
        )
        .bind(id)
        .bind(result.participation_id)
        .bind(result.submission.clone().map(Json))
        .bind(result.rated)
        .bind(result.completion_date)
        .bind(result.score)
        .execute(&self.pool)
        .await?;

        Ok(result)
    }

    async fn find_by_participation(
        &self,
        participation_id: Uuid,
    ) -> AppResult<Vec<ExerciseResult>> {
        fetch_results_for(&self.pool, participation_id).await
    }

    async fn find_latest_rated_by_participation(
        &self,
        participation_id: Uuid,
    ) -> AppResult<Option<ExerciseResult>> {
        let row = sqlx::query_as::<_, ResultRow>(
            r#"
            SELECT id, participation_id, submission, rated, completion_date, score
            FROM results
            WHERE participation_id = $1 AND rated = TRUE
            ORDER BY completion_date DESC
            LIMIT 1
            "#,
        )
        .bind(participation_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ResultRow::into_result))
    }

    async fn delete_by_id(&self, id: Uuid) -> AppResult<()> {
        sqlx::query(r#"DELETE FROM results WHERE id = $1"#)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

/// Postgres user directory
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserLookup for PgUserDirectory {
    async fn get_user_by_login(&self, login: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"SELECT id, login, display_name, created_at FROM users WHERE login = $1"#,
        )
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}
