use sqlx::PgPool;

use crate::db::models::{Doctor, Patient, ResultEntry};

#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Username already exists")]
    DuplicateUsername,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the schema idempotently and seeds the demo accounts.
    pub async fn init_schema(&self) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS doctors (
                id SERIAL PRIMARY KEY,
                username VARCHAR(80) UNIQUE NOT NULL,
                password VARCHAR(120) NOT NULL,
                name VARCHAR(100) NOT NULL,
                specialization VARCHAR(100) NOT NULL DEFAULT 'Neurologist'
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS patients (
                id SERIAL PRIMARY KEY,
                username VARCHAR(80) UNIQUE NOT NULL,
                password VARCHAR(120) NOT NULL,
                name VARCHAR(100) NOT NULL,
                age INTEGER,
                contact VARCHAR(20)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS predictions (
                id SERIAL PRIMARY KEY,
                patient_id INTEGER NOT NULL REFERENCES patients(id),
                type VARCHAR(20) NOT NULL,
                result VARCHAR(50) NOT NULL,
                confidence DOUBLE PRECISION NOT NULL,
                timestamp TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        self.seed_demo_accounts().await
    }

    async fn seed_demo_accounts(&self) -> Result<(), RepositoryError> {
        if self.find_doctor("doctor").await?.is_none() {
            sqlx::query(
                "INSERT INTO doctors (username, password, name) VALUES ($1, $2, $3)",
            )
            .bind("doctor")
            .bind("password")
            .bind("Dr. Strange")
            .execute(&self.pool)
            .await?;
            log::info!("Doctor seeded");
        }

        if self.find_patient("patient").await?.is_none() {
            sqlx::query(
                "INSERT INTO patients (username, password, name, age, contact) \
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind("patient")
            .bind("password")
            .bind("John Doe")
            .bind(65)
            .bind("1234567890")
            .execute(&self.pool)
            .await?;
            log::info!("Patient seeded");
        }

        Ok(())
    }

    pub async fn find_doctor(&self, username: &str) -> Result<Option<Doctor>, RepositoryError> {
        let doctor = sqlx::query_as::<_, Doctor>(
            "SELECT id, username, password, name, specialization FROM doctors WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(doctor)
    }

    pub async fn find_patient(&self, username: &str) -> Result<Option<Patient>, RepositoryError> {
        let patient = sqlx::query_as::<_, Patient>(
            "SELECT id, username, password, name, age, contact FROM patients WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(patient)
    }

    pub async fn create_patient(
        &self,
        username: &str,
        password: &str,
        name: &str,
        age: Option<i32>,
        contact: Option<&str>,
    ) -> Result<Patient, RepositoryError> {
        if self.find_patient(username).await?.is_some() {
            return Err(RepositoryError::DuplicateUsername);
        }

        let patient = sqlx::query_as::<_, Patient>(
            "INSERT INTO patients (username, password, name, age, contact) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, username, password, name, age, contact",
        )
        .bind(username)
        .bind(password)
        .bind(name)
        .bind(age)
        .bind(contact)
        .fetch_one(&self.pool)
        .await?;
        Ok(patient)
    }

    pub async fn insert_prediction(
        &self,
        patient_id: i32,
        test_type: &str,
        result: &str,
        confidence: f64,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO predictions (patient_id, type, result, confidence) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(patient_id)
        .bind(test_type)
        .bind(result)
        .bind(confidence)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Most recent predictions joined with their patients, newest first.
    pub async fn recent_results(&self, limit: i64) -> Result<Vec<ResultEntry>, RepositoryError> {
        let entries = sqlx::query_as::<_, ResultEntry>(
            r#"
            SELECT p.id, p.patient_id, pt.name AS patient_name, pt.age AS patient_age,
                   pt.contact AS patient_contact, p.type, p.result, p.confidence, p.timestamp
            FROM predictions p
            JOIN patients pt ON p.patient_id = pt.id
            ORDER BY p.timestamp DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }
}
