use actix_web::{HttpResponse, Result, web};
use log::error;

use crate::db::repository::{PgRepository, RepositoryError};

use super::models::{LoginRequest, LoginResponse, RegisterRequest};

#[derive(serde::Serialize)]
struct ErrorResponse {
    error: String,
}

pub async fn login(
    credentials: web::Json<LoginRequest>,
    db_repo: web::Data<PgRepository>,
) -> Result<HttpResponse> {
    let credentials = credentials.into_inner();

    // Doctors have their own table; everyone else is looked up as a patient.
    let account = if credentials.role.as_deref() == Some("doctor") {
        match db_repo.find_doctor(&credentials.username).await {
            Ok(doctor) => doctor.map(|d| (d.id, d.password, d.name)),
            Err(e) => return Ok(database_failure("login", e)),
        }
    } else {
        match db_repo.find_patient(&credentials.username).await {
            Ok(patient) => patient.map(|p| (p.id, p.password, p.name)),
            Err(e) => return Ok(database_failure("login", e)),
        }
    };

    match account {
        Some((id, password, name)) if password == credentials.password => {
            log::info!("Login successful for {}", credentials.username);
            Ok(HttpResponse::Ok().json(LoginResponse {
                message: "Login successful".to_string(),
                id,
                name,
            }))
        }
        _ => Ok(HttpResponse::Unauthorized().json(ErrorResponse {
            error: "Invalid credentials".to_string(),
        })),
    }
}

pub async fn register(
    registration: web::Json<RegisterRequest>,
    db_repo: web::Data<PgRepository>,
) -> Result<HttpResponse> {
    let registration = registration.into_inner();

    match db_repo
        .create_patient(
            &registration.username,
            &registration.password,
            &registration.name,
            registration.age,
            registration.contact.as_deref(),
        )
        .await
    {
        Ok(patient) => {
            log::info!("Registered patient {} (id {})", patient.username, patient.id);
            Ok(HttpResponse::Ok().json(serde_json::json!({
                "message": "Registration successful"
            })))
        }
        Err(RepositoryError::DuplicateUsername) => {
            Ok(HttpResponse::BadRequest().json(ErrorResponse {
                error: "Username already exists".to_string(),
            }))
        }
        Err(e) => Ok(database_failure("register", e)),
    }
}

fn database_failure(operation: &str, e: RepositoryError) -> HttpResponse {
    error!("{} failed: {:?}", operation, e);
    HttpResponse::InternalServerError().json(ErrorResponse {
        error: "Internal server error".to_string(),
    })
}
