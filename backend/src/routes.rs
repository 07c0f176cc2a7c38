use std::io::Write;

use actix_multipart::{Field, Multipart};
use actix_web::{Error, HttpResponse, web};
use chrono::Utc;
use futures::{StreamExt, TryStreamExt};
use log::error;
use serde::Serialize;
use serde_json::json;
use shared::ClassLabel;

use crate::db::models::SaveResultRequest;
use crate::db::repository::PgRepository;
use crate::inference::classifier::ModelState;
use crate::inference::dispatch::{self, PredictError};
use crate::inference::voice;
use crate::validation::{self, ValidationError};

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/health").route(web::get().to(health_check)))
        .service(web::resource("/predict").route(web::post().to(predict)))
        .service(web::resource("/predict-voice").route(web::post().to(predict_voice)))
        .service(web::resource("/login").route(web::post().to(crate::auth::routes::login)))
        .service(web::resource("/register").route(web::post().to(crate::auth::routes::register)))
        .service(web::resource("/save-result").route(web::post().to(save_result)))
        .service(web::resource("/results").route(web::get().to(get_results)));
}

async fn health_check(model: web::Data<ModelState>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": if model.is_loaded() { "healthy" } else { "unhealthy" },
        "model_loaded": model.is_loaded(),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn predict(
    model: web::Data<ModelState>,
    mut payload: Multipart,
) -> Result<HttpResponse, Error> {
    // An unloaded model never pays for reading or decoding the upload.
    if !model.is_loaded() {
        return Ok(service_unavailable());
    }

    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Ok(Some(mut field)) = payload.try_next().await {
        let (field_name, file_name) = disposition_names(&field);
        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk?;
            data.write_all(&chunk)?;
        }
        if upload.is_none() && (field_name.as_deref() == Some("file") || file_name.is_some()) {
            upload = Some((file_name.unwrap_or_default(), data));
        }
    }

    let Some((filename, image_data)) = upload else {
        return Ok(bad_request(&ValidationError::MissingFile));
    };

    if !validation::allowed_file(&filename) {
        return Ok(bad_request(&ValidationError::UnsupportedExtension));
    }
    if let Err(e) = validation::validate_image(&image_data) {
        return Ok(bad_request(&e));
    }

    match dispatch::classify_spiral(model.get_ref(), &image_data) {
        Ok(response) => Ok(HttpResponse::Ok().json(response)),
        Err(PredictError::ServiceUnavailable) => Ok(service_unavailable()),
        Err(e) => {
            error!("Prediction failed: {:?}", e);
            Ok(HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Internal server error".to_string(),
            }))
        }
    }
}

/// Voice screening demo endpoint. The uploaded clip is drained and ignored;
/// only the optional `previous_result` form field influences the outcome.
async fn predict_voice(mut payload: Multipart) -> Result<HttpResponse, Error> {
    let mut previous_result: Option<String> = None;

    while let Ok(Some(mut field)) = payload.try_next().await {
        let (field_name, _) = disposition_names(&field);
        let mut data = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk?;
            data.write_all(&chunk)?;
        }
        if field_name.as_deref() == Some("previous_result") {
            previous_result = String::from_utf8(data).ok();
        }
    }

    let hint = previous_result
        .as_deref()
        .and_then(|s| s.parse::<ClassLabel>().ok());

    Ok(HttpResponse::Ok().json(voice::fake_voice_prediction(hint)))
}

async fn save_result(
    request: web::Json<SaveResultRequest>,
    db_repo: web::Data<PgRepository>,
) -> Result<HttpResponse, Error> {
    let request = request.into_inner();

    let patient_id = match request.patient_id {
        Some(id) => Some(id),
        None => match &request.patient_name {
            // Legacy clients send a username instead of an id.
            Some(username) => match db_repo.find_patient(username).await {
                Ok(patient) => patient.map(|p| p.id),
                Err(e) => {
                    error!("Save error: {:?}", e);
                    return Ok(internal_error());
                }
            },
            None => None,
        },
    };

    let Some(patient_id) = patient_id else {
        return Ok(HttpResponse::BadRequest().json(ErrorResponse {
            error: "Patient identity unknown".to_string(),
        }));
    };

    match db_repo
        .insert_prediction(patient_id, &request.test_type, &request.result, request.confidence)
        .await
    {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({ "message": "Saved" }))),
        Err(e) => {
            error!("Save error: {:?}", e);
            Ok(internal_error())
        }
    }
}

async fn get_results(db_repo: web::Data<PgRepository>) -> Result<HttpResponse, Error> {
    match db_repo.recent_results(50).await {
        Ok(entries) => Ok(HttpResponse::Ok().json(entries)),
        Err(e) => {
            error!("Fetch results error: {:?}", e);
            Ok(internal_error())
        }
    }
}

fn disposition_names(field: &Field) -> (Option<String>, Option<String>) {
    match field.content_disposition() {
        Some(cd) => (
            cd.get_name().map(str::to_owned),
            cd.get_filename().map(str::to_owned),
        ),
        None => (None, None),
    }
}

fn bad_request(reason: &ValidationError) -> HttpResponse {
    HttpResponse::BadRequest().json(ErrorResponse {
        error: reason.to_string(),
    })
}

fn service_unavailable() -> HttpResponse {
    HttpResponse::ServiceUnavailable().json(ErrorResponse {
        error: "Model not loaded".to_string(),
    })
}

fn internal_error() -> HttpResponse {
    HttpResponse::InternalServerError().json(ErrorResponse {
        error: "Internal server error".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::classifier::{InferenceError, SpiralClassifier};
    use actix_web::{App, test};
    use ndarray::Array4;
    use std::sync::Arc;

    struct StubClassifier {
        probs: Vec<f32>,
    }

    impl SpiralClassifier for StubClassifier {
        fn predict(&self, _input: &Array4<f32>) -> Result<Vec<f32>, InferenceError> {
            Ok(self.probs.clone())
        }
    }

    fn stub_state(probs: Vec<f32>) -> ModelState {
        ModelState::with_classifier(Arc::new(StubClassifier { probs }))
    }

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(width, height, image::Rgb([90, 90, 90]));
        let mut buf = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    const BOUNDARY: &str = "----routetestboundary";

    fn multipart_file(field: &str, filename: &str, content: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; \
                 filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn multipart_text(field: &str, value: &str) -> Vec<u8> {
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"\r\n\r\n{value}\r\n--{BOUNDARY}--\r\n"
        )
        .into_bytes()
    }

    fn multipart_request(uri: &str, body: Vec<u8>) -> test::TestRequest {
        test::TestRequest::post().uri(uri).insert_header((
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        ))
        .set_payload(body)
    }

    #[actix_web::test]
    async fn predict_without_model_returns_503() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(ModelState::unavailable()))
                .configure(configure_routes),
        )
        .await;

        let body = multipart_file("file", "spiral.png", &png_bytes(100, 100));
        let resp = test::call_service(&app, multipart_request("/predict", body).to_request()).await;
        assert_eq!(resp.status(), 503);
    }

    #[actix_web::test]
    async fn predict_rejects_disallowed_extension() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(stub_state(vec![0.3, 0.7])))
                .configure(configure_routes),
        )
        .await;

        let body = multipart_file("file", "notes.txt", b"some text");
        let resp = test::call_service(&app, multipart_request("/predict", body).to_request()).await;
        assert_eq!(resp.status(), 400);

        let parsed: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(parsed["error"], "Invalid file type");
    }

    #[actix_web::test]
    async fn predict_without_file_field_returns_400() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(stub_state(vec![0.3, 0.7])))
                .configure(configure_routes),
        )
        .await;

        let body = multipart_text("comment", "no file here");
        let resp = test::call_service(&app, multipart_request("/predict", body).to_request()).await;
        assert_eq!(resp.status(), 400);

        let parsed: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(parsed["error"], "No file uploaded");
    }

    #[actix_web::test]
    async fn predict_classifies_a_valid_upload() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(stub_state(vec![0.25, 0.75])))
                .configure(configure_routes),
        )
        .await;

        let body = multipart_file("file", "spiral.png", &png_bytes(100, 100));
        let resp = test::call_service(&app, multipart_request("/predict", body).to_request()).await;
        assert_eq!(resp.status(), 200);

        let parsed: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(parsed["result"], "Parkinson");
        assert!((parsed["confidence"].as_f64().unwrap() - 0.75).abs() < 1e-6);
    }

    #[actix_web::test]
    async fn voice_endpoint_echoes_the_hint() {
        let app = test::init_service(App::new().configure(configure_routes)).await;

        let body = multipart_text("previous_result", "Parkinson");
        let resp =
            test::call_service(&app, multipart_request("/predict-voice", body).to_request()).await;
        assert_eq!(resp.status(), 200);

        let parsed: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(parsed["result"], "Parkinson");
        let confidence = parsed["confidence"].as_f64().unwrap();
        assert!((0.80..=0.95).contains(&confidence));
    }

    #[actix_web::test]
    async fn voice_endpoint_ignores_an_unknown_hint() {
        let app = test::init_service(App::new().configure(configure_routes)).await;

        let body = multipart_text("previous_result", "maybe");
        let resp =
            test::call_service(&app, multipart_request("/predict-voice", body).to_request()).await;
        assert_eq!(resp.status(), 200);

        let parsed: serde_json::Value = test::read_body_json(resp).await;
        let confidence = parsed["confidence"].as_f64().unwrap();
        assert!((0.50..=0.90).contains(&confidence));
    }

    #[actix_web::test]
    async fn health_reports_model_state() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(ModelState::unavailable()))
                .configure(configure_routes),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request())
            .await;
        assert_eq!(resp.status(), 200);

        let parsed: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(parsed["status"], "unhealthy");
        assert_eq!(parsed["model_loaded"], false);
    }
}
