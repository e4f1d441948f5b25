use actix_web::{get, post, put, web, HttpRequest, HttpResponse, Responder};
use uuid::Uuid;
use validator::Validate;

use crate::auth;
use crate::database::{Database, WorkflowError};
use crate::models::{
    decode_data_url, ApiResponse, ApplicationStatus, DecisionRequest, SubmissionReceipt,
    SubmitApplicationRequest, UploadFileRequest, UploadFileResponse, VendorListing,
    VerificationUpdateRequest,
};

// ============================================================================
// HEALTH CHECK
// ============================================================================

#[get("/health")]
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "vendor-marketplace-service",
        "timestamp": chrono::Utc::now()
    }))
}

// ============================================================================
// DOCUMENT STORE
// ============================================================================

#[post("/files")]
pub async fn upload_file(
    req: HttpRequest,
    db: web::Data<Database>,
    payload: web::Json<UploadFileRequest>,
) -> impl Responder {
    if let Err(resp) = auth::require_authenticated(&req) {
        return resp;
    }

    let body = payload.into_inner();
    if let Err(e) = body.validate() {
        return HttpResponse::BadRequest()
            .json(ApiResponse::<()>::error(format!("Validation failed: {}", e)));
    }

    let new_file = match body.into_new_stored_file() {
        Ok(file) => file,
        Err(message) => {
            return HttpResponse::BadRequest().json(ApiResponse::<()>::error(message));
        }
    };

    match db.create_stored_file(new_file).await {
        Ok(file) => HttpResponse::Created().json(ApiResponse::success(
            UploadFileResponse::for_file(&file),
        )),
        Err(err) => {
            log::error!("Failed to store file: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to store file".into()))
        }
    }
}

/// Public retrieval endpoint: streams the original bytes back with the
/// original content type.
#[get("/files/{file_id}")]
pub async fn serve_file(db: web::Data<Database>, file_id: web::Path<Uuid>) -> impl Responder {
    let file_id = file_id.into_inner();
    let file = match db.get_stored_file(file_id).await {
        Ok(Some(file)) => file,
        Ok(None) => {
            return HttpResponse::NotFound().json(ApiResponse::<()>::error("File not found".into()))
        }
        Err(err) => {
            log::error!("Failed to fetch file: {err:?}");
            return HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to fetch file".into()));
        }
    };

    match decode_data_url(&file.data_url) {
        Some((content_type, bytes)) => HttpResponse::Ok().content_type(content_type).body(bytes),
        None => {
            log::error!("Stored file {} has a malformed data URL", file.id);
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to read stored file".into()))
        }
    }
}

// ============================================================================
// VENDOR APPLICATIONS (Submission + Admin Workflow)
// ============================================================================

#[post("/applications")]
pub async fn submit_application(
    db: web::Data<Database>,
    payload: web::Json<SubmitApplicationRequest>,
) -> impl Responder {
    let body = payload.into_inner();
    if body.business_name.trim().is_empty() {
        return HttpResponse::BadRequest()
            .json(ApiResponse::<()>::error("Business name is required".into()));
    }
    if let Err(e) = body.validate() {
        return HttpResponse::BadRequest()
            .json(ApiResponse::<()>::error(format!("Validation failed: {}", e)));
    }

    let new_application = body.into_new_application();
    match db.create_application(new_application).await {
        Ok(application) => HttpResponse::Created().json(ApiResponse::success(
            SubmissionReceipt::from(&application),
        )),
        Err(err) => {
            log::error!("Failed to create application: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to create application".into()))
        }
    }
}

#[get("/applications")]
pub async fn list_applications(req: HttpRequest, db: web::Data<Database>) -> impl Responder {
    if let Err(resp) = auth::require_admin(&req) {
        return resp;
    }

    match db.list_applications().await {
        Ok(applications) => HttpResponse::Ok().json(ApiResponse::success(applications)),
        Err(err) => {
            log::error!("Failed to list applications: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to list applications".into()))
        }
    }
}

#[get("/applications/{application_id}")]
pub async fn get_application(
    req: HttpRequest,
    db: web::Data<Database>,
    application_id: web::Path<Uuid>,
) -> impl Responder {
    if let Err(resp) = auth::require_admin(&req) {
        return resp;
    }

    let application_id = application_id.into_inner();
    match db.get_application(application_id).await {
        Ok(Some(application)) => HttpResponse::Ok().json(ApiResponse::success(application)),
        Ok(None) => {
            HttpResponse::NotFound().json(ApiResponse::<()>::error("Application not found".into()))
        }
        Err(err) => {
            log::error!("Failed to fetch application: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to fetch application".into()))
        }
    }
}

#[get("/applications/users/{user_id}")]
pub async fn list_applications_for_user(
    req: HttpRequest,
    db: web::Data<Database>,
    user_id: web::Path<Uuid>,
) -> impl Responder {
    if let Err(resp) = auth::require_admin(&req) {
        return resp;
    }

    let user_id = user_id.into_inner();
    match db.list_applications_for_user(user_id).await {
        Ok(applications) => HttpResponse::Ok().json(ApiResponse::success(applications)),
        Err(err) => {
            log::error!("Failed to list applications: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to list applications".into()))
        }
    }
}

#[get("/applications/users/{user_id}/latest")]
pub async fn latest_application_for_user(
    req: HttpRequest,
    db: web::Data<Database>,
    user_id: web::Path<Uuid>,
) -> impl Responder {
    if let Err(resp) = auth::require_admin(&req) {
        return resp;
    }

    let user_id = user_id.into_inner();
    match db.latest_application_for_user(user_id).await {
        Ok(Some(application)) => HttpResponse::Ok().json(ApiResponse::success(application)),
        Ok(None) => HttpResponse::NotFound()
            .json(ApiResponse::<()>::error("No applications for user".into())),
        Err(err) => {
            log::error!("Failed to fetch latest application: {err:?}");
            HttpResponse::InternalServerError().json(ApiResponse::<()>::error(
                "Failed to fetch latest application".into(),
            ))
        }
    }
}

#[put("/applications/{application_id}/verification")]
pub async fn update_verification(
    req: HttpRequest,
    db: web::Data<Database>,
    application_id: web::Path<Uuid>,
    payload: web::Json<VerificationUpdateRequest>,
) -> impl Responder {
    if let Err(resp) = auth::require_admin(&req) {
        return resp;
    }

    let application_id = application_id.into_inner();
    let body = payload.into_inner();

    if let Err(e) = body.validate() {
        return HttpResponse::BadRequest()
            .json(ApiResponse::<()>::error(format!("Validation failed: {}", e)));
    }

    match db.update_verification(application_id, body).await {
        Ok(application) => HttpResponse::Ok().json(ApiResponse::success(application)),
        Err(WorkflowError::NotFound) => {
            HttpResponse::NotFound().json(ApiResponse::<()>::error("Application not found".into()))
        }
        Err(err) => {
            log::error!("Failed to update verification metadata: {err:?}");
            HttpResponse::InternalServerError().json(ApiResponse::<()>::error(
                "Failed to update verification metadata".into(),
            ))
        }
    }
}

#[post("/applications/{application_id}/decision")]
pub async fn decide_application(
    req: HttpRequest,
    db: web::Data<Database>,
    application_id: web::Path<Uuid>,
    payload: web::Json<DecisionRequest>,
) -> impl Responder {
    if let Err(resp) = auth::require_admin(&req) {
        return resp;
    }

    let application_id = application_id.into_inner();
    let target = payload.into_inner().status;

    if target == ApplicationStatus::Pending {
        return HttpResponse::BadRequest().json(ApiResponse::<()>::error(
            "Decision must be approved or rejected".into(),
        ));
    }

    match db.decide_application(application_id, target).await {
        Ok(application) => HttpResponse::Ok().json(ApiResponse::success(application)),
        Err(WorkflowError::NotFound) => {
            HttpResponse::NotFound().json(ApiResponse::<()>::error("Application not found".into()))
        }
        Err(err @ WorkflowError::VerificationDocumentMissing) => {
            HttpResponse::UnprocessableEntity().json(ApiResponse::<()>::error(err.to_string()))
        }
        Err(err @ WorkflowError::InvalidTransition { .. }) => {
            HttpResponse::Conflict().json(ApiResponse::<()>::error(err.to_string()))
        }
        Err(err) => {
            log::error!("Failed to decide application: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to decide application".into()))
        }
    }
}

// ============================================================================
// PUBLIC VENDOR DIRECTORY
// ============================================================================

#[get("/vendors")]
pub async fn list_vendors(db: web::Data<Database>) -> impl Responder {
    match db.list_vendors().await {
        Ok(vendors) => {
            let listings: Vec<VendorListing> =
                vendors.into_iter().map(VendorListing::from).collect();
            HttpResponse::Ok().json(ApiResponse::success(listings))
        }
        Err(err) => {
            log::error!("Failed to list vendors: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to list vendors".into()))
        }
    }
}

#[get("/vendors/{vendor_id}")]
pub async fn get_vendor(db: web::Data<Database>, vendor_id: web::Path<Uuid>) -> impl Responder {
    let vendor_id = vendor_id.into_inner();
    match db.get_vendor(vendor_id).await {
        Ok(Some(vendor)) => {
            HttpResponse::Ok().json(ApiResponse::success(VendorListing::from(vendor)))
        }
        Ok(None) => {
            HttpResponse::NotFound().json(ApiResponse::<()>::error("Vendor not found".into()))
        }
        Err(err) => {
            log::error!("Failed to get vendor: {err:?}");
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to get vendor".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};

    #[actix_web::test]
    async fn health_check_reports_ok() {
        let app = test::init_service(App::new().service(health_check)).await;
        let req = test::TestRequest::get().uri("/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "vendor-marketplace-service");
    }
}
