use std::{borrow::Cow, time::Duration};

use chrono::Utc;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions},
    types::Json,
    Connection, Executor, PgPool, Postgres, Transaction,
};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    ApplicationStatus, NewStoredFile, NewVendorApplication, StoredFile, Vendor, VendorApplication,
    VendorPublication, VerificationUpdateRequest,
};

const APPLICATION_COLUMNS: &str = "id, user_id, business_name, category, subcategories, \
    description, story, other_services, location, areas_served, phone, email, website, \
    social_links, starting_price, pricing_model, price_includes, minimum_booking, \
    advance_notice, setup_time, outdoor_capable, destination_experience, special_requirements, \
    category_details, work_image_urls, verification_document_url, terms_accepted, \
    terms_accepted_at, document_uploaded, verified_by, verified_at, admin_notes, \
    checklist_complete, status, submitted_at, approved_at, updated_at";

const VENDOR_COLUMNS: &str = "id, name, category, description, image_url, location, \
    price_range, email, phone, website, social_links, story, other_services, rating, \
    approved_at";

/// Errors surfaced by the application workflow. Business-rule variants are
/// distinct from infrastructure failures so handlers can present actionable
/// messages without leaking query detail.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("application not found")]
    NotFound,
    #[error("cannot approve an application without a verification document")]
    VerificationDocumentMissing,
    #[error("cannot move application from {from:?} to {to:?}")]
    InvalidTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = match PgPoolOptions::new()
            .max_connections(10)
            .min_connections(2)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Some(Duration::from_secs(600)))
            .test_before_acquire(true)
            .connect(database_url)
            .await
        {
            Ok(pool) => pool,
            Err(sqlx::Error::Database(db_err)) if db_err.code() == Some(Cow::Borrowed("3D000")) => {
                log::info!("Database missing, attempting to create it");
                create_database_if_missing(database_url).await?;

                PgPoolOptions::new()
                    .max_connections(10)
                    .min_connections(2)
                    .acquire_timeout(Duration::from_secs(5))
                    .idle_timeout(Some(Duration::from_secs(600)))
                    .test_before_acquire(true)
                    .connect(database_url)
                    .await?
            }
            Err(err) => return Err(err),
        };

        // Run embedded migrations
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    // ========================================================================
    // VENDOR APPLICATIONS
    // ========================================================================

    /// Insert a new application, or refresh an existing one when the caller
    /// resubmits under the same id. A resubmission overwrites the submitted
    /// profile fields only; `status`, `submitted_at`, `approved_at`, and the
    /// verification metadata columns keep their stored values, so an approved
    /// application stays approved until an admin decides again.
    pub async fn create_application(
        &self,
        application: NewVendorApplication,
    ) -> Result<VendorApplication, sqlx::Error> {
        let NewVendorApplication {
            id,
            user_id,
            business_name,
            category,
            subcategories,
            description,
            story,
            other_services,
            location,
            areas_served,
            phone,
            email,
            website,
            social_links,
            starting_price,
            pricing_model,
            price_includes,
            minimum_booking,
            advance_notice,
            setup_time,
            outdoor_capable,
            destination_experience,
            special_requirements,
            category_details,
            work_image_urls,
            verification_document_url,
            terms_accepted,
            terms_accepted_at,
            status,
            submitted_at,
            updated_at,
        } = application;

        let query = format!(
            r#"
            INSERT INTO vendor_applications (
                id, user_id, business_name, category, subcategories, description, story,
                other_services, location, areas_served, phone, email, website, social_links,
                starting_price, pricing_model, price_includes, minimum_booking, advance_notice,
                setup_time, outdoor_capable, destination_experience, special_requirements,
                category_details, work_image_urls, verification_document_url, terms_accepted,
                terms_accepted_at, status, submitted_at, updated_at
            )
            VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                $11, $12, $13, $14, $15, $16, $17, $18, $19, $20,
                $21, $22, $23, $24, $25, $26, $27, $28, $29, $30, $31
            )
            ON CONFLICT (id) DO UPDATE
            SET user_id = EXCLUDED.user_id,
                business_name = EXCLUDED.business_name,
                category = EXCLUDED.category,
                subcategories = EXCLUDED.subcategories,
                description = EXCLUDED.description,
                story = EXCLUDED.story,
                other_services = EXCLUDED.other_services,
                location = EXCLUDED.location,
                areas_served = EXCLUDED.areas_served,
                phone = EXCLUDED.phone,
                email = EXCLUDED.email,
                website = EXCLUDED.website,
                social_links = EXCLUDED.social_links,
                starting_price = EXCLUDED.starting_price,
                pricing_model = EXCLUDED.pricing_model,
                price_includes = EXCLUDED.price_includes,
                minimum_booking = EXCLUDED.minimum_booking,
                advance_notice = EXCLUDED.advance_notice,
                setup_time = EXCLUDED.setup_time,
                outdoor_capable = EXCLUDED.outdoor_capable,
                destination_experience = EXCLUDED.destination_experience,
                special_requirements = EXCLUDED.special_requirements,
                category_details = EXCLUDED.category_details,
                work_image_urls = EXCLUDED.work_image_urls,
                verification_document_url = EXCLUDED.verification_document_url,
                terms_accepted = EXCLUDED.terms_accepted,
                terms_accepted_at = EXCLUDED.terms_accepted_at,
                updated_at = NOW()
            RETURNING {APPLICATION_COLUMNS}
            "#
        );

        let record = sqlx::query_as::<_, VendorApplication>(&query)
            .bind(id)
            .bind(user_id)
            .bind(business_name)
            .bind(category)
            .bind(subcategories)
            .bind(description)
            .bind(story)
            .bind(other_services)
            .bind(location)
            .bind(areas_served)
            .bind(phone)
            .bind(email)
            .bind(website)
            .bind(Json(social_links))
            .bind(starting_price)
            .bind(pricing_model)
            .bind(price_includes)
            .bind(minimum_booking)
            .bind(advance_notice)
            .bind(setup_time)
            .bind(outdoor_capable)
            .bind(destination_experience)
            .bind(special_requirements)
            .bind(Json(category_details))
            .bind(work_image_urls)
            .bind(verification_document_url)
            .bind(terms_accepted)
            .bind(terms_accepted_at)
            .bind(status)
            .bind(submitted_at)
            .bind(updated_at)
            .fetch_one(&self.pool)
            .await?;

        Ok(record)
    }

    pub async fn get_application(
        &self,
        application_id: Uuid,
    ) -> Result<Option<VendorApplication>, sqlx::Error> {
        let query = format!("SELECT {APPLICATION_COLUMNS} FROM vendor_applications WHERE id = $1");
        sqlx::query_as::<_, VendorApplication>(&query)
            .bind(application_id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn list_applications(&self) -> Result<Vec<VendorApplication>, sqlx::Error> {
        let query = format!(
            "SELECT {APPLICATION_COLUMNS} FROM vendor_applications ORDER BY submitted_at DESC"
        );
        sqlx::query_as::<_, VendorApplication>(&query)
            .fetch_all(&self.pool)
            .await
    }

    pub async fn list_applications_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<VendorApplication>, sqlx::Error> {
        let query = format!(
            "SELECT {APPLICATION_COLUMNS} FROM vendor_applications WHERE user_id = $1 \
             ORDER BY submitted_at DESC"
        );
        sqlx::query_as::<_, VendorApplication>(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
    }

    pub async fn latest_application_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<VendorApplication>, sqlx::Error> {
        let query = format!(
            "SELECT {APPLICATION_COLUMNS} FROM vendor_applications WHERE user_id = $1 \
             ORDER BY submitted_at DESC LIMIT 1"
        );
        sqlx::query_as::<_, VendorApplication>(&query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Write verification metadata onto an application. Absent fields keep
    /// their stored values; the authoritative status column is never touched
    /// here, even when the checklist is marked complete.
    pub async fn update_verification(
        &self,
        application_id: Uuid,
        update: VerificationUpdateRequest,
    ) -> Result<VendorApplication, WorkflowError> {
        let query = format!(
            r#"
            UPDATE vendor_applications
            SET document_uploaded = COALESCE($2, document_uploaded),
                verified_by = COALESCE($3, verified_by),
                verified_at = COALESCE($4, verified_at),
                checklist_complete = COALESCE($5, checklist_complete),
                admin_notes = COALESCE($6, admin_notes),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {APPLICATION_COLUMNS}
            "#
        );

        let record = sqlx::query_as::<_, VendorApplication>(&query)
            .bind(application_id)
            .bind(update.document_uploaded)
            .bind(update.verified_by)
            .bind(update.verified_at)
            .bind(update.checklist_complete)
            .bind(update.admin_notes)
            .fetch_optional(&self.pool)
            .await?;

        record.ok_or(WorkflowError::NotFound)
    }

    /// Apply a final decision to an application inside a single transaction.
    ///
    /// The row is locked, the transition and the document gate are checked,
    /// and only then is the status written; on approval the public vendor
    /// row is upserted before commit. A failed gate check therefore leaves
    /// the application status unchanged.
    pub async fn decide_application(
        &self,
        application_id: Uuid,
        target: ApplicationStatus,
    ) -> Result<VendorApplication, WorkflowError> {
        let mut tx = self.pool.begin().await?;

        let select = format!(
            "SELECT {APPLICATION_COLUMNS} FROM vendor_applications WHERE id = $1 FOR UPDATE"
        );
        let application = sqlx::query_as::<_, VendorApplication>(&select)
            .bind(application_id)
            .fetch_optional(tx.as_mut())
            .await?
            .ok_or(WorkflowError::NotFound)?;

        validate_decision(&application, target)?;

        let now = Utc::now();
        let approved_at = (target == ApplicationStatus::Approved).then_some(now);

        let update = format!(
            r#"
            UPDATE vendor_applications
            SET status = $2, approved_at = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {APPLICATION_COLUMNS}
            "#
        );
        let updated = sqlx::query_as::<_, VendorApplication>(&update)
            .bind(application_id)
            .bind(target)
            .bind(approved_at)
            .fetch_one(tx.as_mut())
            .await?;

        if target == ApplicationStatus::Approved {
            let publication = VendorPublication::derive(&updated, now);
            Self::upsert_vendor_with_tx(&mut tx, publication).await?;
        }

        tx.commit().await?;

        Ok(updated)
    }

    // ========================================================================
    // PUBLIC VENDOR DIRECTORY
    // ========================================================================

    /// Insert-or-update the public vendor row keyed by the application id.
    /// Every public field is overwritten; rating is preserved so repeated
    /// approvals converge without resetting the quality signal.
    async fn upsert_vendor_with_tx(
        tx: &mut Transaction<'_, Postgres>,
        publication: VendorPublication,
    ) -> Result<Vendor, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO vendors (
                id, name, category, description, image_url, location, price_range,
                email, phone, website, social_links, story, other_services, rating, approved_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, 0.0, $14)
            ON CONFLICT (id) DO UPDATE
            SET name = EXCLUDED.name,
                category = EXCLUDED.category,
                description = EXCLUDED.description,
                image_url = EXCLUDED.image_url,
                location = EXCLUDED.location,
                price_range = EXCLUDED.price_range,
                email = EXCLUDED.email,
                phone = EXCLUDED.phone,
                website = EXCLUDED.website,
                social_links = EXCLUDED.social_links,
                story = EXCLUDED.story,
                other_services = EXCLUDED.other_services,
                approved_at = EXCLUDED.approved_at
            RETURNING {VENDOR_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Vendor>(&query)
            .bind(publication.id)
            .bind(publication.name)
            .bind(publication.category)
            .bind(publication.description)
            .bind(publication.image_url)
            .bind(publication.location)
            .bind(publication.price_range)
            .bind(publication.email)
            .bind(publication.phone)
            .bind(publication.website)
            .bind(Json(publication.social_links))
            .bind(publication.story)
            .bind(publication.other_services)
            .bind(publication.approved_at)
            .fetch_one(tx.as_mut())
            .await
    }

    pub async fn list_vendors(&self) -> Result<Vec<Vendor>, sqlx::Error> {
        let query = format!("SELECT {VENDOR_COLUMNS} FROM vendors ORDER BY approved_at DESC");
        sqlx::query_as::<_, Vendor>(&query)
            .fetch_all(&self.pool)
            .await
    }

    pub async fn get_vendor(&self, vendor_id: Uuid) -> Result<Option<Vendor>, sqlx::Error> {
        let query = format!("SELECT {VENDOR_COLUMNS} FROM vendors WHERE id = $1");
        sqlx::query_as::<_, Vendor>(&query)
            .bind(vendor_id)
            .fetch_optional(&self.pool)
            .await
    }

    // ========================================================================
    // STORED FILES
    // ========================================================================

    pub async fn create_stored_file(&self, file: NewStoredFile) -> Result<StoredFile, sqlx::Error> {
        sqlx::query_as::<_, StoredFile>(
            r#"
            INSERT INTO stored_files (id, category, file_name, content_type, size_bytes, data_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, category, file_name, content_type, size_bytes, data_url, created_at
            "#,
        )
        .bind(file.id)
        .bind(file.category)
        .bind(file.file_name)
        .bind(file.content_type)
        .bind(file.size_bytes)
        .bind(file.data_url)
        .fetch_one(&self.pool)
        .await
    }

    pub async fn get_stored_file(&self, file_id: Uuid) -> Result<Option<StoredFile>, sqlx::Error> {
        sqlx::query_as::<_, StoredFile>(
            r#"
            SELECT id, category, file_name, content_type, size_bytes, data_url, created_at
            FROM stored_files
            WHERE id = $1
            "#,
        )
        .bind(file_id)
        .fetch_optional(&self.pool)
        .await
    }
}

/// Quote a Postgres identifier, doubling any embedded double quotes.
fn quoted_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Check that a decision may be applied to the application as stored:
/// the status transition must be legal, and approval additionally
/// requires a verification document on file.
pub fn validate_decision(
    application: &VendorApplication,
    target: ApplicationStatus,
) -> Result<(), WorkflowError> {
    if !application.status.can_transition_to(target) {
        return Err(WorkflowError::InvalidTransition {
            from: application.status,
            to: target,
        });
    }

    if target == ApplicationStatus::Approved && application.verification_document_url.is_none() {
        return Err(WorkflowError::VerificationDocumentMissing);
    }

    Ok(())
}

async fn create_database_if_missing(database_url: &str) -> Result<(), sqlx::Error> {
    let options: PgConnectOptions = database_url.parse()?;
    let database_name = options
        .get_database()
        .map(|name| name.to_string())
        .unwrap_or_else(|| "postgres".to_string());

    // If we're already targeting the default maintenance database, nothing to do.
    if database_name.eq_ignore_ascii_case("postgres") {
        return Ok(());
    }

    let maintenance_options = options.clone().database("postgres");

    let mut connection = sqlx::postgres::PgConnection::connect_with(&maintenance_options).await?;

    let create_stmt = format!("CREATE DATABASE {}", quoted_identifier(&database_name));

    match connection.execute(create_stmt.as_str()).await {
        Ok(_) => {
            log::info!("Created database '{}'", database_name);
            Ok(())
        }
        Err(sqlx::Error::Database(db_err)) if db_err.code() == Some(Cow::Borrowed("42P04")) => {
            log::info!("Database '{}' already exists", database_name);
            Ok(())
        }
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CategoryDetails, SocialLinks, VendorCategory};
    use chrono::{DateTime, Utc};

    fn stored_application(
        status: ApplicationStatus,
        verification_document_url: Option<&str>,
    ) -> VendorApplication {
        let now = Utc::now();
        VendorApplication {
            id: Uuid::new_v4(),
            user_id: None,
            business_name: "Coral Bay Villas".to_string(),
            category: VendorCategory::Venues,
            subcategories: Vec::new(),
            description: Some("Clifftop ceremonies".to_string()),
            story: None,
            other_services: None,
            location: Some("Zanzibar".to_string()),
            areas_served: Vec::new(),
            phone: None,
            email: None,
            website: None,
            social_links: Json(SocialLinks::default()),
            starting_price: None,
            pricing_model: None,
            price_includes: None,
            minimum_booking: None,
            advance_notice: None,
            setup_time: None,
            outdoor_capable: None,
            destination_experience: None,
            special_requirements: None,
            category_details: Json(CategoryDetails::default()),
            work_image_urls: Vec::new(),
            verification_document_url: verification_document_url.map(str::to_string),
            terms_accepted: true,
            terms_accepted_at: Some(now),
            document_uploaded: verification_document_url.is_some(),
            verified_by: None,
            verified_at: None,
            admin_notes: None,
            checklist_complete: false,
            status,
            submitted_at: now,
            approved_at: None,
            updated_at: now,
        }
    }

    fn submission(
        id: Uuid,
        description: &str,
        submitted_at: DateTime<Utc>,
    ) -> NewVendorApplication {
        NewVendorApplication {
            id,
            user_id: None,
            business_name: "Coral Bay Villas".to_string(),
            category: VendorCategory::Venues,
            subcategories: Vec::new(),
            description: Some(description.to_string()),
            story: None,
            other_services: None,
            location: Some("Zanzibar".to_string()),
            areas_served: Vec::new(),
            phone: None,
            email: None,
            website: None,
            social_links: SocialLinks::default(),
            starting_price: None,
            pricing_model: None,
            price_includes: None,
            minimum_booking: None,
            advance_notice: None,
            setup_time: None,
            outdoor_capable: None,
            destination_experience: None,
            special_requirements: None,
            category_details: CategoryDetails::default(),
            work_image_urls: Vec::new(),
            verification_document_url: Some("/api/v1/files/doc".to_string()),
            terms_accepted: true,
            terms_accepted_at: Some(submitted_at),
            status: ApplicationStatus::Pending,
            submitted_at,
            updated_at: submitted_at,
        }
    }

    #[test]
    fn approval_requires_verification_document() {
        let application = stored_application(ApplicationStatus::Pending, None);

        let result = validate_decision(&application, ApplicationStatus::Approved);
        assert!(matches!(
            result,
            Err(WorkflowError::VerificationDocumentMissing)
        ));

        let documented =
            stored_application(ApplicationStatus::Pending, Some("/api/v1/files/doc"));
        assert!(validate_decision(&documented, ApplicationStatus::Approved).is_ok());
    }

    #[test]
    fn rejection_does_not_require_document() {
        let application = stored_application(ApplicationStatus::Pending, None);
        assert!(validate_decision(&application, ApplicationStatus::Rejected).is_ok());
    }

    #[test]
    fn rejected_applications_stay_rejected() {
        let application =
            stored_application(ApplicationStatus::Rejected, Some("/api/v1/files/doc"));

        let result = validate_decision(&application, ApplicationStatus::Approved);
        assert!(matches!(
            result,
            Err(WorkflowError::InvalidTransition {
                from: ApplicationStatus::Rejected,
                to: ApplicationStatus::Approved,
            })
        ));
    }

    #[test]
    fn approved_applications_may_be_approved_again() {
        let application =
            stored_application(ApplicationStatus::Approved, Some("/api/v1/files/doc"));
        assert!(validate_decision(&application, ApplicationStatus::Approved).is_ok());
    }

    #[test]
    fn quoted_identifier_doubles_embedded_quotes() {
        assert_eq!(quoted_identifier("karibu_marketplace"), "\"karibu_marketplace\"");
        assert_eq!(quoted_identifier("odd\"name"), "\"odd\"\"name\"");
    }

    // Exercises the full edit-then-republish flow against a live database.
    // Skipped when DATABASE_URL is not set.
    #[actix_rt::test]
    async fn resubmission_refreshes_profile_without_resetting_status() {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            return;
        };
        let db = Database::connect(&url).await.expect("database connection");

        let id = Uuid::new_v4();
        let now = Utc::now();
        let first = db
            .create_application(submission(id, "Clifftop ceremonies", now))
            .await
            .expect("first submission");
        assert_eq!(first.status, ApplicationStatus::Pending);

        db.decide_application(id, ApplicationStatus::Approved)
            .await
            .expect("first approval");

        let resubmitted = db
            .create_application(submission(id, "Clifftop ceremonies and receptions", Utc::now()))
            .await
            .expect("resubmission");
        assert_eq!(resubmitted.status, ApplicationStatus::Approved);
        assert_eq!(resubmitted.submitted_at, first.submitted_at);
        assert_eq!(
            resubmitted.description.as_deref(),
            Some("Clifftop ceremonies and receptions")
        );

        db.decide_application(id, ApplicationStatus::Approved)
            .await
            .expect("second approval");

        let vendor = db
            .get_vendor(id)
            .await
            .expect("vendor lookup")
            .expect("published vendor");
        assert_eq!(
            vendor.description.as_deref(),
            Some("Clifftop ceremonies and receptions")
        );
    }
}
