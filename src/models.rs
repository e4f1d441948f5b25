use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use std::collections::BTreeMap;
use uuid::Uuid;
use validator::Validate;

// ============================================================================
// ENUMS
// ============================================================================

/// Authoritative application lifecycle status (also a Postgres enum)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "vendor_application_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    /// Transition table for decisions. Pending can move to either terminal
    /// state; re-approving an approved application is allowed so a publish
    /// can be repeated after edits. Nothing ever returns to Pending and
    /// rejected applications stay rejected.
    pub fn can_transition_to(self, target: ApplicationStatus) -> bool {
        matches!(
            (self, target),
            (ApplicationStatus::Pending, ApplicationStatus::Approved)
                | (ApplicationStatus::Pending, ApplicationStatus::Rejected)
                | (ApplicationStatus::Approved, ApplicationStatus::Approved)
        )
    }
}

/// Marketplace vendor category (closed set, also a Postgres enum)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "vendor_category", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VendorCategory {
    Venues,
    Catering,
    Photography,
    Videography,
    Planning,
    Florals,
    MusicDj,
    LiveBand,
    Beauty,
    Attire,
    Jewelry,
    Cakes,
    DecorRentals,
    Lighting,
    Transport,
    BoatCharters,
    Accommodation,
    Officiants,
    Stationery,
    FireworksEffects,
    Other,
}

/// How a vendor quotes its starting price (also a Postgres enum)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "vendor_pricing_model", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PricingModel {
    Flat,
    PerPerson,
    PerHour,
    Package,
    Custom,
}

/// What a stored blob is used for (also a Postgres enum)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "stored_file_category", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FileCategory {
    VerificationDocument,
    RealWorkImage,
}

// ============================================================================
// STRUCTURED SUB-DOCUMENTS (stored as JSONB)
// ============================================================================

/// Per-platform social links plus a freeform spillover
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SocialLinks {
    pub instagram: Option<String>,
    pub facebook: Option<String>,
    pub tiktok: Option<String>,
    pub website_label: Option<String>,
    pub other: Option<String>,
}

/// Category-specific questionnaire answers.
///
/// Categories with well-known questionnaires get typed variants; everything
/// else lands in `General` as plain key/value answers. The chosen variant is
/// not cross-checked against the application's category at write time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CategoryDetails {
    Venue {
        guest_capacity: Option<i32>,
        accommodation_rooms: Option<i32>,
        ceremony_spaces: Option<String>,
        in_house_catering: Option<bool>,
    },
    Catering {
        menu_summary: Option<String>,
        cuisine_styles: Vec<String>,
        dietary_options: Vec<String>,
        tasting_available: Option<bool>,
    },
    Photography {
        style: Option<String>,
        drone_coverage: Option<bool>,
        delivery_weeks: Option<i32>,
    },
    Music {
        ensemble_size: Option<i32>,
        genres: Vec<String>,
        equipment_provided: Option<bool>,
    },
    BoatCharter {
        fleet_size: Option<i32>,
        max_passengers: Option<i32>,
        sunset_cruises: Option<bool>,
    },
    Beauty {
        trial_available: Option<bool>,
        travels_to_venue: Option<bool>,
    },
    General {
        fields: BTreeMap<String, String>,
    },
}

impl Default for CategoryDetails {
    fn default() -> Self {
        CategoryDetails::General {
            fields: BTreeMap::new(),
        }
    }
}

// ============================================================================
// VENDOR APPLICATIONS (Verification Workflow)
// ============================================================================

/// Vendor listing application persisted in database
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct VendorApplication {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub business_name: String,
    pub category: VendorCategory,
    pub subcategories: Vec<String>,
    pub description: Option<String>,
    pub story: Option<String>,
    pub other_services: Option<String>,
    pub location: Option<String>,
    pub areas_served: Vec<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub social_links: Json<SocialLinks>,
    pub starting_price: Option<String>,
    pub pricing_model: Option<PricingModel>,
    pub price_includes: Option<String>,
    pub minimum_booking: Option<String>,
    pub advance_notice: Option<String>,
    pub setup_time: Option<String>,
    pub outdoor_capable: Option<bool>,
    pub destination_experience: Option<bool>,
    pub special_requirements: Option<String>,
    pub category_details: Json<CategoryDetails>,
    pub work_image_urls: Vec<String>,
    pub verification_document_url: Option<String>,
    pub terms_accepted: bool,
    pub terms_accepted_at: Option<DateTime<Utc>>,
    pub document_uploaded: bool,
    pub verified_by: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub admin_notes: Option<String>,
    pub checklist_complete: bool,
    pub status: ApplicationStatus,
    pub submitted_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Helper struct used when inserting a new application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVendorApplication {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub business_name: String,
    pub category: VendorCategory,
    pub subcategories: Vec<String>,
    pub description: Option<String>,
    pub story: Option<String>,
    pub other_services: Option<String>,
    pub location: Option<String>,
    pub areas_served: Vec<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub social_links: SocialLinks,
    pub starting_price: Option<String>,
    pub pricing_model: Option<PricingModel>,
    pub price_includes: Option<String>,
    pub minimum_booking: Option<String>,
    pub advance_notice: Option<String>,
    pub setup_time: Option<String>,
    pub outdoor_capable: Option<bool>,
    pub destination_experience: Option<bool>,
    pub special_requirements: Option<String>,
    pub category_details: CategoryDetails,
    pub work_image_urls: Vec<String>,
    pub verification_document_url: Option<String>,
    pub terms_accepted: bool,
    pub terms_accepted_at: Option<DateTime<Utc>>,
    pub status: ApplicationStatus,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// PUBLISHED VENDORS (Public Directory)
// ============================================================================

/// Published vendor row, keyed by the originating application id.
///
/// Verification metadata never appears here: the projection boundary is the
/// shape itself, not a field filter.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Vendor {
    pub id: Uuid,
    pub name: String,
    pub category: VendorCategory,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub location: Option<String>,
    pub price_range: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub social_links: Json<SocialLinks>,
    pub story: Option<String>,
    pub other_services: Option<String>,
    pub rating: f64,
    pub approved_at: DateTime<Utc>,
}

/// Public fields derived from an approved application, ready to upsert.
/// Rating is absent on purpose: the upsert keeps whatever rating the
/// existing row carries and new rows start at 0.0.
#[derive(Debug, Clone)]
pub struct VendorPublication {
    pub id: Uuid,
    pub name: String,
    pub category: VendorCategory,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub location: Option<String>,
    pub price_range: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub social_links: SocialLinks,
    pub story: Option<String>,
    pub other_services: Option<String>,
    pub approved_at: DateTime<Utc>,
}

impl VendorPublication {
    pub fn derive(application: &VendorApplication, approved_at: DateTime<Utc>) -> Self {
        Self {
            id: application.id,
            name: application.business_name.clone(),
            category: application.category,
            description: application.description.clone(),
            image_url: application.work_image_urls.first().cloned(),
            location: application.location.clone(),
            price_range: application
                .starting_price
                .as_deref()
                .map(str::trim)
                .filter(|price| !price.is_empty())
                .map(|price| format!("From {}", price)),
            email: application.email.clone(),
            phone: application.phone.clone(),
            website: application.website.clone(),
            social_links: application.social_links.0.clone(),
            story: application.story.clone(),
            other_services: application.other_services.clone(),
            approved_at,
        }
    }
}

pub const PLACEHOLDER_IMAGE_URL: &str = "/images/vendor-placeholder.jpg";
pub const DEFAULT_PRICE_RANGE: &str = "Contact for pricing";

/// Directory DTO returned by the public read path, with display defaults
/// applied for missing image and price range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorListing {
    pub id: Uuid,
    pub name: String,
    pub category: VendorCategory,
    pub description: Option<String>,
    pub image_url: String,
    pub location: Option<String>,
    pub price_range: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub social_links: SocialLinks,
    pub story: Option<String>,
    pub other_services: Option<String>,
    pub rating: f64,
    pub approved_at: DateTime<Utc>,
}

impl From<Vendor> for VendorListing {
    fn from(vendor: Vendor) -> Self {
        Self {
            id: vendor.id,
            name: vendor.name,
            category: vendor.category,
            description: vendor.description,
            image_url: vendor
                .image_url
                .unwrap_or_else(|| PLACEHOLDER_IMAGE_URL.to_string()),
            location: vendor.location,
            price_range: vendor
                .price_range
                .unwrap_or_else(|| DEFAULT_PRICE_RANGE.to_string()),
            email: vendor.email,
            phone: vendor.phone,
            website: vendor.website,
            social_links: vendor.social_links.0,
            story: vendor.story,
            other_services: vendor.other_services,
            rating: vendor.rating,
            approved_at: vendor.approved_at,
        }
    }
}

// ============================================================================
// STORED FILES (Document Store)
// ============================================================================

/// Immutable blob row; the payload lives inline as a data URL so application
/// and vendor rows only ever hold short reference URLs.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StoredFile {
    pub id: Uuid,
    pub category: FileCategory,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub data_url: String,
    pub created_at: DateTime<Utc>,
}

/// Helper struct used when inserting a new stored file
#[derive(Debug, Clone)]
pub struct NewStoredFile {
    pub id: Uuid,
    pub category: FileCategory,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub data_url: String,
}

pub fn encode_data_url(content_type: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        content_type,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

/// Split a `data:{mime};base64,{payload}` URL back into its content type and
/// raw bytes. Returns `None` for anything that is not a base64 data URL.
pub fn decode_data_url(data_url: &str) -> Option<(String, Vec<u8>)> {
    let rest = data_url.strip_prefix("data:")?;
    let (content_type, payload) = rest.split_once(";base64,")?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .ok()?;
    Some((content_type.to_string(), bytes))
}

// ============================================================================
// REQUEST/RESPONSE DTOs
// ============================================================================

/// API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: Utc::now(),
        }
    }
}

/// Drop empty entries and surrounding whitespace from a submitted list
pub fn normalize_list(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}

/// Payload sent by prospective vendors to submit an application.
///
/// File fields arrive as URLs: uploads go through the document store first.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitApplicationRequest {
    pub id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    #[validate(length(min = 1, max = 160))]
    pub business_name: String,
    pub category: VendorCategory,
    #[serde(default)]
    pub subcategories: Vec<String>,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    #[validate(length(max = 8000))]
    pub story: Option<String>,
    #[validate(length(max = 2000))]
    pub other_services: Option<String>,
    #[validate(length(max = 300))]
    pub location: Option<String>,
    #[serde(default)]
    pub areas_served: Vec<String>,
    pub phone: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 1024))]
    pub website: Option<String>,
    #[serde(default)]
    pub social_links: SocialLinks,
    #[validate(length(max = 120))]
    pub starting_price: Option<String>,
    pub pricing_model: Option<PricingModel>,
    #[validate(length(max = 2000))]
    pub price_includes: Option<String>,
    #[validate(length(max = 500))]
    pub minimum_booking: Option<String>,
    #[validate(length(max = 500))]
    pub advance_notice: Option<String>,
    #[validate(length(max = 500))]
    pub setup_time: Option<String>,
    pub outdoor_capable: Option<bool>,
    pub destination_experience: Option<bool>,
    #[validate(length(max = 2000))]
    pub special_requirements: Option<String>,
    #[serde(default)]
    pub category_details: CategoryDetails,
    #[serde(default)]
    pub work_image_urls: Vec<String>,
    #[validate(length(max = 1024))]
    pub verification_document_url: Option<String>,
    #[serde(default)]
    pub terms_accepted: bool,
    pub submitted_at: Option<DateTime<Utc>>,
}

impl SubmitApplicationRequest {
    pub fn into_new_application(self) -> NewVendorApplication {
        let now = Utc::now();
        let submitted_at = self.submitted_at.unwrap_or(now);
        let terms_accepted_at = self.terms_accepted.then_some(submitted_at);
        NewVendorApplication {
            id: self.id.unwrap_or_else(Uuid::new_v4),
            user_id: self.user_id,
            business_name: self.business_name,
            category: self.category,
            subcategories: normalize_list(self.subcategories),
            description: self.description,
            story: self.story,
            other_services: self.other_services,
            location: self.location,
            areas_served: normalize_list(self.areas_served),
            phone: self.phone,
            email: self.email,
            website: self.website,
            social_links: self.social_links,
            starting_price: self.starting_price,
            pricing_model: self.pricing_model,
            price_includes: self.price_includes,
            minimum_booking: self.minimum_booking,
            advance_notice: self.advance_notice,
            setup_time: self.setup_time,
            outdoor_capable: self.outdoor_capable,
            destination_experience: self.destination_experience,
            special_requirements: self.special_requirements,
            category_details: self.category_details,
            work_image_urls: normalize_list(self.work_image_urls),
            verification_document_url: self.verification_document_url,
            terms_accepted: self.terms_accepted,
            terms_accepted_at,
            status: ApplicationStatus::Pending,
            submitted_at,
            updated_at: now,
        }
    }
}

/// Summary returned to the submitter after a successful submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub id: Uuid,
    pub business_name: String,
    pub status: ApplicationStatus,
    pub submitted_at: DateTime<Utc>,
}

impl From<&VendorApplication> for SubmissionReceipt {
    fn from(application: &VendorApplication) -> Self {
        Self {
            id: application.id,
            business_name: application.business_name.clone(),
            status: application.status,
            submitted_at: application.submitted_at,
        }
    }
}

/// Partial update of verification metadata, sent by administrators.
/// Absent fields keep their stored values; the authoritative status is
/// untouched no matter what this carries.
#[derive(Debug, Deserialize, Validate)]
pub struct VerificationUpdateRequest {
    pub document_uploaded: Option<bool>,
    #[validate(length(min = 1, max = 160))]
    pub verified_by: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub checklist_complete: Option<bool>,
    #[validate(length(max = 8000))]
    pub admin_notes: Option<String>,
}

/// Final decision sent by administrators
#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub status: ApplicationStatus,
}

/// Request to upload a blob into the document store
#[derive(Debug, Deserialize, Validate)]
pub struct UploadFileRequest {
    pub category: FileCategory,
    #[validate(length(min = 1, max = 255))]
    pub file_name: String,
    #[validate(length(min = 3, max = 120))]
    pub content_type: String,
    #[validate(length(min = 1))]
    pub data_base64: String,
}

impl UploadFileRequest {
    /// Decode the payload to learn its byte size and re-wrap it as a
    /// self-describing data URL. Fails on malformed base64 or empty payloads.
    pub fn into_new_stored_file(self) -> Result<NewStoredFile, String> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(self.data_base64.as_bytes())
            .map_err(|_| "data_base64 is not valid base64".to_string())?;
        if bytes.is_empty() {
            return Err("file payload is empty".to_string());
        }
        let data_url = encode_data_url(&self.content_type, &bytes);
        Ok(NewStoredFile {
            id: Uuid::new_v4(),
            category: self.category,
            file_name: self.file_name,
            content_type: self.content_type,
            size_bytes: bytes.len() as i64,
            data_url,
        })
    }
}

/// Reference handed back after an upload, embeddable in application fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadFileResponse {
    pub id: Uuid,
    pub url: String,
    pub category: FileCategory,
    pub size_bytes: i64,
}

impl UploadFileResponse {
    pub fn for_file(file: &StoredFile) -> Self {
        Self {
            id: file.id,
            url: format!("/api/v1/files/{}", file.id),
            category: file.category,
            size_bytes: file.size_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;

    fn sample_request(name: &str) -> SubmitApplicationRequest {
        SubmitApplicationRequest {
            id: None,
            user_id: None,
            business_name: name.to_string(),
            category: VendorCategory::Venues,
            subcategories: vec!["Beachfront".into(), "  ".into(), "Garden".into()],
            description: Some("Cliff-top villas".into()),
            story: None,
            other_services: None,
            location: Some("Watamu, Kenya".into()),
            areas_served: vec!["Coast".into(), "".into()],
            phone: Some("+254 700 000000".into()),
            email: Some("bookings@example.com".into()),
            website: None,
            social_links: SocialLinks::default(),
            starting_price: Some("$2,500".into()),
            pricing_model: Some(PricingModel::Package),
            price_includes: None,
            minimum_booking: None,
            advance_notice: None,
            setup_time: None,
            outdoor_capable: Some(true),
            destination_experience: Some(true),
            special_requirements: None,
            category_details: CategoryDetails::Venue {
                guest_capacity: Some(120),
                accommodation_rooms: Some(14),
                ceremony_spaces: Some("Beach deck, lawn".into()),
                in_house_catering: Some(true),
            },
            work_image_urls: vec!["/api/v1/files/abc".into(), "".into()],
            verification_document_url: None,
            terms_accepted: true,
            submitted_at: None,
        }
    }

    fn stored_application(request: SubmitApplicationRequest) -> VendorApplication {
        let new = request.into_new_application();
        VendorApplication {
            id: new.id,
            user_id: new.user_id,
            business_name: new.business_name,
            category: new.category,
            subcategories: new.subcategories,
            description: new.description,
            story: new.story,
            other_services: new.other_services,
            location: new.location,
            areas_served: new.areas_served,
            phone: new.phone,
            email: new.email,
            website: new.website,
            social_links: Json(new.social_links),
            starting_price: new.starting_price,
            pricing_model: new.pricing_model,
            price_includes: new.price_includes,
            minimum_booking: new.minimum_booking,
            advance_notice: new.advance_notice,
            setup_time: new.setup_time,
            outdoor_capable: new.outdoor_capable,
            destination_experience: new.destination_experience,
            special_requirements: new.special_requirements,
            category_details: Json(new.category_details),
            work_image_urls: new.work_image_urls,
            verification_document_url: new.verification_document_url,
            terms_accepted: new.terms_accepted,
            terms_accepted_at: new.terms_accepted_at,
            document_uploaded: false,
            verified_by: None,
            verified_at: None,
            admin_notes: None,
            checklist_complete: false,
            status: new.status,
            submitted_at: new.submitted_at,
            approved_at: None,
            updated_at: new.updated_at,
        }
    }

    #[test]
    fn submission_defaults_to_pending_with_generated_id() {
        let new = sample_request("Coral Bay Villas").into_new_application();
        assert_eq!(new.status, ApplicationStatus::Pending);
        assert!(!new.id.is_nil());
        assert_eq!(new.subcategories, vec!["Beachfront", "Garden"]);
        assert_eq!(new.areas_served, vec!["Coast"]);
        assert_eq!(new.work_image_urls, vec!["/api/v1/files/abc"]);
    }

    #[test]
    fn caller_supplied_id_and_timestamp_are_honored() {
        let id = Uuid::new_v4();
        let submitted = Utc::now() - chrono::Duration::days(3);
        let mut request = sample_request("Sunset Dhow Cruises");
        request.id = Some(id);
        request.submitted_at = Some(submitted);
        let new = request.into_new_application();
        assert_eq!(new.id, id);
        assert_eq!(new.submitted_at, submitted);
    }

    #[test]
    fn terms_timestamp_only_recorded_when_accepted() {
        let accepted = sample_request("A").into_new_application();
        assert!(accepted.terms_accepted_at.is_some());

        let mut request = sample_request("B");
        request.terms_accepted = false;
        let declined = request.into_new_application();
        assert!(declined.terms_accepted_at.is_none());
    }

    #[test]
    fn transition_table_is_monotonic() {
        use ApplicationStatus::*;
        assert!(Pending.can_transition_to(Approved));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Approved.can_transition_to(Approved));
        assert!(!Approved.can_transition_to(Rejected));
        assert!(!Approved.can_transition_to(Pending));
        assert!(!Rejected.can_transition_to(Approved));
        assert!(!Rejected.can_transition_to(Rejected));
        assert!(!Rejected.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn publication_derives_image_and_price_label() {
        let application = stored_application(sample_request("Coral Bay Villas"));
        let approved_at = Utc::now();
        let publication = VendorPublication::derive(&application, approved_at);
        assert_eq!(publication.name, "Coral Bay Villas");
        assert_eq!(publication.image_url.as_deref(), Some("/api/v1/files/abc"));
        assert_eq!(publication.price_range.as_deref(), Some("From $2,500"));
        assert_eq!(publication.approved_at, approved_at);
    }

    #[test]
    fn publication_leaves_missing_fields_unset() {
        let mut request = sample_request("Sunset Dhow Cruises");
        request.work_image_urls = Vec::new();
        request.starting_price = Some("   ".into());
        let application = stored_application(request);
        let publication = VendorPublication::derive(&application, Utc::now());
        assert!(publication.image_url.is_none());
        assert!(publication.price_range.is_none());
    }

    #[test]
    fn listing_applies_display_defaults() {
        let listing: VendorListing = Vendor {
            id: Uuid::new_v4(),
            name: "Sunset Dhow Cruises".into(),
            category: VendorCategory::BoatCharters,
            description: None,
            image_url: None,
            location: None,
            price_range: None,
            email: None,
            phone: None,
            website: None,
            social_links: Json(SocialLinks::default()),
            story: None,
            other_services: None,
            rating: 0.0,
            approved_at: Utc::now(),
        }
        .into();
        assert_eq!(listing.image_url, PLACEHOLDER_IMAGE_URL);
        assert_eq!(listing.price_range, DEFAULT_PRICE_RANGE);
        assert_eq!(listing.rating, 0.0);
    }

    #[test]
    fn listing_serialization_has_no_verification_fields() {
        let listing: VendorListing = Vendor {
            id: Uuid::new_v4(),
            name: "Coral Bay Villas".into(),
            category: VendorCategory::Venues,
            description: None,
            image_url: Some("/api/v1/files/abc".into()),
            location: None,
            price_range: Some("From $2,500".into()),
            email: None,
            phone: None,
            website: None,
            social_links: Json(SocialLinks::default()),
            story: None,
            other_services: None,
            rating: 4.5,
            approved_at: Utc::now(),
        }
        .into();
        let value = serde_json::to_value(&listing).unwrap();
        let object = value.as_object().unwrap();
        for hidden in [
            "verified_by",
            "verified_at",
            "admin_notes",
            "document_uploaded",
            "checklist_complete",
            "status",
        ] {
            assert!(!object.contains_key(hidden), "unexpected field {hidden}");
        }
        assert_eq!(object["rating"], serde_json::json!(4.5));
    }

    #[test]
    fn data_url_round_trip() {
        let bytes = b"%PDF-1.7 fake document".to_vec();
        let url = encode_data_url("application/pdf", &bytes);
        let (content_type, decoded) = decode_data_url(&url).unwrap();
        assert_eq!(content_type, "application/pdf");
        assert_eq!(decoded, bytes);
    }

    #[test]
    fn decode_rejects_non_data_urls() {
        assert!(decode_data_url("https://example.com/file.pdf").is_none());
        assert!(decode_data_url("data:application/pdf;base64,@@@").is_none());
        assert!(decode_data_url("data:text/plain,hello").is_none());
    }

    #[test]
    fn upload_request_records_decoded_size() {
        let request = UploadFileRequest {
            category: FileCategory::VerificationDocument,
            file_name: "license.pdf".into(),
            content_type: "application/pdf".into(),
            data_base64: base64::engine::general_purpose::STANDARD.encode(b"hello world"),
        };
        let file = request.into_new_stored_file().unwrap();
        assert_eq!(file.size_bytes, 11);
        assert!(file.data_url.starts_with("data:application/pdf;base64,"));
    }

    #[test]
    fn upload_request_rejects_bad_payloads() {
        let bad = UploadFileRequest {
            category: FileCategory::RealWorkImage,
            file_name: "photo.jpg".into(),
            content_type: "image/jpeg".into(),
            data_base64: "not base64 at all!".into(),
        };
        assert!(bad.into_new_stored_file().is_err());
    }

    #[test]
    fn category_details_serializes_tagged() {
        let details = CategoryDetails::Catering {
            menu_summary: Some("Coastal Swahili menus".into()),
            cuisine_styles: vec!["Swahili".into(), "Mediterranean".into()],
            dietary_options: vec!["Vegan".into()],
            tasting_available: Some(true),
        };
        let value = serde_json::to_value(&details).unwrap();
        assert_eq!(value["kind"], "catering");
        let back: CategoryDetails = serde_json::from_value(value).unwrap();
        assert_eq!(back, details);
    }
}
