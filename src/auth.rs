use actix_web::{HttpRequest, HttpResponse};
use std::str::FromStr;
use uuid::Uuid;

use crate::models::ApiResponse;

/// Role tag assigned by the upstream session gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Couple,
    Vendor,
    Admin,
}

impl FromStr for Role {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "couple" => Ok(Role::Couple),
            "vendor" => Ok(Role::Vendor),
            "admin" => Ok(Role::Admin),
            _ => Err(()),
        }
    }
}

/// Authenticated caller identity, resolved upstream and forwarded as
/// `X-User-Id` / `X-User-Role` headers.
#[derive(Debug, Clone, Copy)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

fn header_value<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
    req.headers().get(name).and_then(|h| h.to_str().ok())
}

/// Resolve the caller's principal from the gateway headers, if present.
/// Malformed values are treated the same as an anonymous request.
pub fn principal(req: &HttpRequest) -> Option<Principal> {
    let user_id = header_value(req, "X-User-Id").and_then(|s| Uuid::parse_str(s).ok())?;
    let role = header_value(req, "X-User-Role").and_then(|s| s.parse::<Role>().ok())?;
    Some(Principal { user_id, role })
}

/// Require any authenticated caller; refuses with 401 otherwise
pub fn require_authenticated(req: &HttpRequest) -> Result<Principal, HttpResponse> {
    principal(req).ok_or_else(|| {
        HttpResponse::Unauthorized().json(ApiResponse::<()>::error("Authentication required".into()))
    })
}

/// Require an administrator caller. The refusal message carries no detail
/// beyond the access requirement.
pub fn require_admin(req: &HttpRequest) -> Result<Principal, HttpResponse> {
    let principal = require_authenticated(req)?;
    if !principal.is_admin() {
        return Err(HttpResponse::Forbidden()
            .json(ApiResponse::<()>::error("Admin access required".into())));
    }
    Ok(principal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn request_with(user_id: Option<&str>, role: Option<&str>) -> HttpRequest {
        let mut builder = TestRequest::default();
        if let Some(id) = user_id {
            builder = builder.insert_header(("X-User-Id", id));
        }
        if let Some(role) = role {
            builder = builder.insert_header(("X-User-Role", role));
        }
        builder.to_http_request()
    }

    #[test]
    fn parses_admin_principal() {
        let id = Uuid::new_v4();
        let req = request_with(Some(&id.to_string()), Some("admin"));
        let principal = principal(&req).unwrap();
        assert_eq!(principal.user_id, id);
        assert!(principal.is_admin());
    }

    #[test]
    fn missing_or_malformed_headers_are_anonymous() {
        assert!(principal(&request_with(None, None)).is_none());
        assert!(principal(&request_with(Some("not-a-uuid"), Some("admin"))).is_none());
        let id = Uuid::new_v4().to_string();
        assert!(principal(&request_with(Some(&id), Some("superuser"))).is_none());
        assert!(principal(&request_with(Some(&id), None)).is_none());
    }

    #[test]
    fn non_admin_roles_are_refused_by_require_admin() {
        let id = Uuid::new_v4().to_string();
        for role in ["couple", "vendor"] {
            let req = request_with(Some(&id), Some(role));
            assert!(require_admin(&req).is_err());
            assert!(require_authenticated(&req).is_ok());
        }
    }
}
