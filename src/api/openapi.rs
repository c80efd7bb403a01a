use super::handlers::{auth, health};
use utoipa::openapi::{Contact, InfoBuilder, License, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    // Reuse the same router wiring and only return the generated OpenAPI spec.
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Build the router that also drives the `OpenAPI` document.
///
/// Add new endpoints here via `.routes(routes!(...))` so they are both served
/// and included in the generated `OpenAPI` spec.
/// Routes added outside (like `/`) are intentionally not documented.
pub(crate) fn api_router() -> OpenApiRouter {
    let mut aliro_tag = Tag::new("aliro");
    aliro_tag.description = Some("Challenge-based authentication API".to_string());

    let mut auth_tag = Tag::new("auth");
    auth_tag.description = Some("Login, registration, and password reset".to_string());

    let mut account_tag = Tag::new("account");
    account_tag.description = Some("Authenticated account management".to_string());

    let mut openapi = cargo_openapi();
    openapi.tags = Some(vec![aliro_tag, auth_tag, account_tag]);

    // `routes!` reads #[utoipa::path] to bind HTTP method + path and add the route to OpenAPI.
    OpenApiRouter::with_openapi(openapi)
        .routes(routes!(health::health))
        .routes(routes!(auth::login::login))
        .routes(routes!(auth::login::login_verify))
        .routes(routes!(auth::register::register))
        .routes(routes!(auth::register::register_verify))
        .routes(routes!(auth::password::password_reset))
        .routes(routes!(auth::password::password_reset_verify))
        .routes(routes!(auth::resend::resend_code))
        .routes(routes!(auth::session::session))
        .routes(routes!(auth::session::logout))
        .routes(routes!(auth::session::logout_all))
        .routes(routes!(auth::session::sessions_overview))
        .routes(routes!(auth::account::me))
        .routes(routes!(auth::account::password_change))
        .routes(routes!(auth::contact::change_email))
        .routes(routes!(auth::contact::change_email_verify))
        .routes(routes!(auth::contact::change_email_cancel))
        .routes(routes!(auth::contact::change_phone))
        .routes(routes!(auth::contact::change_phone_verify))
        .routes(routes!(auth::contact::change_phone_cancel))
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    // Use Cargo.toml metadata instead of the utoipa-axum crate info defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = cargo_license();

    OpenApiBuilder::new().info(info).build()
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let authors = env!("CARGO_PKG_AUTHORS");
    let primary = authors.split(';').next().map(str::trim)?;
    if primary.is_empty() {
        return None;
    }

    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    if let Some(start) = author.find('<') {
        let name = author[..start].trim();
        let email = author[start + 1..].trim_end_matches('>').trim();
        let name = if name.is_empty() { None } else { Some(name) };
        let email = if email.is_empty() { None } else { Some(email) };
        (name, email)
    } else {
        let name = author.trim();
        (if name.is_empty() { None } else { Some(name) }, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_info_from_cargo() {
        let spec = openapi();
        assert_eq!(spec.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(spec.info.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(
            spec.info.description.as_deref(),
            Some(env!("CARGO_PKG_DESCRIPTION"))
        );

        let contact = spec.info.contact;
        assert!(contact.is_some());
        if let Some(contact) = contact {
            assert_eq!(contact.name.as_deref(), Some("Team Aliro"));
            assert_eq!(contact.email.as_deref(), Some("team@aliro.dev"));
        }

        let license = spec.info.license;
        assert!(license.is_some());
        if let Some(license) = license {
            assert_eq!(license.name, "BSD-3-Clause");
            assert_eq!(license.identifier.as_deref(), Some("BSD-3-Clause"));
        }
    }

    #[test]
    fn openapi_tags_and_paths() {
        let spec = openapi();
        let tags = spec.tags.clone().unwrap_or_default();
        assert!(tags.iter().any(|tag| tag.name == "aliro"));
        assert!(tags.iter().any(|tag| tag.name == "auth"));
        assert!(tags.iter().any(|tag| tag.name == "account"));
        for path in [
            "/v1/auth/login",
            "/v1/auth/login/verify",
            "/v1/auth/register",
            "/v1/auth/register/verify",
            "/v1/auth/password/reset",
            "/v1/auth/password/reset/verify",
            "/v1/auth/challenge/resend",
            "/v1/auth/session",
            "/v1/auth/logout",
            "/v1/auth/logout/all",
            "/v1/account/sessions",
            "/v1/account/me",
            "/v1/account/password/change",
            "/v1/account/email/change",
            "/v1/account/email/change/verify",
            "/v1/account/email/change/cancel",
            "/v1/account/phone/change",
            "/v1/account/phone/change/verify",
            "/v1/account/phone/change/cancel",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing path: {path}");
        }
    }
}
