use super::handlers::{auth, engagement, health, leads};
use utoipa::openapi::{InfoBuilder, License, OpenApiBuilder, Tag};
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
/// Routes added outside (like `/` or `OPTIONS /health`) are intentionally not documented.
pub(crate) fn api_router() -> OpenApiRouter {
    let mut vitrino_tag = Tag::new("vitrino");
    vitrino_tag.description = Some("Investor portal access and engagement API".to_string());

    let mut auth_tag = Tag::new("auth");
    auth_tag.description = Some("Magic-link and one-time-code sign-in".to_string());

    let mut engagement_tag = Tag::new("engagement");
    engagement_tag.description = Some("Viewer sessions and engagement events".to_string());

    let mut leads_tag = Tag::new("leads");
    leads_tag.description = Some("Meeting and data-room requests".to_string());

    let base = OpenApiBuilder::from(cargo_openapi())
        .tags(Some(vec![vitrino_tag, auth_tag, engagement_tag, leads_tag]))
        .build();

    // `routes!` reads #[utoipa::path] to bind HTTP method + path and add the route to OpenAPI.
    OpenApiRouter::with_openapi(base)
        .routes(routes!(health::health))
        .routes(routes!(auth::magic_link::magic_link))
        .routes(routes!(auth::verify::verify_otp))
        .routes(routes!(auth::verify::verify_token))
        .routes(routes!(auth::session::session))
        .routes(routes!(auth::session::logout))
        .routes(routes!(engagement::sessions::create_session))
        .routes(routes!(engagement::events::section_view))
        .routes(routes!(engagement::events::cta_click))
        .routes(routes!(leads::meeting::create_meeting_request))
        .routes(routes!(leads::data_room::create_data_room_request))
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    // Use Cargo.toml metadata instead of the utoipa-axum crate info defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.license = cargo_license();

    OpenApiBuilder::new().info(info).build()
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
