//! Documented API surface checks.
//!
//! The router and the OpenAPI document are generated from the same wiring,
//! so asserting against the generated spec pins the served surface: every
//! operation the portal frontend depends on must be present with the right
//! method.

use vitrino::api::openapi;

#[test]
fn all_portal_routes_are_registered() {
    let spec = openapi();
    let paths = &spec.paths.paths;

    for path in [
        "/health",
        "/v1/auth/magic-link",
        "/v1/auth/verify-otp",
        "/v1/auth/verify-token",
        "/v1/auth/session",
        "/v1/auth/logout",
        "/v1/engagement/sessions",
        "/v1/engagement/section-views",
        "/v1/engagement/cta-clicks",
        "/v1/leads/meeting-requests",
        "/v1/leads/data-room-requests",
    ] {
        assert!(paths.contains_key(path), "missing route: {path}");
    }
}

#[test]
fn session_is_get_everything_else_posts() {
    let spec = openapi();
    let paths = &spec.paths.paths;

    let session = paths.get("/v1/auth/session").expect("session route");
    assert!(session.get.is_some());
    assert!(session.post.is_none());

    for path in [
        "/v1/auth/magic-link",
        "/v1/auth/verify-otp",
        "/v1/auth/verify-token",
        "/v1/auth/logout",
        "/v1/engagement/sessions",
        "/v1/engagement/section-views",
        "/v1/engagement/cta-clicks",
        "/v1/leads/meeting-requests",
        "/v1/leads/data-room-requests",
    ] {
        let item = paths.get(path).expect(path);
        assert!(item.post.is_some(), "expected POST on {path}");
        assert!(item.get.is_none(), "unexpected GET on {path}");
    }
}

#[test]
fn health_is_get() {
    let spec = openapi();
    let health = spec.paths.paths.get("/health").expect("health route");
    assert!(health.get.is_some());
}
