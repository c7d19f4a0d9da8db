//! Integration tests for /user endpoints.

use clients::switchyard::v1::{
    ChangeOrganizationRequest, ChangeOrganizationResponse, ErrorResponse, OrganizationId,
    SwitchOutcome,
};
use color_eyre::{Result, eyre::OptionExt};
use pretty_assertions::assert_eq as pretty_assert_eq;
use reqwest::{
    StatusCode,
    header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
};
use serde_json::{Value, json};
use switchyard::redirect::RedirectPolicy;
use time::Duration;

use crate::helpers::TestFixture;

const CHANGE: &str = "api/v1/user/change-current-organization";
const CURRENT: &str = "api/v1/user/current-organization";

fn request(id: &str, redirect_to: Option<&str>) -> ChangeOrganizationRequest {
    ChangeOrganizationRequest::builder()
        .organization_id(id)
        .maybe_redirect_to(redirect_to)
        .build()
}

#[test_log::test(tokio::test)]
async fn redirects_with_cookie() -> Result<()> {
    let fixture = TestFixture::spawn().await?;
    let outcome = fixture
        .client_alice
        .change_current_organization(&request("org_acme", Some("/assets")))
        .await?;

    match outcome {
        SwitchOutcome::Redirected { location, cookie } => {
            pretty_assert_eq!(location, "/assets");
            assert!(cookie.value().ends_with("org_acme"));
        }
        other => panic!("expected redirect, got {other:?}"),
    }
    Ok(())
}

#[test_log::test(tokio::test)]
async fn acknowledges_without_redirect() -> Result<()> {
    let fixture = TestFixture::spawn().await?;
    let outcome = fixture
        .client_alice
        .change_current_organization(&request("org_acme", None))
        .await?;

    match outcome {
        SwitchOutcome::Acknowledged { response, .. } => {
            pretty_assert_eq!(response, ChangeOrganizationResponse::success("org_acme"));
        }
        other => panic!("expected acknowledgment, got {other:?}"),
    }
    Ok(())
}

#[test_log::test(tokio::test)]
async fn json_body_shape() -> Result<()> {
    let fixture = TestFixture::spawn().await?;
    let response = fixture
        .http()?
        .post(fixture.url(CHANGE)?)
        .header(COOKIE, fixture.alice_cookie()?)
        .form(&[("organizationId", "org_acme")])
        .send()
        .await?;

    pretty_assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response
        .headers()
        .get(SET_COOKIE)
        .ok_or_eyre("missing set-cookie")?
        .to_str()?
        .to_string();
    assert!(set_cookie.starts_with("selected-organization-id="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));
    assert!(set_cookie.contains("Path=/"));

    let body = response.json::<Value>().await?;
    pretty_assert_eq!(body, json!({ "success": true, "organizationId": "org_acme" }));
    Ok(())
}

#[test_log::test(tokio::test)]
async fn unsafe_redirect_is_neutralized() -> Result<()> {
    let fixture = TestFixture::spawn().await?;

    for target in ["https://evil.example", "//evil.example", "/\\evil.example", "  /assets"] {
        let outcome = fixture
            .client_alice
            .change_current_organization(&request("org_acme", Some(target)))
            .await?;

        match outcome {
            SwitchOutcome::Redirected { location, .. } => {
                pretty_assert_eq!(location, "/", "target {target:?}")
            }
            other => panic!("expected redirect for {target:?}, got {other:?}"),
        }
    }
    Ok(())
}

#[test_log::test(tokio::test)]
async fn unsafe_redirect_uses_configured_default() -> Result<()> {
    let fixture = TestFixture::spawn_with(RedirectPolicy::new("/dashboard")?).await?;
    let outcome = fixture
        .client_alice
        .change_current_organization(&request("org_acme", Some("https://evil.example")))
        .await?;

    match outcome {
        SwitchOutcome::Redirected { location, .. } => pretty_assert_eq!(location, "/dashboard"),
        other => panic!("expected redirect, got {other:?}"),
    }
    Ok(())
}

#[test_log::test(tokio::test)]
async fn missing_organization_is_rejected() -> Result<()> {
    let fixture = TestFixture::spawn().await?;
    let response = fixture
        .http()?
        .post(fixture.url(CHANGE)?)
        .header(COOKIE, fixture.alice_cookie()?)
        .form(&[("redirectTo", "/assets")])
        .send()
        .await?;

    pretty_assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().get(SET_COOKIE).is_none());
    assert!(response.headers().get(LOCATION).is_none());

    let request_id = response
        .headers()
        .get("x-request-id")
        .ok_or_eyre("missing request id")?
        .to_str()?
        .to_string();
    let body = response.json::<ErrorResponse>().await?;
    pretty_assert_eq!(body.error.message, "The request is invalid.");
    pretty_assert_eq!(body.error.label.as_deref(), Some("Request validation"));
    pretty_assert_eq!(body.error.trace_id.as_deref(), Some(request_id.as_str()));

    let data = body.error.additional_data.ok_or_eyre("missing data")?;
    pretty_assert_eq!(data["validationErrors"], json!({ "organizationId": "Required" }));
    pretty_assert_eq!(
        data["userId"],
        json!(fixture.session_alice.user_id.as_uuid().to_string())
    );
    Ok(())
}

#[test_log::test(tokio::test)]
async fn empty_organization_is_opaque() -> Result<()> {
    let fixture = TestFixture::spawn().await?;

    for (sent, id) in [("", ""), (" ", " ")] {
        let response = fixture
            .http()?
            .post(fixture.url(CHANGE)?)
            .header(COOKIE, fixture.alice_cookie()?)
            .form(&[("organizationId", sent)])
            .send()
            .await?;

        pretty_assert_eq!(response.status(), StatusCode::OK, "id {sent:?}");
        let set_cookie = response
            .headers()
            .get(SET_COOKIE)
            .ok_or_eyre("missing set-cookie")?
            .to_str()?;
        assert!(set_cookie.starts_with("selected-organization-id="));

        let body = response.json::<Value>().await?;
        pretty_assert_eq!(body, json!({ "success": true, "organizationId": id }));
    }
    Ok(())
}

#[test_log::test(tokio::test)]
async fn same_origin_dots_are_kept() -> Result<()> {
    let fixture = TestFixture::spawn().await?;
    let target = "/reports?range=2024-01..2024-03";
    let outcome = fixture
        .client_alice
        .change_current_organization(&request("org_acme", Some(target)))
        .await?;

    match outcome {
        SwitchOutcome::Redirected { location, .. } => pretty_assert_eq!(location, target),
        other => panic!("expected redirect, got {other:?}"),
    }
    Ok(())
}

#[test_log::test(tokio::test)]
async fn non_form_body_is_rejected() -> Result<()> {
    let fixture = TestFixture::spawn().await?;
    let response = fixture
        .http()?
        .post(fixture.url(CHANGE)?)
        .header(COOKIE, fixture.alice_cookie()?)
        .header(CONTENT_TYPE, "application/json")
        .body(r#"{"organizationId":"org_acme"}"#)
        .send()
        .await?;

    pretty_assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(response.headers().get(SET_COOKIE).is_none());
    let body = response.json::<ErrorResponse>().await?;
    assert!(body.error.trace_id.is_some());
    Ok(())
}

#[test_log::test(tokio::test)]
async fn requires_session() -> Result<()> {
    let fixture = TestFixture::spawn().await?;
    let response = fixture
        .http()?
        .post(fixture.url(CHANGE)?)
        .form(&[("organizationId", "org_acme")])
        .send()
        .await?;

    pretty_assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(SET_COOKIE).is_none());
    let body = response.json::<ErrorResponse>().await?;
    pretty_assert_eq!(body.error.label.as_deref(), Some("Auth"));
    Ok(())
}

#[test_log::test(tokio::test)]
async fn rejects_tampered_session() -> Result<()> {
    let fixture = TestFixture::spawn().await?;
    let token = fixture.issue_session(Duration::hours(1))?;
    let mut tampered = token.expose().to_string();
    tampered.push('x');

    let client = fixture.client_with_token(tampered)?;
    let error = client
        .change_current_organization(&request("org_acme", None))
        .await
        .expect_err("tampered session must be rejected");
    assert!(
        error.to_string().contains("401"),
        "unexpected error: {error:?}"
    );
    Ok(())
}

#[test_log::test(tokio::test)]
async fn rejects_expired_session() -> Result<()> {
    let fixture = TestFixture::spawn().await?;
    let token = fixture.issue_session(Duration::seconds(-1))?;

    let response = fixture
        .http()?
        .post(fixture.url(CHANGE)?)
        .header(COOKIE, format!("__session={}", token.expose()))
        .form(&[("organizationId", "org_acme")])
        .send()
        .await?;

    pretty_assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(SET_COOKIE).is_none());
    Ok(())
}

#[test_log::test(tokio::test)]
async fn selection_round_trips() -> Result<()> {
    let fixture = TestFixture::spawn().await?;
    let client = &fixture.client_alice;

    pretty_assert_eq!(client.current_organization(None).await?, None);

    let id = "org with spaces; and=symbols";
    let outcome = client
        .change_current_organization(&request(id, Some("/settings")))
        .await?;
    let current = client.current_organization(Some(outcome.cookie())).await?;
    pretty_assert_eq!(current, Some(OrganizationId::new(id)));

    Ok(())
}

#[test_log::test(tokio::test)]
async fn selection_is_deterministic() -> Result<()> {
    let fixture = TestFixture::spawn().await?;
    let client = &fixture.client_alice;

    let first = client
        .change_current_organization(&request("org_acme", None))
        .await?;
    let second = client
        .change_current_organization(&request("org_acme", Some("/")))
        .await?;
    pretty_assert_eq!(first.cookie(), second.cookie());

    let other = client
        .change_current_organization(&request("org_widget", None))
        .await?;
    assert_ne!(first.cookie(), other.cookie());
    Ok(())
}

#[test_log::test(tokio::test)]
async fn forged_selection_reads_as_none() -> Result<()> {
    let fixture = TestFixture::spawn().await?;
    let response = fixture
        .http()?
        .get(fixture.url(CURRENT)?)
        .header(
            COOKIE,
            format!("{}; selected-organization-id=org_acme", fixture.alice_cookie()?),
        )
        .send()
        .await?;

    pretty_assert_eq!(response.status(), StatusCode::OK);
    let body = response.json::<Value>().await?;
    pretty_assert_eq!(body, json!({ "organizationId": null }));
    Ok(())
}

#[test_log::test(tokio::test)]
async fn issued_cookie_verifies_with_server_key() -> Result<()> {
    let fixture = TestFixture::spawn().await?;
    let response = fixture
        .http()?
        .post(fixture.url(CHANGE)?)
        .header(COOKIE, fixture.alice_cookie()?)
        .form(&[("organizationId", "org_acme")])
        .send()
        .await?;
    let set_cookie = response
        .headers()
        .get(SET_COOKIE)
        .ok_or_eyre("missing set-cookie")?
        .to_str()?;
    let cookie = clients::switchyard::v1::SelectionCookie::parse(set_cookie)?;

    let mut headers = http::HeaderMap::new();
    headers.insert(http::header::COOKIE, cookie.to_request_pair().parse()?);
    pretty_assert_eq!(
        fixture.selection.parse(&headers),
        Some(OrganizationId::new("org_acme"))
    );
    Ok(())
}
