//! Integration tests for the health endpoint.

use color_eyre::Result;
use pretty_assertions::assert_eq as pretty_assert_eq;
use reqwest::StatusCode;

use crate::helpers::TestFixture;

#[test_log::test(tokio::test)]
async fn ping() -> Result<()> {
    let fixture = TestFixture::spawn().await?;
    fixture.client_alice.ping().await?;
    Ok(())
}

#[test_log::test(tokio::test)]
async fn health_needs_no_session() -> Result<()> {
    let fixture = TestFixture::spawn().await?;
    let response = fixture
        .http()?
        .get(fixture.url("api/v1/health")?)
        .send()
        .await?;

    pretty_assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    Ok(())
}

#[test_log::test(tokio::test)]
async fn echoes_request_id() -> Result<()> {
    let fixture = TestFixture::spawn().await?;
    let response = fixture
        .http()?
        .get(fixture.url("api/v1/health")?)
        .header("x-request-id", "req-42")
        .send()
        .await?;

    pretty_assert_eq!(
        response.headers().get("x-request-id").map(|v| v.as_bytes()),
        Some("req-42".as_bytes())
    );
    Ok(())
}
