//! Prediction protocol tests against a mock server

mod common;

use common::{prediction, succeeded, MockServerFixture};
use panelkit::{
    CostTier, Error, ImageGenerationParams, ImageProvider, JobStatus, ProviderRegistry,
    SupportsBackgroundRemoval, SupportsUpscale,
};

#[tokio::test]
async fn test_submit_returns_finished_prediction() {
    let mut fixture = MockServerFixture::new().await;
    let submit = fixture
        .mock_submit(201, &succeeded("p-1", "https://cdn.example/p-1.png"), 1)
        .await;
    let provider = fixture.provider(5);

    let params = ImageGenerationParams::new("a robot tending a garden").seed(7);
    let result = provider.generate_image(&params).await.unwrap();

    submit.assert_async().await;
    assert_eq!(result.id, "p-1");
    assert_eq!(result.url, "https://cdn.example/p-1.png");
    assert_eq!(result.prompt, "a robot tending a garden");
    assert_eq!(result.seed, Some(7));
    assert_eq!(result.provider_id, "replicate");
    assert_eq!(result.model, "black-forest-labs/flux-schnell");
}

#[tokio::test]
async fn test_polls_until_succeeded() {
    let mut fixture = MockServerFixture::new().await;
    let _submit = fixture.mock_submit(201, &prediction("p-2", "starting"), 1).await;
    let status = fixture
        .mock_status("p-2", 200, &succeeded("p-2", "https://cdn.example/p-2.webp"), 1)
        .await;
    let provider = fixture.provider(5);

    let result = provider
        .generate_image(&ImageGenerationParams::new("a cat astronaut"))
        .await
        .unwrap();

    status.assert_async().await;
    assert_eq!(result.url, "https://cdn.example/p-2.webp");
}

#[tokio::test]
async fn test_failed_job_carries_remote_message() {
    let mut fixture = MockServerFixture::new().await;
    let _submit = fixture.mock_submit(201, &prediction("p-3", "processing"), 1).await;
    let _status = fixture
        .mock_status(
            "p-3",
            200,
            r#"{"id":"p-3","status":"failed","output":null,"error":"CUDA out of memory"}"#,
            1,
        )
        .await;
    let provider = fixture.provider(5);

    let err = provider
        .generate_image(&ImageGenerationParams::new("x"))
        .await
        .unwrap_err();
    match err {
        Error::Generation { message, job_id } => {
            assert_eq!(message, "CUDA out of memory");
            assert_eq!(job_id.as_deref(), Some("p-3"));
        }
        other => panic!("expected generation error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_failed_job_without_message_uses_fallback() {
    let mut fixture = MockServerFixture::new().await;
    let _submit = fixture
        .mock_submit(201, &prediction("p-4", "failed"), 1)
        .await;
    let provider = fixture.provider(5);

    let err = provider
        .generate_image(&ImageGenerationParams::new("x"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Image generation failed"));
}

#[tokio::test]
async fn test_canceled_job_is_reported() {
    let mut fixture = MockServerFixture::new().await;
    let _submit = fixture.mock_submit(201, &prediction("p-5", "processing"), 1).await;
    let _status = fixture
        .mock_status("p-5", 200, &prediction("p-5", "canceled"), 1)
        .await;
    let provider = fixture.provider(5);

    let err = provider
        .generate_image(&ImageGenerationParams::new("x"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Generation { .. }));
    assert!(err.to_string().contains("canceled"));
}

#[tokio::test]
async fn test_poll_budget_exhaustion_times_out() {
    let mut fixture = MockServerFixture::new().await;
    let _submit = fixture.mock_submit(201, &prediction("p-6", "starting"), 1).await;
    let status = fixture
        .mock_status("p-6", 200, &prediction("p-6", "processing"), 3).await;
    let provider = fixture.provider(3);

    let err = provider
        .generate_image(&ImageGenerationParams::new("x"))
        .await
        .unwrap_err();

    status.assert_async().await;
    match err {
        Error::Timeout { attempts, .. } => assert_eq!(attempts, 3),
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn test_submit_error_uses_remote_detail() {
    let mut fixture = MockServerFixture::new().await;
    let _submit = fixture
        .mock_submit(422, r#"{"title":"Invalid","detail":"Invalid version or not permitted"}"#, 1)
        .await;
    let provider = fixture.provider(5);

    let err = provider
        .generate_image(&ImageGenerationParams::new("x"))
        .await
        .unwrap_err();
    match err {
        Error::Remote { status, message } => {
            assert_eq!(status, 422);
            assert_eq!(message, "Invalid version or not permitted");
        }
        other => panic!("expected remote error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_poll_http_error_propagates_without_retry() {
    let mut fixture = MockServerFixture::new().await;
    let _submit = fixture.mock_submit(201, &prediction("p-7", "starting"), 1).await;
    let status = fixture.mock_status("p-7", 500, "", 1).await;
    let provider = fixture.provider(10);

    let err = provider
        .generate_image(&ImageGenerationParams::new("x"))
        .await
        .unwrap_err();

    status.assert_async().await;
    match err {
        Error::Remote { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "Failed to check generation status");
        }
        other => panic!("expected remote error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_blank_prompt_never_reaches_server() {
    let mut fixture = MockServerFixture::new().await;
    let submit = fixture
        .mock_submit(201, &succeeded("p-8", "https://x"), 0).await;
    let provider = fixture.provider(5);

    let err = provider
        .generate_image(&ImageGenerationParams::new(""))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));
    submit.assert_async().await;
}

#[tokio::test]
async fn test_check_status_and_cancel() {
    let mut fixture = MockServerFixture::new().await;
    let _status = fixture
        .mock_status("p-9", 200, &prediction("p-9", "processing"), 1)
        .await;
    let cancel = fixture.mock_cancel("p-9", 200).await;
    let provider = fixture.provider(5);

    assert_eq!(provider.check_status("p-9").await.unwrap(), JobStatus::Processing);
    provider.cancel_generation("p-9").await.unwrap();
    cancel.assert_async().await;
}

#[tokio::test]
async fn test_cancel_unknown_job_is_remote_error() {
    let mut fixture = MockServerFixture::new().await;
    let _cancel = fixture.mock_cancel("missing", 404).await;
    let provider = fixture.provider(5);

    let err = provider.cancel_generation("missing").await.unwrap_err();
    assert!(matches!(err, Error::Remote { status: 404, .. }));
}

#[tokio::test]
async fn test_upscale_and_background_removal_extensions() {
    let mut fixture = MockServerFixture::new().await;
    let _submit = fixture
        .mock_submit(201, &succeeded("p-10", "https://cdn.example/edited.png"), 2).await;
    let provider = fixture.provider(5);

    let upscaled = provider.upscale("https://cdn.example/in.png", 4).await.unwrap();
    assert_eq!(upscaled, "https://cdn.example/edited.png");
    let cutout = provider
        .remove_background("https://cdn.example/in.png")
        .await
        .unwrap();
    assert_eq!(cutout, "https://cdn.example/edited.png");
}

#[tokio::test]
async fn test_registry_routes_to_replicate() {
    let mut fixture = MockServerFixture::new().await;
    let submit = fixture
        .mock_submit(201, &succeeded("p-11", "https://cdn.example/p-11.png"), 1)
        .await;
    let provider = fixture.provider(5);

    let mut registry = ProviderRegistry::new();
    registry.register("replicate", Box::new(provider), 1);

    let params = ImageGenerationParams::new("ink wash mountains").input_image("https://i/sketch.png");
    let result = registry.generate_image(&params, CostTier::Quality).await.unwrap();
    submit.assert_async().await;
    assert_eq!(result.model, "black-forest-labs/flux-dev");
    assert_eq!(result.url, "https://cdn.example/p-11.png");
}
