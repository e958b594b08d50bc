//! End-to-end session workflows with scripted segmentation capabilities

mod common;

use common::{encode, gradient_image, MaskScript, ScriptedProducer};
use image::ImageFormat;
use pixkit::{
    remove_background_from_bytes, BackgroundSpec, EditorSession, ModelOptions, PixkitError,
    ProducerState, Result, RgbColor, SegmentationMask, SegmentationOutcome, SegmentationService,
    ToolConfig,
};
use std::sync::atomic::Ordering;
use std::time::Duration;

fn service(producer: ScriptedProducer, timeout: Duration) -> SegmentationService {
    SegmentationService::new(Box::new(producer), ModelOptions::default(), timeout)
}

fn session_with_png(width: u32, height: u32) -> Result<EditorSession> {
    let mut session = EditorSession::default();
    session.load_image(&encode(&gradient_image(width, height), ImageFormat::Png), "image/png")?;
    Ok(session)
}

#[tokio::test]
async fn test_remove_then_switch_backgrounds() -> Result<()> {
    let mut session = session_with_png(40, 20)?;
    let mut service = service(ScriptedProducer::new(MaskScript::LeftHalf), Duration::from_secs(1));

    assert_eq!(
        session.remove_background(&mut service).await?,
        SegmentationOutcome::Applied
    );
    let transparent = session.composite().unwrap();
    assert_eq!(transparent.image.get_pixel(35, 10)[3], 0);
    assert_eq!(transparent.image.get_pixel(5, 10)[3], 255);

    let green = BackgroundSpec::SolidColor {
        color: RgbColor::new(0, 255, 0),
    };
    let recolored = session.set_background(green)?.unwrap();
    assert_eq!(recolored.image.get_pixel(35, 10).0, [0, 255, 0, 255]);

    let source_pixel = *session.source().unwrap().pixels().get_pixel(5, 10);
    let blurred = session.set_background(BackgroundSpec::Blur { radius: 6 })?.unwrap();
    assert_eq!(*blurred.image.get_pixel(5, 10), source_pixel);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_model_unavailable_after_wait_budget_keeps_state() -> Result<()> {
    let mut session = session_with_png(16, 16)?;
    let producer =
        ScriptedProducer::new(MaskScript::LeftHalf).with_init_delay(Duration::from_secs(30));
    let mut service = service(producer, Duration::from_secs(5));

    let generation_before = session.generation();
    let result = session.remove_background(&mut service).await;

    assert!(matches!(result, Err(PixkitError::ModelUnavailable(_))));
    assert!(matches!(service.state(), ProducerState::Unavailable { .. }));
    assert!(session.composite().is_none());
    assert!(session.mask().is_none());
    assert_eq!(session.source().unwrap().dimensions(), (16, 16));
    assert!(session.generation() > generation_before);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_model_unavailable_keeps_previous_composite() -> Result<()> {
    let mut session = session_with_png(16, 16)?;
    let mut ready = service(ScriptedProducer::new(MaskScript::LeftHalf), Duration::from_secs(1));
    session.remove_background(&mut ready).await?;

    let previous_image = session.composite().unwrap().image.clone();
    let previous_mask = session.mask().cloned();

    let stalled =
        ScriptedProducer::new(MaskScript::Uniform(0.0, (4, 4))).with_init_delay(Duration::from_secs(30));
    let mut stalled = service(stalled, Duration::from_secs(5));
    let result = session.remove_background(&mut stalled).await;

    assert!(matches!(result, Err(PixkitError::ModelUnavailable(_))));
    assert_eq!(session.composite().unwrap().image, previous_image);
    assert_eq!(session.mask().cloned(), previous_mask);
    Ok(())
}

#[tokio::test]
async fn test_setup_runs_once_across_requests() -> Result<()> {
    let producer = ScriptedProducer::new(MaskScript::Uniform(1.0, (8, 8)));
    let init_calls = producer.init_calls.clone();
    let segment_calls = producer.segment_calls.clone();
    let mut service = service(producer, Duration::from_secs(1));

    let mut session = session_with_png(10, 10)?;
    session.remove_background(&mut service).await?;
    session.load_image(&encode(&gradient_image(12, 6), ImageFormat::Png), "image/png")?;
    session.remove_background(&mut service).await?;

    assert_eq!(init_calls.load(Ordering::SeqCst), 1);
    assert_eq!(segment_calls.load(Ordering::SeqCst), 2);
    assert_eq!(session.composite().unwrap().dimensions(), (12, 6));
    Ok(())
}

#[tokio::test]
async fn test_manual_retry_after_failed_setup() -> Result<()> {
    let producer = ScriptedProducer::new(MaskScript::Uniform(1.0, (4, 4))).with_init_failures(1);
    let mut service = service(producer, Duration::from_secs(1));
    let mut session = session_with_png(8, 8)?;

    assert!(matches!(
        session.remove_background(&mut service).await,
        Err(PixkitError::ModelUnavailable(_))
    ));
    assert_eq!(
        session.remove_background(&mut service).await?,
        SegmentationOutcome::Applied
    );
    assert!(service.is_ready());
    Ok(())
}

#[tokio::test]
async fn test_capability_without_mask_is_segmentation_failure() -> Result<()> {
    let mut session = session_with_png(8, 8)?;
    let mut service = service(ScriptedProducer::new(MaskScript::Nothing), Duration::from_secs(1));

    let result = session.remove_background(&mut service).await;
    assert!(matches!(result, Err(PixkitError::SegmentationFailed(_))));
    assert!(session.composite().is_none());
    Ok(())
}

#[tokio::test]
async fn test_out_of_order_results_only_apply_latest() -> Result<()> {
    let mut session = session_with_png(20, 20)?;
    let mut service = service(ScriptedProducer::new(MaskScript::LeftHalf), Duration::from_secs(1));

    let slow = session.begin_segmentation()?;
    let fast = session.begin_segmentation()?;

    let fast_mask = service.request_segmentation(fast.image()).await;
    assert_eq!(
        session.complete_segmentation(fast, fast_mask)?,
        SegmentationOutcome::Applied
    );
    let applied = session.composite().unwrap().image.clone();

    let stale = Ok(SegmentationMask::uniform(0.0, (20, 20)));
    assert_eq!(
        session.complete_segmentation(slow, stale)?,
        SegmentationOutcome::Discarded
    );
    assert_eq!(session.composite().unwrap().image, applied);
    Ok(())
}

#[tokio::test]
async fn test_mask_failure_shows_source_and_warns() -> Result<()> {
    let broken = SegmentationMask::new(vec![1.0; 5], (3, 3));
    let mut session = session_with_png(9, 9)?;
    let mut service = service(
        ScriptedProducer::new(MaskScript::Fixed(broken)),
        Duration::from_secs(1),
    );

    session.remove_background(&mut service).await?;
    let composite = session.composite().unwrap();
    assert!(composite.fallback);
    assert_eq!(&composite.image, session.source().unwrap().pixels());

    let warnings = session.take_warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].message.contains("original image"));
    Ok(())
}

#[tokio::test]
async fn test_one_shot_removal_from_bytes() -> Result<()> {
    let bytes = encode(&gradient_image(30, 15), ImageFormat::Jpeg);
    let (result, warnings) = remove_background_from_bytes(
        &bytes,
        "image/jpeg",
        Box::new(ScriptedProducer::new(MaskScript::Uniform(0.0, (3, 3)))),
        BackgroundSpec::SolidColor {
            color: RgbColor::new(10, 20, 30),
        },
        &ToolConfig::default(),
    )
    .await?;

    assert!(warnings.is_empty());
    assert_eq!(result.dimensions(), (30, 15));
    assert!(result.image.pixels().all(|p| p.0 == [10, 20, 30, 255]));
    Ok(())
}

#[tokio::test]
async fn test_export_png_round_trips_composite() -> Result<()> {
    let mut session = session_with_png(24, 18)?;
    let mut service = service(ScriptedProducer::new(MaskScript::LeftHalf), Duration::from_secs(1));
    session.remove_background(&mut service).await?;

    let exported = session.export_png()?;
    assert_eq!(exported.file_name("background_removed"), "background_removed_24x18.png");
    let decoded = image::load_from_memory(&exported.bytes)?.to_rgba8();
    assert_eq!(&decoded, &session.composite().unwrap().image);
    Ok(())
}
