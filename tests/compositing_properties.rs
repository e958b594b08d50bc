//! Compositing behavior over whole images: dimensions, layer mixing and fallbacks

mod common;

use common::{gradient_image, gradient_source};
use image::{Rgba, RgbaImage};
use pixkit::{
    BackgroundRenderer, BackgroundSpec, MaskCompositor, PixkitError, Result, RgbColor,
    SegmentationMask, SourceImage,
};

const GREEN: RgbColor = RgbColor::new(0, 255, 0);

#[test]
fn test_result_matches_source_dimensions_for_any_mask_size() -> Result<()> {
    let source = gradient_source(64, 48);
    for mask_dims in [(64, 48), (32, 24), (7, 3), (256, 256), (1, 1)] {
        let mask = SegmentationMask::uniform(0.7, mask_dims);
        for background in [
            BackgroundSpec::Transparent,
            BackgroundSpec::SolidColor { color: GREEN },
            BackgroundSpec::Blur { radius: 5 },
        ] {
            let result = MaskCompositor::composite(&source, &mask, &background)?;
            assert_eq!(result.dimensions(), (64, 48), "mask {:?}", mask_dims);
        }
    }
    Ok(())
}

#[test]
fn test_transparent_background_with_empty_mask_is_fully_transparent() -> Result<()> {
    let source = gradient_source(30, 20);
    let mask = SegmentationMask::uniform(0.0, (15, 10));
    let result = MaskCompositor::composite(&source, &mask, &BackgroundSpec::Transparent)?;
    assert!(result.image.pixels().all(|p| p[3] == 0));
    Ok(())
}

#[test]
fn test_solid_color_shows_color_or_source_by_mask() -> Result<()> {
    let source = gradient_source(40, 10);
    let background = BackgroundSpec::SolidColor { color: GREEN };

    let empty = MaskCompositor::composite(&source, &SegmentationMask::uniform(0.0, (40, 10)), &background)?;
    assert!(empty.image.pixels().all(|p| p.0 == [0, 255, 0, 255]));

    let full = MaskCompositor::composite(&source, &SegmentationMask::uniform(1.0, (40, 10)), &background)?;
    assert_eq!(&full.image, source.pixels());
    Ok(())
}

#[test]
fn test_zero_radius_blur_is_scaled_source() -> Result<()> {
    let source = gradient_source(33, 17);
    let background = BackgroundRenderer::render(&BackgroundSpec::Blur { radius: 0 }, &source)?;
    assert_eq!(&background, source.pixels());

    let mask = SegmentationMask::uniform(0.0, (4, 4));
    let result = MaskCompositor::composite(&source, &mask, &BackgroundSpec::Blur { radius: 0 })?;
    assert_eq!(&result.image, source.pixels());
    Ok(())
}

#[test]
fn test_composite_is_idempotent() -> Result<()> {
    let source = gradient_source(50, 40);
    let mask = SegmentationMask::new(
        (0..25 * 20).map(|i| (i % 17) as f32 / 16.0).collect(),
        (25, 20),
    );
    let background = BackgroundSpec::Blur { radius: 3 };

    let first = MaskCompositor::composite(&source, &mask, &background)?;
    let second = MaskCompositor::composite(&source, &mask, &background)?;
    assert_eq!(first.image, second.image);
    Ok(())
}

#[test]
fn test_full_mask_leaves_400x300_source_unchanged() -> Result<()> {
    let source = gradient_source(400, 300);
    let mask = SegmentationMask::uniform(1.0, (400, 300));
    for background in [
        BackgroundSpec::Transparent,
        BackgroundSpec::SolidColor { color: GREEN },
        BackgroundSpec::Blur { radius: 8 },
    ] {
        let result = MaskCompositor::composite(&source, &mask, &background)?;
        assert_eq!(&result.image, source.pixels());
    }
    Ok(())
}

#[test]
fn test_empty_mask_over_green_is_solid_green() -> Result<()> {
    let source = gradient_source(100, 100);
    let mask = SegmentationMask::uniform(0.0, (100, 100));
    let green: BackgroundSpec = "#00FF00".parse()?;

    let result = MaskCompositor::composite(&source, &mask, &green)?;
    assert!(result.image.pixels().all(|p| p.0 == [0, 255, 0, 255]));
    Ok(())
}

#[test]
fn test_soft_mask_edges_feather_instead_of_thresholding() -> Result<()> {
    let source = SourceImage::from_rgba(RgbaImage::from_pixel(3, 1, Rgba([255, 255, 255, 255])));
    let mask = SegmentationMask::new(vec![0.25, 0.5, 0.75], (3, 1));
    let result = MaskCompositor::composite(&source, &mask, &BackgroundSpec::Transparent)?;

    let alphas: Vec<u8> = result.image.pixels().map(|p| p[3]).collect();
    assert_eq!(alphas, vec![64, 128, 191]);
    assert!(result.image.pixels().all(|p| p[0] == 255));
    Ok(())
}

#[test]
fn test_source_alpha_is_preserved_under_full_mask() -> Result<()> {
    let mut pixels = gradient_image(8, 8);
    for pixel in pixels.pixels_mut() {
        pixel[3] = 100;
    }
    let source = SourceImage::from_rgba(pixels);
    let mask = SegmentationMask::uniform(1.0, (8, 8));
    let result = MaskCompositor::composite(&source, &mask, &BackgroundSpec::Transparent)?;
    assert!(result.image.pixels().all(|p| p[3] == 100));
    Ok(())
}

#[test]
fn test_malformed_masks_degrade_to_source() {
    let source = gradient_source(12, 12);
    let malformed = [
        SegmentationMask::new(Vec::new(), (0, 0)),
        SegmentationMask::new(vec![1.0; 10], (12, 12)),
        SegmentationMask::new(vec![f32::NAN; 4], (2, 2)),
    ];

    for mask in &malformed {
        assert!(matches!(
            MaskCompositor::composite(&source, mask, &BackgroundSpec::Transparent),
            Err(PixkitError::MaskApplication(_))
        ));

        let (result, warning) =
            MaskCompositor::composite_or_fallback(&source, mask, &BackgroundSpec::Transparent)
                .unwrap();
        assert!(result.fallback);
        assert_eq!(&result.image, source.pixels());
        assert!(warning.is_some());
    }
}
