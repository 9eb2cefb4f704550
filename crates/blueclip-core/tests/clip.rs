mod common;

use blueclip_core::error::{GeometryError, PdfError};
use blueclip_core::{
    ArtifactStore, ClipConfig, ClipEngine, ClipError, ClipPayload, ClipRequest, OutputDocument,
    Rect, SourceDocument, VectorDocument,
};
use pretty_assertions::assert_eq;

use common::{write_pdf, CLUSTERED_PAGE};

fn engine(eps: f64, min_samples: usize) -> ClipEngine {
    let mut config = ClipConfig::default();
    config.clustering.eps = eps;
    config.clustering.min_samples = min_samples;
    ClipEngine::new(config).unwrap()
}

fn page_size(path: &std::path::Path, page: usize) -> (f64, f64) {
    let rect = SourceDocument::open(path).unwrap().page_rect(page).unwrap();
    (rect.width(), rect.height())
}

#[test]
fn test_manual_clip_bounding_box_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_pdf(dir.path(), "blueprint.pdf", &["0 0 m 612 792 l S"]);
    let source = SourceDocument::open(&input).unwrap();
    let mut store = ArtifactStore::open(dir.path().join("clips")).unwrap();

    let payload: ClipPayload = serde_json::from_str(
        r#"{"pageNumber": 1, "startX": 100, "startY": 50, "endX": 50, "endY": 200,
            "scale": 2, "sizingMode": "bounding-box"}"#,
    )
    .unwrap();
    let request = payload.into_request().unwrap();
    assert_eq!(request.document_rect().unwrap(), Rect::new(25.0, 25.0, 50.0, 100.0));

    let artifact = engine(110.0, 100).clip(&source, &request, &mut store).unwrap();

    assert_eq!(artifact.page_number, 1);
    assert_eq!(artifact.sequence, 0);
    assert_eq!(artifact.file, format!("1_{}_clip.pdf", artifact.id));
    assert!(artifact.path.is_file());
    // 25x75 content plus a 20pt margin on each side.
    assert_eq!(page_size(&artifact.path, 0), (65.0, 115.0));
}

#[test]
fn test_manual_clip_fixed_size() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_pdf(dir.path(), "blueprint.pdf", &["0 0 m 612 792 l S", "0 0 m 1 1 l S"]);
    let source = SourceDocument::open(&input).unwrap();
    let mut store = ArtifactStore::open(dir.path()).unwrap();

    let request =
        ClipRequest::new(1, Rect::new(0.0, 0.0, 100.0, 50.0), 1.0).with_fixed_size(300.0, 200.0);
    let artifact = engine(110.0, 100).clip(&source, &request, &mut store).unwrap();

    assert_eq!(artifact.page_number, 2);
    assert!(artifact.file.starts_with("2_"));
    assert_eq!(page_size(&artifact.path, 0), (300.0, 200.0));
}

#[test]
fn test_manual_clip_failures_write_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_pdf(dir.path(), "blueprint.pdf", &["0 0 m 10 10 l S"]);
    let source = SourceDocument::open(&input).unwrap();
    let clips_dir = dir.path().join("clips");
    let mut store = ArtifactStore::open(&clips_dir).unwrap();
    let engine = engine(110.0, 100);

    let out_of_range = ClipRequest::new(4, Rect::new(0.0, 0.0, 10.0, 10.0), 1.0);
    let err = engine.clip(&source, &out_of_range, &mut store).unwrap_err();
    assert!(matches!(
        err,
        ClipError::Pdf(PdfError::InvalidPageIndex { index: 4, .. })
    ));
    assert!(err.is_caller_error());

    let flat = ClipRequest::new(0, Rect::new(10.0, 10.0, 10.0, 80.0), 1.0);
    let err = engine.clip(&source, &flat, &mut store).unwrap_err();
    assert!(matches!(err, ClipError::Geometry(GeometryError::EmptyClip)));

    let bad_scale = ClipRequest::new(0, Rect::new(0.0, 0.0, 10.0, 10.0), 0.0);
    let err = engine.clip(&source, &bad_scale, &mut store).unwrap_err();
    assert!(matches!(err, ClipError::Geometry(GeometryError::InvalidScale(_))));

    let mut missing_size = ClipRequest::new(0, Rect::new(0.0, 0.0, 10.0, 10.0), 1.0);
    missing_size.sizing_mode = blueclip_core::SizingMode::FixedSize;
    let err = engine.clip(&source, &missing_size, &mut store).unwrap_err();
    assert!(matches!(err, ClipError::Geometry(GeometryError::MissingFixedSize)));

    assert!(store.artifacts().unwrap().is_empty());
}

#[test]
fn test_auto_clip_skips_degenerate_regions() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_pdf(dir.path(), "blueprint.pdf", &[CLUSTERED_PAGE]);
    let source = SourceDocument::open(&input).unwrap();

    let mut output = OutputDocument::new();
    let report = engine(20.0, 2).auto_clip(&source, 0, &mut output).unwrap();

    assert_eq!(report.rendered_count(), 2);
    assert_eq!(report.noise, 0);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].label, 1);
    assert!(matches!(
        report.failures[0].error,
        ClipError::Geometry(GeometryError::DegenerateBox { .. })
    ));
    assert_eq!(output.page_count(), 2);
    assert_eq!(
        report.rendered,
        vec![
            Rect::new(10.0, 762.0, 30.0, 782.0),
            Rect::new(400.0, 377.0, 410.0, 392.0)
        ]
    );
}

#[test]
fn test_parse_document_writes_page_files() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_pdf(dir.path(), "blueprint.pdf", &[CLUSTERED_PAGE, ""]);
    let source = SourceDocument::open(&input).unwrap();
    let out_dir = dir.path().join("Blueprint");

    let mut config = ClipConfig::default();
    config.clustering.eps = 20.0;
    config.clustering.min_samples = 2;
    config.output.write_scatter = true;
    let reports = ClipEngine::new(config)
        .unwrap()
        .parse_document(&source, &out_dir)
        .unwrap();

    assert_eq!(reports.len(), 2);
    assert_eq!(
        reports[0].files,
        vec![
            out_dir.join("scatter_1.png"),
            out_dir.join("parse_1.pdf"),
            out_dir.join("bbox_1.pdf"),
        ]
    );
    assert_eq!(SourceDocument::open(out_dir.join("parse_1.pdf")).unwrap().page_count(), 2);
    assert_eq!(page_size(&out_dir.join("parse_1.pdf"), 1), (640.0, 640.0));
    assert_eq!(page_size(&out_dir.join("bbox_1.pdf"), 0), (612.0, 792.0));

    // The empty page only gets its scatter plot.
    assert_eq!(reports[1].clips.rendered_count(), 0);
    assert_eq!(reports[1].files, vec![out_dir.join("scatter_2.png")]);
    assert!(!out_dir.join("parse_2.pdf").exists());
}

#[test]
fn test_text_points_join_clustering_when_enabled() {
    let dir = tempfile::tempdir().unwrap();
    let content = "BT /F1 10 Tf 100 700 Td (AB) Tj ET\nBT /F1 10 Tf 100 690 Td (CD) Tj ET";
    let input = write_pdf(dir.path(), "text.pdf", &[content]);
    let source = SourceDocument::open(&input).unwrap();

    let without = engine(20.0, 2).detect_regions(&source, 0).unwrap();
    assert!(without.points.is_empty());

    let mut config = ClipConfig::default();
    config.clustering.eps = 20.0;
    config.clustering.min_samples = 2;
    config.extraction.include_text_points = true;
    let with = ClipEngine::new(config)
        .unwrap()
        .detect_regions(&source, 0)
        .unwrap();
    assert_eq!(with.points.text_points().len(), 4);
    assert_eq!(with.regions.len(), 1);
}
