//! A session driven through the background worker the way a live
//! front-end drives it: every settings change issues a request, and
//! results are applied as they arrive.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use inkflow_pipeline::{SourceImage, StencilSettings};
use inkflow_worker::{Applied, Session, StencilWorker, WorkerConfig};

const WAIT: Duration = Duration::from_secs(10);

fn png_with_boundary(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_fn(width, height, |x, _| {
        if x < width / 2 {
            image::Rgb([10, 10, 10])
        } else {
            image::Rgb([240, 240, 240])
        }
    });
    let mut buf = Vec::new();
    image::ImageEncoder::write_image(
        image::codecs::png::PngEncoder::new(&mut buf),
        img.as_raw(),
        width,
        height,
        image::ExtendedColorType::Rgb8,
    )
    .unwrap();
    buf
}

#[test]
fn slider_burst_commits_only_final_settings() {
    let mut session = Session::new();
    let dims = session.load(&png_with_boundary(48, 32)).unwrap();
    assert_eq!((dims.width, dims.height), (48, 32));

    let worker = StencilWorker::spawn(WorkerConfig {
        debounce: Duration::from_millis(100),
    })
    .unwrap();

    for high in [60u8, 80, 100, 120] {
        session.update_settings(StencilSettings {
            high_threshold: high,
            inverted: false,
            ..StencilSettings::default()
        });
        worker.submit(session.next_request().unwrap()).unwrap();
    }

    let result = worker.recv_timeout(WAIT).unwrap().unwrap();
    assert_eq!(session.apply(result), Applied::Committed);

    let shown = session.display().unwrap();
    assert!(!shown.inverted());
    assert_eq!(shown.dimensions(), dims);
    assert!(shown.edge_pixel_count() > 0);
}

#[test]
fn result_for_replaced_image_is_discarded() {
    let mut session = Session::new();
    session.load(&png_with_boundary(20, 20)).unwrap();

    let worker = StencilWorker::spawn(WorkerConfig {
        debounce: Duration::ZERO,
    })
    .unwrap();
    worker.submit(session.next_request().unwrap()).unwrap();

    // A new upload arrives while the first render is in flight.
    session.load_source(SourceImage::from_rgb(image::RgbImage::new(8, 8)));

    let stale = worker.recv_timeout(WAIT).unwrap().unwrap();
    assert_eq!(session.apply(stale), Applied::Stale);
    assert!(session.display().is_none());

    worker.submit(session.next_request().unwrap()).unwrap();
    let fresh = worker.recv_timeout(WAIT).unwrap().unwrap();
    assert_eq!(session.apply(fresh), Applied::Committed);
    // Uniform black input: all background.
    assert_eq!(session.display().unwrap().edge_pixel_count(), 0);
}

#[test]
fn invalid_settings_surface_as_error_and_keep_display() {
    let mut session = Session::new();
    session.load(&png_with_boundary(20, 20)).unwrap();
    let worker = StencilWorker::spawn(WorkerConfig {
        debounce: Duration::ZERO,
    })
    .unwrap();

    worker.submit(session.next_request().unwrap()).unwrap();
    let ok = worker.recv_timeout(WAIT).unwrap().unwrap();
    assert_eq!(session.apply(ok), Applied::Committed);

    session.update_settings(StencilSettings {
        blur_radius: 300,
        ..StencilSettings::default()
    });
    worker.submit(session.next_request().unwrap()).unwrap();
    let failed = worker.recv_timeout(WAIT).unwrap().unwrap();
    assert_eq!(session.apply(failed), Applied::Failed);
    assert!(session.display().is_some());
    assert!(session.last_error().is_some());
}
