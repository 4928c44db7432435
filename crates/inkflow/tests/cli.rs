//! End-to-end tests for the `inkflow` binary.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

fn inkflow(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_inkflow"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run inkflow")
}

/// Write a 60x40 PNG with a vertical black/white boundary at x = 30.
fn write_boundary_png(dir: &TempDir, name: &str) -> PathBuf {
    let img = image::RgbImage::from_fn(60, 40, |x, _| {
        if x < 30 {
            image::Rgb([0, 0, 0])
        } else {
            image::Rgb([255, 255, 255])
        }
    });
    let path = dir.path().join(name);
    img.save_with_format(&path, image::ImageFormat::Png)
        .expect("failed to write test image");
    path
}

fn load_gray(path: &Path) -> image::GrayImage {
    image::open(path).expect("output is not an image").to_luma8()
}

fn arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn writes_stencil_next_to_input_by_default() {
    let dir = TempDir::new().unwrap();
    let input = write_boundary_png(&dir, "photo.png");

    let out = inkflow(&[arg(&input)]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let stencil = load_gray(&dir.path().join("photo-stencil.png"));
    assert_eq!(stencil.dimensions(), (60, 40));
    assert!(stencil.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    // Black lines on white.
    assert!(stencil.pixels().any(|p| p.0[0] == 0));
    assert_eq!(stencil.get_pixel(5, 20).0[0], 255);
}

#[test]
fn explicit_output_and_flags() {
    let dir = TempDir::new().unwrap();
    let input = write_boundary_png(&dir, "in.png");
    let output = dir.path().join("custom.png");

    let out = inkflow(&[
        arg(&input),
        "-o",
        arg(&output),
        "--low-threshold",
        "50",
        "--high-threshold",
        "150",
        "--blur-radius",
        "1",
        "--no-invert",
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let stencil = load_gray(&output);
    for y in 0..40 {
        for x in 0..60 {
            let expected = if x == 29 { 255 } else { 0 };
            assert_eq!(stencil.get_pixel(x, y).0[0], expected, "({x}, {y})");
        }
    }
}

#[test]
fn data_uri_goes_to_stdout() {
    let dir = TempDir::new().unwrap();
    let input = write_boundary_png(&dir, "in.png");

    let out = inkflow(&[arg(&input), "--data-uri"]);
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(stdout.trim_end().starts_with("data:image/png;base64,iVBORw0KGgo"));
    assert!(!dir.path().join("in-stencil.png").exists());
}

#[test]
fn stages_dir_receives_every_stage() {
    let dir = TempDir::new().unwrap();
    let input = write_boundary_png(&dir, "in.png");
    let stages = dir.path().join("stages");

    let out = inkflow(&[arg(&input), "--stages-dir", arg(&stages)]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    for name in [
        "01-grayscale.png",
        "02-blur.png",
        "03-edges.png",
        "04-stencil.png",
    ] {
        assert_eq!(load_gray(&stages.join(name)).dimensions(), (60, 40), "{name}");
    }
    assert_eq!(
        load_gray(&stages.join("04-stencil.png")),
        load_gray(&dir.path().join("in-stencil.png"))
    );
}

#[test]
fn diagnostics_json_is_valid() {
    let dir = TempDir::new().unwrap();
    let input = write_boundary_png(&dir, "in.png");

    let out = inkflow(&[arg(&input), "--diagnostics", "--json"]);
    assert!(out.status.success());
    let json: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(json["summary"]["image_width"], 60);
    assert!(json["summary"]["edge_pixel_count"].as_u64().unwrap() > 0);
}

#[test]
fn diagnostics_report_goes_to_stderr() {
    let dir = TempDir::new().unwrap();
    let input = write_boundary_png(&dir, "in.png");

    let out = inkflow(&[arg(&input), "--diagnostics"]);
    assert!(out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("Stencil Diagnostics Report"));
    assert!(stderr.contains("Edge Detection"));
}

#[test]
fn settings_json_is_applied() {
    let dir = TempDir::new().unwrap();
    let input = write_boundary_png(&dir, "in.png");
    let output = dir.path().join("out.png");

    let out = inkflow(&[
        arg(&input),
        "-o",
        arg(&output),
        "--settings-json",
        r#"{"lowThreshold": 255, "highThreshold": 255}"#,
    ]);
    assert!(out.status.success());
    // Maximal thresholds: no edges, all white.
    assert!(load_gray(&output).pixels().all(|p| p.0[0] == 255));
}

#[test]
fn missing_input_fails() {
    let dir = TempDir::new().unwrap();
    let out = inkflow(&[arg(&dir.path().join("nope.png"))]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Error reading"));
}

#[test]
fn non_image_input_fails() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("notes.png");
    std::fs::write(&input, b"this is not a png").unwrap();

    let out = inkflow(&[arg(&input)]);
    assert!(!out.status.success());
    assert!(!dir.path().join("notes-stencil.png").exists());
}

#[test]
fn invalid_blur_radius_fails() {
    let dir = TempDir::new().unwrap();
    let input = write_boundary_png(&dir, "in.png");

    for radius in ["0", "-5", "300"] {
        let out = inkflow(&[arg(&input), "--blur-radius", radius]);
        assert!(!out.status.success(), "radius {radius}");
        assert!(String::from_utf8_lossy(&out.stderr).contains("blur_radius"));
    }
    assert!(!dir.path().join("in-stencil.png").exists());
}
