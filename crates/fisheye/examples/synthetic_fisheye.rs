//! Calibrate a simulated fisheye camera from rendered checkerboards and
//! undistort one frame.
//!
//! Run with: `cargo run -p fisheye --example synthetic_fisheye`

use anyhow::Result;
use fisheye::core::synthetic::{add_raster_noise, planar, render_checkerboard, RenderOptions};
use fisheye::core::PatternModel;
use fisheye::prelude::*;

const SIZE: ImageSize = ImageSize {
    width: 640,
    height: 480,
};

fn main() -> Result<()> {
    println!("=== Fisheye calibration (synthetic) ===\n");

    let camera_gt = FisheyeCamera::new(
        Intrinsics::new(205.0, 203.0, 321.5, 238.0),
        KannalaBrandt4::new(0.08, -0.015, 0.002, 0.0),
    );
    let spec = CheckerboardSpec::new(9, 6).with_cell_size(0.025);
    let model = PatternModel::new(spec)?;

    let poses = planar::tilted_board_poses(&model, 6, 0.175, 0.45);
    let mut images = Vec::with_capacity(poses.len());
    for (i, pose) in poses.iter().enumerate() {
        let mut img =
            render_checkerboard(&camera_gt, pose, &spec, SIZE, &RenderOptions::default())?;
        add_raster_noise(&mut img, i as u64, 4);
        images.push(img);
    }

    let config = CalibrationConfig {
        cell_size: spec.cell_size,
        ..CalibrationConfig::default()
    };
    let report = calibrate_with_config(&images, &spec, &config)?;
    println!("{}", serde_json::to_string_pretty(&report.params)?);
    println!(
        "mean reprojection error {:.3}px over {} views ({:?})",
        report.mean_reprojection_error,
        report.used_views.len(),
        report.termination
    );

    let k_gt = camera_gt.k;
    let k = &report.camera.k;
    println!(
        "fx {:.2} (true {:.2}), fy {:.2} (true {:.2})",
        k.fx, k_gt.fx, k.fy, k_gt.fy
    );

    let opts = UndistortOptions {
        scale: 1.5,
        format: OutputFormat::Png,
        ..UndistortOptions::default()
    };
    let png = undistort(&images[0], &report.params.k, &report.params.d, &opts)?;
    let out = std::env::temp_dir().join("fisheye_synthetic_flat.png");
    std::fs::write(&out, png)?;
    println!("\nwrote {}", out.display());
    Ok(())
}
