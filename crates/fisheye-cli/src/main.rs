//! `fisheye` command-line front-end.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use fisheye_core::{CalibrationParams, CheckerboardSpec, Real};
use fisheye_pipeline::{
    calibrate_with_config, codec, undistort_encoded, CalibrationConfig, CalibrationReport,
    OutputFormat, UndistortOptions,
};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Parser)]
#[command(name = "fisheye")]
#[command(about = "Calibrate fisheye cameras from checkerboard images and undistort their frames")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Calibrate from a directory of checkerboard images and print the report.
    Calibrate(CalibrateArgs),
    /// Undistort one image with a saved calibration.
    Undistort(UndistortArgs),
    /// Calibrate from a sample directory, then undistort one image.
    Run {
        #[command(flatten)]
        calib: CalibrateArgs,
        /// Image to undistort.
        src: PathBuf,
        /// Output path; the extension selects the format.
        dest: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Debug, Clone, Args)]
struct CalibrateArgs {
    /// Directory with JPEG/PNG/WebP checkerboard images.
    dir: PathBuf,
    /// Inner corners per row.
    #[arg(long)]
    width: usize,
    /// Inner corners per column.
    #[arg(long)]
    height: usize,
    /// Square size; only scales the reported poses.
    #[arg(long)]
    cell_size: Option<Real>,
    /// JSON CalibrationConfig; defaults are used for missing fields.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Where to write `{K, D}` as JSON.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct OutputArgs {
    /// Output canvas relative to the input.
    #[arg(long, default_value_t = 1.0)]
    scale: Real,
    /// JPEG quality (1-100) or PNG compression level (0-9).
    #[arg(long)]
    quality: Option<u8>,
}

#[derive(Debug, Clone, Args)]
struct UndistortArgs {
    src: PathBuf,
    dest: PathBuf,
    /// JSON file with `{K, D}`.
    #[arg(long)]
    calib: PathBuf,
    #[command(flatten)]
    output: OutputArgs,
}

fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let data = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))
}

fn image_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("listing {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && OutputFormat::from_path(&path).is_ok() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn calibrate_dir(args: &CalibrateArgs) -> Result<CalibrationReport> {
    let mut config = match &args.config {
        Some(path) => load_json::<CalibrationConfig>(path)?,
        None => CalibrationConfig::default(),
    };
    if let Some(cell) = args.cell_size {
        config.cell_size = cell;
    }
    let spec = CheckerboardSpec::new(args.width, args.height).with_cell_size(config.cell_size);

    let files = image_files(&args.dir)?;
    if files.is_empty() {
        bail!("no images found in {}", args.dir.display());
    }
    tracing::info!("decoding {} images from {}", files.len(), args.dir.display());
    let images = files
        .iter()
        .map(|path| {
            let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
            codec::decode_gray(&bytes).with_context(|| format!("decoding {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let report = calibrate_with_config(&images, &spec, &config).context("calibration failed")?;
    for &idx in &report.rejected_views {
        tracing::warn!("not used: {}", files[idx].display());
    }
    if let Some(out) = &args.output {
        fs::write(out, serde_json::to_string_pretty(&report.params)?)
            .with_context(|| format!("writing {}", out.display()))?;
        tracing::info!("wrote {}", out.display());
    }
    Ok(report)
}

fn undistort_file(
    src: &Path,
    dest: &Path,
    params: &CalibrationParams,
    output: &OutputArgs,
) -> Result<()> {
    let opts = UndistortOptions {
        scale: output.scale,
        format: OutputFormat::from_path(dest)?,
        quality: output.quality,
        ..UndistortOptions::default()
    };
    let bytes = fs::read(src).with_context(|| format!("reading {}", src.display()))?;
    let out = undistort_encoded(&bytes, &params.k, &params.d, &opts)
        .with_context(|| format!("undistorting {}", src.display()))?;
    fs::write(dest, out).with_context(|| format!("writing {}", dest.display()))?;
    tracing::info!("wrote {}", dest.display());
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Calibrate(args) => {
            let report = calibrate_dir(&args)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Undistort(args) => {
            let params: CalibrationParams = load_json(&args.calib)?;
            params.to_camera().context("invalid calibration file")?;
            undistort_file(&args.src, &args.dest, &params, &args.output)?;
        }
        Commands::Run {
            calib,
            src,
            dest,
            output,
        } => {
            let report = calibrate_dir(&calib)?;
            println!("{}", serde_json::to_string_pretty(&report.params)?);
            undistort_file(&src, &dest, &report.params, &output)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fisheye_core::{
        synthetic::{planar, render_checkerboard, RenderOptions},
        FisheyeCamera, ImageSize, Intrinsics, KannalaBrandt4, PatternModel,
    };
    use tempfile::TempDir;

    fn camera() -> FisheyeCamera {
        FisheyeCamera::new(
            Intrinsics::new(220.0, 218.0, 322.0, 241.0),
            KannalaBrandt4::new(0.05, -0.01, 0.0, 0.0),
        )
    }

    /// Four rendered boards as PNG plus a stray text file.
    fn sample_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        let spec = CheckerboardSpec::new(9, 6);
        let model = PatternModel::new(spec).unwrap();
        for (i, pose) in planar::tilted_board_poses(&model, 4, 7.0, 0.4).iter().enumerate() {
            let img = render_checkerboard(
                &camera(),
                pose,
                &spec,
                ImageSize::new(640, 480),
                &RenderOptions::default(),
            )
            .unwrap();
            let png = codec::encode(&img, OutputFormat::Png, None).unwrap();
            fs::write(dir.path().join(format!("view{i}.png")), png).unwrap();
        }
        fs::write(dir.path().join("notes.txt"), "not an image").unwrap();
        dir
    }

    fn args(dir: &Path, output: Option<PathBuf>) -> CalibrateArgs {
        CalibrateArgs {
            dir: dir.to_path_buf(),
            width: 9,
            height: 6,
            cell_size: None,
            config: None,
            output,
        }
    }

    #[test]
    fn calibrate_then_undistort_through_files() {
        let samples = sample_dir();
        let work = TempDir::new().unwrap();
        let calib_path = work.path().join("calib.json");

        let report = calibrate_dir(&args(samples.path(), Some(calib_path.clone()))).unwrap();
        assert_eq!(report.used_views.len(), 4);
        let params: CalibrationParams = load_json(&calib_path).unwrap();
        assert_eq!(params, report.params);
        assert!((params.k[0][0] - 220.0).abs() < 2.2, "K={:?}", params.k);

        let dest = work.path().join("flat.webp");
        let output = OutputArgs {
            scale: 1.5,
            quality: None,
        };
        undistort_file(&samples.path().join("view0.png"), &dest, &params, &output).unwrap();
        let out = codec::decode(&fs::read(&dest).unwrap()).unwrap();
        assert_eq!((out.width(), out.height()), (960, 720));
    }

    #[test]
    fn config_file_overrides_defaults() {
        let samples = sample_dir();
        let work = TempDir::new().unwrap();
        let cfg_path = work.path().join("cfg.json");
        let cfg = r#"{ "backend": "minpack", "refine_intrinsics_first": false }"#;
        fs::write(&cfg_path, cfg).unwrap();
        let mut a = args(samples.path(), None);
        a.config = Some(cfg_path);
        let report = calibrate_dir(&a).unwrap();
        assert!(report.mean_reprojection_error < 0.5);
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = calibrate_dir(&args(dir.path(), None)).unwrap_err();
        assert!(err.to_string().contains("no images"));
    }

    #[test]
    fn unknown_destination_extension_is_rejected() {
        let work = TempDir::new().unwrap();
        let params = CalibrationParams::from_camera(&camera());
        let output = OutputArgs {
            scale: 1.0,
            quality: None,
        };
        let (src, dest) = (work.path().join("a.png"), work.path().join("b.tiff"));
        let err = undistort_file(&src, &dest, &params, &output).unwrap_err();
        assert!(err.to_string().contains("unsupported"), "{err}");
    }
}
