use clap::{Parser, Subcommand};
use coverkit::config::{self, CoverConfig};
use coverkit::imaging::{
    self, CropMode, CropRequest, ImageRef, Quality, Rotation, RustBackend, SquareCropRequest,
};
use coverkit::output;
use coverkit::process::{UploadRequest, process_upload};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "coverkit")]
#[command(version, about = "Cover image inspection, cropping and upload processing")]
#[command(long_about = "\
Cover image inspection, cropping and upload processing

Single-image commands write derivatives next to their source:

  cover.jpg
  ├── cover_square1200.jpg        # square   (centered, side = shorter edge)
  ├── cover_1600x900.jpg          # crop     (largest box with the given aspect)
  └── cover_480.jpg               # resize   (aspect kept, height derived)

'process' takes an upload through the whole pipeline: validate, move to
<storage>/<file-id>.<ext>, optimize (EXIF auto-rotate), derive the square,
aspect crop and resized widths from config.toml, and print the cover row.

Run 'coverkit gen-config' to generate a documented config.toml.")]
struct Cli {
    /// Directory containing config.toml
    #[arg(long, default_value = ".", global = true)]
    config: PathBuf,

    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Shared flags for commands that encode images.
#[derive(clap::Args, Clone)]
struct EncodeArgs {
    /// JPEG quality 1-100 (defaults to images.quality)
    #[arg(long)]
    quality: Option<u32>,
}

/// Shared flags for commands that write a derivative.
#[derive(clap::Args, Clone)]
struct WriteArgs {
    #[command(flatten)]
    encode: EncodeArgs,

    /// Output filename in the source directory (extension optional)
    #[arg(long)]
    output: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Print type, dimensions and EXIF rotation of an image
    Info { image: PathBuf },
    /// Auto-rotate and re-encode an image in place
    Optimize {
        image: PathBuf,
        #[command(flatten)]
        encode: EncodeArgs,
        /// Rotation in degrees, counter-clockwise positive (overrides EXIF)
        #[arg(long, allow_hyphen_values = true)]
        rotate: Option<i32>,
    },
    /// Crop a square (centered unless a full box is given)
    Square {
        image: PathBuf,
        #[arg(long)]
        left: Option<u32>,
        #[arg(long)]
        top: Option<u32>,
        /// Side of the square
        #[arg(long)]
        size: Option<u32>,
        #[command(flatten)]
        write: WriteArgs,
    },
    /// Crop the largest box with the given aspect (positioned with --left/--top)
    Crop {
        image: PathBuf,
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
        #[arg(long, requires = "top")]
        left: Option<u32>,
        #[arg(long, requires = "left")]
        top: Option<u32>,
        #[command(flatten)]
        write: WriteArgs,
    },
    /// Scale an image to a width, keeping its aspect ratio
    Resize {
        image: PathBuf,
        #[arg(long)]
        width: u32,
        #[command(flatten)]
        write: WriteArgs,
    },
    /// Process an upload into a stored cover and print its row as JSON
    Process {
        upload: PathBuf,
        /// Directory the cover is stored in
        #[arg(long)]
        storage: PathBuf,
        #[arg(long)]
        file_id: String,
        #[arg(long)]
        host: String,
        /// Storage root the recorded dir is relative to
        #[arg(long)]
        root: Option<PathBuf>,
        #[arg(long)]
        hide: bool,
        /// Uploader's secret key
        #[arg(long)]
        key: Option<String>,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_dir = cli.config;
    let load_config = || config::load_config(&config_dir);
    let backend = RustBackend::new();

    match cli.command {
        Command::Info { image } => {
            let image = ImageRef::open(&backend, &image)?;
            let rotation = imaging::exif_rotation(&backend, &image);
            output::print_info(&image, rotation);
        }
        Command::Optimize {
            image,
            encode,
            rotate,
        } => {
            let cfg = load_config()?;
            let rotation = rotate
                .map(|deg| {
                    Rotation::from_degrees(deg)
                        .ok_or_else(|| format!("--rotate must be a multiple of 90, got {deg}"))
                })
                .transpose()?;
            let mut image = ImageRef::open(&backend, &image)?;
            let applied =
                imaging::optimize(&backend, &mut image, quality(&encode, &cfg), rotation)?;
            output::print_optimized(&image, applied);
        }
        Command::Square {
            image,
            left,
            top,
            size,
            write,
        } => {
            let cfg = load_config()?;
            let image = ImageRef::open(&backend, &image)?;
            let request = SquareCropRequest {
                left,
                top,
                width: size,
            };
            let written = imaging::crop_square(
                &backend,
                &image,
                &request,
                quality(&write.encode, &cfg),
                write.output.as_deref(),
            )?;
            print_written(&backend, &written)?;
        }
        Command::Crop {
            image,
            width,
            height,
            left,
            top,
            write,
        } => {
            let cfg = load_config()?;
            let image = ImageRef::open(&backend, &image)?;
            let mode = if left.is_some() && top.is_some() {
                CropMode::Manual
            } else {
                CropMode::Auto
            };
            let request = CropRequest {
                left,
                top,
                width: Some(width),
                height: Some(height),
            };
            let written = imaging::crop(
                &backend,
                &image,
                &request,
                mode,
                quality(&write.encode, &cfg),
                write.output.as_deref(),
            )?;
            print_written(&backend, &written)?;
        }
        Command::Resize {
            image,
            width,
            write,
        } => {
            let cfg = load_config()?;
            let image = ImageRef::open(&backend, &image)?;
            let written = imaging::resize(
                &backend,
                &image,
                width,
                quality(&write.encode, &cfg),
                write.output.as_deref(),
            )?;
            print_written(&backend, &written)?;
        }
        Command::Process {
            upload,
            storage,
            file_id,
            host,
            root,
            hide,
            key,
        } => {
            let cfg = load_config()?;
            let request = UploadRequest {
                upload,
                storage_dir: storage,
                root,
                file_id,
                host,
                hide,
                key,
            };
            let processed = process_upload(&backend, &request, &cfg)
                .map_err(|e| output::format_cover_error(&e))?;
            for line in output::format_processed(&processed) {
                eprintln!("{}", line);
            }
            println!("{}", output::format_cover_row(&processed.cover)?);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Install the stderr log subscriber.
///
/// Respects RUST_LOG if set, otherwise `coverkit=info` (`debug` with `-v`).
fn init_tracing(verbose: bool) {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if verbose {
            "coverkit=debug".to_string()
        } else {
            "coverkit=info".to_string()
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();
}

/// CLI quality wins over config.
fn quality(args: &EncodeArgs, cfg: &CoverConfig) -> Quality {
    args.quality.map(Quality::new).unwrap_or_else(|| cfg.quality())
}

fn print_written(backend: &RustBackend, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let info = imaging::inspect(backend, path)?;
    println!("{}", output::format_written(path, &info));
    Ok(())
}
