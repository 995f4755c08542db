use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use image::RgbaImage;
use serde::de::DeserializeOwned;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use color_engine::colorspace::hex_to_rgb;
use color_engine::knockout::knockout_with_progress;
use color_engine::palette_extract::extract_palette_with_progress;
use color_engine::recolor::{mapping_conflicts, recolor_with_progress, slot_colors};
use color_engine::region::detect_region_with_progress;
use color_engine::texture_cut::cut_with_texture_with_progress;
use color_engine::{
    CutSettings, KnockoutSettings, PaletteSettings, Progress, RecolorSettings, RegionSettings,
    RgbColor, TransformSettings,
};

#[derive(Parser)]
#[command(name = "color-engine")]
#[command(about = "Run the photo editor's color operations on image files")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Remove pixels close to one or more colors
    Knockout {
        #[arg(short, long)]
        input: PathBuf,

        /// Output PNG file path
        #[arg(short, long)]
        output: PathBuf,

        /// Target colors as comma-separated hex (e.g. "#00ff00,#10e010")
        #[arg(short, long)]
        colors: String,

        /// JSON file with knockout settings
        #[arg(short, long)]
        settings: Option<PathBuf>,
    },
    /// Print the dominant colors as JSON
    Palette {
        #[arg(short, long)]
        input: PathBuf,

        /// JSON file with palette settings
        #[arg(short, long)]
        settings: Option<PathBuf>,
    },
    /// Flood-fill from a seed pixel and print the region summary as JSON
    Region {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short)]
        x: u32,

        #[arg(short)]
        y: u32,

        /// JSON file with region settings
        #[arg(short, long)]
        settings: Option<PathBuf>,

        /// Write the region as a grayscale selection mask
        #[arg(long)]
        mask: Option<PathBuf>,
    },
    /// Swap palette slots for new colors
    Recolor {
        #[arg(short, long)]
        input: PathBuf,

        /// Output PNG file path
        #[arg(short, long)]
        output: PathBuf,

        /// Palette slots as comma-separated hex; extracted from the image when omitted
        #[arg(short, long)]
        palette: Option<String>,

        /// JSON file with recolor settings (including the mappings)
        #[arg(short, long)]
        settings: PathBuf,
    },
    /// Cut the image's alpha with a texture
    Cut {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        texture: PathBuf,

        /// Output PNG file path
        #[arg(short, long)]
        output: PathBuf,

        /// JSON file with cut settings
        #[arg(long)]
        cut_settings: Option<PathBuf>,

        /// JSON file with texture transform settings
        #[arg(long)]
        transform_settings: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "color_engine=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    let cli = Cli::parse();
    let mut progress = |p: Progress| {
        tracing::trace!(stage = ?p.stage, done = p.done, total = p.total, "progress");
    };

    match cli.command {
        Commands::Knockout {
            input,
            output,
            colors,
            settings,
        } => {
            let img = load_rgba(&input)?;
            let targets = parse_colors(&colors)?;
            let settings: KnockoutSettings = load_settings(settings.as_deref())?;
            let result = knockout_with_progress(&img, &targets, &settings, &mut progress)?;
            save_png(&result.image, &output)?;
            println!("Knocked out {} pixels ({} on edges)", result.matched, result.edge_pixels);
        }
        Commands::Palette { input, settings } => {
            let img = load_rgba(&input)?;
            let settings: PaletteSettings = load_settings(settings.as_deref())?;
            let palette = extract_palette_with_progress(&img, &settings, &mut progress)?;
            println!("{}", serde_json::to_string_pretty(&palette)?);
        }
        Commands::Region {
            input,
            x,
            y,
            settings,
            mask,
        } => {
            let img = load_rgba(&input)?;
            let settings: RegionSettings = load_settings(settings.as_deref())?;
            let region = detect_region_with_progress(&img, (x, y), &settings, &mut progress)?;

            if let Some(mask_path) = mask {
                let mask_img = region.mask(img.width(), img.height());
                ensure_parent(&mask_path)?;
                mask_img
                    .save(&mask_path)
                    .with_context(|| format!("Failed to write {}", mask_path.display()))?;
            }

            let summary = serde_json::json!({
                "bounds": region.bounds,
                "average_color": region.average_color,
                "lab_color": region.lab_color,
                "pixel_count": region.pixel_count,
                "coverage": region.coverage,
                "confidence": region.confidence,
                "truncated": region.truncated,
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Recolor {
            input,
            output,
            palette,
            settings,
        } => {
            let img = load_rgba(&input)?;
            let settings: RecolorSettings = load_settings(Some(settings.as_path()))?;
            let slots = match palette {
                Some(list) => parse_colors(&list)?,
                None => slot_colors(&extract_palette_with_progress(
                    &img,
                    &PaletteSettings::default(),
                    &mut progress,
                )?),
            };

            for conflict in mapping_conflicts(&slots, &settings, 5.0)? {
                tracing::warn!(
                    first = conflict.first,
                    second = conflict.second,
                    reason = ?conflict.reason,
                    "mappings may interfere"
                );
            }

            let result = recolor_with_progress(&img, &slots, &settings, &mut progress)?;
            save_png(&result.image, &output)?;
            println!("Recolored pixels per mapping: {:?}", result.affected);
        }
        Commands::Cut {
            input,
            texture,
            output,
            cut_settings,
            transform_settings,
        } => {
            let base = load_rgba(&input)?;
            let texture_img = load_rgba(&texture)?;
            let cut: CutSettings = load_settings(cut_settings.as_deref())?;
            let transform: TransformSettings = load_settings(transform_settings.as_deref())?;
            let result = cut_with_texture_with_progress(&base, &texture_img, &cut, &transform, &mut progress)?;
            save_png(&result.image, &output)?;
            println!("Cut alpha on {} pixels", result.affected);
        }
    }

    Ok(())
}

fn load_rgba(path: &Path) -> anyhow::Result<RgbaImage> {
    let img = image::open(path).with_context(|| format!("Failed to load {}", path.display()))?;
    Ok(img.to_rgba8())
}

/// PNG keeps the alpha channel losslessly
fn save_png(img: &RgbaImage, path: &Path) -> anyhow::Result<()> {
    ensure_parent(path)?;
    img.save_with_format(path, image::ImageFormat::Png)
        .with_context(|| format!("Failed to write {}", path.display()))
}

fn ensure_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

fn load_settings<T: DeserializeOwned + Default>(path: Option<&Path>) -> anyhow::Result<T> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read settings {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Invalid settings in {}", path.display()))
        }
        None => Ok(T::default()),
    }
}

fn parse_colors(list: &str) -> anyhow::Result<Vec<RgbColor>> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|hex| hex_to_rgb(hex).map_err(anyhow::Error::from))
        .collect()
}
