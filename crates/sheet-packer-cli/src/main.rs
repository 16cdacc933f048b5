use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use globset::{Glob, GlobSet, GlobSetBuilder};
use image::{DynamicImage, ImageReader};
use serde::Deserialize;
use sheet_packer_core::{
    DEFAULT_METHOD, InputImage, LayoutItem, PackResult, PackerConfig, PackerKind,
    compute_trim_rect, get_packer_by_type, pack_images, pack_layout, to_json_array, to_json_hash,
};
use tracing::{error, info};
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(
    name = "sheet-packer",
    about = "Pack sprites into sprite sheets",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Show progress bars (disable with --progress false or --quiet)
    #[arg(long, default_value_t = true, action=ArgAction::Set, global=true, help_heading = "Logging/UX")]
    progress: bool,
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action=ArgAction::Count, global=true, help_heading = "Logging/UX")]
    verbose: u8,
    /// Quiet mode (overrides verbose)
    #[arg(
        short,
        long,
        default_value_t = false,
        global = true,
        help_heading = "Logging/UX"
    )]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Pack images into sheet PNGs plus JSON metadata
    Pack(PackArgs),
    /// Layout-only export (no PNGs): compute placements and export JSON
    Layout(PackArgs),
    /// List packers and their methods
    Packers {
        /// Print as JSON instead of a table
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[derive(Parser, Debug, Clone)]
struct PackArgs {
    // Input/Output
    /// Input file or directory
    #[arg(help_heading = "Input/Output")]
    input: PathBuf,
    /// Output directory
    #[arg(short, long, default_value = "out", help_heading = "Input/Output")]
    out_dir: PathBuf,
    /// Sheet base name (files will be name.png/.json)
    #[arg(short, long, default_value = "sheet", help_heading = "Input/Output")]
    name: String,
    /// YAML project file; its fields override the command line
    #[arg(long, help_heading = "Input/Output")]
    config: Option<PathBuf>,
    /// Include patterns (glob). If set, only files matching any pattern are considered
    #[arg(long, help_heading = "Input/Output")]
    include: Vec<String>,
    /// Exclude patterns (glob). Files matching any pattern will be ignored
    #[arg(long, help_heading = "Input/Output")]
    exclude: Vec<String>,
    /// JSON file holding the export order of a previous run; rewritten after packing
    #[arg(long, help_heading = "Input/Output")]
    order_file: Option<PathBuf>,

    // Naming
    /// Strip file extensions from sprite names
    #[arg(long, default_value_t = false, help_heading = "Naming")]
    remove_extension: bool,
    /// Prefix sprite names with the input folder name
    #[arg(long, default_value_t = false, help_heading = "Naming")]
    prepend_folder: bool,

    // Layout
    /// Sheet width
    #[arg(long, default_value_t = 2048, help_heading = "Layout")]
    width: u32,
    /// Sheet height
    #[arg(long, default_value_t = 2048, help_heading = "Layout")]
    height: u32,
    /// Ignore --width/--height and size the sheet from the sprites
    #[arg(long, default_value_t = false, help_heading = "Layout")]
    unbounded: bool,
    /// Report sheets at exactly --width/--height
    #[arg(long, default_value_t = false, help_heading = "Layout")]
    fixed_size: bool,
    /// Round sheet dims to powers of two
    #[arg(long, default_value_t = false, help_heading = "Layout")]
    pow2: bool,

    // Image Processing
    /// Allow rotation (90deg)
    #[arg(long, default_value_t = true, action=ArgAction::Set, help_heading = "Image Processing")]
    allow_rotation: bool,
    /// Border padding (around entire sheet)
    #[arg(long, default_value_t = 0, help_heading = "Image Processing")]
    border_padding: u32,
    /// Padding between sprites
    #[arg(long, default_value_t = 1, help_heading = "Image Processing")]
    sprite_padding: u32,
    /// Trim transparent borders
    #[arg(long, default_value_t = true, action=ArgAction::Set, help_heading = "Image Processing")]
    trim: bool,
    /// Trim alpha threshold (0..=255); alpha above it is opaque
    #[arg(long, default_value_t = 0, help_heading = "Image Processing")]
    alpha_threshold: u8,
    /// Pack identical sprites once
    #[arg(long, default_value_t = true, action=ArgAction::Set, help_heading = "Image Processing")]
    detect_identical: bool,

    // Packer
    /// Packer: MaxRects | Ordered | GridSearch | Growing | ShelfAllocator | Optimal
    #[arg(long, default_value = "MaxRects", help_heading = "Packer")]
    packer: String,
    /// Packer method (see `sheet-packer packers`); defaults to the packer's default
    #[arg(long, help_heading = "Packer")]
    method: Option<String>,
    /// Evaluate Optimal trials in parallel (requires feature `parallel`)
    #[arg(long, default_value_t = false, help_heading = "Packer")]
    parallel: bool,

    // Export
    /// Metadata format: json-hash | json-array
    #[arg(long, default_value = "json-hash", value_parser = ["json-hash", "json-array"], help_heading = "Export")]
    metadata: String,
    /// Export packing stats (JSON) to this file
    #[arg(long, help_heading = "Export")]
    export_stats: Option<PathBuf>,
    /// Print the merged configuration (after CLI/YAML) and exit
    #[arg(long, default_value_t = false, help_heading = "Export")]
    print_config: bool,
    /// Output format for --print-config: json|yaml
    #[arg(long, default_value = "json", value_parser = ["json", "yaml"], help_heading = "Export")]
    print_config_format: String,
    /// Dry run: compute layout and stats but do not write files
    #[arg(long, default_value_t = false, help_heading = "Export")]
    dry_run: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing_with_level(cli.quiet, cli.verbose);
    let progress = cli.progress && !cli.quiet;
    match &cli.command {
        Commands::Pack(args) => run_pack(args, progress, false),
        Commands::Layout(args) => run_pack(args, progress, true),
        Commands::Packers { json } => run_packers(*json),
    }
}

fn run_packers(json: bool) -> anyhow::Result<()> {
    if json {
        let list: Vec<serde_json::Value> = PackerKind::ALL
            .iter()
            .map(|k| {
                serde_json::json!({
                    "name": k.name(),
                    "defaultMethod": k.default_method(),
                    "needsNonRotation": k.needs_non_rotation(),
                    "methods": k.methods(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&list)?);
        return Ok(());
    }
    for kind in PackerKind::ALL {
        println!("{} (default: {})", kind.name(), kind.default_method());
        for m in kind.methods() {
            println!("  {:<20} {}", m.name, m.description);
        }
    }
    Ok(())
}

fn build_config(cli: &PackArgs) -> anyhow::Result<PackerConfig> {
    let kind = PackerKind::from_name(&cli.packer)?;
    let method = cli
        .method
        .clone()
        .unwrap_or_else(|| kind.default_method().to_string());
    let mut builder = PackerConfig::builder()
        .fixed_size(cli.fixed_size)
        .pow2(cli.pow2)
        .sprite_padding(cli.sprite_padding)
        .border_padding(cli.border_padding)
        .allow_trim(cli.trim)
        .alpha_threshold(cli.alpha_threshold)
        .allow_rotation(cli.allow_rotation)
        .detect_identical(cli.detect_identical)
        .packer(kind.name(), method)
        .parallel(cli.parallel);
    builder = if cli.unbounded {
        builder.unbounded()
    } else {
        builder.with_dimensions(cli.width, cli.height)
    };
    let mut cfg = builder.build();

    if let Some(path) = &cli.config {
        let file = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let y: YamlConfig = serde_yaml::from_str(&file)
            .with_context(|| format!("parse config {}", path.display()))?;
        cfg = y.into_packer_config(cfg);
    }
    if let Some(path) = &cli.order_file {
        if path.is_file() {
            let file = fs::read_to_string(path)
                .with_context(|| format!("read order file {}", path.display()))?;
            let order: Vec<String> = serde_json::from_str(&file)
                .with_context(|| format!("parse order file {}", path.display()))?;
            cfg.stored_order = Some(order);
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn run_pack(cli: &PackArgs, show_progress: bool, layout_only: bool) -> anyhow::Result<()> {
    let cfg = build_config(cli)?;

    if cli.print_config {
        match cli.print_config_format.as_str() {
            "yaml" => println!("{}", serde_yaml::to_string(&cfg)?),
            _ => println!("{}", serde_json::to_string_pretty(&cfg)?),
        }
        return Ok(());
    }

    let paths = gather_paths(&cli.input, &cli.include, &cli.exclude)?;
    let inputs = load_images_with_progress(&cli.input, &paths, cli, show_progress)?;
    info!(count = inputs.len(), "loaded input images");

    let (result, textures) = if layout_only {
        let items = layout_items(&inputs, &cfg);
        (pack_layout(items, cfg.clone())?, Vec::new())
    } else {
        let out = pack_images(inputs, cfg.clone())?;
        (out.result, out.textures)
    };

    let stats = result.stats();
    info!(
        sheets = result.sheets.len(),
        packer = result.packer.name(),
        method = %result.method,
        occupancy = format!("{:.2}%", stats.occupancy * 100.0),
        "stats"
    );

    if !cli.dry_run {
        fs::create_dir_all(&cli.out_dir)
            .with_context(|| format!("create out_dir {}", cli.out_dir.display()))?;
        for (sheet, rgba) in result.sheets.iter().zip(&textures) {
            let png_path = cli.out_dir.join(sheet_file_name(&cli.name, sheet.id, &result));
            rgba.save(&png_path)
                .with_context(|| format!("write {}", png_path.display()))?;
            info!(?png_path, id = sheet.id, "wrote sheet");
        }
        write_metadata(cli, &result)?;
        if let Some(path) = &cli.order_file {
            fs::write(path, serde_json::to_string_pretty(&result.export_order)?)
                .with_context(|| format!("write {}", path.display()))?;
        }
    }

    if let Some(stats_path) = &cli.export_stats {
        if cli.dry_run {
            println!("{}", stats.summary());
        } else {
            fs::write(stats_path, serde_json::to_string_pretty(&stats)?)
                .with_context(|| format!("write {}", stats_path.display()))?;
            info!(?stats_path, "stats exported");
        }
    }
    Ok(())
}

fn sheet_file_name(base: &str, id: usize, result: &PackResult) -> String {
    if result.sheets.len() == 1 {
        format!("{}.png", base)
    } else {
        format!("{}_{}.png", base, id)
    }
}

fn write_metadata(cli: &PackArgs, result: &PackResult) -> anyhow::Result<()> {
    let json_path = cli.out_dir.join(format!("{}.json", cli.name));
    let value = match cli.metadata.as_str() {
        "json-array" => to_json_array(result),
        _ => to_json_hash(result),
    };
    fs::write(&json_path, serde_json::to_string_pretty(&value)?)
        .with_context(|| format!("write {}", json_path.display()))?;
    info!(?json_path, sheets = result.sheets.len(), "metadata written");
    Ok(())
}

/// Trims up front and hands the visible pixels over as the identical-detection content.
fn layout_items(inputs: &[InputImage], cfg: &PackerConfig) -> Vec<LayoutItem> {
    inputs
        .iter()
        .map(|inp| {
            let rgba = inp.image.to_rgba8();
            let (w, h) = rgba.dimensions();
            let visible = if cfg.allow_trim {
                match compute_trim_rect(&rgba, cfg.alpha_threshold) {
                    (Some(_), visible) => visible,
                    (None, full) => full,
                }
            } else {
                sheet_packer_core::Rect::new(0, 0, w, h)
            };
            let content = image::imageops::crop_imm(&rgba, visible.x, visible.y, visible.w, visible.h)
                .to_image()
                .into_raw();
            LayoutItem {
                name: inp.name.clone(),
                w: visible.w,
                h: visible.h,
                sprite_source_size: Some(visible),
                source_size: Some((w, h)),
                trimmed: (visible.w, visible.h) != (w, h),
                content: Some(content),
            }
        })
        .collect()
}

fn build_globset(patterns: &[String]) -> anyhow::Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut b = GlobSetBuilder::new();
    for pat in patterns {
        b.add(Glob::new(pat).with_context(|| format!("bad glob {}", pat))?);
    }
    Ok(Some(b.build()?))
}

fn gather_paths(
    path: &Path,
    include: &[String],
    exclude: &[String],
) -> anyhow::Result<Vec<PathBuf>> {
    let inc_set = build_globset(include)?;
    let exc_set = build_globset(exclude)?;
    let mut list: Vec<PathBuf> = Vec::new();
    if path.is_file() {
        if !should_skip(path, inc_set.as_ref(), exc_set.as_ref()) && is_image(path) {
            list.push(path.to_path_buf());
        }
    } else {
        for entry in WalkDir::new(path).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && !should_skip(p, inc_set.as_ref(), exc_set.as_ref()) && is_image(p) {
                list.push(p.to_path_buf());
            }
        }
    }
    if list.is_empty() {
        anyhow::bail!("no images found under {}", path.display());
    }
    Ok(list)
}

fn should_skip(p: &Path, include: Option<&GlobSet>, exclude: Option<&GlobSet>) -> bool {
    let s = p.to_string_lossy().replace('\\', "/");
    if exclude.is_some_and(|ex| ex.is_match(&s)) {
        return true;
    }
    include.is_some_and(|inc| !inc.is_match(&s))
}

fn is_image(p: &Path) -> bool {
    matches!(
        p.extension()
            .and_then(|e| e.to_str())
            .map(|s| s.to_ascii_lowercase()),
        Some(ext) if matches!(ext.as_str(), "png" | "jpg" | "jpeg" | "bmp" | "tga" | "gif")
    )
}

/// Sprite name: path relative to the input root with `/` separators,
/// optionally without extension and prefixed by the root folder name.
fn sprite_name(root: &Path, p: &Path, cli: &PackArgs) -> String {
    let rel = if root.is_file() {
        p.file_name().map(Path::new).unwrap_or(p)
    } else {
        p.strip_prefix(root).unwrap_or(p)
    };
    let rel = if cli.remove_extension {
        rel.with_extension("")
    } else {
        rel.to_path_buf()
    };
    let mut name = rel.to_string_lossy().replace('\\', "/");
    if cli.prepend_folder {
        let folder = if root.is_file() { root.parent() } else { Some(root) };
        if let Some(folder) = folder.and_then(|f| f.file_name()) {
            name = format!("{}/{}", folder.to_string_lossy(), name);
        }
    }
    name
}

fn load_images_with_progress(
    root: &Path,
    paths: &[PathBuf],
    cli: &PackArgs,
    progress: bool,
) -> anyhow::Result<Vec<InputImage>> {
    use indicatif::{ProgressBar, ProgressStyle};
    let bar = if progress {
        let b = ProgressBar::new(paths.len() as u64);
        b.set_style(ProgressStyle::with_template(
            "{spinner:.green} loading {pos}/{len} [{elapsed_precise}] {wide_msg}",
        )?);
        Some(b)
    } else {
        None
    };
    let mut list = Vec::with_capacity(paths.len());
    for p in paths {
        if let Some(b) = &bar {
            let msg = p.file_name().and_then(|s| s.to_str()).unwrap_or("");
            b.set_message(msg.to_string());
        }
        match load_image(p) {
            Ok(img) => list.push(InputImage {
                name: sprite_name(root, p, cli),
                image: img,
            }),
            Err(e) => error!(?p, error = %e, "skip image"),
        }
        if let Some(b) = &bar {
            b.inc(1);
        }
    }
    if let Some(b) = &bar {
        b.finish_and_clear();
    }
    Ok(list)
}

fn load_image(p: &Path) -> anyhow::Result<DynamicImage> {
    let img = ImageReader::open(p)?.with_guessed_format()?.decode()?;
    Ok(img)
}

fn init_tracing_with_level(quiet: bool, verbose: u8) {
    let level = if quiet {
        "error".to_string()
    } else {
        match verbose {
            0 => "info".into(),
            1 => "debug".into(),
            _ => "trace".into(),
        }
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(level)
        .with_target(false)
        .try_init();
}

/// Project file. Every present field overrides the command line; packer
/// names saved by older versions resolve leniently.
#[derive(Debug, Deserialize, Default)]
struct YamlConfig {
    width: Option<u32>,
    height: Option<u32>,
    unbounded: Option<bool>,
    fixed_size: Option<bool>,
    power_of_two: Option<bool>,
    sprite_padding: Option<u32>,
    border_padding: Option<u32>,
    allow_trim: Option<bool>,
    alpha_threshold: Option<u8>,
    allow_rotation: Option<bool>,
    detect_identical: Option<bool>,
    packer: Option<String>,
    packer_method: Option<String>,
    parallel: Option<bool>,
}

impl YamlConfig {
    fn into_packer_config(self, mut cfg: PackerConfig) -> PackerConfig {
        if let Some(v) = self.width {
            cfg.width = Some(v);
        }
        if let Some(v) = self.height {
            cfg.height = Some(v);
        }
        if self.unbounded == Some(true) {
            cfg.width = None;
            cfg.height = None;
        }
        if let Some(v) = self.fixed_size {
            cfg.fixed_size = v;
        }
        if let Some(v) = self.power_of_two {
            cfg.power_of_two = v;
        }
        if let Some(v) = self.sprite_padding {
            cfg.sprite_padding = v;
        }
        if let Some(v) = self.border_padding {
            cfg.border_padding = v;
        }
        if let Some(v) = self.allow_trim {
            cfg.allow_trim = v;
        }
        if let Some(v) = self.alpha_threshold {
            cfg.alpha_threshold = v;
        }
        if let Some(v) = self.allow_rotation {
            cfg.allow_rotation = v;
        }
        if let Some(v) = self.detect_identical {
            cfg.detect_identical = v;
        }
        if let Some(v) = self.parallel {
            cfg.parallel = v;
        }
        if self.packer.is_some() || self.packer_method.is_some() {
            let packer = self.packer.unwrap_or_else(|| cfg.packer.clone());
            let method = saved_method(&packer, self.packer_method);
            let (kind, method) = PackerKind::resolve(&packer, &method);
            cfg.packer = kind.name().to_string();
            cfg.packer_method = method.to_string();
        }
        cfg
    }
}

/// Method for a saved packer name; a missing method means the packer's default.
fn saved_method(packer: &str, method: Option<String>) -> String {
    method.unwrap_or_else(|| {
        get_packer_by_type(packer)
            .map(|k| k.default_method())
            .unwrap_or(DEFAULT_METHOD)
            .to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pack_args(extra: &[&str]) -> PackArgs {
        let mut argv = vec!["sheet-packer", "pack", "sprites"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Pack(args) => args,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn sheet_size_defaults_and_unbounded() {
        let cfg = build_config(&pack_args(&[])).unwrap();
        assert_eq!((cfg.width, cfg.height), (Some(2048), Some(2048)));

        let cfg = build_config(&pack_args(&["--width", "512", "--height", "256"])).unwrap();
        assert_eq!((cfg.width, cfg.height), (Some(512), Some(256)));

        let cfg = build_config(&pack_args(&["--unbounded"])).unwrap();
        assert_eq!((cfg.width, cfg.height), (None, None));
    }

    #[test]
    fn project_file_packer_without_method_uses_its_default() {
        assert_eq!(saved_method("Growing", None), "SortedMaxSide");
        assert_eq!(saved_method("NoSuchPacker", None), DEFAULT_METHOD);
        assert_eq!(saved_method("Growing", Some("SortedArea".into())), "SortedArea");

        let y: YamlConfig = serde_yaml::from_str("packer: Ordered\n").unwrap();
        let cfg = y.into_packer_config(PackerConfig::default());
        assert_eq!(cfg.packer, "Ordered");
        assert_eq!(cfg.packer_method, "Unsorted");
    }
}
