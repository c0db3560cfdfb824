use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use tex_atlas_core::config::{OptimizeFailurePolicy, PackingAlgorithm};
use tex_atlas_core::{AtlasConfig, AtlasSession, BuildDiff, SourceAsset};
use tracing::{info, warn};
use walkdir::WalkDir;

#[derive(Parser, Debug)]
#[command(
    name = "tex-atlas",
    about = "Pack images into content-addressed texture atlases",
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
    /// Pack images into atlas PNG + plist pairs
    Pack(PackArgs),
    /// Simple timing bench (packs once without writing, prints time + occupancy)
    Bench(BenchArgs),
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
    /// Prefix joined in front of emitted file names (relative to out_dir)
    #[arg(long, default_value = "", help_heading = "Input/Output")]
    output_path: String,
    /// YAML config file path (values override the flags below)
    #[arg(long, help_heading = "Input/Output")]
    config: Option<PathBuf>,
    /// Include patterns (glob). If set, only files matching any pattern are considered
    #[arg(long, help_heading = "Input/Output")]
    include: Vec<String>,
    /// Exclude patterns (glob). Files matching any pattern will be ignored
    #[arg(long, help_heading = "Input/Output")]
    exclude: Vec<String>,
    /// File extensions to collect (repeatable)
    #[arg(long = "ext", default_values_t = vec!["png".to_string()], help_heading = "Input/Output")]
    extensions: Vec<String>,

    // Layout
    /// Max bin width
    #[arg(long, default_value_t = 2048, help_heading = "Layout")]
    max_width: u32,
    /// Max bin height
    #[arg(long, default_value_t = 2048, help_heading = "Layout")]
    max_height: u32,
    /// Padding between sprites
    #[arg(long, default_value_t = 1, help_heading = "Layout")]
    padding: u32,
    /// Shrink bins to their content
    #[arg(long, default_value_t = true, action=ArgAction::Set, help_heading = "Layout")]
    smart_sizing: bool,
    /// Allow non-square bins
    #[arg(long, default_value_t = true, action=ArgAction::Set, help_heading = "Layout")]
    allow_non_square: bool,
    /// Allow bin sides that are not powers of two
    #[arg(long, default_value_t = true, action=ArgAction::Set, help_heading = "Layout")]
    allow_non_power_of_two: bool,
    /// Algorithm: guillotine | maxrects
    #[arg(long, value_parser = ["guillotine", "maxrects"], default_value = "guillotine", help_heading = "Layout")]
    algorithm: String,
    /// Fail when more than this many bins would be needed
    #[arg(long, help_heading = "Layout")]
    max_bins: Option<usize>,

    // Output files
    /// Hex digits of the content hash used in file names (default: full digest)
    #[arg(long, help_heading = "Output")]
    hash_length: Option<usize>,
    /// Run the lossless PNG optimizer
    #[arg(long, default_value_t = true, action=ArgAction::Set, help_heading = "Output")]
    optimize: bool,
    /// Optimizer preset level (0..=6)
    #[arg(long, default_value_t = 2, help_heading = "Output")]
    optimization_level: u8,
    /// Optimizer failure policy: fallback | fail
    #[arg(long, value_parser = ["fallback", "fail"], default_value = "fallback", help_heading = "Output")]
    on_optimize_failure: String,
    /// Decode and render on multiple threads (requires core feature `parallel`)
    #[arg(long, default_value_t = false, help_heading = "Output")]
    parallel: bool,

    // Export
    /// Run the build N times in one session (later runs should be no-ops)
    #[arg(long, default_value_t = 1, help_heading = "Export")]
    repeat: u32,
    /// Export packing stats (JSON) to this file
    #[arg(long, help_heading = "Export")]
    export_stats: Option<PathBuf>,
    /// Print the merged configuration (after CLI/YAML) and exit
    #[arg(long, default_value_t = false, help_heading = "Export")]
    print_config: bool,
    /// Output format for --print-config: json|yaml
    #[arg(long, default_value = "json", value_parser = ["json", "yaml"], help_heading = "Export")]
    print_config_format: String,
    /// Dry run: build and report, but do not write files
    #[arg(long, default_value_t = false, help_heading = "Export")]
    dry_run: bool,
}

#[derive(Parser, Debug, Clone)]
struct BenchArgs {
    /// Input directory
    input: PathBuf,
    /// Algorithm: guillotine | maxrects
    #[arg(long, value_parser = ["guillotine", "maxrects"], default_value = "guillotine")]
    algorithm: String,
    /// Run the lossless PNG optimizer as part of the timing
    #[arg(long, default_value_t = false)]
    optimize: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing_with_level(cli.quiet, cli.verbose);
    match &cli.command {
        Commands::Pack(args) => run_pack(args, cli.progress && !cli.quiet),
        Commands::Bench(b) => run_bench(b),
    }
}

fn run_pack(cli: &PackArgs, show_progress: bool) -> anyhow::Result<()> {
    let mut cfg = AtlasConfig {
        output_path: cli.output_path.clone(),
        max_width: cli.max_width,
        max_height: cli.max_height,
        padding: cli.padding,
        smart_sizing: cli.smart_sizing,
        allow_non_square: cli.allow_non_square,
        allow_non_power_of_two: cli.allow_non_power_of_two,
        hash_length: cli.hash_length,
        algorithm: parse_algorithm(&cli.algorithm)?,
        max_bins: cli.max_bins,
        optimize: cli.optimize,
        optimization_level: cli.optimization_level,
        on_optimize_failure: parse_failure_policy(&cli.on_optimize_failure)?,
        parallel: cli.parallel,
    };
    if let Some(path) = &cli.config {
        let file = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let y: YamlConfig = serde_yaml::from_str(&file)
            .with_context(|| format!("parse config {}", path.display()))?;
        cfg = y.merge_into(cfg);
    }

    if cli.print_config {
        match cli.print_config_format.as_str() {
            "yaml" => println!("{}", serde_yaml::to_string(&cfg)?),
            _ => println!("{}", serde_json::to_string_pretty(&cfg)?),
        }
        return Ok(());
    }

    let paths = gather_paths(&cli.input, &cli.include, &cli.exclude, &cli.extensions)?;
    let inputs = read_sources_with_progress(&paths, show_progress)?;
    info!(count = inputs.len(), "loaded input files");

    if !cli.dry_run {
        fs::create_dir_all(&cli.out_dir)
            .with_context(|| format!("create out_dir {}", cli.out_dir.display()))?;
    }

    let mut session = AtlasSession::new(cfg)?;
    let mut last: Option<BuildDiff> = None;
    for run in 0..cli.repeat.max(1) {
        let start = Instant::now();
        let diff = session.build(inputs.iter().cloned())?;
        for w in &diff.warnings {
            warn!(error = %w, "recoverable build issue");
        }
        if !cli.dry_run {
            write_artifacts(&cli.out_dir, &diff)?;
        }
        for name in &diff.unchanged {
            info!(file = %name, "unchanged");
        }
        info!(
            run,
            produced = diff.produced.len(),
            unchanged = diff.unchanged.len(),
            consumed = diff.consumed.len(),
            time = fmt_dur(start.elapsed()),
            "run finished"
        );
        last = Some(diff);
    }

    let Some(diff) = last else {
        return Ok(());
    };
    let stats = diff.stats;
    info!(
        bins = stats.num_bins,
        frames = stats.num_frames,
        used_area = stats.used_frame_area,
        total_area = stats.total_bin_area,
        wasted_area = stats.wasted_area(),
        occupancy = format!("{:.2}%", stats.occupancy * 100.0),
        "stats"
    );

    if let Some(stats_path) = &cli.export_stats {
        if !cli.dry_run {
            fs::write(stats_path, serde_json::to_string_pretty(&stats)?)
                .with_context(|| format!("write {}", stats_path.display()))?;
            info!(?stats_path, "stats exported");
        } else {
            println!("{}", stats.summary());
        }
    }
    Ok(())
}

fn write_artifacts(out_dir: &Path, diff: &BuildDiff) -> anyhow::Result<()> {
    for artifact in &diff.produced {
        let path = out_dir.join(&artifact.file_name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(&path, &artifact.bytes).with_context(|| format!("write {}", path.display()))?;
        info!(?path, bin = artifact.bin, bytes = artifact.len(), "wrote artifact");
    }
    Ok(())
}

fn run_bench(b: &BenchArgs) -> anyhow::Result<()> {
    let paths = gather_paths(&b.input, &[], &[], &["png".to_string()])?;
    let inputs = read_sources_with_progress(&paths, false)?;
    let cfg = AtlasConfig {
        algorithm: parse_algorithm(&b.algorithm)?,
        optimize: b.optimize,
        ..Default::default()
    };
    let start = Instant::now();
    let out = tex_atlas_core::pack(inputs, &cfg)?;
    let dur = start.elapsed();
    let stats = out.stats();
    println!(
        "bins={} occupancy={:.2}% time={}",
        stats.num_bins,
        stats.occupancy * 100.0,
        fmt_dur(dur)
    );
    Ok(())
}

fn fmt_dur(d: Duration) -> String {
    let ms = d.as_secs_f64() * 1000.0;
    if ms >= 1.0 {
        format!("{:.1}ms", ms)
    } else {
        format!("{}us", d.as_micros())
    }
}

fn parse_algorithm(s: &str) -> anyhow::Result<PackingAlgorithm> {
    s.parse()
        .map_err(|_| anyhow::anyhow!("unknown algorithm: {}", s))
}

fn parse_failure_policy(s: &str) -> anyhow::Result<OptimizeFailurePolicy> {
    s.parse()
        .map_err(|_| anyhow::anyhow!("unknown optimize failure policy: {}", s))
}

fn build_globset(patterns: &[String]) -> anyhow::Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut b = GlobSetBuilder::new();
    for pat in patterns {
        b.add(Glob::new(pat).with_context(|| format!("invalid glob {pat}"))?);
    }
    Ok(Some(b.build()?))
}

fn gather_paths(
    path: &Path,
    include: &[String],
    exclude: &[String],
    extensions: &[String],
) -> anyhow::Result<Vec<PathBuf>> {
    let inc_set = build_globset(include)?;
    let exc_set = build_globset(exclude)?;
    let accept = |p: &Path| {
        !should_skip(p, inc_set.as_ref(), exc_set.as_ref()) && has_extension(p, extensions)
    };
    let mut list: Vec<PathBuf> = Vec::new();
    if path.is_file() {
        if accept(path) {
            list.push(path.to_path_buf());
        }
    } else {
        for entry in WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let p = entry.path();
            if p.is_file() && accept(p) {
                list.push(p.to_path_buf());
            }
        }
    }
    Ok(list)
}

fn should_skip(p: &Path, include: Option<&GlobSet>, exclude: Option<&GlobSet>) -> bool {
    let s = p.to_string_lossy().replace('\\', "/");
    if let Some(ex) = exclude {
        if ex.is_match(&s) {
            return true;
        }
    }
    if let Some(inc) = include {
        if !inc.is_match(&s) {
            return true;
        }
    }
    false
}

fn has_extension(p: &Path, extensions: &[String]) -> bool {
    p.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            extensions
                .iter()
                .any(|want| want.trim_start_matches('.').eq_ignore_ascii_case(ext))
        })
}

/// Reads every file into memory, keyed by its base name. Later files with the
/// same base name replace earlier ones inside the core.
fn read_sources_with_progress(
    paths: &[PathBuf],
    progress: bool,
) -> anyhow::Result<Vec<(String, SourceAsset)>> {
    use indicatif::{ProgressBar, ProgressStyle};
    let bar = if progress {
        let b = ProgressBar::new(paths.len() as u64);
        b.set_style(ProgressStyle::with_template(
            "{spinner:.green} reading {pos}/{len} [{elapsed_precise}] {wide_msg}",
        )?);
        Some(b)
    } else {
        None
    };
    let mut list = Vec::with_capacity(paths.len());
    for p in paths {
        let key = p
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        if let Some(b) = &bar {
            b.set_message(key.clone());
        }
        let bytes = fs::read(p).with_context(|| format!("read {}", p.display()))?;
        list.push((key, SourceAsset::new(bytes)));
        if let Some(b) = &bar {
            b.inc(1);
        }
    }
    if let Some(b) = &bar {
        b.finish_and_clear();
    }
    Ok(list)
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

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct YamlConfig {
    output_path: Option<String>,
    max_width: Option<u32>,
    max_height: Option<u32>,
    padding: Option<u32>,
    smart_sizing: Option<bool>,
    allow_non_square: Option<bool>,
    allow_non_power_of_two: Option<bool>,
    hash_length: Option<usize>,
    algorithm: Option<PackingAlgorithm>,
    max_bins: Option<usize>,
    optimize: Option<bool>,
    optimization_level: Option<u8>,
    on_optimize_failure: Option<OptimizeFailurePolicy>,
    parallel: Option<bool>,
}

impl YamlConfig {
    fn merge_into(self, mut cfg: AtlasConfig) -> AtlasConfig {
        if let Some(v) = self.output_path {
            cfg.output_path = v;
        }
        if let Some(v) = self.max_width {
            cfg.max_width = v;
        }
        if let Some(v) = self.max_height {
            cfg.max_height = v;
        }
        if let Some(v) = self.padding {
            cfg.padding = v;
        }
        if let Some(v) = self.smart_sizing {
            cfg.smart_sizing = v;
        }
        if let Some(v) = self.allow_non_square {
            cfg.allow_non_square = v;
        }
        if let Some(v) = self.allow_non_power_of_two {
            cfg.allow_non_power_of_two = v;
        }
        if let Some(v) = self.hash_length {
            cfg.hash_length = Some(v);
        }
        if let Some(v) = self.algorithm {
            cfg.algorithm = v;
        }
        if let Some(v) = self.max_bins {
            cfg.max_bins = Some(v);
        }
        if let Some(v) = self.optimize {
            cfg.optimize = v;
        }
        if let Some(v) = self.optimization_level {
            cfg.optimization_level = v;
        }
        if let Some(v) = self.on_optimize_failure {
            cfg.on_optimize_failure = v;
        }
        if let Some(v) = self.parallel {
            cfg.parallel = v;
        }
        cfg
    }
}
