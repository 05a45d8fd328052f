use chrono::Utc;
use clap::{Parser, Subcommand};
use imgpress::settings::{OutputFormat, ProcessingSettings, Quality, ResizeMode};
use imgpress::{batch, export, output, settings, validate};
use std::path::{Path, PathBuf};

/// Flags that override individual settings fields. Applied last, after the
/// settings file and preset.
#[derive(clap::Args, Clone)]
struct SettingsArgs {
    /// Output format: png, jpeg, webp, avif
    #[arg(long)]
    format: Option<OutputFormat>,

    /// Encoding quality, 1-100 (lossy formats only)
    #[arg(long)]
    quality: Option<u8>,

    /// Target width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Target height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Resize mode when both dimensions are given: fit, fill, stretch
    #[arg(long)]
    mode: Option<ResizeMode>,

    /// Do not derive the missing dimension from the aspect ratio
    #[arg(long)]
    ignore_aspect: bool,

    /// Faster, lower-quality resampling
    #[arg(long)]
    fast: bool,

    /// Generate responsive WebP derivatives instead of a single output
    #[arg(long)]
    srcset: bool,
}

impl SettingsArgs {
    fn apply(&self, s: &mut ProcessingSettings) {
        if let Some(format) = self.format {
            s.format = format;
        }
        if let Some(quality) = self.quality {
            s.quality = Quality::new(quality);
        }
        if let Some(width) = self.width {
            s.width = Some(width);
        }
        if let Some(height) = self.height {
            s.height = Some(height);
        }
        if let Some(mode) = self.mode {
            s.resize_mode = mode;
        }
        if self.ignore_aspect {
            s.maintain_aspect_ratio = false;
        }
        if self.fast {
            s.optimize = false;
        }
        if self.srcset {
            s.generate_srcset = true;
        }
    }
}

#[derive(Parser)]
#[command(name = "imgpress")]
#[command(about = "Batch image resizing and re-encoding")]
#[command(long_about = "\
Batch image resizing and re-encoding

Reads JPEG, PNG, WebP and AVIF sources, resizes them to a target geometry
and re-encodes them in a modern format. A run produces one output per image
(default) or a set of responsive WebP derivatives (--srcset), plus an
export_info.json manifest describing the batch.

Settings resolve in order: built-in defaults, then --settings file, then
--preset, then individual flags. Run 'imgpress gen-settings' for a documented
settings.toml, 'imgpress presets' for the built-in presets.")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process images and export the results
    Optimize {
        /// Input image files
        inputs: Vec<PathBuf>,

        /// Scan a directory (recursively) for input images
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Export directory (default: imgpress_export_<date> in the cwd)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Settings file (sparse TOML, see gen-settings)
        #[arg(long)]
        settings: Option<PathBuf>,

        /// Built-in preset id (see presets)
        #[arg(long)]
        preset: Option<String>,

        /// Worker threads (default: CPU cores, capped at 8)
        #[arg(long, default_value_t = 0)]
        jobs: usize,

        #[command(flatten)]
        overrides: SettingsArgs,
    },
    /// List the built-in export presets
    Presets,
    /// Print a stock settings.toml with all options documented
    GenSettings,
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Resolve the settings for a run: defaults, settings file, preset, flags.
fn resolve_settings(
    settings_file: Option<&Path>,
    preset: Option<&str>,
    overrides: &SettingsArgs,
) -> Result<ProcessingSettings, settings::SettingsError> {
    let mut resolved = match settings_file {
        Some(path) => ProcessingSettings::load(path)?,
        None => ProcessingSettings::default(),
    };
    if let Some(id) = preset {
        let preset = settings::find_preset(id)?;
        resolved.format = preset.format;
        resolved.quality = Quality::new(preset.quality);
        resolved.width = preset.width;
        resolved.height = preset.height;
    }
    overrides.apply(&mut resolved);
    resolved.normalize();
    Ok(resolved)
}

/// Collect input files: explicit paths as given, plus a recursive directory
/// scan filtered by extension. Scan results are sorted for stable output.
fn collect_inputs(
    inputs: &[PathBuf],
    dir: Option<&Path>,
) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut files: Vec<PathBuf> = inputs.to_vec();
    if let Some(dir) = dir {
        let mut scanned = Vec::new();
        for entry in walkdir::WalkDir::new(dir) {
            let entry = entry?;
            if entry.file_type().is_file() && validate::has_input_extension(entry.path()) {
                scanned.push(entry.into_path());
            }
        }
        scanned.sort();
        files.extend(scanned);
    }
    Ok(files)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Optimize {
            inputs,
            dir,
            out,
            settings: settings_file,
            preset,
            jobs,
            overrides,
        } => {
            let resolved = resolve_settings(settings_file.as_deref(), preset.as_deref(), &overrides)?;
            let files = collect_inputs(&inputs, dir.as_deref())?;
            if files.is_empty() {
                return Err("no input files (pass paths or --dir)".into());
            }

            let options = batch::BatchOptions {
                jobs,
                ..Default::default()
            };

            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    if let Some(line) = output::format_progress(&event) {
                        println!("{line}");
                    }
                }
            });
            let report = batch::run_batch(&files, &resolved, &options, Some(tx));
            printer.join().expect("printer thread");

            println!();
            output::print_report(&report);

            if report.processed.is_empty() {
                return Err("no images were processed successfully".into());
            }

            let out_dir = out.unwrap_or_else(|| {
                PathBuf::from(export::default_export_dir_name(Utc::now().date_naive()))
            });
            let mut sink = export::DirectorySink::new(&out_dir);
            let summary = export::export(&report, &resolved, preset.as_deref(), &mut sink)?;
            output::print_export(&summary, &out_dir);
        }
        Command::Presets => {
            output::print_presets(settings::PRESETS);
        }
        Command::GenSettings => {
            print!("{}", ProcessingSettings::stock_toml());
        }
    }

    Ok(())
}
