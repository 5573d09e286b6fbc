// ============================================================================
// retouch CLI — headless batch processing via command-line arguments
// ============================================================================
//
// Usage examples:
//   retouch --input photo.png --ops blur_faces.json --output result.png
//   retouch -i photo.jpg -o out.png                  (format inferred from output ext)
//   retouch -i "gallery/*.jpg" --ops redact.json --output-dir processed/ --format webp
//   retouch -i a.png b.png c.png --output-dir out/
//
// Each input image gets its own editor session; the ops script (if any) is
// replayed against it, then the composite is flattened, encoded and written.
// Failures are reported per file — the rest of the batch still runs.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::geometry::Size;
use crate::io::ExportFormat;
use crate::script::{self, EditScript};
use crate::session::EditorSession;
use crate::{log_err, log_info};

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// retouch headless image processor.
///
/// Replay recorded edit operations (pixelate/blur/erase strokes, crops) on
/// image files and export the result — no GUI required.
#[derive(Parser, Debug)]
#[command(
    name = "retouch",
    about = "Headless region-retouch batch processor",
    long_about = "Replay a recorded ops script (JSON) against image files and write the\n\
                  flattened results. Supports PNG, JPEG and WEBP output.\n\n\
                  Example:\n  \
                  retouch --input photo.png --ops redact.json --output result.png\n  \
                  retouch -i \"gallery/*.jpg\" --ops redact.json --output-dir out/ --format png"
)]
pub struct CliArgs {
    /// Input file(s). Glob patterns accepted (e.g. "*.png", "shots/*.jpg").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// JSON ops script replayed against each input image.
    /// If omitted, images are only loaded and re-saved (format conversion).
    #[arg(long, value_name = "OPS.json")]
    pub ops: Option<PathBuf>,

    /// Output file path. Only valid for single-file input.
    /// For batch input use --output-dir instead.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.
    /// Files are written here with the original stem and the target format's extension.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Output format: png, jpeg, webp.
    /// When omitted, the format is inferred from --output's extension, defaulting to png.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// JPEG quality (1–100, default 90).
    #[arg(short, long, default_value_t = 90, value_name = "1-100")]
    pub quality: u8,

    /// Display viewport the script's coordinates were recorded against.
    /// The canvas is fitted into 80% x 65% of this box, as in the editor UI.
    #[arg(long, value_name = "WxH", default_value = "1920x1080")]
    pub viewport: String,

    /// Print per-file timing information.
    #[arg(short, long)]
    pub verbose: bool,
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = one or more files failed.
pub fn run(args: CliArgs) -> ExitCode {
    // Resolve glob patterns / literal paths → concrete PathBufs
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    // Multiple inputs require --output-dir, not --output
    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    let format = parse_format(args.format.as_deref(), args.output.as_deref());

    let viewport = match parse_viewport(&args.viewport) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("error: invalid --viewport '{}': {}", args.viewport, e);
            return ExitCode::FAILURE;
        }
    };

    // Load the ops script once, up front
    let ops: Option<EditScript> = match &args.ops {
        Some(path) => match script::load(path) {
            Ok(s) => Some(s),
            Err(e) => {
                eprintln!("error: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => None,
    };

    // Create output directory if specified
    if let Some(dir) = &args.output_dir {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!(
                "error: could not create output directory '{}': {}",
                dir.display(),
                e
            );
            return ExitCode::FAILURE;
        }
    }

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }

        let file_start = Instant::now();

        let output_path = match build_output_path(
            input_path,
            args.output.as_deref(),
            args.output_dir.as_deref(),
            format,
        ) {
            Some(p) => p,
            None => {
                eprintln!(
                    "  error: cannot determine output path for '{}'.",
                    input_path.display()
                );
                any_failure = true;
                continue;
            }
        };

        match run_one(
            input_path,
            &output_path,
            ops.as_ref(),
            format,
            args.quality,
            viewport,
            idx,
        ) {
            Ok(()) => {
                log_info!("processed {}", input_path.display());
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        output_path.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                log_err!("{}: {}", input_path.display(), e);
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    if any_failure {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

// ============================================================================
// Per-file processing pipeline
// ============================================================================

fn run_one(
    input: &Path,
    output: &Path,
    ops: Option<&EditScript>,
    format: ExportFormat,
    quality: u8,
    viewport: Size,
    batch_index: usize,
) -> Result<(), String> {
    // -- Step 1: Load ----------------------------------------------------
    let mut session =
        EditorSession::open_path(input, viewport).map_err(|e| format!("load failed: {}", e))?;

    // -- Step 2: Replay ops (optional) -----------------------------------
    if let Some(ops) = ops {
        script::apply(ops, &mut session);
    }

    // -- Step 3: Flatten, encode, write ----------------------------------
    let result = session
        .export(format, quality, batch_index)
        .map_err(|e| e.to_string())?;
    std::fs::write(output, &result.bytes).map_err(|e| format!("write failed: {}", e))?;

    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);

        if as_path.exists() {
            // Literal path — use directly
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        // Treat as glob pattern
        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

/// Choose the [`ExportFormat`] from the `--format` string or infer it from
/// the output file extension. Defaults to PNG when neither is known.
fn parse_format(format_arg: Option<&str>, output: Option<&Path>) -> ExportFormat {
    if let Some(f) = format_arg {
        return ExportFormat::from_ext(f).unwrap_or(ExportFormat::Png);
    }

    if let Some(out) = output {
        let ext = out.extension().and_then(|e| e.to_str()).unwrap_or("");
        return ExportFormat::from_ext(ext).unwrap_or(ExportFormat::Png);
    }

    ExportFormat::Png
}

/// Parse a "WIDTHxHEIGHT" viewport specification.
fn parse_viewport(arg: &str) -> Result<Size, String> {
    let (w, h) = arg
        .split_once(['x', 'X'])
        .ok_or_else(|| "expected WIDTHxHEIGHT".to_string())?;
    let w: f32 = w.trim().parse().map_err(|_| format!("bad width '{}'", w))?;
    let h: f32 = h.trim().parse().map_err(|_| format!("bad height '{}'", h))?;
    if w <= 0.0 || h <= 0.0 {
        return Err("viewport must be positive".to_string());
    }
    Ok(Size::new(w, h))
}

/// Compute the output path for a single input file.
///
/// Priority:
/// 1. `--output` (explicit path, used for single-file input)
/// 2. `--output-dir` (batch directory, derives filename from input stem)
/// 3. Fallback: same directory as input, same stem, new extension
///    (appends `_out` to stem if it would collide with the input path)
fn build_output_path(
    input: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
    format: ExportFormat,
) -> Option<PathBuf> {
    // Explicit output path
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let ext = format.extension();
    let stem = input.file_stem()?.to_string_lossy().into_owned();

    if let Some(dir) = output_dir {
        return Some(dir.join(format!("{}.{}", stem, ext)));
    }

    // Write next to the input file
    let parent = input.parent().unwrap_or(Path::new("."));
    let candidate = parent.join(format!("{}.{}", stem, ext));

    // Avoid silent overwrite of the input
    if candidate == input {
        Some(parent.join(format!("{}_out.{}", stem, ext)))
    } else {
        Some(candidate)
    }
}
