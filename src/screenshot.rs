use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use rayon::prelude::*;
use tracing::info;
use walkdir::WalkDir;

use crate::args::WordsArgs;
use crate::ocr::WordRecognizer;
use crate::utils;

/// Screenshot extensions the pipeline accepts, compared case-insensitively.
const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

pub fn is_image_file(path: &Path) -> bool {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    matches!(ext.as_deref(), Some(ext) if IMAGE_EXTENSIONS.contains(&ext))
}

/// Resolves `path` into the screenshot files to process. A file is used
/// as-is; a directory yields its direct image-file entries, sorted. Nested
/// directories are skipped.
pub fn collect_screenshots(path: &Path) -> Result<Vec<PathBuf>> {
    let metadata = fs::metadata(path).with_context(|| format!("reading {}", path.display()))?;

    if !metadata.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }

    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && is_image_file(entry.path()))
        .map(|entry| entry.into_path())
        .collect();
    files.sort();

    info!(
        action = "collect",
        component = "screenshot_scan",
        directory = %path.display(),
        file_count = files.len(),
        "Collected image files from directory"
    );

    Ok(files)
}

// Zero would mean "rayon decides"; it falls back to the default instead.
pub fn worker_count(max_workers: Option<usize>) -> usize {
    match max_workers {
        Some(workers) if workers > 0 => workers,
        _ => std::cmp::min(num_cpus::get(), 8),
    }
}

/// Runs OCR over every file on a rayon pool, preserving input order in the
/// output. The first per-file error aborts the batch.
pub fn recognize_files(
    files: &[PathBuf],
    recognizer: &dyn WordRecognizer,
    max_workers: Option<usize>,
) -> Result<Vec<String>> {
    let workers = worker_count(max_workers);
    info!(
        action = "configure",
        component = "word_extraction",
        worker_count = workers,
        file_count = files.len(),
        "Using workers for recognition"
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .context("building worker pool")?;

    let start_time = Instant::now();
    let per_file: Vec<Vec<String>> = pool.install(|| {
        files
            .par_iter()
            .map(|path| {
                let content =
                    fs::read(path).with_context(|| format!("reading {}", path.display()))?;
                recognizer
                    .recognize_words(&content)
                    .with_context(|| format!("recognizing words in {}", path.display()))
            })
            .collect::<Result<_>>()
    })?;

    let words: Vec<String> = per_file.into_iter().flatten().collect();
    info!(
        action = "complete",
        component = "word_extraction",
        word_count = words.len(),
        duration_ms = start_time.elapsed().as_millis(),
        "Recognition completed"
    );

    Ok(words)
}

/// Writes one word per line.
pub fn write_words<W: Write>(words: &[String], writer: &mut W) -> Result<()> {
    for word in words {
        writeln!(writer, "{word}").context("writing word")?;
    }

    Ok(())
}

/// The `words` command: collect screenshots, recognize, then write the
/// words line-delimited to `--out` or stdout.
pub fn extract_words(args: &WordsArgs, recognizer: &dyn WordRecognizer) -> Result<()> {
    let files = collect_screenshots(&args.file)?;
    let words = recognize_files(&files, recognizer, args.workers)?;

    match &args.out {
        Some(out) => {
            info!(
                action = "write",
                component = "word_extraction",
                out = %out.display(),
                word_count = words.len(),
                "Writing words to file"
            );
            let mut file = utils::open_clean(out)?;
            write_words(&words, &mut file)?;
        }
        None => {
            let stdout = std::io::stdout();
            write_words(&words, &mut stdout.lock())?;
        }
    }

    Ok(())
}
