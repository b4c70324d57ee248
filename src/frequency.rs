use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use rayon::prelude::*;
use tracing::info;

use crate::analysis::{analyze_words_frequency, AnalysisResult};
use crate::args::FrequencyArgs;
use crate::ocr::{self, TesseractCli, WordRecognizer};
use crate::screenshot::{self, collect_screenshots, is_image_file};
use crate::utils;

/// Where an analysis run draws its words from.
enum WordSource {
    Screenshots(Vec<PathBuf>),
    Text(PathBuf),
}

/// A directory or an image-extension file is a screenshot source; any other
/// file is read as whitespace-delimited text.
fn resolve_source(path: &Path) -> Result<WordSource> {
    let metadata = fs::metadata(path).with_context(|| format!("reading {}", path.display()))?;

    if metadata.is_dir() || is_image_file(path) {
        Ok(WordSource::Screenshots(collect_screenshots(path)?))
    } else {
        Ok(WordSource::Text(path.to_path_buf()))
    }
}

fn new_analysis(label: Option<&str>) -> Result<AnalysisResult> {
    let analysis = match label {
        Some(label) => AnalysisResult::with_label(label)?,
        None => AnalysisResult::new()?,
    };

    Ok(analysis)
}

fn analyze_text_file(path: &Path, label: Option<&str>) -> Result<AnalysisResult> {
    let content =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let words = ocr::split_words(&content);

    info!(
        action = "scan",
        component = "frequency",
        file = %path.display(),
        word_count = words.len(),
        "Scanned words from text file"
    );

    match label {
        None => Ok(analyze_words_frequency(Some(&words))?),
        Some(label) => {
            let analysis = new_analysis(Some(label))?;
            for word in &words {
                analysis.increment_word(word);
            }
            Ok(analysis)
        }
    }
}

/// OCR fan-out into one shared result: workers recognize images in parallel
/// and increment the same counter. The first per-file error aborts the
/// batch; counts accumulated up to that point stay valid.
pub fn count_screenshot_words(
    files: &[PathBuf],
    recognizer: &dyn WordRecognizer,
    label: Option<&str>,
    max_workers: Option<usize>,
) -> Result<AnalysisResult> {
    let analysis = new_analysis(label)?;

    let workers = screenshot::worker_count(max_workers);
    info!(
        action = "configure",
        component = "frequency",
        worker_count = workers,
        file_count = files.len(),
        "Counting words across screenshots"
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .context("building worker pool")?;

    pool.install(|| {
        files.par_iter().try_for_each(|path| {
            let content = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
            let words = recognizer
                .recognize_words(&content)
                .with_context(|| format!("recognizing words in {}", path.display()))?;
            for word in &words {
                analysis.increment_word(word);
            }

            Ok::<(), anyhow::Error>(())
        })
    })?;

    Ok(analysis)
}

fn persist_analysis(analysis: &AnalysisResult, out_dir: &Path) -> Result<PathBuf> {
    let json_path = out_dir.join(format!("{}.json", analysis.name()));
    info!(
        action = "write",
        component = "frequency",
        path = %json_path.display(),
        "Writing analysis JSON"
    );

    let mut file = utils::open_clean(&json_path)?;
    let encoded = serde_json::to_string_pretty(analysis).context("encoding analysis")?;
    file.write_all(encoded.as_bytes())
        .with_context(|| format!("writing {}", json_path.display()))?;

    Ok(json_path)
}

/// The `frequency` command: resolve the word source, count, persist the
/// result as `<out>/<id>.json`.
pub fn analyze(args: &FrequencyArgs) -> Result<AnalysisResult> {
    let start_time = Instant::now();
    let label = args.label.as_deref();

    let analysis = match resolve_source(&args.file)? {
        WordSource::Text(path) => analyze_text_file(&path, label)?,
        WordSource::Screenshots(files) => {
            let recognizer = TesseractCli::with_language(&args.language)?;
            count_screenshot_words(&files, &recognizer, label, args.workers)?
        }
    };

    persist_analysis(&analysis, &args.out)?;

    info!(
        action = "complete",
        component = "frequency",
        id = analysis.name(),
        unique_words = analysis.unique_words(),
        duration_ms = start_time.elapsed().as_millis(),
        "Analysis completed"
    );

    Ok(analysis)
}

pub fn print_analysis_results(analysis: &AnalysisResult, args: &FrequencyArgs) {
    println!("\n--- Word Frequency Analysis ({}) ---", analysis.name());
    println!(
        "Total words counted: {}",
        utils::format_number(analysis.total_words())
    );
    println!(
        "Unique words found: {}",
        utils::format_number(analysis.unique_words() as u64)
    );

    if let Some(top_count) = args.top {
        let mut sorted: Vec<(String, u64)> = analysis.word_frequency().into_iter().collect();
        sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        println!(
            "\nTop {} most frequent words:",
            std::cmp::min(top_count, sorted.len())
        );
        for (word, count) in sorted.iter().take(top_count) {
            println!("- {}: {}", word, utils::format_number(*count));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    struct StubRecognizer;

    impl WordRecognizer for StubRecognizer {
        fn recognize_words(&self, image: &[u8]) -> Result<Vec<String>> {
            Ok(ocr::split_words(&String::from_utf8_lossy(image)))
        }
    }

    #[test]
    fn test_source_resolution() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("shot.png"), "img").unwrap();
        let text = dir.path().join("words.txt");
        fs::write(&text, "one two").unwrap();

        assert!(matches!(
            resolve_source(dir.path()).unwrap(),
            WordSource::Screenshots(_)
        ));
        assert!(matches!(
            resolve_source(&dir.path().join("shot.png")).unwrap(),
            WordSource::Screenshots(_)
        ));
        assert!(matches!(
            resolve_source(&text).unwrap(),
            WordSource::Text(_)
        ));
    }

    #[test]
    fn test_text_file_counts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("words.txt");
        fs::write(&path, "go go rust\nGo").unwrap();

        let analysis = analyze_text_file(&path, None).unwrap();
        assert_eq!(analysis.count("go"), 2);
        assert_eq!(analysis.count("rust"), 1);
        assert_eq!(analysis.count("Go"), 1);
    }

    #[test]
    fn test_labelled_text_analysis() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("words.txt");
        fs::write(&path, "alpha alpha").unwrap();

        let analysis = analyze_text_file(&path, Some("batch7")).unwrap();
        assert!(analysis.name().starts_with("batch7_analysis_"));
        assert_eq!(analysis.count("alpha"), 2);
    }

    #[test]
    fn test_screenshot_counts_merge_across_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = Vec::new();
        for i in 0..8 {
            let path = dir.path().join(format!("{i}.png"));
            fs::write(&path, "shared unique-{i}".replace("{i}", &i.to_string())).unwrap();
            files.push(path);
        }

        let analysis = count_screenshot_words(&files, &StubRecognizer, None, Some(4)).unwrap();

        assert_eq!(analysis.count("shared"), 8);
        for i in 0..8 {
            assert_eq!(analysis.count(&format!("unique-{i}")), 1);
        }
    }

    #[test]
    fn test_persisted_json_shape() {
        let dir = tempfile::tempdir().unwrap();
        let text = dir.path().join("input.txt");
        fs::write(&text, "b a b").unwrap();

        let analysis = analyze_text_file(&text, None).unwrap();
        let json_path = persist_analysis(&analysis, dir.path()).unwrap();

        assert_eq!(
            json_path.file_name().unwrap().to_str().unwrap(),
            format!("{}.json", analysis.name())
        );

        let value: Value =
            serde_json::from_str(&fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(value["id"], analysis.name());
        assert_eq!(value["wordFrequency"]["a"], 1);
        assert_eq!(value["wordFrequency"]["b"], 2);
    }

    #[test]
    fn test_analyze_text_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.txt");
        fs::write(&input, "word word word").unwrap();

        let args = FrequencyArgs {
            file: input,
            out: dir.path().to_path_buf(),
            label: None,
            top: Some(1),
            language: "eng".to_string(),
            workers: None,
        };

        let analysis = analyze(&args).unwrap();
        assert_eq!(analysis.count("word"), 3);
        assert!(dir
            .path()
            .join(format!("{}.json", analysis.name()))
            .exists());
    }
}
