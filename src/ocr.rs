use std::io::Write;
use std::process::{Command, Stdio};

use anyhow::{Context, Result};

/// External word recognition: image bytes in, the recognized words out, in
/// reading order. Word boundaries are whatever the engine emits as
/// whitespace; no normalization is applied.
pub trait WordRecognizer: Send + Sync {
    fn recognize_words(&self, image: &[u8]) -> Result<Vec<String>>;
}

/// Recognizer backed by the `tesseract` executable, fed over stdin.
pub struct TesseractCli {
    program: String,
    language: String,
}

impl TesseractCli {
    pub fn new() -> Result<Self> {
        Self::with_language("eng")
    }

    /// Fails with a descriptive error when the tesseract binary is missing
    /// or not runnable.
    pub fn with_language(language: &str) -> Result<Self> {
        let program = "tesseract".to_string();

        let status = Command::new(&program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .with_context(|| format!("running `{program} --version`; is tesseract installed?"))?;
        if !status.success() {
            anyhow::bail!("`{program} --version` exited with {status}");
        }

        Ok(Self {
            program,
            language: language.to_string(),
        })
    }
}

impl WordRecognizer for TesseractCli {
    fn recognize_words(&self, image: &[u8]) -> Result<Vec<String>> {
        let mut child = Command::new(&self.program)
            .args(["stdin", "stdout", "-l", &self.language])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("spawning {}", self.program))?;

        child
            .stdin
            .take()
            .context("opening tesseract stdin")?
            .write_all(image)
            .context("writing image bytes to tesseract")?;

        let output = child.wait_with_output().context("waiting for tesseract")?;
        if !output.status.success() {
            anyhow::bail!(
                "tesseract exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let text = String::from_utf8_lossy(&output.stdout);
        Ok(split_words(&text))
    }
}

/// Splits recognized text into whitespace-delimited tokens.
pub fn split_words(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_owned).collect()
}
