// ============================================================
// Layer 4 — Parallel Corpus Loader
// ============================================================
// Reads a sentence-aligned parallel corpus stored as two plain
// UTF-8 text files:
//
//   train.en          train.zh
//   ─────────         ─────────
//   line 1      ↔     line 1
//   line 2      ↔     line 2
//   ...
//
// Line N of the source file is the translation of line N of the
// target file. A line-count mismatch means the files are not
// aligned, which is reported as an error rather than silently
// truncating.
//
// Reference: Rust Book §9 (Error Handling)

use anyhow::{bail, Context, Result};
use std::{fs, path::PathBuf};

use crate::domain::sentence_pair::SentencePair;
use crate::domain::traits::CorpusSource;

pub struct ParallelCorpusLoader {
    src_path: PathBuf,
    trg_path: PathBuf,
}

impl ParallelCorpusLoader {
    pub fn new(src_path: impl Into<PathBuf>, trg_path: impl Into<PathBuf>) -> Self {
        Self { src_path: src_path.into(), trg_path: trg_path.into() }
    }
}

impl CorpusSource for ParallelCorpusLoader {
    fn load_all(&self) -> Result<Vec<SentencePair>> {
        let src = read_lines(&self.src_path)?;
        let trg = read_lines(&self.trg_path)?;

        if src.len() != trg.len() {
            bail!(
                "Corpus is not aligned: '{}' has {} lines but '{}' has {}",
                self.src_path.display(),
                src.len(),
                self.trg_path.display(),
                trg.len()
            );
        }

        let pairs: Vec<SentencePair> = src
            .into_iter()
            .zip(trg)
            .map(|(s, t)| SentencePair::new(s, t))
            .collect();

        tracing::info!(
            "Loaded {} sentence pairs from '{}' / '{}'",
            pairs.len(),
            self.src_path.display(),
            self.trg_path.display()
        );
        Ok(pairs)
    }
}

fn read_lines(path: &PathBuf) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read corpus file '{}'", path.display()))?;
    Ok(text.lines().map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_loads_aligned_pairs() {
        let dir = tempfile::tempdir().unwrap();
        let src = write_file(&dir, "train.en", "hello world\ngood morning\n");
        let trg = write_file(&dir, "train.zh", "你好世界\n早上好\n");

        let pairs = ParallelCorpusLoader::new(src, trg).load_all().unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1].source, "good morning");
        assert_eq!(pairs[1].target, "早上好");
    }

    #[test]
    fn test_misaligned_files_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let src = write_file(&dir, "a.txt", "one\ntwo\nthree\n");
        let trg = write_file(&dir, "b.txt", "un\ndeux\n");

        let err = ParallelCorpusLoader::new(src, trg).load_all().unwrap_err();
        assert!(err.to_string().contains("not aligned"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let loader = ParallelCorpusLoader::new("/nonexistent/src.txt", "/nonexistent/trg.txt");
        assert!(loader.load_all().is_err());
    }
}
