//! PURPOSE: `ExcelGenerator` — the public entry point, spec.md §2 component
//! 13 and §6. Builds a `ProcessingContext`, runs the fixed `Pipeline`, and
//! for file-writing callers applies the configured naming/conflict policy.
//! CONTEXT: the async/background-submit concurrency flavors spec.md §5
//! describes are explicitly out of scope here (SPEC_FULL.md §1) — the core
//! stays synchronous, and a caller wanting async execution wraps
//! `generate_bytes`/`generate_file` on its own executor.

use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tbeg_model::{DataProvider, FileConflictPolicy, FileNamingMode, TbegConfig, TbegError, TbegResult};
use tbeg_pipeline::{CancellationToken, NeverCancel, Pipeline, ProcessingContext};

/// Public facade: transforms template bytes plus a data provider into a
/// finished `.xlsx` package.
pub struct ExcelGenerator {
    config: TbegConfig,
    pipeline: Pipeline,
}

impl ExcelGenerator {
    pub fn new(config: TbegConfig) -> Self {
        ExcelGenerator { config, pipeline: Pipeline::new() }
    }

    /// Runs the full pipeline over `template_bytes` and returns the
    /// resulting package bytes. Never touches the filesystem.
    pub fn generate_bytes(&self, template_bytes: &[u8], provider: &dyn DataProvider) -> TbegResult<Vec<u8>> {
        self.generate_bytes_cancellable(template_bytes, provider, &NeverCancel)
    }

    pub fn generate_bytes_cancellable(
        &self,
        template_bytes: &[u8],
        provider: &dyn DataProvider,
        cancellation: &dyn CancellationToken,
    ) -> TbegResult<Vec<u8>> {
        let mut ctx = ProcessingContext::new(template_bytes, provider, self.config.clone())?;
        self.pipeline.run(&mut ctx, cancellation)?;
        ctx.package.save_to_vec().map_err(|e| TbegError::PackageIo(e.to_string()))
    }

    /// Runs the pipeline and writes the result under `output_path`, applying
    /// `fileNamingMode`/`fileConflictPolicy`. On failure, any partially
    /// written file is removed before the error propagates, spec.md §6.
    pub fn generate_file(
        &self,
        template_bytes: &[u8],
        provider: &dyn DataProvider,
        output_path: &Path,
    ) -> TbegResult<PathBuf> {
        self.generate_file_cancellable(template_bytes, provider, output_path, &NeverCancel)
    }

    pub fn generate_file_cancellable(
        &self,
        template_bytes: &[u8],
        provider: &dyn DataProvider,
        output_path: &Path,
        cancellation: &dyn CancellationToken,
    ) -> TbegResult<PathBuf> {
        let target = self.resolve_output_path(output_path)?;

        let bytes = match self.generate_bytes_cancellable(template_bytes, provider, cancellation) {
            Ok(bytes) => bytes,
            Err(err) => {
                Self::remove_partial(&target);
                return Err(err);
            }
        };

        if let Err(err) = fs::write(&target, &bytes) {
            Self::remove_partial(&target);
            return Err(TbegError::Io(err));
        }

        Ok(target)
    }

    fn remove_partial(path: &Path) {
        if path.exists() {
            if let Err(err) = fs::remove_file(path) {
                log::warn!("failed to remove partial output {}: {err}", path.display());
            }
        }
    }

    /// Applies `fileNamingMode` (appending a timestamp) and then
    /// `fileConflictPolicy` (erroring or finding a free sequenced name) to
    /// `requested`.
    fn resolve_output_path(&self, requested: &Path) -> TbegResult<PathBuf> {
        let named = match self.config.file_naming_mode {
            FileNamingMode::None => requested.to_path_buf(),
            FileNamingMode::Timestamp => {
                let stamp = Local::now().format(&self.config.timestamp_format).to_string();
                stamped_path(requested, &stamp)
            }
        };

        if !named.exists() {
            return Ok(named);
        }

        match self.config.file_conflict_policy {
            FileConflictPolicy::Error => Err(TbegError::PackageIo(format!(
                "output file already exists: {}",
                named.display()
            ))),
            FileConflictPolicy::Sequence => Ok(sequenced_path(&named)),
        }
    }
}

fn stamped_path(path: &Path, stamp: &str) -> PathBuf {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("output");
    let ext = path.extension().and_then(|s| s.to_str());
    let file_name = match ext {
        Some(ext) => format!("{stem}_{stamp}.{ext}"),
        None => format!("{stem}_{stamp}"),
    };
    path.with_file_name(file_name)
}

fn sequenced_path(path: &Path) -> PathBuf {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("output");
    let ext = path.extension().and_then(|s| s.to_str());

    for n in 1.. {
        let file_name = match ext {
            Some(ext) => format!("{stem} ({n}).{ext}"),
            None => format!("{stem} ({n})"),
        };
        let candidate = path.with_file_name(file_name);
        if !candidate.exists() {
            return candidate;
        }
    }
    unreachable!("sequence search never terminates without a free name")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamped_path_preserves_extension() {
        let path = stamped_path(Path::new("/tmp/report.xlsx"), "20260101_000000");
        assert_eq!(path, Path::new("/tmp/report_20260101_000000.xlsx"));
    }

    #[test]
    fn sequenced_path_finds_first_free_slot() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("report.xlsx");
        fs::write(&base, b"x").unwrap();
        fs::write(dir.path().join("report (1).xlsx"), b"x").unwrap();

        let next = sequenced_path(&base);
        assert_eq!(next, dir.path().join("report (2).xlsx"));
    }

    #[test]
    fn resolve_output_path_errors_on_existing_file_with_error_policy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.xlsx");
        fs::write(&path, b"x").unwrap();

        let config = TbegConfig::default().with_file_conflict_policy(FileConflictPolicy::Error);
        let generator = ExcelGenerator::new(config);
        assert!(generator.resolve_output_path(&path).is_err());
    }
}
