//! PURPOSE: Render configuration, spec.md §6 `TbegConfig`.
//! CONTEXT: Plain serde struct with builder-style `with_*` setters, the same
//! ergonomics the corpus uses for `CellStyle`/`PivotDefinition` construction.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamingMode {
    Enabled,
    Disabled,
    Auto,
}

impl Default for StreamingMode {
    fn default() -> Self {
        StreamingMode::Auto
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissingDataBehavior {
    Ignore,
    Warn,
    Throw,
}

impl Default for MissingDataBehavior {
    fn default() -> Self {
        MissingDataBehavior::Warn
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileNamingMode {
    None,
    Timestamp,
}

impl Default for FileNamingMode {
    fn default() -> Self {
        FileNamingMode::None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileConflictPolicy {
    Error,
    Sequence,
}

impl Default for FileConflictPolicy {
    fn default() -> Self {
        FileConflictPolicy::Error
    }
}

/// Render-time configuration, spec.md §6.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TbegConfig {
    pub streaming_mode: StreamingMode,
    pub streaming_row_threshold: u32,
    pub formula_processing_enabled: bool,
    pub preserve_template_layout: bool,
    pub missing_data_behavior: MissingDataBehavior,
    pub progress_report_interval: u32,
    pub file_naming_mode: FileNamingMode,
    pub timestamp_format: String,
    pub file_conflict_policy: FileConflictPolicy,
    pub pivot_integer_format_index: u32,
    pub pivot_decimal_format_index: u32,
}

impl Default for TbegConfig {
    fn default() -> Self {
        TbegConfig {
            streaming_mode: StreamingMode::Auto,
            streaming_row_threshold: 10_000,
            formula_processing_enabled: true,
            preserve_template_layout: true,
            missing_data_behavior: MissingDataBehavior::Warn,
            progress_report_interval: 1_000,
            file_naming_mode: FileNamingMode::None,
            timestamp_format: "%Y%m%d_%H%M%S".to_string(),
            file_conflict_policy: FileConflictPolicy::Error,
            pivot_integer_format_index: 1,
            pivot_decimal_format_index: 2,
        }
    }
}

impl TbegConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_streaming_mode(mut self, mode: StreamingMode) -> Self {
        self.streaming_mode = mode;
        self
    }

    pub fn with_streaming_row_threshold(mut self, threshold: u32) -> Self {
        self.streaming_row_threshold = threshold;
        self
    }

    pub fn with_missing_data_behavior(mut self, behavior: MissingDataBehavior) -> Self {
        self.missing_data_behavior = behavior;
        self
    }

    pub fn with_formula_processing_enabled(mut self, enabled: bool) -> Self {
        self.formula_processing_enabled = enabled;
        self
    }

    pub fn with_preserve_template_layout(mut self, preserve: bool) -> Self {
        self.preserve_template_layout = preserve;
        self
    }

    pub fn with_file_naming_mode(mut self, mode: FileNamingMode) -> Self {
        self.file_naming_mode = mode;
        self
    }

    pub fn with_file_conflict_policy(mut self, policy: FileConflictPolicy) -> Self {
        self.file_conflict_policy = policy;
        self
    }

    /// Decides whether the streaming renderer should be used for a sheet
    /// with `row_count` projected output rows.
    pub fn should_stream(&self, row_count: u32) -> bool {
        match self.streaming_mode {
            StreamingMode::Enabled => true,
            StreamingMode::Disabled => false,
            StreamingMode::Auto => row_count >= self.streaming_row_threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_streaming_respects_threshold() {
        let config = TbegConfig::new().with_streaming_row_threshold(100);
        assert!(!config.should_stream(50));
        assert!(config.should_stream(100));
        assert!(config.should_stream(500));
    }

    #[test]
    fn builder_methods_compose() {
        let config = TbegConfig::new()
            .with_streaming_mode(StreamingMode::Enabled)
            .with_missing_data_behavior(MissingDataBehavior::Throw);
        assert!(config.should_stream(0));
        assert_eq!(config.missing_data_behavior, MissingDataBehavior::Throw);
    }
}
