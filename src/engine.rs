use std::io::Write;

use crate::data::codec::{self, CodecOptions};
use crate::data::filter::{FilterChain, FilterExpression, StageReport};
use crate::data::format::Format;
use crate::data::model::TabularDataset;
use crate::error::{EngineError, EngineResult};

// ---------------------------------------------------------------------------
// Engine state
// ---------------------------------------------------------------------------

/// Where the engine is in its load → filter → save lifecycle.
///
/// A filtered table can only exist next to the original it was computed from,
/// so "save before apply" has no state to act on.
#[derive(Debug, Clone, Default)]
pub enum EngineState {
    #[default]
    Empty,
    Loaded {
        original: TabularDataset,
    },
    Filtered {
        original: TabularDataset,
        filtered: TabularDataset,
        /// Snapshot of the chain that produced `filtered`.
        applied: FilterChain,
    },
}

impl EngineState {
    pub fn original(&self) -> Option<&TabularDataset> {
        match self {
            EngineState::Empty => None,
            EngineState::Loaded { original } | EngineState::Filtered { original, .. } => {
                Some(original)
            }
        }
    }

    pub fn filtered(&self) -> Option<&TabularDataset> {
        match self {
            EngineState::Filtered { filtered, .. } => Some(filtered),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EngineState::Empty => "empty",
            EngineState::Loaded { .. } => "loaded",
            EngineState::Filtered { .. } => "filtered",
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What happens to staged filters when a new dataset is loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReloadPolicy {
    /// Start every new dataset with an empty chain.
    #[default]
    ClearFilters,
    /// Keep the chain; it is applied to the new data on the next `apply_filters`.
    KeepFilters,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineConfig {
    pub reload_policy: ReloadPolicy,
    pub codec: CodecOptions,
}

/// Row counts from a successful `apply_filters`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplySummary {
    pub total_rows: usize,
    pub kept_rows: usize,
    pub stages: Vec<StageReport>,
}

impl ApplySummary {
    pub fn mismatched_rows(&self) -> usize {
        self.stages.iter().map(|s| s.mismatched_rows).sum()
    }
}

// ---------------------------------------------------------------------------
// FilterEngine
// ---------------------------------------------------------------------------

/// Owns the loaded table, the staged filter chain and the last filtered result.
///
/// Operations run one at a time to completion. A failed operation leaves the
/// engine exactly as it was before the call.
#[derive(Debug, Default)]
pub struct FilterEngine {
    config: EngineConfig,
    state: EngineState,
    chain: FilterChain,
}

impl FilterEngine {
    pub fn new(config: EngineConfig) -> Self {
        FilterEngine {
            config,
            ..Default::default()
        }
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// The staged chain, including filters not applied yet.
    pub fn filters(&self) -> &FilterChain {
        &self.chain
    }

    pub fn original(&self) -> Option<&TabularDataset> {
        self.state.original()
    }

    pub fn filtered(&self) -> Option<&TabularDataset> {
        self.state.filtered()
    }

    /// The table a display should show: the filtered result if there is one.
    pub fn current_table(&self) -> Option<&TabularDataset> {
        self.filtered().or_else(|| self.original())
    }

    /// Whether the staged chain differs from the one behind the filtered result.
    pub fn is_stale(&self) -> bool {
        match &self.state {
            EngineState::Filtered { applied, .. } => *applied != self.chain,
            _ => false,
        }
    }

    /// Decode `bytes` and make them the new original dataset.
    pub fn load(&mut self, bytes: &[u8], format: Format) -> EngineResult<()> {
        let dataset = codec::decode(bytes, format)?;
        log::info!(
            "Loaded {} rows with columns {:?} from {format}",
            dataset.len(),
            dataset.columns()
        );

        if self.config.reload_policy == ReloadPolicy::ClearFilters && !self.chain.is_empty() {
            log::debug!("Clearing {} staged filters", self.chain.len());
            self.chain.clear();
        }
        self.state = EngineState::Loaded { original: dataset };
        Ok(())
    }

    /// Stage a filter. Nothing is evaluated until [`FilterEngine::apply_filters`].
    pub fn add_filter(&mut self, text: &str) -> EngineResult<()> {
        if matches!(self.state, EngineState::Empty) {
            return Err(EngineError::NoDatasetLoaded);
        }
        let expression = FilterExpression::new(text)?;
        log::debug!("Staged filter `{expression}`");
        self.chain.push(expression);
        Ok(())
    }

    pub fn remove_filter(&mut self, index: usize) -> EngineResult<FilterExpression> {
        let len = self.chain.len();
        self.chain
            .remove(index)
            .ok_or(EngineError::FilterIndexOutOfRange { index, len })
    }

    pub fn clear_filters(&mut self) {
        self.chain.clear();
    }

    /// Run the whole staged chain against the original dataset.
    ///
    /// Filters never compound on an earlier result. On failure the previous
    /// filtered result (if any) is kept.
    pub fn apply_filters(&mut self) -> EngineResult<ApplySummary> {
        let (original, previous) = match std::mem::take(&mut self.state) {
            EngineState::Empty => return Err(EngineError::NoDatasetLoaded),
            EngineState::Loaded { original } => (original, None),
            EngineState::Filtered {
                original,
                filtered,
                applied,
            } => (original, Some((filtered, applied))),
        };

        match self.chain.apply_detailed(&original) {
            Ok(outcome) => {
                let summary = ApplySummary {
                    total_rows: original.len(),
                    kept_rows: outcome.dataset.len(),
                    stages: outcome.stages,
                };
                log::info!(
                    "Applied {} filters: {} of {} rows kept",
                    self.chain.len(),
                    summary.kept_rows,
                    summary.total_rows
                );
                self.state = EngineState::Filtered {
                    original,
                    filtered: outcome.dataset,
                    applied: self.chain.clone(),
                };
                Ok(summary)
            }
            Err(err) => {
                self.state = match previous {
                    None => EngineState::Loaded { original },
                    Some((filtered, applied)) => EngineState::Filtered {
                        original,
                        filtered,
                        applied,
                    },
                };
                Err(err.into())
            }
        }
    }

    /// Encode the filtered result.
    pub fn save(&self, format: Format) -> EngineResult<Vec<u8>> {
        let filtered = self.filtered().ok_or(EngineError::NoFilteredResult)?;
        let bytes = codec::encode_with(filtered, format, &self.config.codec)?;
        log::info!(
            "Encoded {} filtered rows as {format} ({} bytes)",
            filtered.len(),
            bytes.len()
        );
        Ok(bytes)
    }

    /// Encode the filtered result and hand it to `sink`.
    pub fn save_to<W: Write>(&self, sink: &mut W, format: Format) -> EngineResult<()> {
        let bytes = self.save(format)?;
        sink.write_all(&bytes)?;
        sink.flush()?;
        Ok(())
    }
}
