use rayon::prelude::*;
use tracing::{debug, info};

use crate::constants::OTHER_LABEL;
use crate::pipeline::processing::fuzzy::{extract_one, SimilarityScorer};
use crate::taxonomy::Taxonomy;
use crate::types::FeatureTable;

/// How a cleaned major was resolved to a label
#[derive(Debug, Clone, PartialEq)]
pub enum LabelResolution {
    /// Exact hit in the curated dictionary
    Dictionary(String),
    /// Best fuzzy match at or above the threshold
    Fuzzy { category: String, score: f64 },
    /// No confident match
    Other { best_score: f64 },
    /// Dictionary miss with fuzzy matching skipped; the cleaned text is the label
    Unresolved,
}

/// A row carrying its cleaned major and the resolution of that major
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledRow {
    pub features: Vec<f64>,
    pub major: String,
    pub resolution: LabelResolution,
}

impl LabeledRow {
    /// Value written to the `major_standard` column
    pub fn major_standard(&self) -> &str {
        match &self.resolution {
            LabelResolution::Dictionary(category) => category,
            LabelResolution::Fuzzy { category, .. } => category,
            LabelResolution::Other { .. } => OTHER_LABEL,
            LabelResolution::Unresolved => &self.major,
        }
    }

    pub fn is_other(&self) -> bool {
        matches!(self.resolution, LabelResolution::Other { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabeledTable {
    pub feature_columns: Vec<String>,
    pub rows: Vec<LabeledRow>,
}

/// Tally of resolutions across a table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolutionCounts {
    pub dictionary: usize,
    pub fuzzy: usize,
    pub other: usize,
    pub unresolved: usize,
}

impl LabeledTable {
    pub fn resolution_counts(&self) -> ResolutionCounts {
        let mut counts = ResolutionCounts::default();
        for row in &self.rows {
            match row.resolution {
                LabelResolution::Dictionary(_) => counts.dictionary += 1,
                LabelResolution::Fuzzy { .. } => counts.fuzzy += 1,
                LabelResolution::Other { .. } => counts.other += 1,
                LabelResolution::Unresolved => counts.unresolved += 1,
            }
        }
        counts
    }
}

/// Resolves cleaned majors through the dictionary, then the fuzzy scorer
pub struct Standardizer<'a> {
    taxonomy: &'a Taxonomy,
    scorer: &'a dyn SimilarityScorer,
    threshold: f64,
}

impl<'a> Standardizer<'a> {
    pub fn new(taxonomy: &'a Taxonomy, scorer: &'a dyn SimilarityScorer, threshold: f64) -> Self {
        Self {
            taxonomy,
            scorer,
            threshold,
        }
    }

    /// Run the dictionary pass, then the fuzzy pass unless `fuzzy` is false
    pub fn standardize(&self, table: FeatureTable, fuzzy: bool) -> LabeledTable {
        let labeled = self.dictionary_pass(table);
        if fuzzy {
            self.fuzzy_pass(labeled)
        } else {
            debug!("Fuzzy matching skipped; dictionary misses keep their cleaned text");
            labeled
        }
    }

    /// Exact lookup of every cleaned major; misses are left `Unresolved`
    pub fn dictionary_pass(&self, table: FeatureTable) -> LabeledTable {
        let rows: Vec<LabeledRow> = table
            .rows
            .into_iter()
            .map(|row| {
                let resolution = match self.taxonomy.lookup(&row.major) {
                    Some(category) => LabelResolution::Dictionary(category.to_string()),
                    None => LabelResolution::Unresolved,
                };
                LabeledRow {
                    features: row.features,
                    major: row.major,
                    resolution,
                }
            })
            .collect();

        let labeled = LabeledTable {
            feature_columns: table.feature_columns,
            rows,
        };
        let counts = labeled.resolution_counts();
        info!(
            "Dictionary mapped {} rows, {} left for fuzzy resolution",
            counts.dictionary, counts.unresolved
        );
        labeled
    }

    /// Resolve every `Unresolved` row against the category list, in parallel
    pub fn fuzzy_pass(&self, table: LabeledTable) -> LabeledTable {
        let rows: Vec<LabeledRow> = table
            .rows
            .into_par_iter()
            .map(|row| match row.resolution {
                LabelResolution::Unresolved => {
                    let resolution = self.resolve_fuzzy(&row.major);
                    LabeledRow { resolution, ..row }
                }
                _ => row,
            })
            .collect();

        let labeled = LabeledTable {
            feature_columns: table.feature_columns,
            rows,
        };
        let counts = labeled.resolution_counts();
        info!(
            "Fuzzy matching resolved {} rows, {} fell back to {}",
            counts.fuzzy, counts.other, OTHER_LABEL
        );
        labeled
    }

    /// Best category for one cleaned major, or `Other` below the threshold
    pub fn resolve_fuzzy(&self, cleaned: &str) -> LabelResolution {
        match extract_one(self.scorer, cleaned, self.taxonomy.categories()) {
            Some(best) if best.score >= self.threshold => {
                debug!(
                    "Fuzzy matched '{}' to '{}' (score {:.1})",
                    cleaned, best.choice, best.score
                );
                LabelResolution::Fuzzy {
                    category: best.choice.to_string(),
                    score: best.score,
                }
            }
            Some(best) => LabelResolution::Other {
                best_score: best.score,
            },
            None => LabelResolution::Other { best_score: 0.0 },
        }
    }
}
