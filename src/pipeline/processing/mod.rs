// Pipeline processing: normalization, label cleaning, standardization, and gating

pub mod fuzzy;
pub mod labels;
pub mod normalize;
pub mod quality_gate;
pub mod standardize;
