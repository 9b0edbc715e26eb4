// Pipeline processing: normalization, scoring, matching and classification

pub mod normalize;
pub mod quality_gate;
pub mod conflation;
pub mod category;
