// Directory pipeline: raw intake records in, scored and deduplicated contacts out

pub mod processing;
pub mod ingestion;
