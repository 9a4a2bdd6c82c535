pub mod funnel;
pub mod leads;
pub mod scoring;
