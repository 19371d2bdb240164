mod anchoring;
mod engine;
mod fim_cleaning;
mod malformed_output;
