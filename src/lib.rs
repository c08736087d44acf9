pub mod analyzers;
pub mod batch;
pub mod fetch;
pub mod output;
pub mod parser;
pub mod records;
