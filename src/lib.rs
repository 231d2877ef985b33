pub mod analyzers;
pub mod criteria;
pub mod error;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod session;
pub mod stats;
pub mod timeseries;
