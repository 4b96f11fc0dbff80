pub mod amounts;
pub mod normalize;
pub mod pipeline;
pub mod reader;
pub mod sniff;

pub use amounts::{resolve_signed_amounts, AmountColumns, DEFAULT_NEGATIVE_RATIO};
pub use pipeline::{
    expand_inputs, run, write_failure_report, PipelineConfig, PipelineError, PipelineOutput,
    ReadFailure, DESCRIPTION_COLUMNS,
};
pub use reader::{read_table, ReadError};
pub use sniff::{sniff_format, SniffedFormat, TextEncoding};
