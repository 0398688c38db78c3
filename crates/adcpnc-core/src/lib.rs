//! Conversion of raw current-profiler records into EPIC-compliant time series:
//! clip -> water depth/orientation -> earth rotation -> trim -> reshape -> annotate.

pub mod atmos;
pub mod clip;
pub mod config;
pub mod dataset;
pub mod depth;
pub mod epic;
pub mod error;
pub mod instrument;
pub mod output;
pub mod pipeline;
pub mod reshape;
pub mod timing;
pub mod transform;
pub mod trim;

pub use config::{ConversionConfig, OutputMode, TrimPolicy};
pub use dataset::{AttrValue, Attributes, Dataset, Dim, Variable};
pub use error::{PipelineError, PipelineWarning, Result, Stage};
pub use instrument::{CalibrationMatrix, CoordinateSystem, InstrumentInfo, Orientation};
pub use pipeline::{convert, Conversion, ConversionReport};
