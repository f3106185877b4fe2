#[cfg(feature = "polars")]
pub mod polars_io;
pub mod table;
pub mod text;

pub use table::WaveformIngestor;
