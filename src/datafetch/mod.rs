mod delimited;
mod error;
mod excel;
mod reader;
mod types;

pub use delimited::parse_csv;
pub use error::DataFetchError;
pub use excel::parse_workbook;
pub use reader::{table_name_for, BlobReader, SourceFormat};
pub use types::{RowFormat, Scalar, Table};
