//! Reading and writing PDF documents on disk.

mod reader;
mod writer;

pub use reader::PdfReader;
pub use writer::PdfWriter;
