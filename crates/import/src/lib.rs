//! Statement input and output: PDF statements in, OFX out, OFX back in.

pub mod ofx;
pub mod source;
pub mod statement;
pub mod writer;

pub use ofx::{OfxAccount, OfxError, OfxStatement, OfxTransaction};
pub use source::{
    extract_pdf_text, identify_bank, list_statement_files, read_statement,
    validate_statement_file,
};
pub use statement::{parse_statement_text, StatementError};
pub use writer::{OfxWriteError, OfxWriter};
