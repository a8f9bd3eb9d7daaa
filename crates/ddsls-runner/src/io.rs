mod documents;

pub use documents::{read_json_document, read_text, write_json_document};
