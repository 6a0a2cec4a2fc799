pub mod json;
pub mod markdown;

pub use json::{JsonConfig, JsonFormatter, convert_to_json};
pub use markdown::{MarkdownConfig, MarkdownNote, convert_html, serialize_body};
