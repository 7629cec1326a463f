pub mod display;
pub mod markdown;
pub mod text;

pub use display::*;
pub use markdown::render_markdown;
pub use text::{
    extract_code_blocks, format_search_result, fuzzy_match, generate_conversation_id,
    sanitize_filename, CodeBlock, SearchResult,
};
