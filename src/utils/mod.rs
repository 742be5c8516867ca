pub mod intake;
pub mod phone;
pub mod template;
pub mod tokens;

pub use intake::sanitize_intake_data;
pub use phone::normalize_phone;
pub use template::{render_template, slugify};
pub use tokens::{content_hash, generate_code, generate_token, hash_token};
