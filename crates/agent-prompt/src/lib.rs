//! Named Jinja prompts with directory overrides
//!
//! ```
//! use agent_prompt::{JinjaTemplate, PromptRegistry};
//! use serde_json::json;
//!
//! let registry = PromptRegistry::new()
//!     .with_template(JinjaTemplate::new("analyst", "Analyze company {{ company_id }}").unwrap());
//!
//! let prompt = registry.render("analyst", &json!({ "company_id": 12 })).unwrap();
//! assert_eq!(prompt, "Analyze company 12");
//! ```

mod error;
mod loader;
mod registry;
mod template;

pub use error::{PromptError, Result};
pub use loader::FileLoader;
pub use registry::PromptRegistry;
pub use template::JinjaTemplate;
