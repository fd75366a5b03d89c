//! paramguard - declarative request parameter validation and sanitization
//!
//! A form is a [`schema::SchemaDef`]: an ordered table of field descriptors
//! (type, optionality, converters, named rules) plus a whole-payload
//! precondition. A [`schema::Schema`] instance runs the table over one input
//! mapping and produces either sanitized typed values or an error bag keyed
//! by field and rule name.
//!
//! ```ignore
//! let def = paramguard::forms::definition("create_user")?;
//! let mut schema = Schema::from_json(def, payload, caps)?;
//! let params = schema.validate()?;
//! ```

pub mod capabilities;
pub mod cli;
pub mod config;
pub mod converters;
pub mod forms;
pub mod http;
pub mod schema;
pub mod store;
pub mod validators;
pub mod value;

pub use capabilities::{Capabilities, Clock, FixedClock, IdentityProvider, SystemClock};
pub use config::EngineConfig;
pub use schema::{Schema, SchemaDef, ValidationFailure};
pub use store::{MemoryStore, RecordStore};
pub use value::{Params, Value};
