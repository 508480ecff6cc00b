pub mod record;
pub mod attrs;
pub mod colors;
pub mod highlight;
pub mod codec;
pub mod handler;
pub mod pretty;
pub mod json_handler;
pub mod noop_handler;
pub mod config;
pub mod env;
pub mod logger;
pub mod layer;
pub mod init;

pub use handler::{HandleError, Handler};
pub use logger::{Logger, StdLogger};
pub use pretty::PrettyHandler;
pub use record::{Attr, Level, Record, Value};
