pub mod common;
pub mod config;
pub mod element;
pub mod exception;
pub mod form;
pub mod http;
pub mod param;
pub mod renderer;
pub mod rule;
pub mod table;
pub mod util;
pub mod value;

pub use common::Attributes;
pub use config::Config;
pub use exception::Exception;
pub use form::{Form, Submission};
pub use http::{HttpRequest, HttpResponse};
pub use param::{FormMethod, HttpMethod, HttpVersion};
pub use table::Table;
pub use util::HtmlBuilder;
pub use value::Value;
