//! Host facts: values, resolvers and the collection that drives them

pub mod collection;
pub mod external;
pub mod host;
pub mod names;
pub mod platform;
pub mod resolver;
pub mod resolvers;
pub mod value;

pub use collection::{Collection, ResolverRegistry};
pub use host::{HostContext, SysRoot, Uname};
pub use platform::Platform;
pub use resolver::{Resolution, Resolver};
pub use value::Value;

#[derive(thiserror::Error, Debug)]
pub enum FactError {
    #[error("fact {name} is claimed by both the {first} and {second} resolvers")]
    DuplicateFact {
        name: String,
        first: String,
        second: String,
    },

    #[error("Failed to parse system information: {0}")]
    ParseError(String),
}
