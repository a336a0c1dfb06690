pub mod configuration;
pub mod kind;
pub mod message;
pub mod path;
pub mod query;
pub mod schema;

/// Extended property listing the ids of every parent reached through a ChildToParent path.
pub const ASSOCIATED_IDENTITIES: &str = "AssociatedIdentities";
