//! Metamodel: the schema derived from a repository's records

pub mod store;
pub mod view;

pub use store::MetamodelStore;
pub use view::{AttributeTree, FlatMetamodel, MetamodelView};
