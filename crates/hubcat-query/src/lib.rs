//! Query translation for hubcat
//!
//! Users write boolean predicates over JSON content columns, addressing nested
//! attributes with the store's path operator. Attributes that hold arrays of
//! objects are marked with a trailing wildcard (`->*`). This crate turns such
//! references into unnest join terms so that every condition on an array is
//! evaluated per element:
//!
//! ```rust
//! use hubcat_config::QueryConfig;
//! use hubcat_query::JoinTermRewriter;
//!
//! let rewriter = JoinTermRewriter::new(&QueryConfig::default())?;
//! let rewritten = rewriter.rewrite("curated_content->'samples'->*->>'donor' = 'D1'")?;
//!
//! assert_eq!(rewritten.predicate, "joinTerm0.value->>'donor' = 'D1'");
//! assert_eq!(rewritten.joins[0].source, "curated_content->'samples'");
//! # Ok::<(), hubcat_query::QueryRewriteError>(())
//! ```
//!
//! The boolean language itself belongs to the executing store; the rewriter
//! only touches path references.

pub mod error;
pub mod path;
pub mod rewrite;

pub use error::{QueryRewriteError, RewriteResult};
pub use path::PathExpression;
pub use rewrite::{JoinClause, JoinTermRewriter, RewrittenQuery};
