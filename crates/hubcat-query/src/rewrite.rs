//! Join-term rewriting for array-of-objects attributes.
//!
//! A path reference ending in the array wildcard (`curated_content->'samples'->*`)
//! addresses every element of a JSON array of objects. To let each condition
//! match within one element, the reference is replaced by a join alias
//! (`joinTerm0.value`) and the executor is told to unnest the array into that
//! alias. Aliases can themselves point into deeper arrays
//! (`joinTerm0.value->'files'->*`), so discovery repeats with the aliases as
//! new roots until a pass finds nothing.

use crate::error::{QueryRewriteError, RewriteResult};
use hubcat_config::QueryConfig;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Instruction to unnest the JSON array at `source` and bind it to `alias`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinClause {
    /// Expression yielding the array, without the trailing wildcard
    pub source: String,
    /// Alias whose `value` column holds one array element per row
    pub alias: String,
}

/// Output of a rewrite: the final predicate plus its join clauses in
/// allocation order (later clauses may reference earlier aliases)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewrittenQuery {
    pub predicate: String,
    pub joins: Vec<JoinClause>,
}

impl RewrittenQuery {
    pub fn has_joins(&self) -> bool {
        !self.joins.is_empty()
    }
}

/// Rewrites array wildcard references into join terms.
///
/// Alias numbering starts at zero for every call and follows the order in
/// which references first appear in the query text.
#[derive(Debug, Clone)]
pub struct JoinTermRewriter {
    reference: Regex,
    wildcard: String,
    join_term_prefix: String,
    max_depth: usize,
}

impl JoinTermRewriter {
    pub fn new(config: &QueryConfig) -> RewriteResult<Self> {
        let separator = regex::escape(&config.separator);

        let mut roots: Vec<String> = config
            .content_roots
            .iter()
            .map(|root| regex::escape(root))
            .collect();
        roots.push(format!(
            r"{}\d+\.value",
            regex::escape(&config.join_term_prefix)
        ));

        // a root not preceded by an identifier character or a qualifier dot,
        // then separator, quoted segments / separators / bare segment
        // characters, up to the first wildcard
        let pattern = format!(
            r"(?P<lead>^|[^\w.])(?P<reference>(?:{roots}){sep}(?:'[^']*'|{sep}|[^\s'(),=<>!*])*?{sep}\*)",
            roots = roots.join("|"),
            sep = separator,
        );
        let reference =
            Regex::new(&pattern).map_err(|e| QueryRewriteError::InvalidPattern(e.to_string()))?;

        Ok(Self {
            reference,
            wildcard: format!("{}*", config.separator),
            join_term_prefix: config.join_term_prefix.clone(),
            max_depth: config.max_join_depth,
        })
    }

    /// Rewrite `query` until no array wildcard references remain.
    pub fn rewrite(&self, query: &str) -> RewriteResult<RewrittenQuery> {
        if query.trim().is_empty() {
            return Err(QueryRewriteError::EmptyQuery);
        }
        check_literals(query)?;

        let mut predicate = query.to_string();
        let mut joins: Vec<JoinClause> = Vec::new();
        let mut depth = 0;

        loop {
            let discovered = self.discover(&predicate);
            if discovered.is_empty() {
                if let Some(position) = find_unquoted(&predicate, &self.wildcard) {
                    return Err(QueryRewriteError::DanglingWildcard { position });
                }
                debug!(
                    joins = joins.len(),
                    depth, "Rewrote query into join terms"
                );
                return Ok(RewrittenQuery { predicate, joins });
            }
            if depth == self.max_depth {
                return Err(QueryRewriteError::JoinDepthExceeded {
                    max_depth: self.max_depth,
                });
            }
            depth += 1;

            let mut aliases: HashMap<String, String> = HashMap::new();
            for reference in discovered {
                let alias = format!("{}{}", self.join_term_prefix, joins.len());
                let source = reference[..reference.len() - self.wildcard.len()].to_string();
                joins.push(JoinClause {
                    source,
                    alias: alias.clone(),
                });
                aliases.insert(reference, alias);
            }

            predicate = self
                .reference
                .replace_all(&predicate, |caps: &Captures| {
                    match aliases.get(&caps["reference"]) {
                        Some(alias) => format!("{}{}.value", &caps["lead"], alias),
                        None => caps[0].to_string(),
                    }
                })
                .into_owned();
        }
    }

    /// Distinct wildcard references in order of first appearance
    fn discover(&self, predicate: &str) -> Vec<String> {
        let mut found: Vec<String> = Vec::new();
        for caps in self.reference.captures_iter(predicate) {
            let reference = &caps["reference"];
            if !found.iter().any(|f| f == reference) {
                found.push(reference.to_string());
            }
        }
        found
    }
}

/// Fails on a single-quoted literal that is never closed
fn check_literals(text: &str) -> RewriteResult<()> {
    let mut open: Option<usize> = None;
    for (position, c) in text.char_indices() {
        if c == '\'' {
            open = match open {
                Some(_) => None,
                None => Some(position),
            };
        }
    }
    match open {
        Some(position) => Err(QueryRewriteError::UnbalancedQuote { position }),
        None => Ok(()),
    }
}

/// Byte offset of the first `needle` outside single-quoted literals
fn find_unquoted(text: &str, needle: &str) -> Option<usize> {
    let mut quoted = false;
    for (position, c) in text.char_indices() {
        if c == '\'' {
            quoted = !quoted;
        } else if !quoted && text[position..].starts_with(needle) {
            return Some(position);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn rewriter() -> JoinTermRewriter {
        JoinTermRewriter::new(&QueryConfig::default()).unwrap()
    }

    #[test]
    fn test_plain_query_is_untouched() {
        let query = "curated_content->'sample'->>'cell_type' = 'liver'";
        let result = rewriter().rewrite(query).unwrap();

        assert_eq!(result.predicate, query);
        assert!(!result.has_joins());
    }

    #[test]
    fn test_single_array_reference() {
        let result = rewriter()
            .rewrite("curated_content->'samples'->*->>'donor' = 'D1'")
            .unwrap();

        assert_eq!(result.predicate, "joinTerm0.value->>'donor' = 'D1'");
        assert_eq!(
            result.joins,
            vec![JoinClause {
                source: "curated_content->'samples'".to_string(),
                alias: "joinTerm0".to_string(),
            }]
        );
    }

    #[test]
    fn test_repeated_reference_shares_alias() {
        let result = rewriter()
            .rewrite(
                "curated_content->'samples'->*->>'donor' = 'D1' \
                 AND curated_content->'samples'->*->>'sex' = 'F'",
            )
            .unwrap();

        assert_eq!(result.joins.len(), 1);
        assert_eq!(
            result.predicate,
            "joinTerm0.value->>'donor' = 'D1' AND joinTerm0.value->>'sex' = 'F'"
        );
    }

    #[test]
    fn test_aliases_follow_first_appearance() {
        let result = rewriter()
            .rewrite(
                "standard_content->'experiments'->*->>'type' = 'ChIP' \
                 OR curated_content->'samples'->*->>'donor' = 'D1'",
            )
            .unwrap();

        let aliases: Vec<(&str, &str)> = result
            .joins
            .iter()
            .map(|j| (j.source.as_str(), j.alias.as_str()))
            .collect();
        assert_eq!(
            aliases,
            vec![
                ("standard_content->'experiments'", "joinTerm0"),
                ("curated_content->'samples'", "joinTerm1"),
            ]
        );
    }

    #[test]
    fn test_nested_arrays_reach_fixpoint() {
        let result = rewriter()
            .rewrite("curated_content->'samples'->*->'files'->*->>'name' = 'x.bam'")
            .unwrap();

        assert_eq!(result.joins.len(), 2);
        assert_ne!(result.joins[0].alias, result.joins[1].alias);
        assert_eq!(result.joins[0].source, "curated_content->'samples'");
        assert_eq!(result.joins[1].source, "joinTerm0.value->'files'");
        assert_eq!(result.predicate, "joinTerm1.value->>'name' = 'x.bam'");
        assert!(!result.predicate.contains("->*"));
        assert!(!result.predicate.contains("curated_content"));
    }

    #[test]
    fn test_alias_numbering_restarts_per_rewrite() {
        let rewriter = rewriter();
        let first = rewriter
            .rewrite("curated_content->'a'->*->>'b' = '1'")
            .unwrap();
        let second = rewriter
            .rewrite("curated_content->'c'->*->>'d' = '2'")
            .unwrap();

        assert_eq!(first.joins[0].alias, "joinTerm0");
        assert_eq!(second.joins[0].alias, "joinTerm0");
    }

    #[test]
    fn test_depth_bound_is_enforced() {
        let config = QueryConfig {
            max_join_depth: 1,
            ..QueryConfig::default()
        };
        let result = JoinTermRewriter::new(&config)
            .unwrap()
            .rewrite("curated_content->'samples'->*->'files'->*->>'name' = 'x'");

        assert_eq!(
            result,
            Err(QueryRewriteError::JoinDepthExceeded { max_depth: 1 })
        );
    }

    #[test]
    fn test_custom_separator() {
        let config = QueryConfig {
            separator: ">".to_string(),
            ..QueryConfig::default()
        };
        let result = JoinTermRewriter::new(&config)
            .unwrap()
            .rewrite("curated_content>samples>*>donor = 'D1'")
            .unwrap();

        assert_eq!(result.predicate, "joinTerm0.value>donor = 'D1'");
        assert_eq!(result.joins[0].source, "curated_content>samples");
    }

    #[test]
    fn test_reference_keeps_its_leading_character() {
        let result = rewriter()
            .rewrite("(curated_content->'a'->*->>'b' = 'x')")
            .unwrap();
        assert_eq!(result.predicate, "(joinTerm0.value->>'b' = 'x')");
    }

    #[test]
    fn test_wildcard_inside_literal_is_ignored() {
        let result = rewriter()
            .rewrite("curated_content->>'pattern' = 'a->*'")
            .unwrap();
        assert!(!result.has_joins());
    }

    #[test_case("" => QueryRewriteError::EmptyQuery ; "empty")]
    #[test_case("curated_content->>'a' = 'open" => QueryRewriteError::UnbalancedQuote { position: 24 } ; "unterminated literal")]
    #[test_case("other->'a'->* = 1" => QueryRewriteError::DanglingWildcard { position: 10 } ; "unknown root")]
    #[test_case("my_curated_content->'a'->* = 1" => QueryRewriteError::DanglingWildcard { position: 23 } ; "root inside identifier")]
    #[test_case("latest_datasets.curated_content->'a'->*->>'b' = 'x'" => QueryRewriteError::DanglingWildcard { position: 36 } ; "table qualified root")]
    fn test_rejected_queries(query: &str) -> QueryRewriteError {
        rewriter().rewrite(query).unwrap_err()
    }
}
