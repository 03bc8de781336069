use crate::cli::OutputFormat;
use crate::context::Catalog;
use crate::output;
use anyhow::Result;
use hubcat_core::{AttributePath, BrowserNode, NodeKind};
use hubcat_query::PathExpression;
use serde::Serialize;

#[derive(Serialize)]
struct NodeRow<'a> {
    #[serde(flatten)]
    node: &'a BrowserNode,
    /// Expression to paste into `hubcat search`
    expression: Option<String>,
}

pub async fn execute(
    catalog: &Catalog,
    format: OutputFormat,
    repository: String,
    path: Option<String>,
    filter: String,
    raw: bool,
) -> Result<()> {
    let nodes = catalog
        .browser
        .expand_filtered(&repository, raw, path.as_deref().unwrap_or(""), &filter)
        .await?;
    let arrays = catalog.metamodel.get_array_attributes(&repository, raw).await?;

    let paths = PathExpression::new(&catalog.config.query);
    let root = catalog.config.query.content_root(raw).unwrap_or("curated_content");
    let rows: Vec<NodeRow> = nodes
        .iter()
        .map(|node| NodeRow {
            node,
            expression: (node.kind == NodeKind::Attribute).then(|| {
                paths.render(root, node.path.segments(), |prefix: &[String]| {
                    arrays.contains(&AttributePath::new(prefix))
                })
            }),
        })
        .collect();

    match format {
        OutputFormat::Json => output::print_json(&rows)?,
        OutputFormat::Table => {
            let mut table = output::table(&["Label", "Kind", "Children", "Array", "Expression"]);
            for row in &rows {
                let kind = match row.node.kind {
                    NodeKind::Attribute if row.node.is_expandable() => "attribute +",
                    NodeKind::Attribute => "attribute",
                    NodeKind::Value => "value",
                };
                table.add_row(vec![
                    row.node.label.clone(),
                    kind.to_string(),
                    row.node.child_count.to_string(),
                    if row.node.is_array { "yes" } else { "" }.to_string(),
                    row.expression.clone().unwrap_or_default(),
                ]);
            }
            println!("{table}");
        }
    }
    Ok(())
}
