use crate::cli::{MetamodelCommands, OutputFormat};
use crate::context::Catalog;
use crate::output;
use anyhow::Result;

pub async fn execute(catalog: &Catalog, format: OutputFormat, cmd: MetamodelCommands) -> Result<()> {
    let metamodel = &catalog.metamodel;

    let lines = match cmd {
        MetamodelCommands::Attributes {
            repository,
            filter,
            top,
            stage,
        } => {
            metamodel
                .attributes(&repository, &filter, stage.raw(), top)
                .await?
        }
        MetamodelCommands::Children {
            repository,
            attribute,
            filter,
            stage,
        } => {
            metamodel
                .sub_attributes(&repository, &attribute, &filter, stage.raw())
                .await?
        }
        MetamodelCommands::Values {
            repository,
            attribute,
            filter,
            stage,
        } => {
            metamodel
                .values(&repository, &attribute, &filter, stage.raw())
                .await?
        }
        MetamodelCommands::Arrays { repository, stage } => metamodel
            .get_array_attributes(&repository, stage.raw())
            .await?
            .iter()
            .map(|path| path.join(metamodel.separator()))
            .collect(),
        // Always JSON, the nesting does not fit a table
        MetamodelCommands::Tree { repository, stage } => {
            let tree = metamodel.get_tree(&repository, stage.raw()).await?;
            return output::print_json(&tree.to_json());
        }
    };

    match format {
        OutputFormat::Json => output::print_json(&lines)?,
        OutputFormat::Table => output::print_lines(&lines),
    }
    Ok(())
}
