use crate::cli::{MapCommands, OutputFormat};
use crate::context::Catalog;
use crate::output;
use anyhow::{anyhow, Context, Result};
use colored::Colorize;
use hubcat_core::MappingRule;

pub async fn execute(catalog: &Catalog, format: OutputFormat, cmd: MapCommands) -> Result<()> {
    match cmd {
        MapCommands::Apply { repository, hub } => {
            let summary = catalog
                .pipeline
                .apply_mappings(&repository, &hub)
                .await
                .with_context(|| format!("Mapping of {repository}/{hub} failed"))?;
            match format {
                OutputFormat::Json => output::print_json(&summary)?,
                OutputFormat::Table => println!(
                    "{} {} records at standard version {}",
                    "Mapped".green(),
                    summary.datasets,
                    summary.version
                ),
            }
        }

        MapCommands::Show { repository, hub } => {
            let rules = catalog.pipeline.mappings(&repository, &hub).await?;
            match format {
                OutputFormat::Json => output::print_json(&rules)?,
                OutputFormat::Table => {
                    let mut table = output::table(&["Kind", "Source / Language", "Destination / Script"]);
                    for rule in &rules {
                        match rule {
                            MappingRule::Static {
                                source,
                                destination,
                            } => table.add_row(vec!["static", source.as_str(), destination.as_str()]),
                            MappingRule::Dynamic { language, script } => table.add_row(vec![
                                "dynamic".to_string(),
                                language.clone(),
                                output::preview(script, 60),
                            ]),
                        };
                    }
                    println!("{table}");
                }
            }
        }

        MapCommands::Set {
            repository,
            hub,
            statics,
            script,
            language,
        } => {
            let mut rules = statics
                .iter()
                .map(|rule| parse_static(rule.as_str()))
                .collect::<Result<Vec<_>>>()?;

            if let Some(path) = script {
                let script = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read script {}", path.display()))?;
                rules.insert(
                    0,
                    MappingRule::Dynamic {
                        language: language
                            .unwrap_or_else(|| catalog.config.pipeline.scripting_language.clone()),
                        script,
                    },
                );
            }

            let count = rules.len();
            catalog
                .pipeline
                .save_mappings(&repository, &hub, rules)
                .await
                .with_context(|| format!("Saving mappings of {repository}/{hub} failed"))?;
            println!("{} {count} mapping rules for {repository}/{hub}", "Saved".green());
        }
    }
    Ok(())
}

/// `SOURCE=DESTINATION` into a static rule
pub fn parse_static(text: &str) -> Result<MappingRule> {
    let (source, destination) = text
        .split_once('=')
        .ok_or_else(|| anyhow!("Static mapping {text:?} is not SOURCE=DESTINATION"))?;
    Ok(MappingRule::Static {
        source: source.trim().to_string(),
        destination: destination.trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_static() {
        assert_eq!(
            parse_static("a>b = m>n").unwrap(),
            MappingRule::Static {
                source: "a>b".to_string(),
                destination: "m>n".to_string(),
            }
        );
        assert!(parse_static("a>b").is_err());
    }
}
