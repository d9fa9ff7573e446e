use anyhow::{bail, Context};
use clap::Parser;

mod app;
mod boxes;
mod cli;
mod codes;
mod config;
mod search;
mod semantic;
mod storage;
mod vision;

use app::{App, AppPaths};
use boxes::{BoxCreate, BoxUpdate};
use codes::BoxId;
use search::{SearchOutcome, SearchRequest};
use vision::VisionError;

/// Split comma-separated item input into clean tags.
pub fn parse_items(text: &str) -> Vec<String> {
    text.split(',')
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(|item| item.to_string())
        .collect()
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = cli::Args::parse();

    let paths = AppPaths::resolve()?;
    let app = App::open(&paths)?;

    match args.command {
        cli::Command::Add {
            location,
            items,
            image,
            auto_tag,
        } => {
            let image = match image {
                Some(path) => Some(
                    std::fs::read(&path)
                        .with_context(|| format!("couldnt read image {}", path.display()))?,
                ),
                None => None,
            };

            let mut items = items.as_deref().map(parse_items).unwrap_or_default();

            if auto_tag {
                let Some(ref bytes) = image else {
                    bail!("--auto-tag requires --image");
                };
                match app.analyze_image(bytes) {
                    Ok(tags) => {
                        println!("Detected: {}", tags.join(", "));
                        items.extend(tags);
                    }
                    // tagging is optional; the save continues either way
                    Err(err) => eprintln!("Auto-tag unavailable: {err}"),
                }
            }

            let location = match location {
                Some(location) => {
                    let config = app.config();
                    let known = config.read().unwrap().is_known_location(&location);
                    if !known {
                        eprintln!(
                            "Note: '{location}' is not in the location list (snapfind locations add)"
                        );
                    }
                    location
                }
                None => app
                    .locations()
                    .first()
                    .cloned()
                    .unwrap_or_else(|| "Home".to_string()),
            };

            let record = app.create(BoxCreate {
                location,
                items,
                image,
            })?;
            println!("{}", serde_json::to_string_pretty(&record)?);
            Ok(())
        }

        cli::Command::Search {
            query,
            location,
            threshold,
        } => {
            if let Some(threshold) = threshold {
                if !(0.0..=1.0).contains(&threshold) {
                    bail!("threshold must be between 0.0 and 1.0");
                }
                let config = app.config();
                config.write().unwrap().search.threshold = threshold;
            }

            let request = SearchRequest {
                query: query.unwrap_or_default(),
                location,
            };

            match app.search(&request)? {
                SearchOutcome::NoQuery => {
                    eprintln!("Nothing to search for: give a query or a --location filter.");
                }
                SearchOutcome::LocationOnly(records) => {
                    if records.is_empty() {
                        let loc = request.location.as_deref().unwrap_or_default();
                        println!("No boxes found in {loc}.");
                    } else {
                        println!("{}", serde_json::to_string_pretty(&records)?);
                    }
                }
                SearchOutcome::CodeMatch(record) => {
                    println!("{}", serde_json::to_string_pretty(&record)?);
                }
                SearchOutcome::Semantic(scored) => {
                    println!("{}", serde_json::to_string_pretty(&scored)?);
                }
                SearchOutcome::Keyword(records) => {
                    println!("{}", serde_json::to_string_pretty(&records)?);
                    eprintln!("(keyword matches; semantic search found nothing)");
                }
                SearchOutcome::NoSemanticMatch => {
                    println!("No matching boxes found.");
                }
            }
            Ok(())
        }

        cli::Command::Scan { code } => {
            match app.resolve_scan(&code)? {
                Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                None => println!("Box code '{}' not found.", codes::normalize_code(&code)),
            }
            Ok(())
        }

        cli::Command::Show { id, code } => {
            let record = match (id, code) {
                (Some(id), _) => app.get(&BoxId::from(id))?,
                (None, Some(code)) => app.get_by_code(&code)?,
                (None, None) => bail!("give an id or a --code"),
            };

            match record {
                Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                None => println!("Box not found."),
            }
            Ok(())
        }

        cli::Command::List {} => {
            let records = app.list_all()?;
            println!("{}", serde_json::to_string_pretty(&records)?);
            Ok(())
        }

        cli::Command::Update {
            id,
            location,
            items,
        } => {
            let update = BoxUpdate {
                location,
                items: items.as_deref().map(parse_items),
                image: None,
            };

            match app.update(&BoxId::from(id), update)? {
                Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                None => println!("Box not found."),
            }
            Ok(())
        }

        cli::Command::Delete { id } => {
            app.delete(&BoxId::from(id))?;
            println!("Deleted.");
            Ok(())
        }

        cli::Command::Locations { action } => {
            let config = app.config();
            let mut config = config.write().unwrap();
            match action {
                cli::LocationsAction::List {} => {
                    for location in &config.locations {
                        println!("{location}");
                    }
                }
                cli::LocationsAction::Add { name } => {
                    if config.add_location(&name) {
                        config.save();
                        println!("Added '{name}'.");
                    } else {
                        println!("'{name}' is already in the list.");
                    }
                }
                cli::LocationsAction::Remove { name } => {
                    if config.remove_location(&name) {
                        config.save();
                        println!("Removed '{name}'.");
                    } else {
                        println!("'{name}' is not in the list.");
                    }
                }
            }
            Ok(())
        }

        cli::Command::Analyze { image } => {
            let bytes = std::fs::read(&image)
                .with_context(|| format!("couldnt read image {}", image.display()))?;

            match app.analyze_image(&bytes) {
                Ok(tags) if tags.is_empty() => println!("No items detected."),
                Ok(tags) => println!("{}", tags.join(", ")),
                Err(err @ VisionError::NotConfigured) => eprintln!("{err}"),
                Err(err) => bail!(err),
            }
            Ok(())
        }
    }
}
