//! Classify command - Show how file names are treated
//!
//! Useful for checking why a photo does or does not appear in the show.

use anyhow::Result;
use clap::Args;
use partyshow_cache::is_managed;
use partyshow_core::domain::{FileName, FilenameClassifier, NameKind};
use serde::Serialize;

use super::CommandContext;

#[derive(Debug, Args)]
pub struct ClassifyCommand {
    /// File names to classify
    #[arg(required = true)]
    pub names: Vec<String>,
}

/// Classification of one name as reported to the user
#[derive(Debug, PartialEq, Eq, Serialize)]
struct Report {
    name: String,
    kind: Option<NameKind>,
    uploader: Option<String>,
    managed_extension: bool,
    displayable: bool,
    error: Option<String>,
}

impl ClassifyCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<()> {
        let formatter = ctx.formatter();
        let config = ctx.load_config();
        let classifier = FilenameClassifier::from_config(&config.classifier);

        let reports: Vec<Report> = self
            .names
            .iter()
            .map(|raw| classify(&classifier, &config.cache.extensions, raw))
            .collect();

        if ctx.is_json() {
            formatter.print_json(&serde_json::to_value(&reports)?);
            return Ok(());
        }

        for report in &reports {
            match (&report.error, report.kind) {
                (Some(error), _) => formatter.warn(&format!("{}: {}", report.name, error)),
                (None, Some(kind)) => {
                    let verdict = if report.displayable {
                        "shown"
                    } else if !report.managed_extension {
                        "ignored (extension not managed)"
                    } else {
                        "ignored"
                    };
                    formatter.info(&format!(
                        "{}: {:?}, uploader {}, {}",
                        report.name,
                        kind,
                        report.uploader.as_deref().unwrap_or("-"),
                        verdict
                    ));
                }
                (None, None) => {}
            }
        }
        Ok(())
    }
}

fn classify(classifier: &FilenameClassifier, extensions: &[String], raw: &str) -> Report {
    match raw.parse::<FileName>() {
        Ok(name) => {
            let classified = classifier.classify(&name);
            let managed = is_managed(&name, extensions);
            Report {
                name: raw.to_string(),
                kind: Some(classified.kind),
                displayable: managed && classified.is_final(),
                uploader: classified.uploader,
                managed_extension: managed,
                error: None,
            }
        }
        Err(e) => Report {
            name: raw.to_string(),
            kind: None,
            uploader: None,
            managed_extension: false,
            displayable: false,
            error: Some(e.to_string()),
        },
    }
}
