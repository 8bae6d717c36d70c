//! Presentation command handlers

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use deckhand_core::{Config, Gateway, PresentationId};

use super::{confirm, Session};
use crate::output::Output;

/// List presentations, most recently edited first
pub async fn list(gateway: Arc<dyn Gateway>, output: &Output) -> Result<()> {
    let summaries = gateway
        .list_presentations()
        .await
        .context("Failed to list presentations")?;
    output.print_summaries(&summaries);
    Ok(())
}

/// Create a presentation (with one empty slide)
pub async fn create(gateway: Arc<dyn Gateway>, title: Option<String>, output: &Output) -> Result<()> {
    let title = title.unwrap_or_default();
    let summary = gateway
        .create_presentation(&title)
        .await
        .context("Failed to create presentation")?;

    output.success(&format!("Created presentation: {}", summary.id));
    output.print_summary(&summary);
    Ok(())
}

pub async fn show(gateway: Arc<dyn Gateway>, id: String, output: &Output) -> Result<()> {
    let session = Session::open(gateway, &id, output).await?;
    session.print(output).await
}

pub async fn rename(
    gateway: Arc<dyn Gateway>,
    id: String,
    title: String,
    output: &Output,
) -> Result<()> {
    let session = Session::open(gateway, &id, output).await?;
    let outcome = session.engine().rename(&title).await;
    session.finish(outcome, output).await
}

/// Delete a presentation and everything on it
pub async fn delete(gateway: Arc<dyn Gateway>, id: String, output: &Output) -> Result<()> {
    let id = PresentationId::new(id);

    if output.should_prompt() {
        let presentation = gateway
            .load_presentation(&id)
            .await
            .with_context(|| format!("Failed to load presentation {}", id))?;
        println!(
            "Delete presentation: {} - {} ({} slides)",
            id,
            presentation.title,
            presentation.slides.len()
        );
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    gateway
        .delete_presentation(&id)
        .await
        .with_context(|| format!("Failed to delete presentation {}", id))?;

    output.success(&format!("Deleted presentation: {}", id));
    Ok(())
}

/// Download the exported presentation
///
/// Without `--out` the file lands in the configured export directory,
/// named after the presentation title.
pub async fn export(
    gateway: Arc<dyn Gateway>,
    config: &Config,
    id: String,
    out: Option<PathBuf>,
    output: &Output,
) -> Result<()> {
    let id = PresentationId::new(id);
    let path = match out {
        Some(path) => path,
        None => {
            let presentation = gateway
                .load_presentation(&id)
                .await
                .with_context(|| format!("Failed to load presentation {}", id))?;
            config
                .export_dir()
                .join(format!("{}.pptx", file_stem(&presentation.title)))
        }
    };

    let bytes = gateway
        .export_presentation(&id)
        .await
        .with_context(|| format!("Failed to export presentation {}", id))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }
    std::fs::write(&path, &bytes).with_context(|| format!("Failed to write {:?}", path))?;

    output.success(&format!("Exported {} bytes to {}", bytes.len(), path.display()));
    Ok(())
}

/// A file name derived from a title
fn file_stem(title: &str) -> String {
    let stem: String = title
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if stem.is_empty() {
        "presentation".to_string()
    } else {
        stem
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use deckhand_core::{MemoryGateway, Presentation, Slide, SlideId};

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("Q3 review"), "Q3 review");
        assert_eq!(file_stem("a/b: c?"), "a_b_ c_");
        assert_eq!(file_stem("   "), "presentation");
    }

    #[tokio::test]
    async fn test_export_to_default_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.export_dir = Some(dir.path().join("exports"));

        let gateway = Arc::new(MemoryGateway::new());
        let mut presentation = Presentation::new(PresentationId::new("p1"), "Roadmap");
        presentation.slides.push(Slide::new(SlideId::new("1")));
        gateway.insert(presentation);

        let output = Output::new(OutputFormat::Quiet);
        export(gateway, &config, "p1".to_string(), None, &output)
            .await
            .unwrap();

        let written = std::fs::read(dir.path().join("exports").join("Roadmap.pptx")).unwrap();
        assert!(!written.is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_presentation() {
        let gateway = Arc::new(MemoryGateway::new());
        let mut presentation = Presentation::new(PresentationId::new("p1"), "Roadmap");
        presentation.slides.push(Slide::new(SlideId::new("1")));
        gateway.insert(presentation);

        let output = Output::new(OutputFormat::Quiet);
        delete(gateway.clone(), "p1".to_string(), &output)
            .await
            .unwrap();
        assert!(gateway.presentation(&PresentationId::new("p1")).is_none());

        let missing = delete(gateway, "p1".to_string(), &output).await;
        assert!(missing.is_err());
    }

    #[tokio::test]
    async fn test_rename_rejects_blank_title() {
        let gateway = Arc::new(MemoryGateway::new());
        let mut presentation = Presentation::new(PresentationId::new("p1"), "Roadmap");
        presentation.slides.push(Slide::new(SlideId::new("1")));
        gateway.insert(presentation);

        let output = Output::new(OutputFormat::Quiet);
        let result = rename(gateway.clone(), "p1".to_string(), " ".to_string(), &output).await;
        assert!(result.is_err());
        assert_eq!(
            gateway.presentation(&PresentationId::new("p1")).unwrap().title,
            "Roadmap"
        );
    }
}
