//! Command handlers

pub mod config;
pub mod element;
pub mod presentation;
pub mod slide;

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};

use deckhand_core::{
    Config, DocumentStore, Gateway, HttpGateway, PresentationId, SharedStore, SyncEngine,
    SyncOutcome,
};

use crate::output::Output;

/// Gateway configured from the loaded configuration
pub fn connect(config: &Config) -> Result<Arc<dyn Gateway>> {
    let gateway = HttpGateway::from_config(config)
        .with_context(|| format!("Failed to create client for {}", config.api_url))?;
    Ok(Arc::new(gateway))
}

/// Ask a yes/no question on the terminal; anything but "y" or "yes" is a no
pub fn confirm(prompt: &str) -> Result<bool> {
    if !atty::is(atty::Stream::Stdin) {
        return Ok(false);
    }

    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    let input = input.trim().to_lowercase();
    Ok(input == "y" || input == "yes")
}

/// A loaded presentation plus the engine that edits it
pub struct Session {
    store: SharedStore,
    engine: SyncEngine,
}

impl Session {
    /// Load `presentation` through a fresh store and engine
    pub async fn open(gateway: Arc<dyn Gateway>, presentation: &str, output: &Output) -> Result<Self> {
        let store = DocumentStore::new().into_shared();
        let engine = SyncEngine::new(&store, gateway, Arc::new(*output));

        let id = PresentationId::new(presentation);
        if !engine.load(&id).await.is_committed() {
            bail!("Could not load presentation {}", id);
        }
        Ok(Self { store, engine })
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Print the current document
    pub async fn print(&self, output: &Output) -> Result<()> {
        let store = self.store.lock().await;
        let presentation = store
            .presentation()
            .ok_or_else(|| anyhow!("No presentation is loaded"))?;
        output.print_presentation(presentation, store.selection());
        Ok(())
    }

    /// Print the document after a committed operation; error otherwise
    ///
    /// The notifier has already reported the failure to the user.
    pub async fn finish(&self, outcome: SyncOutcome, output: &Output) -> Result<()> {
        match outcome {
            SyncOutcome::Committed => {
                if !output.is_quiet() {
                    self.print(output).await?;
                }
                Ok(())
            }
            SyncOutcome::RolledBack(e) => Err(anyhow!(e).context("Change was not saved")),
            SyncOutcome::Rejected(e) => Err(anyhow!(e).context("Change was rejected")),
            SyncOutcome::Detached => bail!("Document closed before the change was saved"),
        }
    }
}
