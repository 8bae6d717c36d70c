//! Slide command handlers

use std::sync::Arc;

use anyhow::{bail, Result};

use deckhand_core::{Gateway, SlideId};

use super::Session;
use crate::output::Output;

pub async fn add(gateway: Arc<dyn Gateway>, presentation: String, output: &Output) -> Result<()> {
    let session = Session::open(gateway, &presentation, output).await?;
    let outcome = session.engine().add_slide().await;
    session.finish(outcome, output).await
}

pub async fn delete(
    gateway: Arc<dyn Gateway>,
    presentation: String,
    slide: String,
    output: &Output,
) -> Result<()> {
    let session = Session::open(gateway, &presentation, output).await?;
    let outcome = session.engine().delete_slide(&SlideId::new(slide)).await;
    session.finish(outcome, output).await
}

/// Move a slide to a 1-based position
pub async fn move_to(
    gateway: Arc<dyn Gateway>,
    presentation: String,
    slide: String,
    position: usize,
    output: &Output,
) -> Result<()> {
    let session = Session::open(gateway, &presentation, output).await?;
    let current = match session.store().lock().await.presentation() {
        Some(p) => p.slide_ids(),
        None => bail!("No presentation is loaded"),
    };

    let order = moved(&current, &SlideId::new(slide), position)?;
    let outcome = session.engine().reorder_slides(&order).await;
    session.finish(outcome, output).await
}

pub async fn color(
    gateway: Arc<dyn Gateway>,
    presentation: String,
    slide: String,
    color: String,
    output: &Output,
) -> Result<()> {
    let session = Session::open(gateway, &presentation, output).await?;
    let outcome = session
        .engine()
        .set_slide_background(&SlideId::new(slide), &color)
        .await;
    session.finish(outcome, output).await
}

/// New slide order with `slide` moved to `position` (1-based)
fn moved(order: &[SlideId], slide: &SlideId, position: usize) -> Result<Vec<SlideId>> {
    if position == 0 || position > order.len() {
        bail!(
            "Position must be between 1 and {} (got {})",
            order.len(),
            position
        );
    }
    let Some(from) = order.iter().position(|id| id == slide) else {
        bail!("Slide not found: {}", slide);
    };

    let mut order = order.to_vec();
    let id = order.remove(from);
    order.insert(position - 1, id);
    Ok(order)
}
