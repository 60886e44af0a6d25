//! Fetch-then-composite, one identifier at a time

use crate::compositor::{Background, CompositeResult, Compositor};
use crate::{batch_tokens, Fetcher, Identifier, Result};
use log::{info, warn};
use rand::Rng;

/// Outcome for one identifier of a batch
#[derive(Debug)]
pub struct BatchItem {
    pub identifier: String,
    pub outcome: Result<CompositeResult>,
}

/// Couples a fetcher with a compositor.
pub struct Pipeline<F: Fetcher> {
    fetcher: F,
    compositor: Compositor,
}

impl<F: Fetcher> Pipeline<F> {
    pub fn new(fetcher: F, compositor: Compositor) -> Self {
        Self { fetcher, compositor }
    }

    /// Fetch one inscription and composite it onto `background`.
    pub fn process<R: Rng + ?Sized>(
        &self,
        identifier: &Identifier,
        background: &Background,
        rng: &mut R,
    ) -> Result<CompositeResult> {
        let source = self.fetcher.fetch(identifier)?;
        self.compositor.composite(&source, background, identifier, rng)
    }

    /// Process a comma-separated list sequentially.
    ///
    /// Each token gets its own outcome; a token that is not a valid
    /// identifier or an identifier that fails is logged and the batch moves on.
    pub fn process_batch<R: Rng + ?Sized>(
        &self,
        input: &str,
        background: &Background,
        rng: &mut R,
    ) -> Vec<BatchItem> {
        let tokens: Vec<&str> = batch_tokens(input).collect();
        info!("processing {} inscription(s)", tokens.len());

        tokens
            .into_iter()
            .map(|token| {
                let outcome = Identifier::new(token).and_then(|id| self.process(&id, background, rng));
                if let Err(e) = &outcome {
                    warn!("inscription {} failed: {}", token, e);
                }
                BatchItem {
                    identifier: token.to_string(),
                    outcome,
                }
            })
            .collect()
    }
}
