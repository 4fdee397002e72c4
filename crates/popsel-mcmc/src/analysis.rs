use std::path::Path;

use popsel_core::PopError;

use crate::decode::{PosteriorDecoder, PosteriorSummary};
use crate::output::ResultContainer;

/// Recomputes the per-model summary from the samples stored in a container.
pub fn summarize_container(container: &ResultContainer) -> Result<PosteriorSummary, PopError> {
    let decoder = PosteriorDecoder::new(
        container.model_labels.clone(),
        container.channel_names.clone(),
    );
    Ok(decoder.summarize_samples(&container.posterior_samples()?))
}

/// Loads a result container and recomputes its summary.
pub fn summarize_results_file(path: &Path) -> Result<(ResultContainer, PosteriorSummary), PopError> {
    let container = ResultContainer::load(path)?;
    let summary = summarize_container(&container)?;
    Ok((container, summary))
}
