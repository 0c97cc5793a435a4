//! Movie identification from a single still using vision AI.

use crate::ai::prompts::{render_identify_system_prompt, render_identify_user_prompt};
use crate::ai::{GenerateContentResponse, VisionClient};
use crate::error::IdentifyError;
use crate::extract::{extract, no_match_message};
use crate::types::{IdentificationOutcome, IdentifyRequest, SelectedImage};

/// Build the request for `image` with the standard prompts.
pub fn build_identify_request(image: SelectedImage) -> IdentifyRequest {
    IdentifyRequest::new(
        image,
        render_identify_user_prompt(),
        render_identify_system_prompt(),
    )
}

/// Turn a successful response into an outcome, or a no-match error carrying
/// the message to show.
pub fn interpret_response(
    response: &GenerateContentResponse,
) -> Result<IdentificationOutcome, IdentifyError> {
    let text = response.text().unwrap_or_default();
    let result = extract(text);

    if !result.success {
        return Err(IdentifyError::NoMatch(no_match_message(text)));
    }

    Ok(IdentificationOutcome {
        result,
        sources: response.sources(),
    })
}

pub async fn identify_movie(
    client: &dyn VisionClient,
    image: SelectedImage,
) -> Result<IdentificationOutcome, IdentifyError> {
    let request = build_identify_request(image);
    let response = client.generate(&request).await?;
    interpret_response(&response)
}
