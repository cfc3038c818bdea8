//! Multipart payload for a diagnosis request.
//!
//! Composition is separate from validation: callers run
//! `validation::validate_submission` first.

use reqwest::multipart::{Form, Part};
use thiserror::Error;

use crate::models::{ClinicalHistoryRecord, ImageFile};

/// Form field carrying the JSON-encoded history.
pub const HISTORY_FIELD: &str = "history";
/// Repeated form field carrying each image file.
pub const IMAGES_FIELD: &str = "images";

#[derive(Error, Debug)]
pub enum SubmissionError {
    #[error("Failed to serialize history: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Invalid media type for {file_name}: {media_type}")]
    MediaType {
        file_name: String,
        media_type: String,
    },
}

/// Single-use multipart body: one `history` field plus ordered `images`.
#[derive(Debug, Clone)]
pub struct MultipartPayload {
    history: String,
    images: Vec<ImageFile>,
}

impl MultipartPayload {
    /// The JSON text sent as the `history` field.
    pub fn history(&self) -> &str {
        &self.history
    }

    pub fn images(&self) -> &[ImageFile] {
        &self.images
    }

    /// Field names in the order they are written.
    pub fn field_names(&self) -> Vec<&'static str> {
        std::iter::once(HISTORY_FIELD)
            .chain(self.images.iter().map(|_| IMAGES_FIELD))
            .collect()
    }

    /// Build the outbound reqwest form.
    pub fn into_form(self) -> Result<Form, SubmissionError> {
        let mut form = Form::new().text(HISTORY_FIELD, self.history);
        for image in self.images {
            let part = Part::bytes(image.data)
                .file_name(image.file_name.clone())
                .mime_str(&image.media_type)
                .map_err(|_| SubmissionError::MediaType {
                    file_name: image.file_name,
                    media_type: image.media_type.clone(),
                })?;
            form = form.part(IMAGES_FIELD, part);
        }
        Ok(form)
    }
}

/// Compose the multipart payload for a history and its images.
pub fn compose(
    record: &ClinicalHistoryRecord,
    images: &[ImageFile],
) -> Result<MultipartPayload, SubmissionError> {
    Ok(MultipartPayload {
        history: record.to_json()?,
        images: images.to_vec(),
    })
}
