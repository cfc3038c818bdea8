use serde::{Deserialize, Serialize};

/// One binary file selected for diagnosis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageFile {
    pub file_name: String,
    /// Declared media type (e.g. `image/jpeg`).
    pub media_type: String,
    #[serde(skip)]
    pub data: Vec<u8>,
}

impl ImageFile {
    pub fn new(
        file_name: impl Into<String>,
        media_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            media_type: media_type.into(),
            data,
        }
    }

    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }
}
