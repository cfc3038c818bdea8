pub mod history;
pub mod image;

pub use history::{
    ClinicalHistoryRecord, HistoryError, HistorySource, HistoryValue, HISTORY_FIELDS,
};
pub use image::ImageFile;
