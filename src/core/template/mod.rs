pub mod codec;
pub mod types;

pub use types::{EnrolledFactors, Modality, TemplateRecord};
