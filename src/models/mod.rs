pub mod course;
pub mod external_url;
pub mod file;
pub mod folder;

pub use course::{Course, FavoriteCourse};
pub use external_url::ExternalUrl;
pub use file::File;
pub use folder::Folder;
