//! Service modules for the import dispatcher
//!
//! - Operation selection (option → chain/operation)
//! - Batch-upload and direct-upload resolvers
//! - Destination folder resolution
//! - Upload file name cleaning

pub mod batch_resolver;
pub mod direct_upload;
pub mod file_names;
pub mod folder_resolver;
pub mod operation_selector;

pub use batch_resolver::BatchUploadResolver;
pub use direct_upload::DirectUploadResolver;
pub use file_names::clean_file_name;
pub use folder_resolver::FolderResolver;
pub use operation_selector::resolve_target;
