//! File selection, transformation and copying.

pub mod copy;
pub mod file_set;
pub mod matcher;
pub mod transform;

pub use copy::copy_file_set;
pub use file_set::{
    AppFiles, FileGroup, FileSet, FileSetEntry, compute_app_file_set, compute_file_group,
    compute_file_set,
};
pub use matcher::{ExcludeSet, FileMatcher, MatchedFile, compute_exclude_set};
pub use transform::{ContentTransformer, PackageDescriptorTransformer, TransformerChain};
