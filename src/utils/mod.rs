pub mod error;

pub use error::IdCardError;

use std::path::Path;

/// Create every directory in `dirs`, including missing parents.
pub fn ensure_directories<I, P>(dirs: I) -> Result<(), IdCardError>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    for dir in dirs {
        std::fs::create_dir_all(dir.as_ref())?;
    }
    Ok(())
}
