/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Process-wide dictionary.
//!
//! Most deployments speak a single dialect. Installing its dictionary once
//! at startup lets every packager share it without threading an `Arc`
//! through unrelated layers. Packagers still accept an explicit dictionary,
//! so tests and multi-dialect gateways never need this module.

use crate::error::DictionaryError;
use crate::schema::FieldDictionary;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::info;

static GLOBAL: OnceCell<Arc<FieldDictionary>> = OnceCell::new();

/// Installs the process-wide dictionary.
///
/// # Errors
/// Returns `DictionaryError::AlreadyInitialized` on every call after the first.
pub fn init(dictionary: FieldDictionary) -> Result<Arc<FieldDictionary>, DictionaryError> {
    let dictionary = Arc::new(dictionary);
    GLOBAL
        .set(Arc::clone(&dictionary))
        .map_err(|_| DictionaryError::AlreadyInitialized)?;
    info!(
        name = dictionary.name(),
        fields = dictionary.len(),
        "global dictionary installed"
    );
    Ok(dictionary)
}

/// Returns the process-wide dictionary, if installed.
#[must_use]
pub fn get() -> Option<Arc<FieldDictionary>> {
    GLOBAL.get().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldSpec, FieldType};

    #[test]
    fn test_init_once() {
        let dict = FieldDictionary::new("global")
            .with_field(FieldSpec::fixed(11, FieldType::Numeric, 6))
            .unwrap();
        let installed = init(dict.clone()).unwrap();
        assert_eq!(installed.name(), "global");
        assert_eq!(get().unwrap().name(), "global");

        let err = init(dict).unwrap_err();
        assert_eq!(err, DictionaryError::AlreadyInitialized);
    }
}
