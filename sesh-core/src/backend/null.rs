//! Null backend for running without a multiplexer.

use super::SessionBackend;
use crate::error::{Error, Result};
use std::path::Path;

/// Backend used when nothing is installed: mutations fail, queries are empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullBackend;

impl SessionBackend for NullBackend {
    fn name(&self) -> String {
        "none".to_string()
    }

    fn create(&self, _name: &str, _path: &Path) -> Result<()> {
        Err(Error::NoBackend)
    }

    fn attach(&self, _name: &str) -> Result<()> {
        Err(Error::NoBackend)
    }

    fn switch(&self, _name: &str) -> Result<()> {
        Err(Error::NoBackend)
    }

    fn list(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn delete(&self, _name: &str) -> Result<()> {
        Err(Error::NoBackend)
    }

    fn exists(&self, _name: &str) -> Result<bool> {
        Ok(false)
    }

    fn is_running(&self) -> bool {
        false
    }

    fn is_inside_session(&self) -> bool {
        false
    }

    fn current_session_name(&self) -> Result<Option<String>> {
        Ok(None)
    }

    fn run_in_session(&self, _name: &str, _command: &str) -> Result<()> {
        Err(Error::NoBackend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mutations_fail_queries_are_empty() {
        let null = NullBackend;
        assert!(matches!(
            null.create("s", Path::new("/tmp")),
            Err(Error::NoBackend)
        ));
        assert!(matches!(null.attach("s"), Err(Error::NoBackend)));
        assert!(matches!(null.delete("s"), Err(Error::NoBackend)));
        assert!(null.list().unwrap().is_empty());
        assert!(!null.exists("s").unwrap());
        assert!(null.current_session_name().unwrap().is_none());
        assert!(!null.is_running());
    }
}
