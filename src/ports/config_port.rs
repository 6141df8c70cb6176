//! Configuration access port trait.
//!
//! Values come back as raw strings; typing and presence rules live in
//! [`crate::domain::config_validation`].

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;

    /// Keys present in `section`, used to warn about unrecognised settings.
    fn keys(&self, _section: &str) -> Vec<String> {
        Vec::new()
    }

    fn has_key(&self, section: &str, key: &str) -> bool {
        self.get_string(section, key).is_some()
    }
}
