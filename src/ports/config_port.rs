//! Configuration access port trait.

/// Raw string access; numeric parsing and range checks live in
/// `domain::config_validation`.
pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    /// Names of every section present, in no particular order.
    fn sections(&self) -> Vec<String>;
}
