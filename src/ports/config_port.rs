//! Configuration access port trait.

/// Raw key lookup; numbers and dates are parsed by the caller so bad values
/// surface as config errors instead of silent defaults.
pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;
}
