/// Setting key holding the comma-separated admin phone numbers.
pub const WHITELIST_KEY: &str = "whitelist";

pub fn parse_whitelist(raw: &str) -> Vec<String> {
    crate::config::split_list(raw)
}
