//! Capability path generation.

use uuid::Uuid;

/// A fresh unguessable capability object path.
pub fn random_object_path() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Seed capability path for an object path, relative to a region's server URI.
pub fn seed_path(object_path: &str) -> String {
    format!("/CAPS/{object_path}0000/")
}

/// Absolute seed capability URL served by `server_uri`.
pub fn seed_url(server_uri: &str, object_path: &str) -> String {
    format!("{}{}", server_uri.trim_end_matches('/'), seed_path(object_path))
}

/// A fresh per-(agent, region) capability password.
pub fn random_password() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_paths_are_unique() {
        assert_ne!(random_object_path(), random_object_path());
        assert_eq!(random_object_path().len(), 32);
    }

    #[test]
    fn seed_url_joins_without_double_slash() {
        assert_eq!(
            seed_url("http://sim.example:9000/", "abc"),
            "http://sim.example:9000/CAPS/abc0000/"
        );
        assert_eq!(seed_url("http://sim.example:9000", "abc"), "http://sim.example:9000/CAPS/abc0000/");
    }
}
