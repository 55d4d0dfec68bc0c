use chrono::Utc;

/// Generates an opaque record id: capture millis plus a random suffix, so ids
/// created within the same millisecond still differ.
pub fn new_id() -> String {
    let suffix: u32 = rand::random();
    format!("{}-{:08x}", Utc::now().timestamp_millis(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_are_unique() {
        let ids: HashSet<String> = (0..1000).map(|_| new_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_id_shape() {
        let id = new_id();
        let (millis, suffix) = id.split_once('-').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(suffix.len(), 8);
    }
}
