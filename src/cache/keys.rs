use uuid::Uuid;

pub struct CacheKeys;

impl CacheKeys {
    /// Job status entry: job:{id}
    ///
    /// The key shape is part of the external contract; the API layer and
    /// downstream pollers read the same entries.
    pub fn job(id: Uuid) -> String {
        format!("job:{}", id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_key_shape() {
        let id = Uuid::nil();
        assert_eq!(
            CacheKeys::job(id),
            "job:00000000-0000-0000-0000-000000000000"
        );
    }
}
