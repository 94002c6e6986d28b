use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

pub(crate) fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} out of range: {v}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_negative_and_oversized_counts() {
        assert_eq!(i64_to_u32("n", 7).unwrap(), 7);
        assert!(matches!(
            i64_to_u32("n", -1),
            Err(StorageError::Serialization(_))
        ));
        assert!(i64_to_u32("n", i64::from(u32::MAX) + 1).is_err());
    }
}
