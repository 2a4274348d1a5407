//! Error types for the collection view engine.

/// Result type alias for collection view operations.
pub type Result<T> = std::result::Result<T, ViewError>;

/// Errors raised by views, view sources and observable collections.
///
/// Every variant describes a caller or configuration mistake. Nothing is
/// retried; the error is returned before any change notification is emitted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ViewError {
    /// Flat mutation (add, insert, remove, clear) was requested on a grouped view.
    #[error("grouped views cannot be mutated directly; mutate the group's items instead")]
    GroupedViewNotMutable,

    /// The items binding produced no collection for a group object.
    #[error("cannot resolve items from group {group} through binding '{binding}'")]
    UnresolvedGroupItems {
        /// Debug rendering of the group object.
        group: String,
        /// Name of the binding that was evaluated.
        binding: String,
    },

    /// Mutation was requested but the source does not support indexed mutation.
    #[error("the source collection does not support indexed mutation")]
    SourceNotMutable,

    /// An operation needs a source but none is configured.
    #[error("no source collection is configured")]
    NoSource,

    /// The grouping flag disagrees with the kind of source supplied.
    #[error("source shape does not match grouping (is_source_grouped = {grouped})")]
    SourceShapeMismatch {
        /// The configured grouping flag.
        grouped: bool,
    },

    /// A grouped source was configured without an items binding.
    #[error("a grouped source requires an items binding")]
    MissingItemsBinding,

    /// Sort descriptions were configured without a property resolver.
    #[error("sort descriptions require a property resolver")]
    MissingResolver,

    /// A positional argument was outside the collection.
    #[error("index {index} is out of range for length {len}")]
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// The collection length at the time of the request.
        len: usize,
    },
}

impl ViewError {
    /// Create an unresolved-group error for `group`.
    pub fn unresolved_group(group: &impl std::fmt::Debug, binding: impl Into<String>) -> Self {
        Self::UnresolvedGroupItems {
            group: format!("{group:?}"),
            binding: binding.into(),
        }
    }

    /// Create an index error.
    pub fn out_of_range(index: usize, len: usize) -> Self {
        Self::IndexOutOfRange { index, len }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_group_names_the_group() {
        let err = ViewError::unresolved_group(&("fruit", 3), "Items");
        assert_eq!(
            err.to_string(),
            "cannot resolve items from group (\"fruit\", 3) through binding 'Items'"
        );
    }

    #[test]
    fn test_out_of_range_message() {
        let err = ViewError::out_of_range(7, 3);
        assert_eq!(err.to_string(), "index 7 is out of range for length 3");
    }
}
