mod follows;
mod ingredients;
mod recipes;
mod relations;
mod shopping_cart;
mod tags;
mod users;

pub use follows::*;
pub use ingredients::*;
pub use recipes::*;
pub use relations::*;
pub use shopping_cart::*;
pub use tags::*;
pub use users::*;

/// `ILIKE` pattern matching `value` anywhere, with wildcards in `value` escaped.
pub(crate) fn contains_pattern(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");

    format!("%{escaped}%")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(contains_pattern("flour"), "%flour%");
        assert_eq!(contains_pattern("100%_rye"), "%100\\%\\_rye%");
    }
}
