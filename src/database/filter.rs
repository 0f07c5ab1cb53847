use super::{error::TypeError, pagination::PageQuery, schema::Id};

/// Recipe list filters as sent on the query string. `tags` may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub tags: Vec<String>,
    pub author: Option<Id>,
    pub name: Option<String>,
    pub is_favorited: Option<bool>,
    pub is_in_shopping_cart: Option<bool>,
}

impl RecipeFilter {
    /// Builds the filter and page window from raw `key=value` pairs.
    pub fn from_pairs(pairs: &[(String, String)]) -> Result<(Self, PageQuery), TypeError> {
        let mut filter = Self::default();
        let mut page = PageQuery::default();

        for (key, value) in pairs {
            match key.as_str() {
                "tags" => filter.tags.push(value.to_owned()),
                "author" => filter.author = Some(parse_number(key, value)?),
                "name" if !value.trim().is_empty() => {
                    filter.name = Some(value.trim().to_string())
                }
                "is_favorited" => filter.is_favorited = Some(parse_flag(key, value)?),
                "is_in_shopping_cart" => {
                    filter.is_in_shopping_cart = Some(parse_flag(key, value)?)
                }
                "page" => page.page = Some(parse_number(key, value)?),
                "limit" => page.limit = Some(parse_number(key, value)?),
                _ => {}
            }
        }

        Ok((filter, page))
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, TypeError> {
    value
        .parse()
        .map_err(|_| TypeError::new(&format!("Invalid value for '{key}'")))
}

fn parse_flag(key: &str, value: &str) -> Result<bool, TypeError> {
    match value.to_lowercase().as_str() {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        _ => Err(TypeError::new(&format!("Invalid value for '{key}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parses_repeated_tags_and_flags() {
        let (filter, page) = RecipeFilter::from_pairs(&pairs(&[
            ("tags", "breakfast"),
            ("tags", "dinner"),
            ("author", "7"),
            ("is_favorited", "1"),
            ("is_in_shopping_cart", "false"),
            ("name", " flour "),
            ("page", "2"),
            ("limit", "3"),
        ]))
        .unwrap();

        assert_eq!(
            filter,
            RecipeFilter {
                tags: vec![String::from("breakfast"), String::from("dinner")],
                author: Some(7),
                name: Some(String::from("flour")),
                is_favorited: Some(true),
                is_in_shopping_cart: Some(false),
            }
        );
        assert_eq!(page, PageQuery::new(2, 3));
    }

    #[test]
    fn unknown_keys_and_blank_name_are_ignored() {
        let (filter, page) =
            RecipeFilter::from_pairs(&pairs(&[("name", "  "), ("ordering", "-id")])).unwrap();
        assert_eq!(filter, RecipeFilter::default());
        assert_eq!(page, PageQuery::default());
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert!(RecipeFilter::from_pairs(&pairs(&[("author", "me")])).is_err());
        assert!(RecipeFilter::from_pairs(&pairs(&[("is_favorited", "yes")])).is_err());
        assert!(RecipeFilter::from_pairs(&pairs(&[("page", "x")])).is_err());
    }
}
