pub const DEFAULT_PAGE_SIZE: i64 = 6;
pub const MAX_PAGE_SIZE: i64 = 100;
pub const SUBSCRIPTION_COUNT_PER_PAGE: i64 = 10;

pub const RECIPE_NAME_MAX_LENGTH: usize = 200;
pub const TAG_SLUG_MAX_LENGTH: usize = 100;
pub const CATALOG_FIELD_MAX_LENGTH: usize = 200;

pub const SHOPPING_LIST_FILENAME: &str = "wishlist.txt";
pub const SHOPPING_LIST_FOOTER: &str = "foodgram";

pub const DEFAULT_SESSION_HOURS: i64 = 24;
