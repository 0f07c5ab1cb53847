use std::collections::HashSet;

use serde::Deserialize;

use super::{error::ValidationError, schema::Id};
use crate::constants::{CATALOG_FIELD_MAX_LENGTH, RECIPE_NAME_MAX_LENGTH, TAG_SLUG_MAX_LENGTH};

const REQUIRED: &str = "This field is required.";
const MIN_ONE: &str = "Ensure this value is greater than or equal to 1.";
const BLANK: &str = "This field may not be blank.";

/// Catalog columns are `VARCHAR(200)`.
fn check_catalog_field(errors: &mut ValidationError, field: &str, value: &str, required: bool) {
    let value = value.trim();
    if required && value.is_empty() {
        errors.add(field, BLANK);
    } else if value.chars().count() > CATALOG_FIELD_MAX_LENGTH {
        errors.add(
            field,
            &format!("Ensure this field has no more than {CATALOG_FIELD_MAX_LENGTH} characters."),
        );
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngredientAmount {
    pub id: Id,
    pub amount: i32,
}

/// Recipe write payload. Every field is optional so the same form serves
/// `POST`, `PUT` and `PATCH`; [`RecipeForm::validate`] decides what is required.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct RecipeForm {
    pub ingredients: Option<Vec<IngredientAmount>>,
    pub tags: Option<Vec<Id>>,
    pub image: Option<String>,
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
}

/// Validated recipe fields. `None` means "leave unchanged" on update.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeChanges {
    pub ingredients: Option<Vec<IngredientAmount>>,
    pub tags: Option<Vec<Id>>,
    pub image: Option<String>,
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
}

impl RecipeForm {
    pub fn validate(self, partial: bool) -> Result<RecipeChanges, ValidationError> {
        let mut errors = ValidationError::new();

        let name = self.name.map(|name| name.trim().to_string());
        match &name {
            Some(name) if name.is_empty() => errors.add("name", BLANK),
            Some(name) if name.chars().count() > RECIPE_NAME_MAX_LENGTH => errors.add(
                "name",
                &format!("Ensure this field has no more than {RECIPE_NAME_MAX_LENGTH} characters."),
            ),
            None if !partial => errors.add("name", REQUIRED),
            _ => {}
        }

        match &self.text {
            Some(text) if text.trim().is_empty() => {
                errors.add("text", BLANK)
            }
            None if !partial => errors.add("text", REQUIRED),
            _ => {}
        }

        match self.cooking_time {
            Some(time) if time < 1 => errors.add("cooking_time", MIN_ONE),
            None if !partial => errors.add("cooking_time", REQUIRED),
            _ => {}
        }

        match &self.ingredients {
            Some(ingredients) => validate_ingredients(ingredients, &mut errors),
            None if !partial => errors.add("ingredients", REQUIRED),
            None => {}
        }

        let tags = self.tags.map(|tags| {
            let mut seen = HashSet::new();
            tags.into_iter()
                .filter(|id| seen.insert(*id))
                .collect::<Vec<Id>>()
        });

        errors.into_result()?;

        Ok(RecipeChanges {
            ingredients: self.ingredients,
            tags: if partial { tags } else { tags.or(Some(vec![])) },
            image: self.image,
            name,
            text: self.text,
            cooking_time: self.cooking_time,
        })
    }
}

fn validate_ingredients(ingredients: &[IngredientAmount], errors: &mut ValidationError) {
    if ingredients.is_empty() {
        errors.add("ingredients", "Add at least one ingredient.");
        return;
    }

    let mut seen = HashSet::new();
    for ingredient in ingredients {
        if ingredient.amount < 1 {
            errors.add("amount", MIN_ONE);
        }
        if !seen.insert(ingredient.id) {
            errors.add(
                "ingredients",
                &format!("Ingredient {} is listed more than once.", ingredient.id),
            );
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct RegisterForm {
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub password: String,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::new();

        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') || email.len() > 254 {
            errors.add("email", "Enter a valid email address.");
        }

        let username = self.username.trim();
        if username.is_empty() || username.len() > 150 {
            errors.add("username", "Enter a valid username.");
        } else if !username
            .chars()
            .all(|c| c.is_alphanumeric() || "@.+-_".contains(c))
        {
            errors.add(
                "username",
                "Username may contain only letters, digits and @/./+/-/_ characters.",
            );
        }

        if self.first_name.len() > 150 {
            errors.add("first_name", "Ensure this field has no more than 150 characters.");
        }
        if self.last_name.len() > 150 {
            errors.add("last_name", "Ensure this field has no more than 150 characters.");
        }

        if self.password.chars().count() < 8 {
            errors.add("password", "This password is too short.");
        }

        errors.into_result()
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct TagForm {
    pub name: String,
    #[serde(default)]
    pub color: String,
    pub slug: Option<String>,
}

impl TagForm {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::new();
        check_catalog_field(&mut errors, "name", &self.name, true);
        check_catalog_field(&mut errors, "color", &self.color, false);

        let slug = self.slug();
        if slug.is_empty() {
            errors.add("slug", "Enter a valid slug.");
        } else {
            check_catalog_field(&mut errors, "slug", &slug, true);
        }
        errors.into_result()
    }

    /// Explicit slug, or one derived from the name.
    pub fn slug(&self) -> String {
        match self.slug.as_deref().map(str::trim) {
            Some(slug) if !slug.is_empty() => slug.to_string(),
            _ => slug::slugify(&self.name)
                .chars()
                .take(TAG_SLUG_MAX_LENGTH)
                .collect(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct IngredientForm {
    pub name: String,
    pub measurement_unit: String,
}

impl IngredientForm {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::new();
        check_catalog_field(&mut errors, "name", &self.name, true);
        check_catalog_field(&mut errors, "measurement_unit", &self.measurement_unit, true);
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn recipe(cooking_time: i32, amount: i32) -> RecipeForm {
        RecipeForm {
            ingredients: Some(vec![IngredientAmount { id: 1, amount }]),
            tags: Some(vec![1]),
            image: None,
            name: Some(String::from("Pancakes")),
            text: Some(String::from("Mix and fry.")),
            cooking_time: Some(cooking_time),
        }
    }

    #[test]
    fn boundary_values_are_accepted() {
        let changes = recipe(1, 1).validate(false).unwrap();
        assert_eq!(changes.cooking_time, Some(1));
        assert_eq!(
            changes.ingredients,
            Some(vec![IngredientAmount { id: 1, amount: 1 }])
        );
    }

    #[test]
    fn zero_cooking_time_is_rejected() {
        let errors = recipe(0, 1).validate(false).unwrap_err();
        assert_eq!(errors.messages("cooking_time"), [MIN_ONE]);
    }

    #[test]
    fn zero_amount_is_rejected() {
        let errors = recipe(10, 0).validate(false).unwrap_err();
        assert_eq!(errors.messages("amount"), [MIN_ONE]);
    }

    #[test]
    fn create_requires_every_field() {
        let errors = RecipeForm::default().validate(false).unwrap_err();
        for field in ["name", "text", "cooking_time", "ingredients"] {
            assert_eq!(errors.messages(field), [REQUIRED], "{field}");
        }
    }

    #[test]
    fn partial_update_keeps_omitted_fields_unset() {
        let form = RecipeForm {
            cooking_time: Some(5),
            ..Default::default()
        };
        let changes = form.validate(true).unwrap();
        assert_eq!(
            changes,
            RecipeChanges {
                cooking_time: Some(5),
                ..Default::default()
            }
        );
    }

    #[test]
    fn duplicate_ingredients_and_empty_list_are_rejected() {
        let mut form = recipe(10, 2);
        form.ingredients = Some(vec![
            IngredientAmount { id: 3, amount: 1 },
            IngredientAmount { id: 3, amount: 2 },
        ]);
        let errors = form.validate(false).unwrap_err();
        assert_eq!(errors.messages("ingredients").len(), 1);

        let mut form = recipe(10, 2);
        form.ingredients = Some(vec![]);
        assert!(form.validate(false).is_err());
    }

    #[test]
    fn tags_are_deduplicated_and_default_to_empty() {
        let mut form = recipe(10, 2);
        form.tags = Some(vec![2, 1, 2]);
        assert_eq!(form.validate(false).unwrap().tags, Some(vec![2, 1]));

        let mut form = recipe(10, 2);
        form.tags = None;
        assert_eq!(form.validate(false).unwrap().tags, Some(vec![]));
    }

    #[test]
    fn tag_slug_is_derived_from_name() {
        let form = TagForm {
            name: String::from("Breakfast Ideas"),
            color: String::from("#E26C2D"),
            slug: None,
        };
        assert_eq!(form.slug(), "breakfast-ideas");

        let form = TagForm {
            slug: Some(String::from("morning")),
            ..form
        };
        assert_eq!(form.slug(), "morning");
    }

    #[test]
    fn catalog_fields_fit_their_columns() {
        let long = "x".repeat(CATALOG_FIELD_MAX_LENGTH + 1);

        let form = TagForm {
            name: long.clone(),
            color: long.clone(),
            slug: Some(long.clone()),
        };
        let errors = form.validate().unwrap_err();
        for field in ["name", "color", "slug"] {
            assert_eq!(errors.messages(field).len(), 1, "{field}");
        }

        // A derived slug is cut short, so only the name is too long.
        let form = TagForm {
            name: long.clone(),
            color: String::new(),
            slug: None,
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.messages("slug").is_empty());
        assert_eq!(errors.messages("name").len(), 1);

        let form = IngredientForm {
            name: "x".repeat(CATALOG_FIELD_MAX_LENGTH),
            measurement_unit: long,
        };
        let errors = form.validate().unwrap_err();
        assert!(errors.messages("name").is_empty());
        assert_eq!(errors.messages("measurement_unit").len(), 1);

        let form = IngredientForm {
            name: String::from(" "),
            measurement_unit: String::from("g"),
        };
        assert_eq!(form.validate().unwrap_err().messages("name"), [BLANK]);
    }

    #[test]
    fn register_form_checks_fields() {
        let form = RegisterForm {
            email: String::from("not-an-email"),
            username: String::from("bad name"),
            first_name: String::new(),
            last_name: String::new(),
            password: String::from("short"),
        };
        let errors = form.validate().unwrap_err();
        assert!(!errors.messages("email").is_empty());
        assert!(!errors.messages("username").is_empty());
        assert!(!errors.messages("password").is_empty());
    }
}
