//! Models shipped with the crate.

use super::schema::{FieldSpec, FieldType, ModelSpec, Requirement};

/// Maximum length of a listing's free-text summary.
pub const TEXT_MAX_LEN: usize = 150;

const DEALS: [&str; 2] = ["rent", "sale"];

/// Generic listing. Catches `listing` and any `listing/...` not claimed by a
/// more specific model.
pub fn listing() -> ModelSpec {
    ModelSpec::new("listing")
        .matches("listing")
        .matches("listing/*")
        .field(FieldSpec::optional("url", FieldType::Url))
        .field(FieldSpec::optional("listing_id", FieldType::text()))
        .field(FieldSpec::required("text", FieldType::Text { max_len: Some(TEXT_MAX_LEN) }))
        .field(FieldSpec::optional("price", FieldType::Price))
        .field(FieldSpec::optional("location", FieldType::text()))
        .field(FieldSpec::optional("deal", FieldType::category(DEALS)))
        .field(FieldSpec::optional("published", FieldType::Date))
        .key(["url", "listing_id"])
}

pub fn apartment() -> ModelSpec {
    ModelSpec::new("apartment")
        .matches("apartment")
        .matches("listing/apartment*")
        .field(FieldSpec::optional("url", FieldType::Url))
        .field(FieldSpec::optional("listing_id", FieldType::text()))
        .field(FieldSpec::optional("title", FieldType::Text { max_len: Some(TEXT_MAX_LEN) }))
        .field(FieldSpec::optional("price", FieldType::Price))
        .field(FieldSpec::required("bedrooms", FieldType::Integer))
        .field(FieldSpec::optional("bathrooms", FieldType::Decimal))
        .field(FieldSpec::optional("area", FieldType::Decimal))
        .field(FieldSpec::optional("floor", FieldType::Integer))
        .field(FieldSpec::optional("furnished", FieldType::Boolean))
        .field(FieldSpec::optional("available_from", FieldType::Date))
        .field(FieldSpec::optional("deal", FieldType::category(DEALS)))
        .key(["url", "listing_id"])
}

pub fn house() -> ModelSpec {
    ModelSpec::new("house")
        .matches("house")
        .matches("listing/house*")
        .field(FieldSpec::optional("url", FieldType::Url))
        .field(FieldSpec::optional("listing_id", FieldType::text()))
        .field(FieldSpec::optional("title", FieldType::Text { max_len: Some(TEXT_MAX_LEN) }))
        .field(FieldSpec::optional("price", FieldType::Price))
        .field(FieldSpec::required("bedrooms", FieldType::Integer))
        .field(FieldSpec::optional("bathrooms", FieldType::Decimal))
        .field(FieldSpec::optional("area", FieldType::Decimal))
        .field(FieldSpec::optional("plot_area", FieldType::Decimal))
        .field(FieldSpec::optional("garage", FieldType::Boolean))
        .field(FieldSpec::optional("deal", FieldType::category(DEALS)))
        .key(["url", "listing_id"])
}

/// A node of the crawl source tree: a page that links to listings or to
/// further source pages. Only the root (level 0) may omit its parent.
pub fn source() -> ModelSpec {
    ModelSpec::new("source")
        .matches("source")
        .matches("source/*")
        .field(FieldSpec::required("url", FieldType::Url))
        .field(FieldSpec::optional("parent_url", FieldType::Url))
        .field(FieldSpec::optional("level", FieldType::Integer))
        .requires(Requirement::when_above("parent_url", "level", 0))
        .key(["url"])
}

/// All built-in models.
pub fn all() -> Vec<ModelSpec> {
    vec![listing(), apartment(), house(), source()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_are_valid() {
        for spec in all() {
            assert!(spec.validate().is_ok(), "{} is invalid", spec.kind);
        }
    }

    #[test]
    fn test_builtin_price_fields() {
        assert_eq!(apartment().resolved_price_field(), Some("price"));
        assert_eq!(source().resolved_price_field(), None);
    }

    #[test]
    fn test_source_requires_parent_below_root() {
        assert_eq!(source().requires, vec![Requirement::when_above("parent_url", "level", 0)]);
    }

    #[test]
    fn test_bedrooms_required() {
        for spec in [apartment(), house()] {
            assert!(spec.get_field("bedrooms").unwrap().required);
        }
    }
}
