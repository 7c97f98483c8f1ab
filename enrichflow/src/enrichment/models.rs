//! Product catalog data model.
//!
//! These types describe what the enrichment chain asks a model to produce.
//! Their JSON form is placed in the context as the `category_model` and
//! `product_attribute_value_model` examples, and the `product_json` a model
//! returns is validated against [`Product`].

use serde::{Deserialize, Serialize};

/// A category attribute and the values it may take.
///
/// Not to be confused with [`ProductAttributeValue`], which holds the value
/// one product actually has.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute name, e.g. `Sleeve Length`.
    pub name: String,
    /// What the attribute describes.
    pub description: String,
    /// Allowed values.
    pub value_range: Vec<String>,
}

/// A category and the attributes products in it carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Breadcrumb, e.g. `Clothing > Men's Clothing`.
    pub name: String,
    /// Attributes every product in the category carries.
    pub attributes: Vec<Attribute>,
}

/// The value of one attribute for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductAttributeValue {
    /// Name of the category attribute.
    pub name: String,
    /// The product's value for it.
    pub value: String,
}

/// A product image reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    /// Where the image is stored.
    pub url: String,
    /// Inline image data, usually empty.
    #[serde(default)]
    pub base64: String,
    /// MIME type.
    #[serde(rename = "type")]
    pub kind: String,
}

/// The per-language values of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseProduct {
    /// Locale code, e.g. `US_EN`.
    pub language: String,
    /// Display name.
    pub name: String,
    /// Marketing description.
    pub description: String,
    /// HTML `<head>` fragment for search engines.
    pub seo_html_header: String,
    /// Values for the category attributes.
    pub attribute_values: Vec<ProductAttributeValue>,
}

/// A product with its category, images and related products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Language-specific values.
    pub base: BaseProduct,
    /// The category the product belongs to.
    pub category: Category,
    /// Product images.
    #[serde(default)]
    pub images: Vec<ProductImage>,
    /// Products sold alongside this one.
    #[serde(default)]
    pub related_products: Vec<Product>,
    /// Variants, e.g. other colours or sizes.
    #[serde(default)]
    pub derived_products: Vec<Product>,
}

impl Product {
    /// Parses model output, tolerating markdown code fences.
    ///
    /// # Errors
    ///
    /// Fails if the text is not a JSON product.
    pub fn from_model_output(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(crate::utils::fix_output(text).trim())
    }
}

/// Example category handed to the model as a schema sample.
#[must_use]
pub fn example_category() -> Category {
    Category {
        name: "Clothing > Men's Clothing > Men's Shirts > Dress Shirts".to_string(),
        attributes: vec![
            Attribute {
                name: "Brand".to_string(),
                description: "The manufacturer of the product.".to_string(),
                value_range: vec!["Pronto Uomo".to_string()],
            },
            Attribute {
                name: "Size".to_string(),
                description: "The size of the garment".to_string(),
                value_range: ["S", "M", "L", "XL", "XXL"].map(String::from).to_vec(),
            },
        ],
    }
}

/// Example product handed to the model as a schema sample.
#[must_use]
pub fn example_product() -> Product {
    Product {
        base: BaseProduct {
            language: "US_EN".to_string(),
            name: "Long Sleeve Dress Shirt".to_string(),
            description: "Experience timeless style and modern comfort with the Pronto Uomo \
                          Herringbone Modern Fit Long Sleeve Dress Shirt."
                .to_string(),
            seo_html_header: "<html><head><title></title><meta name=\"description\" content=\"\"></head><body></body></html>"
                .to_string(),
            attribute_values: vec![
                ProductAttributeValue {
                    name: "Brand".to_string(),
                    value: "Pronto Uomo".to_string(),
                },
                ProductAttributeValue {
                    name: "Size".to_string(),
                    value: "M".to_string(),
                },
            ],
        },
        category: example_category(),
        images: Vec::new(),
        related_products: Vec::new(),
        derived_products: Vec::new(),
    }
}
