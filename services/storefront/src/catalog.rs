//! Product catalog: listing, filtering, search and sections

use common::ListQuery;
use serde::{Deserialize, Serialize};

use crate::{
    error::{ShopError, ShopResult},
    models::{Category, Product},
    repositories::ProductRepository,
};

/// Number of products in each home page strip
pub const STRIP_SIZE: usize = 4;

/// A price bucket; `max` is inclusive and `None` means unbounded
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceRange {
    pub label: &'static str,
    pub min: f64,
    pub max: Option<f64>,
}

impl PriceRange {
    pub fn contains(&self, price: f64) -> bool {
        price >= self.min && self.max.is_none_or(|max| price <= max)
    }

    /// Look up a range by label; a trailing `+` is optional since an
    /// unescaped one arrives as a space in query strings
    pub fn by_label(label: &str) -> Option<PriceRange> {
        let wanted = label.trim().trim_end_matches('+');
        PRICE_RANGES
            .iter()
            .copied()
            .find(|range| range.label.trim_end_matches('+') == wanted)
    }
}

pub const PRICE_RANGES: [PriceRange; 4] = [
    PriceRange {
        label: "0-999",
        min: 0.0,
        max: Some(999.0),
    },
    PriceRange {
        label: "1000-1999",
        min: 1000.0,
        max: Some(1999.0),
    },
    PriceRange {
        label: "2000-2999",
        min: 2000.0,
        max: Some(2999.0),
    },
    PriceRange {
        label: "3000+",
        min: 3000.0,
        max: None,
    },
];

/// Selected filters; empty selections match everything
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogFilter {
    pub search: String,
    pub categories: Vec<Category>,
    pub price_ranges: Vec<PriceRange>,
}

impl CatalogFilter {
    pub fn matches(&self, product: &Product) -> bool {
        let price_ok = self.price_ranges.is_empty()
            || self
                .price_ranges
                .iter()
                .any(|range| range.contains(product.price));

        let category_ok =
            self.categories.is_empty() || self.categories.contains(&product.category);

        let term = self.search.trim().to_lowercase();
        let search_ok = term.is_empty() || product.name.to_lowercase().contains(&term);

        price_ok && category_ok && search_ok
    }

    pub fn apply(&self, products: Vec<Product>) -> Vec<Product> {
        products
            .into_iter()
            .filter(|product| self.matches(product))
            .collect()
    }
}

/// Query string accepted by the product listing
///
/// `category` and `price` take comma-separated values, e.g.
/// `?category=Men,Women&price=0-999,3000%2B&search=hoodie`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub price: Option<String>,
}

impl TryFrom<CatalogQuery> for CatalogFilter {
    type Error = ShopError;

    fn try_from(query: CatalogQuery) -> Result<Self, Self::Error> {
        let categories = split_list(query.category.as_deref())
            .map(|value| {
                Category::parse(value)
                    .ok_or_else(|| ShopError::Validation(format!("Unknown category: {}", value)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let price_ranges = split_list(query.price.as_deref())
            .map(|value| {
                PriceRange::by_label(value)
                    .ok_or_else(|| ShopError::Validation(format!("Unknown price range: {}", value)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CatalogFilter {
            search: query.search.unwrap_or_default(),
            categories,
            price_ranges,
        })
    }
}

fn split_list(raw: Option<&str>) -> impl Iterator<Item = &str> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Products of one category, in catalog order
#[derive(Debug, Clone, Serialize)]
pub struct CatalogSection {
    pub category: Category,
    pub products: Vec<Product>,
}

/// Split products into one section per category, in [`Category::ALL`] order
pub fn group_by_category(products: &[Product]) -> Vec<CatalogSection> {
    Category::ALL
        .into_iter()
        .map(|category| CatalogSection {
            category,
            products: products
                .iter()
                .filter(|product| product.category == category)
                .cloned()
                .collect(),
        })
        .collect()
}

/// Filtered listing with its sections
#[derive(Debug, Clone, Serialize)]
pub struct CatalogPage {
    pub total: usize,
    pub products: Vec<Product>,
    pub sections: Vec<CatalogSection>,
}

/// Read side of the product catalog
#[derive(Clone)]
pub struct CatalogService {
    products: ProductRepository,
}

impl CatalogService {
    pub fn new(products: ProductRepository) -> Self {
        Self { products }
    }

    pub async fn search(&self, filter: &CatalogFilter) -> ShopResult<CatalogPage> {
        let products = filter.apply(self.products.get_all(&ListQuery::new()).await?);
        Ok(CatalogPage {
            total: products.len(),
            sections: group_by_category(&products),
            products,
        })
    }

    pub async fn product(&self, id: &str) -> ShopResult<Product> {
        self.products
            .find_by_id(id)
            .await?
            .ok_or_else(|| ShopError::NotFound(format!("Product {}", id)))
    }

    /// First strip on the home page
    pub async fn featured(&self) -> ShopResult<Vec<Product>> {
        Ok(self
            .products
            .get_all(&ListQuery::new().limit(STRIP_SIZE))
            .await?)
    }

    /// The strip right after the featured one
    pub async fn new_arrivals(&self) -> ShopResult<Vec<Product>> {
        Ok(self
            .products
            .get_all(&ListQuery::new().start(STRIP_SIZE).limit(STRIP_SIZE))
            .await?)
    }
}
