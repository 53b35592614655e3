use serde::{Deserialize, Serialize};

use crate::utils::format_price;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub product_code: String,
    pub category: String,
    #[serde(default)]
    pub image: String,
    pub price: f64,
    pub quantity: i32,
    #[serde(default)]
    pub discount_rate: f64,
    #[serde(default)]
    pub created_by: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl Product {
    pub fn display_price(&self) -> String {
        format_price(self.price, self.discount_rate)
    }

    pub fn in_stock(&self) -> bool {
        self.quantity > 0
    }
}

/// Body for creating or updating a product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ProductInput {
    pub name: String,
    pub product_code: String,
    pub category: String,
    pub image: String,
    pub price: f64,
    pub quantity: i32,
    pub discount_rate: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct PaginatedProducts {
    pub products: Vec<Product>,
    pub total_count: i64,
    pub current_page: i64,
    pub total_pages: i64,
    pub page_size: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteResponse {
    pub message: String,
    pub deleted_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProductSortColumn {
    Name,
    Price,
    CreatedDate,
}

impl ProductSortColumn {
    pub fn as_param(self) -> &'static str {
        match self {
            ProductSortColumn::Name => "name",
            ProductSortColumn::Price => "price",
            ProductSortColumn::CreatedDate => "createdDate",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_param(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Optional listing filters, sent as query parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductFilters {
    pub category: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub search_term: Option<String>,
    pub sort_by: Option<ProductSortColumn>,
    pub sort_direction: Option<SortDirection>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl ProductFilters {
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(ref category) = self.category {
            if !category.is_empty() {
                params.push(("category".to_string(), category.clone()));
            }
        }
        if let Some(min) = self.min_price {
            params.push(("minPrice".to_string(), min.to_string()));
        }
        if let Some(max) = self.max_price {
            params.push(("maxPrice".to_string(), max.to_string()));
        }
        if let Some(ref term) = self.search_term {
            if !term.is_empty() {
                params.push(("searchTerm".to_string(), term.clone()));
            }
        }
        if let Some(sort_by) = self.sort_by {
            params.push(("sortBy".to_string(), sort_by.as_param().to_string()));
        }
        if let Some(direction) = self.sort_direction {
            params.push(("sortDirection".to_string(), direction.as_param().to_string()));
        }
        if let Some(page) = self.page {
            params.push(("page".to_string(), page.to_string()));
        }
        if let Some(page_size) = self.page_size {
            params.push(("pageSize".to_string(), page_size.to_string()));
        }
        params
    }
}
