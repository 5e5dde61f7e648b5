//! Promotion listing: filters, sorting, pagination, and facets.

use serde::{Deserialize, Serialize};

use crate::limits::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use crate::promotion::{ActivationMethod, Promotion, PromotionType};

/// Listing filters. Empty vectors mean "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionFilters {
    pub broker_ids: Vec<String>,
    pub promotion_types: Vec<PromotionType>,
    pub activation_method: Vec<ActivationMethod>,
    pub account_types: Vec<String>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
    pub min_rebate: Option<f64>,
    pub max_rebate: Option<f64>,
}

impl PromotionFilters {
    /// Whether `promotion` passes every filter.
    pub fn matches(&self, promotion: &Promotion) -> bool {
        if !self.broker_ids.is_empty() && !self.broker_ids.contains(&promotion.broker_id) {
            return false;
        }
        if !self.promotion_types.is_empty()
            && !self.promotion_types.contains(&promotion.promotion_type)
        {
            return false;
        }
        if !self.activation_method.is_empty()
            && !self.activation_method.contains(&promotion.activation_method)
        {
            return false;
        }
        if !self.account_types.is_empty()
            && !self
                .account_types
                .iter()
                .any(|t| promotion.accepts_account_type(t))
        {
            return false;
        }
        if self.is_active.is_some_and(|active| promotion.is_active != active) {
            return false;
        }
        if self
            .is_featured
            .is_some_and(|featured| promotion.is_featured != featured)
        {
            return false;
        }
        if self.min_rebate.is_some() || self.max_rebate.is_some() {
            let Some(best) = promotion.max_rate_value() else {
                return false;
            };
            if self.min_rebate.is_some_and(|min| best < min) {
                return false;
            }
            if self.max_rebate.is_some_and(|max| best > max) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Rating,
    RebateAmount,
    Popularity,
    Newest,
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "rating" => Some(Self::Rating),
            "rebate_amount" => Some(Self::RebateAmount),
            "popularity" => Some(Self::Popularity),
            "newest" => Some(Self::Newest),
            "created_at" => Some(Self::CreatedAt),
            "updated_at" => Some(Self::UpdatedAt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromotionSort {
    pub field: SortField,
    pub order: SortOrder,
}

impl PromotionSort {
    /// Stable sort of `promotions` in place.
    pub fn apply(&self, promotions: &mut [Promotion]) {
        promotions.sort_by(|a, b| {
            let ordering = match self.field {
                SortField::Rating => rating(a).total_cmp(&rating(b)),
                SortField::RebateAmount => best_rate(a).total_cmp(&best_rate(b)),
                SortField::Popularity => a.is_popular.cmp(&b.is_popular),
                SortField::Newest | SortField::CreatedAt => a.created_at.cmp(&b.created_at),
                SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            };
            match self.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });
    }
}

fn rating(p: &Promotion) -> f64 {
    p.broker.as_ref().map_or(0.0, |b| b.rating)
}

fn best_rate(p: &Promotion) -> f64 {
    p.max_rate_value().unwrap_or(0.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: usize,
    pub limit: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

impl Pagination {
    pub fn new(page: usize, limit: usize) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_PAGE_LIMIT),
        }
    }

    /// Items skipped before this page. Saturates for absurd page numbers.
    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.limit)
    }
}

/// A fully parsed listing request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromotionQuery {
    pub filters: PromotionFilters,
    pub sort: Option<PromotionSort>,
    pub pagination: Pagination,
}

impl PromotionQuery {
    /// Build a query from decoded query-string pairs.
    ///
    /// Keys may repeat and may carry a `[]` suffix; list values may also be
    /// comma separated. Unknown enum values, unknown sort fields, and
    /// malformed numbers are dropped rather than rejected.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut query = Self::default();
        let mut sort_by = None;
        let mut sort_order = SortOrder::Desc;
        let mut page = None;
        let mut limit = None;

        for (key, value) in pairs {
            let key = key.as_ref().trim_end_matches("[]");
            let value = value.as_ref();
            let filters = &mut query.filters;

            match key {
                "brokerIds" => filters.broker_ids.extend(split_list(value)),
                "promotionTypes" => filters
                    .promotion_types
                    .extend(split_list(value).filter_map(|v| v.parse::<PromotionType>().ok())),
                "activationMethod" => filters
                    .activation_method
                    .extend(split_list(value).filter_map(|v| v.parse::<ActivationMethod>().ok())),
                "accountTypes" => filters.account_types.extend(split_list(value)),
                "isActive" => filters.is_active = Some(value == "true"),
                "isFeatured" => filters.is_featured = Some(value == "true"),
                "minRebate" => filters.min_rebate = parse_non_negative(value),
                "maxRebate" => filters.max_rebate = parse_non_negative(value),
                "sortBy" => sort_by = SortField::parse(value),
                "sortOrder" => {
                    sort_order = if value == "asc" {
                        SortOrder::Asc
                    } else {
                        SortOrder::Desc
                    }
                }
                "page" => page = value.parse::<usize>().ok().filter(|p| *p > 0),
                "limit" => limit = value.parse::<usize>().ok().filter(|l| *l > 0),
                _ => {}
            }
        }

        query.sort = sort_by.map(|field| PromotionSort {
            field,
            order: sort_order,
        });
        query.pagination = Pagination::new(
            page.unwrap_or(1),
            limit.unwrap_or(DEFAULT_PAGE_LIMIT),
        );
        query
    }
}

fn split_list(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_non_negative(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerFacet {
    pub id: String,
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromotionTypeFacet {
    #[serde(rename = "type")]
    pub promotion_type: PromotionType,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationMethodFacet {
    pub method: ActivationMethod,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebateRangeFacet {
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

/// Facet counts over active promotions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableFilters {
    pub brokers: Vec<BrokerFacet>,
    pub promotion_types: Vec<PromotionTypeFacet>,
    pub activation_methods: Vec<ActivationMethodFacet>,
    pub rebate_ranges: Vec<RebateRangeFacet>,
}

/// Rebate range buckets shown in the filter sidebar.
const REBATE_RANGES: [(f64, f64); 4] = [(0.0, 5.0), (5.0, 15.0), (15.0, 50.0), (50.0, 999_999.0)];

impl AvailableFilters {
    /// Count facets over the active promotions in `promotions`.
    pub fn from_promotions<'a>(promotions: impl IntoIterator<Item = &'a Promotion>) -> Self {
        let mut facets = Self {
            rebate_ranges: REBATE_RANGES
                .iter()
                .map(|&(min, max)| RebateRangeFacet { min, max, count: 0 })
                .collect(),
            ..Self::default()
        };

        for p in promotions.into_iter().filter(|p| p.is_active) {
            if let Some(broker) = &p.broker {
                match facets.brokers.iter_mut().find(|b| b.id == p.broker_id) {
                    Some(facet) => facet.count += 1,
                    None => facets.brokers.push(BrokerFacet {
                        id: p.broker_id.clone(),
                        name: broker.name.clone(),
                        count: 1,
                    }),
                }
            }

            match facets
                .promotion_types
                .iter_mut()
                .find(|f| f.promotion_type == p.promotion_type)
            {
                Some(facet) => facet.count += 1,
                None => facets.promotion_types.push(PromotionTypeFacet {
                    promotion_type: p.promotion_type,
                    count: 1,
                }),
            }

            match facets
                .activation_methods
                .iter_mut()
                .find(|f| f.method == p.activation_method)
            {
                Some(facet) => facet.count += 1,
                None => facets.activation_methods.push(ActivationMethodFacet {
                    method: p.activation_method,
                    count: 1,
                }),
            }

            if let Some(best) = p.max_rate_value() {
                if let Some(range) = facets
                    .rebate_ranges
                    .iter_mut()
                    .find(|r| best >= r.min && best < r.max)
                {
                    range.count += 1;
                }
            }
        }

        facets
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page: usize,
    pub limit: usize,
    pub total_pages: usize,
}

/// One page of listing results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionPage {
    pub promotions: Vec<Promotion>,
    pub total_count: usize,
    pub has_more: bool,
    pub filters: AvailableFilters,
    pub pagination: PageInfo,
}

impl PromotionPage {
    /// Filter, sort, and paginate `all` according to `query`.
    pub fn build(all: &[Promotion], query: &PromotionQuery) -> Self {
        let mut matching: Vec<Promotion> = all
            .iter()
            .filter(|p| query.filters.matches(p))
            .cloned()
            .collect();

        if let Some(sort) = &query.sort {
            sort.apply(&mut matching);
        }

        let total_count = matching.len();
        let Pagination { page, limit } = query.pagination;
        let offset = query.pagination.offset();

        let promotions: Vec<Promotion> = matching.into_iter().skip(offset).take(limit).collect();

        Self {
            promotions,
            total_count,
            has_more: offset.saturating_add(limit) < total_count,
            filters: AvailableFilters::from_promotions(all),
            pagination: PageInfo {
                page,
                limit,
                total_pages: total_count.div_ceil(limit),
            },
        }
    }
}
