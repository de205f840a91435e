// Content category taxonomy used by Google Natural Language.
//
// Only the commonly targeted slice is listed here (top level plus the travel
// and business branches); the full taxonomy lives at
// https://cloud.google.com/natural-language/docs/categories

use std::collections::BTreeSet;

pub const TOP_LEVEL_CATEGORIES: &[&str] = &[
    "/Arts & Entertainment",
    "/Autos & Vehicles",
    "/Beauty & Fitness",
    "/Books & Literature",
    "/Business & Industrial",
    "/Computers & Electronics",
    "/Finance",
    "/Food & Drink",
    "/Games",
    "/Health",
    "/Hobbies & Leisure",
    "/Home & Garden",
    "/Internet & Telecom",
    "/Jobs & Education",
    "/Law & Government",
    "/News",
    "/Online Communities",
    "/People & Society",
    "/Pets & Animals",
    "/Real Estate",
    "/Reference",
    "/Science",
    "/Shopping",
    "/Sports",
    "/Travel",
];

pub const TRAVEL_CATEGORIES: &[&str] = &[
    "/Travel",
    "/Travel/Air Travel",
    "/Travel/Bed & Breakfasts",
    "/Travel/Bus & Rail",
    "/Travel/Camping",
    "/Travel/Car Rental & Taxi Services",
    "/Travel/Cruises & Charters",
    "/Travel/Hotels & Accommodations",
    "/Travel/Luggage & Travel Accessories",
    "/Travel/Rail Travel",
    "/Travel/Rental Cars",
    "/Travel/Road Travel",
    "/Travel/Specialty Travel",
    "/Travel/Specialty Travel/Ecotourism",
    "/Travel/Theme Parks",
    "/Travel/Tourist Destinations",
    "/Travel/Tourist Destinations/Beaches & Islands",
    "/Travel/Tourist Destinations/Mountain & Ski Resorts",
    "/Travel/Tourist Destinations/Regional Parks & Gardens",
    "/Travel/Tourist Destinations/Theme Parks",
    "/Travel/Travel Agencies & Services",
    "/Travel/Travel Guides & Travelogues",
    "/Travel/Transports",
];

pub const BUSINESS_CATEGORIES: &[&str] = &[
    "/Business & Industrial",
    "/Business & Industrial/Advertising & Marketing",
    "/Business & Industrial/Business Services",
    "/Business & Industrial/Hospitality Industry",
];

/// Every listed category, sorted and de-duplicated.
pub fn all_categories() -> Vec<&'static str> {
    TOP_LEVEL_CATEGORIES
        .iter()
        .chain(TRAVEL_CATEGORIES)
        .chain(BUSINESS_CATEGORIES)
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Categories whose path contains `filter`, case-insensitively.
pub fn search_categories(filter: &str) -> Vec<&'static str> {
    let needle = filter.to_lowercase();
    all_categories()
        .into_iter()
        .filter(|c| c.to_lowercase().contains(&needle))
        .collect()
}

/// Indent a category path by depth for tree-style display.
///
/// "/Travel/Air Travel" → "  • Air Travel"
pub fn format_category_hierarchy(category: &str) -> String {
    let trimmed = category.trim_matches('/');
    if trimmed.is_empty() {
        return String::new();
    }

    let parts: Vec<&str> = trimmed.split('/').collect();
    let indent = "  ".repeat(parts.len() - 1);
    format!("{indent}• {}", parts[parts.len() - 1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_categories_sorted_unique() {
        let all = all_categories();
        assert_eq!(all.iter().filter(|c| **c == "/Travel").count(), 1);
        assert!(all.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(all.len(), 25 + 22 + 3);
    }

    #[test]
    fn test_search_categories() {
        let found = search_categories("theme parks");
        assert_eq!(
            found,
            vec!["/Travel/Theme Parks", "/Travel/Tourist Destinations/Theme Parks"]
        );
    }

    #[test]
    fn test_format_category_hierarchy() {
        assert_eq!(format_category_hierarchy("/Travel"), "• Travel");
        assert_eq!(
            format_category_hierarchy("/Travel/Specialty Travel/Ecotourism"),
            "    • Ecotourism"
        );
        assert_eq!(format_category_hierarchy(""), "");
    }
}
