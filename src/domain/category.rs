/// Category an expense falls back to when nothing better is known or
/// suggested. The resolver and reports work with any category string; this
/// taxonomy only drives suggestion and display grouping.
pub const DEFAULT_CATEGORY: &str = "Other";

pub const CATEGORIES: &[&str] = &[
    "Rent",
    "Groceries",
    "Utilities",
    "Dining",
    "Travel",
    "Entertainment",
    DEFAULT_CATEGORY,
];

// Keyword table for local category suggestion. No network involved: the
// answer is only a hint, and callers are free to ignore it.
const KEYWORDS: &[(&str, &str)] = &[
    ("rent", "Rent"),
    ("lease", "Rent"),
    ("landlord", "Rent"),
    ("grocer", "Groceries"),
    ("supermarket", "Groceries"),
    ("market", "Groceries"),
    ("electric", "Utilities"),
    ("water bill", "Utilities"),
    ("internet", "Utilities"),
    ("gas bill", "Utilities"),
    ("utility", "Utilities"),
    ("restaurant", "Dining"),
    ("dinner", "Dining"),
    ("lunch", "Dining"),
    ("pizza", "Dining"),
    ("takeout", "Dining"),
    ("coffee", "Dining"),
    ("flight", "Travel"),
    ("hotel", "Travel"),
    ("train", "Travel"),
    ("taxi", "Travel"),
    ("fuel", "Travel"),
    ("cinema", "Entertainment"),
    ("movie", "Entertainment"),
    ("concert", "Entertainment"),
    ("tickets", "Entertainment"),
];

/// Suggest a category for a free-form expense description. Falls back to
/// [`DEFAULT_CATEGORY`] when no keyword matches; never fails.
pub fn suggest_category(description: &str) -> &'static str {
    let normalized = description.to_lowercase();
    for (keyword, category) in KEYWORDS {
        if normalized.contains(keyword) {
            return category;
        }
    }
    DEFAULT_CATEGORY
}
