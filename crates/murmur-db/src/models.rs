/// Row types mapping directly to SQLite rows. Kept separate from the
/// murmur-types API models so the DB layer stays independent.

pub struct MessageRow {
    pub id: String,
    pub text: String,
    pub category: String,
    pub author: String,
    pub reflection_count: i64,
    pub created_at: String,
}

pub struct CategoryStatsRow {
    pub category: String,
    pub messages: i64,
    pub reflections: i64,
}

pub struct StatsSummary {
    pub messages: i64,
    pub reflections: i64,
    pub categories: Vec<CategoryStatsRow>,
}
