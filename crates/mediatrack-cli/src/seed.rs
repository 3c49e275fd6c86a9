//! Demo data: a reading list with seven categories and nine books.

use tracing::info;

use mediatrack_core::{
    Catalog, CreateCategoryRequest, CreateFieldRequest, Document, FieldType, Principal, Result,
    SchemaMigrator,
};

pub const DEMO_USER: &str = "ahmad@example.com";

const CATEGORIES: &[(&str, &str)] = &[
    ("Books", "My personal collection of fiction and non-fiction."),
    ("Podcasts", "Shows and episodes I'm tracking."),
    ("People", "A personal CRM for contacts and notes."),
    ("Courses", "Online courses and tutorials."),
    ("Articles", "Interesting articles and posts from the web."),
    ("Github", "Repos I want to follow or contribute to."),
    ("Software", "Useful software, tools, and SaaS products."),
];

const BOOK_FIELDS: &[(&str, FieldType, &[&str])] = &[
    ("Title", FieldType::Text, &[]),
    ("Author", FieldType::Text, &[]),
    ("Status", FieldType::Select, &["Read", "Reading", "Unread"]),
    (
        "My Rating",
        FieldType::Select,
        &["⭐", "⭐⭐", "⭐⭐⭐", "⭐⭐⭐⭐", "⭐⭐⭐⭐⭐"],
    ),
    ("Page Count", FieldType::Number, &[]),
    ("Date Finished", FieldType::Date, &[]),
    ("My Summary", FieldType::Notes, &[]),
];

// Title, Author, Status, My Rating, Page Count, Date Finished, My Summary
const BOOKS: &[[&str; 7]] = &[
    ["Atomic Habits", "James Clear", "Read", "⭐⭐⭐⭐⭐", "320", "2024-01-15", "Great book on building small, consistent habits."],
    ["I Don't Have Enough Faith to be an Atheist", "Frank Turek", "Read", "⭐⭐⭐⭐", "448", "2023-05-20", "A compelling logical argument."],
    ["The Crowd: A Study of the Popular Mind", "Gustave Le Bon", "Reading", "", "160", "", ""],
    ["Man, the Unknown", "Alexis Carrel", "Unread", "", "346", "", ""],
    ["Islam Between East and West", "Alija Izetbegović", "Read", "⭐⭐⭐⭐⭐", "450", "2023-11-10", "A profound philosophical take."],
    ["Crime and Punishment", "Fyodor Dostoevsky", "Read", "⭐⭐⭐⭐⭐", "576", "2022-03-01", "A masterpiece."],
    ["The Brothers Karamazov", "Fyodor Dostoevsky", "Reading", "", "824", "", ""],
    ["Anna Karenina", "Leo Tolstoy", "Unread", "", "864", "", ""],
    ["War and Peace", "Leo Tolstoy", "Unread", "", "1225", "", ""],
];

/// What a seed run created.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub categories: usize,
    pub fields: usize,
    pub items: usize,
}

/// Populate the demo data set for a principal.
///
/// Categories the principal already has are left alone, so running the
/// seed twice does not duplicate anything.
pub async fn seed(
    catalog: &Catalog,
    migrator: &SchemaMigrator,
    principal: &Principal,
) -> Result<SeedSummary> {
    let existing = catalog.list_categories(principal).await?;
    let mut summary = SeedSummary::default();

    for (name, description) in CATEGORIES {
        if existing.iter().any(|c| c.name == *name) {
            continue;
        }
        let category = catalog
            .create_category(
                principal,
                CreateCategoryRequest::new(*name).with_description(*description),
            )
            .await?;
        summary.categories += 1;

        if *name != "Books" {
            continue;
        }

        let mut fields = Vec::with_capacity(BOOK_FIELDS.len());
        for (field_name, field_type, options) in BOOK_FIELDS {
            let mut req = CreateFieldRequest::new(*field_name, field_type.clone());
            if !options.is_empty() {
                req = req.with_options(options.iter().copied());
            }
            fields.push(migrator.create_field(principal, category.id, req).await?);
            summary.fields += 1;
        }

        for book in BOOKS {
            let pairs = BOOK_FIELDS
                .iter()
                .zip(book.iter())
                .map(|((key, _, _), value)| (*key, *value));
            let data = Document::from_raw_pairs(pairs, &fields);
            catalog.create_item(principal, category.id, data).await?;
            summary.items += 1;
        }
    }

    info!(
        subsystem = "cli",
        op = "seed",
        user_id = %principal.user_id,
        categories = summary.categories,
        fields = summary.fields,
        items = summary.items,
        "Seed complete"
    );
    Ok(summary)
}
