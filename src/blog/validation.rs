//! Create and update schemas for blog posts.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::model::{NewPost, PostPatch};
use crate::validation::{ObjectValidator, StringRule, Validation};

pub const TITLE_MAX: usize = 200;
pub const SLUG_MAX: usize = 100;
pub const EXCERPT_MAX: usize = 500;
pub const SEO_TITLE_MAX: usize = 60;
pub const SEO_DESCRIPTION_MAX: usize = 160;

/// Lowercase alphanumerics with inner hyphens.
pub static SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([a-z0-9-]*[a-z0-9])?$").expect("valid slug regex"));

struct Rules {
    title: StringRule<'static>,
    slug: StringRule<'static>,
    excerpt: StringRule<'static>,
    content: StringRule<'static>,
    featured_image: StringRule<'static>,
    seo_title: StringRule<'static>,
    seo_description: StringRule<'static>,
}

fn rules() -> Rules {
    Rules {
        title: StringRule::new()
            .min(1, "Title is required")
            .max(TITLE_MAX, "Title must be less than 200 characters"),
        slug: StringRule::new()
            .min(1, "Slug is required")
            .max(SLUG_MAX, "Slug must be less than 100 characters")
            .pattern(
                &SLUG,
                "Slug must start and end with alphanumeric characters, with optional hyphens between",
            ),
        excerpt: StringRule::new()
            .min(1, "Excerpt is required")
            .max(EXCERPT_MAX, "Excerpt must be less than 500 characters"),
        content: StringRule::new().min(1, "Content is required"),
        featured_image: StringRule::new(),
        seo_title: StringRule::new()
            .max(SEO_TITLE_MAX, "SEO title must be less than 60 characters"),
        seo_description: StringRule::new().max(
            SEO_DESCRIPTION_MAX,
            "SEO description must be less than 160 characters",
        ),
    }
}

/// Validate a create body. Optional fields get their defaults.
pub fn validate_post(raw: &Value) -> Validation<NewPost> {
    let rules = rules();
    let mut v = ObjectValidator::new(raw);

    let title = v.string("title", &rules.title);
    let slug = v.string("slug", &rules.slug);
    let excerpt = v.string("excerpt", &rules.excerpt);
    let content = v.string("content", &rules.content);
    let featured_image = v.optional_string("featuredImage", &rules.featured_image);
    let categories = v.optional_string_list("categories");
    let tags = v.optional_string_list("tags");
    let published = v.boolean("published");
    let seo_title = v.optional_string("seoTitle", &rules.seo_title);
    let seo_description = v.optional_string("seoDescription", &rules.seo_description);
    let seo_keywords = v.optional_string_list("seoKeywords");

    if let Err(issues) = v.finish() {
        return Validation::Failure(issues);
    }

    // Every required field is present once finish() passes.
    Validation::Success(NewPost {
        title: title.unwrap_or_default(),
        slug: slug.unwrap_or_default(),
        excerpt: excerpt.unwrap_or_default(),
        content: content.unwrap_or_default(),
        featured_image: featured_image.unwrap_or_default(),
        categories: categories.unwrap_or_default(),
        tags: tags.unwrap_or_default(),
        published: published.unwrap_or_default(),
        seo_title: seo_title.unwrap_or_default(),
        seo_description: seo_description.unwrap_or_default(),
        seo_keywords: seo_keywords.unwrap_or_default(),
    })
}

/// Validate an update body. Every field is optional; no defaults are applied.
pub fn validate_post_update(raw: &Value) -> Validation<PostPatch> {
    let rules = rules();
    let mut v = ObjectValidator::new(raw);

    let patch = PostPatch {
        title: v.optional_string("title", &rules.title),
        slug: v.optional_string("slug", &rules.slug),
        excerpt: v.optional_string("excerpt", &rules.excerpt),
        content: v.optional_string("content", &rules.content),
        featured_image: v.optional_string("featuredImage", &rules.featured_image),
        categories: v.optional_string_list("categories"),
        tags: v.optional_string_list("tags"),
        published: v.optional_boolean("published"),
        seo_title: v.optional_string("seoTitle", &rules.seo_title),
        seo_description: v.optional_string("seoDescription", &rules.seo_description),
        seo_keywords: v.optional_string_list("seoKeywords"),
    };

    match v.finish() {
        Ok(()) => Validation::Success(patch),
        Err(issues) => Validation::Failure(issues),
    }
}
