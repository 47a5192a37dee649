//! Blog posts: model, schemas, persistence and endpoints.
//!
//! # Data Flow
//! ```text
//! JSON body
//!     → validation.rs (NewPost / PostPatch, every issue collected)
//!     → model.rs (sanitize, reading time, row mapping)
//!     → store.rs (PostStore: memory) / supabase.rs (PostStore: PostgREST)
//!     → BlogPost (camelCase response)
//! ```

pub mod handlers;
pub mod model;
pub mod store;
pub mod supabase;
pub mod validation;

pub use model::{reading_time, BlogPost, NewPost, PostPatch};
pub use store::{MemoryPostStore, PostStore, StoreError};
pub use supabase::SupabasePostStore;
pub use validation::{validate_post, validate_post_update};
