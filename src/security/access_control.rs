//! Admin allowlist authorization.

use std::collections::HashSet;

use crate::auth::User;

/// Identities granted admin access.
///
/// Empty lists grant nothing, so an unconfigured deployment has no admins.
#[derive(Debug, Clone, Default)]
pub struct AdminAllowlist {
    emails: HashSet<String>,
    ids: HashSet<String>,
}

impl AdminAllowlist {
    pub fn new<E, I>(emails: E, ids: I) -> Self
    where
        E: IntoIterator<Item = String>,
        I: IntoIterator<Item = String>,
    {
        let clean = |s: String| {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        };
        Self {
            emails: emails.into_iter().filter_map(clean).collect(),
            ids: ids.into_iter().filter_map(clean).collect(),
        }
    }

    pub fn is_admin(&self, user: &User) -> bool {
        let by_email = user
            .email
            .as_deref()
            .is_some_and(|email| !email.is_empty() && self.emails.contains(email));
        let by_id = !user.id.is_empty() && self.ids.contains(&user.id);
        by_email || by_id
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty() && self.ids.is_empty()
    }
}
