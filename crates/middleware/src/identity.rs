//! Identity resolution — derives the current user's unique id and profile from
//! application state. Both selectors are supplied together or not at all.

use std::fmt;
use std::sync::Arc;

use mixtrack_core::Properties;
use serde_json::Value;

type UniqueIdSelector<S> = Arc<dyn Fn(&S) -> Option<String> + Send + Sync>;
type PersonSelector<S> = Arc<dyn Fn(&S) -> Properties + Send + Sync>;

/// Identity of the user at one dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedIdentity {
    pub unique_id: String,
    pub profile: Properties,
}

pub struct IdentityResolver<S> {
    unique_id: UniqueIdSelector<S>,
    person: PersonSelector<S>,
}

impl<S> Clone for IdentityResolver<S> {
    fn clone(&self) -> Self {
        Self {
            unique_id: Arc::clone(&self.unique_id),
            person: Arc::clone(&self.person),
        }
    }
}

impl<S> fmt::Debug for IdentityResolver<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityResolver").finish_non_exhaustive()
    }
}

impl<S> IdentityResolver<S> {
    pub fn new<P, U>(person_selector: P, unique_id_selector: U) -> Self
    where
        P: Fn(&S) -> Properties + Send + Sync + 'static,
        U: Fn(&S) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            unique_id: Arc::new(unique_id_selector),
            person: Arc::new(person_selector),
        }
    }

    /// Resolve against the current state. Nothing is cached; every call reads
    /// the state again. `None` when the state has no identifiable user.
    pub fn resolve(&self, state: &S) -> Option<ResolvedIdentity> {
        let unique_id = (self.unique_id)(state)?;
        Some(ResolvedIdentity {
            unique_id,
            profile: (self.person)(state),
        })
    }
}

impl IdentityResolver<Value> {
    /// Resolver over JSON state using RFC 6901 pointers, e.g. `/auth/user/id`
    /// and `/auth/user`. String and numeric ids are accepted; a profile that is
    /// missing or not an object resolves to an empty profile.
    pub fn from_pointers(unique_id_pointer: &str, person_pointer: &str) -> Self {
        let id_pointer = unique_id_pointer.to_string();
        let person_pointer = person_pointer.to_string();
        Self::new(
            move |state: &Value| {
                state
                    .pointer(&person_pointer)
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default()
            },
            move |state: &Value| match state.pointer(&id_pointer)? {
                Value::String(id) if !id.is_empty() => Some(id.clone()),
                Value::Number(id) => Some(id.to_string()),
                _ => None,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct AppState {
        user: Option<(String, String)>,
    }

    #[test]
    fn test_resolves_from_state() {
        let resolver = IdentityResolver::new(
            |s: &AppState| {
                let mut profile = Properties::new();
                if let Some((_, email)) = &s.user {
                    profile.insert("$email".into(), json!(email));
                }
                profile
            },
            |s: &AppState| s.user.as_ref().map(|(id, _)| id.clone()),
        );

        let state = AppState {
            user: Some(("1234".into(), "foo@bar.com".into())),
        };
        let identity = resolver.resolve(&state).unwrap();
        assert_eq!(identity.unique_id, "1234");
        assert_eq!(identity.profile["$email"], "foo@bar.com");

        assert!(resolver.resolve(&AppState { user: None }).is_none());
    }

    #[test]
    fn test_from_pointers() {
        let resolver = IdentityResolver::from_pointers("/auth/user/id", "/auth/user");
        let state = json!({"auth": {"user": {"id": 1234, "username": "foo@bar.com"}}});
        let identity = resolver.resolve(&state).unwrap();
        assert_eq!(identity.unique_id, "1234");
        assert_eq!(identity.profile["username"], "foo@bar.com");

        assert!(resolver.resolve(&json!({"auth": {}})).is_none());
    }
}
