use indexmap::IndexMap;

pub type Favorites = IndexMap<String, String>;

/// Unconditional upsert of a favorite name → task id.
pub fn set(favorites: &mut Favorites, name: &str, task_id: &str) {
    favorites.insert(name.to_string(), task_id.to_string());
}

pub fn resolve<'a>(favorites: &'a Favorites, name: &str) -> Option<&'a str> {
    favorites.get(name).map(String::as_str)
}

/// Resolve a task reference anywhere one is accepted: a numeric value is a
/// task id as-is, anything else is treated as a favorite name.
pub fn resolve_task_ref(favorites: &Favorites, value: &str) -> Option<String> {
    if !value.is_empty() && value.chars().all(|c| c.is_ascii_digit()) {
        Some(value.to_string())
    } else {
        favorites.get(value).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_resolve_round_trips() {
        let mut favs = Favorites::new();
        set(&mut favs, "sprint", "4242");
        assert_eq!(resolve(&favs, "sprint"), Some("4242"));
        assert_eq!(resolve(&favs, "nope"), None);
    }

    #[test]
    fn set_overwrites_existing_name() {
        let mut favs = Favorites::new();
        set(&mut favs, "sprint", "1");
        set(&mut favs, "sprint", "2");
        assert_eq!(resolve(&favs, "sprint"), Some("2"));
        assert_eq!(favs.len(), 1);
    }

    #[test]
    fn numeric_refs_pass_through_others_look_up() {
        let mut favs = Favorites::new();
        set(&mut favs, "standup", "6905921");
        assert_eq!(resolve_task_ref(&favs, "123"), Some("123".to_string()));
        assert_eq!(
            resolve_task_ref(&favs, "standup"),
            Some("6905921".to_string())
        );
        assert_eq!(resolve_task_ref(&favs, "unknown"), None);
        assert_eq!(resolve_task_ref(&favs, ""), None);
    }
}
