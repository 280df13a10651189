use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A field update that tells "leave it alone" apart from "clear it".
///
/// Over JSON, a missing key is `Keep`, an explicit `null` is `Clear` and any
/// other value is `Set`. Fields read with `#[serde(default)]`; fields written
/// need `#[serde(skip_serializing_if = "Patch::is_keep")]`, since `Keep` on
/// its own can only be written as `null`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Patch<T> {
    Keep,
    Set(T),
    Clear,
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Keep
    }
}

impl<T> Patch<T> {
    pub fn is_keep(&self) -> bool {
        matches!(self, Patch::Keep)
    }

    /// Applies the update on top of the current value.
    pub fn apply(self, current: Option<T>) -> Option<T> {
        match self {
            Patch::Keep => current,
            Patch::Set(value) => Some(value),
            Patch::Clear => None,
        }
    }

    /// The value a reader should see when this patch is displayed on its own.
    pub fn as_option(&self) -> Option<&T> {
        match self {
            Patch::Set(value) => Some(value),
            Patch::Keep | Patch::Clear => None,
        }
    }

    /// Rebuilds a patch from its stored form: a nullable value plus a
    /// "cleared" flag.
    pub fn from_parts(value: Option<T>, cleared: bool) -> Self {
        match (value, cleared) {
            (Some(value), _) => Patch::Set(value),
            (None, true) => Patch::Clear,
            (None, false) => Patch::Keep,
        }
    }

    pub fn is_clear(&self) -> bool {
        matches!(self, Patch::Clear)
    }
}

impl<T> From<Option<T>> for Patch<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Patch::Clear, Patch::Set)
    }
}

impl<T: Serialize> Serialize for Patch<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Patch::Set(value) => value.serialize(serializer),
            Patch::Keep | Patch::Clear => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Patch::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize, Serialize)]
    struct Body {
        #[serde(default, skip_serializing_if = "Patch::is_keep")]
        notes: Patch<String>,
    }

    #[test]
    fn json_distinguishes_missing_null_and_value() {
        let missing: Body = serde_json::from_str("{}").unwrap();
        let null: Body = serde_json::from_str(r#"{"notes": null}"#).unwrap();
        let value: Body = serde_json::from_str(r#"{"notes": "late train"}"#).unwrap();

        assert_eq!(missing.notes, Patch::Keep);
        assert_eq!(null.notes, Patch::Clear);
        assert_eq!(value.notes, Patch::Set("late train".to_string()));
    }

    #[test]
    fn written_json_reads_back_as_the_same_patch() {
        for notes in [Patch::Keep, Patch::Clear, Patch::Set("late train".to_string())] {
            let json = serde_json::to_string(&Body { notes: notes.clone() }).unwrap();
            let back: Body = serde_json::from_str(&json).unwrap();
            assert_eq!(back.notes, notes, "{json}");
        }
        assert_eq!(serde_json::to_string(&Body { notes: Patch::Keep }).unwrap(), "{}");
        assert_eq!(
            serde_json::to_string(&Body { notes: Patch::Clear }).unwrap(),
            r#"{"notes":null}"#
        );
    }

    #[test]
    fn apply_keeps_sets_or_clears() {
        let current = Some("old".to_string());
        assert_eq!(Patch::Keep.apply(current.clone()), current);
        assert_eq!(Patch::Clear.apply(current.clone()), None);
        assert_eq!(
            Patch::Set("new".to_string()).apply(current),
            Some("new".to_string())
        );
    }

    #[test]
    fn stored_parts_rebuild_the_same_patch() {
        assert_eq!(Patch::from_parts(Some(1), false), Patch::Set(1));
        assert_eq!(Patch::<i32>::from_parts(None, true), Patch::Clear);
        assert_eq!(Patch::<i32>::from_parts(None, false), Patch::Keep);
    }
}
