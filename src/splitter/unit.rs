use std::collections::HashSet;

use serde::Serialize;

use crate::collab::Location;

/// What kind of member a unit was produced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MemberKind {
    Method,
    Constructor,
    Field,
}

/// One retained class member in normalized, single-line form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeclarationUnit {
    /// Dot-joined path of the nested type owning the member; empty for members
    /// of the split class itself.
    pub class_path: String,
    pub kind: MemberKind,
    /// `name(T1, T2)` for callables, the declared name for fields, qualified
    /// with `class_path` when nested.
    pub key: String,
    /// Signature for callables, full declaration for fields.
    pub text: String,
    /// Return type of a method or type of a field.
    pub declared_type: Option<String>,
}

impl DeclarationUnit {
    /// Text form with a `##<path>` marker line for nested members.
    #[must_use]
    pub fn render(&self) -> String {
        if self.class_path.is_empty() {
            self.text.clone()
        } else {
            format!("##{}\n{}", self.class_path, self.text)
        }
    }

    /// Whether the member produces an instance of `class_type`: constructors,
    /// and methods or fields declared with that type.
    #[must_use]
    pub fn instantiates(&self, class_type: &str) -> bool {
        if self.kind == MemberKind::Constructor {
            return self.class_path.is_empty();
        }
        self.declared_type
            .as_deref()
            .is_some_and(|ty| simple_type_name(ty) == simple_type_name(class_type))
    }
}

/// `a.b.Foo<T>` -> `Foo`.
fn simple_type_name(ty: &str) -> &str {
    let raw = ty.split('<').next().unwrap_or(ty).trim();
    raw.rsplit('.').next().unwrap_or(raw)
}

/// Per-request state shared across a split and its parent recursion.
///
/// Tracks the emitted units, the keys already emitted (so overridden members
/// are kept once) and the declarations already expanded (so cyclic type
/// graphs terminate).
#[derive(Debug, Default)]
pub struct SplitAccumulator {
    pub units: Vec<DeclarationUnit>,
    seen_keys: HashSet<String>,
    visited: HashSet<(String, usize)>,
}

impl SplitAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from keys that must not be emitted again.
    #[must_use]
    pub fn with_seen_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            seen_keys: keys.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Append `unit` unless its key was already seen.
    pub fn push(&mut self, unit: DeclarationUnit) -> bool {
        if !self.seen_keys.insert(unit.key.clone()) {
            return false;
        }
        self.units.push(unit);
        true
    }

    /// Append `unit` under its own key and every alias, unless any of them was
    /// already seen. Used for fields declaring several names at once.
    pub fn push_with_aliases(&mut self, unit: DeclarationUnit, aliases: Vec<String>) -> bool {
        if self.seen_keys.contains(&unit.key) || aliases.iter().any(|a| self.seen_keys.contains(a)) {
            return false;
        }
        self.seen_keys.extend(aliases);
        self.push(unit)
    }

    #[must_use]
    pub fn has_seen(&self, key: &str) -> bool {
        self.seen_keys.contains(key)
    }

    /// Mark the declaration at `path`, `line` as expanded. Returns `false` if it already was.
    pub fn visit(&mut self, path: &str, line: usize) -> bool {
        self.visited.insert((path.to_string(), line))
    }

    pub fn visit_location(&mut self, location: &Location) -> bool {
        self.visit(&location.path, location.start.line)
    }

    /// Move the units out while keeping every key marked as seen.
    pub fn take_units(&mut self) -> Vec<DeclarationUnit> {
        std::mem::take(&mut self.units)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    #[must_use]
    pub fn into_units(self) -> Vec<DeclarationUnit> {
        self.units
    }
}

/// Split `units` into those that produce an instance of `class_type` and the rest.
pub fn partition_by_type(
    units: Vec<DeclarationUnit>,
    class_type: &str,
) -> (Vec<DeclarationUnit>, Vec<DeclarationUnit>) {
    units.into_iter().partition(|u| u.instantiates(class_type))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(kind: MemberKind, key: &str, declared_type: Option<&str>) -> DeclarationUnit {
        DeclarationUnit {
            class_path: String::new(),
            kind,
            key: key.to_string(),
            text: format!("{key};"),
            declared_type: declared_type.map(str::to_string),
        }
    }

    #[test]
    fn test_render_marks_nested_members() {
        let mut u = unit(MemberKind::Field, "size", Some("int"));
        assert_eq!(u.render(), "size;");
        u.class_path = "Outer.Inner".to_string();
        assert_eq!(u.render(), "##Outer.Inner\nsize;");
    }

    #[test]
    fn test_accumulator_dedup() {
        let mut acc = SplitAccumulator::with_seen_keys(["run()"]);
        assert!(!acc.push(unit(MemberKind::Method, "run()", Some("void"))));
        assert!(acc.push(unit(MemberKind::Method, "stop()", Some("void"))));
        assert!(!acc.push(unit(MemberKind::Method, "stop()", Some("void"))));
        assert_eq!(acc.len(), 1);

        let taken = acc.take_units();
        assert_eq!(taken.len(), 1);
        assert!(acc.is_empty());
        assert!(acc.has_seen("stop()"), "keys survive take_units");
    }

    #[test]
    fn test_accumulator_aliases_block_each_other() {
        let mut acc = SplitAccumulator::with_seen_keys(["y"]);
        let pair = unit(MemberKind::Field, "x, y", Some("int"));
        assert!(!acc.push_with_aliases(pair.clone(), vec!["x".into(), "y".into()]));
        assert!(!acc.has_seen("x"), "a rejected unit claims no names");

        assert!(acc.push_with_aliases(unit(MemberKind::Field, "x, z", Some("int")), vec!["x".into(), "z".into()]));
        assert!(acc.has_seen("z"));
        assert!(!acc.push(unit(MemberKind::Field, "z", Some("int"))));
    }

    #[test]
    fn test_accumulator_visit() {
        let mut acc = SplitAccumulator::new();
        assert!(acc.visit("a/B.java", 3));
        assert!(!acc.visit("a/B.java", 3));
        assert!(acc.visit("a/B.java", 9));
    }

    #[test]
    fn test_partition_by_type() {
        let units = vec![
            unit(MemberKind::Constructor, "Options()", None),
            unit(MemberKind::Method, "defaults()", Some("com.x.Options")),
            unit(MemberKind::Method, "copy()", Some("Options<T>")),
            unit(MemberKind::Method, "name()", Some("String")),
            unit(MemberKind::Field, "count", Some("int")),
        ];
        let (instantiating, others) = partition_by_type(units, "Options");
        let keys: Vec<&str> = instantiating.iter().map(|u| u.key.as_str()).collect();
        assert_eq!(keys, vec!["Options()", "defaults()", "copy()"]);
        assert_eq!(others.len(), 2);
    }
}
