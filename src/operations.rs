//! Operations a test performs around a call to the focal method: how it builds
//! the arguments it passes, and what it does with the value that comes back.
//!
//! Both extractors read one test method fragment and report what they find in
//! terms of the focal method's own parameter names and return type, so the
//! operations can be carried over to a changed signature.
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};
use tree_sitter::Node;

use crate::metadata::{MemberSource, extract_metadata, param_index_diff};
use crate::syntax::{NodeKind, Role, SyntaxTree, named_child};

static NON_LETTER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-zA-Z]").expect("valid regex"));

/// How a test prepares the arguments that were dropped from the signature.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArgOperations {
    /// `param = <expression>` per constructed argument, plus one
    /// `p1=<literal>, p2=<literal>` entry gathering every literal argument.
    pub constructions: BTreeSet<String>,
    /// Setter placeholders and member accesses on the argument variables,
    /// rewritten onto the parameter name.
    pub accesses: BTreeSet<String>,
}

/// What a test does with the value the focal method returns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReturnOperations {
    /// `Type: receiver.chain()` for results assigned after a call chain.
    pub intermediates: BTreeSet<String>,
    pub accesses: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TestOperations {
    pub args: ArgOperations,
    pub returns: ReturnOperations,
}

/// `ServiceCall<List<X>>` -> `servicecall_list_x`.
fn variable_name(type_name: &str) -> String {
    NON_LETTER
        .replace_all(type_name, "_")
        .trim_matches('_')
        .to_lowercase()
}

/// `options` -> `x.setOptions()`.
fn setter(param: &str) -> String {
    let mut chars = param.chars();
    let capitalized: String = chars
        .next()
        .map(|first| first.to_uppercase().chain(chars).collect())
        .unwrap_or_default();
    format!("x.set{capitalized}()")
}

fn is_call_to(tree: &SyntaxTree, node: Node<'_>, method_name: &str) -> bool {
    NodeKind::of(node) == NodeKind::MethodInvocation
        && named_child(node, Role::Name).is_some_and(|name| tree.text(name) == method_name)
}

/// Whether `node` is the object a call, field access or array access acts on.
fn is_receiver(access: Node<'_>, node: Node<'_>) -> bool {
    NodeKind::of(access).is_member_access()
        && ["object", "array"]
            .into_iter()
            .any(|field| access.child_by_field_name(field) == Some(node))
}

/// Longest chain of accesses with `node` as the innermost receiver.
fn access_chain(node: Node<'_>) -> Option<Node<'_>> {
    let mut chain = None;
    let mut current = node;
    while let Some(parent) = current.parent().filter(|p| is_receiver(*p, current)) {
        chain = Some(parent);
        current = parent;
    }
    chain
}

/// Text `outer` adds after `inner`: `.execute()` for `call(x).execute()`.
fn chained_suffix<'t>(tree: &'t SyntaxTree, inner: Node<'_>, outer: Node<'_>) -> &'t str {
    tree.source().get(inner.end_byte()..outer.end_byte()).unwrap_or_default()
}

/// Constructions of and accesses to the arguments at `obsolete` positions of
/// every call to `method_name` inside `test_method`.
///
/// Each obsolete parameter also contributes a `x.set<Param>()` placeholder.
/// Returns nothing when no parameter is obsolete.
pub fn args_operations(
    test_method: &str,
    method_name: &str,
    param_names: &[String],
    obsolete: &[usize],
) -> ArgOperations {
    let mut ops = ArgOperations::default();
    let obsolete: Vec<usize> = obsolete.iter().copied().filter(|&i| i < param_names.len()).collect();
    let Some(&last) = obsolete.iter().max() else {
        return ops;
    };
    ops.accesses.extend(obsolete.iter().map(|&i| setter(&param_names[i])));

    let Some(source) = MemberSource::parse(test_method) else {
        return ops;
    };
    let tree = &source.tree;

    let mut variables: HashMap<&str, usize> = HashMap::new();
    let mut bound = HashSet::new();
    let mut values = HashSet::new();
    let mut literals = Vec::new();

    for call in tree.preorder().filter(|n| is_call_to(tree, *n, method_name)) {
        let Some(arguments) = named_child(call, Role::Arguments) else {
            continue;
        };
        let mut cursor = arguments.walk();
        let args: Vec<Node<'_>> = arguments
            .named_children(&mut cursor)
            .filter(|n| !NodeKind::of(*n).is_comment())
            .collect();
        if args.len() <= last {
            continue;
        }

        for &i in &obsolete {
            let arg = args[i];
            let text = tree.text(arg);
            if NodeKind::of(arg) == NodeKind::Identifier {
                variables.insert(text, i);
            } else if bound.insert(i) {
                if NodeKind::of(arg) == NodeKind::Literal {
                    literals.push(format!("{}={text}", param_names[i]));
                } else {
                    values.insert(text);
                    ops.constructions.insert(format!("{} = {text}", param_names[i]));
                }
            }
        }
    }

    if !variables.is_empty() {
        for node in tree.preorder() {
            if NodeKind::of(node) != NodeKind::Identifier {
                continue;
            }
            let Some(&i) = variables.get(tree.text(node)) else {
                continue;
            };
            let param = &param_names[i];

            let declarator = node
                .parent()
                .filter(|p| NodeKind::of(*p) == NodeKind::VariableDeclarator)
                .filter(|p| named_child(*p, Role::Name) == Some(node));
            if let Some(declarator) = declarator {
                let Some(value) = named_child(declarator, Role::Value) else {
                    continue;
                };
                let text = tree.text(value);
                if NodeKind::of(value) == NodeKind::Literal && bound.insert(i) {
                    literals.push(format!("{param}={text}"));
                } else {
                    values.insert(text);
                    ops.constructions.insert(format!("{param} = {text}"));
                }
            } else if let Some(chain) = access_chain(node) {
                if !values.contains(tree.text(chain)) {
                    ops.accesses.insert(format!("{param}{}", chained_suffix(tree, node, chain)));
                }
            }
        }
    }

    if !literals.is_empty() {
        ops.constructions.insert(literals.join(", "));
    }
    debug!(
        "Found {} constructions and {} accesses for arguments of {method_name}",
        ops.constructions.len(),
        ops.accesses.len()
    );
    ops
}

/// Intermediate results and member accesses on the value returned by calls to
/// `method_name` inside `test_method`.
///
/// A result assigned after a call chain becomes an intermediate, and later
/// accesses are reported against a variable named after its declared type.
pub fn return_operations(test_method: &str, method_name: &str, class_type: &str) -> ReturnOperations {
    let mut ops = ReturnOperations::default();
    let Some(source) = MemberSource::parse(test_method) else {
        return ops;
    };
    let tree = &source.tree;

    let mut result_var = variable_name(class_type);
    let mut results: HashSet<&str> = HashSet::new();

    for node in tree.preorder() {
        if is_call_to(tree, node, method_name) {
            let outer = access_chain(node).unwrap_or(node);
            let suffix = chained_suffix(tree, node, outer);
            let declarator = outer
                .parent()
                .filter(|p| NodeKind::of(*p) == NodeKind::VariableDeclarator);

            match declarator {
                Some(declarator) => {
                    if let Some(name) = named_child(declarator, Role::Name) {
                        results.insert(tree.text(name));
                    }
                    if suffix.is_empty() {
                        ops.intermediates.insert(format!("{class_type}: {result_var}"));
                    } else {
                        let declared = declarator
                            .parent()
                            .and_then(|statement| named_child(statement, Role::Type))
                            .map(|ty| tree.text(ty))
                            .unwrap_or_default();
                        ops.intermediates.insert(format!("{declared}: {result_var}{suffix}"));
                        result_var = variable_name(declared);
                    }
                }
                None if suffix.is_empty() => {
                    ops.intermediates.insert(format!("{class_type}: x"));
                }
                None => {
                    ops.accesses.insert(format!("{result_var}{suffix}"));
                }
            }
        } else if NodeKind::of(node) == NodeKind::Identifier && results.contains(tree.text(node)) {
            if let Some(chain) = access_chain(node) {
                ops.accesses.insert(format!("{result_var}{}", chained_suffix(tree, node, chain)));
            }
        }
    }
    ops
}

/// Operations of `test_method` on the parameters `before` has and `after`
/// dropped, and on the value `before` returns.
pub fn for_change(before: &str, after: &str, test_method: &str) -> Option<TestOperations> {
    let Some(old) = extract_metadata(before) else {
        warn!("No focal method in the before revision");
        return None;
    };
    let new = extract_metadata(after)?;
    let (obsolete, _) = param_index_diff(&old.parameter_types, &new.parameter_types);
    Some(TestOperations {
        args: args_operations(test_method, &old.name, &old.parameter_names, &obsolete),
        returns: return_operations(test_method, &old.name, &old.return_type),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CUSTOMIZATIONS_TEST: &str = r#"@Test
  public void testGetCustomizations() throws InterruptedException, FileNotFoundException {
    String customizationsAsString =
        getStringFromInputStream(new FileInputStream("src/test/resources/speech_to_text/customizations.json"));
    JsonObject customizations = new JsonParser().parse(customizationsAsString).getAsJsonObject();

    server.enqueue(
        new MockResponse().addHeader(CONTENT_TYPE, HttpMediaType.APPLICATION_JSON).setBody(customizationsAsString));

    List<Customization> result = service.getCustomizations("en-us").execute();
    final RecordedRequest request = server.takeRequest();

    assertEquals("GET", request.getMethod());
    assertEquals(PATH_CUSTOMIZATIONS + "?language=en-us", request.getPath());
    assertEquals(customizations.get("customizations").getAsJsonArray().size(), result.size());
    assertEquals(customizations.get("customizations"), GSON.toJsonTree(result));
  }"#;

    const MOUNT_TEST: &str = r#"@Test
public void mount() throws Exception {
    AlluxioURI alluxioPath = new AlluxioURI("/t");
    MountOptions mountOptions = MountOptions.defaults();
    mountOptions.setShared(true);
    mFileSystem.mount(alluxioPath, ufsPath, mountOptions);
}"#;

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|i| i.to_string()).collect()
    }

    #[test]
    fn test_variable_name() {
        assert_eq!(variable_name(" ServiceCall<List<Customization>>"), "servicecall_list_customization");
        assert_eq!(variable_name("int[]"), "int");
        assert_eq!(setter("language"), "x.setLanguage()");
    }

    #[test]
    fn test_literal_argument() {
        let ops = args_operations(CUSTOMIZATIONS_TEST, "getCustomizations", &names(&["language"]), &[0]);
        assert_eq!(ops.constructions, set(&["language=\"en-us\""]));
        assert_eq!(ops.accesses, set(&["x.setLanguage()"]));
    }

    #[test]
    fn test_variable_argument_construction_and_access() {
        let params = names(&["alluxioPath", "ufsPath", "options"]);
        let ops = args_operations(MOUNT_TEST, "mount", &params, &[2]);
        assert_eq!(ops.constructions, set(&["options = MountOptions.defaults()"]));
        assert_eq!(ops.accesses, set(&["x.setOptions()", "options.setShared(true)"]));
    }

    #[test]
    fn test_no_obsolete_parameters() {
        let params = names(&["alluxioPath", "ufsPath", "options"]);
        assert_eq!(args_operations(MOUNT_TEST, "mount", &params, &[]), ArgOperations::default());
        assert_eq!(args_operations(MOUNT_TEST, "mount", &params, &[7]), ArgOperations::default());
    }

    #[test]
    fn test_literals_are_gathered_once() {
        let test = r#"@Test
public void resizes() {
    int size = 5;
    assertTrue(pool.resize(size, "x"));
    assertTrue(pool.resize(size, "y"));
}"#;
        let ops = args_operations(test, "resize", &names(&["capacity", "label"]), &[0, 1]);
        assert_eq!(ops.constructions, set(&["label=\"x\", capacity=5"]));
        assert_eq!(ops.accesses, set(&["x.setCapacity()", "x.setLabel()"]));
    }

    #[test]
    fn test_result_through_call_chain() {
        let ops = return_operations(CUSTOMIZATIONS_TEST, "getCustomizations", " ServiceCall<List<Customization>>");
        assert_eq!(
            ops.intermediates,
            set(&["List<Customization>: servicecall_list_customization.execute()"])
        );
        assert_eq!(ops.accesses, set(&["list_customization.size()"]));
    }

    #[test]
    fn test_unassigned_results() {
        let test = "@Test\npublic void counts() {\n    service.count();\n    assertEquals(3, service.count().intValue());\n}";
        let ops = return_operations(test, "count", "Integer");
        assert_eq!(ops.intermediates, set(&["Integer: x"]));
        assert_eq!(ops.accesses, set(&["integer.intValue()"]));
    }

    #[test]
    fn test_directly_assigned_result() {
        let test = "@Test\npublic void sizes() {\n    Stats stats = service.stats();\n    check(stats.total, stats.items[0]);\n}";
        let ops = return_operations(test, "stats", "Stats");
        assert_eq!(ops.intermediates, set(&["Stats: stats"]));
        assert_eq!(ops.accesses, set(&["stats.total", "stats.items[0]"]));
    }

    #[test]
    fn test_for_change() {
        let before = "public ServiceCall<List<Customization>> getCustomizations(String language) {\n    return null;\n}";
        let after = "public ServiceCall<List<Customization>> getCustomizations(Locale locale) {\n    return null;\n}";
        let ops = for_change(before, after, CUSTOMIZATIONS_TEST).expect("focal method parses");
        assert_eq!(ops.args.constructions, set(&["language=\"en-us\""]));
        assert_eq!(
            ops.returns.intermediates,
            set(&["List<Customization>: servicecall_list_customization.execute()"])
        );

        assert!(for_change("int x;", after, CUSTOMIZATIONS_TEST).is_none());
    }
}
