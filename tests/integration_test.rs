/// End-to-end integration tests for the diffctx pipeline.
///
/// Tests the complete flow:
///   Parse → Split → Diff → Window → Collect (over in-memory collaborators)
use diffctx::collab::memory::MemoryWorkspace;
use diffctx::collector::{Collaborators, ContextCollector, MethodChange};
use diffctx::config::{Config, DiffConfig};
use diffctx::diff::{self, ContextPolicy, ContextRadius};
use diffctx::operations;
use diffctx::splitter::{DeclarationSplitter, SplitAccumulator};
use diffctx::{ContextError, Position, extract_metadata, locate_and_extract, relocate, render_signature, split, to_offset, window};
use tempfile::tempdir;

const SIGNATURE_BEFORE: &str = "class C { void m() {} }";
const SIGNATURE_AFTER: &str = "class C { void m(int x) {} }";

/// A changed signature line: one hunk, and the window after the target holds
/// exactly the changed line.
#[test]
fn test_signature_change_window() {
    let unified = diff::diff(SIGNATURE_BEFORE, SIGNATURE_AFTER, ContextRadius::Lines(0));
    assert_eq!(unified.hunks.len(), 1, "one hunk for a one-line change");

    let config = DiffConfig {
        context_radius: 0,
        ..DiffConfig::default()
    };
    // Column of `x` inside `m(int x)`.
    let target = Position::new(0, 21);
    let clean = locate_and_extract(SIGNATURE_BEFORE, SIGNATURE_AFTER, target, &config);
    assert_eq!(clean.target, Some(1), "target is the added signature line");

    let after_only = window(&clean, ContextPolicy::AfterOnly, ContextPolicy::AfterOnly.default_max_lines());
    assert_eq!(after_only.len(), 1);
    assert_eq!(after_only.render(), format!("+{SIGNATURE_AFTER}"));
}

/// A private field is hidden, a public method is reduced to its signature.
#[test]
fn test_split_hides_private_field() {
    let src = "public class Account {\n    private long balance;\n\n    /** Current balance. */\n    public long balance() {\n        return balance;\n    }\n}\n";
    let units = split(src, Position::new(0, 13)).unwrap();
    let texts: Vec<String> = units.iter().map(|u| u.render()).collect();
    assert_eq!(texts, vec!["public long balance();"]);
}

/// A class-level accessor annotation exposes private fields.
#[test]
fn test_split_accessor_annotation_exposes_field() {
    let src = "@Setter\npublic class Config {\n    private String name;\n}\n";
    let units = split(src, Position::new(1, 13)).unwrap();
    let texts: Vec<String> = units.iter().map(|u| u.render()).collect();
    assert_eq!(texts, vec!["@Setter private String name;"]);
}

/// Splitting a line that declares no type is reported, not guessed.
#[test]
fn test_split_without_class_on_line() {
    let err = split("class A {\n    int x;\n}\n", Position::new(1, 4)).unwrap_err();
    assert!(matches!(err, ContextError::NotFound(_)), "got: {err}");
}

/// `\n` is one code unit and advances the line.
#[test]
fn test_offsets_count_newlines() {
    assert_eq!(to_offset("ab\ncd", Position::new(1, 1)).unwrap(), 4);
    assert!(matches!(
        to_offset("ab\ncd", Position::new(5, 0)),
        Err(ContextError::OutOfRange(_))
    ));
}

/// A position inside a method fragment maps into the enclosing file.
#[test]
fn test_relocate_fragment_position() {
    let file = "class A {\n    void m() {}\n}\n";
    let method = "void m() {}";
    let relocated = relocate(file, method, Position::new(0, 5)).unwrap();
    assert_eq!(relocated, Position::new(1, 9));
}

/// Metadata and the rendered signature agree on the same fragment.
#[test]
fn test_metadata_and_signature() {
    let method = "@Override\npublic <T> List<T> wrap(T item, int... rest) throws IOException {\n    return null;\n}";
    let md = extract_metadata(method).expect("method metadata");
    assert_eq!(md.name, "wrap");
    assert_eq!(md.return_type, "List<T>");
    assert_eq!(md.parameter_types, vec!["T", "int..."]);
    assert_eq!(md.unique_key(), "wrap(T, int...)");

    let signature = render_signature(method).expect("signature");
    assert!(signature.ends_with("throws IOException;"), "got: {signature}");
    assert!(!signature.contains("return null"));
}

/// Two splits sharing one accumulator never emit a member twice.
#[test]
fn test_shared_accumulator_dedups() {
    let src = "class Queue {\n    public void push(int v) {}\n    public int pop() { return 0; }\n}\n";
    let splitter = DeclarationSplitter::new(&Config::default().splitter);
    let mut acc = SplitAccumulator::new();
    splitter.split_into(src, Position::new(0, 6), &mut acc).unwrap();
    splitter.split_into(src, Position::new(0, 6), &mut acc).unwrap();
    let keys: Vec<&str> = acc.units.iter().map(|u| u.key.as_str()).collect();
    assert_eq!(keys, vec!["push(int)", "pop()"]);
}

/// Long hunks are capped around the target without losing it.
#[test]
fn test_window_cap_keeps_target() {
    let before: String = (0..20).map(|i| format!("int a{i} = {i};\n")).collect();
    let after: String = (0..20).map(|i| format!("int a{i} = {};\n", i + 1)).collect();
    let target = Position::new(17, 4);

    let w = diff::diff_and_window(&before, &after, target, ContextPolicy::Both, 10);
    assert_eq!(w.len(), 10);
    let t = w.target.expect("target inside the window");
    assert_eq!(w.lines[t].text, "int a17 = 18;");
}

/// Collector over an in-memory workspace: a changed return type looks at what
/// follows each call site.
#[test]
fn test_collector_return_type_change() {
    let service_before = "public class Service {\n    public int total(int a) {\n        return a;\n    }\n}\n";
    let service_after = "public class Service {\n    public long total(int a) {\n        return a;\n    }\n}\n";
    let client_before = "class Client {\n    void go(Service s) {\n        int r = s.total(1);\n        print(r);\n    }\n}\n";
    let client_after = "class Client {\n    void go(Service s) {\n        long r = s.total(1);\n        print(r);\n    }\n}\n";
    let workspace = MemoryWorkspace::new()
        .with_file("Service.java", service_before, service_after)
        .with_file("Client.java", client_before, client_after);

    let config = Config::default();
    let collector = ContextCollector::new(Collaborators::in_memory(&workspace), &config);
    let change = MethodChange {
        rel_path: "Service.java".to_string(),
        before: "public int total(int a) {\n        return a;\n    }".to_string(),
        after: "public long total(int a) {\n        return a;\n    }".to_string(),
        test: None,
    };

    let texts = collector.usage_contexts(&change, None).unwrap();
    assert_eq!(texts, vec!["+        long r = s.total(1);"]);

    let items = collector
        .file_diff_contexts("Service.java", &change.before, &change.after)
        .unwrap();
    assert!(items.is_empty(), "nothing else changed in Service.java: {items:?}");
}

/// A dropped parameter is traced back to how the test builds the argument, and
/// the returned value to what the test reads from it.
#[test]
fn test_operations_for_dropped_parameter() {
    let before = "public Report run(Job job, Options options) {\n    return null;\n}";
    let after = "public Report run(Job job) {\n    return null;\n}";
    let test = "@Test\npublic void runs() {\n    Options opts = Options.defaults();\n    opts.setRetries(2);\n    Report report = runner.run(job, opts);\n    assertTrue(report.passed());\n}";

    let ops = operations::for_change(before, after, test).expect("both revisions parse");
    let constructions: Vec<&str> = ops.args.constructions.iter().map(String::as_str).collect();
    assert_eq!(constructions, vec!["options = Options.defaults()"]);
    let accesses: Vec<&str> = ops.args.accesses.iter().map(String::as_str).collect();
    assert_eq!(accesses, vec!["options.setRetries(2)", "x.setOptions()"]);

    let intermediates: Vec<&str> = ops.returns.intermediates.iter().map(String::as_str).collect();
    assert_eq!(intermediates, vec!["Report: report"]);
    let reads: Vec<&str> = ops.returns.accesses.iter().map(String::as_str).collect();
    assert_eq!(reads, vec!["report.passed()"]);
}

/// Configuration round-trips through a file and drives the window caps.
#[test]
fn test_config_file_drives_caps() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("diffctx.json");
    let path = path.to_str().unwrap();

    let mut config = Config::default();
    config.window.both = 3;
    config.save(path).unwrap();

    let loaded = Config::load(path).unwrap();
    loaded.validate().unwrap();
    assert_eq!(ContextPolicy::Both.max_lines(&loaded.window), 3);
    assert_eq!(loaded.diff, DiffConfig::default());
}
